pub mod consensus;
pub mod reconcile;
pub mod registry;
pub mod review;
pub mod score;
