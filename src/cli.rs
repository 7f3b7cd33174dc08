use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::confidence::{DEFAULT_PERCENT_DECIMALS, MAX_PERCENT_DECIMALS};
use crate::reconcile::DEFAULT_TOP_K;

#[derive(Parser, Debug)]
#[command(
    name = "matchrecon",
    version,
    about = "Ensemble consensus and verification reconciliation for match review"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Registry(RegistryArgs),
    Score(ScoreArgs),
    Consensus(ConsensusArgs),
    Reconcile(ReconcileArgs),
    Review(ReviewArgs),
}

#[derive(Args, Debug, Clone)]
pub struct RegistryArgs {
    #[arg(long)]
    pub registry_path: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ScoreArgs {
    #[arg(long = "value", required = true, allow_negative_numbers = true)]
    pub values: Vec<f64>,

    #[arg(
        long,
        default_value_t = DEFAULT_PERCENT_DECIMALS,
        value_parser = clap::value_parser!(u32).range(0..=i64::from(MAX_PERCENT_DECIMALS))
    )]
    pub decimals: u32,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ConsensusArgs {
    #[arg(long)]
    pub input: PathBuf,

    #[arg(long)]
    pub registry_path: Option<PathBuf>,

    #[arg(
        long,
        default_value_t = DEFAULT_PERCENT_DECIMALS,
        value_parser = clap::value_parser!(u32).range(0..=i64::from(MAX_PERCENT_DECIMALS))
    )]
    pub decimals: u32,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ReconcileArgs {
    #[arg(long)]
    pub baseline: PathBuf,

    #[arg(long)]
    pub verified: PathBuf,

    #[arg(long, default_value_t = DEFAULT_TOP_K)]
    pub top_k: usize,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ReviewArgs {
    #[arg(long)]
    pub input: PathBuf,

    #[arg(long)]
    pub registry_path: Option<PathBuf>,

    #[arg(long, default_value_t = DEFAULT_TOP_K)]
    pub top_k: usize,

    #[arg(
        long,
        default_value_t = DEFAULT_PERCENT_DECIMALS,
        value_parser = clap::value_parser!(u32).range(0..=i64::from(MAX_PERCENT_DECIMALS))
    )]
    pub decimals: u32,

    #[arg(long)]
    pub report_path: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}
