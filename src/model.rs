use serde::Serialize;

use crate::confidence::ConfidenceLevel;
use crate::ensemble::EnsembleResult;
use crate::reconcile::ReconciliationResult;
use crate::registry::ModelDescriptor;
use crate::review::ReviewOutcome;

#[derive(Debug, Clone, Serialize)]
pub struct RegistryReport {
    pub source: String,
    pub fingerprint: String,
    pub total_models: usize,
    pub weight_sum: f64,
    pub models: Vec<ModelDescriptor>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScoreReading {
    pub raw: f64,
    pub normalized: f64,
    pub percent: String,
    pub level: ConfidenceLevel,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConsensusReport {
    pub input_path: String,
    pub registry_fingerprint: String,
    pub supplied_scores: usize,
    pub result: EnsembleResult,
    pub consensus_percent: String,
    pub consensus_level: ConfidenceLevel,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconcileReport {
    pub baseline_path: String,
    pub verified_path: String,
    pub top_k: usize,
    pub baseline_count: usize,
    pub verified_count: usize,
    pub result: ReconciliationResult,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewReport {
    pub report_version: u32,
    pub generated_at: String,
    pub query_id: Option<String>,
    pub input_path: String,
    pub input_sha256: String,
    pub registry_fingerprint: String,
    pub outcome: ReviewOutcome,
}
