//! Candidate review: the ensemble consensus ranks candidates, the
//! verification pass ranks them again, and the two orderings are reconciled.
//! A change of leader is what asks the reviewer to look manually.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::confidence::{ConfidenceLevel, confidence_level, normalize_score, to_percentage};
use crate::ensemble::{EnsembleResult, ModelScore, compute_ensemble};
use crate::reconcile::{RankedList, ReconciliationResult, reconcile};
use crate::registry::ModelRegistry;

#[derive(Debug, Clone, Deserialize)]
pub struct ReviewInput {
    #[serde(default)]
    pub query_id: Option<String>,
    pub candidates: Vec<CandidateInput>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CandidateInput {
    pub entity_id: String,
    #[serde(default)]
    pub model_scores: Vec<ModelScore>,
    #[serde(default)]
    pub verification_score: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CandidateReview {
    pub entity_id: String,
    pub consensus: EnsembleResult,
    pub consensus_percent: String,
    pub consensus_level: ConfidenceLevel,
    pub verification_score: Option<f64>,
    pub verification_level: Option<ConfidenceLevel>,
    pub baseline_rank: Option<usize>,
    pub verified_rank: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewOutcome {
    pub candidates: Vec<CandidateReview>,
    pub baseline: RankedList,
    pub verified: RankedList,
    pub top_k: usize,
    pub reconciliation: ReconciliationResult,
    pub manual_review_required: bool,
}

pub fn review_candidates(
    input: &ReviewInput,
    registry: &ModelRegistry,
    top_k: usize,
    percent_decimals: u32,
) -> Result<ReviewOutcome> {
    let consensus = input
        .candidates
        .iter()
        .map(|candidate| {
            let result = compute_ensemble(&candidate.model_scores, registry);
            debug!(
                entity_id = %candidate.entity_id,
                agreement = result.agreement_count,
                consensus = result.weighted_consensus_score,
                "candidate consensus"
            );
            result
        })
        .collect::<Vec<EnsembleResult>>();

    let baseline = RankedList::from_scores(
        input
            .candidates
            .iter()
            .zip(&consensus)
            .map(|(candidate, result)| {
                (candidate.entity_id.clone(), result.weighted_consensus_score)
            }),
    )
    .context("failed to build baseline ranking")?;

    let verified = RankedList::from_scores(input.candidates.iter().filter_map(|candidate| {
        candidate
            .verification_score
            .map(|score| (candidate.entity_id.clone(), normalize_score(score)))
    }))
    .context("failed to build verified ranking")?;

    if verified.is_empty() {
        debug!("no candidate carries a verification score");
    }

    let reconciliation = reconcile(&baseline, &verified, top_k);
    let manual_review_required = reconciliation.top_entity_changed;

    if manual_review_required {
        warn!(
            query_id = %input.query_id.as_deref().unwrap_or_default(),
            baseline_leader = %baseline.leader().map(|c| c.entity_id.as_str()).unwrap_or_default(),
            verified_leader = %verified.leader().map(|c| c.entity_id.as_str()).unwrap_or_default(),
            "top match changed after verification; manual review required"
        );
    }

    let mut candidates = input
        .candidates
        .iter()
        .zip(consensus)
        .map(|(candidate, result)| {
            let verification = candidate.verification_score.map(normalize_score);
            CandidateReview {
                entity_id: candidate.entity_id.clone(),
                consensus_percent: to_percentage(result.weighted_consensus_score, percent_decimals),
                consensus_level: confidence_level(result.weighted_consensus_score),
                consensus: result,
                verification_score: verification,
                verification_level: verification.map(confidence_level),
                baseline_rank: rank_of(&baseline, &candidate.entity_id),
                verified_rank: rank_of(&verified, &candidate.entity_id),
            }
        })
        .collect::<Vec<CandidateReview>>();
    candidates.sort_by_key(|review| review.baseline_rank);

    Ok(ReviewOutcome {
        candidates,
        baseline,
        verified,
        top_k,
        reconciliation,
        manual_review_required,
    })
}

fn rank_of(list: &RankedList, entity_id: &str) -> Option<usize> {
    list.candidates()
        .iter()
        .find(|candidate| candidate.entity_id == entity_id)
        .map(|candidate| candidate.rank)
}
