//! Rank reconciliation between a baseline ordering and a verification-adjusted
//! ordering of the same candidate universe.
//!
//! Only the top-K window of each ranking is compared so that low-confidence
//! tail entries do not produce noise, but the top-entity check always looks
//! at rank 0 of the full rankings.

use std::collections::{HashMap, HashSet};

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

pub const DEFAULT_TOP_K: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedCandidate {
    pub entity_id: String,
    pub score: f64,
    pub rank: usize,
}

/// Candidates with unique ids and dense 0-based ranks equal to their position.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RankedList {
    candidates: Vec<RankedCandidate>,
}

impl RankedList {
    pub fn new(candidates: Vec<RankedCandidate>) -> Result<Self> {
        let mut seen = HashSet::<&str>::with_capacity(candidates.len());
        for (position, candidate) in candidates.iter().enumerate() {
            if candidate.rank != position {
                bail!(
                    "candidate {} has rank {} at position {position}; ranks must be dense and 0-based",
                    candidate.entity_id,
                    candidate.rank
                );
            }
            if !seen.insert(candidate.entity_id.as_str()) {
                bail!("duplicate entity id in ranked list: {}", candidate.entity_id);
            }
        }

        Ok(Self { candidates })
    }

    /// Orders `(entity_id, score)` pairs by score descending, entity id
    /// ascending on ties, and assigns dense ranks.
    pub fn from_scores<I>(scores: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, f64)>,
    {
        let mut scored = scores.into_iter().collect::<Vec<(String, f64)>>();
        scored.sort_by(|left, right| right.1.total_cmp(&left.1).then(left.0.cmp(&right.0)));

        let candidates = scored
            .into_iter()
            .enumerate()
            .map(|(rank, (entity_id, score))| RankedCandidate {
                entity_id,
                score,
                rank,
            })
            .collect();
        Self::new(candidates)
    }

    pub fn candidates(&self) -> &[RankedCandidate] {
        &self.candidates
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn leader(&self) -> Option<&RankedCandidate> {
        self.candidates.first()
    }

    pub fn top_k(&self, k: usize) -> &[RankedCandidate] {
        &self.candidates[..k.min(self.candidates.len())]
    }
}

impl<'de> Deserialize<'de> for RankedList {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let candidates = Vec::<RankedCandidate>::deserialize(deserializer)?;
        Self::new(candidates).map_err(serde::de::Error::custom)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeltaKind {
    Up,
    Down,
    New,
    Dropped,
    Same,
}

impl DeltaKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::New => "new",
            Self::Dropped => "dropped",
            Self::Same => "same",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankDelta {
    pub entity_id: String,
    pub kind: DeltaKind,
    pub magnitude: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationResult {
    pub deltas: Vec<RankDelta>,
    pub top_entity_changed: bool,
}

impl ReconciliationResult {
    pub fn delta_for(&self, entity_id: &str) -> Option<&RankDelta> {
        self.deltas.iter().find(|delta| delta.entity_id == entity_id)
    }
}

/// Classifies how each candidate in the two top-K windows moved. Deltas for
/// the verified window come first in window order, followed by baseline
/// entries that fell out of it.
pub fn reconcile(baseline: &RankedList, verified: &RankedList, top_k: usize) -> ReconciliationResult {
    let baseline_window = baseline.top_k(top_k);
    let verified_window = verified.top_k(top_k);

    let baseline_positions = baseline_window
        .iter()
        .enumerate()
        .map(|(position, candidate)| (candidate.entity_id.as_str(), position))
        .collect::<HashMap<&str, usize>>();
    let verified_ids = verified_window
        .iter()
        .map(|candidate| candidate.entity_id.as_str())
        .collect::<HashSet<&str>>();

    let mut deltas = Vec::with_capacity(baseline_window.len() + verified_window.len());

    for (verified_position, candidate) in verified_window.iter().enumerate() {
        let (kind, magnitude) = match baseline_positions.get(candidate.entity_id.as_str()) {
            Some(&baseline_position) => classify_move(baseline_position, verified_position),
            None => (DeltaKind::New, 0),
        };
        deltas.push(RankDelta {
            entity_id: candidate.entity_id.clone(),
            kind,
            magnitude,
        });
    }

    for candidate in baseline_window {
        if !verified_ids.contains(candidate.entity_id.as_str()) {
            deltas.push(RankDelta {
                entity_id: candidate.entity_id.clone(),
                kind: DeltaKind::Dropped,
                magnitude: 0,
            });
        }
    }

    let top_entity_changed = match (baseline.leader(), verified.leader()) {
        (Some(baseline_leader), Some(verified_leader)) => {
            baseline_leader.entity_id != verified_leader.entity_id
        }
        _ => false,
    };

    ReconciliationResult {
        deltas,
        top_entity_changed,
    }
}

fn classify_move(baseline_position: usize, verified_position: usize) -> (DeltaKind, usize) {
    if baseline_position > verified_position {
        (DeltaKind::Up, baseline_position - verified_position)
    } else if baseline_position < verified_position {
        (DeltaKind::Down, verified_position - baseline_position)
    } else {
        (DeltaKind::Same, 0)
    }
}
