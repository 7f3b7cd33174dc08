use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::confidence::normalize_score;
use crate::registry::ModelRegistry;

/// One model's verdict on one candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelScore {
    pub model_key: String,
    #[serde(default)]
    pub similarity: f64,
    /// Absent means "matched if similarity > 0".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contribution: Option<f64>,
    /// Per-call override of the registry weight.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

impl ModelScore {
    pub fn is_matched(&self) -> bool {
        self.matched != Some(false) && self.similarity > 0.0
    }
}

#[cfg(test)]
impl ModelScore {
    pub fn new(model_key: impl Into<String>, similarity: f64) -> Self {
        Self {
            model_key: model_key.into(),
            similarity,
            matched: None,
            contribution: None,
            weight: None,
        }
    }

    pub fn with_matched(mut self, matched: bool) -> Self {
        self.matched = Some(matched);
        self
    }

    pub fn with_contribution(mut self, contribution: f64) -> Self {
        self.contribution = Some(contribution);
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsensusPath {
    Contribution,
    WeightedSimilarity,
}

impl ConsensusPath {
    /// A single explicit contribution anywhere in the batch switches the
    /// whole batch to the contribution path.
    pub fn select(scores: &[ModelScore]) -> Self {
        if scores.iter().any(|score| score.contribution.is_some()) {
            Self::Contribution
        } else {
            Self::WeightedSimilarity
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Contribution => "contribution",
            Self::WeightedSimilarity => "weighted_similarity",
        }
    }
}

/// A model score resolved against the registry for a chosen path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scored {
    ByContribution(f64),
    ByWeightAndSimilarity { weight: f64, similarity: f64 },
    /// Unmatched, or unknown to the registry on the weighted path.
    Excluded,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnsembleResult {
    pub agreement_count: usize,
    pub total_models: usize,
    pub weighted_consensus_score: f64,
    pub path: ConsensusPath,
}

/// `agreement_count` counts distinct registered models with at least one
/// matched entry; keys missing from the registry never count toward it.
pub fn compute_ensemble(scores: &[ModelScore], registry: &ModelRegistry) -> EnsembleResult {
    let path = ConsensusPath::select(scores);
    let resolved = resolve_scores(scores, registry, path);

    let weighted_consensus_score = match path {
        ConsensusPath::Contribution => resolved
            .iter()
            .map(|scored| match scored {
                Scored::ByContribution(value) => *value,
                _ => 0.0,
            })
            .sum::<f64>(),
        ConsensusPath::WeightedSimilarity => {
            let (numerator, denominator) = resolved.iter().fold(
                (0.0_f64, 0.0_f64),
                |(numerator, denominator), scored| match scored {
                    Scored::ByWeightAndSimilarity { weight, similarity } => {
                        (numerator + similarity * weight, denominator + weight)
                    }
                    _ => (numerator, denominator),
                },
            );
            if denominator > 0.0 {
                numerator / denominator
            } else {
                0.0
            }
        }
    };

    let mut agreeing = vec![false; registry.total_models()];
    for score in scores.iter().filter(|score| score.is_matched()) {
        if let Some(index) = registry.position(&score.model_key) {
            agreeing[index] = true;
        }
    }
    let agreement_count = agreeing.iter().filter(|value| **value).count();

    debug!(
        path = path.as_str(),
        supplied = scores.len(),
        agreement_count,
        weighted_consensus_score,
        "ensemble computed"
    );

    EnsembleResult {
        agreement_count,
        total_models: registry.total_models(),
        weighted_consensus_score,
        path,
    }
}

/// Resolves every score and orders the result by registry position, with
/// unknown keys after all registered ones in input order. The consensus
/// sums walk this order so floating-point results are reproducible.
fn resolve_scores(
    scores: &[ModelScore],
    registry: &ModelRegistry,
    path: ConsensusPath,
) -> Vec<Scored> {
    let mut resolved = scores
        .iter()
        .enumerate()
        .map(|(input_index, score)| {
            let position = registry.position(&score.model_key);
            if position.is_none() {
                debug!(model_key = %score.model_key, "unrecognized model key");
            }
            let order = position.unwrap_or(registry.total_models());
            ((order, input_index), resolve_one(score, registry, path, position))
        })
        .collect::<Vec<_>>();

    resolved.sort_by_key(|((order, input_index), _)| (*order, *input_index));
    resolved
        .into_iter()
        .map(|(_, scored)| scored)
        .collect()
}

fn resolve_one(
    score: &ModelScore,
    registry: &ModelRegistry,
    path: ConsensusPath,
    position: Option<usize>,
) -> Scored {
    match path {
        ConsensusPath::Contribution => {
            if score.contribution.is_none() {
                debug!(
                    model_key = %score.model_key,
                    "score without contribution in contribution batch counts as zero"
                );
            }
            Scored::ByContribution(score.contribution.unwrap_or(0.0))
        }
        ConsensusPath::WeightedSimilarity => {
            let Some(index) = position else {
                return Scored::Excluded;
            };
            if !score.is_matched() {
                return Scored::Excluded;
            }

            let default_weight = registry.descriptors()[index].weight;
            let weight = score
                .weight
                .filter(|value| value.is_finite() && *value > 0.0)
                .unwrap_or(default_weight);
            Scored::ByWeightAndSimilarity {
                weight,
                similarity: normalize_score(score.similarity),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::{ConsensusPath, ModelScore, compute_ensemble};
    use crate::registry::{ModelDescriptor, ModelRegistry};

    fn registry() -> ModelRegistry {
        ModelRegistry::new(vec![
            ModelDescriptor {
                key: "alpha".to_string(),
                display_name: "Alpha".to_string(),
                weight: 0.5,
            },
            ModelDescriptor {
                key: "beta_net".to_string(),
                display_name: "Beta Net".to_string(),
                weight: 0.3,
            },
            ModelDescriptor {
                key: "gamma".to_string(),
                display_name: "Gamma".to_string(),
                weight: 0.2,
            },
        ])
        .expect("test registry should validate")
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-12,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn weighted_path_averages_matched_scores_by_weight() {
        let scores = vec![ModelScore::new("alpha", 0.9), ModelScore::new("beta_net", 0.6)];
        let result = compute_ensemble(&scores, &registry());

        assert_eq!(result.path, ConsensusPath::WeightedSimilarity);
        assert_eq!(result.agreement_count, 2);
        assert_eq!(result.total_models, 3);
        assert_close(result.weighted_consensus_score, (0.9 * 0.5 + 0.6 * 0.3) / 0.8);
    }

    #[test]
    fn weighted_path_ignores_unmatched_entries() {
        let scores = vec![
            ModelScore::new("alpha", 0.8),
            ModelScore::new("gamma", 0.7).with_matched(false),
        ];
        let result = compute_ensemble(&scores, &registry());

        assert_eq!(result.agreement_count, 1);
        assert_close(result.weighted_consensus_score, 0.8);
    }

    #[test]
    fn all_zero_similarities_fall_back_to_zero() {
        let scores = vec![ModelScore::new("alpha", 0.0), ModelScore::new("gamma", 0.0)];
        let result = compute_ensemble(&scores, &registry());

        assert_eq!(result.agreement_count, 0);
        assert_eq!(result.weighted_consensus_score, 0.0);
        assert!(!result.weighted_consensus_score.is_nan());
    }

    #[test]
    fn empty_input_yields_zero_consensus() {
        let result = compute_ensemble(&[], &registry());
        assert_eq!(result.agreement_count, 0);
        assert_eq!(result.total_models, 3);
        assert_eq!(result.weighted_consensus_score, 0.0);
    }

    #[test]
    fn contribution_path_sums_all_contributions_regardless_of_match() {
        let scores = vec![
            ModelScore::new("a", 0.0)
                .with_contribution(0.3)
                .with_matched(false),
            ModelScore::new("b", 0.0).with_contribution(0.5),
        ];
        let result = compute_ensemble(&scores, &registry());

        assert_eq!(result.path, ConsensusPath::Contribution);
        assert_close(result.weighted_consensus_score, 0.8);
        assert_eq!(result.agreement_count, 0);
    }

    #[test]
    fn contribution_path_counts_missing_contribution_as_zero() {
        let scores = vec![
            ModelScore::new("alpha", 0.9).with_contribution(0.4),
            ModelScore::new("beta_net", 0.7),
        ];
        let result = compute_ensemble(&scores, &registry());

        assert_eq!(result.path, ConsensusPath::Contribution);
        assert_close(result.weighted_consensus_score, 0.4);
        assert_eq!(result.agreement_count, 2);
    }

    #[test]
    fn model_keys_are_matched_after_normalization() {
        let scores = vec![ModelScore::new("Beta-Net", 0.5), ModelScore::new("ALPHA", 0.5)];
        let result = compute_ensemble(&scores, &registry());

        assert_eq!(result.agreement_count, 2);
        assert_close(result.weighted_consensus_score, 0.5);
    }

    #[test]
    fn unrecognized_keys_are_excluded_from_weighted_sum() {
        let scores = vec![ModelScore::new("alpha", 0.6), ModelScore::new("resnet", 1.0)];
        let result = compute_ensemble(&scores, &registry());

        assert_eq!(result.agreement_count, 1);
        assert_close(result.weighted_consensus_score, 0.6);
    }

    #[test]
    fn percentage_similarities_are_normalized_before_weighting() {
        let scores = vec![ModelScore::new("alpha", 80.0), ModelScore::new("gamma", 0.8)];
        let result = compute_ensemble(&scores, &registry());
        assert_close(result.weighted_consensus_score, 0.8);
    }

    #[test]
    fn weight_override_replaces_descriptor_weight() {
        let scores = vec![
            ModelScore::new("alpha", 1.0).with_weight(0.1),
            ModelScore::new("gamma", 0.5),
        ];
        let result = compute_ensemble(&scores, &registry());
        assert_close(result.weighted_consensus_score, (1.0 * 0.1 + 0.5 * 0.2) / 0.3);
    }

    #[test]
    fn invalid_weight_override_falls_back_to_descriptor_weight() {
        let scores = vec![
            ModelScore::new("alpha", 1.0).with_weight(-2.0),
            ModelScore::new("gamma", 0.5).with_weight(f64::NAN),
        ];
        let result = compute_ensemble(&scores, &registry());
        assert_close(result.weighted_consensus_score, (1.0 * 0.5 + 0.5 * 0.2) / 0.7);
    }

    #[test]
    fn unregistered_matches_do_not_count_toward_agreement() {
        let registry = ModelRegistry::builtin().expect("built-in registry should validate");
        let scores = vec![ModelScore::new("miewid", 0.9), ModelScore::new("resnet", 0.9)];
        let result = compute_ensemble(&scores, &registry);

        assert_eq!(result.agreement_count, 1);
        assert_eq!(result.total_models, 6);
        assert_close(result.weighted_consensus_score, 0.9);
    }

    #[test]
    fn duplicate_model_entries_count_once_toward_agreement() {
        let scores = vec![
            ModelScore::new("alpha", 0.9),
            ModelScore::new("Alpha", 0.7),
            ModelScore::new("alpha", 0.8),
            ModelScore::new("gamma", 0.4),
        ];
        let result = compute_ensemble(&scores, &registry());
        assert_eq!(result.agreement_count, 2);
        assert!(result.agreement_count <= result.total_models);
    }

    #[test]
    fn summation_order_follows_registry_not_input() {
        let forward = vec![
            ModelScore::new("alpha", 0.1),
            ModelScore::new("beta_net", 0.2),
            ModelScore::new("gamma", 0.3),
        ];
        let mut reversed = forward.clone();
        reversed.reverse();

        let registry = registry();
        assert_eq!(
            compute_ensemble(&forward, &registry)
                .weighted_consensus_score
                .to_bits(),
            compute_ensemble(&reversed, &registry)
                .weighted_consensus_score
                .to_bits()
        );
    }

    #[test]
    fn matched_defaults_follow_similarity() {
        assert!(ModelScore::new("alpha", 0.1).is_matched());
        assert!(!ModelScore::new("alpha", 0.0).is_matched());
        assert!(!ModelScore::new("alpha", 0.5).with_matched(false).is_matched());
        assert!(!ModelScore::new("alpha", 0.0).with_matched(true).is_matched());
    }

    #[test]
    fn model_score_deserializes_with_optional_fields_missing() {
        let raw = r#"[{"model_key": "alpha", "similarity": 0.7}, {"model_key": "gamma"}]"#;
        let scores: Vec<ModelScore> =
            serde_json::from_str(raw).expect("minimal model scores should deserialize");
        assert_eq!(scores[0].matched, None);
        assert_eq!(scores[0].contribution, None);
        assert_eq!(scores[1].similarity, 0.0);
    }

    fn model_key() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("alpha".to_string()),
            Just("Beta Net".to_string()),
            Just("gamma".to_string()),
            Just("unknown".to_string()),
        ]
    }

    fn model_score() -> impl Strategy<Value = ModelScore> {
        (model_key(), 0.0_f64..=1.0, proptest::option::of(any::<bool>())).prop_map(
            |(key, similarity, matched)| {
                let mut score = ModelScore::new(key, similarity);
                score.matched = matched;
                score
            },
        )
    }

    proptest! {
        #[test]
        fn agreement_never_exceeds_total_models(
            scores in proptest::collection::vec(model_score(), 0..16)
        ) {
            let result = compute_ensemble(&scores, &registry());
            prop_assert!(result.agreement_count <= result.total_models);
        }

        #[test]
        fn weighted_consensus_stays_in_unit_interval(
            scores in proptest::collection::vec(model_score(), 0..16)
        ) {
            let result = compute_ensemble(&scores, &registry());
            prop_assert!(!result.weighted_consensus_score.is_nan());
            prop_assert!(result.weighted_consensus_score >= 0.0);
            prop_assert!(result.weighted_consensus_score <= 1.0 + 1e-12);
        }
    }
}
