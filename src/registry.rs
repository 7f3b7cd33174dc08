use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result, bail};
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::util::read_json;

pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

const BUILTIN_MODELS: &[(&str, &str, f64)] = &[
    ("miewid", "MiewID", 0.25),
    ("megadescriptor", "MegaDescriptor", 0.20),
    ("dinov2", "DINOv2", 0.15),
    ("clip_vit", "CLIP ViT", 0.15),
    ("arcface", "ArcFace", 0.15),
    ("siamese_net", "Siamese Network", 0.10),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub key: String,
    pub display_name: String,
    pub weight: f64,
}

#[derive(Debug, Clone, Deserialize)]
struct RegistryDocument {
    models: Vec<ModelDescriptor>,
}

/// The fixed ensemble. Descriptor order is the summation order used by the
/// consensus calculator, so it must not be re-sorted after validation.
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    descriptors: Vec<ModelDescriptor>,
}

impl ModelRegistry {
    pub fn new(descriptors: Vec<ModelDescriptor>) -> Result<Self> {
        if descriptors.is_empty() {
            bail!("model registry must contain at least one model");
        }

        let key_pattern = Regex::new(r"^[a-z0-9_]+$").context("failed to compile model key regex")?;
        let mut seen = HashSet::<String>::with_capacity(descriptors.len());
        let mut normalized = Vec::with_capacity(descriptors.len());

        for descriptor in descriptors {
            let key = normalize_model_key(&descriptor.key);
            if !key_pattern.is_match(&key) {
                bail!("invalid model key after normalization: {:?}", descriptor.key);
            }
            if !descriptor.weight.is_finite() || descriptor.weight <= 0.0 || descriptor.weight > 1.0
            {
                bail!(
                    "model {key} has weight {} outside (0, 1]",
                    descriptor.weight
                );
            }
            if !seen.insert(key.clone()) {
                bail!("duplicate model key in registry: {key}");
            }

            normalized.push(ModelDescriptor {
                key,
                display_name: descriptor.display_name,
                weight: descriptor.weight,
            });
        }

        let weight_sum = normalized.iter().map(|descriptor| descriptor.weight).sum::<f64>();
        if (weight_sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            bail!("model weights sum to {weight_sum:.9}, expected 1.0");
        }

        Ok(Self {
            descriptors: normalized,
        })
    }

    pub fn builtin() -> Result<Self> {
        let descriptors = BUILTIN_MODELS
            .iter()
            .map(|(key, display_name, weight)| ModelDescriptor {
                key: (*key).to_string(),
                display_name: (*display_name).to_string(),
                weight: *weight,
            })
            .collect();
        Self::new(descriptors).context("built-in model registry is invalid")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let document: RegistryDocument = read_json(path)?;
        Self::new(document.models)
            .with_context(|| format!("invalid model registry: {}", path.display()))
    }

    /// Loads `path` when given, otherwise the built-in table.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Self::builtin(),
        }
    }

    pub fn descriptors(&self) -> &[ModelDescriptor] {
        &self.descriptors
    }

    pub fn total_models(&self) -> usize {
        self.descriptors.len()
    }

    pub fn weight_sum(&self) -> f64 {
        self.descriptors.iter().map(|descriptor| descriptor.weight).sum()
    }

    pub fn position(&self, model_key: &str) -> Option<usize> {
        let key = normalize_model_key(model_key);
        self.descriptors
            .iter()
            .position(|descriptor| descriptor.key == key)
    }

    pub fn lookup(&self, model_key: &str) -> Option<&ModelDescriptor> {
        self.position(model_key)
            .map(|index| &self.descriptors[index])
    }

    /// SHA-256 over the normalized descriptors in registry order.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for descriptor in &self.descriptors {
            hasher.update(descriptor.key.as_bytes());
            hasher.update([0_u8]);
            hasher.update(descriptor.display_name.as_bytes());
            hasher.update([0_u8]);
            hasher.update(descriptor.weight.to_le_bytes());
        }
        format!("{:x}", hasher.finalize())
    }
}

/// Lower-cases and maps every space or hyphen to an underscore. Never fails;
/// whether the result names a registered model is the caller's question.
pub fn normalize_model_key(raw: &str) -> String {
    raw.chars()
        .map(|character| match character {
            ' ' | '-' => '_',
            other => other.to_ascii_lowercase(),
        })
        .collect()
}
