use std::io::{self, Write};

use anyhow::Result;
use tracing::{info, warn};

use crate::cli::ConsensusArgs;
use crate::confidence::{confidence_level, to_percentage};
use crate::ensemble::{ModelScore, compute_ensemble};
use crate::model::ConsensusReport;
use crate::registry::ModelRegistry;
use crate::util::{read_json, write_json_stdout};

pub fn run(args: ConsensusArgs) -> Result<()> {
    let registry = ModelRegistry::resolve(args.registry_path.as_deref())?;
    let scores: Vec<ModelScore> = read_json(&args.input)?;

    for score in scores
        .iter()
        .filter(|score| registry.lookup(&score.model_key).is_none())
    {
        warn!(model_key = %score.model_key, "model key not in registry; excluded from weighting");
    }

    let result = compute_ensemble(&scores, &registry);
    let report = ConsensusReport {
        input_path: args.input.display().to_string(),
        registry_fingerprint: registry.fingerprint(),
        supplied_scores: scores.len(),
        consensus_percent: to_percentage(result.weighted_consensus_score, args.decimals),
        consensus_level: confidence_level(result.weighted_consensus_score),
        result,
    };

    info!(
        input = %report.input_path,
        path = report.result.path.as_str(),
        agreement = report.result.agreement_count,
        total_models = report.result.total_models,
        consensus = report.result.weighted_consensus_score,
        "consensus computed"
    );

    if args.json {
        return write_json_stdout(&report);
    }

    let mut output = io::BufWriter::new(io::stdout().lock());
    writeln!(output, "Input: {}", report.input_path)?;
    writeln!(
        output,
        "Agreement: {}/{} models",
        report.result.agreement_count, report.result.total_models
    )?;
    writeln!(
        output,
        "Consensus: {}% ({}) path={}",
        report.consensus_percent,
        report.consensus_level.as_str(),
        report.result.path.as_str()
    )?;
    output.flush()?;
    Ok(())
}
