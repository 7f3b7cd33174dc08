use std::io::{self, Write};

use anyhow::Result;
use tracing::info;

use crate::cli::ReviewArgs;
use crate::model::ReviewReport;
use crate::registry::ModelRegistry;
use crate::review::{ReviewInput, review_candidates};
use crate::util::{now_utc_string, read_json, sha256_file, write_json_pretty, write_json_stdout};

const REVIEW_REPORT_VERSION: u32 = 1;

pub fn run(args: ReviewArgs) -> Result<()> {
    let registry = ModelRegistry::resolve(args.registry_path.as_deref())?;
    let input: ReviewInput = read_json(&args.input)?;
    let input_sha256 = sha256_file(&args.input)?;

    let outcome = review_candidates(&input, &registry, args.top_k, args.decimals)?;

    let report = ReviewReport {
        report_version: REVIEW_REPORT_VERSION,
        generated_at: now_utc_string(),
        query_id: input.query_id.clone(),
        input_path: args.input.display().to_string(),
        input_sha256,
        registry_fingerprint: registry.fingerprint(),
        outcome,
    };

    info!(
        query_id = %report.query_id.as_deref().unwrap_or_default(),
        candidates = report.outcome.candidates.len(),
        verified = report.outcome.verified.len(),
        top_k = report.outcome.top_k,
        manual_review_required = report.outcome.manual_review_required,
        "review completed"
    );

    if let Some(report_path) = &args.report_path {
        write_json_pretty(report_path, &report)?;
        info!(path = %report_path.display(), "wrote review report");
    }

    if args.json {
        return write_json_stdout(&report);
    }

    write_text_report(&report)
}

fn write_text_report(report: &ReviewReport) -> Result<()> {
    let mut output = io::BufWriter::new(io::stdout().lock());

    if let Some(query_id) = &report.query_id {
        writeln!(output, "Query: {query_id}")?;
    }
    writeln!(
        output,
        "Candidates: {} verified={} window=top {}",
        report.outcome.candidates.len(),
        report.outcome.verified.len(),
        report.outcome.top_k
    )?;
    if report.outcome.manual_review_required {
        writeln!(output, "ALERT: top match changed after verification, manual review required")?;
    }

    for candidate in &report.outcome.candidates {
        let rank = candidate
            .baseline_rank
            .map(|rank| (rank + 1).to_string())
            .unwrap_or_else(|| "-".to_string());
        writeln!(
            output,
            "{}.\t{}\tconsensus={}% ({})\tagreement={}/{}",
            rank,
            candidate.entity_id,
            candidate.consensus_percent,
            candidate.consensus_level.as_str(),
            candidate.consensus.agreement_count,
            candidate.consensus.total_models
        )?;
        if let (Some(score), Some(level)) =
            (candidate.verification_score, candidate.verification_level)
        {
            writeln!(
                output,
                "\tverification={score:.4} ({}) verified_rank={}",
                level.as_str(),
                candidate
                    .verified_rank
                    .map(|rank| (rank + 1).to_string())
                    .unwrap_or_else(|| "-".to_string())
            )?;
        }
        if let Some(delta) = report.outcome.reconciliation.delta_for(&candidate.entity_id) {
            writeln!(output, "\tmovement={} {}", delta.kind.as_str(), delta.magnitude)?;
        }
    }

    output.flush()?;
    Ok(())
}
