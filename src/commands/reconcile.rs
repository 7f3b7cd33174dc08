use std::io::{self, Write};

use anyhow::Result;
use tracing::{info, warn};

use crate::cli::ReconcileArgs;
use crate::model::ReconcileReport;
use crate::reconcile::{RankedList, reconcile};
use crate::util::{read_json, write_json_stdout};

pub fn run(args: ReconcileArgs) -> Result<()> {
    let baseline: RankedList = read_json(&args.baseline)?;
    let verified: RankedList = read_json(&args.verified)?;

    let result = reconcile(&baseline, &verified, args.top_k);
    let report = ReconcileReport {
        baseline_path: args.baseline.display().to_string(),
        verified_path: args.verified.display().to_string(),
        top_k: args.top_k,
        baseline_count: baseline.len(),
        verified_count: verified.len(),
        result,
    };

    info!(
        top_k = report.top_k,
        baseline_count = report.baseline_count,
        verified_count = report.verified_count,
        delta_count = report.result.deltas.len(),
        "rankings reconciled"
    );
    if report.result.top_entity_changed {
        warn!("top-ranked entity differs between baseline and verified rankings");
    }

    if args.json {
        return write_json_stdout(&report);
    }

    let mut output = io::BufWriter::new(io::stdout().lock());
    writeln!(
        output,
        "Window: top {} (baseline={} verified={})",
        report.top_k, report.baseline_count, report.verified_count
    )?;
    writeln!(
        output,
        "Top entity changed: {}",
        report.result.top_entity_changed
    )?;
    for delta in &report.result.deltas {
        if delta.magnitude > 0 {
            writeln!(
                output,
                "\t{}\t{} {}",
                delta.entity_id,
                delta.kind.as_str(),
                delta.magnitude
            )?;
        } else {
            writeln!(output, "\t{}\t{}", delta.entity_id, delta.kind.as_str())?;
        }
    }
    output.flush()?;
    Ok(())
}
