use std::io::{self, Write};

use anyhow::Result;
use tracing::info;

use crate::cli::RegistryArgs;
use crate::model::RegistryReport;
use crate::registry::ModelRegistry;
use crate::util::write_json_stdout;

pub fn run(args: RegistryArgs) -> Result<()> {
    let registry = ModelRegistry::resolve(args.registry_path.as_deref())?;
    let source = args
        .registry_path
        .as_ref()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "builtin".to_string());

    let report = RegistryReport {
        source,
        fingerprint: registry.fingerprint(),
        total_models: registry.total_models(),
        weight_sum: registry.weight_sum(),
        models: registry.descriptors().to_vec(),
    };

    info!(
        source = %report.source,
        total_models = report.total_models,
        fingerprint = %report.fingerprint,
        "model registry validated"
    );

    if args.json {
        return write_json_stdout(&report);
    }

    let mut output = io::BufWriter::new(io::stdout().lock());
    writeln!(output, "Registry: {}", report.source)?;
    writeln!(
        output,
        "Models: {} weight_sum={:.6} fingerprint={}",
        report.total_models, report.weight_sum, report.fingerprint
    )?;
    for (index, model) in report.models.iter().enumerate() {
        writeln!(
            output,
            "{}.\t{}\t{}\tweight={:.4}",
            index + 1,
            model.key,
            model.display_name,
            model.weight
        )?;
    }
    output.flush()?;
    Ok(())
}
