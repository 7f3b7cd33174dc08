use std::io::{self, Write};

use anyhow::Result;
use tracing::info;

use crate::cli::ScoreArgs;
use crate::confidence::{confidence_level, normalize_score, to_percentage};
use crate::model::ScoreReading;
use crate::util::write_json_stdout;

pub fn run(args: ScoreArgs) -> Result<()> {
    let readings = read_scores(&args.values, args.decimals);
    info!(count = readings.len(), "scores normalized");

    if args.json {
        return write_json_stdout(&readings);
    }

    let mut output = io::BufWriter::new(io::stdout().lock());
    for reading in &readings {
        writeln!(
            output,
            "{}\tnormalized={}\t{}%\t{}",
            reading.raw,
            reading.normalized,
            reading.percent,
            reading.level.as_str()
        )?;
    }
    output.flush()?;
    Ok(())
}

fn read_scores(values: &[f64], decimals: u32) -> Vec<ScoreReading> {
    values
        .iter()
        .map(|raw| {
            let normalized = normalize_score(*raw);
            ScoreReading {
                raw: *raw,
                normalized,
                percent: to_percentage(normalized, decimals),
                level: confidence_level(normalized),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::read_scores;
    use crate::confidence::ConfidenceLevel;

    #[test]
    fn mixed_scales_share_one_reading_scale() {
        let readings = read_scores(&[87.5, 0.875, 0.3], 1);

        assert_eq!(readings[0].normalized, readings[1].normalized);
        assert_eq!(readings[0].percent, "87.5");
        assert_eq!(readings[0].level, ConfidenceLevel::High);
        assert_eq!(readings[2].level, ConfidenceLevel::Critical);
    }
}
