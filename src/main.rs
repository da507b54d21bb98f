use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context};
use clap::Parser;
use rayon::prelude::*;

use algae_risk_lib::config::Config;
use algae_risk_lib::errors::AlgaeRiskError;
use algae_risk_lib::history::{load_history_csv, HistoricalRecord};
use algae_risk_lib::image_io::{collect_inputs, load_image, load_measurement, save_image, InputFile, InputKind};
use algae_risk_lib::output::{write_json_report, write_summary_csv, SummaryEntry};
use algae_risk_lib::pipeline::{analyze_image, analyze_measurement_with_context, render_overlay, Report};
use algae_risk_lib::risk::AssessmentContext;

/// Command-line arguments
#[derive(Parser, Debug)]
#[clap(author, version, about = "algae_risk - Algae bloom risk from satellite indices and photographs")]
struct Args {
    /// Path to input file or directory
    #[clap(short, long)]
    input: Option<String>,

    /// Path to output directory
    #[clap(short, long)]
    output: Option<String>,

    /// Path to configuration file
    #[clap(short, long, default_value = "config.toml")]
    config: String,

    /// Monthly history CSV (date,chlorophyll_a,ndvi,fai,severity,coverage_estimate)
    #[clap(long)]
    history: Option<PathBuf>,

    /// Month (1-12) used for seasonal weighting instead of the acquisition date
    #[clap(short, long, value_parser = clap::value_parser!(u32).range(1..=12))]
    month: Option<u32>,

    /// Enable debug logging
    #[clap(short, long)]
    debug: bool,
}

/// Level forced over `RUST_LOG`; only `--debug` overrides the environment
fn log_level_override(debug: bool) -> Option<log::LevelFilter> {
    debug.then_some(log::LevelFilter::Debug)
}

fn load_config(path: &str) -> anyhow::Result<Config> {
    if Path::new(path).exists() {
        Ok(Config::from_file(path)?)
    } else {
        log::info!("No configuration at {}, using defaults", path);
        Ok(Config::default())
    }
}

/// Analyse one input and write its report; `Ok(None)` when the input carried no data
fn process_input(
    input: &InputFile,
    config: &Config,
    history: &[HistoricalRecord],
    month: Option<u32>,
) -> anyhow::Result<Option<SummaryEntry>> {
    let output_base = Path::new(&config.output_base_dir);

    let report = match input.kind {
        InputKind::Measurement => {
            let measurement = load_measurement(&input.path)
                .with_context(|| format!("reading measurement {}", input.path.display()))?;
            let mut context = AssessmentContext::from_metadata(measurement.metadata());
            if let Some(month) = month {
                context = context.with_month(month);
            }
            match analyze_measurement_with_context(&measurement, history, config, &context) {
                Ok(report) => Report::Satellite(report),
                Err(AlgaeRiskError::DataUnavailable(reason)) => {
                    log::warn!("Skipping {}: {}", input.name, reason);
                    return Ok(None);
                }
                Err(e) => return Err(e.into()),
            }
        }
        InputKind::Photo => {
            let image = load_image(&input.path)
                .with_context(|| format!("decoding image {}", input.path.display()))?;
            let report = match analyze_image(&image, config) {
                Ok(report) => report,
                Err(AlgaeRiskError::DataUnavailable(reason)) => {
                    log::warn!("Skipping {}: {}", input.name, reason);
                    return Ok(None);
                }
                Err(e) => return Err(e.into()),
            };
            if config.write_overlays {
                if let Some(overlay) = render_overlay(&image, &report, config) {
                    let overlay_path = output_base.join("overlays").join(format!("{}.png", input.name));
                    save_image(&overlay, &overlay_path)?;
                }
            }
            Report::Image(report)
        }
    };

    let path = write_json_report(&report, output_base, &input.name)?;
    log::info!("{}: {} risk, report at {}", input.name, report.risk_level(), path.display());

    Ok(Some(SummaryEntry {
        name: input.name.clone(),
        report,
    }))
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut logger = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if let Some(level) = log_level_override(args.debug) {
        logger.filter_level(level);
    }
    logger.init();

    let mut config = load_config(&args.config)?;

    if let Some(input) = args.input.clone() {
        config.input_path = input;
    }

    if let Some(output) = args.output.clone() {
        config.output_base_dir = output;
    }

    config.validate()?;
    config.prepare_output_dirs()?;

    let history = match &args.history {
        Some(path) => load_history_csv(path).with_context(|| format!("loading history {}", path.display()))?,
        None => Vec::new(),
    };

    let start_time = Instant::now();

    let input_path = PathBuf::from(&config.input_path);
    let inputs = if input_path.is_file() {
        vec![InputFile::new(&input_path)?]
    } else if input_path.is_dir() {
        let inputs = collect_inputs(&input_path)?;
        log::info!("Found {} input files in {}", inputs.len(), input_path.display());
        inputs
    } else {
        bail!(AlgaeRiskError::InvalidPath(input_path));
    };

    let run = |input: &InputFile| match process_input(input, &config, &history, args.month) {
        Ok(entry) => entry,
        Err(e) => {
            log::error!("Failed to process {}: {:#}", input.path.display(), e);
            None
        }
    };

    let entries: Vec<SummaryEntry> = if config.use_parallel {
        inputs.par_iter().filter_map(run).collect()
    } else {
        inputs.iter().filter_map(run).collect()
    };

    let summary_path = write_summary_csv(&entries, &config.output_base_dir)?;
    log::info!(
        "Processed {}/{} inputs in {:.2} seconds, summary at {}",
        entries.len(),
        inputs.len(),
        start_time.elapsed().as_secs_f64(),
        summary_path.display()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_debug_flag_overrides_environment_filter() {
        assert_eq!(log_level_override(false), None);
        assert_eq!(log_level_override(true), Some(log::LevelFilter::Debug));
    }

    #[test]
    fn missing_config_file_gives_defaults() {
        let config = load_config("/definitely/not/here/config.toml").unwrap();
        assert_eq!(config.forecast.horizon_days, Config::default().forecast.horizon_days);
    }
}
