//! FnB Location Engine - Main Entry Point
//!
//! Reads business queries as JSON lines, assesses each against the Bandung
//! district table with the trained classifier, and writes one JSON report
//! per query to stdout.

use anyhow::{Context, Result};
use clap::Parser;
use fnb_location_engine::{
    config::{AppConfig, LoggingConfig},
    metrics::PredictionMetrics,
    models::{Classifier, PredictionEngine},
    types::{BusinessQuery, DistrictTable},
    PredictError,
};
use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "fnb-location-engine",
    about = "Assess restaurant locations in Bandung from JSON-lines queries"
)]
struct Cli {
    /// Configuration file
    #[arg(long, default_value = "config/config.toml")]
    config: PathBuf,

    /// JSON-lines query file; reads stdin when omitted
    #[arg(long)]
    input: Option<PathBuf>,

    /// Print the district table and exit
    #[arg(long)]
    district_list: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load_from_path(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    init_tracing(&config.logging)?;

    info!("Starting FnB Location Engine");

    let districts = match &config.districts.path {
        Some(path) => DistrictTable::load(path)?,
        None => DistrictTable::bandung()?,
    };
    info!(districts = districts.len(), "District table ready");

    if cli.district_list {
        return print_districts(&districts);
    }

    let engine = PredictionEngine::from_config(&config)?;
    let thresholds = engine.risk_scorer().thresholds();
    info!(
        formula = ?engine.extractor().variant(),
        categories = engine.categories().len(),
        classes = ?engine.labels().iter().collect::<Vec<_>>(),
        "Risk levels: low<={:.2}, medium<={:.2}",
        thresholds.low,
        thresholds.medium
    );

    let reader: Box<dyn BufRead> = match &cli.input {
        Some(path) => Box::new(BufReader::new(
            std::fs::File::open(path)
                .with_context(|| format!("Failed to open {}", path.display()))?,
        )),
        None => Box::new(BufReader::new(std::io::stdin())),
    };

    let metrics = PredictionMetrics::new();
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    for (line_no, line) in reader.lines().enumerate() {
        let line = line.context("Failed to read query input")?;
        if line.trim().is_empty() {
            continue;
        }

        let query: BusinessQuery = match serde_json::from_str(&line) {
            Ok(query) => query,
            Err(e) => {
                warn!(line = line_no + 1, error = %e, "Failed to deserialize query");
                metrics.record_failure();
                continue;
            }
        };

        let record = assess_query(&engine, &districts, &query, &metrics);
        writeln!(out, "{}", record).context("Failed to write report")?;
    }

    out.flush()?;
    info!("Input exhausted, shutting down");
    metrics.print_summary();

    Ok(())
}

fn assess_query<C: Classifier>(
    engine: &PredictionEngine<C>,
    districts: &DistrictTable,
    query: &BusinessQuery,
    metrics: &PredictionMetrics,
) -> serde_json::Value {
    let start_time = Instant::now();

    match engine.assess(districts, query) {
        Ok(report) => {
            let elapsed = start_time.elapsed();
            metrics.record_prediction(elapsed, &report.result);
            debug!(
                query_id = %query.query_id,
                label = %report.result.label,
                risk_score = report.result.risk_score,
                processing_time_us = elapsed.as_micros(),
                "Query assessed"
            );
            serde_json::to_value(&report).unwrap_or_else(|e| {
                json!({ "query_id": query.query_id, "status": "failed", "error": e.to_string() })
            })
        }
        Err(PredictError::Rejected(outcome)) => {
            metrics.record_rejection();
            info!(
                query_id = %query.query_id,
                errors = ?outcome.errors,
                "Query rejected"
            );
            json!({
                "query_id": query.query_id,
                "status": "rejected",
                "errors": outcome.errors,
                "warnings": outcome.warnings,
            })
        }
        Err(e) => {
            metrics.record_failure();
            error!(query_id = %query.query_id, error = %e, "Assessment failed");
            json!({ "query_id": query.query_id, "status": "failed", "error": e.to_string() })
        }
    }
}

fn print_districts(districts: &DistrictTable) -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for district in districts.iter() {
        let row = json!({
            "key": district.key(),
            "name": district.name(),
            "population": district.population(),
            "area_km2": district.area_km2(),
            "density": district.density().round(),
            "competition": district.competition(),
            "description": district.description(),
        });
        writeln!(out, "{}", row)?;
    }
    Ok(())
}

fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("fnb_location_engine={}", logging.level)))
        .context("Invalid log level")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match logging.format.as_str() {
        "json" => builder.json().init(),
        _ => builder.init(),
    }

    Ok(())
}
