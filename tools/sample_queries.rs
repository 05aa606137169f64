//! Sample Query Generator
//!
//! Writes random business queries as JSON lines for exercising the engine:
//! `sample_queries --count 50 | fnb-location-engine`

use anyhow::Context;
use clap::Parser;
use fnb_location_engine::types::{BusinessQuery, DistrictTable};
use rand::seq::SliceRandom;
use rand::Rng;
use std::io::Write;
use std::path::PathBuf;
use tracing::info;

const DEFAULT_CATEGORIES: [&str; 6] = [
    "Bakery",
    "Cafe",
    "Chinese Restaurant",
    "Fast Food",
    "Indonesian Restaurant",
    "Restaurant",
];

#[derive(Parser)]
#[command(name = "sample_queries", about = "Generate random JSON-lines business queries")]
struct Cli {
    /// Number of queries to generate
    #[arg(long, default_value_t = 100)]
    count: u64,

    /// Share of queries with implausible targets
    #[arg(long, default_value_t = 0.1)]
    implausible_rate: f64,

    /// Category vocabulary (JSON array); a small built-in list otherwise
    #[arg(long)]
    categories: Option<PathBuf>,
}

/// Random query generator over the district table
struct QueryGenerator {
    rng: rand::rngs::ThreadRng,
    districts: Vec<String>,
    categories: Vec<String>,
    counter: u64,
}

impl QueryGenerator {
    fn new(districts: Vec<String>, categories: Vec<String>) -> Self {
        Self {
            rng: rand::thread_rng(),
            districts,
            categories,
            counter: 0,
        }
    }

    fn base(&mut self, target_rating: f64, target_reviews: u32) -> BusinessQuery {
        self.counter += 1;
        let district = self.districts.choose(&mut self.rng).cloned().unwrap_or_default();
        let category = self.categories.choose(&mut self.rng).cloned().unwrap_or_default();
        let price_tier = self.rng.gen_range(1..=4);

        let mut query =
            BusinessQuery::new(&district, &category, price_tier, target_rating, target_reviews);
        query.query_id = format!("q_{:08}", self.counter);
        query
    }

    /// Targets inside the historical norms
    fn generate_plausible(&mut self) -> BusinessQuery {
        let rating = (self.rng.gen_range(3.5..4.7_f64) * 10.0).round() / 10.0;
        let reviews = self.rng.gen_range(20..400);
        self.base(rating, reviews)
    }

    /// Targets the validator should block
    fn generate_implausible(&mut self) -> BusinessQuery {
        let (rating, reviews) = match self.rng.gen_range(0..3) {
            0 => (4.9, self.rng.gen_range(250..1000)),
            1 => (4.0, self.rng.gen_range(5001..8000)),
            _ => (2.5, self.rng.gen_range(10..200)),
        };
        self.base(rating, reviews)
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("sample_queries=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let categories: Vec<String> = match &cli.categories {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&json)
                .with_context(|| format!("Failed to parse {}", path.display()))?
        }
        None => DEFAULT_CATEGORIES.iter().map(|s| s.to_string()).collect(),
    };

    let districts: Vec<String> = DistrictTable::bandung()?
        .iter()
        .map(|d| d.name().to_string())
        .collect();

    info!(
        count = cli.count,
        implausible_rate = cli.implausible_rate,
        districts = districts.len(),
        categories = categories.len(),
        "Generating queries"
    );

    let mut generator = QueryGenerator::new(districts, categories);
    let mut rng = rand::thread_rng();
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    for _ in 0..cli.count {
        let query = if rng.gen_bool(cli.implausible_rate.clamp(0.0, 1.0)) {
            generator.generate_implausible()
        } else {
            generator.generate_plausible()
        };
        writeln!(out, "{}", serde_json::to_string(&query)?)?;
    }

    info!("Done");
    Ok(())
}
