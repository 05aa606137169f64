//! Prediction statistics tracking for the location engine.

use crate::types::prediction::{PredictionResult, RiskLevel};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::{Duration, Instant};
use tracing::info;

/// Metrics collector for a run of assessments
pub struct PredictionMetrics {
    /// Successful predictions
    pub predictions: AtomicU64,
    /// Queries rejected by business validation
    pub rejections: AtomicU64,
    /// Queries that failed on input, district lookup or inference
    pub failures: AtomicU64,
    /// Predictions by decoded label
    by_label: RwLock<BTreeMap<String, u64>>,
    /// Predictions by risk level
    by_risk_level: RwLock<BTreeMap<String, u64>>,
    /// Prediction times (in microseconds)
    prediction_times: RwLock<Vec<u64>>,
    /// Risk score distribution buckets
    score_buckets: RwLock<[u64; 10]>,
    /// Start time for rate calculation
    start_time: Instant,
}

impl PredictionMetrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            predictions: AtomicU64::new(0),
            rejections: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            by_label: RwLock::new(BTreeMap::new()),
            by_risk_level: RwLock::new(BTreeMap::new()),
            prediction_times: RwLock::new(Vec::with_capacity(1000)),
            score_buckets: RwLock::new([0; 10]),
            start_time: Instant::now(),
        }
    }

    /// Record a successful prediction
    pub fn record_prediction(&self, elapsed: Duration, result: &PredictionResult) {
        self.predictions.fetch_add(1, Ordering::Relaxed);

        if let Ok(mut times) = self.prediction_times.write() {
            times.push(elapsed.as_micros() as u64);
            // Keep only last 10000
            if times.len() > 10000 {
                times.drain(0..5000);
            }
        }

        if let Ok(mut by_label) = self.by_label.write() {
            *by_label.entry(result.label.clone()).or_insert(0) += 1;
        }

        if let Ok(mut by_level) = self.by_risk_level.write() {
            *by_level.entry(risk_level_name(result.risk_level).to_string()).or_insert(0) += 1;
        }

        let bucket = (result.risk_score.clamp(0.0, 1.0) * 10.0).min(9.0) as usize;
        if let Ok(mut buckets) = self.score_buckets.write() {
            buckets[bucket] += 1;
        }
    }

    /// Record a query rejected by validation
    pub fn record_rejection(&self) {
        self.rejections.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a query that could not be assessed
    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Get prediction time statistics
    pub fn get_timing_stats(&self) -> TimingStats {
        let mut sorted = match self.prediction_times.read() {
            Ok(times) if !times.is_empty() => times.clone(),
            _ => return TimingStats::default(),
        };
        sorted.sort_unstable();

        let sum: u64 = sorted.iter().sum();
        let count = sorted.len();
        let percentile = |p: f64| sorted[((count as f64 * p) as usize).min(count - 1)];

        TimingStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: percentile(0.5),
            p95_us: percentile(0.95),
            p99_us: percentile(0.99),
            max_us: sorted[count - 1],
        }
    }

    /// Get current throughput (queries per second)
    pub fn get_throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.total() as f64 / elapsed
        } else {
            0.0
        }
    }

    /// All queries seen, whatever their outcome
    pub fn total(&self) -> u64 {
        self.predictions.load(Ordering::Relaxed)
            + self.rejections.load(Ordering::Relaxed)
            + self.failures.load(Ordering::Relaxed)
    }

    pub fn get_score_distribution(&self) -> [u64; 10] {
        self.score_buckets.read().map(|b| *b).unwrap_or_default()
    }

    pub fn get_by_label(&self) -> BTreeMap<String, u64> {
        self.by_label.read().map(|m| m.clone()).unwrap_or_default()
    }

    pub fn get_by_risk_level(&self) -> BTreeMap<String, u64> {
        self.by_risk_level.read().map(|m| m.clone()).unwrap_or_default()
    }

    /// Print summary statistics
    pub fn print_summary(&self) {
        let predictions = self.predictions.load(Ordering::Relaxed);
        let rejections = self.rejections.load(Ordering::Relaxed);
        let failures = self.failures.load(Ordering::Relaxed);
        let total = self.total();
        let rejection_rate = if total > 0 {
            (rejections as f64 / total as f64) * 100.0
        } else {
            0.0
        };

        let timing = self.get_timing_stats();
        let throughput = self.get_throughput();
        let score_dist = self.get_score_distribution();

        info!("╔══════════════════════════════════════════════════════════════╗");
        info!("║            FNB LOCATION ENGINE - ASSESSMENT SUMMARY          ║");
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Queries: {:>8}  │  Throughput: {:>8.1} q/s                ║",
            total, throughput
        );
        info!(
            "║ Predicted: {:>6}  │  Rejected: {:>6} ({:>5.1}%)  │  Failed: {:>4} ║",
            predictions, rejections, rejection_rate, failures
        );
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Prediction Time (μs): mean={:>5} p50={:>5} p95={:>5} p99={:>5} ║",
            timing.mean_us, timing.p50_us, timing.p95_us, timing.p99_us
        );
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!("║ Recommendations:                                             ║");
        for (label, count) in &self.get_by_label() {
            info!("║   {:10}: {:>6} ({:>5.1}%)", label, count, share(*count, predictions));
        }
        info!("║ Risk Levels:                                                 ║");
        for (level, count) in &self.get_by_risk_level() {
            info!("║   {:10}: {:>6} ({:>5.1}%)", level, count, share(*count, predictions));
        }
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!("║ Risk Score Distribution:                                     ║");
        for (i, &count) in score_dist.iter().enumerate() {
            let pct = share(count, predictions);
            let bar: String = "█".repeat(((pct / 2.0) as usize).min(20));
            info!(
                "║   {:.1}-{:.1}: {:>6} ({:>5.1}%) {}",
                i as f64 / 10.0,
                (i + 1) as f64 / 10.0,
                count,
                pct,
                bar
            );
        }
        info!("╚══════════════════════════════════════════════════════════════╝");
    }
}

impl Default for PredictionMetrics {
    fn default() -> Self {
        Self::new()
    }
}

fn share(count: u64, total: u64) -> f64 {
    if total > 0 {
        (count as f64 / total as f64) * 100.0
    } else {
        0.0
    }
}

fn risk_level_name(level: RiskLevel) -> &'static str {
    match level {
        RiskLevel::Low => "low",
        RiskLevel::Medium => "medium",
        RiskLevel::High => "high",
    }
}

/// Prediction time statistics
#[derive(Debug, Default)]
pub struct TimingStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(label: &str, risk_score: f64, risk_level: RiskLevel) -> PredictionResult {
        PredictionResult {
            label: label.to_string(),
            recommendation: None,
            class_probabilities: Vec::new(),
            confidence: 0.8,
            rating_estimate: 4.2,
            saturation: 0.0005,
            competition_density: 3.0,
            risk_score,
            risk_level,
            warnings: Vec::new(),
        }
    }

    #[test]
    fn test_metrics_recording() {
        let metrics = PredictionMetrics::new();

        metrics.record_prediction(Duration::from_micros(100), &result("Go", 0.25, RiskLevel::Low));
        metrics.record_prediction(Duration::from_micros(300), &result("Avoid", 1.0, RiskLevel::High));
        metrics.record_rejection();
        metrics.record_failure();

        assert_eq!(metrics.predictions.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.total(), 4);
        assert_eq!(metrics.get_by_label().get("Go"), Some(&1));
        assert_eq!(metrics.get_by_risk_level().get("high"), Some(&1));

        let buckets = metrics.get_score_distribution();
        assert_eq!(buckets[2], 1);
        assert_eq!(buckets[9], 1);
    }

    #[test]
    fn test_timing_stats() {
        let metrics = PredictionMetrics::new();
        assert_eq!(metrics.get_timing_stats().count, 0);

        for micros in [100, 200, 300, 400] {
            metrics.record_prediction(
                Duration::from_micros(micros),
                &result("Consider", 0.5, RiskLevel::Medium),
            );
        }

        let stats = metrics.get_timing_stats();
        assert_eq!(stats.count, 4);
        assert_eq!(stats.mean_us, 250);
        assert_eq!(stats.p50_us, 300);
        assert_eq!(stats.max_us, 400);
    }
}
