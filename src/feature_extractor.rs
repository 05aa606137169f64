//! Feature engineering for location classifier inference.
//!
//! This module derives the features used during model training from a
//! district profile and a business query, then lays them out in the order
//! of the trained feature-name list.

use crate::types::district::DistrictProfile;
use crate::types::query::BusinessQuery;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

/// Feature names of the competition model, in training column order.
pub const DEFAULT_FEATURE_NAMES: [&str; 28] = [
    // Raw district and target values (8)
    "Jumlah Penduduk",
    "Luas Wilayah (km²)",
    "Kepadatan (jiwa/km²)",
    "jumlah_mall",
    "jumlah_minimarket",
    "jumlah_taman",
    "jumlah_ulasan",
    "google_rating",
    // Ratios (8)
    "mall_per_capita",
    "minimarket_density",
    "taman_per_capita",
    "ulasan_per_capita",
    "competition_density",
    "market_potential",
    "infrastructure_score",
    "retail_accessibility",
    // Normalized / log (3)
    "rating_normalized",
    "log_jumlah_ulasan",
    "log_kepadatan",
    // Encoded categoricals (2)
    "kategori_resto_encoded",
    "price_range_encoded",
    // Binary flags (4)
    "high_rating",
    "excellent_rating",
    "high_volume_reviews",
    "very_high_volume_reviews",
    // Interactions (3)
    "price_category_interaction",
    "rating_review_interaction",
    "density_infrastructure",
];

/// Which formula set the trained model expects for the four market
/// features that differ between model generations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FormulaVariant {
    /// Competition model: review-based competition, additive infrastructure.
    #[default]
    Competition,
    /// Earlier model: area-normalized infrastructure and retail per 1000 residents.
    Legacy,
}

/// Every engineered value for one (district, query) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineeredFeatures {
    pub population: f64,
    pub area_km2: f64,
    pub density: f64,
    pub malls: f64,
    pub minimarkets: f64,
    pub parks: f64,
    pub reviews: f64,
    pub rating: f64,
    pub mall_per_capita: f64,
    pub minimarket_density: f64,
    pub taman_per_capita: f64,
    pub ulasan_per_capita: f64,
    pub competition_density: f64,
    pub market_potential: f64,
    pub infrastructure_score: f64,
    pub retail_accessibility: f64,
    pub rating_normalized: f64,
    pub log_jumlah_ulasan: f64,
    pub log_kepadatan: f64,
    pub kategori_resto_encoded: f64,
    pub price_range_encoded: f64,
    pub high_rating: f64,
    pub excellent_rating: f64,
    pub high_volume_reviews: f64,
    pub very_high_volume_reviews: f64,
    pub price_category_interaction: f64,
    pub rating_review_interaction: f64,
    pub density_infrastructure: f64,
}

impl EngineeredFeatures {
    /// Values keyed by training column name.
    pub fn named_values(&self) -> [(&'static str, f64); 28] {
        [
            ("Jumlah Penduduk", self.population),
            ("Luas Wilayah (km²)", self.area_km2),
            ("Kepadatan (jiwa/km²)", self.density),
            ("jumlah_mall", self.malls),
            ("jumlah_minimarket", self.minimarkets),
            ("jumlah_taman", self.parks),
            ("jumlah_ulasan", self.reviews),
            ("google_rating", self.rating),
            ("mall_per_capita", self.mall_per_capita),
            ("minimarket_density", self.minimarket_density),
            ("taman_per_capita", self.taman_per_capita),
            ("ulasan_per_capita", self.ulasan_per_capita),
            ("competition_density", self.competition_density),
            ("market_potential", self.market_potential),
            ("infrastructure_score", self.infrastructure_score),
            ("retail_accessibility", self.retail_accessibility),
            ("rating_normalized", self.rating_normalized),
            ("log_jumlah_ulasan", self.log_jumlah_ulasan),
            ("log_kepadatan", self.log_kepadatan),
            ("kategori_resto_encoded", self.kategori_resto_encoded),
            ("price_range_encoded", self.price_range_encoded),
            ("high_rating", self.high_rating),
            ("excellent_rating", self.excellent_rating),
            ("high_volume_reviews", self.high_volume_reviews),
            ("very_high_volume_reviews", self.very_high_volume_reviews),
            ("price_category_interaction", self.price_category_interaction),
            ("rating_review_interaction", self.rating_review_interaction),
            ("density_infrastructure", self.density_infrastructure),
        ]
    }

    /// Value of a named feature, if it is one this module computes.
    pub fn get(&self, name: &str) -> Option<f64> {
        self.named_values()
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| *v)
    }
}

/// Feature values in trained column order.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    names: Arc<[String]>,
    values: Vec<f64>,
}

impl FeatureVector {
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| self.values[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.names
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }

    /// Same names, transformed values (used by scalers).
    pub(crate) fn with_values(&self, values: Vec<f64>) -> Self {
        debug_assert_eq!(values.len(), self.names.len());
        Self {
            names: Arc::clone(&self.names),
            values,
        }
    }
}

/// Feature extractor that turns (district, query) pairs into model input.
///
/// Output order follows the trained feature-name list it was built with;
/// names it does not compute are filled with 0.0.
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    feature_names: Arc<[String]>,
    variant: FormulaVariant,
}

impl FeatureExtractor {
    /// Create an extractor for a trained feature-name list.
    pub fn new(feature_names: Vec<String>, variant: FormulaVariant) -> Self {
        let extractor = Self {
            feature_names: feature_names.into(),
            variant,
        };

        let missing = extractor.unknown_features();
        if !missing.is_empty() {
            warn!(
                features = ?missing,
                "Trained features without a formula will be filled with 0.0"
            );
        }

        extractor
    }

    /// Extractor for the competition model's column layout.
    pub fn with_default_names(variant: FormulaVariant) -> Self {
        Self::new(
            DEFAULT_FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
            variant,
        )
    }

    /// Compute every engineered value.
    pub fn engineer(
        &self,
        district: &DistrictProfile,
        query: &BusinessQuery,
        category_code: usize,
        price_code: usize,
    ) -> EngineeredFeatures {
        let population = district.population() as f64;
        let area = district.area_km2();
        let density = district.density();
        let malls = district.malls();
        let minimarkets = district.minimarkets();
        let parks = district.parks();
        let reviews = query.target_reviews as f64;
        let rating = query.target_rating;

        let (competition_density, market_potential, infrastructure_score, retail_accessibility) =
            match self.variant {
                FormulaVariant::Competition => (
                    reviews / area,
                    density * (malls + minimarkets),
                    malls + minimarkets + parks,
                    malls + minimarkets,
                ),
                FormulaVariant::Legacy => (
                    (malls + minimarkets) / area,
                    population * (rating / 5.0),
                    (parks + malls) / area,
                    minimarkets / (population / 1000.0),
                ),
            };

        let rating_normalized = rating / 5.0;
        let log_jumlah_ulasan = reviews.ln_1p();
        let log_kepadatan = density.ln_1p();
        let kategori_resto_encoded = category_code as f64;
        let price_range_encoded = price_code as f64;

        EngineeredFeatures {
            population,
            area_km2: area,
            density,
            malls,
            minimarkets,
            parks,
            reviews,
            rating,
            mall_per_capita: malls / population * 1000.0,
            minimarket_density: minimarkets / area,
            taman_per_capita: parks / population * 1000.0,
            ulasan_per_capita: reviews / population * 1000.0,
            competition_density,
            market_potential,
            infrastructure_score,
            retail_accessibility,
            rating_normalized,
            log_jumlah_ulasan,
            log_kepadatan,
            kategori_resto_encoded,
            price_range_encoded,
            high_rating: flag(rating >= 4.0),
            excellent_rating: flag(rating >= 4.5),
            high_volume_reviews: flag(query.target_reviews >= 100),
            very_high_volume_reviews: flag(query.target_reviews >= 500),
            price_category_interaction: price_range_encoded * kategori_resto_encoded,
            rating_review_interaction: rating_normalized * log_jumlah_ulasan,
            density_infrastructure: log_kepadatan * infrastructure_score,
        }
    }

    /// Lay engineered values out in trained column order.
    pub fn project(&self, features: &EngineeredFeatures) -> FeatureVector {
        let values = self
            .feature_names
            .iter()
            .map(|name| features.get(name).unwrap_or(0.0))
            .collect();

        FeatureVector {
            names: Arc::clone(&self.feature_names),
            values,
        }
    }

    /// Build the model input vector for a (district, query) pair.
    pub fn build(
        &self,
        district: &DistrictProfile,
        query: &BusinessQuery,
        category_code: usize,
        price_code: usize,
    ) -> FeatureVector {
        self.project(&self.engineer(district, query, category_code, price_code))
    }

    /// Trained feature names this extractor has no formula for.
    pub fn unknown_features(&self) -> Vec<&str> {
        self.feature_names
            .iter()
            .map(String::as_str)
            .filter(|name| !DEFAULT_FEATURE_NAMES.contains(name))
            .collect()
    }

    pub fn feature_count(&self) -> usize {
        self.feature_names.len()
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn variant(&self) -> FormulaVariant {
        self.variant
    }
}

fn flag(condition: bool) -> f64 {
    if condition {
        1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn andir() -> DistrictProfile {
        DistrictProfile::new("Andir", 99119, 4.22, 1.0, 20.0, 34.0).unwrap()
    }

    fn query() -> BusinessQuery {
        BusinessQuery::new("andir", "Restaurant", 2, 4.2, 100)
    }

    #[test]
    fn test_andir_scenario() {
        let extractor = FeatureExtractor::with_default_names(FormulaVariant::Competition);
        let features = extractor.build(&andir(), &query(), 3, 1);

        assert_eq!(features.len(), extractor.feature_count());
        assert_eq!(features.len(), 28);
        assert!((features.get("mall_per_capita").unwrap() - 0.01009).abs() < 1e-5);
        assert!((features.get("minimarket_density").unwrap() - 4.7393).abs() < 1e-4);
        assert!((features.get("rating_normalized").unwrap() - 0.84).abs() < 1e-12);
        assert_eq!(features.get("price_range_encoded"), Some(1.0));
        assert_eq!(features.get("kategori_resto_encoded"), Some(3.0));
        assert_eq!(features.get("price_category_interaction"), Some(3.0));
        assert_eq!(features.get("high_rating"), Some(1.0));
        assert_eq!(features.get("excellent_rating"), Some(0.0));
        assert_eq!(features.get("high_volume_reviews"), Some(1.0));
        assert_eq!(features.get("very_high_volume_reviews"), Some(0.0));
        assert_eq!(features.values()[0], 99119.0);
    }

    #[test]
    fn test_competition_formulas() {
        let extractor = FeatureExtractor::with_default_names(FormulaVariant::Competition);
        let f = extractor.engineer(&andir(), &query(), 3, 1);
        let density = 99119.0 / 4.22;

        assert!((f.competition_density - 100.0 / 4.22).abs() < 1e-9);
        assert!((f.market_potential - density * 21.0).abs() < 1e-6);
        assert_eq!(f.infrastructure_score, 55.0);
        assert_eq!(f.retail_accessibility, 21.0);
        assert!((f.log_jumlah_ulasan - 101f64.ln()).abs() < 1e-12);
        assert!((f.density_infrastructure - (1.0 + density).ln() * 55.0).abs() < 1e-9);
    }

    #[test]
    fn test_legacy_formulas() {
        let extractor = FeatureExtractor::with_default_names(FormulaVariant::Legacy);
        let f = extractor.engineer(&andir(), &query(), 3, 1);

        assert!((f.competition_density - 21.0 / 4.22).abs() < 1e-9);
        assert!((f.market_potential - 99119.0 * 0.84).abs() < 1e-6);
        assert!((f.infrastructure_score - 35.0 / 4.22).abs() < 1e-9);
        assert!((f.retail_accessibility - 20.0 / 99.119).abs() < 1e-9);
        // Shared formulas are unchanged
        assert!((f.minimarket_density - 20.0 / 4.22).abs() < 1e-9);
    }

    #[test]
    fn test_projection_follows_supplied_order() {
        let names = vec![
            "google_rating".to_string(),
            "weather_index".to_string(),
            "jumlah_ulasan".to_string(),
        ];
        let extractor = FeatureExtractor::new(names, FormulaVariant::Competition);
        let features = extractor.build(&andir(), &query(), 0, 0);

        assert_eq!(features.values(), &[4.2, 0.0, 100.0]);
        assert_eq!(extractor.unknown_features(), vec!["weather_index"]);
    }

    #[test]
    fn test_features_are_finite() {
        let extractor = FeatureExtractor::with_default_names(FormulaVariant::Competition);
        let sparse = DistrictProfile::new("Sepi", 1, 0.01, 0.0, 0.0, 0.0).unwrap();
        let zero = BusinessQuery::new("sepi", "Cafe", 1, 1.0, 0);

        for (district, query) in [(andir(), query()), (sparse, zero)] {
            let features = extractor.build(&district, &query, 0, 0);
            assert!(features.iter().all(|(_, v)| v.is_finite()));
        }
    }
}
