//! Business query supplied by the caller for one prediction

use serde::{Deserialize, Serialize};

fn new_query_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// The business intent to assess against a district.
///
/// Field aliases accept the column names of the original survey datasets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessQuery {
    /// Caller-supplied identifier, generated when absent
    #[serde(default = "new_query_id")]
    pub query_id: String,

    /// District key or name (resolved against the district table)
    #[serde(alias = "kecamatan")]
    pub district: String,

    /// Restaurant category from the trained vocabulary
    #[serde(alias = "kategori_resto")]
    pub category: String,

    /// Price tier 1 (budget) to 4 (luxury)
    #[serde(alias = "price_range")]
    pub price_tier: i64,

    /// Target Google rating, 1.0 to 5.0
    #[serde(alias = "google_rating")]
    pub target_rating: f64,

    /// Target review count after two years
    #[serde(alias = "jumlah_ulasan")]
    pub target_reviews: u32,
}

impl BusinessQuery {
    /// Create a query with a generated identifier
    pub fn new(
        district: &str,
        category: &str,
        price_tier: i64,
        target_rating: f64,
        target_reviews: u32,
    ) -> Self {
        Self {
            query_id: new_query_id(),
            district: district.to_string(),
            category: category.to_string(),
            price_tier,
            target_rating,
            target_reviews,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_accepts_dataset_column_names() {
        let json = r#"{
            "kecamatan": "andir",
            "kategori_resto": "Restaurant",
            "price_range": 2,
            "google_rating": 4.2,
            "jumlah_ulasan": 100
        }"#;

        let query: BusinessQuery = serde_json::from_str(json).unwrap();

        assert_eq!(query.district, "andir");
        assert_eq!(query.category, "Restaurant");
        assert_eq!(query.price_tier, 2);
        assert_eq!(query.target_reviews, 100);
        assert!(!query.query_id.is_empty());
    }

    #[test]
    fn test_negative_reviews_rejected() {
        let json = r#"{"district":"andir","category":"Cafe","price_tier":1,
                       "target_rating":4.0,"target_reviews":-5}"#;
        assert!(serde_json::from_str::<BusinessQuery>(json).is_err());
    }
}
