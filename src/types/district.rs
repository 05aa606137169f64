//! District (kecamatan) reference data

use crate::error::DistrictError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

/// Built-in reference table for Kota Bandung (30 kecamatan).
const BANDUNG_DISTRICTS: &str = include_str!("../../data/bandung_districts.json");

/// Minimum similarity for a fuzzy district-name match.
pub const FUZZY_MATCH_THRESHOLD: f64 = 0.6;

/// Administrative prefixes stripped from free-text district names.
const NAME_PREFIXES: [&str; 3] = ["kecamatan ", "kec. ", "kec "];

/// Spellings seen in scraped data mapped to the reference spelling.
const NAME_CORRECTIONS: [(&str, &str); 5] = [
    ("Ujungberung", "Ujung Berung"),
    ("Buah Batu", "Buahbatu"),
    ("Kiara Condong", "Kiaracondong"),
    ("Astana Anyar", "Astanaanyar"),
    ("Sumurbandung", "Sumur Bandung"),
];

/// Market competition level of a district, as observed in review volumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CompetitionLevel {
    VeryHigh,
    High,
    MediumHigh,
    #[default]
    Medium,
    MediumLow,
    Low,
}

/// Realistic two-year review targets for a competition level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ReviewRange {
    pub min: u32,
    pub recommended: u32,
    pub max: u32,
}

impl ReviewRange {
    pub fn contains(&self, reviews: u32) -> bool {
        (self.min..=self.max).contains(&reviews)
    }
}

impl CompetitionLevel {
    pub fn review_range(&self) -> ReviewRange {
        let (min, recommended, max) = match self {
            CompetitionLevel::VeryHigh => (500, 800, 1500),
            CompetitionLevel::High => (200, 400, 800),
            CompetitionLevel::MediumHigh => (150, 300, 600),
            CompetitionLevel::Medium => (80, 150, 400),
            CompetitionLevel::MediumLow => (50, 100, 250),
            CompetitionLevel::Low => (20, 60, 150),
        };
        ReviewRange {
            min,
            recommended,
            max,
        }
    }
}

/// Raw district record as stored in the reference JSON.
#[derive(Debug, Clone, Deserialize)]
struct DistrictRecord {
    #[serde(default)]
    key: Option<String>,
    name: String,
    population: u64,
    area_km2: f64,
    /// Published density; derived from population and area when absent.
    #[serde(default)]
    density: Option<f64>,
    malls: f64,
    minimarkets: f64,
    parks: f64,
    #[serde(default)]
    description: String,
    #[serde(default)]
    competition: Option<CompetitionLevel>,
}

/// Static demographic and infrastructure profile of one district.
///
/// Construction validates population > 0, area > 0 and non-negative
/// infrastructure counts, so downstream ratios are always finite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DistrictRecord")]
pub struct DistrictProfile {
    key: String,
    name: String,
    population: u64,
    area_km2: f64,
    density: f64,
    malls: f64,
    minimarkets: f64,
    parks: f64,
    description: String,
    competition: CompetitionLevel,
}

impl DistrictProfile {
    /// Create a profile; density is derived as population / area.
    pub fn new(
        name: &str,
        population: u64,
        area_km2: f64,
        malls: f64,
        minimarkets: f64,
        parks: f64,
    ) -> Result<Self, DistrictError> {
        Self::try_from(DistrictRecord {
            key: None,
            name: name.to_string(),
            population,
            area_km2,
            density: None,
            malls,
            minimarkets,
            parks,
            description: String::new(),
            competition: None,
        })
    }

    pub fn with_competition(mut self, competition: CompetitionLevel) -> Self {
        self.competition = competition;
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn population(&self) -> u64 {
        self.population
    }

    pub fn area_km2(&self) -> f64 {
        self.area_km2
    }

    /// Residents per km².
    pub fn density(&self) -> f64 {
        self.density
    }

    pub fn malls(&self) -> f64 {
        self.malls
    }

    pub fn minimarkets(&self) -> f64 {
        self.minimarkets
    }

    pub fn parks(&self) -> f64 {
        self.parks
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn competition(&self) -> CompetitionLevel {
        self.competition
    }
}

impl TryFrom<DistrictRecord> for DistrictProfile {
    type Error = DistrictError;

    fn try_from(record: DistrictRecord) -> Result<Self, Self::Error> {
        let key = record
            .key
            .clone()
            .unwrap_or_else(|| district_key(&record.name));
        let invalid = |reason: String| DistrictError::InvalidRecord {
            key: key.clone(),
            reason,
        };

        if record.population == 0 {
            return Err(invalid("population must be positive".to_string()));
        }
        if !(record.area_km2.is_finite() && record.area_km2 > 0.0) {
            return Err(invalid(format!(
                "area must be positive, got {}",
                record.area_km2
            )));
        }
        for (field, value) in [
            ("malls", record.malls),
            ("minimarkets", record.minimarkets),
            ("parks", record.parks),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(invalid(format!("{field} must be non-negative, got {value}")));
            }
        }

        let density = match record.density {
            Some(d) if d.is_finite() && d > 0.0 => d,
            Some(d) => return Err(invalid(format!("density must be positive, got {d}"))),
            None => record.population as f64 / record.area_km2,
        };

        Ok(Self {
            key,
            name: record.name,
            population: record.population,
            area_km2: record.area_km2,
            density,
            malls: record.malls,
            minimarkets: record.minimarkets,
            parks: record.parks,
            description: record.description,
            competition: record.competition.unwrap_or_default(),
        })
    }
}

/// Keyed, immutable lookup of district profiles.
#[derive(Debug, Clone, Default)]
pub struct DistrictTable {
    districts: BTreeMap<String, DistrictProfile>,
}

impl DistrictTable {
    /// Build a table, rejecting duplicate keys.
    pub fn new(profiles: Vec<DistrictProfile>) -> Result<Self, DistrictError> {
        let mut districts = BTreeMap::new();
        for profile in profiles {
            let key = profile.key().to_string();
            if districts.insert(key.clone(), profile).is_some() {
                return Err(DistrictError::DuplicateKey(key));
            }
        }
        Ok(Self { districts })
    }

    /// The built-in Bandung reference table.
    pub fn bandung() -> Result<Self> {
        Self::from_json_str(BANDUNG_DISTRICTS).context("Built-in Bandung district table is invalid")
    }

    /// Parse a JSON array of district records.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let profiles: Vec<DistrictProfile> =
            serde_json::from_str(json).context("Failed to parse district records")?;
        Ok(Self::new(profiles)?)
    }

    /// Load a district table from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read district table {}", path.display()))?;
        let table = Self::from_json_str(&json)?;

        info!(
            path = %path.display(),
            districts = table.len(),
            "District table loaded"
        );

        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.districts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.districts.is_empty()
    }

    /// Exact lookup by district key.
    pub fn get(&self, key: &str) -> Option<&DistrictProfile> {
        self.districts.get(key)
    }

    /// All districts in key order.
    pub fn iter(&self) -> impl Iterator<Item = &DistrictProfile> {
        self.districts.values()
    }

    /// Resolve a key or a free-text district name.
    ///
    /// Tries the key as given, then the standardized name's key, then the
    /// most similar district name above [`FUZZY_MATCH_THRESHOLD`].
    pub fn resolve(&self, name: &str) -> Result<&DistrictProfile, DistrictError> {
        if let Some(profile) = self.districts.get(name) {
            return Ok(profile);
        }

        let standardized = standardize_name(name);
        if let Some(profile) = self.districts.get(&district_key(&standardized)) {
            return Ok(profile);
        }

        let target = standardized.to_lowercase();
        let best = self
            .districts
            .values()
            .map(|p| (similarity(&target, &p.name().to_lowercase()), p))
            .filter(|(score, _)| *score > FUZZY_MATCH_THRESHOLD)
            .fold(None::<(f64, &DistrictProfile)>, |best, candidate| match best {
                Some(b) if b.0 >= candidate.0 => Some(b),
                _ => Some(candidate),
            });

        match best {
            Some((score, profile)) => {
                debug!(
                    input = %name,
                    matched = %profile.name(),
                    similarity = score,
                    "Fuzzy district match"
                );
                Ok(profile)
            }
            None => Err(DistrictError::NotFound(name.to_string())),
        }
    }
}

/// Standardize a free-text district name: drop administrative prefixes,
/// collapse whitespace, title-case, and apply known spelling corrections.
pub fn standardize_name(raw: &str) -> String {
    let trimmed = raw.trim();
    let lower = trimmed.to_lowercase();
    let without_prefix = NAME_PREFIXES
        .iter()
        .find(|prefix| lower.starts_with(*prefix))
        .and_then(|prefix| trimmed.get(prefix.len()..))
        .unwrap_or(trimmed);

    let titled = without_prefix
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ");

    NAME_CORRECTIONS
        .iter()
        .find(|(from, _)| *from == titled)
        .map(|(_, to)| to.to_string())
        .unwrap_or(titled)
}

/// Lookup key for a district name (`"Sumur Bandung"` -> `"sumur_bandung"`).
pub fn district_key(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("_")
}

/// Ratcliff/Obershelp similarity in [0, 1]: twice the number of matching
/// characters over the combined length.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matching_chars(&a, &b) as f64 / total as f64
}

fn matching_chars(a: &[char], b: &[char]) -> usize {
    // Longest common substring, earliest on ties.
    let mut best = (0usize, 0usize, 0usize);
    let mut prev = vec![0usize; b.len() + 1];
    for i in 0..a.len() {
        let mut cur = vec![0usize; b.len() + 1];
        for j in 0..b.len() {
            if a[i] == b[j] {
                cur[j + 1] = prev[j] + 1;
                if cur[j + 1] > best.0 {
                    best = (cur[j + 1], i + 1 - cur[j + 1], j + 1 - cur[j + 1]);
                }
            }
        }
        prev = cur;
    }

    let (len, i, j) = best;
    if len == 0 {
        return 0;
    }
    len + matching_chars(&a[..i], &b[..j]) + matching_chars(&a[i + len..], &b[j + len..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bandung_table() {
        let table = DistrictTable::bandung().unwrap();
        assert_eq!(table.len(), 30);

        let andir = table.get("andir").unwrap();
        assert_eq!(andir.population(), 99119);
        assert!((andir.density() - 99119.0 / 4.22).abs() < 1e-9);
        assert_eq!(andir.competition(), CompetitionLevel::Medium);

        let pusat = table.get("sumur_bandung").unwrap();
        assert_eq!(pusat.competition(), CompetitionLevel::VeryHigh);
    }

    #[test]
    fn test_profile_validation() {
        assert!(DistrictProfile::new("Kosong", 0, 1.0, 0.0, 0.0, 0.0).is_err());
        assert!(DistrictProfile::new("Datar", 100, 0.0, 0.0, 0.0, 0.0).is_err());
        assert!(DistrictProfile::new("Minus", 100, 1.0, -1.0, 0.0, 0.0).is_err());

        let ok = DistrictProfile::new("Andir", 99119, 4.22, 1.0, 20.0, 34.0).unwrap();
        assert_eq!(ok.key(), "andir");
    }

    #[test]
    fn test_duplicate_keys_rejected() {
        let a = DistrictProfile::new("Andir", 99119, 4.22, 1.0, 20.0, 34.0).unwrap();
        let err = DistrictTable::new(vec![a.clone(), a]).unwrap_err();
        assert_eq!(err, DistrictError::DuplicateKey("andir".to_string()));
    }

    #[test]
    fn test_standardize_name() {
        assert_eq!(standardize_name("  Kecamatan  sumur   bandung "), "Sumur Bandung");
        assert_eq!(standardize_name("Kec. Coblong"), "Coblong");
        assert_eq!(standardize_name("UJUNGBERUNG"), "Ujung Berung");
        assert_eq!(district_key("Ujung Berung"), "ujung_berung");
    }

    #[test]
    fn test_resolve() {
        let table = DistrictTable::bandung().unwrap();

        assert_eq!(table.resolve("coblong").unwrap().name(), "Coblong");
        assert_eq!(table.resolve("Kec. Bandung Wetan").unwrap().key(), "bandung_wetan");
        assert_eq!(table.resolve("Ujungberung").unwrap().key(), "ujung_berung");
        // Fuzzy: missing letter
        assert_eq!(table.resolve("Kiaracondng").unwrap().key(), "kiaracondong");
        assert!(matches!(
            table.resolve("Jakarta Selatan"),
            Err(DistrictError::NotFound(_))
        ));
    }

    #[test]
    fn test_similarity() {
        assert_eq!(similarity("abcd", "abcd"), 1.0);
        assert_eq!(similarity("abc", "xyz"), 0.0);
        // Same as difflib.SequenceMatcher(None, "coblong", "cobong").ratio()
        assert!((similarity("coblong", "cobong") - 12.0 / 13.0).abs() < 1e-9);
    }

    #[test]
    fn test_review_range() {
        let range = CompetitionLevel::High.review_range();
        assert_eq!(range.recommended, 400);
        assert!(range.contains(200));
        assert!(!range.contains(801));
    }
}
