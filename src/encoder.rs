//! Label encoding for restaurant categories and price tiers.
//!
//! Codes must agree with the label encoder fitted at training time, so the
//! category vocabulary is loaded with the model artifacts rather than fixed
//! here.

use crate::error::EncodeError;
use std::collections::HashMap;

pub const MIN_PRICE_TIER: i64 = 1;
pub const MAX_PRICE_TIER: i64 = 4;

/// Closed category vocabulary in training (class index) order.
#[derive(Debug, Clone)]
pub struct CategoryEncoder {
    classes: Vec<String>,
    index: HashMap<String, usize>,
}

impl CategoryEncoder {
    /// Build an encoder from the fitted classes; duplicates keep their first code.
    pub fn new(classes: Vec<String>) -> Self {
        let mut index = HashMap::with_capacity(classes.len());
        for (code, class) in classes.iter().enumerate() {
            index.entry(class.clone()).or_insert(code);
        }
        Self { classes, index }
    }

    /// Integer code of a category.
    pub fn encode(&self, name: &str) -> Result<usize, EncodeError> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| EncodeError::UnknownCategory(name.to_string()))
    }

    /// Category for a code.
    pub fn decode(&self, code: usize) -> Option<&str> {
        self.classes.get(code).map(String::as_str)
    }

    /// The vocabulary, in code order.
    pub fn categories(&self) -> &[String] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

/// Price tier 1..=4 to code 0..=3.
pub fn encode_price_tier(tier: i64) -> Result<usize, EncodeError> {
    if (MIN_PRICE_TIER..=MAX_PRICE_TIER).contains(&tier) {
        Ok((tier - MIN_PRICE_TIER) as usize)
    } else {
        Err(EncodeError::OutOfRange {
            field: "price_tier",
            value: tier.to_string(),
            expected: "1..=4",
        })
    }
}

/// Code 0..=3 back to price tier 1..=4.
pub fn decode_price_tier(code: usize) -> Result<i64, EncodeError> {
    let tier = i64::try_from(code)
        .ok()
        .and_then(|code| code.checked_add(MIN_PRICE_TIER))
        .filter(|tier| *tier <= MAX_PRICE_TIER);

    if let Some(tier) = tier {
        Ok(tier)
    } else {
        Err(EncodeError::OutOfRange {
            field: "price_tier_code",
            value: code.to_string(),
            expected: "0..=3",
        })
    }
}
