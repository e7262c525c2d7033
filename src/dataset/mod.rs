//! Sales dataset: canonical row model, column cleaning and loading.

pub mod loader;
pub mod normalizer;
pub mod source;

pub use loader::{DatasetLoader, LoadOutcome};
pub use normalizer::*;
pub use source::{RawRecord, RawTable, SourceFingerprint};

use serde::{Deserialize, Serialize};

/// Field names as they appear in the raw input file
pub mod source_fields {
    pub const CATEGORY: &str = "category";
    pub const DISCOUNTED_PRICE: &str = "discounted_price";
    pub const PRODUCT_NAME: &str = "product_name";
    pub const RATING: &str = "rating";
    pub const RATING_COUNT: &str = "rating_count";
    pub const ACTUAL_PRICE: &str = "actual_price";
    pub const DISCOUNT_PERCENTAGE: &str = "discount_percentage";

    /// Fields that must be present before anything else happens
    pub const REQUIRED: [&str; 3] = [CATEGORY, DISCOUNTED_PRICE, PRODUCT_NAME];
    pub const OPTIONAL: [&str; 4] = [RATING, RATING_COUNT, ACTUAL_PRICE, DISCOUNT_PERCENTAGE];
}

/// Stable field names used throughout the cleaned table and the store
pub mod canonical_fields {
    pub const CATEGORY: &str = "category";
    pub const PRODUCT_NAME: &str = "product_name";
    pub const PRICE: &str = "price";
    pub const ORIGINAL_PRICE: &str = "original_price";
    pub const RATING: &str = "rating";
    pub const RATING_COUNT: &str = "rating_count";
    pub const DISCOUNT_PERCENT: &str = "discount_percent";
    pub const SENTIMENT: &str = "sentiment";
}

/// Source → canonical rename table (1:1)
pub const FIELD_RENAMES: [(&str, &str); 7] = [
    (source_fields::CATEGORY, canonical_fields::CATEGORY),
    (source_fields::PRODUCT_NAME, canonical_fields::PRODUCT_NAME),
    (source_fields::DISCOUNTED_PRICE, canonical_fields::PRICE),
    (source_fields::RATING, canonical_fields::RATING),
    (source_fields::RATING_COUNT, canonical_fields::RATING_COUNT),
    (source_fields::DISCOUNT_PERCENTAGE, canonical_fields::DISCOUNT_PERCENT),
    (source_fields::ACTUAL_PRICE, canonical_fields::ORIGINAL_PRICE),
];

/// Canonical name for a source field, if it is one we know about
pub fn canonical_name(source_field: &str) -> Option<&'static str> {
    FIELD_RENAMES
        .iter()
        .find(|(from, _)| *from == source_field)
        .map(|(_, to)| *to)
}

/// 評価に基づくセンチメント区分
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
    Unrated,
}

impl Sentiment {
    pub const ALL: [Sentiment; 4] = [
        Sentiment::Positive,
        Sentiment::Neutral,
        Sentiment::Negative,
        Sentiment::Unrated,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Neutral => "neutral",
            Sentiment::Negative => "negative",
            Sentiment::Unrated => "unrated",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "positive" => Some(Sentiment::Positive),
            "neutral" => Some(Sentiment::Neutral),
            "negative" => Some(Sentiment::Negative),
            "unrated" => Some(Sentiment::Unrated),
            _ => None,
        }
    }
}

/// One cleaned sales row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanRecord {
    /// Top-level category segment
    pub category: String,
    pub product_name: String,
    /// Discounted (selling) price
    pub price: f64,
    pub original_price: Option<f64>,
    pub rating: Option<f64>,
    pub rating_count: Option<i64>,
    pub discount_percent: Option<f64>,
    pub sentiment: Sentiment,
}

impl CleanRecord {
    /// Build a record with only the required fields; sentiment follows the (absent) rating.
    pub fn new(category: impl Into<String>, product_name: impl Into<String>, price: f64) -> Self {
        Self {
            category: category.into(),
            product_name: product_name.into(),
            price,
            original_price: None,
            rating: None,
            rating_count: None,
            discount_percent: None,
            sentiment: Sentiment::Unrated,
        }
    }

    /// 評価を設定（センチメントも再計算）
    pub fn with_rating(mut self, rating: f64) -> Self {
        self.rating = Some(rating);
        self.sentiment = classify_sentiment(self.rating);
        self
    }

    pub fn with_rating_count(mut self, count: i64) -> Self {
        self.rating_count = Some(count);
        self
    }

    pub fn with_original_price(mut self, price: f64) -> Self {
        self.original_price = Some(price);
        self
    }

    pub fn with_discount_percent(mut self, percent: f64) -> Self {
        self.discount_percent = Some(percent);
        self
    }
}

/// Flat ordered sequence of cleaned rows
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SalesTable {
    pub records: Vec<CleanRecord>,
}

impl SalesTable {
    pub fn new(records: Vec<CleanRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CleanRecord> {
        self.records.iter()
    }
}

impl From<Vec<CleanRecord>> for SalesTable {
    fn from(records: Vec<CleanRecord>) -> Self {
        Self::new(records)
    }
}
