//! Review validation and culture aggregation for the company "Culture" tab.

use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::company::CompanyReviewRow;
use crate::validation::{require_max_len, require_non_empty, require_rating};

#[derive(Debug, Clone, Deserialize)]
pub struct CreateReviewRequest {
    pub rating: i16,
    pub title: String,
    pub body: Option<String>,
    pub pros: Option<String>,
    pub cons: Option<String>,
    pub work_life_balance: i16,
    pub culture_values: i16,
    pub career_opportunities: i16,
    pub compensation: i16,
    pub management: i16,
}

impl CreateReviewRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        require_rating("rating", self.rating)?;
        require_rating("work_life_balance", self.work_life_balance)?;
        require_rating("culture_values", self.culture_values)?;
        require_rating("career_opportunities", self.career_opportunities)?;
        require_rating("compensation", self.compensation)?;
        require_rating("management", self.management)?;
        require_non_empty("title", &self.title)?;
        require_max_len("title", &self.title, 200)?;
        for (field, value) in [("body", &self.body), ("pros", &self.pros), ("cons", &self.cons)] {
            if let Some(value) = value {
                require_max_len(field, value, 5_000)?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CultureDimension {
    pub dimension: &'static str,
    pub average: Option<f64>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CultureReport {
    pub review_count: usize,
    pub overall_rating: Option<f64>,
    pub dimensions: Vec<CultureDimension>,
    /// Index 0 holds one-star reviews, index 4 five-star.
    pub rating_distribution: [usize; 5],
}

type DimensionGetter = fn(&CompanyReviewRow) -> i16;

const DIMENSIONS: [(&str, DimensionGetter); 5] = [
    ("work_life_balance", |r| r.work_life_balance),
    ("culture_values", |r| r.culture_values),
    ("career_opportunities", |r| r.career_opportunities),
    ("compensation", |r| r.compensation),
    ("management", |r| r.management),
];

/// Mean rounded to one decimal; `None` when empty.
fn average(values: impl Iterator<Item = i16>) -> Option<f64> {
    let (sum, count) = values.fold((0i64, 0usize), |(s, c), v| (s + i64::from(v), c + 1));
    (count > 0).then(|| ((sum as f64 / count as f64) * 10.0).round() / 10.0)
}

pub fn culture_report(reviews: &[CompanyReviewRow]) -> CultureReport {
    let mut rating_distribution = [0usize; 5];
    for review in reviews {
        if (1..=5).contains(&review.rating) {
            rating_distribution[(review.rating - 1) as usize] += 1;
        }
    }

    CultureReport {
        review_count: reviews.len(),
        overall_rating: average(reviews.iter().map(|r| r.rating)),
        dimensions: DIMENSIONS
            .iter()
            .map(|(dimension, get)| CultureDimension {
                dimension: *dimension,
                average: average(reviews.iter().map(get)),
            })
            .collect(),
        rating_distribution,
    }
}

/// Lowercase ASCII slug with single dashes, e.g. "Acme Labs, Inc." -> "acme-labs-inc".
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}
