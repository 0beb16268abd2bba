//! # Depreciation Report
//!
//! Straight-line depreciation of assets and the totals shown at the foot of
//! the report.
//!
//! ```text
//! periods        = useful life × (1 | 12)
//! per period     = price / periods              (rounded half up)
//! accumulated    = per period × elapsed periods (capped at price)
//! book value     = price − accumulated
//! ```

use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::money::Money;

/// Period unit of the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepreciationKind {
    Annual,
    Monthly,
}

impl DepreciationKind {
    pub const fn periods_per_year(&self) -> i64 {
        match self {
            DepreciationKind::Annual => 1,
            DepreciationKind::Monthly => 12,
        }
    }

    /// Name of the document template for this kind.
    pub const fn template(&self) -> &'static str {
        match self {
            DepreciationKind::Annual => "depreciation_annual",
            DepreciationKind::Monthly => "depreciation_monthly",
        }
    }
}

impl FromStr for DepreciationKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "annual" | "anual" => Ok(DepreciationKind::Annual),
            "monthly" | "mensual" => Ok(DepreciationKind::Monthly),
            _ => Err(ValidationError::NotAllowed {
                field: "kind".to_string(),
                allowed: vec!["annual".to_string(), "monthly".to_string()],
            }),
        }
    }
}

/// Filters of a report request. Only `company_id` is mandatory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepreciationQuery {
    pub kind: DepreciationKind,
    pub company_id: String,
    pub branch_id: Option<String>,
    pub department_id: Option<String>,
    pub sale_id: Option<String>,
    /// Date up to which depreciation is accumulated.
    pub as_of: NaiveDate,
}

/// A depreciable asset as stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub id: String,
    pub name: String,
    pub price: Money,
    pub acquired_on: NaiveDate,
    pub useful_life_years: i64,
}

/// One row of the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DepreciationRow {
    pub asset_id: String,
    pub name: String,
    pub acquired_on: NaiveDate,
    pub price: Money,
    /// Depreciation charged per period.
    pub depreciation: Money,
    pub accumulated: Money,
    pub book_value: Money,
}

/// Whole periods between `from` and `to`; zero when `to` is not after `from`.
///
/// A month only counts once its day-of-month has been reached.
pub fn elapsed_periods(from: NaiveDate, to: NaiveDate, kind: DepreciationKind) -> i64 {
    let mut months = (to.year() as i64 - from.year() as i64) * 12 + to.month() as i64
        - from.month() as i64;
    if to.day() < from.day() {
        months -= 1;
    }
    let months = months.max(0);

    match kind {
        DepreciationKind::Monthly => months,
        DepreciationKind::Annual => months / 12,
    }
}

/// Straight-line depreciation of `asset` as of `as_of`.
pub fn straight_line(asset: &Asset, kind: DepreciationKind, as_of: NaiveDate) -> DepreciationRow {
    let price = asset.price.cents();
    let total_periods = asset.useful_life_years.max(0) * kind.periods_per_year();

    let (per_period, accumulated) = if total_periods == 0 {
        (price, price)
    } else {
        let per_period = (2 * price as i128 + total_periods as i128) / (2 * total_periods as i128);
        let elapsed = elapsed_periods(asset.acquired_on, as_of, kind);
        let accumulated = if elapsed >= total_periods {
            price as i128
        } else {
            (per_period * elapsed as i128).min(price as i128)
        };
        (per_period as i64, accumulated as i64)
    };

    DepreciationRow {
        asset_id: asset.id.clone(),
        name: asset.name.clone(),
        acquired_on: asset.acquired_on,
        price: asset.price,
        depreciation: Money::from_cents(per_period),
        accumulated: Money::from_cents(accumulated),
        book_value: Money::from_cents(price - accumulated),
    }
}

/// Column totals of a report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReportTotals {
    pub rows: usize,
    pub price: Money,
    pub depreciation: Money,
    pub accumulated: Money,
    pub book_value: Money,
}

impl ReportTotals {
    pub fn aggregate(rows: &[DepreciationRow]) -> Self {
        rows.iter().fold(
            ReportTotals {
                rows: rows.len(),
                ..ReportTotals::default()
            },
            |mut totals, row| {
                totals.price += row.price;
                totals.depreciation += row.depreciation;
                totals.accumulated += row.accumulated;
                totals.book_value += row.book_value;
                totals
            },
        )
    }
}

/// Everything a document renderer needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DepreciationReport {
    pub kind: DepreciationKind,
    pub company_name: String,
    pub generated_on: NaiveDate,
    pub rows: Vec<DepreciationRow>,
    pub totals: ReportTotals,
}

impl DepreciationReport {
    pub fn new(
        kind: DepreciationKind,
        company_name: impl Into<String>,
        generated_on: NaiveDate,
        rows: Vec<DepreciationRow>,
    ) -> Self {
        let totals = ReportTotals::aggregate(&rows);
        DepreciationReport {
            kind,
            company_name: company_name.into(),
            generated_on,
            rows,
            totals,
        }
    }
}
