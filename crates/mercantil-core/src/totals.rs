//! # Sale Totals
//!
//! ```text
//! line subtotal = quantity × unit price
//! principal     = Σ line subtotals
//! tax           = principal × 14%   (rounded half up to the cent)
//! total         = principal + tax
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::TaxRate;
use crate::validation::ValidatedLine;

/// Monetary totals of a sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleTotals {
    pub principal: Money,
    pub tax: Money,
    pub total: Money,
}

impl SaleTotals {
    /// Computes the totals from already computed line subtotals.
    pub fn from_subtotals(subtotals: &[Money], rate: TaxRate) -> CoreResult<Self> {
        let principal = subtotals
            .iter()
            .try_fold(Money::zero(), |acc, s| acc.checked_add(*s))
            .ok_or(CoreError::AmountOverflow("principal"))?;

        let tax = principal.calculate_tax(rate);
        let total = principal
            .checked_add(tax)
            .ok_or(CoreError::AmountOverflow("total"))?;

        Ok(SaleTotals {
            principal,
            tax,
            total,
        })
    }
}

/// Subtotal of one line.
pub fn line_subtotal(line: &ValidatedLine) -> CoreResult<Money> {
    line.unit_price
        .checked_mul_quantity(line.quantity)
        .ok_or(CoreError::AmountOverflow("line subtotal"))
}

/// Subtotals of every line, in order, followed by the sale totals.
pub fn compute_sale_totals(
    lines: &[ValidatedLine],
    rate: TaxRate,
) -> CoreResult<(Vec<Money>, SaleTotals)> {
    let subtotals = lines.iter().map(line_subtotal).collect::<CoreResult<Vec<_>>>()?;
    let totals = SaleTotals::from_subtotals(&subtotals, rate)?;
    Ok((subtotals, totals))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SALE_TAX_RATE;

    fn line(product_id: &str, quantity: i64, cents: i64) -> ValidatedLine {
        ValidatedLine {
            product_id: product_id.to_string(),
            quantity,
            unit_price: Money::from_cents(cents),
        }
    }

    #[test]
    fn test_two_line_sale() {
        let lines = vec![line("PR0001", 2, 1000), line("PR0002", 1, 500)];
        let (subtotals, totals) = compute_sale_totals(&lines, SALE_TAX_RATE).unwrap();

        assert_eq!(subtotals, vec![Money::from_cents(2000), Money::from_cents(500)]);
        assert_eq!(totals.principal.to_decimal_string(), "25.00");
        assert_eq!(totals.tax.to_decimal_string(), "3.50");
        assert_eq!(totals.total.to_decimal_string(), "28.50");
    }

    #[test]
    fn test_tax_rounds_half_up() {
        // 0.25 × 14% = 0.035 → 0.04
        let totals = SaleTotals::from_subtotals(&[Money::from_cents(25)], SALE_TAX_RATE).unwrap();
        assert_eq!(totals.tax.cents(), 4);
        assert_eq!(totals.total.cents(), 29);
    }

    #[test]
    fn test_subtotals_sum_to_principal() {
        let lines = vec![line("A", 3, 10), line("B", 7, 333), line("C", 1, 1)];
        let (subtotals, totals) = compute_sale_totals(&lines, SALE_TAX_RATE).unwrap();
        assert_eq!(subtotals.into_iter().sum::<Money>(), totals.principal);
        assert_eq!(totals.total, totals.principal + totals.tax);
    }

    #[test]
    fn test_overflow_is_reported() {
        let lines = vec![line("A", i64::MAX, 100)];
        assert!(matches!(
            compute_sale_totals(&lines, SALE_TAX_RATE),
            Err(CoreError::AmountOverflow("line subtotal"))
        ));
    }
}
