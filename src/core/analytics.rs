//! Provides the arithmetic behind a TER: NAV averaging, fixed-cost proration and
//! variable-cost accrual.
use crate::core::error::TerError;
use crate::core::range::DateRange;
use crate::core::records::{FixedExpenseLine, NavRecord, VariableExpenseRate};
use rust_decimal::Decimal;
use tracing::debug;

/// Resolves the annual day-count base used to prorate expenses.
///
/// A configured base wins; otherwise the number of NAV records stands in for the
/// number of days in the year.
pub fn day_base(configured: Option<u32>, nav_count: usize) -> Result<Decimal, TerError> {
    let base = configured.map_or(nav_count as u64, u64::from);
    if base == 0 {
        return Err(TerError::InvalidDayBase);
    }
    Ok(Decimal::from(base))
}

/// NAV values recorded within the inclusive range.
pub fn navs_in_range(navs: &[NavRecord], range: &DateRange) -> Vec<Decimal> {
    navs.iter()
        .filter(|nav| range.contains(nav.date))
        .map(|nav| nav.value)
        .collect()
}

/// Arithmetic mean of the NAV values within the range.
///
/// An empty selection is an error rather than zero.
pub fn average_nav(navs: &[NavRecord], range: &DateRange) -> Result<Decimal, TerError> {
    let values = navs_in_range(navs, range);
    if values.is_empty() {
        return Err(TerError::EmptyAggregation {
            from: range.from_text.clone(),
            to: range.to_text.clone(),
        });
    }
    let count = values.len();
    let average = values
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, value| acc.checked_add(value))
        .and_then(|total| total.checked_div(Decimal::from(count)))
        .ok_or_else(|| overflow("average net asset value"))?;
    debug!(%average, count, "Averaged net asset values");
    Ok(average)
}

fn overflow(what: &str) -> TerError {
    TerError::AmountOverflow(what.to_string())
}

/// Straight-line daily proration of the annual budget.
pub fn prorate_fixed_expenses(
    lines: &[FixedExpenseLine],
    day_base: Decimal,
    day_count: i64,
) -> Result<Decimal, TerError> {
    lines
        .iter()
        .try_fold(0i64, |acc, line| acc.checked_add(line.annual_amount))
        .and_then(|annual| Decimal::from(annual).checked_div(day_base))
        .and_then(|daily| daily.checked_mul(Decimal::from(day_count)))
        .ok_or_else(|| overflow("fixed expenses"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableExpenses {
    pub rates: Vec<Decimal>,
    pub total: Decimal,
}

/// Accrues each rate against the average NAV over the range.
pub fn variable_expenses(
    rates: &[VariableExpenseRate],
    average_nav: Decimal,
    day_base: Decimal,
    day_count: i64,
) -> Result<VariableExpenses, TerError> {
    let days = Decimal::from(day_count);
    let normalized: Vec<Decimal> = rates.iter().map(|r| r.rate).collect();
    let total = normalized
        .iter()
        .try_fold(Decimal::ZERO, |acc, rate| {
            average_nav
                .checked_mul(*rate)
                .and_then(|v| v.checked_mul(days))
                .and_then(|v| v.checked_div(day_base))
                .and_then(|v| acc.checked_add(v))
        })
        .ok_or_else(|| overflow("variable expenses"))?;
    Ok(VariableExpenses {
        rates: normalized,
        total,
    })
}

/// Total expenses as a percentage of the average NAV.
pub fn expense_ratio(
    fixed_total: Decimal,
    variable_total: Decimal,
    average_nav: Decimal,
) -> Result<Decimal, TerError> {
    if average_nav.is_zero() {
        return Err(TerError::ZeroAverageNav);
    }
    fixed_total
        .checked_add(variable_total)
        .and_then(|total| total.checked_div(average_nav))
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        .ok_or_else(|| overflow("expense ratio"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::range::validate_range;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn nav(day: u32, value: Decimal) -> NavRecord {
        NavRecord {
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            value,
        }
    }

    fn range_over(navs: &[NavRecord], from: &str, to: &str) -> DateRange {
        let available = navs.iter().map(|n| n.date).collect();
        validate_range(from, to, &available).unwrap()
    }

    fn rate(value: Decimal) -> VariableExpenseRate {
        VariableExpenseRate {
            expense_type: "Management fee".to_string(),
            rate: value,
        }
    }

    #[test]
    fn test_average_single_and_pair() {
        let navs = vec![nav(1, dec!(100.00)), nav(2, dec!(200.00)), nav(3, dec!(999))];
        let range = range_over(&navs, "01/01/2024", "02/01/2024");
        assert_eq!(average_nav(&navs, &range).unwrap(), dec!(150.00));

        let range = DateRange {
            from: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            to: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            from_text: "01/01/2024".to_string(),
            to_text: "01/01/2024".to_string(),
        };
        assert_eq!(average_nav(&navs, &range).unwrap(), dec!(100.00));
    }

    #[test]
    fn test_average_is_idempotent() {
        let navs = vec![nav(1, dec!(10)), nav(2, dec!(20)), nav(3, dec!(40))];
        let range = range_over(&navs, "01/01/2024", "03/01/2024");
        let first = average_nav(&navs, &range).unwrap();
        let second = average_nav(&navs, &range).unwrap();
        assert_eq!(first, second);
        assert_eq!(navs.len(), 3);
        assert_eq!(first.round_dp(4), dec!(23.3333));
    }

    #[test]
    fn test_average_of_sparse_range_is_empty() {
        let navs = vec![nav(1, dec!(100)), nav(10, dec!(100))];
        let range = DateRange {
            from: NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
            to: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
            from_text: "03/01/2024".to_string(),
            to_text: "05/01/2024".to_string(),
        };
        assert_eq!(
            average_nav(&navs, &range),
            Err(TerError::EmptyAggregation {
                from: "03/01/2024".to_string(),
                to: "05/01/2024".to_string(),
            })
        );
    }

    #[test]
    fn test_day_base_resolution() {
        assert_eq!(day_base(None, 366).unwrap(), dec!(366));
        assert_eq!(day_base(Some(365), 12).unwrap(), dec!(365));
        assert_eq!(day_base(None, 0), Err(TerError::InvalidDayBase));
        assert_eq!(day_base(Some(0), 365), Err(TerError::InvalidDayBase));
    }

    #[test]
    fn test_prorate_fixed_expenses() {
        let lines = vec![
            FixedExpenseLine {
                label: "Audit".to_string(),
                annual_amount: 12000,
            },
            FixedExpenseLine {
                label: "Custody".to_string(),
                annual_amount: 24600,
            },
        ];
        assert_eq!(prorate_fixed_expenses(&lines, dec!(366), 10), Ok(dec!(1000)));
        assert_eq!(prorate_fixed_expenses(&[], dec!(365), 10), Ok(Decimal::ZERO));
    }

    #[test]
    fn test_variable_expenses_percent_and_decimal_agree() {
        let from_percent = crate::core::records::normalize_rate("5%").unwrap();
        let from_decimal = crate::core::records::normalize_rate("0.05").unwrap();
        let a = variable_expenses(&[rate(from_percent)], dec!(1000), dec!(365), 73).unwrap();
        let b = variable_expenses(&[rate(from_decimal)], dec!(1000), dec!(365), 73).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.rates, vec![dec!(0.05)]);
        assert_eq!(a.total, dec!(10));
    }

    #[test]
    fn test_variable_expenses_sum_contributions() {
        let rates = vec![rate(dec!(0.01)), rate(dec!(0.0250))];
        let result = variable_expenses(&rates, dec!(2000), dec!(100), 5).unwrap();
        // 2000 * 0.01 * 5 / 100 + 2000 * 0.025 * 5 / 100
        assert_eq!(result.total, dec!(3.5));
        assert_eq!(result.rates.len(), 2);
    }

    #[test]
    fn test_expense_ratio() {
        assert_eq!(
            expense_ratio(dec!(50.00), dec!(50.00), dec!(1000.00)).unwrap(),
            dec!(10)
        );
        assert_eq!(
            expense_ratio(dec!(1), dec!(1), Decimal::ZERO),
            Err(TerError::ZeroAverageNav)
        );
    }

    #[test]
    fn test_extreme_amounts_report_overflow() {
        let huge = |label: &str| FixedExpenseLine {
            label: label.to_string(),
            annual_amount: i64::MAX,
        };
        assert_eq!(
            prorate_fixed_expenses(&[huge("Audit"), huge("Custody")], dec!(365), 10),
            Err(TerError::AmountOverflow("fixed expenses".to_string()))
        );

        assert_eq!(
            variable_expenses(&[rate(dec!(0.5))], Decimal::MAX, dec!(1), 365),
            Err(TerError::AmountOverflow("variable expenses".to_string()))
        );

        let navs = vec![nav(1, Decimal::MAX), nav(2, Decimal::MAX)];
        let range = range_over(&navs, "01/01/2024", "02/01/2024");
        assert_eq!(
            average_nav(&navs, &range),
            Err(TerError::AmountOverflow("average net asset value".to_string()))
        );

        assert_eq!(
            expense_ratio(Decimal::MAX, dec!(1), dec!(1)),
            Err(TerError::AmountOverflow("expense ratio".to_string()))
        );
    }
}
