//! Display formatting for amounts and calendar dates.

use chrono::{Month, NaiveDate};
use iso_currency::Currency;
use rust_decimal::{Decimal, RoundingStrategy};

/// Formats amounts with the symbol of the configured display currency
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrencyFormatter {
    symbol: String,
}

impl CurrencyFormatter {
    pub fn new(currency: Currency) -> Self {
        Self {
            symbol: currency.symbol().to_string(),
        }
    }

    /// `1234.5` -> `"$1,234.50"`, `-3` -> `"-$3.00"`
    pub fn format(&self, amount: Decimal) -> String {
        let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        let abs = rounded.abs();
        let formatted = format!("{abs:.2}");
        let (int_part, dec_part) = formatted.split_once('.').unwrap_or((formatted.as_str(), "00"));

        let with_commas = int_part
            .as_bytes()
            .rchunks(3)
            .rev()
            .map(|chunk| std::str::from_utf8(chunk).unwrap_or(""))
            .collect::<Vec<_>>()
            .join(",");

        if rounded < Decimal::ZERO {
            format!("-{}{with_commas}.{dec_part}", self.symbol)
        } else {
            format!("{}{with_commas}.{dec_part}", self.symbol)
        }
    }
}

impl Default for CurrencyFormatter {
    fn default() -> Self {
        Self::new(Currency::USD)
    }
}

/// `"Oct 18, 2026"`
pub fn format_date(date: NaiveDate) -> String {
    date.format("%b %-d, %Y").to_string()
}

/// `"2026-10-18"`, the value an HTML date input expects
pub fn format_date_input(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Full English month name for a 1-based month number
pub fn month_name(month: u32) -> Option<&'static str> {
    let month = u8::try_from(month).ok().and_then(|m| Month::try_from(m).ok())?;
    Some(month.name())
}
