use anyhow::{anyhow, Result};
use chrono::{Local, NaiveDate};
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Formats an amount the way the firm's documents show it: `$ 1.210,00`.
pub fn format_currency(value: Decimal) -> String {
    let rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let plain = format!("{:.2}", rounded.abs());
    let (integer, fraction) = plain.split_once('.').unwrap_or((plain.as_str(), "00"));

    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
    for (index, digit) in integer.chars().enumerate() {
        if index > 0 && (integer.len() - index) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(digit);
    }

    format!("{}$ {},{}", if negative { "-" } else { "" }, grouped, fraction)
}

/// Parses user input such as `1210`, `1210.5` or `1210,50`.
pub fn parse_decimal(value: &str) -> Result<Decimal> {
    let normalized = value.trim().replace(',', ".");
    Decimal::from_str(&normalized).map_err(|e| anyhow!("Parse decimal {:?}: {}", value, e))
}

pub fn parse_date(value: &str) -> Result<NaiveDate> {
    let raw = value.trim();
    let formats = ["%Y-%m-%d", "%d/%m/%Y", "%d.%m.%Y", "%Y/%m/%d"];
    for fmt in formats.iter() {
        if let Ok(date) = NaiveDate::parse_from_str(raw, fmt) {
            return Ok(date);
        }
    }
    Err(anyhow!("Unrecognised date {:?}", value))
}
