use rust_decimal::{Decimal, RoundingStrategy};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// How a tenant's currency is written. Defaults to Brazilian real
/// (`R$ 1.234,56`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
pub struct CurrencyFormat {
    #[schemars(description = "ISO 4217 code, e.g. BRL or USD")]
    pub code: String,
    pub symbol: String,
    pub decimal_separator: char,
    pub thousands_separator: char,
    pub decimals: u32,
    #[schemars(description = "Whether a space separates the symbol from the number")]
    pub symbol_spacing: bool,
}

impl Default for CurrencyFormat {
    fn default() -> Self {
        Self::brl()
    }
}

impl CurrencyFormat {
    pub fn brl() -> Self {
        Self {
            code: "BRL".to_string(),
            symbol: "R$".to_string(),
            decimal_separator: ',',
            thousands_separator: '.',
            decimals: 2,
            symbol_spacing: true,
        }
    }

    pub fn usd() -> Self {
        Self {
            code: "USD".to_string(),
            symbol: "$".to_string(),
            decimal_separator: '.',
            thousands_separator: ',',
            decimals: 2,
            symbol_spacing: false,
        }
    }

    pub fn format(&self, amount: Decimal) -> String {
        format_currency(amount, self)
    }
}

pub fn format_currency(amount: Decimal, currency: &CurrencyFormat) -> String {
    let rounded =
        amount.round_dp_with_strategy(currency.decimals, RoundingStrategy::MidpointAwayFromZero);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let number = group_digits(
        rounded.abs(),
        currency.decimals,
        currency.decimal_separator,
        currency.thousands_separator,
    );

    let spacing = if currency.symbol_spacing { " " } else { "" };
    let sign = if negative { "-" } else { "" };
    format!("{}{}{}{}", sign, currency.symbol, spacing, number)
}

fn group_digits(value: Decimal, decimals: u32, decimal_sep: char, thousands_sep: char) -> String {
    let plain = format!("{:.*}", decimals as usize, value);
    let (int_part, frac_part) = match plain.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (plain.as_str(), None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(thousands_sep);
        }
        grouped.push(ch);
    }

    if let Some(frac) = frac_part {
        grouped.push(decimal_sep);
        grouped.push_str(frac);
    }
    grouped
}

/// Period-over-period change in percent. A zero previous period yields 100
/// when the current one is positive and 0 otherwise, instead of an
/// undefined ratio. Changes too large for a `Decimal` saturate at
/// `Decimal::MAX` or `Decimal::MIN`.
pub fn pct_change(current: Decimal, previous: Decimal) -> Decimal {
    if previous.is_zero() {
        return if current > Decimal::ZERO {
            Decimal::ONE_HUNDRED
        } else {
            Decimal::ZERO
        };
    }
    current
        .checked_sub(previous)
        .and_then(|delta| delta.checked_div(previous))
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        .unwrap_or_else(|| {
            if (current > previous) == (previous > Decimal::ZERO) {
                Decimal::MAX
            } else {
                Decimal::MIN
            }
        })
}

/// One decimal place, explicit `+` on growth: `+12.5%`, `-3.0%`, `0.0%`.
pub fn format_percent(value: Decimal) -> String {
    let rounded = value.round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero);
    if rounded > Decimal::ZERO {
        format!("+{:.1}%", rounded)
    } else if rounded.is_zero() {
        "0.0%".to_string()
    } else {
        format!("{:.1}%", rounded)
    }
}
