use rust_decimal::Decimal;

/// Number of trailing periods the trend is measured over.
pub const FORECAST_WINDOW: usize = 3;

/// Projects the next period by extending the average step across the last
/// three values: `max(0, last + (last - first) / n)` where `n` is how many
/// values were taken. Fewer than two values give zero.
pub fn forecast_next(values: &[Decimal]) -> Decimal {
    if values.len() < 2 {
        return Decimal::ZERO;
    }

    let window = &values[values.len().saturating_sub(FORECAST_WINDOW)..];
    let (first, last) = match (window.first(), window.last()) {
        (Some(first), Some(last)) => (*first, *last),
        _ => return Decimal::ZERO,
    };

    let average_delta = (last - first) / Decimal::from(window.len());
    (last + average_delta).max(Decimal::ZERO)
}
