use thiserror::Error;

/// Money is an integer count of the currency's smallest unit (cents for USD/EUR).
/// No fractional representation is ever stored or computed.
pub type Amount = i64;

/// Number of minor units in one major unit for the currencies we accept.
/// JPY has no minor unit.
pub fn minor_units_per_major(currency: &str) -> i64 {
    match currency {
        "JPY" => 1,
        _ => 100,
    }
}

/// Format an amount as a decimal string for the given currency.
/// Example: (5000, "USD") -> "50.00", (-1234, "EUR") -> "-12.34", (500, "JPY") -> "500"
pub fn format_amount(amount: Amount, currency: &str) -> String {
    let scale = minor_units_per_major(currency);
    if scale == 1 {
        return amount.to_string();
    }
    let sign = if amount < 0 { "-" } else { "" };
    let abs = amount.unsigned_abs();
    let scale = scale as u64;
    format!("{}{}.{:02}", sign, abs / scale, abs % scale)
}

/// Parse a decimal string into minor units of the given currency.
/// Example: ("50.00", "USD") -> 5000, ("12.5", "EUR") -> 1250, ("100", "JPY") -> 100
pub fn parse_amount(input: &str, currency: &str) -> Result<Amount, ParseAmountError> {
    let input = input.trim();
    let (negative, digits) = match input.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, input),
    };

    let (units_str, decimal_str) = match digits.split_once('.') {
        Some((units, decimals)) if !decimals.contains('.') => (units, decimals),
        Some(_) => return Err(ParseAmountError::InvalidFormat),
        None => (digits, ""),
    };

    if units_str.is_empty() && decimal_str.is_empty() {
        return Err(ParseAmountError::InvalidFormat);
    }

    let scale = minor_units_per_major(currency);
    let units: i64 = if units_str.is_empty() {
        0
    } else {
        parse_digits(units_str)?
    };

    let decimals: i64 = if scale == 1 {
        if !decimal_str.bytes().all(|b| b == b'0') {
            return Err(ParseAmountError::InvalidFormat);
        }
        0
    } else {
        // Pad or truncate to two decimal digits
        match decimal_str.len() {
            0 => 0,
            1 => parse_digits(decimal_str)? * 10,
            _ => parse_digits(&decimal_str[..2])?,
        }
    };

    let amount = units
        .checked_mul(scale)
        .and_then(|minor| minor.checked_add(decimals))
        .ok_or(ParseAmountError::Overflow)?;

    Ok(if negative { -amount } else { amount })
}

fn parse_digits(s: &str) -> Result<i64, ParseAmountError> {
    if !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseAmountError::InvalidFormat);
    }
    s.parse().map_err(|_| ParseAmountError::Overflow)
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseAmountError {
    #[error("invalid money format")]
    InvalidFormat,
    #[error("amount out of range")]
    Overflow,
}
