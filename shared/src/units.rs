//! Length entry and display helpers.
//!
//! Lengths are stored as decimal feet. Entry accepts plain decimals
//! (`12.5`), feet and inches (`10' 6"`, `10ft 6in`, `10 6`) or inches alone
//! (`18"`).

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LengthError {
    #[error("enter a length")]
    Empty,
    #[error("\"{0}\" is not a number")]
    NotANumber(String),
    #[error("length must be greater than zero")]
    NotPositive,
}

pub fn feet_and_inches(feet: f64, inches: f64) -> f64 {
    feet + inches / 12.0
}

/// Parses a user-entered length into decimal feet.
pub fn parse_length(text: &str) -> Result<f64, LengthError> {
    let normalized = normalize_units(text);
    let trimmed = normalized.trim();
    if trimmed.is_empty() {
        return Err(LengthError::Empty);
    }

    let (feet, inches) = if let Some((feet, rest)) = trimmed.split_once('\'') {
        let inches = rest.trim().trim_end_matches('"').trim();
        (number(feet)?, optional_number(inches)?)
    } else if let Some(inches) = trimmed.strip_suffix('"') {
        (0.0, number(inches)?)
    } else {
        let mut parts = trimmed.split_whitespace();
        let feet = number(parts.next().unwrap_or_default())?;
        let inches = optional_number(parts.next().unwrap_or_default())?;
        if let Some(extra) = parts.next() {
            return Err(LengthError::NotANumber(extra.to_string()));
        }
        (feet, inches)
    };

    let value = feet_and_inches(feet, inches);
    if !(value.is_finite() && value > 0.0) {
        return Err(LengthError::NotPositive);
    }
    Ok(value)
}

/// Parses a plain positive number, e.g. a manually entered square footage.
pub fn parse_positive(text: &str) -> Result<f64, LengthError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(LengthError::Empty);
    }
    let value = number(trimmed)?;
    if value > 0.0 {
        Ok(value)
    } else {
        Err(LengthError::NotPositive)
    }
}

fn normalize_units(text: &str) -> String {
    let mut normalized = text.to_lowercase();
    for (word, mark) in [
        ("inches", "\""),
        ("inch", "\""),
        ("in", "\""),
        ("feet", "'"),
        ("foot", "'"),
        ("ft", "'"),
    ] {
        normalized = normalized.replace(word, mark);
    }
    normalized.replace(['’', '′'], "'").replace(['”', '″'], "\"")
}

fn number(text: &str) -> Result<f64, LengthError> {
    let text = text.trim();
    let value = text
        .parse::<f64>()
        .map_err(|_| LengthError::NotANumber(text.to_string()))?;
    if !value.is_finite() {
        return Err(LengthError::NotANumber(text.to_string()));
    }
    if value < 0.0 {
        return Err(LengthError::NotPositive);
    }
    Ok(value)
}

fn optional_number(text: &str) -> Result<f64, LengthError> {
    if text.trim().is_empty() {
        Ok(0.0)
    } else {
        number(text)
    }
}

pub fn format_sq_ft(area: f64) -> String {
    format!("{area:.2}")
}

/// Formats decimal feet as `F' I"`, rounding to the nearest half inch.
pub fn format_feet(feet: f64) -> String {
    let total_half_inches = (feet * 24.0).round() as i64;
    let whole_feet = total_half_inches / 24;
    let half_inches = total_half_inches % 24;
    if half_inches == 0 {
        return format!("{whole_feet}'");
    }
    let inches = half_inches as f64 / 2.0;
    if half_inches % 2 == 0 {
        format!("{whole_feet}' {inches:.0}\"")
    } else {
        format!("{whole_feet}' {inches:.1}\"")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_decimal_is_feet() {
        assert_eq!(parse_length("12.5"), Ok(12.5));
    }

    #[test]
    fn feet_and_inches_forms() {
        assert_eq!(parse_length("10' 6\""), Ok(10.5));
        assert_eq!(parse_length("10'6"), Ok(10.5));
        assert_eq!(parse_length("10 ft 6 in"), Ok(10.5));
        assert_eq!(parse_length("10 6"), Ok(10.5));
        assert_eq!(parse_length("10ft"), Ok(10.0));
        assert_eq!(parse_length("18\""), Ok(1.5));
    }

    #[test]
    fn rejects_zero_and_negative() {
        assert_eq!(parse_length("0"), Err(LengthError::NotPositive));
        assert_eq!(parse_length("-3"), Err(LengthError::NotPositive));
        assert_eq!(parse_length("0' 0\""), Err(LengthError::NotPositive));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_length("   "), Err(LengthError::Empty));
        assert!(matches!(parse_length("ten"), Err(LengthError::NotANumber(_))));
        assert!(matches!(parse_length("1 2 3"), Err(LengthError::NotANumber(_))));
        assert!(matches!(parse_length("NaN"), Err(LengthError::NotANumber(_))));
    }

    #[test]
    fn display_rounds_to_two_places() {
        assert_eq!(format_sq_ft(36.0 * std::f64::consts::PI), "113.10");
        assert_eq!(format_sq_ft(120.0), "120.00");
    }

    #[test]
    fn format_feet_uses_inches() {
        assert_eq!(format_feet(10.5), "10' 6\"");
        assert_eq!(format_feet(12.0), "12'");
        assert_eq!(format_feet(1.0 + 1.5 / 12.0), "1' 1.5\"");
    }
}
