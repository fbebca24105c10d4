use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;

// Longest leading numeric prefix, the way browsers' parseFloat reads input.
static LEADING_FLOAT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([+-]?(?:Infinity|(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?))").unwrap()
});
// A whole string that is a decimal number (Number() coercion).
static STRICT_FLOAT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?(?:Infinity|(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?)$").unwrap()
});

/// Parse the leading numeric prefix of `input`, ignoring trailing text.
///
/// # Examples
/// ```
/// use lineid_editor::utils::parse_leading_float;
/// assert_eq!(parse_leading_float("12.5 km/s"), Some(12.5));
/// assert_eq!(parse_leading_float("  -3e2x"), Some(-300.0));
/// assert_eq!(parse_leading_float("abc"), None);
/// ```
pub fn parse_leading_float(input: &str) -> Option<f64> {
    let captures = LEADING_FLOAT_REGEX.captures(input)?;
    captures[1].parse::<f64>().ok()
}

/// Coerce text to a number: blank is 0, anything that is not entirely a
/// decimal number is NaN.
pub fn coerce_number(input: &str) -> f64 {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    if !STRICT_FLOAT_REGEX.is_match(trimmed) {
        return f64::NAN;
    }
    trimmed.parse::<f64>().unwrap_or(f64::NAN)
}

/// Round half away from zero to `precision` decimal digits.
pub fn round_to(value: f64, precision: u32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let multiplier = 10f64.powi(precision as i32);
    (value * multiplier).round() / multiplier
}

/// Fixed-point rendering with `precision` decimals, rounding half away from zero.
pub fn format_fixed(value: f64, precision: u32) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    let rounded = round_to(value, precision);
    // Avoid printing "-0.00" for values that round to zero.
    let rounded = if rounded == 0.0 { 0.0 } else { rounded };
    format!("{:.*}", precision as usize, rounded)
}

/// Render a number the way it would appear in a text input: integers without
/// a fractional part.
pub fn number_to_text(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        let sign = if value > 0.0 { "" } else { "-" };
        format!("{}Infinity", sign)
    } else {
        // f64's Display already omits ".0"; only "-0" needs folding.
        let value = if value == 0.0 { 0.0 } else { value };
        format!("{}", value)
    }
}

/// Fresh random token in UUID v4 layout, used to namespace storage keys.
pub fn unique_token() -> String {
    let mut bits: u128 = rand::rng().random();
    bits = (bits & !(0xF << 76)) | (0x4 << 76);
    bits = (bits & !(0x3 << 62)) | (0x2 << 62);
    format!(
        "{:08x}-{:04x}-{:04x}-{:04x}-{:012x}",
        (bits >> 96) as u32,
        ((bits >> 80) & 0xFFFF) as u16,
        ((bits >> 64) & 0xFFFF) as u16,
        ((bits >> 48) & 0xFFFF) as u16,
        (bits & 0xFFFF_FFFF_FFFF) as u64
    )
}
