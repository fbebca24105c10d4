//! Loosely typed table cell values.
//!
//! The pipeline emits each cell as a number, a string, or null depending on
//! how the column was produced. [`Scalar`] keeps that shape so values can be
//! stored and sent back unchanged, with explicit coercions where a number is
//! needed.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::utils::{coerce_number, number_to_text, parse_leading_float};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Number(f64),
    Text(String),
    #[default]
    Empty,
}

impl Scalar {
    pub fn blank() -> Self {
        Scalar::Text(String::new())
    }

    /// Strict coercion: blank/null is 0, non-numeric text is NaN.
    pub fn to_number(&self) -> f64 {
        match self {
            Scalar::Number(v) => *v,
            Scalar::Text(s) => coerce_number(s),
            Scalar::Empty => 0.0,
        }
    }

    /// Lenient parse of a leading numeric prefix; `None` when nothing parses.
    pub fn parse_lenient(&self) -> Option<f64> {
        match self {
            Scalar::Number(v) if v.is_nan() => None,
            Scalar::Number(v) => Some(*v),
            Scalar::Text(s) => parse_leading_float(s),
            Scalar::Empty => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Number(v) => write!(f, "{}", number_to_text(*v)),
            Scalar::Text(s) => write!(f, "{}", s),
            Scalar::Empty => Ok(()),
        }
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::Number(v)
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::Text(s.to_string())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Scalar::Text(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_every_cell_shape() {
        let cells: Vec<Scalar> = serde_json::from_str(r#"[1.5, "abc", null, 7]"#).unwrap();
        assert_eq!(
            cells,
            vec![
                Scalar::Number(1.5),
                Scalar::Text("abc".into()),
                Scalar::Empty,
                Scalar::Number(7.0)
            ]
        );
    }

    #[test]
    fn coercions() {
        assert_eq!(Scalar::blank().to_number(), 0.0);
        assert_eq!(Scalar::Empty.to_number(), 0.0);
        assert!(Scalar::from("1.2x").to_number().is_nan());
        assert_eq!(Scalar::from("1.2x").parse_lenient(), Some(1.2));
        assert_eq!(Scalar::from("x").parse_lenient(), None);
        assert_eq!(Scalar::Number(3.0).to_string(), "3");
        assert_eq!(Scalar::Empty.to_string(), "");
        assert_eq!(Scalar::Number(1e20).to_string(), "100000000000000000000");
    }
}
