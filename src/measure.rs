//! Extraction of the measurement from a child's standard output.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Adapter between the target program's output format and the CSV cell.
pub trait MeasurementParser: Send + Sync {
    /// Returns the measurement as it should appear in the CSV, or `None` when
    /// the output does not contain one.
    fn parse(&self, stdout: &str) -> Option<String>;
}

/// Built-in parsers, selectable from configuration files.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "marker", rename_all = "snake_case")]
pub enum Parser {
    /// Last numeric token anywhere in the output.
    #[default]
    LastNumber,
    /// The whole trimmed output must be a single number.
    Exact,
    /// First number following the last occurrence of a marker text.
    After(String),
}

impl MeasurementParser for Parser {
    fn parse(&self, stdout: &str) -> Option<String> {
        match self {
            Parser::LastNumber => stdout
                .split(|c: char| c.is_whitespace() || c == ',' || c == ';')
                .rev()
                .find_map(numeric_token),
            Parser::Exact => numeric_token(stdout.trim()).filter(|t| t.len() == stdout.trim().len()),
            Parser::After(marker) => {
                let (_, rest) = stdout.rsplit_once(marker.as_str())?;
                rest.split_whitespace().next().and_then(numeric_token)
            }
        }
    }
}

impl FromStr for Parser {
    type Err = String;

    /// `last`, `exact` or `after:<marker>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "last" | "last_number" => Ok(Parser::LastNumber),
            "exact" => Ok(Parser::Exact),
            other => match other.strip_prefix("after:") {
                Some(marker) if !marker.is_empty() => Ok(Parser::After(marker.to_string())),
                _ => Err(format!("unknown parser `{other}` (expected last, exact or after:<marker>)")),
            },
        }
    }
}

impl fmt::Display for Parser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Parser::LastNumber => f.write_str("last"),
            Parser::Exact => f.write_str("exact"),
            Parser::After(m) => write!(f, "after:{m}"),
        }
    }
}

/// Strips surrounding punctuation and unit suffixes (`12.5ms`, `(42)`) and
/// keeps the token when what remains parses as a finite number.
fn numeric_token(token: &str) -> Option<String> {
    let trimmed = token.trim_matches(|c: char| "()[]{}\"':".contains(c));
    let end = trimmed
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || c == '.' || ((c == '-' || c == '+') && i == 0) || c == 'e' || c == 'E'))
        .map_or(trimmed.len(), |(i, _)| i);
    let number = trimmed[..end].trim_end_matches('.');
    match number.parse::<f64>() {
        Ok(v) if v.is_finite() && !number.is_empty() => Some(number.to_string()),
        _ => None,
    }
}
