//! Syntax validation for hex colors and CSS-style linear-gradient strings.
//!
//! The controller silently accepts malformed gradient strings and renders
//! garbage (or nothing), so every gradient-bearing write goes through these
//! checks first. Rejections name the specific defect so a tool caller can
//! fix its input without guessing.

use crate::error::BridgeError;

/// What kind of literal a candidate string claims to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntaxKind {
    Color,
    Gradient,
}

/// Validate a candidate string against its declared kind.
pub fn validate(kind: SyntaxKind, value: &str) -> Result<(), BridgeError> {
    match kind {
        SyntaxKind::Color => validate_color(value),
        SyntaxKind::Gradient => validate_gradient(value),
    }
}

/// Strict hex color: `#RRGGBB` or `#RRGGBBAA`. No named colors, no
/// functional notations.
pub fn validate_color(value: &str) -> Result<(), BridgeError> {
    let value = value.trim();
    let Some(digits) = value.strip_prefix('#') else {
        return Err(BridgeError::validation(format!(
            "Invalid color \"{value}\": must be hex notation starting with '#'"
        )));
    };
    if digits.len() != 6 && digits.len() != 8 {
        return Err(BridgeError::validation(format!(
            "Invalid color \"{value}\": expected 6 or 8 hex digits, got {}",
            digits.len()
        )));
    }
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(BridgeError::validation(format!(
            "Invalid color \"{value}\": contains non-hex characters"
        )));
    }
    Ok(())
}

/// Validate a `linear-gradient(...)` literal: optional leading direction,
/// at least two stops, each stop carrying a trailing percentage in [0, 100],
/// percentages non-decreasing left to right.
pub fn validate_gradient(value: &str) -> Result<(), BridgeError> {
    let value = value.trim();
    let inner = gradient_body(value)?;

    let mut parts = split_top_level(inner);
    if parts.first().is_some_and(|p| is_direction(p)) {
        parts.remove(0);
    }

    if parts.len() < 2 {
        return Err(BridgeError::validation(format!(
            "Invalid gradient: needs at least two color stops, found {}",
            parts.len()
        )));
    }

    let mut prev_pct: Option<f64> = None;
    for (i, stop) in parts.iter().enumerate() {
        let pct = validate_stop(i, stop)?;
        if let Some(prev) = prev_pct {
            if pct < prev {
                return Err(BridgeError::validation(format!(
                    "Invalid gradient: decreasing percentage at stop {i} \
                     ({pct}% after {prev}%)"
                )));
            }
        }
        prev_pct = Some(pct);
    }
    Ok(())
}

/// Extract the body of a `linear-gradient(...)` call, rejecting other
/// function names or a missing closing paren.
fn gradient_body(value: &str) -> Result<&str, BridgeError> {
    let Some(rest) = value.strip_prefix("linear-gradient(") else {
        return Err(BridgeError::validation(format!(
            "Invalid gradient \"{value}\": must be linear-gradient(...)"
        )));
    };
    let Some(inner) = rest.strip_suffix(')') else {
        return Err(BridgeError::validation(format!(
            "Invalid gradient \"{value}\": missing closing parenthesis"
        )));
    };
    Ok(inner)
}

/// Split on commas at parenthesis depth 0 only. A naive comma split would
/// break functional color values like `rgb(255, 0, 0)` inside one stop.
fn split_top_level(s: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth: u32 = 0;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(s.get(start..i).unwrap_or("").trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(s.get(start..).unwrap_or("").trim());
    if parts.len() == 1 && parts.first().is_some_and(|p| p.is_empty()) {
        parts.clear();
    }
    parts
}

/// A leading direction token: an angle (`90deg`, `0.25turn`, `1.57rad`) or
/// `to <side>[ <side>]`.
fn is_direction(token: &str) -> bool {
    let token = token.trim();
    if let Some(sides) = token.strip_prefix("to ") {
        let sides: Vec<&str> = sides.split_whitespace().collect();
        return !sides.is_empty()
            && sides.len() <= 2
            && sides
                .iter()
                .all(|s| matches!(*s, "left" | "right" | "top" | "bottom"));
    }
    for suffix in ["deg", "rad", "turn"] {
        if let Some(num) = token.strip_suffix(suffix) {
            return num.trim().parse::<f64>().is_ok();
        }
    }
    false
}

/// Validate one color stop and return its percentage.
fn validate_stop(index: usize, stop: &str) -> Result<f64, BridgeError> {
    let Some((color, last)) = stop.rsplit_once(char::is_whitespace) else {
        // A single token is either a bare color (no percentage) or a bare
        // percentage (no color); report the more likely defect.
        if stop.ends_with('%') {
            return Err(BridgeError::validation(format!(
                "Invalid gradient: missing color at stop {index} (\"{stop}\")"
            )));
        }
        return Err(BridgeError::validation(format!(
            "Invalid gradient: missing percentage at stop {index} (\"{stop}\")"
        )));
    };

    let Some(pct_str) = last.strip_suffix('%') else {
        return Err(BridgeError::validation(format!(
            "Invalid gradient: missing percentage at stop {index} (\"{stop}\")"
        )));
    };
    let pct: f64 = pct_str.trim().parse().map_err(|_| {
        BridgeError::validation(format!(
            "Invalid gradient: unparseable percentage at stop {index} (\"{last}\")"
        ))
    })?;
    if !(0.0..=100.0).contains(&pct) {
        return Err(BridgeError::validation(format!(
            "Invalid gradient: percentage out of range at stop {index} \
             ({pct}% must be within 0-100)"
        )));
    }
    if color.trim().is_empty() {
        return Err(BridgeError::validation(format!(
            "Invalid gradient: missing color at stop {index}"
        )));
    }
    Ok(pct)
}
