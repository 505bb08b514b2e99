//! Text normalisation and primitive coercions used by the field extractors.
//!
//! Every parser returns the reason on failure instead of a fallback value;
//! placeholder handling is the extractor's job, not ours.

// ── Text ──────────────────────────────────────────────────────────────────────

/// Collapse runs of whitespace (including `&nbsp;`) into single spaces and trim.
/// "  SIDNEY\u{a0}\u{a0}CROSBY \n" → "SIDNEY CROSBY"
pub fn normalise_text(s: &str) -> String {
    s.split(|c: char| c.is_whitespace() || c == '\u{a0}')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Remove parenthesised markers such as the captaincy tags in roster names.
/// "SIDNEY CROSBY (C)" → "SIDNEY CROSBY"
pub fn strip_markers(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut depth = 0usize;
    for ch in s.chars() {
        match ch {
            '(' => depth += 1,
            ')' if depth > 0 => depth -= 1,
            _ if depth == 0 => out.push(ch),
            _ => {}
        }
    }
    normalise_text(&out)
}

/// Typographic minus signs show up in some reports.
fn ascii_minus(s: &str) -> String {
    s.trim().replace(['\u{2212}', '\u{2013}'], "-")
}

// ── Numbers ───────────────────────────────────────────────────────────────────

/// "12" → 12 | "+3" → 3 | "−1" → -1
pub fn parse_int(s: &str) -> Result<i64, String> {
    let s = ascii_minus(s);
    if s.is_empty() {
        return Err("empty text".to_string());
    }
    s.parse::<i64>().map_err(|e| e.to_string())
}

pub fn parse_float(s: &str) -> Result<f64, String> {
    let s = ascii_minus(s);
    if s.is_empty() {
        return Err("empty text".to_string());
    }
    let value: f64 = s.parse().map_err(|e: std::num::ParseFloatError| e.to_string())?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err("not a finite number".to_string())
    }
}

/// "52.4%" → 52.4 | "50" → 50.0
pub fn parse_percent(s: &str) -> Result<f64, String> {
    parse_float(s.trim().trim_end_matches('%'))
}

// ── Clock ─────────────────────────────────────────────────────────────────────

/// Game clock "MM:SS" into seconds. "18:32" → 1112 | "0:45" → 45
pub fn parse_clock(s: &str) -> Result<i64, String> {
    let s = s.trim();
    let (minutes, seconds) = s
        .split_once(':')
        .ok_or_else(|| "expected MM:SS".to_string())?;

    let minutes: i64 = minutes
        .parse()
        .map_err(|_| format!("bad minutes '{}'", minutes))?;
    let seconds: i64 = seconds
        .parse()
        .map_err(|_| format!("bad seconds '{}'", seconds))?;

    if minutes < 0 || !(0..60).contains(&seconds) {
        return Err("clock out of range".to_string());
    }
    minutes
        .checked_mul(60)
        .and_then(|m| m.checked_add(seconds))
        .ok_or_else(|| "clock out of range".to_string())
}

// ── Booleans ──────────────────────────────────────────────────────────────────

pub fn parse_bool(s: &str) -> Result<bool, String> {
    match s.trim().to_lowercase().as_str() {
        "true" | "yes" | "1" => Ok(true),
        "false" | "no" | "0" => Ok(false),
        other => Err(format!("'{}' is not a boolean token", other)),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
