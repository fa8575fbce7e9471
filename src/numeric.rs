//! Shared numeric coercion policy: unparsable text in a numeric field
//! silently becomes 0. Every extraction and aggregation path goes through
//! these helpers so the defaulting rule lives in exactly one place.

/// Integer coercion with the source's semantics: digits only, else 0.
pub fn int_or_zero(raw: &str) -> i64 {
    let s = raw.trim();
    if !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()) {
        s.parse::<i64>().unwrap_or(0)
    } else {
        0
    }
}

/// `made/attempted * 100` rounded to one decimal. Zero attempts is a
/// legitimate state (player never shot), not an error.
pub fn pct(made: f64, attempted: f64) -> f64 {
    if attempted > 0.0 {
        round1(made / attempted * 100.0)
    } else {
        0.0
    }
}

pub fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Render a numeric cell the way the persisted tables expect: integers
/// without a decimal point, everything else in shortest form.
pub fn fmt(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{v}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_coercion_defaults_to_zero() {
        assert_eq!(int_or_zero("12"), 12);
        assert_eq!(int_or_zero(" 7 "), 7);
        assert_eq!(int_or_zero(""), 0);
        assert_eq!(int_or_zero("-"), 0);
        assert_eq!(int_or_zero("abc"), 0);
        assert_eq!(int_or_zero("3.5"), 0);
    }

    #[test]
    fn pct_handles_zero_attempts() {
        assert_eq!(pct(7.0, 12.0), 58.3);
        assert_eq!(pct(0.0, 0.0), 0.0);
        assert_eq!(pct(3.0, 0.0), 0.0);
    }

    #[test]
    fn formatting_drops_trailing_zero() {
        assert_eq!(fmt(7.0), "7");
        assert_eq!(fmt(58.3), "58.3");
        assert_eq!(fmt(92.8), "92.8");
    }
}
