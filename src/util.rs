// Utility helpers for parsing and basic statistics.
//
// All the forgiving cell-to-number handling lives here so the cleaner and the
// aggregations can work with typed values.
use num_format::{Locale, ToFormattedString};

/// Parse a cell into `f64` while being forgiving about formatting issues that
/// are common in spreadsheet exports.
///
/// - Trims whitespace.
/// - Rejects values that contain alphabetic characters (`"abc"`, `"NaN"`).
/// - Strips `","` thousands separators (`"1,234.5"`). A comma that is not
///   followed by exactly three digits (`"1,5"`, a decimal comma) is rejected
///   rather than guessed at.
/// - Returns `None` for anything that cannot be safely parsed.
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    if s.chars().any(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let int_part = s.split('.').next().unwrap_or_default();
    let mut groups = int_part.split(',');
    groups.next();
    if !groups.all(|g| g.len() == 3 && g.bytes().all(|b| b.is_ascii_digit())) {
        return None;
    }
    if s[int_part.len()..].contains(',') {
        return None;
    }
    let s = s.replace(',', "");
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Years arrive as `"2019"` or `"2019.0"`; anything non-integral is rejected.
pub fn parse_year(s: Option<&str>) -> Option<i32> {
    let v = parse_f64_safe(s)?;
    if v.fract() != 0.0 || v < i32::MIN as f64 || v > i32::MAX as f64 {
        return None;
    }
    Some(v as i32)
}

pub fn average(v: &[f64]) -> f64 {
    // Arithmetic mean; 0 for an empty slice to avoid NaNs.
    if v.is_empty() {
        return 0.0;
    }
    let sum: f64 = v.iter().copied().sum();
    sum / v.len() as f64
}

/// Sample standard deviation (n - 1). `None` below two values.
pub fn std_dev(v: &[f64]) -> Option<f64> {
    if v.len() < 2 {
        return None;
    }
    let mean = average(v);
    let ss: f64 = v.iter().map(|x| (x - mean).powi(2)).sum();
    Some((ss / (v.len() - 1) as f64).sqrt())
}

/// Quantile with linear interpolation between closest ranks.
///
/// Takes the vector by value so it can be sorted in place.
pub fn quantile(mut v: Vec<f64>, q: f64) -> Option<f64> {
    if v.is_empty() {
        return None;
    }
    v.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let pos = q.clamp(0.0, 1.0) * (v.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(v[lo] + (v[hi] - v[lo]) * frac)
}

/// Pearson correlation of paired samples. `None` with fewer than two pairs or
/// when either side has zero variance.
pub fn pearson(pairs: &[(f64, f64)]) -> Option<f64> {
    if pairs.len() < 2 {
        return None;
    }
    let n = pairs.len() as f64;
    let mx = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let my = pairs.iter().map(|p| p.1).sum::<f64>() / n;
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (x, y) in pairs {
        let (dx, dy) = (x - mx, y - my);
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx <= 0.0 || syy <= 0.0 {
        return None;
    }
    Some((sxy / (sxx.sqrt() * syy.sqrt())).clamp(-1.0, 1.0))
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Fixed decimals plus locale-aware thousands separators (`1,234,567.89`).
    if !n.is_finite() {
        return "nan".to_string();
    }
    let neg = n.is_sign_negative() && n != 0.0;
    let s = format!("{:.*}", decimals, n.abs());
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    let int_val: i64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = frac_part {
        if decimals > 0 {
            res.push('.');
            res.push_str(frac);
        }
    }
    if neg {
        format!("-{}", res)
    } else {
        res
    }
}

pub fn format_opt(n: Option<f64>, decimals: usize) -> String {
    n.map(|v| format_number(v, decimals))
        .unwrap_or_else(|| "nan".to_string())
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::en)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_f64_rejects_text_and_strips_commas() {
        assert_eq!(parse_f64_safe(Some(" 1,234.5 ")), Some(1234.5));
        assert_eq!(parse_f64_safe(Some("abc")), None);
        assert_eq!(parse_f64_safe(Some("12,345,678")), Some(12_345_678.0));
        // decimal commas are not thousands separators
        assert_eq!(parse_f64_safe(Some("1,5")), None);
        assert_eq!(parse_f64_safe(Some("1,50")), None);
        assert_eq!(parse_f64_safe(Some("1.5,000")), None);
        assert_eq!(parse_year(Some("2,019")), Some(2019));
        assert_eq!(parse_f64_safe(Some("")), None);
        assert_eq!(parse_f64_safe(None), None);
    }

    #[test]
    fn parse_year_requires_integral_value() {
        assert_eq!(parse_year(Some("2019")), Some(2019));
        assert_eq!(parse_year(Some("2019.0")), Some(2019));
        assert_eq!(parse_year(Some("2019.5")), None);
        assert_eq!(parse_year(Some("abc")), None);
    }

    #[test]
    fn quantile_interpolates() {
        let v = vec![1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile(v.clone(), 0.5), Some(2.5));
        assert_eq!(quantile(v.clone(), 0.25), Some(1.75));
        assert_eq!(quantile(v, 1.0), Some(4.0));
        assert_eq!(quantile(vec![], 0.5), None);
    }

    #[test]
    fn std_dev_uses_sample_denominator() {
        let sd = std_dev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert!((sd - 2.138089935).abs() < 1e-6);
        assert_eq!(std_dev(&[1.0]), None);
    }

    #[test]
    fn pearson_perfect_and_degenerate() {
        let r = pearson(&[(1.0, 2.0), (2.0, 4.0), (3.0, 6.0)]).unwrap();
        assert!((r - 1.0).abs() < 1e-12);
        let r = pearson(&[(1.0, 3.0), (2.0, 2.0), (3.0, 1.0)]).unwrap();
        assert!((r + 1.0).abs() < 1e-12);
        assert_eq!(pearson(&[(1.0, 5.0), (2.0, 5.0)]), None);
        assert_eq!(pearson(&[(1.0, 5.0)]), None);
    }

    #[test]
    fn format_number_groups_thousands() {
        assert_eq!(format_number(1234567.891, 2), "1,234,567.89");
        assert_eq!(format_number(-42.0, 0), "-42");
        assert_eq!(format_number(f64::NAN, 2), "nan");
        assert_eq!(format_opt(None, 2), "nan");
    }
}
