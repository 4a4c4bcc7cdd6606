//! Pure formatting and normalization helpers
//!
//! Everything here is deterministic so the frame renderer can rely on
//! column widths, and so the behavior can be pinned down in tests.

/// How a number handed to [`scale_magnitude`] should be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleKind {
    /// A plain count; the first suffix tried is `k`
    Count = 0,
    /// Kibibytes; the first suffix tried is `m`
    Kb = 1,
    /// Mebibytes; the first suffix tried is `g`
    Mb = 2,
    /// Gibibytes; the first suffix tried is `t`
    Gb = 3,
}

const SUFFIXES: [char; 4] = ['k', 'm', 'g', 't'];

/// Renders `value` into at most `width` characters.
///
/// The unscaled integer is tried first, then each larger unit with one
/// decimal and then as an integer. Returns `"?"` if nothing fits.
#[must_use]
pub fn scale_magnitude(value: u64, width: usize, kind: ScaleKind) -> String {
    let plain = value.to_string();
    if plain.len() <= width {
        return plain;
    }

    let mut divisor = 1024.0_f64;
    for suffix in SUFFIXES.iter().skip(kind as usize) {
        let scaled = value as f64 / divisor;
        let precise = format!("{:.1}{}", scaled, suffix);
        if precise.len() <= width {
            return precise;
        }
        let whole = format!("{}{}", scaled as u64, suffix);
        if whole.len() <= width {
            return whole;
        }
        divisor *= 1024.0;
    }
    "?".to_string()
}

/// Renders cpu tics as elapsed time within `width` characters.
///
/// Forms tried in order: `M:SS.cc`, `M:SS`, `H,MM`, `Nh`, `Nd`, `Nw`.
#[must_use]
pub fn scale_duration(tics: u64, tick_rate: u64, width: usize) -> String {
    let rate = tick_rate.max(1) as u128;
    let mut nt = (tics as u128 * 100) / rate;
    let cc = nt % 100;
    nt /= 100;
    let secs = nt % 60;
    nt /= 60;

    let candidate = format!("{}:{:02}.{:02}", nt, secs, cc);
    if candidate.len() <= width {
        return candidate;
    }
    let candidate = format!("{}:{:02}", nt, secs);
    if candidate.len() <= width {
        return candidate;
    }

    let mins = nt % 60;
    let hours = nt / 60;
    let candidate = format!("{},{:02}", hours, mins);
    if candidate.len() <= width {
        return candidate;
    }
    let candidate = format!("{}h", hours);
    if candidate.len() <= width {
        return candidate;
    }
    let days = hours / 24;
    let candidate = format!("{}d", days);
    if candidate.len() <= width {
        return candidate;
    }
    let candidate = format!("{}w", days / 7);
    if candidate.len() <= width {
        return candidate;
    }
    "?".to_string()
}

/// Multiplier turning "tics this interval" into a percentage.
///
/// `normalization` is 1 in Irix mode, or the cpu count in Solaris mode.
/// Returns 0 when no interval has elapsed yet.
#[must_use]
pub fn percent_scale(elapsed_secs: f64, tick_rate: u64, normalization: u32) -> f64 {
    let denom = tick_rate as f64 * elapsed_secs * normalization.max(1) as f64;
    if denom > 0.0 {
        100.0 / denom
    } else {
        0.0
    }
}

/// CPU usage of one task over the last interval, clamped to `ceiling`.
#[must_use]
pub fn cpu_percent(
    delta_tics: u64,
    elapsed_secs: f64,
    tick_rate: u64,
    normalization: u32,
    ceiling: f64,
) -> f64 {
    let pct = delta_tics as f64 * percent_scale(elapsed_secs, tick_rate, normalization);
    pct.min(ceiling)
}

/// Equal share of leftover columns for each variable width field.
///
/// `remaining` already includes the header widths of those fields.
#[must_use]
pub fn allocate_variable_width_budget(remaining: usize, variable_fields: usize) -> usize {
    if variable_fields == 0 {
        0
    } else {
        remaining / variable_fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_magnitude_plain_when_it_fits() {
        assert_eq!(scale_magnitude(1234, 4, ScaleKind::Kb), "1234");
        assert_eq!(scale_magnitude(0, 4, ScaleKind::Count), "0");
    }

    #[test]
    fn test_scale_magnitude_kib_to_mib() {
        assert_eq!(scale_magnitude(10000, 4, ScaleKind::Kb), "9.8m");
        // 30.0m is one column too wide
        assert_eq!(scale_magnitude(30720, 4, ScaleKind::Kb), "30m");
    }

    #[test]
    fn test_scale_magnitude_count_starts_at_kilo() {
        assert_eq!(scale_magnitude(123_456, 4, ScaleKind::Count), "120k");
    }

    #[test]
    fn test_scale_magnitude_gives_up() {
        assert_eq!(scale_magnitude(u64::MAX, 1, ScaleKind::Gb), "?");
    }

    #[test]
    fn test_scale_magnitude_always_fits_and_refines_with_width() {
        let unit_rank = |s: &str| match s.chars().last() {
            Some('k') => 1,
            Some('m') => 2,
            Some('g') => 3,
            Some('t') => 4,
            Some('?') => 5,
            _ => 0,
        };
        let values = [0u64, 9, 99_999, 1 << 20, 7_340_032, 1 << 40, u64::MAX / 3];
        for kind in [ScaleKind::Count, ScaleKind::Kb, ScaleKind::Mb, ScaleKind::Gb] {
            for &v in &values {
                let mut prev_rank = usize::MAX;
                for w in 4..=12 {
                    let s = scale_magnitude(v, w, kind);
                    assert!(s.len() <= w, "{} at width {} gave {}", v, w, s);
                    let rank = unit_rank(&s);
                    assert!(rank <= prev_rank, "{} coarser at width {}", v, w);
                    prev_rank = rank;
                }
            }
        }
    }

    #[test]
    fn test_scale_duration_seconds_with_centis() {
        // 59 seconds at 100 Hz
        assert_eq!(scale_duration(5900, 100, 9), "0:59.00");
    }

    #[test]
    fn test_scale_duration_minute_boundary() {
        assert_eq!(scale_duration(6000, 100, 9), "1:00.00");
        assert_eq!(scale_duration(6000, 100, 6), "1:00");
    }

    #[test]
    fn test_scale_duration_hour_form() {
        // 3600 seconds: 60:00.00 is 8 wide, 60:00 is 5 wide
        assert_eq!(scale_duration(360_000, 100, 8), "60:00.00");
        assert_eq!(scale_duration(360_000, 100, 5), "60:00");
        assert_eq!(scale_duration(360_000, 100, 4), "1,00");
    }

    #[test]
    fn test_scale_duration_day_and_week() {
        let day = 24 * 3600 * 100;
        // 24 hours: "1440:00" too wide for 3, "24,00" too wide, "24h" fits
        assert_eq!(scale_duration(day, 100, 3), "24h");
        assert_eq!(scale_duration(day * 7, 100, 3), "7d");
        assert_eq!(scale_duration(day * 140, 100, 3), "20w");
        assert_eq!(scale_duration(day * 140, 100, 2), "?");
    }

    #[test]
    fn test_cpu_percent_full_core() {
        let pct = cpu_percent(100, 1.0, 100, 1, f64::INFINITY);
        assert!((pct - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_cpu_percent_solaris_normalization_and_ceiling() {
        let pct = cpu_percent(100, 1.0, 100, 4, f64::INFINITY);
        assert!((pct - 25.0).abs() < 1e-9);
        assert_eq!(cpu_percent(500, 1.0, 100, 1, 99.9), 99.9);
    }

    #[test]
    fn test_cpu_percent_no_interval() {
        assert_eq!(cpu_percent(100, 0.0, 100, 1, 99.9), 0.0);
    }

    #[test]
    fn test_variable_width_share() {
        assert_eq!(allocate_variable_width_budget(30, 2), 15);
        assert_eq!(allocate_variable_width_budget(31, 2), 15);
        assert_eq!(allocate_variable_width_budget(31, 0), 0);
    }
}
