use std::time::Duration;

pub(crate) const NA: &str = "n/a";

pub(crate) fn format_bytes(b: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = 1024 * 1024;
    const GIB: u64 = 1024 * 1024 * 1024;

    if b >= GIB {
        return format!("{:.2}GiB", (b as f64) / (GIB as f64));
    }
    if b >= MIB {
        return format!("{:.2}MiB", (b as f64) / (MIB as f64));
    }
    if b >= KIB {
        return format!("{:.2}KiB", (b as f64) / (KIB as f64));
    }

    format!("{b}B")
}

pub(crate) fn format_bytes_opt(b: Option<u64>) -> String {
    b.map_or_else(|| NA.to_string(), format_bytes)
}

/// Whole-number rate for progress lines.
pub(crate) fn format_rate(v: f64) -> String {
    if v.is_finite() {
        format!("{v:.0}")
    } else {
        "0".to_string()
    }
}

fn finite(v: Option<f64>) -> Option<f64> {
    v.filter(|v| v.is_finite())
}

pub(crate) fn format_ms_opt(v: Option<f64>) -> String {
    finite(v).map_or_else(|| NA.to_string(), |v| format!("{v:.2}ms"))
}

pub(crate) fn format_per_sec_opt(v: Option<f64>) -> String {
    finite(v).map_or_else(|| NA.to_string(), |v| format!("{v:.2}/s"))
}

/// `0.1` renders as `10.00%`.
pub(crate) fn format_pct_opt(v: Option<f64>) -> String {
    finite(v).map_or_else(|| NA.to_string(), |v| format!("{:.2}%", v * 100.0))
}

pub(crate) fn format_count_opt<T: std::fmt::Display>(v: Option<T>) -> String {
    v.map_or_else(|| NA.to_string(), |v| v.to_string())
}

/// Progress elapsed time, e.g. `1m05s` or `42s`.
pub(crate) fn format_elapsed(d: Duration) -> String {
    let secs = d.as_secs();
    if secs >= 60 {
        format!("{}m{:02}s", secs / 60, secs % 60)
    } else {
        format!("{secs}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_values_render_na() {
        assert_eq!(format_ms_opt(None), "n/a");
        assert_eq!(format_ms_opt(Some(f64::NAN)), "n/a");
        assert_eq!(format_per_sec_opt(None), "n/a");
        assert_eq!(format_pct_opt(None), "n/a");
        assert_eq!(format_count_opt::<u64>(None), "n/a");
        assert_eq!(format_bytes_opt(None), "n/a");
    }

    #[test]
    fn present_values_use_fixed_precision() {
        assert_eq!(format_ms_opt(Some(123.456)), "123.46ms");
        assert_eq!(format_per_sec_opt(Some(12.344)), "12.34/s");
        assert_eq!(format_pct_opt(Some(0.1)), "10.00%");
        assert_eq!(format_bytes(2048), "2.00KiB");
        assert_eq!(format_bytes(512), "512B");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.00MiB");
    }

    #[test]
    fn elapsed_switches_to_minutes() {
        assert_eq!(format_elapsed(Duration::from_secs(42)), "42s");
        assert_eq!(format_elapsed(Duration::from_secs(65)), "1m05s");
    }
}
