//! Human-readable formatting helpers for the status and progress renderers.

/// Binary magnitude prefixes; index 0 is unused because sub-kilobyte counts
/// print as plain bytes.
const PREFIXES: [char; 7] = ['.', 'k', 'M', 'G', 'T', 'P', 'E'];

/// Formats a byte count with binary prefixes and two decimal places.
#[must_use]
pub fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64;
    let mut exponent = 0usize;
    while value >= 1024.0 && exponent < PREFIXES.len() - 1 {
        value /= 1024.0;
        exponent += 1;
    }
    format!("{value:.2} {}B", PREFIXES[exponent])
}

/// Shortens text to `width` visible characters, marking the cut with `…`.
#[must_use]
pub fn truncate(text: &str, width: usize) -> String {
    if width == 0 {
        return String::new();
    }
    if text.chars().count() <= width {
        return text.to_owned();
    }
    let kept: String = text.chars().take(width.saturating_sub(1)).collect();
    format!("{kept}…")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_below_one_kilobyte_print_plainly() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(1023), "1023 B");
    }

    #[test]
    fn larger_sizes_use_binary_prefixes() {
        assert_eq!(format_size(2048), "2.00 kB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.00 MB");
        assert_eq!(format_size(1536 * 1024 * 1024), "1.50 GB");
        assert_eq!(format_size(u64::MAX), "16.00 EB");
    }

    #[test]
    fn truncate_marks_the_cut() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("exactly-ten", 11), "exactly-ten");
        assert_eq!(truncate("much-too-long-identifier", 10), "much-too-…");
    }

    #[test]
    fn truncate_never_exceeds_the_requested_width() {
        assert_eq!(truncate("anything", 0), "");
        assert_eq!(truncate("ab", 1), "…");
    }
}
