//! Terminal rendering with ratatui.
//!
//! - [`common`]: header, tab bar, status bar and help overlay
//! - [`sensors`]: table of every sensor
//! - [`stale`]: sensors that have gone silent
//! - [`detail`]: overlay for a single sensor
//! - [`theme`]: colors and styles

pub mod common;
pub mod detail;
pub mod sensors;
pub mod stale;
pub mod theme;

pub use theme::Theme;

/// Format a count for display (e.g., 1234 -> "1.2K", 1234567 -> "1.2M").
pub fn format_count(n: u64) -> String {
    if n >= 1_000_000 {
        format!("{:.1}M", n as f64 / 1_000_000.0)
    } else if n >= 1_000 {
        format!("{:.1}K", n as f64 / 1_000.0)
    } else {
        n.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1_234), "1.2K");
        assert_eq!(format_count(1_234_567), "1.2M");
    }
}
