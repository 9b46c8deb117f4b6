//! Formatted output helpers for CLI commands.

use std::time::Duration;

pub const BOLD: &str = "\x1b[1m";
pub const DIM: &str = "\x1b[2m";
pub const GREEN: &str = "\x1b[32m";
pub const YELLOW: &str = "\x1b[33m";
pub const RESET: &str = "\x1b[0m";

/// Formats a list of container ports (e.g., "22/tcp, 80/tcp").
#[must_use]
pub fn format_ports(ports: &[u16]) -> String {
    if ports.is_empty() {
        return "-".to_string();
    }
    ports
        .iter()
        .map(|p| format!("{p}/tcp"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Formats an elapsed duration with one decimal (e.g., "2.5s").
#[must_use]
pub fn format_elapsed(elapsed: Duration) -> String {
    format!("{:.1}s", elapsed.as_secs_f64())
}

/// Renders a boolean as "yes" or "no".
#[must_use]
pub const fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_ports_lists_tcp_ports() {
        assert_eq!(format_ports(&[22]), "22/tcp");
        assert_eq!(format_ports(&[22, 8080]), "22/tcp, 8080/tcp");
    }

    #[test]
    fn format_ports_without_ports() {
        assert_eq!(format_ports(&[]), "-");
    }

    #[test]
    fn format_elapsed_rounds_to_tenths() {
        assert_eq!(format_elapsed(Duration::from_millis(2_460)), "2.5s");
        assert_eq!(format_elapsed(Duration::ZERO), "0.0s");
    }

    #[test]
    fn yes_no_renders_booleans() {
        assert_eq!(yes_no(true), "yes");
        assert_eq!(yes_no(false), "no");
    }
}
