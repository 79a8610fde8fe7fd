//! Click line parser for the native monitor output.
//!
//! The monitor writes free-form log lines. Click events are the lines that
//! contain four `key=value` fragments in a fixed order:
//!
//! ```text
//! [OS Monitor] Click detected: x=100.0, y=200.0, button=0, time=1234.567
//! ```
//!
//! The fragments may appear anywhere in the line. Every other line is
//! informational and yields no event.
//!
//! # Example
//!
//! ```
//! use click_bridge::parser::parse_click_line;
//!
//! let event = parse_click_line("Click detected: x=12.5, y=7.0, button=1, time=1000.25")
//!     .expect("click line");
//! assert_eq!(event.button, 1);
//!
//! assert!(parse_click_line("[OS Monitor] Event tap installed").is_none());
//! ```

use std::sync::LazyLock;

use regex::Regex;
use tracing::trace;

use crate::types::ClickEvent;

/// Click fragment pattern. Every value is unsigned.
static CLICK_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"x=([\d.]+), y=([\d.]+), button=(\d+), time=([\d.]+)")
        .expect("click pattern is a valid regex")
});

/// Parses one monitor log line into a click event.
///
/// Returns `None` when the line does not carry a click, which is the normal
/// outcome for status and debug output. A line that matches the pattern but
/// holds an unparseable number (for example `x=1.2.3`) is also `None`.
#[must_use]
pub fn parse_click_line(line: &str) -> Option<ClickEvent> {
    let captures = CLICK_PATTERN.captures(line)?;

    let x = captures[1].parse::<f64>().ok()?;
    let y = captures[2].parse::<f64>().ok()?;
    let button = captures[3].parse::<i64>().ok()?;
    let timestamp = captures[4].parse::<f64>().ok()?;

    trace!(x, y, button, timestamp, "Parsed click line");

    Some(ClickEvent::new(x, y, button, timestamp))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_monitor_click_line() {
        let line = "[OS Monitor] Click detected: x=100.0, y=200.0, button=0, time=1234.567";

        let event = parse_click_line(line).expect("should parse click");

        assert_eq!(event, ClickEvent::new(100.0, 200.0, 0, 1234.567));
    }

    #[test]
    fn parses_fragment_embedded_in_arbitrary_text() {
        let expected = ClickEvent::new(12.5, 7.0, 1, 1000.25);

        for line in [
            "x=12.5, y=7.0, button=1, time=1000.25",
            "prefix x=12.5, y=7.0, button=1, time=1000.25",
            "x=12.5, y=7.0, button=1, time=1000.25 trailing words",
            "2026-01-15 [debug] <<x=12.5, y=7.0, button=1, time=1000.25>> done",
        ] {
            assert_eq!(parse_click_line(line), Some(expected), "line: {line}");
        }
    }

    #[test]
    fn parses_integer_valued_coordinates() {
        let event = parse_click_line("x=3, y=4, button=2, time=99").expect("should parse");

        assert_eq!(event, ClickEvent::new(3.0, 4.0, 2, 99.0));
    }

    #[test]
    fn ignores_negative_coordinates() {
        assert!(parse_click_line("x=-1440.5, y=12.0, button=0, time=5.5").is_none());
        assert!(parse_click_line("x=1440.5, y=-12.0, button=0, time=5.5").is_none());
        assert!(parse_click_line("x=-1440.5, y=-12.0, button=0, time=5.5").is_none());
    }

    #[test]
    fn ignores_informational_lines() {
        for line in [
            "",
            "[OS Monitor] Starting event tap",
            "Accessibility permission granted",
            "x=1.0 y=2.0 button=0 time=3.0",
        ] {
            assert!(parse_click_line(line).is_none(), "line: {line}");
        }
    }

    #[test]
    fn requires_all_four_fragments() {
        assert!(parse_click_line("x=1.0, y=2.0, button=0").is_none());
        assert!(parse_click_line("x=1.0, y=2.0, time=3.0").is_none());
        assert!(parse_click_line("y=2.0, button=0, time=3.0").is_none());
    }

    #[test]
    fn requires_fragments_in_order() {
        assert!(parse_click_line("y=2.0, x=1.0, button=0, time=3.0").is_none());
        assert!(parse_click_line("x=1.0, y=2.0, time=3.0, button=0").is_none());
    }

    #[test]
    fn rejects_negative_button_and_time() {
        assert!(parse_click_line("x=1.0, y=2.0, button=-1, time=3.0").is_none());
        assert!(parse_click_line("x=1.0, y=2.0, button=1, time=-3.0").is_none());
    }

    #[test]
    fn malformed_numbers_yield_none() {
        assert!(parse_click_line("x=1.2.3, y=2.0, button=0, time=3.0").is_none());
        assert!(parse_click_line("x=1.0, y=., button=0, time=3.0").is_none());
        assert!(parse_click_line("x=1.0, y=2.0, button=0, time=..").is_none());
    }

    #[test]
    fn oversized_button_yields_none() {
        let line = "x=1.0, y=2.0, button=99999999999999999999999, time=3.0";
        assert!(parse_click_line(line).is_none());
    }

    #[test]
    fn first_click_on_line_wins() {
        let line = "x=1.0, y=2.0, button=0, time=3.0 | x=9.0, y=9.0, button=9, time=9.0";

        let event = parse_click_line(line).expect("should parse");

        assert_eq!(event, ClickEvent::new(1.0, 2.0, 0, 3.0));
    }
}
