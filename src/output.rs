//! Reporter implementations.
//!
//! [`ConsoleReporter`] prints a nested, colored run report for standalone
//! use; host runners with their own group/case primitives implement
//! [`Reporter`](crate::runner::Reporter) directly instead.
//! [`RecordingReporter`] captures the event stream for assertions in tests.

use difference::{Changeset, Difference};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::runner::{CaseReport, Reporter};

// Color constants for plain terminal output.
const RESET: &str = "\x1b[0m";
const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";

/// Prints groups as indented headers and cases as PASS/FAIL lines, with a
/// colored line diff for failing content comparisons.
pub struct ConsoleReporter {
    use_colors: bool,
    depth: usize,
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self {
            use_colors: atty::is(atty::Stream::Stderr),
            depth: 0,
        }
    }
}

impl ConsoleReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_colors(use_colors: bool) -> Self {
        Self {
            use_colors,
            depth: 0,
        }
    }

    fn colorize(&self, text: &str, color: &str) -> String {
        if self.use_colors {
            format!("{}{}{}", color, text, RESET)
        } else {
            text.to_string()
        }
    }

    fn indent(&self) -> String {
        "  ".repeat(self.depth)
    }
}

impl Reporter for ConsoleReporter {
    fn enter_group(&mut self, name: &str) {
        println!("{}{}", self.indent(), self.colorize(name, YELLOW));
        self.depth += 1;
    }

    fn leave_group(&mut self, _name: &str) {
        self.depth = self.depth.saturating_sub(1);
    }

    fn report_case(&mut self, report: &CaseReport) {
        if report.passed() {
            println!(
                "{}{}: {}",
                self.indent(),
                self.colorize("PASS", GREEN),
                report.name
            );
            return;
        }

        eprintln!(
            "{}{}: {}",
            self.indent(),
            self.colorize("FAIL", RED),
            report.name
        );
        for check in &report.checks {
            if check.passed {
                continue;
            }
            eprintln!("{}  failed: {}", self.indent(), check.description);
            if let (Some(expected), Some(actual)) = (&check.expected, &check.actual) {
                eprintln!("{}    expected: {}", self.indent(), expected.trim_end());
                eprintln!("{}    actual:   {}", self.indent(), actual.trim_end());
                if expected.lines().count() > 1 || actual.lines().count() > 1 {
                    print_diff(expected, actual);
                }
            }
        }
    }
}

/// Prints a colored line diff of a content mismatch.
fn print_diff(expected: &str, actual: &str) {
    let mut stderr = StandardStream::stderr(ColorChoice::Auto);
    let changeset = Changeset::new(expected, actual, "\n");
    for diff in &changeset.diffs {
        match diff {
            Difference::Same(ref lines) => {
                let _ = stderr.reset();
                eprintln!(" {}", lines);
            }
            Difference::Add(ref lines) => {
                let _ = stderr.set_color(ColorSpec::new().set_fg(Some(Color::Red)));
                eprintln!("+{}", lines);
            }
            Difference::Rem(ref lines) => {
                let _ = stderr.set_color(ColorSpec::new().set_fg(Some(Color::Green)));
                eprintln!("-{}", lines);
            }
        }
    }
    let _ = stderr.reset();
}

/// Records reporter events as a readable trace, for tests.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    pub events: Vec<ReporterEvent>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReporterEvent {
    EnterGroup(String),
    LeaveGroup(String),
    Case(CaseReport),
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// One line per event, convenient for order assertions.
    pub fn trace(&self) -> Vec<String> {
        self.events
            .iter()
            .map(|event| match event {
                ReporterEvent::EnterGroup(name) => format!("enter {name}"),
                ReporterEvent::LeaveGroup(name) => format!("leave {name}"),
                ReporterEvent::Case(report) => format!(
                    "case {}: {}",
                    report.name,
                    if report.passed() { "pass" } else { "fail" }
                ),
            })
            .collect()
    }

    pub fn case_reports(&self) -> Vec<&CaseReport> {
        self.events
            .iter()
            .filter_map(|event| match event {
                ReporterEvent::Case(report) => Some(report),
                _ => None,
            })
            .collect()
    }
}

impl Reporter for RecordingReporter {
    fn enter_group(&mut self, name: &str) {
        self.events.push(ReporterEvent::EnterGroup(name.to_string()));
    }

    fn leave_group(&mut self, name: &str) {
        self.events.push(ReporterEvent::LeaveGroup(name.to_string()));
    }

    fn report_case(&mut self, report: &CaseReport) {
        self.events.push(ReporterEvent::Case(report.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::CheckOutcome;

    fn report(name: &str, passed: bool) -> CaseReport {
        CaseReport {
            name: name.into(),
            checks: vec![CheckOutcome {
                description: "values are equal".into(),
                passed,
                expected: Some("1".into()),
                actual: Some(if passed { "1" } else { "2" }.into()),
            }],
        }
    }

    #[test]
    fn recording_reporter_preserves_event_order() {
        let mut reporter = RecordingReporter::new();
        reporter.enter_group("g");
        reporter.report_case(&report("a", true));
        reporter.report_case(&report("b", false));
        reporter.leave_group("g");
        assert_eq!(
            reporter.trace(),
            vec!["enter g", "case a: pass", "case b: fail", "leave g"]
        );
        assert_eq!(reporter.case_reports().len(), 2);
    }

    #[test]
    fn console_reporter_colorize_respects_the_flag() {
        let plain = ConsoleReporter::with_colors(false);
        assert_eq!(plain.colorize("PASS", GREEN), "PASS");
        let colored = ConsoleReporter::with_colors(true);
        assert_eq!(colored.colorize("PASS", GREEN), "\x1b[32mPASS\x1b[0m");
    }
}
