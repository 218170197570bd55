//! Diagnostic reporting for the cooking pipeline.
//!
//! Every operation that can warn or fail takes an explicit `&dyn Reporter`
//! instead of writing to a global sink. The binary uses [`LogReporter`],
//! which forwards to the `log` facade; tests use [`CollectingReporter`] to
//! assert on what was reported.

use std::cell::RefCell;
use std::fmt;

/// Severity of a diagnostic message.
///
/// Mirrors the message types a codegen plugin may report, so plugin output
/// can be forwarded without translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Error,
    Fatal,
}

impl Severity {
    /// Decode the severity integer used by the plugin ABI.
    ///
    /// Unknown values are treated as informational.
    pub fn from_abi(value: i32) -> Self {
        match value {
            0 => Severity::Info,
            1 => Severity::Warning,
            2 => Severity::Error,
            3 => Severity::Fatal,
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Fatal => "fatal",
        };
        write!(f, "{}", name)
    }
}

/// A single reported message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
}

/// Sink for diagnostics produced while cooking a recipe.
pub trait Reporter {
    /// Report a message with the given severity.
    fn report(&self, severity: Severity, message: &str);

    fn info(&self, message: &str) {
        self.report(Severity::Info, message);
    }

    fn warning(&self, message: &str) {
        self.report(Severity::Warning, message);
    }

    fn error(&self, message: &str) {
        self.report(Severity::Error, message);
    }
}

/// Forwards diagnostics to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn report(&self, severity: Severity, message: &str) {
        match severity {
            Severity::Info => log::info!("{}", message),
            Severity::Warning => log::warn!("{}", message),
            Severity::Error => log::error!("{}", message),
            Severity::Fatal => log::error!("fatal: {}", message),
        }
    }
}

/// Records diagnostics in memory.
#[derive(Debug, Default)]
pub struct CollectingReporter {
    diagnostics: RefCell<Vec<Diagnostic>>,
}

impl CollectingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// All diagnostics reported so far, in order.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.borrow().clone()
    }

    /// Messages reported with exactly the given severity.
    pub fn messages(&self, severity: Severity) -> Vec<String> {
        self.diagnostics
            .borrow()
            .iter()
            .filter(|d| d.severity == severity)
            .map(|d| d.message.clone())
            .collect()
    }

    /// Whether any message containing `needle` was reported.
    pub fn contains(&self, needle: &str) -> bool {
        self.diagnostics
            .borrow()
            .iter()
            .any(|d| d.message.contains(needle))
    }
}

impl Reporter for CollectingReporter {
    fn report(&self, severity: Severity, message: &str) {
        self.diagnostics.borrow_mut().push(Diagnostic {
            severity,
            message: message.to_string(),
        });
    }
}
