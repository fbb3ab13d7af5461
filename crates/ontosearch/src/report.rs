//! Structured operation reports.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Severity of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportKind {
    Info,
    Success,
    Error,
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ReportKind::Info => "info",
            ReportKind::Success => "success",
            ReportKind::Error => "error",
        })
    }
}

/// Outcome of an administrative operation, possibly with sub-reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub kind: ReportKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Report>,
}

impl Report {
    pub fn new(kind: ReportKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            children: Vec::new(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(ReportKind::Info, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(ReportKind::Success, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(ReportKind::Error, message)
    }

    pub fn with_child(mut self, child: Report) -> Self {
        self.children.push(child);
        self
    }

    pub fn add(&mut self, child: Report) {
        self.children.push(child);
    }

    /// Returns true if this report or any descendant is an error.
    pub fn contains_error(&self) -> bool {
        self.kind == ReportKind::Error || self.children.iter().any(Report::contains_error)
    }

    fn write_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        writeln!(f, "{:indent$}[{}] {}", "", self.kind, self.message, indent = depth * 2)?;
        for child in &self.children {
            child.write_indented(f, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_indented(f, 0)
    }
}
