use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A normalized course record extracted from one Júpiter Web course page.
///
/// Built once per successful fetch and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseRecord {
    /// Course code as supplied by the operator (e.g., "ACH0021").
    pub code: String,
    /// The exact URL queried for this code.
    pub source_url: String,
    /// Text of the page's `span.titulo` marker, if present and non-blank.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Key/value pairs taken from two-cell table rows.
    ///
    /// Iteration order is the order in which each key was first seen on the
    /// page; the stored value is the last one seen.
    #[serde(default)]
    pub attributes: IndexMap<String, String>,
    /// Program / objectives text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub syllabus: Option<String>,
    /// All visible body text, one trimmed text node per line.
    #[serde(default)]
    pub full_text: String,
}

impl CourseRecord {
    /// True when none of the structured fields were located.
    ///
    /// Such a record is still usable as long as `full_text` carries content.
    pub fn is_unstructured(&self) -> bool {
        self.title.is_none() && self.attributes.is_empty() && self.syllabus.is_none()
    }

    /// Number of lines in the full-text fallback.
    pub fn full_text_lines(&self) -> usize {
        self.full_text.lines().count()
    }
}

/// Outcome of a batch run: successful records plus the codes that were skipped.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchReport {
    pub records: Vec<CourseRecord>,
    pub failures: Vec<FailedCode>,
}

/// A course code that produced no record, with the reason reported to the operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedCode {
    pub code: String,
    pub reason: String,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.records.len()
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn attempted(&self) -> usize {
        self.succeeded() + self.failed()
    }
}
