use crate::error::OutputError;
use crate::normalize;
use jupiter_model::CourseRecord;
use std::fs;
use std::path::{Path, PathBuf};

const RULE_WIDTH: usize = 80;

/// One of the three persisted representations of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Markdown,
    Text,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 3] = [OutputFormat::Json, OutputFormat::Markdown, OutputFormat::Text];

    pub fn file_name(self) -> &'static str {
        match self {
            OutputFormat::Json => "courses.json",
            OutputFormat::Markdown => "courses.md",
            OutputFormat::Text => "courses.txt",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            OutputFormat::Json => "structured data",
            OutputFormat::Markdown => "Markdown document",
            OutputFormat::Text => "plain text",
        }
    }

    /// Number used in the interactive selection prompt.
    pub fn menu_number(self) -> i64 {
        match self {
            OutputFormat::Json => 1,
            OutputFormat::Markdown => 2,
            OutputFormat::Text => 3,
        }
    }

    fn from_menu_number(n: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.menu_number() == n)
    }
}

/// Which formats to write in this run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputFormats {
    pub json: bool,
    pub markdown: bool,
    pub text: bool,
}

impl Default for OutputFormats {
    fn default() -> Self {
        Self::all()
    }
}

impl OutputFormats {
    pub fn all() -> Self {
        Self {
            json: true,
            markdown: true,
            text: true,
        }
    }

    pub fn none() -> Self {
        Self {
            json: false,
            markdown: false,
            text: false,
        }
    }

    /// Parse the operator's answer to the format prompt, e.g. `"1,3"`.
    ///
    /// Empty input, any non-numeric entry, or a list naming no known
    /// format all select every format.
    pub fn from_selection(input: &str) -> Self {
        let input = input.trim();
        if input.is_empty() {
            return Self::all();
        }

        let numbers: Result<Vec<i64>, _> =
            input.split(',').map(|part| part.trim().parse::<i64>()).collect();
        let Ok(numbers) = numbers else {
            tracing::warn!(input = %input, "Invalid format selection, writing all formats");
            return Self::all();
        };

        let selected = Self::from_formats(numbers.into_iter().filter_map(OutputFormat::from_menu_number));
        if selected.is_empty() {
            tracing::warn!(input = %input, "No known format selected, writing all formats");
            return Self::all();
        }
        selected
    }

    pub fn from_formats(formats: impl IntoIterator<Item = OutputFormat>) -> Self {
        let mut selected = Self::none();
        for format in formats {
            selected.enable(format);
        }
        selected
    }

    pub fn enable(&mut self, format: OutputFormat) {
        match format {
            OutputFormat::Json => self.json = true,
            OutputFormat::Markdown => self.markdown = true,
            OutputFormat::Text => self.text = true,
        }
    }

    pub fn contains(&self, format: OutputFormat) -> bool {
        match format {
            OutputFormat::Json => self.json,
            OutputFormat::Markdown => self.markdown,
            OutputFormat::Text => self.text,
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.json || self.markdown || self.text)
    }

    /// Enabled formats in menu order.
    pub fn enabled(&self) -> Vec<OutputFormat> {
        OutputFormat::ALL
            .into_iter()
            .filter(|f| self.contains(*f))
            .collect()
    }
}

/// Result of one writer invocation.
#[derive(Debug)]
pub struct WriteOutcome {
    pub format: OutputFormat,
    pub path: PathBuf,
    pub result: Result<(), OutputError>,
}

/// Write every enabled format into `output_dir`.
///
/// Each writer runs exactly once; a failing writer is logged and does not
/// prevent the remaining ones from running.
pub fn write_outputs(
    records: &[CourseRecord],
    output_dir: &Path,
    formats: OutputFormats,
) -> Vec<WriteOutcome> {
    if let Err(e) = fs::create_dir_all(output_dir) {
        tracing::error!(path = %output_dir.display(), error = %e, "Could not create output directory");
    }

    formats
        .enabled()
        .into_iter()
        .map(|format| {
            let path = output_dir.join(format.file_name());
            let result = match format {
                OutputFormat::Json => write_json(records, &path),
                OutputFormat::Markdown => write_markdown(records, &path),
                OutputFormat::Text => write_text(records, &path),
            };
            match &result {
                Ok(()) => tracing::info!(
                    path = %path.display(),
                    records = records.len(),
                    "Wrote {}",
                    format.description()
                ),
                Err(e) => tracing::error!(path = %path.display(), error = %e, "Failed to write {}", format.description()),
            }
            WriteOutcome { format, path, result }
        })
        .collect()
}

/// Pretty-printed JSON array of records.
pub fn write_json(records: &[CourseRecord], path: &Path) -> Result<(), OutputError> {
    let json = serde_json::to_string_pretty(records)?;
    fs::write(path, json).map_err(|e| OutputError::io(path, e))
}

/// Markdown document with one section per course.
pub fn write_markdown(records: &[CourseRecord], path: &Path) -> Result<(), OutputError> {
    fs::write(path, render_markdown(records)).map_err(|e| OutputError::io(path, e))
}

/// Plain-text report with one banner per course.
pub fn write_text(records: &[CourseRecord], path: &Path) -> Result<(), OutputError> {
    fs::write(path, render_text(records)).map_err(|e| OutputError::io(path, e))
}

fn generated_at() -> String {
    chrono::Utc::now().to_rfc3339()
}

fn render_markdown(records: &[CourseRecord]) -> String {
    let mut out = String::new();
    out.push_str("# Course Information\n\n");
    out.push_str(&format!("- **Total courses:** {}\n", records.len()));
    out.push_str(&format!("- **Generated:** {}\n\n", generated_at()));
    out.push_str("---\n\n");

    for rec in records {
        out.push_str(&format!("## {}\n\n", rec.code));

        if let Some(title) = &rec.title {
            out.push_str(&format!("**{}**\n\n", normalize::nfc(title)));
        }

        if !rec.attributes.is_empty() {
            out.push_str("### General Information\n\n");
            for (key, value) in &rec.attributes {
                out.push_str(&format!(
                    "- **{}**: {}\n",
                    normalize::nfc(key),
                    normalize::nfc(value)
                ));
            }
            out.push('\n');
        }

        if let Some(syllabus) = &rec.syllabus {
            out.push_str("### Syllabus\n\n");
            out.push_str(&format!("{}\n\n", normalize::nfc(syllabus)));
        }

        out.push_str(&format!("[View on Júpiter Web]({})\n\n", rec.source_url));
        out.push_str("---\n\n");
    }

    out
}

fn render_text(records: &[CourseRecord]) -> String {
    let heavy = "=".repeat(RULE_WIDTH);
    let light = "-".repeat(RULE_WIDTH);

    let mut out = String::new();
    out.push_str(&format!("{heavy}\nCOURSE INFORMATION\n{heavy}\n\n"));
    out.push_str(&format!("Total courses: {}\n", records.len()));
    out.push_str(&format!("Generated: {}\n\n", generated_at()));

    for rec in records {
        out.push_str(&format!("{heavy}\nCODE: {}\n{heavy}\n\n", rec.code));

        if let Some(title) = &rec.title {
            out.push_str(&format!("{}\n\n", normalize::nfc(title)));
        }

        if !rec.attributes.is_empty() {
            out.push_str(&format!("GENERAL INFORMATION:\n{light}\n"));
            for (key, value) in &rec.attributes {
                out.push_str(&format!("{}: {}\n", normalize::nfc(key), normalize::nfc(value)));
            }
            out.push('\n');
        }

        if let Some(syllabus) = &rec.syllabus {
            out.push_str(&format!("SYLLABUS:\n{light}\n"));
            out.push_str(&format!("{}\n\n", normalize::nfc(syllabus)));
        }

        out.push_str(&format!("URL: {}\n\n", rec.source_url));
    }

    out
}
