use crate::error::{Error, Result};
use crate::extract;
use crate::fetch::CourseFetcher;
use jupiter_model::{BatchReport, CourseRecord, FailedCode};
use std::time::Duration;

/// Default pause between consecutive requests.
pub const DEFAULT_DELAY: Duration = Duration::from_secs(1);

/// Course codes fetched when the operator supplies none.
pub const DEFAULT_CODES: [&str; 3] = ["ACH0021", "ACH0041", "ACH0141"];

/// Fetch and extract every code in order, one at a time.
///
/// A code that fails to fetch or parse is reported and left out of the
/// result; the batch always runs to the end. `delay` is waited between
/// attempts (after failures too), never after the last one.
///
/// Returns [`Error::EmptyBatch`] before any request when `codes` is empty.
pub async fn run(
    fetcher: &CourseFetcher,
    codes: &[String],
    delay: Duration,
) -> Result<BatchReport> {
    if codes.is_empty() {
        return Err(Error::EmptyBatch);
    }

    let total = codes.len();
    let mut report = BatchReport::default();

    for (i, code) in codes.iter().enumerate() {
        let index = i + 1;
        tracing::info!(index, total, code = %code, "Processing course");

        match acquire_one(fetcher, code).await {
            Ok(record) => {
                tracing::info!(
                    code = %code,
                    attributes = record.attributes.len(),
                    title = ?record.title,
                    "Acquired course"
                );
                report.records.push(record);
            }
            Err(e) => {
                tracing::warn!(code = %code, error = %e, "Skipping course");
                report.failures.push(FailedCode {
                    code: code.clone(),
                    reason: e.to_string(),
                });
            }
        }

        if index < total && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    tracing::info!(
        succeeded = report.succeeded(),
        failed = report.failed(),
        "Batch finished"
    );

    Ok(report)
}

async fn acquire_one(fetcher: &CourseFetcher, code: &str) -> Result<CourseRecord> {
    let page = fetcher.fetch(code).await?;
    extract::extract(code, &page.url, &page.body)
}

/// The built-in code list as owned strings.
pub fn default_codes() -> Vec<String> {
    DEFAULT_CODES.iter().map(|c| c.to_string()).collect()
}

/// Parse a codes file: one code per line, `#` starts a comment, blanks ignored.
pub fn parse_codes(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(|line| line.split('#').next().unwrap_or_default().trim())
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
