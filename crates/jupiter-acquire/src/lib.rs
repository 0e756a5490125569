//! Acquisition pipeline for Júpiter Web course pages: fetch one page per
//! course code, extract a [`CourseRecord`](jupiter_model::CourseRecord),
//! and write the batch in the requested formats.

pub mod batch;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod normalize;
pub mod output;

pub use batch::run;
pub use error::{Error, OutputError, Result};
pub use extract::extract;
pub use fetch::{CourseFetcher, FetchedPage, FetcherConfig};
pub use output::{write_outputs, OutputFormat, OutputFormats, WriteOutcome};
