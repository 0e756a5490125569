use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use jupiter_acquire::{batch, fetch, CourseFetcher, FetcherConfig, OutputFormat, OutputFormats};
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "jupiter")]
#[command(about = "Fetch course information from USP Júpiter Web")]
#[command(version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("BUILD_HASH"), ")"))]
struct Cli {
    /// Log level: error, warn, info, debug, trace
    #[arg(long, global = true, default_value = "info", value_enum)]
    log_level: LogLevel,

    /// Use UTC timestamps instead of local time
    #[arg(long, global = true)]
    utc: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, clap::ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch course pages and write the extracted records
    Fetch {
        /// Course codes (e.g., ACH0021 MAC0110); defaults to the built-in list
        codes: Vec<String>,

        /// File with one course code per line ('#' starts a comment)
        #[arg(short, long, conflicts_with = "codes")]
        codes_file: Option<String>,

        /// Output formats; prompts interactively when omitted
        #[arg(short, long, value_enum, value_delimiter = ',')]
        format: Option<Vec<FormatArg>>,

        /// Output directory for courses.json / courses.md / courses.txt
        #[arg(short = 'O', long, default_value = ".")]
        output_dir: String,

        /// Seconds to wait between requests
        #[arg(long, default_value = "1", value_parser = parse_seconds)]
        delay: Duration,

        /// Per-request timeout in seconds
        #[arg(long, default_value = "10", value_parser = parse_seconds)]
        timeout: Duration,

        /// Course-information endpoint
        #[arg(long, default_value = fetch::DEFAULT_ENDPOINT)]
        endpoint: String,

        /// Query parameter that carries the course code
        #[arg(long, default_value = fetch::DEFAULT_QUERY_PARAM)]
        query_param: String,

        /// Exit without waiting for Enter at the end
        #[arg(long)]
        no_pause: bool,
    },

    /// Validate a courses.json file written by `fetch`
    Validate {
        /// Path to the JSON file to validate
        file: String,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum FormatArg {
    /// Structured JSON
    Json,
    /// Markdown document
    Markdown,
    /// Plain text
    Text,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Json => OutputFormat::Json,
            FormatArg::Markdown => OutputFormat::Markdown,
            FormatArg::Text => OutputFormat::Text,
        }
    }
}

fn parse_seconds(s: &str) -> Result<Duration, String> {
    let secs: f64 = s.parse().map_err(|_| format!("'{s}' is not a number of seconds"))?;
    Duration::try_from_secs_f64(secs).map_err(|_| format!("'{s}' must be a non-negative number of seconds"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Map log level, suppressing noisy HTML-parsing crates at debug/trace
    let level = match cli.log_level {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug,selectors=warn,html5ever=warn",
        LogLevel::Trace => "trace,selectors=warn,html5ever=warn",
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    // Timestamp format: 2026-02-14 19:44:09.123 -03:00
    let time_format = "%Y-%m-%d %H:%M:%S%.3f %:z";

    if cli.utc {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_timer(tracing_subscriber::fmt::time::ChronoUtc::new(time_format.to_string()))
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_timer(tracing_subscriber::fmt::time::ChronoLocal::new(time_format.to_string()))
            .init();
    }

    match cli.command {
        Commands::Fetch {
            codes,
            codes_file,
            format,
            output_dir,
            delay,
            timeout,
            endpoint,
            query_param,
            no_pause,
        } => {
            let codes = resolve_codes(codes, codes_file.as_deref())?;
            if codes.is_empty() {
                return Err(jupiter_acquire::Error::EmptyBatch.into());
            }

            println!("Courses to process: {}", codes.len());
            println!("Codes: {}\n", codes.join(", "));

            let formats = match format {
                Some(list) => OutputFormats::from_formats(list.into_iter().map(OutputFormat::from)),
                None => prompt_formats()?,
            };

            let fetcher = CourseFetcher::new(FetcherConfig {
                endpoint,
                query_param,
                timeout,
                ..FetcherConfig::default()
            })?;

            tracing::info!(courses = codes.len(), delay = ?delay, "Starting batch");
            let report = batch::run(&fetcher, &codes, delay).await?;

            let mut written = Vec::new();
            if report.records.is_empty() {
                tracing::warn!("No course was processed successfully, nothing to write");
            } else {
                let outcomes =
                    jupiter_acquire::write_outputs(&report.records, Path::new(&output_dir), formats);
                for outcome in outcomes {
                    match outcome.result {
                        Ok(()) => written.push(format!(
                            "{} ({})",
                            outcome.path.display(),
                            outcome.format.description()
                        )),
                        Err(e) => eprintln!("Could not write {}: {e:#}", outcome.path.display()),
                    }
                }
            }

            println!();
            println!(
                "Processed {} course(s): {} succeeded, {} failed",
                report.attempted(),
                report.succeeded(),
                report.failed()
            );
            for failure in &report.failures {
                println!("  failed {}: {}", failure.code, failure.reason);
            }
            if !written.is_empty() {
                println!("Files written:");
                for file in &written {
                    println!("  - {file}");
                }
            }

            if !no_pause {
                pause();
            }
        }
        Commands::Validate { file } => {
            tracing::info!(file = %file, "Validating");
            let errors = jupiter_validate::validate(&file)?;
            if !errors.is_empty() {
                anyhow::bail!("{} validation errors in {file}", errors.len());
            }
            tracing::info!("Course records are valid");
        }
    }

    Ok(())
}

/// Codes from the file, the command line, or the built-in list, in that order.
fn resolve_codes(cli_codes: Vec<String>, codes_file: Option<&str>) -> Result<Vec<String>> {
    if let Some(path) = codes_file {
        let contents =
            std::fs::read_to_string(path).with_context(|| format!("Failed to read {path}"))?;
        return Ok(batch::parse_codes(&contents));
    }
    if !cli_codes.is_empty() {
        return Ok(cli_codes);
    }
    Ok(batch::default_codes())
}

fn prompt_formats() -> Result<OutputFormats> {
    println!("Choose the output formats, separated by commas (Enter for all):");
    for format in OutputFormat::ALL {
        println!("  {} - {}", format.menu_number(), format.description());
    }
    print!("\nYour choice: ");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    println!();
    Ok(OutputFormats::from_selection(&line))
}

fn pause() {
    print!("\nPress Enter to exit...");
    let _ = io::stdout().flush();
    let mut line = String::new();
    // EOF or a closed terminal just ends the wait.
    let _ = io::stdin().lock().read_line(&mut line);
}
