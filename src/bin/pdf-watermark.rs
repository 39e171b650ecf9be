//! PDF Watermark CLI tool
//!
//! A command-line tool for stamping a semi-transparent text watermark
//! across every page of a PDF, with optional password protection.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use pdf_watermark::pdf::{apply_watermark, extract_metadata, WatermarkConfig};
use pdf_watermark::validate::{contains_non_ascii, validate_request};

/// PDF Watermark - stamp text across every page of a PDF
#[derive(Parser)]
#[command(name = "pdf-watermark")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "EXAMPLES:
    # Stamp a light watermark on every page
    pdf-watermark apply report.pdf -o report-stamped.pdf --text CONFIDENTIAL

    # Darker watermark, password-protected output
    pdf-watermark apply report.pdf -o report-stamped.pdf --text DRAFT --alpha 0.5 --password hunter2

    # Show page count and encryption status
    pdf-watermark info report-stamped.pdf")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watermark a PDF and write the result to a new file
    Apply {
        /// Input PDF file
        input: PathBuf,

        /// Output PDF file path
        #[arg(short, long)]
        output: PathBuf,

        /// Watermark text
        #[arg(short, long)]
        text: String,

        /// Watermark opacity, between 0 (exclusive) and 1
        #[arg(long, default_value_t = 0.2)]
        alpha: f32,

        /// Base font size in points; long text shrinks automatically
        #[arg(long, default_value_t = 40.0)]
        font_size: f32,

        /// Encrypt the output with this password
        #[arg(short, long)]
        password: Option<String>,

        /// Skip the confirmation prompt for non-ASCII watermark text
        #[arg(short, long)]
        yes: bool,
    },

    /// Show information about a PDF file
    Info {
        /// PDF file to inspect
        input: PathBuf,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Apply {
            input,
            output,
            text,
            alpha,
            font_size,
            password,
            yes,
        } => cmd_apply(input, output, text, alpha, font_size, password, yes),
        Commands::Info { input } => cmd_info(input),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Ask the user to confirm rendering of non-ASCII text
///
/// The built-in font only covers ASCII reliably, so anything else may come
/// out wrong in the output.
fn confirm_non_ascii() -> Result<bool> {
    eprint!(
        "The watermark text contains non-ASCII characters. \
         This may result in incorrect display. Continue anyway? [y/N] "
    );
    io::stderr().flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    let answer = answer.trim().to_ascii_lowercase();
    Ok(answer == "y" || answer == "yes")
}

/// Watermark a PDF file
fn cmd_apply(
    input: PathBuf,
    output: PathBuf,
    text: String,
    alpha: f32,
    font_size: f32,
    password: Option<String>,
    yes: bool,
) -> Result<()> {
    validate_request(&input, &text, password.as_deref())?;

    if contains_non_ascii(&text) && !yes && !confirm_non_ascii()? {
        // Declining is a valid outcome, not an error
        eprintln!("Cancelled.");
        return Ok(());
    }

    let mut config = WatermarkConfig::new(text, alpha);
    config.font_size = font_size;

    eprintln!("Watermarking {}...", input.display());
    apply_watermark(&input, &output, &config, password.as_deref())?;
    eprintln!("Output: {}", output.display());

    Ok(())
}

/// Show information about a PDF
fn cmd_info(input: PathBuf) -> Result<()> {
    let metadata = extract_metadata(&input)?;

    println!("File: {}", input.display());
    println!("Pages: {}", metadata.page_count);

    if let Some(title) = metadata.title {
        println!("Title: {}", title);
    }
    if let Some(author) = metadata.author {
        println!("Author: {}", author);
    }
    println!(
        "Encrypted: {}",
        if metadata.encrypted { "yes" } else { "no" }
    );

    Ok(())
}
