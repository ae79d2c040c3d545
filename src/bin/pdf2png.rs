//! CLI binary for pdf2png.
//!
//! A thin shim over the library crate: maps positional arguments to a
//! `ConversionRequest`, writes the PNG and prints a short summary.
//! Exit code 0 on success, 1 on any failure (including bad arguments).

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdf2png::{
    ConversionRequest, ConvertError, Converter, ConverterConfig, ProgressCallback, RenderedPage,
    Stage,
};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}

// ── Spinner ──────────────────────────────────────────────────────────────────

/// Spinner on stderr that follows the pipeline stages.
struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    fn new(page_number: i64) -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.set_message(format!("page {page_number}"));
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl ProgressCallback for CliProgress {
    fn on_stage(&self, stage: Stage) {
        self.bar.set_prefix(stage.to_string());
    }

    fn on_complete(&self, _page: &RenderedPage) {
        self.bar.finish_and_clear();
    }

    fn on_error(&self, _error: &ConvertError) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Page 1 at the default 150 DPI
  pdf2png report.pdf 1 page1.png

  # Page 3 at 300 DPI
  pdf2png report.pdf 3 page3.png 300

  # Encrypted document
  pdf2png --password s3cret locked.pdf 1 out.png

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH         Path to libpdfium (otherwise ./ then the system library)
  PDF2PNG_MAX_DPI         Largest accepted DPI (default 600)
  RUST_LOG                Log filter, e.g. pdf2png=debug
"#;

/// Render one page of a PDF to a PNG file.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2png",
    version,
    about = "Render one page of a PDF to a PNG file",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Input PDF file.
    pdf_path: PathBuf,

    /// Page to render (1-based).
    #[arg(allow_negative_numbers = true)]
    page_number: i64,

    /// Where to write the PNG.
    output_path: PathBuf,

    /// Resolution in dots per inch [default: 150].
    #[arg(allow_negative_numbers = true)]
    dpi: Option<i64>,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDF2PNG_PASSWORD")]
    password: Option<String>,

    /// Path to the pdfium shared library.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// Largest accepted DPI.
    #[arg(long, env = "PDF2PNG_MAX_DPI", default_value_t = 600)]
    max_dpi: u32,

    /// Disable the spinner.
    #[arg(long, env = "PDF2PNG_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2PNG_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2PNG_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Argument errors exit with 1 like every other failure; --help and
    // --version still exit 0.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner already says what is happening, so library INFO logs are
    // only shown when it is off.
    let show_progress = !cli.quiet && !cli.no_progress;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match run(&cli, show_progress).await {
        Ok(page) => {
            if !cli.quiet {
                println!(
                    "{} Converted page {} to {}",
                    green("✅"),
                    cli.page_number,
                    cli.output_path.display()
                );
                println!(
                    "   Size: {}x{} pixels {}",
                    page.width(),
                    page.height(),
                    dim(&format!("({} bytes)", page.size()))
                );
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{} Error: {}", red("❌"), e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli, show_progress: bool) -> anyhow::Result<RenderedPage> {
    let config = build_config(cli)?;
    let request = ConversionRequest::for_file(&cli.pdf_path, cli.page_number, cli.dpi, &config)?
        .with_password(cli.password.clone());

    let mut converter = Converter::from_config(config)?;
    if show_progress {
        converter = converter.with_progress(CliProgress::new(cli.page_number));
    }

    let page = converter
        .convert_to_file(&request, &cli.output_path)
        .await?;
    Ok(page)
}

/// Map CLI args to `ConverterConfig`.
fn build_config(cli: &Cli) -> anyhow::Result<ConverterConfig> {
    let default_dpi = ConverterConfig::default().default_dpi.min(cli.max_dpi);
    let mut builder = ConverterConfig::builder()
        .max_dpi(cli.max_dpi)
        .default_dpi(default_dpi);
    if let Some(ref lib) = cli.pdfium_lib {
        builder = builder.pdfium_library(lib);
    }
    Ok(builder.build()?)
}
