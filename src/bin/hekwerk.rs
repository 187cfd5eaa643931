//! CLI binary for hekwerk.
//!
//! A thin shim over the library crate: `serve` runs the browser calculator,
//! the other subcommands work on local files.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use hekwerk::engine::{self, LibrarySource};
use hekwerk::{
    inspect, measure_shapes, CalculatorConfig, CalculatorConfigBuilder, EngineConfig,
    MeasureOptions, ResultsTable, ServerConfig, ShapeFile,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Start the calculator on http://127.0.0.1:8501
  hekwerk serve

  # Listen on all interfaces (containers), allow cross-origin requests
  hekwerk serve --address 0.0.0.0 --cors-permissive

  # Page count and page sizes of a drawing
  hekwerk inspect tekening.pdf

  # Measure offline from a shape file and export CSV
  hekwerk measure tekening.pdf --shapes vormen.json --csv hekwerk_oppervlakte_resultaten.csv

  # Download the PDF engine ahead of time
  hekwerk fetch-engine

ENVIRONMENT VARIABLES:
  HEKWERK_SERVER_ADDRESS     Bind address (default 127.0.0.1)
  HEKWERK_SERVER_PORT        Bind port (default 8501)
  HEKWERK_CORS_PERMISSIVE    Allow any origin (true/false)
  HEKWERK_DPI                Render resolution for PDF pages (default 200)
  PDFIUM_LIB_PATH            Path to an existing libpdfium, skips the download
  HEKWERK_PDFIUM_CACHE_DIR   Override the pdfium cache directory
  RUST_LOG                   Log filter, e.g. hekwerk=debug,tower_http=debug

  Variables may also be set in a .env file in the working directory.
"#;

/// Fence surface-area calculator.
#[derive(Parser, Debug)]
#[command(
    name = "hekwerk",
    version,
    about = "Fence surface-area calculator: calibrate a drawing, measure panels and posts",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "HEKWERK_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "HEKWERK_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the web calculator.
    Serve(ServeArgs),
    /// Print kind, page count and page sizes of a drawing.
    Inspect {
        /// PDF or image file.
        input: PathBuf,
        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
        #[command(flatten)]
        render: RenderArgs,
    },
    /// Measure a drawing offline from a JSON file of drawn shapes.
    Measure {
        /// PDF or image file the shapes were drawn on.
        input: PathBuf,
        /// Shape file (pages with scale, panels and posts).
        #[arg(long)]
        shapes: PathBuf,
        /// Print JSON instead of a table.
        #[arg(long, conflicts_with = "csv")]
        json: bool,
        /// Write the results as CSV to this file.
        #[arg(long)]
        csv: Option<PathBuf>,
        #[command(flatten)]
        render: RenderArgs,
        #[command(flatten)]
        measure: MeasureArgs,
    },
    /// Download pdfium into the cache.
    FetchEngine {
        #[command(flatten)]
        engine: EngineArgs,
    },
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Bind address.
    #[arg(long, env = "HEKWERK_SERVER_ADDRESS", default_value = "127.0.0.1")]
    address: String,

    /// Bind port.
    #[arg(long, env = "HEKWERK_SERVER_PORT", default_value_t = 8501)]
    port: u16,

    /// Allow requests from any origin.
    #[arg(long, env = "HEKWERK_CORS_PERMISSIVE")]
    cors_permissive: bool,

    /// Seconds an idle uploaded drawing is kept.
    #[arg(long, env = "HEKWERK_SESSION_TTL", default_value_t = 3600)]
    session_ttl: u64,

    /// Maximum number of drawings kept in memory.
    #[arg(long, env = "HEKWERK_MAX_SESSIONS", default_value_t = 64)]
    max_sessions: usize,

    /// Largest accepted upload in MiB.
    #[arg(long, env = "HEKWERK_MAX_UPLOAD_MB", default_value_t = 100)]
    max_upload_mb: usize,

    /// Default real length of the calibration line in mm.
    #[arg(long, env = "HEKWERK_SCALE_LENGTH_MM", default_value_t = 1000.0)]
    scale_length_mm: f64,

    #[command(flatten)]
    render: RenderArgs,

    #[command(flatten)]
    measure: MeasureArgs,
}

#[derive(Args, Debug)]
struct RenderArgs {
    /// Rendering DPI for PDF pages (72–600).
    #[arg(long, env = "HEKWERK_DPI", default_value_t = 200,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: u32,

    /// PDF user password for encrypted drawings.
    #[arg(long, env = "HEKWERK_PDF_PASSWORD")]
    password: Option<String>,

    #[command(flatten)]
    engine: EngineArgs,
}

#[derive(Args, Debug)]
struct EngineArgs {
    /// Path to an existing libpdfium.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// Directory for the downloaded pdfium library.
    #[arg(long, env = "HEKWERK_PDFIUM_CACHE_DIR")]
    pdfium_cache_dir: Option<PathBuf>,

    /// Never download pdfium; use the cache or the system library.
    #[arg(long, env = "HEKWERK_NO_DOWNLOAD")]
    no_download: bool,
}

#[derive(Args, Debug)]
struct MeasureArgs {
    /// Count panels on one side only.
    #[arg(long, env = "HEKWERK_SINGLE_SIDED")]
    single_sided: bool,

    /// Diameter (mm) for posts without an override.
    #[arg(long, env = "HEKWERK_POST_DIAMETER_MM", default_value_t = 60.0)]
    post_diameter_mm: f64,
}

impl From<&EngineArgs> for EngineConfig {
    fn from(args: &EngineArgs) -> Self {
        EngineConfig {
            library_path: args.pdfium_lib.clone(),
            cache_dir: args.pdfium_cache_dir.clone(),
            auto_download: !args.no_download,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.quiet {
        "error"
    } else if cli.verbose {
        "hekwerk=debug,tower_http=debug,info"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Command::Serve(args) => run_serve(args).await,
        Command::Inspect {
            input,
            json,
            render,
        } => run_inspect(input, json, render).await,
        Command::Measure {
            input,
            shapes,
            json,
            csv,
            render,
            measure,
        } => run_measure(input, shapes, json, csv, render, measure, cli.quiet).await,
        Command::FetchEngine { engine } => run_fetch_engine(engine, cli.quiet),
    }
}

async fn run_serve(args: ServeArgs) -> Result<()> {
    let config = config_builder(&args.render, &args.measure)
        .max_upload_bytes(args.max_upload_mb.saturating_mul(1024 * 1024))
        .default_scale_length_mm(args.scale_length_mm)
        .build()
        .context("Invalid configuration")?;
    let server = ServerConfig {
        address: args.address,
        port: args.port,
        cors_permissive: args.cors_permissive,
        session_ttl_secs: args.session_ttl,
        max_sessions: args.max_sessions,
    };

    hekwerk::server::serve(config, server)
        .await
        .context("Server stopped with an error")
}

async fn run_inspect(input: PathBuf, json: bool, render: RenderArgs) -> Result<()> {
    let config = build_config(&render, &MeasureArgs::defaults())?;
    let info = inspect(&input, &config)
        .await
        .with_context(|| format!("Failed to inspect {}", input.display()))?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&info).context("Failed to serialize drawing info")?
        );
        return Ok(());
    }

    println!("File:         {}", info.filename);
    println!("Kind:         {:?}", info.kind);
    println!("Pages:        {}", info.page_count);
    if let Some(ref v) = info.pdf_version {
        println!("PDF Version:  {}", v);
    }
    if let Some(ref t) = info.title {
        println!("Title:        {}", t);
    }
    if let Some(ref c) = info.creator {
        println!("Creator:      {}", c);
    }
    for page in &info.pages {
        println!(
            "  p{:<4} {:>8.1} × {:<8.1} {}",
            page.number, page.width, page.height, page.unit
        );
    }
    Ok(())
}

async fn run_measure(
    input: PathBuf,
    shapes: PathBuf,
    json: bool,
    csv: Option<PathBuf>,
    render: RenderArgs,
    measure: MeasureArgs,
    quiet: bool,
) -> Result<()> {
    let config = build_config(&render, &measure)?;
    let file = ShapeFile::load(&shapes)
        .with_context(|| format!("Failed to read shapes from {}", shapes.display()))?;
    let info = inspect(&input, &config)
        .await
        .with_context(|| format!("Failed to inspect {}", input.display()))?;

    let defaults = MeasureOptions {
        coat_both_sides: config.coat_both_sides,
        default_post_diameter_mm: config.default_post_diameter_mm,
        ..MeasureOptions::default()
    };
    let options = file
        .options(&defaults)
        .with_context(|| format!("Invalid shape file {}", shapes.display()))?;
    let reports = measure_shapes(
        &file,
        info.page_count,
        config.default_scale_length_mm,
        &options,
    )
    .context("Measuring failed")?;
    let table = ResultsTable::from_reports(&reports);

    for report in &reports {
        for issue in &report.skipped {
            tracing::warn!("p{}: {}", report.page, issue);
        }
    }

    if let Some(path) = csv {
        table.write_csv(&path).context("CSV export failed")?;
        if !quiet {
            eprintln!(
                "{}  {} rows  {} m²  →  {}",
                green("✔"),
                table.rows.len(),
                table.totals.total_m2,
                bold(&path.display().to_string()),
            );
        }
    } else if json {
        let out = serde_json::json!({
            "pages": reports,
            "totals": table.totals,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&out).context("Failed to serialise results")?
        );
    } else {
        print!("{}", table.to_text());
    }
    Ok(())
}

fn run_fetch_engine(args: EngineArgs, quiet: bool) -> Result<()> {
    let engine_config = EngineConfig::from(&args);
    let cache = engine::cache_dir(&engine_config);

    let result = if quiet {
        tokio::task::block_in_place(|| engine::fetch(&engine_config, None))
    } else {
        let dl_bar = ProgressBar::new(0);
        dl_bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:.bold}  \
                 [{bar:42.green/238}] {bytes}/{total_bytes}  ETA {eta_precise}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  ")
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        dl_bar.set_prefix("PDF engine");
        dl_bar.enable_steady_tick(Duration::from_millis(80));

        let bar = dl_bar.clone();
        let result = tokio::task::block_in_place(|| {
            engine::fetch(
                &engine_config,
                Some(&|downloaded, total| {
                    if let Some(t) = total {
                        if bar.length().unwrap_or(0) != t {
                            bar.set_length(t);
                        }
                    }
                    bar.set_position(downloaded);
                }),
            )
        });
        dl_bar.finish_and_clear();
        result
    };
    let source = result.context("Failed to fetch the PDF engine")?;

    if !quiet {
        let where_ = match &source {
            LibrarySource::Configured(p) | LibrarySource::Cached(p) | LibrarySource::Downloaded(p) => {
                p.display().to_string()
            }
            LibrarySource::System => "system library path".to_string(),
        };
        eprintln!("{} PDF engine ready: {}", green("✔"), bold(&where_));
        eprintln!("   {}", dim(&format!("cache: {}", cache.display())));
    }
    Ok(())
}

/// Map CLI args to a `CalculatorConfig` builder.
fn config_builder(render: &RenderArgs, measure: &MeasureArgs) -> CalculatorConfigBuilder {
    let builder = CalculatorConfig::builder()
        .dpi(render.dpi)
        .coat_both_sides(!measure.single_sided)
        .default_post_diameter_mm(measure.post_diameter_mm)
        .engine(EngineConfig::from(&render.engine));
    match render.password {
        Some(ref pwd) => builder.password(pwd.clone()),
        None => builder,
    }
}

fn build_config(render: &RenderArgs, measure: &MeasureArgs) -> Result<CalculatorConfig> {
    config_builder(render, measure)
        .build()
        .context("Invalid configuration")
}

impl MeasureArgs {
    fn defaults() -> Self {
        MeasureArgs {
            single_sided: false,
            post_diameter_mm: 60.0,
        }
    }
}
