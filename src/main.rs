use clap::{Parser, Subcommand};
use cover_mockup::catalog::TemplateCatalog;
use cover_mockup::imaging::RustBackend;
use cover_mockup::{config, output, process, scan};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "cover-mockup")]
#[command(about = "Composite flat cover designs onto photographed book mockups")]
#[command(long_about = "\
Composite flat cover designs onto photographed book mockups

Every cover is placed on every template. Templates listed in the catalog
use their calibrated position; all others are detected automatically by
separating the book from the background.

  cover-mockup composite --template base_bottom_app.jpg --cover novel.jpg --output out/
  → out/novel__base_bottom_app.jpg

Calibrating a new template:

  cover-mockup scan new_template.jpg --write catalog.json
  cover-mockup catalog

Configuration is read from config.toml in --config-dir. Run
'cover-mockup gen-config' to generate a documented config.toml.

Log verbosity is controlled with RUST_LOG (default: warn).")]
#[command(version)]
struct Cli {
    /// Directory holding config.toml (and the catalog it names)
    #[arg(long, default_value = ".", global = true)]
    config_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Composite every cover onto every template
    Composite {
        /// Mockup template image (repeatable)
        #[arg(long = "template", required = true)]
        templates: Vec<PathBuf>,
        /// Cover design image (repeatable)
        #[arg(long = "cover", required = true)]
        covers: Vec<PathBuf>,
        /// Output directory
        #[arg(long, default_value = "out")]
        output: PathBuf,
    },
    /// Measure templates and print catalog entries for them
    Scan {
        /// Template images to measure
        #[arg(required = true)]
        templates: Vec<PathBuf>,
        /// Merge the scanned entries into this catalog JSON
        #[arg(long)]
        write: Option<PathBuf>,
    },
    /// List the effective catalog: built-in entries plus the configured file
    Catalog,
    /// Print a stock config.toml with all options documented
    GenConfig,
    /// Print the built-in catalog as JSON
    GenCatalog,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .without_time()
                .with_writer(std::io::stderr),
        )
        .init();

    match cli.command {
        Command::Composite {
            templates,
            covers,
            output: output_dir,
        } => {
            let config = config::load_config(&cli.config_dir)?;
            let catalog = load_catalog(&config, &cli.config_dir)?;
            init_thread_pool(&config.processing);

            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_process_event(&event) {
                        println!("{}", line);
                    }
                }
            });
            let report = process::process(
                &templates,
                &covers,
                &output_dir,
                &catalog,
                &config.batch_settings(),
                Some(tx),
            )?;
            printer
                .join()
                .map_err(|_| "progress printer thread panicked")?;
            println!();
            output::print_batch_summary(&report);
        }
        Command::Scan { templates, write } => {
            let config = config::load_config(&cli.config_dir)?;
            init_thread_pool(&config.processing);
            let params = config.composite_params().detection;
            let scans = scan::scan_paths(&RustBackend::new(), &templates, &params);
            output::print_scan_output(&scans);

            if let Some(path) = write {
                let scanned = scan::catalog_from_scans(&scans);
                let added = scanned.len();
                let catalog = if path.exists() {
                    scanned.merged_over(TemplateCatalog::load(&path)?)
                } else {
                    scanned
                };
                catalog.save(&path)?;
                println!(
                    "Wrote {} ({} scanned, {} total)",
                    path.display(),
                    added,
                    catalog.len()
                );
            }
        }
        Command::Catalog => {
            let config = config::load_config(&cli.config_dir)?;
            let catalog = load_catalog(&config, &cli.config_dir)?;
            for line in output::format_catalog_listing(&catalog) {
                println!("{}", line);
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
        Command::GenCatalog => {
            println!("{}", TemplateCatalog::builtin().to_json_pretty()?);
        }
    }

    Ok(())
}

/// Built-in entries, overridden by the configured catalog file if any.
fn load_catalog(
    config: &config::ToolConfig,
    config_dir: &Path,
) -> Result<TemplateCatalog, Box<dyn std::error::Error>> {
    let builtin = TemplateCatalog::builtin();
    let Some(path) = config.catalog_path(config_dir) else {
        return Ok(builtin);
    };
    let user = TemplateCatalog::load(&path)
        .map_err(|e| format!("catalog {}: {}", path.display(), e))?;
    tracing::debug!(path = %path.display(), entries = user.len(), "loaded catalog");
    Ok(user.merged_over(builtin))
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores — user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
