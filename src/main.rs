use anyhow::Context;
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use photo_intervals::config::Config;
use photo_intervals::infra::http_client::ReqwestHttp;
use photo_intervals::infra::spreadsheet::{export_file_name, read_table, write_table};
use photo_intervals::logging;
use photo_intervals::pipeline::PipelineOrchestrator;
use photo_intervals::server::{self, AppState};

#[derive(Parser)]
#[command(name = "photo_intervals")]
#[command(about = "Resolve before/after photo links and compute the interval between captures")]
#[command(version)]
struct Cli {
    /// Path to a TOML config file (defaults to config.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process one spreadsheet and write the augmented workbook
    Process {
        /// Input file (.xlsx, .xls, .ods or .csv)
        #[arg(long)]
        input: PathBuf,
        /// Output path, `.xlsx` or `.csv` (defaults to <input>_обработанный.xlsx next to the input)
        #[arg(long)]
        output: Option<PathBuf>,
        /// Also write the HTML preview table here
        #[arg(long)]
        preview: Option<PathBuf>,
    },
    /// Run the upload/preview/download web interface
    Serve {
        /// Address to bind, overrides server.bind from the config
        #[arg(long)]
        bind: Option<String>,
    },
}

fn build_orchestrator(config: &Config) -> anyhow::Result<PipelineOrchestrator> {
    let http = ReqwestHttp::new(&config.resolver).context("Failed to build HTTP client")?;
    Ok(PipelineOrchestrator::new(Arc::new(http), config))
}

async fn process(
    config: &Config,
    input: PathBuf,
    output: Option<PathBuf>,
    preview: Option<PathBuf>,
) -> anyhow::Result<()> {
    let table = read_table(&input).with_context(|| format!("Failed to read {}", input.display()))?;
    let orchestrator = build_orchestrator(config)?;
    let result = orchestrator.run(&table).await?;

    println!(
        "Найдены столбцы: '{}' (до), '{}' (после)",
        result.columns.before.name, result.columns.after.name
    );

    let output = output.unwrap_or_else(|| {
        let name = input.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
        input.with_file_name(export_file_name(&name))
    });
    write_table(&result.export_table(), &output)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    if let Some(path) = preview {
        std::fs::write(&path, result.preview.to_html()?)
            .with_context(|| format!("Failed to write preview {}", path.display()))?;
        info!(path = %path.display(), "Preview written");
    }

    let s = &result.summary;
    println!("\n📊 Results:");
    println!("   Rows: {}", s.rows);
    println!("   Intervals computed: {}", s.intervals);
    println!("   Missing timestamps: {}", s.incomplete);
    println!("   Inverted pairs: {}", s.inverted);
    println!("   URL fetches: {} (cache hits: {})", s.fetches, s.cache_hits);
    println!("   Output file: {}", output.display());
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let _log_guard = logging::init_logging();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Process { input, output, preview } => {
            process(&config, input, output, preview).await?;
        }
        Commands::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| config.server.bind.clone());
            let addr: SocketAddr = bind
                .parse()
                .with_context(|| format!("Invalid bind address '{}'", bind))?;
            let state = AppState::new(build_orchestrator(&config)?);
            server::serve(addr, state).await?;
        }
    }
    Ok(())
}
