use anyhow::{Context, Result};
use clap::Parser;
use playmart::{LoadPipeline, PipelineConfig, SqliteWarehouse};
use std::path::PathBuf;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Directory tree of whole-document song catalog JSON files.
    #[clap(value_parser = parse_path)]
    pub song_data: PathBuf,

    /// Directory tree of newline-delimited activity log JSON files.
    #[clap(value_parser = parse_path)]
    pub log_data: PathBuf,

    /// Path to the SQLite warehouse database file.
    #[clap(value_parser = parse_path)]
    pub warehouse_db: PathBuf,

    /// Rows buffered per table before a flush. 1 makes every row durable
    /// before the next insert begins.
    #[clap(long, default_value_t = 1)]
    pub batch_size: usize,
}

fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .unwrap();

    info!(
        "Opening warehouse database at {:?}...",
        cli_args.warehouse_db
    );
    let warehouse = SqliteWarehouse::open(&cli_args.warehouse_db, cli_args.batch_size)?;

    let pipeline = LoadPipeline::new(&warehouse, PipelineConfig::default());
    pipeline.run(&cli_args.song_data, &cli_args.log_data)?;

    info!("Load complete.");
    Ok(())
}
