use clap::Parser;
use ftldat::{DEFAULT_CHUNK_SIZE, PackConfig};
use ftldat_cli::Commands;
use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

#[derive(Parser)]
#[command(
    name = "ftldat",
    about = "Pack, unpack and edit FTL .dat archives",
    version,
    author
)]
struct Cli {
    /// Set the logging level (RUST_LOG takes precedence)
    #[arg(long, value_enum, global = true, default_value = "warn")]
    log_level: LogLevel,

    /// Copy buffer size in bytes
    #[arg(long, global = true, env = "FTLDAT_CHUNK_SIZE", default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so `extract` can stream to stdout
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(Level::from(cli.log_level)).into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = PackConfig::default().with_chunk_size(cli.chunk_size);
    config.validate()?;

    ftldat_cli::run(cli.command, &config)
}
