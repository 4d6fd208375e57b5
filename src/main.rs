// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use log::{info, warn, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::Write;
use std::path::PathBuf;

use subclean::app_config::{self, Config};
use subclean::Controller;

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate shell completions for subclean
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// subclean - Subtitle transcripts to clean prose
///
/// Reads every .srt file in a directory, strips the cue numbers and timings,
/// and has an LLM provider rewrite the dialogue as readable text.
#[derive(Parser, Debug)]
#[command(name = "subclean")]
#[command(version)]
#[command(about = "Turn SRT subtitles into cleaned-up prose with LLM providers")]
#[command(long_about = "subclean extracts the dialogue from .srt files and cleans it up using AI providers,
falling back from one provider to the next when a provider keeps failing.

EXAMPLES:
    subclean                                # Process ./input into ./output
    subclean subs/ -o cleaned/              # Custom input and output directories
    subclean -f                             # Overwrite existing outputs
    subclean -c providers.json              # Use a JSON configuration file
    subclean --log-level debug              # Show chunking and retry details
    subclean completions bash > subclean.bash

CONFIGURATION:
    Configuration is read from config.yaml by default (JSON when the file ends
    in .json). If the file doesn't exist, a default one is created. API keys are
    read from the environment variable named by each provider's api_key_env,
    and a .env file in the working directory is loaded first.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Directory containing the .srt files to process
    #[arg(value_name = "INPUT_DIR", default_value = "input")]
    input_dir: PathBuf,

    /// Directory for the cleaned .txt files
    #[arg(short, long, value_name = "OUTPUT_DIR", default_value = "output")]
    output_dir: PathBuf,

    /// Configuration file path
    #[arg(short, long, default_value = "config.yaml")]
    config_path: PathBuf,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,

    /// Force overwrite of existing output files
    #[arg(short, long)]
    force_overwrite: bool,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(LevelFilter::Trace));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Emoji for log level
    fn get_emoji_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "❌ ",
            Level::Warn => "🚧 ",
            Level::Info => " ",
            Level::Debug => "🔍 ",
            Level::Trace => "📋 ",
        }
    }

    // @returns: ANSI color code for log level
    fn get_color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "1;31",
            Level::Warn => "1;33",
            Level::Info => "1;32",
            Level::Debug => "1;36",
            Level::Trace => "1;35",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let level = record.level();

            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "\x1B[{}m{} {} {}\x1B[0m",
                Self::get_color_for_level(level),
                now,
                Self::get_emoji_for_level(level),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize the logger once with info level by default
    // We'll update the level after loading the config if needed
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    if let Some(Commands::Completions { shell }) = cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(shell, &mut cmd, "subclean", &mut std::io::stdout());
        return Ok(());
    }

    run_clean(cli).await
}

async fn run_clean(options: CommandLineOptions) -> Result<()> {
    // If log level is set via command line, apply it immediately
    if let Some(cmd_log_level) = &options.log_level {
        let level: app_config::LogLevel = cmd_log_level.clone().into();
        log::set_max_level(level.to_level_filter());
    }

    if dotenv::dotenv().is_ok() {
        info!("Loaded environment from .env");
    }

    let config = load_or_create_config(&options)?;

    config.validate()
        .context("Configuration validation failed")?;

    // If log level was not set via command line, update it from config now
    if options.log_level.is_none() {
        log::set_max_level(config.log_level.to_level_filter());
    }

    let controller = Controller::with_config(config)?;
    let report = controller
        .run(options.input_dir, options.output_dir, options.force_overwrite)
        .await?;

    if report.failed() > 0 {
        warn!("{} file(s) could not be processed", report.failed());
    }

    Ok(())
}

// @loads: Config from file, or writes and returns the default one
fn load_or_create_config(options: &CommandLineOptions) -> Result<Config> {
    let config_path = &options.config_path;

    let mut config = if config_path.exists() {
        Config::load(config_path)?
    } else {
        warn!("Config file not found at {:?}, creating default config.", config_path);
        let config = Config::default();
        config.save(config_path)?;
        config
    };

    // Update log level in config if specified via command line
    if let Some(log_level) = &options.log_level {
        config.log_level = log_level.clone().into();
    }

    Ok(config)
}
