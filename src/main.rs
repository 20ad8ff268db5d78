// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result, anyhow};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, error, info};
use std::io::Write;
use std::path::{Path, PathBuf};

use translatebot::app_config::{self, Config, DEFAULT_CONFIG_FILE, TranslationProvider};
use translatebot::app_controller::{Controller, RunOptions};
use translatebot::language_utils::validate_language_code;
use translatebot::translation::JobOptions;

/// CLI Wrapper for TranslationProvider to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliTranslationProvider {
    #[value(name = "openai")]
    OpenAI,
    Anthropic,
    #[value(name = "lmstudio")]
    LMStudio,
    #[value(name = "deepl")]
    DeepL,
}

impl From<CliTranslationProvider> for TranslationProvider {
    fn from(cli_provider: CliTranslationProvider) -> Self {
        match cli_provider {
            CliTranslationProvider::OpenAI => TranslationProvider::OpenAI,
            CliTranslationProvider::Anthropic => TranslationProvider::Anthropic,
            CliTranslationProvider::LMStudio => TranslationProvider::LMStudio,
            CliTranslationProvider::DeepL => TranslationProvider::DeepL,
        }
    }
}

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
    /// Translate missing and fuzzy catalog entries, or record fields with --models
    Translate(TranslateArgs),

    /// Report untranslated and fuzzy entries of every catalog
    Check,

    /// Generate shell completions for translatebot
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Debug)]
struct TranslateArgs {
    /// Target language code (e.g. 'fr', 'pt-br'); defaults to every configured language
    #[arg(short, long = "target-lang")]
    target_lang: Option<String>,

    /// Show what would be translated without calling the provider or writing files
    #[arg(long)]
    dry_run: bool,

    /// Re-translate entries that already have a translation
    #[arg(long)]
    overwrite: bool,

    /// Only translate the catalogs of this app (repeatable)
    #[arg(long = "app", value_name = "APP")]
    apps: Vec<String>,

    /// Translate record fields, optionally only of the named models
    #[arg(long, num_args = 0.., value_name = "MODEL", conflicts_with = "apps")]
    models: Option<Vec<String>>,

    /// Translation provider to use
    #[arg(short, long, value_enum)]
    provider: Option<CliTranslationProvider>,

    /// Model name to use for translation
    #[arg(short, long)]
    model: Option<String>,
}

/// translatebot - LLM translation of gettext catalogs and record fields
#[derive(Parser, Debug)]
#[command(name = "translatebot")]
#[command(version)]
#[command(about = "AI-powered translation of gettext catalogs and database fields")]
#[command(long_about = "translatebot fills in missing and fuzzy translations in gettext .po files \
and per-language database columns using an LLM provider.

EXAMPLES:
    translatebot translate                          # Every configured language
    translatebot translate -t fr --dry-run          # Show what would be translated
    translatebot translate -t de --app blog         # Only the blog app's catalogs
    translatebot translate --models Article         # Record fields of one model
    translatebot check                              # Report incomplete catalogs
    translatebot completions bash > translatebot.bash

CONFIGURATION:
    Configuration is stored in translatebot.json by default. If the file does not
    exist, a default one is created. The API key can also be supplied through the
    TRANSLATEBOT_API_KEY environment variable.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config_path: PathBuf,

    /// Set logging level
    #[arg(short, long, global = true, value_enum)]
    log_level: Option<CliLogLevel>,
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
        let logger = Box::new(CustomLogger::new(level));
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

    // @returns: ANSI color for log level
    fn get_color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1B[1;31m",
            Level::Warn => "\x1B[1;33m",
            Level::Info => "\x1B[1;32m",
            Level::Debug => "\x1B[1;36m",
            Level::Trace => "\x1B[1;35m",
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
            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "{}{} {} {}\x1B[0m",
                Self::get_color_for_level(record.level()),
                now,
                Self::get_emoji_for_level(record.level()),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() {
    // The max level is lowered or raised once the config is loaded
    if CustomLogger::init(LevelFilter::Trace).is_err() {
        eprintln!("Failed to initialize logger");
    }
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();
    if let Some(level) = &cli.log_level {
        let level: app_config::LogLevel = level.clone().into();
        log::set_max_level(level.to_level_filter());
    }

    let code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            1
        }
    };
    std::process::exit(code);
}

async fn run(cli: CommandLineOptions) -> Result<i32> {
    match cli.command {
        Commands::Completions { shell } => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "translatebot", &mut std::io::stdout());
            Ok(0)
        }
        Commands::Check => {
            let config = load_config(&cli.config_path, cli.log_level.is_some())?;
            let report = Controller::check(&config)?;
            Ok(if report.has_issues() { 1 } else { 0 })
        }
        Commands::Translate(args) => run_translate(&cli.config_path, cli.log_level.is_some(), args).await,
    }
}

/// Load the configuration and apply its log level unless the CLI set one
fn load_config(config_path: &Path, log_level_from_cli: bool) -> Result<Config> {
    let config = Config::load_or_create(config_path)?;
    if !log_level_from_cli {
        log::set_max_level(config.log_level.to_level_filter());
    }
    Ok(config)
}

async fn run_translate(config_path: &Path, log_level_from_cli: bool, args: TranslateArgs) -> Result<i32> {
    let mut config = load_config(config_path, log_level_from_cli)?;

    // Override config with CLI options if provided
    if let Some(provider) = args.provider {
        config.translation.provider = provider.into();
    }
    if let Some(model) = &args.model {
        config.translation.set_model(model);
    }

    config.validate().context("Configuration validation failed")?;

    let target_languages = match &args.target_lang {
        Some(language) => {
            validate_language_code(language)
                .with_context(|| format!("Invalid --target-lang: {}", language))?;
            vec![language.clone()]
        }
        None => {
            info!(
                "ℹ️  No --target-lang specified, translating to all configured languages: {}",
                config.languages.join(", ")
            );
            config.languages.clone()
        }
    };
    if !args.apps.is_empty() && args.models.is_some() {
        return Err(anyhow!("--app cannot be used together with --models"));
    }

    let options = RunOptions {
        target_languages,
        apps: args.apps,
        job: JobOptions {
            dry_run: args.dry_run,
            overwrite: args.overwrite,
            selected_model_names: args.models,
        },
    };

    let config_dir = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let controller = Controller::with_config(config, Some(&config_dir))?;
    let summary = controller.run(&options).await?;

    let failed = summary.failed_languages();
    if failed.is_empty() {
        Ok(0)
    } else {
        error!("Failed languages: {}", failed.join(", "));
        Ok(1)
    }
}
