//! Binary entry point for the statesel CLI.
//!
//! ## Usage
//!
//! ```bash
//! # Show the canonical form of a filter
//! statesel explain 'type:Param and not path:bias'
//!
//! # Keep matching leaves of a state file
//! statesel select --state state.json 'tag:lora' 'path:head'
//!
//! # Partition a state file; the last filter catches the rest
//! statesel split --state state.json 'type:Param' '...'
//!
//! # Build vocabulary and embeddings from GloVe vectors and batch SST-2
//! statesel prepare --data-dir data/sst2 --glove glove.840B.300d.txt --cache-dir cache
//! ```

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};

use statesel::cli::{run_explain, run_prepare, run_select, run_split, FilterSyntax, PrepareArgs};
use statesel::config::{CliOverrides, ResolvedConfig};
use statesel::error::{OutputErrorCode, SelError};
use statesel::output::{emit_response, ErrorResponse};

// ============================================================================
// CLI Structure
// ============================================================================

/// Select and partition hierarchical model state with filter predicates.
///
/// All output is JSON.
#[derive(Parser, Debug)]
#[command(name = "statesel", version, about = "Select model state with filter predicates")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

/// Global arguments shared by all subcommands.
#[derive(Parser, Debug)]
struct GlobalArgs {
    /// Project config file (default: statesel.json in the working directory).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Type registry file extending the built-in types.
    #[arg(long, global = true)]
    types: Option<PathBuf>,

    /// Log level for tracing output (default: warn).
    #[arg(long, global = true, value_enum)]
    log_level: Option<LogLevel>,

    /// Log line format.
    #[arg(long, global = true, value_enum, default_value = "text")]
    log_format: LogFormat,
}

/// Log level for tracing output.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn as_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Log line format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the canonical form of a filter.
    Explain {
        /// Filter expression (or JSON literal with --json).
        filter: String,

        /// Read the filter as a JSON literal.
        #[arg(long)]
        json: bool,
    },

    /// Print the leaves of a state file matched by any of the filters.
    Select {
        /// State file (nested JSON).
        #[arg(long)]
        state: PathBuf,

        /// Read filters as JSON literals.
        #[arg(long)]
        json: bool,

        /// Filters; a leaf is kept if any of them matches.
        #[arg(required = true)]
        filters: Vec<String>,
    },

    /// Partition a state file, assigning each leaf to the first matching filter.
    Split {
        /// State file (nested JSON).
        #[arg(long)]
        state: PathBuf,

        /// Read filters as JSON literals.
        #[arg(long)]
        json: bool,

        /// Filters in priority order; every leaf must match one.
        #[arg(required = true)]
        filters: Vec<String>,
    },

    /// Build or load vocabulary and embeddings and batch an SST-2 data directory.
    Prepare {
        /// Directory holding train.tsv, dev.tsv and test.tsv.
        #[arg(long)]
        data_dir: PathBuf,

        /// GloVe vectors file.
        #[arg(long)]
        glove: Option<PathBuf>,

        /// GloVe vector width.
        #[arg(long)]
        glove_dim: Option<usize>,

        /// Directory to write vocab.txt and embed.txt into.
        #[arg(long)]
        cache_dir: Option<PathBuf>,

        /// Saved vocabulary (used together with --embed).
        #[arg(long, requires = "embed")]
        vocab: Option<PathBuf>,

        /// Saved embeddings (used together with --vocab).
        #[arg(long, requires = "vocab")]
        embed: Option<PathBuf>,

        /// Examples per batch.
        #[arg(long)]
        batch_size: Option<usize>,

        /// Training shuffle seed.
        #[arg(long)]
        seed: Option<u64>,
    },
}

fn syntax(json: bool) -> FilterSyntax {
    if json {
        FilterSyntax::Json
    } else {
        FilterSyntax::Expression
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = resolve_config(&cli);
    let level = match &config {
        Ok(config) => config.log_level.value.clone(),
        Err(_) => cli.global.log_level.unwrap_or(LogLevel::Warn).as_str().to_string(),
    };
    init_tracing(&level, cli.global.log_format);

    match config.and_then(|config| execute(cli, &config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let error_code = OutputErrorCode::from(&err);
            let response = ErrorResponse::from_error(&err);

            // Errors go to stdout as JSON, like every other response
            let _ = emit_response(&response, &mut io::stdout());
            let _ = io::stdout().flush();

            ExitCode::from(error_code.code())
        }
    }
}

/// Resolve layered configuration for this invocation.
fn resolve_config(cli: &Cli) -> Result<ResolvedConfig, SelError> {
    let cwd = std::env::current_dir().map_err(|e| SelError::internal(e.to_string()))?;
    let mut overrides = CliOverrides {
        config: cli.global.config.clone(),
        types: cli.global.types.clone(),
        log_level: cli.global.log_level.map(|l| l.as_str().to_string()),
        ..CliOverrides::default()
    };
    if let Command::Prepare {
        glove_dim,
        batch_size,
        seed,
        ..
    } = &cli.command
    {
        overrides.glove_dim = *glove_dim;
        overrides.batch_size = *batch_size;
        overrides.shuffle_seed = *seed;
    }
    ResolvedConfig::resolve(&cwd, &overrides).map_err(SelError::from)
}

/// Initialize tracing subscriber.
fn init_tracing(level: &str, format: LogFormat) {
    use tracing_subscriber::fmt::format::FmtSpan;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(io::stderr);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

/// Execute the CLI command.
fn execute(cli: Cli, config: &ResolvedConfig) -> Result<(), SelError> {
    let registry = config.registry()?;
    let mut stdout = io::stdout();
    let emitted = match cli.command {
        Command::Explain { filter, json } => {
            emit_response(&run_explain(&filter, syntax(json), &registry)?, &mut stdout)
        }
        Command::Select {
            state,
            json,
            filters,
        } => emit_response(
            &run_select(&state, &filters, syntax(json), &registry)?,
            &mut stdout,
        ),
        Command::Split {
            state,
            json,
            filters,
        } => emit_response(
            &run_split(&state, &filters, syntax(json), &registry)?,
            &mut stdout,
        ),
        Command::Prepare {
            data_dir,
            glove,
            cache_dir,
            vocab,
            embed,
            ..
        } => {
            let args = PrepareArgs {
                data_dir,
                glove,
                cache_dir,
                vocab,
                embed,
            };
            emit_response(&run_prepare(&args, config)?, &mut stdout)
        }
    };
    emitted.map_err(|e| SelError::internal(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    mod cli_parsing {
        use super::*;

        #[test]
        fn parse_explain_with_json_flag() {
            let cli = Cli::try_parse_from(["statesel", "explain", "--json", "[\"a\"]"]).unwrap();
            match cli.command {
                Command::Explain { filter, json } => {
                    assert_eq!(filter, "[\"a\"]");
                    assert!(json);
                }
                other => panic!("expected Explain, got {:?}", other),
            }
        }

        #[test]
        fn parse_split_collects_filters() {
            let cli = Cli::try_parse_from([
                "statesel",
                "split",
                "--state",
                "state.json",
                "type:Param",
                "...",
            ])
            .unwrap();
            match cli.command {
                Command::Split { filters, .. } => assert_eq!(filters, vec!["type:Param", "..."]),
                other => panic!("expected Split, got {:?}", other),
            }
        }

        #[test]
        fn select_requires_a_filter() {
            assert!(Cli::try_parse_from(["statesel", "select", "--state", "s.json"]).is_err());
        }

        #[test]
        fn vocab_requires_embed() {
            let result = Cli::try_parse_from([
                "statesel",
                "prepare",
                "--data-dir",
                "data",
                "--vocab",
                "vocab.txt",
            ]);
            assert!(result.is_err());
        }

        #[test]
        fn global_flags_after_subcommand() {
            let cli = Cli::try_parse_from([
                "statesel",
                "explain",
                "tag:a",
                "--log-level",
                "debug",
                "--log-format",
                "json",
            ])
            .unwrap();
            assert!(matches!(cli.global.log_level, Some(LogLevel::Debug)));
            assert_eq!(cli.global.log_format, LogFormat::Json);
        }
    }
}
