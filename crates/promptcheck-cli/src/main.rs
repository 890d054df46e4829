//! promptcheck - run prompt test suites against LLM backends.

mod commands;
mod logging;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use promptcheck_core::{check_variable_name, LlmType};
use promptcheck_runtime::LlmClient;

/// Test prompts against LLM backends
#[derive(Parser, Debug)]
#[command(name = "promptcheck")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Runtime config file (defaults to ./promptcheck.yaml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the cache directory
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    /// Call backends directly, bypassing the cache
    #[arg(long, global = true)]
    no_cache: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    /// Debug-level logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse and schema-check a suite without calling any backend
    Validate(SuiteArgs),

    /// Sample the prompt and report per-test statistics
    Run {
        #[command(flatten)]
        suite: SuiteArgs,

        /// Model to sample, as provider/model
        #[arg(long)]
        model: LlmType,

        /// Number of responses to sample
        #[arg(short = 'n', long, default_value_t = 5)]
        samples: usize,
    },

    /// Print raw responses for the prompt
    Execute {
        #[command(flatten)]
        suite: SuiteArgs,

        #[arg(long)]
        model: LlmType,

        #[arg(short = 'n', long, default_value_t = 1)]
        samples: usize,
    },

    /// Ask a model for alternative phrasings of the prompt
    Candidates {
        #[command(flatten)]
        suite: SuiteArgs,

        #[arg(long)]
        model: LlmType,

        /// Number of candidates to request
        #[arg(short = 'n', long, default_value_t = 3)]
        count: usize,
    },

    /// Score how consistent the prompt's responses are
    Stability {
        #[command(flatten)]
        suite: SuiteArgs,

        #[arg(long)]
        model: LlmType,

        /// Embedding model, as provider/model
        #[arg(long)]
        embedding_model: LlmType,

        /// Number of responses to sample, at least 2
        #[arg(short = 'n', long, default_value_t = 5)]
        samples: usize,
    },
}

/// Suite selection shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct SuiteArgs {
    /// Suite file (.yaml, .yml or .json)
    suite: PathBuf,

    /// Set or override a variable, as KEY=VALUE
    #[arg(long = "var", value_name = "KEY=VALUE", value_parser = parse_var)]
    vars: Vec<(String, String)>,

    /// Fail when the prompt has placeholders without a value
    #[arg(long)]
    strict: bool,
}

fn parse_var(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", raw))?;
    check_variable_name(key).map_err(|e| e.to_string())?;
    Ok((key.to_string(), value.to_string()))
}

/// Backend client from the global flags; only commands that call a model build one.
fn client(cli: &Cli) -> Result<Arc<dyn LlmClient>> {
    let config = commands::load_config(cli.config.as_deref())?;
    commands::build_client(&config, cli.cache_dir.clone(), cli.no_cache)
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose, cli.json_logs);

    match &cli.command {
        Command::Validate(suite) => commands::validate(suite),
        Command::Run {
            suite,
            model,
            samples,
        } => commands::run(client(&cli)?.as_ref(), suite, model, *samples).await,
        Command::Execute {
            suite,
            model,
            samples,
        } => commands::execute(client(&cli)?.as_ref(), suite, model, *samples).await,
        Command::Candidates {
            suite,
            model,
            count,
        } => commands::candidates(client(&cli)?.as_ref(), suite, model, *count).await,
        Command::Stability {
            suite,
            model,
            embedding_model,
            samples,
        } => {
            commands::stability(
                client(&cli)?.as_ref(),
                suite,
                model,
                embedding_model,
                *samples,
            )
            .await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run() {
        let cli = Cli::try_parse_from([
            "promptcheck",
            "-v",
            "run",
            "suite.yaml",
            "--model",
            "openAI/gpt-4o-mini",
            "-n",
            "3",
            "--var",
            "post=Hello there",
        ])
        .unwrap();

        assert!(cli.verbose);
        match cli.command {
            Command::Run {
                suite,
                model,
                samples,
            } => {
                assert_eq!(model, LlmType::new("openAI", "gpt-4o-mini"));
                assert_eq!(samples, 3);
                assert_eq!(suite.vars, vec![("post".to_string(), "Hello there".to_string())]);
                assert!(!suite.strict);
            }
            other => panic!("Expected run, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_stability_defaults() {
        let cli = Cli::try_parse_from([
            "promptcheck",
            "stability",
            "suite.yaml",
            "--model",
            "openAI/gpt-4o-mini",
            "--embedding-model",
            "openAI/text-embedding-3-small",
            "--no-cache",
        ])
        .unwrap();

        assert!(cli.no_cache);
        match cli.command {
            Command::Stability {
                samples,
                embedding_model,
                ..
            } => {
                assert_eq!(samples, 5);
                assert_eq!(embedding_model.model, "text-embedding-3-small");
            }
            other => panic!("Expected stability, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_takes_only_suite_args() {
        let cli = Cli::try_parse_from(["promptcheck", "validate", "suite.yaml", "--strict"]).unwrap();
        match cli.command {
            Command::Validate(suite) => {
                assert_eq!(suite.suite, PathBuf::from("suite.yaml"));
                assert!(suite.strict);
            }
            other => panic!("Expected validate, got {:?}", other),
        }
        assert!(Cli::try_parse_from(["promptcheck", "validate", "s.yaml", "--model", "a/b"]).is_err());
    }

    #[test]
    fn test_bad_model_rejected() {
        let result = Cli::try_parse_from([
            "promptcheck",
            "run",
            "suite.yaml",
            "--model",
            "gpt-4o-mini",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_var() {
        assert_eq!(
            parse_var("a=b=c").unwrap(),
            ("a".to_string(), "b=c".to_string())
        );
        assert_eq!(
            parse_var("user name=Ada").unwrap(),
            ("user name".to_string(), "Ada".to_string())
        );
        assert!(parse_var("novalue").is_err());
        assert!(parse_var("=x").is_err());
        assert!(parse_var("{name}=x").is_err());
    }
}
