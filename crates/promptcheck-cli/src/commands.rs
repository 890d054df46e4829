//! Subcommand implementations.

use anyhow::{Context, Result};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use promptcheck_core::{substitute_strict, LlmType, TestSuite};
use promptcheck_runtime::providers::{OPENAI_API_KEY_ENV, OPENAI_PROVIDER};
use promptcheck_runtime::{
    calculate_stability, execute_prompt, generate_feedback, propose_candidates, LlmClient,
    ProviderRegistry, RuntimeConfig,
};

use crate::SuiteArgs;

/// Config file picked up from the working directory when `--config` is absent.
const DEFAULT_CONFIG_FILE: &str = "promptcheck.yaml";

pub fn load_config(path: Option<&Path>) -> Result<RuntimeConfig> {
    match path {
        Some(path) => RuntimeConfig::from_yaml_file(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
            RuntimeConfig::from_yaml_file(DEFAULT_CONFIG_FILE)
                .with_context(|| format!("Failed to load config {}", DEFAULT_CONFIG_FILE))
        }
        None => Ok(RuntimeConfig::default()),
    }
}

pub fn build_client(
    config: &RuntimeConfig,
    cache_dir: Option<PathBuf>,
    no_cache: bool,
) -> Result<Arc<dyn LlmClient>> {
    let mut config = config.clone();
    if let Some(dir) = cache_dir {
        config.cache.root = dir;
    }
    if no_cache {
        config.cache.enabled = false;
    }
    // An exported key is enough to reach OpenAI without a providers block
    if std::env::var_os(OPENAI_API_KEY_ENV).is_some() {
        config
            .providers
            .entry(OPENAI_PROVIDER.to_string())
            .or_insert_with(|| json!({}));
    }
    config
        .build_client(ProviderRegistry::with_defaults())
        .context("Failed to configure LLM providers")
}

/// Load a suite and apply `--var` overrides.
pub fn load_suite(args: &SuiteArgs) -> Result<TestSuite> {
    let mut suite = TestSuite::from_file(&args.suite)
        .with_context(|| format!("Failed to load suite {}", args.suite.display()))?;

    for (name, value) in &args.vars {
        suite.variables.insert(name.clone(), value.clone());
    }

    if args.strict {
        substitute_strict(&suite.prompt, &suite.variables)
            .with_context(|| format!("Suite {} has unbound variables", args.suite.display()))?;
    } else {
        let unbound = suite.unbound_variables();
        if !unbound.is_empty() {
            tracing::warn!(?unbound, "Placeholders without a value are sent verbatim");
        }
    }
    Ok(suite)
}

pub fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn validate(args: &SuiteArgs) -> Result<ExitCode> {
    let suite = load_suite(args)?;
    let kinds: Vec<&str> = suite.tests.iter().map(|t| t.kind()).collect();

    print_json(&json!({
        "name": suite.name,
        "prompt": suite.prompt,
        "resolvedPrompt": suite.resolved_prompt(),
        "variables": suite.variables,
        "unboundVariables": suite.unbound_variables(),
        "tests": kinds,
        "judgedTests": suite.judged_tests().count(),
    }))?;
    Ok(ExitCode::SUCCESS)
}

/// Exits with failure when any sampled response failed any test.
pub async fn run(client: &dyn LlmClient, args: &SuiteArgs, model: &LlmType, samples: usize) -> Result<ExitCode> {
    let suite = load_suite(args)?;
    let feedback = generate_feedback(
        client,
        model,
        &suite.prompt,
        samples,
        &suite.variables,
        &suite.tests,
    )
    .await
    .context("Failed to generate prompt feedback")?;

    print_json(&feedback)?;
    Ok(if feedback.all_passed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

pub async fn execute(client: &dyn LlmClient, args: &SuiteArgs, model: &LlmType, samples: usize) -> Result<ExitCode> {
    let suite = load_suite(args)?;
    let responses = execute_prompt(client, model, &suite.prompt, samples, &suite.variables)
        .await
        .context("Failed to execute prompt")?;

    print_json(&responses)?;
    Ok(ExitCode::SUCCESS)
}

pub async fn candidates(client: &dyn LlmClient, args: &SuiteArgs, model: &LlmType, count: usize) -> Result<ExitCode> {
    let suite = load_suite(args)?;
    let candidates = propose_candidates(
        client,
        model,
        &suite.prompt,
        count,
        &suite.variables,
        &suite.tests,
    )
    .await
    .context("Failed to generate prompt candidates")?;

    print_json(&candidates)?;
    Ok(ExitCode::SUCCESS)
}

pub async fn stability(
    client: &dyn LlmClient,
    args: &SuiteArgs,
    model: &LlmType,
    embedding_model: &LlmType,
    samples: usize,
) -> Result<ExitCode> {
    let suite = load_suite(args)?;
    let score = calculate_stability(
        client,
        model,
        embedding_model,
        &suite.prompt,
        samples,
        &suite.variables,
    )
    .await
    .context("Failed to calculate stability")?;

    print_json(&json!({
        "model": model.to_string(),
        "embeddingModel": embedding_model.to_string(),
        "samples": samples,
        "stability": score,
    }))?;
    Ok(ExitCode::SUCCESS)
}
