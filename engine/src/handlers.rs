//! Command handlers for CLI operations
//!
//! This module implements the handlers for all CLI commands:
//! - research: run a query, streaming thought events, Ctrl-C to stop
//! - history / show / delete: browse stored results
//! - memory: manage memory contexts
//! - providers / depths: inspect what is available
//! - key set: store a provider API key
//!
//! Progress lines go to stderr; answers and `--json` objects go to stdout.

use anyhow::{Context, Result};
use sdk::errors::EngineError;
use serde_json::json;
use std::sync::Arc;

use crate::cli::{MemoryAction, ResearchArgs};
use crate::config::{Config, KNOWN_PROVIDERS};
use crate::db::{Database, ResearchStore};
use crate::llm::registry::ProviderRegistry;
use crate::research::{
    DepthTier, ResearchOrchestrator, ResearchRequest, ResearchResult, ResearchSession,
    RunOutcome, Subscription, ThoughtBus, ThoughtEvent,
};
use crate::secrets::{SecretCache, SecretManager};

/// Keychain service name for provider API keys
pub const KEYCHAIN_SERVICE: &str = "deepdive";

/// Output format for command results
#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for machine consumption
    Json,
}

/// Open the database and wrap its store for the handlers
async fn open_store(config: &Config) -> Result<(Database, Arc<dyn ResearchStore>)> {
    let database = Database::new(&config.db_path())
        .await
        .context("Failed to open database")?;
    let store: Arc<dyn ResearchStore> = Arc::new(database.store());
    Ok((database, store))
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Build a validated request from CLI arguments and configured defaults
pub fn build_request(args: &ResearchArgs, config: &Config) -> Result<ResearchRequest, EngineError> {
    let provider = args
        .provider
        .clone()
        .unwrap_or_else(|| config.llm.default_provider.clone());
    let provider_config = config
        .llm
        .provider(&provider)
        .ok_or_else(|| EngineError::UnknownProvider(provider.clone()))?;

    let depth = DepthTier::parse(
        args.depth
            .as_deref()
            .unwrap_or(&config.research.default_depth),
    );
    let model = args
        .model
        .clone()
        .unwrap_or_else(|| provider_config.model.clone());

    ResearchRequest::new(
        args.query.clone(),
        provider,
        model,
        depth,
        args.max_tokens.unwrap_or(config.research.max_tokens),
        args.temperature.unwrap_or(config.research.temperature),
    )
}

fn print_thought(event: &ThoughtEvent) {
    eprintln!("{}", event);
}

/// Run one research query
pub async fn handle_research(args: ResearchArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let request = build_request(&args, config)?;
    let (database, store) = open_store(config).await?;

    let secret_manager = Arc::new(SecretManager::new(KEYCHAIN_SERVICE));
    let secret_cache = Arc::new(SecretCache::new(secret_manager));
    let registry = Arc::new(ProviderRegistry::from_config(&config.llm, secret_cache));

    let bus = ThoughtBus::new();
    let mut thoughts = bus.subscribe(Subscription::All).await;
    let orchestrator = ResearchOrchestrator::new(registry, bus);
    let session = ResearchSession::new(
        config.research.session_id.clone(),
        orchestrator,
        Some(Arc::clone(&store)),
        config.research.max_active_memories,
    );

    if !args.memories.is_empty() {
        let stored = store.load_memory(session.session_id()).await?;
        for id in &args.memories {
            let ctx = stored
                .iter()
                .find(|m| &m.id == id)
                .cloned()
                .ok_or_else(|| EngineError::NotFound(format!("memory context {}", id)))?;
            session.select_memory(ctx)?;
        }
    }

    if let OutputFormat::Text = format {
        eprintln!(
            "Researching with {} ({}), depth {} ({} passes). Ctrl-C to stop.",
            request.provider,
            request.model,
            request.depth,
            request.depth.pass_count()
        );
    }

    let run = {
        let run = session.start(&request);
        tokio::pin!(run);
        loop {
            tokio::select! {
                result = &mut run => break result?,
                Some(event) = thoughts.recv() => {
                    if let OutputFormat::Text = format {
                        print_thought(&event);
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    if let OutputFormat::Text = format {
                        eprintln!("Stopping...");
                    }
                    session.cancel();
                }
            }
        }
    };

    if let OutputFormat::Text = format {
        while let Ok(event) = thoughts.try_recv() {
            print_thought(&event);
        }
    }

    let outcome = match run.outcome {
        RunOutcome::Completed(result) => {
            let memory_id = if args.remember {
                match session.remember(&result).await {
                    Ok(ctx) => Some(ctx.id),
                    Err(e) => {
                        tracing::warn!("Failed to store memory context: {:#}", e);
                        None
                    }
                }
            } else {
                None
            };

            match format {
                OutputFormat::Text => {
                    println!();
                    println!("{}", result.answer);
                    println!();
                    println!("✓ Research complete");
                    println!("  Confidence: {}%", result.confidence);
                    println!("  Result ID:  {}", result.id);
                    if let Some(id) = memory_id {
                        println!("  Memory ID:  {}", id);
                    }
                }
                OutputFormat::Json => print_json(&json!({
                    "status": "completed",
                    "result": result,
                    "memory_id": memory_id,
                    "thoughts": run.log.events(),
                }))?,
            }
            Ok(())
        }
        RunOutcome::Aborted => {
            match format {
                OutputFormat::Text => println!("■ Research stopped by user"),
                OutputFormat::Json => print_json(&json!({
                    "status": "aborted",
                    "thoughts": run.log.events(),
                }))?,
            }
            Ok(())
        }
        RunOutcome::Failed(message) => {
            match format {
                OutputFormat::Text => println!("✗ Research failed: {}", message),
                OutputFormat::Json => print_json(&json!({
                    "status": "failed",
                    "error": message,
                    "thoughts": run.log.events(),
                }))?,
            }
            Err(EngineError::LLMProvider(message).into())
        }
    };

    database.close().await?;
    outcome
}

fn print_result_summary(result: &ResearchResult) {
    println!("Result ID: {}", result.id);
    println!("  Query:      {}", result.query);
    println!(
        "  Provider:   {} ({}), depth {}",
        result.provider, result.model, result.depth
    );
    println!("  Confidence: {}%", result.confidence);
    println!(
        "  Created:    {}",
        result.timestamp.format("%Y-%m-%d %H:%M:%S")
    );
}

/// Show research history, most recent first
pub async fn handle_history(limit: Option<usize>, config: &Config, format: OutputFormat) -> Result<()> {
    let limit = limit.unwrap_or(config.research.history_limit);
    let (database, store) = open_store(config).await?;

    let results = store
        .load_results(&config.research.session_id, limit)
        .await
        .context("Failed to fetch research history")?;

    match format {
        OutputFormat::Text => {
            if results.is_empty() {
                println!("No research in history");
            } else {
                println!("Research History (last {}):", limit);
                println!();
                for result in &results {
                    print_result_summary(result);
                    println!();
                }
            }
        }
        OutputFormat::Json => print_json(&json!({
            "results": results,
            "count": results.len(),
            "limit": limit
        }))?,
    }

    database.close().await
}

/// Show one stored result with its full answer
pub async fn handle_show(id: String, config: &Config, format: OutputFormat) -> Result<()> {
    let (database, store) = open_store(config).await?;

    let result = store
        .get_result(&id)
        .await?
        .ok_or_else(|| EngineError::NotFound(format!("result {}", id)))?;

    match format {
        OutputFormat::Text => {
            print_result_summary(&result);
            println!();
            println!("{}", result.answer);
        }
        OutputFormat::Json => print_json(&json!({ "result": result }))?,
    }

    database.close().await
}

pub async fn handle_delete(id: String, config: &Config, format: OutputFormat) -> Result<()> {
    let (database, store) = open_store(config).await?;

    if !store.delete_result(&id).await? {
        return Err(EngineError::NotFound(format!("result {}", id)).into());
    }

    match format {
        OutputFormat::Text => println!("Deleted result {}", id),
        OutputFormat::Json => print_json(&json!({ "deleted": id }))?,
    }

    database.close().await
}

pub async fn handle_memory(action: MemoryAction, config: &Config, format: OutputFormat) -> Result<()> {
    let (database, store) = open_store(config).await?;
    let session_id = &config.research.session_id;

    match action {
        MemoryAction::List => {
            let memories = store.load_memory(session_id).await?;
            match format {
                OutputFormat::Text => {
                    if memories.is_empty() {
                        println!("No memory contexts stored");
                    } else {
                        println!(
                            "Memory contexts ({} stored, up to {} active per run):",
                            memories.len(),
                            config.research.max_active_memories
                        );
                        println!();
                        for ctx in &memories {
                            println!("Memory ID: {}", ctx.id);
                            println!("  Query:    {}", ctx.query);
                            println!("  Provider: {} ({})", ctx.provider, ctx.model);
                            println!(
                                "  Created:  {}",
                                ctx.created_at.format("%Y-%m-%d %H:%M:%S")
                            );
                            println!();
                        }
                    }
                }
                OutputFormat::Json => print_json(&json!({
                    "memories": memories,
                    "count": memories.len()
                }))?,
            }
        }

        MemoryAction::Add { result_id } => {
            let result = store
                .get_result(&result_id)
                .await?
                .ok_or_else(|| EngineError::NotFound(format!("result {}", result_id)))?;
            let ctx = crate::research::MemoryContext::from_result(&result);
            store.save_memory(session_id, &ctx).await?;

            match format {
                OutputFormat::Text => println!("Stored memory context {}", ctx.id),
                OutputFormat::Json => print_json(&json!({ "memory": ctx }))?,
            }
        }

        MemoryAction::Remove { id } => {
            if !store.delete_memory(&id).await? {
                return Err(EngineError::NotFound(format!("memory context {}", id)).into());
            }
            match format {
                OutputFormat::Text => println!("Removed memory context {}", id),
                OutputFormat::Json => print_json(&json!({ "removed": id }))?,
            }
        }

        MemoryAction::Clear => {
            let removed = store.clear_memory(session_id).await?;
            match format {
                OutputFormat::Text => println!("Cleared {} memory context(s)", removed),
                OutputFormat::Json => print_json(&json!({ "cleared": removed }))?,
            }
        }
    }

    database.close().await
}

/// List providers with their health
pub async fn handle_providers(config: &Config, format: OutputFormat) -> Result<()> {
    let secret_manager = Arc::new(SecretManager::new(KEYCHAIN_SERVICE));
    let registry = ProviderRegistry::from_config(
        &config.llm,
        Arc::new(SecretCache::new(secret_manager)),
    );
    let statuses = registry.health().await;

    match format {
        OutputFormat::Text => {
            println!("Providers:");
            for status in &statuses {
                let marker = if status.name == config.llm.default_provider {
                    "*"
                } else {
                    " "
                };
                println!(
                    " {} {:<10} {:<12} {:<6} {}",
                    marker,
                    status.name,
                    if status.healthy { "available" } else { "unavailable" },
                    if status.local { "local" } else { "cloud" },
                    status.default_model
                );
            }
        }
        OutputFormat::Json => print_json(&json!({
            "default": config.llm.default_provider,
            "providers": statuses
        }))?,
    }

    Ok(())
}

pub fn handle_depths(format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            println!("Depth tiers:");
            for tier in DepthTier::ALL {
                let passes = tier.pass_count();
                println!(
                    "  {:<11} {} pass{}{}",
                    tier.as_str(),
                    passes,
                    if passes == 1 { "" } else { "es" },
                    if passes > 1 { " + synthesis" } else { "" }
                );
            }
        }
        OutputFormat::Json => {
            let tiers: Vec<_> = DepthTier::ALL
                .iter()
                .map(|t| json!({ "tier": t.as_str(), "passes": t.pass_count() }))
                .collect();
            print_json(&json!({ "tiers": tiers }))?;
        }
    }
    Ok(())
}

/// Prompt for and store a provider API key
pub fn handle_key_set(provider: String, format: OutputFormat) -> Result<()> {
    if !KNOWN_PROVIDERS.contains(&provider.as_str()) {
        return Err(EngineError::UnknownProvider(provider).into());
    }
    if provider == "ollama" {
        return Err(EngineError::InvalidRequest(
            "ollama runs locally and needs no API key".to_string(),
        )
        .into());
    }

    let key_name = format!("{}_api_key", provider);
    let value = rpassword::prompt_password_stdout(&format!("Enter {} API key: ", provider))
        .context("Failed to read API key")?;

    SecretManager::new(KEYCHAIN_SERVICE).set_secret(&key_name, value.trim())?;

    match format {
        OutputFormat::Text => println!("Stored {} in the OS keychain", key_name),
        OutputFormat::Json => print_json(&json!({ "stored": key_name }))?,
    }
    Ok(())
}
