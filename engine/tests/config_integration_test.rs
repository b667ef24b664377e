//! Integration tests for configuration management
//!
//! These tests verify that a config file is parsed, validated and processed,
//! including data directory creation and rejection of invalid values.

use deepdive_engine::config::Config;
use sdk::errors::EngineError;
use tempfile::TempDir;

fn config_toml(data_dir: &str, research: &str) -> String {
    format!(
        r#"
[core]
log_level = "debug"
data_dir = "{}"

[llm]
default_provider = "anthropic"

[llm.ollama]
base_url = "http://10.0.0.5:11434"
model = "qwen2.5:14b"

[research]
{}
"#,
        data_dir, research
    )
}

#[test]
fn test_load_from_path() {
    let temp_dir = TempDir::new().unwrap();
    let data_dir = temp_dir.path().join("data");
    let config_path = temp_dir.path().join("config.toml");
    std::fs::write(
        &config_path,
        config_toml(
            data_dir.to_str().unwrap(),
            "default_depth = \"deep\"\nmax_tokens = 2048\nsession_id = \"work\"",
        ),
    )
    .unwrap();

    let config = Config::load_from_path(&config_path).unwrap();

    assert_eq!(config.core.log_level, "debug");
    assert_eq!(config.llm.default_provider, "anthropic");
    assert_eq!(config.llm.ollama.base_url, "http://10.0.0.5:11434");
    assert_eq!(config.llm.ollama.model, "qwen2.5:14b");
    assert_eq!(config.llm.ollama.timeout_secs, 300);
    assert_eq!(config.research.default_depth, "deep");
    assert_eq!(config.research.max_tokens, 2048);
    assert_eq!(config.research.session_id, "work");
    // Unset research keys keep their defaults
    assert_eq!(config.research.max_active_memories, 5);
    assert!(data_dir.exists(), "data dir is created on load");
    assert_eq!(config.db_path(), data_dir.join("deepdive.db"));
}

#[test]
fn test_missing_file_is_config_error() {
    let temp_dir = TempDir::new().unwrap();
    let result = Config::load_from_path(&temp_dir.path().join("absent.toml"));
    assert!(matches!(result, Err(EngineError::Config(_))));
}

#[test]
fn test_invalid_values_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let data_dir = temp_dir.path().to_str().unwrap().to_string();

    for research in [
        "max_tokens = 0",
        "temperature = 2.5",
        "max_active_memories = 0",
        "max_active_memories = 6",
        "session_id = \"  \"",
    ] {
        let result = Config::from_toml_str(&config_toml(&data_dir, research));
        assert!(
            matches!(result, Err(EngineError::Config(_))),
            "expected rejection for `{}`",
            research
        );
    }

    let bad_provider = config_toml(&data_dir, "").replace("anthropic", "mistral");
    assert!(Config::from_toml_str(&bad_provider).is_err());

    let bad_level = config_toml(&data_dir, "").replace("debug", "verbose");
    assert!(Config::from_toml_str(&bad_level).is_err());

    assert!(Config::from_toml_str("not = [valid").is_err());
}
