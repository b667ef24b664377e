//! Research data model
//!
//! Requests, depth tiers, per-pass records, memory contexts and the final
//! result produced by a completed run.

use chrono::{DateTime, Utc};
use sdk::errors::EngineError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How many analysis passes a run performs.
///
/// The tier-to-pass mapping is fixed: quick=1, standard=3, deep=5, exhaustive=8.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DepthTier {
    Quick,
    #[default]
    Standard,
    Deep,
    Exhaustive,
}

impl DepthTier {
    pub const ALL: [DepthTier; 4] = [
        DepthTier::Quick,
        DepthTier::Standard,
        DepthTier::Deep,
        DepthTier::Exhaustive,
    ];

    /// Parse a tier name case-insensitively. Unknown names fall back to
    /// `Standard` (3 passes).
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "quick" => DepthTier::Quick,
            "standard" => DepthTier::Standard,
            "deep" => DepthTier::Deep,
            "exhaustive" => DepthTier::Exhaustive,
            other => {
                tracing::debug!("Unknown depth tier '{}', using standard", other);
                DepthTier::Standard
            }
        }
    }

    pub fn pass_count(&self) -> usize {
        match self {
            DepthTier::Quick => 1,
            DepthTier::Standard => 3,
            DepthTier::Deep => 5,
            DepthTier::Exhaustive => 8,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DepthTier::Quick => "quick",
            DepthTier::Standard => "standard",
            DepthTier::Deep => "deep",
            DepthTier::Exhaustive => "exhaustive",
        }
    }
}

impl fmt::Display for DepthTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters of one research run. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchRequest {
    pub query: String,
    pub provider: String,
    pub model: String,
    pub depth: DepthTier,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl ResearchRequest {
    /// Build a validated request.
    ///
    /// # Errors
    /// `EngineError::InvalidRequest` for an empty query, `max_tokens == 0`
    /// or a temperature outside [0, 2].
    pub fn new(
        query: impl Into<String>,
        provider: impl Into<String>,
        model: impl Into<String>,
        depth: DepthTier,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<Self, EngineError> {
        let query = query.into();
        if query.trim().is_empty() {
            return Err(EngineError::InvalidRequest(
                "query must not be empty".to_string(),
            ));
        }
        if max_tokens == 0 {
            return Err(EngineError::InvalidRequest(
                "max_tokens must be positive".to_string(),
            ));
        }
        if !(0.0..=2.0).contains(&temperature) {
            return Err(EngineError::InvalidRequest(format!(
                "temperature {} is outside [0, 2]",
                temperature
            )));
        }

        Ok(Self {
            query,
            provider: provider.into(),
            model: model.into(),
            depth,
            max_tokens,
            temperature,
        })
    }
}

/// Output of one completed analysis pass. Lives only for the duration of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct PassRecord {
    pub index: usize,
    pub label: &'static str,
    pub output: String,
}

/// A previously produced query/answer pair that can be re-injected into a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryContext {
    pub id: String,
    pub query: String,
    pub answer: String,
    pub provider: String,
    pub model: String,
    pub created_at: DateTime<Utc>,
}

impl MemoryContext {
    pub fn new(
        query: impl Into<String>,
        answer: impl Into<String>,
        provider: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            query: query.into(),
            answer: answer.into(),
            provider: provider.into(),
            model: model.into(),
            created_at: Utc::now(),
        }
    }

    /// Promote a completed result to a memory context
    pub fn from_result(result: &ResearchResult) -> Self {
        Self::new(
            result.query.clone(),
            result.answer.clone(),
            result.provider.clone(),
            result.model.clone(),
        )
    }
}

/// The single product of a successful run. `answer` is never empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchResult {
    pub id: String,
    pub query: String,
    pub answer: String,
    /// Heuristic confidence in [22, 97]
    pub confidence: u8,
    pub provider: String,
    pub model: String,
    pub depth: DepthTier,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pass_count_mapping() {
        assert_eq!(DepthTier::Quick.pass_count(), 1);
        assert_eq!(DepthTier::Standard.pass_count(), 3);
        assert_eq!(DepthTier::Deep.pass_count(), 5);
        assert_eq!(DepthTier::Exhaustive.pass_count(), 8);
    }

    #[test]
    fn test_parse_tier() {
        assert_eq!(DepthTier::parse("quick"), DepthTier::Quick);
        assert_eq!(DepthTier::parse("DEEP"), DepthTier::Deep);
        assert_eq!(DepthTier::parse(" Exhaustive "), DepthTier::Exhaustive);
        assert_eq!(DepthTier::parse("bottomless"), DepthTier::Standard);
        assert_eq!(DepthTier::parse("").pass_count(), 3);
    }

    #[test]
    fn test_tier_display_roundtrip() {
        for tier in DepthTier::ALL {
            assert_eq!(DepthTier::parse(&tier.to_string()), tier);
        }
    }

    #[test]
    fn test_request_validation() {
        assert!(ResearchRequest::new("q", "ollama", "", DepthTier::Quick, 100, 0.7).is_ok());
        assert!(matches!(
            ResearchRequest::new("   ", "ollama", "", DepthTier::Quick, 100, 0.7),
            Err(EngineError::InvalidRequest(_))
        ));
        assert!(ResearchRequest::new("q", "ollama", "", DepthTier::Quick, 0, 0.7).is_err());
        assert!(ResearchRequest::new("q", "ollama", "", DepthTier::Quick, 100, 2.5).is_err());
        assert!(ResearchRequest::new("q", "ollama", "", DepthTier::Quick, 100, -0.1).is_err());
        assert!(ResearchRequest::new("q", "ollama", "", DepthTier::Quick, 100, 2.0).is_ok());
    }

    #[test]
    fn test_memory_from_result() {
        let result = ResearchResult {
            id: "r1".to_string(),
            query: "why is the sky blue".to_string(),
            answer: "Rayleigh scattering".to_string(),
            confidence: 60,
            provider: "ollama".to_string(),
            model: "llama3.1:8b".to_string(),
            depth: DepthTier::Quick,
            timestamp: Utc::now(),
        };

        let memory = MemoryContext::from_result(&result);
        assert_eq!(memory.query, result.query);
        assert_eq!(memory.answer, result.answer);
        assert_ne!(memory.id, result.id);
    }
}
