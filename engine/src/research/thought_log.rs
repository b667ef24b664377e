//! Thought log
//!
//! Append-only record of orchestration events for one research run. Each
//! entry carries the time elapsed since the run started. The log is owned by
//! the orchestrator for the duration of a run and handed back to the caller
//! afterwards for inspection.

use serde::{Serialize, Serializer};
use std::fmt;
use std::time::{Duration, Instant};

use super::bus::ThoughtBus;

/// Kind of orchestration event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ThoughtKind {
    /// Run started: pass count resolved
    Initialize,
    /// Prior-session memory injected into prompts
    MemoryRetrieval,
    /// A pass is about to call the generation service
    PassStart,
    /// A pass returned its output
    PassComplete,
    /// Pass outputs are being merged into one report
    Synthesis,
    /// Run finished with a scored answer
    Complete,
    /// Run failed
    Error,
}

impl ThoughtKind {
    pub fn label(&self) -> &'static str {
        match self {
            ThoughtKind::Initialize => "INITIALIZE",
            ThoughtKind::MemoryRetrieval => "MEMORY RETRIEVAL",
            ThoughtKind::PassStart => "PHASE",
            ThoughtKind::PassComplete => "PASS COMPLETE",
            ThoughtKind::Synthesis => "SYNTHESIS",
            ThoughtKind::Complete => "COMPLETE",
            ThoughtKind::Error => "ERROR",
        }
    }
}

impl fmt::Display for ThoughtKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One timestamped orchestration event
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThoughtEvent {
    pub kind: ThoughtKind,
    pub detail: String,
    #[serde(rename = "elapsed_ms", serialize_with = "serialize_millis")]
    pub elapsed: Duration,
}

fn serialize_millis<S: Serializer>(elapsed: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(elapsed.as_millis() as u64)
}

impl fmt::Display for ThoughtEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:>6.1}s] {}: {}",
            self.elapsed.as_secs_f64(),
            self.kind,
            self.detail
        )
    }
}

/// Append-only event log for one run
#[derive(Debug)]
pub struct ThoughtLog {
    started: Instant,
    events: Vec<ThoughtEvent>,
}

impl ThoughtLog {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            events: Vec::new(),
        }
    }

    /// Time since the run started
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Append an event stamped with the current elapsed time and publish it.
    pub async fn record(&mut self, bus: &ThoughtBus, kind: ThoughtKind, detail: impl Into<String>) {
        let event = ThoughtEvent {
            kind,
            detail: detail.into(),
            elapsed: self.elapsed(),
        };
        tracing::debug!("{}", event);
        bus.publish(&event).await;
        self.events.push(event);
    }

    pub fn events(&self) -> &[ThoughtEvent] {
        &self.events
    }

    /// Events of one kind, in order
    pub fn of_kind(&self, kind: ThoughtKind) -> impl Iterator<Item = &ThoughtEvent> {
        self.events.iter().filter(move |e| e.kind == kind)
    }

    pub fn count(&self, kind: ThoughtKind) -> usize {
        self.of_kind(kind).count()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl Default for ThoughtLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::research::bus::Subscription;

    #[tokio::test]
    async fn test_record_appends_in_order_with_monotonic_elapsed() {
        let bus = ThoughtBus::new();
        let mut log = ThoughtLog::new();

        log.record(&bus, ThoughtKind::Initialize, "1 pass").await;
        log.record(&bus, ThoughtKind::PassStart, "INITIAL ANALYSIS")
            .await;
        log.record(&bus, ThoughtKind::PassComplete, "120 words").await;

        let kinds: Vec<ThoughtKind> = log.events().iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ThoughtKind::Initialize,
                ThoughtKind::PassStart,
                ThoughtKind::PassComplete
            ]
        );
        assert!(log.events()[0].elapsed <= log.events()[2].elapsed);
        assert_eq!(log.count(ThoughtKind::PassStart), 1);
        assert_eq!(log.len(), 3);
    }

    #[tokio::test]
    async fn test_record_publishes_to_bus() {
        let bus = ThoughtBus::new();
        let mut rx = bus.subscribe(Subscription::All).await;
        let mut log = ThoughtLog::new();

        log.record(&bus, ThoughtKind::Error, "boom").await;

        let event = rx.recv().await.unwrap();
        assert_eq!(event, log.events()[0]);
    }

    #[test]
    fn test_event_serialization() {
        let event = ThoughtEvent {
            kind: ThoughtKind::MemoryRetrieval,
            detail: "2 contexts".to_string(),
            elapsed: Duration::from_millis(1500),
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "MEMORY_RETRIEVAL");
        assert_eq!(json["elapsed_ms"], 1500);
        assert_eq!(event.to_string(), "[   1.5s] MEMORY RETRIEVAL: 2 contexts");
    }
}
