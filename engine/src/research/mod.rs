//! Research engine
//!
//! Drives a multi-pass deep research run: sequential analysis passes over a
//! query, optional synthesis into one report, and a heuristic confidence
//! score. Progress is published as [`ThoughtEvent`]s on a [`ThoughtBus`].

pub mod bus;
pub mod confidence;
pub mod memory;
pub mod orchestrator;
pub mod pass;
pub mod session;
pub mod synthesizer;
pub mod thought_log;
pub mod types;

pub use bus::{Subscription, ThoughtBus};
pub use memory::MemoryInjector;
pub use orchestrator::{ResearchOrchestrator, ResearchRun, RunOutcome};
pub use pass::{PassExecutor, PASS_LABELS};
pub use session::ResearchSession;
pub use synthesizer::Synthesizer;
pub use thought_log::{ThoughtEvent, ThoughtKind, ThoughtLog};
pub use types::{DepthTier, MemoryContext, PassRecord, ResearchRequest, ResearchResult};
