//! Request orchestration
//!
//! Each request owns one [`PipelineRun`]; the only state shared between
//! concurrent runs is the chain registry and the retrieval clients.

mod rag;
mod search;
mod stage;

pub use rag::{RagAnswer, RagOrchestrator, RagPaperAnswer, RagResources};
pub use search::{PlaygroundAnswer, SearchAnswer, SearchOrchestrator};
pub use stage::{PipelineRun, PipelineStage};
