//! Noema Session crate - per-conversation reasoning state.
//!
//! Tracks which concepts a dialogue has referenced, the active topic, and a
//! running confidence score, with a fixed time-to-live so stale state is
//! reclaimed automatically. Also builds the diagnostic "logic flow"
//! decomposition of a question.

pub mod flow;
pub mod manager;
pub mod sweeper;
pub mod types;

pub use flow::{build_logic_flow, FlowStage, FlowStep, LogicFlow};
pub use manager::SessionManager;
pub use sweeper::SessionSweeper;
pub use types::{Intent, Session};
