//! Computer opponent: position scoring and one-ply reply search.

pub mod heuristics;
pub mod minimax;

pub use heuristics::evaluate;
pub use minimax::{choose_action, AiAgent, AiConfig, AiDecision, AiDifficulty};
