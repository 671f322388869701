//! Runtime configuration: reading and writing `openclaw.json`, merging
//! generated state into it, and the `generate` flow that produces it.

pub mod document;
pub mod generate;
pub mod merge;

pub use generate::{GenerateReport, GenerateRequest, agent_id, agent_name, generate};
pub use merge::{AgentEntry, GeneratedState, OWNED_AGENT_PREFIX, PolicyKeys, apply_policy, merge};
