//! Conversation orchestration
//!
//! `AgentEngine` drives one message turn at a time: it sends the user
//! message to the chat backend with the live tool set, executes any
//! requested tool calls sequentially through the connection registry, and
//! feeds the results back for one follow-up reply. `ConversationStore`
//! owns the bounded per-conversation state, and `ConversationReaper`
//! periodically enforces the age and size bounds.
//!
//! A given conversation id is expected to be driven by at most one turn at
//! a time; the store does not serialize appends across concurrent turns.

mod conversation;
mod engine;
mod reaper;

pub use conversation::{
    Conversation, ConversationHandle, ConversationStore, DEFAULT_MESSAGE_CAP, DEFAULT_RESULT_CAP,
};
pub use engine::{
    AgentConfig, AgentEngine, AgentError, AgentResult, AgentStatus, ConversationSummary,
    ToolInventory, TurnOutcome,
};
pub use reaper::{ConversationReaper, DEFAULT_REAP_INTERVAL};
