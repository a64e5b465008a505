//! Bounded conversation state

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::tools::ToolDescriptor;
use crate::types::{ChatMessage, MessageRole, ToolResult};

/// Default message-history capacity per conversation
pub const DEFAULT_MESSAGE_CAP: usize = 500;

/// Default tool-result capacity per conversation
pub const DEFAULT_RESULT_CAP: usize = 100;

/// One bounded conversation: identity, history rings, timestamps
///
/// The tool snapshot taken at creation is advisory only; execution always
/// re-resolves against the live tool registry.
pub struct Conversation {
    /// Conversation id
    pub id: String,
    /// Backend-side session handle
    pub session_id: String,
    /// Model the conversation is bound to
    pub model: String,
    /// Optional system prompt
    pub system_prompt: Option<String>,
    /// Tools available when the conversation was created
    pub tools_snapshot: Vec<ToolDescriptor>,
    /// When the conversation was created
    pub created_at: DateTime<Utc>,
    /// Last activity timestamp; drives idle reaping
    pub updated_at: DateTime<Utc>,
    messages: VecDeque<ChatMessage>,
    tool_results: VecDeque<ToolResult>,
    message_cap: usize,
    result_cap: usize,
}

impl Conversation {
    /// Create an empty conversation with the given capacities
    pub fn new(
        id: impl Into<String>,
        session_id: impl Into<String>,
        model: impl Into<String>,
        system_prompt: Option<String>,
        tools_snapshot: Vec<ToolDescriptor>,
        message_cap: usize,
        result_cap: usize,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            session_id: session_id.into(),
            model: model.into(),
            system_prompt,
            tools_snapshot,
            created_at: now,
            updated_at: now,
            messages: VecDeque::new(),
            tool_results: VecDeque::new(),
            message_cap,
            result_cap,
        }
    }

    /// Append a message, evicting the oldest non-system message when full
    ///
    /// System messages are never evicted, so a history consisting only of
    /// system messages can transiently exceed the capacity.
    pub fn push_message(&mut self, message: ChatMessage) {
        if self.messages.len() >= self.message_cap {
            let victim = self
                .messages
                .iter()
                .position(|m| m.role != MessageRole::System);
            if let Some(index) = victim {
                self.messages.remove(index);
            }
        }
        self.messages.push_back(message);
        self.touch();
    }

    /// Append a tool result, evicting the oldest when full
    pub fn push_tool_result(&mut self, result: ToolResult) {
        if self.tool_results.len() >= self.result_cap {
            self.tool_results.pop_front();
        }
        self.tool_results.push_back(result);
        self.touch();
    }

    /// Number of messages currently held
    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    /// Clone of the message history, oldest first
    pub fn history(&self) -> Vec<ChatMessage> {
        self.messages.iter().cloned().collect()
    }

    /// Clone of the stored tool results, oldest first
    pub fn tool_results(&self) -> Vec<ToolResult> {
        self.tool_results.iter().cloned().collect()
    }

    /// Mark activity now
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Reap-time trim: keep all system messages plus the trailing window
    ///
    /// The surviving history is the concatenation of every system-role
    /// message with the last `message_cap` messages. A system message that
    /// already sits inside the trailing window is kept twice; that is the
    /// documented behavior, not an accident to fix here. Returns whether
    /// anything was trimmed.
    pub fn trim_to_cap(&mut self) -> bool {
        if self.messages.len() <= self.message_cap {
            return false;
        }

        let system: Vec<ChatMessage> = self
            .messages
            .iter()
            .filter(|m| m.role == MessageRole::System)
            .cloned()
            .collect();
        let skip = self.messages.len() - self.message_cap;
        let recent: Vec<ChatMessage> = self.messages.iter().skip(skip).cloned().collect();

        self.messages = system.into_iter().chain(recent).collect();
        true
    }

    #[cfg(test)]
    pub(crate) fn replace_messages(&mut self, messages: Vec<ChatMessage>) {
        self.messages = messages.into();
    }
}

/// Shared handle to one conversation
pub type ConversationHandle = Arc<RwLock<Conversation>>;

/// Owner of every active conversation
///
/// Structural operations (insert/remove) serialize on the store-wide lock;
/// message and result appends only take the conversation's own lock. The
/// store assumes at most one concurrent turn per conversation id; callers
/// driving the same conversation from several tasks get no ordering
/// guarantee between their appends.
#[derive(Default)]
pub struct ConversationStore {
    conversations: RwLock<HashMap<String, ConversationHandle>>,
}

impl ConversationStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a conversation, returning its shared handle
    pub fn insert(&self, conversation: Conversation) -> ConversationHandle {
        let id = conversation.id.clone();
        let handle = Arc::new(RwLock::new(conversation));
        self.conversations.write().insert(id, handle.clone());
        handle
    }

    /// Look up a conversation by id
    pub fn get(&self, id: &str) -> Option<ConversationHandle> {
        self.conversations.read().get(id).cloned()
    }

    /// Remove a conversation by id
    pub fn remove(&self, id: &str) -> Option<ConversationHandle> {
        self.conversations.write().remove(id)
    }

    /// Ids of every active conversation
    pub fn ids(&self) -> Vec<String> {
        self.conversations.read().keys().cloned().collect()
    }

    /// Number of active conversations
    pub fn len(&self) -> usize {
        self.conversations.read().len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.conversations.read().is_empty()
    }
}
