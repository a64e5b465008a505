//! Chat backend abstractions
//!
//! The orchestration engine talks to the language model through the
//! `ChatClient` trait: open a session, send a message with an optional tool
//! set, close the session. `GenaiChatClient` implements it over the genai
//! crate for real backends; `MockChatClient` provides scripted replies for
//! tests.

mod error;
mod genai_chat;
mod mock;
mod traits;

pub use error::{ChatError, ChatResult};
pub use genai_chat::GenaiChatClient;
pub use mock::{MockChatClient, MockReply, RecordedChat};
pub use traits::{ChatClient, ChatReply};
