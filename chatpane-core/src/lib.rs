//! Chatpane core library.
//!
//! A chat widget without the page: HTML escaping and a small Markdown
//! renderer, collapsible presentation of long replies, incremental
//! consumption of streamed replies, the HTTP client for the chat endpoints,
//! and the controller that ties one submission to one exchange.

pub mod api;
pub mod config;
pub mod controller;
pub mod html;
pub mod markdown;
pub mod message;
pub mod present;
pub mod stream;
pub mod view;

pub use api::{ApiError, ChatApi, ChatRequest, Endpoints, HttpChatApi};
pub use config::{Config, ConfigError};
pub use controller::{ChatController, Phase, SubmitOutcome};
pub use message::{ConversationTurn, Mode, Role};
pub use present::{Presenter, RenderedMessage};
pub use view::{ChannelView, ChatView, Transcript, ViewEvent};
