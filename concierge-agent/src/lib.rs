//! Chat handling for the concierge gateway
//!
//! [`ContextBuilder`] shapes provider requests from the fixed hotel
//! instructions and a session's prior turns; [`ChatGateway`] owns the
//! per-session flow of appending, trimming and delegating to the provider.

pub mod context;
pub mod gateway;

pub use context::{ContextBuilder, HOTEL_NAME};
pub use gateway::{ChatGateway, ChatReply, HealthStatus, ResetAck, MISSING_KEY_MESSAGE};
