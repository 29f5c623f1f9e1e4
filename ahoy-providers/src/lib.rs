//! Model and relay clients for ahoy
//!
//! `gemini` talks to the upstream generative-language API on behalf of the
//! relay server; `relay` is the chat client's side of `POST /chat`.

pub mod base;
pub mod gemini;
pub mod relay;

pub use base::{ChatProvider, ProviderError, ProviderResult, Role, Turn};
pub use gemini::GeminiClient;
pub use relay::{
    HttpRelayClient, RelayClient, RelayError, RelayMessage, RelayReply, RelayRequest, RelayResult,
};
