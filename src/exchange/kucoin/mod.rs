//! KuCoin spot integration.
//!
//! - REST level-1 order book for the periodic collector; this is the
//!   reference venue whose timestamp stamps each snapshot
//! - `/market/ticker` websocket topic for the live reader, authenticated with
//!   a configured token or a public `bullet-public` token

mod client;
mod types;
mod websocket;

pub use client::KucoinClient;
pub use types::*;
pub use websocket::{KucoinWebSocket, SessionEndpoint};
