//! The session-management contract every dialogue backend adapter implements.
//!
//! The state machine never sees a vendor SDK: adapters translate between
//! their wire format and the message types here, so swapping speech vendors
//! means rewriting an adapter, not the session layer.

pub mod auth;
pub mod backend;
pub mod mock;
pub mod session;
pub mod setup;

pub use auth::{AuthToken, StaticTokenProvider, TokenProvider};
pub use backend::DialogueBackend;
pub use mock::{MockBackendConfig, MockDialogueBackend};
pub use session::{AdapterEndpoint, BackendEvent, DialogueSession, OutboundMessage};
pub use setup::SessionSetup;
