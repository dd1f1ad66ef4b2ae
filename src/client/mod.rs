//! Client side of the API: a typed HTTP client, the session state store and
//! the selectors screens render from.
//!
//! Data flows one way. [`state::AppStore`] owns an [`api::ApiClient`] and an
//! [`state::AppState`]; every mutation is a [`commands::Command`] dispatched
//! through the store, which snapshots the state, applies the optimistic
//! change, sends the request and either commits the server's answer or
//! restores the snapshot and records a [`state::Notice`].
//!
//! The server returns foreign keys as raw ids. They are resolved only at
//! render time through [`directory::UserDirectory`], so the state never holds
//! half-populated copies of users.

pub mod api;
pub mod commands;
pub mod directory;
pub mod error;
pub mod state;
pub mod transport;
pub mod views;

pub use api::ApiClient;
pub use error::ClientError;
pub use state::{AppState, AppStore, Notice};
pub use transport::{HttpTransport, LocalTransport, Transport};
