//! Message codecs for the requests, responses and events the client core
//! sends and understands.
//!
//! Each codec encodes as well as decodes, so the in-process mock member used
//! by the tests can speak the same protocol.

pub mod client_add_cluster_view_listener;
pub mod client_authentication;
pub mod client_ping;
pub mod custom;
pub mod error;
pub mod map_entry_listener;

pub use custom::{Address, MemberInfo, MemberVersion};
