//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod event;
mod grant;
mod network;

pub use event::{AccessEvent, AccessEventKind};
pub use grant::{AccessGrant, GrantStatus, TerminalStatus};
pub use network::{PortAllowList, SourceAddress};
