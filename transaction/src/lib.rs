//! Tessera Transaction
//!
//! Units of work against one connection.
//!
//! Responsibilities:
//! - Queue deferred `Logic` units and run them inside one transaction boundary
//! - Dispatch commit and rollback handlers, remap failures
//! - Serialize access to a single connection and reject nested transactions
//! - Hold listeners (global and per type) behind a read-mostly cache
//! - Hold virtual-attribute adapters with the same discipline

mod adapter;
mod error;
mod event;
mod listener;
mod template;
mod transaction;

pub use adapter::{VirtualAttributeAdapter, VirtualAttributeAdapterRegistry};
pub use error::{TransactionError, TransactionResult};
pub use event::{EventKind, TransactionEvent, TransactionEvents};
pub use listener::{Listener, ListenerEvent, ListenerId, ListenerKind, ListenerRegistry};
pub use template::TransactionTemplate;
pub use transaction::{Logic, Scope, Transaction, TransactionState};
