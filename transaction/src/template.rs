//! Single-connection transaction template.

use crate::{Transaction, TransactionError, TransactionResult};
use parking_lot::Mutex;
use std::cell::Cell;
use std::sync::Arc;
use tessera_sql::{Connection, Vendor};

thread_local! {
    static ACTIVE: Cell<bool> = const { Cell::new(false) };
}

/// Marks the current thread as inside a transaction until dropped.
struct NestingGuard;

impl NestingGuard {
    fn enter() -> TransactionResult<Self> {
        ACTIVE.with(|active| {
            if active.get() {
                Err(TransactionError::NestedTransaction)
            } else {
                active.set(true);
                Ok(NestingGuard)
            }
        })
    }
}

impl Drop for NestingGuard {
    fn drop(&mut self) {
        ACTIVE.with(|active| active.set(false));
    }
}

/// Runs transactions one at a time against a single connection.
///
/// A transaction opened while the same thread is already inside one is
/// rejected with `NestedTransaction`.
pub struct TransactionTemplate {
    connection: Mutex<Box<dyn Connection>>,
    vendor: Arc<dyn Vendor>,
}

impl TransactionTemplate {
    pub fn new(connection: Box<dyn Connection>, vendor: Arc<dyn Vendor>) -> Self {
        Self {
            connection: Mutex::new(connection),
            vendor,
        }
    }

    pub fn vendor(&self) -> &Arc<dyn Vendor> {
        &self.vendor
    }

    /// Commit `transaction` under the connection lock.
    pub fn run(&self, transaction: &mut Transaction<'_>) -> TransactionResult<()> {
        let _guard = NestingGuard::enter()?;
        let mut connection = self.connection.lock();
        transaction.commit(connection.as_mut(), self.vendor.as_ref())
    }

    /// Exclusive connection access outside a transaction boundary.
    pub fn with_connection<R>(
        &self,
        f: impl FnOnce(&mut dyn Connection, &dyn Vendor) -> R,
    ) -> TransactionResult<R> {
        let _guard = NestingGuard::enter()?;
        let mut connection = self.connection.lock();
        Ok(f(connection.as_mut(), self.vendor.as_ref()))
    }
}

impl std::fmt::Debug for TransactionTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionTemplate")
            .field("vendor", &self.vendor.name())
            .finish()
    }
}
