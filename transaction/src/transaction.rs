//! Transaction and Logic units.

use crate::{TransactionError, TransactionEvents, TransactionResult};
use std::mem;
use tessera_sql::{Connection, DriverError, Row, SqlError, SqlErrorKind, Statement, Vendor};
use tracing::{debug, error, info, warn};

/// One deferred unit of work queued into a transaction.
pub type Logic<'c> = Box<dyn FnOnce(&mut Scope<'_>) -> TransactionResult<()> + 'c>;

type CommitHandler<'c> = Box<dyn FnOnce(&TransactionEvents) + 'c>;
type RollbackHandler<'c> = Box<dyn FnOnce(&TransactionError) + 'c>;
type ErrorMapper<'c> = Box<dyn FnOnce(TransactionError) -> TransactionError + 'c>;

/// Lifecycle of a transaction. Transactions are single use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Pending,
    Committed,
    RolledBack,
}

/// What a running `Logic` unit sees: the connection inside the transaction
/// boundary, the vendor and the transaction's event log.
pub struct Scope<'t> {
    connection: &'t mut dyn Connection,
    vendor: &'t dyn Vendor,
    events: &'t mut TransactionEvents,
}

impl<'t> Scope<'t> {
    pub fn new(
        connection: &'t mut dyn Connection,
        vendor: &'t dyn Vendor,
        events: &'t mut TransactionEvents,
    ) -> Self {
        Self {
            connection,
            vendor,
            events,
        }
    }

    pub fn vendor(&self) -> &dyn Vendor {
        self.vendor
    }

    /// Raw connection access, used by existence probes.
    pub fn connection(&mut self) -> &mut dyn Connection {
        &mut *self.connection
    }

    pub fn events(&mut self) -> &mut TransactionEvents {
        self.events
    }

    /// Execute a statement, returning the affected row count.
    pub fn execute(&mut self, statement: &Statement) -> TransactionResult<u64> {
        debug!(sql = %statement.sql, params = statement.params.len(), "execute");
        self.connection
            .execute(&statement.sql, &statement.params)
            .map_err(|e| self.classify(e, &statement.sql))
    }

    /// Execute an INSERT, returning the generated key.
    pub fn insert(&mut self, statement: &Statement) -> TransactionResult<i64> {
        debug!(sql = %statement.sql, params = statement.params.len(), "insert");
        self.connection
            .insert(&statement.sql, &statement.params)
            .map_err(|e| self.classify(e, &statement.sql))
    }

    pub fn query(&mut self, statement: &Statement) -> TransactionResult<Vec<Row>> {
        debug!(sql = %statement.sql, params = statement.params.len(), "query");
        self.connection
            .query(&statement.sql, &statement.params)
            .map_err(|e| self.classify(e, &statement.sql))
    }

    /// Execute DDL with no parameters.
    pub fn execute_ddl(&mut self, sql: &str) -> TransactionResult<u64> {
        self.connection
            .execute(sql, &[])
            .map_err(|e| self.classify(e, sql))
    }

    fn classify(&self, driver: DriverError, sql: &str) -> TransactionError {
        classify(self.vendor, driver, sql)
    }
}

/// Map a driver failure through the vendor and log it at the severity its
/// kind deserves.
pub(crate) fn classify(vendor: &dyn Vendor, driver: DriverError, sql: &str) -> TransactionError {
    let kind = vendor.classify_error(&driver);
    match kind {
        SqlErrorKind::ConstraintViolation | SqlErrorKind::Integrity => {
            info!(%sql, error = %driver, "constraint violation")
        }
        SqlErrorKind::Execution => error!(%sql, error = %driver, "statement failed"),
    }
    TransactionError::Sql(SqlError::from_driver(kind, driver, sql))
}

/// A queue of `Logic` units run atomically against one connection.
pub struct Transaction<'c> {
    logic: Vec<Logic<'c>>,
    on_commit: Vec<CommitHandler<'c>>,
    on_rollback: Vec<RollbackHandler<'c>>,
    error_mapper: Option<ErrorMapper<'c>>,
    events: TransactionEvents,
    state: TransactionState,
}

impl<'c> Transaction<'c> {
    pub fn new() -> Self {
        Self {
            logic: Vec::new(),
            on_commit: Vec::new(),
            on_rollback: Vec::new(),
            error_mapper: None,
            events: TransactionEvents::new(),
            state: TransactionState::Pending,
        }
    }

    /// Queue a logic unit.
    pub fn push<F>(&mut self, logic: F) -> &mut Self
    where
        F: FnOnce(&mut Scope<'_>) -> TransactionResult<()> + 'c,
    {
        self.logic.push(Box::new(logic));
        self
    }

    /// Run after a successful commit, in registration order.
    pub fn on_commit<F>(&mut self, handler: F) -> &mut Self
    where
        F: FnOnce(&TransactionEvents) + 'c,
    {
        self.on_commit.push(Box::new(handler));
        self
    }

    /// Run after a rollback, before the error is returned.
    pub fn on_rollback<F>(&mut self, handler: F) -> &mut Self
    where
        F: FnOnce(&TransactionError) + 'c,
    {
        self.on_rollback.push(Box::new(handler));
        self
    }

    /// Remap the error returned after a rollback.
    pub fn map_error<F>(&mut self, mapper: F) -> &mut Self
    where
        F: FnOnce(TransactionError) -> TransactionError + 'c,
    {
        self.error_mapper = Some(Box::new(mapper));
        self
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    pub fn events(&self) -> &TransactionEvents {
        &self.events
    }

    /// Returns true if the transaction rolled back.
    ///
    /// Asking before any commit attempt is an error.
    pub fn did_roll_back(&self) -> TransactionResult<bool> {
        match self.state {
            TransactionState::Pending => Err(TransactionError::NotCommitted),
            TransactionState::Committed => Ok(false),
            TransactionState::RolledBack => Ok(true),
        }
    }

    /// Begin, run every queued logic unit in order, then commit.
    ///
    /// On the first failure the connection is rolled back, rollback handlers
    /// run and the (optionally remapped) error is returned.
    pub fn commit(
        &mut self,
        connection: &mut dyn Connection,
        vendor: &dyn Vendor,
    ) -> TransactionResult<()> {
        if self.state != TransactionState::Pending {
            return Err(TransactionError::AlreadyCommitted);
        }

        if let Err(e) = connection.begin() {
            let err = classify(vendor, e, "BEGIN");
            return Err(self.fail(connection, err));
        }

        let logic = mem::take(&mut self.logic);
        let units = logic.len();
        let mut outcome = Ok(());
        {
            let mut scope = Scope::new(&mut *connection, vendor, &mut self.events);
            for unit in logic {
                if let Err(e) = unit(&mut scope) {
                    outcome = Err(e);
                    break;
                }
            }
        }
        if let Err(e) = outcome {
            return Err(self.fail(connection, e));
        }

        if let Err(e) = connection.commit() {
            let err = classify(vendor, e, "COMMIT");
            return Err(self.fail(connection, err));
        }

        self.state = TransactionState::Committed;
        debug!(units, events = self.events.len(), "transaction committed");
        for handler in mem::take(&mut self.on_commit) {
            handler(&self.events);
        }
        Ok(())
    }

    fn fail(&mut self, connection: &mut dyn Connection, err: TransactionError) -> TransactionError {
        self.state = TransactionState::RolledBack;
        if let Err(e) = connection.rollback() {
            error!(error = %e, "rollback failed");
        }
        warn!(error = %err, "transaction rolled back");
        for handler in mem::take(&mut self.on_rollback) {
            handler(&err);
        }
        match self.error_mapper.take() {
            Some(mapper) => mapper(err),
            None => err,
        }
    }
}

impl Default for Transaction<'_> {
    fn default() -> Self {
        Self::new()
    }
}
