//! The engine: one schema, one connection and the registries around them.

use crate::{EngineConfig, Session, SessionError, SessionResult};
use std::sync::Arc;
use tessera_deployer::{Deployer, Deployment, TableMapping};
use tessera_schema::Schema;
use tessera_sql::{Connection, CryptoProvider, Vendor};
use tessera_transaction::{
    ListenerEvent, ListenerKind, ListenerRegistry, TransactionTemplate,
    VirtualAttributeAdapterRegistry,
};
use tracing::info;

pub struct Engine {
    schema: Arc<Schema>,
    template: TransactionTemplate,
    config: EngineConfig,
    deployment: Option<Deployment>,
    listeners: ListenerRegistry,
    adapters: VirtualAttributeAdapterRegistry,
    crypto: Option<Arc<dyn CryptoProvider>>,
}

impl Engine {
    pub fn new(schema: Schema, connection: Box<dyn Connection>, vendor: Arc<dyn Vendor>) -> Self {
        Self {
            schema: Arc::new(schema),
            template: TransactionTemplate::new(connection, vendor),
            config: EngineConfig::default(),
            deployment: None,
            listeners: ListenerRegistry::new(),
            adapters: VirtualAttributeAdapterRegistry::new(),
            crypto: None,
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_crypto(mut self, crypto: Arc<dyn CryptoProvider>) -> Self {
        self.crypto = Some(crypto);
        self
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn template(&self) -> &TransactionTemplate {
        &self.template
    }

    pub fn listeners(&self) -> &ListenerRegistry {
        &self.listeners
    }

    pub fn adapters(&self) -> &VirtualAttributeAdapterRegistry {
        &self.adapters
    }

    pub fn deployment(&self) -> Option<&Deployment> {
        self.deployment.as_ref()
    }

    pub(crate) fn crypto(&self) -> Option<&dyn CryptoProvider> {
        self.crypto.as_deref()
    }

    pub(crate) fn mapping(&self) -> SessionResult<&TableMapping> {
        self.deployment
            .as_ref()
            .map(|d| &d.mapping)
            .ok_or(SessionError::NotDeployed)
    }

    /// Deploy (or validate) the schema, then notify deployment listeners.
    ///
    /// Deploying again replaces the previous mapping; objects that already
    /// exist are not recreated.
    pub fn deploy(&mut self) -> SessionResult<&Deployment> {
        let deployment = Deployer::new(&self.schema, self.config.deploy).deploy(&self.template)?;
        info!(
            tables = deployment.mapping.registry.table_count(),
            created = deployment.created,
            "engine deployed"
        );
        self.deployment = Some(deployment);
        self.listeners
            .fire(&ListenerEvent::global(ListenerKind::Deployment))?;
        self.deployment.as_ref().ok_or(SessionError::NotDeployed)
    }

    /// Open a unit of work.
    pub fn session(&self) -> SessionResult<Session<'_>> {
        Session::new(self)
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("holders", &self.schema.holder_count())
            .field("config", &self.config)
            .field("deployed", &self.deployment.is_some())
            .finish()
    }
}
