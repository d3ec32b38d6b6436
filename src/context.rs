//! The console context: one session guard and one realtime channel over a
//! shared credential store.

use std::sync::Arc;

use tracing::info;

use estate_auth::{HttpSessionApi, SessionGuard};
use estate_core::config::AppConfig;
use estate_core::result::AppResult;
use estate_core::traits::{Collaborators, KeyValueStore, SessionApi};
use estate_realtime::{Connector, RealtimeChannel, WsConnector};
use estate_storage::{CredentialStore, open_store};

/// Owns every long-lived component of one console session.
pub struct ConsoleContext {
    config: AppConfig,
    store: CredentialStore,
    session: Arc<SessionGuard>,
    realtime: RealtimeChannel,
}

impl std::fmt::Debug for ConsoleContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleContext")
            .field("session", &self.session)
            .field("realtime", &self.realtime)
            .finish()
    }
}

impl ConsoleContext {
    /// Wires the components over explicit backends.
    pub fn new(
        config: AppConfig,
        backend: Arc<dyn KeyValueStore>,
        api: Arc<dyn SessionApi>,
        connector: Arc<dyn Connector>,
        collaborators: Collaborators,
    ) -> Self {
        let store = CredentialStore::new(backend);
        let session = Arc::new(SessionGuard::new(
            config.session.clone(),
            store.clone(),
            api,
            collaborators.clone(),
        ));
        let realtime = RealtimeChannel::new(
            config.realtime.clone(),
            store.clone(),
            connector,
            collaborators,
        );

        Self {
            config,
            store,
            session,
            realtime,
        }
    }

    /// Wires the production backends selected by `config`: the configured
    /// store, the HTTP session API and the WebSocket connector.
    pub fn from_config(config: AppConfig, collaborators: Collaborators) -> AppResult<Self> {
        config.validate()?;
        let backend = open_store(&config.storage)?;
        let api = Arc::new(HttpSessionApi::new(config.endpoints.clone())?);
        Ok(Self::new(
            config,
            backend,
            api,
            Arc::new(WsConnector),
            collaborators,
        ))
    }

    /// Verifies the session, starts auto refresh and connects the realtime
    /// channel with the stored tenant.
    ///
    /// Returns `false` (and leaves the channel idle) when access is denied;
    /// the guard has already redirected.
    pub fn boot(&self) -> bool {
        if !self.session.init() {
            return false;
        }

        let tenant_id = self.store.tenant().map(|t| t.id);
        info!(tenant_id = ?tenant_id, "Console session active; connecting realtime channel");
        self.realtime.init(tenant_id);
        true
    }

    /// Disconnects the channel and stops auto refresh. The stored session
    /// is left intact.
    pub fn shutdown(&self) {
        self.realtime.disconnect();
        self.session.stop_auto_refresh();
        info!("Console context shut down");
    }

    /// Loaded configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Shared credential store.
    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    /// Session guard.
    pub fn session(&self) -> &Arc<SessionGuard> {
        &self.session
    }

    /// Realtime channel.
    pub fn realtime(&self) -> &RealtimeChannel {
        &self.realtime
    }
}
