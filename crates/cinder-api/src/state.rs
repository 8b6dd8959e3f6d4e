use std::sync::Arc;

use cinder_engine::Engine;
use cinder_gateway::dispatcher::Dispatcher;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub engine: Engine,
    pub dispatcher: Dispatcher,
    /// Shared secret with the external authentication service that mints
    /// the bearer tokens. This engine only verifies.
    pub jwt_secret: String,
    /// Shared secret with the account-management collaborator, for the
    /// provisioning routes.
    pub internal_token: String,
}
