use std::sync::Arc;

use crate::auth::registration::RegistrationFlow;
use crate::auth::token::TokenCodec;
use crate::config::Config;
use crate::enrollment::EnrollmentRecorder;
use crate::gateway::AiGateway;
use crate::store::Store;
use crate::users::AccountSyncer;

/// Shared application state injected into all route handlers via Axum extractors.
/// Built once in `main`; every component shares the same store handle.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn Store>,
    pub tokens: Arc<TokenCodec>,
    pub registration: Arc<RegistrationFlow>,
    pub gateway: Arc<AiGateway>,
    pub enrollment: Arc<EnrollmentRecorder>,
    pub accounts: Arc<AccountSyncer>,
}
