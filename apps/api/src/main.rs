mod auth;
mod catalog;
mod config;
mod db;
mod enrollment;
mod errors;
mod extractors;
mod gateway;
mod llm_client;
mod models;
mod routes;
mod state;
mod store;
mod users;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use rand::RngCore;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::auth::registration::{RegistrationFlow, TracingOtpSender};
use crate::auth::token::TokenCodec;
use crate::config::Config;
use crate::db::build_store;
use crate::enrollment::EnrollmentRecorder;
use crate::gateway::conversation::ConversationRegistry;
use crate::gateway::AiGateway;
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::state::AppState;
use crate::users::{AccountSyncer, SimulatedStatsSource};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting EduFlux API v{}", env!("CARGO_PKG_VERSION"));

    let store = build_store(&config).await?;

    let tokens = Arc::new(TokenCodec::new(&token_secret(&config)));

    let llm = LlmClient::new(
        config.gemini_api_key.clone(),
        &config.gemini_api_url,
        config.model_timeout,
    )?;
    if config.gemini_api_key.is_none() {
        warn!("GEMINI_API_KEY not set; AI features will report unavailable");
    }
    let gateway = AiGateway::new(
        Arc::new(llm),
        ConversationRegistry::new(config.chat_capacity, config.chat_idle_ttl),
        config.model_timeout,
    );
    info!(
        "AI gateway initialized (timeout {:?}, {} conversations max)",
        config.model_timeout, config.chat_capacity
    );

    let registration = RegistrationFlow::new(store.clone(), tokens.clone(), Arc::new(TracingOtpSender));
    let enrollment = EnrollmentRecorder::new(store.clone());
    let accounts = AccountSyncer::new(store.clone(), Arc::new(SimulatedStatsSource));

    let state = AppState {
        config: config.clone(),
        store,
        tokens,
        registration: Arc::new(registration),
        gateway: Arc::new(gateway),
        enrollment: Arc::new(enrollment),
        accounts: Arc::new(accounts),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// The configured signing key, or a random one that dies with the process.
fn token_secret(config: &Config) -> Vec<u8> {
    match &config.token_secret {
        Some(secret) => secret.as_bytes().to_vec(),
        None => {
            warn!("TOKEN_SECRET not set; sessions will not survive a restart");
            let mut secret = vec![0u8; 32];
            rand::rngs::OsRng.fill_bytes(&mut secret);
            secret
        }
    }
}
