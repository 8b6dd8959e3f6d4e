use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router,
    extract::{State, WebSocketUpgrade},
    middleware,
    response::IntoResponse,
    routing::{get, post, put},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use cinder_api::middleware::{require_auth, require_internal};
use cinder_api::state::{AppState, AppStateInner};
use cinder_api::{accounts, boost, matches, swipes};
use cinder_engine::{Engine, EngineConfig, TierRegistry};
use cinder_gateway::connection;
use cinder_gateway::dispatcher::Dispatcher;

#[derive(Clone)]
struct GatewayState {
    dispatcher: Dispatcher,
    jwt_secret: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cinder=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let jwt_secret =
        std::env::var("CINDER_JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".into());
    let internal_token =
        std::env::var("CINDER_INTERNAL_TOKEN").unwrap_or_else(|_| "dev-internal-change-me".into());
    let db_path = std::env::var("CINDER_DB_PATH").unwrap_or_else(|_| "cinder.db".into());
    let host = std::env::var("CINDER_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("CINDER_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;
    let boost_minutes: i64 = std::env::var("CINDER_BOOST_MINUTES")
        .unwrap_or_else(|_| "30".into())
        .parse()?;

    // Tier-to-policy mapping is external configuration
    let tiers = match std::env::var("CINDER_TIERS_PATH") {
        Ok(path) => {
            let json = std::fs::read_to_string(&path)?;
            let registry = TierRegistry::from_json(&json)?;
            info!("Loaded tier config from {}", path);
            registry
        }
        Err(_) => TierRegistry::builtin(),
    };

    // Init database and engine
    let db = Arc::new(cinder_db::Database::open(&PathBuf::from(&db_path))?);
    let engine = Engine::new(
        db,
        EngineConfig {
            tiers,
            boost_duration: chrono::Duration::minutes(boost_minutes),
            max_txn_attempts: 3,
        },
    );

    // Shared state
    let dispatcher = Dispatcher::new();
    let app_state: AppState = Arc::new(AppStateInner {
        engine,
        dispatcher: dispatcher.clone(),
        jwt_secret: jwt_secret.clone(),
        internal_token,
    });

    // Routes
    let engine_routes = Router::new()
        .route(
            "/swipes",
            post(swipes::record_swipe).delete(swipes::reset_swipes),
        )
        .route("/matches", get(matches::list_matches))
        .route("/matches/{key}/preview", post(matches::update_preview))
        .route("/boost", post(boost::activate_boost))
        .layer(middleware::from_fn_with_state(app_state.clone(), require_auth))
        .with_state(app_state.clone());

    let internal_routes = Router::new()
        .route(
            "/internal/accounts/{user_id}",
            put(accounts::upsert_account).get(accounts::get_account),
        )
        .layer(middleware::from_fn_with_state(
            app_state.clone(),
            require_internal,
        ))
        .with_state(app_state);

    let ws_route = Router::new()
        .route("/gateway", get(ws_upgrade))
        .with_state(GatewayState {
            dispatcher,
            jwt_secret,
        });

    let app = Router::new()
        .merge(engine_routes)
        .merge(internal_routes)
        .merge(ws_route)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Cinder server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn ws_upgrade(State(state): State<GatewayState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| {
        connection::handle_connection(socket, state.dispatcher, state.jwt_secret)
    })
}
