use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

use precinct::config::Config;
use precinct::report::AggregationEngine;
use precinct::session::SessionManager;
use precinct::upstream::{GameServerClient, IdentityResolver};

pub const TEST_SERVER_KEY: &str = "test-server-key";
pub const STAFF_ROLE_ID: u64 = 4242;
pub const GUILD_ID: u64 = 9999;

pub const OWNER_ID: u64 = 100;
pub const CO_OWNER_OK_ID: u64 = 200;
pub const CO_OWNER_MISSING_ID: u64 = 300;
pub const LOOKUP_TARGET_ID: u64 = 7777;

pub struct UpstreamState {
    pub meta_hits: AtomicUsize,
    pub players_hits: AtomicUsize,
    pub queue_hits: AtomicUsize,
    pub user_hits: AtomicUsize,
    pub fail_meta: AtomicBool,
    pub fail_players: AtomicBool,
    pub fail_queue: AtomicBool,
    pub current_players: AtomicU32,
    pub users: Mutex<HashMap<u64, String>>,
    pub players: Mutex<Vec<Value>>,
    pub queue: Mutex<Vec<u64>>,
}

impl UpstreamState {
    fn fixture() -> Self {
        let users = HashMap::from([
            (OWNER_ID, "AlphaOwner".to_string()),
            (CO_OWNER_OK_ID, "BravoCoOwner".to_string()),
            (LOOKUP_TARGET_ID, "LookupTarget".to_string()),
        ]);

        let players = vec![
            json!({"Player": "Alice:1", "Permission": "Normal", "Team": "Civilian"}),
            json!({"Player": "Bob:2", "Permission": "Server Moderator", "Team": "Sheriff"}),
            json!({"Player": "Cara:3", "Permission": "Server Administrator", "Team": "Police"}),
            json!({"Player": "Dave:4", "Permission": "Normal"}),
        ];

        Self {
            meta_hits: AtomicUsize::new(0),
            players_hits: AtomicUsize::new(0),
            queue_hits: AtomicUsize::new(0),
            user_hits: AtomicUsize::new(0),
            fail_meta: AtomicBool::new(false),
            fail_players: AtomicBool::new(false),
            fail_queue: AtomicBool::new(false),
            current_players: AtomicU32::new(27),
            users: Mutex::new(users),
            players: Mutex::new(players),
            queue: Mutex::new(vec![11, 22]),
        }
    }

    pub fn total_hits(&self) -> usize {
        self.meta_hits.load(Ordering::SeqCst)
            + self.players_hits.load(Ordering::SeqCst)
            + self.queue_hits.load(Ordering::SeqCst)
            + self.user_hits.load(Ordering::SeqCst)
    }

    pub fn clear_users(&self) {
        self.users.lock().expect("users lock").clear();
    }
}

pub struct MockUpstreams {
    pub state: Arc<UpstreamState>,
    pub config: Config,
    shutdown: CancellationToken,
}

impl MockUpstreams {
    pub async fn start() -> Result<Self> {
        let state = Arc::new(UpstreamState::fixture());
        let shutdown = CancellationToken::new();

        let erlc_addr = spawn_router(erlc_router(Arc::clone(&state)), shutdown.clone()).await?;
        let roblox_addr = spawn_router(roblox_router(Arc::clone(&state)), shutdown.clone()).await?;

        let config = Config {
            server_key: TEST_SERVER_KEY.to_string(),
            staff_role_id: STAFF_ROLE_ID,
            guild_id: GUILD_ID,
            server_name: "Test Server".to_string(),
            erlc_api_base: format!("http://{erlc_addr}"),
            roblox_api_base: format!("http://{roblox_addr}"),
            join_link_template: "https://example.test/join/{code}".to_string(),
        };

        Ok(Self {
            state,
            config,
            shutdown,
        })
    }

    pub fn engine(&self) -> AggregationEngine {
        let session = SessionManager::new();
        let http = session.acquire().expect("http client");
        AggregationEngine::new(
            GameServerClient::new(
                http.clone(),
                self.config.erlc_api_base.clone(),
                self.config.server_key.clone(),
            ),
            IdentityResolver::new(http, self.config.roblox_api_base.clone()),
            self.config.server_name.clone(),
            self.config.join_link_template.clone(),
        )
    }
}

impl Drop for MockUpstreams {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn spawn_router(app: Router, shutdown: CancellationToken) -> Result<SocketAddr> {
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", 0)).await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.cancelled_owned().await })
            .await;
    });
    Ok(addr)
}

fn erlc_router(state: Arc<UpstreamState>) -> Router {
    Router::new()
        .route("/", get(server_meta))
        .route("/players", get(server_players))
        .route("/queue", get(server_queue))
        .with_state(state)
}

fn roblox_router(state: Arc<UpstreamState>) -> Router {
    Router::new()
        .route("/{user_id}", get(roblox_user))
        .with_state(state)
}

fn has_server_key(headers: &HeaderMap) -> bool {
    headers
        .get("server-key")
        .and_then(|value| value.to_str().ok())
        == Some(TEST_SERVER_KEY)
}

async fn server_meta(State(state): State<Arc<UpstreamState>>, headers: HeaderMap) -> Response {
    state.meta_hits.fetch_add(1, Ordering::SeqCst);
    if !has_server_key(&headers) {
        return StatusCode::FORBIDDEN.into_response();
    }
    if state.fail_meta.load(Ordering::SeqCst) {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    Json(json!({
        "Name": "Test Server",
        "JoinKey": "TEST1",
        "CurrentPlayers": state.current_players.load(Ordering::SeqCst),
        "MaxPlayers": 40,
        "OwnerId": OWNER_ID,
        "CoOwnerIds": [CO_OWNER_OK_ID, CO_OWNER_MISSING_ID],
    }))
    .into_response()
}

async fn server_players(State(state): State<Arc<UpstreamState>>, headers: HeaderMap) -> Response {
    state.players_hits.fetch_add(1, Ordering::SeqCst);
    if !has_server_key(&headers) {
        return StatusCode::FORBIDDEN.into_response();
    }
    if state.fail_players.load(Ordering::SeqCst) {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    let players = state.players.lock().expect("players lock").clone();
    Json(Value::Array(players)).into_response()
}

async fn server_queue(State(state): State<Arc<UpstreamState>>, headers: HeaderMap) -> Response {
    state.queue_hits.fetch_add(1, Ordering::SeqCst);
    if !has_server_key(&headers) {
        return StatusCode::FORBIDDEN.into_response();
    }
    if state.fail_queue.load(Ordering::SeqCst) {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    let queue = state.queue.lock().expect("queue lock").clone();
    Json(json!(queue)).into_response()
}

async fn roblox_user(
    State(state): State<Arc<UpstreamState>>,
    Path(user_id): Path<u64>,
) -> Response {
    state.user_hits.fetch_add(1, Ordering::SeqCst);

    let name = state.users.lock().expect("users lock").get(&user_id).cloned();
    match name {
        Some(name) => Json(json!({
            "id": user_id,
            "name": name,
            "displayName": format!("{name}Display"),
            "description": "fixture profile",
        }))
        .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
