use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::warn;

const MAX_PARALLEL_RESOLVE: usize = 8;
const SERVER_KEY_HEADER: &str = "server-key";

#[derive(Debug)]
pub enum UpstreamError {
    Status { endpoint: String, status: u16 },
    Transport {
        endpoint: String,
        source: reqwest::Error,
    },
}

impl UpstreamError {
    pub fn endpoint(&self) -> &str {
        match self {
            Self::Status { endpoint, .. } | Self::Transport { endpoint, .. } => endpoint,
        }
    }
}

impl fmt::Display for UpstreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status { endpoint, status } => {
                write!(f, "upstream {endpoint} unavailable: status {status}")
            }
            Self::Transport { endpoint, source } => {
                write!(f, "upstream {endpoint} unavailable: {source}")
            }
        }
    }
}

impl std::error::Error for UpstreamError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Status { .. } => None,
            Self::Transport { source, .. } => Some(source),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServerStatus {
    #[serde(default)]
    pub name: Option<String>,
    pub join_key: String,
    pub current_players: u32,
    pub max_players: u32,
    pub owner_id: u64,
    #[serde(default)]
    pub co_owner_ids: Vec<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum PermissionTier {
    Normal,
    #[serde(rename = "Server Moderator")]
    Moderator,
    #[serde(rename = "Server Administrator")]
    Administrator,
    #[serde(rename = "Server Owner")]
    Owner,
    #[serde(rename = "Server Co-Owner")]
    CoOwner,
    #[serde(other)]
    Other,
}

impl PermissionTier {
    pub fn is_staff(self) -> bool {
        self != Self::Normal
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::Moderator => "Server Moderator",
            Self::Administrator => "Server Administrator",
            Self::Owner => "Server Owner",
            Self::CoOwner => "Server Co-Owner",
            Self::Other => "Staff",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PlayerRecord {
    /// Provider encoding: `"<name>:<roblox id>"`.
    pub player: String,
    pub permission: PermissionTier,
    #[serde(default)]
    pub team: Option<String>,
    #[serde(default)]
    pub callsign: Option<String>,
}

impl PlayerRecord {
    pub fn split_ident(&self) -> (&str, Option<u64>) {
        match self.player.split_once(':') {
            Some((name, id)) => (name, id.trim().parse().ok()),
            None => (self.player.as_str(), None),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityLabel {
    pub numeric_id: u64,
    pub resolved_name: String,
    pub resolved: bool,
}

impl IdentityLabel {
    pub fn resolved(numeric_id: u64, resolved_name: String) -> Self {
        Self {
            numeric_id,
            resolved_name,
            resolved: true,
        }
    }

    pub fn fallback(numeric_id: u64) -> Self {
        Self {
            numeric_id,
            resolved_name: format!("ID:{numeric_id}"),
            resolved: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Read-only client for the game-server management API. Every request
/// carries the static server key header; any non-2xx status, transport
/// failure, or undecodable payload surfaces as `UpstreamError`.
#[derive(Clone)]
pub struct GameServerClient {
    http: Client,
    base: String,
    server_key: String,
}

impl GameServerClient {
    pub fn new(http: Client, base: impl Into<String>, server_key: impl Into<String>) -> Self {
        Self {
            http,
            base: base.into(),
            server_key: server_key.into(),
        }
    }

    pub async fn fetch_server_meta(&self) -> Result<ServerStatus, UpstreamError> {
        get_json(
            &self.http,
            &self.base,
            "server meta",
            Some(self.server_key.as_str()),
        )
        .await
    }

    pub async fn fetch_players(&self) -> Result<Vec<PlayerRecord>, UpstreamError> {
        let url = format!("{}/players", self.base);
        get_json(
            &self.http,
            &url,
            "player list",
            Some(self.server_key.as_str()),
        )
        .await
    }

    pub async fn fetch_queue(&self) -> Result<Vec<u64>, UpstreamError> {
        let url = format!("{}/queue", self.base);
        get_json(
            &self.http,
            &url,
            "join queue",
            Some(self.server_key.as_str()),
        )
        .await
    }
}

/// Maps opaque numeric IDs to display names through the identity provider.
/// Resolution is one unauthenticated GET per distinct ID; a failed lookup
/// degrades to a synthetic `ID:<id>` label for that ID only.
#[derive(Clone)]
pub struct IdentityResolver {
    http: Client,
    base: String,
}

impl IdentityResolver {
    pub fn new(http: Client, base: impl Into<String>) -> Self {
        Self {
            http,
            base: base.into(),
        }
    }

    pub async fn fetch_profile(&self, user_id: u64) -> Result<UserProfile, UpstreamError> {
        let url = format!("{}/{user_id}", self.base);
        get_json(&self.http, &url, "identity profile", None).await
    }

    /// Total over the input set: returns exactly one label per ID even when
    /// every individual lookup fails.
    pub async fn resolve(&self, ids: &BTreeSet<u64>) -> HashMap<u64, IdentityLabel> {
        let limiter = Arc::new(Semaphore::new(MAX_PARALLEL_RESOLVE));
        let mut tasks = JoinSet::new();

        for &id in ids {
            let resolver = self.clone();
            let limiter = Arc::clone(&limiter);
            tasks.spawn(async move {
                let permit = limiter.acquire_owned().await;
                if permit.is_err() {
                    return (id, IdentityLabel::fallback(id));
                }

                let label = match resolver.fetch_profile(id).await {
                    Ok(profile) => match profile.name {
                        Some(name) if !name.trim().is_empty() => IdentityLabel::resolved(id, name),
                        _ => IdentityLabel::fallback(id),
                    },
                    Err(err) => {
                        warn!(
                            user_id = id,
                            error = %err,
                            "identity resolution failed; using fallback label"
                        );
                        IdentityLabel::fallback(id)
                    }
                };
                (id, label)
            });
        }

        let mut labels = HashMap::with_capacity(ids.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((id, label)) => {
                    labels.insert(id, label);
                }
                Err(err) => {
                    warn!(error = %err, "identity resolution task failed to join");
                }
            }
        }

        for &id in ids {
            labels.entry(id).or_insert_with(|| IdentityLabel::fallback(id));
        }
        labels
    }
}

async fn get_json<T: DeserializeOwned>(
    http: &Client,
    url: &str,
    endpoint: &str,
    server_key: Option<&str>,
) -> Result<T, UpstreamError> {
    let mut request = http.get(url);
    if let Some(key) = server_key {
        request = request.header(SERVER_KEY_HEADER, key);
    }

    let response = request.send().await.map_err(|source| UpstreamError::Transport {
        endpoint: endpoint.to_string(),
        source,
    })?;

    let status = response.status();
    if !status.is_success() {
        return Err(UpstreamError::Status {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
        });
    }

    response.json::<T>().await.map_err(|source| UpstreamError::Transport {
        endpoint: endpoint.to_string(),
        source,
    })
}
