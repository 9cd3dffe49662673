use std::collections::BTreeSet;

use tracing::warn;

use crate::upstream::{
    GameServerClient, IdentityLabel, IdentityResolver, PermissionTier, PlayerRecord, ServerStatus,
    UpstreamError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueStatus {
    Available(usize),
    Unavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaffCounts {
    pub moderators: usize,
    pub administrators: usize,
    pub staff_present: usize,
    pub total_players: usize,
}

/// Partitions one player list into its staff subsets. The counts are simple
/// filters over the same list; staff_present counts any non-Normal tier and
/// is a superset of the moderator and administrator counts.
pub fn partition_staff(players: &[PlayerRecord]) -> StaffCounts {
    StaffCounts {
        moderators: players
            .iter()
            .filter(|player| player.permission == PermissionTier::Moderator)
            .count(),
        administrators: players
            .iter()
            .filter(|player| player.permission == PermissionTier::Administrator)
            .count(),
        staff_present: players
            .iter()
            .filter(|player| player.permission.is_staff())
            .count(),
        total_players: players.len(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ownership {
    pub owner: IdentityLabel,
    pub co_owners: Vec<IdentityLabel>,
}

/// Read-only aggregate of one fetch cycle: every field derives from the
/// same invocation, never from a previous report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositeReport {
    pub server_name: String,
    pub join_code: String,
    pub join_link: String,
    pub current_players: u32,
    pub max_players: u32,
    pub queue: QueueStatus,
    pub staff: Option<StaffCounts>,
    pub ownership: Ownership,
}

/// Composes one `CompositeReport` from the two upstream clients. The three
/// snapshot fetches run concurrently; server meta is essential and fails
/// the whole report, while the queue and player list degrade individually.
#[derive(Clone)]
pub struct AggregationEngine {
    game: GameServerClient,
    identity: IdentityResolver,
    server_name: String,
    join_link_template: String,
}

impl AggregationEngine {
    pub fn new(
        game: GameServerClient,
        identity: IdentityResolver,
        server_name: impl Into<String>,
        join_link_template: impl Into<String>,
    ) -> Self {
        Self {
            game,
            identity,
            server_name: server_name.into(),
            join_link_template: join_link_template.into(),
        }
    }

    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    pub async fn build_server_report(&self) -> Result<CompositeReport, UpstreamError> {
        let (meta, players, queue) = tokio::join!(
            self.game.fetch_server_meta(),
            self.game.fetch_players(),
            self.game.fetch_queue(),
        );
        let meta = meta?;

        let staff = match players {
            Ok(players) => Some(partition_staff(&players)),
            Err(err) => {
                warn!(error = %err, "player list fetch failed; staff counts unavailable");
                None
            }
        };
        let queue = match queue {
            Ok(queue) => QueueStatus::Available(queue.len()),
            Err(err) => {
                warn!(error = %err, "queue fetch failed; queue length unavailable");
                QueueStatus::Unavailable
            }
        };

        let ownership = self.resolve_ownership(&meta).await;

        Ok(CompositeReport {
            server_name: self.server_name.clone(),
            join_link: self.join_link_template.replace("{code}", &meta.join_key),
            join_code: meta.join_key,
            current_players: meta.current_players,
            max_players: meta.max_players,
            queue,
            staff,
            ownership,
        })
    }

    async fn resolve_ownership(&self, meta: &ServerStatus) -> Ownership {
        let mut ids = BTreeSet::new();
        ids.insert(meta.owner_id);
        ids.extend(meta.co_owner_ids.iter().copied());

        let labels = self.identity.resolve(&ids).await;

        let owner = labels
            .get(&meta.owner_id)
            .cloned()
            .unwrap_or_else(|| IdentityLabel::fallback(meta.owner_id));
        let co_owners = meta
            .co_owner_ids
            .iter()
            .map(|&id| {
                labels
                    .get(&id)
                    .cloned()
                    .unwrap_or_else(|| IdentityLabel::fallback(id))
            })
            .collect();

        Ownership { owner, co_owners }
    }
}
