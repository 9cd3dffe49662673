use std::sync::Arc;

use futures::FutureExt;
use tracing::debug;

use crate::authz::{self, Actor, AuthPolicy, Decision};
use crate::config::Config;
use crate::render::{self, Report};
use crate::report::AggregationEngine;
use crate::session::SessionManager;
use crate::surface::{RefreshBinding, ReportProducer};
use crate::upstream::{GameServerClient, IdentityResolver};

#[derive(Debug, Clone)]
pub struct CommandRequest {
    pub actor: Actor,
    /// Server context supplied by the host; `None` for direct-message
    /// equivalent channels.
    pub guild_id: Option<u64>,
    pub kind: RequestKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    ServerInfo,
    UserInfo { target_id: u64 },
    PlayerList,
}

impl RequestKind {
    pub fn operation_name(self) -> &'static str {
        match self {
            Self::ServerInfo => "info",
            Self::UserInfo { .. } => "user",
            Self::PlayerList => "players",
        }
    }
}

pub struct CommandReply {
    pub report: Report,
    pub refresh: Option<Arc<RefreshBinding>>,
}

impl CommandReply {
    fn terminal(report: Report) -> Self {
        Self {
            report,
            refresh: None,
        }
    }
}

/// Uniform command pipeline: registry lookup, authorization gate, handler.
/// Every exit path yields a rendered report; a denied request performs no
/// upstream work at all.
#[derive(Clone)]
pub struct Dispatcher {
    config: Config,
    session: SessionManager,
    policy: AuthPolicy,
}

impl Dispatcher {
    pub fn new(config: Config, session: SessionManager) -> Self {
        let policy = AuthPolicy::new(config.staff_role_id);
        Self {
            config,
            session,
            policy,
        }
    }

    pub async fn dispatch(&self, request: CommandRequest) -> CommandReply {
        let name = request.kind.operation_name();
        let Some(operation) = authz::operation(name) else {
            return CommandReply::terminal(render::error_report(
                "Unknown Operation",
                &format!("no operation named '{name}' is registered"),
                &self.config.server_name,
            ));
        };

        if let Decision::Deny(reason) =
            self.policy
                .authorize(&request.actor, request.guild_id.is_some(), operation)
        {
            debug!(
                actor = request.actor.id,
                operation = operation.name,
                reason = reason.as_str(),
                "operation denied"
            );
            return CommandReply::terminal(render::denial_report(reason, &self.config.server_name));
        }

        match request.kind {
            RequestKind::ServerInfo => self.server_info(&request.actor).await,
            RequestKind::UserInfo { target_id } => self.user_info(target_id).await,
            RequestKind::PlayerList => self.player_list().await,
        }
    }

    async fn server_info(&self, actor: &Actor) -> CommandReply {
        let engine = match self.engine() {
            Ok(engine) => Arc::new(engine),
            Err(report) => return CommandReply::terminal(report),
        };

        match engine.build_server_report().await {
            Ok(composite) => {
                let report = render::server_report(&composite);
                let producer = refresh_producer(Arc::clone(&engine));
                let binding = Arc::new(RefreshBinding::new(actor.id, report.clone(), producer));
                CommandReply {
                    report,
                    refresh: Some(binding),
                }
            }
            Err(err) => CommandReply::terminal(render::error_report(
                "Server Info Unavailable",
                &format!("failed to fetch server info: {err}"),
                &self.config.server_name,
            )),
        }
    }

    async fn user_info(&self, target_id: u64) -> CommandReply {
        let (_, identity) = match self.clients() {
            Ok(clients) => clients,
            Err(report) => return CommandReply::terminal(report),
        };

        match identity.fetch_profile(target_id).await {
            Ok(profile) => {
                CommandReply::terminal(render::profile_report(&profile, &self.config.server_name))
            }
            Err(err) => CommandReply::terminal(render::error_report(
                "User Lookup Failed",
                &format!("failed to fetch Roblox user {target_id}: {err}"),
                &self.config.server_name,
            )),
        }
    }

    async fn player_list(&self) -> CommandReply {
        let (game, _) = match self.clients() {
            Ok(clients) => clients,
            Err(report) => return CommandReply::terminal(report),
        };

        match game.fetch_players().await {
            Ok(players) => {
                CommandReply::terminal(render::roster_report(&players, &self.config.server_name))
            }
            Err(err) => CommandReply::terminal(render::error_report(
                "Player List Unavailable",
                &format!("failed to fetch player list: {err}"),
                &self.config.server_name,
            )),
        }
    }

    fn clients(&self) -> Result<(GameServerClient, IdentityResolver), Report> {
        let http = self.session.acquire().map_err(|err| {
            render::error_report(
                "Internal Error",
                &format!("failed to open HTTP session: {err:#}"),
                &self.config.server_name,
            )
        })?;

        let game = GameServerClient::new(
            http.clone(),
            self.config.erlc_api_base.clone(),
            self.config.server_key.clone(),
        );
        let identity = IdentityResolver::new(http, self.config.roblox_api_base.clone());
        Ok((game, identity))
    }

    fn engine(&self) -> Result<AggregationEngine, Report> {
        let (game, identity) = self.clients()?;
        Ok(AggregationEngine::new(
            game,
            identity,
            self.config.server_name.clone(),
            self.config.join_link_template.clone(),
        ))
    }
}

fn refresh_producer(engine: Arc<AggregationEngine>) -> ReportProducer {
    Arc::new(move || {
        let engine = Arc::clone(&engine);
        async move {
            match engine.build_server_report().await {
                Ok(composite) => render::server_report(&composite),
                Err(err) => render::error_report(
                    "Server Info Unavailable",
                    &format!("failed to fetch server info: {err}"),
                    engine.server_name(),
                ),
            }
        }
        .boxed()
    })
}
