use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::authz::Actor;
use crate::config::Config;
use crate::dispatch::{CommandRequest, Dispatcher, RequestKind};
use crate::session::SessionManager;
use crate::upstream::GameServerClient;

const OPERATOR_ACTOR_ID: u64 = 0;

#[derive(Debug, Parser)]
#[command(
    name = "precinct",
    version,
    about = "Staff reporting bridge for an ERLC game server"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Fetch the live server report.
    Info,
    /// Look up a Roblox user profile.
    User {
        /// Roblox user ID to look up.
        user_id: u64,
    },
    /// List players currently in the server (staff operation).
    Players,
    /// Validate configuration and upstream reachability.
    Check,
}

pub async fn run(cli: Cli, config: Config) -> Result<()> {
    let session = SessionManager::new();
    let outcome = execute(cli, &config, &session).await;
    session.release();
    outcome
}

async fn execute(cli: Cli, config: &Config, session: &SessionManager) -> Result<()> {
    let kind = match cli.command {
        Commands::Info => RequestKind::ServerInfo,
        Commands::User { user_id } => RequestKind::UserInfo { target_id: user_id },
        Commands::Players => RequestKind::PlayerList,
        Commands::Check => return check(config, session).await,
    };

    // The operator console acts as a staff actor inside the configured
    // guild, so the binary exercises the same gate as the host bot.
    let operator = Actor::new(OPERATOR_ACTOR_ID, vec![config.staff_role_id]);
    let dispatcher = Dispatcher::new(config.clone(), session.clone());
    let reply = dispatcher
        .dispatch(CommandRequest {
            actor: operator,
            guild_id: Some(config.guild_id),
            kind,
        })
        .await;

    println!("{}", reply.report);
    Ok(())
}

async fn check(config: &Config, session: &SessionManager) -> Result<()> {
    println!("server name: {}", config.server_name);
    println!("erlc api:    {}", config.erlc_api_base);
    println!("roblox api:  {}", config.roblox_api_base);
    println!("staff role:  {}", config.staff_role_id);
    println!("guild:       {}", config.guild_id);

    let http = session.acquire()?;
    let game = GameServerClient::new(
        http,
        config.erlc_api_base.clone(),
        config.server_key.clone(),
    );
    match game.fetch_server_meta().await {
        Ok(meta) => println!("game server reachable: join code {}", meta.join_key),
        Err(err) => println!("game server unreachable: {err}"),
    }
    Ok(())
}
