use anyhow::{Context, Result, bail};
use url::Url;

pub const DEFAULT_ERLC_API_BASE: &str = "https://api.policeroleplay.community/v1/server";
pub const DEFAULT_ROBLOX_API_BASE: &str = "https://users.roblox.com/v1/users";
const DEFAULT_JOIN_LINK_TEMPLATE: &str = "https://policeroleplay.community/join/{code}";
const DEFAULT_SERVER_NAME: &str = "ER:LC Server";

#[derive(Debug, Clone)]
pub struct Config {
    pub server_key: String,
    pub staff_role_id: u64,
    pub guild_id: u64,
    pub server_name: String,
    pub erlc_api_base: String,
    pub roblox_api_base: String,
    pub join_link_template: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let server_key = required_var("PRECINCT_SERVER_KEY")?;
        let staff_role_id = parse_id(
            "PRECINCT_STAFF_ROLE_ID",
            &required_var("PRECINCT_STAFF_ROLE_ID")?,
        )?;
        let guild_id = parse_id("PRECINCT_GUILD_ID", &required_var("PRECINCT_GUILD_ID")?)?;
        let server_name = optional_var("PRECINCT_SERVER_NAME")?
            .unwrap_or_else(|| DEFAULT_SERVER_NAME.to_string());
        let erlc_api_base = validate_base_url(
            "PRECINCT_ERLC_API_BASE",
            optional_var("PRECINCT_ERLC_API_BASE")?
                .unwrap_or_else(|| DEFAULT_ERLC_API_BASE.to_string()),
        )?;
        let roblox_api_base = validate_base_url(
            "PRECINCT_ROBLOX_API_BASE",
            optional_var("PRECINCT_ROBLOX_API_BASE")?
                .unwrap_or_else(|| DEFAULT_ROBLOX_API_BASE.to_string()),
        )?;
        let join_link_template = optional_var("PRECINCT_JOIN_LINK_TEMPLATE")?
            .unwrap_or_else(|| DEFAULT_JOIN_LINK_TEMPLATE.to_string());

        Ok(Self {
            server_key,
            staff_role_id,
            guild_id,
            server_name,
            erlc_api_base,
            roblox_api_base,
            join_link_template,
        })
    }
}

fn required_var(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        Ok(_) => bail!("{name} must not be empty"),
        Err(std::env::VarError::NotPresent) => bail!("{name} is required"),
        Err(std::env::VarError::NotUnicode(_)) => bail!("{name} must be valid UTF-8"),
    }
}

fn optional_var(name: &str) -> Result<Option<String>> {
    match std::env::var(name) {
        Ok(value) if value.trim().is_empty() => Ok(None),
        Ok(value) => Ok(Some(value)),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(std::env::VarError::NotUnicode(_)) => bail!("{name} must be valid UTF-8"),
    }
}

fn parse_id(name: &str, raw: &str) -> Result<u64> {
    raw.trim()
        .parse::<u64>()
        .with_context(|| format!("{name} must be a numeric identifier, got '{raw}'"))
}

fn validate_base_url(name: &str, raw: String) -> Result<String> {
    let trimmed = raw.trim();
    let url =
        Url::parse(trimmed).with_context(|| format!("{name} must be a valid URL, got '{raw}'"))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        bail!("{name} must use http or https, got '{}'", url.scheme());
    }
    Ok(trimmed.trim_end_matches('/').to_string())
}
