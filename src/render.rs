use std::fmt;

use crate::authz::DenyReason;
use crate::report::{CompositeReport, QueueStatus};
use crate::upstream::{IdentityLabel, PlayerRecord, UserProfile};

pub const ROBLOX_PROFILE_URL: &str = "https://www.roblox.com/users";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub label: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub name: String,
    pub lines: Vec<String>,
}

/// Render-ready output contract: a titled report with labeled sections, a
/// footer naming the server, and an optional deep link. The host platform
/// maps this onto its own message primitives; the CLI prints it as text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub kind: ReportKind,
    pub title: String,
    pub sections: Vec<Section>,
    pub footer: String,
    pub link: Option<Link>,
}

impl Report {
    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|section| section.name == name)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.title)?;
        for section in &self.sections {
            writeln!(f)?;
            writeln!(f, "{}", section.name)?;
            for line in &section.lines {
                writeln!(f, "  {line}")?;
            }
        }
        if let Some(link) = &self.link {
            writeln!(f)?;
            writeln!(f, "{}: {}", link.label, link.url)?;
        }
        write!(f, "-- {}", self.footer)
    }
}

pub fn profile_link(label: &IdentityLabel) -> String {
    format!(
        "[{}]({ROBLOX_PROFILE_URL}/{}/profile)",
        label.resolved_name, label.numeric_id
    )
}

pub fn server_report(composite: &CompositeReport) -> Report {
    let queue_line = match composite.queue {
        QueueStatus::Available(length) => format!("Queue: {length}"),
        QueueStatus::Unavailable => "Queue: unavailable".to_string(),
    };

    let basic = Section {
        name: "Basic Info".to_string(),
        lines: vec![
            format!("Join Code: [{}]({})", composite.join_code, composite.join_link),
            format!(
                "Players: {}/{}",
                composite.current_players, composite.max_players
            ),
            queue_line,
        ],
    };

    let staff = Section {
        name: "Staff Info".to_string(),
        lines: match &composite.staff {
            Some(counts) => vec![
                format!("Moderators: {}", counts.moderators),
                format!("Administrators: {}", counts.administrators),
                format!("Staff in Server: {}", counts.staff_present),
            ],
            None => vec!["Staff counts unavailable".to_string()],
        },
    };

    let co_owners = if composite.ownership.co_owners.is_empty() {
        "None".to_string()
    } else {
        composite
            .ownership
            .co_owners
            .iter()
            .map(profile_link)
            .collect::<Vec<_>>()
            .join(", ")
    };
    let ownership = Section {
        name: "Server Ownership".to_string(),
        lines: vec![
            format!("Owner: {}", profile_link(&composite.ownership.owner)),
            format!("Co-Owners: {co_owners}"),
        ],
    };

    Report {
        kind: ReportKind::Info,
        title: format!("{} - Server Info", composite.server_name),
        sections: vec![basic, staff, ownership],
        footer: composite.server_name.clone(),
        link: Some(Link {
            label: "Join Server".to_string(),
            url: composite.join_link.clone(),
        }),
    }
}

pub fn profile_report(profile: &UserProfile, footer: &str) -> Report {
    let username = profile.name.as_deref().unwrap_or("Unknown");
    let display_name = profile.display_name.as_deref().unwrap_or("Unknown");
    let user_id = profile
        .id
        .map(|id| id.to_string())
        .unwrap_or_else(|| "Unknown".to_string());
    let description = match profile.description.as_deref() {
        Some(text) if !text.trim().is_empty() => text,
        _ => "None",
    };

    Report {
        kind: ReportKind::Info,
        title: "Roblox User Info".to_string(),
        sections: vec![Section {
            name: "Profile".to_string(),
            lines: vec![
                format!("Username: {username}"),
                format!("Display Name: {display_name}"),
                format!("User ID: {user_id}"),
                format!("Description: {description}"),
            ],
        }],
        footer: footer.to_string(),
        link: None,
    }
}

pub fn roster_report(players: &[PlayerRecord], footer: &str) -> Report {
    let lines = if players.is_empty() {
        vec!["No players in the server".to_string()]
    } else {
        players.iter().map(roster_line).collect()
    };

    Report {
        kind: ReportKind::Info,
        title: format!("{footer} - Players"),
        sections: vec![Section {
            name: format!("Players ({})", players.len()),
            lines,
        }],
        footer: footer.to_string(),
        link: None,
    }
}

fn roster_line(player: &PlayerRecord) -> String {
    let (name, roblox_id) = player.split_ident();
    let mut line = match roblox_id {
        Some(id) => format!("[{name}]({ROBLOX_PROFILE_URL}/{id}/profile)"),
        None => name.to_string(),
    };
    if player.permission.is_staff() {
        line.push_str(&format!(" - {}", player.permission.as_str()));
    }
    if let Some(team) = player.team.as_deref() {
        line.push_str(&format!(" ({team})"));
    }
    line
}

pub fn denial_report(reason: DenyReason, footer: &str) -> Report {
    let title = match reason {
        DenyReason::NoServerContext => "Not Available Here",
        DenyReason::NotStaff => "Permission Denied",
    };

    Report {
        kind: ReportKind::Error,
        title: title.to_string(),
        sections: vec![Section {
            name: "Details".to_string(),
            lines: vec![reason.message().to_string()],
        }],
        footer: footer.to_string(),
        link: None,
    }
}

pub fn error_report(title: &str, detail: &str, footer: &str) -> Report {
    Report {
        kind: ReportKind::Error,
        title: title.to_string(),
        sections: vec![Section {
            name: "Details".to_string(),
            lines: vec![detail.to_string()],
        }],
        footer: footer.to_string(),
        link: None,
    }
}
