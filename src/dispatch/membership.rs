use std::collections::BTreeSet;

use tracing::{error, info, warn};

use crate::{
    clients::{ClientError, FileUpdate},
    dispatch::{Dispatcher, HandlerOutcome},
    webhooks::github::events::{MembershipEvent, RosterChange},
};

/// Member logins, one per line in the roster file.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct Roster(BTreeSet<String>);

impl Roster {
    pub(crate) fn parse(content: &str) -> Self {
        Roster(
            content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_owned)
                .collect(),
        )
    }

    /// Returns whether the roster changed.
    pub(crate) fn apply(&mut self, change: RosterChange, login: &str) -> bool {
        match change {
            RosterChange::Added => self.0.insert(login.to_owned()),
            RosterChange::Removed => self.0.remove(login),
        }
    }

    /// Sorted logins joined with newlines.
    pub(crate) fn render(&self) -> String {
        self.0.iter().map(String::as_str).collect::<Vec<_>>().join("\n")
    }
}

/// Mirrors an organization membership change into the roster file.
///
/// This is the only handler that reports client failures itself instead of failing the request.
pub(super) async fn sync(dispatcher: &Dispatcher, event: MembershipEvent) -> HandlerOutcome {
    match update_roster(dispatcher, &event).await {
        Ok(true) => HandlerOutcome::Success(format!("user successfully {}", event.change)),
        Ok(false) => HandlerOutcome::Success(format!("user already {}", event.change)),
        Err(ClientError::Conflict(detail)) => {
            warn!(
                "roster changed while {} was being {}: {}",
                event.member_login, event.change, detail
            );
            HandlerOutcome::Conflict(format!("roster was modified concurrently: {}", detail))
        }
        Err(e) => {
            error!("couldn't update roster for {}: {}", event.member_login, e);
            HandlerOutcome::Failure(e.to_string())
        }
    }
}

async fn update_roster(
    dispatcher: &Dispatcher,
    event: &MembershipEvent,
) -> Result<bool, ClientError> {
    let source_control = &dispatcher.clients.source_control;
    let roster_config = &dispatcher.config.github.roster;

    let file = source_control
        .file_contents(
            &roster_config.repository,
            &roster_config.path,
            &roster_config.branch,
        )
        .await?;

    let mut roster = Roster::parse(&file.content);
    if !roster.apply(event.change, &event.member_login) {
        info!(
            "{} is already {} in the roster, nothing to write",
            event.member_login, event.change
        );
        return Ok(false);
    }

    let update = FileUpdate {
        message: format!(
            "{} {} by {}",
            event.member_login, event.change, event.sponsor_login
        ),
        content: roster.render(),
        sha: file.sha,
        branch: roster_config.branch.clone(),
    };
    source_control
        .update_file(&roster_config.repository, &roster_config.path, &update)
        .await?;

    info!(
        "roster updated: {} {} by {}",
        event.member_login, event.change, event.sponsor_login
    );
    Ok(true)
}
