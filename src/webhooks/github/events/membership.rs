use std::fmt::{self, Display};

use serde::Deserialize;
use serde_json::Value;

use crate::webhooks::github::events::{parse, GitHubUser, PayloadError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RosterChange {
    Added,
    Removed,
}

impl RosterChange {
    /// Maps an `organization` event action, anything but a membership change gives `None`.
    pub fn from_action(action: &str) -> Option<Self> {
        match action {
            "member_added" => Some(Self::Added),
            "member_removed" => Some(Self::Removed),
            _ => None,
        }
    }
}

impl Display for RosterChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Added => write!(f, "added"),
            Self::Removed => write!(f, "removed"),
        }
    }
}

#[derive(Debug, Deserialize)]
struct MembershipPayload {
    membership: Membership,
    sender: GitHubUser,
}

#[derive(Debug, Deserialize)]
struct Membership {
    user: GitHubUser,
}

/// An organization membership change: `sponsor` added or removed `member`.
#[derive(Debug)]
pub struct MembershipEvent {
    pub change: RosterChange,
    pub sponsor_login: String,
    pub member_login: String,
}

impl MembershipEvent {
    /// Returns `Ok(None)` for organization events that aren't membership changes, without
    /// requiring the membership fields.
    pub fn from_body(body: &Value) -> Result<Option<Self>, PayloadError> {
        let change = match body
            .get("action")
            .and_then(Value::as_str)
            .and_then(RosterChange::from_action)
        {
            Some(change) => change,
            None => return Ok(None),
        };

        let payload: MembershipPayload = parse("organization", body)?;

        Ok(Some(Self {
            change,
            sponsor_login: payload.sender.login,
            member_login: payload.membership.user.login,
        }))
    }
}
