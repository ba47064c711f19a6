use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SyncError;

/// A user population synchronized independently of the other.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Context {
    /// Front-end (website) users.
    Fe,
    /// Back-end (administration) users.
    Be,
}

impl Context {
    pub fn as_str(&self) -> &'static str {
        match self {
            Context::Fe => "fe",
            Context::Be => "be",
        }
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Context {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fe" => Ok(Context::Fe),
            "be" => Ok(Context::Be),
            other => Err(SyncError::Config(format!("unknown context: {other}"))),
        }
    }
}

/// Which contexts a task run covers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ContextSelection {
    Fe,
    Be,
    #[default]
    Both,
}

impl ContextSelection {
    /// Expand into concrete contexts, front-end first.
    pub fn contexts(&self) -> &'static [Context] {
        match self {
            ContextSelection::Fe => &[Context::Fe],
            ContextSelection::Be => &[Context::Be],
            ContextSelection::Both => &[Context::Fe, Context::Be],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContextSelection::Fe => "fe",
            ContextSelection::Be => "be",
            ContextSelection::Both => "both",
        }
    }
}

impl fmt::Display for ContextSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContextSelection {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fe" => Ok(ContextSelection::Fe),
            "be" => Ok(ContextSelection::Be),
            "both" => Ok(ContextSelection::Both),
            other => Err(SyncError::Config(format!("unknown context: {other}"))),
        }
    }
}

/// Which configurations a task run covers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(try_from = "SelectorRepr", into = "SelectorRepr")]
pub enum ConfigurationSelector {
    #[default]
    All,
    Uid(u32),
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum SelectorRepr {
    Uid(u32),
    Text(String),
}

impl TryFrom<SelectorRepr> for ConfigurationSelector {
    type Error = SyncError;

    fn try_from(repr: SelectorRepr) -> Result<Self, Self::Error> {
        match repr {
            SelectorRepr::Uid(0) => Ok(ConfigurationSelector::All),
            SelectorRepr::Uid(uid) => Ok(ConfigurationSelector::Uid(uid)),
            SelectorRepr::Text(s) => s.parse(),
        }
    }
}

impl From<ConfigurationSelector> for SelectorRepr {
    fn from(selector: ConfigurationSelector) -> Self {
        match selector {
            ConfigurationSelector::All => SelectorRepr::Text("all".into()),
            ConfigurationSelector::Uid(uid) => SelectorRepr::Uid(uid),
        }
    }
}

impl fmt::Display for ConfigurationSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigurationSelector::All => f.write_str("all"),
            ConfigurationSelector::Uid(uid) => write!(f, "{uid}"),
        }
    }
}

impl FromStr for ConfigurationSelector {
    type Err = SyncError;

    /// `all` and `0` both select every configuration.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") {
            return Ok(ConfigurationSelector::All);
        }
        match s.parse::<u32>() {
            Ok(0) => Ok(ConfigurationSelector::All),
            Ok(uid) => Ok(ConfigurationSelector::Uid(uid)),
            Err(_) => Err(SyncError::Config(format!(
                "configuration must be `all` or a uid, got: {s}"
            ))),
        }
    }
}

/// What happens to local users no longer found in the directory.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MissingUsersPolicy {
    #[default]
    Nothing,
    Disable,
    Delete,
}

impl MissingUsersPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            MissingUsersPolicy::Nothing => "nothing",
            MissingUsersPolicy::Disable => "disable",
            MissingUsersPolicy::Delete => "delete",
        }
    }
}

impl fmt::Display for MissingUsersPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MissingUsersPolicy {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "nothing" => Ok(MissingUsersPolicy::Nothing),
            "disable" => Ok(MissingUsersPolicy::Disable),
            "delete" => Ok(MissingUsersPolicy::Delete),
            other => Err(SyncError::Config(format!(
                "unknown missing users handling: {other}"
            ))),
        }
    }
}

/// What happens to disabled or deleted local users found again in the directory.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RestoredUsersPolicy {
    #[default]
    Nothing,
    Enable,
    Undelete,
    Both,
}

impl RestoredUsersPolicy {
    pub fn enables(&self) -> bool {
        matches!(self, RestoredUsersPolicy::Enable | RestoredUsersPolicy::Both)
    }

    pub fn undeletes(&self) -> bool {
        matches!(
            self,
            RestoredUsersPolicy::Undelete | RestoredUsersPolicy::Both
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RestoredUsersPolicy::Nothing => "nothing",
            RestoredUsersPolicy::Enable => "enable",
            RestoredUsersPolicy::Undelete => "undelete",
            RestoredUsersPolicy::Both => "both",
        }
    }
}

impl fmt::Display for RestoredUsersPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RestoredUsersPolicy {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "nothing" => Ok(RestoredUsersPolicy::Nothing),
            "enable" => Ok(RestoredUsersPolicy::Enable),
            "undelete" => Ok(RestoredUsersPolicy::Undelete),
            "both" => Ok(RestoredUsersPolicy::Both),
            other => Err(SyncError::Config(format!(
                "unknown restored users handling: {other}"
            ))),
        }
    }
}

/// Where group membership is read from in the directory.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum GroupMembership {
    #[default]
    None,
    /// Groups list their users in a `member` attribute.
    FromMember,
    /// Users list their groups in a `memberOf` attribute.
    #[serde(rename = "from_memberof")]
    FromMemberOf,
}
