//! # Access Control
//!
//! Whether an actor may view or export a grid. Checked before any filter is
//! parsed or any store call is made.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// What the request wants to do with the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessMode {
    View,
    Download,
}

impl AccessMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessMode::View => "view",
            AccessMode::Download => "download",
        }
    }
}

/// The authenticated caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: String,
    pub groups: Vec<i64>,
}

impl Actor {
    pub fn new(id: impl Into<String>, groups: Vec<i64>) -> Self {
        Self {
            id: id.into(),
            groups,
        }
    }

    /// Identifier as a filter value: a number when it is one
    pub fn id_value(&self) -> Value {
        match self.id.parse::<i64>() {
            Ok(n) => Value::from(n),
            Err(_) => Value::String(self.id.clone()),
        }
    }

    pub fn in_any_group(&self, groups: &[i64]) -> bool {
        self.groups.iter().any(|g| groups.contains(g))
    }
}

/// Authorization collaborator
pub trait Authorizer: Send + Sync {
    fn authorize(&self, actor: Option<&Actor>, mode: AccessMode) -> bool;
}

/// Who may use one access mode: everybody, nobody, or members of a group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AccessList {
    Open(bool),
    Groups(Vec<i64>),
}

impl AccessList {
    pub fn permits(&self, actor: &Actor) -> bool {
        match self {
            AccessList::Open(open) => *open,
            AccessList::Groups(groups) => actor.in_any_group(groups),
        }
    }
}

fn default_view_access() -> AccessList {
    AccessList::Open(true)
}

fn default_download_access() -> AccessList {
    AccessList::Open(false)
}

/// Per-mode access lists. Anonymous callers are always refused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessPolicy {
    #[serde(default = "default_view_access")]
    pub view: AccessList,
    #[serde(default = "default_download_access")]
    pub download: AccessList,
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self {
            view: default_view_access(),
            download: default_download_access(),
        }
    }
}

impl AccessPolicy {
    pub fn new(view: AccessList, download: AccessList) -> Self {
        Self { view, download }
    }
}

impl Authorizer for AccessPolicy {
    fn authorize(&self, actor: Option<&Actor>, mode: AccessMode) -> bool {
        let Some(actor) = actor else {
            return false;
        };
        match mode {
            AccessMode::View => self.view.permits(actor),
            AccessMode::Download => self.download.permits(actor),
        }
    }
}
