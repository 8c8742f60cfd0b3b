use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::id::Id;

/// Role of the signed-in user, as the remote API names it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    BarangayHead,
    #[serde(alias = "truck_driver")]
    Driver,
    GarbageCollector,
    Resident,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::BarangayHead => "barangay_head",
            Role::Driver => "driver",
            Role::GarbageCollector => "garbage_collector",
            Role::Resident => "resident",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The signed-in user.
///
/// Read once at boot (CLI) or once per request from the cookie session (web)
/// and then passed explicitly to whatever needs it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: Id,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl Session {
    pub fn new(user_id: impl Into<Id>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            role,
            username: None,
        }
    }

    /// Loads the stored `user` object. Extra fields written by the login
    /// endpoint are ignored.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(path = %path.display(), "no session file");
            return Err(Error::NoSession);
        }

        let session: Session = serde_json::from_str(&fs::read_to_string(path)?)?;
        if session.user_id.is_empty() {
            return Err(Error::NoSession);
        }

        info!(user_id = %session.user_id, role = %session.role, "session loaded");
        Ok(session)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}
