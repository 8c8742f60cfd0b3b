use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;

use crate::api::{KolekApi, WriteAck};
use crate::error::{Error, Result};
use crate::id::Id;

/// Garbage collector profile. The remote API owns the shape, so every field
/// is kept and written back untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollectorProfile(Map<String, Value>);

impl CollectorProfile {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    pub fn id(&self) -> Option<Id> {
        ["id", "user_id"]
            .iter()
            .filter_map(|key| self.0.get(*key))
            .find_map(|value| match value {
                Value::String(s) if !s.trim().is_empty() => Some(Id::new(s.as_str())),
                Value::Number(n) => Some(Id::new(n.to_string())),
                _ => None,
            })
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PasswordChange {
    pub id: Id,
    pub current_password: String,
    pub new_password: String,
}

impl PasswordChange {
    pub fn validate(&self) -> Result<()> {
        if self.id.is_empty() {
            return Err(Error::Invalid("Collector id is required".to_string()));
        }
        if self.current_password.is_empty() {
            return Err(Error::Invalid("Current password is required".to_string()));
        }
        if self.new_password.trim().is_empty() {
            return Err(Error::Invalid("New password is required".to_string()));
        }
        Ok(())
    }
}

pub async fn fetch_profile(api: &dyn KolekApi, id: &Id) -> Result<CollectorProfile> {
    api.garbage_collector(id).await
}

/// Writes `profile` back for collector `id`; the id in the body always
/// matches the one addressed.
pub async fn update_profile(
    api: &dyn KolekApi,
    id: &Id,
    mut profile: CollectorProfile,
) -> Result<WriteAck> {
    if id.is_empty() {
        return Err(Error::Invalid("Collector id is required".to_string()));
    }
    profile.set("id", serde_json::to_value(id)?);

    let ack = api.update_garbage_collector(&profile).await?;
    info!(collector_id = %id, "collector profile updated");
    Ok(ack)
}

pub async fn change_password(api: &dyn KolekApi, change: &PasswordChange) -> Result<WriteAck> {
    change.validate()?;
    let ack = api.change_password(change).await?;
    info!(collector_id = %change.id, "password changed");
    Ok(ack)
}
