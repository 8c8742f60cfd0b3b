//! Remote KolekTrash API.
//!
//! [`KolekApi`] is the seam between the flows in this crate and the PHP
//! endpoints; [`HttpApi`] is the production implementation.

mod client;

pub use client::{interpret, interpret_ack, HttpApi};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::assignments::{AssignmentRecord, ResponseStatus};
use crate::collector::{CollectorProfile, PasswordChange};
use crate::error::Result;
use crate::id::Id;
use crate::session::Role;

/// Body of `get_my_assignments.php`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssignmentsResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub assignments: Vec<AssignmentRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Body of `respond_assignment.php`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentReply {
    pub assignment_id: Id,
    pub user_id: Id,
    pub response_status: ResponseStatus,
    pub role: Role,
}

/// Answer of the write endpoints. Only the status code decides success; the
/// body is informational and may be empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WriteAck {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[async_trait]
pub trait KolekApi: Send + Sync {
    /// `GET get_my_assignments.php?user_id=&role=`
    async fn my_assignments(&self, user_id: &Id, role: Role) -> Result<AssignmentsResponse>;

    /// `POST respond_assignment.php`
    async fn respond_assignment(&self, reply: &AssignmentReply) -> Result<WriteAck>;

    /// `GET get_garbage_collector.php?id=`
    async fn garbage_collector(&self, id: &Id) -> Result<CollectorProfile>;

    /// `POST update_garbage_collector.php`
    async fn update_garbage_collector(&self, profile: &CollectorProfile) -> Result<WriteAck>;

    /// `POST change_password.php`
    async fn change_password(&self, change: &PasswordChange) -> Result<WriteAck>;
}
