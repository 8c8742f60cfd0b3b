use std::collections::HashSet;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::record::{AssignmentRecord, ResponseStatus};
use crate::api::{AssignmentReply, AssignmentsResponse, KolekApi};
use crate::error::{Error, Result};
use crate::id::Id;
use crate::session::Session;

/// What happens to a record whose response could not be delivered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalPolicy {
    /// Removed locally whatever the server says. No retry, no rollback.
    #[default]
    FireAndForget,
    /// Put back at its former position and report the error.
    RestoreOnFailure,
}

impl FromStr for RemovalPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "fire_and_forget" => Ok(RemovalPolicy::FireAndForget),
            "restore_on_failure" => Ok(RemovalPolicy::RestoreOnFailure),
            other => Err(Error::Config(format!("unknown removal policy: {other}"))),
        }
    }
}

/// Result of responding to one assignment.
#[derive(Debug)]
pub enum Outcome {
    /// Delivered; the record is gone from the board.
    Acknowledged,
    /// Delivery failed, the record is gone anyway (fire and forget).
    Unconfirmed(Error),
    /// The id was not on the board.
    NotPending,
}

impl Outcome {
    pub fn removed(&self) -> bool {
        !matches!(self, Outcome::NotPending)
    }
}

/// Handle for a fetch in flight. Stale tickets are ignored on completion.
#[derive(Debug, Clone)]
pub struct LoadTicket {
    epoch: u64,
    seq: u64,
    subject: Id,
}

impl LoadTicket {
    pub fn subject(&self) -> &Id {
        &self.subject
    }
}

/// A record taken off the board while its response is in flight.
#[derive(Debug, Clone)]
pub struct Taken {
    record: AssignmentRecord,
    index: usize,
    epoch: u64,
}

impl Taken {
    pub fn record(&self) -> &AssignmentRecord {
        &self.record
    }
}

/// Working list of pending assignments for one subject user.
///
/// Responding is split into [`take`](Self::take) and
/// [`settle`](Self::settle) so that callers sharing a board behind a lock
/// never hold it across the network call.
#[derive(Debug, Default)]
pub struct AssignmentBoard {
    subject: Option<Id>,
    policy: RemovalPolicy,
    pending: Vec<AssignmentRecord>,
    // ids in flight or delivered during the current epoch; a later fetch must
    // not revive them
    removed: HashSet<Id>,
    epoch: u64,
    load_seq: u64,
}

impl AssignmentBoard {
    pub fn new(policy: RemovalPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn policy(&self) -> RemovalPolicy {
        self.policy
    }

    pub fn subject(&self) -> Option<&Id> {
        self.subject.as_ref()
    }

    pub fn pending(&self) -> &[AssignmentRecord] {
        &self.pending
    }

    /// Switches the subject user. Returns `true` when it changed, in which
    /// case the board is emptied. It does not fetch: the caller must follow
    /// up with [`load`](Self::load) (or `begin_load`/`finish_load`).
    pub fn set_subject(&mut self, user_id: Option<Id>) -> bool {
        if self.subject == user_id {
            return false;
        }
        debug!(from = ?self.subject, to = ?user_id, "assignment board subject changed");
        self.subject = user_id;
        self.pending.clear();
        self.removed.clear();
        self.epoch += 1;
        true
    }

    pub fn begin_load(&mut self, session: &Session) -> LoadTicket {
        self.set_subject(Some(session.user_id.clone()));
        self.load_seq += 1;
        LoadTicket {
            epoch: self.epoch,
            seq: self.load_seq,
            subject: session.user_id.clone(),
        }
    }

    /// Applies a fetch result. Failures of any kind leave the board empty.
    /// Returns `false` if the ticket went stale in the meantime.
    pub fn finish_load(&mut self, ticket: LoadTicket, result: Result<AssignmentsResponse>) -> bool {
        if ticket.epoch != self.epoch || ticket.seq != self.load_seq {
            debug!(subject = %ticket.subject, "discarding stale assignment fetch");
            return false;
        }

        self.pending = match result {
            Ok(response) if response.success => response
                .assignments
                .into_iter()
                .filter(|a| !self.removed.contains(&a.assignment_id))
                .collect(),
            Ok(response) => {
                warn!(
                    user_id = %ticket.subject,
                    message = response.message.as_deref().unwrap_or(""),
                    "assignment fetch reported failure"
                );
                Vec::new()
            }
            Err(e) => {
                warn!(user_id = %ticket.subject, "assignment fetch failed: {e}");
                Vec::new()
            }
        };
        info!(user_id = %ticket.subject, count = self.pending.len(), "assignments loaded");
        true
    }

    /// Fetches the pending assignments of the session user. Never fails.
    pub async fn load(&mut self, api: &dyn KolekApi, session: &Session) {
        let ticket = self.begin_load(session);
        let result = api.my_assignments(&session.user_id, session.role).await;
        self.finish_load(ticket, result);
    }

    /// Removes the record locally ahead of sending the response.
    pub fn take(&mut self, assignment_id: &Id) -> Option<Taken> {
        let index = self
            .pending
            .iter()
            .position(|a| &a.assignment_id == assignment_id)?;
        let record = self.pending.remove(index);
        self.removed.insert(record.assignment_id.clone());
        Some(Taken {
            record,
            index,
            epoch: self.epoch,
        })
    }

    /// Puts a taken record back where it was, unless the subject changed.
    pub fn restore(&mut self, taken: Taken) {
        if taken.epoch != self.epoch {
            return;
        }
        self.removed.remove(&taken.record.assignment_id);
        if self
            .pending
            .iter()
            .any(|a| a.assignment_id == taken.record.assignment_id)
        {
            return;
        }
        let index = taken.index.min(self.pending.len());
        self.pending.insert(index, taken.record);
    }

    /// Applies the board's policy to the result of sending a response.
    pub fn settle(&mut self, taken: Taken, sent: Result<()>) -> Result<Outcome> {
        match (sent, self.policy) {
            (Ok(()), _) => Ok(Outcome::Acknowledged),
            (Err(e), RemovalPolicy::FireAndForget) => {
                warn!(assignment_id = %taken.record.assignment_id, "response not confirmed: {e}");
                // Gone for now, but the next fetch shows it if the server still has it
                self.removed.remove(&taken.record.assignment_id);
                Ok(Outcome::Unconfirmed(e))
            }
            (Err(e), RemovalPolicy::RestoreOnFailure) => {
                warn!(assignment_id = %taken.record.assignment_id, "response failed, restoring: {e}");
                self.restore(taken);
                Err(e)
            }
        }
    }

    pub async fn respond(
        &mut self,
        api: &dyn KolekApi,
        session: &Session,
        assignment_id: &Id,
        status: ResponseStatus,
    ) -> Result<Outcome> {
        let Some(taken) = self.take(assignment_id) else {
            return Ok(Outcome::NotPending);
        };
        let sent = send_response(api, session, taken.record(), status).await;
        self.settle(taken, sent)
    }
}

/// Sends `status` for `record` on behalf of the session user.
pub async fn send_response(
    api: &dyn KolekApi,
    session: &Session,
    record: &AssignmentRecord,
    status: ResponseStatus,
) -> Result<()> {
    let reply = AssignmentReply {
        assignment_id: record.assignment_id.clone(),
        user_id: session.user_id.clone(),
        response_status: status,
        role: session.role,
    };
    api.respond_assignment(&reply).await?;
    info!(
        assignment_id = %record.assignment_id,
        user_id = %session.user_id,
        %status,
        "assignment response sent"
    );
    Ok(())
}
