//! Shared fixtures: an in-memory stand-in for the remote KolekTrash API.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use kolektrash::api::{AssignmentReply, AssignmentsResponse, KolekApi, WriteAck};
use kolektrash::assignments::AssignmentRecord;
use kolektrash::collector::{CollectorProfile, PasswordChange};
use kolektrash::directory::BarangayRecord;
use kolektrash::{Error, Id, Result};
use kolektrash::session::Role;

/// How `get_my_assignments` answers.
#[derive(Debug, Clone)]
pub enum Fetch {
    Assignments(Vec<AssignmentRecord>),
    Unsuccessful,
    NetworkError,
}

pub struct MockApi {
    fetch: Mutex<Fetch>,
    fail_writes: AtomicBool,
    pub fetches: Mutex<Vec<(Id, Role)>>,
    pub replies: Mutex<Vec<AssignmentReply>>,
    pub profiles: Mutex<HashMap<Id, CollectorProfile>>,
    pub password_changes: Mutex<Vec<PasswordChange>>,
}

impl MockApi {
    pub fn new(fetch: Fetch) -> Self {
        Self {
            fetch: Mutex::new(fetch),
            fail_writes: AtomicBool::new(false),
            fetches: Mutex::new(Vec::new()),
            replies: Mutex::new(Vec::new()),
            profiles: Mutex::new(HashMap::new()),
            password_changes: Mutex::new(Vec::new()),
        }
    }

    pub fn with_assignments(ids: &[&str]) -> Self {
        Self::new(Fetch::Assignments(ids.iter().map(|id| assignment(id)).collect()))
    }

    pub fn set_fetch(&self, fetch: Fetch) {
        *self.fetch.lock().unwrap() = fetch;
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn add_profile(&self, profile: CollectorProfile) {
        let id = profile.id().expect("profile needs an id");
        self.profiles.lock().unwrap().insert(id, profile);
    }

    fn write_result(&self) -> Result<WriteAck> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(Error::Status {
                status: 500,
                message: "Database unavailable".to_string(),
            })
        } else {
            Ok(WriteAck {
                success: Some(true),
                message: Some("Saved".to_string()),
            })
        }
    }
}

#[async_trait]
impl KolekApi for MockApi {
    async fn my_assignments(&self, user_id: &Id, role: Role) -> Result<AssignmentsResponse> {
        self.fetches.lock().unwrap().push((user_id.clone(), role));
        let fetch = self.fetch.lock().unwrap().clone();
        match fetch {
            Fetch::Assignments(assignments) => Ok(AssignmentsResponse {
                success: true,
                assignments,
                message: None,
            }),
            Fetch::Unsuccessful => Ok(AssignmentsResponse {
                success: false,
                assignments: Vec::new(),
                message: Some("No assignments found".to_string()),
            }),
            Fetch::NetworkError => Err(Error::Transport(Box::new(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "connection refused",
            )))),
        }
    }

    async fn respond_assignment(&self, reply: &AssignmentReply) -> Result<WriteAck> {
        self.replies.lock().unwrap().push(reply.clone());
        self.write_result()
    }

    async fn garbage_collector(&self, id: &Id) -> Result<CollectorProfile> {
        self.profiles
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| Error::Status {
                status: 404,
                message: "Garbage collector not found".to_string(),
            })
    }

    async fn update_garbage_collector(&self, profile: &CollectorProfile) -> Result<WriteAck> {
        let result = self.write_result();
        if result.is_ok() {
            self.add_profile(profile.clone());
        }
        result
    }

    async fn change_password(&self, change: &PasswordChange) -> Result<WriteAck> {
        let result = self.write_result();
        if result.is_ok() {
            self.password_changes.lock().unwrap().push(change.clone());
        }
        result
    }
}

pub fn assignment(id: &str) -> AssignmentRecord {
    AssignmentRecord {
        assignment_id: Id::from(id),
        cluster_id: Id::from("1A"),
        date: "2025-03-07".to_string(),
        time: "07:30:00".to_string(),
    }
}

pub fn barangays() -> Vec<BarangayRecord> {
    vec![
        BarangayRecord::new("1", "Abella").in_cluster("1A"),
        BarangayRecord::new("2", "Bagumbayan Norte").in_cluster("1A"),
        BarangayRecord::new("3", "Bagumbayan Sur").in_cluster("2B"),
        BarangayRecord::new("4", "Balatas"),
        BarangayRecord::new("5", "Calauag").in_cluster("2B"),
    ]
}
