use chrono::{DateTime, Utc};

/// A commit as returned by the hosting service. Never modified after fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct CommitRecord {
    pub id: String,
    pub author_name: String,
    pub author_email: String,
    pub message: String,
    pub committed_date: DateTime<Utc>,
    pub additions: u64,
    pub deletions: u64,
    /// `None` when GitHub could not count the files.
    pub changed_files: Option<u64>,
}
