//! Assignment Engine
//!
//! Each public operation is one workflow: it opens at most one transaction,
//! reads and locks through the directory and ledger, writes the new reviewer
//! state and commits. Any error drops the transaction, which rolls it back.

mod pull_requests;
mod selection;
mod teams;
mod users;

pub use pull_requests::Reassignment;
pub use selection::{plan_replacements, ReplacementPlan};

use crate::database::Database;
use crate::error::ServiceResult;
use crate::statistics::Statistics;

/// Reviewers sampled for a freshly created pull request.
pub const REVIEWERS_PER_PR: i64 = 2;

#[derive(Clone)]
pub struct AssignmentEngine {
    database: Database,
}

impl AssignmentEngine {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub async fn statistics(&self) -> ServiceResult<Statistics> {
        let mut conn = self.database.acquire().await?;
        Statistics::collect(&mut conn).await
    }
}
