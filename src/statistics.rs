//! Aggregate review counters.

use serde::Serialize;
use sqlx::SqliteConnection;

use crate::database::models::AssignmentStat;
use crate::error::ServiceResult;

#[derive(Debug, Clone, Default, Serialize)]
pub struct Statistics {
    pub assignments_by_user: Vec<AssignmentStat>,
    pub assignments_by_pr: Vec<AssignmentStat>,
    pub total_prs: i64,
    pub total_assignments: i64,
    pub active_users: i64,
    pub teams: i64,
}

impl Statistics {
    pub async fn collect(conn: &mut SqliteConnection) -> ServiceResult<Self> {
        let assignments_by_user: Vec<AssignmentStat> = sqlx::query_as(
            r#"
            SELECT user_id AS id, COUNT(*) AS count
            FROM pr_reviewers
            GROUP BY user_id
            ORDER BY count DESC, id
            "#,
        )
        .fetch_all(&mut *conn)
        .await?;

        let assignments_by_pr: Vec<AssignmentStat> = sqlx::query_as(
            r#"
            SELECT pull_request_id AS id, COUNT(*) AS count
            FROM pr_reviewers
            GROUP BY pull_request_id
            ORDER BY count DESC, id
            "#,
        )
        .fetch_all(&mut *conn)
        .await?;

        let total_prs: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM pull_requests")
            .fetch_one(&mut *conn)
            .await?;
        let active_users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE is_active = 1")
            .fetch_one(&mut *conn)
            .await?;
        let teams: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM teams")
            .fetch_one(&mut *conn)
            .await?;

        let total_assignments = assignments_by_user.iter().map(|s| s.count).sum();

        Ok(Statistics {
            assignments_by_user,
            assignments_by_pr,
            total_prs,
            total_assignments,
            active_users,
            teams,
        })
    }
}
