//! PR Ledger
//!
//! Pull request rows and their reviewer sets. The bulk operations exist so
//! that mass deactivation issues one statement per kind of change instead of
//! one per affected pull request.

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};
use std::collections::HashMap;

use crate::database::{is_unique_violation, MAX_ROWS_PER_STATEMENT};
use crate::database::models::{
    PullRequest, PullRequestShort, ReviewAssignment, ReviewReplacement,
};
use crate::error::{ServiceError, ServiceResult};

pub struct PrLedger;

impl PrLedger {
    /// Insert a new pull request row. A primary key clash means another
    /// caller already claimed the id.
    pub async fn create(conn: &mut SqliteConnection, pr: &PullRequest) -> ServiceResult<()> {
        sqlx::query(
            r#"
            INSERT INTO pull_requests
                (pull_request_id, pull_request_name, author_id, status, created_at, merged_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&pr.pull_request_id)
        .bind(&pr.pull_request_name)
        .bind(&pr.author_id)
        .bind(pr.status)
        .bind(pr.created_at)
        .bind(pr.merged_at)
        .execute(conn)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ServiceError::PrExists(pr.pull_request_id.clone())
            } else {
                ServiceError::DatabaseError(e)
            }
        })?;

        Ok(())
    }

    pub async fn get(conn: &mut SqliteConnection, pr_id: &str) -> ServiceResult<PullRequest> {
        let mut pr = sqlx::query_as::<_, PullRequest>(
            r#"
            SELECT pull_request_id, pull_request_name, author_id, status, created_at, merged_at
            FROM pull_requests
            WHERE pull_request_id = ?
            "#,
        )
        .bind(pr_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| ServiceError::pr_not_found(pr_id))?;

        pr.assigned_reviewers = Self::get_reviewers(conn, pr_id).await?;
        Ok(pr)
    }

    /// Fetch a pull request and hold it exclusively until the transaction ends.
    ///
    /// SQLite has no `SELECT ... FOR UPDATE`, so the row is touched with a
    /// version bump instead. The write takes the database write lock; a second
    /// locker blocks in the busy handler and reads fresh state once it gets in.
    /// Must be the first statement of its transaction.
    pub async fn get_for_update(
        conn: &mut SqliteConnection,
        pr_id: &str,
    ) -> ServiceResult<PullRequest> {
        let mut pr = sqlx::query_as::<_, PullRequest>(
            r#"
            UPDATE pull_requests
            SET lock_version = lock_version + 1
            WHERE pull_request_id = ?
            RETURNING pull_request_id, pull_request_name, author_id, status, created_at, merged_at
            "#,
        )
        .bind(pr_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| ServiceError::pr_not_found(pr_id))?;

        pr.assigned_reviewers = Self::get_reviewers(conn, pr_id).await?;
        Ok(pr)
    }

    /// Move an OPEN pull request to MERGED. Returns false when the row was
    /// already merged (or missing), leaving the stored merge time untouched.
    pub async fn mark_merged(
        conn: &mut SqliteConnection,
        pr_id: &str,
        merged_at: DateTime<Utc>,
    ) -> ServiceResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE pull_requests
            SET status = 'MERGED', merged_at = ?
            WHERE pull_request_id = ? AND status = 'OPEN'
            "#,
        )
        .bind(merged_at)
        .bind(pr_id)
        .execute(conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn exists(conn: &mut SqliteConnection, pr_id: &str) -> ServiceResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM pull_requests WHERE pull_request_id = ?)",
        )
        .bind(pr_id)
        .fetch_one(conn)
        .await?;
        Ok(exists)
    }

    /// Pull requests the user reviews, newest first.
    pub async fn get_by_reviewer(
        conn: &mut SqliteConnection,
        user_id: &str,
    ) -> ServiceResult<Vec<PullRequestShort>> {
        let prs = sqlx::query_as::<_, PullRequestShort>(
            r#"
            SELECT pr.pull_request_id, pr.pull_request_name, pr.author_id, pr.status
            FROM pull_requests pr
            JOIN pr_reviewers prr ON pr.pull_request_id = prr.pull_request_id
            WHERE prr.user_id = ?
            ORDER BY pr.created_at DESC, pr.pull_request_id
            "#,
        )
        .bind(user_id)
        .fetch_all(conn)
        .await?;

        Ok(prs)
    }

    pub async fn add_reviewer(
        conn: &mut SqliteConnection,
        pr_id: &str,
        user_id: &str,
    ) -> ServiceResult<()> {
        sqlx::query("INSERT INTO pr_reviewers (pull_request_id, user_id) VALUES (?, ?)")
            .bind(pr_id)
            .bind(user_id)
            .execute(conn)
            .await?;
        Ok(())
    }

    pub async fn remove_reviewer(
        conn: &mut SqliteConnection,
        pr_id: &str,
        user_id: &str,
    ) -> ServiceResult<()> {
        sqlx::query("DELETE FROM pr_reviewers WHERE pull_request_id = ? AND user_id = ?")
            .bind(pr_id)
            .bind(user_id)
            .execute(conn)
            .await?;
        Ok(())
    }

    pub async fn get_reviewers(
        conn: &mut SqliteConnection,
        pr_id: &str,
    ) -> ServiceResult<Vec<String>> {
        let reviewers: Vec<String> = sqlx::query_scalar(
            "SELECT user_id FROM pr_reviewers WHERE pull_request_id = ? ORDER BY reviewer_slot",
        )
        .bind(pr_id)
        .fetch_all(conn)
        .await?;
        Ok(reviewers)
    }

    /// Assignments on OPEN pull requests held by any of `reviewer_ids`, limited
    /// to reviewers and authors who belong to `team_name`. Ordered by pull
    /// request id, then reviewer slot.
    pub async fn get_open_assignments_by_reviewers(
        conn: &mut SqliteConnection,
        team_name: &str,
        reviewer_ids: &[String],
    ) -> ServiceResult<Vec<ReviewAssignment>> {
        let mut rows: Vec<(ReviewAssignment, i64)> = Vec::new();

        for chunk in reviewer_ids.chunks(MAX_ROWS_PER_STATEMENT) {
            let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(
                r#"
                SELECT prr.pull_request_id, prr.user_id AS reviewer_id, pr.author_id,
                       prr.reviewer_slot
                FROM pr_reviewers prr
                JOIN pull_requests pr ON prr.pull_request_id = pr.pull_request_id
                JOIN users reviewer ON reviewer.user_id = prr.user_id
                JOIN users author ON author.user_id = pr.author_id
                WHERE pr.status = 'OPEN' AND reviewer.team_name = "#,
            );
            query.push_bind(team_name.to_string());
            query.push(" AND author.team_name = ");
            query.push_bind(team_name.to_string());
            query.push(" AND prr.user_id IN (");
            let mut separated = query.separated(", ");
            for id in chunk {
                separated.push_bind(id.clone());
            }
            separated.push_unseparated(")");

            let found: Vec<(String, String, String, i64)> =
                query.build_query_as().fetch_all(&mut *conn).await?;
            rows.extend(found.into_iter().map(|(pull_request_id, reviewer_id, author_id, slot)| {
                (
                    ReviewAssignment {
                        pull_request_id,
                        reviewer_id,
                        author_id,
                    },
                    slot,
                )
            }));
        }

        rows.sort_by(|(a, a_slot), (b, b_slot)| {
            a.pull_request_id
                .cmp(&b.pull_request_id)
                .then(a_slot.cmp(b_slot))
        });
        Ok(rows.into_iter().map(|(assignment, _)| assignment).collect())
    }

    /// Reviewer sets for a batch of pull requests, keyed by PR id. PRs with
    /// no reviewers are absent from the map.
    pub async fn get_reviewers_by_prs(
        conn: &mut SqliteConnection,
        pr_ids: &[String],
    ) -> ServiceResult<HashMap<String, Vec<String>>> {
        let mut result: HashMap<String, Vec<String>> = HashMap::new();

        // A PR's rows never straddle chunks, so slot order survives
        for chunk in pr_ids.chunks(MAX_ROWS_PER_STATEMENT) {
            let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(
                "SELECT pull_request_id, user_id FROM pr_reviewers WHERE pull_request_id IN (",
            );
            let mut separated = query.separated(", ");
            for id in chunk {
                separated.push_bind(id.clone());
            }
            separated.push_unseparated(") ORDER BY pull_request_id, reviewer_slot");

            let rows: Vec<(String, String)> =
                query.build_query_as().fetch_all(&mut *conn).await?;
            for (pr_id, user_id) in rows {
                result.entry(pr_id).or_default().push(user_id);
            }
        }
        Ok(result)
    }

    /// Swap old for new reviewer on every listed pull request, one statement
    /// per chunk of rows. The new reviewer inherits the old reviewer's slot.
    pub async fn replace_reviewers_bulk(
        conn: &mut SqliteConnection,
        replacements: &[ReviewReplacement],
    ) -> ServiceResult<u64> {
        let assigned_at = Utc::now();
        let mut replaced = 0;

        for chunk in replacements.chunks(MAX_ROWS_PER_STATEMENT) {
            let mut query: QueryBuilder<Sqlite> =
                QueryBuilder::new("UPDATE pr_reviewers SET user_id = v.column3, assigned_at = ");
            query.push_bind(assigned_at);
            query.push(" FROM (");
            query.push_values(chunk, |mut row, r| {
                row.push_bind(r.pull_request_id.clone())
                    .push_bind(r.old_user_id.clone())
                    .push_bind(r.new_user_id.clone());
            });
            query.push(
                ") AS v WHERE pr_reviewers.pull_request_id = v.column1 \
                 AND pr_reviewers.user_id = v.column2",
            );

            replaced += query.build().execute(&mut *conn).await?.rows_affected();
        }
        Ok(replaced)
    }

    /// Drop every listed (pull request, reviewer) pair, one statement per
    /// chunk of rows.
    pub async fn remove_reviewers_bulk(
        conn: &mut SqliteConnection,
        assignments: &[ReviewAssignment],
    ) -> ServiceResult<u64> {
        let mut removed = 0;

        for chunk in assignments.chunks(MAX_ROWS_PER_STATEMENT) {
            let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(
                "DELETE FROM pr_reviewers WHERE (pull_request_id, user_id) IN (",
            );
            query.push_values(chunk, |mut row, a| {
                row.push_bind(a.pull_request_id.clone())
                    .push_bind(a.reviewer_id.clone());
            });
            query.push(")");

            removed += query.build().execute(&mut *conn).await?.rows_affected();
        }
        Ok(removed)
    }
}
