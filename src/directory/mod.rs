//! Team Directory
//!
//! Team existence, rosters and active-member sampling. Every query runs on a
//! caller-supplied connection so it can join the caller's transaction.

use sqlx::{QueryBuilder, Sqlite, SqliteConnection};
use tracing::debug;

use crate::database::{is_unique_violation, MAX_ROWS_PER_STATEMENT};
use crate::database::models::{Team, TeamMember, User};
use crate::error::{ServiceError, ServiceResult};

pub struct TeamDirectory;

impl TeamDirectory {
    pub async fn team_exists(conn: &mut SqliteConnection, team_name: &str) -> ServiceResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM teams WHERE team_name = ?)")
                .bind(team_name)
                .fetch_one(conn)
                .await?;
        Ok(exists)
    }

    /// Insert the team and upsert its members.
    ///
    /// An existing user id is overwritten (username, team and active flag),
    /// which is the only place a user row may be re-created.
    pub async fn create_team(
        conn: &mut SqliteConnection,
        team_name: &str,
        members: &[TeamMember],
    ) -> ServiceResult<()> {
        sqlx::query("INSERT INTO teams (team_name) VALUES (?)")
            .bind(team_name)
            .execute(&mut *conn)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    ServiceError::TeamExists(team_name.to_string())
                } else {
                    ServiceError::DatabaseError(e)
                }
            })?;

        for member in members {
            sqlx::query(
                r#"
                INSERT INTO users (user_id, username, team_name, is_active)
                VALUES (?, ?, ?, ?)
                ON CONFLICT (user_id) DO UPDATE SET
                    username = excluded.username,
                    team_name = excluded.team_name,
                    is_active = excluded.is_active,
                    updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                "#,
            )
            .bind(&member.user_id)
            .bind(&member.username)
            .bind(team_name)
            .bind(member.is_active)
            .execute(&mut *conn)
            .await?;
        }

        debug!("Stored team {} with {} members", team_name, members.len());
        Ok(())
    }

    /// Members ordered by username. A team without members is still returned
    /// as long as the team row exists.
    pub async fn get_team(conn: &mut SqliteConnection, team_name: &str) -> ServiceResult<Team> {
        let members: Vec<TeamMember> = sqlx::query_as(
            r#"
            SELECT user_id, username, is_active
            FROM users
            WHERE team_name = ?
            ORDER BY username, user_id
            "#,
        )
        .bind(team_name)
        .fetch_all(&mut *conn)
        .await?;

        if members.is_empty() && !Self::team_exists(conn, team_name).await? {
            return Err(ServiceError::team_not_found(team_name));
        }

        Ok(Team {
            team_name: team_name.to_string(),
            members,
        })
    }

    pub async fn get_user(conn: &mut SqliteConnection, user_id: &str) -> ServiceResult<User> {
        sqlx::query_as::<_, User>(
            "SELECT user_id, username, team_name, is_active FROM users WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| ServiceError::user_not_found(user_id))
    }

    /// Up to `limit` active members of the author's team, excluding the author,
    /// in random order.
    pub async fn get_active_teammates(
        conn: &mut SqliteConnection,
        author_id: &str,
        limit: i64,
    ) -> ServiceResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT u.user_id, u.username, u.team_name, u.is_active
            FROM users u
            WHERE u.team_name = (SELECT team_name FROM users WHERE user_id = ?)
              AND u.is_active = 1
              AND u.user_id != ?
            ORDER BY RANDOM()
            LIMIT ?
            "#,
        )
        .bind(author_id)
        .bind(author_id)
        .bind(limit)
        .fetch_all(conn)
        .await?;

        Ok(users)
    }

    /// One active team member outside `exclude_ids`, picked uniformly at random.
    pub async fn find_replacement_reviewer(
        conn: &mut SqliteConnection,
        team_name: &str,
        exclude_ids: &[String],
    ) -> ServiceResult<User> {
        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT user_id, username, team_name, is_active FROM users WHERE team_name = ",
        );
        query.push_bind(team_name.to_string());
        query.push(" AND is_active = 1");

        if !exclude_ids.is_empty() {
            query.push(" AND user_id NOT IN (");
            let mut separated = query.separated(", ");
            for id in exclude_ids {
                separated.push_bind(id.clone());
            }
            separated.push_unseparated(")");
        }
        query.push(" ORDER BY RANDOM() LIMIT 1");

        query
            .build_query_as::<User>()
            .fetch_optional(conn)
            .await?
            .ok_or_else(|| ServiceError::NoCandidate(team_name.to_string()))
    }

    pub async fn get_active_users_by_team(
        conn: &mut SqliteConnection,
        team_name: &str,
    ) -> ServiceResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT user_id, username, team_name, is_active
            FROM users
            WHERE team_name = ? AND is_active = 1
            ORDER BY username, user_id
            "#,
        )
        .bind(team_name)
        .fetch_all(conn)
        .await?;

        Ok(users)
    }

    pub async fn set_active(
        conn: &mut SqliteConnection,
        user_id: &str,
        is_active: bool,
    ) -> ServiceResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET is_active = ?, updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
            WHERE user_id = ?
            "#,
        )
        .bind(is_active)
        .bind(user_id)
        .execute(conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(ServiceError::user_not_found(user_id));
        }
        Ok(())
    }

    /// Deactivate the listed members of `team_name`; ids outside the team are
    /// left alone. Returns the number of rows touched.
    ///
    /// Always issues at least one write, so the call takes the write lock even
    /// when `user_ids` is empty. Long lists are split across statements.
    pub async fn deactivate_many(
        conn: &mut SqliteConnection,
        team_name: &str,
        user_ids: &[String],
    ) -> ServiceResult<u64> {
        let chunks: Vec<&[String]> = if user_ids.is_empty() {
            vec![user_ids]
        } else {
            user_ids.chunks(MAX_ROWS_PER_STATEMENT).collect()
        };

        let mut touched = 0;
        for chunk in chunks {
            let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(
                "UPDATE users SET is_active = 0, updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now') \
                 WHERE team_name = ",
            );
            query.push_bind(team_name.to_string());
            query.push(" AND user_id IN (");
            if chunk.is_empty() {
                query.push("NULL");
            } else {
                let mut separated = query.separated(", ");
                for id in chunk {
                    separated.push_bind(id.clone());
                }
            }
            query.push(")");

            touched += query.build().execute(&mut *conn).await?.rows_affected();
        }
        Ok(touched)
    }
}
