#![allow(dead_code)]

use reviewer_service::database::models::TeamMember;
use reviewer_service::database::{Database, DatabaseOptions};
use reviewer_service::engine::AssignmentEngine;
use std::time::Duration;
use tempfile::TempDir;

/// Setup an in-memory SQLite database for testing
pub async fn setup_test_db() -> Database {
    Database::new_in_memory()
        .await
        .expect("Failed to create test database")
}

/// File-backed database for tests that need several concurrent connections.
/// Keep the returned `TempDir` alive for the duration of the test.
pub async fn setup_file_db() -> (Database, TempDir) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join("reviewer.db");
    let options = DatabaseOptions {
        url: format!("sqlite://{}", path.display()),
        max_connections: 8,
        busy_timeout: Duration::from_secs(30),
    };
    let database = Database::connect(&options)
        .await
        .expect("Failed to open file database");
    database
        .run_migrations()
        .await
        .expect("Failed to run migrations");
    (database, dir)
}

pub async fn setup_engine() -> AssignmentEngine {
    AssignmentEngine::new(setup_test_db().await)
}

pub fn member(user_id: &str, is_active: bool) -> TeamMember {
    TeamMember {
        user_id: user_id.to_string(),
        username: format!("name-{}", user_id),
        is_active,
    }
}

/// Create `team_name` with every id in `active` active and every id in
/// `inactive` inactive.
pub async fn seed_team(
    engine: &AssignmentEngine,
    team_name: &str,
    active: &[&str],
    inactive: &[&str],
) {
    let members: Vec<TeamMember> = active
        .iter()
        .map(|id| member(id, true))
        .chain(inactive.iter().map(|id| member(id, false)))
        .collect();
    engine
        .create_team(team_name, &members)
        .await
        .expect("Failed to seed team");
}
