use std::collections::HashSet;
use tracing::{debug, info};

use super::{plan_replacements, AssignmentEngine};
use crate::database::models::{Team, TeamMember};
use crate::directory::TeamDirectory;
use crate::error::{ServiceError, ServiceResult};
use crate::ledger::PrLedger;

impl AssignmentEngine {
    /// Create a team together with its member users.
    pub async fn create_team(
        &self,
        team_name: &str,
        members: &[TeamMember],
    ) -> ServiceResult<Team> {
        {
            let mut conn = self.database().acquire().await?;
            if TeamDirectory::team_exists(&mut conn, team_name).await? {
                return Err(ServiceError::TeamExists(team_name.to_string()));
            }
        }

        let mut tx = self.database().begin().await?;
        TeamDirectory::create_team(&mut tx, team_name, members).await?;
        tx.commit().await?;

        info!("Created team {} with {} members", team_name, members.len());
        self.get_team(team_name).await
    }

    pub async fn get_team(&self, team_name: &str) -> ServiceResult<Team> {
        let mut conn = self.database().acquire().await?;
        TeamDirectory::get_team(&mut conn, team_name).await
    }

    /// Deactivate the members of `team_name` listed in `user_ids` and repair
    /// every OPEN pull request of the team they review.
    ///
    /// Ids that do not belong to the team are ignored. Each affected reviewer
    /// is swapped for an eligible active member of the team, or dropped when
    /// no one is eligible. Deactivation, replacements and removals commit
    /// together or not at all.
    pub async fn mass_deactivate(&self, team_name: &str, user_ids: &[String]) -> ServiceResult<Team> {
        let mut seen = HashSet::new();
        let user_ids: Vec<String> = user_ids
            .iter()
            .filter(|id| seen.insert(id.as_str()))
            .cloned()
            .collect();

        let mut tx = self.database().begin().await?;

        // First statement is a write, so this transaction queues behind any
        // reassignment holding a pull request lock
        let deactivated = TeamDirectory::deactivate_many(&mut tx, team_name, &user_ids).await?;

        if !TeamDirectory::team_exists(&mut tx, team_name).await? {
            return Err(ServiceError::team_not_found(team_name));
        }

        let assignments =
            PrLedger::get_open_assignments_by_reviewers(&mut tx, team_name, &user_ids).await?;
        if assignments.is_empty() {
            tx.commit().await?;
            info!(
                "Deactivated {} users in team {}; no open reviews affected",
                deactivated, team_name
            );
            return self.get_team(team_name).await;
        }

        let candidates = TeamDirectory::get_active_users_by_team(&mut tx, team_name).await?;

        let mut pr_ids: Vec<String> = assignments
            .iter()
            .map(|a| a.pull_request_id.clone())
            .collect();
        pr_ids.dedup();
        let mut reviewers = PrLedger::get_reviewers_by_prs(&mut tx, &pr_ids).await?;

        let plan = plan_replacements(
            &assignments,
            &candidates,
            &mut reviewers,
            &mut rand::thread_rng(),
        );
        debug!(
            "Replacement plan for team {}: {} replacements, {} removals",
            team_name,
            plan.replacements.len(),
            plan.removals.len()
        );

        let replaced = PrLedger::replace_reviewers_bulk(&mut tx, &plan.replacements).await?;
        let removed = PrLedger::remove_reviewers_bulk(&mut tx, &plan.removals).await?;
        info!(
            "Team {}: {} reviews across {} pull requests replaced, {} removed",
            team_name,
            replaced,
            pr_ids.len(),
            removed
        );

        tx.commit().await?;

        let team = self.get_team(team_name).await?;
        info!(
            "Deactivated {} users in team {}; {} members remain active",
            deactivated,
            team_name,
            team.active_members().count()
        );
        Ok(team)
    }
}
