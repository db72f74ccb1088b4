use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::{AssignmentEngine, REVIEWERS_PER_PR};
use crate::database::models::PullRequest;
use crate::directory::TeamDirectory;
use crate::error::{ServiceError, ServiceResult};
use crate::ledger::PrLedger;

#[derive(Debug, Clone, Serialize)]
pub struct Reassignment {
    #[serde(rename = "pr")]
    pub pull_request: PullRequest,
    pub replaced_by: String,
}

impl AssignmentEngine {
    /// Create an OPEN pull request and assign up to two active teammates of
    /// the author.
    ///
    /// The existence pre-check is not serialized with the insert. Concurrent
    /// creators of the same id can all pass it; the primary key lets exactly
    /// one insert through and the others roll back with `PrExists`.
    pub async fn create_pr(
        &self,
        pr_id: &str,
        pr_name: &str,
        author_id: &str,
    ) -> ServiceResult<PullRequest> {
        {
            let mut conn = self.database().acquire().await?;
            if PrLedger::exists(&mut conn, pr_id).await? {
                return Err(ServiceError::PrExists(pr_id.to_string()));
            }

            let author = TeamDirectory::get_user(&mut conn, author_id).await?;
            let team_name = author
                .team_name
                .ok_or_else(|| ServiceError::team_not_found(format!("of user {}", author_id)))?;
            if !TeamDirectory::team_exists(&mut conn, &team_name).await? {
                return Err(ServiceError::team_not_found(team_name));
            }
        }

        let mut tx = self.database().begin().await?;

        let mut pr = PullRequest::new_open(pr_id, pr_name, author_id);
        PrLedger::create(&mut tx, &pr).await.map_err(|e| {
            if matches!(e, ServiceError::PrExists(_)) {
                warn!("Lost creation race for pull request {}", pr_id);
            }
            e
        })?;

        let reviewers =
            TeamDirectory::get_active_teammates(&mut tx, author_id, REVIEWERS_PER_PR).await?;
        for reviewer in reviewers {
            PrLedger::add_reviewer(&mut tx, pr_id, &reviewer.user_id).await?;
            pr.assigned_reviewers.push(reviewer.user_id);
        }

        tx.commit().await?;

        info!(
            "Created pull request {} by {} with reviewers {:?}",
            pr_id, author_id, pr.assigned_reviewers
        );
        Ok(pr)
    }

    /// Merge a pull request. Merging a MERGED pull request returns it unchanged.
    pub async fn merge_pr(&self, pr_id: &str) -> ServiceResult<PullRequest> {
        let pr = {
            let mut conn = self.database().acquire().await?;
            PrLedger::get(&mut conn, pr_id).await?
        };

        if pr.status.is_merged() {
            debug!("Pull request {} already merged", pr_id);
            return Ok(pr);
        }

        let mut tx = self.database().begin().await?;
        let transitioned = PrLedger::mark_merged(&mut tx, pr_id, Utc::now()).await?;
        tx.commit().await?;

        if transitioned {
            info!("Merged pull request {}", pr_id);
        } else {
            debug!("Pull request {} was merged concurrently", pr_id);
        }

        // Read back so every concurrent merger reports the winning timestamp
        let mut conn = self.database().acquire().await?;
        PrLedger::get(&mut conn, pr_id).await
    }

    /// Replace one reviewer of an OPEN pull request with a random eligible
    /// teammate of the reviewer being replaced.
    pub async fn reassign_reviewer(
        &self,
        pr_id: &str,
        old_reviewer_id: &str,
    ) -> ServiceResult<Reassignment> {
        let mut tx = self.database().begin().await?;

        // Held until commit or rollback
        let mut pr = PrLedger::get_for_update(&mut tx, pr_id).await?;

        if pr.status.is_merged() {
            return Err(ServiceError::PrMerged(pr_id.to_string()));
        }

        if !pr.has_reviewer(old_reviewer_id) {
            return Err(ServiceError::not_assigned(pr_id, old_reviewer_id));
        }

        let old_reviewer = TeamDirectory::get_user(&mut tx, old_reviewer_id).await?;
        let team_name = old_reviewer.team_name.ok_or_else(|| {
            ServiceError::team_not_found(format!("of user {}", old_reviewer_id))
        })?;

        let mut exclude_ids = vec![pr.author_id.clone(), old_reviewer_id.to_string()];
        exclude_ids.extend(
            pr.assigned_reviewers
                .iter()
                .filter(|id| id.as_str() != old_reviewer_id)
                .cloned(),
        );

        let new_reviewer =
            match TeamDirectory::find_replacement_reviewer(&mut tx, &team_name, &exclude_ids)
                .await
            {
                Ok(user) => user,
                Err(e) => {
                    if matches!(e, ServiceError::NoCandidate(_)) {
                        warn!(
                            "No replacement for {} on pull request {} in team {}",
                            old_reviewer_id, pr_id, team_name
                        );
                    }
                    return Err(e);
                }
            };

        PrLedger::remove_reviewer(&mut tx, pr_id, old_reviewer_id).await?;
        PrLedger::add_reviewer(&mut tx, pr_id, &new_reviewer.user_id).await?;

        tx.commit().await?;

        pr.assigned_reviewers.retain(|id| id != old_reviewer_id);
        pr.assigned_reviewers.push(new_reviewer.user_id.clone());

        info!(
            "Reassigned pull request {}: {} -> {}",
            pr_id, old_reviewer_id, new_reviewer.user_id
        );
        Ok(Reassignment {
            pull_request: pr,
            replaced_by: new_reviewer.user_id,
        })
    }

    pub async fn get_pr(&self, pr_id: &str) -> ServiceResult<PullRequest> {
        let mut conn = self.database().acquire().await?;
        PrLedger::get(&mut conn, pr_id).await
    }
}
