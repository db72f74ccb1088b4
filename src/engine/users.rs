use tracing::info;

use super::AssignmentEngine;
use crate::database::models::{PullRequestShort, User};
use crate::directory::TeamDirectory;
use crate::error::ServiceResult;
use crate::ledger::PrLedger;

impl AssignmentEngine {
    /// Toggle a single user's active flag. Open reviews are left as they are;
    /// use `mass_deactivate` to also repair reviewer sets.
    pub async fn set_user_active(&self, user_id: &str, is_active: bool) -> ServiceResult<User> {
        let mut conn = self.database().acquire().await?;
        TeamDirectory::set_active(&mut conn, user_id, is_active).await?;
        info!("Set user {} active={}", user_id, is_active);
        TeamDirectory::get_user(&mut conn, user_id).await
    }

    pub async fn get_review_prs(&self, user_id: &str) -> ServiceResult<Vec<PullRequestShort>> {
        let mut conn = self.database().acquire().await?;
        TeamDirectory::get_user(&mut conn, user_id).await?;
        PrLedger::get_by_reviewer(&mut conn, user_id).await
    }
}
