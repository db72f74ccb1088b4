//! Request and response payloads for the HTTP surface.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::database::models::{PullRequest, PullRequestShort, Team, TeamMember, User};
use crate::error::ServiceError;

const MAX_ID_LEN: usize = 255;
const MAX_NAME_LEN: usize = 255;
const MAX_PR_NAME_LEN: usize = 500;
const MAX_TEAM_MEMBERS: usize = 200;
const MAX_DEACTIVATE_USERS: usize = MAX_TEAM_MEMBERS;

fn id_regex() -> &'static Regex {
    static ID_REGEX: OnceLock<Regex> = OnceLock::new();
    ID_REGEX.get_or_init(|| Regex::new(r"^[a-zA-Z0-9_-]+$").expect("valid id regex"))
}

fn name_regex() -> &'static Regex {
    static NAME_REGEX: OnceLock<Regex> = OnceLock::new();
    NAME_REGEX.get_or_init(|| Regex::new(r"^[a-zA-Z0-9_\s-]+$").expect("valid name regex"))
}

fn validate_id(field: &str, value: &str) -> Result<(), ServiceError> {
    if value.trim().is_empty() {
        return Err(ServiceError::InvalidInput(format!("{} cannot be empty", field)));
    }
    if value.len() > MAX_ID_LEN {
        return Err(ServiceError::InvalidInput(format!(
            "{} too long (max {} characters)",
            field, MAX_ID_LEN
        )));
    }
    if !id_regex().is_match(value) {
        return Err(ServiceError::InvalidInput(format!(
            "{} contains invalid characters",
            field
        )));
    }
    Ok(())
}

pub fn validate_user_id(user_id: &str) -> Result<(), ServiceError> {
    validate_id("user_id", user_id)
}

pub fn validate_pull_request_id(pr_id: &str) -> Result<(), ServiceError> {
    validate_id("pull_request_id", pr_id)
}

pub fn validate_team_name(team_name: &str) -> Result<(), ServiceError> {
    if team_name.trim().is_empty() {
        return Err(ServiceError::InvalidInput("team_name cannot be empty".to_string()));
    }
    if team_name.len() > MAX_NAME_LEN {
        return Err(ServiceError::InvalidInput(format!(
            "team_name too long (max {} characters)",
            MAX_NAME_LEN
        )));
    }
    if !name_regex().is_match(team_name) {
        return Err(ServiceError::InvalidInput(
            "team_name contains invalid characters".to_string(),
        ));
    }
    Ok(())
}

fn validate_username(username: &str) -> Result<(), ServiceError> {
    if username.trim().is_empty() {
        return Err(ServiceError::InvalidInput("username cannot be empty".to_string()));
    }
    if username.len() > MAX_NAME_LEN {
        return Err(ServiceError::InvalidInput(format!(
            "username too long (max {} characters)",
            MAX_NAME_LEN
        )));
    }
    Ok(())
}

fn indexed(field: &str, index: usize, err: ServiceError) -> ServiceError {
    match err {
        ServiceError::InvalidInput(msg) => {
            ServiceError::InvalidInput(format!("{}[{}]: {}", field, index, msg))
        }
        other => other,
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TeamRequest {
    pub team_name: String,
    pub members: Vec<TeamMember>,
}

impl TeamRequest {
    pub fn validate(&self) -> Result<(), ServiceError> {
        validate_team_name(&self.team_name)?;

        if self.members.is_empty() {
            return Err(ServiceError::InvalidInput(
                "team must have at least one member".to_string(),
            ));
        }
        if self.members.len() > MAX_TEAM_MEMBERS {
            return Err(ServiceError::InvalidInput(format!(
                "team has too many members (max {}, got {})",
                MAX_TEAM_MEMBERS,
                self.members.len()
            )));
        }

        for (i, member) in self.members.iter().enumerate() {
            validate_user_id(&member.user_id).map_err(|e| indexed("members", i, e))?;
            validate_username(&member.username).map_err(|e| indexed("members", i, e))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MassDeactivateRequest {
    pub team_name: String,
    pub user_ids: Vec<String>,
}

impl MassDeactivateRequest {
    pub fn validate(&self) -> Result<(), ServiceError> {
        validate_team_name(&self.team_name)?;
        if self.user_ids.is_empty() {
            return Err(ServiceError::InvalidInput("user_ids cannot be empty".to_string()));
        }
        if self.user_ids.len() > MAX_DEACTIVATE_USERS {
            return Err(ServiceError::InvalidInput(format!(
                "too many user_ids (max {}, got {})",
                MAX_DEACTIVATE_USERS,
                self.user_ids.len()
            )));
        }
        for (i, user_id) in self.user_ids.iter().enumerate() {
            validate_user_id(user_id).map_err(|e| indexed("user_ids", i, e))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetIsActiveRequest {
    pub user_id: String,
    pub is_active: bool,
}

impl SetIsActiveRequest {
    pub fn validate(&self) -> Result<(), ServiceError> {
        validate_user_id(&self.user_id)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePrRequest {
    pub pull_request_id: String,
    pub pull_request_name: String,
    pub author_id: String,
}

impl CreatePrRequest {
    pub fn validate(&self) -> Result<(), ServiceError> {
        validate_pull_request_id(&self.pull_request_id)?;
        if self.pull_request_name.trim().is_empty() {
            return Err(ServiceError::InvalidInput(
                "pull_request_name cannot be empty".to_string(),
            ));
        }
        if self.pull_request_name.len() > MAX_PR_NAME_LEN {
            return Err(ServiceError::InvalidInput(format!(
                "pull_request_name too long (max {} characters)",
                MAX_PR_NAME_LEN
            )));
        }
        validate_user_id(&self.author_id)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MergePrRequest {
    pub pull_request_id: String,
}

impl MergePrRequest {
    pub fn validate(&self) -> Result<(), ServiceError> {
        validate_pull_request_id(&self.pull_request_id)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReassignRequest {
    pub pull_request_id: String,
    pub old_user_id: String,
}

impl ReassignRequest {
    pub fn validate(&self) -> Result<(), ServiceError> {
        validate_pull_request_id(&self.pull_request_id)?;
        validate_user_id(&self.old_user_id)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TeamQuery {
    pub team_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserQuery {
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TeamResponse {
    pub team: Team,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub user: User,
}

#[derive(Debug, Serialize)]
pub struct PrResponse {
    pub pr: PullRequest,
}

#[derive(Debug, Serialize)]
pub struct UserReviewResponse {
    pub user_id: String,
    pub pull_requests: Vec<PullRequestShort>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(id: &str, name: &str) -> TeamMember {
        TeamMember {
            user_id: id.to_string(),
            username: name.to_string(),
            is_active: true,
        }
    }

    #[test]
    fn test_id_validation() {
        assert!(validate_user_id("user_1-a").is_ok());
        assert!(validate_user_id("").is_err());
        assert!(validate_user_id("   ").is_err());
        assert!(validate_user_id("has space").is_err());
        assert!(validate_user_id("semi;colon").is_err());
        assert!(validate_pull_request_id(&"x".repeat(256)).is_err());
        assert!(validate_pull_request_id(&"x".repeat(255)).is_ok());
    }

    #[test]
    fn test_team_name_allows_spaces() {
        assert!(validate_team_name("Platform Team").is_ok());
        assert!(validate_team_name("team/../etc").is_err());
    }

    #[test]
    fn test_team_request_validation_reports_member_index() {
        let request = TeamRequest {
            team_name: "backend".to_string(),
            members: vec![member("u1", "Alice"), member("bad id", "Bob")],
        };
        match request.validate() {
            Err(ServiceError::InvalidInput(msg)) => assert!(msg.starts_with("members[1]")),
            other => panic!("expected InvalidInput, got {:?}", other),
        }

        let empty = TeamRequest {
            team_name: "backend".to_string(),
            members: vec![],
        };
        assert!(empty.validate().is_err());
    }

    #[test]
    fn test_mass_deactivate_requires_users() {
        let request = MassDeactivateRequest {
            team_name: "backend".to_string(),
            user_ids: vec![],
        };
        assert!(request.validate().is_err());

        let request = MassDeactivateRequest {
            team_name: "backend".to_string(),
            user_ids: vec!["u1".to_string(), "u2".to_string()],
        };
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_mass_deactivate_caps_user_ids() {
        let ids = |n: usize| (0..n).map(|i| format!("u{}", i)).collect::<Vec<_>>();

        let request = MassDeactivateRequest {
            team_name: "backend".to_string(),
            user_ids: ids(MAX_DEACTIVATE_USERS),
        };
        assert!(request.validate().is_ok());

        let request = MassDeactivateRequest {
            team_name: "backend".to_string(),
            user_ids: ids(MAX_DEACTIVATE_USERS + 1),
        };
        match request.validate() {
            Err(ServiceError::InvalidInput(msg)) => assert!(msg.starts_with("too many user_ids")),
            other => panic!("expected InvalidInput, got {:?}", other),
        }
    }

    #[test]
    fn test_create_pr_name_length() {
        let request = CreatePrRequest {
            pull_request_id: "pr-1".to_string(),
            pull_request_name: "n".repeat(501),
            author_id: "u1".to_string(),
        };
        assert!(request.validate().is_err());
    }
}
