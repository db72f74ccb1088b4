use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Team {0} already exists")]
    TeamExists(String),

    #[error("Pull request {0} already exists")]
    PrExists(String),

    #[error("Pull request {0} is already merged")]
    PrMerged(String),

    #[error("User {user_id} is not assigned to pull request {pr_id}")]
    NotAssigned { pr_id: String, user_id: String },

    #[error("No active replacement candidate in team {0}")]
    NoCandidate(String),

    #[error("{resource} {id} not found")]
    NotFound { resource: &'static str, id: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    pub fn team_not_found(team_name: impl Into<String>) -> Self {
        Self::NotFound {
            resource: "team",
            id: team_name.into(),
        }
    }

    pub fn user_not_found(user_id: impl Into<String>) -> Self {
        Self::NotFound {
            resource: "user",
            id: user_id.into(),
        }
    }

    pub fn pr_not_found(pr_id: impl Into<String>) -> Self {
        Self::NotFound {
            resource: "pull request",
            id: pr_id.into(),
        }
    }

    pub fn not_assigned(pr_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self::NotAssigned {
            pr_id: pr_id.into(),
            user_id: user_id.into(),
        }
    }

    /// Stable machine-readable code for this failure kind.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::TeamExists(_) => "TEAM_EXISTS",
            Self::PrExists(_) => "PR_EXISTS",
            Self::PrMerged(_) => "PR_MERGED",
            Self::NotAssigned { .. } => "NOT_ASSIGNED",
            Self::NoCandidate(_) => "NO_CANDIDATE",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::ConfigError(_) | Self::DatabaseError(_) => "INTERNAL_ERROR",
        }
    }
}
