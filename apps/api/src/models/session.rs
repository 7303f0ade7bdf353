use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

/// Lifecycle of one optimization session. A failed pipeline must land on
/// `Failed` — a session left in `Processing` forever is a defect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Processing,
    Completed,
    Failed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Processing => "processing",
            SessionStatus::Completed => "completed",
            SessionStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "processing" => Some(SessionStatus::Processing),
            "completed" => Some(SessionStatus::Completed),
            "failed" => Some(SessionStatus::Failed),
            _ => None,
        }
    }

    /// Derived progress percentage served to status pollers.
    pub fn progress(&self) -> u8 {
        match self {
            SessionStatus::Processing => 50,
            SessionStatus::Completed => 100,
            SessionStatus::Failed => 0,
        }
    }
}

/// An uploaded resume. `data` holds the `ResumeData` JSON (sections start
/// empty and are filled once analysis runs).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ResumeRow {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub file_path: Option<String>,
    pub data: Value,
    pub created_at: DateTime<Utc>,
}

/// A pasted job description. `data` holds the `JobDescriptionData` JSON.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JobDescriptionRow {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub data: Value,
    pub created_at: DateTime<Utc>,
}

/// The session record tracking one resume+JD analysis request from creation
/// to completion. Owned by `user_id` (nullable for anonymous uploads).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OptimizationSessionRow {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub resume_id: Uuid,
    pub job_description_id: Uuid,
    pub status: String,
    pub analysis_results: Option<Value>,
    pub optimization_suggestions: Option<Value>,
    pub optimized_resume_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl OptimizationSessionRow {
    pub fn status(&self) -> SessionStatus {
        SessionStatus::parse(&self.status).unwrap_or(SessionStatus::Failed)
    }
}
