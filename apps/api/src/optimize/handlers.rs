//! Axum route handlers for the Optimization API: upload, analyze, status.

use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;

use crate::analysis;
use crate::analysis::models::{AnalysisResult, JobDescriptionData, ResumeData};
use crate::auth::{AuthUser, MaybeAuthUser};
use crate::document::{self, FileType};
use crate::errors::AppError;
use crate::models::session::{
    JobDescriptionRow, OptimizationSessionRow, ResumeRow, SessionStatus,
};
use crate::models::subscription::SubscriptionRow;
use crate::state::AppState;
use crate::storage;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub session_id: Uuid,
    pub resume_id: Uuid,
    pub job_description_id: Uuid,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    pub session_id: Uuid,
    pub status: SessionStatus,
    pub results: AnalysisResult,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: SessionStatus,
    pub progress: u8,
    pub results: Option<Value>,
}

/// The two multipart fields every submission carries.
struct SubmissionForm {
    filename: String,
    file_bytes: Vec<u8>,
    job_description: String,
}

/// Reads the multipart form. The resume file arrives under `file` or
/// `resume`; the job description under `jobDescription`.
async fn read_submission(mut multipart: Multipart) -> Result<SubmissionForm, AppError> {
    let mut filename: Option<String> = None;
    let mut file_bytes: Option<Vec<u8>> = None;
    let mut job_description: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed multipart body: {e}")))?
    {
        match field.name() {
            Some("file") | Some("resume") => {
                filename = field.file_name().map(|s| s.to_string());
                file_bytes = Some(
                    field
                        .bytes()
                        .await
                        .map_err(|e| AppError::Validation(format!("Failed to read file: {e}")))?
                        .to_vec(),
                );
            }
            Some("jobDescription") => {
                job_description = Some(field.text().await.map_err(|e| {
                    AppError::Validation(format!("Failed to read job description: {e}"))
                })?);
            }
            _ => {}
        }
    }

    match (filename, file_bytes, job_description) {
        (Some(filename), Some(file_bytes), Some(job_description)) => Ok(SubmissionForm {
            filename,
            file_bytes,
            job_description,
        }),
        _ => Err(AppError::Validation(
            "Both resume file and job description are required".to_string(),
        )),
    }
}

fn resolve_file_type(filename: &str) -> Result<FileType, AppError> {
    FileType::from_filename(filename).ok_or_else(|| {
        let ext = filename.rsplit('.').next().unwrap_or("").to_string();
        AppError::UnsupportedFileType(ext)
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/resume/upload
///
/// Accepts a resume + job description, extracts the text, stores the file,
/// and creates the resume, job-description, and session rows in one
/// transaction — either all three exist afterwards or none do.
pub async fn handle_upload(
    State(state): State<AppState>,
    MaybeAuthUser(user_id): MaybeAuthUser,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let form = read_submission(multipart).await?;
    let file_type = resolve_file_type(&form.filename)?;

    if form.file_bytes.len() > state.config.upload_max_file_size {
        return Err(AppError::Validation(format!(
            "File size exceeds the maximum of {} MB",
            state.config.upload_max_file_size / (1024 * 1024)
        )));
    }
    if form.job_description.trim().is_empty() {
        return Err(AppError::Validation(
            "Job description cannot be empty".to_string(),
        ));
    }

    let resume_text = document::extract_text(&form.file_bytes, file_type)?;

    let key = storage::resume_key(user_id, &form.filename);
    let stored_path = storage::upload_resume(
        &state.s3,
        &state.config.s3_bucket,
        &key,
        form.file_bytes,
        file_type,
    )
    .await?;

    // Sections start empty; analysis fills them later.
    let resume_data = ResumeData {
        text: resume_text,
        ..Default::default()
    };
    let job_data = JobDescriptionData {
        text: form.job_description,
        ..Default::default()
    };

    let mut tx = state.db.begin().await?;

    let resume: ResumeRow = sqlx::query_as(
        "INSERT INTO resumes (id, user_id, file_path, data) VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(&stored_path)
    .bind(serde_json::to_value(&resume_data).map_err(anyhow::Error::from)?)
    .fetch_one(&mut *tx)
    .await?;

    let job: JobDescriptionRow = sqlx::query_as(
        "INSERT INTO job_descriptions (id, user_id, data) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(serde_json::to_value(&job_data).map_err(anyhow::Error::from)?)
    .fetch_one(&mut *tx)
    .await?;

    let session_id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO optimization_sessions (id, user_id, resume_id, job_description_id, status)
        VALUES ($1, $2, $3, $4, 'processing')
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(resume.id)
    .bind(job.id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    info!("Created session {session_id} for upload {stored_path}");

    Ok(Json(UploadResponse {
        session_id,
        resume_id: resume.id,
        job_description_id: job.id,
    }))
}

/// POST /api/v1/optimize
///
/// Full analysis: entitlement check, session creation, pipeline run,
/// persistence of the result. A pipeline failure marks the session `failed` —
/// it is never left in `processing`.
pub async fn handle_optimize(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    multipart: Multipart,
) -> Result<Json<AnalyzeResponse>, AppError> {
    let form = read_submission(multipart).await?;
    let file_type = resolve_file_type(&form.filename)?;

    if form.file_bytes.len() > state.config.analyze_max_file_size {
        return Err(AppError::Validation(format!(
            "File size exceeds the maximum of {} MB",
            state.config.analyze_max_file_size / (1024 * 1024)
        )));
    }
    if form.job_description.trim().is_empty() {
        return Err(AppError::Validation(
            "Job description cannot be empty".to_string(),
        ));
    }

    // Entitlement gate — before any AI spend
    let subscription: Option<SubscriptionRow> =
        sqlx::query_as("SELECT * FROM subscriptions WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&state.db)
            .await?;

    let subscription = subscription
        .filter(SubscriptionRow::can_analyze)
        .ok_or_else(|| AppError::Entitlement("No active subscription found".to_string()))?;

    // Store the file and create the tracking rows up front
    let key = storage::resume_key(Some(user_id), &form.filename);
    let stored_path = storage::upload_resume(
        &state.s3,
        &state.config.s3_bucket,
        &key,
        form.file_bytes.clone(),
        file_type,
    )
    .await?;

    let placeholder_resume = ResumeData::default();
    let job_data = JobDescriptionData {
        text: form.job_description.clone(),
        ..Default::default()
    };

    let mut tx = state.db.begin().await?;
    let resume: ResumeRow = sqlx::query_as(
        "INSERT INTO resumes (id, user_id, file_path, data) VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(&stored_path)
    .bind(serde_json::to_value(&placeholder_resume).map_err(anyhow::Error::from)?)
    .fetch_one(&mut *tx)
    .await?;

    let job: JobDescriptionRow = sqlx::query_as(
        "INSERT INTO job_descriptions (id, user_id, data) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(serde_json::to_value(&job_data).map_err(anyhow::Error::from)?)
    .fetch_one(&mut *tx)
    .await?;

    let session_id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO optimization_sessions (id, user_id, resume_id, job_description_id, status)
        VALUES ($1, $2, $3, $4, 'processing')
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(resume.id)
    .bind(job.id)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;

    // Run the pipeline; on failure the session must land on `failed`
    let result = match analysis::analyze(
        state.ai.as_ref(),
        &form.file_bytes,
        file_type,
        &form.job_description,
        state.config.analyze_max_file_size,
    )
    .await
    {
        Ok(result) => result,
        Err(e) => {
            mark_session_failed(&state, session_id).await;
            return Err(e);
        }
    };

    // Persistence failures get the same terminal-state handling as pipeline
    // failures: the session must never stay `processing`.
    if let Err(e) = persist_result(&state, session_id, resume.id, job.id, &result).await {
        mark_session_failed(&state, session_id).await;
        return Err(e);
    }

    if subscription.consumes_credit() {
        sqlx::query(
            r#"
            UPDATE subscriptions
            SET credits_remaining = credits_remaining - 1, updated_at = now()
            WHERE user_id = $1 AND credits_remaining > 0
            "#,
        )
        .bind(user_id)
        .execute(&state.db)
        .await?;
    }

    invalidate_history_cache(&state, user_id).await;

    info!(
        "Session {session_id} completed with score {}/100 for user {user_id}",
        result.compatibility.score
    );

    Ok(Json(AnalyzeResponse {
        session_id,
        status: SessionStatus::Completed,
        results: result,
    }))
}

/// GET /api/v1/optimize/:id/status
///
/// Ownership is mandatory: the session is looked up by id AND user id, so
/// another user's session reads as not-found.
pub async fn handle_status(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(session_id): Path<Uuid>,
) -> Result<Json<StatusResponse>, AppError> {
    let session: Option<OptimizationSessionRow> =
        sqlx::query_as("SELECT * FROM optimization_sessions WHERE id = $1 AND user_id = $2")
            .bind(session_id)
            .bind(user_id)
            .fetch_optional(&state.db)
            .await?;

    let session =
        session.ok_or_else(|| AppError::NotFound(format!("Session {session_id} not found")))?;

    let status = session.status();
    let results = match status {
        SessionStatus::Completed => Some(json!({
            "analysis": session.analysis_results,
            "optimization": session.optimization_suggestions,
        })),
        _ => None,
    };

    Ok(Json(StatusResponse {
        status,
        progress: status.progress(),
        results,
    }))
}

// ────────────────────────────────────────────────────────────────────────────
// Persistence helpers
// ────────────────────────────────────────────────────────────────────────────

/// Writes the completed analysis back: resume sections, job requirements,
/// and the session's result payloads, all in one transaction.
async fn persist_result(
    state: &AppState,
    session_id: Uuid,
    resume_id: Uuid,
    job_description_id: Uuid,
    result: &AnalysisResult,
) -> Result<(), AppError> {
    let analysis_json = json!({
        "compatibility": result.compatibility,
        "keywordMatches": result.keyword_matches,
        "experienceAlignment": result.experience_alignment,
        "educationAlignment": result.education_alignment,
        "formattingIssues": result.formatting_issues,
        "sectionSuggestions": result.section_suggestions,
    });
    let optimization_json = serde_json::to_value(&result.optimization).map_err(anyhow::Error::from)?;

    let mut tx = state.db.begin().await?;

    sqlx::query("UPDATE resumes SET data = $1 WHERE id = $2")
        .bind(serde_json::to_value(&result.resume_data).map_err(anyhow::Error::from)?)
        .bind(resume_id)
        .execute(&mut *tx)
        .await?;

    sqlx::query("UPDATE job_descriptions SET data = $1 WHERE id = $2")
        .bind(serde_json::to_value(&result.job_data).map_err(anyhow::Error::from)?)
        .bind(job_description_id)
        .execute(&mut *tx)
        .await?;

    sqlx::query(
        r#"
        UPDATE optimization_sessions
        SET status = 'completed', analysis_results = $1, optimization_suggestions = $2,
            updated_at = now(), completed_at = now()
        WHERE id = $3
        "#,
    )
    .bind(analysis_json)
    .bind(optimization_json)
    .bind(session_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}

/// Best-effort terminal-state write; a session must never stay `processing`
/// after its pipeline has failed.
async fn mark_session_failed(state: &AppState, session_id: Uuid) {
    let update = sqlx::query(
        "UPDATE optimization_sessions SET status = 'failed', updated_at = now() WHERE id = $1",
    )
    .bind(session_id)
    .execute(&state.db)
    .await;

    if let Err(e) = update {
        warn!("Failed to mark session {session_id} as failed: {e}");
    }
}

/// Best-effort invalidation of the user's cached history view.
async fn invalidate_history_cache(state: &AppState, user_id: Uuid) {
    let key = format!("history:{user_id}");
    match state.redis.get_multiplexed_async_connection().await {
        Ok(mut conn) => {
            let result: redis::RedisResult<()> = redis::AsyncCommands::del(&mut conn, &key).await;
            if let Err(e) = result {
                warn!("Failed to invalidate {key}: {e}");
            }
        }
        Err(e) => warn!("Redis unavailable, skipping invalidation of {key}: {e}"),
    }
}
