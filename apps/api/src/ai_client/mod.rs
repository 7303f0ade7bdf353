/// AI Transformation Client — the single point of entry for all OpenAI calls.
///
/// ARCHITECTURAL RULE: No other module may call the completion API directly.
/// All AI interactions MUST go through this module.
///
/// Response handling policy: responses are parsed as JSON with every expected
/// field defaulted when absent (arrays → [], scores → 0, strings → "",
/// booleans → false). Missing fields are never an error — only an unparseable
/// body or a failed call is. Scores are clamped to 0–100 here so internal
/// code never sees an out-of-range value.
use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::analysis::models::{
    CompatibilityAnalysis, EducationAlignment, EducationSuggestions, ExperienceAlignment,
    FormattingAnalysis, JobDescriptionData, JobRequirements, KeywordMatches,
    OptimizationSuggestions, ResumeData, ResumeSections, SkillsSuggestions,
};
use crate::errors::AppError;

pub mod prompts;

const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";
/// The model used for all AI calls.
/// This is intentionally hardcoded to prevent accidental drift.
pub const MODEL: &str = "gpt-4";
const MAX_RETRIES: u32 = 3;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("AI returned empty content")]
    EmptyContent,
}

impl From<AiError> for AppError {
    fn from(e: AiError) -> Self {
        match e {
            AiError::Parse(_) | AiError::EmptyContent => AppError::AiResponse(e.to_string()),
            _ => AppError::AiCall(e.to_string()),
        }
    }
}

/// The four AI transformation operations behind the pipeline.
///
/// Carried in `AppState` as `Arc<dyn AiClient>` so tests can substitute a
/// recording double for the real provider.
#[async_trait]
pub trait AiClient: Send + Sync {
    async fn parse_resume(&self, resume_text: &str) -> Result<ResumeData, AppError>;

    async fn analyze_job_description(
        &self,
        job_text: &str,
    ) -> Result<JobDescriptionData, AppError>;

    async fn analyze_compatibility(
        &self,
        resume: &ResumeData,
        job: &JobDescriptionData,
    ) -> Result<CompatibilityAnalysis, AppError>;

    async fn optimize_content(
        &self,
        resume: &ResumeData,
        compatibility: &CompatibilityAnalysis,
    ) -> Result<OptimizationSuggestions, AppError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Wire types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    response_format: ResponseFormat<'a>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat<'a> {
    #[serde(rename = "type")]
    format_type: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct OpenAiError {
    error: OpenAiErrorBody,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorBody {
    message: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Client
// ────────────────────────────────────────────────────────────────────────────

/// The production AI client over the chat-completions API.
/// Wraps the endpoint with retry logic and JSON-constrained output.
#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    api_key: String,
}

impl OpenAiClient {
    pub fn new(api_key: String, timeout_secs: u64) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(timeout_secs))
                .build()
                .expect("Failed to build HTTP client"),
            api_key,
        }
    }

    /// Makes a raw call, returning the assistant's text content.
    /// Retries on 429 (rate limit) and 5xx errors with exponential backoff.
    pub async fn call(&self, system: &str, user: &str) -> Result<String, AiError> {
        let request_body = ChatRequest {
            model: MODEL,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            response_format: ResponseFormat {
                format_type: "json_object",
            },
        };

        let mut last_error: Option<AiError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, 4s
                let delay = std::time::Duration::from_millis(1000 * (1 << (attempt - 1)));
                warn!(
                    "AI call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .post(OPENAI_API_URL)
                .bearer_auth(&self.api_key)
                .header("content-type", "application/json")
                .json(&request_body)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(AiError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("AI API returned {}: {}", status, body);
                last_error = Some(AiError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<OpenAiError>(&body)
                    .map(|e| e.error.message)
                    .unwrap_or(body);
                return Err(AiError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let chat_response: ChatResponse = response.json().await?;

            if let Some(usage) = &chat_response.usage {
                debug!(
                    "AI call succeeded: prompt_tokens={}, completion_tokens={}",
                    usage.prompt_tokens, usage.completion_tokens
                );
            }

            return chat_response
                .choices
                .into_iter()
                .next()
                .and_then(|c| c.message.content)
                .filter(|c| !c.trim().is_empty())
                .ok_or(AiError::EmptyContent);
        }

        Err(last_error.unwrap_or(AiError::RateLimited {
            retries: MAX_RETRIES,
        }))
    }

    /// Calls the AI and deserializes the text response as JSON.
    /// The system prompt must instruct the model to return valid JSON.
    pub async fn call_json<T: DeserializeOwned>(
        &self,
        system: &str,
        user: &str,
    ) -> Result<T, AiError> {
        let text = self.call(system, user).await?;

        // Strip markdown code fences if the model wraps JSON in them
        let text = strip_json_fences(&text);

        serde_json::from_str(text).map_err(AiError::Parse)
    }
}

#[async_trait]
impl AiClient for OpenAiClient {
    async fn parse_resume(&self, resume_text: &str) -> Result<ResumeData, AppError> {
        let sections: ResumeSections = self
            .call_json(prompts::RESUME_PARSER_SYSTEM, resume_text)
            .await?;
        Ok(ResumeData {
            text: resume_text.to_string(),
            sections,
        })
    }

    async fn analyze_job_description(
        &self,
        job_text: &str,
    ) -> Result<JobDescriptionData, AppError> {
        let requirements: JobRequirements = self
            .call_json(prompts::JOB_ANALYZER_SYSTEM, job_text)
            .await?;
        Ok(JobDescriptionData {
            text: job_text.to_string(),
            requirements,
        })
    }

    async fn analyze_compatibility(
        &self,
        resume: &ResumeData,
        job: &JobDescriptionData,
    ) -> Result<CompatibilityAnalysis, AppError> {
        let payload = serde_json::json!({ "resume": resume, "job": job }).to_string();
        let raw: RawCompatibility = self
            .call_json(prompts::COMPATIBILITY_SYSTEM, &payload)
            .await?;
        Ok(raw.into())
    }

    async fn optimize_content(
        &self,
        resume: &ResumeData,
        compatibility: &CompatibilityAnalysis,
    ) -> Result<OptimizationSuggestions, AppError> {
        let payload =
            serde_json::json!({ "resume": resume, "compatibility": compatibility }).to_string();
        let raw: RawOptimization = self.call_json(prompts::OPTIMIZER_SYSTEM, &payload).await?;
        Ok(raw.into_suggestions(&resume.sections.skills))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Raw response shapes — schema-aware defaulting boundary
// ────────────────────────────────────────────────────────────────────────────

/// Clamps a model-provided score into 0–100. The prompt constrains the range,
/// but the output is not contractually guaranteed.
fn clamp_score(raw: f64) -> u8 {
    raw.round().clamp(0.0, 100.0) as u8
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawAlignment {
    score: f64,
    matched_responsibilities: Vec<String>,
    unmatched_responsibilities: Vec<String>,
    improvement_suggestions: Vec<String>,
    matches: Vec<String>,
    gaps: Vec<String>,
    suggestions: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawCompatibility {
    overall_compatibility_score: f64,
    explanation: String,
    keyword_matches: KeywordMatches,
    experience_alignment: RawAlignment,
    education_alignment: RawAlignment,
    formatting_analysis: FormattingAnalysis,
    section_suggestions: BTreeMap<String, Vec<String>>,
}

impl From<RawCompatibility> for CompatibilityAnalysis {
    fn from(raw: RawCompatibility) -> Self {
        CompatibilityAnalysis {
            overall_compatibility_score: clamp_score(raw.overall_compatibility_score),
            explanation: raw.explanation,
            keyword_matches: raw.keyword_matches,
            experience_alignment: ExperienceAlignment {
                score: clamp_score(raw.experience_alignment.score),
                matched_responsibilities: raw.experience_alignment.matched_responsibilities,
                unmatched_responsibilities: raw.experience_alignment.unmatched_responsibilities,
                improvement_suggestions: raw.experience_alignment.improvement_suggestions,
            },
            education_alignment: EducationAlignment {
                score: clamp_score(raw.education_alignment.score),
                matches: raw.education_alignment.matches,
                gaps: raw.education_alignment.gaps,
                suggestions: raw.education_alignment.suggestions,
            },
            formatting_analysis: raw.formatting_analysis,
            section_suggestions: raw.section_suggestions,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawSkills {
    improved: Vec<String>,
    explanation: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawEducation {
    needs_changes: bool,
    suggestions: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawOptimization {
    experience: Vec<String>,
    skills: RawSkills,
    education: RawEducation,
    formatting_improvements: Vec<String>,
}

impl RawOptimization {
    /// `original_skills` comes from the parsed resume, not from the model.
    /// Education suggestions are normalized away when no changes are needed.
    fn into_suggestions(self, original_skills: &[String]) -> OptimizationSuggestions {
        OptimizationSuggestions {
            experience: self.experience,
            skills: SkillsSuggestions {
                original: original_skills.to_vec(),
                improved: self.skills.improved,
                explanation: self.skills.explanation,
            },
            education: EducationSuggestions {
                needs_changes: self.education.needs_changes,
                suggestions: if self.education.needs_changes {
                    self.education.suggestions
                } else {
                    None
                },
            },
            formatting_improvements: self.formatting_improvements,
        }
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from model output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}
