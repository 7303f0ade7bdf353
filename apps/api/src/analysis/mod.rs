//! Compatibility Analysis Orchestrator — drives the full pipeline.
//!
//! Flow: validate → extract text → (parse_resume ∥ analyze_job_description) →
//!       analyze_compatibility → optimize_content → assemble AnalysisResult.
//!
//! The two step-3 calls have no data dependency on each other and run
//! concurrently; compatibility must not start until both complete, and
//! optimization must not start until compatibility completes. Running
//! compatibility early would analyze against incomplete data — a correctness
//! bug, not a performance one.
//!
//! The orchestrator is stateless and performs no persistence; the caller owns
//! the returned result and its storage.

use tracing::info;

use crate::ai_client::AiClient;
use crate::document::{extract_text, FileType};
use crate::errors::AppError;

pub mod models;

use models::{AnalysisResult, Compatibility};

/// Runs the analysis pipeline over an uploaded resume and a pasted job
/// description. `max_file_size` is caller policy — handlers configure their
/// own limits independently.
///
/// Fails fast with `Validation` before any extraction or network call; any
/// later failure aborts the whole pipeline with no partial result.
pub async fn analyze(
    ai: &dyn AiClient,
    file_bytes: &[u8],
    file_type: FileType,
    job_description: &str,
    max_file_size: usize,
) -> Result<AnalysisResult, AppError> {
    // Step 1: validate inputs before doing any work
    if file_bytes.len() > max_file_size {
        return Err(AppError::Validation(format!(
            "File size exceeds the maximum of {} MB",
            max_file_size / (1024 * 1024)
        )));
    }
    if job_description.trim().is_empty() {
        return Err(AppError::Validation(
            "Job description cannot be empty".to_string(),
        ));
    }

    // Step 2: extract resume text; failure aborts the pipeline
    let resume_text = extract_text(file_bytes, file_type)?;

    // Step 3: parse resume and analyze JD concurrently — no data dependency
    let (resume_data, job_data) = tokio::try_join!(
        ai.parse_resume(&resume_text),
        ai.analyze_job_description(job_description),
    )?;

    info!(
        "Parsed resume ({} skills) and job description ({} required skills)",
        resume_data.sections.skills.len(),
        job_data.requirements.skills.len()
    );

    // Step 4: compatibility — strictly after both halves of step 3
    let compatibility = ai.analyze_compatibility(&resume_data, &job_data).await?;

    info!(
        "Compatibility score: {}/100",
        compatibility.overall_compatibility_score
    );

    // Step 5: optimization — strictly after step 4
    let optimization = ai.optimize_content(&resume_data, &compatibility).await?;

    // Step 6: assemble; every field traces to exactly one producing step
    Ok(AnalysisResult {
        resume_data,
        job_data,
        compatibility: Compatibility {
            score: compatibility.overall_compatibility_score,
            explanation: compatibility.explanation,
        },
        keyword_matches: compatibility.keyword_matches,
        experience_alignment: compatibility.experience_alignment,
        education_alignment: compatibility.education_alignment,
        formatting_issues: compatibility.formatting_analysis.issues,
        section_suggestions: compatibility.section_suggestions,
        optimization,
    })
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::models::*;
    use super::*;

    /// Test double that records the order of AI operations and can be
    /// programmed to fail or delay individual steps.
    #[derive(Default)]
    struct RecordingAi {
        calls: Mutex<Vec<&'static str>>,
        parse_resume_delay: Option<Duration>,
        fail_job_analysis: bool,
        compatibility: CompatibilityAnalysis,
    }

    impl RecordingAi {
        fn calls(&self) -> Vec<&'static str> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl AiClient for RecordingAi {
        async fn parse_resume(&self, resume_text: &str) -> Result<ResumeData, AppError> {
            if let Some(delay) = self.parse_resume_delay {
                tokio::time::sleep(delay).await;
            }
            self.calls.lock().unwrap().push("parse_resume");
            Ok(ResumeData {
                text: resume_text.to_string(),
                sections: ResumeSections {
                    experience: vec!["Software engineer, 6 years".to_string()],
                    education: vec!["BSc Computer Science".to_string()],
                    skills: vec!["Python".to_string(), "Go".to_string()],
                },
            })
        }

        async fn analyze_job_description(
            &self,
            job_text: &str,
        ) -> Result<JobDescriptionData, AppError> {
            if self.fail_job_analysis {
                return Err(AppError::AiCall("provider timed out".to_string()));
            }
            self.calls.lock().unwrap().push("analyze_job_description");
            Ok(JobDescriptionData {
                text: job_text.to_string(),
                requirements: JobRequirements {
                    experience: vec!["5+ years backend".to_string()],
                    education: vec![],
                    skills: vec!["Python".to_string(), "Kubernetes".to_string()],
                },
            })
        }

        async fn analyze_compatibility(
            &self,
            _resume: &ResumeData,
            _job: &JobDescriptionData,
        ) -> Result<CompatibilityAnalysis, AppError> {
            self.calls.lock().unwrap().push("analyze_compatibility");
            Ok(self.compatibility.clone())
        }

        async fn optimize_content(
            &self,
            resume: &ResumeData,
            _compatibility: &CompatibilityAnalysis,
        ) -> Result<OptimizationSuggestions, AppError> {
            self.calls.lock().unwrap().push("optimize_content");
            Ok(OptimizationSuggestions {
                skills: SkillsSuggestions {
                    original: resume.sections.skills.clone(),
                    ..Default::default()
                },
                ..Default::default()
            })
        }
    }

    /// Minimal in-memory DOCX: enough for the extractor to produce real text.
    fn resume_docx() -> Vec<u8> {
        let xml = r#"<?xml version="1.0"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body><w:p><w:r><w:t>Experienced software engineer. Skills: Python, Go.</w:t></w:r></w:p></w:body></w:document>"#;
        let mut cursor = std::io::Cursor::new(Vec::new());
        {
            let mut zip = zip::ZipWriter::new(&mut cursor);
            let options = zip::write::SimpleFileOptions::default();
            zip.start_file("word/document.xml", options).unwrap();
            zip.write_all(xml.as_bytes()).unwrap();
            zip.finish().unwrap();
        }
        cursor.into_inner()
    }

    const JD: &str = "We require Python and Kubernetes experience.";
    const MAX: usize = 5 * 1024 * 1024;

    #[tokio::test]
    async fn test_full_run_produces_complete_result() {
        let ai = RecordingAi {
            compatibility: CompatibilityAnalysis {
                overall_compatibility_score: 72,
                explanation: "Good skills overlap".to_string(),
                keyword_matches: KeywordMatches {
                    matched: vec!["Python".to_string()],
                    missing: vec!["Kubernetes".to_string()],
                },
                ..Default::default()
            },
            ..Default::default()
        };

        let result = analyze(&ai, &resume_docx(), FileType::Docx, JD, MAX)
            .await
            .unwrap();

        // Scenario A: matched includes Python, missing includes Kubernetes
        assert!(result
            .keyword_matches
            .matched
            .contains(&"Python".to_string()));
        assert!(result
            .keyword_matches
            .missing
            .contains(&"Kubernetes".to_string()));

        assert_eq!(result.compatibility.score, 72);
        assert_eq!(result.compatibility.explanation, "Good skills overlap");
        assert!(result.resume_data.text.contains("Experienced software"));
        assert_eq!(result.job_data.text, JD);
        // optimization.skills.original comes from the parsed resume
        assert_eq!(result.optimization.skills.original, vec!["Python", "Go"]);

        let calls = ai.calls();
        assert_eq!(calls.len(), 4, "all four AI operations ran exactly once");
        for op in [
            "parse_resume",
            "analyze_job_description",
            "analyze_compatibility",
            "optimize_content",
        ] {
            assert!(calls.contains(&op), "missing AI operation {op}");
        }
    }

    #[tokio::test]
    async fn test_compatibility_waits_for_both_parallel_calls() {
        // Delay parse_resume so analyze_job_description finishes first; the
        // compatibility call must still come after BOTH are recorded.
        let ai = RecordingAi {
            parse_resume_delay: Some(Duration::from_millis(50)),
            ..Default::default()
        };

        analyze(&ai, &resume_docx(), FileType::Docx, JD, MAX)
            .await
            .unwrap();

        let calls = ai.calls();
        let compat_pos = calls
            .iter()
            .position(|c| *c == "analyze_compatibility")
            .unwrap();
        let parse_pos = calls.iter().position(|c| *c == "parse_resume").unwrap();
        let jd_pos = calls
            .iter()
            .position(|c| *c == "analyze_job_description")
            .unwrap();
        assert!(parse_pos < compat_pos);
        assert!(jd_pos < compat_pos);
        // And the delayed call really did settle second
        assert!(jd_pos < parse_pos);

        let optimize_pos = calls.iter().position(|c| *c == "optimize_content").unwrap();
        assert!(compat_pos < optimize_pos);
    }

    #[tokio::test]
    async fn test_empty_job_description_fails_before_any_ai_call() {
        let ai = RecordingAi::default();
        let err = analyze(&ai, &resume_docx(), FileType::Docx, "   \n ", MAX)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(ai.calls().is_empty(), "no AI call may be attempted");
    }

    #[tokio::test]
    async fn test_oversized_file_fails_before_extraction() {
        let ai = RecordingAi::default();
        let err = analyze(&ai, &resume_docx(), FileType::Docx, JD, 10)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(ai.calls().is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_file_aborts_with_no_ai_calls() {
        let ai = RecordingAi::default();
        let err = analyze(&ai, b"not a zip archive", FileType::Docx, JD, MAX)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Extraction(_)));
        assert!(ai.calls().is_empty());
    }

    #[tokio::test]
    async fn test_job_analysis_failure_skips_later_steps() {
        // Scenario D: JD analysis fails → compatibility and optimization never run
        let ai = RecordingAi {
            fail_job_analysis: true,
            // Slow down parse_resume so the JD failure settles first; try_join!
            // must still abort without invoking the dependent steps.
            parse_resume_delay: Some(Duration::from_millis(50)),
            ..Default::default()
        };

        let err = analyze(&ai, &resume_docx(), FileType::Docx, JD, MAX)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::AiCall(_)));

        let calls = ai.calls();
        assert!(!calls.contains(&"analyze_compatibility"));
        assert!(!calls.contains(&"optimize_content"));
    }

    #[tokio::test]
    async fn test_fully_defaulted_responses_still_yield_complete_result() {
        // Scenario E: all AI responses are empty objects — every field is
        // still present and type-correct.
        let ai = RecordingAi {
            compatibility: CompatibilityAnalysis::default(),
            ..Default::default()
        };

        let result = analyze(&ai, &resume_docx(), FileType::Docx, JD, MAX)
            .await
            .unwrap();

        assert_eq!(result.compatibility.score, 0);
        assert_eq!(result.compatibility.explanation, "");
        assert!(result.formatting_issues.is_empty());
        assert!(result.section_suggestions.is_empty());
        assert!(result.optimization.education.suggestions.is_none());

        // The serialized form exposes every result field
        let json = serde_json::to_value(&result).unwrap();
        for field in [
            "resumeData",
            "jobData",
            "compatibility",
            "keywordMatches",
            "experienceAlignment",
            "educationAlignment",
            "formattingIssues",
            "sectionSuggestions",
            "optimization",
        ] {
            assert!(json.get(field).is_some(), "missing field {field}");
        }
    }
}
