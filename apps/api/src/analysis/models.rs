//! Typed records for the compatibility analysis pipeline.
//!
//! These are the shapes that flow between pipeline steps and out to clients.
//! Every array/score/string field carries a serde default so a partially
//! populated AI response still deserializes into a fully shaped value —
//! callers never need to null-check. Wire names are camelCase.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Resume sections extracted by the AI resume parser.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResumeSections {
    pub experience: Vec<String>,
    pub education: Vec<String>,
    pub skills: Vec<String>,
}

/// The parsed resume: raw extracted text plus AI-derived sections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResumeData {
    pub text: String,
    pub sections: ResumeSections,
}

/// Job requirements extracted by the AI job-description analyzer.
/// Same shape as `ResumeSections`, semantically "required" rather than
/// "possessed".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobRequirements {
    pub experience: Vec<String>,
    pub education: Vec<String>,
    pub skills: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobDescriptionData {
    pub text: String,
    pub requirements: JobRequirements,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordMatches {
    pub matched: Vec<String>,
    pub missing: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExperienceAlignment {
    pub score: u8,
    pub matched_responsibilities: Vec<String>,
    pub unmatched_responsibilities: Vec<String>,
    pub improvement_suggestions: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EducationAlignment {
    pub score: u8,
    pub matches: Vec<String>,
    pub gaps: Vec<String>,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormattingAnalysis {
    pub issues: Vec<String>,
}

/// Full structured output of the compatibility step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CompatibilityAnalysis {
    pub overall_compatibility_score: u8,
    pub explanation: String,
    pub keyword_matches: KeywordMatches,
    pub experience_alignment: ExperienceAlignment,
    pub education_alignment: EducationAlignment,
    pub formatting_analysis: FormattingAnalysis,
    /// Section name → suggestion strings. BTreeMap keeps serialization stable.
    pub section_suggestions: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillsSuggestions {
    /// The skills as parsed from the resume — filled from `ResumeData`, not
    /// from model output.
    pub original: Vec<String>,
    pub improved: Vec<String>,
    pub explanation: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EducationSuggestions {
    pub needs_changes: bool,
    /// Only meaningful when `needs_changes` is true; normalized to `None`
    /// otherwise at the AI-client boundary.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<Vec<String>>,
}

/// Improvement content keyed by resume section, from the optimization step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OptimizationSuggestions {
    pub experience: Vec<String>,
    pub skills: SkillsSuggestions,
    pub education: EducationSuggestions,
    pub formatting_improvements: Vec<String>,
}

/// Overall compatibility verdict: score plus the model's explanation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Compatibility {
    pub score: u8,
    pub explanation: String,
}

/// The top-level result of one analysis run. Immutable after creation;
/// identified by the opaque session id under which it is persisted. A
/// re-analysis produces a new result, never a mutation of this one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub resume_data: ResumeData,
    pub job_data: JobDescriptionData,
    pub compatibility: Compatibility,
    pub keyword_matches: KeywordMatches,
    pub experience_alignment: ExperienceAlignment,
    pub education_alignment: EducationAlignment,
    pub formatting_issues: Vec<String>,
    pub section_suggestions: BTreeMap<String, Vec<String>>,
    pub optimization: OptimizationSuggestions,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sections_default_to_empty_arrays() {
        let data: ResumeData = serde_json::from_str("{}").unwrap();
        assert!(data.text.is_empty());
        assert!(data.sections.experience.is_empty());
        assert!(data.sections.education.is_empty());
        assert!(data.sections.skills.is_empty());
    }

    #[test]
    fn test_compatibility_analysis_defaults_from_empty_object() {
        let c: CompatibilityAnalysis = serde_json::from_str("{}").unwrap();
        assert_eq!(c.overall_compatibility_score, 0);
        assert_eq!(c.explanation, "");
        assert!(c.keyword_matches.matched.is_empty());
        assert!(c.experience_alignment.improvement_suggestions.is_empty());
        assert!(c.section_suggestions.is_empty());
    }

    #[test]
    fn test_compatibility_analysis_wire_names_are_camel_case() {
        let json = r#"{
            "overallCompatibilityScore": 82,
            "keywordMatches": {"matched": ["Python"], "missing": ["Kubernetes"]},
            "experienceAlignment": {
                "score": 70,
                "matchedResponsibilities": ["Built services"],
                "unmatchedResponsibilities": ["Led a team"],
                "improvementSuggestions": ["Mention leadership"]
            },
            "educationAlignment": {"score": 90, "matches": ["BSc"], "gaps": [], "suggestions": []},
            "formattingAnalysis": {"issues": ["Inconsistent dates"]},
            "sectionSuggestions": {"experience": ["Quantify impact"]}
        }"#;
        let c: CompatibilityAnalysis = serde_json::from_str(json).unwrap();
        assert_eq!(c.overall_compatibility_score, 82);
        assert_eq!(c.keyword_matches.matched, vec!["Python"]);
        assert_eq!(c.keyword_matches.missing, vec!["Kubernetes"]);
        assert_eq!(c.experience_alignment.matched_responsibilities.len(), 1);
        assert_eq!(c.formatting_analysis.issues.len(), 1);
        assert_eq!(c.section_suggestions["experience"], vec!["Quantify impact"]);
    }

    #[test]
    fn test_education_suggestions_omitted_when_none() {
        let e = EducationSuggestions {
            needs_changes: false,
            suggestions: None,
        };
        let json = serde_json::to_value(&e).unwrap();
        assert!(json.get("suggestions").is_none());
        assert_eq!(json["needsChanges"], false);
    }

    #[test]
    fn test_defaulted_round_trip_is_stable() {
        // parse-then-serialize of a fully defaulted response is idempotent
        let a: OptimizationSuggestions = serde_json::from_str("{}").unwrap();
        let json = serde_json::to_string(&a).unwrap();
        let b: OptimizationSuggestions = serde_json::from_str(&json).unwrap();
        assert_eq!(a, b);

        let c: CompatibilityAnalysis = serde_json::from_str("{}").unwrap();
        let json = serde_json::to_string(&c).unwrap();
        let d: CompatibilityAnalysis = serde_json::from_str(&json).unwrap();
        assert_eq!(c, d);
    }

    #[test]
    fn test_analysis_result_serializes_camel_case() {
        let result = AnalysisResult {
            resume_data: ResumeData::default(),
            job_data: JobDescriptionData::default(),
            compatibility: Compatibility {
                score: 50,
                explanation: "ok".to_string(),
            },
            keyword_matches: KeywordMatches::default(),
            experience_alignment: ExperienceAlignment::default(),
            education_alignment: EducationAlignment::default(),
            formatting_issues: vec![],
            section_suggestions: BTreeMap::new(),
            optimization: OptimizationSuggestions::default(),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("resumeData").is_some());
        assert!(json.get("jobData").is_some());
        assert!(json.get("keywordMatches").is_some());
        assert!(json.get("formattingIssues").is_some());
        assert!(json.get("sectionSuggestions").is_some());
    }
}
