use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::MAX_SCORE;
use crate::error::InterviewError;
use crate::gateway::{ChatMessage, GatewayRequest, SharedGateway};
use crate::history::{AttemptRecord, AttemptStore};
use crate::session::SessionStatus;
use crate::track::Track;
use crate::transcript::Transcript;

pub const REPORT_INSTRUCTION: &str = r#"INTERVIEW_END. Generate a detailed final JSON report.
Structure required:
{
    "overallScore": number (0-10),
    "skillBreakdown": [ { "name": "Skill Name", "score": number (0-10), "feedback": "content" } ],
    "strengths": ["string"],
    "weaknesses": ["string"],
    "improvementPlan": "string (detailed paragraph)"
}
Return ONLY the JSON."#;

const REQUIRED_KEYS: [&str; 5] = [
    "overallScore",
    "skillBreakdown",
    "strengths",
    "weaknesses",
    "improvementPlan",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillScore {
    pub name: String,
    pub score: f64,
    pub feedback: String,
}

/// Competency report for one finished session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub overall_score: f64,
    pub skill_breakdown: Vec<SkillScore>,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub improvement_plan: String,
}

/// Transcript followed by the closing instruction, in report mode.
pub fn build_report_request(transcript: &Transcript, track: Track) -> GatewayRequest {
    let mut messages = transcript.to_messages();
    messages.push(ChatMessage::user(REPORT_INSTRUCTION));
    GatewayRequest::report(messages, track.id())
}

/// Parse and validate the model's report payload.
pub fn parse_report(raw: &str) -> Result<Report, InterviewError> {
    let value = parse_json_object(raw)?;

    let object = value
        .as_object()
        .ok_or_else(|| InterviewError::MalformedReport("report is not a JSON object".into()))?;
    if let Some(missing) = REQUIRED_KEYS.iter().find(|k| !object.contains_key(**k)) {
        return Err(InterviewError::MalformedReport(format!(
            "missing key '{}'",
            missing
        )));
    }

    let report: Report = serde_json::from_value(value)
        .map_err(|e| InterviewError::MalformedReport(e.to_string()))?;

    check_score("overallScore", report.overall_score)?;
    for skill in &report.skill_breakdown {
        check_score(&skill.name, skill.score)?;
    }

    Ok(report)
}

fn parse_json_object(raw: &str) -> Result<serde_json::Value, InterviewError> {
    let trimmed = raw.trim();

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        return Ok(value);
    }

    // Model wrapped the object in prose or code fences.
    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start < end {
            if let Ok(value) = serde_json::from_str(&trimmed[start..=end]) {
                return Ok(value);
            }
        }
    }

    Err(InterviewError::MalformedReport(
        "reply is not valid JSON".to_string(),
    ))
}

fn check_score(name: &str, score: f64) -> Result<(), InterviewError> {
    if score.is_finite() && (0.0..=MAX_SCORE).contains(&score) {
        Ok(())
    } else {
        Err(InterviewError::MalformedReport(format!(
            "score for '{}' out of range: {}",
            name, score
        )))
    }
}

/// Requests the closing report and records the attempt.
pub struct ReportGenerator {
    gateway: SharedGateway,
    store: Arc<AttemptStore>,
}

impl ReportGenerator {
    pub fn new(gateway: SharedGateway, store: Arc<AttemptStore>) -> Self {
        Self { gateway, store }
    }

    pub async fn generate(
        &self,
        transcript: &Transcript,
        track: Track,
        status: SessionStatus,
    ) -> Result<Report, InterviewError> {
        if !status.is_terminal() {
            return Err(InterviewError::InvalidTransition(
                "Report is only available once the interview has ended".to_string(),
            ));
        }

        info!("Generating {} report ({} turns)", track, transcript.len());
        let raw = self
            .gateway
            .reply(build_report_request(transcript, track))
            .await?;

        let report = match parse_report(&raw) {
            Ok(report) => report,
            Err(e) => {
                error!("Report generation failed: {}", e);
                return Err(e);
            }
        };

        let record = AttemptRecord::new(track.id(), report.overall_score, status.label());
        if let Err(e) = self.store.append(record) {
            warn!("Failed to save interview attempt: {}", e);
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::Turn;

    const SAMPLE: &str = r#"{"overallScore":7,"skillBreakdown":[{"name":"Algorithms","score":6,"feedback":"ok"}],"strengths":["clear communication"],"weaknesses":["depth"],"improvementPlan":"practice graphs"}"#;

    #[test]
    fn test_parse_sample_report() {
        let report = parse_report(SAMPLE).unwrap();
        assert_eq!(report.overall_score, 7.0);
        assert_eq!(
            report.skill_breakdown,
            vec![SkillScore {
                name: "Algorithms".into(),
                score: 6.0,
                feedback: "ok".into()
            }]
        );
        assert_eq!(report.strengths, vec!["clear communication"]);
        assert_eq!(report.weaknesses, vec!["depth"]);
        assert_eq!(report.improvement_plan, "practice graphs");
    }

    #[test]
    fn test_missing_overall_score_is_malformed() {
        let raw = r#"{"skillBreakdown":[],"strengths":[],"weaknesses":[],"improvementPlan":"x"}"#;
        match parse_report(raw) {
            Err(InterviewError::MalformedReport(msg)) => assert!(msg.contains("overallScore")),
            other => panic!("expected MalformedReport, got {:?}", other),
        }
    }

    #[test]
    fn test_unparseable_reply_is_malformed() {
        assert!(matches!(
            parse_report("Score: 7/10, nice job"),
            Err(InterviewError::MalformedReport(_))
        ));
    }

    #[test]
    fn test_out_of_range_score_is_malformed() {
        let raw = SAMPLE.replace("\"overallScore\":7", "\"overallScore\":12");
        assert!(parse_report(&raw).is_err());
    }

    #[test]
    fn test_wrong_type_is_malformed() {
        let raw = SAMPLE.replace("\"practice graphs\"", "42");
        assert!(matches!(
            parse_report(&raw),
            Err(InterviewError::MalformedReport(_))
        ));
    }

    #[test]
    fn test_fenced_object_is_accepted() {
        let raw = format!("```json\n{}\n```", SAMPLE);
        assert_eq!(parse_report(&raw).unwrap().overall_score, 7.0);
    }

    #[test]
    fn test_report_request_appends_instruction_in_json_mode() {
        let mut transcript = Transcript::new();
        transcript.push(Turn::interviewer("q")).unwrap();
        transcript.push(Turn::candidate("a")).unwrap();

        let request = build_report_request(&transcript, Track::Backend);
        assert!(request.is_json_mode());
        assert_eq!(request.role.as_deref(), Some("backend"));
        assert_eq!(request.messages.len(), 3);
        assert!(request.messages[2].content.starts_with("INTERVIEW_END."));
    }
}
