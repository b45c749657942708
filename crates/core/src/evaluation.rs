use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const MIN_SCORE: f64 = 1.0;
pub const MAX_SCORE: f64 = 10.0;
/// Score assigned when an answer could not be evaluated.
pub const NEUTRAL_SCORE: f64 = 5.0;
/// Placeholder the browser sends when the candidate skipped a question.
pub const NO_ANSWER_MARKER: &str = "[No answer provided]";

pub const NO_RESPONSES_FEEDBACK: &str = "No responses were recorded.";
pub const REPORT_FALLBACK: &str = "Could not generate detailed feedback.";

/// Scored feedback for a single answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub score: f64,
    pub suggestion: String,
}

impl Evaluation {
    /// Used when the model fails or returns something unparseable.
    pub fn fallback() -> Self {
        Self {
            strengths: vec!["Provided an answer".to_string()],
            weaknesses: vec!["Could not evaluate".to_string()],
            score: NEUTRAL_SCORE,
            suggestion: "Try to be more specific and structured in your response.".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct EvaluationPayload {
    #[serde(default)]
    strengths: Vec<String>,
    #[serde(default)]
    weaknesses: Vec<String>,
    score: Option<Value>,
    #[serde(default)]
    suggestion: String,
}

/// Parses the model's JSON evaluation.
///
/// Accepts output wrapped in a Markdown code fence, a single-element array,
/// and scores given as numbers or numeric strings. The score is clamped to
/// `MIN_SCORE..=MAX_SCORE`; a missing or non-numeric score is an error.
pub fn parse_evaluation(raw: &str) -> Result<Evaluation> {
    let body = strip_code_fence(raw);
    let value: Value = serde_json::from_str(body)
        .with_context(|| format!("Evaluation is not valid JSON: {raw}"))?;

    let value = match value {
        Value::Array(mut items) if !items.is_empty() => items.swap_remove(0),
        other => other,
    };

    let payload: EvaluationPayload =
        serde_json::from_value(value).context("Evaluation JSON has an unexpected shape")?;

    let score = match payload.score {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().trim_end_matches("/10").trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|s| s.is_finite())
    .context("Evaluation is missing a numeric score")?;

    Ok(Evaluation {
        strengths: payload.strengths,
        weaknesses: payload.weaknesses,
        score: score.clamp(MIN_SCORE, MAX_SCORE),
        suggestion: payload.suggestion,
    })
}

/// Removes a surrounding ```` ``` ```` / ```` ```json ```` fence if present.
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_suffix("```").unwrap_or(inner);
    // Drop the language tag on the opening line.
    match inner.find('\n') {
        Some(newline) if !inner[..newline].trim().contains(['{', '[']) => inner[newline + 1..].trim(),
        _ => inner.trim(),
    }
}

/// True for answers that must score zero without reaching the model.
pub fn is_empty_answer(answer: &str) -> bool {
    let answer = answer.trim();
    answer.is_empty() || answer == NO_ANSWER_MARKER
}

/// One row of the final report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseBreakdown {
    pub question: String,
    pub answer: String,
    pub score: f64,
    pub empty: bool,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub suggestion: String,
}

impl ResponseBreakdown {
    pub fn empty(question: String) -> Self {
        Self {
            question,
            answer: NO_ANSWER_MARKER.to_string(),
            score: 0.0,
            empty: true,
            strengths: Vec::new(),
            weaknesses: Vec::new(),
            suggestion: String::new(),
        }
    }

    pub fn evaluated(question: String, answer: String, evaluation: Evaluation) -> Self {
        Self {
            question,
            answer,
            score: evaluation.score,
            empty: false,
            strengths: evaluation.strengths,
            weaknesses: evaluation.weaknesses,
            suggestion: evaluation.suggestion,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub avg_score: f64,
    pub total_questions: usize,
    pub responses: Vec<ResponseBreakdown>,
    pub final_feedback: String,
}

/// Arithmetic mean rounded to one decimal; 0.0 for no scores.
pub fn average_score(scores: &[f64]) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }
    let mean = scores.iter().sum::<f64>() / scores.len() as f64;
    (mean * 10.0).round() / 10.0
}

/// Formats the evaluated transcript for the report prompt.
pub fn transcript_summary(responses: &[ResponseBreakdown]) -> String {
    responses
        .iter()
        .map(|r| format!("Q: {}\nA: {}\nScore: {}/10", r.question, r.answer, r.score))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Strips Markdown emphasis and heading markers the model tends to emit.
pub fn strip_markdown(text: &str) -> String {
    ["**", "*", "###", "##", "#"]
        .iter()
        .fold(text.to_string(), |acc, marker| acc.replace(marker, ""))
}
