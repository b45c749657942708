use crate::catalog::{ExperienceLevel, Role};
use crate::evaluation::{self, Evaluation, Report, ResponseBreakdown};
use crate::interviewer::{Interviewer, QuestionContext};
use chrono::{DateTime, Utc};

pub const DEFAULT_DURATION_MINUTES: u32 = 5;
/// How many of the latest asked questions a new question must differ from.
pub const RECENT_QUESTION_WINDOW: usize = 3;
pub const FEEDBACK_FALLBACK: &str =
    "Good effort, but try to be more specific and closer to what the question is actually asking.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedAnswer {
    pub question: String,
    pub answer: String,
}

/// One candidate's interview, from start until the report is produced.
#[derive(Debug)]
pub struct InterviewSession {
    pub id: String,
    pub role: &'static Role,
    pub experience: &'static ExperienceLevel,
    pub candidate_name: String,
    pub duration_minutes: u32,
    /// Only ever incremented.
    pub question_count: u32,
    pub covered_topics: Vec<String>,
    /// The browser's own record of what it has asked, replaced on every fetch.
    pub asked_questions: Vec<String>,
    /// Appended in arrival order.
    pub answers: Vec<SavedAnswer>,
    pub started_at: DateTime<Utc>,
}

impl InterviewSession {
    pub fn new(
        role: &'static Role,
        experience: &'static ExperienceLevel,
        candidate_name: &str,
        duration_minutes: u32,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role,
            experience,
            candidate_name: candidate_name.trim().to_string(),
            duration_minutes,
            question_count: 0,
            covered_topics: Vec::new(),
            asked_questions: Vec::new(),
            answers: Vec::new(),
            started_at: Utc::now(),
        }
    }

    pub fn intro_text(&self) -> String {
        let greeting = if self.candidate_name.is_empty() {
            "Welcome!".to_string()
        } else {
            format!("Welcome, {}!", self.candidate_name)
        };
        format!(
            "{greeting} This is your {}-minute {} interview at {}. I'll ask questions, you answer using your voice. Use headphones to avoid echo. Let's begin!",
            self.duration_minutes, self.role.name, self.experience.name
        )
    }

    pub fn opening_question(&self) -> String {
        format!(
            "Tell me about yourself and your experience as a {}.",
            self.role.name
        )
    }

    /// Advances to the next question and returns `(question_number, text)`.
    ///
    /// The first question is fixed. Later questions come from the model and
    /// fall back to a templated question when the model fails or repeats one
    /// of the recently asked questions.
    pub async fn next_question<I>(
        &mut self,
        interviewer: &I,
        asked_questions: Vec<String>,
    ) -> (u32, String)
    where
        I: Interviewer + ?Sized,
    {
        self.question_count += 1;
        self.asked_questions = asked_questions;
        self.track_covered_topic();

        let question_num = self.question_count;
        if question_num == 1 {
            return (question_num, self.opening_question());
        }

        let context = QuestionContext {
            role: self.role,
            experience: self.experience,
            question_num,
            available_topics: self.available_topics(),
            covered_topics: self.covered_topics.clone(),
            asked_questions: self.asked_questions.clone(),
        };

        let question = match interviewer.generate_question(&context).await {
            Ok(question) if question.trim().is_empty() => {
                tracing::warn!(session = %self.id, "model returned an empty question");
                None
            }
            Ok(question) if !is_novel(&question, self.recent_questions()) => {
                tracing::warn!(session = %self.id, %question, "model repeated a recent question");
                None
            }
            Ok(question) => Some(question),
            Err(e) => {
                tracing::error!(session = %self.id, "question generation failed: {e:#}");
                None
            }
        };

        let question = question.unwrap_or_else(|| {
            fallback_question(
                &context.available_topics,
                self.role.topics,
                self.recent_questions(),
            )
        });
        (question_num, question)
    }

    pub fn record_answer(&mut self, question: String, answer: String) {
        self.answers.push(SavedAnswer { question, answer });
    }

    /// Short spoken reaction to an answer.
    pub async fn conversational_response<I>(
        &self,
        interviewer: &I,
        answer: &str,
        question_num: u32,
    ) -> String
    where
        I: Interviewer + ?Sized,
    {
        match interviewer
            .conversational_feedback(answer, question_num, &self.candidate_name)
            .await
        {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => FEEDBACK_FALLBACK.to_string(),
            Err(e) => {
                tracing::error!(session = %self.id, "conversational feedback failed: {e:#}");
                FEEDBACK_FALLBACK.to_string()
            }
        }
    }

    /// Scores every saved answer and writes the final report.
    ///
    /// Empty answers score zero without a model call; failed evaluations get
    /// the neutral score, so one bad answer never blocks the report.
    pub async fn build_report<I>(&self, interviewer: &I) -> Report
    where
        I: Interviewer + ?Sized,
    {
        let mut responses = Vec::with_capacity(self.answers.len());

        for saved in &self.answers {
            if evaluation::is_empty_answer(&saved.answer) {
                responses.push(ResponseBreakdown::empty(saved.question.clone()));
                continue;
            }
            let evaluation = match interviewer
                .evaluate_answer(&saved.question, &saved.answer, self.role.name)
                .await
            {
                Ok(evaluation) => evaluation,
                Err(e) => {
                    tracing::error!(session = %self.id, "evaluation failed: {e:#}");
                    Evaluation::fallback()
                }
            };
            responses.push(ResponseBreakdown::evaluated(
                saved.question.clone(),
                saved.answer.clone(),
                evaluation,
            ));
        }

        let scores = responses.iter().map(|r| r.score).collect::<Vec<_>>();
        let avg_score = evaluation::average_score(&scores);

        let final_feedback = if responses.is_empty() {
            evaluation::NO_RESPONSES_FEEDBACK.to_string()
        } else {
            match interviewer.final_report(self.role.name, &responses).await {
                Ok(text) if !text.trim().is_empty() => text,
                Ok(_) => evaluation::REPORT_FALLBACK.to_string(),
                Err(e) => {
                    tracing::error!(session = %self.id, "final report failed: {e:#}");
                    evaluation::REPORT_FALLBACK.to_string()
                }
            }
        };

        tracing::info!(
            session = %self.id,
            total = responses.len(),
            avg_score,
            "interview report ready"
        );

        Report {
            avg_score,
            total_questions: responses.len(),
            responses,
            final_feedback,
        }
    }

    /// Topics not yet covered, or every topic once all are covered.
    pub fn available_topics(&self) -> Vec<String> {
        let available = self
            .role
            .topics
            .iter()
            .filter(|topic| !self.covered_topics.iter().any(|c| c == *topic))
            .map(|topic| topic.to_string())
            .collect::<Vec<_>>();
        if available.is_empty() {
            self.role.topics.iter().map(|t| t.to_string()).collect()
        } else {
            available
        }
    }

    /// Covered topics are derived from the question number, not from the
    /// topic the model actually chose. Skipped or regenerated questions can
    /// drift from what was really asked; this is the historical behaviour.
    fn track_covered_topic(&mut self) {
        let topics = self.role.topics;
        let question_num = self.question_count as usize;
        if question_num > 1 && self.covered_topics.len() < topics.len() {
            let next_topic = topics[(question_num - 2) % topics.len()];
            if !self.covered_topics.iter().any(|t| t == next_topic) {
                self.covered_topics.push(next_topic.to_string());
            }
        }
    }

    fn recent_questions(&self) -> &[String] {
        let start = self
            .asked_questions
            .len()
            .saturating_sub(RECENT_QUESTION_WINDOW);
        &self.asked_questions[start..]
    }
}

fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// False when `question` matches one of `recent` ignoring case and spacing.
pub fn is_novel(question: &str, recent: &[String]) -> bool {
    let candidate = normalize(question);
    !recent.iter().any(|q| normalize(q) == candidate)
}

/// Deterministic question used when the model cannot provide one.
///
/// Prefers the available topics, then the rest of the role's topics, and
/// skips any templated question that would repeat a recent one.
pub fn fallback_question(available: &[String], all_topics: &[&str], recent: &[String]) -> String {
    let templated = available
        .iter()
        .map(String::as_str)
        .chain(all_topics.iter().copied())
        .map(|topic| format!("Can you describe your experience with {topic}?"));
    let generic = [
        "Can you describe your experience with this role?".to_string(),
        "Can you walk me through a recent challenge you solved at work?".to_string(),
        "What would you like to improve about how you work?".to_string(),
        "Which accomplishment are you most proud of, and why?".to_string(),
    ];

    templated
        .chain(generic)
        .find(|candidate| is_novel(candidate, recent))
        .unwrap_or_else(|| "Is there anything else you would like to tell me?".to_string())
}
