use crate::catalog::{ExperienceLevel, Role};
use crate::evaluation::{self, Evaluation, ResponseBreakdown};
use crate::prompts::{PromptKind, PromptSet};
use anyhow::{Context, Result};
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;

/// Everything the model needs to pick the next question.
#[derive(Debug, Clone)]
pub struct QuestionContext {
    pub role: &'static Role,
    pub experience: &'static ExperienceLevel,
    pub question_num: u32,
    pub available_topics: Vec<String>,
    pub covered_topics: Vec<String>,
    pub asked_questions: Vec<String>,
}

// The interview flow depends on this trait rather than on a concrete HTTP
// client, so the session logic can be driven by `MockInterviewer` in tests
// and the provider can change without touching the handlers.
//
// Every method may fail; callers decide on the fallback content.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Interviewer: Send + Sync {
    async fn generate_question(&self, context: &QuestionContext) -> Result<String>;

    async fn evaluate_answer(&self, question: &str, answer: &str, role_name: &str)
    -> Result<Evaluation>;

    async fn conversational_feedback(
        &self,
        answer: &str,
        question_num: u32,
        candidate_name: &str,
    ) -> Result<String>;

    async fn final_report(&self, role_name: &str, responses: &[ResponseBreakdown])
    -> Result<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatProvider {
    OpenAi,
    Gemini,
}

impl ChatProvider {
    pub fn default_model(self) -> &'static str {
        match self {
            ChatProvider::OpenAi => "gpt-4o-mini",
            ChatProvider::Gemini => "gemini-2.5-flash-lite",
        }
    }

    pub fn default_base_url(self) -> &'static str {
        match self {
            ChatProvider::OpenAi => "https://api.openai.com/v1",
            ChatProvider::Gemini => "https://generativelanguage.googleapis.com/v1beta",
        }
    }
}

/// Connection settings for the chat model.
#[derive(Debug)]
pub struct ChatSettings {
    provider: ChatProvider,
    api_key: SecretString,
    model: String,
    base_url: String,
}

impl ChatSettings {
    pub fn new(provider: ChatProvider, api_key: SecretString) -> Self {
        Self {
            provider,
            api_key,
            model: provider.default_model().to_string(),
            base_url: provider.default_base_url().to_string(),
        }
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn provider(&self) -> ChatProvider {
        self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResponseFormat {
    Text,
    Json,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    text: Option<String>,
}

/// `Interviewer` backed by a hosted chat model.
pub struct InterviewerClient {
    client: Client,
    settings: ChatSettings,
    prompts: PromptSet,
}

impl InterviewerClient {
    pub fn new(settings: ChatSettings, prompts: PromptSet) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build HTTP client for the chat model")?;
        Ok(Self {
            client,
            settings,
            prompts,
        })
    }

    async fn complete(&self, prompt: &str, format: ResponseFormat, temperature: f32) -> Result<String> {
        tracing::debug!(
            provider = ?self.settings.provider,
            model = %self.settings.model,
            chars = prompt.len(),
            "sending prompt"
        );
        let text = match self.settings.provider {
            ChatProvider::OpenAi => self.complete_openai(prompt, format, temperature).await?,
            ChatProvider::Gemini => self.complete_gemini(prompt, format, temperature).await?,
        };
        if text.trim().is_empty() {
            anyhow::bail!("Model returned an empty response");
        }
        Ok(text)
    }

    async fn complete_openai(
        &self,
        prompt: &str,
        format: ResponseFormat,
        temperature: f32,
    ) -> Result<String> {
        let mut body = serde_json::json!({
            "model": self.settings.model,
            "messages": [
                { "role": "user", "content": prompt }
            ],
            "temperature": temperature
        });
        if format == ResponseFormat::Json {
            body["response_format"] = serde_json::json!({ "type": "json_object" });
        }

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.settings.base_url))
            .bearer_auth(self.settings.api_key.expose_secret())
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json::<ChatCompletionResponse>()
            .await?;

        resp.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| anyhow::anyhow!("No response from LLM"))
    }

    async fn complete_gemini(
        &self,
        prompt: &str,
        format: ResponseFormat,
        temperature: f32,
    ) -> Result<String> {
        let mut generation_config = serde_json::json!({ "temperature": temperature });
        if format == ResponseFormat::Json {
            generation_config["responseMimeType"] = serde_json::json!("application/json");
        }
        let body = serde_json::json!({
            "contents": [
                { "role": "user", "parts": [ { "text": prompt } ] }
            ],
            "generationConfig": generation_config
        });

        let resp = self
            .client
            .post(format!(
                "{}/models/{}:generateContent",
                self.settings.base_url, self.settings.model
            ))
            .header("x-goog-api-key", self.settings.api_key.expose_secret())
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json::<GenerateContentResponse>()
            .await?;

        let text = resp
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect::<String>()
            })
            .ok_or_else(|| anyhow::anyhow!("No response from LLM"))?;
        Ok(text)
    }
}

/// Trims the model's reply and removes quote characters wrapped around it.
pub fn clean_question(raw: &str) -> String {
    raw.trim()
        .trim_matches('"')
        .trim_matches('\'')
        .trim()
        .to_string()
}

fn question_prompt(prompts: &PromptSet, context: &QuestionContext) -> String {
    let available = context
        .available_topics
        .iter()
        .take(5)
        .cloned()
        .collect::<Vec<_>>()
        .join(", ");

    let previous_context = if context.covered_topics.is_empty() {
        String::new()
    } else {
        format!(
            "\nPrevious topics covered: {}\nAVOID repeating these topics. Choose a DIFFERENT topic from the available list.",
            context.covered_topics.join(", ")
        )
    };

    let asked_context = if context.asked_questions.len() > 1 {
        let start = context.asked_questions.len().saturating_sub(3);
        let recent = context.asked_questions[start..]
            .iter()
            .map(|q| format!("- {q}"))
            .collect::<Vec<_>>()
            .join("\n");
        format!(
            "\n\nPreviously asked questions:\n{recent}\n\nIMPORTANT: Generate a COMPLETELY DIFFERENT question. Do NOT ask similar or related questions. Choose a NEW topic and angle."
        )
    } else {
        String::new()
    };

    let question_num = context.question_num.to_string();
    prompts.render(
        PromptKind::Question,
        &[
            ("role_name", context.role.name),
            ("experience_name", context.experience.name),
            ("focus", context.role.focus),
            ("available_topics", &available),
            ("difficulty", context.experience.difficulty),
            ("question_num", &question_num),
            ("previous_context", &previous_context),
            ("asked_context", &asked_context),
        ],
    )
}

fn name_instruction(candidate_name: &str) -> String {
    let name = candidate_name.trim();
    if name.is_empty() {
        "You don't need to mention the candidate's name.".to_string()
    } else {
        format!(
            "The candidate's name is {name}. You may use their name ONCE at the beginning if it feels natural, but avoid repeating it."
        )
    }
}

#[async_trait]
impl Interviewer for InterviewerClient {
    async fn generate_question(&self, context: &QuestionContext) -> Result<String> {
        let prompt = question_prompt(&self.prompts, context);
        let raw = self.complete(&prompt, ResponseFormat::Text, 0.9).await?;
        Ok(clean_question(&raw))
    }

    async fn evaluate_answer(
        &self,
        question: &str,
        answer: &str,
        role_name: &str,
    ) -> Result<Evaluation> {
        let prompt = self.prompts.render(
            PromptKind::Evaluation,
            &[
                ("role_name", role_name),
                ("question", question),
                ("answer", answer),
            ],
        );
        let raw = self.complete(&prompt, ResponseFormat::Json, 0.2).await?;
        evaluation::parse_evaluation(&raw)
    }

    async fn conversational_feedback(
        &self,
        answer: &str,
        question_num: u32,
        candidate_name: &str,
    ) -> Result<String> {
        let question_num = question_num.to_string();
        let name_instruction = name_instruction(candidate_name);
        let prompt = self.prompts.render(
            PromptKind::Feedback,
            &[
                ("answer", answer),
                ("question_num", &question_num),
                ("name_instruction", &name_instruction),
            ],
        );
        let raw = self.complete(&prompt, ResponseFormat::Text, 0.7).await?;
        Ok(clean_question(&raw))
    }

    async fn final_report(
        &self,
        role_name: &str,
        responses: &[ResponseBreakdown],
    ) -> Result<String> {
        let summary = evaluation::transcript_summary(responses);
        let prompt = self.prompts.render(
            PromptKind::Report,
            &[("role_name", role_name), ("summary", &summary)],
        );
        let raw = self.complete(&prompt, ResponseFormat::Text, 0.4).await?;
        Ok(evaluation::strip_markdown(&raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog;
    use std::env;

    fn context(question_num: u32, asked: &[&str], covered: &[&str]) -> QuestionContext {
        let role = catalog::role("1").unwrap();
        QuestionContext {
            role,
            experience: catalog::experience_level("2").unwrap(),
            question_num,
            available_topics: role.topics.iter().map(|t| t.to_string()).collect(),
            covered_topics: covered.iter().map(|t| t.to_string()).collect(),
            asked_questions: asked.iter().map(|q| q.to_string()).collect(),
        }
    }

    #[test]
    fn clean_question_strips_wrapping_quotes() {
        assert_eq!(clean_question("  \"How do you debug?\"\n"), "How do you debug?");
        assert_eq!(clean_question("'Why REST?'"), "Why REST?");
        assert_eq!(clean_question("Plain question?"), "Plain question?");
    }

    #[test]
    fn question_prompt_lists_five_topics_and_recent_questions() {
        let prompt = question_prompt(
            &PromptSet::default(),
            &context(5, &["Q1", "Q2", "Q3", "Q4"], &["data structures and algorithms"]),
        );

        assert!(prompt.contains("Software Engineer interview for a Mid-Level candidate"));
        assert!(prompt.contains("This is question #5 of the interview."));
        assert!(prompt.contains("code optimization and performance"));
        assert!(!prompt.contains("version control and Git"), "only five topics are offered");
        assert!(prompt.contains("Previous topics covered: data structures and algorithms"));
        assert!(prompt.contains("- Q2\n- Q3\n- Q4"));
        assert!(!prompt.contains("- Q1"));
    }

    #[test]
    fn question_prompt_omits_history_sections_when_empty() {
        let prompt = question_prompt(&PromptSet::default(), &context(2, &["Q1"], &[]));
        assert!(!prompt.contains("Previous topics covered"));
        assert!(!prompt.contains("Previously asked questions"));
    }

    #[test]
    fn name_instruction_depends_on_name() {
        assert!(name_instruction("Asha").contains("The candidate's name is Asha."));
        assert_eq!(
            name_instruction("  "),
            "You don't need to mention the candidate's name."
        );
    }

    #[test]
    fn settings_defaults_follow_provider() {
        let settings = ChatSettings::new(ChatProvider::Gemini, SecretString::from("k".to_string()));
        assert_eq!(settings.model(), "gemini-2.5-flash-lite");
        let settings = ChatSettings::new(ChatProvider::OpenAi, SecretString::from("k".to_string()))
            .with_model("gpt-4o")
            .with_base_url("http://localhost:8080/v1/");
        assert_eq!(settings.model(), "gpt-4o");
        assert_eq!(settings.base_url, "http://localhost:8080/v1");
    }

    // Live call against the Gemini API. Run with `cargo test -- --ignored`.
    #[tokio::test]
    #[ignore]
    async fn live_gemini_question_and_evaluation() {
        dotenvy::dotenv_override().ok();
        let api_key = env::var("GEMINI_API_KEY").expect("GEMINI_API_KEY not set");
        let settings = ChatSettings::new(ChatProvider::Gemini, SecretString::from(api_key));
        let client = InterviewerClient::new(settings, PromptSet::default()).unwrap();

        let question = client
            .generate_question(&context(2, &["Tell me about yourself."], &[]))
            .await
            .expect("question generation failed");
        println!("Question: {question}");
        assert!(!question.is_empty());

        let evaluation = client
            .evaluate_answer(
                &question,
                "I would profile first, then optimise the hot path and add a regression benchmark.",
                "Software Engineer",
            )
            .await
            .expect("evaluation failed");
        println!("Evaluation: {evaluation:?}");
        assert!((1.0..=10.0).contains(&evaluation.score));
    }

    // Live call against the OpenAI API. Run with `cargo test -- --ignored`.
    #[tokio::test]
    #[ignore]
    async fn live_openai_final_report() {
        dotenvy::dotenv_override().ok();
        let api_key = env::var("OPENAI_API_KEY").expect("OPENAI_API_KEY not set");
        let settings = ChatSettings::new(ChatProvider::OpenAi, SecretString::from(api_key));
        let client = InterviewerClient::new(settings, PromptSet::default()).unwrap();

        let responses = vec![ResponseBreakdown::evaluated(
            "How do you handle merge conflicts?".to_string(),
            "I rebase often and talk to the other author before resolving.".to_string(),
            Evaluation { score: 7.0, ..Evaluation::fallback() },
        )];
        let report = client
            .final_report("Software Engineer", &responses)
            .await
            .expect("report failed");
        println!("Report:\n{report}");
        assert!(!report.contains("**"));
    }
}
