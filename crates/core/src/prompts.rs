//! Prompt templates for the interviewer model.
//!
//! Templates use `{name}` placeholders. Anything in braces that is not a
//! known placeholder (such as the JSON example in the evaluation prompt) is
//! left untouched by [`render_prompt`].

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptKind {
    Question,
    Evaluation,
    Feedback,
    Report,
}

impl PromptKind {
    pub const ALL: [PromptKind; 4] = [
        PromptKind::Question,
        PromptKind::Evaluation,
        PromptKind::Feedback,
        PromptKind::Report,
    ];

    /// File stem used for overrides in the prompts directory.
    pub fn key(self) -> &'static str {
        match self {
            PromptKind::Question => "question",
            PromptKind::Evaluation => "evaluation",
            PromptKind::Feedback => "feedback",
            PromptKind::Report => "report",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.key() == key)
    }

    fn default_template(self) -> &'static str {
        match self {
            PromptKind::Question => QUESTION_PROMPT,
            PromptKind::Evaluation => EVALUATION_PROMPT,
            PromptKind::Feedback => FEEDBACK_PROMPT,
            PromptKind::Report => REPORT_PROMPT,
        }
    }
}

const QUESTION_PROMPT: &str = r#"You are an experienced interviewer conducting a {role_name} interview for a {experience_name} candidate.

Focus areas: {focus}
Available topics: {available_topics}
Experience level: {experience_name}
Question difficulty: {difficulty}
This is question #{question_num} of the interview.{previous_context}{asked_context}

Generate ONE interview question that:
1. Is appropriate for {experience_name} level ({difficulty})
2. Is relevant to the {role_name} role
3. Covers ONE of the available topics (pick a DIFFERENT one each time)
4. Is clear, direct, and specific
5. Would be asked in a real interview
6. Is COMPLETELY UNIQUE - must be different from all previously asked questions
7. Explores a NEW aspect or angle of the role

CRITICAL: Ensure maximum diversity. Each question should feel fresh and cover different ground.

Return ONLY the question, nothing else. Keep it natural and conversational."#;

const EVALUATION_PROMPT: &str = r#"You are an expert interview coach evaluating a candidate's response for a {role_name} position.

Question: {question}
Answer: {answer}

Provide a brief evaluation in JSON format:
{
    "strengths": ["strength1", "strength2"],
    "weaknesses": ["weakness1", "weakness2"],
    "score": 7,
    "suggestion": "one specific improvement tip"
}

Score from 1-10. Be constructive but honest."#;

const FEEDBACK_PROMPT: &str = r#"You are a realistic but kind interview coach.

The candidate just answered:
"""{answer}"""
This is question #{question_num}.

Your job:
- Be honest but not harsh.
- Always mix:
  - One short positive observation (what was good, even if small)
  - One short improvement point (what is missing or weak)
- If the answer is very off-topic, say clearly that they are far from the expected answer, but still stay respectful.
- DO NOT give a long paragraph.
- DO NOT overpraise.
- Format:
  - Reply in ONLY 1-2 sentences.
  - Keep the tone calm and practical.

{name_instruction}

Examples of the tone:
- "You had a nice starting point, but you stayed very high-level; try adding a concrete example next time."
- "This is quite far from the expected answer; focus more on the core concept and give a specific scenario."
- "You made a good attempt, but you didn't really address the main part of the question."

Return ONLY your short feedback text, nothing else."#;

const REPORT_PROMPT: &str = r#"You are an expert interview coach providing final feedback for a {role_name} interview.

Interview Summary:
{summary}

Provide comprehensive feedback in PLAIN TEXT format (NO markdown, NO asterisks, NO special formatting):

1. Overall Performance (2-3 sentences)
2. Key Strengths (list 2-3 points, use simple dashes)
3. Areas for Improvement (list 2-3 specific points, use simple dashes)
4. Communication Style Assessment (1-2 sentences)
5. Final Recommendation (what to focus on for next interview)

Use simple formatting:
- Use line breaks for sections
- Use simple dashes (-) for lists
- NO asterisks, NO bold, NO markdown
- Be encouraging but honest"#;

/// The active template for each prompt kind.
#[derive(Debug, Clone)]
pub struct PromptSet {
    templates: HashMap<PromptKind, String>,
}

impl Default for PromptSet {
    fn default() -> Self {
        Self {
            templates: PromptKind::ALL
                .iter()
                .map(|kind| (*kind, kind.default_template().to_string()))
                .collect(),
        }
    }
}

impl PromptSet {
    /// Built-in templates with `overrides` (as produced by `load_prompts`)
    /// taking their place.
    pub fn with_overrides(overrides: HashMap<PromptKind, String>) -> Self {
        let mut set = Self::default();
        for (kind, template) in overrides {
            tracing::info!(prompt = kind.key(), "using prompt override");
            set.templates.insert(kind, template);
        }
        set
    }

    pub fn template(&self, kind: PromptKind) -> &str {
        self.templates
            .get(&kind)
            .map(String::as_str)
            .unwrap_or_else(|| kind.default_template())
    }

    pub fn render(&self, kind: PromptKind, values: &[(&str, &str)]) -> String {
        render_prompt(self.template(kind), values)
    }
}

/// Replaces each `{key}` in `template` with its value in a single pass, so
/// substituted text is never scanned for placeholders again.
pub fn render_prompt(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let substitution = after.find('}').and_then(|end| {
            values
                .iter()
                .find(|(key, _)| *key == &after[..end])
                .map(|(_, value)| (end, *value))
        });
        match substitution {
            Some((end, value)) => {
                out.push_str(value);
                rest = &after[end + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}
