//! Prompt template registry: fixed, immutable prompt bodies keyed by id.
//!
//! Templates use `{name}` placeholders. Rendering substitutes bound values
//! verbatim in a single pass, so JSON braces inside a value (format
//! instructions, model output) are never re-expanded.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").unwrap());

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PromptError {
    #[error("Unknown prompt: '{0}'")]
    UnknownPrompt(String),

    #[error("Prompt '{prompt}' is missing a value for '{name}'")]
    MissingVariable { prompt: PromptId, name: String },
}

// ═══════════════════════════════════════════════════════════
// Types
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptId {
    EstateDocumentAnalysis,
    EstateDocumentComparison,
    EstateContextualizeQuestion,
    EstateContextQa,
    /// Repair prompt: asks the model to restate a malformed completion.
    OutputFixing,
}

impl PromptId {
    pub fn all() -> &'static [PromptId] {
        &[
            Self::EstateDocumentAnalysis,
            Self::EstateDocumentComparison,
            Self::EstateContextualizeQuestion,
            Self::EstateContextQa,
            Self::OutputFixing,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EstateDocumentAnalysis => "estate_document_analysis",
            Self::EstateDocumentComparison => "estate_document_comparison",
            Self::EstateContextualizeQuestion => "estate_contextualize_question",
            Self::EstateContextQa => "estate_context_qa",
            Self::OutputFixing => "output_fixing",
        }
    }
}

impl fmt::Display for PromptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PromptId {
    type Err = PromptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| PromptError::UnknownPrompt(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    Human,
    Ai,
}

/// One prior exchange in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

impl ChatTurn {
    pub fn human(content: impl Into<String>) -> Self {
        Self { role: ChatRole::Human, content: content.into() }
    }

    pub fn ai(content: impl Into<String>) -> Self {
        Self { role: ChatRole::Ai, content: content.into() }
    }
}

/// A prompt body, optionally preceded by a system message (chat templates).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    id: PromptId,
    system: Option<&'static str>,
    body: &'static str,
}

impl PromptTemplate {
    pub fn id(&self) -> PromptId {
        self.id
    }

    pub fn is_chat(&self) -> bool {
        self.system.is_some()
    }

    /// Placeholder names in order of first appearance (system message first).
    pub fn placeholders(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = Vec::new();
        for text in self.system.into_iter().chain(std::iter::once(self.body)) {
            for cap in PLACEHOLDER.captures_iter(text) {
                if let Some(m) = cap.get(1) {
                    if !names.contains(&m.as_str()) {
                        names.push(m.as_str());
                    }
                }
            }
        }
        names
    }

    /// Render the body. Every placeholder must be bound.
    pub fn render(&self, vars: &[(&str, &str)]) -> Result<String, PromptError> {
        let body = substitute(self.id, self.body, vars)?;
        match self.system {
            Some(system) => {
                let system = substitute(self.id, system, vars)?;
                Ok(format!("System: {system}\n\nHuman: {body}"))
            }
            None => Ok(body),
        }
    }

    /// Render a chat template with prior turns between system and human message.
    pub fn render_chat(
        &self,
        vars: &[(&str, &str)],
        history: &[ChatTurn],
    ) -> Result<String, PromptError> {
        let body = substitute(self.id, self.body, vars)?;
        let mut sections = Vec::with_capacity(history.len() + 2);
        if let Some(system) = self.system {
            sections.push(format!("System: {}", substitute(self.id, system, vars)?));
        }
        for turn in history {
            let speaker = match turn.role {
                ChatRole::Human => "Human",
                ChatRole::Ai => "AI",
            };
            sections.push(format!("{speaker}: {}", turn.content));
        }
        sections.push(format!("Human: {body}"));
        Ok(sections.join("\n\n"))
    }
}

fn substitute(id: PromptId, text: &str, vars: &[(&str, &str)]) -> Result<String, PromptError> {
    let mut missing: Option<String> = None;
    let rendered = PLACEHOLDER.replace_all(text, |caps: &regex::Captures<'_>| {
        let name = &caps[1];
        match vars.iter().find(|(k, _)| *k == name) {
            Some((_, value)) => value.to_string(),
            None => {
                missing.get_or_insert_with(|| name.to_string());
                String::new()
            }
        }
    });
    match missing {
        Some(name) => Err(PromptError::MissingVariable { prompt: id, name }),
        None => Ok(rendered.into_owned()),
    }
}

// ═══════════════════════════════════════════════════════════
// Template bodies
// ═══════════════════════════════════════════════════════════

const ANALYSIS_BODY: &str = "\
You are an estate document assistant trained to analyze and summarize estate-related documents.
Return ONLY valid JSON matching the exact schema below.

{format_instructions}

Analyze this estate document:
{document_text}
";

const COMPARISON_BODY: &str = "\
You will be provided with content from two estate-related PDFs. Your tasks are as follows:

1. Compare the content in both estate documents.
2. Identify differences and specify the page number where each change occurs.
3. Present your output as a page-wise comparison.
4. If a page has no changes, explicitly state 'NO CHANGE'.

Input estate documents:

{combined_docs}

Your response should follow this format:

{format_instruction}
";

const CONTEXTUALIZE_SYSTEM: &str = "\
Given a conversation history and the most recent user query, rewrite the query as a standalone \
estate-related question that makes sense without relying on the previous context. Do not provide \
an answer. Only reformulate the question if necessary; otherwise, return it unchanged.";

const CONTEXT_QA_SYSTEM: &str = "\
You are an estate document assistant designed to answer questions using the provided estate \
context. Rely only on the retrieved information to form your response. If the answer is not \
found in the context, respond with 'I don't know.' Keep your answer concise and no longer than \
three sentences.

{context}";

const HUMAN_INPUT: &str = "{input}";

const OUTPUT_FIXING_BODY: &str = "\
Instructions:
--------------
{instructions}
--------------
Completion:
--------------
{completion}
--------------

Above, the Completion did not satisfy the constraints given in the Instructions.
Error:
--------------
{error}
--------------

Please try again. Please only respond with an answer that satisfies the constraints laid out in the Instructions:";

// ═══════════════════════════════════════════════════════════
// Registry
// ═══════════════════════════════════════════════════════════

/// Immutable id → template mapping.
#[derive(Debug, Clone)]
pub struct PromptRegistry {
    templates: BTreeMap<PromptId, PromptTemplate>,
}

impl Default for PromptRegistry {
    fn default() -> Self {
        let templates = [
            (PromptId::EstateDocumentAnalysis, None, ANALYSIS_BODY),
            (PromptId::EstateDocumentComparison, None, COMPARISON_BODY),
            (PromptId::EstateContextualizeQuestion, Some(CONTEXTUALIZE_SYSTEM), HUMAN_INPUT),
            (PromptId::EstateContextQa, Some(CONTEXT_QA_SYSTEM), HUMAN_INPUT),
            (PromptId::OutputFixing, None, OUTPUT_FIXING_BODY),
        ]
        .into_iter()
        .map(|(id, system, body)| (id, PromptTemplate { id, system, body }))
        .collect();
        Self { templates }
    }
}

impl PromptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a template by its string id.
    pub fn get(&self, prompt_id: &str) -> Result<&PromptTemplate, PromptError> {
        let id = PromptId::from_str(prompt_id).map_err(|e| {
            tracing::error!(prompt_id, "Unknown prompt requested");
            e
        })?;
        Ok(self.template(id))
    }

    pub fn template(&self, id: PromptId) -> &PromptTemplate {
        // Every PromptId is registered in Default.
        &self.templates[&id]
    }

    pub fn ids(&self) -> impl Iterator<Item = PromptId> + '_ {
        self.templates.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_id_is_registered() {
        let registry = PromptRegistry::new();
        let ids: Vec<PromptId> = registry.ids().collect();
        assert_eq!(ids.len(), PromptId::all().len());
        for id in PromptId::all() {
            assert_eq!(registry.get(id.as_str()).unwrap().id(), *id);
        }
    }

    #[test]
    fn unknown_prompt_fails() {
        let registry = PromptRegistry::new();
        assert_eq!(
            registry.get("estate_summary").unwrap_err(),
            PromptError::UnknownPrompt("estate_summary".into())
        );
    }

    #[test]
    fn comparison_placeholders() {
        let registry = PromptRegistry::new();
        let template = registry.template(PromptId::EstateDocumentComparison);
        assert_eq!(template.placeholders(), vec!["combined_docs", "format_instruction"]);
        assert!(!template.is_chat());
    }

    #[test]
    fn render_binds_values_verbatim() {
        let registry = PromptRegistry::new();
        let template = registry.template(PromptId::EstateDocumentComparison);
        let rendered = template
            .render(&[
                ("combined_docs", "Document: a.pdf {not_a_placeholder}"),
                ("format_instruction", r#"[{"page": "1", "changes": "..."}]"#),
            ])
            .unwrap();
        assert!(rendered.contains("Document: a.pdf {not_a_placeholder}"));
        assert!(rendered.contains(r#"[{"page": "1", "changes": "..."}]"#));
        assert!(rendered.contains("NO CHANGE"));
    }

    #[test]
    fn render_missing_variable_fails() {
        let registry = PromptRegistry::new();
        let template = registry.template(PromptId::EstateDocumentAnalysis);
        let err = template.render(&[("document_text", "text")]).unwrap_err();
        assert_eq!(
            err,
            PromptError::MissingVariable {
                prompt: PromptId::EstateDocumentAnalysis,
                name: "format_instructions".into(),
            }
        );
    }

    #[test]
    fn context_qa_renders_history() {
        let registry = PromptRegistry::new();
        let template = registry.template(PromptId::EstateContextQa);
        assert!(template.is_chat());
        assert_eq!(template.placeholders(), vec!["context", "input"]);

        let rendered = template
            .render_chat(
                &[("context", "Rent is due monthly."), ("input", "When is rent due?")],
                &[ChatTurn::human("Who is the landlord?"), ChatTurn::ai("I don't know.")],
            )
            .unwrap();
        assert!(rendered.starts_with("System: You are an estate document assistant"));
        assert!(rendered.contains("Rent is due monthly."));
        let human = rendered.find("Human: Who is the landlord?").unwrap();
        let ai = rendered.find("AI: I don't know.").unwrap();
        let question = rendered.find("Human: When is rent due?").unwrap();
        assert!(human < ai && ai < question);
    }

    #[test]
    fn chat_render_without_history() {
        let registry = PromptRegistry::new();
        let template = registry.template(PromptId::EstateContextualizeQuestion);
        let rendered = template.render(&[("input", "And the deposit?")]).unwrap();
        assert!(rendered.ends_with("Human: And the deposit?"));
    }

    #[test]
    fn prompt_id_round_trips_through_str() {
        for id in PromptId::all() {
            assert_eq!(id.as_str().parse::<PromptId>().unwrap(), *id);
            assert_eq!(id.to_string(), id.as_str());
        }
    }
}
