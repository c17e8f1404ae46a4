//! Grounded prompt assembly.

use crate::document::ScoredPassage;
use crate::error::{RagError, Result};

/// Instruction appended after the question by the default template.
pub const DEFAULT_INSTRUCTION: &str =
    "Réponds précisément en t'appuyant uniquement sur le contexte ci-dessus.";

const CONTEXT_PLACEHOLDER: &str = "{context}";
const QUESTION_PLACEHOLDER: &str = "{question}";

/// Turns retrieved passages and a question into one generation prompt.
///
/// The default template renders:
///
/// ```text
/// Contexte 1: <text>
///
/// Contexte 2: <text>
///
/// Question : <question>
/// Réponds précisément en t'appuyant uniquement sur le contexte ci-dessus.
/// ```
///
/// A custom template substitutes the same context block and the question into
/// `{context}` and `{question}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PromptTemplate {
    custom: Option<String>,
}

impl PromptTemplate {
    /// The default French grounding template.
    pub fn new() -> Self {
        Self::default()
    }

    /// A user-supplied template with `{context}` and `{question}` placeholders.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if the template has no `{question}`
    /// placeholder.
    pub fn custom(template: impl Into<String>) -> Result<Self> {
        let template = template.into();
        if !template.contains(QUESTION_PLACEHOLDER) {
            return Err(RagError::ConfigError(format!(
                "prompt template must contain a {QUESTION_PLACEHOLDER} placeholder"
            )));
        }
        Ok(Self { custom: Some(template) })
    }

    /// Render the prompt for `passages` (already in rank order) and `question`.
    pub fn render(&self, passages: &[ScoredPassage], question: &str) -> String {
        let context = context_block(passages);
        match &self.custom {
            Some(template) => template
                .replace(CONTEXT_PLACEHOLDER, &context)
                .replace(QUESTION_PLACEHOLDER, question),
            None => format!("{context}\n\nQuestion : {question}\n{DEFAULT_INSTRUCTION}"),
        }
    }
}

/// Render passages as `Contexte <n>: <text>` blocks separated by a blank line.
pub fn context_block(passages: &[ScoredPassage]) -> String {
    passages
        .iter()
        .enumerate()
        .map(|(i, p)| format!("Contexte {}: {}", i + 1, p.text()))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Assemble a prompt with the default template.
pub fn assemble(passages: &[ScoredPassage], question: &str) -> String {
    PromptTemplate::new().render(passages, question)
}
