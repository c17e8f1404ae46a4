//! Chat transcript and per-session interaction log.
//!
//! Neither is read by the retrieval engine; they exist so a chat front end
//! can replay a conversation and keep a record of answered questions.

use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Who wrote a transcript message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    /// The person asking.
    User,
    /// The chatbot.
    Bot,
}

/// One transcript line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Message text.
    pub text: String,
    /// Author of the message.
    pub sender: Sender,
}

/// An append-only chat log persisted as a JSON array file.
///
/// Every `append` rewrites the file, so the log on disk always matches
/// [`ChatTranscript::entries`].
#[derive(Debug, Clone)]
pub struct ChatTranscript {
    path: PathBuf,
    entries: Vec<ChatMessage>,
}

impl ChatTranscript {
    /// Open the transcript at `path`, starting empty if the file does not exist.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = match tokio::fs::read_to_string(&path).await {
            Ok(body) => serde_json::from_str(&body)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self { path, entries })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a message and write the log through.
    ///
    /// The message is kept only if the write succeeds.
    pub async fn append(&mut self, sender: Sender, text: impl Into<String>) -> Result<()> {
        let mut next = self.entries.clone();
        next.push(ChatMessage { text: text.into(), sender });

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, serde_json::to_string(&next)?).await?;

        self.entries = next;
        Ok(())
    }

    /// Messages in the order they were appended.
    pub fn entries(&self) -> &[ChatMessage] {
        &self.entries
    }
}

/// One answered question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interaction {
    /// The question asked.
    pub question: String,
    /// The answer given.
    #[serde(rename = "reponse")]
    pub response: String,
    /// When the answer was logged, RFC 3339 UTC.
    pub time: String,
}

/// In-memory log of the interactions of the current session.
#[derive(Debug, Clone, Default)]
pub struct SessionLog {
    interactions: Vec<Interaction>,
}

impl SessionLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget previous interactions.
    pub fn start_session(&mut self) {
        self.interactions.clear();
    }

    /// Record a question and its answer, stamped with the current time.
    pub fn log_interaction(&mut self, question: impl Into<String>, response: impl Into<String>) {
        self.log_interaction_at(question, response, Utc::now());
    }

    /// Record a question and its answer with an explicit timestamp.
    pub fn log_interaction_at(
        &mut self,
        question: impl Into<String>,
        response: impl Into<String>,
        time: DateTime<Utc>,
    ) {
        self.interactions.push(Interaction {
            question: question.into(),
            response: response.into(),
            time: time.to_rfc3339_opts(SecondsFormat::Millis, true),
        });
    }

    /// Interactions of the current session, oldest first.
    pub fn interactions(&self) -> &[Interaction] {
        &self.interactions
    }
}
