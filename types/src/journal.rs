use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which side of the conversation produced a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Aura,
}

/// One finalized turn of the conversation. Created only when a turn
/// completes, never for interim partial text, and immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub id: Uuid,
    pub speaker: Speaker,
    pub text: String,
}

impl TranscriptEntry {
    pub fn new(speaker: Speaker, text: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            speaker,
            text,
        }
    }
}

/// A cognitive-distortion flag raised by the model against one user turn.
/// The entry reference is weak (by id), not ownership.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CognitiveDistortion {
    pub kind: String,
    pub statement: String,
    pub entry_id: Uuid,
}

/// One journaling session: transcript plus what the post-session pipeline
/// distilled out of it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: Uuid,
    pub title: String,
    pub started_at: DateTime<Utc>,
    pub transcript: Vec<TranscriptEntry>,
    /// Third-person clinical summary kept for Aura's own future reference.
    pub notes: Option<String>,
    /// Second-person supportive recap shown to the user.
    pub summary: Option<String>,
    pub distortions: Vec<CognitiveDistortion>,
}

impl SessionRecord {
    pub fn new(title: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            title,
            started_at: Utc::now(),
            transcript: Vec::new(),
            notes: None,
            summary: None,
            distortions: Vec::new(),
        }
    }

    pub fn push_entry(&mut self, entry: TranscriptEntry) {
        self.transcript.push(entry);
    }

    /// Id of the most recent user turn, if any user turn exists yet.
    pub fn last_user_entry_id(&self) -> Option<Uuid> {
        self.transcript
            .iter()
            .rev()
            .find(|e| e.speaker == Speaker::User)
            .map(|e| e.id)
    }

    /// True once the conversation holds more than the initial greeting.
    pub fn has_exchange(&self) -> bool {
        self.transcript.len() > 1
    }
}

/// Long-term profile Aura carries between sessions. Rewritten wholesale by
/// the post-session pipeline; the merge happens in the model, not locally.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuraMemory {
    #[serde(default)]
    pub key_relationships: Vec<String>,
    #[serde(default)]
    pub major_life_events: Vec<String>,
    #[serde(default)]
    pub recurring_themes: Vec<String>,
    #[serde(default)]
    pub goals: Vec<String>,
}

/// Correlation token held between a tool invocation that requires a later
/// acknowledgment and the result sent back on the same connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingToolCall {
    pub call_id: String,
    pub name: String,
}
