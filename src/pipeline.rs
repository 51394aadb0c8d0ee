use anyhow::Result;
use async_trait::async_trait;
use aura_realtime_types::journal::{AuraMemory, SessionRecord, Speaker};
#[cfg(test)]
use mockall::automock;
use reqwest::Client;
use serde::Deserialize;

/// Shown in place of notes when the request fails; the session is still kept.
pub const NOTES_FALLBACK: &str = "Notes could not be generated for this session.";
/// Shown in place of the recap when the request fails.
pub const SUMMARY_FALLBACK: &str =
    "A summary couldn't be written this time, but your conversation was saved.";

#[derive(Debug, Deserialize)]
pub struct LlmResponse {
    pub choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: Message,
}

#[derive(Debug, Deserialize)]
pub struct Message {
    pub content: String,
}

// The `Distiller` trait is the contract for the text-generation service the
// post-session pipeline talks to. The engine depends on this abstraction, so
// tests can drive the pipeline with `MockDistiller` instead of the network.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Distiller: Send + Sync {
    /// Third-person clinical summary for Aura's own future reference.
    async fn session_notes(&self, transcript: &str) -> Result<String>;

    /// Second-person supportive recap for display to the user.
    async fn user_summary(&self, transcript: &str) -> Result<String>;

    /// Complete replacement memory profile. The merge with the prior profile
    /// happens in the model, never locally.
    async fn updated_memory(&self, memory: &AuraMemory, transcript: &str) -> Result<AuraMemory>;

    /// Rewrites a goal into a concrete, measurable phrasing.
    async fn reformulate_goal(&self, goal: &str) -> Result<String>;

    /// One reflective insight for a written journal entry.
    async fn journal_insight(&self, entry: &str) -> Result<String>;
}

/// What one pipeline run produced. `memory: None` means the prior profile
/// stays untouched.
#[derive(Debug)]
pub struct PipelineOutcome {
    pub notes: String,
    pub summary: String,
    pub memory: Option<AuraMemory>,
}

/// Renders the finished transcript for the distillation prompts.
pub fn render_transcript(session: &SessionRecord) -> String {
    session
        .transcript
        .iter()
        .map(|entry| {
            let speaker = match entry.speaker {
                Speaker::User => "User",
                Speaker::Aura => "Aura",
            };
            format!("{}: {}", speaker, entry.text)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Runs the three post-session requests concurrently against the finished
/// transcript. Failures are isolated per request: a failed sibling never
/// cancels the others, notes/summary fall back to explanatory text, and a
/// failed memory update keeps the prior profile unchanged.
pub async fn run<D: Distiller + ?Sized>(
    distiller: &D,
    session: &SessionRecord,
    memory: &AuraMemory,
) -> PipelineOutcome {
    let transcript = render_transcript(session);
    let (notes, summary, updated) = tokio::join!(
        distiller.session_notes(&transcript),
        distiller.user_summary(&transcript),
        distiller.updated_memory(memory, &transcript),
    );

    let notes = notes.unwrap_or_else(|e| {
        tracing::warn!("session notes request failed: {:#}", e);
        NOTES_FALLBACK.to_string()
    });
    let summary = summary.unwrap_or_else(|e| {
        tracing::warn!("user summary request failed: {:#}", e);
        SUMMARY_FALLBACK.to_string()
    });
    let memory = match updated {
        Ok(memory) => Some(memory),
        Err(e) => {
            tracing::warn!("memory update failed, keeping prior profile: {:#}", e);
            None
        }
    };

    PipelineOutcome {
        notes,
        summary,
        memory,
    }
}

/// Single-shot goal reformulation; fail-soft to `None`.
pub async fn reformulate_goal<D: Distiller + ?Sized>(distiller: &D, goal: &str) -> Option<String> {
    match distiller.reformulate_goal(goal).await {
        Ok(goal) => Some(goal),
        Err(e) => {
            tracing::warn!("goal reformulation failed: {:#}", e);
            None
        }
    }
}

/// Single-shot journal insight; fail-soft to `None`.
pub async fn journal_insight<D: Distiller + ?Sized>(distiller: &D, entry: &str) -> Option<String> {
    match distiller.journal_insight(entry).await {
        Ok(insight) => Some(insight),
        Err(e) => {
            tracing::warn!("journal insight failed: {:#}", e);
            None
        }
    }
}

/// Text-generation client for all distillation requests.
pub struct DistillerClient {
    client: Client,
    api_key: String,
    model: String,
}

const COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";

impl DistillerClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            model,
        }
    }

    /// Every distillation request is the same shape: submit one prompt, read
    /// back one message, optionally constrained to a JSON object.
    async fn ask(&self, prompt: String, json_response: bool) -> Result<String> {
        let mut body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "user", "content": prompt }
            ],
            "temperature": 0.2
        });
        if json_response {
            body["response_format"] = serde_json::json!({ "type": "json_object" });
        }

        let resp = self
            .client
            .post(COMPLETIONS_URL)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?
            .json::<LlmResponse>()
            .await?;

        let answer = &resp
            .choices
            .first()
            .ok_or_else(|| anyhow::anyhow!("No response from LLM"))?
            .message
            .content;
        Ok(answer.trim().to_string())
    }
}

#[async_trait]
impl Distiller for DistillerClient {
    async fn session_notes(&self, transcript: &str) -> Result<String> {
        let prompt = format!(
            r#"You are Aura, an AI wellness companion, writing private notes after a session.
Summarize the conversation below in the third person for your own future
reference: the user's emotional state, topics raised, and anything worth
following up on next time. Keep it to one short clinical paragraph.

Conversation:
---
{transcript}
---"#
        );
        self.ask(prompt, false).await
    }

    async fn user_summary(&self, transcript: &str) -> Result<String> {
        let prompt = format!(
            r#"You are Aura, an AI wellness companion. Write a short, warm recap of the
session below, addressed directly to the user in the second person. Reflect
what they shared and one thing they can hold on to. No headings, no lists.

Conversation:
---
{transcript}
---"#
        );
        self.ask(prompt, false).await
    }

    async fn updated_memory(&self, memory: &AuraMemory, transcript: &str) -> Result<AuraMemory> {
        let current = serde_json::to_string(memory)?;
        let prompt = format!(
            r#"You maintain Aura's long-term memory of a user. Merge the existing profile
with anything new learned in the conversation, dropping nothing that still
holds. Respond STRICTLY as a JSON object with the keys "key_relationships",
"major_life_events", "recurring_themes" and "goals", each an array of short
strings.

Existing profile:
{current}

Conversation:
---
{transcript}
---"#
        );
        let answer = self.ask(prompt, true).await?;
        let updated: AuraMemory = serde_json::from_str(&answer)
            .map_err(|e| anyhow::anyhow!("Failed to parse memory profile: {e}"))?;
        Ok(updated)
    }

    async fn reformulate_goal(&self, goal: &str) -> Result<String> {
        let prompt = format!(
            r#"Rewrite the goal below as one specific, measurable, achievable sentence the
user could act on this week. Respond STRICTLY as JSON: {{"goal": "<text>"}}

Goal: "{goal}""#
        );
        let answer = self.ask(prompt, true).await?;
        let result: serde_json::Value = serde_json::from_str(&answer)?;
        result
            .get("goal")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| anyhow::anyhow!("Invalid goal format: {}", answer))
    }

    async fn journal_insight(&self, entry: &str) -> Result<String> {
        let prompt = format!(
            r#"A user wrote the journal entry below. Offer one gentle, non-judgmental
insight or reframe, two sentences at most. Respond STRICTLY as JSON:
{{"insight": "<text>"}}

Entry:
---
{entry}
---"#
        );
        let answer = self.ask(prompt, true).await?;
        let result: serde_json::Value = serde_json::from_str(&answer)?;
        result
            .get("insight")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| anyhow::anyhow!("Invalid insight format: {}", answer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aura_realtime_types::journal::TranscriptEntry;

    fn session_with_exchange() -> SessionRecord {
        let mut session = SessionRecord::new("check-in".to_string());
        session.push_entry(TranscriptEntry::new(
            Speaker::Aura,
            "Hi, how are you feeling today?".to_string(),
        ));
        session.push_entry(TranscriptEntry::new(
            Speaker::User,
            "Pretty worn out, honestly.".to_string(),
        ));
        session
    }

    #[tokio::test]
    async fn all_three_requests_resolve_together() {
        let mut distiller = MockDistiller::new();
        distiller
            .expect_session_notes()
            .returning(|_| Ok("User reported exhaustion.".to_string()))
            .once();
        distiller
            .expect_user_summary()
            .returning(|_| Ok("You shared that you're worn out.".to_string()))
            .once();
        distiller
            .expect_updated_memory()
            .returning(|_, _| {
                Ok(AuraMemory {
                    recurring_themes: vec!["exhaustion".to_string()],
                    ..AuraMemory::default()
                })
            })
            .once();

        let session = session_with_exchange();
        let outcome = run(&distiller, &session, &AuraMemory::default()).await;
        assert_eq!(outcome.notes, "User reported exhaustion.");
        assert_eq!(outcome.summary, "You shared that you're worn out.");
        assert_eq!(
            outcome.memory.unwrap().recurring_themes,
            vec!["exhaustion".to_string()]
        );
    }

    #[tokio::test]
    async fn memory_failure_is_isolated_from_siblings() {
        let mut distiller = MockDistiller::new();
        distiller
            .expect_session_notes()
            .returning(|_| Ok("notes".to_string()));
        distiller
            .expect_user_summary()
            .returning(|_| Ok("summary".to_string()));
        distiller
            .expect_updated_memory()
            .returning(|_, _| Err(anyhow::anyhow!("rate limited")));

        let session = session_with_exchange();
        let prior = AuraMemory {
            goals: vec!["sleep earlier".to_string()],
            ..AuraMemory::default()
        };
        let outcome = run(&distiller, &session, &prior).await;
        assert_eq!(outcome.notes, "notes");
        assert_eq!(outcome.summary, "summary");
        assert!(outcome.memory.is_none());
    }

    #[tokio::test]
    async fn failed_text_requests_fall_back_to_explanatory_strings() {
        let mut distiller = MockDistiller::new();
        distiller
            .expect_session_notes()
            .returning(|_| Err(anyhow::anyhow!("timeout")));
        distiller
            .expect_user_summary()
            .returning(|_| Err(anyhow::anyhow!("timeout")));
        distiller
            .expect_updated_memory()
            .returning(|_, _| Ok(AuraMemory::default()));

        let session = session_with_exchange();
        let outcome = run(&distiller, &session, &AuraMemory::default()).await;
        assert_eq!(outcome.notes, NOTES_FALLBACK);
        assert_eq!(outcome.summary, SUMMARY_FALLBACK);
        assert!(outcome.memory.is_some());
    }

    #[tokio::test]
    async fn single_shot_helpers_fail_soft_to_none() {
        let mut distiller = MockDistiller::new();
        distiller
            .expect_reformulate_goal()
            .returning(|_| Err(anyhow::anyhow!("boom")));
        distiller
            .expect_journal_insight()
            .returning(|_| Ok("Rest is not a failure.".to_string()));

        assert_eq!(reformulate_goal(&distiller, "be less tired").await, None);
        assert_eq!(
            journal_insight(&distiller, "I slept badly again").await,
            Some("Rest is not a failure.".to_string())
        );
    }

    #[test]
    fn transcript_renders_speakers_in_order() {
        let session = session_with_exchange();
        let rendered = render_transcript(&session);
        assert_eq!(
            rendered,
            "Aura: Hi, how are you feeling today?\nUser: Pretty worn out, honestly."
        );
    }
}
