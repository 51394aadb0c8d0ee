use crate::error::SessionError;
use aura_realtime_types::audio::Base64EncodedAudioBytes;
use aura_realtime_types::session::SessionConfig;
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

/// The engine's seam to the speech model service: one streaming,
/// bidirectional session. The engine depends on this contract, not on any
/// vendor transport, which also lets tests drive it with a mock.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ServiceSession: Send {
    /// Declares modalities, system instruction, voice and tool schemas.
    async fn configure(&mut self, config: SessionConfig) -> Result<(), SessionError>;

    /// Sends one encoded microphone frame. Called continuously for the whole
    /// session, regardless of UI state.
    async fn append_audio(&mut self, audio: Base64EncodedAudioBytes) -> Result<(), SessionError>;

    /// Answers a tool invocation with the result tagged by its correlation id.
    async fn send_tool_result(
        &mut self,
        call_id: &str,
        name: &str,
        output: serde_json::Value,
    ) -> Result<(), SessionError>;

    /// Closes the logical connection. Must be safe to call more than once.
    async fn close(&mut self) -> Result<(), SessionError>;
}
