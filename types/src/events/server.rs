use crate::audio::Base64EncodedAudioBytes;
use crate::tools::ToolCallInvocation;

/// `error` event
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ErrorEvent {
    /// Human-readable description of the failure
    message: String,
}

impl ErrorEvent {
    pub fn new(message: String) -> Self {
        Self { message }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// `session.created` event
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SessionCreatedEvent {
    /// Opaque id the service assigned to this streaming session
    session_id: String,
}

impl SessionCreatedEvent {
    pub fn new(session_id: String) -> Self {
        Self { session_id }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

/// `transcript.input.delta` event — partial transcript of the user's speech
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct InputTranscriptDeltaEvent {
    text: String,
}

impl InputTranscriptDeltaEvent {
    pub fn new(text: String) -> Self {
        Self { text }
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// `transcript.output.delta` event — partial transcript of Aura's speech
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct OutputTranscriptDeltaEvent {
    text: String,
}

impl OutputTranscriptDeltaEvent {
    pub fn new(text: String) -> Self {
        Self { text }
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// `response.audio.delta` event — one chunk of synthesized audio
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AudioDeltaEvent {
    audio: Base64EncodedAudioBytes,
}

impl AudioDeltaEvent {
    pub fn new(audio: Base64EncodedAudioBytes) -> Self {
        Self { audio }
    }

    pub fn audio(&self) -> &Base64EncodedAudioBytes {
        &self.audio
    }
}

/// `tool.call` event — one message may batch several invocations
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ToolCallEvent {
    calls: Vec<ToolCallInvocation>,
}

impl ToolCallEvent {
    pub fn new(calls: Vec<ToolCallInvocation>) -> Self {
        Self { calls }
    }

    pub fn calls(&self) -> &[ToolCallInvocation] {
        &self.calls
    }
}
