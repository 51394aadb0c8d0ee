use crate::audio::Base64EncodedAudioBytes;
use crate::session::SessionConfig;

/// `session.configure` event
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SessionConfigureEvent {
    session: SessionConfig,
}

impl SessionConfigureEvent {
    pub fn new(session: SessionConfig) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &SessionConfig {
        &self.session
    }
}

/// `input_audio.append` event
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct InputAudioAppendEvent {
    audio: Base64EncodedAudioBytes,
}

impl InputAudioAppendEvent {
    pub fn new(audio: Base64EncodedAudioBytes) -> Self {
        Self { audio }
    }

    pub fn audio(&self) -> &Base64EncodedAudioBytes {
        &self.audio
    }
}

/// `tool.result` event
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ToolResultEvent {
    /// Correlation id of the tool call this result answers
    call_id: String,
    name: String,
    output: serde_json::Value,
}

impl ToolResultEvent {
    pub fn new(call_id: String, name: String, output: serde_json::Value) -> Self {
        Self {
            call_id,
            name,
            output,
        }
    }

    pub fn call_id(&self) -> &str {
        &self.call_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn output(&self) -> &serde_json::Value {
        &self.output
    }
}
