use crate::audio::{AudioFormat, Voice};
use crate::tools::Tool;

/// Session parameters sent to the speech model service when a streaming
/// session is configured.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SessionConfig {
    /// The set of modalities the model can respond with. To disable audio, set this to ["text"].
    modalities: Vec<String>,

    /// The system instruction prepended to model calls.
    instructions: Option<String>,

    /// The voice the model uses to respond.
    voice: Option<Voice>,

    /// The format of input audio.
    input_audio_format: Option<AudioFormat>,

    /// The format of output audio.
    output_audio_format: Option<AudioFormat>,

    /// Tools(Functions) available to the model.
    tools: Vec<Tool>,
}

impl SessionConfig {
    pub fn new() -> SessionConfigurator {
        SessionConfigurator::new()
    }

    pub fn modalities(&self) -> &[String] {
        &self.modalities
    }

    pub fn instructions(&self) -> Option<&str> {
        self.instructions.as_deref()
    }

    pub fn voice(&self) -> Option<&Voice> {
        self.voice.as_ref()
    }

    pub fn tools(&self) -> &[Tool] {
        &self.tools
    }
}

pub struct SessionConfigurator {
    session: SessionConfig,
}

impl SessionConfigurator {
    pub fn new() -> Self {
        Self {
            session: SessionConfig {
                modalities: vec!["text".to_string(), "audio".to_string()],
                instructions: None,
                voice: None,
                input_audio_format: None,
                output_audio_format: None,
                tools: vec![],
            },
        }
    }

    pub fn with_modalities_disable_audio(mut self) -> Self {
        self.session.modalities = vec!["text".to_string()];
        self
    }

    pub fn with_modalities_enable_audio(mut self) -> Self {
        self.session.modalities = vec!["text".to_string(), "audio".to_string()];
        self
    }

    pub fn with_instructions(mut self, instructions: &str) -> Self {
        self.session.instructions = Some(instructions.to_string());
        self
    }

    pub fn with_voice(mut self, voice: Voice) -> Self {
        self.session.voice = Some(voice);
        self
    }

    pub fn with_input_audio_format(mut self, format: AudioFormat) -> Self {
        self.session.input_audio_format = Some(format);
        self
    }

    pub fn with_output_audio_format(mut self, format: AudioFormat) -> Self {
        self.session.output_audio_format = Some(format);
        self
    }

    pub fn with_tools(mut self, tools: Vec<Tool>) -> Self {
        self.session.tools = tools;
        self
    }

    pub fn build(self) -> SessionConfig {
        self.session
    }
}

impl Default for SessionConfigurator {
    fn default() -> Self {
        Self::new()
    }
}
