use std::sync::Arc;

use crate::error::SessionError;
use crate::link::ServiceSession;
use crate::pipeline::{self, Distiller};
use crate::playback::{PlaybackScheduler, PlaybackSink};
use crate::state::{SessionState, SessionStateMachine, StateCell};
use crate::tools::{aura_toolset, ToolDispatcher, UiEvent};
use crate::transcript::TranscriptAccumulator;
use crate::vad::{VadConfig, VoiceActivityMonitor};
use aura_realtime_types::audio::Voice;
use aura_realtime_types::events::ServerEvent;
use aura_realtime_types::journal::{AuraMemory, SessionRecord};
use aura_realtime_types::session::SessionConfig;
use aura_realtime_utils::audio as codec;

/// System instruction for the Aura persona, with the long-term memory
/// profile woven in so the model remembers the user across sessions.
pub fn aura_instructions(memory: &AuraMemory) -> String {
    let mut instructions = String::from(
        "You are Aura, a warm, attentive wellness companion keeping a spoken \
         journal with the user. Speak gently and briefly, ask one question at \
         a time, reflect feelings back before offering perspective, and never \
         give medical advice. Open the conversation with a short greeting.\n",
    );
    push_section(
        &mut instructions,
        "Key relationships",
        &memory.key_relationships,
    );
    push_section(
        &mut instructions,
        "Major life events",
        &memory.major_life_events,
    );
    push_section(
        &mut instructions,
        "Recurring themes",
        &memory.recurring_themes,
    );
    push_section(&mut instructions, "Goals", &memory.goals);
    instructions
}

fn push_section(out: &mut String, title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    out.push_str(&format!("\n{title}:\n"));
    for item in items {
        out.push_str(&format!(" - {item}\n"));
    }
}

/// Default session parameters for a journaling conversation.
pub fn default_session_config(memory: &AuraMemory) -> SessionConfig {
    SessionConfig::new()
        .with_modalities_enable_audio()
        .with_instructions(&aura_instructions(memory))
        .with_voice(Voice::Breeze)
        .with_tools(aura_toolset())
        .build()
}

/// The spine of the realtime session.
///
/// Consumes the single inbound event stream in arrival order, drives the
/// state machine, gates playback and transcript bookkeeping, and runs the
/// post-session pipeline after a non-crisis stop. Generic over the service
/// link and the playback sink so both seams can be faked in tests.
pub struct SessionEngine<L: ServiceSession, S: PlaybackSink> {
    link: Option<L>,
    cell: StateCell,
    machine: SessionStateMachine,
    vad: VoiceActivityMonitor,
    accumulator: TranscriptAccumulator,
    dispatcher: ToolDispatcher,
    playback: PlaybackScheduler<S>,
    session: SessionRecord,
    session_config: SessionConfig,
    memory: AuraMemory,
    distiller: Arc<dyn Distiller>,
    torn_down: bool,
    pipeline_ran: bool,
}

impl<L: ServiceSession, S: PlaybackSink> SessionEngine<L, S> {
    pub fn new(
        sink: S,
        distiller: Arc<dyn Distiller>,
        ui_tx: tokio::sync::mpsc::Sender<UiEvent>,
    ) -> Self {
        let cell = StateCell::new();
        Self {
            link: None,
            machine: SessionStateMachine::new(cell.clone()),
            cell,
            vad: VoiceActivityMonitor::new(VadConfig::default()),
            accumulator: TranscriptAccumulator::new(),
            dispatcher: ToolDispatcher::new(ui_tx),
            playback: PlaybackScheduler::new(sink, codec::SERVICE_OUTPUT_SAMPLE_RATE),
            session: SessionRecord::new("untitled session".to_string()),
            session_config: SessionConfig::new().build(),
            memory: AuraMemory::default(),
            distiller,
            torn_down: true,
            pipeline_ran: true,
        }
    }

    pub fn with_vad_config(mut self, config: VadConfig) -> Self {
        self.vad = VoiceActivityMonitor::new(config);
        self
    }

    pub fn with_memory(mut self, memory: AuraMemory) -> Self {
        self.memory = memory;
        self
    }

    pub fn state(&self) -> SessionState {
        self.cell.get()
    }

    /// Clone of the authoritative state cell, for audio callbacks and UI.
    pub fn state_cell(&self) -> StateCell {
        self.cell.clone()
    }

    pub fn session(&self) -> &SessionRecord {
        &self.session
    }

    pub fn memory(&self) -> &AuraMemory {
        &self.memory
    }

    pub fn playback_mut(&mut self) -> &mut PlaybackScheduler<S> {
        &mut self.playback
    }

    /// Begins a new session over an established connection.
    ///
    /// The caller must not start a new session while the previous one's
    /// pipeline is outstanding; `AlreadyActive` enforces the state side of
    /// that, the start affordance the UI side.
    pub async fn start(
        &mut self,
        link: L,
        config: SessionConfig,
        session: SessionRecord,
    ) -> Result<(), SessionError> {
        if self.cell.get() == SessionState::Error {
            self.cell.set(SessionState::Idle);
        }
        if !self.machine.begin_connecting() {
            return Err(SessionError::AlreadyActive);
        }

        self.link = Some(link);
        self.session = session;
        self.session_config = config;
        self.accumulator = TranscriptAccumulator::new();
        self.vad.reset();
        let _ = self.dispatcher.take_pending();
        self.playback.stop_all();
        self.torn_down = false;
        self.pipeline_ran = false;
        Ok(())
    }

    /// Processes one inbound event. Per-event failures are logged and the
    /// session continues; only connection-level errors tear it down.
    pub async fn handle_server_event(&mut self, event: ServerEvent) {
        match event {
            ServerEvent::SessionCreated(data) => {
                tracing::info!("session created: {}", data.session_id());
                if let Some(link) = self.link.as_mut() {
                    if let Err(e) = link.configure(self.session_config.clone()).await {
                        tracing::error!("failed to configure session: {}", e);
                        self.machine.on_error();
                        self.stop(false).await;
                        return;
                    }
                }
                self.machine.on_connected();
            }
            ServerEvent::InputTranscriptDelta(data) => {
                self.accumulator.push_input(data.text());
            }
            ServerEvent::OutputTranscriptDelta(data) => {
                self.accumulator.push_output(data.text());
                self.machine.on_output_fragment();
            }
            ServerEvent::AudioDelta(data) => match codec::decode(data.audio()) {
                Ok(samples) => {
                    if !samples.is_empty() {
                        self.playback.schedule(&samples);
                        self.machine.on_output_fragment();
                    }
                }
                Err(e) => {
                    tracing::warn!("dropping malformed audio chunk: {}", e);
                }
            },
            ServerEvent::TurnComplete => {
                for entry in self.accumulator.commit_turn() {
                    self.session.push_entry(entry);
                }
                self.machine.on_turn_complete();
            }
            ServerEvent::ToolCall(data) => {
                let outcome =
                    self.dispatcher
                        .dispatch(data.calls(), &mut self.session, &mut self.playback);
                if outcome.crisis {
                    self.stop(true).await;
                }
            }
            ServerEvent::Interrupted => {
                // The user started talking over Aura; drop queued speech.
                self.playback.stop_all();
            }
            ServerEvent::Error(data) => {
                tracing::error!("session error from service: {}", data.message());
                self.machine.on_error();
                self.stop(false).await;
            }
            ServerEvent::Close { reason } => {
                tracing::info!("service closed the session: {:?}", reason);
                self.stop(false).await;
            }
        }
    }

    /// Forwards one microphone chunk (already resampled to the service input
    /// rate). Transmission is continuous and never gated by session state;
    /// the VAD result only feeds the advisory UI transitions.
    pub async fn handle_audio_chunk(&mut self, samples: &[f32]) -> Result<(), SessionError> {
        if let Some(link) = self.link.as_mut() {
            link.append_audio(codec::encode(samples)).await?;
        }
        if let Some(edge) = self.vad.process_chunk(samples) {
            self.machine.on_vad(edge);
        }
        Ok(())
    }

    /// Acknowledges a finished breathing exercise. Sends exactly one result
    /// tagged with the remembered correlation id; with nothing pending this
    /// is a no-op.
    pub async fn finish_breathing_exercise(&mut self) -> Result<(), SessionError> {
        let Some(pending) = self.dispatcher.take_pending() else {
            return Ok(());
        };
        let link = self.link.as_mut().ok_or(SessionError::NotConnected)?;
        link.send_tool_result(
            &pending.call_id,
            &pending.name,
            serde_json::json!({ "status": "completed" }),
        )
        .await
        .map_err(|e| {
            // The exercise UI already closed client-side; log and move on.
            tracing::warn!("tool result delivery failed: {}", e);
            e
        })
    }

    /// Stops the session and releases resources. Idempotent and safe to call
    /// re-entrantly, e.g. once from an error path and once from a user click:
    /// teardown runs exactly once, and so does the pipeline.
    ///
    /// `suppress_pipeline` is the crisis flag: it permanently skips the
    /// post-session pipeline for this session.
    pub async fn stop(&mut self, suppress_pipeline: bool) {
        if suppress_pipeline {
            self.pipeline_ran = true;
        }

        if !self.torn_down {
            self.torn_down = true;
            self.playback.stop_all();
            if let Some(mut link) = self.link.take() {
                if let Err(e) = link.close().await {
                    tracing::warn!("error closing session connection: {}", e);
                }
            }
            // An errored session stays surfaced as Error rather than Idle.
            if self.cell.get() != SessionState::Error {
                self.machine.on_stop();
            }
        }

        if !self.pipeline_ran && self.session.has_exchange() {
            self.pipeline_ran = true;
            let errored = self.cell.get() == SessionState::Error;
            self.cell.set(SessionState::Processing);

            let outcome = pipeline::run(self.distiller.as_ref(), &self.session, &self.memory).await;
            self.session.notes = Some(outcome.notes);
            self.session.summary = Some(outcome.summary);
            if let Some(memory) = outcome.memory {
                self.memory = memory;
            }

            self.cell.set(if errored {
                SessionState::Error
            } else {
                SessionState::Idle
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::MockServiceSession;
    use crate::pipeline::MockDistiller;
    use crate::playback::test_support::RecordingSink;
    use crate::tools::{BREATHING_EXERCISE_TOOL, CRISIS_TOOL};
    use aura_realtime_types::events::server::{
        AudioDeltaEvent, InputTranscriptDeltaEvent, OutputTranscriptDeltaEvent,
        SessionCreatedEvent, ToolCallEvent,
    };
    use aura_realtime_types::journal::Speaker;
    use aura_realtime_types::tools::ToolCallInvocation;

    type TestEngine = SessionEngine<MockServiceSession, RecordingSink>;

    fn engine(distiller: MockDistiller) -> (TestEngine, tokio::sync::mpsc::Receiver<UiEvent>) {
        let (ui_tx, ui_rx) = tokio::sync::mpsc::channel(16);
        let engine = SessionEngine::new(RecordingSink::default(), Arc::new(distiller), ui_tx);
        (engine, ui_rx)
    }

    fn quiet_link() -> MockServiceSession {
        let mut link = MockServiceSession::new();
        link.expect_configure().returning(|_| Ok(()));
        link.expect_append_audio().returning(|_| Ok(()));
        link.expect_close().returning(|| Ok(()));
        link
    }

    async fn start_listening(engine: &mut TestEngine, link: MockServiceSession) {
        let config = default_session_config(&AuraMemory::default());
        engine
            .start(link, config, SessionRecord::new("check-in".to_string()))
            .await
            .unwrap();
        engine
            .handle_server_event(ServerEvent::SessionCreated(SessionCreatedEvent::new(
                "s-1".to_string(),
            )))
            .await;
        assert_eq!(engine.state(), SessionState::Listening);
    }

    /// Runs one full exchange so the transcript holds more than the greeting.
    async fn complete_exchange(engine: &mut TestEngine) {
        engine
            .handle_server_event(ServerEvent::InputTranscriptDelta(
                InputTranscriptDeltaEvent::new("I had a rough day.".to_string()),
            ))
            .await;
        engine
            .handle_server_event(ServerEvent::OutputTranscriptDelta(
                OutputTranscriptDeltaEvent::new("I'm sorry to hear that.".to_string()),
            ))
            .await;
        engine.handle_server_event(ServerEvent::TurnComplete).await;
    }

    fn tool_call(id: &str, name: &str) -> ServerEvent {
        ServerEvent::ToolCall(ToolCallEvent::new(vec![ToolCallInvocation::new(
            id.to_string(),
            name.to_string(),
            serde_json::json!({}),
        )]))
    }

    #[tokio::test]
    async fn turn_complete_commits_user_then_aura() {
        let (mut engine, _ui) = engine(MockDistiller::new());
        start_listening(&mut engine, quiet_link()).await;
        complete_exchange(&mut engine).await;

        let transcript = &engine.session().transcript;
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript[0].speaker, Speaker::User);
        assert_eq!(transcript[1].speaker, Speaker::Aura);
        assert_eq!(engine.state(), SessionState::Listening);
    }

    #[tokio::test]
    async fn malformed_audio_is_dropped_and_the_session_continues() {
        let (mut engine, _ui) = engine(MockDistiller::new());
        start_listening(&mut engine, quiet_link()).await;

        engine
            .handle_server_event(ServerEvent::AudioDelta(AudioDeltaEvent::new(
                "&&& not base64".to_string(),
            )))
            .await;
        assert_eq!(engine.playback_mut().active_handles(), 0);
        assert_eq!(engine.state(), SessionState::Listening);

        let good = codec::encode(&[0.1f32; 2400]);
        engine
            .handle_server_event(ServerEvent::AudioDelta(AudioDeltaEvent::new(good)))
            .await;
        assert_eq!(engine.playback_mut().active_handles(), 1);
        assert_eq!(engine.state(), SessionState::Speaking);
    }

    #[tokio::test]
    async fn interruption_clears_queued_speech() {
        let (mut engine, _ui) = engine(MockDistiller::new());
        start_listening(&mut engine, quiet_link()).await;

        let chunk = codec::encode(&[0.1f32; 2400]);
        engine
            .handle_server_event(ServerEvent::AudioDelta(AudioDeltaEvent::new(chunk)))
            .await;
        engine.handle_server_event(ServerEvent::Interrupted).await;
        assert_eq!(engine.playback_mut().active_handles(), 0);
    }

    #[tokio::test]
    async fn crisis_stops_the_session_without_running_the_pipeline() {
        // Any distiller call would panic: no expectations are set.
        let (mut engine, mut ui_rx) = engine(MockDistiller::new());
        start_listening(&mut engine, quiet_link()).await;
        complete_exchange(&mut engine).await;
        assert!(engine.session().has_exchange());

        engine
            .handle_server_event(ServerEvent::ToolCall(ToolCallEvent::new(vec![
                ToolCallInvocation::new(
                    "tc-a".to_string(),
                    BREATHING_EXERCISE_TOOL.to_string(),
                    serde_json::json!({}),
                ),
                ToolCallInvocation::new(
                    "tc-b".to_string(),
                    CRISIS_TOOL.to_string(),
                    serde_json::json!({}),
                ),
            ])))
            .await;

        assert_eq!(engine.state(), SessionState::Idle);
        assert!(engine.session().notes.is_none());
        assert!(engine.session().summary.is_none());
        assert!(matches!(ui_rx.recv().await.unwrap(), UiEvent::CrisisResources));

        // A later manual stop must not resurrect the pipeline.
        engine.stop(false).await;
        assert!(engine.session().notes.is_none());
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let (mut engine, _ui) = engine(MockDistiller::new());
        let mut link = MockServiceSession::new();
        link.expect_configure().returning(|_| Ok(()));
        link.expect_close().times(1).returning(|| Ok(()));
        start_listening(&mut engine, link).await;

        engine.stop(false).await;
        engine.stop(false).await;
        assert_eq!(engine.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn breathing_exercise_round_trip_sends_exactly_one_result() {
        let (mut engine, mut ui_rx) = engine(MockDistiller::new());
        let mut link = MockServiceSession::new();
        link.expect_configure().returning(|_| Ok(()));
        link.expect_close().returning(|| Ok(()));
        link.expect_send_tool_result()
            .times(1)
            .withf(|call_id, name, _| call_id == "tc-1" && name == BREATHING_EXERCISE_TOOL)
            .returning(|_, _, _| Ok(()));
        start_listening(&mut engine, link).await;

        engine
            .handle_server_event(tool_call("tc-1", BREATHING_EXERCISE_TOOL))
            .await;
        assert!(matches!(
            ui_rx.recv().await.unwrap(),
            UiEvent::BreathingExercise { .. }
        ));

        engine.finish_breathing_exercise().await.unwrap();
        // Nothing pending anymore: the second finish sends nothing.
        engine.finish_breathing_exercise().await.unwrap();
    }

    #[tokio::test]
    async fn pipeline_updates_session_and_replaces_memory() {
        let mut distiller = MockDistiller::new();
        distiller
            .expect_session_notes()
            .returning(|_| Ok("clinical notes".to_string()));
        distiller
            .expect_user_summary()
            .returning(|_| Ok("you did well".to_string()));
        distiller.expect_updated_memory().returning(|_, _| {
            Ok(AuraMemory {
                recurring_themes: vec!["work stress".to_string()],
                ..AuraMemory::default()
            })
        });
        let (mut engine, _ui) = engine(distiller);
        start_listening(&mut engine, quiet_link()).await;
        complete_exchange(&mut engine).await;

        engine.stop(false).await;
        assert_eq!(engine.session().notes.as_deref(), Some("clinical notes"));
        assert_eq!(engine.session().summary.as_deref(), Some("you did well"));
        assert_eq!(
            engine.memory().recurring_themes,
            vec!["work stress".to_string()]
        );
    }

    #[tokio::test]
    async fn failed_memory_update_keeps_the_prior_profile() {
        let mut distiller = MockDistiller::new();
        distiller
            .expect_session_notes()
            .returning(|_| Ok("notes".to_string()));
        distiller
            .expect_user_summary()
            .returning(|_| Ok("summary".to_string()));
        distiller
            .expect_updated_memory()
            .returning(|_, _| Err(anyhow::anyhow!("unavailable")));

        let prior = AuraMemory {
            goals: vec!["journal daily".to_string()],
            ..AuraMemory::default()
        };
        let (engine, _ui) = engine(distiller);
        let mut engine = engine.with_memory(prior.clone());
        start_listening(&mut engine, quiet_link()).await;
        complete_exchange(&mut engine).await;

        engine.stop(false).await;
        assert_eq!(engine.session().notes.as_deref(), Some("notes"));
        assert_eq!(engine.memory(), &prior);
    }

    #[tokio::test]
    async fn greeting_only_session_skips_the_pipeline() {
        let (mut engine, _ui) = engine(MockDistiller::new());
        start_listening(&mut engine, quiet_link()).await;
        engine
            .handle_server_event(ServerEvent::OutputTranscriptDelta(
                OutputTranscriptDeltaEvent::new("Hello, how are you today?".to_string()),
            ))
            .await;
        engine.handle_server_event(ServerEvent::TurnComplete).await;
        assert_eq!(engine.session().transcript.len(), 1);

        engine.stop(false).await;
        assert!(engine.session().notes.is_none());
    }

    #[tokio::test]
    async fn audio_chunks_are_sent_regardless_of_ui_state() {
        let (mut engine, _ui) = engine(MockDistiller::new());
        let mut link = MockServiceSession::new();
        link.expect_configure().returning(|_| Ok(()));
        link.expect_close().returning(|| Ok(()));
        link.expect_append_audio().times(3).returning(|_| Ok(()));
        start_listening(&mut engine, link).await;

        let loud = vec![0.5f32; 480];
        let quiet = vec![0.0f32; 480];
        engine.handle_audio_chunk(&loud).await.unwrap();
        assert_eq!(engine.state(), SessionState::UserSpeaking);
        engine.handle_audio_chunk(&loud).await.unwrap();
        engine.handle_audio_chunk(&quiet).await.unwrap();
        assert_eq!(engine.state(), SessionState::Processing);
    }

    #[tokio::test]
    async fn cannot_start_while_a_session_is_active() {
        let (mut engine, _ui) = engine(MockDistiller::new());
        start_listening(&mut engine, quiet_link()).await;

        let config = default_session_config(&AuraMemory::default());
        let result = engine
            .start(
                quiet_link(),
                config,
                SessionRecord::new("second".to_string()),
            )
            .await;
        assert!(matches!(result, Err(SessionError::AlreadyActive)));
    }

    #[test]
    fn instructions_embed_the_memory_profile() {
        let memory = AuraMemory {
            key_relationships: vec!["sister Maya".to_string()],
            goals: vec!["run twice a week".to_string()],
            ..AuraMemory::default()
        };
        let instructions = aura_instructions(&memory);
        assert!(instructions.contains("sister Maya"));
        assert!(instructions.contains("run twice a week"));
        assert!(instructions.contains("Aura"));
    }
}
