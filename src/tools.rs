use crate::playback::{Clock, PlaybackScheduler, PlaybackSink};
use aura_realtime_types::journal::{CognitiveDistortion, PendingToolCall, SessionRecord};
use aura_realtime_types::tools::{FunctionTool, Tool, ToolCallInvocation};

pub const BREATHING_EXERCISE_TOOL: &str = "start_breathing_exercise";
pub const FLAG_DISTORTION_TOOL: &str = "flag_cognitive_distortion";
pub const CRISIS_TOOL: &str = "trigger_crisis_support";

/// Closed set of tools the model may invoke. Names the service sends that we
/// do not recognize stay a no-op so newer model revisions cannot break us.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolName {
    BreathingExercise,
    FlagDistortion,
    CrisisIntervention,
    Unknown(String),
}

impl ToolName {
    pub fn parse(name: &str) -> Self {
        match name {
            BREATHING_EXERCISE_TOOL => ToolName::BreathingExercise,
            FLAG_DISTORTION_TOOL => ToolName::FlagDistortion,
            CRISIS_TOOL => ToolName::CrisisIntervention,
            other => ToolName::Unknown(other.to_string()),
        }
    }
}

/// Tool schemas declared to the model when the session is configured.
pub fn aura_toolset() -> Vec<Tool> {
    vec![
        Tool::Function(FunctionTool::new(
            BREATHING_EXERCISE_TOOL.to_string(),
            "Guide the user through a calming breathing exercise. Use when the user sounds \
             overwhelmed, anxious or asks to slow down."
                .to_string(),
            serde_json::json!({
                "type": "object",
                "properties": {
                    "cycles": {
                        "type": "integer",
                        "description": "Number of breath cycles, defaults to 3"
                    }
                }
            }),
        )),
        Tool::Function(FunctionTool::new(
            FLAG_DISTORTION_TOOL.to_string(),
            "Tag the user's most recent statement with the cognitive distortion it exhibits."
                .to_string(),
            serde_json::json!({
                "type": "object",
                "properties": {
                    "distortion_type": {
                        "type": "string",
                        "description": "Name of the distortion, e.g. catastrophizing"
                    },
                    "statement": {
                        "type": "string",
                        "description": "The statement that exhibits the distortion"
                    }
                },
                "required": ["distortion_type", "statement"]
            }),
        )),
        Tool::Function(FunctionTool::new(
            CRISIS_TOOL.to_string(),
            "Immediately surface crisis support resources. Use whenever the user expresses \
             intent to harm themselves or others."
                .to_string(),
            serde_json::json!({
                "type": "object",
                "properties": {}
            }),
        )),
    ]
}

/// Side effects the dispatcher asks the embedding UI to perform.
#[derive(Debug, Clone)]
pub enum UiEvent {
    /// Show the breathing-exercise overlay; `args` carries the model's
    /// requested parameters verbatim.
    BreathingExercise { args: serde_json::Value },
    /// Show crisis support resources. Non-negotiable.
    CrisisResources,
    /// A distortion tag was attached to the transcript.
    DistortionFlagged(CognitiveDistortion),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DispatchOutcome {
    /// When set, the caller must force-stop the session with the
    /// summarization-suppression flag.
    pub crisis: bool,
}

/// Routes model-invoked tool calls to their side effects.
pub struct ToolDispatcher {
    pending: Option<PendingToolCall>,
    ui_tx: tokio::sync::mpsc::Sender<UiEvent>,
}

impl ToolDispatcher {
    pub fn new(ui_tx: tokio::sync::mpsc::Sender<UiEvent>) -> Self {
        Self {
            pending: None,
            ui_tx,
        }
    }

    pub fn pending(&self) -> Option<&PendingToolCall> {
        self.pending.as_ref()
    }

    /// Takes the outstanding breathing-exercise correlation token, if any.
    pub fn take_pending(&mut self) -> Option<PendingToolCall> {
        self.pending.take()
    }

    /// Processes one inbound batch of tool invocations.
    ///
    /// Crisis intervention preempts unconditionally: it is handled before any
    /// other call in the batch no matter where it appears, and the remainder
    /// of the batch is discarded since the session is about to be stopped.
    pub fn dispatch<S: PlaybackSink, C: Clock>(
        &mut self,
        calls: &[ToolCallInvocation],
        session: &mut SessionRecord,
        playback: &mut PlaybackScheduler<S, C>,
    ) -> DispatchOutcome {
        if calls
            .iter()
            .any(|c| ToolName::parse(c.name()) == ToolName::CrisisIntervention)
        {
            tracing::warn!("crisis intervention invoked; preempting session");
            playback.stop_all();
            self.pending = None;
            self.emit(UiEvent::CrisisResources);
            return DispatchOutcome { crisis: true };
        }

        for call in calls {
            match ToolName::parse(call.name()) {
                ToolName::BreathingExercise => {
                    tracing::info!("breathing exercise requested, call_id={}", call.id());
                    playback.stop_all();
                    self.pending = Some(PendingToolCall {
                        call_id: call.id().to_string(),
                        name: call.name().to_string(),
                    });
                    self.emit(UiEvent::BreathingExercise {
                        args: call.args().clone(),
                    });
                }
                ToolName::FlagDistortion => match session.last_user_entry_id() {
                    Some(entry_id) => {
                        let kind = call
                            .args()
                            .get("distortion_type")
                            .and_then(|v| v.as_str())
                            .unwrap_or("unspecified")
                            .to_string();
                        let statement = call
                            .args()
                            .get("statement")
                            .and_then(|v| v.as_str())
                            .unwrap_or_default()
                            .to_string();
                        let distortion = CognitiveDistortion {
                            kind,
                            statement,
                            entry_id,
                        };
                        session.distortions.push(distortion.clone());
                        self.emit(UiEvent::DistortionFlagged(distortion));
                    }
                    None => {
                        tracing::warn!("distortion flagged before any user turn; ignoring");
                    }
                },
                ToolName::CrisisIntervention => {
                    // Already handled by the preemption scan above.
                }
                ToolName::Unknown(name) => {
                    tracing::debug!("ignoring unknown tool call: {}", name);
                }
            }
        }
        DispatchOutcome::default()
    }

    fn emit(&self, event: UiEvent) {
        if let Err(e) = self.ui_tx.try_send(event) {
            tracing::warn!("failed to deliver UI event: {:?}", e);
        }
    }
}
