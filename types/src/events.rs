pub mod client;
pub mod server;

use client::*;
use server::*;

/// Outbound messages sent over the streaming session.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    #[serde(rename = "session.configure")]
    SessionConfigure(SessionConfigureEvent),
    #[serde(rename = "input_audio.append")]
    InputAudioAppend(InputAudioAppendEvent),
    #[serde(rename = "tool.result")]
    ToolResult(ToolResultEvent),
}

/// Inbound messages received over the streaming session, one variant per
/// message. Dispatch once per message; fields are per-variant, never probed
/// across variants.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    #[serde(rename = "close")]
    Close { reason: Option<String> },
    #[serde(rename = "error")]
    Error(ErrorEvent),
    #[serde(rename = "session.created")]
    SessionCreated(SessionCreatedEvent),
    #[serde(rename = "transcript.input.delta")]
    InputTranscriptDelta(InputTranscriptDeltaEvent),
    #[serde(rename = "transcript.output.delta")]
    OutputTranscriptDelta(OutputTranscriptDeltaEvent),
    #[serde(rename = "response.audio.delta")]
    AudioDelta(AudioDeltaEvent),
    #[serde(rename = "turn.complete")]
    TurnComplete,
    #[serde(rename = "tool.call")]
    ToolCall(ToolCallEvent),
    #[serde(rename = "interrupted")]
    Interrupted,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_events_round_trip_by_tag() {
        let event: ServerEvent =
            serde_json::from_str(r#"{"type":"transcript.input.delta","text":"hello"}"#).unwrap();
        match event {
            ServerEvent::InputTranscriptDelta(e) => assert_eq!(e.text(), "hello"),
            other => panic!("unexpected variant: {other:?}"),
        }

        let event: ServerEvent = serde_json::from_str(r#"{"type":"turn.complete"}"#).unwrap();
        assert!(matches!(event, ServerEvent::TurnComplete));

        let event: ServerEvent = serde_json::from_str(
            r#"{"type":"tool.call","calls":[{"id":"tc-1","name":"start_breathing_exercise","args":{}}]}"#,
        )
        .unwrap();
        match event {
            ServerEvent::ToolCall(e) => {
                assert_eq!(e.calls().len(), 1);
                assert_eq!(e.calls()[0].id(), "tc-1");
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn client_events_serialize_with_tag() {
        let event = ClientEvent::ToolResult(ToolResultEvent::new(
            "tc-1".to_string(),
            "start_breathing_exercise".to_string(),
            serde_json::json!({"status": "completed"}),
        ));
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "tool.result");
        assert_eq!(json["call_id"], "tc-1");
    }
}
