//! Defines the WebSocket message protocol between the browser client and the API server.
//!
//! The browser hosts the display, the camera, the face detector and the
//! speech synthesizer; the server drives them with [`ServerMessage`]s and
//! hears back through [`ClientMessage`]s.

use affect_tutor_core::{
    FaceBox, TutorEvent, Utterance, UtteranceId, affect::detector::FaceObservation,
};
use serde::{Deserialize, Serialize};

/// Messages sent from the client (browser) to the server.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Chooses the subject to teach.
    Select { subject: String },
    /// Starts the lesson for the selected subject.
    Start,
    /// Stops the lesson.
    Stop,
    /// Stops the lesson and returns to subject selection.
    Back,
    /// The speech synthesizer finished (or abandoned) an utterance.
    SpeechEnded { utterance_id: UtteranceId },
    /// Reply to `load_models`.
    ModelsLoaded,
    ModelsFailed { reason: String },
    /// Reply to `acquire_camera`.
    CameraReady,
    CameraFailed { reason: String },
    /// Latest detector result for the current video frame.
    Observation(FaceObservation),
    /// The detector found no face in the current video frame.
    NoFace,
}

/// Messages sent from the server to the client (browser).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Replaces the status line.
    Status { message: String },
    /// Replaces the lesson text.
    Lesson { text: String },
    /// Redraws the detection overlay; a missing face clears it.
    Detection { face: Option<FaceBox> },
    /// Speak this text, then reply with `speech_ended`.
    Speak {
        utterance_id: UtteranceId,
        text: String,
        lang: String,
        pitch: f32,
        rate: f32,
    },
    /// Cancel all queued and playing speech.
    CancelSpeech,
    /// Load the face and expression models, then reply.
    LoadModels,
    /// Open the camera, then reply.
    AcquireCamera,
    /// Stop the camera stream.
    ReleaseCamera,
    /// Reports a rejected request to the client.
    Error { message: String },
}

impl From<TutorEvent> for ServerMessage {
    fn from(event: TutorEvent) -> Self {
        match event {
            TutorEvent::Status(message) => ServerMessage::Status { message },
            TutorEvent::LessonText(text) => ServerMessage::Lesson { text },
            TutorEvent::Detection(face) => ServerMessage::Detection { face },
        }
    }
}

impl From<Utterance> for ServerMessage {
    fn from(utterance: Utterance) -> Self {
        ServerMessage::Speak {
            utterance_id: utterance.id,
            text: utterance.text,
            lang: utterance.lang.to_string(),
            pitch: utterance.params.pitch,
            rate: utterance.params.rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use affect_tutor_core::VoiceParameters;
    use serde_json::json;

    #[test]
    fn test_client_messages_parse_by_type_tag() {
        let select: ClientMessage =
            serde_json::from_str(r#"{"type":"select","subject":"adsa"}"#).unwrap();
        assert_eq!(
            select,
            ClientMessage::Select {
                subject: "adsa".to_string()
            }
        );

        let ended: ClientMessage =
            serde_json::from_str(r#"{"type":"speech_ended","utterance_id":7}"#).unwrap();
        assert_eq!(
            ended,
            ClientMessage::SpeechEnded {
                utterance_id: UtteranceId(7)
            }
        );

        let start: ClientMessage = serde_json::from_str(r#"{"type":"start"}"#).unwrap();
        assert_eq!(start, ClientMessage::Start);
    }

    #[test]
    fn test_observation_carries_scores_and_box() {
        let raw = json!({
            "type": "observation",
            "expressions": {"happy": 0.8, "sad": 0.1},
            "age": 12.0,
            "gender": "female",
            "box": {"x": 1.0, "y": 2.0, "width": 30.0, "height": 40.0}
        });
        let msg: ClientMessage = serde_json::from_value(raw).unwrap();
        let ClientMessage::Observation(observation) = msg else {
            panic!("expected an observation");
        };
        assert_eq!(observation.expressions.len(), 2);
        assert_eq!(observation.age, Some(12.0));
        assert_eq!(observation.face_box.map(|b| b.width), Some(30.0));
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"dance"}"#).is_err());
    }

    #[test]
    fn test_speak_message_shape() {
        let utterance = Utterance {
            id: UtteranceId(3),
            text: "Hello".to_string(),
            lang: "en-US",
            params: VoiceParameters {
                pitch: 1.3,
                rate: 1.05,
            },
        };
        let value = serde_json::to_value(ServerMessage::from(utterance)).unwrap();
        assert_eq!(value["type"], "speak");
        assert_eq!(value["utterance_id"], 3);
        assert_eq!(value["lang"], "en-US");
        assert_eq!(value["text"], "Hello");
    }

    #[test]
    fn test_tutor_events_map_to_server_messages() {
        assert_eq!(
            ServerMessage::from(TutorEvent::Status("Waiting...".into())),
            ServerMessage::Status {
                message: "Waiting...".into()
            }
        );
        let cleared = serde_json::to_value(ServerMessage::from(TutorEvent::Detection(None))).unwrap();
        assert_eq!(cleared, json!({"type": "detection", "face": null}));
        let unit = serde_json::to_value(ServerMessage::CancelSpeech).unwrap();
        assert_eq!(unit, json!({"type": "cancel_speech"}));
    }
}
