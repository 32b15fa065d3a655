use serde::{Deserialize, Serialize};
use webrtc::ice_transport::ice_candidate::RTCIceCandidateInit;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;

/// Public view of a participant, shared in `joined` / `participant-joined` /
/// `hand-raised` frames.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantInfo {
    pub id: String,
    pub name: String,
    pub is_presenter: bool,
}

/// Reason attached to a `waiting-for-stream` reply.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WaitReason {
    NoPresenter,
    NotReady,
    NoVideo,
}

/// Frames a client may send. Every frame is a JSON object with a `type` tag;
/// session descriptions and ICE candidates travel verbatim in `payload`.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientMessage {
    #[serde(rename_all = "camelCase")]
    Join {
        #[serde(default)]
        room_id: Option<String>,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        is_presenter: bool,
    },
    Offer {
        payload: RTCSessionDescription,
    },
    Answer {
        payload: RTCSessionDescription,
    },
    IceCandidate {
        payload: RTCIceCandidateInit,
    },
    RequestStream,
    Chat {
        payload: serde_json::Value,
    },
    RaiseHand,
}

/// Frames the server sends.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerMessage {
    #[serde(rename_all = "camelCase")]
    Joined {
        room_id: String,
        participant_id: String,
        participants: Vec<ParticipantInfo>,
        has_presenter: bool,
        stream_ready: bool,
    },
    #[serde(rename_all = "camelCase")]
    ParticipantJoined {
        participant: ParticipantInfo,
    },
    #[serde(rename_all = "camelCase")]
    ParticipantLeft {
        participant_id: String,
    },
    Offer {
        payload: RTCSessionDescription,
    },
    Answer {
        payload: RTCSessionDescription,
    },
    IceCandidate {
        payload: RTCIceCandidateInit,
    },
    StreamAvailable,
    StreamConnected,
    StreamEnded,
    #[serde(rename_all = "camelCase")]
    WaitingForStream {
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<WaitReason>,
    },
    StreamNotReady,
    ConnectionFailed,
    #[serde(rename_all = "camelCase")]
    HandRaised {
        participant: ParticipantInfo,
    },
    #[serde(rename_all = "camelCase")]
    Chat {
        sender_id: String,
        sender_name: String,
        payload: serde_json::Value,
    },
    Error {
        message: String,
    },
}

impl ServerMessage {
    /// Serializes the frame once; broadcast helpers share the resulting string.
    pub fn to_json(&self) -> String {
        // ServerMessage contains no non-serializable state; failure here would
        // be a programming error.
        serde_json::to_string(self).unwrap_or_else(|e| {
            tracing::error!(error = %e, "Failed to serialize server frame");
            String::from("{\"type\":\"error\",\"message\":\"internal serialization error\"}")
        })
    }
}
