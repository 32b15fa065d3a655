use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;
use webrtc::ice_transport::ice_candidate::RTCIceCandidateInit;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::track::track_local::track_local_static_rtp::TrackLocalStaticRTP;

use crate::connection::Connection;
use crate::id_types::ParticipantId;
use crate::protocol::ParticipantInfo;

/// A participant's role, fixed at join time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Presenter,
    Viewer,
}

/// Viewer connection state machine.
///
/// `Idle -> Waiting -> Connecting -> Connected` on success;
/// `Connecting -> Failed` on setup failure; presenter departure forces every
/// viewer back to `Waiting`. The presenter's state lives in the room flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerState {
    Idle,
    Waiting,
    Connecting,
    Connected,
    Failed,
}

/// One connected client: identity, signaling channel, media transport and
/// the state the signaling reader and transport callbacks share.
///
/// `state`, `pending_ice`, `transport` and the track slots are guarded by
/// separate locks so transport event callbacks do not contend with the
/// signaling reader on one big lock.
pub struct Participant {
    pub id: ParticipantId,
    pub name: String,
    pub role: Role,
    pub connection: Arc<Connection>,
    transport: Mutex<Option<Arc<RTCPeerConnection>>>,
    local_video: Mutex<Option<Arc<TrackLocalStaticRTP>>>,
    local_audio: Mutex<Option<Arc<TrackLocalStaticRTP>>>,
    state: Mutex<ViewerState>,
    pending_ice: Mutex<Vec<RTCIceCandidateInit>>,
    /// Serializes transport replacement (push, ICE restart) per participant.
    pub negotiation_lock: Mutex<()>,
}

impl Participant {
    pub fn new(id: ParticipantId, name: String, role: Role, connection: Arc<Connection>) -> Self {
        Participant {
            id,
            name,
            role,
            connection,
            transport: Mutex::new(None),
            local_video: Mutex::new(None),
            local_audio: Mutex::new(None),
            state: Mutex::new(ViewerState::Idle),
            pending_ice: Mutex::new(Vec::new()),
            negotiation_lock: Mutex::new(()),
        }
    }

    pub fn is_presenter(&self) -> bool {
        self.role == Role::Presenter
    }

    /// Public info view shared with other participants.
    pub fn info(&self) -> ParticipantInfo {
        ParticipantInfo {
            id: self.id.to_string(),
            name: self.name.clone(),
            is_presenter: self.is_presenter(),
        }
    }

    pub async fn state(&self) -> ViewerState {
        *self.state.lock().await
    }

    pub async fn set_state(&self, next: ViewerState) {
        let mut state = self.state.lock().await;
        if *state != next {
            debug!(participant = %self.id, from = ?*state, to = ?next, "Viewer state transition");
            *state = next;
        }
    }

    /// Queues a candidate that arrived before the remote description was set.
    pub async fn push_pending_ice(&self, candidate: RTCIceCandidateInit) {
        self.pending_ice.lock().await.push(candidate);
    }

    /// Atomically takes every queued candidate, preserving arrival order.
    pub async fn drain_pending_ice(&self) -> Vec<RTCIceCandidateInit> {
        std::mem::take(&mut *self.pending_ice.lock().await)
    }

    pub async fn clear_pending_ice(&self) {
        self.pending_ice.lock().await.clear();
    }

    pub async fn pending_ice_len(&self) -> usize {
        self.pending_ice.lock().await.len()
    }

    pub async fn set_transport(&self, pc: Arc<RTCPeerConnection>) {
        *self.transport.lock().await = Some(pc);
    }

    pub async fn transport(&self) -> Option<Arc<RTCPeerConnection>> {
        self.transport.lock().await.clone()
    }

    pub async fn take_transport(&self) -> Option<Arc<RTCPeerConnection>> {
        self.transport.lock().await.take()
    }

    /// Takes and closes the current transport, if any. Idempotent.
    pub async fn close_transport(&self) {
        if let Some(pc) = self.take_transport().await {
            if let Err(e) = pc.close().await {
                debug!(participant = %self.id, error = %e, "Error closing peer connection");
            }
        }
    }

    pub async fn set_local_tracks(
        &self,
        video: Arc<TrackLocalStaticRTP>,
        audio: Arc<TrackLocalStaticRTP>,
    ) {
        *self.local_video.lock().await = Some(video);
        *self.local_audio.lock().await = Some(audio);
    }

    pub async fn local_tracks(&self) -> Option<(Arc<TrackLocalStaticRTP>, Arc<TrackLocalStaticRTP>)> {
        let video = self.local_video.lock().await.clone()?;
        let audio = self.local_audio.lock().await.clone()?;
        Some((video, audio))
    }

    pub async fn local_video(&self) -> Option<Arc<TrackLocalStaticRTP>> {
        self.local_video.lock().await.clone()
    }

    pub async fn local_audio(&self) -> Option<Arc<TrackLocalStaticRTP>> {
        self.local_audio.lock().await.clone()
    }

    pub async fn has_local_video(&self) -> bool {
        self.local_video.lock().await.is_some()
    }

    pub async fn clear_local_tracks(&self) {
        *self.local_video.lock().await = None;
        *self.local_audio.lock().await = None;
    }
}
