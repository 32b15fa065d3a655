use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::info;

use crate::id_types::{ParticipantId, RoomId};
use crate::metrics::SFU_ACTIVE_PARTICIPANTS;
use crate::participant::{Participant, Role, ViewerState};
use crate::protocol::{ParticipantInfo, ServerMessage};

/// The unit of sharing: one presenter, any number of viewers.
///
/// The room owns the participant map. The presenter slot is a weak
/// back-reference by id, cleared explicitly on removal and never trusted
/// after `remove_participant`.
pub struct Room {
    pub id: RoomId,
    participants: DashMap<ParticipantId, Arc<Participant>>,
    presenter: Mutex<Option<ParticipantId>>,
    /// True once the presenter's video track has been received.
    stream_ready: AtomicBool,
    /// True once the presenter's transport reached ICE-connected.
    presenter_ice_connected: AtomicBool,
    /// At-most-once latch for the `stream-available` broadcast, reset when
    /// the presenter leaves.
    stream_available_sent: AtomicBool,
}

impl Room {
    pub fn new(id: RoomId) -> Self {
        Room {
            id,
            participants: DashMap::new(),
            presenter: Mutex::new(None),
            stream_ready: AtomicBool::new(false),
            presenter_ice_connected: AtomicBool::new(false),
            stream_available_sent: AtomicBool::new(false),
        }
    }

    pub async fn add_participant(&self, participant: Arc<Participant>) {
        if participant.is_presenter() {
            *self.presenter.lock().await = Some(participant.id.clone());
        }
        self.participants
            .insert(participant.id.clone(), participant);
        SFU_ACTIVE_PARTICIPANTS.inc();
    }

    /// Removes a participant and closes its transport. Idempotent.
    ///
    /// If the removed participant was the presenter, the room loses all
    /// readiness state and every remaining viewer is reset: transport
    /// closed, pending ICE cleared, state forced to `Waiting`.
    ///
    /// Returns the removed participant and whether it was the presenter.
    pub async fn remove_participant(
        &self,
        id: &ParticipantId,
    ) -> Option<(Arc<Participant>, bool)> {
        let (_, removed) = self.participants.remove(id)?;
        SFU_ACTIVE_PARTICIPANTS.dec();

        let was_presenter = {
            let mut presenter = self.presenter.lock().await;
            if presenter.as_ref() == Some(id) {
                *presenter = None;
                true
            } else {
                false
            }
        };

        removed.close_transport().await;

        if was_presenter {
            self.stream_ready.store(false, Ordering::Release);
            self.presenter_ice_connected.store(false, Ordering::Release);
            self.stream_available_sent.store(false, Ordering::Release);
            removed.clear_local_tracks().await;

            for viewer in self.viewers() {
                viewer.close_transport().await;
                viewer.clear_pending_ice().await;
                viewer.set_state(ViewerState::Waiting).await;
            }
            info!(room = %self.id, "Presenter left, viewers reset to waiting");
        }

        Some((removed, was_presenter))
    }

    pub fn get(&self, id: &ParticipantId) -> Option<Arc<Participant>> {
        self.participants.get(id).map(|p| p.value().clone())
    }

    pub async fn presenter(&self) -> Option<Arc<Participant>> {
        let id = self.presenter.lock().await.clone()?;
        self.get(&id)
    }

    pub async fn has_presenter(&self) -> bool {
        self.presenter().await.is_some()
    }

    pub fn stream_ready(&self) -> bool {
        self.stream_ready.load(Ordering::Acquire)
    }

    pub fn set_stream_ready(&self, ready: bool) {
        self.stream_ready.store(ready, Ordering::Release);
    }

    pub fn presenter_ice_connected(&self) -> bool {
        self.presenter_ice_connected.load(Ordering::Acquire)
    }

    pub fn set_presenter_ice_connected(&self, connected: bool) {
        self.presenter_ice_connected
            .store(connected, Ordering::Release);
    }

    /// Clears both readiness flags (presenter transport failed or closed).
    pub fn clear_readiness(&self) {
        self.stream_ready.store(false, Ordering::Release);
        self.presenter_ice_connected.store(false, Ordering::Release);
    }

    /// The single condition under which offers may be pushed to viewers.
    pub async fn fully_ready(&self) -> bool {
        if !self.stream_ready() || !self.presenter_ice_connected() {
            return false;
        }
        match self.presenter().await {
            Some(p) => p.has_local_video().await,
            None => false,
        }
    }

    /// Returns true exactly once per presenter session; callers broadcast
    /// `stream-available` only on the first true.
    pub fn mark_stream_available(&self) -> bool {
        !self.stream_available_sent.swap(true, Ordering::AcqRel)
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    /// Snapshot of all viewers.
    pub fn viewers(&self) -> Vec<Arc<Participant>> {
        self.participants
            .iter()
            .filter(|e| e.value().role == Role::Viewer)
            .map(|e| e.value().clone())
            .collect()
    }

    /// Snapshot of viewers eligible for a push: neither connected nor
    /// mid-negotiation.
    pub async fn waiting_viewers(&self) -> Vec<Arc<Participant>> {
        let mut waiting = Vec::new();
        for viewer in self.viewers() {
            let state = viewer.state().await;
            if state != ViewerState::Connected && state != ViewerState::Connecting {
                waiting.push(viewer);
            }
        }
        waiting
    }

    pub fn participants_info(&self) -> Vec<ParticipantInfo> {
        self.participants
            .iter()
            .map(|e| e.value().info())
            .collect()
    }

    /// Serializes once, then enqueues on every viewer's connection without
    /// blocking on any of them.
    pub fn broadcast_to_viewers(&self, msg: &ServerMessage) {
        let frame = msg.to_json();
        for viewer in self.viewers() {
            viewer.connection.send_text(frame.clone());
        }
    }

    /// Serializes once, then enqueues on every participant's connection,
    /// optionally excluding one id.
    pub fn broadcast_to_all(&self, msg: &ServerMessage, exclude: Option<&ParticipantId>) {
        let frame = msg.to_json();
        for entry in self.participants.iter() {
            if exclude == Some(entry.key()) {
                continue;
            }
            entry.value().connection.send_text(frame.clone());
        }
    }

    /// Closes every participant's transport (graceful shutdown path).
    pub async fn close_all_transports(&self) {
        let participants: Vec<Arc<Participant>> = self
            .participants
            .iter()
            .map(|e| e.value().clone())
            .collect();
        for participant in participants {
            participant.close_transport().await;
        }
    }
}
