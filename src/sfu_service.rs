use std::sync::{Arc, Weak};

use anyhow::{anyhow, Context, Result};
use futures::StreamExt;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use warp::ws::WebSocket;
use warp::Filter;
use webrtc::ice_transport::ice_candidate::RTCIceCandidateInit;
use webrtc::ice_transport::ice_connection_state::RTCIceConnectionState;
use webrtc::peer_connection::offer_answer_options::RTCOfferOptions;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::rtp_transceiver::rtp_sender::RTCRtpSender;
use webrtc::track::track_local::track_local_static_rtp::TrackLocalStaticRTP;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_remote::TrackRemote;

use crate::config::Config;
use crate::connection::Connection;
use crate::forwarder::{self, RemoteTrackSource};
use crate::hub::Hub;
use crate::id_types::{ParticipantId, RoomId};
use crate::media_setup::MediaSetup;
use crate::metrics::{
    SFU_ICE_RESTARTS_TOTAL, SFU_STREAM_PUSHES_TOTAL, SFU_WEBRTC_CONNECTION_FAILURES_TOTAL,
};
use crate::participant::{Participant, Role, ViewerState};
use crate::protocol::{ClientMessage, ServerMessage, WaitReason};
use crate::room::Room;

/// A participant's live session: the room it joined and its own record.
type Session = (Arc<Room>, Arc<Participant>);

/// The signaling + SFU controller.
///
/// Stateless apart from the hub, the immutable configuration, and the
/// service-wide lock that keeps two presenter renegotiations from
/// interleaving.
#[derive(Clone)]
pub struct SfuService {
    pub hub: Arc<Hub>,
    pub config: Arc<Config>,
    presenter_offer_lock: Arc<Mutex<()>>,
}

/// The `/ws` signaling route: upgrade and hand the socket to the service.
pub fn signaling_route(
    service: SfuService,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let service_filter = warp::any().map(move || service.clone());
    warp::path("ws")
        .and(warp::ws())
        .and(service_filter)
        .map(|ws: warp::ws::Ws, service: SfuService| {
            ws.on_upgrade(move |socket| service.handle_socket(socket))
        })
}

impl SfuService {
    pub fn new(hub: Arc<Hub>, config: Arc<Config>) -> Self {
        SfuService {
            hub,
            config,
            presenter_offer_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Per-connection entry point: owns the read loop and, on exit, the
    /// teardown. Connection close is the sole cancellation signal for
    /// participant-scoped work.
    pub async fn handle_socket(self, socket: WebSocket) {
        let (sink, mut stream) = socket.split();
        let (connection, queue) = Connection::new(self.config.send_buffer_frames);
        let connection = Arc::new(connection);
        Connection::spawn_writer(queue, sink);

        let mut session: Option<Session> = None;

        while let Some(next) = stream.next().await {
            let msg = match next {
                Ok(msg) => msg,
                Err(e) => {
                    debug!(error = %e, "Signaling read error, closing");
                    break;
                }
            };
            if msg.is_close() {
                break;
            }
            let text = match msg.to_str() {
                Ok(text) => text,
                Err(_) => continue, // ping/pong/binary
            };

            let parsed: ClientMessage = match serde_json::from_str(text) {
                Ok(parsed) => parsed,
                Err(e) => {
                    warn!(error = %e, "Dropping malformed signaling frame");
                    connection.send(&ServerMessage::Error {
                        message: format!("malformed message: {}", e),
                    });
                    continue;
                }
            };

            if let Err(e) = self.dispatch(&connection, &mut session, parsed).await {
                warn!(error = %e, "Signaling handler error");
                connection.send(&ServerMessage::Error {
                    message: e.to_string(),
                });
            }
        }

        if let Some((room, participant)) = session.take() {
            self.handle_disconnect(&room, &participant).await;
        }
        connection.close();
    }

    async fn dispatch(
        &self,
        connection: &Arc<Connection>,
        session: &mut Option<Session>,
        msg: ClientMessage,
    ) -> Result<()> {
        match msg {
            ClientMessage::Join {
                room_id,
                name,
                is_presenter,
            } => {
                if session.is_some() {
                    return Err(anyhow!("already joined a room"));
                }
                *session = Some(
                    self.handle_join(connection, room_id, name, is_presenter)
                        .await?,
                );
                Ok(())
            }
            ClientMessage::Offer { payload } => {
                let (room, participant) = Self::require_session(session)?;
                self.handle_offer(&room, &participant, payload).await
            }
            ClientMessage::Answer { payload } => {
                let (_, participant) = Self::require_session(session)?;
                self.handle_answer(&participant, payload).await
            }
            ClientMessage::IceCandidate { payload } => {
                let (_, participant) = Self::require_session(session)?;
                self.handle_ice_candidate(&participant, payload).await
            }
            ClientMessage::RequestStream => {
                let (room, participant) = Self::require_session(session)?;
                self.handle_request_stream(&room, &participant).await
            }
            ClientMessage::Chat { payload } => {
                let (room, participant) = Self::require_session(session)?;
                room.broadcast_to_all(
                    &ServerMessage::Chat {
                        sender_id: participant.id.to_string(),
                        sender_name: participant.name.clone(),
                        payload,
                    },
                    None,
                );
                Ok(())
            }
            ClientMessage::RaiseHand => {
                let (room, participant) = Self::require_session(session)?;
                room.broadcast_to_all(
                    &ServerMessage::HandRaised {
                        participant: participant.info(),
                    },
                    None,
                );
                Ok(())
            }
        }
    }

    fn require_session(session: &Option<Session>) -> Result<Session> {
        session
            .clone()
            .ok_or_else(|| anyhow!("join a room first"))
    }

    /// Transports are replaced wholesale on renegotiation; events from a
    /// replaced transport must not touch the state of its successor.
    async fn is_current_transport(
        participant: &Arc<Participant>,
        pc: &Weak<RTCPeerConnection>,
    ) -> bool {
        let current = match participant.transport().await {
            Some(current) => current,
            None => return false,
        };
        match pc.upgrade() {
            Some(this) => Arc::ptr_eq(&current, &this),
            None => false,
        }
    }

    async fn handle_join(
        &self,
        connection: &Arc<Connection>,
        room_id: Option<String>,
        name: Option<String>,
        is_presenter: bool,
    ) -> Result<Session> {
        let room_id = match room_id {
            Some(id) if !id.is_empty() => RoomId::from(id),
            _ => RoomId::generate(),
        };
        let room = self.hub.get_or_create_room(room_id.clone());

        let role = if is_presenter {
            Role::Presenter
        } else {
            Role::Viewer
        };
        if role == Role::Presenter && room.has_presenter().await {
            // Reap the room again if this refused join was what created it.
            self.hub.cleanup_empty_room(&room_id);
            return Err(anyhow!("room already has a presenter"));
        }

        let id = ParticipantId::generate();
        let name = name
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| format!("guest-{}", &id.as_ref()[..8]));
        let participant = Arc::new(Participant::new(id, name, role, connection.clone()));

        room.add_participant(participant.clone()).await;
        info!(room = %room.id, participant = %participant.id, role = ?role, "Participant joined");

        connection.send(&ServerMessage::Joined {
            room_id: room.id.to_string(),
            participant_id: participant.id.to_string(),
            participants: room.participants_info(),
            has_presenter: room.has_presenter().await,
            stream_ready: room.stream_ready(),
        });
        room.broadcast_to_all(
            &ServerMessage::ParticipantJoined {
                participant: participant.info(),
            },
            Some(&participant.id),
        );

        if role == Role::Viewer {
            if room.fully_ready().await {
                let service = self.clone();
                let push_room = room.clone();
                let viewer = participant.clone();
                tokio::spawn(async move {
                    service.push_offer_to_viewer(push_room, viewer).await;
                });
            } else {
                participant.set_state(ViewerState::Waiting).await;
                connection.send(&ServerMessage::WaitingForStream { reason: None });
            }
        }

        Ok((room, participant))
    }

    /// Inbound media setup for the presenter. Serialized service-wide so two
    /// concurrent renegotiations never interleave.
    async fn handle_offer(
        &self,
        room: &Arc<Room>,
        participant: &Arc<Participant>,
        offer: RTCSessionDescription,
    ) -> Result<()> {
        if !participant.is_presenter() {
            return Err(anyhow!("only the presenter may send an offer"));
        }

        let _guard = self.presenter_offer_lock.lock().await;
        info!(room = %room.id, participant = %participant.id, "Presenter offer received");

        // Replace any previous presenter session wholesale.
        participant.close_transport().await;
        participant.clear_local_tracks().await;
        participant.clear_pending_ice().await;

        match self.setup_presenter_transport(room, participant, offer).await {
            Ok(answer) => {
                participant
                    .connection
                    .send(&ServerMessage::Answer { payload: answer });
                Ok(())
            }
            Err(e) => {
                participant.close_transport().await;
                participant.clear_local_tracks().await;
                SFU_WEBRTC_CONNECTION_FAILURES_TOTAL.inc();
                Err(e)
            }
        }
    }

    async fn setup_presenter_transport(
        &self,
        room: &Arc<Room>,
        participant: &Arc<Participant>,
        offer: RTCSessionDescription,
    ) -> Result<RTCSessionDescription> {
        let api = MediaSetup::create_webrtc_api()?;
        let pc = Arc::new(
            api.new_peer_connection(MediaSetup::rtc_config(&self.config.stun_urls))
                .await
                .context("Failed to create peer connection")?,
        );
        MediaSetup::add_recv_transceivers(&pc).await?;

        let (video, audio) = MediaSetup::create_presenter_tracks();
        participant
            .set_local_tracks(video.clone(), audio.clone())
            .await;

        self.register_presenter_handlers(room, participant, &pc, video, audio);
        participant.set_transport(pc.clone()).await;

        pc.set_remote_description(offer)
            .await
            .context("Failed to set remote description (offer)")?;
        Self::drain_pending_into(participant, &pc).await;

        let answer = pc
            .create_answer(None)
            .await
            .context("Failed to create answer")?;
        // Trickle ICE: send the snapshot taken now, never wait for gathering.
        pc.set_local_description(answer.clone())
            .await
            .context("Failed to set local description")?;

        Ok(answer)
    }

    fn register_presenter_handlers(
        &self,
        room: &Arc<Room>,
        participant: &Arc<Participant>,
        pc: &Arc<RTCPeerConnection>,
        video: Arc<TrackLocalStaticRTP>,
        audio: Arc<TrackLocalStaticRTP>,
    ) {
        // Inbound remote track: start relaying, flip stream-ready on video.
        let service = self.clone();
        let track_room = room.clone();
        let track_presenter = participant.clone();
        let track_pc = Arc::downgrade(pc);
        pc.on_track(Box::new(
            move |track: Arc<TrackRemote>, _receiver, _transceiver| {
                let service = service.clone();
                let room = track_room.clone();
                let presenter = track_presenter.clone();
                let this_pc = track_pc.clone();
                let video = video.clone();
                let audio = audio.clone();
                Box::pin(async move {
                    if !Self::is_current_transport(&presenter, &this_pc).await {
                        return;
                    }
                    let kind = RemoteTrackSource::kind(track.as_ref());
                    info!(room = %room.id, kind = %kind, "Received presenter track");
                    let local = if kind == "video" { video } else { audio };
                    forwarder::spawn_forwarder(track, local);

                    if kind == "video" && !room.stream_ready() {
                        room.set_stream_ready(true);
                        service.evaluate_push(room);
                    }
                })
            },
        ));

        let service = self.clone();
        let ice_room = room.clone();
        let ice_presenter = participant.clone();
        let ice_pc = Arc::downgrade(pc);
        pc.on_ice_connection_state_change(Box::new(move |state: RTCIceConnectionState| {
            info!(participant = %ice_presenter.id, state = %state, "Presenter ICE connection state changed");
            let service = service.clone();
            let room = ice_room.clone();
            let presenter = ice_presenter.clone();
            let this_pc = ice_pc.clone();
            Box::pin(async move {
                if !Self::is_current_transport(&presenter, &this_pc).await {
                    return;
                }
                match state {
                    RTCIceConnectionState::Connected => {
                        room.set_presenter_ice_connected(true);
                        service.evaluate_push(room);
                    }
                    RTCIceConnectionState::Failed => {
                        room.set_presenter_ice_connected(false);
                    }
                    // A brief `disconnected` flap keeps readiness intact.
                    _ => {}
                }
            })
        }));

        let state_room = room.clone();
        let state_presenter = participant.clone();
        let state_pc = Arc::downgrade(pc);
        pc.on_peer_connection_state_change(Box::new(move |state: RTCPeerConnectionState| {
            info!(participant = %state_presenter.id, state = %state, "Presenter connection state changed");
            let room = state_room.clone();
            let presenter = state_presenter.clone();
            let this_pc = state_pc.clone();
            Box::pin(async move {
                match state {
                    RTCPeerConnectionState::Failed | RTCPeerConnectionState::Closed => {
                        if !Self::is_current_transport(&presenter, &this_pc).await {
                            return;
                        }
                        if state == RTCPeerConnectionState::Failed {
                            SFU_WEBRTC_CONNECTION_FAILURES_TOTAL.inc();
                        }
                        room.clear_readiness();
                        room.broadcast_to_viewers(&ServerMessage::StreamEnded);
                    }
                    _ => {}
                }
            })
        }));

        Self::register_ice_candidate_handler(participant, pc);
    }

    /// Local candidates trickle to the client as they are gathered.
    fn register_ice_candidate_handler(participant: &Arc<Participant>, pc: &Arc<RTCPeerConnection>) {
        let connection = participant.connection.clone();
        let id = participant.id.clone();
        pc.on_ice_candidate(Box::new(
            move |candidate: Option<webrtc::ice_transport::ice_candidate::RTCIceCandidate>| {
                let connection = connection.clone();
                let id = id.clone();
                Box::pin(async move {
                    if let Some(candidate) = candidate {
                        match candidate.to_json() {
                            Ok(init) => {
                                debug!(participant = %id, "Generated ICE candidate");
                                connection.send(&ServerMessage::IceCandidate { payload: init });
                            }
                            Err(e) => {
                                warn!(participant = %id, error = %e, "Failed to serialize ICE candidate");
                            }
                        }
                    }
                })
            },
        ));
    }

    /// Transport events land here from library-internal tasks; push
    /// evaluation runs on its own short-lived task instead of re-entering
    /// under whatever lock the event fired from.
    fn evaluate_push(&self, room: Arc<Room>) {
        let service = self.clone();
        tokio::spawn(async move {
            service.push_to_waiting_viewers(room).await;
        });
    }

    /// Pushes an offer to every viewer not already connected or
    /// mid-negotiation, one task per viewer so a slow ICE negotiation on one
    /// does not stall the others.
    pub async fn push_to_waiting_viewers(&self, room: Arc<Room>) {
        if !room.fully_ready().await {
            return;
        }

        if room.mark_stream_available() {
            room.broadcast_to_viewers(&ServerMessage::StreamAvailable);
        }

        for viewer in room.waiting_viewers().await {
            let service = self.clone();
            let push_room = room.clone();
            tokio::spawn(async move {
                service.push_offer_to_viewer(push_room, viewer).await;
            });
        }
    }

    /// Server-push for one viewer: fresh transport, presenter tracks as
    /// senders, trickle offer.
    async fn push_offer_to_viewer(&self, room: Arc<Room>, viewer: Arc<Participant>) {
        let _guard = viewer.negotiation_lock.lock().await;

        // Readiness may have been lost between scheduling and execution
        // (presenter raced away); never dereference a torn presenter.
        if !room.fully_ready().await {
            viewer.connection.send(&ServerMessage::StreamNotReady);
            return;
        }
        let tracks = match room.presenter().await {
            Some(presenter) => presenter.local_tracks().await,
            None => None,
        };
        let (video, audio) = match tracks {
            Some(tracks) => tracks,
            None => {
                viewer.connection.send(&ServerMessage::StreamNotReady);
                return;
            }
        };

        viewer.close_transport().await;
        viewer.clear_pending_ice().await;
        viewer.set_state(ViewerState::Connecting).await;

        match self.setup_viewer_transport(&viewer, video, audio).await {
            Ok(offer) => {
                SFU_STREAM_PUSHES_TOTAL.inc();
                info!(room = %room.id, viewer = %viewer.id, "Pushed offer to viewer");
                viewer
                    .connection
                    .send(&ServerMessage::Offer { payload: offer });
            }
            Err(e) => {
                warn!(viewer = %viewer.id, error = %e, "Viewer media setup failed");
                SFU_WEBRTC_CONNECTION_FAILURES_TOTAL.inc();
                viewer.close_transport().await;
                viewer.set_state(ViewerState::Failed).await;
                viewer.connection.send(&ServerMessage::Error {
                    message: e.to_string(),
                });
                viewer.connection.send(&ServerMessage::ConnectionFailed);
            }
        }
    }

    async fn setup_viewer_transport(
        &self,
        viewer: &Arc<Participant>,
        video: Arc<TrackLocalStaticRTP>,
        audio: Arc<TrackLocalStaticRTP>,
    ) -> Result<RTCSessionDescription> {
        let api = MediaSetup::create_webrtc_api()?;
        let pc = Arc::new(
            api.new_peer_connection(MediaSetup::rtc_config(&self.config.stun_urls))
                .await
                .context("Failed to create peer connection")?,
        );

        let video_sender = pc
            .add_track(video as Arc<dyn TrackLocal + Send + Sync>)
            .await
            .context("Failed to add video track")?;
        let audio_sender = pc
            .add_track(audio as Arc<dyn TrackLocal + Send + Sync>)
            .await
            .context("Failed to add audio track")?;
        Self::spawn_rtcp_drain(video_sender);
        Self::spawn_rtcp_drain(audio_sender);

        self.register_viewer_handlers(viewer, &pc);
        viewer.set_transport(pc.clone()).await;

        let offer = pc
            .create_offer(None)
            .await
            .context("Failed to create offer")?;
        // Trickle ICE: the snapshot taken now is what goes on the wire.
        pc.set_local_description(offer.clone())
            .await
            .context("Failed to set local description")?;

        Ok(offer)
    }

    fn register_viewer_handlers(&self, viewer: &Arc<Participant>, pc: &Arc<RTCPeerConnection>) {
        let state_viewer = viewer.clone();
        let state_pc = Arc::downgrade(pc);
        pc.on_peer_connection_state_change(Box::new(move |state: RTCPeerConnectionState| {
            let viewer = state_viewer.clone();
            let this_pc = state_pc.clone();
            info!(viewer = %viewer.id, state = %state, "Viewer connection state changed");
            Box::pin(async move {
                if !Self::is_current_transport(&viewer, &this_pc).await {
                    return;
                }
                match state {
                    RTCPeerConnectionState::Connected => {
                        viewer.set_state(ViewerState::Connected).await;
                        viewer.connection.send(&ServerMessage::StreamConnected);
                    }
                    RTCPeerConnectionState::Failed => {
                        SFU_WEBRTC_CONNECTION_FAILURES_TOTAL.inc();
                        viewer.set_state(ViewerState::Waiting).await;
                        viewer.clear_pending_ice().await;
                        viewer.connection.send(&ServerMessage::ConnectionFailed);
                        // Closing the transport re-enters the library; do it
                        // off the event task.
                        tokio::spawn(async move {
                            viewer.close_transport().await;
                        });
                    }
                    RTCPeerConnectionState::Closed => {
                        viewer.set_state(ViewerState::Idle).await;
                    }
                    _ => {}
                }
            })
        }));

        let service = self.clone();
        let restart_viewer = viewer.clone();
        let restart_pc = Arc::downgrade(pc);
        pc.on_ice_connection_state_change(Box::new(move |state: RTCIceConnectionState| {
            let service = service.clone();
            let viewer = restart_viewer.clone();
            let this_pc = restart_pc.clone();
            Box::pin(async move {
                if state == RTCIceConnectionState::Failed {
                    tokio::spawn(async move {
                        service.attempt_ice_restart(viewer, this_pc).await;
                    });
                }
            })
        }));

        Self::register_ice_candidate_handler(viewer, pc);
    }

    /// One ICE restart per failure event: fresh offer with restarted
    /// candidate gathering, pushed over the existing transport.
    async fn attempt_ice_restart(&self, viewer: Arc<Participant>, failed_pc: Weak<RTCPeerConnection>) {
        let _guard = viewer.negotiation_lock.lock().await;
        if !Self::is_current_transport(&viewer, &failed_pc).await {
            return;
        }
        let pc = match viewer.transport().await {
            Some(pc) => pc,
            None => return,
        };

        SFU_ICE_RESTARTS_TOTAL.inc();
        info!(viewer = %viewer.id, "Attempting ICE restart");

        let options = RTCOfferOptions {
            ice_restart: true,
            ..Default::default()
        };
        match pc.create_offer(Some(options)).await {
            Ok(offer) => {
                if let Err(e) = pc.set_local_description(offer.clone()).await {
                    warn!(viewer = %viewer.id, error = %e, "Failed to set ICE restart description");
                    return;
                }
                viewer
                    .connection
                    .send(&ServerMessage::Offer { payload: offer });
            }
            Err(e) => {
                warn!(viewer = %viewer.id, error = %e, "Failed to create ICE restart offer");
            }
        }
    }

    async fn handle_answer(
        &self,
        participant: &Arc<Participant>,
        answer: RTCSessionDescription,
    ) -> Result<()> {
        let pc = participant
            .transport()
            .await
            .ok_or_else(|| anyhow!("no active transport for answer"))?;

        pc.set_remote_description(answer)
            .await
            .context("Failed to set remote description (answer)")?;
        Self::drain_pending_into(participant, &pc).await;
        Ok(())
    }

    /// Candidates that arrive before the remote description are queued and
    /// drained the moment a description lands.
    async fn handle_ice_candidate(
        &self,
        participant: &Arc<Participant>,
        candidate: RTCIceCandidateInit,
    ) -> Result<()> {
        if let Some(pc) = participant.transport().await {
            if pc.remote_description().await.is_some() {
                if let Err(e) = pc.add_ice_candidate(candidate).await {
                    // Duplicate or late candidates are tolerated.
                    warn!(participant = %participant.id, error = %e, "Failed to add ICE candidate");
                }
                return Ok(());
            }
        }
        participant.push_pending_ice(candidate).await;
        Ok(())
    }

    async fn drain_pending_into(participant: &Arc<Participant>, pc: &Arc<RTCPeerConnection>) {
        for candidate in participant.drain_pending_ice().await {
            if let Err(e) = pc.add_ice_candidate(candidate).await {
                warn!(participant = %participant.id, error = %e, "Failed to add queued ICE candidate");
            }
        }
    }

    /// Retry hint from a viewer; served as a fresh push when readiness
    /// holds, otherwise answered with the reason it does not.
    async fn handle_request_stream(
        &self,
        room: &Arc<Room>,
        participant: &Arc<Participant>,
    ) -> Result<()> {
        if participant.is_presenter() {
            debug!(participant = %participant.id, "Ignoring request-stream from presenter");
            return Ok(());
        }
        let state = participant.state().await;
        if state == ViewerState::Connected || state == ViewerState::Connecting {
            debug!(participant = %participant.id, state = ?state, "Ignoring redundant request-stream");
            return Ok(());
        }

        let reason = match room.presenter().await {
            None => Some(WaitReason::NoPresenter),
            Some(presenter) => {
                if !room.stream_ready() || !room.presenter_ice_connected() {
                    Some(WaitReason::NotReady)
                } else if !presenter.has_local_video().await {
                    Some(WaitReason::NoVideo)
                } else {
                    None
                }
            }
        };

        match reason {
            Some(reason) => {
                participant.connection.send(&ServerMessage::WaitingForStream {
                    reason: Some(reason),
                });
            }
            None => {
                let service = self.clone();
                let push_room = room.clone();
                let viewer = participant.clone();
                tokio::spawn(async move {
                    service.push_offer_to_viewer(push_room, viewer).await;
                });
            }
        }
        Ok(())
    }

    /// Orderly teardown when a signaling connection ends.
    async fn handle_disconnect(&self, room: &Arc<Room>, participant: &Arc<Participant>) {
        info!(room = %room.id, participant = %participant.id, "Participant disconnected");

        if let Some((removed, was_presenter)) = room.remove_participant(&participant.id).await {
            room.broadcast_to_all(
                &ServerMessage::ParticipantLeft {
                    participant_id: removed.id.to_string(),
                },
                None,
            );
            if was_presenter {
                room.broadcast_to_viewers(&ServerMessage::StreamEnded);
            }
        }

        self.hub.cleanup_empty_room(&room.id);
    }

    fn spawn_rtcp_drain(sender: Arc<RTCRtpSender>) {
        tokio::spawn(async move {
            let mut rtcp_buf = vec![0u8; 1500];
            while let Ok((_, _)) = sender.read(&mut rtcp_buf).await {}
        });
    }
}
