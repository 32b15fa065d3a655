use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::config::Config;
use crate::hub::Hub;
use crate::id_types::ROOM_ID_LEN;
use crate::sfu_service::{signaling_route, SfuService};

fn test_stack() -> (SfuService, Arc<Hub>) {
    let hub = Arc::new(Hub::new());
    let service = SfuService::new(hub.clone(), Arc::new(Config::default()));
    (service, hub)
}

async fn connect(
    service: &SfuService,
) -> warp::test::WsClient {
    warp::test::ws()
        .path("/ws")
        .handshake(signaling_route(service.clone()))
        .await
        .expect("websocket handshake")
}

async fn recv_json(client: &mut warp::test::WsClient) -> Value {
    let msg = tokio::time::timeout(Duration::from_secs(5), client.recv())
        .await
        .expect("timed out waiting for frame")
        .expect("connection closed");
    serde_json::from_str(msg.to_str().expect("text frame")).expect("valid JSON frame")
}

/// Skips interleaved frames (e.g. trickled ICE candidates) until the wanted
/// type arrives.
async fn recv_until(client: &mut warp::test::WsClient, wanted: &str) -> Value {
    for _ in 0..20 {
        let value = recv_json(client).await;
        if value["type"] == wanted {
            return value;
        }
    }
    panic!("did not receive a {} frame", wanted);
}

async fn wait_for(mut condition: impl FnMut() -> bool) {
    for _ in 0..100 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("condition not reached in time");
}

#[tokio::test]
async fn test_viewer_joining_empty_room_waits() {
    let (service, _hub) = test_stack();
    let mut client = connect(&service).await;

    client
        .send_text(r#"{"type":"join","name":"Ada"}"#)
        .await;

    let joined = recv_json(&mut client).await;
    assert_eq!(joined["type"], "joined");
    assert_eq!(joined["hasPresenter"], false);
    assert_eq!(joined["streamReady"], false);
    // Server-generated room ids are 8 uppercase alphanumerics
    let room_id = joined["roomId"].as_str().unwrap();
    assert_eq!(room_id.len(), ROOM_ID_LEN);
    assert!(room_id
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    assert_eq!(joined["participants"].as_array().unwrap().len(), 1);

    let waiting = recv_json(&mut client).await;
    assert_eq!(waiting["type"], "waiting-for-stream");
}

#[tokio::test]
async fn test_duplicate_presenter_rejected() {
    let (service, _hub) = test_stack();

    let mut first = connect(&service).await;
    first
        .send_text(r#"{"type":"join","roomId":"CLASSRM1","name":"Host","isPresenter":true}"#)
        .await;
    let joined = recv_json(&mut first).await;
    assert_eq!(joined["type"], "joined");
    assert_eq!(joined["hasPresenter"], true);

    let mut second = connect(&service).await;
    second
        .send_text(r#"{"type":"join","roomId":"CLASSRM1","name":"Imposter","isPresenter":true}"#)
        .await;
    let rejected = recv_json(&mut second).await;
    assert_eq!(rejected["type"], "error");
    assert!(rejected["message"]
        .as_str()
        .unwrap()
        .contains("already has a presenter"));

    // The refused client stays unjoined
    second.send_text(r#"{"type":"raise-hand"}"#).await;
    let unjoined = recv_json(&mut second).await;
    assert_eq!(unjoined["type"], "error");
    assert!(unjoined["message"].as_str().unwrap().contains("join"));
}

#[tokio::test]
async fn test_participant_joined_broadcast() {
    let (service, _hub) = test_stack();

    let mut presenter = connect(&service).await;
    presenter
        .send_text(r#"{"type":"join","roomId":"CLASSRM2","name":"Host","isPresenter":true}"#)
        .await;
    recv_json(&mut presenter).await; // joined

    let mut viewer = connect(&service).await;
    viewer
        .send_text(r#"{"type":"join","roomId":"CLASSRM2","name":"Student"}"#)
        .await;
    let joined = recv_json(&mut viewer).await;
    assert_eq!(joined["type"], "joined");
    assert_eq!(joined["hasPresenter"], true);
    assert_eq!(joined["participants"].as_array().unwrap().len(), 2);

    let notice = recv_json(&mut presenter).await;
    assert_eq!(notice["type"], "participant-joined");
    assert_eq!(notice["participant"]["name"], "Student");
    assert_eq!(notice["participant"]["isPresenter"], false);
}

#[tokio::test]
async fn test_chat_fanout_includes_sender() {
    let (service, _hub) = test_stack();

    let mut a = connect(&service).await;
    a.send_text(r#"{"type":"join","roomId":"CLASSRM3","name":"Ada"}"#)
        .await;
    recv_json(&mut a).await; // joined
    recv_json(&mut a).await; // waiting-for-stream

    let mut b = connect(&service).await;
    b.send_text(r#"{"type":"join","roomId":"CLASSRM3","name":"Grace"}"#)
        .await;
    recv_json(&mut b).await; // joined
    recv_json(&mut b).await; // waiting-for-stream
    recv_json(&mut a).await; // participant-joined

    a.send_text(r#"{"type":"chat","payload":{"text":"hello class"}}"#)
        .await;

    let to_a = recv_json(&mut a).await;
    let to_b = recv_json(&mut b).await;
    for frame in [&to_a, &to_b] {
        assert_eq!(frame["type"], "chat");
        assert_eq!(frame["senderName"], "Ada");
        assert_eq!(frame["payload"]["text"], "hello class");
        assert!(frame["senderId"].as_str().is_some());
    }
}

#[tokio::test]
async fn test_raise_hand_broadcast() {
    let (service, _hub) = test_stack();

    let mut presenter = connect(&service).await;
    presenter
        .send_text(r#"{"type":"join","roomId":"CLASSRM4","name":"Host","isPresenter":true}"#)
        .await;
    recv_json(&mut presenter).await; // joined

    let mut viewer = connect(&service).await;
    viewer
        .send_text(r#"{"type":"join","roomId":"CLASSRM4","name":"Student"}"#)
        .await;
    recv_json(&mut viewer).await; // joined
    recv_json(&mut viewer).await; // waiting-for-stream
    recv_json(&mut presenter).await; // participant-joined

    viewer.send_text(r#"{"type":"raise-hand"}"#).await;

    let frame = recv_json(&mut presenter).await;
    assert_eq!(frame["type"], "hand-raised");
    assert_eq!(frame["participant"]["name"], "Student");
}

#[tokio::test]
async fn test_disconnect_reaps_empty_room() {
    let (service, hub) = test_stack();

    let mut client = connect(&service).await;
    client
        .send_text(r#"{"type":"join","roomId":"CLASSRM5","name":"Loner"}"#)
        .await;
    recv_json(&mut client).await; // joined
    assert_eq!(hub.room_count(), 1);

    drop(client);

    let hub_check = hub.clone();
    wait_for(move || hub_check.room_count() == 0).await;
}

#[tokio::test]
async fn test_presenter_disconnect_notifies_viewers() {
    let (service, hub) = test_stack();

    let mut presenter = connect(&service).await;
    presenter
        .send_text(r#"{"type":"join","roomId":"CLASSRM6","name":"Host","isPresenter":true}"#)
        .await;
    recv_json(&mut presenter).await; // joined

    let mut viewer = connect(&service).await;
    viewer
        .send_text(r#"{"type":"join","roomId":"CLASSRM6","name":"Student"}"#)
        .await;
    recv_json(&mut viewer).await; // joined
    recv_json(&mut viewer).await; // waiting-for-stream
    recv_json(&mut presenter).await; // participant-joined

    drop(presenter);

    let left = recv_until(&mut viewer, "participant-left").await;
    assert!(left["participantId"].as_str().is_some());
    recv_until(&mut viewer, "stream-ended").await;

    // Room still holds the viewer; a new presenter may join the same id
    assert_eq!(hub.room_count(), 1);
    let mut replacement = connect(&service).await;
    replacement
        .send_text(r#"{"type":"join","roomId":"CLASSRM6","name":"Host2","isPresenter":true}"#)
        .await;
    let joined = recv_json(&mut replacement).await;
    assert_eq!(joined["type"], "joined");
}

#[tokio::test]
async fn test_presenter_offer_gets_answer() {
    let (service, _hub) = test_stack();

    let mut presenter = connect(&service).await;
    presenter
        .send_text(r#"{"type":"join","roomId":"CLASSRM7","name":"Host","isPresenter":true}"#)
        .await;
    recv_json(&mut presenter).await; // joined

    // Drive a real client-side peer connection to produce the offer
    use crate::media_setup::MediaSetup;
    use webrtc::peer_connection::configuration::RTCConfiguration;
    use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;
    use webrtc::rtp_transceiver::rtp_transceiver_direction::RTCRtpTransceiverDirection;
    use webrtc::rtp_transceiver::RTCRtpTransceiverInit;

    let api = MediaSetup::create_webrtc_api().unwrap();
    let pc = api
        .new_peer_connection(RTCConfiguration::default())
        .await
        .unwrap();
    for kind in [RTPCodecType::Video, RTPCodecType::Audio] {
        pc.add_transceiver_from_kind(
            kind,
            Some(RTCRtpTransceiverInit {
                direction: RTCRtpTransceiverDirection::Sendonly,
                send_encodings: vec![],
            }),
        )
        .await
        .unwrap();
    }
    let offer = pc.create_offer(None).await.unwrap();
    pc.set_local_description(offer.clone()).await.unwrap();

    let frame = serde_json::json!({ "type": "offer", "payload": offer });
    presenter.send_text(frame.to_string()).await;

    // Trickled ICE candidates may interleave with the answer
    let answer = recv_until(&mut presenter, "answer").await;
    assert_eq!(answer["payload"]["type"], "answer");
    assert!(!answer["payload"]["sdp"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_offer_from_viewer_rejected_over_wire() {
    let (service, _hub) = test_stack();

    let mut viewer = connect(&service).await;
    viewer
        .send_text(r#"{"type":"join","roomId":"CLASSRM8","name":"Student"}"#)
        .await;
    recv_json(&mut viewer).await; // joined
    recv_json(&mut viewer).await; // waiting-for-stream

    viewer
        .send_text(r#"{"type":"offer","payload":{"type":"offer","sdp":"v=0\r\n"}}"#)
        .await;

    let err = recv_json(&mut viewer).await;
    assert_eq!(err["type"], "error");
    assert!(err["message"]
        .as_str()
        .unwrap()
        .contains("only the presenter"));
}

#[tokio::test]
async fn test_answer_without_transport_rejected_over_wire() {
    let (service, _hub) = test_stack();

    let mut viewer = connect(&service).await;
    viewer
        .send_text(r#"{"type":"join","roomId":"CLASSRM9","name":"Student"}"#)
        .await;
    recv_json(&mut viewer).await; // joined
    recv_json(&mut viewer).await; // waiting-for-stream

    viewer
        .send_text(r#"{"type":"answer","payload":{"type":"answer","sdp":"v=0\r\n"}}"#)
        .await;

    let err = recv_json(&mut viewer).await;
    assert_eq!(err["type"], "error");
    assert!(err["message"].as_str().unwrap().contains("no active transport"));
}

#[tokio::test]
async fn test_malformed_frame_answered_with_error() {
    let (service, _hub) = test_stack();

    let mut client = connect(&service).await;
    client.send_text("{not json").await;

    let err = recv_json(&mut client).await;
    assert_eq!(err["type"], "error");
    assert!(err["message"].as_str().unwrap().contains("malformed"));
}
