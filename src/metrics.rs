use lazy_static::lazy_static;
use prometheus::{
    register_int_counter, register_int_counter_vec, register_int_gauge, IntCounter, IntCounterVec,
    IntGauge,
};

lazy_static! {
    pub static ref SFU_ACTIVE_ROOMS: IntGauge =
        register_int_gauge!("sfu_active_rooms", "Number of currently active rooms").unwrap();
    pub static ref SFU_ACTIVE_PARTICIPANTS: IntGauge = register_int_gauge!(
        "sfu_active_participants",
        "Number of currently connected participants"
    )
    .unwrap();
    pub static ref SFU_PACKETS_FORWARDED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "sfu_packets_forwarded_total",
        "Total number of RTP packets forwarded",
        &["media_type"] // "video" or "audio"
    )
    .unwrap();
    pub static ref SFU_SIGNALING_FRAMES_DROPPED_TOTAL: IntCounter = register_int_counter!(
        "sfu_signaling_frames_dropped_total",
        "Total number of outbound signaling frames dropped on queue overflow"
    )
    .unwrap();
    pub static ref SFU_STREAM_PUSHES_TOTAL: IntCounter = register_int_counter!(
        "sfu_stream_pushes_total",
        "Total number of server-pushed offers to viewers"
    )
    .unwrap();
    pub static ref SFU_ICE_RESTARTS_TOTAL: IntCounter = register_int_counter!(
        "sfu_ice_restarts_total",
        "Total number of ICE restarts attempted for viewers"
    )
    .unwrap();
    pub static ref SFU_WEBRTC_CONNECTION_FAILURES_TOTAL: IntCounter = register_int_counter!(
        "sfu_webrtc_connection_failures_total",
        "Total number of WebRTC connection failures"
    )
    .unwrap();
}

pub fn register_metrics() {
    // Force initialization of lazy_statics
    let _ = SFU_ACTIVE_ROOMS.get();
    let _ = SFU_ACTIVE_PARTICIPANTS.get();
    let _ = SFU_PACKETS_FORWARDED_TOTAL
        .with_label_values(&["video"])
        .get();
    let _ = SFU_SIGNALING_FRAMES_DROPPED_TOTAL.get();
    let _ = SFU_STREAM_PUSHES_TOTAL.get();
    let _ = SFU_ICE_RESTARTS_TOTAL.get();
    let _ = SFU_WEBRTC_CONNECTION_FAILURES_TOTAL.get();
}
