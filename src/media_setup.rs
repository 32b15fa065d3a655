use std::sync::Arc;

use anyhow::{Context, Result};
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::api::APIBuilder;
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::policy::bundle_policy::RTCBundlePolicy;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::rtp_transceiver::rtp_codec::{
    RTCRtpCodecCapability, RTCRtpCodecParameters, RTPCodecType,
};
use webrtc::track::track_local::track_local_static_rtp::TrackLocalStaticRTP;

/// Stream identifier shared by both presenter forwarding tracks.
pub const PRESENTER_STREAM_ID: &str = "presenter-stream";

pub struct MediaSetup;

impl MediaSetup {
    /// Builds a webrtc API with the two codecs this service forwards:
    /// VP8 video and Opus audio.
    pub fn create_webrtc_api() -> Result<webrtc::api::API> {
        let mut media_engine = MediaEngine::default();

        // Opus with FEC and low latency settings
        media_engine
            .register_codec(
                RTCRtpCodecParameters {
                    capability: RTCRtpCodecCapability {
                        mime_type: "audio/opus".to_owned(),
                        clock_rate: 48000,
                        channels: 2,
                        sdp_fmtp_line: "minptime=10;useinbandfec=1".to_owned(),
                        ..Default::default()
                    },
                    payload_type: 111,
                    ..Default::default()
                },
                RTPCodecType::Audio,
            )
            .context("Failed to register Opus codec")?;

        media_engine
            .register_codec(
                RTCRtpCodecParameters {
                    capability: RTCRtpCodecCapability {
                        mime_type: "video/VP8".to_owned(),
                        clock_rate: 90000,
                        channels: 0,
                        sdp_fmtp_line: "".to_owned(),
                        ..Default::default()
                    },
                    payload_type: 96,
                    ..Default::default()
                },
                RTPCodecType::Video,
            )
            .context("Failed to register VP8 codec")?;

        let mut registry = Registry::new();
        registry = register_default_interceptors(registry, &mut media_engine)
            .context("Failed to register default interceptors")?;

        Ok(APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(registry)
            .build())
    }

    /// ICE configuration shared by every transport. Single bundle, RTCP
    /// multiplexed (webrtc's default mux policy).
    pub fn rtc_config(stun_urls: &[String]) -> RTCConfiguration {
        RTCConfiguration {
            ice_servers: vec![RTCIceServer {
                urls: stun_urls.to_vec(),
                ..Default::default()
            }],
            bundle_policy: RTCBundlePolicy::MaxBundle,
            ..Default::default()
        }
    }

    /// The presenter leg only receives media: one recvonly transceiver per
    /// kind.
    pub async fn add_recv_transceivers(pc: &RTCPeerConnection) -> Result<()> {
        use webrtc::rtp_transceiver::rtp_transceiver_direction::RTCRtpTransceiverDirection;
        use webrtc::rtp_transceiver::RTCRtpTransceiverInit;

        pc.add_transceiver_from_kind(
            RTPCodecType::Video,
            Some(RTCRtpTransceiverInit {
                direction: RTCRtpTransceiverDirection::Recvonly,
                send_encodings: vec![],
            }),
        )
        .await
        .context("Failed to add video transceiver")?;

        pc.add_transceiver_from_kind(
            RTPCodecType::Audio,
            Some(RTCRtpTransceiverInit {
                direction: RTCRtpTransceiverDirection::Recvonly,
                send_encodings: vec![],
            }),
        )
        .await
        .context("Failed to add audio transceiver")?;

        Ok(())
    }

    /// The forwarding tracks that republish the presenter's media to every
    /// viewer. Labeled `video` / `audio` on the shared presenter stream id.
    pub fn create_presenter_tracks() -> (Arc<TrackLocalStaticRTP>, Arc<TrackLocalStaticRTP>) {
        let video = Arc::new(TrackLocalStaticRTP::new(
            RTCRtpCodecCapability {
                mime_type: "video/VP8".to_owned(),
                clock_rate: 90000,
                ..Default::default()
            },
            "video".to_owned(),
            PRESENTER_STREAM_ID.to_owned(),
        ));
        let audio = Arc::new(TrackLocalStaticRTP::new(
            RTCRtpCodecCapability {
                mime_type: "audio/opus".to_owned(),
                clock_rate: 48000,
                channels: 2,
                ..Default::default()
            },
            "audio".to_owned(),
            PRESENTER_STREAM_ID.to_owned(),
        ));
        (video, audio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use webrtc::track::track_local::TrackLocal;

    #[tokio::test]
    async fn test_api_creates_peer_connections() {
        let api = MediaSetup::create_webrtc_api().unwrap();
        let config = MediaSetup::rtc_config(&["stun:stun.l.google.com:19302".to_string()]);
        let pc = api.new_peer_connection(config).await;
        assert!(pc.is_ok(), "API should be able to create a PeerConnection");
    }

    #[tokio::test]
    async fn test_recv_transceivers_attach() {
        let api = MediaSetup::create_webrtc_api().unwrap();
        let pc = api
            .new_peer_connection(RTCConfiguration::default())
            .await
            .unwrap();
        MediaSetup::add_recv_transceivers(&pc).await.unwrap();
        assert_eq!(pc.get_transceivers().await.len(), 2);
    }

    #[test]
    fn test_presenter_track_labels() {
        let (video, audio) = MediaSetup::create_presenter_tracks();
        assert_eq!(video.id(), "video");
        assert_eq!(audio.id(), "audio");
        assert_eq!(video.stream_id(), PRESENTER_STREAM_ID);
        assert_eq!(audio.stream_id(), PRESENTER_STREAM_ID);
    }
}
