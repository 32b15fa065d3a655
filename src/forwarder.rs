use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use webrtc::interceptor::Attributes;
use webrtc::rtp::packet::Packet;
use webrtc::track::track_local::track_local_static_rtp::TrackLocalStaticRTP;
use webrtc::track::track_local::TrackLocalWriter;
use webrtc::track::track_remote::TrackRemote;

use crate::metrics::SFU_PACKETS_FORWARDED_TOTAL;

/// Seam over a remote track so forwarders are testable without a live
/// transport.
#[async_trait]
pub trait RemoteTrackSource: Send + Sync {
    fn id(&self) -> String;
    fn kind(&self) -> String;
    async fn read_rtp(&self) -> Result<(Packet, Attributes)>;
}

#[async_trait]
impl RemoteTrackSource for TrackRemote {
    fn id(&self) -> String {
        self.id()
    }
    fn kind(&self) -> String {
        self.kind().to_string()
    }
    async fn read_rtp(&self) -> Result<(Packet, Attributes)> {
        self.read_rtp().await.map_err(|e| e.into())
    }
}

/// Spawns the relay for one remote track: read RTP packets and write them
/// unchanged to the paired forwarding track until the remote side ends.
///
/// Write errors are tolerated: `ErrClosedPipe` means a viewer went away
/// mid-write, and anything else is transient; neither is logged per packet.
pub fn spawn_forwarder(
    remote: Arc<dyn RemoteTrackSource>,
    local: Arc<TrackLocalStaticRTP>,
) -> JoinHandle<()> {
    let track_id = remote.id();
    let kind = remote.kind();

    tokio::spawn(async move {
        info!(track = %track_id, kind = %kind, "Starting forwarder");
        let mut packet_count: u64 = 0;

        loop {
            match remote.read_rtp().await {
                Ok((packet, _)) => {
                    packet_count += 1;
                    if packet_count == 1 {
                        info!(track = %track_id, "First packet received");
                    }
                    SFU_PACKETS_FORWARDED_TOTAL
                        .with_label_values(&[kind.as_str()])
                        .inc();

                    if let Err(err) = local.write_rtp(&packet).await {
                        if webrtc::Error::ErrClosedPipe != err {
                            debug!(track = %track_id, error = %err, "Forwarding write error");
                        }
                    }
                }
                Err(e) => {
                    info!(track = %track_id, reason = %e, packets = packet_count, "Forwarder finished");
                    break;
                }
            }
        }
    })
}
