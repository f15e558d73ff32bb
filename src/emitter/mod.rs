use crate::endpoint::ResolvedEndpoint;
use crate::trace::Segment;
use crate::{Error, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

/// First line of every datagram, ahead of the segment JSON.
pub const DATAGRAM_HEADER: &[u8] = br#"{"format": "json", "version": 1}"#;

/// A datagram larger than this cannot reach the daemon in one piece.
pub const MAX_DATAGRAM_LEN: usize = 64 * 1024;

/// Ships closed segments to the daemon as UDP datagrams, one segment per
/// packet. Delivery is fire-and-forget: a segment that cannot be sent is
/// logged and dropped, never retried.
#[derive(Clone)]
pub struct UdpEmitter {
    sock: Arc<UdpSocket>,
    daemon_addr: Arc<SocketAddr>,
    packet_tx: mpsc::Sender<Vec<u8>>,
    cancel: CancellationToken,
}

impl UdpEmitter {
    pub fn bind(endpoint: ResolvedEndpoint) -> Result<Self> {
        // An ephemeral socket of the daemon's address family.
        let bind_addr = if endpoint.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
        let std_sock = std::net::UdpSocket::bind(bind_addr)?;
        std_sock.set_nonblocking(true)?;
        let sock = UdpSocket::from_std(std_sock)?;

        let (tx, rx) = mpsc::channel(64);
        let emitter = Self {
            sock: Arc::new(sock),
            daemon_addr: Arc::new(endpoint.into()),
            packet_tx: tx,
            cancel: CancellationToken::new(),
        };
        // The loop must not hold a Sender of its own, so that dropping the
        // last emitter handle closes the channel and ends the task.
        tokio::spawn(send_loop(
            emitter.sock.clone(),
            emitter.daemon_addr.clone(),
            emitter.cancel.clone(),
            rx,
        ));
        Ok(emitter)
    }

    /// Queues one segment for delivery. Fails if the segment does not fit in
    /// a single datagram or the emitter has shut down.
    pub async fn emit(&self, segment: &Segment) -> Result<()> {
        let buf = self.build_packet(segment)?;
        self.packet_tx.send(buf).await?;
        Ok(())
    }

    fn build_packet(&self, segment: &Segment) -> Result<Vec<u8>> {
        let body = serde_json::to_vec(segment)?;
        let mut buf = Vec::with_capacity(DATAGRAM_HEADER.len() + 1 + body.len());
        buf.extend(DATAGRAM_HEADER);
        buf.push(b'\n');
        buf.extend(body);
        if buf.len() > MAX_DATAGRAM_LEN {
            return Err(Error::OversizeSegment(buf.len()));
        }
        Ok(buf)
    }

    pub fn endpoint(&self) -> ResolvedEndpoint {
        ResolvedEndpoint::from(*self.daemon_addr)
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.cancel.cancel();
        Ok(())
    }
}

async fn send_loop(
    sock: Arc<UdpSocket>,
    daemon_addr: Arc<SocketAddr>,
    cancel: CancellationToken,
    mut chan: mpsc::Receiver<Vec<u8>>,
) {
    let t = async {
        // Runs until every emitter handle is dropped and the queue drains.
        while let Some(ref buf) = chan.recv().await {
            match sock.send_to(buf, daemon_addr.as_ref()).await {
                Ok(sent) => debug!(bytes = sent, addr = ?daemon_addr, "segment sent"),
                Err(err) => error!(?err, addr = ?daemon_addr, "send segment to daemon"),
            }
        }
    };
    tokio::select! {
        _ = t => {},
        _ = cancel.cancelled() => {},
    }
}
