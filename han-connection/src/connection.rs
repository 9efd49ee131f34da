//! Connection pump binding a transport to a demultiplexer
//!
//! Each live connection is one spawned task that reads from the transport
//! and feeds the demultiplexer. The task owns the transport exclusively, so
//! no locking is needed on the read path.

use crate::demux::{DoneSignal, StreamDemultiplexer};
use han_transport::Transport;
use tokio::sync::watch;

const READ_BUFFER_SIZE: usize = 4096;

/// One live (transport, demultiplexer) pair
///
/// Dropping the pair requests the pump task to shut down and close the
/// transport, same as [`request_close`](MeterConnection::request_close).
pub struct MeterConnection {
    shutdown_tx: watch::Sender<bool>,
    done: DoneSignal,
    peer: String,
}

impl MeterConnection {
    /// Ask the pump task to close the transport
    ///
    /// Idempotent and safe from any task; teardown completes asynchronously
    /// and is observable through [`done`](MeterConnection::done).
    pub fn request_close(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Subscribe to the end-of-connection signal
    pub fn done(&self) -> DoneSignal {
        self.done.clone()
    }

    /// Human-readable description of the remote endpoint
    pub fn peer(&self) -> &str {
        &self.peer
    }

    pub(crate) fn shutdown_handle(&self) -> watch::Sender<bool> {
        self.shutdown_tx.clone()
    }
}

/// Spawn the pump task for an open transport
///
/// The task loops reading the transport and feeding chunks to the
/// demultiplexer, racing each read against the shutdown request. On EOF,
/// read error or shutdown it closes the transport (close errors are logged
/// and swallowed, there is nothing to recover during teardown) and fires
/// the demultiplexer's done signal.
pub fn spawn_connection<T>(transport: T, mut demux: StreamDemultiplexer) -> MeterConnection
where
    T: Transport + 'static,
{
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let peer = transport.peer_info();
    let done = demux.done();

    demux.connection_made(peer.clone());

    let task_peer = peer.clone();
    tokio::spawn(async move {
        let mut transport = transport;
        let mut buf = vec![0u8; READ_BUFFER_SIZE];

        let error = loop {
            tokio::select! {
                result = transport.read(&mut buf) => match result {
                    Ok(0) => {
                        // The other end signaled it won't send any more
                        // data. Never keep a half-open read side.
                        log::debug!("EOF from {}, closing transport", task_peer);
                        break None;
                    }
                    Ok(n) => demux.data_received(&buf[..n]),
                    Err(e) => break Some(e),
                },
                // An Err from wait_for means the pair was dropped, which is
                // also a close request.
                _ = shutdown_rx.wait_for(|requested| *requested) => break None,
            }
        };

        if !transport.is_closed() {
            if let Err(e) = transport.close().await {
                log::warn!(
                    "Error when closing transport {} for {} connection: {}",
                    task_peer,
                    if error.is_some() { "lost" } else { "closed" },
                    e
                );
            }
        }

        demux.connection_lost(error.as_ref());
    });

    MeterConnection {
        shutdown_tx,
        done,
        peer,
    }
}
