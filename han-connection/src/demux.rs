//! Stream demultiplexer
//!
//! Turns the raw byte stream from a transport into discrete meter messages
//! using exactly one of several candidate frame readers. Which framing the
//! meter speaks is not known up front, so every chunk is probed against the
//! remaining candidates until one of them extracts a structurally valid
//! message; that reader is then committed for the rest of the connection.
//!
//! Life cycle is one-way: probing, then committed, then ended when the
//! transport is lost or closed. A new connection needs a new instance.

use crate::sink::MessageSink;
use bytes::Bytes;
use han_core::{FrameReader, HanError, MeterMessage};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;

// Instance ids are only used to correlate log lines across tasks.
static NEXT_INSTANCE_ID: AtomicU64 = AtomicU64::new(0);

/// Single-fire signal observable by any number of waiters
///
/// Fired exactly once when the underlying transport is lost or closed.
/// Subscribers that arrive after the fact still observe the signal.
#[derive(Clone)]
pub struct DoneSignal(watch::Receiver<bool>);

impl DoneSignal {
    /// Wait until the connection has ended
    pub async fn wait(&mut self) {
        // An Err means the sender is gone, which also means the
        // connection is over.
        let _ = self.0.wait_for(|done| *done).await;
    }

    /// Check the signal without waiting
    pub fn is_done(&self) -> bool {
        *self.0.borrow()
    }
}

enum ForwardPolicy {
    /// Forward every extracted message, valid or not
    Messages(Box<dyn MessageSink<Box<dyn MeterMessage>>>),
    /// Forward only payload bytes of valid, non-empty messages
    Payloads(Box<dyn MessageSink<Bytes>>),
}

/// Demultiplexes a byte stream into messages via candidate probing
pub struct StreamDemultiplexer {
    instance_id: u64,
    candidates: Vec<Box<dyn FrameReader>>,
    selected: Option<Box<dyn FrameReader>>,
    transport_info: Option<String>,
    policy: ForwardPolicy,
    done_tx: watch::Sender<bool>,
}

impl StreamDemultiplexer {
    fn new(candidates: Vec<Box<dyn FrameReader>>, policy: ForwardPolicy) -> Self {
        let (done_tx, _) = watch::channel(false);
        Self {
            instance_id: NEXT_INSTANCE_ID.fetch_add(1, Ordering::Relaxed),
            candidates,
            selected: None,
            transport_info: None,
            policy,
            done_tx,
        }
    }

    /// Create a demultiplexer that forwards whole messages to the sink
    ///
    /// Invalid messages are forwarded too; the consumer inspects validity.
    pub fn forwarding_messages(
        candidates: Vec<Box<dyn FrameReader>>,
        sink: Box<dyn MessageSink<Box<dyn MeterMessage>>>,
    ) -> Self {
        Self::new(candidates, ForwardPolicy::Messages(sink))
    }

    /// Create a demultiplexer that forwards only validated payload bytes
    pub fn forwarding_payloads(
        candidates: Vec<Box<dyn FrameReader>>,
        sink: Box<dyn MessageSink<Bytes>>,
    ) -> Self {
        Self::new(candidates, ForwardPolicy::Payloads(sink))
    }

    /// Signal that the transport is established
    ///
    /// `info` is a human-readable description of the remote endpoint; it is
    /// recorded for diagnostics and has no effect on framing.
    pub fn connection_made(&mut self, info: String) {
        log::info!("{}: Smart meter connected to {}", self.tag(), info);
        self.transport_info = Some(info);
    }

    /// Feed a chunk of raw bytes from the transport
    ///
    /// Synchronous and non-blocking; called for every chunk in arrival
    /// order, with arbitrary chunking boundaries.
    pub fn data_received(&mut self, data: &[u8]) {
        if let Some(reader) = self.selected.as_mut() {
            let messages = reader.read(data);
            for message in messages {
                self.forward(message);
            }
            return;
        }

        // Probing: feed candidates in order; the first to extract a valid
        // message wins. Its whole batch is forwarded, not just the valid
        // one, so already-buffered frames are not lost.
        let mut winner: Option<(usize, Vec<Box<dyn MeterMessage>>)> = None;
        for (index, candidate) in self.candidates.iter_mut().enumerate() {
            let messages = candidate.read(data);
            if messages.iter().any(|m| m.is_valid()) {
                winner = Some((index, messages));
                break;
            }
        }

        if let Some((index, messages)) = winner {
            let reader = self.candidates.swap_remove(index);
            self.candidates.clear();
            log::info!("{}: Reader candidate {} selected", self.tag(), index);
            self.selected = Some(reader);
            for message in messages {
                self.forward(message);
            }
        }
    }

    /// Signal that the transport has been lost or closed
    ///
    /// Fires the done signal exactly once; later calls only log.
    pub fn connection_lost(&mut self, error: Option<&HanError>) {
        match error {
            Some(e) => log::warn!(
                "{}: Connection to {} lost: {}",
                self.tag(),
                self.transport_info.as_deref().unwrap_or("<unknown>"),
                e
            ),
            None => log::debug!(
                "{}: Connection to {} closed",
                self.tag(),
                self.transport_info.as_deref().unwrap_or("<unknown>")
            ),
        }

        if !*self.done_tx.borrow() {
            let _ = self.done_tx.send(true);
        }
    }

    /// Subscribe to the end-of-connection signal
    pub fn done(&self) -> DoneSignal {
        DoneSignal(self.done_tx.subscribe())
    }

    /// Whether a reader has been selected
    pub fn is_committed(&self) -> bool {
        self.selected.is_some()
    }

    fn forward(&mut self, message: Box<dyn MeterMessage>) {
        match &self.policy {
            ForwardPolicy::Messages(sink) => {
                if !sink.put(message) {
                    log::warn!("{}: Sink rejected message", self.tag());
                }
            }
            ForwardPolicy::Payloads(sink) => {
                if !message.is_valid() {
                    log::warn!(
                        "{}: Got invalid message: {}",
                        self.tag(),
                        hex(message.as_bytes())
                    );
                    return;
                }
                match message.payload() {
                    Some(payload) if !payload.is_empty() => {
                        if !sink.put(Bytes::copy_from_slice(payload)) {
                            log::warn!("{}: Sink rejected payload", self.tag());
                        }
                    }
                    _ => log::debug!("{}: Got empty message", self.tag()),
                }
            }
        }
    }

    fn tag(&self) -> String {
        format!("StreamDemultiplexer[{}]", self.instance_id)
    }
}

fn hex(bytes: &[u8]) -> String {
    if bytes.is_empty() {
        return "<empty>".to_string();
    }
    bytes.iter().map(|b| format!("{:02X}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tokio::sync::mpsc;

    struct FakeMessage {
        valid: bool,
        payload: Option<Vec<u8>>,
        bytes: Vec<u8>,
    }

    impl FakeMessage {
        fn valid(payload: &[u8]) -> Box<dyn MeterMessage> {
            Box::new(Self {
                valid: true,
                payload: Some(payload.to_vec()),
                bytes: payload.to_vec(),
            })
        }

        fn invalid(bytes: &[u8]) -> Box<dyn MeterMessage> {
            Box::new(Self {
                valid: false,
                payload: None,
                bytes: bytes.to_vec(),
            })
        }
    }

    impl MeterMessage for FakeMessage {
        fn is_valid(&self) -> bool {
            self.valid
        }

        fn payload(&self) -> Option<&[u8]> {
            self.payload.as_deref()
        }

        fn as_bytes(&self) -> &[u8] {
            &self.bytes
        }
    }

    /// Scripted reader: pops one batch of messages per read() call and
    /// records every chunk it was fed.
    struct ScriptedReader {
        batches: Vec<Vec<Box<dyn MeterMessage>>>,
        chunks_seen: Arc<Mutex<Vec<Vec<u8>>>>,
    }

    impl ScriptedReader {
        fn new(
            batches: Vec<Vec<Box<dyn MeterMessage>>>,
        ) -> (Box<dyn FrameReader>, Arc<Mutex<Vec<Vec<u8>>>>) {
            let chunks_seen = Arc::new(Mutex::new(Vec::new()));
            let reader = Box::new(Self {
                // Popped from the back; store in reverse call order
                batches: batches.into_iter().rev().collect(),
                chunks_seen: chunks_seen.clone(),
            });
            (reader, chunks_seen)
        }
    }

    impl FrameReader for ScriptedReader {
        fn read(&mut self, data: &[u8]) -> Vec<Box<dyn MeterMessage>> {
            self.chunks_seen.lock().unwrap().push(data.to_vec());
            self.batches.pop().unwrap_or_default()
        }
    }

    fn payload_demux(
        candidates: Vec<Box<dyn FrameReader>>,
    ) -> (StreamDemultiplexer, mpsc::UnboundedReceiver<Bytes>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let demux = StreamDemultiplexer::forwarding_payloads(candidates, Box::new(tx));
        (demux, rx)
    }

    #[test]
    fn test_probing_commits_to_first_validating_candidate() {
        // A never validates; B validates on its second extracted message.
        let (reader_a, chunks_a) = ScriptedReader::new(vec![
            vec![],
            vec![FakeMessage::invalid(b"xx")],
        ]);
        let (reader_b, chunks_b) = ScriptedReader::new(vec![
            vec![],
            vec![FakeMessage::invalid(b"yy"), FakeMessage::valid(b"\x01\x02")],
            vec![FakeMessage::valid(b"\x03")],
        ]);

        let (mut demux, mut rx) = payload_demux(vec![reader_a, reader_b]);

        demux.data_received(b"junk");
        assert!(!demux.is_committed());
        assert!(rx.try_recv().is_err());

        demux.data_received(b"validframe");
        assert!(demux.is_committed());
        // The whole batch from the winning chunk is forwarded, so the valid
        // message that triggered selection arrives.
        assert_eq!(rx.try_recv().unwrap().as_ref(), b"\x01\x02");
        assert!(rx.try_recv().is_err());

        // Later chunks go only to the winner.
        demux.data_received(b"more");
        assert_eq!(rx.try_recv().unwrap().as_ref(), b"\x03");
        assert_eq!(chunks_a.lock().unwrap().len(), 2);
        assert_eq!(chunks_b.lock().unwrap().len(), 3);
    }

    #[test]
    fn test_no_candidate_wins_is_silent() {
        let (reader, chunks) = ScriptedReader::new(vec![vec![], vec![]]);
        let (mut demux, mut rx) = payload_demux(vec![reader]);

        demux.data_received(b"aa");
        demux.data_received(b"bb");

        assert!(!demux.is_committed());
        assert!(rx.try_recv().is_err());
        // The candidate keeps receiving chunks and may buffer partial frames.
        assert_eq!(chunks.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_payload_policy_filters_invalid_and_empty() {
        let (reader, _) = ScriptedReader::new(vec![
            vec![FakeMessage::valid(b"\xca\xfe")],
            vec![FakeMessage::invalid(b"\xba\xad")],
            vec![FakeMessage::valid(b"")],
            vec![FakeMessage::valid(b"\x01\x02")],
        ]);
        let (mut demux, mut rx) = payload_demux(vec![reader]);

        demux.data_received(b"select");
        assert_eq!(rx.try_recv().unwrap().as_ref(), b"\xca\xfe");

        demux.data_received(b"invalid");
        assert!(rx.try_recv().is_err());

        demux.data_received(b"empty");
        assert!(rx.try_recv().is_err());

        demux.data_received(b"good");
        assert_eq!(rx.try_recv().unwrap().as_ref(), b"\x01\x02");
    }

    #[test]
    fn test_message_policy_forwards_invalid_messages_too() {
        let (reader, _) = ScriptedReader::new(vec![
            vec![FakeMessage::valid(b"\x01")],
            vec![FakeMessage::invalid(b"\x02")],
        ]);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut demux = StreamDemultiplexer::forwarding_messages(vec![reader], Box::new(tx));

        demux.data_received(b"select");
        demux.data_received(b"broken");

        assert!(rx.try_recv().unwrap().is_valid());
        assert!(!rx.try_recv().unwrap().is_valid());
    }

    #[tokio::test]
    async fn test_done_signal_fires_exactly_once_and_sticks() {
        let (mut demux, _rx) = payload_demux(vec![]);

        let mut early = demux.done();
        assert!(!early.is_done());

        demux.connection_lost(None);
        demux.connection_lost(None);

        early.wait().await;
        assert!(early.is_done());

        // Late subscribers observe the signal as well.
        let mut late = demux.done();
        assert!(late.is_done());
        late.wait().await;
    }

    #[test]
    fn test_hex_formatting() {
        assert_eq!(hex(b""), "<empty>");
        assert_eq!(hex(b"\x7e\x0a"), "7E0A");
    }
}
