//! Non-blocking sink contract for forwarded messages and payloads

use tokio::sync::mpsc;

/// Queue-like destination for extracted messages or payloads
///
/// `put` must never block: the stream-processing path calls it for every
/// message and applies no back-pressure to the transport. Returning `false`
/// means the item was rejected (bounded queue full, or receiver dropped);
/// the caller logs and drops it.
pub trait MessageSink<T>: Send {
    /// Hand off one item without blocking
    fn put(&self, item: T) -> bool;
}

impl<T: Send> MessageSink<T> for mpsc::UnboundedSender<T> {
    fn put(&self, item: T) -> bool {
        self.send(item).is_ok()
    }
}

impl<T: Send> MessageSink<T> for mpsc::Sender<T> {
    fn put(&self, item: T) -> bool {
        self.try_send(item).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unbounded_sender_accepts() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        assert!(tx.put(1u8));
        assert_eq!(rx.try_recv().unwrap(), 1);
    }

    #[test]
    fn test_unbounded_sender_rejects_after_receiver_drop() {
        let (tx, rx) = mpsc::unbounded_channel::<u8>();
        drop(rx);
        assert!(!tx.put(1));
    }

    #[test]
    fn test_bounded_sender_rejects_when_full_without_blocking() {
        let (tx, mut rx) = mpsc::channel(1);
        assert!(tx.put(1u8));
        assert!(!tx.put(2));
        assert_eq!(rx.try_recv().unwrap(), 1);
        assert!(tx.put(3));
    }
}
