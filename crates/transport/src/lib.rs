//! Reliable node-to-node messaging: per-peer TCP connections, optional
//! resend/ack, drop-rate fault injection, and an inbound queue that stands
//! in for the "one receiver thread" of the concurrency model.
//!
//! - [`config`]: [`config::TransportConfig`], the resend/drop tuning knobs.
//! - [`transport`]: [`transport::Transport`], the running connection set.
//! - [`peer`]: bind/dial helpers with bounded retry.

pub mod config;
pub mod error;
pub mod peer;
pub mod transport;

pub use config::TransportConfig;
pub use error::{TransportError, TransportResult};
pub use transport::{FailedSend, Transport, TransportStats};

#[cfg(test)]
mod tests {
    use super::*;
    use mlps_core::Command;
    use mlps_wire::{Message, MessageMeta};
    use std::time::Duration;

    fn wait_until(mut pred: impl FnMut() -> bool, timeout: Duration) -> bool {
        let start = std::time::Instant::now();
        while start.elapsed() < timeout {
            if pred() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        pred()
    }

    #[test]
    fn data_message_round_trips_over_loopback() {
        let a = Transport::bind(1, "127.0.0.1:0", TransportConfig::default()).unwrap();
        let b = Transport::bind(2, "127.0.0.1:0", TransportConfig::default()).unwrap();

        a.connect(2, &b.local_addr().to_string(), 10).unwrap();
        b.connect(1, &a.local_addr().to_string(), 10).unwrap();

        let meta = MessageMeta::data(a.next_message_id(), 1, 2, true);
        let message = Message::control(meta);
        a.send(&message).unwrap();

        let received = wait_recv(&b, Duration::from_secs(2)).expect("message not received");
        assert_eq!(received.meta.sender, 1);
        assert_eq!(received.meta.receiver, 2);
    }

    #[test]
    fn sending_to_unconnected_peer_fails() {
        let a = Transport::bind(1, "127.0.0.1:0", TransportConfig::default()).unwrap();
        let meta = MessageMeta::data(a.next_message_id(), 1, 99, true);
        let message = Message::control(meta);
        assert!(matches!(a.send(&message), Err(TransportError::NotConnected(99))));
    }

    #[test]
    fn sending_to_dead_peer_fails_fast() {
        let a = Transport::bind(1, "127.0.0.1:0", TransportConfig::default()).unwrap();
        let b = Transport::bind(2, "127.0.0.1:0", TransportConfig::default()).unwrap();
        a.connect(2, &b.local_addr().to_string(), 10).unwrap();
        a.mark_dead(2);

        let meta = MessageMeta::data(a.next_message_id(), 1, 2, true);
        let message = Message::control(meta);
        assert!(matches!(a.send(&message), Err(TransportError::DeadPeer(2))));
    }

    #[test]
    fn resend_delivers_despite_drops() {
        let config = TransportConfig::for_testing(0.6);
        let a = Transport::bind(1, "127.0.0.1:0", config.clone()).unwrap();
        let b = Transport::bind(2, "127.0.0.1:0", config).unwrap();

        a.connect(2, &b.local_addr().to_string(), 10).unwrap();
        b.connect(1, &a.local_addr().to_string(), 10).unwrap();

        let message_id = a.next_message_id();
        let meta = MessageMeta::data(message_id, 1, 2, true);
        let message = Message::control(meta);
        a.send(&message).unwrap();

        let received = wait_recv(&b, Duration::from_secs(3)).expect("message never delivered");
        assert_eq!(received.meta.message_id, message_id);

        // The sender's pending-ack bookkeeping eventually clears once b's
        // Ack gets through, even though many attempts were dropped.
        assert!(wait_until(|| a.take_failed().is_empty(), Duration::from_secs(2)));
    }

    #[test]
    fn ack_messages_are_consumed_and_never_forwarded_to_the_inbound_queue() {
        let a = Transport::bind(1, "127.0.0.1:0", TransportConfig::default()).unwrap();
        let b = Transport::bind(2, "127.0.0.1:0", TransportConfig::default()).unwrap();
        a.connect(2, &b.local_addr().to_string(), 10).unwrap();
        b.connect(1, &a.local_addr().to_string(), 10).unwrap();

        let meta = MessageMeta::control(1, 2, 1, Command::Ack);
        let message = Message::control(meta);
        b.send(&message).unwrap();

        std::thread::sleep(Duration::from_millis(100));
        assert!(a.try_recv().is_none());
    }

    fn wait_recv(transport: &Transport, timeout: Duration) -> Option<Message> {
        let start = std::time::Instant::now();
        while start.elapsed() < timeout {
            if let Some(message) = transport.try_recv() {
                return Some(message);
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        None
    }
}
