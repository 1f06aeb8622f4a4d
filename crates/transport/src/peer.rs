//! Connection establishment helpers: binding the inbound listener and
//! dialing outbound peers, both with bounded retry.

use std::net::{TcpListener, TcpStream};
use std::thread;
use std::time::Duration;

use crate::error::{TransportError, TransportResult};

/// Bind a listener, retrying up to `attempts` times with a short backoff.
/// A bind failure after all retries is fatal to process startup (§7).
pub fn bind_with_retry(addr: &str, attempts: u32) -> TransportResult<TcpListener> {
    let mut last_err = None;
    for attempt in 0..attempts.max(1) {
        match TcpListener::bind(addr) {
            Ok(listener) => return Ok(listener),
            Err(err) => {
                tracing::warn!(addr, attempt, error = %err, "listener bind failed, retrying");
                last_err = Some(err);
                thread::sleep(Duration::from_millis(50 * (attempt as u64 + 1)));
            }
        }
    }
    Err(TransportError::Bind {
        attempts,
        source: last_err.expect("at least one bind attempt was made"),
    })
}

/// Dial a peer, retrying up to `attempts` times with a short backoff. Used
/// during `ConnectAllPeers`, where the remote listener may not yet be up.
pub fn dial_with_retry(addr: &str, attempts: u32) -> TransportResult<TcpStream> {
    let mut last_err = None;
    for attempt in 0..attempts.max(1) {
        match TcpStream::connect(addr) {
            Ok(stream) => {
                stream.set_nodelay(true).ok();
                return Ok(stream);
            }
            Err(err) => {
                tracing::debug!(addr, attempt, error = %err, "dial failed, retrying");
                last_err = Some(err);
                thread::sleep(Duration::from_millis(50 * (attempt as u64 + 1)));
            }
        }
    }
    Err(TransportError::Io(
        last_err.expect("at least one dial attempt was made"),
    ))
}
