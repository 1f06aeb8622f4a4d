//! The agent-capability seam (§9 design note): `ActorProcess` calls into
//! whatever implements `RequestHandler` for data messages (pull/push/etc.)
//! but does not own it — the caller supplies the handler and controls its
//! lifetime, breaking the cyclic agent-actor-transport reference the source
//! pattern used.

use mlps_wire::Message;

/// Handles a data message dispatched by `ActorProcess` and produces the
/// reply to send back. Implementations must not block for long: per the
/// concurrency model, this runs on the receiver thread.
pub trait RequestHandler: Send + Sync {
    fn handle_request(&self, request: Message) -> Message;
}

/// A handler that answers every request with an exception, used before a
/// real agent is wired up and in tests that only exercise the control plane.
pub struct NullRequestHandler;

impl RequestHandler for NullRequestHandler {
    fn handle_request(&self, request: Message) -> Message {
        let meta = request.meta.exception_reply(request.meta.receiver, "no request handler installed");
        Message::control(meta)
    }
}
