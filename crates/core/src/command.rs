//! The fixed set of control-plane commands carried in a message's `command`
//! field. Discriminants are part of the wire contract and must stay in this
//! declaration order: renumbering breaks compatibility with peers running a
//! different build.

/// Control commands recognized by [`crate::node`]-aware dispatch.
///
/// Data messages (tensor pull/push payloads) carry no command; `command` is
/// only set on control-plane traffic between [`crate::node::NodeRole`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Command {
    Empty = 0,
    Terminate = 1,
    AddNode = 2,
    Barrier = 3,
    Heartbeat = 4,
    Ack = 5,
    ReportDeadNodes = 6,
}

impl Command {
    pub fn from_code(code: u8) -> Option<Command> {
        Some(match code {
            0 => Command::Empty,
            1 => Command::Terminate,
            2 => Command::AddNode,
            3 => Command::Barrier,
            4 => Command::Heartbeat,
            5 => Command::Ack,
            6 => Command::ReportDeadNodes,
            _ => return None,
        })
    }

    pub fn code(self) -> u8 {
        self as u8
    }
}
