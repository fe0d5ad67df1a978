use crate::protocol::{MoveCommand, WallRecord};
use std::sync::Mutex as StdMutex;
use tokio::sync::mpsc;

/// Latest-wins slot for a client's pending direction command. The socket
/// reader overwrites it as lines arrive; the simulation drains it once at
/// the top of each tick, so only the most recent command per tick applies.
#[derive(Debug)]
pub struct SessionInbound {
    pending: StdMutex<Option<MoveCommand>>,
}

impl SessionInbound {
    pub(crate) fn new() -> Self {
        Self {
            pending: StdMutex::new(None),
        }
    }

    pub fn store(&self, command: MoveCommand) {
        *self.pending.lock().unwrap() = Some(command);
    }

    pub(crate) fn take(&self) -> Option<MoveCommand> {
        self.pending.lock().unwrap().take()
    }
}

/// Everything the transport layer needs to run one client: the handshake
/// payload, the command slot, and the per-tick frame stream.
pub struct SessionIo {
    pub session_id: String,
    pub snake_id: u32,
    pub universe_size: u32,
    pub walls: Vec<WallRecord>,
    pub inbound: std::sync::Arc<SessionInbound>,
    pub frames: mpsc::Receiver<String>,
}
