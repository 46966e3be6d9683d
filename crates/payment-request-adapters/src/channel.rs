//! In-process stand-in for the content/chrome IPC link. Each connection is a pair of frame
//! queues behind one lock; the broker hands the privileged half to whoever accepts next.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use payment_request_core::{ChildConnector, ChildTransport, ParentTransport, PaymentError};

#[derive(Debug, Default)]
struct PipeState {
    to_parent: VecDeque<Vec<u8>>,
    to_child: VecDeque<Vec<u8>>,
    closed: bool,
}

#[derive(Debug, Clone)]
struct Pipe {
    id: u64,
    inner: Arc<Mutex<PipeState>>,
}

impl Pipe {
    fn lock(&self) -> Result<MutexGuard<'_, PipeState>, PaymentError> {
        self.inner
            .lock()
            .map_err(|e| PaymentError::Transport(format!("pipe lock poisoned: {e}")))
    }

    fn is_closed(&self) -> bool {
        self.lock().map(|g| g.closed).unwrap_or(true)
    }

    fn close(&self) {
        if let Ok(mut g) = self.lock() {
            if !g.closed {
                g.closed = true;
                debug!(channel = self.id, "pipe closed");
            }
        }
    }
}

/// Content-side half of a connection.
#[derive(Debug)]
pub struct ChildPipe {
    pipe: Pipe,
}

impl ChildPipe {
    /// Frames already sent by the parent stay readable after the pipe is closed.
    pub fn try_recv(&self) -> Result<Option<Vec<u8>>, PaymentError> {
        Ok(self.pipe.lock()?.to_child.pop_front())
    }

    pub fn is_closed(&self) -> bool {
        self.pipe.is_closed()
    }
}

impl ChildTransport for ChildPipe {
    fn channel_id(&self) -> u64 {
        self.pipe.id
    }

    fn send(&self, frame: Vec<u8>) -> Result<(), PaymentError> {
        let mut g = self.pipe.lock()?;
        if g.closed {
            return Err(PaymentError::Transport(format!(
                "channel {} is closed",
                self.pipe.id
            )));
        }
        g.to_parent.push_back(frame);
        Ok(())
    }

    fn close(&self) {
        self.pipe.close();
    }
}

/// Privileged-side half of a connection.
#[derive(Debug)]
pub struct ParentPipe {
    pipe: Pipe,
}

impl ParentPipe {
    pub fn try_recv(&self) -> Result<Option<Vec<u8>>, PaymentError> {
        Ok(self.pipe.lock()?.to_parent.pop_front())
    }

    pub fn is_closed(&self) -> bool {
        self.pipe.is_closed()
    }
}

impl ParentTransport for ParentPipe {
    fn channel_id(&self) -> u64 {
        self.pipe.id
    }

    fn send(&self, frame: Vec<u8>) -> Result<(), PaymentError> {
        let mut g = self.pipe.lock()?;
        if g.closed {
            return Err(PaymentError::Transport(format!(
                "channel {} is closed",
                self.pipe.id
            )));
        }
        g.to_child.push_back(frame);
        Ok(())
    }

    fn close(&self) {
        self.pipe.close();
    }
}

#[derive(Debug, Default)]
struct BrokerState {
    next_id: u64,
    pending: VecDeque<ParentPipe>,
    shut_down: bool,
}

/// Opens connections on the content side and queues their privileged halves until the
/// chrome side accepts them.
#[derive(Debug, Clone, Default)]
pub struct InProcessBroker {
    inner: Arc<Mutex<BrokerState>>,
}

impl InProcessBroker {
    fn lock(&self) -> Result<MutexGuard<'_, BrokerState>, PaymentError> {
        self.inner
            .lock()
            .map_err(|e| PaymentError::Transport(format!("broker lock poisoned: {e}")))
    }

    /// Takes every connection opened since the last call.
    pub fn accept(&self) -> Result<Vec<ParentPipe>, PaymentError> {
        let mut g = self.lock()?;
        Ok(g.pending.drain(..).collect())
    }

    /// Refuses any further connection.
    pub fn shut_down(&self) -> Result<(), PaymentError> {
        self.lock()?.shut_down = true;
        Ok(())
    }
}

impl ChildConnector for InProcessBroker {
    type Transport = ChildPipe;

    fn connect(&self) -> Result<ChildPipe, PaymentError> {
        let mut g = self.lock()?;
        if g.shut_down {
            return Err(PaymentError::Transport("broker is shut down".to_owned()));
        }
        g.next_id += 1;
        let pipe = Pipe {
            id: g.next_id,
            inner: Arc::new(Mutex::new(PipeState::default())),
        };
        g.pending.push_back(ParentPipe { pipe: pipe.clone() });
        debug!(channel = pipe.id, "payment channel opened");
        Ok(ChildPipe { pipe })
    }
}
