//! Two-phase rendezvous between extraction workers
//!
//! Arrival travels over each worker's report channel as `Ready`. Release is
//! a single-use broadcast on a separate channel: the coordinator sends one
//! token per party, or drops the sender without sending to abandon the
//! barrier when a peer has failed. A worker can therefore never wait
//! forever for a release that will not come.

use crate::error::WorkerError;
use crossbeam_channel::{unbounded, Receiver, Sender};

/// Coordinator side of the link barrier
pub struct LinkBarrier {
    release_tx: Sender<()>,
    release_rx: Receiver<()>,
    parties: usize,
}

/// Worker side of the link barrier
#[derive(Clone)]
pub struct BarrierGate {
    id: usize,
    release_rx: Receiver<()>,
}

impl LinkBarrier {
    pub fn new(parties: usize) -> Self {
        let (release_tx, release_rx) = unbounded();
        Self {
            release_tx,
            release_rx,
            parties,
        }
    }

    /// Gate for worker `id`
    pub fn gate(&self, id: usize) -> BarrierGate {
        BarrierGate {
            id,
            release_rx: self.release_rx.clone(),
        }
    }

    /// Let every party through
    pub fn release(self) {
        for _ in 0..self.parties {
            // Receivers of exited workers are gone; the tokens are simply unread.
            let _ = self.release_tx.send(());
        }
    }

    /// Close the barrier without releasing anyone
    pub fn abandon(self) {
        drop(self);
    }
}

impl BarrierGate {
    /// Block until released
    ///
    /// Each worker consumes exactly one release token.
    pub fn wait(self) -> Result<(), WorkerError> {
        self.release_rx
            .recv()
            .map_err(|_| WorkerError::BarrierAbandoned { id: self.id })
    }
}
