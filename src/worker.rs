//! Worker thread handle shared by both workflows
//!
//! Workers are plain OS threads. They share nothing mutable with the
//! coordinator or with each other; everything they learn arrives over their
//! link and everything they produce leaves over it.

use crate::error::WorkerError;
use std::any::Any;
use std::thread::{self, JoinHandle};

/// A spawned worker thread
pub struct WorkerThread {
    /// Worker ID
    id: usize,

    /// Thread handle
    handle: Option<JoinHandle<()>>,
}

impl WorkerThread {
    /// Spawn a named worker thread running `body`
    pub fn spawn<F>(id: usize, role: &str, body: F) -> Result<Self, WorkerError>
    where
        F: FnOnce() + Send + 'static,
    {
        let handle = thread::Builder::new()
            .name(format!("{}-{}", role, id))
            .spawn(body)
            .map_err(|e| WorkerError::InitFailed {
                id,
                reason: e.to_string(),
            })?;

        Ok(Self {
            id,
            handle: Some(handle),
        })
    }

    /// Get worker ID
    pub fn id(&self) -> usize {
        self.id
    }

    /// Wait for the worker to exit
    pub fn join(mut self) -> Result<(), WorkerError> {
        match self.handle.take() {
            Some(handle) => handle.join().map_err(|payload| WorkerError::Panicked {
                id: self.id,
                message: panic_message(payload.as_ref()),
            }),
            None => Ok(()),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Worker thread panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_clean_exit() {
        let worker = WorkerThread::spawn(0, "test", || {}).unwrap();
        assert_eq!(worker.id(), 0);
        assert!(worker.join().is_ok());
    }

    #[test]
    fn test_join_reports_panic() {
        let worker = WorkerThread::spawn(7, "test", || panic!("boom")).unwrap();
        match worker.join() {
            Err(WorkerError::Panicked { id, message }) => {
                assert_eq!(id, 7);
                assert!(message.contains("boom"));
            }
            other => panic!("expected panic error, got {:?}", other),
        }
    }
}
