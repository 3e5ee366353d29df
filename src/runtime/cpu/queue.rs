//! CPU command queue
//!
//! Commands run on one worker thread per queue, in submission order.

use std::sync::mpsc::{Sender, channel};
use std::thread::JoinHandle;

use super::CpuContext;
use crate::error::{Error, Result};
use crate::runtime::{CommandQueue, ComputeContext};

type Command = Box<dyn FnOnce() + Send + 'static>;

/// In-order queue bound to a [`CpuContext`]
pub struct CpuQueue {
    context: CpuContext,
    sender: Option<Sender<Command>>,
    worker: Option<JoinHandle<()>>,
}

impl CpuQueue {
    pub(crate) fn new(context: CpuContext) -> Self {
        let (sender, receiver) = channel::<Command>();
        let name = format!("threefry-cpu-queue-{}", context.id().get());
        let worker = std::thread::Builder::new()
            .name(name)
            .spawn(move || {
                while let Ok(command) = receiver.recv() {
                    command();
                }
            })
            .ok();

        if worker.is_none() {
            tracing::warn!(id = %context.id(), "failed to spawn cpu queue worker");
        }

        Self {
            context,
            sender: worker.as_ref().map(|_| sender),
            worker,
        }
    }

    /// Enqueue a command; returns once it is queued
    pub(crate) fn submit<F>(&self, command: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let sender = self
            .sender
            .as_ref()
            .ok_or_else(|| Error::Backend("cpu queue has no worker thread".into()))?;
        sender
            .send(Box::new(command))
            .map_err(|_| Error::Backend("cpu queue worker has exited".into()))
    }
}

impl CommandQueue for CpuQueue {
    type Context = CpuContext;

    fn context(&self) -> &CpuContext {
        &self.context
    }

    fn finish(&self) -> Result<()> {
        let (done, wait) = channel::<()>();
        self.submit(move || {
            let _ = done.send(());
        })?;
        wait.recv()
            .map_err(|_| Error::Backend("cpu queue worker exited before finishing".into()))
    }
}

impl Drop for CpuQueue {
    fn drop(&mut self) {
        // Closing the channel lets the worker drain remaining commands and exit
        self.sender.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl std::fmt::Debug for CpuQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CpuQueue")
            .field("context", &self.context.id())
            .finish_non_exhaustive()
    }
}
