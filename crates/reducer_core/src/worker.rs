//! A reducer on a dedicated OS thread, fed through blocking queues.

use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, TrySendError};
use shared::{domain::ReducerId, error::PipelineError};
use tracing::{error, info};

use crate::Reducer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerReport {
    pub id: ReducerId,
    pub handled: usize,
    pub emitted: usize,
}

pub struct ReducerWorker<R: Reducer> {
    id: ReducerId,
    inbox: Sender<R::Message>,
    thread: JoinHandle<WorkerReport>,
}

impl<R: Reducer> ReducerWorker<R> {
    /// Starts the thread. Both queues hold `capacity` values; the returned
    /// receiver is the only reader of the outputs, and the reducer stops
    /// taking messages while it is full, so drain it while sending.
    pub fn launch(
        reducer: R,
        capacity: usize,
    ) -> Result<(Self, Receiver<R::Output>), PipelineError> {
        let id = ReducerId::new();
        let (inbox, inbox_rx) = crossbeam_channel::bounded(capacity.max(1));
        let (outputs_tx, outputs) = crossbeam_channel::bounded(capacity.max(1));

        let thread = thread::Builder::new()
            .name(format!("reducer-{id}"))
            .spawn(move || run_worker(reducer, id, inbox_rx, outputs_tx))
            .map_err(|err| {
                error!(reducer = %id, "failed to spawn reducer thread: {err}");
                PipelineError::WorkerStartup(err.to_string())
            })?;

        Ok((Self { id, inbox, thread }, outputs))
    }

    pub fn id(&self) -> ReducerId {
        self.id
    }

    /// Queues a message, blocking while the queue is full.
    pub fn send(&self, message: R::Message) -> Result<(), PipelineError> {
        self.inbox.send(message).map_err(|_| PipelineError::Closed)
    }

    pub fn try_send(&self, message: R::Message) -> Result<(), PipelineError> {
        self.inbox.try_send(message).map_err(|err| match err {
            TrySendError::Full(_) => PipelineError::Full,
            TrySendError::Disconnected(_) => PipelineError::Closed,
        })
    }

    /// Closes the queue, waits for queued messages to be handled and joins
    /// the thread.
    pub fn shutdown(self) -> Result<WorkerReport, PipelineError> {
        let Self { id, inbox, thread } = self;
        drop(inbox);
        thread.join().map_err(|_| {
            error!(reducer = %id, "reducer thread panicked");
            PipelineError::WorkerPanicked
        })
    }
}

fn run_worker<R: Reducer>(
    mut reducer: R,
    id: ReducerId,
    inbox: Receiver<R::Message>,
    outputs: Sender<R::Output>,
) -> WorkerReport {
    info!(reducer = %id, "reducer thread started");
    let mut report = WorkerReport {
        id,
        handled: 0,
        emitted: 0,
    };

    while let Ok(message) = inbox.recv() {
        report.handled += 1;
        if let Some(output) = reducer.handle(message) {
            report.emitted += 1;
            // A dropped output receiver only discards values; the reducer
            // keeps going.
            let _ = outputs.send(output);
        }
    }

    info!(
        reducer = %id,
        handled = report.handled,
        emitted = report.emitted,
        "reducer thread stopped"
    );
    report
}

#[cfg(test)]
#[path = "tests/worker_tests.rs"]
mod tests;
