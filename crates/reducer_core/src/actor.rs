//! The isolated model: a reducer moved into its own tokio task.
//!
//! Messages reach the task through a bounded queue and are handled strictly
//! one at a time in arrival order. Outputs are broadcast to every subscriber
//! and, for actors started with [`spawn_linked`], also pushed into a bounded
//! outbox. The broadcast side may drop values for a slow subscriber; the
//! outbox never does, the reducer waits for room instead.

use std::sync::{Arc, Mutex, PoisonError};

use futures::{future, pin_mut, Stream, StreamExt};
use shared::{domain::ReducerId, error::PipelineError};
use tokio::{
    sync::{broadcast, mpsc, oneshot},
    task::JoinHandle,
};
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use tracing::{debug, info, trace, warn};

use crate::{sink::AsyncOutputSink, Reducer};

#[derive(Debug, Clone, Copy)]
pub struct ActorOptions {
    pub queue_capacity: usize,
    pub output_capacity: usize,
}

impl Default for ActorOptions {
    fn default() -> Self {
        Self {
            queue_capacity: 64,
            output_capacity: 1024,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActorReport {
    pub id: ReducerId,
    pub handled: usize,
    pub emitted: usize,
}

enum Envelope<M> {
    Message(M),
    Finish,
}

struct ActorControl<O> {
    cancel: Mutex<Option<oneshot::Sender<()>>>,
    task: Mutex<Option<JoinHandle<ActorReport>>>,
    outputs: Arc<Mutex<Option<broadcast::Sender<O>>>>,
}

/// Sender side of a running reducer. Clones share the same reducer.
pub struct ReducerHandle<R: Reducer> {
    id: ReducerId,
    inbox: mpsc::Sender<Envelope<R::Message>>,
    control: Arc<ActorControl<R::Output>>,
}

impl<R: Reducer> Clone for ReducerHandle<R> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            inbox: self.inbox.clone(),
            control: Arc::clone(&self.control),
        }
    }
}

/// Moves `reducer` into a new task on the current tokio runtime.
pub fn spawn_reducer<R: Reducer>(reducer: R, options: ActorOptions) -> ReducerHandle<R> {
    start(reducer, options, None)
}

/// Like [`spawn_reducer`], and also returns the reducer's outbox: every
/// output in order, with `output_capacity` slots. The reducer stops handling
/// messages while the outbox is full. Dropping the receiver unlinks it.
pub fn spawn_linked<R: Reducer>(
    reducer: R,
    options: ActorOptions,
) -> (ReducerHandle<R>, mpsc::Receiver<R::Output>) {
    let (outbox_tx, outbox_rx) = mpsc::channel(options.output_capacity.max(1));
    (start(reducer, options, Some(outbox_tx)), outbox_rx)
}

fn start<R: Reducer>(
    reducer: R,
    options: ActorOptions,
    outbox: Option<mpsc::Sender<R::Output>>,
) -> ReducerHandle<R> {
    let id = ReducerId::new();
    let (inbox_tx, inbox_rx) = mpsc::channel(options.queue_capacity.max(1));
    let (cancel_tx, cancel_rx) = oneshot::channel();
    let (outputs, _) = broadcast::channel(options.output_capacity.max(1));
    let shared_outputs = Arc::new(Mutex::new(Some(outputs.clone())));

    let task = tokio::spawn(run_actor(
        reducer,
        id,
        inbox_rx,
        cancel_rx,
        outputs,
        outbox,
        OutputsRelease(Arc::clone(&shared_outputs)),
    ));

    ReducerHandle {
        id,
        inbox: inbox_tx,
        control: Arc::new(ActorControl {
            cancel: Mutex::new(Some(cancel_tx)),
            task: Mutex::new(Some(task)),
            outputs: shared_outputs,
        }),
    }
}

/// Clears the handle-visible broadcast sender when the task ends, including
/// when the reducer panics, so subscribers always see the end of the stream.
struct OutputsRelease<O>(Arc<Mutex<Option<broadcast::Sender<O>>>>);

impl<O> Drop for OutputsRelease<O> {
    fn drop(&mut self) {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).take();
    }
}

enum Delivery {
    Sent,
    Unlinked,
    Cancelled,
}

async fn run_actor<R: Reducer>(
    mut reducer: R,
    id: ReducerId,
    mut inbox: mpsc::Receiver<Envelope<R::Message>>,
    mut cancel: oneshot::Receiver<()>,
    outputs: broadcast::Sender<R::Output>,
    mut outbox: Option<mpsc::Sender<R::Output>>,
    release: OutputsRelease<R::Output>,
) -> ActorReport {
    info!(reducer = %id, linked = outbox.is_some(), "reducer task started");
    let mut report = ActorReport {
        id,
        handled: 0,
        emitted: 0,
    };
    // A dropped cancel sender only means every handle is gone; queued
    // messages still get handled in that case.
    let mut cancel_armed = true;

    loop {
        let envelope = tokio::select! {
            biased;
            result = &mut cancel, if cancel_armed => {
                if result.is_ok() {
                    debug!(reducer = %id, "reducer task cancelled");
                    break;
                }
                cancel_armed = false;
                continue;
            }
            envelope = inbox.recv() => envelope,
        };

        let message = match envelope {
            Some(Envelope::Message(message)) => message,
            Some(Envelope::Finish) | None => break,
        };
        report.handled += 1;
        let Some(output) = reducer.handle(message) else {
            continue;
        };
        report.emitted += 1;

        let Some(link) = outbox.as_ref() else {
            if outputs.send(output).is_err() {
                trace!(reducer = %id, "output emitted with no subscribers");
            }
            continue;
        };
        if outputs.send(output.clone()).is_err() {
            trace!(reducer = %id, "output emitted with no subscribers");
        }
        match push_outbox(link, output, &mut cancel, &mut cancel_armed).await {
            Delivery::Sent => {}
            Delivery::Unlinked => {
                debug!(reducer = %id, "outbox receiver dropped");
                outbox = None;
            }
            Delivery::Cancelled => {
                debug!(reducer = %id, "reducer task cancelled while its outbox was full");
                break;
            }
        }
    }

    inbox.close();
    drop(outbox);
    drop(outputs);
    drop(release);
    info!(
        reducer = %id,
        handled = report.handled,
        emitted = report.emitted,
        "reducer task stopped"
    );
    report
}

/// Waits for room in the outbox. Cancellation still wins while waiting; the
/// pending output is then dropped.
async fn push_outbox<O>(
    link: &mpsc::Sender<O>,
    output: O,
    cancel: &mut oneshot::Receiver<()>,
    cancel_armed: &mut bool,
) -> Delivery {
    loop {
        tokio::select! {
            biased;
            result = &mut *cancel, if *cancel_armed => {
                if result.is_ok() {
                    return Delivery::Cancelled;
                }
                *cancel_armed = false;
            }
            permit = link.reserve() => {
                return match permit {
                    Ok(permit) => {
                        permit.send(output);
                        Delivery::Sent
                    }
                    Err(_) => Delivery::Unlinked,
                };
            }
        }
    }
}

impl<R: Reducer> ReducerHandle<R> {
    pub fn id(&self) -> ReducerId {
        self.id
    }

    /// Queues a message, waiting for capacity.
    pub async fn send(&self, message: R::Message) -> Result<(), PipelineError> {
        self.inbox
            .send(Envelope::Message(message))
            .await
            .map_err(|_| PipelineError::Closed)
    }

    pub fn try_send(&self, message: R::Message) -> Result<(), PipelineError> {
        self.inbox
            .try_send(Envelope::Message(message))
            .map_err(|err| match err {
                mpsc::error::TrySendError::Full(_) => PipelineError::Full,
                mpsc::error::TrySendError::Closed(_) => PipelineError::Closed,
            })
    }

    /// Receives every output emitted after this call.
    pub fn subscribe(&self) -> Result<broadcast::Receiver<R::Output>, PipelineError> {
        self.control
            .outputs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(broadcast::Sender::subscribe)
            .ok_or(PipelineError::Closed)
    }

    /// Like [`subscribe`](Self::subscribe), skipping values a slow consumer
    /// missed instead of reporting them.
    pub fn output_stream(
        &self,
    ) -> Result<impl Stream<Item = R::Output> + Send + 'static, PipelineError> {
        let id = self.id;
        let receiver = self.subscribe()?;
        Ok(BroadcastStream::new(receiver).filter_map(move |item| {
            future::ready(match item {
                Ok(value) => Some(value),
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    warn!(reducer = %id, skipped, "output subscriber lagged");
                    None
                }
            })
        }))
    }

    /// Stops delivery. The message being handled completes, anything still
    /// queued is discarded, and subscribers observe the end of the stream.
    pub async fn shutdown(&self) -> Result<ActorReport, PipelineError> {
        let cancel = self
            .control
            .cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(cancel) = cancel {
            let _ = cancel.send(());
        }
        self.join().await
    }

    /// Stops accepting messages once everything queued so far is handled.
    pub async fn finish(&self) -> Result<ActorReport, PipelineError> {
        // A closed inbox means the task already stopped; join reports it.
        let _ = self.inbox.send(Envelope::Finish).await;
        self.join().await
    }

    async fn join(&self) -> Result<ActorReport, PipelineError> {
        let task = self
            .control
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(task) = task else {
            return Err(PipelineError::Closed);
        };
        task.await
            .map_err(|err| PipelineError::ActorFailed(err.to_string()))
    }
}

/// Sends every message from `source` in order. Returns how many were sent.
pub async fn drive<R, S>(handle: &ReducerHandle<R>, source: S) -> Result<usize, PipelineError>
where
    R: Reducer,
    S: Stream<Item = R::Message>,
{
    pin_mut!(source);
    let mut sent = 0;
    while let Some(message) = source.next().await {
        handle.send(message).await?;
        sent += 1;
    }
    Ok(sent)
}

/// Pipes an upstream outbox into another reducer's queue until either side
/// closes. Each value waits for room downstream, so nothing is dropped. The
/// returned task yields the number of forwarded values.
pub fn connect<B: Reducer>(
    mut upstream: mpsc::Receiver<B::Message>,
    downstream: ReducerHandle<B>,
) -> JoinHandle<usize> {
    tokio::spawn(async move {
        let mut forwarded = 0;
        while let Some(value) = upstream.recv().await {
            if downstream.send(value).await.is_err() {
                debug!(reducer = %downstream.id(), "downstream closed; stopping forwarder");
                break;
            }
            forwarded += 1;
        }
        forwarded
    })
}

/// Delivers every value from an outbox to `sink` until the reducer stops,
/// then returns the sink.
pub async fn deliver<T, S>(mut outbox: mpsc::Receiver<T>, mut sink: S) -> S
where
    T: Send + 'static,
    S: AsyncOutputSink<T>,
{
    while let Some(value) = outbox.recv().await {
        sink.accept(value).await;
    }
    sink
}

#[cfg(test)]
#[path = "tests/actor_tests.rs"]
mod tests;
