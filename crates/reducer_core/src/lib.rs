//! Reducers: stateful units reachable only through an inbound message
//! operation and observable only through the values they emit.
//!
//! A reducer can be driven directly on the caller's thread ([`pipeline`]),
//! from a dedicated tokio task ([`actor`]) or from a dedicated OS thread
//! ([`worker`]). In every model messages are handled one at a time, in the
//! order they were sent.

pub mod actor;
pub mod counter;
pub mod display;
pub mod observers;
pub mod pipeline;
pub mod sink;
pub mod worker;

pub use actor::{
    connect, deliver, drive, spawn_linked, spawn_reducer, ActorOptions, ActorReport,
    ReducerHandle,
};
pub use counter::CounterReducer;
pub use display::{display_scalar, Glyph, ScalarDisplay, DEFAULT_PLACEHOLDER};
pub use observers::{ObservedReducer, ObserverRegistry, Subscription, SubscriptionId};
pub use pipeline::{Pipeline, PipelineStats};
pub use shared::error::PipelineError;
pub use sink::{AsyncOutputSink, CollectingSink, OutputSink, SyncSinkAdapter, WriterSink};
pub use worker::{ReducerWorker, WorkerReport};

pub trait Reducer: Send + 'static {
    type Message: Send + 'static;
    type Output: Clone + Send + 'static;

    /// Applies one message to the private state and optionally emits a value.
    fn handle(&mut self, message: Self::Message) -> Option<Self::Output>;
}

pub trait ReducerExt: Reducer + Sized {
    /// Feeds every output of `self` into `next`.
    fn chain<B>(self, next: B) -> Chain<Self, B>
    where
        B: Reducer<Message = Self::Output>,
    {
        Chain {
            first: self,
            second: next,
        }
    }

    fn replay<I>(&mut self, messages: I) -> Vec<Self::Output>
    where
        I: IntoIterator<Item = Self::Message>,
    {
        messages
            .into_iter()
            .filter_map(|message| self.handle(message))
            .collect()
    }
}

impl<R: Reducer> ReducerExt for R {}

/// Two reducers run back to back; see [`ReducerExt::chain`].
pub struct Chain<A, B> {
    first: A,
    second: B,
}

impl<A, B> Chain<A, B> {
    pub fn into_inner(self) -> (A, B) {
        (self.first, self.second)
    }
}

impl<A, B> Reducer for Chain<A, B>
where
    A: Reducer,
    B: Reducer<Message = A::Output>,
{
    type Message = A::Message;
    type Output = B::Output;

    fn handle(&mut self, message: Self::Message) -> Option<Self::Output> {
        let intermediate = self.first.handle(message)?;
        self.second.handle(intermediate)
    }
}

/// A reducer assembled from an owned state value and a transition function.
pub struct FnReducer<S, M, O, F> {
    state: S,
    transition: F,
    _marker: std::marker::PhantomData<fn(M) -> O>,
}

impl<S, M, O, F> FnReducer<S, M, O, F>
where
    F: FnMut(&mut S, M) -> Option<O>,
{
    pub fn new(state: S, transition: F) -> Self {
        Self {
            state,
            transition,
            _marker: std::marker::PhantomData,
        }
    }
}

impl<S, M, O, F> Reducer for FnReducer<S, M, O, F>
where
    S: Send + 'static,
    M: Send + 'static,
    O: Clone + Send + 'static,
    F: FnMut(&mut S, M) -> Option<O> + Send + 'static,
{
    type Message = M;
    type Output = O;

    fn handle(&mut self, message: M) -> Option<O> {
        (self.transition)(&mut self.state, message)
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
