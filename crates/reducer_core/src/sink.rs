//! Consumers at the end of a pipeline.

use std::{fmt::Display, io::Write};

use async_trait::async_trait;
use tracing::warn;

pub trait OutputSink<T> {
    fn accept(&mut self, value: T);
}

impl<T, F> OutputSink<T> for F
where
    F: FnMut(T),
{
    fn accept(&mut self, value: T) {
        self(value)
    }
}

#[derive(Debug)]
pub struct CollectingSink<T> {
    values: Vec<T>,
}

impl<T> CollectingSink<T> {
    pub fn new() -> Self {
        Self { values: Vec::new() }
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    pub fn into_inner(self) -> Vec<T> {
        self.values
    }
}

impl<T> Default for CollectingSink<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> OutputSink<T> for CollectingSink<T> {
    fn accept(&mut self, value: T) {
        self.values.push(value);
    }
}

/// Writes one value per line. Write failures are logged and counted, never
/// returned to the pipeline.
#[derive(Debug)]
pub struct WriterSink<W> {
    writer: W,
    written: usize,
    failures: usize,
}

impl<W: Write> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            written: 0,
            failures: 0,
        }
    }

    pub fn written(&self) -> usize {
        self.written
    }

    pub fn failures(&self) -> usize {
        self.failures
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<T: Display, W: Write> OutputSink<T> for WriterSink<W> {
    fn accept(&mut self, value: T) {
        match writeln!(self.writer, "{value}").and_then(|()| self.writer.flush()) {
            Ok(()) => self.written += 1,
            Err(err) => {
                self.failures += 1;
                warn!("failed to write pipeline output: {err}");
            }
        }
    }
}

#[async_trait]
pub trait AsyncOutputSink<T: Send + 'static>: Send {
    async fn accept(&mut self, value: T);
}

/// Lets any synchronous sink receive values from an actor.
#[derive(Debug)]
pub struct SyncSinkAdapter<S>(pub S);

impl<S> SyncSinkAdapter<S> {
    pub fn into_inner(self) -> S {
        self.0
    }
}

#[async_trait]
impl<T, S> AsyncOutputSink<T> for SyncSinkAdapter<S>
where
    T: Send + 'static,
    S: OutputSink<T> + Send,
{
    async fn accept(&mut self, value: T) {
        self.0.accept(value);
    }
}
