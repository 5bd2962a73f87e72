//! The single-threaded model: messages are handled as direct calls.

use tracing::debug;

use crate::{sink::OutputSink, Reducer};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub messages: usize,
    pub emitted: usize,
}

pub struct Pipeline<R, S> {
    reducer: R,
    sink: S,
    stats: PipelineStats,
}

impl<R, S> Pipeline<R, S>
where
    R: Reducer,
    S: OutputSink<R::Output>,
{
    pub fn new(reducer: R, sink: S) -> Self {
        Self {
            reducer,
            sink,
            stats: PipelineStats::default(),
        }
    }

    /// Handles one message and forwards its output, if any, to the sink.
    pub fn feed(&mut self, message: R::Message) -> bool {
        self.stats.messages += 1;
        match self.reducer.handle(message) {
            Some(output) => {
                self.stats.emitted += 1;
                self.sink.accept(output);
                true
            }
            None => false,
        }
    }

    /// Drains `source` lazily; the source may be unbounded.
    pub fn run<I>(&mut self, source: I) -> PipelineStats
    where
        I: IntoIterator<Item = R::Message>,
    {
        let before = self.stats;
        for message in source {
            self.feed(message);
        }
        let run = PipelineStats {
            messages: self.stats.messages - before.messages,
            emitted: self.stats.emitted - before.emitted,
        };
        debug!(messages = run.messages, emitted = run.emitted, "pipeline run finished");
        run
    }

    pub fn stats(&self) -> PipelineStats {
        self.stats
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_parts(self) -> (R, S) {
        (self.reducer, self.sink)
    }
}
