use shared::domain::{Message, ReducerId};
use tracing::trace;

use crate::Reducer;

/// Integer accumulator driven by [`Message`]s. The value is only ever
/// observable through what `Print` emits.
#[derive(Debug)]
pub struct CounterReducer {
    id: ReducerId,
    state: i64,
}

impl CounterReducer {
    pub fn new() -> Self {
        Self::with_initial(0)
    }

    pub fn with_initial(initial: i64) -> Self {
        Self {
            id: ReducerId::new(),
            state: initial,
        }
    }

    pub fn id(&self) -> ReducerId {
        self.id
    }
}

impl Default for CounterReducer {
    fn default() -> Self {
        Self::new()
    }
}

impl Reducer for CounterReducer {
    type Message = Message;
    type Output = i64;

    fn handle(&mut self, message: Message) -> Option<i64> {
        trace!(reducer = %self.id, message = message.name(), "handling message");
        match message {
            Message::Set(value) => {
                self.state = value;
                None
            }
            Message::Increment(amount) => {
                self.state = self.state.wrapping_add(amount);
                None
            }
            Message::Print => Some(self.state),
        }
    }
}
