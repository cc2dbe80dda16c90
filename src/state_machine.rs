//! Conversation state machine
//!
//! Elm-style: a pure transition function yields the new state plus effects,
//! and the controller executes them.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::Effect;
pub use event::Event;
pub use state::{ConvState, ConversationSnapshot, ConversationState, Message, Sender};
pub use transition::{transition, TransitionError};
