//! The typing simulation: reveals a finished reply as timed partial updates.

mod controller;
mod sink;

pub use controller::TypingController;
pub use sink::{ConversationSink, FnSink, MessageSink};

#[cfg(test)]
mod tests;
