//! Reactive side of the backend: the in-process event bus and the
//! notification fan-out that listens on it.

pub mod dispatcher;
pub mod fanout;

pub use dispatcher::Dispatcher;
