//! Accepting connections.
//!
//! A single acceptor task owns the listening socket and hands each accepted
//! connection to a slot of the bounded [`pool::WorkerPool`].

pub mod listener;
pub mod pool;

pub use listener::{Listener, run};
pub use pool::{Worker, WorkerPool};
