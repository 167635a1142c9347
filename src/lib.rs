//! Reader for the GameCube controller USB adapter.
//!
//! [`gc_adapter`] holds the protocol and session handling; the remaining
//! modules are the small pieces of local state the viewer loop needs.

#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod display;
pub mod gc_adapter;
pub mod intent;
pub mod port_cursor;
pub mod ticker;

pub use gc_adapter::{AdapterError, AdapterSession, AdapterView, ControllerSnapshot, FrameBuffer};
pub use port_cursor::{Port, PortCursor};
