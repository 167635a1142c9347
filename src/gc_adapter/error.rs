use rusb::Direction;
use thiserror::Error;

use super::session::SessionState;

#[derive(Error, Debug)]
pub enum AdapterError {
    #[error("no GameCube adapter found (looking for {vendor_id:04x}:{product_id:04x})")]
    NoAdapterFound { vendor_id: u16, product_id: u16 },

    #[error("adapter interface {interface} is already claimed by another process")]
    InterfaceBusy { interface: u8 },

    #[error("expected exactly one {direction:?} endpoint on the adapter interface, found {found}")]
    EndpointNotFound { direction: Direction, found: usize },

    #[error("frame index {index} out of range (frame is {len} bytes)")]
    OutOfRange { index: usize, len: usize },

    #[error("cannot {operation} while session is {state:?}")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },

    #[error("short write to adapter: sent {written} of {expected} bytes")]
    ShortWrite { expected: usize, written: usize },

    #[error("USB error: {0}")]
    Usb(#[from] rusb::Error),
}

pub type AdapterResult<T> = Result<T, AdapterError>;
