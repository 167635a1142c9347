pub mod codec;
mod error;
mod frame;
mod session;
mod snapshot;
mod usb_link;

pub use error::{AdapterError, AdapterResult};
pub use frame::{FrameBuffer, FRAME_LEN};
pub use session::{
    AdapterSession, PollOutcome, SessionState, UsbAdapterSession, ADAPTER_INTERFACE,
    DEFAULT_READ_TIMEOUT, PRODUCT_ID, VENDOR_ID,
};
pub use snapshot::{AdapterView, Axes, Button, Buttons, ControllerSnapshot};
pub use usb_link::{resolve_endpoints, AdapterEndpoints, EndpointInfo, UsbLink};

use crate::port_cursor::Port;

/// Decode `frame` into the per-cycle view handed to the presentation layer.
pub fn capture_view(
    frame: &FrameBuffer,
    selected: Port,
    rumble: [bool; 4],
    outcome: PollOutcome,
) -> AdapterView {
    AdapterView {
        controllers: codec::decode_all(frame.as_bytes()),
        selected,
        rumble,
        fresh: outcome.is_fresh(),
    }
}
