use std::{
    thread,
    time::{Duration, Instant},
};

use rusb::{Context, DeviceHandle, Error, UsbContext};
use tracing::{debug, info, trace, warn};

use super::codec::{encode_rumble_command, encode_start_command};
use super::error::{AdapterError, AdapterResult};
use super::frame::{FrameBuffer, FRAME_LEN};
use super::usb_link::{resolve_endpoints, AdapterEndpoints, UsbLink};

pub const VENDOR_ID: u16 = 0x057E;
pub const PRODUCT_ID: u16 = 0x0337;

pub const ADAPTER_INTERFACE: u8 = 0;
const DEFAULT_CONFIGURATION: u8 = 1;

pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(2000);
const WRITE_TIMEOUT: Duration = Duration::from_millis(100);

const DISCOVERY_BACKOFF_START: Duration = Duration::from_millis(250);
const DISCOVERY_BACKOFF_MAX: Duration = Duration::from_secs(2);

/// Lifecycle of an [`AdapterSession`].
///
/// A session only comes into existence through discovery, so it starts out
/// `Discovered`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Discovered,
    Configured,
    Active,
    Released,
}

/// Result of a single [`AdapterSession::poll`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// A complete frame replaced the buffer contents.
    Fresh,
    /// The read timed out or came up short; the buffer still holds the
    /// previous frame.
    Stale { received: usize },
}

impl PollOutcome {
    pub fn is_fresh(self) -> bool {
        matches!(self, PollOutcome::Fresh)
    }
}

/// Owns the claimed adapter and everything needed to talk to it.
///
/// Dropping the session releases the interface.
pub struct AdapterSession<L: UsbLink> {
    link: L,
    state: SessionState,
    endpoints: Option<AdapterEndpoints>,
    rumble: [bool; 4],
    read_timeout: Duration,
}

/// Session over a real libusb device handle.
pub type UsbAdapterSession = AdapterSession<DeviceHandle<Context>>;

impl UsbAdapterSession {
    /// Find and open the adapter on the USB bus.
    pub fn discover() -> AdapterResult<Self> {
        let context = Context::new()?;
        let mut handle = None;
        let mut matches = 0usize;

        for device in context.devices()?.iter() {
            let desc = device.device_descriptor()?;
            if desc.vendor_id() == VENDOR_ID && desc.product_id() == PRODUCT_ID {
                matches += 1;
                if handle.is_none() {
                    info!(
                        bus = device.bus_number(),
                        address = device.address(),
                        "found GameCube adapter"
                    );
                    handle = Some(device.open()?);
                }
            }
        }

        if matches > 1 {
            warn!(matches, "more than one adapter attached, using the first");
        }

        match handle {
            Some(handle) => Ok(Self::from_link(handle)),
            None => Err(AdapterError::NoAdapterFound {
                vendor_id: VENDOR_ID,
                product_id: PRODUCT_ID,
            }),
        }
    }

    /// Keep retrying discovery with backoff until `wait` has elapsed.
    ///
    /// With a zero `wait` this is a single attempt.
    pub fn discover_with_retry(wait: Duration) -> AdapterResult<Self> {
        let deadline = Instant::now() + wait;
        let mut backoff = DISCOVERY_BACKOFF_START;

        loop {
            match Self::discover() {
                Err(AdapterError::NoAdapterFound { .. }) if Instant::now() + backoff <= deadline => {
                    debug!(?backoff, "no adapter yet, retrying");
                    thread::sleep(backoff);
                    backoff = (backoff * 2).min(DISCOVERY_BACKOFF_MAX);
                }
                other => return other,
            }
        }
    }

    /// Discover, configure and start communicating in one step.
    pub fn open(wait: Duration, read_timeout: Duration) -> AdapterResult<Self> {
        let mut session = Self::discover_with_retry(wait)?;
        session.set_read_timeout(read_timeout);
        session.configure()?;
        session.start_communication()?;
        Ok(session)
    }
}

impl<L: UsbLink> AdapterSession<L> {
    /// Wrap an already opened device.
    pub fn from_link(link: L) -> Self {
        Self {
            link,
            state: SessionState::Discovered,
            endpoints: None,
            rumble: [false; 4],
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Rumble flags as last sent to the adapter, in port order.
    pub fn rumble_state(&self) -> [bool; 4] {
        self.rumble
    }

    pub fn set_read_timeout(&mut self, timeout: Duration) {
        self.read_timeout = timeout;
    }

    /// Select a configuration, claim the adapter interface and locate its
    /// endpoints.
    pub fn configure(&mut self) -> AdapterResult<()> {
        self.expect_state(SessionState::Discovered, "configure")?;

        let config = match self.link.active_configuration() {
            Ok(config) if config != 0 => config,
            _ => {
                self.link.set_active_configuration(DEFAULT_CONFIGURATION)?;
                DEFAULT_CONFIGURATION
            }
        };

        match self.link.set_auto_detach_kernel_driver(true) {
            Ok(()) | Err(Error::NotSupported) => {}
            Err(err) => debug!(?err, "could not enable kernel driver auto-detach"),
        }

        match self.link.claim_interface(ADAPTER_INTERFACE) {
            Ok(()) => {}
            Err(Error::Busy) => {
                return Err(AdapterError::InterfaceBusy {
                    interface: ADAPTER_INTERFACE,
                })
            }
            Err(err) => return Err(err.into()),
        }

        let endpoints = match self
            .link
            .interface_endpoints(ADAPTER_INTERFACE)
            .map_err(AdapterError::from)
            .and_then(|eps| resolve_endpoints(&eps))
        {
            Ok(endpoints) => endpoints,
            Err(err) => {
                if let Err(release_err) = self.link.release_interface(ADAPTER_INTERFACE) {
                    warn!(%release_err, "releasing adapter interface after failed setup");
                }
                return Err(err);
            }
        };

        info!(
            config,
            interface = ADAPTER_INTERFACE,
            ep_out = %format!("{:#04x}", endpoints.output.address),
            ep_in = %format!("{:#04x}", endpoints.input.address),
            "claimed adapter interface"
        );

        self.endpoints = Some(endpoints);
        self.state = SessionState::Configured;
        Ok(())
    }

    /// Send the handshake and clear any rumble left over from a previous run.
    pub fn start_communication(&mut self) -> AdapterResult<()> {
        self.expect_state(SessionState::Configured, "start communication")?;

        self.write_command(&encode_start_command())?;
        self.write_command(&encode_rumble_command([false; 4]))?;
        self.rumble = [false; 4];
        self.state = SessionState::Active;

        info!("adapter communication started");
        Ok(())
    }

    /// Read one status report into `frame`.
    ///
    /// A timeout or short read is not an error; it leaves `frame` untouched
    /// and reports [`PollOutcome::Stale`].
    pub fn poll(&mut self, frame: &mut FrameBuffer) -> AdapterResult<PollOutcome> {
        self.expect_state(SessionState::Active, "poll")?;
        let input = self.endpoint_pair()?.input;

        let mut scratch = [0u8; FRAME_LEN];
        match self.link.read(&input, &mut scratch, self.read_timeout) {
            Ok(len) if len == FRAME_LEN => {
                frame.replace(scratch);
                Ok(PollOutcome::Fresh)
            }
            Ok(len) => {
                trace!(len, "short read from adapter, keeping previous frame");
                Ok(PollOutcome::Stale { received: len })
            }
            Err(Error::Timeout) => {
                trace!("adapter read timed out, keeping previous frame");
                Ok(PollOutcome::Stale { received: 0 })
            }
            Err(err) => Err(err.into()),
        }
    }

    pub fn set_rumble(&mut self, flags: [bool; 4]) -> AdapterResult<()> {
        self.expect_state(SessionState::Active, "set rumble")?;
        self.write_command(&encode_rumble_command(flags))?;
        debug!(?flags, "rumble updated");
        self.rumble = flags;
        Ok(())
    }

    /// Give the interface back to the system. Safe to call repeatedly; never
    /// fails.
    pub fn release(&mut self) {
        match self.state {
            SessionState::Released => return,
            SessionState::Discovered => {}
            SessionState::Active | SessionState::Configured => {
                if self.state == SessionState::Active && self.rumble.iter().any(|on| *on) {
                    match self.write_command(&encode_rumble_command([false; 4])) {
                        Ok(()) => self.rumble = [false; 4],
                        Err(err) => warn!(%err, "could not stop rumble before release"),
                    }
                }
                match self.link.release_interface(ADAPTER_INTERFACE) {
                    Ok(()) => info!("released adapter interface"),
                    Err(err) => warn!(%err, "releasing adapter interface failed"),
                }
            }
        }
        self.state = SessionState::Released;
    }

    fn expect_state(&self, expected: SessionState, operation: &'static str) -> AdapterResult<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(AdapterError::InvalidState {
                operation,
                state: self.state,
            })
        }
    }

    fn endpoint_pair(&self) -> AdapterResult<AdapterEndpoints> {
        self.endpoints.ok_or(AdapterError::InvalidState {
            operation: "use endpoints",
            state: self.state,
        })
    }

    fn write_command(&mut self, cmd: &[u8]) -> AdapterResult<()> {
        let output = self.endpoint_pair()?.output;
        let written = self.link.write(&output, cmd, WRITE_TIMEOUT)?;
        debug!(cmd = ?cmd, "command sent");
        if written != cmd.len() {
            return Err(AdapterError::ShortWrite {
                expected: cmd.len(),
                written,
            });
        }
        Ok(())
    }
}

impl<L: UsbLink> Drop for AdapterSession<L> {
    fn drop(&mut self) {
        self.release();
    }
}
