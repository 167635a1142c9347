use std::time::Duration;

use rusb::{DeviceHandle, Direction, TransferType, UsbContext};

use super::error::{AdapterError, AdapterResult};

/// Endpoint as declared by the interface descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointInfo {
    pub address: u8,
    pub direction: Direction,
    pub transfer_type: TransferType,
}

/// The OUT/IN pair the adapter talks over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdapterEndpoints {
    pub output: EndpointInfo,
    pub input: EndpointInfo,
}

/// Pick the single data endpoint in each direction.
///
/// Control and isochronous endpoints are ignored. Anything other than exactly
/// one OUT and one IN endpoint is rejected.
pub fn resolve_endpoints(endpoints: &[EndpointInfo]) -> AdapterResult<AdapterEndpoints> {
    let pick = |direction: Direction| -> AdapterResult<EndpointInfo> {
        let mut matching = endpoints.iter().filter(|ep| {
            ep.direction == direction
                && matches!(ep.transfer_type, TransferType::Bulk | TransferType::Interrupt)
        });
        match (matching.next(), matching.count()) {
            (Some(ep), 0) => Ok(*ep),
            (None, _) => Err(AdapterError::EndpointNotFound {
                direction,
                found: 0,
            }),
            (Some(_), extra) => Err(AdapterError::EndpointNotFound {
                direction,
                found: extra + 1,
            }),
        }
    };

    Ok(AdapterEndpoints {
        output: pick(Direction::Out)?,
        input: pick(Direction::In)?,
    })
}

/// The slice of libusb the adapter session needs.
///
/// Implemented for [`rusb::DeviceHandle`]; tests substitute an in-memory
/// device.
pub trait UsbLink {
    fn active_configuration(&self) -> rusb::Result<u8>;
    fn set_active_configuration(&mut self, config: u8) -> rusb::Result<()>;

    /// Ask libusb to unbind any kernel driver while the interface is claimed.
    fn set_auto_detach_kernel_driver(&mut self, _enable: bool) -> rusb::Result<()> {
        Ok(())
    }

    fn claim_interface(&mut self, interface: u8) -> rusb::Result<()>;
    fn release_interface(&mut self, interface: u8) -> rusb::Result<()>;

    /// Endpoints of alternate setting 0 of `interface` in the active configuration.
    fn interface_endpoints(&self, interface: u8) -> rusb::Result<Vec<EndpointInfo>>;

    fn write(&mut self, endpoint: &EndpointInfo, data: &[u8], timeout: Duration)
        -> rusb::Result<usize>;
    fn read(&mut self, endpoint: &EndpointInfo, buf: &mut [u8], timeout: Duration)
        -> rusb::Result<usize>;
}

impl<T: UsbContext> UsbLink for DeviceHandle<T> {
    fn active_configuration(&self) -> rusb::Result<u8> {
        DeviceHandle::active_configuration(self)
    }

    fn set_active_configuration(&mut self, config: u8) -> rusb::Result<()> {
        DeviceHandle::set_active_configuration(self, config)
    }

    fn set_auto_detach_kernel_driver(&mut self, enable: bool) -> rusb::Result<()> {
        DeviceHandle::set_auto_detach_kernel_driver(self, enable)
    }

    fn claim_interface(&mut self, interface: u8) -> rusb::Result<()> {
        DeviceHandle::claim_interface(self, interface)
    }

    fn release_interface(&mut self, interface: u8) -> rusb::Result<()> {
        DeviceHandle::release_interface(self, interface)
    }

    fn interface_endpoints(&self, interface: u8) -> rusb::Result<Vec<EndpointInfo>> {
        let config = self.device().active_config_descriptor()?;
        let mut endpoints = Vec::new();

        for iface in config.interfaces().filter(|i| i.number() == interface) {
            for desc in iface.descriptors().filter(|d| d.setting_number() == 0) {
                endpoints.extend(desc.endpoint_descriptors().map(|ep| EndpointInfo {
                    address: ep.address(),
                    direction: ep.direction(),
                    transfer_type: ep.transfer_type(),
                }));
            }
        }

        Ok(endpoints)
    }

    fn write(
        &mut self,
        endpoint: &EndpointInfo,
        data: &[u8],
        timeout: Duration,
    ) -> rusb::Result<usize> {
        match endpoint.transfer_type {
            TransferType::Interrupt => self.write_interrupt(endpoint.address, data, timeout),
            _ => self.write_bulk(endpoint.address, data, timeout),
        }
    }

    fn read(
        &mut self,
        endpoint: &EndpointInfo,
        buf: &mut [u8],
        timeout: Duration,
    ) -> rusb::Result<usize> {
        match endpoint.transfer_type {
            TransferType::Interrupt => self.read_interrupt(endpoint.address, buf, timeout),
            _ => self.read_bulk(endpoint.address, buf, timeout),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ep(address: u8, direction: Direction, transfer_type: TransferType) -> EndpointInfo {
        EndpointInfo {
            address,
            direction,
            transfer_type,
        }
    }

    #[test]
    fn resolves_adapter_interrupt_pair() {
        let eps = [
            ep(0x81, Direction::In, TransferType::Interrupt),
            ep(0x02, Direction::Out, TransferType::Interrupt),
        ];
        let resolved = resolve_endpoints(&eps).unwrap();
        assert_eq!(resolved.input.address, 0x81);
        assert_eq!(resolved.output.address, 0x02);
    }

    #[test]
    fn two_out_endpoints_are_rejected() {
        let eps = [
            ep(0x81, Direction::In, TransferType::Bulk),
            ep(0x02, Direction::Out, TransferType::Bulk),
            ep(0x03, Direction::Out, TransferType::Bulk),
        ];
        assert!(matches!(
            resolve_endpoints(&eps),
            Err(AdapterError::EndpointNotFound {
                direction: Direction::Out,
                found: 2
            })
        ));
    }

    #[test]
    fn missing_in_endpoint_is_rejected() {
        let eps = [ep(0x02, Direction::Out, TransferType::Bulk)];
        assert!(matches!(
            resolve_endpoints(&eps),
            Err(AdapterError::EndpointNotFound {
                direction: Direction::In,
                found: 0
            })
        ));
    }

    #[test]
    fn isochronous_endpoints_are_ignored() {
        let eps = [
            ep(0x81, Direction::In, TransferType::Bulk),
            ep(0x83, Direction::In, TransferType::Isochronous),
            ep(0x02, Direction::Out, TransferType::Bulk),
        ];
        assert_eq!(resolve_endpoints(&eps).unwrap().input.address, 0x81);
    }
}
