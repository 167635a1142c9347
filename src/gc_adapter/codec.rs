//! Byte-level encoding of the adapter protocol.
//!
//! Every read delivers a 37-byte frame: one leading byte followed by four
//! 9-byte port blocks. Commands written to the adapter are a one-byte id
//! optionally followed by a payload.

use super::frame::FRAME_LEN;
use super::snapshot::{Axes, Buttons, ControllerSnapshot};
use crate::port_cursor::Port;

pub const PORT_BLOCK_LEN: usize = 9;

/// Connection byte reported for a standard wired controller.
pub const WIRED_CONTROLLER: u8 = 0x10;

pub const CMD_START_COMMUNICATION: u8 = 0x13;
pub const CMD_RUMBLE: u8 = 0x11;

pub const RUMBLE_COMMAND_LEN: usize = 5;

/// Offset of the first byte of `port`'s block within a frame.
pub fn port_offset(port: Port) -> usize {
    1 + port.index() * PORT_BLOCK_LEN
}

/// Decode one port block. Total over all byte values.
pub fn decode_port(frame: &[u8; FRAME_LEN], port: Port) -> ControllerSnapshot {
    let base = port_offset(port);
    let block = &frame[base..base + PORT_BLOCK_LEN];

    let bit = |byte: u8, offset: u8| -> bool { (byte >> offset) & 1 == 1 };
    let group_a = block[1];
    let group_b = block[2];

    ControllerSnapshot {
        port,
        connected: block[0] == WIRED_CONTROLLER,
        buttons: Buttons {
            a: bit(group_a, 0),
            b: bit(group_a, 1),
            x: bit(group_a, 2),
            y: bit(group_a, 3),
            dpad_left: bit(group_a, 4),
            dpad_right: bit(group_a, 5),
            dpad_down: bit(group_a, 6),
            dpad_up: bit(group_a, 7),
            start: bit(group_b, 0),
            z: bit(group_b, 1),
            r: bit(group_b, 2),
            l: bit(group_b, 3),
        },
        axes: Axes {
            left_x: block[3],
            left_y: block[4],
            right_x: block[5],
            right_y: block[6],
            trigger_r: block[7],
            trigger_l: block[8],
        },
    }
}

pub fn decode_all(frame: &[u8; FRAME_LEN]) -> [ControllerSnapshot; 4] {
    Port::ALL.map(|port| decode_port(frame, port))
}

/// Handshake that must be the first command sent after claiming the adapter.
pub fn encode_start_command() -> [u8; 1] {
    [CMD_START_COMMUNICATION]
}

pub fn encode_rumble_command(flags: [bool; 4]) -> [u8; RUMBLE_COMMAND_LEN] {
    let mut cmd = [CMD_RUMBLE, 0, 0, 0, 0];
    for (slot, on) in cmd[1..].iter_mut().zip(flags) {
        *slot = u8::from(on);
    }
    cmd
}

/// Inverse of [`encode_rumble_command`]. Returns `None` for anything that is
/// not a well-formed rumble command.
pub fn decode_rumble_command(bytes: &[u8]) -> Option<[bool; 4]> {
    match bytes {
        [CMD_RUMBLE, payload @ ..] if payload.len() == 4 => {
            let mut flags = [false; 4];
            for (flag, byte) in flags.iter_mut().zip(payload) {
                *flag = match byte {
                    0x00 => false,
                    0x01 => true,
                    _ => return None,
                };
            }
            Some(flags)
        }
        _ => None,
    }
}
