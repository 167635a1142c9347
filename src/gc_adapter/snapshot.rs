use serde::Serialize;

use crate::port_cursor::Port;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    A,
    B,
    X,
    Y,
    DpadLeft,
    DpadRight,
    DpadDown,
    DpadUp,
    Start,
    Z,
    R,
    L,
}

impl Button {
    pub const ALL: [Button; 12] = [
        Button::A,
        Button::B,
        Button::X,
        Button::Y,
        Button::DpadLeft,
        Button::DpadRight,
        Button::DpadDown,
        Button::DpadUp,
        Button::Start,
        Button::Z,
        Button::R,
        Button::L,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Button::A => "A",
            Button::B => "B",
            Button::X => "X",
            Button::Y => "Y",
            Button::DpadLeft => "Left",
            Button::DpadRight => "Right",
            Button::DpadDown => "Down",
            Button::DpadUp => "Up",
            Button::Start => "Start",
            Button::Z => "Z",
            Button::R => "R",
            Button::L => "L",
        }
    }
}

/// Digital button states for one controller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Buttons {
    // Group A byte
    pub a: bool,
    pub b: bool,
    pub x: bool,
    pub y: bool,
    pub dpad_left: bool,
    pub dpad_right: bool,
    pub dpad_down: bool,
    pub dpad_up: bool,
    // Group B byte
    pub start: bool,
    pub z: bool,
    pub r: bool,
    pub l: bool,
}

impl Buttons {
    pub fn is_pressed(&self, button: Button) -> bool {
        match button {
            Button::A => self.a,
            Button::B => self.b,
            Button::X => self.x,
            Button::Y => self.y,
            Button::DpadLeft => self.dpad_left,
            Button::DpadRight => self.dpad_right,
            Button::DpadDown => self.dpad_down,
            Button::DpadUp => self.dpad_up,
            Button::Start => self.start,
            Button::Z => self.z,
            Button::R => self.r,
            Button::L => self.l,
        }
    }

    pub fn pressed(&self) -> impl Iterator<Item = Button> + '_ {
        Button::ALL
            .into_iter()
            .filter(move |button| self.is_pressed(*button))
    }
}

/// Analog values for one controller, each 0-255.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Axes {
    pub left_x: u8,
    pub left_y: u8,
    pub right_x: u8,
    pub right_y: u8,
    pub trigger_r: u8,
    pub trigger_l: u8,
}

/// Decoded state of one adapter port for a single read cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ControllerSnapshot {
    pub port: Port,
    pub connected: bool,
    pub buttons: Buttons,
    pub axes: Axes,
}

/// Everything the presentation layer needs for one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AdapterView {
    pub controllers: [ControllerSnapshot; 4],
    pub selected: Port,
    pub rumble: [bool; 4],
    /// False when the last poll did not deliver a full frame.
    pub fresh: bool,
}

impl AdapterView {
    pub fn selected_controller(&self) -> &ControllerSnapshot {
        &self.controllers[self.selected.index()]
    }
}
