//! Plain-terminal presentation of the adapter state.

use std::io::{self, Write};

use crate::gc_adapter::{AdapterView, ControllerSnapshot};

/// Writes a status line whenever the view changes.
pub struct TerminalView<W: Write> {
    out: W,
    last: Option<AdapterView>,
}

impl TerminalView<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> TerminalView<W> {
    pub fn new(out: W) -> Self {
        Self { out, last: None }
    }

    pub fn print_help(&mut self) -> io::Result<()> {
        writeln!(
            self.out,
            "commands: [n]ext port (or Enter), [r]umble toggle, [q]uit"
        )?;
        self.out.flush()
    }

    /// Render `view` unless it is identical to the previous one.
    ///
    /// Returns whether anything was written.
    pub fn render(&mut self, view: &AdapterView) -> io::Result<bool> {
        if self.last.as_ref() == Some(view) {
            return Ok(false);
        }
        writeln!(self.out, "{}", format_view(view))?;
        self.out.flush()?;
        self.last = Some(*view);
        Ok(true)
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

pub fn format_view(view: &AdapterView) -> String {
    let ports: Vec<String> = view
        .controllers
        .iter()
        .zip(view.rumble)
        .map(|(ctrl, rumble)| {
            format!(
                "P{}[{}{}]",
                ctrl.port,
                if ctrl.connected { 'x' } else { ' ' },
                if rumble { "~" } else { "" }
            )
        })
        .collect();

    let stale = if view.fresh { "" } else { " (stale)" };
    format!(
        "{} | port {}: {}{}",
        ports.join(" "),
        view.selected,
        format_controller(view.selected_controller()),
        stale
    )
}

pub fn format_controller(ctrl: &ControllerSnapshot) -> String {
    let pressed: Vec<&str> = ctrl.buttons.pressed().map(|b| b.label()).collect();
    let pressed = if pressed.is_empty() {
        "-".to_string()
    } else {
        pressed.join("+")
    };
    let axes = &ctrl.axes;
    format!(
        "{} | L({:3},{:3}) R({:3},{:3}) T(r{:3} l{:3})",
        pressed, axes.left_x, axes.left_y, axes.right_x, axes.right_y, axes.trigger_r, axes.trigger_l
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gc_adapter::{capture_view, FrameBuffer, PollOutcome, FRAME_LEN};
    use crate::port_cursor::Port;

    fn sample_view(outcome: PollOutcome) -> AdapterView {
        let mut raw = [0u8; FRAME_LEN];
        raw[1..10].copy_from_slice(&[16, 0b0000_0011, 0b0000_0001, 128, 127, 130, 125, 0, 255]);
        let frame = FrameBuffer::from(raw);
        capture_view(&frame, Port::default(), [true, false, false, false], outcome)
    }

    #[test]
    fn formats_selected_controller() {
        let line = format_view(&sample_view(PollOutcome::Fresh));
        assert_eq!(
            line,
            "P1[x~] P2[ ] P3[ ] P4[ ] | port 1: A+B+Start | L(128,127) R(130,125) T(r  0 l255)"
        );
    }

    #[test]
    fn marks_stale_frames() {
        let line = format_view(&sample_view(PollOutcome::Stale { received: 0 }));
        assert!(line.ends_with("(stale)"));
    }

    #[test]
    fn only_renders_changes() {
        let mut view = TerminalView::new(Vec::new());
        let snapshot = sample_view(PollOutcome::Fresh);

        assert!(view.render(&snapshot).unwrap());
        assert!(!view.render(&snapshot).unwrap());

        let mut moved = snapshot;
        moved.selected = Port::ALL[1];
        assert!(view.render(&moved).unwrap());

        let written = String::from_utf8(view.into_inner()).unwrap();
        assert_eq!(written.lines().count(), 2);
        assert!(written.lines().nth(1).unwrap().contains("port 2: -"));
    }
}
