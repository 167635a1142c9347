use std::{
    io::{self, BufRead},
    sync::mpsc::{Receiver, RecvTimeoutError, Sender},
    thread,
    time::{Duration, Instant},
};

use tracing::debug;

use crate::port_cursor::Port;

const THREAD_NAME: &str = "gc-genie-input";

/// Requests coming back from the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    ToggleRumble,
    AdvancePort,
    Quit,
}

impl Intent {
    /// Map a line of keyboard input to an intent.
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim().to_ascii_lowercase().as_str() {
            "r" | "rumble" => Some(Intent::ToggleRumble),
            "n" | "next" | "" => Some(Intent::AdvancePort),
            "q" | "quit" | "exit" => Some(Intent::Quit),
            _ => None,
        }
    }
}

/// Which ports a rumble toggle applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RumbleScope {
    AllPorts,
    Selected(Port),
}

/// Flags to send for a rumble toggle.
///
/// `AllPorts` switches every port off if any is rumbling, otherwise on.
/// `Selected` flips only that port.
pub fn toggled_rumble(current: [bool; 4], scope: RumbleScope) -> [bool; 4] {
    match scope {
        RumbleScope::AllPorts => {
            let any_on = current.iter().any(|on| *on);
            [!any_on; 4]
        }
        RumbleScope::Selected(port) => {
            let mut next = current;
            next[port.index()] = !next[port.index()];
            next
        }
    }
}

/// Block for up to `timeout`, returning early with `true` if `Quit` arrives.
///
/// Other intents are dropped. A disconnected channel just waits out the rest
/// of the timeout.
pub fn wait_for_quit(rx: &Receiver<Intent>, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return false;
        }
        match rx.recv_timeout(remaining) {
            Ok(Intent::Quit) => return true,
            Ok(_) => continue,
            Err(RecvTimeoutError::Timeout) => return false,
            Err(RecvTimeoutError::Disconnected) => {
                thread::sleep(remaining);
                return false;
            }
        }
    }
}

/// Non-blocking check for a pending `Quit`; other intents are dropped.
pub fn quit_requested(rx: &Receiver<Intent>) -> bool {
    rx.try_iter().any(|intent| intent == Intent::Quit)
}

/// Forward stdin lines as intents until stdin closes or the receiver hangs up.
///
/// Closing stdin does not quit; Ctrl-C or `q` does.
pub fn spawn_stdin_reader(tx: Sender<Intent>) -> io::Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name(THREAD_NAME.into())
        .spawn(move || {
            let stdin = io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                match Intent::parse(&line) {
                    Some(intent) => {
                        if tx.send(intent).is_err() {
                            return;
                        }
                    }
                    None => debug!(input = %line, "ignoring unknown command"),
                }
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_keyboard_commands() {
        assert_eq!(Intent::parse("r\n"), Some(Intent::ToggleRumble));
        assert_eq!(Intent::parse(" N "), Some(Intent::AdvancePort));
        assert_eq!(Intent::parse(""), Some(Intent::AdvancePort));
        assert_eq!(Intent::parse("quit"), Some(Intent::Quit));
        assert_eq!(Intent::parse("zz"), None);
    }

    #[test]
    fn all_ports_toggle_flips_every_port_together() {
        let on = toggled_rumble([false; 4], RumbleScope::AllPorts);
        assert_eq!(on, [true; 4]);
        assert_eq!(toggled_rumble(on, RumbleScope::AllPorts), [false; 4]);
        assert_eq!(
            toggled_rumble([false, true, false, false], RumbleScope::AllPorts),
            [false; 4]
        );
    }

    #[test]
    fn quit_cuts_the_wait_short() {
        let (tx, rx) = std::sync::mpsc::channel();
        tx.send(Intent::ToggleRumble).unwrap();
        tx.send(Intent::Quit).unwrap();

        let start = Instant::now();
        assert!(wait_for_quit(&rx, Duration::from_secs(30)));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn wait_runs_out_without_quit() {
        let (tx, rx) = std::sync::mpsc::channel();
        tx.send(Intent::AdvancePort).unwrap();

        let start = Instant::now();
        assert!(!wait_for_quit(&rx, Duration::from_millis(20)));
        assert!(start.elapsed() >= Duration::from_millis(20));
        drop(tx);
    }

    #[test]
    fn wait_survives_a_closed_channel() {
        let (tx, rx) = std::sync::mpsc::channel::<Intent>();
        drop(tx);

        let start = Instant::now();
        assert!(!wait_for_quit(&rx, Duration::from_millis(20)));
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn pending_quit_is_seen_without_blocking() {
        let (tx, rx) = std::sync::mpsc::channel();
        assert!(!quit_requested(&rx));

        tx.send(Intent::ToggleRumble).unwrap();
        tx.send(Intent::Quit).unwrap();
        assert!(quit_requested(&rx));
        assert!(!quit_requested(&rx));
    }

    #[test]
    fn selected_toggle_touches_one_port() {
        let port3 = Port::ALL[2];
        let flags = toggled_rumble([true, false, false, false], RumbleScope::Selected(port3));
        assert_eq!(flags, [true, false, true, false]);
        assert_eq!(
            toggled_rumble(flags, RumbleScope::Selected(port3)),
            [true, false, false, false]
        );
    }
}
