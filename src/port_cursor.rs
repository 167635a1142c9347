use std::{fmt, str::FromStr};

use serde::Serialize;

/// One of the four controller ports on the adapter, numbered 1 through 4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Port(u8);

impl Port {
    pub const ALL: [Port; 4] = [Port(1), Port(2), Port(3), Port(4)];

    /// Returns `None` unless `number` is in `1..=4`.
    pub fn new(number: u8) -> Option<Self> {
        if (1..=4).contains(&number) {
            Some(Self(number))
        } else {
            None
        }
    }

    pub fn number(self) -> u8 {
        self.0
    }

    /// Zero-based index, for addressing per-port arrays.
    pub fn index(self) -> usize {
        usize::from(self.0 - 1)
    }

    /// The following port, wrapping 4 back to 1.
    pub fn next(self) -> Self {
        Self(self.0 % 4 + 1)
    }
}

impl Default for Port {
    fn default() -> Self {
        Self(1)
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Port {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let number: u8 = s
            .trim()
            .parse()
            .map_err(|_| format!("'{s}' is not a port number"))?;
        Port::new(number).ok_or_else(|| format!("port must be 1-4, got {number}"))
    }
}

/// Tracks which port is currently selected for display.
///
/// Starts at port 1 and advances 1 -> 2 -> 3 -> 4 -> 1.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PortCursor {
    current: Port,
}

impl PortCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(port: Port) -> Self {
        Self { current: port }
    }

    pub fn current(&self) -> Port {
        self.current
    }

    /// Move to the next port and return it.
    pub fn advance(&mut self) -> Port {
        self.current = self.current.next();
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::{Port, PortCursor};

    #[test]
    fn four_advances_return_to_start() {
        let mut cursor = PortCursor::new();
        assert_eq!(cursor.current().number(), 1);

        let visited: Vec<u8> = (0..4).map(|_| cursor.advance().number()).collect();
        assert_eq!(visited, vec![2, 3, 4, 1]);
        assert_eq!(cursor.current(), Port::default());
    }

    #[test]
    fn never_leaves_valid_range() {
        let mut cursor = PortCursor::starting_at(Port::ALL[2]);
        for _ in 0..100 {
            let port = cursor.advance();
            assert!((1..=4).contains(&port.number()));
        }
    }

    #[test]
    fn rejects_out_of_range_numbers() {
        assert!(Port::new(0).is_none());
        assert!(Port::new(5).is_none());
        assert_eq!(Port::new(4).map(Port::index), Some(3));
    }

    #[test]
    fn parses_from_cli_text() {
        assert_eq!("3".parse::<Port>(), Ok(Port::ALL[2]));
        assert!("7".parse::<Port>().is_err());
        assert!("p1".parse::<Port>().is_err());
    }
}
