use std::fmt;

const HEADER_LEN: usize = 11;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Rx,
    Tx,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Rx => f.write_str("RX"),
            Direction::Tx => f.write_str("TX"),
        }
    }
}

/// Hex dump of a frame for packet logs: the 11 header bytes, then the byte
/// at the subcommand position and whatever follows it.
pub struct Dump<'a> {
    direction: Direction,
    data: &'a [u8],
}

impl<'a> Dump<'a> {
    pub fn new(direction: Direction, data: &'a [u8]) -> Self {
        Self { direction, data }
    }

    pub fn rx(data: &'a [u8]) -> Self {
        Self::new(Direction::Rx, data)
    }

    pub fn tx(data: &'a [u8]) -> Self {
        Self::new(Direction::Tx, data)
    }
}

fn write_hex(f: &mut fmt::Formatter<'_>, bytes: &[u8]) -> fmt::Result {
    for (i, b) in bytes.iter().enumerate() {
        if i > 0 {
            f.write_str(" ")?;
        }
        write!(f, "{b:02X}")?;
    }
    Ok(())
}

impl fmt::Display for Dump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.data.len() < HEADER_LEN {
            return write!(f, "[{}]: Too short ({} bytes)", self.direction, self.data.len());
        }

        let (header, rest) = self.data.split_at(HEADER_LEN);
        write!(f, "[{}] Payload: ", self.direction)?;
        write_hex(f, header)?;

        if let Some((id, args)) = rest.split_first() {
            write!(f, " | Sub: 0x{id:02X}")?;
            if !args.is_empty() {
                f.write_str(" ")?;
                write_hex(f, args)?;
            }
        }

        Ok(())
    }
}

impl fmt::Debug for Dump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
