//! Bus instance selection from the board revision
//!
//! Early Raspberry Pi boards wire the header I2C pins to bus 0; every later
//! board uses bus 1. The revision code is the last four characters of the
//! `Revision` line in `/proc/cpuinfo` (anything before them, such as the
//! over-volt flag, is ignored).

use core::fmt;

/// Revision codes of the first board generation
const REV1_CODES: [&str; 3] = ["0000", "0002", "0003"];

/// Default location of the platform identification text
#[cfg(feature = "std")]
pub const CPUINFO_PATH: &str = "/proc/cpuinfo";

/// Board generation, as far as bus wiring is concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BoardRevision {
    /// No revision line was found
    #[default]
    Unknown,
    /// First generation board (header I2C on bus 0)
    Rev1,
    /// Any later board (header I2C on bus 1)
    Rev2,
}

impl BoardRevision {
    /// Bus instance wired to the header I2C pins
    pub const fn bus_index(self) -> u8 {
        match self {
            BoardRevision::Rev2 => 1,
            BoardRevision::Rev1 | BoardRevision::Unknown => 0,
        }
    }
}

impl fmt::Display for BoardRevision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoardRevision::Unknown => write!(f, "unknown"),
            BoardRevision::Rev1 => write!(f, "revision 1"),
            BoardRevision::Rev2 => write!(f, "revision 2"),
        }
    }
}

/// Extract the 4-character revision code from one line, if it is a
/// `Revision : ...` line
fn revision_code(line: &str) -> Option<&str> {
    let line = line.trim_end_matches(['\r', '\n']);
    let rest = line.strip_prefix("Revision")?;

    let after_key = rest.trim_start();
    if after_key.len() == rest.len() {
        return None;
    }
    let value = after_key.strip_prefix(':')?;
    let mut chars = value.chars();
    if !chars.next().is_some_and(char::is_whitespace) {
        return None;
    }
    let value = chars.as_str();

    let code = value.get(value.len().checked_sub(4)?..)?;
    code.bytes().all(|b| b.is_ascii_hexdigit()).then_some(code)
}

/// Classify the board from platform identification text
///
/// The first matching line decides.
pub fn parse_revision(text: &str) -> BoardRevision {
    match text.lines().find_map(revision_code) {
        Some(code) if REV1_CODES.contains(&code) => BoardRevision::Rev1,
        Some(_) => BoardRevision::Rev2,
        None => BoardRevision::Unknown,
    }
}

/// Bus index for the given identification text
pub fn select_bus(text: &str) -> u8 {
    parse_revision(text).bus_index()
}

/// Detect the bus index from `/proc/cpuinfo`
#[cfg(feature = "std")]
pub fn detect_bus() -> u8 {
    detect_bus_from(CPUINFO_PATH)
}

/// Detect the bus index from an identification file
///
/// An unreadable file selects bus 0.
#[cfg(feature = "std")]
pub fn detect_bus_from<P: AsRef<std::path::Path>>(path: P) -> u8 {
    let path = path.as_ref();
    match std::fs::read_to_string(path) {
        Ok(text) => {
            let revision = parse_revision(&text);
            log::debug!(
                "Board {} from {}, using bus {}",
                revision,
                path.display(),
                revision.bus_index()
            );
            revision.bus_index()
        }
        Err(e) => {
            log::debug!("Cannot read {}: {}, using bus 0", path.display(), e);
            0
        }
    }
}
