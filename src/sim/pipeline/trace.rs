use crate::error::{Error, Result};
use std::io::BufRead;
use std::path::Path;

/// Kind of memory access recorded in a trace. The TLB treats both the same way.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessType {
    Read,
    Write,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TraceEvent {
    pub access: AccessType,
    pub addr: u64,
}

fn parse_addr(text: &str) -> Option<u64> {
    let text = text.trim();
    let digits = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")).unwrap_or(text);
    u64::from_str_radix(digits, 16).ok()
}

fn parse_access(text: &str) -> Option<AccessType> {
    match text.trim() {
        "R" | "r" => Some(AccessType::Read),
        "W" | "w" => Some(AccessType::Write),
        _ => None,
    }
}

/// Parse a single trace line. Returns `Ok(None)` for blank and comment lines.
///
/// Accepted forms are `addr`, `R:addr`, `W:addr` and `R addr`; addresses are hexadecimal with an
/// optional `0x` prefix.
pub fn parse_line(line: &str) -> std::result::Result<Option<TraceEvent>, String> {
    let line = match line.find('#') {
        Some(idx) => &line[..idx],
        None => line,
    };
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let mut parts = line.splitn(2, |c: char| c == ':' || c.is_whitespace());
    let (access, addr) = match (parts.next(), parts.next()) {
        (Some(addr), None) => (AccessType::Read, addr),
        (Some(access), Some(addr)) => match parse_access(access) {
            Some(access) => (access, addr),
            None => return Err(format!("unknown access type '{}'", access)),
        },
        (None, _) => unreachable!(),
    };
    match parse_addr(addr) {
        Some(addr) => Ok(Some(TraceEvent { access, addr })),
        None => Err(format!("invalid address '{}'", addr.trim())),
    }
}

/// Read a whole trace.
pub fn parse_trace(reader: impl BufRead) -> Result<Vec<TraceEvent>> {
    let mut events = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(|err| Error::Trace { line: idx + 1, message: err.to_string() })?;
        match parse_line(&line) {
            Ok(Some(event)) => events.push(event),
            Ok(None) => (),
            Err(message) => return Err(Error::Trace { line: idx + 1, message }),
        }
    }
    Ok(events)
}

pub fn read_trace(path: impl AsRef<Path>) -> Result<Vec<TraceEvent>> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(|err| Error::io(path, err))?;
    parse_trace(std::io::BufReader::new(file))
}
