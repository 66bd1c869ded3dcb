//! Memory trace parsing.
//!
//! A trace is plain text, one request per line:
//!
//! ```text
//! # cycle  type  address      [src]
//! 1000     GETS  0x7f001040   0
//! 1012     PUTX  0x7f002000
//! ```
//!
//! `type` is one of `GETS`, `GETX`, `PUTS`, `PUTX`, `R`, `W`. Blank lines and `#` comments are
//! skipped. The memory trace the controller writes (`cycle R|W 0xaddr <payload>`) reads back
//! as-is: a 64-digit hex payload in the last column is ignored and the request comes from
//! requester 0.

use std::fs;
use std::path::Path;

use crate::common::constants::MEMTRACE_DATA_DIGITS;
use crate::common::{MemCtrlError, MemReq, PhysAddr, RequestType, Result};

/// One parsed trace line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TraceEntry {
    /// Cycle the request reaches the controller.
    pub cycle: u64,
    /// Request type.
    pub req_type: RequestType,
    /// Byte address.
    pub addr: PhysAddr,
    /// Requester id.
    pub src_id: u32,
}

impl TraceEntry {
    /// Builds the controller request for this entry.
    pub const fn to_request(&self, line_bits: u32) -> MemReq {
        MemReq::new(self.req_type, self.addr.line(line_bits), self.cycle, self.src_id)
    }
}

fn parse_addr(token: &str) -> Option<u64> {
    match token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => token.parse().ok(),
    }
}

fn is_payload(token: &str) -> bool {
    token.len() == MEMTRACE_DATA_DIGITS && token.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Parses one line; `Ok(None)` for blank and comment lines.
///
/// # Arguments
///
/// * `line_no` - 1-based line number, for diagnostics.
/// * `text` - The line, without its terminator.
pub fn parse_line(line_no: usize, text: &str) -> Result<Option<TraceEntry>> {
    let body = text.split('#').next().unwrap_or_default().trim();
    if body.is_empty() {
        return Ok(None);
    }
    let err = |reason: String| MemCtrlError::TraceParse {
        line: line_no,
        reason,
    };

    let fields: Vec<&str> = body.split_whitespace().collect();
    if !(3..=4).contains(&fields.len()) {
        return Err(err(format!("expected 3 or 4 fields, found {}", fields.len())));
    }
    let cycle = fields[0]
        .parse()
        .map_err(|_| err(format!("bad cycle `{}`", fields[0])))?;
    let req_type = fields[1]
        .parse::<RequestType>()
        .map_err(|e| err(e.to_string()))?;
    let addr = parse_addr(fields[2]).ok_or_else(|| err(format!("bad address `{}`", fields[2])))?;
    let src_id = match fields.get(3) {
        None => 0,
        Some(tok) if is_payload(tok) => 0,
        Some(tok) => tok
            .parse()
            .map_err(|_| err(format!("bad requester id `{tok}`")))?,
    };

    Ok(Some(TraceEntry {
        cycle,
        req_type,
        addr: PhysAddr::new(addr),
        src_id,
    }))
}

/// Parses a whole trace.
pub fn parse_trace(text: &str) -> Result<Vec<TraceEntry>> {
    let mut entries = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        if let Some(entry) = parse_line(idx + 1, line)? {
            entries.push(entry);
        }
    }
    Ok(entries)
}

/// Reads and parses a trace file.
pub fn read_trace(path: impl AsRef<Path>) -> Result<Vec<TraceEntry>> {
    parse_trace(&fs::read_to_string(path)?)
}
