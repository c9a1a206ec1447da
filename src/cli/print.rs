//! Print selection flags
//!
//! `-p` takes a compact string naming the parts of the exchange to dump:
//! `H` request headers, `B` request body, `h` response headers, `b` response
//! body, `A` everything. An unknown letter is a configuration error caught
//! before any request is sent.

use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;

use crate::errors::{Result, RurlError};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PrintFlags: u8 {
        const REQUEST_HEADERS  = 1;
        const REQUEST_BODY     = 1 << 1;
        const RESPONSE_HEADERS = 1 << 2;
        const RESPONSE_BODY    = 1 << 3;
    }
}

impl Default for PrintFlags {
    fn default() -> Self {
        PrintFlags::all()
    }
}

impl FromStr for PrintFlags {
    type Err = RurlError;

    fn from_str(s: &str) -> Result<Self> {
        let mut flags = PrintFlags::empty();
        for c in s.chars() {
            match c {
                'A' => flags |= PrintFlags::all(),
                'H' => flags |= PrintFlags::REQUEST_HEADERS,
                'B' => flags |= PrintFlags::REQUEST_BODY,
                'h' => flags |= PrintFlags::RESPONSE_HEADERS,
                'b' => flags |= PrintFlags::RESPONSE_BODY,
                other => {
                    return Err(RurlError::Config(format!(
                        "unknown print option {:?} in {:?}, want A, H, B, h or b",
                        other, s
                    )))
                }
            }
        }
        Ok(flags)
    }
}

impl fmt::Display for PrintFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == PrintFlags::all() {
            return write!(f, "A");
        }
        for (flag, c) in [
            (PrintFlags::REQUEST_HEADERS, 'H'),
            (PrintFlags::REQUEST_BODY, 'B'),
            (PrintFlags::RESPONSE_HEADERS, 'h'),
            (PrintFlags::RESPONSE_BODY, 'b'),
        ] {
            if self.contains(flag) {
                write!(f, "{}", c)?;
            }
        }
        Ok(())
    }
}
