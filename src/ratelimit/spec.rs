//! Rate spec grammar: `<quantity><unit>[:req|:rsp]`
//!
//! The quantity takes binary byte units (`10K` = 10240 bytes per second,
//! fractions allowed). Without a direction suffix the cap applies to both the
//! request and response body.

use std::fmt;
use std::str::FromStr;

use crate::errors::{Result, RurlError};

/// Which body stream a rate cap applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Both,
    Request,
    Response,
}

/// A parsed bandwidth cap. Zero means unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateSpec {
    pub bytes_per_second: u64,
    pub direction: Direction,
}

impl RateSpec {
    pub const DISABLED: RateSpec = RateSpec {
        bytes_per_second: 0,
        direction: Direction::Both,
    };

    pub fn is_enabled(&self) -> bool {
        self.bytes_per_second > 0
    }

    pub fn applies_to_request(&self) -> bool {
        self.is_enabled() && matches!(self.direction, Direction::Both | Direction::Request)
    }

    pub fn applies_to_response(&self) -> bool {
        self.is_enabled() && matches!(self.direction, Direction::Both | Direction::Response)
    }
}

impl Default for RateSpec {
    fn default() -> Self {
        RateSpec::DISABLED
    }
}

impl FromStr for RateSpec {
    type Err = RurlError;

    fn from_str(s: &str) -> Result<Self> {
        let (quantity, suffix) = match s.split_once(':') {
            Some((q, d)) => (q, d),
            None => (s, ""),
        };
        let direction = match suffix.to_ascii_lowercase().as_str() {
            "" => Direction::Both,
            "req" => Direction::Request,
            "rsp" => Direction::Response,
            other => {
                return Err(RurlError::Parse(format!(
                    "unknown rate direction {:?}, want :req or :rsp",
                    other
                )))
            }
        };
        Ok(RateSpec {
            bytes_per_second: parse_bytes(quantity)?,
            direction,
        })
    }
}

impl fmt::Display for RateSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_enabled() {
            return write!(f, "0");
        }
        // Largest binary unit that divides evenly, so parsing the rendering
        // gives back the exact byte rate.
        let mut value = self.bytes_per_second;
        let mut unit = "B";
        for candidate in ["KiB", "MiB", "GiB", "TiB"] {
            if value % 1024 != 0 {
                break;
            }
            value /= 1024;
            unit = candidate;
        }
        write!(f, "{}{}", value, unit)?;
        match self.direction {
            Direction::Both => Ok(()),
            Direction::Request => write!(f, ":req"),
            Direction::Response => write!(f, ":rsp"),
        }
    }
}

/// Parse a byte quantity with an optional binary unit: `2048`, `10K`,
/// `1.5MiB`, `2mb`. Units are powers of 1024 regardless of spelling.
pub fn parse_bytes(s: &str) -> Result<u64> {
    let s = s.trim();
    let split = s
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .unwrap_or(s.len());
    let (number, unit) = s.split_at(split);
    if number.is_empty() {
        return Err(RurlError::Parse(format!("invalid byte quantity {:?}", s)));
    }
    let value: f64 = number
        .parse()
        .map_err(|_| RurlError::Parse(format!("invalid byte quantity {:?}", s)))?;
    let multiplier: u64 = match unit.trim().to_ascii_uppercase().as_str() {
        "" | "B" => 1,
        "K" | "KB" | "KIB" => 1 << 10,
        "M" | "MB" | "MIB" => 1 << 20,
        "G" | "GB" | "GIB" => 1 << 30,
        "T" | "TB" | "TIB" => 1 << 40,
        other => {
            return Err(RurlError::Parse(format!(
                "unknown byte unit {:?} in {:?}",
                other, s
            )))
        }
    };
    Ok((value * multiplier as f64).round() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bytes_units() {
        assert_eq!(parse_bytes("2048").unwrap(), 2048);
        assert_eq!(parse_bytes("10K").unwrap(), 10 * 1024);
        assert_eq!(parse_bytes("10k").unwrap(), 10 * 1024);
        assert_eq!(parse_bytes("1.5M").unwrap(), 1_572_864);
        assert_eq!(parse_bytes("1MiB").unwrap(), 1 << 20);
        assert_eq!(parse_bytes("2 GB").unwrap(), 2 << 30);
        assert!(parse_bytes("").is_err());
        assert!(parse_bytes("K").is_err());
        assert!(parse_bytes("10X").is_err());
    }

    #[test]
    fn test_direction_suffix() {
        let spec: RateSpec = "10K".parse().unwrap();
        assert_eq!(spec.direction, Direction::Both);
        assert!(spec.applies_to_request());
        assert!(spec.applies_to_response());

        let spec: RateSpec = "10K:req".parse().unwrap();
        assert_eq!(spec.direction, Direction::Request);
        assert!(spec.applies_to_request());
        assert!(!spec.applies_to_response());

        let spec: RateSpec = "10K:RSP".parse().unwrap();
        assert_eq!(spec.direction, Direction::Response);
        assert!(!spec.applies_to_request());
        assert!(spec.applies_to_response());
    }

    #[test]
    fn test_unknown_direction_rejected() {
        assert!("10K:up".parse::<RateSpec>().is_err());
        assert!("10K:".parse::<RateSpec>().is_err());
    }

    #[test]
    fn test_display_round_trip() {
        for input in ["0", "512B", "10KiB", "1536B", "3MiB:req", "2GiB:rsp"] {
            let spec: RateSpec = input.parse().unwrap();
            let rendered = spec.to_string();
            let reparsed: RateSpec = rendered.parse().unwrap();
            assert_eq!(reparsed, spec, "{} -> {} did not round-trip", input, rendered);
        }
    }

    #[test]
    fn test_display_picks_exact_unit() {
        let spec: RateSpec = "10K".parse().unwrap();
        assert_eq!(spec.to_string(), "10KiB");

        let spec: RateSpec = "1536".parse().unwrap();
        assert_eq!(spec.to_string(), "1536B");

        assert_eq!(RateSpec::DISABLED.to_string(), "0");
    }

    #[test]
    fn test_disabled_applies_nowhere() {
        let spec: RateSpec = "0".parse().unwrap();
        assert!(!spec.is_enabled());
        assert!(!spec.applies_to_request());
        assert!(!spec.applies_to_response());
    }
}
