//! Think-time between sequential attempts
//!
//! Grammar: `0` (disabled), a fixed duration (`5s`, `100ms`) or a range
//! (`100ms-5s`). A bare number on the low side borrows the high side's unit,
//! so `100-200ms` reads as 100ms to 200ms.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use rand::Rng;

use crate::errors::RurlError;
use crate::utils::parse_duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThinkSpec {
    min: Duration,
    max: Duration,
}

impl ThinkSpec {
    pub const DISABLED: ThinkSpec = ThinkSpec {
        min: Duration::ZERO,
        max: Duration::ZERO,
    };

    pub fn fixed(d: Duration) -> Self {
        ThinkSpec { min: d, max: d }
    }

    pub fn range(min: Duration, max: Duration) -> Self {
        ThinkSpec { min, max }
    }

    pub fn is_enabled(&self) -> bool {
        self.max > Duration::ZERO
    }

    /// Uniform draw from the configured range; fixed specs return their
    /// single value without touching the RNG.
    pub fn sample(&self) -> Duration {
        if self.min >= self.max {
            return self.min;
        }
        let nanos = rand::rng().random_range(self.min.as_nanos()..=self.max.as_nanos());
        Duration::from_nanos(nanos as u64)
    }
}

impl Default for ThinkSpec {
    fn default() -> Self {
        Self::DISABLED
    }
}

impl FromStr for ThinkSpec {
    type Err = RurlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let Some((low, high)) = s.split_once('-') else {
            return Ok(ThinkSpec::fixed(parse_duration(s)?));
        };

        let max = parse_duration(high)?;
        let min = match parse_duration(low) {
            Ok(d) => d,
            // A unitless low side borrows the high side's unit.
            Err(_) if low.chars().all(|c| c.is_ascii_digit() || c == '.') && !low.is_empty() => {
                let unit: String = high
                    .trim()
                    .chars()
                    .skip_while(|c| c.is_ascii_digit() || *c == '.')
                    .collect();
                parse_duration(&format!("{}{}", low, unit))?
            }
            Err(e) => return Err(e),
        };

        if min > max {
            return Err(RurlError::Parse(format!(
                "think range {:?} is inverted",
                s
            )));
        }
        Ok(ThinkSpec::range(min, max))
    }
}

impl fmt::Display for ThinkSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_enabled() {
            return write!(f, "0");
        }
        if self.min == self.max {
            return write!(f, "{}", humantime::format_duration(self.min));
        }
        write!(
            f,
            "{}-{}",
            humantime::format_duration(self.min),
            humantime::format_duration(self.max)
        )
    }
}
