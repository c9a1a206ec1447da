//! Exit status codes for the CLI
//!
//! rurl follows standard Unix exit code conventions:
//! - 0: Success
//! - 1: Any error (configuration, network, file creation)
//! - 2: Inactivity timeout on a single request
//! - 130: User interrupted (Ctrl+C, standard SIGINT exit code)

use std::process::{ExitCode, Termination};

/// Exit status codes following standard Unix conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitStatus {
    /// Successful execution
    Success = 0,
    /// Any error (bad flags, TLS material, connection failures)
    Error = 1,
    /// The inactivity watchdog fired and cancelled the request
    Timeout = 2,
    /// User interrupted (Ctrl+C) - standard SIGINT code
    Interrupted = 130,
}

impl From<ExitStatus> for ExitCode {
    fn from(status: ExitStatus) -> Self {
        ExitCode::from(status as u8)
    }
}

impl Termination for ExitStatus {
    fn report(self) -> ExitCode {
        ExitCode::from(self as u8)
    }
}

impl ExitStatus {
    /// Create an exit status from a raw exit code
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => ExitStatus::Success,
            2 => ExitStatus::Timeout,
            130 => ExitStatus::Interrupted,
            _ => ExitStatus::Error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_code_round_trip() {
        for status in [
            ExitStatus::Success,
            ExitStatus::Error,
            ExitStatus::Timeout,
            ExitStatus::Interrupted,
        ] {
            assert_eq!(ExitStatus::from_code(status as u8 as i32), status);
        }
    }

    #[test]
    fn test_unknown_codes_are_errors() {
        assert_eq!(ExitStatus::from_code(42), ExitStatus::Error);
        assert_eq!(ExitStatus::from_code(-1), ExitStatus::Error);
    }
}
