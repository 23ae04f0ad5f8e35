//! Outcomes of coordinator requests.

use std::fmt;

/// The requests a coordinator can issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    /// Ask every sensor for a reading.
    Measure,
    /// Ask every sensor for a reading and use it as the zero point.
    Calibrate,
    /// Probe the network.
    Ping,
}

impl RequestKind {
    /// Lowercase name, for logs and metric labels.
    pub const fn as_str(self) -> &'static str {
        match self {
            RequestKind::Measure => "measure",
            RequestKind::Calibrate => "calibrate",
            RequestKind::Ping => "ping",
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What became of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStatus {
    /// The request packet was sent.
    Accepted(RequestKind),
    /// An earlier request is still outstanding; nothing was sent.
    Busy(RequestKind),
}

impl RequestStatus {
    /// Returns true if the request was sent.
    pub fn is_accepted(self) -> bool {
        matches!(self, RequestStatus::Accepted(_))
    }

    /// The request this status is about.
    pub fn kind(self) -> RequestKind {
        match self {
            RequestStatus::Accepted(kind) | RequestStatus::Busy(kind) => kind,
        }
    }

    /// Numeric status code: 200 or 300.
    pub fn code(self) -> u16 {
        match self {
            RequestStatus::Accepted(_) => 200,
            RequestStatus::Busy(_) => 300,
        }
    }

    /// Status line returned to the caller.
    pub fn message(self) -> &'static str {
        use RequestKind::*;
        use RequestStatus::*;
        match self {
            Accepted(Measure) => "200 OK Measurement requested.",
            Busy(Measure) => {
                "300 BUSY Measurement not requested as previous requests are still pending."
            }
            Accepted(Calibrate) => "200 OK Calibration requested.",
            Busy(Calibrate) => {
                "300 BUSY Calibration not requested as previous requests are still pending."
            }
            Accepted(Ping) => "200 OK Ping request sent.",
            Busy(Ping) => "300 BUSY ping: previous requests still pending.",
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}
