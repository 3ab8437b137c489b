//! Outgoing lines. `Display` is the exact wire form, without the newline.

use core::fmt;

use crate::error::Nack;

#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Boot banner.
    Ready,
    Pong,
    Ack,
    Nack(Nack),
    /// `ECHO(text)` payload, verbatim.
    Echo(String),
    /// Per-tick TEST telemetry.
    Telemetry {
        dist: f32,
        sp: f32,
        err: f32,
        out: f32,
    },
    /// Mean absolute error over the HOLD window.
    Result { mae: f32 },
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready => f.write_str("READY"),
            Self::Pong => f.write_str("PONG"),
            Self::Ack => f.write_str("ACK"),
            Self::Nack(reason) => write!(f, "NACK({reason})"),
            Self::Echo(text) => f.write_str(text),
            Self::Telemetry { dist, sp, err, out } => {
                write!(f, "TEL;dist={dist:.2};sp={sp:.2};err={err:.2};out={out:.2}")
            }
            Self::Result { mae } => write!(f, "MAE={mae:.2}"),
        }
    }
}

impl From<Nack> for Reply {
    fn from(n: Nack) -> Self {
        Self::Nack(n)
    }
}
