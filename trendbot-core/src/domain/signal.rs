//! Signal — discrete trading decision emitted per bar.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Position side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Long,
    Short,
    Flat,
}

impl Side {
    /// The side an entry signal of this kind would open, if any.
    pub fn opposite(self) -> Side {
        match self {
            Side::Long => Side::Short,
            Side::Short => Side::Long,
            Side::Flat => Side::Flat,
        }
    }
}

/// What kind of action a signal requests.
///
/// The generator only ever emits Enter/Exit/Hold — it is stateless and cannot
/// see the position. Add signals are synthesized by the position manager on
/// mark-to-market ticks when the pyramid conditions hold, and flow through
/// the same exhaustive dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalKind {
    EnterLong,
    EnterShort,
    AddLong,
    AddShort,
    ExitLong,
    ExitShort,
    Hold,
}

/// A trading signal: kind + triggering bar timestamp + trigger price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub kind: SignalKind,
    pub timestamp: DateTime<Utc>,
    pub price: f64,
}

impl Signal {
    pub fn new(kind: SignalKind, timestamp: DateTime<Utc>, price: f64) -> Self {
        Self {
            kind,
            timestamp,
            price,
        }
    }

    pub fn hold(timestamp: DateTime<Utc>, price: f64) -> Self {
        Self::new(SignalKind::Hold, timestamp, price)
    }

    pub fn is_hold(&self) -> bool {
        self.kind == SignalKind::Hold
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn side_opposite() {
        assert_eq!(Side::Long.opposite(), Side::Short);
        assert_eq!(Side::Short.opposite(), Side::Long);
        assert_eq!(Side::Flat.opposite(), Side::Flat);
    }

    #[test]
    fn hold_constructor() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let sig = Signal::hold(ts, 100.0);
        assert!(sig.is_hold());
        assert_eq!(sig.price, 100.0);
    }

    #[test]
    fn signal_serialization_roundtrip() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let sig = Signal::new(SignalKind::EnterLong, ts, 101.5);
        let json = serde_json::to_string(&sig).unwrap();
        let deser: Signal = serde_json::from_str(&json).unwrap();
        assert_eq!(sig, deser);
    }
}
