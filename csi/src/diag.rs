//! Reporting of non-fatal anomalies found while decoding.
//!
//! Anomalies do not invalidate an entry, so they are handed to a
//! [`DiagnosticSink`] supplied by the caller instead of being returned.
//!
//! ```
//! # use csi::diag::{TracingSink, WarnOnce};
//! let mut sink = WarnOnce::new(TracingSink);
//! # let messages: Vec<Vec<u8>> = vec![];
//! for msg in messages {
//!     let entry = csi::decode_with(&msg, &Default::default(), &mut sink);
//! }
//! ```

use std::{fmt, mem::Discriminant};

use tracing::warn;

use crate::perm::Permutation;

/// A recoverable oddity in an otherwise valid entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Anomaly {
    /// `antenna_sel` does not describe a permutation of the receive antennas;
    /// the matrix was left in firmware order.
    InvalidPermutation { nrx: u8, perm: Permutation },
}

impl fmt::Display for Anomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Anomaly::InvalidPermutation { nrx, perm } => {
                write!(f, "found CSI with Nrx={nrx} and invalid perm {:?}", perm.0)
            }
        }
    }
}

/// Receives anomalies found while decoding.
pub trait DiagnosticSink {
    fn report(&mut self, anomaly: Anomaly);
}

/// Discards all anomalies.
impl DiagnosticSink for () {
    fn report(&mut self, _: Anomaly) {}
}

/// Collects anomalies.
impl DiagnosticSink for Vec<Anomaly> {
    fn report(&mut self, anomaly: Anomaly) {
        self.push(anomaly);
    }
}

/// Logs every anomaly as a warning.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&mut self, anomaly: Anomaly) {
        warn!(%anomaly, "CSI anomaly");
    }
}

/// Forwards only the first anomaly of each kind to the inner sink.
#[derive(Debug, Clone)]
pub struct WarnOnce<S> {
    inner: S,
    seen: Vec<Discriminant<Anomaly>>,
}

impl<S> WarnOnce<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            seen: vec![],
        }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: DiagnosticSink> DiagnosticSink for WarnOnce<S> {
    fn report(&mut self, anomaly: Anomaly) {
        let kind = std::mem::discriminant(&anomaly);
        if self.seen.contains(&kind) {
            return;
        }

        self.seen.push(kind);
        self.inner.report(anomaly);
    }
}

#[cfg(test)]
mod tests {
    use super::{Anomaly, DiagnosticSink, WarnOnce};
    use crate::perm::Permutation;

    #[test]
    fn warn_once() {
        let mut sink = WarnOnce::new(Vec::<Anomaly>::new());

        for sel in 0..3 {
            sink.report(Anomaly::InvalidPermutation {
                nrx: 3,
                perm: Permutation::from_antenna_sel(sel),
            });
        }

        assert_eq!(
            sink.into_inner(),
            vec![Anomaly::InvalidPermutation {
                nrx: 3,
                perm: Permutation([1, 1, 1]),
            }]
        );
    }

    #[test]
    fn display() {
        let anomaly = Anomaly::InvalidPermutation {
            nrx: 2,
            perm: Permutation([1, 1, 3]),
        };

        assert_eq!(
            anomaly.to_string(),
            "found CSI with Nrx=2 and invalid perm [1, 1, 3]"
        );
    }
}
