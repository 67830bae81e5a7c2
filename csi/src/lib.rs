//! Decoder for the channel state information (CSI) reported by the
//! [Linux 802.11n CSI Tool](https://dhalperi.github.io/linux-80211n-csitool/)
//! firmware on Intel Wi-Fi Link 5300 NICs.
//!
//! Every beamforming feedback notification carries a small fixed header and
//! a bit-packed `Ntx × Nrx × 30` matrix of complex channel coefficients. The
//! decoder unpacks the matrix, undoes the receive-antenna permutation applied
//! by the firmware and scales the coefficients so that they carry units of
//! `sqrt(SNR)`.
//!
//! ```
//! let entry = csi::decode(&[0, 0, 0, 0]);
//!
//! assert!(!entry.is_correct());
//! assert_eq!(entry.error(), Some(&csi::Error::ZeroLength));
//! ```

use tracing::{debug, warn};

pub mod calib;
pub mod diag;
pub mod entry;
pub mod envelope;
pub mod header;
pub mod ieee80211;
pub mod log;
pub mod matrix;
pub mod perm;

#[cfg(test)]
mod testutil;

pub use entry::{decode_entry, Channel, CsiEntry, Options};

use diag::{DiagnosticSink, TracingSink};
use envelope::{Envelope, BUF_SIZE};

/// Structural decoding failures. Any of these clears the correctness flag
/// of the resulting [`CsiEntry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("got entry size=0")]
    ZeroLength,
    #[error("got entry size {0} > BUF_SIZE={}", BUF_SIZE)]
    Oversized(usize),
    #[error("wrong CSI matrix size: header says {declared} bytes, expected {expected}")]
    LengthMismatch { declared: usize, expected: usize },
    #[error("invalid antenna count (Nrx={nrx}, Ntx={ntx})")]
    InvalidAntennaCount { nrx: u8, ntx: u8 },
    #[error("not enough bytes: need {needed}, got {got}")]
    NotEnoughBytes { needed: usize, got: usize },
}

/// Decodes a single message as delivered by the netlink connector, using
/// the default [`Options`] and reporting anomalies through `tracing`.
pub fn decode(buf: &[u8]) -> CsiEntry {
    decode_with(buf, &Options::default(), &mut TracingSink)
}

/// Decodes a single netlink message.
///
/// Structural failures are never returned as `Err`; they are recorded in the
/// entry, which must be checked with [`CsiEntry::is_correct`] before use.
pub fn decode_with(buf: &[u8], opts: &Options, sink: &mut dyn DiagnosticSink) -> CsiEntry {
    let envelope = match Envelope::read(buf, opts.length_order) {
        Ok(envelope) => envelope,
        Err(err) => {
            warn!(%err, "dropping CSI message");
            return CsiEntry::failed(None, err);
        }
    };

    debug!(declared_len = envelope.declared_len, "new CSI message");

    decode_entry(&buf[envelope.payload_offset..], opts, sink)
}
