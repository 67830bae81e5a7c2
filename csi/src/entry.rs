//! Decoded CSI entries.

use std::fmt;

use ndarray::{Array1, Array3};
use num_complex::Complex;
use tracing::{debug, trace, warn};

use crate::{
    calib::{calibrate, Calibration},
    diag::{Anomaly, DiagnosticSink},
    envelope::LengthOrder,
    header::{CsiHeader, RateWidth},
    ieee80211::{channel_freq, subcarrier_freqs},
    matrix::{calc_len, unpack_csi},
    perm::{Permutation, Resolution},
    Error,
};

/// Wire format options. The defaults match messages read from the netlink
/// connector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
pub struct Options {
    /// Byte order of the length prefix.
    pub length_order: LengthOrder,
    /// Width of the header's trailing rate field.
    pub rate_width: RateWidth,
}

/// The channel matrix of a correctly decoded entry.
#[derive(Debug, Clone)]
pub struct Channel {
    /// CSI in `sqrt(SNR)` units, indexed `[tx, rx, subcarrier]`.
    pub csi: Array3<Complex<f64>>,
    /// Receive antenna permutation decoded from `antenna_sel`.
    pub perm: Permutation,
    /// Whether `perm` was applied to `csi`.
    pub resolution: Resolution,
    pub calibration: Calibration,
}

/// A decoded message.
///
/// `header` is present whenever the fixed header could be read, even if the
/// CSI matrix could not be decoded.
#[derive(Debug, Clone)]
pub struct CsiEntry {
    pub header: Option<CsiHeader>,
    pub channel: Result<Channel, Error>,
}

impl CsiEntry {
    pub(crate) fn failed(header: Option<CsiHeader>, err: Error) -> Self {
        Self {
            header,
            channel: Err(err),
        }
    }

    /// Whether the entry was decoded completely. Only then is
    /// [`CsiEntry::channel`] populated.
    pub fn is_correct(&self) -> bool {
        self.channel.is_ok()
    }

    /// Why the entry could not be decoded.
    pub fn error(&self) -> Option<&Error> {
        self.channel.as_ref().err()
    }

    /// Absolute frequency (Hz) of each subcarrier in the matrix, given the
    /// channel the NIC was tuned to. The bandwidth is taken from the rate
    /// flags, so headers read with [`RateWidth::Narrow`] are assumed to be
    /// 20 MHz.
    pub fn subcarrier_freqs(&self, channel: u8) -> Option<Array1<f64>> {
        let header = self.header.as_ref()?;
        Some(subcarrier_freqs(channel_freq(channel), header.bandwidth()))
    }
}

/// Decodes a beamforming notification, starting at its code byte.
///
/// This is what follows the length prefix in a netlink message, and what
/// each record of a capture log contains.
pub fn decode_entry(b: &[u8], opts: &Options, sink: &mut dyn DiagnosticSink) -> CsiEntry {
    let (header, data) = match CsiHeader::parse(b, opts.rate_width) {
        Ok(parsed) => parsed,
        Err(err) => {
            warn!(%err, "dropping CSI entry");
            return CsiEntry::failed(None, err);
        }
    };

    debug!(?header, "parsed CSI header");

    let channel = decode_channel(&header, data, sink);
    if let Err(err) = &channel {
        warn!(%err, bfee_count = header.bfee_count, "dropping CSI entry");
    }

    CsiEntry {
        header: Some(header),
        channel,
    }
}

fn decode_channel(
    header: &CsiHeader,
    data: &[u8],
    sink: &mut dyn DiagnosticSink,
) -> Result<Channel, Error> {
    let nrx = header.nrx as usize;
    let ntx = header.ntx as usize;

    if !(1..=3).contains(&nrx) || !(1..=3).contains(&ntx) {
        return Err(Error::InvalidAntennaCount {
            nrx: header.nrx,
            ntx: header.ntx,
        });
    }

    let expected = calc_len(nrx, ntx);
    if header.len as usize != expected {
        return Err(Error::LengthMismatch {
            declared: header.len as usize,
            expected,
        });
    }

    let raw = unpack_csi(data, nrx, ntx)?;

    let (perm, resolution) = Permutation::resolve(header.antenna_sel, nrx);
    trace!(?perm, ?resolution, "resolved antenna permutation");

    let csi = match resolution {
        Resolution::Applied => perm.apply(&raw),
        Resolution::NotNeeded => raw,
        Resolution::Invalid => {
            sink.report(Anomaly::InvalidPermutation {
                nrx: header.nrx,
                perm,
            });
            raw
        }
    };

    let (calibration, csi) = calibrate(header, &csi);
    trace!(?calibration, "calibrated CSI");

    Ok(Channel {
        csi,
        perm,
        resolution,
        calibration,
    })
}

impl fmt::Display for CsiEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "CSI entry:")?;
        writeln!(f, "\tcorrect: {}", self.is_correct())?;

        let (Some(header), Ok(channel)) = (&self.header, &self.channel) else {
            if let Some(err) = self.error() {
                writeln!(f, "\terror: {err}")?;
            }
            return Ok(());
        };

        let [rssi_a, rssi_b, rssi_c] = header.rssi_db();
        let cal = &channel.calibration;

        writeln!(f, "\tcode: {:#X}", header.code)?;
        writeln!(f, "\tbfee_count: {}", header.bfee_count)?;
        writeln!(f, "\tNtx: {}", header.ntx)?;
        writeln!(f, "\tNrx: {}", header.nrx)?;
        writeln!(f, "\trate: {:#x}", header.rate)?;
        writeln!(f, "\tMCS: {}", header.mcs())?;
        writeln!(f, "\trate flags: {:?}", header.rate_flags())?;
        writeln!(f, "\tbandwidth [MHz]: {}", header.bandwidth().mhz())?;
        writeln!(f, "\tRSSI A [dB]: {rssi_a}")?;
        writeln!(f, "\tRSSI B [dB]: {rssi_b}")?;
        writeln!(f, "\tRSSI C [dB]: {rssi_c}")?;
        writeln!(f, "\ttotal RSSI [dB]: {:.2}", cal.rssi_power_db)?;
        writeln!(f, "\tAGC: {}", header.agc)?;
        writeln!(f, "\tantenna sel: {:#08b}", header.antenna_sel)?;
        writeln!(f, "\tthermal noise [dB]: {}", cal.noise_db)?;
        writeln!(f, "\tquantization noise [dB]: {:.2}", cal.quant_error_db)?;
        writeln!(f, "\ttotal noise [dB]: {:.2}", cal.total_noise_db)?;
        writeln!(f, "\tpermutation: {:?} ({:?})", channel.perm.0, channel.resolution)?;
        writeln!(f, "\tCSI matrix shape: {:?}", channel.csi.shape())
    }
}
