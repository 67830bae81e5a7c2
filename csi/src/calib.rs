//! Conversion of raw CSI counts into `sqrt(SNR)` units.
//!
//! The firmware normalizes the CSI it reports, so the absolute channel gain
//! has to be recovered from the per-chain RSSI. The noise model combines the
//! thermal noise floor reported by the NIC with the quantization error of
//! the 8-bit samples.

use ndarray::Array3;
use num_complex::Complex;

use crate::{header::CsiHeader, matrix::SUBCARRIERS};

/// Noise floor value reported when the NIC did not measure it (e.g. in
/// monitor mode).
pub const NOISE_UNDEFINED: i8 = -127;

/// Noise floor (dBm) assumed when it was not measured.
pub const NOISE_FALLBACK_DB: f64 = -92.;

/// Calibration metrics derived for one CSI matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    /// Total power of the raw matrix, `Σ |h|²`.
    pub csi_power: f64,
    /// Total received signal strength (mW).
    pub rssi_power: f64,
    /// Total received signal strength (dBm).
    pub rssi_power_db: f64,
    /// Ratio between received power and mean per-subcarrier CSI power.
    pub scale: f64,
    /// Thermal noise floor (dBm).
    pub noise_db: f64,
    /// Quantization error power (dB).
    pub quant_error_db: f64,
    /// Thermal noise plus quantization error (dB).
    pub total_noise_db: f64,
}

fn db_to_linear(db: f64) -> f64 {
    10f64.powf(db / 10.)
}

fn linear_to_db(x: f64) -> f64 {
    10. * x.log10()
}

/// Total received signal strength in dBm over all active receive chains.
///
/// Chains reporting an RSSI of zero are inactive and left out of the sum.
///
/// ```
/// # use csi::calib::total_rss;
/// assert!((total_rss([40, 0, 0], 20) - (40. - 44. - 20.)).abs() < 1e-9);
/// ```
pub fn total_rss(rssi: [u8; 3], agc: u8) -> f64 {
    let mag: f64 = rssi
        .iter()
        .filter(|&&rssi| rssi != 0)
        .map(|&rssi| db_to_linear(rssi as f64))
        .sum();

    linear_to_db(mag) - 44. - agc as f64
}

/// Thermal noise floor in dBm, substituting [`NOISE_FALLBACK_DB`] for
/// [`NOISE_UNDEFINED`].
pub fn noise_db(noise: i8) -> f64 {
    if noise == NOISE_UNDEFINED {
        NOISE_FALLBACK_DB
    } else {
        noise as f64
    }
}

/// Gain correcting for the power split across `ntx` transmit streams.
///
/// For three streams this uses 4.5 dB rather than 10·log10(3) ≈ 4.77 dB,
/// which is how Intel approximates a factor of 3.
pub fn stream_gain(ntx: usize) -> f64 {
    match ntx {
        2 => 2f64.sqrt(),
        3 => db_to_linear(4.5).sqrt(),
        _ => 1.,
    }
}

/// Computes the calibration metrics for `csi` (indexed `[tx, rx, subcarrier]`)
/// and returns them along with a copy of the matrix in `sqrt(SNR)` units.
pub fn calibrate(
    header: &CsiHeader,
    csi: &Array3<Complex<f64>>,
) -> (Calibration, Array3<Complex<f64>>) {
    let (ntx, nrx, _) = csi.dim();

    let csi_power: f64 = csi.iter().map(|z| z.norm_sqr()).sum();
    let rssi_power_db = total_rss(header.rssi, header.agc);
    let rssi_power = db_to_linear(rssi_power_db);

    let scale = rssi_power / (csi_power / SUBCARRIERS as f64);

    let noise_db = noise_db(header.noise);
    let thermal_noise_power = db_to_linear(noise_db);

    // Each 8-bit entry is expected to be off by about one count, i.e. a
    // power of 1 per entry at the given scale. Only one subcarrier's worth,
    // matching the one subcarrier's worth of signal in `scale`.
    let quant_error_power = scale * (nrx * ntx) as f64;
    let total_noise_power = thermal_noise_power + quant_error_power;

    let snr_gain = (scale / total_noise_power).sqrt();
    let stream_gain = stream_gain(ntx);
    let scaled = csi.mapv(|z| z * snr_gain * stream_gain);

    let calibration = Calibration {
        csi_power,
        rssi_power,
        rssi_power_db,
        scale,
        noise_db,
        quant_error_db: linear_to_db(quant_error_power),
        total_noise_db: linear_to_db(total_noise_power),
    };

    (calibration, scaled)
}
