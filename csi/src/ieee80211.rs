//! IEEE 802.11n subcarrier layout of the reported CSI.
//!
//! The NIC reports CSI for 30 groups of subcarriers rather than every
//! subcarrier. In a 20 MHz channel the groups are two subcarriers apart, in a
//! 40 MHz channel four.
//!
//! References:
//! - IEEE 802.11n-2009, CSI matrices feedback with subcarrier grouping (Ng = 2 and 4)

use std::marker::PhantomData;

use ndarray::Array1;
use uom::si::{
    f64::Frequency,
    frequency::{hertz, megahertz},
};

use crate::matrix::SUBCARRIERS;

/// Bandwidth.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
pub enum Bandwidth {
    /// 20 MHz.
    Bw20,
    /// 40 MHz.
    Bw40,
}

impl Bandwidth {
    /// Returns the bandwidth in MHz.
    pub const fn mhz(&self) -> u8 {
        match self {
            Bandwidth::Bw20 => 20,
            Bandwidth::Bw40 => 40,
        }
    }

    /// The frequency in Hz.
    pub const fn freq(&self) -> Frequency {
        Frequency {
            dimension: PhantomData,
            units: PhantomData,
            value: match self {
                Bandwidth::Bw20 => 20e6,
                Bandwidth::Bw40 => 40e6,
            },
        }
    }
}

const GROUPS_20MHZ: [i8; SUBCARRIERS] = [
    -28, -26, -24, -22, -20, -18, -16, -14, -12, -10, -8, -6, -4, -2, -1, 1, 3, 5, 7, 9, 11, 13,
    15, 17, 19, 21, 23, 25, 27, 28,
];

const GROUPS_40MHZ: [i8; SUBCARRIERS] = [
    -58, -54, -50, -46, -42, -38, -34, -30, -26, -22, -18, -14, -10, -6, -2, 2, 6, 10, 14, 18, 22,
    26, 30, 34, 38, 42, 46, 50, 54, 58,
];

/// Returns the subcarrier index of each reported CSI group.
///
/// ```
/// # use csi::ieee80211::{subcarrier_indices, Bandwidth};
/// let indices = subcarrier_indices(Bandwidth::Bw20);
/// assert_eq!(indices.len(), 30);
/// assert!(!indices.contains(&0));
/// ```
pub const fn subcarrier_indices(bandwidth: Bandwidth) -> &'static [i8; SUBCARRIERS] {
    match bandwidth {
        Bandwidth::Bw20 => &GROUPS_20MHZ,
        Bandwidth::Bw40 => &GROUPS_40MHZ,
    }
}

/// OFDM subcarrier spacing (20 MHz / 64).
pub fn subcarrier_spacing() -> Frequency {
    Bandwidth::Bw20.freq() / 64.
}

/// Returns the offset (in Hz) of each reported subcarrier from the center
/// frequency.
///
/// ```
/// # use csi::ieee80211::{subcarrier_offsets, Bandwidth};
/// let offsets = subcarrier_offsets(Bandwidth::Bw40);
/// assert_eq!(offsets[0], -58. * 312.5e3);
/// assert_eq!(offsets[29], 58. * 312.5e3);
/// ```
pub fn subcarrier_offsets(bandwidth: Bandwidth) -> Array1<f64> {
    let spacing = subcarrier_spacing().get::<hertz>();

    subcarrier_indices(bandwidth)
        .iter()
        .map(|&i| i as f64 * spacing)
        .collect()
}

/// Returns the center frequency of a 2.4 or 5 GHz channel.
pub fn channel_freq(channel: u8) -> Frequency {
    let mhz = match channel {
        14 => 2484,
        1..=13 => 2407 + 5 * channel as u32,
        _ => 5000 + 5 * channel as u32,
    };

    Frequency::new::<megahertz>(mhz as f64)
}

/// Returns the absolute frequency (in Hz) of each reported subcarrier.
pub fn subcarrier_freqs(center: Frequency, bandwidth: Bandwidth) -> Array1<f64> {
    subcarrier_offsets(bandwidth) + center.get::<hertz>()
}
