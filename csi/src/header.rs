//! The fixed header of a beamforming feedback notification.
//!
//! The payload of each message starts with a one-byte notification code,
//! followed by the driver's notification struct (little endian):
//!
//! ```c
//! struct iwl_bfee_notif {
//!     uint32 timestamp_low;
//!     uint16 bfee_count;
//!     uint16 reserved1;
//!     uint8 Nrx, Ntx;
//!     uint8 rssiA, rssiB, rssiC;
//!     int8 noise;
//!     uint8 agc, antenna_sel;
//!     uint16 len;
//!     uint16 fake_rate_n_flags;
//!     uint8 payload[0];
//! } __attribute__((packed));
//! ```
//!
//! Some user space tools only read the low byte of `fake_rate_n_flags` and
//! start the CSI payload right after it. See [`RateWidth`].

use crate::{ieee80211::Bandwidth, matrix::calc_len, Error};

/// Notification code of a beamforming feedback (CSI) message.
pub const BFEE_NOTIF: u8 = 0xBB;

/// Width of the trailing `fake_rate_n_flags` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
pub enum RateWidth {
    /// One byte (MCS index only); the header spans 20 bytes including the code.
    #[default]
    Narrow,
    /// Two bytes; the header spans 21 bytes including the code.
    Wide,
}

impl RateWidth {
    /// Length of the header, including the code byte.
    pub const fn header_len(self) -> usize {
        match self {
            RateWidth::Narrow => 20,
            RateWidth::Wide => 21,
        }
    }
}

bitflags::bitflags! {
    /// Flags in the upper byte of `rate_n_flags`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RateFlags: u16 {
        /// High throughput (802.11n) rate.
        const HT = 0x0100;
        /// CCK (802.11b) rate.
        const CCK = 0x0200;
        /// Green-field preamble.
        const GREEN_FIELD = 0x0400;
        /// 40 MHz channel width.
        const HT40 = 0x0800;
        /// Duplicate data on both 20 MHz halves of a 40 MHz channel.
        const DUP = 0x1000;
        /// Short guard interval.
        const SGI = 0x2000;
        /// Transmitted on antenna A.
        const ANT_A = 0x4000;
        /// Transmitted on antenna B.
        const ANT_B = 0x8000;
    }
}

/// Parsed beamforming notification header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsiHeader {
    /// Notification code, [`BFEE_NOTIF`] for CSI.
    pub code: u8,
    /// Low 32 bits of the NIC's 1 MHz clock.
    pub timestamp_low: u32,
    /// Number of beamforming notifications recorded by the driver.
    pub bfee_count: u16,
    pub reserved: u16,
    /// Number of receive antennas.
    pub nrx: u8,
    /// Number of transmit streams.
    pub ntx: u8,
    /// RSSI of receive chains A, B and C. Zero means the chain is inactive.
    pub rssi: [u8; 3],
    /// Thermal noise floor (dBm), `-127` if unknown.
    pub noise: i8,
    /// Automatic gain control setting (dB).
    pub agc: u8,
    /// Packed receive antenna permutation. See [`crate::perm::Permutation`].
    pub antenna_sel: u8,
    /// Length of the CSI payload in bytes.
    pub len: u16,
    /// `rate_n_flags`, zero-extended when only the low byte was read.
    pub rate: u16,
}

impl CsiHeader {
    /// Creates a header for a CSI matrix with `nrx` receive antennas and `ntx`
    /// transmit streams, with `len` set to match and an identity permutation.
    pub fn new(nrx: u8, ntx: u8) -> Self {
        Self {
            code: BFEE_NOTIF,
            timestamp_low: 0,
            bfee_count: 0,
            reserved: 0,
            nrx,
            ntx,
            rssi: [0; 3],
            noise: -127,
            agc: 0,
            antenna_sel: 0b10_01_00,
            len: calc_len(nrx as usize, ntx as usize) as u16,
            rate: 0,
        }
    }

    /// Parses the header at the start of `b` (starting at the code byte) and
    /// returns it together with the remaining bytes.
    pub fn parse(b: &[u8], width: RateWidth) -> Result<(Self, &[u8]), Error> {
        let header_len = width.header_len();
        if b.len() < header_len {
            return Err(Error::NotEnoughBytes {
                needed: header_len,
                got: b.len(),
            });
        }

        let rate = match width {
            RateWidth::Narrow => b[19] as u16,
            RateWidth::Wide => u16::from_le_bytes([b[19], b[20]]),
        };

        let header = Self {
            code: b[0],
            timestamp_low: u32::from_le_bytes([b[1], b[2], b[3], b[4]]),
            bfee_count: u16::from_le_bytes([b[5], b[6]]),
            reserved: u16::from_le_bytes([b[7], b[8]]),
            nrx: b[9],
            ntx: b[10],
            rssi: [b[11], b[12], b[13]],
            noise: b[14] as i8,
            agc: b[15],
            antenna_sel: b[16],
            len: u16::from_le_bytes([b[17], b[18]]),
            rate,
        };

        Ok((header, &b[header_len..]))
    }

    /// Serializes the header, starting with the code byte. The inverse of
    /// [`CsiHeader::parse`]; with [`RateWidth::Narrow`] only the low byte of
    /// `rate` is written.
    pub fn to_bytes(&self, width: RateWidth) -> Vec<u8> {
        let mut out = Vec::with_capacity(width.header_len());

        out.push(self.code);
        out.extend_from_slice(&self.timestamp_low.to_le_bytes());
        out.extend_from_slice(&self.bfee_count.to_le_bytes());
        out.extend_from_slice(&self.reserved.to_le_bytes());
        out.extend_from_slice(&[self.nrx, self.ntx]);
        out.extend_from_slice(&self.rssi);
        out.extend_from_slice(&[self.noise as u8, self.agc, self.antenna_sel]);
        out.extend_from_slice(&self.len.to_le_bytes());
        match width {
            RateWidth::Narrow => out.push(self.rate as u8),
            RateWidth::Wide => out.extend_from_slice(&self.rate.to_le_bytes()),
        }

        out
    }

    /// Whether this is a beamforming feedback notification.
    pub const fn is_bfee(&self) -> bool {
        self.code == BFEE_NOTIF
    }

    /// Per-chain RSSI in dBm: `rssi - 44 - agc`.
    pub fn rssi_db(&self) -> [i16; 3] {
        self.rssi.map(|rssi| rssi as i16 - 44 - self.agc as i16)
    }

    /// MCS index.
    pub const fn mcs(&self) -> u8 {
        (self.rate & 0xff) as u8
    }

    /// Rate flags. Always empty for headers parsed with [`RateWidth::Narrow`].
    pub const fn rate_flags(&self) -> RateFlags {
        RateFlags::from_bits_truncate(self.rate)
    }

    /// Channel bandwidth the frame was received on.
    pub fn bandwidth(&self) -> Bandwidth {
        if self.rate_flags().contains(RateFlags::HT40) {
            Bandwidth::Bw40
        } else {
            Bandwidth::Bw20
        }
    }
}
