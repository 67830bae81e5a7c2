//! Framing of CSI messages as delivered by the netlink connector.
//!
//! The driver hands every beamforming notification to user space inside a
//! `cn_msg`. The part of it that reaches the decoder is laid out as follows:
//!
//! ```c
//! struct {
//!     uint16 len;    // length of data[]
//!     uint16 flags;  // unused, keeps data[] 4-byte aligned
//!     uint8 data[];  // code byte followed by struct iwl_bfee_notif
//! };
//! ```

use crate::Error;

/// Size of the driver's message buffer. No message can be longer than this.
pub const BUF_SIZE: usize = 4096;

/// The payload always starts after the length field and its padding,
/// regardless of the declared length.
const PAYLOAD_OFFSET: usize = 4;

/// Byte order of the length prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
pub enum LengthOrder {
    /// Little endian, as written by the netlink connector on x86 hosts.
    #[default]
    Little,
    /// Big endian (network order), as used by capture logs.
    Big,
    /// Little endian unless that gives an out-of-range length while big
    /// endian does not.
    Detect,
}

/// The length prefix of a netlink message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Envelope {
    /// Length of the payload as declared by the sender.
    pub declared_len: u16,
    /// Offset of the payload (the `code` byte) from the start of the buffer.
    pub payload_offset: usize,
}

impl Envelope {
    /// Reads and validates the length prefix of `buf`.
    ///
    /// ```
    /// # use csi::envelope::{Envelope, LengthOrder};
    /// let envelope = Envelope::read(&[0x00, 0x10, 0, 0], LengthOrder::Little).unwrap();
    /// assert_eq!(envelope.declared_len, 4096);
    /// assert_eq!(envelope.payload_offset, 4);
    /// ```
    pub fn read(buf: &[u8], order: LengthOrder) -> Result<Self, Error> {
        if buf.len() < PAYLOAD_OFFSET {
            return Err(Error::NotEnoughBytes {
                needed: PAYLOAD_OFFSET,
                got: buf.len(),
            });
        }

        let bytes = [buf[0], buf[1]];
        let declared_len = match order {
            LengthOrder::Little => u16::from_le_bytes(bytes),
            LengthOrder::Big => u16::from_be_bytes(bytes),
            LengthOrder::Detect => {
                // Some tools write the prefix in network order. If the
                // little endian reading is impossible, try big endian.
                let le = u16::from_le_bytes(bytes);
                let be = u16::from_be_bytes(bytes);
                match check_len(le) {
                    Err(_) if check_len(be).is_ok() => be,
                    _ => le,
                }
            }
        };

        check_len(declared_len)?;

        Ok(Self {
            declared_len,
            payload_offset: PAYLOAD_OFFSET,
        })
    }
}

/// Checks that a declared entry length is within `1..=BUF_SIZE`.
pub fn check_len(len: u16) -> Result<usize, Error> {
    match len as usize {
        0 => Err(Error::ZeroLength),
        len if len > BUF_SIZE => Err(Error::Oversized(len)),
        len => Ok(len),
    }
}

#[cfg(test)]
mod tests {
    use super::{check_len, Envelope, LengthOrder};
    use crate::Error;

    #[test]
    fn length_bounds() {
        assert_eq!(check_len(0), Err(Error::ZeroLength));
        assert_eq!(check_len(1), Ok(1));
        assert_eq!(check_len(4096), Ok(4096));
        assert_eq!(check_len(4097), Err(Error::Oversized(4097)));
    }

    #[test]
    fn byte_order() {
        let buf = [0x01, 0x02, 0xff, 0xff];

        let le = Envelope::read(&buf, LengthOrder::Little).unwrap();
        assert_eq!(le.declared_len, 0x0201);

        let be = Envelope::read(&buf, LengthOrder::Big).unwrap();
        assert_eq!(be.declared_len, 0x0102);
        assert_eq!(be.payload_offset, 4);
    }

    #[test]
    fn detect_falls_back_to_big_endian() {
        // 0x2000 is too long, 0x0020 is not
        let envelope = Envelope::read(&[0x00, 0x20, 0, 0], LengthOrder::Detect).unwrap();
        assert_eq!(envelope.declared_len, 0x20);

        // both readings valid: little endian wins
        let envelope = Envelope::read(&[0x01, 0x02, 0, 0], LengthOrder::Detect).unwrap();
        assert_eq!(envelope.declared_len, 0x0201);

        // both invalid: report the little endian reading
        assert_eq!(
            Envelope::read(&[0x00, 0x00, 0, 0], LengthOrder::Detect),
            Err(Error::ZeroLength)
        );
    }

    #[test]
    fn short_buffer() {
        assert_eq!(
            Envelope::read(&[0x10, 0x00], LengthOrder::Little),
            Err(Error::NotEnoughBytes { needed: 4, got: 2 })
        );
    }
}
