//! Capture logs, as written by the CSI tool's `log_to_file` utility.
//!
//! A log is a sequence of records, each a big endian `u16` length followed by
//! that many bytes. Every record starts with a notification code; records
//! with code [`BFEE_NOTIF`](crate::header::BFEE_NOTIF) hold CSI and can be
//! passed to [`decode_entry`](crate::decode_entry).
//!
//! This module only knows the framing rules. Reading is left to the caller,
//! which feeds the length prefix to [`record_len`] and then checks what it
//! got with [`check_record`].

use crate::{envelope::check_len, Error};

/// Size of the length prefix in front of every record.
pub const PREFIX_LEN: usize = 2;

/// Returns the length of the record following `prefix`.
///
/// ```
/// # use csi::{log::record_len, Error};
/// assert_eq!(record_len([0x00, 0xd5]), Ok(213));
/// assert_eq!(record_len([0x00, 0x00]), Err(Error::ZeroLength));
/// assert_eq!(record_len([0x10, 0x01]), Err(Error::Oversized(4097)));
/// ```
pub fn record_len(prefix: [u8; PREFIX_LEN]) -> Result<usize, Error> {
    check_len(u16::from_be_bytes(prefix))
}

/// Fails if a read of `needed` bytes came up short at `got` bytes.
pub fn check_record(needed: usize, got: usize) -> Result<(), Error> {
    if got < needed {
        return Err(Error::NotEnoughBytes { needed, got });
    }

    Ok(())
}
