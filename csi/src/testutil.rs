//! Builders for synthetic messages.

use ndarray::Array3;
use num_complex::Complex;

use crate::{
    envelope::LengthOrder,
    header::CsiHeader,
    matrix::{pack_csi, SUBCARRIERS},
    Options,
};

/// A packed `nrx × ntx` payload with no two neighbouring samples equal.
pub(crate) fn raw_matrix(nrx: u8, ntx: u8) -> Vec<u8> {
    let raw = Array3::from_shape_fn(
        (ntx as usize, nrx as usize, SUBCARRIERS),
        |(tx, rx, sc)| {
            let re = (sc as i8 - 15) * 4 + tx as i8;
            let im = 60 - (sc as i8) * 3 - rx as i8 * 7;
            Complex::new(re, im)
        },
    );

    pack_csi(&raw)
}

/// A netlink message with a little endian length and narrow header.
pub(crate) fn message(header: &CsiHeader, payload: &[u8]) -> Vec<u8> {
    message_with(header, payload, &Options::default())
}

pub(crate) fn message_with(header: &CsiHeader, payload: &[u8], opts: &Options) -> Vec<u8> {
    let mut entry = header.to_bytes(opts.rate_width);
    entry.extend_from_slice(payload);

    let len = entry.len() as u16;
    let prefix = match opts.length_order {
        LengthOrder::Little | LengthOrder::Detect => len.to_le_bytes(),
        LengthOrder::Big => len.to_be_bytes(),
    };

    let mut b = prefix.to_vec();
    b.extend_from_slice(&[0, 0]);
    b.extend(entry);
    b
}
