//! Bit-packed CSI matrix.
//!
//! For each of the 30 reported subcarriers the firmware writes 3 bits of
//! padding followed by one 16-bit complex sample per antenna pair: an 8-bit
//! signed real part, then an 8-bit signed imaginary part. Samples are packed
//! back to back, so all but every eighth subcarrier start mid-byte.
//! Within a subcarrier the transmit index varies fastest.

use ndarray::Array3;
use num_complex::Complex;

use crate::Error;

/// Number of subcarrier groups reported per matrix.
pub const SUBCARRIERS: usize = 30;

/// Padding bits in front of every subcarrier.
const SUBCARRIER_PAD_BITS: usize = 3;

/// Bits per complex sample.
const SAMPLE_BITS: usize = 16;

/// Expected length (bytes) of the packed CSI payload.
///
/// ```
/// # use csi::matrix::calc_len;
/// assert_eq!(calc_len(1, 1), 72);
/// assert_eq!(calc_len(3, 3), 552);
/// ```
pub const fn calc_len(nrx: usize, ntx: usize) -> usize {
    (SUBCARRIERS * (nrx * ntx * 8 * 2 + 3) + 7) / 8
}

/// Reads an 8-bit signed value starting at an arbitrary bit offset.
fn read_i8(b: &[u8], bit: usize) -> i8 {
    let idx = bit / 8;
    let r = bit % 8;

    let lo = (b[idx] as u16) >> r;
    let hi = (b[idx + 1] as u16) << (8 - r);

    (lo | hi) as u8 as i8
}

/// Writes an 8-bit value at an arbitrary bit offset. The target bits must be
/// zero.
fn write_i8(b: &mut [u8], bit: usize, value: i8) {
    let idx = bit / 8;
    let r = bit % 8;
    let value = value as u8 as u16;

    b[idx] |= (value << r) as u8;
    b[idx + 1] |= (value >> (8 - r)) as u8;
}

/// Unpacks a CSI matrix of raw firmware counts, indexed `[tx, rx, subcarrier]`.
///
/// `b` must hold at least [`calc_len`] bytes; anything past that is ignored.
pub fn unpack_csi(b: &[u8], nrx: usize, ntx: usize) -> Result<Array3<Complex<f64>>, Error> {
    let needed = calc_len(nrx, ntx);
    if b.len() < needed {
        return Err(Error::NotEnoughBytes {
            needed,
            got: b.len(),
        });
    }

    let mut csi = Array3::zeros((ntx, nrx, SUBCARRIERS));
    let mut index = 0;

    for sc in 0..SUBCARRIERS {
        index += SUBCARRIER_PAD_BITS;

        for pair in 0..nrx * ntx {
            let re = read_i8(b, index);
            let im = read_i8(b, index + 8);
            csi[[pair % ntx, pair / ntx, sc]] = Complex::new(re as f64, im as f64);
            index += SAMPLE_BITS;
        }
    }

    Ok(csi)
}

/// Packs a matrix of raw counts, indexed `[tx, rx, subcarrier]`, the way
/// the firmware does. The inverse of [`unpack_csi`].
///
/// # Panics
///
/// Panics if the matrix does not have exactly [`SUBCARRIERS`] subcarriers.
pub fn pack_csi(csi: &Array3<Complex<i8>>) -> Vec<u8> {
    let (ntx, nrx, nsub) = csi.dim();
    assert_eq!(nsub, SUBCARRIERS, "wrong number of subcarriers");

    let mut out = vec![0u8; calc_len(nrx, ntx)];
    let mut index = 0;

    for sc in 0..SUBCARRIERS {
        index += SUBCARRIER_PAD_BITS;

        for pair in 0..nrx * ntx {
            let z = csi[[pair % ntx, pair / ntx, sc]];
            write_i8(&mut out, index, z.re);
            write_i8(&mut out, index + 8, z.im);
            index += SAMPLE_BITS;
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use ndarray::Array3;
    use num_complex::Complex;

    use super::{calc_len, pack_csi, read_i8, unpack_csi, SUBCARRIERS};
    use crate::Error;

    #[test]
    fn calc_len_floors() {
        // 30 * (16 + 3) = 570 bits
        assert_eq!(calc_len(1, 1), 72);
        assert_eq!(calc_len(2, 1), 132);
        assert_eq!(calc_len(2, 2), 252);
        assert_eq!(calc_len(3, 2), 372);
    }

    #[test]
    fn read_across_byte_boundary() {
        // -1 at bit 3
        assert_eq!(read_i8(&[0b1111_1000, 0b0000_0111], 3), -1);
        // 0x5a at bit 0 (no shift)
        assert_eq!(read_i8(&[0x5a, 0xff], 0), 0x5a);
        // -128 at bit 7
        assert_eq!(read_i8(&[0x00, 0b1000_0000 >> 1], 7), -128);
    }

    #[test]
    fn first_sample() {
        // 3 padding bits, then re = 5, im = -3
        let mut b = vec![0u8; calc_len(1, 1)];
        b[0] = 5 << 3;
        b[1] = (-3i8 as u8) << 3;
        b[2] = (-3i8 as u8) >> 5;

        let csi = unpack_csi(&b, 1, 1).unwrap();
        assert_eq!(csi[[0, 0, 0]], Complex::new(5., -3.));
        assert_eq!(csi[[0, 0, 1]], Complex::new(0., 0.));
    }

    #[test]
    fn pack_then_unpack() {
        for (nrx, ntx) in [(3, 3), (2, 1), (1, 3)] {
            let raw = Array3::from_shape_fn((ntx, nrx, SUBCARRIERS), |(tx, rx, sc)| {
                let v = (tx * 97 + rx * 53 + sc * 11) as u8;
                Complex::new(v as i8, v.wrapping_mul(3).wrapping_add(128) as i8)
            });

            let packed = pack_csi(&raw);
            assert_eq!(packed.len(), calc_len(nrx, ntx));

            let unpacked = unpack_csi(&packed, nrx, ntx).unwrap();
            assert_eq!(unpacked, raw.mapv(|z| Complex::new(z.re as f64, z.im as f64)));
        }
    }

    #[test]
    fn antenna_order() {
        // second sample of a 2x2 matrix belongs to tx 1, rx 0
        let mut raw = Array3::zeros((2, 2, SUBCARRIERS));
        raw[[1, 0, 0]] = Complex::new(7i8, 0);
        raw[[0, 1, 0]] = Complex::new(0, 9i8);

        let packed = pack_csi(&raw);
        assert_eq!(read_i8(&packed, 3 + 16), 7);
        assert_eq!(read_i8(&packed, 3 + 32 + 8), 9);
    }

    #[test]
    fn short_payload() {
        assert_eq!(
            unpack_csi(&[0; 71], 1, 1),
            Err(Error::NotEnoughBytes {
                needed: 72,
                got: 71
            })
        );
    }
}
