//! The binary arithmetic coder itself (spec §4.2, §4.7).
//!
//! `low`/`range` track the active coding interval exactly as described in
//! the source design: `range` starts at 510 and is renormalized one bit at
//! a time, `low` accumulates output bits behind a single buffered byte that
//! absorbs carry propagation (the classic H.264 CABAC `testAndWriteOut`
//! scheme). The decoder is the dual: a `value` window of the same scale as
//! `range`, primed with the stream's leading bits and refilled one bit per
//! renormalization step. Carry propagation is purely an encoder-side
//! concern; once bytes are written they are a plain MSB-first bit sequence
//! to the decoder.

use crate::error::Result;
use crate::io::BitInputStream;

const INITIAL_RANGE: u32 = 510;

/// The CABAC range-coding loop. Not a general-purpose bit writer; see
/// `crate::io::BitOutputStream` for that.
pub struct BinaryArithmeticEncoder {
    low: u32,
    range: u32,
    bits_left: i32,
    buffered_byte: u8,
    num_buffered_bytes: u32,
    out: Vec<u8>,
}

impl BinaryArithmeticEncoder {
    pub fn new() -> Self {
        BinaryArithmeticEncoder {
            low: 0,
            range: INITIAL_RANGE,
            bits_left: 23,
            buffered_byte: 0xff,
            num_buffered_bytes: 0,
            out: Vec::new(),
        }
    }

    pub fn encode_bin(&mut self, bin: u32, ctx: &mut super::context_model::ContextModel) {
        let lps = ctx.range_lps(((self.range >> 6) & 3) as usize);
        self.range -= lps;
        if bin == ctx.mps() as u32 {
            ctx.update_mps();
        } else {
            self.low = self.low.wrapping_add(self.range);
            self.range = lps;
            ctx.update_lps();
        }
        self.renorm();
    }

    pub fn encode_bin_ep(&mut self, bin: u32) {
        self.low = self.low.wrapping_shl(1);
        if bin != 0 {
            self.low = self.low.wrapping_add(self.range);
        }
        self.bits_left -= 1;
        if self.bits_left < 12 {
            self.write_out();
        }
    }

    pub fn encode_bins_ep(&mut self, value: u32, n_bits: u32) {
        debug_assert!(n_bits <= 32);
        for i in (0..n_bits).rev() {
            self.encode_bin_ep((value >> i) & 1);
        }
    }

    /// Termination bin: a fixed, context-free LPS range of 2.
    pub fn encode_bin_trm(&mut self, bin: u32) {
        self.range -= 2;
        if bin != 0 {
            self.low = self.low.wrapping_add(self.range);
            self.range = 2;
        }
        self.renorm();
    }

    fn renorm(&mut self) {
        while self.range < 256 {
            self.range <<= 1;
            self.low = self.low.wrapping_shl(1);
            self.bits_left -= 1;
            if self.bits_left < 12 {
                self.write_out();
            }
        }
    }

    fn write_out(&mut self) {
        let shift = (24 - self.bits_left) as u32;
        let lead_byte = self.low.wrapping_shr(shift);
        self.bits_left += 8;
        self.low &= 0xffff_ffffu32.wrapping_shr(self.bits_left as u32);
        if lead_byte == 0xff {
            self.num_buffered_bytes += 1;
        } else {
            let carry = lead_byte >> 8;
            if self.num_buffered_bytes > 0 {
                self.out.push(self.buffered_byte.wrapping_add(carry as u8));
                for _ in 1..self.num_buffered_bytes {
                    self.out.push((0xffu32.wrapping_add(carry) & 0xff) as u8);
                }
            }
            self.num_buffered_bytes = 1;
            self.buffered_byte = (lead_byte & 0xff) as u8;
        }
    }

    /// Flush the buffered-byte pipeline and any residual active bits,
    /// consuming the coder and returning the complete byte stream.
    pub fn finish(mut self) -> Vec<u8> {
        let overflow_shift = (32 - self.bits_left).max(0) as u32;
        if self.low.wrapping_shr(overflow_shift.min(31)) != 0 {
            self.out.push(self.buffered_byte.wrapping_add(1));
            for _ in 1..self.num_buffered_bytes {
                self.out.push(0x00);
            }
        } else {
            if self.num_buffered_bytes > 0 {
                self.out.push(self.buffered_byte);
            }
            for _ in 1..self.num_buffered_bytes {
                self.out.push(0xff);
            }
        }
        let tail_bits = (24 - self.bits_left).max(0) as u32;
        if tail_bits > 0 {
            let mut tail = crate::io::BitOutputStream::new();
            tail.write(self.low >> 8, tail_bits);
            self.out.extend(tail.into_bytes());
        }
        self.out
    }
}

impl Default for BinaryArithmeticEncoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Dual of [`BinaryArithmeticEncoder`] over an input byte slice.
pub struct BinaryArithmeticDecoder<'a> {
    bits: BitInputStream<'a>,
    value: u32,
    range: u32,
}

impl<'a> BinaryArithmeticDecoder<'a> {
    pub fn new(data: &'a [u8]) -> Result<Self> {
        let mut bits = BitInputStream::new(data);
        let value = bits.read(9)?;
        Ok(BinaryArithmeticDecoder { bits, value, range: INITIAL_RANGE })
    }

    pub fn decode_bin(&mut self, ctx: &mut super::context_model::ContextModel) -> Result<u32> {
        let mps = ctx.mps() as u32;
        let lps = ctx.range_lps(((self.range >> 6) & 3) as usize);
        self.range -= lps;

        let bin = if self.value < self.range {
            ctx.update_mps();
            mps
        } else {
            self.value -= self.range;
            self.range = lps;
            ctx.update_lps();
            1 - mps
        };

        while self.range < 256 {
            self.range <<= 1;
            self.value = (self.value << 1) | self.bits.read(1)?;
        }
        Ok(bin)
    }

    pub fn decode_bin_ep(&mut self) -> Result<u32> {
        self.value = (self.value << 1) | self.bits.read(1)?;
        if self.value >= self.range {
            self.value -= self.range;
            Ok(1)
        } else {
            Ok(0)
        }
    }

    pub fn decode_bins_ep(&mut self, n_bits: u32) -> Result<u32> {
        debug_assert!(n_bits <= 32);
        let mut v = 0u32;
        for _ in 0..n_bits {
            v = (v << 1) | self.decode_bin_ep()?;
        }
        Ok(v)
    }

    /// Dual of [`BinaryArithmeticEncoder::encode_bin_trm`].
    pub fn decode_bin_trm(&mut self) -> Result<u32> {
        self.range -= 2;
        let bin = if self.value >= self.range {
            self.value -= self.range;
            self.range = 2;
            1
        } else {
            0
        };
        while self.range < 256 {
            self.range <<= 1;
            self.value = (self.value << 1) | self.bits.read(1)?;
        }
        Ok(bin)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::cabac::context_model::ContextModel;

    #[test]
    fn bypass_roundtrip() {
        let mut enc = BinaryArithmeticEncoder::new();
        let values: Vec<u32> = vec![0, 1, 1, 0, 1, 0, 0, 0, 1, 1, 1, 1, 0, 1];
        for &b in &values {
            enc.encode_bin_ep(b);
        }
        let bytes = enc.finish();

        let mut dec = BinaryArithmeticDecoder::new(&bytes).unwrap();
        for &b in &values {
            assert_eq!(dec.decode_bin_ep().unwrap(), b);
        }
    }

    #[test]
    fn bins_ep_batch_roundtrip() {
        let mut enc = BinaryArithmeticEncoder::new();
        enc.encode_bins_ep(0xDEAD_BEEF, 32);
        enc.encode_bins_ep(7, 3);
        let bytes = enc.finish();

        let mut dec = BinaryArithmeticDecoder::new(&bytes).unwrap();
        assert_eq!(dec.decode_bins_ep(32).unwrap(), 0xDEAD_BEEF);
        assert_eq!(dec.decode_bins_ep(3).unwrap(), 7);
    }

    #[test]
    fn adaptive_context_roundtrip_converges() {
        let mut enc = BinaryArithmeticEncoder::new();
        let mut ctx = ContextModel::default();
        let bits: Vec<u32> = (0..200).map(|i| if i % 5 == 0 { 1 } else { 0 }).collect();
        for &b in &bits {
            enc.encode_bin(b, &mut ctx);
        }
        let bytes = enc.finish();

        let mut dec = BinaryArithmeticDecoder::new(&bytes).unwrap();
        let mut dctx = ContextModel::default();
        for &b in &bits {
            assert_eq!(dec.decode_bin(&mut dctx).unwrap(), b);
        }
    }

    #[test]
    fn termination_bin_roundtrip() {
        let mut enc = BinaryArithmeticEncoder::new();
        enc.encode_bins_ep(42, 8);
        enc.encode_bin_trm(1);
        let bytes = enc.finish();

        let mut dec = BinaryArithmeticDecoder::new(&bytes).unwrap();
        assert_eq!(dec.decode_bins_ep(8).unwrap(), 42);
        assert_eq!(dec.decode_bin_trm().unwrap(), 1);
    }
}
