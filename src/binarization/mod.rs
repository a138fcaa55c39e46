//! Binarizations: integer ⇄ bit-string mappings (spec §4.4), wired either
//! to CABAC bypass bins or to adaptive, context-selected bins.
//!
//! Ported from the source's `Writer`/`Reader`: six `BinarizationId`
//! variants, each with a bypass and an adaptive ("cabac") encode/decode
//! pair. `Writer`/`Reader` own the arithmetic coder and the full context
//! bank for one sub-stream's entropy-coding pass.

use crate::cabac::{BinaryArithmeticDecoder, BinaryArithmeticEncoder, ContextBank};
use crate::error::{GabacError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinarizationId {
    Bi,
    Tu,
    Eg,
    Seg,
    Teg,
    Steg,
}

impl BinarizationId {
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            0 => Some(BinarizationId::Bi),
            1 => Some(BinarizationId::Tu),
            2 => Some(BinarizationId::Eg),
            3 => Some(BinarizationId::Seg),
            4 => Some(BinarizationId::Teg),
            5 => Some(BinarizationId::Steg),
            _ => None,
        }
    }

    pub fn to_id(self) -> u8 {
        match self {
            BinarizationId::Bi => 0,
            BinarizationId::Tu => 1,
            BinarizationId::Eg => 2,
            BinarizationId::Seg => 3,
            BinarizationId::Teg => 4,
            BinarizationId::Steg => 5,
        }
    }

    pub fn is_signed(self) -> bool {
        matches!(self, BinarizationId::Seg | BinarizationId::Steg)
    }

    /// Number of parameters this binarization takes (0 or 1).
    pub fn param_count(self) -> usize {
        match self {
            BinarizationId::Bi | BinarizationId::Tu | BinarizationId::Teg | BinarizationId::Steg => 1,
            BinarizationId::Eg | BinarizationId::Seg => 0,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            BinarizationId::Bi => "BI",
            BinarizationId::Tu => "TU",
            BinarizationId::Eg => "EG",
            BinarizationId::Seg => "SEG",
            BinarizationId::Teg => "TEG",
            BinarizationId::Steg => "STEG",
        }
    }

    /// Validity bound check for value `v` under parameter `p` (spec §4.4).
    pub fn in_bounds(self, v: i64, p: Option<u32>) -> bool {
        match self {
            BinarizationId::Bi => {
                let p = p.unwrap_or(0) as u32;
                (1..=32).contains(&p) && v >= 0 && (v as u64) < (1u64 << p)
            }
            BinarizationId::Tu => {
                let p = p.unwrap_or(0) as u64;
                p <= 32 && v >= 0 && (v as u64) <= p
            }
            BinarizationId::Eg => v >= 0 && (v as u64) <= u32::MAX as u64,
            BinarizationId::Seg => (-(1i64 << 16)..(1i64 << 16)).contains(&v),
            BinarizationId::Teg => {
                let p = p.unwrap_or(0) as u32;
                v >= 0 && (v as u64) <= (1u64 << (32 - p / 2)) - 1
            }
            BinarizationId::Steg => {
                let p = p.unwrap_or(0) as u32;
                let bound = (1i64 << (16 - p / 2)) - 1;
                v.unsigned_abs() as i64 <= bound
            }
        }
    }
}

fn bit_length(mut value: u64) -> u32 {
    let mut num_bits = 0u32;
    if value > 0x7FFF {
        value >>= 16;
        num_bits += 16;
    }
    if value > 0x7F {
        value >>= 8;
        num_bits += 8;
    }
    if value > 0x7 {
        value >>= 4;
        num_bits += 4;
    }
    if value > 0x1 {
        value >>= 2;
        num_bits += 2;
    }
    if value > 0x0 {
        num_bits += 1;
    }
    num_bits
}

fn check(id: BinarizationId, v: i64, p: Option<u32>) -> Result<()> {
    if id.in_bounds(v, p) {
        Ok(())
    } else {
        Err(GabacError::OutOfRange {
            value: v as u64,
            binarization: id.name(),
            param: p,
            reason: "value exceeds the binarization's representable range".into(),
        })
    }
}

/// Writes a stream of symbols through the arithmetic coder using one
/// binarization, either in bypass mode or with adaptive context selection.
pub struct Writer {
    enc: BinaryArithmeticEncoder,
    ctx: ContextBank,
}

impl Writer {
    pub fn new() -> Self {
        Writer { enc: BinaryArithmeticEncoder::new(), ctx: ContextBank::new() }
    }

    pub fn start(&mut self, num_symbols: u32) {
        self.write_as_bi_bypass(num_symbols as u64, 32);
    }

    pub fn finish(self) -> Vec<u8> {
        self.enc.finish()
    }

    pub fn write_bypass_value(&mut self, symbol: u64, id: BinarizationId, params: &[u32]) -> Result<()> {
        let p = params.first().copied();
        match id {
            BinarizationId::Bi => {
                check(id, symbol as i64, p)?;
                self.write_as_bi_bypass(symbol, p.unwrap());
            }
            BinarizationId::Tu => {
                check(id, symbol as i64, p)?;
                self.write_as_tu_bypass(symbol, p.unwrap());
            }
            BinarizationId::Eg => {
                check(id, symbol as i64, None)?;
                self.write_as_eg_bypass(symbol);
            }
            BinarizationId::Seg => {
                let v = symbol as i64;
                check(id, v, None)?;
                self.write_as_seg_bypass(v);
            }
            BinarizationId::Teg => {
                check(id, symbol as i64, p)?;
                self.write_as_teg_bypass(symbol, p.unwrap());
            }
            BinarizationId::Steg => {
                let v = symbol as i64;
                check(id, v, p)?;
                self.write_as_steg_bypass(v, p.unwrap());
            }
        }
        Ok(())
    }

    pub fn write_cabac_adaptive_value(
        &mut self,
        symbol: u64,
        id: BinarizationId,
        params: &[u32],
        prev: u32,
        prev_prev: u32,
    ) -> Result<()> {
        let p = params.first().copied();
        let offset = ((prev.min(3)) << 2) as usize + prev_prev.min(3) as usize;
        match id {
            BinarizationId::Bi => {
                check(id, symbol as i64, p)?;
                self.write_as_bi_cabac(symbol, p.unwrap(), offset);
            }
            BinarizationId::Tu => {
                check(id, symbol as i64, p)?;
                self.write_as_tu_cabac(symbol, p.unwrap(), offset);
            }
            BinarizationId::Eg => {
                check(id, symbol as i64, None)?;
                self.write_as_eg_cabac(symbol, offset);
            }
            BinarizationId::Seg => {
                let v = symbol as i64;
                check(id, v, None)?;
                self.write_as_seg_cabac(v, offset);
            }
            BinarizationId::Teg => {
                check(id, symbol as i64, p)?;
                self.write_as_teg_cabac(symbol, p.unwrap(), offset);
            }
            BinarizationId::Steg => {
                let v = symbol as i64;
                check(id, v, p)?;
                self.write_as_steg_cabac(v, p.unwrap(), offset);
            }
        }
        Ok(())
    }

    fn write_as_bi_bypass(&mut self, input: u64, c_length: u32) {
        self.enc.encode_bins_ep(input as u32, c_length);
    }

    fn write_as_bi_cabac(&mut self, input: u64, c_length: u32, offset: usize) {
        for i in 0..c_length {
            let bin = ((input >> (c_length - i - 1)) & 1) as u32;
            let ctx = self.ctx.bi(offset, i as usize);
            self.enc.encode_bin(bin, ctx);
        }
    }

    fn write_as_tu_bypass(&mut self, input: u64, c_max: u32) {
        for _ in 0..input {
            self.enc.encode_bin_ep(1);
        }
        if input != c_max as u64 {
            self.enc.encode_bin_ep(0);
        }
    }

    fn write_as_tu_cabac(&mut self, input: u64, c_max: u32, offset: usize) {
        for i in 0..input {
            let ctx = self.ctx.tu(offset, i as usize);
            self.enc.encode_bin(1, ctx);
        }
        if input != c_max as u64 {
            let ctx = self.ctx.tu(offset, input as usize);
            self.enc.encode_bin(0, ctx);
        }
    }

    fn write_as_eg_bypass(&mut self, input: u64) {
        let input = input + 1;
        let length = ((bit_length(input) - 1) << 1) + 1;
        self.enc.encode_bins_ep(input as u32, length);
    }

    fn write_as_eg_cabac(&mut self, input: u64, offset: usize) {
        let input = input + 1;
        let length = ((bit_length(input) - 1) << 1) + 1;
        let suffix_size_minus_1 = length >> 1;

        let mut i = 0u32;
        while i < suffix_size_minus_1 {
            let ctx = self.ctx.eg(offset, i as usize);
            self.enc.encode_bin(0, ctx);
            i += 1;
        }
        if i < length {
            let ctx = self.ctx.eg(offset, i as usize);
            self.enc.encode_bin(1, ctx);
            let remaining = length - (i + 1);
            if remaining != 0 {
                let input = input - (1u64 << remaining);
                self.enc.encode_bins_ep(input as u32, remaining);
            }
        }
    }

    fn write_as_seg_bypass(&mut self, input: i64) {
        if input <= 0 {
            self.write_as_eg_bypass(((-input) as u64) << 1);
        } else {
            self.write_as_eg_bypass(((input as u64) << 1) - 1);
        }
    }

    fn write_as_seg_cabac(&mut self, input: i64, offset: usize) {
        if input <= 0 {
            self.write_as_eg_cabac(((-input) as u64) << 1, offset);
        } else {
            self.write_as_eg_cabac(((input as u64) << 1) - 1, offset);
        }
    }

    fn write_as_teg_bypass(&mut self, input: u64, threshold: u32) {
        if input < threshold as u64 {
            self.write_as_tu_bypass(input, threshold);
        } else {
            self.write_as_tu_bypass(threshold as u64, threshold);
            self.write_as_eg_bypass(input - threshold as u64);
        }
    }

    fn write_as_teg_cabac(&mut self, input: u64, threshold: u32, offset: usize) {
        if input < threshold as u64 {
            self.write_as_tu_cabac(input, threshold, offset);
        } else {
            self.write_as_tu_cabac(threshold as u64, threshold, offset);
            self.write_as_eg_cabac(input - threshold as u64, offset);
        }
    }

    fn write_as_steg_bypass(&mut self, input: i64, threshold: u32) {
        match input.cmp(&0) {
            std::cmp::Ordering::Less => {
                self.write_as_teg_bypass((-input) as u64, threshold);
                self.write_as_bi_bypass(1, 1);
            }
            std::cmp::Ordering::Greater => {
                self.write_as_teg_bypass(input as u64, threshold);
                self.write_as_bi_bypass(0, 1);
            }
            std::cmp::Ordering::Equal => {
                self.write_as_teg_bypass(0, threshold);
            }
        }
    }

    fn write_as_steg_cabac(&mut self, input: i64, threshold: u32, offset: usize) {
        match input.cmp(&0) {
            std::cmp::Ordering::Less => {
                self.write_as_teg_cabac((-input) as u64, threshold, offset);
                self.write_as_bi_cabac(1, 1, offset);
            }
            std::cmp::Ordering::Greater => {
                self.write_as_teg_cabac(input as u64, threshold, offset);
                self.write_as_bi_cabac(0, 1, offset);
            }
            std::cmp::Ordering::Equal => {
                self.write_as_teg_cabac(0, threshold, offset);
            }
        }
    }
}

impl Default for Writer {
    fn default() -> Self {
        Self::new()
    }
}

/// Dual of [`Writer`].
pub struct Reader<'a> {
    dec: BinaryArithmeticDecoder<'a>,
    ctx: ContextBank,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Result<Self> {
        Ok(Reader { dec: BinaryArithmeticDecoder::new(data)?, ctx: ContextBank::new() })
    }

    pub fn start(&mut self) -> Result<u32> {
        self.read_as_bi_bypass(32)
    }

    pub fn read_bypass_value(&mut self, id: BinarizationId, params: &[u32]) -> Result<u64> {
        let p = params.first().copied();
        Ok(match id {
            BinarizationId::Bi => self.read_as_bi_bypass(p.unwrap())? as u64,
            BinarizationId::Tu => self.read_as_tu_bypass(p.unwrap())?,
            BinarizationId::Eg => self.read_as_eg_bypass()?,
            BinarizationId::Seg => self.read_as_seg_bypass()? as u64,
            BinarizationId::Teg => self.read_as_teg_bypass(p.unwrap())?,
            BinarizationId::Steg => self.read_as_steg_bypass(p.unwrap())? as u64,
        })
    }

    pub fn read_adaptive_cabac_value(
        &mut self,
        id: BinarizationId,
        params: &[u32],
        prev: u32,
        prev_prev: u32,
    ) -> Result<u64> {
        let p = params.first().copied();
        let offset = ((prev.min(3)) << 2) as usize + prev_prev.min(3) as usize;
        Ok(match id {
            BinarizationId::Bi => self.read_as_bi_cabac(p.unwrap(), offset)? as u64,
            BinarizationId::Tu => self.read_as_tu_cabac(p.unwrap(), offset)?,
            BinarizationId::Eg => self.read_as_eg_cabac(offset)?,
            BinarizationId::Seg => self.read_as_seg_cabac(offset)? as u64,
            BinarizationId::Teg => self.read_as_teg_cabac(p.unwrap(), offset)?,
            BinarizationId::Steg => self.read_as_steg_cabac(p.unwrap(), offset)? as u64,
        })
    }

    fn read_as_bi_bypass(&mut self, c_length: u32) -> Result<u32> {
        self.dec.decode_bins_ep(c_length)
    }

    fn read_as_bi_cabac(&mut self, c_length: u32, offset: usize) -> Result<u32> {
        let mut bins = 0u32;
        for i in 0..c_length {
            let ctx = self.ctx.bi(offset, i as usize);
            bins = (bins << 1) | self.dec.decode_bin(ctx)?;
        }
        Ok(bins)
    }

    fn read_as_tu_bypass(&mut self, c_max: u32) -> Result<u64> {
        let mut i = 0u64;
        while self.read_as_bi_bypass(1)? == 1 {
            i += 1;
            if i == c_max as u64 {
                break;
            }
        }
        Ok(i)
    }

    fn read_as_tu_cabac(&mut self, c_max: u32, offset: usize) -> Result<u64> {
        let mut i = 0usize;
        loop {
            let ctx = self.ctx.tu(offset, i);
            if self.dec.decode_bin(ctx)? != 1 {
                break;
            }
            i += 1;
            if i == c_max as usize {
                break;
            }
        }
        Ok(i as u64)
    }

    fn read_as_eg_bypass(&mut self) -> Result<u64> {
        let mut i = 0u32;
        while self.read_as_bi_bypass(1)? == 0 {
            i += 1;
        }
        if i == 0 {
            return Ok(0);
        }
        let bins = (1u64 << i) | self.dec.decode_bins_ep(i)? as u64;
        Ok(bins - 1)
    }

    fn read_as_eg_cabac(&mut self, offset: usize) -> Result<u64> {
        let mut i = 0usize;
        loop {
            let ctx = self.ctx.eg(offset, i);
            if self.dec.decode_bin(ctx)? != 0 {
                break;
            }
            i += 1;
        }
        if i == 0 {
            return Ok(0);
        }
        let bins = (1u64 << i) | self.dec.decode_bins_ep(i as u32)? as u64;
        Ok(bins - 1)
    }

    fn read_as_seg_bypass(&mut self) -> Result<i64> {
        let tmp = self.read_as_eg_bypass()?;
        Ok(unmap_signed(tmp))
    }

    fn read_as_seg_cabac(&mut self, offset: usize) -> Result<i64> {
        let tmp = self.read_as_eg_cabac(offset)?;
        Ok(unmap_signed(tmp))
    }

    fn read_as_teg_bypass(&mut self, threshold: u32) -> Result<u64> {
        let mut value = self.read_as_tu_bypass(threshold)?;
        if value == threshold as u64 {
            value += self.read_as_eg_bypass()?;
        }
        Ok(value)
    }

    fn read_as_teg_cabac(&mut self, threshold: u32, offset: usize) -> Result<u64> {
        let mut value = self.read_as_tu_cabac(threshold, offset)?;
        if value == threshold as u64 {
            value += self.read_as_eg_cabac(offset)?;
        }
        Ok(value)
    }

    fn read_as_steg_bypass(&mut self, threshold: u32) -> Result<i64> {
        let value = self.read_as_teg_bypass(threshold)? as i64;
        if value != 0 && self.read_as_bi_bypass(1)? == 1 {
            Ok(-value)
        } else {
            Ok(value)
        }
    }

    fn read_as_steg_cabac(&mut self, threshold: u32, offset: usize) -> Result<i64> {
        let value = self.read_as_teg_cabac(threshold, offset)? as i64;
        if value != 0 && self.read_as_bi_cabac(1, offset)? == 1 {
            Ok(-value)
        } else {
            Ok(value)
        }
    }
}

fn unmap_signed(tmp: u64) -> i64 {
    if tmp & 1 == 0 {
        if tmp == 0 {
            0
        } else {
            -((tmp >> 1) as i64)
        }
    } else {
        ((tmp + 1) >> 1) as i64
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn roundtrip_bypass(id: BinarizationId, params: &[u32], values: &[i64]) {
        let mut w = Writer::new();
        for &v in values {
            w.write_bypass_value(v as u64, id, params).unwrap();
        }
        let bytes = w.finish();

        let mut r = Reader::new(&bytes).unwrap();
        for &v in values {
            let got = r.read_bypass_value(id, params).unwrap();
            if id.is_signed() {
                assert_eq!(got as i64, v);
            } else {
                assert_eq!(got, v as u64);
            }
        }
    }

    fn roundtrip_cabac(id: BinarizationId, params: &[u32], values: &[i64]) {
        let mut w = Writer::new();
        for &v in values {
            w.write_cabac_adaptive_value(v as u64, id, params, 0, 0).unwrap();
        }
        let bytes = w.finish();

        let mut r = Reader::new(&bytes).unwrap();
        for &v in values {
            let got = r.read_adaptive_cabac_value(id, params, 0, 0).unwrap();
            if id.is_signed() {
                assert_eq!(got as i64, v);
            } else {
                assert_eq!(got, v as u64);
            }
        }
    }

    #[test]
    fn bi_roundtrip() {
        roundtrip_bypass(BinarizationId::Bi, &[8], &[0, 1, 255, 127]);
        roundtrip_cabac(BinarizationId::Bi, &[8], &[0, 1, 255, 127]);
    }

    #[test]
    fn tu_roundtrip() {
        roundtrip_bypass(BinarizationId::Tu, &[10], &[0, 3, 10]);
        roundtrip_cabac(BinarizationId::Tu, &[10], &[0, 3, 10]);
    }

    #[test]
    fn eg_roundtrip() {
        roundtrip_bypass(BinarizationId::Eg, &[], &[0, 1, 2, 100, 1_000_000]);
        roundtrip_cabac(BinarizationId::Eg, &[], &[0, 1, 2, 100, 1_000_000]);
    }

    #[test]
    fn seg_roundtrip() {
        roundtrip_bypass(BinarizationId::Seg, &[], &[0, -1, 1, -500, 500]);
        roundtrip_cabac(BinarizationId::Seg, &[], &[0, -1, 1, -500, 500]);
    }

    #[test]
    fn teg_roundtrip() {
        roundtrip_bypass(BinarizationId::Teg, &[5], &[0, 3, 5, 100]);
        roundtrip_cabac(BinarizationId::Teg, &[5], &[0, 3, 5, 100]);
    }

    #[test]
    fn steg_roundtrip() {
        roundtrip_bypass(BinarizationId::Steg, &[5], &[0, -3, 3, -100, 100]);
        roundtrip_cabac(BinarizationId::Steg, &[5], &[0, -3, 3, -100, 100]);
    }

    #[test]
    fn bi_rejects_value_too_wide_for_param() {
        let mut w = Writer::new();
        let err = w.write_bypass_value(256, BinarizationId::Bi, &[8]).unwrap_err();
        assert!(matches!(err, GabacError::OutOfRange { .. }));
    }
}
