//! Block encode/decode driver (spec §4.6): outer sequence transform, then
//! per-sub-stream LUT/diff/CABAC, framed as length-prefixed payloads.

use std::io::{Cursor, Write};

use crate::binarization::{BinarizationId, Reader, Writer};
use crate::cabac::ContextSelectionId;
use crate::config::{EncodingConfiguration, TransformedSequenceConfiguration};
use crate::error::{GabacError, Result};
use crate::io::{self, TypedStream};
use crate::transform::lut;

/// Encode `input` (a byte buffer interpreted at `config.word_size`) in
/// blocks of `blocksize` symbols (`0` means "one block for the whole
/// input").
pub fn encode(config: &EncodingConfiguration, input: &[u8], blocksize: usize) -> Result<Vec<u8>> {
    config.validate()?;
    let words = words_from_bytes(input, config.word_size);
    let mut out = Vec::new();
    let total = words.len();
    let step = if blocksize == 0 { total.max(1) } else { blocksize };

    let mut i = 0;
    while i < total {
        let end = (i + step).min(total);
        let block: Vec<u64> = (i..end).map(|j| words.get(j)).collect();
        log::debug!("encoding block of {} symbols", block.len());
        let payload = encode_block(config, &block)?;
        io::write_payload(&mut out, &payload)?;
        i = end;
    }

    Ok(out)
}

/// Decode the block stream produced by [`encode`] back into a byte buffer
/// at `config.word_size`.
pub fn decode(config: &EncodingConfiguration, input: &[u8]) -> Result<Vec<u8>> {
    config.validate()?;
    let mut cursor = Cursor::new(input);
    let mut words = TypedStream::new(config.word_size);

    while (cursor.position() as usize) < input.len() {
        let payload = io::read_payload(&mut cursor)?;
        let block = decode_block(config, &payload)?;
        log::debug!("decoded block of {} symbols", block.len());
        for v in block {
            words.push(v);
        }
    }

    Ok(words.into_bytes())
}

fn encode_block(config: &EncodingConfiguration, symbols: &[u64]) -> Result<Vec<u8>> {
    let streams = config
        .sequence_transformation_id
        .apply(symbols, config.sequence_transformation_parameter);

    let mut out = Vec::new();
    for (seq, values) in config.transformed_sequences.iter().zip(streams.iter()) {
        let payload = encode_sub_stream(seq, values)?;
        io::write_payload(&mut out, &payload)?;
    }
    Ok(out)
}

fn decode_block(config: &EncodingConfiguration, payload: &[u8]) -> Result<Vec<u64>> {
    let mut cursor = Cursor::new(payload);
    let mut streams = Vec::with_capacity(config.transformed_sequences.len());
    for seq in &config.transformed_sequences {
        let sub_payload = io::read_payload(&mut cursor)?;
        streams.push(decode_sub_stream(seq, &sub_payload)?);
    }
    Ok(config
        .sequence_transformation_id
        .invert(&streams, config.sequence_transformation_parameter))
}

fn encode_sub_stream(seq: &TransformedSequenceConfiguration, values: &[u64]) -> Result<Vec<u8>> {
    let mut working = values.to_vec();
    let mut out = Vec::new();

    if seq.lut_transformation_enabled {
        let order = seq.lut_order();
        let (remapped, inv_lut0, inv_lut1) = lut::transform(order, &working);
        io::write_payload(&mut out, &encode_lut_table(&inv_lut0)?)?;
        if order >= 1 {
            io::write_payload(&mut out, &encode_lut_table(&inv_lut1)?)?;
        }
        working = remapped;
    }

    if seq.diff_coding_enabled {
        working = crate::transform::diff::transform(&working);
    }

    let payload = entropy_encode(&working, seq)?;
    out.write_all(&payload).map_err(GabacError::Io)?;
    Ok(out)
}

fn decode_sub_stream(seq: &TransformedSequenceConfiguration, payload: &[u8]) -> Result<Vec<u64>> {
    let mut cursor = Cursor::new(payload);

    let inv_lut0 = if seq.lut_transformation_enabled {
        let raw = io::read_payload(&mut cursor)?;
        decode_lut_table(&raw)?
    } else {
        Vec::new()
    };
    let inv_lut1 = if seq.lut_transformation_enabled && seq.lut_order() >= 1 {
        let raw = io::read_payload(&mut cursor)?;
        decode_lut_table(&raw)?
    } else {
        Vec::new()
    };

    let rest_start = cursor.position() as usize;
    let mut working = entropy_decode(&payload[rest_start..], seq)?;

    if seq.diff_coding_enabled {
        working = crate::transform::diff::inverse_transform(&working);
    }

    if seq.lut_transformation_enabled {
        working = lut::inverse_transform(seq.lut_order(), &working, &inv_lut0, &inv_lut1);
    }

    Ok(working)
}

/// A LUT inverse table is itself entropy-coded as bypass-BI with
/// `ceil(log2(max+1))` bits. The width isn't derivable by the decoder
/// ahead of time, so it's stored as a single leading byte before the
/// CABAC payload.
fn encode_lut_table(table: &[u64]) -> Result<Vec<u8>> {
    let max = table.iter().copied().max().unwrap_or(0);
    let bits = (64 - max.leading_zeros()).max(1);

    let mut w = Writer::new();
    w.start(table.len() as u32);
    for &v in table {
        w.write_bypass_value(v, BinarizationId::Bi, &[bits])?;
    }

    let mut out = vec![bits as u8];
    out.extend(w.finish());
    Ok(out)
}

fn decode_lut_table(payload: &[u8]) -> Result<Vec<u64>> {
    let bits = *payload.first().ok_or(GabacError::Truncated { expected: 1 })? as u32;
    let mut r = Reader::new(&payload[1..])?;
    let n = r.start()?;
    let mut out = Vec::with_capacity(n as usize);
    for _ in 0..n {
        out.push(r.read_bypass_value(BinarizationId::Bi, &[bits])?);
    }
    Ok(out)
}

fn entropy_encode(values: &[u64], seq: &TransformedSequenceConfiguration) -> Result<Vec<u8>> {
    let mut w = Writer::new();
    w.start(values.len() as u32);
    let mut prev = 0u32;
    let mut prev_prev = 0u32;

    for &v in values {
        let abs_val = abs_for_context(v, seq.binarization_id);
        match seq.context_selection_id {
            ContextSelectionId::Bypass => {
                w.write_bypass_value(v, seq.binarization_id, &seq.binarization_parameters)?;
            }
            ContextSelectionId::AdaptiveOrder0 => {
                w.write_cabac_adaptive_value(v, seq.binarization_id, &seq.binarization_parameters, 0, 0)?;
            }
            ContextSelectionId::AdaptiveOrder1 => {
                w.write_cabac_adaptive_value(v, seq.binarization_id, &seq.binarization_parameters, prev, 0)?;
            }
            ContextSelectionId::AdaptiveOrder2 => {
                w.write_cabac_adaptive_value(
                    v,
                    seq.binarization_id,
                    &seq.binarization_parameters,
                    prev,
                    prev_prev,
                )?;
            }
        }
        prev_prev = prev;
        prev = abs_val;
    }

    Ok(w.finish())
}

fn entropy_decode(payload: &[u8], seq: &TransformedSequenceConfiguration) -> Result<Vec<u64>> {
    let mut r = Reader::new(payload)?;
    let n = r.start()?;
    let mut out = Vec::with_capacity(n as usize);
    let mut prev = 0u32;
    let mut prev_prev = 0u32;

    for _ in 0..n {
        let v = match seq.context_selection_id {
            ContextSelectionId::Bypass => {
                r.read_bypass_value(seq.binarization_id, &seq.binarization_parameters)?
            }
            ContextSelectionId::AdaptiveOrder0 => {
                r.read_adaptive_cabac_value(seq.binarization_id, &seq.binarization_parameters, 0, 0)?
            }
            ContextSelectionId::AdaptiveOrder1 => {
                r.read_adaptive_cabac_value(seq.binarization_id, &seq.binarization_parameters, prev, 0)?
            }
            ContextSelectionId::AdaptiveOrder2 => r.read_adaptive_cabac_value(
                seq.binarization_id,
                &seq.binarization_parameters,
                prev,
                prev_prev,
            )?,
        };
        let abs_val = abs_for_context(v, seq.binarization_id);
        prev_prev = prev;
        prev = abs_val;
        out.push(v);
    }

    Ok(out)
}

fn abs_for_context(v: u64, id: BinarizationId) -> u32 {
    if id.is_signed() {
        (v as i64).unsigned_abs() as u32
    } else {
        v as u32
    }
}

fn words_from_bytes(bytes: &[u8], word_size: u8) -> TypedStream {
    let mut s = TypedStream::from_bytes(bytes.to_vec());
    s.set_word_size(word_size);
    s
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::cabac::ContextSelectionId;
    use crate::config::TransformedSequenceConfiguration;
    use crate::transform::SequenceTransformId;

    fn bi_seq(bits: u32) -> TransformedSequenceConfiguration {
        TransformedSequenceConfiguration {
            lut_transformation_enabled: false,
            lut_transformation_bits: None,
            lut_transformation_order: None,
            diff_coding_enabled: false,
            binarization_id: BinarizationId::Bi,
            binarization_parameters: vec![bits],
            context_selection_id: ContextSelectionId::AdaptiveOrder2,
        }
    }

    fn no_transform_config(bits: u32) -> EncodingConfiguration {
        EncodingConfiguration {
            word_size: 4,
            sequence_transformation_id: SequenceTransformId::None,
            sequence_transformation_parameter: 0,
            transformed_sequences: vec![bi_seq(bits)],
        }
    }

    #[test]
    fn single_block_round_trip() {
        let cfg = no_transform_config(16);
        let values: Vec<u64> = vec![1, 2, 3, 1000, 65535];
        let bytes: Vec<u8> = values.iter().flat_map(|v| (*v as u32).to_le_bytes()).collect();

        let encoded = encode(&cfg, &bytes, 0).unwrap();
        let decoded = decode(&cfg, &encoded).unwrap();
        assert_eq!(decoded, bytes);
    }

    #[test]
    fn multi_block_round_trip_with_small_blocksize() {
        let cfg = no_transform_config(8);
        let values: Vec<u64> = (0..20u64).collect();
        let bytes: Vec<u8> = values.iter().flat_map(|v| (*v as u32).to_le_bytes()).collect();

        let encoded = encode(&cfg, &bytes, 3).unwrap();
        let decoded = decode(&cfg, &encoded).unwrap();
        assert_eq!(decoded, bytes);
    }

    #[test]
    fn diff_coding_round_trips() {
        let mut cfg = no_transform_config(32);
        cfg.transformed_sequences[0].diff_coding_enabled = true;
        let values: Vec<u64> = vec![5, 7, 7, 20, 19, 1000];
        let bytes: Vec<u8> = values.iter().flat_map(|v| (*v as u32).to_le_bytes()).collect();

        let encoded = encode(&cfg, &bytes, 0).unwrap();
        let decoded = decode(&cfg, &encoded).unwrap();
        assert_eq!(decoded, bytes);
    }

    #[test]
    fn lut_transformation_round_trips() {
        let mut cfg = no_transform_config(32);
        cfg.transformed_sequences[0].lut_transformation_enabled = true;
        cfg.transformed_sequences[0].lut_transformation_bits = Some(8);
        cfg.transformed_sequences[0].lut_transformation_order = Some(0);
        let values: Vec<u64> = vec![10, 10, 20, 30, 10, 20, 20, 20];
        let bytes: Vec<u8> = values.iter().flat_map(|v| (*v as u32).to_le_bytes()).collect();

        let encoded = encode(&cfg, &bytes, 0).unwrap();
        let decoded = decode(&cfg, &encoded).unwrap();
        assert_eq!(decoded, bytes);
    }

    #[test]
    fn equality_transform_round_trips_through_driver() {
        let cfg = EncodingConfiguration {
            word_size: 4,
            sequence_transformation_id: SequenceTransformId::Equality,
            sequence_transformation_parameter: 0,
            transformed_sequences: vec![bi_seq(1), bi_seq(32)],
        };
        let values: Vec<u64> = vec![1, 1, 2, 2, 2, 3];
        let bytes: Vec<u8> = values.iter().flat_map(|v| (*v as u32).to_le_bytes()).collect();

        let encoded = encode(&cfg, &bytes, 0).unwrap();
        let decoded = decode(&cfg, &encoded).unwrap();
        assert_eq!(decoded, bytes);
    }

    #[test]
    fn empty_input_round_trips() {
        let cfg = no_transform_config(8);
        let encoded = encode(&cfg, &[], 0).unwrap();
        let decoded = decode(&cfg, &encoded).unwrap();
        assert!(decoded.is_empty());
    }
}
