//! Encoding configuration: the JSON-serializable description of how a
//! block's sub-streams are transformed, binarized and context-selected
//! (spec §4.1/§6), plus the `generalize`/`optimize` normalization passes
//! ported from the source's `configuration.cpp`.

use serde::{Deserialize, Serialize};

use crate::binarization::BinarizationId;
use crate::cabac::ContextSelectionId;
use crate::error::GabacError;
use crate::transform::SequenceTransformId;

/// Upper bound on TU/TEG/STEG's threshold parameter (the source ties this
/// to EG's nominal parameter ceiling; EG itself takes no parameter).
const TU_MAX: u32 = 32;
const MAX_LUT_SIZE: u64 = 1 << 20;

macro_rules! serde_via_id {
    ($ty:ty) => {
        impl Serialize for $ty {
            fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
                s.serialize_u8(self.to_id())
            }
        }
        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
                let id = u8::deserialize(d)?;
                Self::from_id(id).ok_or_else(|| {
                    serde::de::Error::custom(format!(
                        "invalid {} id: {}",
                        stringify!($ty),
                        id
                    ))
                })
            }
        }
    };
}

serde_via_id!(BinarizationId);
serde_via_id!(SequenceTransformId);
serde_via_id!(ContextSelectionId);

/// Per-sub-stream configuration: spec §6's `transformed_sequences[]`
/// entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformedSequenceConfiguration {
    pub lut_transformation_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub lut_transformation_bits: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub lut_transformation_order: Option<u8>,
    pub diff_coding_enabled: bool,
    pub binarization_id: BinarizationId,
    pub binarization_parameters: Vec<u32>,
    pub context_selection_id: ContextSelectionId,
}

impl TransformedSequenceConfiguration {
    pub fn lut_bits(&self) -> u8 {
        if self.lut_transformation_enabled {
            self.lut_transformation_bits.unwrap_or(0)
        } else {
            0
        }
    }

    pub fn lut_order(&self) -> u8 {
        if self.lut_transformation_enabled {
            self.lut_transformation_order.unwrap_or(0)
        } else {
            0
        }
    }

    fn set_lut_bits(&mut self, bits: u8) {
        if self.lut_transformation_enabled {
            self.lut_transformation_bits = Some(bits);
        }
    }

    fn set_lut_order(&mut self, order: u8) {
        if self.lut_transformation_enabled {
            self.lut_transformation_order = Some(order);
        }
    }
}

/// Whole-block configuration: spec §6's top-level JSON object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodingConfiguration {
    pub word_size: u8,
    pub sequence_transformation_id: SequenceTransformId,
    pub sequence_transformation_parameter: u64,
    pub transformed_sequences: Vec<TransformedSequenceConfiguration>,
}

impl EncodingConfiguration {
    pub fn from_json(s: &str) -> Result<Self, GabacError> {
        serde_json::from_str(s).map_err(|e| GabacError::ConfigInvalid(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String, GabacError> {
        serde_json::to_string_pretty(self).map_err(|e| GabacError::ConfigInvalid(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), GabacError> {
        if ![1u8, 2, 4, 8].contains(&self.word_size) {
            return Err(GabacError::ConfigInvalid(format!(
                "word_size must be one of 1, 2, 4, 8, got {}",
                self.word_size
            )));
        }
        let id = self.sequence_transformation_id;
        if self.transformed_sequences.len() != id.num_sub_streams() {
            return Err(GabacError::ConfigInvalid(format!(
                "{:?} needs {} transformed_sequences entries, got {}",
                id,
                id.num_sub_streams(),
                self.transformed_sequences.len()
            )));
        }
        for seq in &self.transformed_sequences {
            if seq.binarization_parameters.len() != seq.binarization_id.param_count() {
                return Err(GabacError::ConfigInvalid(format!(
                    "{} needs {} binarization parameters, got {}",
                    seq.binarization_id.name(),
                    seq.binarization_id.param_count(),
                    seq.binarization_parameters.len()
                )));
            }
        }
        Ok(())
    }

    /// Widen this configuration so it can losslessly represent any value up
    /// to `max` within `wordsize`, escalating binarizations and LUT
    /// settings that would otherwise overflow. Ported from
    /// `EncodingConfiguration::generalize`.
    pub fn generalize(&self, max: u64, wordsize: u8) -> Self {
        let mut ret = self.clone();
        ret.word_size = ret.word_size.min(wordsize);

        generalize_lut(&mut ret, max, 0);
        generalize_bin(&mut ret, max, 0);

        match ret.sequence_transformation_id {
            SequenceTransformId::Equality => {
                let bits = ret.transformed_sequences[1].lut_bits().max(1);
                ret.transformed_sequences[1].set_lut_bits(bits);
                generalize_lut(&mut ret, 1, 1);
                generalize_bin(&mut ret, 1, 1);
            }
            SequenceTransformId::Match => {
                let window = ret.sequence_transformation_parameter;
                let bits = bits_for(window).max(ret.transformed_sequences[1].lut_bits());
                ret.transformed_sequences[1].set_lut_bits(bits);
                generalize_lut(&mut ret, window, 1);
                generalize_bin(&mut ret, window, 1);

                let bits2 = ret.transformed_sequences[2].lut_bits().max(32);
                ret.transformed_sequences[2].set_lut_bits(bits2);
                generalize_lut(&mut ret, u32::MAX as u64, 2);
                generalize_bin(&mut ret, u32::MAX as u64, 2);
            }
            SequenceTransformId::Rle => {
                let bits = ret.transformed_sequences[1].lut_bits().max(32);
                ret.transformed_sequences[1].set_lut_bits(bits);
                generalize_lut(&mut ret, u32::MAX as u64, 1);
                generalize_bin(&mut ret, u32::MAX as u64, 1);
            }
            SequenceTransformId::None => {}
        }

        ret
    }

    /// Tighten this configuration to the smallest representation that
    /// still covers `max` exactly. Ported from
    /// `EncodingConfiguration::optimize`.
    pub fn optimize(&self, max: u64) -> Self {
        let mut ret = self.clone();
        optimize_lut(&mut ret, max, 0);
        optimize_bin(&mut ret, max, 0);

        match ret.sequence_transformation_id {
            SequenceTransformId::Equality => {
                ret.transformed_sequences[1].set_lut_bits(1);
                optimize_lut(&mut ret, 1, 1);
                optimize_bin(&mut ret, 1, 1);
            }
            SequenceTransformId::Match => {
                let window = ret.sequence_transformation_parameter;
                ret.transformed_sequences[1].set_lut_bits(bits_for(window));
                optimize_lut(&mut ret, window, 1);
                optimize_bin(&mut ret, window, 1);

                ret.transformed_sequences[2].set_lut_bits(32);
                optimize_lut(&mut ret, u32::MAX as u64, 2);
                optimize_bin(&mut ret, u32::MAX as u64, 2);
            }
            SequenceTransformId::Rle => {
                ret.transformed_sequences[1].set_lut_bits(32);
                optimize_lut(&mut ret, u32::MAX as u64, 1);
                optimize_bin(&mut ret, u32::MAX as u64, 1);
            }
            SequenceTransformId::None => {}
        }

        ret
    }

    pub fn is_general(&self, max: u64, wordsize: u8) -> bool {
        *self == self.generalize(max, wordsize)
    }
}

/// `ceil(log2(max + 1))`: bits needed to represent every value in `0..=max`.
fn bits_for(max: u64) -> u8 {
    (64 - max.leading_zeros()) as u8
}

fn generalize_lut(ret: &mut EncodingConfiguration, max: u64, index: usize) {
    if !ret.transformed_sequences[index].lut_transformation_enabled {
        return;
    }
    let bits = bits_for(max);
    let cur = ret.transformed_sequences[index].lut_bits();
    ret.transformed_sequences[index].set_lut_bits(bits.max(cur));

    if max > MAX_LUT_SIZE && index == 0 {
        ret.transformed_sequences[index].lut_transformation_enabled = false;
        ret.transformed_sequences[index].lut_transformation_bits = None;
        ret.transformed_sequences[index].lut_transformation_order = None;
    } else if max > isqrt(MAX_LUT_SIZE) {
        ret.transformed_sequences[index].set_lut_order(0);
    } else if max > icbrt(MAX_LUT_SIZE) {
        let order0 = ret.transformed_sequences[0].lut_order();
        ret.transformed_sequences[index].set_lut_order(order0.min(1));
    }
}

fn optimize_lut(ret: &mut EncodingConfiguration, max: u64, index: usize) {
    if !ret.transformed_sequences[index].lut_transformation_enabled {
        return;
    }
    ret.transformed_sequences[index].set_lut_bits(bits_for(max));
}

fn isqrt(v: u64) -> u64 {
    (v as f64).sqrt() as u64
}

fn icbrt(v: u64) -> u64 {
    (v as f64).powf(1.0 / 3.0) as u64
}

fn generalize_bin(ret: &mut EncodingConfiguration, max: u64, index: usize) {
    let id = ret.transformed_sequences[index].binarization_id;
    match id {
        BinarizationId::Bi => {
            let bits = bits_for(max);
            let cur = ret.transformed_sequences[index].binarization_parameters.first().copied().unwrap_or(0);
            ret.transformed_sequences[index].binarization_parameters = vec![bits.max(cur as u8) as u32];
        }
        BinarizationId::Tu => {
            if max > TU_MAX as u64 {
                ret.transformed_sequences[index].binarization_id = BinarizationId::Teg;
                ret.transformed_sequences[index].binarization_parameters = vec![32];
                generalize_bin(ret, max, index);
            }
        }
        BinarizationId::Eg => {
            if max > u32::MAX as u64 {
                ret.transformed_sequences[index].binarization_parameters = vec![0];
                ret.transformed_sequences[index].binarization_id = BinarizationId::Bi;
                generalize_bin(ret, max, index);
            }
        }
        BinarizationId::Seg => {
            if max > (1u64 << 16) - 1 {
                ret.transformed_sequences[index].binarization_parameters = vec![0];
                ret.transformed_sequences[index].binarization_id = BinarizationId::Bi;
                generalize_bin(ret, max, index);
            }
        }
        BinarizationId::Teg => {
            let p = ret.transformed_sequences[index].binarization_parameters[0];
            if p > TU_MAX {
                ret.transformed_sequences[index].binarization_parameters = vec![TU_MAX];
            }
            let threshold = ret.transformed_sequences[index].binarization_parameters[0];
            let bound = (1u64 << (32 - threshold / 2)).saturating_sub(1);
            if max > bound {
                ret.transformed_sequences[index].binarization_parameters = vec![0];
                ret.transformed_sequences[index].binarization_id = BinarizationId::Bi;
                generalize_bin(ret, max, index);
            }
        }
        BinarizationId::Steg => {
            let p = ret.transformed_sequences[index].binarization_parameters[0];
            if p > TU_MAX {
                ret.transformed_sequences[index].binarization_parameters = vec![TU_MAX];
            }
            let threshold = ret.transformed_sequences[index].binarization_parameters[0];
            let bound = (1u64 << (16 - threshold / 2)).saturating_sub(1);
            if max > bound {
                ret.transformed_sequences[index].binarization_parameters = vec![0];
                ret.transformed_sequences[index].binarization_id = BinarizationId::Bi;
                generalize_bin(ret, max, index);
            }
        }
    }
}

fn optimize_bin(ret: &mut EncodingConfiguration, max: u64, index: usize) {
    let id = ret.transformed_sequences[index].binarization_id;
    match id {
        BinarizationId::Bi => {
            ret.transformed_sequences[index].binarization_parameters = vec![bits_for(max) as u32];
        }
        BinarizationId::Teg => {
            let p = ret.transformed_sequences[index].binarization_parameters[0];
            if p == 0 {
                ret.transformed_sequences[index].binarization_id = BinarizationId::Eg;
                ret.transformed_sequences[index].binarization_parameters = vec![];
                optimize_bin(ret, max, index);
            } else if (p as u64) > max {
                ret.transformed_sequences[index].binarization_parameters = vec![max as u32];
            }
        }
        BinarizationId::Steg => {
            let p = ret.transformed_sequences[index].binarization_parameters[0];
            if p == 0 {
                ret.transformed_sequences[index].binarization_id = BinarizationId::Seg;
                ret.transformed_sequences[index].binarization_parameters = vec![];
                optimize_bin(ret, max, index);
            } else if (p as u64) > max {
                ret.transformed_sequences[index].binarization_parameters = vec![max as u32];
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn base_config(num_streams: usize) -> EncodingConfiguration {
        EncodingConfiguration {
            word_size: 4,
            sequence_transformation_id: SequenceTransformId::None,
            sequence_transformation_parameter: 0,
            transformed_sequences: (0..num_streams)
                .map(|_| TransformedSequenceConfiguration {
                    lut_transformation_enabled: false,
                    lut_transformation_bits: None,
                    lut_transformation_order: None,
                    diff_coding_enabled: false,
                    binarization_id: BinarizationId::Bi,
                    binarization_parameters: vec![8],
                    context_selection_id: ContextSelectionId::AdaptiveOrder2,
                })
                .collect(),
        }
    }

    #[test]
    fn json_round_trip_preserves_fields() {
        let cfg = base_config(1);
        let json = cfg.to_json().unwrap();
        let back = EncodingConfiguration::from_json(&json).unwrap();
        assert_eq!(cfg, back);
    }

    #[test]
    fn generalize_widens_bi_width_for_a_bigger_max() {
        let cfg = base_config(1);
        let gen = cfg.generalize(1_000_000, 4);
        assert_eq!(gen.transformed_sequences[0].binarization_id, BinarizationId::Bi);
        assert_eq!(gen.transformed_sequences[0].binarization_parameters[0], 20);
    }

    #[test]
    fn generalize_tu_past_tu_max_switches_to_teg() {
        let mut cfg = base_config(1);
        cfg.transformed_sequences[0].binarization_id = BinarizationId::Tu;
        cfg.transformed_sequences[0].binarization_parameters = vec![10];
        let gen = cfg.generalize(1000, 4);
        assert_eq!(gen.transformed_sequences[0].binarization_id, BinarizationId::Teg);
    }

    #[test]
    fn optimize_teg_zero_param_collapses_to_eg() {
        let mut cfg = base_config(1);
        cfg.transformed_sequences[0].binarization_id = BinarizationId::Teg;
        cfg.transformed_sequences[0].binarization_parameters = vec![0];
        let opt = cfg.optimize(500);
        assert_eq!(opt.transformed_sequences[0].binarization_id, BinarizationId::Eg);
        assert!(opt.transformed_sequences[0].binarization_parameters.is_empty());
    }

    #[test]
    fn validate_rejects_bad_word_size() {
        let mut cfg = base_config(1);
        cfg.word_size = 3;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_mismatched_sub_stream_count() {
        let mut cfg = base_config(1);
        cfg.sequence_transformation_id = SequenceTransformId::Match;
        assert!(cfg.validate().is_err());
    }
}
