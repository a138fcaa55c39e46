//! Configuration-space search (spec §4.8): enumerate a candidate grid,
//! encode the input under each feasible configuration, keep the smallest
//! payload.
//!
//! The default grid reproduces `gabacify/analysis.cpp`'s concrete axes
//! (match/RLE parameters, LUT toggle, binarization parameter candidates,
//! and the single active context-selection id) as documented constants,
//! while `Analyzer` itself takes any `AnalyzerGrid` the caller builds.

use crate::binarization::BinarizationId;
use crate::cabac::ContextSelectionId;
use crate::config::{EncodingConfiguration, TransformedSequenceConfiguration};
use crate::driver;
use crate::error::Result;
use crate::io::TypedStream;
use crate::transform::SequenceTransformId;

/// One axis of the Cartesian product the analyzer walks.
pub struct AnalyzerGrid {
    pub word_sizes: Vec<u8>,
    pub sequence_transformation_ids: Vec<SequenceTransformId>,
    pub match_coding_parameters: Vec<u64>,
    pub rle_coding_parameters: Vec<u64>,
    pub lut_orders: Vec<u8>,
    pub enable_diff_coding: bool,
    pub binarization_ids: Vec<BinarizationId>,
    pub binarization_parameters: Vec<u32>,
    pub context_selection_ids: Vec<ContextSelectionId>,
}

impl Default for AnalyzerGrid {
    /// The original `gabacify` binary's default search axes
    /// (`candidateMatchCodingParameters = [32]`, `candidateRLECodingParameters
    /// = [255]`, `candidateLUTCodingParameters = [0, 1]`,
    /// `candidateBinarizationParameters = [1, 2, 7, 15, 30]`,
    /// `enableDiffCoding = false`, and only `adaptive_coding_order_2` active
    /// among context-selection ids).
    fn default() -> Self {
        AnalyzerGrid {
            word_sizes: vec![1, 2, 4, 8],
            sequence_transformation_ids: vec![
                SequenceTransformId::None,
                SequenceTransformId::Equality,
                SequenceTransformId::Match,
                SequenceTransformId::Rle,
            ],
            match_coding_parameters: vec![32],
            rle_coding_parameters: vec![255],
            lut_orders: vec![0, 1],
            enable_diff_coding: false,
            binarization_ids: vec![
                BinarizationId::Bi,
                BinarizationId::Tu,
                BinarizationId::Eg,
                BinarizationId::Seg,
                BinarizationId::Teg,
                BinarizationId::Steg,
            ],
            binarization_parameters: vec![1, 2, 7, 15, 30],
            context_selection_ids: vec![ContextSelectionId::AdaptiveOrder2],
        }
    }
}

pub struct Analyzer<'a> {
    grid: &'a AnalyzerGrid,
}

impl<'a> Analyzer<'a> {
    pub fn new(grid: &'a AnalyzerGrid) -> Self {
        Analyzer { grid }
    }

    /// Search the grid, returning the smallest-payload configuration and
    /// the encoded bytes it produced (so callers need not re-encode).
    pub fn run(&self, input: &[u8]) -> Result<(EncodingConfiguration, Vec<u8>)> {
        let mut best: Option<(EncodingConfiguration, Vec<u8>)> = None;

        for &word_size in &self.grid.word_sizes {
            let words = words_from_bytes(input, word_size);
            let symbols: Vec<u64> = words.iter().collect();

            for &seq_id in &self.grid.sequence_transformation_ids {
                for param in self.sequence_params(seq_id) {
                    let streams = seq_id.apply(&symbols, param);
                    let maxes: Vec<u64> =
                        streams.iter().map(|s| s.iter().copied().max().unwrap_or(0)).collect();

                    for candidate in self.candidate_configs(word_size, seq_id, param, &maxes) {
                        let encoded = match driver::encode(&candidate, input, 0) {
                            Ok(bytes) => bytes,
                            Err(_) => continue,
                        };
                        log::debug!(
                            "analyzer candidate word_size={} transform={:?} size={}",
                            word_size,
                            seq_id,
                            encoded.len()
                        );
                        if best.as_ref().map(|(_, b)| encoded.len() < b.len()).unwrap_or(true) {
                            best = Some((candidate, encoded));
                        }
                    }
                }
            }
        }

        best.ok_or_else(|| {
            crate::error::GabacError::Internal("analyzer grid produced no feasible configuration")
        })
    }

    fn sequence_params(&self, id: SequenceTransformId) -> Vec<u64> {
        match id {
            SequenceTransformId::Match => self.grid.match_coding_parameters.clone(),
            SequenceTransformId::Rle => self.grid.rle_coding_parameters.clone(),
            SequenceTransformId::None | SequenceTransformId::Equality => vec![0],
        }
    }

    /// Build every feasible per-sub-stream combination for one
    /// (word_size, sequence_transform, param) point, generalized against
    /// each sub-stream's observed max.
    fn candidate_configs(
        &self,
        word_size: u8,
        seq_id: SequenceTransformId,
        param: u64,
        maxes: &[u64],
    ) -> Vec<EncodingConfiguration> {
        let n = seq_id.num_sub_streams();
        let mut per_stream_options: Vec<Vec<TransformedSequenceConfiguration>> = Vec::with_capacity(n);

        for &max in maxes {
            per_stream_options.push(self.feasible_sub_stream_configs(max));
        }

        let mut combos: Vec<Vec<TransformedSequenceConfiguration>> = vec![Vec::new()];
        for options in &per_stream_options {
            let mut next = Vec::new();
            for combo in &combos {
                for opt in options {
                    let mut extended = combo.clone();
                    extended.push(opt.clone());
                    next.push(extended);
                }
            }
            combos = next;
        }

        combos
            .into_iter()
            .map(|transformed_sequences| EncodingConfiguration {
                word_size,
                sequence_transformation_id: seq_id,
                sequence_transformation_parameter: param,
                transformed_sequences,
            })
            .collect()
    }

    fn feasible_sub_stream_configs(&self, max: u64) -> Vec<TransformedSequenceConfiguration> {
        let mut out = Vec::new();

        // LUT axis: always try "disabled", plus one candidate per order the
        // grid names.
        let mut lut_choices: Vec<(bool, u8)> = vec![(false, 0)];
        lut_choices.extend(self.grid.lut_orders.iter().map(|&order| (true, order)));

        for &bin_id in &self.grid.binarization_ids {
            let param_candidates: Vec<Option<u32>> = if bin_id.param_count() == 0 {
                vec![None]
            } else {
                self.grid.binarization_parameters.iter().map(|&p| Some(p)).collect()
            };

            for param in param_candidates {
                if !bin_id.in_bounds(max as i64, param) {
                    continue;
                }
                for &ctx_id in &self.grid.context_selection_ids {
                    for &(lut_enabled, lut_order) in &lut_choices {
                        out.push(TransformedSequenceConfiguration {
                            lut_transformation_enabled: lut_enabled,
                            lut_transformation_bits: lut_enabled.then(|| bits_for(max)),
                            lut_transformation_order: lut_enabled.then_some(lut_order),
                            diff_coding_enabled: self.grid.enable_diff_coding,
                            binarization_id: bin_id,
                            binarization_parameters: param.into_iter().collect(),
                            context_selection_id: ctx_id,
                        });
                    }
                }
            }
        }

        out
    }
}

fn bits_for(max: u64) -> u8 {
    (64 - max.leading_zeros()).max(1) as u8
}

fn words_from_bytes(bytes: &[u8], word_size: u8) -> TypedStream {
    let mut s = TypedStream::from_bytes(bytes.to_vec());
    s.set_word_size(word_size);
    s
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn analyzer_finds_a_feasible_configuration_for_small_input() {
        let grid = AnalyzerGrid {
            word_sizes: vec![4],
            sequence_transformation_ids: vec![SequenceTransformId::None],
            match_coding_parameters: vec![32],
            rle_coding_parameters: vec![255],
            lut_orders: vec![0],
            enable_diff_coding: false,
            binarization_ids: vec![BinarizationId::Bi],
            binarization_parameters: vec![1, 2, 7, 15, 30],
            context_selection_ids: vec![ContextSelectionId::AdaptiveOrder2],
        };
        let analyzer = Analyzer::new(&grid);
        let values: Vec<u32> = vec![1, 2, 3, 1000];
        let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();

        let (config, encoded) = analyzer.run(&bytes).unwrap();
        assert_eq!(config.word_size, 4);
        assert!(!encoded.is_empty());

        let decoded = driver::decode(&config, &encoded).unwrap();
        assert_eq!(decoded, bytes);
    }

    #[test]
    fn analyzer_picks_smaller_payload_between_two_binarizations() {
        let grid = AnalyzerGrid {
            word_sizes: vec![4],
            sequence_transformation_ids: vec![SequenceTransformId::None],
            match_coding_parameters: vec![32],
            rle_coding_parameters: vec![255],
            lut_orders: vec![0],
            enable_diff_coding: false,
            binarization_ids: vec![BinarizationId::Bi, BinarizationId::Eg],
            binarization_parameters: vec![1, 2, 7, 15, 30],
            context_selection_ids: vec![ContextSelectionId::AdaptiveOrder2],
        };
        let analyzer = Analyzer::new(&grid);
        let values: Vec<u32> = vec![0; 64];
        let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();

        let (config, _) = analyzer.run(&bytes).unwrap();
        assert_eq!(config.transformed_sequences.len(), 1);
    }
}
