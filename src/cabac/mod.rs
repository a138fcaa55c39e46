//! Context-adaptive binary arithmetic coding (spec §4.2, §4.5, §4.7).

mod binary_coder;
mod context_model;
mod context_selector;
mod tables;

pub use binary_coder::{BinaryArithmeticDecoder, BinaryArithmeticEncoder};
pub use context_model::ContextModel;
pub use context_selector::ContextSelectionId;
pub use tables::{build_context_table, CONTEXT_SET_LEN, OFFSET_BI, OFFSET_EG, OFFSET_TU};

use context_selector::{context_for_bi, context_for_eg, context_for_tu};

/// Owns the full, ordered context-model array for one sub-stream's
/// arithmetic coding pass and exposes the three per-binarization-family
/// accessors the binarization layer calls into.
pub struct ContextBank {
    models: Vec<ContextModel>,
}

impl ContextBank {
    pub fn new() -> Self {
        ContextBank { models: build_context_table().iter().map(|&b| ContextModel::new(b)).collect() }
    }

    pub fn bi(&mut self, set_idx: usize, bin_idx: usize) -> &mut ContextModel {
        &mut self.models[context_for_bi(set_idx, bin_idx)]
    }

    pub fn tu(&mut self, set_idx: usize, bin_idx: usize) -> &mut ContextModel {
        &mut self.models[context_for_tu(set_idx, bin_idx)]
    }

    pub fn eg(&mut self, set_idx: usize, bin_idx: usize) -> &mut ContextModel {
        &mut self.models[context_for_eg(set_idx, bin_idx)]
    }
}

impl Default for ContextBank {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn bank_indexes_without_panicking_across_full_range() {
        let mut bank = ContextBank::new();
        for set in 0..16 {
            for bin in 0..CONTEXT_SET_LEN {
                bank.bi(set, bin).update_mps();
                bank.eg(set, bin).update_mps();
            }
        }
        for set in 0..68 {
            for bin in 0..CONTEXT_SET_LEN {
                bank.tu(set, bin).update_mps();
            }
        }
    }
}
