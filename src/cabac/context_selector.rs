//! Per-bin context offset computation (spec §4.5).

use super::tables::{CONTEXT_SET_LEN, OFFSET_BI, OFFSET_EG, OFFSET_TU};

/// Clip a bin position into the addressable range of one context set;
/// binarizations with more bins than `CONTEXT_SET_LEN` share the last
/// context among their trailing bins.
fn clip_bin(bin_idx: usize) -> usize {
    bin_idx.min(CONTEXT_SET_LEN - 1)
}

pub fn context_for_bi(context_set_idx: usize, bin_idx: usize) -> usize {
    debug_assert!(context_set_idx < 16);
    OFFSET_BI + context_set_idx * CONTEXT_SET_LEN + clip_bin(bin_idx)
}

pub fn context_for_tu(context_set_idx: usize, bin_idx: usize) -> usize {
    debug_assert!(context_set_idx < 68);
    OFFSET_TU + context_set_idx * CONTEXT_SET_LEN + clip_bin(bin_idx)
}

pub fn context_for_eg(context_set_idx: usize, bin_idx: usize) -> usize {
    debug_assert!(context_set_idx < 16);
    OFFSET_EG + context_set_idx * CONTEXT_SET_LEN + clip_bin(bin_idx)
}

/// Clip a magnitude into the `0..=3` bucket used by adaptive context order.
fn clip2(v: u64) -> usize {
    v.min(3) as usize
}

/// Order-dependent context-set index from up to two preceding absolute
/// values, per `ContextSelectionId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextSelectionId {
    Bypass,
    AdaptiveOrder0,
    AdaptiveOrder1,
    AdaptiveOrder2,
}

impl ContextSelectionId {
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            0 => Some(ContextSelectionId::Bypass),
            1 => Some(ContextSelectionId::AdaptiveOrder0),
            2 => Some(ContextSelectionId::AdaptiveOrder1),
            3 => Some(ContextSelectionId::AdaptiveOrder2),
            _ => None,
        }
    }

    pub fn to_id(self) -> u8 {
        match self {
            ContextSelectionId::Bypass => 0,
            ContextSelectionId::AdaptiveOrder0 => 1,
            ContextSelectionId::AdaptiveOrder1 => 2,
            ContextSelectionId::AdaptiveOrder2 => 3,
        }
    }

    /// Context-set index for the next symbol given the absolute values of
    /// the previous one and two-before symbol (0 when unavailable).
    pub fn context_set_idx(&self, prev: u64, prev_prev: u64) -> usize {
        match self {
            ContextSelectionId::Bypass | ContextSelectionId::AdaptiveOrder0 => 0,
            ContextSelectionId::AdaptiveOrder1 => clip2(prev) << 2,
            ContextSelectionId::AdaptiveOrder2 => (clip2(prev) << 2) + clip2(prev_prev),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn bi_offsets_are_disjoint_from_tu_and_eg() {
        let bi = context_for_bi(15, CONTEXT_SET_LEN - 1);
        let eg = context_for_eg(15, CONTEXT_SET_LEN - 1);
        let tu = context_for_tu(67, CONTEXT_SET_LEN - 1);
        assert!(tu < eg);
        assert!(eg < bi);
    }

    #[test]
    fn order2_clips_both_operands() {
        let sel = ContextSelectionId::AdaptiveOrder2;
        assert_eq!(sel.context_set_idx(100, 100), (3 << 2) + 3);
        assert_eq!(sel.context_set_idx(0, 0), 0);
    }

    #[test]
    fn bypass_and_order0_are_always_set_zero() {
        assert_eq!(ContextSelectionId::Bypass.context_set_idx(9, 9), 0);
        assert_eq!(ContextSelectionId::AdaptiveOrder0.context_set_idx(9, 9), 0);
    }
}
