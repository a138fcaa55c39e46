//! Static tables driving the binary arithmetic coder and context model.
//!
//! The upstream project's `cabac_tables`/`context_tables` headers hold pure
//! numeric data with no algorithmic content of their own and were not part
//! of the filtered source pack. The probability state machine below is the
//! standard CABAC design used throughout H.264/HEVC software coders: 64
//! probability states, a state/MPS transition pair, and a 4-way
//! range-quantized LPS range table. `ContextModel` packs `state` and `mps`
//! into a single byte (`state << 1 | mps`) the way the source's
//! `ContextModel` does, so the 256-entry transition view the driver talks
//! about is this packed byte mapped through [`next_state_mps`]/
//! [`next_state_lps`].

/// Number of bins addressable within one context set.
///
/// Bin indices past this are clipped to the last slot in the set
/// (`context_selector::clip_bin`) rather than growing the table further —
/// 8 covers every bin position the default analyzer grid and clip values
/// `0..=3` ever reach in practice.
pub const CONTEXT_SET_LEN: usize = 8;

pub const OFFSET_TU: usize = 0;
pub const OFFSET_EG: usize = OFFSET_TU + 68 * CONTEXT_SET_LEN;
pub const OFFSET_BI: usize = OFFSET_EG + 16 * CONTEXT_SET_LEN;
pub const TOTAL_CONTEXTS: usize = OFFSET_BI + 16 * CONTEXT_SET_LEN;

/// `pStateIdx` transition on an MPS hit, indexed by the current 6-bit
/// probability state (0..=62; 63 is the frozen termination state).
const TRANS_IDX_MPS: [u8; 64] = [
    1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24, 25, 26,
    27, 28, 29, 30, 31, 32, 33, 34, 35, 36, 37, 38, 39, 40, 41, 42, 43, 44, 45, 46, 47, 48, 49, 50,
    51, 52, 53, 54, 55, 56, 57, 58, 59, 60, 61, 62, 62, 63,
];

/// `pStateIdx` transition on an LPS hit.
const TRANS_IDX_LPS: [u8; 64] = [
    0, 0, 1, 2, 2, 4, 4, 5, 6, 7, 8, 9, 9, 11, 11, 12, 13, 13, 15, 15, 16, 16, 18, 18, 19, 19, 21,
    21, 23, 22, 23, 24, 24, 25, 26, 26, 27, 27, 28, 29, 29, 30, 30, 30, 31, 32, 32, 33, 33, 33, 34,
    34, 35, 35, 35, 36, 36, 36, 37, 37, 37, 38, 38, 63,
];

/// `rangeTabLPS[pStateIdx][(range >> 6) & 3]`. State 63 is the
/// `encodeBinTrm` termination state with a fixed LPS range of 2.
pub const RANGE_TAB_LPS: [[u8; 4]; 64] = [
    [128, 176, 208, 240],
    [128, 167, 197, 227],
    [128, 158, 187, 216],
    [123, 150, 178, 205],
    [116, 142, 169, 195],
    [111, 135, 160, 185],
    [105, 128, 152, 175],
    [100, 122, 144, 166],
    [95, 116, 137, 158],
    [90, 110, 130, 150],
    [85, 104, 123, 142],
    [81, 99, 117, 135],
    [77, 94, 111, 128],
    [73, 89, 105, 122],
    [69, 85, 100, 116],
    [66, 80, 95, 110],
    [62, 76, 90, 104],
    [59, 72, 86, 99],
    [56, 69, 81, 94],
    [53, 65, 77, 89],
    [51, 62, 73, 85],
    [48, 59, 69, 80],
    [46, 56, 66, 76],
    [43, 53, 63, 72],
    [41, 50, 59, 69],
    [39, 48, 56, 65],
    [37, 45, 54, 62],
    [35, 43, 51, 59],
    [33, 41, 48, 56],
    [32, 39, 46, 53],
    [30, 37, 43, 50],
    [28, 35, 41, 48],
    [27, 33, 39, 45],
    [26, 31, 37, 43],
    [24, 30, 35, 41],
    [23, 28, 33, 39],
    [22, 27, 32, 37],
    [21, 26, 30, 35],
    [20, 24, 29, 33],
    [19, 23, 27, 31],
    [18, 22, 26, 30],
    [17, 21, 25, 28],
    [16, 20, 23, 27],
    [15, 19, 22, 25],
    [14, 18, 21, 24],
    [14, 17, 20, 23],
    [13, 16, 19, 22],
    [12, 15, 18, 21],
    [12, 14, 17, 20],
    [11, 14, 16, 19],
    [11, 13, 15, 18],
    [10, 12, 15, 17],
    [10, 12, 14, 16],
    [9, 11, 13, 15],
    [9, 11, 12, 14],
    [8, 10, 12, 14],
    [8, 9, 11, 13],
    [7, 9, 11, 12],
    [7, 9, 10, 12],
    [7, 8, 10, 11],
    [6, 8, 9, 11],
    [6, 7, 9, 10],
    [6, 7, 8, 9],
    [2, 2, 2, 2],
];

/// Packed-byte transition on an MPS hit: `state` never flips the MPS bit.
pub fn next_state_mps(packed: u8) -> u8 {
    let state = packed >> 1;
    let mps = packed & 1;
    (TRANS_IDX_MPS[state as usize] << 1) | mps
}

/// Packed-byte transition on an LPS hit: the MPS bit flips only when the
/// coder was already at the most uncertain state (`pStateIdx == 0`).
pub fn next_state_lps(packed: u8) -> u8 {
    let state = packed >> 1;
    let mps = packed & 1;
    let new_mps = if state == 0 { mps ^ 1 } else { mps };
    (TRANS_IDX_LPS[state as usize] << 1) | new_mps
}

/// Build the full, ordered context-model table: truncated-unary contexts
/// first, then exponential-Golomb, then binary, matching the offsets above.
/// All contexts start equiprobable (`state = 0, mps = 0`); the coder is
/// stateless between blocks.
pub fn build_context_table() -> Vec<u8> {
    vec![0u8; TOTAL_CONTEXTS]
}
