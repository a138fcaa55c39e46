//! Order-`k` LUT remap (spec §4.3.4).
//!
//! `infer_lut0` builds the order-0 bijection exactly as the source's
//! `inferLut0` does: symbols ranked by descending frequency, ties broken by
//! ascending value, then the pair list re-sorted by value for binary
//! search. Orders 1 and 2 generalize this to a per-context bijection keyed
//! by the preceding `order` already-remapped values, the way the source's
//! `transformLutTransform_core`/`inverseTransformLutTransform_core` index
//! into a single flat higher-order table; the per-context frequency
//! ranking that fills that table is this crate's own addition, since the
//! upstream builder for it was not present in the filtered reference pack
//! (see DESIGN.md).

use std::collections::HashMap;

const MAX_LUT_SIZE: usize = 1 << 20;

/// `(value, rank)` pairs sorted by `value`, for binary-searching a symbol
/// to its order-0 rank.
pub struct Lut0 {
    sorted_by_value: Vec<(u64, u64)>,
    pub inverse: Vec<u64>,
}

impl Lut0 {
    /// Returns `None` if the distinct-value count exceeds the cap, in
    /// which case the caller disables LUT for this sub-stream.
    pub fn infer(symbols: &[u64]) -> Option<Lut0> {
        if symbols.is_empty() {
            return Some(Lut0 { sorted_by_value: Vec::new(), inverse: Vec::new() });
        }

        let mut freq: HashMap<u64, u64> = HashMap::new();
        for &s in symbols {
            *freq.entry(s).or_insert(0) += 1;
            if freq.len() >= MAX_LUT_SIZE {
                return None;
            }
        }

        let mut by_freq: Vec<(u64, u64)> = freq.into_iter().collect();
        by_freq.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

        let mut inverse = Vec::with_capacity(by_freq.len());
        let mut sorted_by_value: Vec<(u64, u64)> = by_freq
            .into_iter()
            .map(|(value, _)| {
                let rank = inverse.len() as u64;
                inverse.push(value);
                (value, rank)
            })
            .collect();
        sorted_by_value.sort_by_key(|&(value, _)| value);

        Some(Lut0 { sorted_by_value, inverse })
    }

    pub fn rank_of(&self, symbol: u64) -> u64 {
        let idx = self
            .sorted_by_value
            .binary_search_by_key(&symbol, |&(value, _)| value)
            .expect("symbol outside the inferred LUT alphabet");
        self.sorted_by_value[idx].1
    }

    pub fn alphabet_size(&self) -> usize {
        self.inverse.len()
    }
}

/// Per-context bijection for `order ∈ {1, 2}`. Built from the order-0 ranks
/// of the already-known stream.
struct HigherOrderLut {
    table: Vec<u64>,
    inverse: Vec<u64>,
    alphabet_size: usize,
    order: usize,
}

impl HigherOrderLut {
    fn build(order: usize, rank0: &[u64], alphabet_size: usize) -> HigherOrderLut {
        let contexts = alphabet_size.pow(order as u32).max(1);
        let mut freq: Vec<HashMap<u64, u64>> = (0..contexts).map(|_| HashMap::new()).collect();

        let mut history = vec![0u64; order];
        for &r in rank0 {
            let ctx = context_index(&history, alphabet_size);
            *freq[ctx].entry(r).or_insert(0) += 1;
            push_history(&mut history, r);
        }

        let mut table = vec![0u64; contexts * alphabet_size];
        let mut inverse = vec![0u64; contexts * alphabet_size];
        for (ctx, counts) in freq.into_iter().enumerate() {
            let mut ranked: Vec<(u64, u64)> = (0..alphabet_size as u64)
                .map(|v| (v, *counts.get(&v).unwrap_or(&0)))
                .collect();
            ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
            for (position, (raw_value, _)) in ranked.into_iter().enumerate() {
                table[ctx * alphabet_size + raw_value as usize] = position as u64;
                inverse[ctx * alphabet_size + position] = raw_value;
            }
        }

        HigherOrderLut { table, inverse, alphabet_size, order }
    }

    fn from_inverse(order: usize, inverse: Vec<u64>, alphabet_size: usize) -> HigherOrderLut {
        let mut table = vec![0u64; inverse.len()];
        let contexts = inverse.len() / alphabet_size.max(1);
        for ctx in 0..contexts {
            for position in 0..alphabet_size {
                let raw_value = inverse[ctx * alphabet_size + position];
                table[ctx * alphabet_size + raw_value as usize] = position as u64;
            }
        }
        HigherOrderLut { table, inverse, alphabet_size, order }
    }
}

fn context_index(history: &[u64], alphabet_size: usize) -> usize {
    let mut idx = 0usize;
    for &h in history.iter().rev() {
        idx = idx * alphabet_size + h as usize;
    }
    idx
}

fn push_history(history: &mut [u64], value: u64) {
    for i in (1..history.len()).rev() {
        history[i] = history[i - 1];
    }
    if !history.is_empty() {
        history[0] = value;
    }
}

/// Forward transform. `order = 0` uses only `lut0`; `order ∈ {1,2}` also
/// returns the higher-order inverse table as the second sub-stream.
pub fn transform(order: u8, symbols: &[u64]) -> (Vec<u64>, Vec<u64>, Vec<u64>) {
    let lut0 = match Lut0::infer(symbols) {
        Some(l) => l,
        None => return (symbols.to_vec(), Vec::new(), Vec::new()),
    };
    let rank0: Vec<u64> = symbols.iter().map(|&s| lut0.rank_of(s)).collect();

    if order == 0 {
        return (rank0, lut0.inverse, Vec::new());
    }

    let alphabet = lut0.alphabet_size();
    let higher = HigherOrderLut::build(order as usize, &rank0, alphabet);

    let mut out = Vec::with_capacity(rank0.len());
    let mut history = vec![0u64; order as usize];
    for &r in &rank0 {
        let ctx = context_index(&history, alphabet);
        out.push(higher.table[ctx * alphabet + r as usize]);
        push_history(&mut history, r);
    }

    (out, lut0.inverse, higher.inverse)
}

/// Inverse transform.
pub fn inverse_transform(order: u8, transformed: &[u64], inverse_lut0: &[u64], inverse_lut1: &[u64]) -> Vec<u64> {
    let alphabet = inverse_lut0.len();
    if order == 0 {
        return transformed.iter().map(|&t| inverse_lut0[t as usize]).collect();
    }

    let higher = HigherOrderLut::from_inverse(order as usize, inverse_lut1.to_vec(), alphabet);
    let mut out = Vec::with_capacity(transformed.len());
    let mut history = vec![0u64; order as usize];
    for &t in transformed {
        let ctx = context_index(&history, alphabet);
        let rank = higher.inverse[ctx * alphabet + t as usize];
        out.push(inverse_lut0[rank as usize]);
        push_history(&mut history, rank);
    }
    let _ = higher.order;
    out
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn order0_is_a_bijection_round_trip() {
        let symbols = vec![5u64, 5, 2, 2, 2, 9, 5, 0];
        let (transformed, inv0, inv1) = transform(0, &symbols);
        assert!(inv1.is_empty());
        let back = inverse_transform(0, &transformed, &inv0, &inv1);
        assert_eq!(back, symbols);
    }

    #[test]
    fn order0_ranks_most_frequent_symbol_first() {
        let symbols = vec![7u64, 3, 3, 3, 1, 1];
        let lut0 = Lut0::infer(&symbols).unwrap();
        assert_eq!(lut0.inverse[0], 3);
    }

    #[test]
    fn order1_round_trip() {
        let symbols = vec![1u64, 1, 2, 1, 2, 3, 1, 2, 3, 3, 3, 2, 1];
        let (transformed, inv0, inv1) = transform(1, &symbols);
        let back = inverse_transform(1, &transformed, &inv0, &inv1);
        assert_eq!(back, symbols);
    }

    #[test]
    fn order2_round_trip() {
        let symbols: Vec<u64> = (0..40).map(|i| (i * 7 % 5) as u64).collect();
        let (transformed, inv0, inv1) = transform(2, &symbols);
        let back = inverse_transform(2, &transformed, &inv0, &inv1);
        assert_eq!(back, symbols);
    }

    #[test]
    fn empty_input_round_trips() {
        let symbols: Vec<u64> = Vec::new();
        let (transformed, inv0, inv1) = transform(0, &symbols);
        assert!(transformed.is_empty());
        let back = inverse_transform(0, &transformed, &inv0, &inv1);
        assert!(back.is_empty());
    }
}
