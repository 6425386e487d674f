// Symphonia
// Copyright (c) 2019-2024 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Precomputed tables used by the WMA frame decoder: scale-factor conversion, scale-factor band
//! layout, and the code-length tables used to build the exponent and coefficient Huffman tables.
//!
//! None of the WMA-internal Huffman tables, nor the exact bitrate/sample-rate thresholds that
//! select them, survive in the retrieved reference sources (see `DESIGN.md`). The code-length
//! tables below are therefore a principled, documented stand-in: a canonical, *complete* binary
//! code (satisfies the Kraft equality exactly) with non-decreasing length as the symbol's
//! expected probability mass decreases, which is the shape any run/level or differential exponent
//! Huffman table has in a perceptual codec of this family.

/// Build a complete canonical code-length table for `n` symbols (`n >= 2`), ordered from most to
/// least probable.
///
/// The lengths come from the flattest possible binary tree over `n` leaves: let
/// `l = floor(log2(n))`. The `2^(l + 1) - n` most probable symbols get length `l`; the rest get
/// length `l + 1`. This is always a complete prefix code (the Kraft equality holds exactly,
/// `(2^(l+1) - n) * 2^-l + (n - (2^(l+1) - n)) * 2^-(l+1) == 1`), and its maximum length is
/// `l + 1 <= ceil(log2(n)) + 1`, which stays far below the 31-bit limit `VlcTable` enforces for
/// every alphabet size this decoder uses.
pub fn monotone_code_lengths(n: usize) -> Vec<u8> {
    assert!(n >= 2, "a code needs at least two symbols");

    let mut l: u32 = 0;
    while (1usize << (l + 1)) <= n {
        l += 1;
    }

    // Number of symbols assigned the shorter of the two lengths in use.
    let short_count = (1usize << (l + 1)) - n;

    (0..n).map(|i| if i < short_count { l as u8 } else { (l + 1) as u8 }).collect()
}

/// The largest magnitude of a differential exponent value coded by [`EXPONENT_ALPHABET_SIZE`].
///
/// Differential exponents are zig-zag mapped into `0..EXPONENT_ALPHABET_SIZE` before Huffman
/// coding: `0 -> 0`, `-1 -> 1`, `1 -> 2`, `-2 -> 3`, ...
pub const EXPONENT_ALPHABET_SIZE: usize = 32;

/// Zig-zag map a signed differential exponent onto the unsigned Huffman alphabet.
pub fn zigzag_encode(value: i32) -> u32 {
    ((value << 1) ^ (value >> 31)) as u32
}

/// Inverse of [`zigzag_encode`].
pub fn zigzag_decode(value: u32) -> i32 {
    ((value >> 1) as i32) ^ -((value & 1) as i32)
}

/// Alphabet size of the run/level coefficient table, excluding the escape symbol.
///
/// Symbols `0..COEF_ALPHABET_SIZE - 1` encode the most common small `(run, level)` pairs; the
/// final symbol, `COEF_ALPHABET_SIZE - 1`, is an escape that is followed by a raw 6-bit run and an
/// 8-bit magnitude for runs or levels outside the common range.
pub const COEF_ALPHABET_SIZE: usize = 48;

/// Number of small run values folded directly into the coefficient Huffman alphabet (the
/// remaining entries cover small levels at run 0).
const COEF_RUN_RANGE: u32 = 8;

/// Escape symbol value in the coefficient Huffman alphabet.
pub const COEF_ESCAPE: u32 = (COEF_ALPHABET_SIZE - 1) as u32;

/// Decompose a coefficient Huffman symbol into `(run, level)`. Levels are always >= 1; the sign is
/// carried by a separate bit read immediately after the symbol.
pub fn coef_symbol_to_run_level(symbol: u32) -> (u32, u32) {
    if symbol < COEF_RUN_RANGE {
        // A run of `symbol` zeros followed by a unit-magnitude coefficient.
        (symbol, 1)
    }
    else {
        // A run of zero followed by a small level, `2..`.
        let level = 2 + (symbol - COEF_RUN_RANGE);
        (0, level)
    }
}

/// Inverse of [`coef_symbol_to_run_level`], used only by tests to round-trip the mapping.
#[cfg(test)]
fn run_level_to_coef_symbol(run: u32, level: u32) -> Option<u32> {
    if level == 1 && run < COEF_RUN_RANGE {
        Some(run)
    }
    else if run == 0 && level >= 2 {
        let symbol = COEF_RUN_RANGE + (level - 2);
        if symbol < COEF_ESCAPE {
            Some(symbol)
        }
        else {
            None
        }
    }
    else {
        None
    }
}

/// Build the linear scale-factor table, `scale[e] = 10^(e / 16)`, for exponents `0..=max_exponent`.
///
/// Exponents are transmitted as small integers and converted to linear scale factors via a
/// `pow(10, e/16)` table precomputed once at decoder construction.
pub fn build_scale_factor_table(max_exponent: u32) -> Vec<f32> {
    (0..=max_exponent).map(|e| 10f64.powf(e as f64 / 16.0) as f32).collect()
}

/// Partition `nb_coefs` coefficients into scale factor bands with widths that grow geometrically,
/// matching the general "critical band" shape used by the exponent coding stage: a handful of
/// narrow low-frequency bands followed by progressively wider high-frequency bands.
///
/// Returns the width, in coefficients, of each band; widths sum to exactly `nb_coefs`.
pub fn build_exponent_bands(nb_coefs: usize) -> Vec<usize> {
    let mut widths = Vec::new();
    let mut remaining = nb_coefs;
    let mut width = 4usize.min(nb_coefs.max(1));

    while remaining > 0 {
        let w = width.min(remaining);
        widths.push(w);
        remaining -= w;
        width = (width * 2).min(remaining.max(1));
    }

    widths
}

/// Precompute a sine analysis/synthesis window of length `n`: `w[i] = sin((i + 0.5) * pi / n)`.
pub fn build_sine_window(n: usize) -> Vec<f32> {
    let scale = std::f64::consts::PI / n as f64;
    (0..n).map(|i| ((i as f64 + 0.5) * scale).sin() as f32).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monotone_lengths_satisfy_kraft_equality() {
        for n in 2..64 {
            let lengths = monotone_code_lengths(n);
            assert_eq!(lengths.len(), n);

            let kraft: f64 = lengths.iter().map(|&l| 2f64.powi(-(l as i32))).sum();
            assert!((kraft - 1.0).abs() < 1e-9, "n={n}, kraft={kraft}");

            // Monotonically non-decreasing.
            assert!(lengths.windows(2).all(|w| w[0] <= w[1]));

            // Must stay well under VlcTable's 31-bit code length ceiling.
            assert!(lengths.iter().all(|&l| l <= 31), "n={n}, lengths={lengths:?}");
        }
    }

    #[test]
    fn coefficient_alphabet_code_lengths_are_bounded() {
        let lengths = monotone_code_lengths(COEF_ALPHABET_SIZE);
        assert_eq!(lengths.len(), COEF_ALPHABET_SIZE);
        assert!(lengths.iter().all(|&l| l <= 31));
        assert!(*lengths.iter().max().unwrap() <= 6);
    }

    #[test]
    fn zigzag_round_trips() {
        for v in -100..100 {
            assert_eq!(zigzag_decode(zigzag_encode(v)), v);
        }
    }

    #[test]
    fn coef_symbol_round_trips_for_valid_pairs() {
        for run in 0..COEF_RUN_RANGE {
            let symbol = run;
            let (r, l) = coef_symbol_to_run_level(symbol);
            assert_eq!(run_level_to_coef_symbol(r, l), Some(symbol));
        }

        for level in 2..10 {
            let symbol = COEF_RUN_RANGE + (level - 2);
            let (r, l) = coef_symbol_to_run_level(symbol);
            assert_eq!(run_level_to_coef_symbol(r, l), Some(symbol));
        }
    }

    #[test]
    fn exponent_bands_sum_to_total() {
        for nb_coefs in [64usize, 128, 256, 1024, 2048] {
            let widths = build_exponent_bands(nb_coefs);
            assert_eq!(widths.iter().sum::<usize>(), nb_coefs);
            assert!(widths.iter().all(|&w| w > 0));
        }
    }

    #[test]
    fn scale_factor_table_matches_formula() {
        let table = build_scale_factor_table(31);
        assert_eq!(table.len(), 32);
        assert!((table[0] - 1.0).abs() < 1e-6);
        assert!((table[16] - 10.0).abs() < 1e-3);
    }

    #[test]
    fn sine_window_is_symmetric_and_bounded() {
        let w = build_sine_window(16);
        assert_eq!(w.len(), 16);
        for &s in &w {
            assert!(s > 0.0 && s <= 1.0);
        }
        // w[i] == w[n - 1 - i] for a sine window of this form.
        for i in 0..8 {
            assert!((w[i] - w[15 - i]).abs() < 1e-6);
        }
    }
}
