//! Shared fixtures: deterministic synthetic "architectures".
//!
//! Each style emits fixed-width records with its own opcode skeleton and
//! one varying operand byte, giving the styles sharply distinct bigram
//! and trigram statistics without any external corpus data.

#![allow(dead_code)]

/// Record templates: (skeleton, index of the varying byte).
const STYLES: &[([u8; 4], usize)] = &[
    ([0x48, 0x00, 0x89, 0xE5], 1),
    ([0x94, 0x21, 0x00, 0x60], 2),
    ([0x0B, 0x4C, 0x00, 0x79], 2),
];

/// Deterministic pseudo-code for one synthetic style.
pub fn style_bytes(style: usize, len: usize, seed: u32) -> Vec<u8> {
    let (record, vary) = STYLES[style % STYLES.len()];
    let mut out = Vec::with_capacity(len + 4);
    let mut x = seed.wrapping_mul(2).wrapping_add(1);
    while out.len() < len {
        x = x.wrapping_mul(0x9E37_79B9).wrapping_add(0x632B_E5AB);
        let mut r = record;
        r[vary] = (x >> 13) as u8 & 0x3F;
        out.extend_from_slice(&r);
    }
    out.truncate(len);
    out
}

/// Xorshift fill standing in for encrypted/compressed data.
pub fn random_bytes(len: usize, mut seed: u32) -> Vec<u8> {
    let mut out = Vec::with_capacity(len);
    for _ in 0..len {
        seed ^= seed << 13;
        seed ^= seed >> 17;
        seed ^= seed << 5;
        out.push((seed >> 11) as u8);
    }
    out
}
