//! Shannon byte entropy, normalized to `[0, 1]`.

/// Normalized Shannon entropy of a byte block.
///
/// 0.0 for empty or constant data, 1.0 for a uniform byte distribution.
/// Runs at or above 0.9 are flagged by the reconciler as likely
/// encrypted or compressed.
pub fn shannon(data: &[u8]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let mut seen = [0u64; 256];
    for &byte in data {
        seen[byte as usize] += 1;
    }
    let length = data.len() as f64;
    let mut entropy = 0.0;
    for count in seen {
        if count > 0 {
            let p = count as f64 / length;
            entropy -= p * p.log2();
        }
    }
    entropy / 8.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_is_zero() {
        assert_eq!(shannon(&[]), 0.0);
    }

    #[test]
    fn test_constant_is_zero() {
        assert_eq!(shannon(&[0x41; 4096]), 0.0);
    }

    #[test]
    fn test_uniform_is_one() {
        let mut data = Vec::with_capacity(256 * 16);
        for _ in 0..16 {
            for b in 0..=255u8 {
                data.push(b);
            }
        }
        assert!((shannon(&data) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_text_is_midrange() {
        let e = shannon(b"the quick brown fox jumps over the lazy dog");
        assert!(e > 0.3 && e < 0.8);
    }
}
