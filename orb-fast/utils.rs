//! Circular arc tests on the 16-pixel Bresenham ring used by FAST.

/// True when the ring mask holds a run of at least `min_count` set bits,
/// wrapping from bit 15 back to bit 0.
pub fn has_contiguous_arc(mask: u16, min_count: usize) -> bool {
    if min_count == 0 || min_count > 16 {
        return false;
    }
    if mask == u16::MAX {
        return true;
    }

    // A run of n bits survives n-1 AND-ed rotations
    let mut run = mask;
    for i in 1..min_count {
        run &= mask.rotate_right(i as u32);
        if run == 0 {
            return false;
        }
    }
    run != 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Pack per-pixel flags into a ring mask, bit `i` for ring position `i`
    fn ring_mask(flags: &[bool; 16]) -> u16 {
        flags
            .iter()
            .enumerate()
            .fold(0u16, |mask, (i, &set)| if set { mask | (1 << i) } else { mask })
    }

    /// Linear scan over two laps of the ring
    fn has_contiguous_arc_scan(mask: u16, min_count: usize) -> bool {
        if min_count == 0 || min_count > 16 {
            return false;
        }

        let mut current = 0;
        for i in 0..32 {
            if mask & (1 << (i % 16)) != 0 {
                current += 1;
                if current >= min_count {
                    return true;
                }
            } else {
                current = 0;
            }
        }
        false
    }

    #[test]
    fn test_simple_arc() {
        let mut flags = [false; 16];
        for f in flags.iter_mut().take(9) {
            *f = true;
        }
        let mask = ring_mask(&flags);
        assert!(has_contiguous_arc(mask, 9));
        assert!(!has_contiguous_arc(mask, 10));
    }

    #[test]
    fn test_wrap_around_arc() {
        let mut flags = [false; 16];
        for f in flags.iter_mut().skip(12) {
            *f = true;
        }
        for f in flags.iter_mut().take(5) {
            *f = true;
        }
        assert!(has_contiguous_arc(ring_mask(&flags), 9));
    }

    #[test]
    fn test_alternating_ring() {
        assert!(!has_contiguous_arc(0b0101_0101_0101_0101, 2));
        assert!(has_contiguous_arc(0b0101_0101_0101_0101, 1));
    }

    #[test]
    fn test_full_and_empty_ring() {
        assert!(has_contiguous_arc(u16::MAX, 16));
        assert!(!has_contiguous_arc(0, 1));
        assert!(!has_contiguous_arc(u16::MAX, 0));
    }

    proptest! {
        #[test]
        fn rotation_test_agrees_with_scan(mask in any::<u16>(), n in 1usize..=16) {
            prop_assert_eq!(has_contiguous_arc(mask, n), has_contiguous_arc_scan(mask, n));
        }
    }
}
