//! How many buffers a multi-buffer operator may use for one chunk or run.
//!
//! Two buffers of the budget are kept back for the operator's other input
//! and its output.

/// Largest `size / k`, rounded up, that fits in the available buffers.
pub fn best_factor(available: usize, size: usize) -> usize {
    let avail = available.saturating_sub(2);
    if avail <= 1 {
        return 1;
    }
    let mut k = size;
    let mut i = 1;
    while k > avail {
        i += 1;
        k = (size + i - 1) / i;
    }
    k.max(1)
}

/// Largest `i`th root of `size`, rounded up, that fits in the available buffers.
pub fn best_root(available: usize, size: usize) -> usize {
    let avail = available.saturating_sub(2);
    if avail <= 1 {
        return 1;
    }
    let mut k = size;
    let mut i = 1.0_f64;
    while k > avail {
        i += 1.0;
        k = (size as f64).powf(1.0 / i).ceil() as usize;
    }
    k.max(1)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_best_factor() {
        assert_eq!(10, best_factor(12, 10));
        assert_eq!(5, best_factor(7, 10));
        assert_eq!(4, best_factor(6, 10));
        assert_eq!(1, best_factor(3, 10));
        assert_eq!(1, best_factor(12, 0));
        assert_eq!(1, best_factor(0, 10));
    }

    #[test]
    fn test_best_root() {
        assert_eq!(10, best_root(20, 90));
        assert_eq!(5, best_root(8, 90));
        assert_eq!(1, best_root(2, 100));
    }
}
