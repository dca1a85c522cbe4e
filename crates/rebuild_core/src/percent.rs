/// Denominator used for display: never zero and never below `processed`.
pub fn denominator(processed: u64, total: u64) -> u64 {
    total.max(processed).max(1)
}

/// Whole-number percentage in `0..=100`, rounded half up.
pub fn percentage(processed: u64, total: u64) -> u8 {
    let denom = u128::from(denominator(processed, total));
    let scaled = u128::from(processed) * 100;
    let rounded = (scaled + denom / 2) / denom;
    rounded.min(100) as u8
}

#[cfg(test)]
mod tests {
    use super::{denominator, percentage};

    #[test]
    fn zero_total_never_divides_by_zero() {
        assert_eq!(denominator(0, 0), 1);
        assert_eq!(percentage(0, 0), 0);
        assert_eq!(percentage(3, 0), 100);
    }

    #[test]
    fn rounds_half_up() {
        assert_eq!(percentage(1, 200), 1);
        assert_eq!(percentage(1, 201), 0);
        assert_eq!(percentage(2, 3), 67);
    }

    #[test]
    fn huge_counts_do_not_overflow() {
        assert_eq!(percentage(u64::MAX, u64::MAX), 100);
        assert_eq!(percentage(u64::MAX / 2, u64::MAX), 50);
    }
}
