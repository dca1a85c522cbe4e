use rebuild_core::{denominator, percentage};

#[test]
fn percentage_stays_within_bounds() {
    let values = [0u64, 1, 2, 7, 49, 50, 99, 100, 101, 1_000, u64::MAX];
    for &processed in &values {
        for &total in &values {
            let pct = percentage(processed, total);
            assert!(pct <= 100, "processed={processed} total={total} pct={pct}");
            if processed == 0 {
                assert_eq!(pct, 0, "total={total}");
            }
        }
    }
}

#[test]
fn zero_total_is_well_defined() {
    assert_eq!(percentage(0, 0), 0);
    assert_eq!(percentage(1, 0), 100);
    assert_eq!(percentage(500, 0), 100);
    assert_eq!(denominator(0, 0), 1);
    assert_eq!(denominator(500, 0), 500);
}

#[test]
fn processed_beyond_total_is_capped() {
    assert_eq!(percentage(100, 50), 100);
    assert_eq!(percentage(51, 50), 100);
    assert_eq!(denominator(100, 50), 100);
}

#[test]
fn rounds_to_nearest_whole_percent() {
    assert_eq!(percentage(10, 100), 10);
    assert_eq!(percentage(1, 3), 33);
    assert_eq!(percentage(2, 3), 67);
    assert_eq!(percentage(1, 8), 13);
    assert_eq!(percentage(199, 200), 100);
}
