use wavesync_engine::{PEAK_FLOOR_DB, PeakHold, PeakHoldConfig};

fn peak_hold() -> PeakHold {
    PeakHold::new(&PeakHoldConfig {
        decay_db_per_sec: 10.0,
    })
}

#[test]
fn test_first_frame_seeds_the_trace() {
    let mut hold = peak_hold();
    assert_eq!(hold.update(&[-50.0, -60.0], 0.0), &[-50.0, -60.0]);
}

#[test]
fn test_peaks_decay_linearly_and_follow_new_maxima() {
    let mut hold = peak_hold();
    hold.update(&[-50.0, -60.0], 0.0);

    assert_eq!(hold.update(&[-70.0, -70.0], 1_000.0), &[-60.0, -70.0]);
    assert_eq!(hold.update(&[-40.0, -80.0], 1_500.0), &[-40.0, -75.0]);
}

#[test]
fn test_bin_count_change_reinitializes() {
    let mut hold = peak_hold();
    hold.update(&[-50.0, -60.0], 0.0);

    assert_eq!(hold.update(&[-90.0, -91.0, -92.0], 10.0), &[-90.0, -91.0, -92.0]);
}

#[test]
fn test_nan_bins_do_not_poison_peaks() {
    let mut hold = peak_hold();
    hold.update(&[-50.0, -60.0], 0.0);

    let peaks = hold.update(&[f32::NAN, -55.0], 100.0).to_vec();
    assert!(peaks.iter().all(|p| p.is_finite()));
    assert_eq!(peaks[0], -51.0);
    assert_eq!(peaks[1], -55.0);
}

#[test]
fn test_infinite_value_restarts_whole_trace() {
    let mut hold = peak_hold();
    hold.update(&[-50.0, -60.0], 0.0);

    assert_eq!(
        hold.update(&[f32::INFINITY, -65.0], 100.0),
        &[PEAK_FLOOR_DB, -65.0]
    );
    assert_eq!(hold.update(&[-70.0, -70.0], 200.0), &[-70.0, -66.0]);
}

#[test]
fn test_non_finite_first_frame_uses_floor() {
    let mut hold = peak_hold();
    assert_eq!(
        hold.update(&[f32::NEG_INFINITY, -10.0], 0.0),
        &[PEAK_FLOOR_DB, -10.0]
    );
}

#[test]
fn test_reset_clears_trace() {
    let mut hold = peak_hold();
    hold.update(&[-50.0], 0.0);
    hold.reset();
    assert!(hold.peaks().is_empty());
    assert_eq!(hold.update(&[-80.0], 5_000.0), &[-80.0]);
}
