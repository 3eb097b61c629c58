use wavesync_engine::{NavigationConfig, ViewController, clamp_center};
use wavesync_messages::{ClientCommand, Hertz, ViewState};

const CEILING: f64 = 30_000_000.0;

fn controller() -> ViewController {
    ViewController::new(NavigationConfig {
        domain_ceiling_hz: CEILING,
        min_bin_bandwidth_hz: 1.0,
        pan_throttle_ms: 100.0,
        min_pan_step_hz: None,
        pan_echo_timeout_ms: 2_000.0,
        visibility_check_interval_ms: 1_000.0,
    })
}

fn pan(frequency: u64) -> Option<ClientCommand> {
    Some(ClientCommand::Pan {
        frequency: Hertz(frequency),
    })
}

fn assert_in_domain(view: ViewState) {
    assert!(
        view.start_frequency() >= 0.0 && view.end_frequency() <= CEILING,
        "view {:?} leaves the domain",
        view
    );
}

struct Lcg(u64);

impl Lcg {
    fn below(&mut self, n: u64) -> u64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        (self.0 >> 33) % n
    }
}

#[test]
fn test_pan_clamps_to_domain() {
    let mut nav = controller();
    nav.apply_config(ViewState::new(15_000_000.0, 1000, 200.0));

    assert_eq!(nav.pan_to(5_000_000.0, 0.0), pan(5_000_000));
    assert_eq!(nav.render_view().unwrap().center_frequency, 5_000_000.0);

    assert_eq!(nav.pan_to(50_000.0, 0.0), pan(100_000));
    assert_eq!(nav.render_view().unwrap().center_frequency, 100_000.0);

    assert_eq!(nav.pan_to(29_950_000.0, 0.0), pan(29_900_000));
}

#[test]
fn test_pan_rounds_fractional_frequency() {
    let mut nav = controller();
    nav.apply_config(ViewState::new(15_000_000.0, 1000, 200.0));
    assert_eq!(nav.pan_to(7_074_000.6, 0.0), pan(7_074_001));
}

#[test]
fn test_no_requests_before_first_echo() {
    let mut nav = controller();
    assert_eq!(nav.pan_to(7_000_000.0, 0.0), None);
    assert_eq!(nav.zoom_in(0.0), None);
    assert_eq!(nav.render_view(), None);
}

#[test]
fn test_clamp_center_when_window_exceeds_domain() {
    assert_eq!(clamp_center(1.0, 40_000_000.0, CEILING), 15_000_000.0);
    assert_eq!(clamp_center(10.0, 200.0, CEILING), 100.0);
}

#[test]
fn test_zoom_halves_and_doubles_around_tuned_frequency() {
    let mut nav = controller();
    nav.apply_config(ViewState::new(15_000_000.0, 1000, 30_000.0));
    nav.set_tuned_frequency(7_074_000.0);

    assert_eq!(nav.zoom_out(0.0), None, "already fully zoomed out");

    assert_eq!(
        nav.zoom_in(0.0),
        Some(ClientCommand::Zoom {
            frequency: Hertz(7_500_000),
            bin_bandwidth: 15_000.0,
        })
    );
    assert_eq!(nav.zoom_level(), 2.0);

    assert_eq!(
        nav.zoom_in(0.0),
        Some(ClientCommand::Zoom {
            frequency: Hertz(7_074_000),
            bin_bandwidth: 7_500.0,
        })
    );
    assert_eq!(nav.zoom_level(), 4.0);

    assert_eq!(
        nav.zoom_out(0.0),
        Some(ClientCommand::Zoom {
            frequency: Hertz(7_500_000),
            bin_bandwidth: 15_000.0,
        })
    );
}

#[test]
fn test_zoom_in_stops_at_minimum_bin_bandwidth() {
    let mut nav = controller();
    nav.apply_config(ViewState::new(15_000_000.0, 1000, 30_000.0));
    nav.apply_config(ViewState::new(15_000_000.0, 1000, 1.5));

    assert_eq!(
        nav.zoom_in(0.0),
        Some(ClientCommand::Zoom {
            frequency: Hertz(15_000_000),
            bin_bandwidth: 1.0,
        })
    );
    assert_eq!(nav.zoom_in(0.0), None);
}

#[test]
fn test_reset_zoom_restores_initial_bandwidth() {
    let mut nav = controller();
    nav.apply_config(ViewState::new(15_000_000.0, 1000, 30_000.0));
    nav.zoom_in(0.0);
    nav.zoom_in(0.0);

    assert_eq!(nav.reset_zoom(0.0), ClientCommand::Reset);
    let view = nav.render_view().unwrap();
    assert_eq!(view.bin_bandwidth, 30_000.0);
    assert_in_domain(view);
}

#[test]
fn test_drag_predicts_throttles_and_resets() {
    let mut nav = controller();
    nav.apply_config(ViewState::new(10_000_000.0, 1000, 100.0));

    nav.begin_drag();
    assert_eq!(nav.drag_to(10_050_000.0, 0.0), pan(10_050_000));
    assert_eq!(nav.prediction().predicted_offset, 50_000.0);
    assert_eq!(nav.render_view().unwrap().center_frequency, 10_050_000.0);

    // Inside the throttle window: display follows, no request.
    assert_eq!(nav.drag_to(10_060_000.0, 50.0), None);
    assert_eq!(nav.render_view().unwrap().center_frequency, 10_060_000.0);

    assert_eq!(nav.drag_to(10_070_000.0, 150.0), pan(10_070_000));

    // Less than one bin of movement is not worth a request.
    assert_eq!(nav.drag_to(10_070_050.0, 300.0), None);

    assert_eq!(nav.end_drag(400.0), pan(10_070_050));
    assert!(!nav.is_dragging());
    assert_eq!(nav.prediction().predicted_offset, 0.0);
    assert_eq!(nav.render_view().unwrap().center_frequency, 10_070_050.0);
}

#[test]
fn test_end_drag_skips_duplicate_final_pan() {
    let mut nav = controller();
    nav.apply_config(ViewState::new(10_000_000.0, 1000, 100.0));

    nav.begin_drag();
    assert_eq!(nav.drag_to(10_050_000.0, 0.0), pan(10_050_000));
    assert_eq!(nav.end_drag(10.0), None);
    assert_eq!(nav.prediction().predicted_offset, 0.0);
}

#[test]
fn test_echo_during_drag_keeps_gesture_in_place() {
    let mut nav = controller();
    nav.apply_config(ViewState::new(10_000_000.0, 1000, 100.0));

    nav.begin_drag();
    nav.drag_to(10_100_000.0, 0.0);
    nav.apply_config(ViewState::new(10_050_000.0, 1000, 100.0));

    assert_eq!(nav.prediction().server_confirmed_frequency, 10_050_000.0);
    assert_eq!(nav.prediction().predicted_offset, 50_000.0);
    assert_eq!(nav.render_view().unwrap().center_frequency, 10_100_000.0);

    nav.end_drag(500.0);
    nav.apply_config(ViewState::new(10_100_000.0, 1000, 100.0));
    assert_eq!(nav.prediction().predicted_offset, 0.0);
    assert_eq!(nav.render_view().unwrap().center_frequency, 10_100_000.0);
}

#[test]
fn test_prediction_is_zero_whenever_not_dragging() {
    let mut rng = Lcg(42);
    let mut nav = controller();
    nav.apply_config(ViewState::new(15_000_000.0, 1000, 30_000.0));
    nav.set_tuned_frequency(14_074_000.0);
    let mut now = 0.0;

    for _ in 0..3_000 {
        now += rng.below(50) as f64;
        match rng.below(8) {
            0 => nav.begin_drag(),
            1 | 2 => {
                nav.drag_to(rng.below(40_000_000) as f64, now);
            }
            3 => {
                nav.end_drag(now);
                assert_eq!(nav.prediction().predicted_offset, 0.0);
            }
            4 => {
                nav.zoom_in(now);
            }
            5 => {
                nav.zoom_out(now);
            }
            6 => {
                nav.pan_to(rng.below(40_000_000) as f64, now);
            }
            _ => {
                if let Some(view) = nav.render_view() {
                    nav.apply_config(view);
                }
            }
        }

        if !nav.is_dragging() {
            assert_eq!(nav.prediction().predicted_offset, 0.0);
        }
        assert_in_domain(nav.render_view().unwrap());
    }
}

#[test]
fn test_pan_in_flight_until_echo_or_timeout() {
    let mut nav = controller();
    nav.apply_config(ViewState::new(15_000_000.0, 1000, 200.0));
    assert!(!nav.pan_in_flight(0.0));

    nav.pan_to(7_000_000.0, 0.0);
    assert!(nav.pan_in_flight(1_999.0));
    assert!(!nav.pan_in_flight(2_000.0));

    nav.pan_to(8_000_000.0, 3_000.0);
    nav.apply_config(ViewState::new(8_000_000.0, 1000, 200.0));
    assert!(!nav.pan_in_flight(3_001.0));
}

#[test]
fn test_corrective_pan_when_tuned_frequency_leaves_zoomed_view() {
    let mut nav = controller();
    nav.apply_config(ViewState::new(15_000_000.0, 1000, 30_000.0));
    nav.set_tuned_frequency(7_074_000.0);

    // Not zoomed: nothing to correct.
    assert_eq!(nav.check_tuned_visible(0.0), None);

    nav.apply_config(ViewState::new(15_000_000.0, 1000, 100.0));
    assert_eq!(nav.check_tuned_visible(10_000.0), pan(7_074_000));
    // The correction is in flight; no second request.
    assert_eq!(nav.check_tuned_visible(10_500.0), None);

    nav.apply_config(ViewState::new(7_074_000.0, 1000, 100.0));
    assert_eq!(nav.check_tuned_visible(11_000.0), None);
}
