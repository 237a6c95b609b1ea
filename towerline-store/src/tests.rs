use crate::RunwayPreference;

#[test]
fn runway_preference_window_wraps_midnight() {
    let night = RunwayPreference {
        from_minute:  23 * 60,
        until_minute: 6 * 60,
        departure:    vec!["36L".into()],
        arrival:      vec!["18R".into()],
    };
    assert!(night.is_active(23 * 60 + 30));
    assert!(night.is_active(60));
    assert!(!night.is_active(12 * 60));
    assert!(!night.is_active(6 * 60));

    let day = RunwayPreference { from_minute: 6 * 60, until_minute: 23 * 60, ..night };
    assert!(day.is_active(12 * 60));
    assert!(!day.is_active(23 * 60));
}

#[test]
fn runway_preference_empty_window() {
    let never = RunwayPreference {
        from_minute:  600,
        until_minute: 600,
        departure:    Vec::new(),
        arrival:      Vec::new(),
    };
    assert!(!never.is_active(600));
    assert!(!never.is_active(0));
}
