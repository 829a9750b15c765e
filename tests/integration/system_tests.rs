//! WateringSystem lifecycle, watering, and scheduling against mock ports.

use std::sync::Arc;
use std::thread;

use irrigation::{AppEvent, ConfigError, FireSource, InlineFire, ThreadedFire, Timestamp};

use crate::mock_hw::{
    CONFIG_PATH, HERBS_AND_SUCCULENTS, HERBS_ONLY, MemStore, SCHEDULED, configured, harness,
    harness_with,
};

// ── Bootstrap ─────────────────────────────────────────────────

#[test]
fn bootstrap_loads_persisted_document() {
    let h = harness_with(MemStore::with(CONFIG_PATH, HERBS_AND_SUCCULENTS));
    h.system.bootstrap().unwrap();
    assert!(h.system.is_configured());
    assert_eq!(h.system.domain_names(), vec!["herbs", "succulents"]);
    assert_eq!(h.system.serialize_config().as_deref(), Some(HERBS_AND_SUCCULENTS));
    assert!(h.sink.events().contains(&AppEvent::Bootstrapped {
        name: "T".into(),
        domains: 2
    }));
}

#[test]
fn bootstrap_without_document_stays_unconfigured() {
    let h = harness();
    h.system.bootstrap().unwrap();
    assert!(!h.system.is_configured());
    assert_eq!(
        h.system.describe(),
        "Watering system is not configured yet.  Please run update_config."
    );
}

#[test]
fn bootstrap_with_corrupt_document_keeps_file_and_stays_unconfigured() {
    let h = harness_with(MemStore::with(CONFIG_PATH, "{\"name\":"));
    assert!(matches!(h.system.bootstrap(), Err(ConfigError::Parse(_))));
    assert!(!h.system.is_configured());
    assert_eq!(h.store.text(CONFIG_PATH).as_deref(), Some("{\"name\":"));
}

// ── Replace ───────────────────────────────────────────────────

#[test]
fn replace_persists_then_swaps() {
    let h = configured(HERBS_ONLY);
    h.system.load_or_replace(HERBS_AND_SUCCULENTS).unwrap();
    assert_eq!(h.store.text(CONFIG_PATH).as_deref(), Some(HERBS_AND_SUCCULENTS));
    assert_eq!(h.system.domain_names(), vec!["herbs", "succulents"]);
    assert_eq!(h.system.config_path().as_deref(), Some(CONFIG_PATH));
}

#[test]
fn invalid_documents_leave_state_untouched() {
    let h = configured(SCHEDULED);
    h.system.water_by_name("herbs", None);
    let stamp = h.system.domain("herbs").unwrap().last_fired();
    assert!(stamp.is_some());

    let bad = [
        r#"{"domains":[]}"#,
        r#"{"name":"T","domains":[{"name":"herbs","gpio":0}]}"#,
        r#"{"name":"T","domains":[{"name":"herbs","gpio":0,"duration":5,
            "schedule":[{"weekday":"SUN","times":["24:00"]}]}]}"#,
        r#"{"name":"T","domains":[{"name":"herbs","gpio":0,"duration":5,
            "schedule":[{"weekday":"SUN","times":["12:60"]}]}]}"#,
        r#"{"name":"T","domains":[{"name":"herbs","gpio":0,"duration":5,
            "schedule":[{"weekday":"FUN","times":["12:00"]}]}]}"#,
        r#"{"name":"T","domains":[{"name":"herbs","gpio":0,"duration":0}]}"#,
        r#"{"name":"T","domains":[{"name":"herbs","gpio":0,"duration":1e9}]}"#,
        r#"{"name":"T","domains":[{"name":"herbs","gpio":0,"duration":5},
            {"name":"succulents","gpio":0,"duration":2}]}"#,
    ];
    for doc in bad {
        assert!(h.system.load_or_replace(doc).is_err(), "{doc}");
        assert_eq!(h.system.serialize_config().as_deref(), Some(SCHEDULED));
        assert_eq!(h.store.text(CONFIG_PATH).as_deref(), Some(SCHEDULED));
        assert_eq!(h.system.domain_names(), vec!["herbs", "succulents"]);
        assert_eq!(h.system.domain("herbs").unwrap().last_fired(), stamp);
    }
    let rejected = h
        .sink
        .events()
        .iter()
        .filter(|e| matches!(e, AppEvent::ConfigRejected(_)))
        .count();
    assert_eq!(rejected, bad.len());
}

#[test]
fn storage_failure_rejects_update() {
    let h = configured(HERBS_ONLY);
    h.store.fail_writes.store(true, std::sync::atomic::Ordering::SeqCst);
    assert!(matches!(
        h.system.load_or_replace(HERBS_AND_SUCCULENTS),
        Err(ConfigError::Storage(_))
    ));
    assert_eq!(h.system.domain_names(), vec!["herbs"]);
    assert_eq!(h.system.serialize_config().as_deref(), Some(HERBS_ONLY));
}

#[test]
fn reload_keeps_watermark_of_unchanged_domain() {
    let h = configured(SCHEDULED);
    let now = h.system.now();
    assert_eq!(h.system.check_schedule(&now, &mut InlineFire), 1);

    // Same document again, within the same minute: no second fire.
    h.system.load_or_replace(SCHEDULED).unwrap();
    assert_eq!(h.system.check_schedule(&now, &mut InlineFire), 0);
    assert_eq!(h.relays.calls(), vec![(0, true), (0, false)]);
}

#[test]
fn reload_with_moved_actuator_starts_fresh() {
    let h = configured(SCHEDULED);
    let now = h.system.now();
    h.system.check_schedule(&now, &mut InlineFire);

    let moved = SCHEDULED.replace(r#""gpio":0"#, r#""gpio":7"#);
    h.system.load_or_replace(&moved).unwrap();
    assert!(h.system.domain("herbs").unwrap().last_fired().is_none());
    assert_eq!(h.system.check_schedule(&now, &mut InlineFire), 1);
    assert_eq!(h.relays.calls().last(), Some(&(7, false)));
}

// ── Watering ──────────────────────────────────────────────────

#[test]
fn unknown_domain_is_soft_and_mutates_nothing() {
    let h = configured(HERBS_AND_SUCCULENTS);
    let reply = h.system.water_by_name("ghost", None);
    assert_eq!(reply, "There is no domain \"ghost\" defined in the watering system");
    assert!(h.relays.calls().is_empty());
    for name in ["herbs", "succulents"] {
        assert!(h.system.domain(name).unwrap().last_fired().is_none());
    }
    assert!(h.sink.events().contains(&AppEvent::DomainMissing("ghost".into())));
}

#[test]
fn explicit_duration_overrides_default() {
    let h = configured(HERBS_AND_SUCCULENTS);
    let reply = h.system.water_by_name("herbs", Some(3.0));
    assert_eq!(reply, "Watered domain \"herbs\" on SUN 10-18-2026 @ 15:34");
    assert_eq!(h.delay.total_ms(), 3_000);

    h.system.water_by_name("succulents", None);
    assert_eq!(h.delay.total_ms(), 5_000);
    assert_eq!(h.system.history().len(), 2);
}

#[test]
fn concurrent_runs_on_one_domain_never_overlap() {
    let h = configured(HERBS_AND_SUCCULENTS);
    let workers: Vec<_> = (0..4)
        .map(|_| {
            let sys = Arc::clone(&h.system);
            thread::spawn(move || sys.water_by_name("herbs", Some(20.0)))
        })
        .collect();
    for w in workers {
        assert!(w.join().unwrap().starts_with("Watered domain \"herbs\""));
    }
    assert!(!h.relays.overlapped());
    assert!(!h.relays.any_on());
    assert_eq!(h.relays.calls().len(), 8);
}

#[test]
fn watered_event_carries_source() {
    let h = configured(SCHEDULED);
    h.system.water_by_name("succulents", None);
    let now = h.system.now();
    h.system.check_schedule(&now, &mut InlineFire);

    let sources: Vec<(String, FireSource)> = h
        .sink
        .events()
        .into_iter()
        .filter_map(|e| match e {
            AppEvent::Watered { domain, source, .. } => Some((domain, source)),
            _ => None,
        })
        .collect();
    assert_eq!(
        sources,
        vec![
            ("succulents".into(), FireSource::Manual),
            ("herbs".into(), FireSource::Schedule)
        ]
    );
}

// ── Scheduling ────────────────────────────────────────────────

#[test]
fn repeated_polls_fire_once_per_scheduled_minute() {
    let h = configured(SCHEDULED);
    for _ in 0..12 {
        let now = h.system.now();
        h.system.check_schedule(&now, &mut InlineFire);
    }
    assert_eq!(h.relays.calls(), vec![(0, true), (0, false)]);

    // 15:35 is not scheduled, 15:36 is.
    h.clock.set_to(2026, 10, 18, 15, 35);
    let now = h.system.now();
    assert_eq!(h.system.check_schedule(&now, &mut InlineFire), 0);
    h.clock.set_to(2026, 10, 18, 15, 36);
    let now = h.system.now();
    assert_eq!(h.system.check_schedule(&now, &mut InlineFire), 1);
}

#[test]
fn clock_stepped_back_into_fired_minute_does_not_refire() {
    let h = configured(SCHEDULED);
    let now = h.system.now();
    h.system.check_schedule(&now, &mut InlineFire);

    h.clock.set_to(2026, 10, 18, 15, 33);
    h.clock.set_to(2026, 10, 18, 15, 34);
    let now = h.system.now();
    assert_eq!(h.system.check_schedule(&now, &mut InlineFire), 0);
}

#[test]
fn same_time_next_week_fires_again() {
    let h = configured(SCHEDULED);
    let now = h.system.now();
    h.system.check_schedule(&now, &mut InlineFire);
    let next_week = Timestamp::from_parts(2026, 10, 25, 15, 34).unwrap();
    h.clock.set_to(2026, 10, 25, 15, 34);
    assert_eq!(h.system.check_schedule(&next_week, &mut InlineFire), 1);
}

#[test]
fn manual_run_in_scheduled_minute_suppresses_schedule() {
    let h = configured(SCHEDULED);
    h.system.water_by_name("herbs", None);
    let now = h.system.now();
    assert_eq!(h.system.check_schedule(&now, &mut InlineFire), 0);
}

#[test]
fn threaded_fires_run_domains_in_parallel() {
    let h = configured(
        r#"{"name":"T","domains":[
        {"name":"a","gpio":0,"duration":30,"schedule":[{"weekday":"SUN","times":["15:34"]}]},
        {"name":"b","gpio":1,"duration":30,"schedule":[{"weekday":"SUN","times":["15:34"]}]}]}"#,
    );
    let mut fire = ThreadedFire::new();
    let now = h.system.now();
    assert_eq!(h.system.check_schedule(&now, &mut fire), 2);
    // Claimed already: polling again while the runs are in flight is a no-op.
    assert_eq!(h.system.check_schedule(&now, &mut fire), 0);
    fire.join_all();
    assert!(!h.relays.any_on());
    assert_eq!(h.system.history().len(), 2);
}
