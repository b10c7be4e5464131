//! End-to-end scenarios for the monitoring engine.
//!
//! Covers the full pipeline behind `submit_reading` — normalization,
//! threshold evaluation, alert lifecycle, KPI aggregation, event
//! publication — plus the operator-facing query and mutation surface.

use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::{Duration, TimeZone, Utc};

use granary_core::error::CoreError;
use granary_core::reading::RawReading;
use granary_core::severity::AlertType;
use granary_core::thresholds::SiloThresholds;
use granary_core::types::{SiloId, Timestamp};
use granary_core::{AlertStatus, Severity};
use granary_engine::{AlertAction, AlertFilter, Monitor, SiloConfig, SiloStatus, SubmitOutcome};
use granary_events::{EventBus, MonitorEvent};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn base_time() -> Timestamp {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
}

fn ts(seconds: i64) -> Timestamp {
    base_time() + Duration::seconds(seconds)
}

fn monitor() -> Monitor {
    Monitor::new(Arc::new(EventBus::default()))
}

/// Register a silo with max_temperature 30, max_humidity 75, volume
/// warn/critical at 10/5 and a 500 t capacity.
fn register_silo(monitor: &Monitor, silo_id: SiloId) {
    monitor
        .register_silo(SiloConfig {
            silo_id,
            name: format!("Silo {silo_id}"),
            capacity_tons: 500.0,
            status: SiloStatus::Active,
            thresholds: SiloThresholds::default(),
        })
        .expect("registration should succeed");
}

fn reading(silo_id: SiloId, at: Timestamp, temp: f64) -> RawReading {
    RawReading {
        silo_id,
        timestamp: Some(at),
        temperature: temp,
        humidity: 50.0,
        volume_percent: 60.0,
        volume_tons: None,
    }
}

fn volume_reading(silo_id: SiloId, at: Timestamp, volume_percent: f64) -> RawReading {
    RawReading {
        silo_id,
        timestamp: Some(at),
        temperature: 20.0,
        humidity: 50.0,
        volume_percent,
        volume_tons: None,
    }
}

fn active_alerts(monitor: &Monitor, silo_id: SiloId) -> Vec<granary_core::Alert> {
    monitor.list_alerts(AlertFilter {
        silo_id: Some(silo_id),
        status: Some(AlertStatus::Active),
        ..Default::default()
    })
}

// ---------------------------------------------------------------------------
// End-to-end scenario (threshold 30: 31 → resolve at 26 → new alert at 38)
// ---------------------------------------------------------------------------

#[test]
fn breach_resolve_and_rebreach_lifecycle() {
    let monitor = monitor();
    register_silo(&monitor, 1);

    // t=0: 31 °C — one active temperature alert, medium, value 31/threshold 30.
    monitor.submit_reading(reading(1, ts(0), 31.0)).unwrap();
    let alerts = active_alerts(&monitor, 1);
    assert_eq!(alerts.len(), 1);
    let first = &alerts[0];
    assert_eq!(first.alert_type, AlertType::Temperature);
    assert_eq!(first.severity, Severity::Medium);
    assert_eq!(first.value, 31.0);
    assert_eq!(first.threshold, 30.0);

    // t=1: 26 °C — below the re-arm point, alert resolves.
    monitor.submit_reading(reading(1, ts(60), 26.0)).unwrap();
    assert!(active_alerts(&monitor, 1).is_empty());
    let resolved = monitor.get_alert(first.id).unwrap();
    assert_eq!(resolved.status, AlertStatus::Resolved);
    assert_eq!(resolved.resolved_at, Some(ts(60)));

    // t=2: 38 °C — a fresh breach opens a new critical alert with a new id.
    monitor.submit_reading(reading(1, ts(120), 38.0)).unwrap();
    let alerts = active_alerts(&monitor, 1);
    assert_eq!(alerts.len(), 1);
    assert_ne!(alerts[0].id, first.id);
    assert_eq!(alerts[0].severity, Severity::Critical);
}

// ---------------------------------------------------------------------------
// Hysteresis
// ---------------------------------------------------------------------------

#[test]
fn dip_into_hysteresis_band_keeps_the_same_alert() {
    let monitor = monitor();
    register_silo(&monitor, 1);

    monitor.submit_reading(reading(1, ts(0), 31.0)).unwrap();
    let id = active_alerts(&monitor, 1)[0].id;

    // 28 °C is below the limit but above the 27 °C re-arm point: the
    // alert stays open, de-escalated, value refreshed.
    monitor.submit_reading(reading(1, ts(60), 28.0)).unwrap();
    let alerts = active_alerts(&monitor, 1);
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].id, id);
    assert_eq!(alerts[0].severity, Severity::Low);
    assert_eq!(alerts[0].value, 28.0);

    // Back above the limit: still the same alert.
    monitor.submit_reading(reading(1, ts(120), 31.0)).unwrap();
    let alerts = active_alerts(&monitor, 1);
    assert_eq!(alerts[0].id, id);
    assert_eq!(alerts[0].severity, Severity::Medium);
}

#[test]
fn drop_below_rearm_point_resolves_and_reopens_with_new_id() {
    let monitor = monitor();
    register_silo(&monitor, 1);

    monitor.submit_reading(reading(1, ts(0), 31.0)).unwrap();
    let first_id = active_alerts(&monitor, 1)[0].id;

    // 26 °C is below the 27 °C re-arm point: resolve.
    monitor.submit_reading(reading(1, ts(60), 26.0)).unwrap();
    assert!(active_alerts(&monitor, 1).is_empty());

    monitor.submit_reading(reading(1, ts(120), 31.0)).unwrap();
    let alerts = active_alerts(&monitor, 1);
    assert_eq!(alerts.len(), 1);
    assert_ne!(alerts[0].id, first_id);
}

// ---------------------------------------------------------------------------
// Severity escalation and the single-active-alert invariant
// ---------------------------------------------------------------------------

#[test]
fn escalation_updates_the_existing_alert_in_place() {
    let monitor = monitor();
    register_silo(&monitor, 1);

    monitor.submit_reading(reading(1, ts(0), 32.0)).unwrap();
    let alerts = active_alerts(&monitor, 1);
    assert_eq!(alerts.len(), 1);
    let id = alerts[0].id;
    let created_at = alerts[0].created_at;
    assert_eq!(alerts[0].severity, Severity::Medium);

    monitor.submit_reading(reading(1, ts(60), 34.0)).unwrap();
    let alerts = active_alerts(&monitor, 1);
    assert_eq!(alerts.len(), 1, "no second alert for the same breach");
    assert_eq!(alerts[0].id, id);
    assert_eq!(alerts[0].created_at, created_at);
    assert_eq!(alerts[0].severity, Severity::High);
    assert_eq!(alerts[0].value, 34.0);
}

#[test]
fn at_most_one_active_alert_per_type_across_a_noisy_sequence() {
    let monitor = monitor();
    register_silo(&monitor, 1);

    // Oscillate around the limit without ever dropping below re-arm.
    for (i, temp) in [31.0, 33.0, 29.0, 36.0, 28.0, 39.0].iter().enumerate() {
        monitor
            .submit_reading(reading(1, ts(i as i64 * 60), *temp))
            .unwrap();
        let per_type = active_alerts(&monitor, 1)
            .iter()
            .filter(|a| a.alert_type == AlertType::Temperature)
            .count();
        assert_eq!(per_type, 1, "invariant violated after reading {i}");
    }
}

// ---------------------------------------------------------------------------
// Idempotence and ordering
// ---------------------------------------------------------------------------

#[test]
fn duplicate_submission_leaves_state_unchanged() {
    let monitor = monitor();
    register_silo(&monitor, 1);

    monitor.submit_reading(reading(1, ts(0), 31.0)).unwrap();
    let alerts_before = monitor.list_alerts(AlertFilter::default());
    let snapshot_before = monitor.snapshot_at(ts(300));

    let outcome = monitor.submit_reading(reading(1, ts(0), 31.0)).unwrap();
    assert_eq!(outcome, SubmitOutcome::Duplicate);

    let alerts_after = monitor.list_alerts(AlertFilter::default());
    assert_eq!(alerts_before.len(), alerts_after.len());
    assert_eq!(alerts_before[0].id, alerts_after[0].id);
    assert_eq!(alerts_before[0].value, alerts_after[0].value);
    assert_eq!(snapshot_before, monitor.snapshot_at(ts(300)));
}

#[test]
fn out_of_order_reading_is_rejected_not_misapplied() {
    let monitor = monitor();
    register_silo(&monitor, 1);

    monitor.submit_reading(reading(1, ts(600), 31.0)).unwrap();

    let result = monitor.submit_reading(reading(1, ts(0), 45.0));
    assert_matches!(result, Err(CoreError::InvalidReading(_)));

    // The stale 45 °C never touched the alert state.
    let alerts = active_alerts(&monitor, 1);
    assert_eq!(alerts[0].value, 31.0);
    assert_eq!(alerts[0].severity, Severity::Medium);

    // The stream is not blocked for subsequent readings.
    monitor.submit_reading(reading(1, ts(660), 32.0)).unwrap();
    assert_eq!(active_alerts(&monitor, 1)[0].value, 32.0);
}

// ---------------------------------------------------------------------------
// Volume lifecycle
// ---------------------------------------------------------------------------

#[test]
fn low_volume_warns_escalates_and_clears() {
    let monitor = monitor();
    register_silo(&monitor, 1);

    monitor.submit_reading(volume_reading(1, ts(0), 8.0)).unwrap();
    let alerts = active_alerts(&monitor, 1);
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].alert_type, AlertType::Volume);
    assert_eq!(alerts[0].severity, Severity::Medium);
    let id = alerts[0].id;

    monitor.submit_reading(volume_reading(1, ts(60), 3.0)).unwrap();
    let alerts = active_alerts(&monitor, 1);
    assert_eq!(alerts[0].id, id);
    assert_eq!(alerts[0].severity, Severity::Critical);

    // Refilled past the warn level: resolved.
    monitor.submit_reading(volume_reading(1, ts(120), 40.0)).unwrap();
    assert!(active_alerts(&monitor, 1).is_empty());
}

// ---------------------------------------------------------------------------
// Missing thresholds
// ---------------------------------------------------------------------------

#[test]
fn reading_without_thresholds_feeds_aggregates_but_raises_no_alert() {
    let monitor = monitor();
    // Silo 9 was never registered.

    monitor.submit_reading(reading(9, ts(0), 80.0)).unwrap();

    assert!(monitor.list_alerts(AlertFilter::default()).is_empty());
    let snap = monitor.snapshot_at(ts(60));
    assert_eq!(snap.readings.total_readings_24h, 1);
    assert_eq!(snap.readings.average_temperature, 80.0);
}

// ---------------------------------------------------------------------------
// Operator actions
// ---------------------------------------------------------------------------

#[test]
fn acknowledge_then_breach_clear_still_resolves() {
    let monitor = monitor();
    register_silo(&monitor, 1);

    monitor.submit_reading(reading(1, ts(0), 31.0)).unwrap();
    let id = active_alerts(&monitor, 1)[0].id;

    let alert = monitor
        .resolve_or_acknowledge(id, AlertAction::Acknowledge)
        .unwrap();
    assert_eq!(alert.status, AlertStatus::Acknowledged);

    // Acknowledged alerts still count as unresolved.
    assert_eq!(monitor.snapshot_at(ts(30)).alerts.active, 1);

    monitor.submit_reading(reading(1, ts(60), 26.0)).unwrap();
    let alert = monitor.get_alert(id).unwrap();
    assert_eq!(alert.status, AlertStatus::Resolved);
    assert_eq!(monitor.snapshot_at(ts(90)).alerts.active, 0);
}

#[test]
fn acknowledge_errors_surface_to_the_caller() {
    let monitor = monitor();
    register_silo(&monitor, 1);

    let missing = uuid::Uuid::new_v4();
    assert_matches!(
        monitor.resolve_or_acknowledge(missing, AlertAction::Acknowledge),
        Err(CoreError::AlertNotFound(_))
    );

    monitor.submit_reading(reading(1, ts(0), 31.0)).unwrap();
    let id = active_alerts(&monitor, 1)[0].id;
    monitor.submit_reading(reading(1, ts(60), 26.0)).unwrap();

    assert_matches!(
        monitor.resolve_or_acknowledge(id, AlertAction::Acknowledge),
        Err(CoreError::AlertAlreadyResolved(_))
    );
}

#[test]
fn manual_resolve_via_operator_action() {
    let monitor = monitor();
    register_silo(&monitor, 1);

    monitor.submit_reading(reading(1, ts(0), 31.0)).unwrap();
    let id = active_alerts(&monitor, 1)[0].id;

    let alert = monitor
        .resolve_or_acknowledge(id, AlertAction::Resolve)
        .unwrap();
    assert_eq!(alert.status, AlertStatus::Resolved);
    assert_eq!(monitor.snapshot_at(ts(30)).alerts.active, 0);

    assert_matches!(
        monitor.resolve_or_acknowledge(id, AlertAction::Resolve),
        Err(CoreError::AlertAlreadyResolved(_))
    );
}

// ---------------------------------------------------------------------------
// KPI snapshot
// ---------------------------------------------------------------------------

#[test]
fn snapshot_reflects_fleet_volume_and_alert_counts() {
    let monitor = monitor();
    register_silo(&monitor, 1);
    register_silo(&monitor, 2);

    // 60% of 500 t each, volume derived from registered capacity.
    monitor.submit_reading(reading(1, ts(0), 31.0)).unwrap();
    monitor.submit_reading(reading(2, ts(0), 20.0)).unwrap();

    let snap = monitor.snapshot_at(ts(60));
    assert_eq!(snap.silos.total, 2);
    assert_eq!(snap.silos.active, 2);
    assert_eq!(snap.silos.total_capacity_tons, 1000.0);
    assert_eq!(snap.silos.current_volume_tons, 600.0);
    assert_eq!(snap.silos.capacity_utilization, 60.0);
    assert_eq!(snap.readings.total_readings_24h, 2);
    assert_eq!(snap.alerts.active, 1);
    assert_eq!(snap.alerts.recent_7_days, 1);
}

// ---------------------------------------------------------------------------
// Event ordering
// ---------------------------------------------------------------------------

#[test]
fn events_for_one_silo_arrive_in_transition_order() {
    let bus = Arc::new(EventBus::default());
    let mut rx = bus.subscribe();
    let monitor = Monitor::new(Arc::clone(&bus));
    register_silo(&monitor, 1);

    monitor.submit_reading(reading(1, ts(0), 31.0)).unwrap();
    monitor.submit_reading(reading(1, ts(60), 38.0)).unwrap();
    monitor.submit_reading(reading(1, ts(120), 20.0)).unwrap();

    let mut names = Vec::new();
    while let Ok(event) = rx.try_recv() {
        names.push(event.event_name());
    }
    assert_eq!(names, vec!["alert.created", "alert.updated", "alert.resolved"]);
}

#[test]
fn rejected_reading_emits_observability_event() {
    let bus = Arc::new(EventBus::default());
    let mut rx = bus.subscribe();
    let monitor = Monitor::new(Arc::clone(&bus));
    register_silo(&monitor, 1);

    let mut bad = reading(1, ts(0), 31.0);
    bad.timestamp = None;
    assert!(monitor.submit_reading(bad).is_err());

    let event = rx.try_recv().expect("rejection should be published");
    assert_matches!(event, MonitorEvent::ReadingRejected { silo_id, .. } => {
        assert_eq!(silo_id, 1);
    });
}

// ---------------------------------------------------------------------------
// Concurrency
// ---------------------------------------------------------------------------

#[test]
fn concurrent_submission_across_silos_is_deterministic() {
    let silo_count: i64 = 8;
    let readings_per_silo: i64 = 50;

    let build = |parallel: bool| {
        let monitor = Arc::new(monitor());
        for silo_id in 1..=silo_count {
            register_silo(&monitor, silo_id);
        }

        if parallel {
            std::thread::scope(|scope| {
                for silo_id in 1..=silo_count {
                    let monitor = Arc::clone(&monitor);
                    scope.spawn(move || {
                        for i in 0..readings_per_silo {
                            let temp = 20.0 + (silo_id as f64) + (i % 20) as f64;
                            monitor
                                .submit_reading(reading(silo_id, ts(i * 60), temp))
                                .expect("submission should succeed");
                        }
                    });
                }
            });
        } else {
            for silo_id in 1..=silo_count {
                for i in 0..readings_per_silo {
                    let temp = 20.0 + (silo_id as f64) + (i % 20) as f64;
                    monitor
                        .submit_reading(reading(silo_id, ts(i * 60), temp))
                        .expect("submission should succeed");
                }
            }
        }

        monitor.snapshot_at(ts(readings_per_silo * 60))
    };

    let concurrent = build(true);
    let sequential = build(false);

    assert_eq!(concurrent.readings, sequential.readings);
    assert_eq!(concurrent.silos, sequential.silos);
    assert_eq!(concurrent.alerts.active, sequential.alerts.active);
    assert_eq!(concurrent.alerts.critical, sequential.alerts.critical);
}
