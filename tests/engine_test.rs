// tests/engine_test.rs — Integration test: walk session engine with fake collaborators

mod common;

use std::sync::atomic::Ordering;
use std::time::Duration;

use common::*;
use pretty_assertions::assert_eq;
use walkly::geo::{distance, trail_length, Coordinate};
use walkly::infra::errors::WalkError;
use walkly::route::{Complexity, RouteGenerationOptions};
use walkly::session::{EngineSettings, Phase, SaveState, SessionStatus};
use walkly::store::SessionStore;

async fn sleep_secs(secs: u64) {
    tokio::time::sleep(Duration::from_secs(secs)).await;
}

/// idle -> generating -> preview, starting from HOME.
async fn preview(h: &Harness) {
    h.engine.locate().await.unwrap();
    let phase = h
        .engine
        .generate_route(RouteGenerationOptions::for_duration(30.0))
        .await
        .unwrap();
    assert_eq!(phase, Phase::Generating);
    let snap = h.engine.wait_for(|s| s.phase != Phase::Generating).await.unwrap();
    assert_eq!(snap.phase, Phase::Preview);
}

async fn active(h: &Harness) {
    preview(h).await;
    let phase = h.engine.start_walk(Some("Morning".into())).await.unwrap();
    assert_eq!(phase, Phase::Active);
}

#[tokio::test(start_paused = true)]
async fn test_end_to_end_walk_is_persisted() {
    let h = harness();
    preview(&h).await;

    let snap = h.engine.snapshot().await.unwrap();
    let route = snap.generated_route.clone().unwrap();
    assert!(route.distance > 0.0);
    assert!(snap.can_start_walk());
    assert_eq!(h.planner.calls()[0].start_location, Some(HOME));

    h.engine.start_walk(Some("Morning".into())).await.unwrap();
    let snap = h.engine.snapshot().await.unwrap();
    assert!(snap.is_tracking());
    assert_eq!(snap.route_path, vec![HOME]);
    let session = snap.current_session.unwrap();
    assert_eq!(session.title, "Morning");
    assert_eq!(session.planned_route, route.coordinates);

    // Jitter inside 5 m is dropped; the other two extend the trail.
    let p1 = north_of(HOME, 40.0);
    let p2 = north_of(p1, 3.0);
    let p3 = north_of(p1, 60.0);
    assert!(h.engine.ingest_location(fix(p1)).await.unwrap());
    assert!(!h.engine.ingest_location(fix(p2)).await.unwrap());
    assert!(h.engine.ingest_location(fix(p3)).await.unwrap());

    sleep_secs(10).await;

    let moment = h
        .engine
        .add_moment(p3, Some("nice view".into()), Some("photo-1.jpg".into()))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(h.engine.snapshot().await.unwrap().moments.len(), 1);

    let report = h.engine.end_walk().await.unwrap().unwrap();
    assert_eq!(report.moments_saved, 1);
    assert!(report.moment_error.is_none());

    let snap = h
        .engine
        .wait_for(|s| matches!(s.save_state, SaveState::Saved(_)))
        .await
        .unwrap();
    assert_eq!(snap.phase, Phase::Completed);
    assert_eq!(snap.route_path, vec![HOME, p1, p3]);

    let session = snap.current_session.unwrap();
    assert_eq!(session.id, Some(report.session_id));
    assert_eq!(session.status, SessionStatus::Completed);
    assert!((session.total_distance - trail_length(&snap.route_path)).abs() < 1e-9);
    assert!((session.total_distance - 100.0).abs() < 1.0);
    assert!((9..=11).contains(&session.total_duration));

    let stored = h.store.get_session(report.session_id).await.unwrap().unwrap();
    assert_eq!(stored.status, SessionStatus::Completed);
    assert_eq!(stored.user_id, "walker-1");
    assert_eq!(stored.route_path, snap.route_path);
    assert!((stored.total_distance - session.total_distance).abs() < 1e-9);
    assert_eq!(stored.moments.len(), 1);
    assert_eq!(stored.moments[0].id, moment.id);
    assert_eq!(stored.moments[0].description.as_deref(), Some("nice view"));
    assert_eq!(stored.moments[0].photo_ref.as_deref(), Some("photo-1.jpg"));
}

#[tokio::test(start_paused = true)]
async fn test_pause_excludes_paused_time() {
    let h = harness();
    active(&h).await;

    sleep_secs(10).await;
    assert_eq!(h.engine.pause_walk().await.unwrap(), Phase::Paused);
    let at_pause = h.engine.snapshot().await.unwrap().live_stats.duration;
    assert!((9..=11).contains(&at_pause));

    sleep_secs(5).await;
    // No ticking while paused.
    assert_eq!(h.engine.snapshot().await.unwrap().live_stats.duration, at_pause);

    assert_eq!(h.engine.resume_walk().await.unwrap(), Phase::Active);
    sleep_secs(5).await;

    h.engine.end_walk().await.unwrap().unwrap();
    let session = h.engine.snapshot().await.unwrap().current_session.unwrap();
    assert!(
        (14..=16).contains(&session.total_duration),
        "duration {} should exclude the pause",
        session.total_duration
    );

    let updates: Vec<SessionStatus> = h
        .store
        .status_updates
        .lock()
        .unwrap()
        .iter()
        .map(|(_, s)| *s)
        .collect();
    assert_eq!(updates, vec![SessionStatus::Paused, SessionStatus::Active]);
}

#[tokio::test(start_paused = true)]
async fn test_tick_updates_live_stats() {
    let h = harness();
    active(&h).await;
    h.engine
        .ingest_location(fix(north_of(HOME, 100.0)))
        .await
        .unwrap();

    let snap = h
        .engine
        .wait_for(|s| s.live_stats.duration >= 20)
        .await
        .unwrap();
    let stats = snap.live_stats;
    assert!((stats.distance - 100.0).abs() < 1.0);
    // 100 m in 20 s = 18 km/h
    assert!((stats.speed - 18.0).abs() < 0.5);
    assert!((stats.pace - 60.0 / stats.speed).abs() < 1e-9);
}

#[tokio::test(start_paused = true)]
async fn test_fixes_ignored_while_paused() {
    let h = harness();
    active(&h).await;
    h.engine.pause_walk().await.unwrap();

    let far = north_of(HOME, 200.0);
    assert!(!h.engine.ingest_location(fix(far)).await.unwrap());
    let snap = h.engine.snapshot().await.unwrap();
    assert_eq!(snap.route_path, vec![HOME]);
    assert_eq!(snap.user_location, Some(far));
}

#[tokio::test(start_paused = true)]
async fn test_watch_stream_feeds_trail_and_stops_on_end() {
    let h = harness();
    active(&h).await;
    assert!(h.geo.is_watched());

    let p1 = north_of(HOME, 30.0);
    assert!(h.geo.emit(p1));
    assert!(h.geo.emit(north_of(p1, 1.0)));
    assert!(h.geo.emit(north_of(p1, 30.0)));
    let snap = h.engine.wait_for(|s| s.route_path.len() == 3).await.unwrap();
    assert_eq!(snap.route_path[1], p1);

    h.engine.end_walk().await.unwrap();
    assert!(!h.geo.is_watched());
    assert_eq!(h.geo.unwatched.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_invalid_transitions_are_noops() {
    let h = harness();

    assert_eq!(h.engine.pause_walk().await.unwrap(), Phase::Idle);
    assert_eq!(h.engine.resume_walk().await.unwrap(), Phase::Idle);
    assert_eq!(h.engine.try_another_route().await.unwrap(), Phase::Idle);
    assert_eq!(h.engine.start_walk(None).await.unwrap(), Phase::Idle);
    assert_eq!(h.engine.end_walk().await.unwrap(), None);
    assert_eq!(h.engine.retry_save().await.unwrap(), None);
    assert!(h
        .engine
        .add_moment(HOME, None, None)
        .await
        .unwrap()
        .is_none());

    active(&h).await;
    assert_eq!(
        h.engine
            .generate_route(RouteGenerationOptions::default())
            .await
            .unwrap(),
        Phase::Active
    );
    assert_eq!(h.engine.resume_walk().await.unwrap(), Phase::Active);
    h.engine.pause_walk().await.unwrap();
    assert_eq!(h.engine.pause_walk().await.unwrap(), Phase::Paused);
    assert!(h
        .engine
        .add_moment(HOME, None, None)
        .await
        .unwrap()
        .is_none());

    let snap = h.engine.snapshot().await.unwrap();
    assert!(snap.last_error.is_none());
    assert_eq!(h.planner.calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_end_from_paused() {
    let h = harness();
    active(&h).await;
    h.engine.pause_walk().await.unwrap();
    let report = h.engine.end_walk().await.unwrap();
    assert!(report.is_some());
    assert_eq!(h.engine.snapshot().await.unwrap().phase, Phase::Completed);
}

#[tokio::test(start_paused = true)]
async fn test_provider_failure_returns_to_idle_and_clears_error() {
    let h = harness();
    h.planner.fail_next(WalkError::no_route("ZERO_RESULTS"));
    h.engine.locate().await.unwrap();

    h.engine
        .generate_route(RouteGenerationOptions::for_duration(30.0))
        .await
        .unwrap();
    let snap = h.engine.wait_for(|s| s.phase != Phase::Generating).await.unwrap();
    assert_eq!(snap.phase, Phase::Idle);
    assert!(snap.generated_route.is_none());
    assert_eq!(snap.last_error.as_ref().map(|e| e.kind()), Some("no_route_found"));

    sleep_secs(6).await;
    assert!(h.engine.snapshot().await.unwrap().last_error.is_none());

    // A fresh attempt works.
    preview(&h).await;
}

#[tokio::test(start_paused = true)]
async fn test_missing_location_fails_generation() {
    let h = harness_with(settings(), None);
    h.engine
        .generate_route(RouteGenerationOptions::for_duration(20.0))
        .await
        .unwrap();
    let snap = h.engine.wait_for(|s| s.phase != Phase::Generating).await.unwrap();
    assert_eq!(snap.phase, Phase::Idle);
    assert_eq!(
        snap.last_error.map(|e| e.kind()),
        Some("location_unavailable")
    );
    assert!(h.planner.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_explicit_start_location_skips_locate() {
    let h = harness_with(settings(), None);
    let start = north_of(HOME, 1000.0);
    h.engine
        .generate_route(RouteGenerationOptions::for_distance(2.0).starting_at(start))
        .await
        .unwrap();
    let snap = h.engine.wait_for(|s| s.phase != Phase::Generating).await.unwrap();
    assert_eq!(snap.phase, Phase::Preview);
    assert_eq!(snap.user_location, Some(start));

    h.engine.start_walk(None).await.unwrap();
    let session = h.engine.snapshot().await.unwrap().current_session.unwrap();
    assert!(session.title.starts_with("Walk "));
    assert_eq!(session.route_path, vec![start]);
}

#[tokio::test(start_paused = true)]
async fn test_generation_requires_user() {
    let h = harness_with(EngineSettings::default(), Some(HOME));
    let err = h
        .engine
        .generate_route(RouteGenerationOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err, WalkError::Unauthenticated);

    let snap = h.engine.snapshot().await.unwrap();
    assert_eq!(snap.phase, Phase::Idle);
    assert_eq!(snap.last_error, Some(WalkError::Unauthenticated));
}

#[tokio::test(start_paused = true)]
async fn test_try_another_route_cycles_complexity() {
    let h = harness();
    h.engine.locate().await.unwrap();
    h.engine
        .generate_route(
            RouteGenerationOptions::for_duration(30.0).with_complexity(Complexity::Complex),
        )
        .await
        .unwrap();
    h.engine.wait_for(|s| s.phase == Phase::Preview).await.unwrap();

    assert_eq!(h.engine.try_another_route().await.unwrap(), Phase::Generating);
    h.engine.wait_for(|s| s.phase == Phase::Preview).await.unwrap();
    h.engine.try_another_route().await.unwrap();
    h.engine.wait_for(|s| s.phase == Phase::Preview).await.unwrap();

    let calls = h.planner.calls();
    let levels: Vec<Complexity> = calls.iter().map(|c| c.complexity).collect();
    assert_eq!(
        levels,
        vec![Complexity::Complex, Complexity::Simple, Complexity::Medium]
    );
    assert!(calls.iter().all(|c| c.start_location == Some(HOME)));
    assert!(calls.iter().all(|c| c.duration_minutes == Some(30.0)));
}

#[tokio::test(start_paused = true)]
async fn test_failed_save_keeps_walk_and_retry_succeeds() {
    let h = harness();
    active(&h).await;
    h.engine
        .ingest_location(fix(north_of(HOME, 50.0)))
        .await
        .unwrap();
    h.engine
        .add_moment(HOME, Some("start".into()), None)
        .await
        .unwrap();
    sleep_secs(3).await;

    FlakyStore::set(&h.store.fail_finalize, true);
    let err = h.engine.end_walk().await.unwrap_err();
    assert_eq!(err.kind(), "persistence_error");

    let snap = h
        .engine
        .wait_for(|s| matches!(s.save_state, SaveState::Failed(_)))
        .await
        .unwrap();
    assert_eq!(snap.phase, Phase::Completed);
    assert_eq!(snap.last_error.as_ref().map(|e| e.kind()), Some("persistence_error"));
    let frozen = snap.current_session.unwrap();
    assert_eq!(frozen.route_path.len(), 2);
    assert_eq!(frozen.moments.len(), 1);

    // Time passing does not change the frozen totals.
    sleep_secs(30).await;
    FlakyStore::set(&h.store.fail_finalize, false);
    let report = h.engine.retry_save().await.unwrap().unwrap();
    assert_eq!(report.moments_saved, 1);

    let snap = h
        .engine
        .wait_for(|s| matches!(s.save_state, SaveState::Saved(_)))
        .await
        .unwrap();
    let session = snap.current_session.unwrap();
    assert_eq!(session.total_duration, frozen.total_duration);
    assert_eq!(session.total_distance, frozen.total_distance);

    let walks = h.store.list_sessions("walker-1", 10).await.unwrap();
    assert_eq!(walks.len(), 1);
    assert_eq!(walks[0].status, SessionStatus::Completed);
    assert_eq!(walks[0].moment_count, 1);

    // Nothing left to retry.
    assert_eq!(h.engine.retry_save().await.unwrap(), None);
}

#[tokio::test(start_paused = true)]
async fn test_failed_initial_insert_is_created_at_end() {
    let h = harness();
    FlakyStore::set(&h.store.fail_insert, true);
    active(&h).await;

    let snap = h.engine.wait_for(|s| s.last_error.is_some()).await.unwrap();
    assert_eq!(snap.phase, Phase::Active);
    assert!(snap.current_session.unwrap().id.is_none());

    // Status updates for a walk without a row are skipped.
    h.engine.pause_walk().await.unwrap();
    h.engine.resume_walk().await.unwrap();

    FlakyStore::set(&h.store.fail_insert, false);
    let report = h.engine.end_walk().await.unwrap().unwrap();
    let stored = h.store.get_session(report.session_id).await.unwrap().unwrap();
    assert_eq!(stored.status, SessionStatus::Completed);
    assert!(h.store.status_updates.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_moment_failure_does_not_unsave_walk() {
    let h = harness();
    active(&h).await;
    h.engine
        .add_moment(HOME, Some("duck pond".into()), None)
        .await
        .unwrap();

    FlakyStore::set(&h.store.fail_moments, true);
    let report = h.engine.end_walk().await.unwrap().unwrap();
    assert_eq!(report.moments_saved, 0);
    assert_eq!(
        report.moment_error.as_ref().map(|e| e.kind()),
        Some("persistence_error")
    );

    let snap = h
        .engine
        .wait_for(|s| matches!(s.save_state, SaveState::Saved(_)))
        .await
        .unwrap();
    assert!(snap.last_error.is_some());
    let stored = h.store.get_session(report.session_id).await.unwrap().unwrap();
    assert_eq!(stored.status, SessionStatus::Completed);
    assert!(stored.moments.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_store_timeout_becomes_network_error() {
    let settings = EngineSettings {
        store_timeout: Duration::from_secs(2),
        ..settings()
    };
    let h = harness_with(settings, Some(HOME));
    active(&h).await;

    FlakyStore::set(&h.store.hang_finalize, true);
    let err = h.engine.end_walk().await.unwrap_err();
    assert_eq!(err.kind(), "network_error");
    assert_eq!(h.engine.snapshot().await.unwrap().phase, Phase::Completed);
}

#[tokio::test(start_paused = true)]
async fn test_reset_discards_walk() {
    let h = harness();
    active(&h).await;
    h.engine
        .ingest_location(fix(north_of(HOME, 20.0)))
        .await
        .unwrap();
    sleep_secs(2).await;

    assert_eq!(h.engine.reset_session().await.unwrap(), Phase::Idle);
    let snap = h.engine.snapshot().await.unwrap();
    assert!(snap.route_path.is_empty());
    assert!(snap.moments.is_empty());
    assert!(snap.generated_route.is_none());
    assert!(snap.current_session.is_none());
    assert_eq!(snap.live_stats, Default::default());
    assert_eq!(snap.save_state, SaveState::NotSaved);
    assert_eq!(snap.user_location, Some(north_of(HOME, 20.0)));
    assert!(!h.geo.is_watched());

    // Ticks stopped with the walk.
    sleep_secs(5).await;
    assert_eq!(h.engine.snapshot().await.unwrap().live_stats.duration, 0);

    // Usable again.
    preview(&h).await;
}

#[tokio::test(start_paused = true)]
async fn test_reset_drops_in_flight_route() {
    let h = harness();
    h.planner.set_delay(Duration::from_secs(5));
    h.engine.locate().await.unwrap();
    h.engine
        .generate_route(RouteGenerationOptions::for_duration(30.0))
        .await
        .unwrap();
    h.engine.reset_session().await.unwrap();

    sleep_secs(10).await;
    let snap = h.engine.snapshot().await.unwrap();
    assert_eq!(snap.phase, Phase::Idle);
    assert!(snap.generated_route.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_trail_distance_matches_geo() {
    let h = harness();
    active(&h).await;
    let points = [
        north_of(HOME, 10.0),
        north_of(HOME, 25.0),
        north_of(HOME, 26.0),
        north_of(HOME, 40.0),
    ];
    for p in points {
        h.engine.ingest_location(fix(p)).await.unwrap();
    }
    h.engine.end_walk().await.unwrap();
    let snap = h.engine.snapshot().await.unwrap();
    assert_eq!(snap.route_path.len(), 4);
    let expected = distance(HOME, points[0])
        + distance(points[0], points[1])
        + distance(points[1], points[3]);
    let session = snap.current_session.unwrap();
    assert!((session.total_distance - expected).abs() < 1e-6);
}

#[tokio::test(start_paused = true)]
async fn test_snapshot_totals_track_trail_between_ticks() {
    let h = harness();
    active(&h).await;

    // Read back before the next tick lands.
    assert!(h.engine.ingest_location(fix(north_of(HOME, 100.0))).await.unwrap());
    let snap = h.engine.snapshot().await.unwrap();
    assert_eq!(snap.route_path.len(), 2);
    let session = snap.current_session.unwrap();
    assert!((session.total_distance - trail_length(&snap.route_path)).abs() < 1e-9);
    assert!(session.total_distance > 99.0);

    sleep_secs(3).await;
    let session = h.engine.snapshot().await.unwrap().current_session.unwrap();
    assert_eq!(session.total_duration, 3);
}

#[tokio::test(start_paused = true)]
async fn test_non_finite_fix_is_dropped() {
    let h = harness();
    active(&h).await;

    let bad = Coordinate::new(f64::NAN, HOME.lng);
    assert!(!h.engine.ingest_location(fix(bad)).await.unwrap());
    let out_of_range = Coordinate::new(HOME.lat, 200.0);
    assert!(!h.engine.ingest_location(fix(out_of_range)).await.unwrap());

    let snap = h.engine.snapshot().await.unwrap();
    assert_eq!(snap.route_path, vec![HOME]);
    assert_eq!(snap.user_location, Some(HOME));

    assert!(h.engine.ingest_location(fix(north_of(HOME, 30.0))).await.unwrap());
    let report = h.engine.end_walk().await.unwrap().unwrap();
    let stored = h.store.get_session(report.session_id).await.unwrap().unwrap();
    assert!(stored.total_distance.is_finite());
    assert_eq!(stored.route_path.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_consecutive_walks_get_own_records() {
    let h = harness();
    active(&h).await;
    let first = h.engine.end_walk().await.unwrap().unwrap();

    h.engine.reset_session().await.unwrap();
    active(&h).await;
    h.engine.pause_walk().await.unwrap();
    let second = h.engine.end_walk().await.unwrap().unwrap();

    assert_ne!(first.session_id, second.session_id);
    for id in [first.session_id, second.session_id] {
        let walk = h.store.get_session(id).await.unwrap().unwrap();
        assert_eq!(walk.status, SessionStatus::Completed);
    }
}
