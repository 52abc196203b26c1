use std::sync::Arc;

use chrono::{Duration, Utc};
use focussense_lib::{
    db::{Database, SessionStatus},
    persistence::{PersistenceGateway, SessionStore},
    reports::ReportWindow,
    scoring::{focus_score, ScoreBand, ScoringConfig},
    sensing::SensorReading,
    session::{RunStatus, SessionController, SessionStats},
    settings::EngineConfig,
};
use pretty_assertions::assert_eq;

/// Ticks are driven by hand; the background ticker never fires within a test.
fn manual_tick_config() -> EngineConfig {
    EngineConfig {
        tick_interval_ms: 3_600_000,
        ..EngineConfig::default()
    }
}

fn controller(db: &Database) -> SessionController<Database> {
    let gateway = Arc::new(PersistenceGateway::new(
        Arc::new(db.clone()),
        "dev_test",
        std::time::Duration::from_secs(5),
    ));
    SessionController::new(gateway, &manual_tick_config())
}

#[tokio::test]
async fn session_survives_stop_and_resume_by_name() {
    let db = Database::open_in_memory().unwrap();
    let controller = controller(&db);
    let t0 = Utc::now();

    let started = controller.start_session("Alice").await.unwrap();
    let session_id = started.session.unwrap().id;

    controller.handle_reading(SensorReading::distance(45.0, t0)).await;
    for _ in 0..10 {
        controller.tick_once().await.unwrap();
    }
    controller.handle_reading(SensorReading::distance(180.0, t0 + Duration::seconds(10))).await;
    for _ in 0..6 {
        controller.tick_once().await.unwrap();
    }
    controller.handle_reading(SensorReading::distance(50.0, t0 + Duration::seconds(16))).await;
    controller.handle_reading(SensorReading::holder(1.0, t0 + Duration::seconds(16))).await;
    controller.handle_reading(SensorReading::holder(0.0, t0 + Duration::seconds(17))).await;
    controller.handle_reading(SensorReading::holder(1.0, t0 + Duration::seconds(21))).await;
    for _ in 0..4 {
        controller.tick_once().await.unwrap();
    }

    let stopped = controller.stop_session().await.unwrap().unwrap();
    let expected = SessionStats {
        total_s: 20,
        focus_s: 14,
        distraction_count: 6,
        away_s: 6,
        away_count: 1,
        phone_pickups: 1,
        phone_use_s: 4,
    };
    assert_eq!(stopped.stats, expected);
    assert_eq!(stopped.score, focus_score(&expected, &ScoringConfig::default()));

    let stored = db.get_session("dev_test", &session_id).await.unwrap().unwrap();
    assert_eq!(stored.stats, expected);
    assert_eq!(stored.status, SessionStatus::Paused);

    let resumed = controller.start_session("Alice").await.unwrap();
    assert_eq!(resumed.session.unwrap().id, session_id);
    assert_eq!(resumed.stats, expected);
    controller.tick_once().await.unwrap();
    controller.stop_session().await.unwrap();

    let events: Vec<&'static str> = db
        .get_events_for_session("dev_test", &session_id)
        .await
        .unwrap()
        .iter()
        .map(|event| event.kind.as_str())
        .collect();
    for expected in [
        "SESSION_START",
        "AWAY_START",
        "AWAY_END",
        "PHONE_PICKUP",
        "PHONE_PUTBACK",
        "SESSION_PAUSE",
        "SESSION_RESUME",
    ] {
        assert!(events.contains(&expected), "missing {expected} in {events:?}");
    }
}

#[tokio::test]
async fn paused_session_is_restored_for_display_and_reported() {
    let db = Database::open_in_memory().unwrap();
    let controller = controller(&db);

    let started = controller.start_session("Deep work").await.unwrap();
    let session_id = started.session.unwrap().id;
    for _ in 0..3 {
        controller.tick_once().await.unwrap();
    }
    controller.stop_session().await.unwrap();

    let fresh = controller_with_restore(&db, &session_id).await;
    let snapshot = fresh.snapshot().await;
    assert_eq!(snapshot.status, RunStatus::Paused);
    assert_eq!(snapshot.stats.total_s, 3);
    assert!(fresh.tick_once().await.is_none());

    let weekly = fresh.report(ReportWindow::WEEKLY).await.unwrap();
    assert_eq!(weekly.sessions, 1);
    assert_eq!(weekly.stats.total_s, 3);
}

async fn controller_with_restore(db: &Database, session_id: &str) -> SessionController<Database> {
    let controller = controller(db);
    controller.restore_session(session_id).await.unwrap();
    controller
}

#[tokio::test]
async fn store_trait_finds_latest_session_by_name() {
    let db = Database::open_in_memory().unwrap();
    let gateway = PersistenceGateway::new(Arc::new(db.clone()), "owner", std::time::Duration::from_secs(5));

    let first = gateway.create("Alice", Utc::now() - Duration::hours(1)).await.unwrap();
    let second = gateway.create("Alice", Utc::now()).await.unwrap();
    assert_ne!(first.id, second.id);

    let found = SessionStore::find_session_by_name(&db, "owner", "Alice").await.unwrap();
    assert_eq!(found, Some(second.id));
    assert_eq!(gateway.find_by_name("Nobody").await.unwrap(), None);
}

#[test]
fn score_bands_follow_thresholds() {
    assert_eq!(ScoreBand::from_score(81), ScoreBand::Excellent);
    assert_eq!(ScoreBand::from_score(80), ScoreBand::Good);
    assert_eq!(ScoreBand::from_score(51), ScoreBand::Moderate);
    assert_eq!(ScoreBand::from_score(50), ScoreBand::Poor);
}
