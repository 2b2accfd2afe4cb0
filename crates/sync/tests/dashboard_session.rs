use std::time::Duration;

use assert_matches::assert_matches;
use railwatch_core::records::{Alert, NewReport, ReportStatus};
use railwatch_store::writer::{append_alert, resolve_report, submit_report};
use railwatch_store::MemoryStore;
use railwatch_sync::{DashboardSession, DashboardUpdate, SyncConfig};
use tokio::sync::mpsc::UnboundedReceiver;

const WAIT: Duration = Duration::from_secs(2);

fn fall_alert() -> Alert {
    Alert::new(
        "Fall Detected",
        "Video Analysis",
        chrono::Utc::now(),
        Some("http://localhost:3000/files/videos/1_ride.mp4".into()),
    )
}

fn report() -> NewReport {
    NewReport {
        train_number: "12".into(),
        cabin: "A4".into(),
        problem: "Security".into(),
        location: "Door 2".into(),
        description: "...".into(),
    }
}

/// Wait for the next update matching `pred`, skipping others.
async fn next_matching(
    rx: &mut UnboundedReceiver<DashboardUpdate>,
    pred: impl Fn(&DashboardUpdate) -> bool,
) -> DashboardUpdate {
    loop {
        let update = tokio::time::timeout(WAIT, rx.recv())
            .await
            .expect("timed out waiting for update")
            .expect("session channel closed");
        if pred(&update) {
            return update;
        }
    }
}

#[tokio::test]
async fn session_receives_initial_snapshots() {
    let store = MemoryStore::new();
    submit_report(&store, report()).await.unwrap();

    let (session, mut rx) = DashboardSession::open(&store, &SyncConfig::default())
        .await
        .unwrap();

    let update = next_matching(&mut rx, |u| matches!(u, DashboardUpdate::Reports { .. })).await;
    assert_matches!(update, DashboardUpdate::Reports { reports, diff } => {
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].record.cabin, "A4");
        assert_eq!(diff.added.len(), 1);
    });
    assert_eq!(session.reports().len(), 1);
}

#[tokio::test]
async fn resolve_shows_up_as_changed_key() {
    let store = MemoryStore::new();
    let (key, _) = submit_report(&store, report()).await.unwrap();
    let (session, mut rx) = DashboardSession::open(&store, &SyncConfig::default())
        .await
        .unwrap();
    next_matching(&mut rx, |u| matches!(u, DashboardUpdate::Reports { .. })).await;

    resolve_report(&store, &key).await.unwrap();

    let update = next_matching(&mut rx, |u| {
        matches!(u, DashboardUpdate::Reports { diff, .. } if !diff.changed.is_empty())
    })
    .await;
    assert_matches!(update, DashboardUpdate::Reports { reports, diff } => {
        assert_eq!(diff.changed, [key.clone()]);
        assert_eq!(reports[0].record.status, ReportStatus::Resolved);
    });
    assert_eq!(session.reports()[0].record.status, ReportStatus::Resolved);
}

#[tokio::test]
async fn appended_alerts_feed_in_arrival_order() {
    let store = MemoryStore::new();
    let config = SyncConfig {
        alert_feed_capacity: 2,
    };
    let (session, mut rx) = DashboardSession::open(&store, &config).await.unwrap();

    let mut keys = Vec::new();
    for _ in 0..3 {
        keys.push(append_alert(&store, &fall_alert()).await.unwrap());
    }
    for _ in 0..3 {
        next_matching(&mut rx, |u| matches!(u, DashboardUpdate::AlertFeed { .. })).await;
    }

    let feed: Vec<_> = session.feed().into_iter().map(|e| e.key).collect();
    assert_eq!(feed, [keys[2].clone(), keys[1].clone()]);
}

#[tokio::test]
async fn sessions_do_not_share_state() {
    let store = MemoryStore::new();
    let (first, mut first_rx) = DashboardSession::open(&store, &SyncConfig::default())
        .await
        .unwrap();

    append_alert(&store, &fall_alert()).await.unwrap();
    next_matching(&mut first_rx, |u| matches!(u, DashboardUpdate::AlertFeed { .. })).await;

    // A dashboard opened later starts with an empty feed.
    let (second, _second_rx) = DashboardSession::open(&store, &SyncConfig::default())
        .await
        .unwrap();
    assert_eq!(first.feed().len(), 1);
    assert!(second.feed().is_empty());
}

#[tokio::test]
async fn close_is_idempotent_and_stops_delivery() {
    let store = MemoryStore::new();
    let (session, mut rx) = DashboardSession::open(&store, &SyncConfig::default())
        .await
        .unwrap();

    session.close();
    session.close();
    assert!(session.is_closed());

    append_alert(&store, &fall_alert()).await.unwrap();

    // Drain whatever was delivered before the close; nothing new arrives
    // and the channel closes once every delivery task has exited.
    let drained = tokio::time::timeout(WAIT, async {
        let mut feed_updates = 0;
        while let Some(update) = rx.recv().await {
            if matches!(update, DashboardUpdate::AlertFeed { .. }) {
                feed_updates += 1;
            }
        }
        feed_updates
    })
    .await
    .expect("channel should close after teardown");
    assert_eq!(drained, 0);
    assert!(session.feed().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn nothing_is_sent_after_close_returns() {
    let store = std::sync::Arc::new(MemoryStore::new());
    let (session, mut rx) = DashboardSession::open(store.as_ref(), &SyncConfig::default())
        .await
        .unwrap();

    let writer = {
        let store = std::sync::Arc::clone(&store);
        tokio::spawn(async move {
            for _ in 0..200 {
                append_alert(store.as_ref(), &fall_alert()).await.unwrap();
                tokio::task::yield_now().await;
            }
        })
    };

    // Close in the middle of the burst.
    next_matching(&mut rx, |u| matches!(u, DashboardUpdate::AlertFeed { .. })).await;
    session.close();

    // Everything already queued was sent before close returned.
    while rx.try_recv().is_ok() {}

    writer.await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(rx.try_recv().is_err());
}
