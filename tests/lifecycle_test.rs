//! Integration tests for tab visibility, the extend sweep, and the reaper.

mod helpers;

use std::sync::Arc;

use chrono::Duration;
use tokio::sync::broadcast::error::TryRecvError;

use boleteria_core::config::locks::LocksConfig;
use boleteria_core::events::LifecycleSignal;
use boleteria_core::traits::clock::Clock;
use boleteria_database::LockTable;
use boleteria_entity::lock::LockStatus;
use boleteria_service::{CartEvent, CoordinatorEvent, ToggleOutcome};
use boleteria_worker::{ExpirySweep, SweepReport};

use helpers::{FUNCTION, TestVenue, orchestra_seat};

fn reaper_for(venue: &TestVenue) -> ExpirySweep {
    ExpirySweep::new(
        Arc::clone(&venue.table) as Arc<dyn LockTable>,
        Arc::clone(&venue.clock) as Arc<dyn Clock>,
        &LocksConfig::default(),
    )
}

#[tokio::test]
async fn test_hidden_releases_and_visible_reclaims() {
    let venue = TestVenue::new();
    let alice = venue.visitor();

    alice.cart.toggle_item(orchestra_seat("A1", 450.0)).await;
    assert_eq!(venue.table.row_count().await, 1);

    // Backgrounding the tab frees the seats but keeps the cart contents.
    alice
        .lifecycle
        .handle_signal(LifecycleSignal::Hidden)
        .await;
    assert_eq!(venue.table.row_count().await, 0);
    assert_eq!(alice.cart.item_count().await, 1);

    let mut events = alice.lifecycle.subscribe();
    alice
        .lifecycle
        .handle_signal(LifecycleSignal::Visible)
        .await;
    assert_eq!(venue.table.row_count().await, 1);
    // Everything came back, so there is nothing to report.
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test]
async fn test_seats_lost_while_hidden_are_reported() {
    let venue = TestVenue::new();
    let alice = venue.visitor();
    let bruno = venue.visitor();

    alice.cart.toggle_item(orchestra_seat("B1", 450.0)).await;
    alice
        .lifecycle
        .handle_signal(LifecycleSignal::Hidden)
        .await;

    // Bruno grabs the freed seat before Alice comes back.
    assert_eq!(
        bruno.cart.toggle_item(orchestra_seat("B1", 450.0)).await,
        ToggleOutcome::Added
    );

    let mut events = alice.lifecycle.subscribe();
    let mut cart_events = alice.cart.subscribe();
    alice
        .lifecycle
        .handle_signal(LifecycleSignal::Visible)
        .await;

    match events.recv().await.unwrap() {
        CoordinatorEvent::SeatsLost(lost) => {
            assert_eq!(lost.len(), 1);
            assert_eq!(lost[0].seat_id.as_str(), "B1");
        }
        other => panic!("expected lost seats, got {other:?}"),
    }
    // The cart reports the removal too, for listeners that only follow it.
    assert_eq!(
        helpers::next_change(&mut cart_events).await,
        CartEvent::ItemRemoved {
            seat_id: "B1".into()
        }
    );
    assert!(alice.cart.is_empty().await);
}

#[tokio::test]
async fn test_unload_prompt_only_with_seats_at_stake() {
    let venue = TestVenue::new();
    let alice = venue.visitor();
    let mut events = alice.lifecycle.subscribe();

    alice
        .lifecycle
        .handle_signal(LifecycleSignal::BeforeUnload)
        .await;
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));

    alice.cart.toggle_item(orchestra_seat("C1", 450.0)).await;
    alice
        .lifecycle
        .handle_signal(LifecycleSignal::BeforeUnload)
        .await;
    assert!(matches!(
        events.recv().await.unwrap(),
        CoordinatorEvent::ConfirmExit
    ));
}

#[tokio::test]
async fn test_teardown_releases_held_seats() {
    let venue = TestVenue::new();
    let alice = venue.visitor();

    alice.cart.toggle_item(orchestra_seat("D1", 450.0)).await;
    alice.lifecycle.start_extend_sweep().await;

    alice
        .lifecycle
        .handle_signal(LifecycleSignal::Teardown)
        .await;
    assert_eq!(venue.table.row_count().await, 0);
}

#[tokio::test(start_paused = true)]
async fn test_extend_sweep_outruns_the_reaper() {
    let venue = TestVenue::new();
    let alice = venue.visitor();

    alice.cart.toggle_item(orchestra_seat("E1", 450.0)).await;
    alice.lifecycle.start_extend_sweep().await;

    // Twelve minutes pass, two minutes beyond the original hold, with the
    // four-minute sweep refreshing the lock along the way.
    for _ in 0..3 {
        venue.advance(Duration::minutes(4));
        tokio::time::sleep(std::time::Duration::from_secs(250)).await;
    }

    let report = reaper_for(&venue).run_once().await.unwrap();
    assert_eq!(report, SweepReport::default());

    let row = venue
        .table
        .find(&orchestra_seat("E1", 450.0).resource(), FUNCTION)
        .await
        .unwrap()
        .expect("lock row should have outlived the reaper");
    assert_eq!(row.session_id, alice.identity.resolve().await);
    assert!(row.expires_at > venue.clock.now());
}

#[tokio::test]
async fn test_reaper_warns_before_reaping() {
    let venue = TestVenue::new();
    let alice = venue.visitor();
    let reaper = reaper_for(&venue);

    alice.cart.toggle_item(orchestra_seat("F1", 450.0)).await;

    // One minute left on the hold: flagged, not yet deleted.
    venue.advance(Duration::minutes(9));
    let report = reaper.run_once().await.unwrap();
    assert_eq!(report.marked, 1);
    assert_eq!(report.reaped, 0);
    let row = venue
        .table
        .find(&orchestra_seat("F1", 450.0).resource(), FUNCTION)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.status, LockStatus::Expiring);

    // Past the hold: gone.
    venue.advance(Duration::minutes(2));
    let report = reaper.run_once().await.unwrap();
    assert_eq!(report.reaped, 1);
    assert_eq!(venue.table.row_count().await, 0);
}

#[tokio::test]
async fn test_reaper_reclaims_abandoned_seats() {
    let venue = TestVenue::new();
    let alice = venue.visitor();
    let bruno = venue.visitor();

    alice.cart.toggle_item(orchestra_seat("G1", 450.0)).await;

    // Alice's session vanishes without releasing anything.
    venue.advance(Duration::minutes(11));
    let report = reaper_for(&venue).run_once().await.unwrap();
    assert_eq!(report.reaped, 1);

    assert_eq!(
        bruno.cart.toggle_item(orchestra_seat("G1", 450.0)).await,
        ToggleOutcome::Added
    );
}
