use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use turf_core::memory::{InMemoryCatalog, InMemoryDirectory, InMemoryHoldStore, InMemoryLedger, RecordingNotifier};
use turf_core::{BookingStatus, CatalogEntry, Facility, Party, ReservationError, Role, Slot};
use turf_reservation::{
    Backends, BookingOutcome, CheckoutRequest, RejectReason, ReservationRules, ReservationService, ReserveOutcome,
};
use uuid::Uuid;

struct Fixture {
    service: Arc<ReservationService>,
    ledger: Arc<InMemoryLedger>,
    holds: Arc<InMemoryHoldStore>,
    notifier: Arc<RecordingNotifier>,
    facility_id: Uuid,
    owner_id: Uuid,
    customer_a: Uuid,
    customer_b: Uuid,
}

fn t(h: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, 0, 0).unwrap()
}

fn oct31() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 10, 31).unwrap()
}

fn nov7() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 11, 7).unwrap()
}

fn slot(date: NaiveDate, h: u32) -> Slot {
    Slot::new(date, t(h), t(h + 1))
}

/// The day before the first test date, early morning.
fn morning() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 10, 30, 8, 0, 0).unwrap()
}

fn fixture_with(notifier: RecordingNotifier) -> Fixture {
    let catalog = Arc::new(InMemoryCatalog::new());
    let directory = Arc::new(InMemoryDirectory::new());
    let ledger = Arc::new(InMemoryLedger::new());
    let holds = Arc::new(InMemoryHoldStore::new());
    let notifier = Arc::new(notifier);

    let owner_id = Uuid::new_v4();
    let customer_a = Uuid::new_v4();
    let customer_b = Uuid::new_v4();
    directory.insert(Party::new(owner_id, Role::Owner, "Greenfield Owner"));
    directory.insert(Party::new(customer_a, Role::Customer, "Asha"));
    directory.insert(Party::new(customer_b, Role::Customer, "Bilal"));

    let facility_id = Uuid::new_v4();
    let weekday = oct31().weekday();
    catalog.insert(Facility {
        id: facility_id,
        owner_id,
        name: "Greenfield Arena".to_string(),
        entries: (17..22)
            .map(|h| CatalogEntry::Recurring { day_of_week: weekday, start_time: t(h), end_time: t(h + 1) })
            .chain(std::iter::once(CatalogEntry::Recurring {
                day_of_week: weekday,
                start_time: t(18),
                end_time: t(19),
            }))
            .collect(),
    });

    let service = Arc::new(ReservationService::new(
        Backends {
            catalog,
            ledger: ledger.clone(),
            holds: holds.clone(),
            directory,
            notifier: notifier.clone(),
        },
        ReservationRules::default(),
    ));

    Fixture { service, ledger, holds, notifier, facility_id, owner_id, customer_a, customer_b }
}

fn fixture() -> Fixture {
    fixture_with(RecordingNotifier::new())
}

fn checkout(f: &Fixture, customer_id: Uuid, slots: Vec<Slot>, total_amount: i64) -> CheckoutRequest {
    CheckoutRequest {
        facility_id: f.facility_id,
        customer_id,
        owner_id: f.owner_id,
        slots,
        total_amount,
        payment_ref: "https://files.example/receipts/upi-0001.png".to_string(),
    }
}

#[tokio::test]
async fn availability_lists_deduplicated_sorted_slots() {
    let f = fixture();
    let view = f.service.availability(f.facility_id, oct31(), None, morning()).await.unwrap();

    let starts: Vec<NaiveTime> = view.iter().map(|s| s.slot.start_time).collect();
    assert_eq!(starts, vec![t(17), t(18), t(19), t(20), t(21)]);
    assert!(view.iter().all(|s| !s.is_booked && !s.is_held));
}

#[tokio::test]
async fn availability_for_unknown_facility_is_not_found() {
    let f = fixture();
    let err = f.service.availability(Uuid::new_v4(), oct31(), None, morning()).await.unwrap_err();
    assert!(matches!(err, ReservationError::NotFound(_)));
}

#[tokio::test]
async fn availability_drops_elapsed_slots_today_and_past_dates() {
    let f = fixture();
    let evening = Utc.with_ymd_and_hms(2025, 10, 31, 18, 30, 0).unwrap();

    let view = f.service.availability(f.facility_id, oct31(), None, evening).await.unwrap();
    let starts: Vec<NaiveTime> = view.iter().map(|s| s.slot.start_time).collect();
    assert_eq!(starts, vec![t(19), t(20), t(21)]);

    let next_day = evening + Duration::days(1);
    assert!(f.service.availability(f.facility_id, oct31(), None, next_day).await.unwrap().is_empty());
}

#[tokio::test]
async fn booking_one_date_leaves_the_same_weekday_next_week_available() {
    let f = fixture();
    let outcome = f
        .service
        .create_booking(checkout(&f, f.customer_a, vec![slot(oct31(), 18)], 1500), morning())
        .await
        .unwrap();
    assert!(matches!(outcome, BookingOutcome::Created(_)));

    let this_week = f.service.availability(f.facility_id, oct31(), None, morning()).await.unwrap();
    let booked: Vec<&Slot> = this_week.iter().filter(|s| s.is_booked).map(|s| &s.slot).collect();
    assert_eq!(booked, vec![&slot(oct31(), 18)]);

    let next_week = f.service.availability(f.facility_id, nov7(), None, morning()).await.unwrap();
    assert!(next_week.iter().all(|s| !s.is_booked));
}

#[tokio::test]
async fn verify_reports_only_conflicting_slots() {
    let f = fixture();
    f.service
        .create_booking(checkout(&f, f.customer_a, vec![slot(oct31(), 19)], 1000), morning())
        .await
        .unwrap();

    let outcome = f
        .service
        .verify(f.facility_id, &[slot(oct31(), 18), slot(oct31(), 19)])
        .await
        .unwrap();
    assert!(!outcome.available);
    assert_eq!(outcome.conflicts, vec![slot(oct31(), 19)]);

    let clear = f.service.verify(f.facility_id, &[slot(nov7(), 19)]).await.unwrap();
    assert!(clear.available);
}

#[tokio::test]
async fn verify_rejects_bad_selections_before_touching_the_ledger() {
    let f = fixture();
    let empty = f.service.verify(f.facility_id, &[]).await.unwrap_err();
    assert!(matches!(empty, ReservationError::Validation(_)));

    let not_offered = Slot::new(oct31(), t(6), t(7));
    let err = f.service.verify(f.facility_id, &[not_offered]).await.unwrap_err();
    assert!(matches!(err, ReservationError::Validation(_)));
}

#[tokio::test]
async fn expired_hold_does_not_block_another_customer() {
    let f = fixture();
    let t0 = morning();
    let held = f.service.reserve(f.facility_id, f.customer_a, &[slot(oct31(), 18)], t0).await.unwrap();
    assert!(matches!(held, ReserveOutcome::Held { .. }));

    let still_live = t0 + Duration::seconds(600);
    let blocked = f.service.reserve(f.facility_id, f.customer_b, &[slot(oct31(), 18)], still_live).await.unwrap();
    assert!(matches!(blocked, ReserveOutcome::HoldContention(_)));

    let lapsed = t0 + Duration::seconds(601);
    let taken = f.service.reserve(f.facility_id, f.customer_b, &[slot(oct31(), 18)], lapsed).await.unwrap();
    match taken {
        ReserveOutcome::Held { expires_at, .. } => assert_eq!(expires_at, lapsed + Duration::seconds(600)),
        other => panic!("expected hold, got {:?}", other),
    }
}

#[tokio::test]
async fn reserve_is_all_or_nothing() {
    let f = fixture();
    let now = morning();
    f.service.reserve(f.facility_id, f.customer_a, &[slot(oct31(), 19)], now).await.unwrap();

    let outcome = f
        .service
        .reserve(f.facility_id, f.customer_b, &[slot(oct31(), 18), slot(oct31(), 19)], now)
        .await
        .unwrap();
    match outcome {
        ReserveOutcome::HoldContention(rejections) => {
            assert_eq!(rejections.len(), 1);
            assert_eq!(rejections[0].slot, slot(oct31(), 19));
            assert!(matches!(rejections[0].reason, RejectReason::Held { .. }));
        }
        other => panic!("expected contention, got {:?}", other),
    }
    // B was not left holding 18:00.
    assert_eq!(f.holds.stored(), 1);
}

#[tokio::test]
async fn reserve_on_booked_slot_is_a_conflict_not_contention() {
    let f = fixture();
    f.service
        .create_booking(checkout(&f, f.customer_a, vec![slot(oct31(), 20)], 800), morning())
        .await
        .unwrap();

    let outcome = f.service.reserve(f.facility_id, f.customer_b, &[slot(oct31(), 20)], morning()).await.unwrap();
    match outcome {
        ReserveOutcome::SlotConflict(rejections) => {
            assert_eq!(rejections.len(), 1);
            assert_eq!(rejections[0].reason, RejectReason::Booked);
        }
        other => panic!("expected conflict, got {:?}", other),
    }
}

#[tokio::test]
async fn reserve_refuses_a_slot_that_already_started() {
    let f = fixture();
    let during = Utc.with_ymd_and_hms(2025, 10, 31, 18, 5, 0).unwrap();
    let err = f.service.reserve(f.facility_id, f.customer_a, &[slot(oct31(), 18)], during).await.unwrap_err();
    assert!(matches!(err, ReservationError::Validation(_)));
}

#[tokio::test]
async fn checkout_refuses_a_slot_that_already_started() {
    let f = fixture();
    let during = Utc.with_ymd_and_hms(2025, 10, 31, 18, 5, 0).unwrap();
    let err = f
        .service
        .create_booking(checkout(&f, f.customer_a, vec![slot(oct31(), 18), slot(oct31(), 19)], 1000), during)
        .await
        .unwrap_err();
    assert!(matches!(err, ReservationError::Validation(_)));
    assert!(f.ledger.is_empty());
}

#[tokio::test]
async fn release_only_touches_the_callers_holds() {
    let f = fixture();
    let now = morning();
    f.service.reserve(f.facility_id, f.customer_a, &[slot(oct31(), 17), slot(oct31(), 18)], now).await.unwrap();
    f.service.reserve(f.facility_id, f.customer_b, &[slot(oct31(), 19)], now).await.unwrap();

    assert_eq!(f.service.release(f.facility_id, f.customer_a).await.unwrap(), 2);
    assert_eq!(f.service.release(f.facility_id, f.customer_a).await.unwrap(), 0);

    let blocked = f.service.reserve(f.facility_id, f.customer_a, &[slot(oct31(), 19)], now).await.unwrap();
    assert!(matches!(blocked, ReserveOutcome::HoldContention(_)));
}

#[tokio::test]
async fn batch_with_one_conflicted_slot_creates_nothing() {
    let f = fixture();
    f.service
        .create_booking(checkout(&f, f.customer_b, vec![slot(oct31(), 18)], 500), morning())
        .await
        .unwrap();
    let before = f.ledger.len();

    let outcome = f
        .service
        .create_booking(
            checkout(&f, f.customer_a, vec![slot(oct31(), 17), slot(oct31(), 18), slot(oct31(), 19)], 1500),
            morning(),
        )
        .await
        .unwrap();

    assert_eq!(outcome, BookingOutcome::SlotConflict(vec![slot(oct31(), 18)]));
    assert_eq!(f.ledger.len(), before);
    assert!(f.service.bookings_for(f.customer_a).await.unwrap().is_empty());
}

#[tokio::test]
async fn total_amount_is_split_exactly() {
    let f = fixture();
    let slots = vec![slot(oct31(), 17), slot(oct31(), 18), slot(oct31(), 19)];
    let outcome = f.service.create_booking(checkout(&f, f.customer_a, slots.clone(), 300), morning()).await.unwrap();

    let BookingOutcome::Created(bookings) = outcome else {
        panic!("expected bookings");
    };
    assert_eq!(bookings.len(), 3);
    assert_eq!(bookings.iter().map(|b| b.amount).sum::<i64>(), 300);
    assert!(bookings.iter().all(|b| b.status == BookingStatus::Pending));
    assert!(bookings.iter().all(|b| b.payment_ref.expose() == "https://files.example/receipts/upi-0001.png"));

    let uneven = f
        .service
        .create_booking(checkout(&f, f.customer_a, vec![slot(nov7(), 17), slot(nov7(), 18)], 1001), morning())
        .await
        .unwrap();
    let BookingOutcome::Created(bookings) = uneven else {
        panic!("expected bookings");
    };
    assert_eq!(bookings[0].amount, 501);
    assert_eq!(bookings[1].amount, 500);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_checkouts_for_one_slot_admit_exactly_one() {
    let f = fixture();
    let a = f.service.clone();
    let b = f.service.clone();
    let req_a = checkout(&f, f.customer_a, vec![slot(oct31(), 21)], 900);
    let req_b = checkout(&f, f.customer_b, vec![slot(oct31(), 21)], 900);

    let (ra, rb) = tokio::join!(
        tokio::spawn(async move { a.create_booking(req_a, morning()).await }),
        tokio::spawn(async move { b.create_booking(req_b, morning()).await }),
    );
    let outcomes = [ra.unwrap().unwrap(), rb.unwrap().unwrap()];

    let created = outcomes.iter().filter(|o| matches!(o, BookingOutcome::Created(_))).count();
    let conflicted = outcomes.iter().filter(|o| matches!(o, BookingOutcome::SlotConflict(_))).count();
    assert_eq!(created, 1);
    assert_eq!(conflicted, 1);
    assert_eq!(f.ledger.len(), 1);
}

#[tokio::test]
async fn storage_failure_leaves_the_ledger_untouched() {
    let f = fixture();
    f.ledger.fail_next_insert();

    let err = f
        .service
        .create_booking(checkout(&f, f.customer_a, vec![slot(oct31(), 17), slot(oct31(), 18)], 200), morning())
        .await
        .unwrap_err();
    assert!(matches!(err, ReservationError::Storage(_)));
    assert!(f.ledger.is_empty());
}

#[tokio::test]
async fn checkout_is_blocked_by_another_customers_live_hold() {
    let f = fixture();
    f.service.reserve(f.facility_id, f.customer_b, &[slot(oct31(), 18)], morning()).await.unwrap();

    let outcome = f
        .service
        .create_booking(checkout(&f, f.customer_a, vec![slot(oct31(), 18)], 500), morning())
        .await
        .unwrap();
    assert!(matches!(outcome, BookingOutcome::HoldContention(_)));
    assert!(f.ledger.is_empty());
}

#[tokio::test]
async fn checkout_clears_all_of_the_customers_holds_on_the_facility() {
    let f = fixture();
    let now = morning();
    f.service.reserve(f.facility_id, f.customer_a, &[slot(oct31(), 18), slot(oct31(), 20)], now).await.unwrap();
    f.service.reserve(f.facility_id, f.customer_b, &[slot(oct31(), 21)], now).await.unwrap();

    f.service
        .create_booking(checkout(&f, f.customer_a, vec![slot(oct31(), 18)], 500), now)
        .await
        .unwrap();

    // A's untouched 20:00 hold went too; B's stayed.
    assert_eq!(f.holds.stored(), 1);
}

#[tokio::test]
async fn checkout_validates_parties_and_amount() {
    let f = fixture();

    let mut wrong_owner = checkout(&f, f.customer_a, vec![slot(oct31(), 18)], 500);
    wrong_owner.owner_id = f.customer_b;
    let err = f.service.create_booking(wrong_owner, morning()).await.unwrap_err();
    assert!(matches!(err, ReservationError::Validation(_)));

    let stranger = checkout(&f, Uuid::new_v4(), vec![slot(oct31(), 18)], 500);
    let err = f.service.create_booking(stranger, morning()).await.unwrap_err();
    assert!(matches!(err, ReservationError::NotFound(_)));

    let negative = checkout(&f, f.customer_a, vec![slot(oct31(), 18)], -1);
    let err = f.service.create_booking(negative, morning()).await.unwrap_err();
    assert!(matches!(err, ReservationError::Validation(_)));

    assert!(f.ledger.is_empty());
}

#[tokio::test]
async fn notification_failure_does_not_fail_the_booking() {
    let f = fixture_with(RecordingNotifier::failing());
    let outcome = f
        .service
        .create_booking(checkout(&f, f.customer_a, vec![slot(oct31(), 18)], 500), morning())
        .await
        .unwrap();
    assert_eq!(outcome.booking_ids().len(), 1);
}

#[tokio::test]
async fn owner_is_notified_with_a_summary() {
    let f = fixture();
    f.service
        .create_booking(checkout(&f, f.customer_a, vec![slot(oct31(), 17), slot(oct31(), 18)], 700), morning())
        .await
        .unwrap();

    for _ in 0..50 {
        if !f.notifier.events().is_empty() {
            break;
        }
        tokio::task::yield_now().await;
    }
    let events = f.notifier.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].owner_id, f.owner_id);
    assert_eq!(events[0].lines.len(), 2);
    assert_eq!(events[0].total_amount, 700);
}

#[tokio::test]
async fn rejected_booking_frees_the_slot() {
    let f = fixture();
    let outcome = f
        .service
        .create_booking(checkout(&f, f.customer_a, vec![slot(oct31(), 18)], 500), morning())
        .await
        .unwrap();
    let booking_id = outcome.booking_ids()[0];

    let stranger = f.service.update_status(booking_id, Uuid::new_v4(), BookingStatus::Rejected).await.unwrap_err();
    assert!(matches!(stranger, ReservationError::NotFound(_)));

    let rejected = f.service.update_status(booking_id, f.owner_id, BookingStatus::Rejected).await.unwrap();
    assert_eq!(rejected.status, BookingStatus::Rejected);

    let again = f.service.update_status(booking_id, f.owner_id, BookingStatus::Confirmed).await.unwrap_err();
    assert!(matches!(again, ReservationError::Validation(_)));

    let verify = f.service.verify(f.facility_id, &[slot(oct31(), 18)]).await.unwrap();
    assert!(verify.available);
}

#[tokio::test]
async fn scenario_hold_contention_then_booking_then_booked_view() {
    let f = fixture();
    let now = morning();
    let target = slot(oct31(), 18);

    let view = f.service.availability(f.facility_id, oct31(), Some(f.customer_a), now).await.unwrap();
    assert!(view.iter().any(|s| s.slot == target && !s.is_booked));

    let a_hold = f.service.reserve(f.facility_id, f.customer_a, &[target], now).await.unwrap();
    assert!(matches!(a_hold, ReserveOutcome::Held { .. }));

    let b_hold = f.service.reserve(f.facility_id, f.customer_b, &[target], now).await.unwrap();
    assert!(matches!(b_hold, ReserveOutcome::HoldContention(_)));

    let b_view = f.service.availability(f.facility_id, oct31(), Some(f.customer_b), now).await.unwrap();
    assert!(b_view.iter().any(|s| s.slot == target && s.is_held && !s.is_booked));

    let paid = now + Duration::minutes(4);
    let outcome = f.service.create_booking(checkout(&f, f.customer_a, vec![target], 1200), paid).await.unwrap();
    let BookingOutcome::Created(bookings) = outcome else {
        panic!("expected bookings");
    };
    assert_eq!(bookings.len(), 1);
    assert_eq!(bookings[0].status, BookingStatus::Pending);

    let after = f.service.availability(f.facility_id, oct31(), Some(f.customer_b), paid).await.unwrap();
    assert!(after.iter().any(|s| s.slot == target && s.is_booked));
}

#[tokio::test]
async fn purge_is_housekeeping_only() {
    let f = fixture();
    let t0 = morning();
    f.service.reserve(f.facility_id, f.customer_a, &[slot(oct31(), 18)], t0).await.unwrap();

    assert_eq!(f.service.purge_expired_holds(t0 + Duration::seconds(30)).await.unwrap(), 0);
    assert_eq!(f.service.purge_expired_holds(t0 + Duration::seconds(601)).await.unwrap(), 1);
    assert_eq!(f.holds.stored(), 0);
}
