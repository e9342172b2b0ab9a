//! Lending scenarios against the in-memory store

mod common;

use chrono::Duration;
use libris_server::{
    models::{AdminLoanUpdate, LoanQuery, LoanStatus, PatronStatus, ShelfStatus},
    AppError,
};
use rust_decimal::Decimal;
use tokio_test::{assert_err, assert_ok};

use common::{start, Fixture};

#[tokio::test]
async fn test_late_return_is_fined_per_whole_day() {
    let fx = Fixture::new();
    let patron = fx.patron("ged").await;
    let item = fx.item("9780547773742", 3).await;

    let loan = assert_ok!(fx.services.lending.borrow_item(patron.id, item.id).await);
    assert_eq!(loan.due_at, start() + Duration::days(30));
    assert_eq!(fx.reload(&item).await.available, 2);

    fx.clock.advance(Duration::days(30) + Duration::hours(72));
    let returned = assert_ok!(fx.services.lending.return_item(patron.id, item.id).await);

    assert_eq!(returned.status, LoanStatus::Returned);
    assert_eq!(returned.returned_at, Some(start() + Duration::hours(30 * 24 + 72)));
    assert_eq!(returned.fine, Decimal::new(150, 2));
    assert_eq!(fx.reload(&item).await.available, 3);
}

#[tokio::test]
async fn test_on_time_return_has_no_fine() {
    let fx = Fixture::new();
    let patron = fx.patron("tenar").await;
    let item = fx.item("9780547773742", 1).await;

    assert_ok!(fx.services.lending.borrow_item(patron.id, item.id).await);
    fx.clock.advance(Duration::days(12));
    let returned = assert_ok!(fx.services.lending.return_item(patron.id, item.id).await);

    assert_eq!(returned.fine, Decimal::ZERO);
}

#[tokio::test]
async fn test_renewal_moves_the_due_date() {
    let fx = Fixture::new();
    let patron = fx.patron("ogion").await;
    let item = fx.item("9780547773742", 1).await;

    let loan = assert_ok!(fx.services.lending.borrow_item(patron.id, item.id).await);

    fx.clock.advance(Duration::days(20));
    let renewed = assert_ok!(fx.services.lending.renew_loan(loan.id).await);
    assert_eq!(renewed.due_at, start() + Duration::days(50));
    assert_eq!(renewed.renew_count, 1);
    assert_eq!(renewed.status, LoanStatus::Active);

    // Ten days past the renewed due date
    fx.clock.advance(Duration::days(40));
    let returned = assert_ok!(fx.services.lending.return_item(patron.id, item.id).await);
    assert_eq!(returned.fine, Decimal::new(500, 2));

    let err = assert_err!(fx.services.lending.renew_loan(loan.id).await);
    assert!(matches!(err, AppError::NotBorrowed(_)));
}

#[tokio::test]
async fn test_return_after_renewal_within_new_period_is_free() {
    let fx = Fixture::new();
    let patron = fx.patron("lebannen").await;
    let item = fx.item("9780547773742", 1).await;

    let loan = assert_ok!(fx.services.lending.borrow_item(patron.id, item.id).await);
    fx.clock.advance(Duration::days(25));
    assert_ok!(fx.services.lending.renew_loan(loan.id).await);

    // Past the original due date, before the renewed one
    fx.clock.advance(Duration::days(20));
    let returned = assert_ok!(fx.services.lending.return_item(patron.id, item.id).await);

    assert!(returned.returned_at.unwrap() > loan.due_at);
    assert_eq!(returned.fine, Decimal::ZERO);
    assert_eq!(returned.status, LoanStatus::Returned);
    assert_eq!(fx.reload(&item).await.available, 1);
}

#[tokio::test]
async fn test_renew_unknown_loan() {
    let fx = Fixture::new();
    let err = assert_err!(fx.services.lending.renew_loan(404).await);
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_duplicate_borrow_is_rejected() {
    let fx = Fixture::new();
    let patron = fx.patron("vetch").await;
    let item = fx.item("9780547773742", 2).await;

    assert_ok!(fx.services.lending.borrow_item(patron.id, item.id).await);
    let err = assert_err!(fx.services.lending.borrow_item(patron.id, item.id).await);

    assert!(matches!(err, AppError::AlreadyExists(_)));
    assert_eq!(fx.reload(&item).await.available, 1);
}

#[tokio::test]
async fn test_borrow_preconditions() {
    let fx = Fixture::new();
    let patron = fx.patron("jasper").await;
    let item = fx.item("9780547773742", 1).await;

    let err = assert_err!(fx.services.lending.borrow_item(patron.id, item.id + 50).await);
    assert!(matches!(err, AppError::NotFound(_)));

    assert_ok!(
        fx.services
            .catalog
            .set_shelf_status(item.id, ShelfStatus::OffShelf)
            .await
    );
    let err = assert_err!(fx.services.lending.borrow_item(patron.id, item.id).await);
    assert!(matches!(err, AppError::ItemUnavailable(_)));

    assert_ok!(
        fx.services
            .catalog
            .set_shelf_status(item.id, ShelfStatus::OnShelf)
            .await
    );
    fx.store.set_patron_status(patron.id, PatronStatus::Disabled).await;
    let err = assert_err!(fx.services.lending.borrow_item(patron.id, item.id).await);
    assert!(matches!(err, AppError::PermissionDenied(_)));

    assert_eq!(fx.reload(&item).await.available, 1);
}

#[tokio::test]
async fn test_return_distinguishes_missing_and_closed_loans() {
    let fx = Fixture::new();
    let patron = fx.patron("yarrow").await;
    let item = fx.item("9780547773742", 1).await;

    let err = assert_err!(fx.services.lending.return_item(patron.id, item.id).await);
    assert!(matches!(err, AppError::NotFound(_)));

    assert_ok!(fx.services.lending.borrow_item(patron.id, item.id).await);
    assert_ok!(fx.services.lending.return_item(patron.id, item.id).await);

    let err = assert_err!(fx.services.lending.return_item(patron.id, item.id).await);
    assert!(matches!(err, AppError::NotBorrowed(_)));
    assert_eq!(fx.reload(&item).await.available, 1);
}

#[tokio::test]
async fn test_item_can_be_borrowed_again_after_return() {
    let fx = Fixture::new();
    let patron = fx.patron("murre").await;
    let item = fx.item("9780547773742", 1).await;

    assert_ok!(fx.services.lending.borrow_item(patron.id, item.id).await);
    assert_ok!(fx.services.lending.return_item(patron.id, item.id).await);
    fx.clock.advance(Duration::hours(1));
    let again = assert_ok!(fx.services.lending.borrow_item(patron.id, item.id).await);

    let loans = assert_ok!(fx.services.lending.list_patron_loans(patron.id, None).await);
    assert_eq!(loans.len(), 2);
    assert_eq!(loans[0].id, again.id);

    let active = assert_ok!(
        fx.services
            .lending
            .list_patron_loans(patron.id, Some(LoanStatus::Active))
            .await
    );
    assert_eq!(active.len(), 1);
}

#[tokio::test]
async fn test_counters_match_active_loans() {
    let fx = Fixture::new();
    let item = fx.item("9780547773742", 4).await;
    let mut patrons = Vec::new();
    for name in ["a", "b", "c", "d"] {
        patrons.push(fx.patron(name).await);
    }

    for patron in &patrons {
        assert_ok!(fx.services.lending.borrow_item(patron.id, item.id).await);
    }
    assert_ok!(fx.services.lending.return_item(patrons[1].id, item.id).await);
    assert_ok!(fx.services.lending.return_item(patrons[3].id, item.id).await);

    let query = LoanQuery {
        item_id: Some(item.id),
        status: Some(LoanStatus::Active),
        ..Default::default()
    };
    let (_, active) = assert_ok!(fx.services.lending.list_loans(&query).await);
    let item = fx.reload(&item).await;

    assert_eq!(active, 2);
    assert_eq!(item.available + active as i32, item.total);
}

#[tokio::test]
async fn test_loan_search_rejects_inverted_date_range() {
    let fx = Fixture::new();
    let patron = fx.patron("idaho").await;
    let item = fx.item("9780547773742", 1).await;
    assert_ok!(fx.services.lending.borrow_item(patron.id, item.id).await);

    let inverted = LoanQuery {
        borrowed_from: Some(start() + Duration::days(1)),
        borrowed_to: Some(start()),
        ..Default::default()
    };
    let err = assert_err!(fx.services.lending.list_loans(&inverted).await);
    assert!(matches!(err, AppError::BadRequest(_)));

    let same_instant = LoanQuery {
        borrowed_from: Some(start()),
        borrowed_to: Some(start()),
        ..Default::default()
    };
    let (loans, total) = assert_ok!(fx.services.lending.list_loans(&same_instant).await);
    assert_eq!(total, 1);
    assert_eq!(loans[0].item_id, item.id);
}

#[tokio::test]
async fn test_overdue_is_derived_at_read_time() {
    let fx = Fixture::new();
    let patron = fx.patron("serret").await;
    let early = fx.item("9780547773742", 1).await;
    let late = fx.item("9780689845369", 1).await;

    assert_ok!(fx.services.lending.borrow_item(patron.id, early.id).await);
    fx.clock.advance(Duration::days(5));
    assert_ok!(fx.services.lending.borrow_item(patron.id, late.id).await);

    fx.clock.advance(Duration::days(26));
    let overdue = assert_ok!(fx.services.lending.list_overdue_loans().await);
    assert_eq!(overdue.len(), 1);
    assert_eq!(overdue[0].item_id, early.id);
    assert_eq!(overdue[0].status, LoanStatus::Active);

    fx.clock.advance(Duration::days(10));
    let overdue = assert_ok!(fx.services.lending.list_overdue_loans().await);
    assert_eq!(overdue.len(), 2);
}

#[tokio::test]
async fn test_admin_correction_leaves_inventory_alone() {
    let fx = Fixture::new();
    let patron = fx.patron("kalessin").await;
    let item = fx.item("9780547773742", 2).await;
    let loan = assert_ok!(fx.services.lending.borrow_item(patron.id, item.id).await);

    let update = AdminLoanUpdate {
        due_at: start() + Duration::days(7),
        status: LoanStatus::Cancelled,
        fine: Decimal::new(200, 2),
        remark: Some("Lost in transit".to_string()),
    };
    let corrected = assert_ok!(fx.services.lending.admin_update_loan(loan.id, update).await);

    assert_eq!(corrected.status, LoanStatus::Cancelled);
    assert_eq!(corrected.fine, Decimal::new(200, 2));
    assert_eq!(corrected.remark.as_deref(), Some("Lost in transit"));
    assert_eq!(fx.reload(&item).await.available, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_last_copy_goes_to_exactly_one_patron() {
    let fx = Fixture::new();
    let item = fx.item("9780547773742", 1).await;
    let mut patrons = Vec::new();
    for i in 0..8 {
        patrons.push(fx.patron(&format!("racer{i}")).await);
    }

    let handles: Vec<_> = patrons
        .iter()
        .map(|patron| {
            let lending = fx.services.lending.clone();
            let (patron_id, item_id) = (patron.id, item.id);
            tokio::spawn(async move { lending.borrow_item(patron_id, item_id).await })
        })
        .collect();

    let mut granted = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => granted += 1,
            Err(err) => assert!(matches!(err, AppError::ItemUnavailable(_)), "{err:?}"),
        }
    }

    assert_eq!(granted, 1);
    assert_eq!(fx.reload(&item).await.available, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_borrows_of_same_pair_create_one_loan() {
    let fx = Fixture::new();
    let patron = fx.patron("twin").await;
    let item = fx.item("9780547773742", 5).await;

    let handles: Vec<_> = (0..6)
        .map(|_| {
            let lending = fx.services.lending.clone();
            let (patron_id, item_id) = (patron.id, item.id);
            tokio::spawn(async move { lending.borrow_item(patron_id, item_id).await })
        })
        .collect();

    let mut granted = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => granted += 1,
            Err(err) => assert!(matches!(err, AppError::AlreadyExists(_)), "{err:?}"),
        }
    }

    assert_eq!(granted, 1);
    assert_eq!(fx.reload(&item).await.available, 4);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_returns_release_one_copy() {
    let fx = Fixture::new();
    let patron = fx.patron("double").await;
    let item = fx.item("9780547773742", 2).await;
    assert_ok!(fx.services.lending.borrow_item(patron.id, item.id).await);

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let lending = fx.services.lending.clone();
            let (patron_id, item_id) = (patron.id, item.id);
            tokio::spawn(async move { lending.return_item(patron_id, item_id).await })
        })
        .collect();

    let mut returned = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => returned += 1,
            Err(err) => assert!(matches!(err, AppError::NotBorrowed(_)), "{err:?}"),
        }
    }

    assert_eq!(returned, 1);
    assert_eq!(fx.reload(&item).await.available, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_interleaved_borrow_and_return_keep_counters_consistent() {
    let fx = Fixture::new();
    let patron = fx.patron("arren").await;
    let item = fx.item("9780547773742", 2).await;
    assert_ok!(fx.services.lending.borrow_item(patron.id, item.id).await);

    let mut handles = Vec::new();
    for round in 0..10 {
        let lending = fx.services.lending.clone();
        let (patron_id, item_id) = (patron.id, item.id);
        handles.push(tokio::spawn(async move {
            if round % 2 == 0 {
                lending.return_item(patron_id, item_id).await
            } else {
                lending.borrow_item(patron_id, item_id).await
            }
        }));
    }

    for handle in handles {
        if let Err(err) = handle.await.unwrap() {
            assert!(
                matches!(err, AppError::AlreadyExists(_) | AppError::NotBorrowed(_)),
                "{err:?}"
            );
        }
    }

    let query = LoanQuery {
        item_id: Some(item.id),
        status: Some(LoanStatus::Active),
        ..Default::default()
    };
    let (_, active) = assert_ok!(fx.services.lending.list_loans(&query).await);
    let item = fx.reload(&item).await;
    assert!(active <= 1);
    assert_eq!(item.available + active as i32, item.total);
}
