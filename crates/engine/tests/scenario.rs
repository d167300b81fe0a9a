use chrono::{TimeZone, Utc};
use chrono_tz::Tz;
use serde_json::json;

use engine::{
    Aggregator, EngineError, Money, Month, NewExpense, RecordId, RecordStore, SalaryBook, Scope,
    SortOrder, month_summary, sorted, year_totals,
};

mod common;

use common::{cursor, draft, store_with_file_db};

#[tokio::test]
async fn month_totals_follow_salary_and_expenses() {
    let (store, _path) = store_with_file_db().await;
    let january = cursor(0, 2024);

    let mut salary = SalaryBook::load(store.clone(), "alice").await.unwrap();
    salary
        .write_salary(2024, january.month, Money::new(500_000))
        .await
        .unwrap();

    store.insert(draft("alice", "Rent", 200_000, january)).await.unwrap();
    store.insert(draft("alice", "Food", 50_000, january)).await.unwrap();
    store
        .insert(draft("alice", "Ski trip", 90_000, cursor(1, 2024)))
        .await
        .unwrap();

    let records = store.query(&Scope::new("alice", january)).await.unwrap();
    assert_eq!(records.len(), 2);

    let summary = month_summary(&records, salary.map(), january.month, 2024);
    assert_eq!(summary.salary, Money::new(500_000));
    assert_eq!(summary.total_expense, Money::new(250_000));
    assert_eq!(summary.remainder, Money::new(250_000));
    assert!(!summary.is_overspent());

    let february = store
        .query(&Scope::new("alice", cursor(1, 2024)))
        .await
        .unwrap();
    let summary = month_summary(&february, salary.map(), Month::new(1).unwrap(), 2024);
    assert_eq!(summary.remainder, Money::new(-90_000));
    assert_eq!(summary.remainder_clamped(), Money::ZERO);
}

#[tokio::test]
async fn year_rollup_end_to_end() {
    let (store, _path) = store_with_file_db().await;
    let mut salary = SalaryBook::load(store.clone(), "alice").await.unwrap();
    salary
        .write_salary(2024, Month::new(0).unwrap(), Money::new(500_000))
        .await
        .unwrap();
    salary
        .write_salary(2024, Month::new(1).unwrap(), Money::new(300_000))
        .await
        .unwrap();

    for (amount, month) in [(200_000, 0), (50_000, 0), (100_000, 1)] {
        store
            .insert(draft("alice", "Expense", amount, cursor(month, 2024)))
            .await
            .unwrap();
    }
    store
        .insert(draft("bob", "Not counted", 1, cursor(0, 2024)))
        .await
        .unwrap();

    let records = store.owner_records("alice").await.unwrap();
    let series = Aggregator::default().year_series(&records, salary.map(), 2024);

    let expected = [(250_000, 500_000, 250_000), (100_000, 300_000, 200_000)];
    for (entry, (expense, pay, remainder)) in series.iter().zip(expected) {
        assert_eq!(entry.expense, Money::new(expense));
        assert_eq!(entry.salary, Money::new(pay));
        assert_eq!(entry.remainder, Money::new(remainder));
    }
    for entry in &series[2..] {
        assert_eq!(entry.expense, Money::ZERO);
        assert_eq!(entry.salary, Money::ZERO);
        assert_eq!(entry.remainder, Money::ZERO);
    }

    let totals = year_totals(&series);
    assert_eq!(totals.total_salary, Money::new(800_000));
    assert_eq!(totals.total_expense, Money::new(350_000));
    assert_eq!(totals.remainder, Money::new(450_000));
}

#[tokio::test]
async fn year_series_uses_dates_when_scope_fields_are_missing() {
    let (store, _path) = store_with_file_db().await;
    let mut salary = SalaryBook::load(store.clone(), "alice").await.unwrap();
    salary
        .write_salary(2024, Month::new(0).unwrap(), Money::new(1_000))
        .await
        .unwrap();
    salary
        .write_salary(2024, Month::new(11).unwrap(), Money::new(1_000))
        .await
        .unwrap();

    let imported = [
        json!({ "label": "Gift", "amount": 300, "date": "2024-12-24" }),
        json!({ "label": "Books", "amount": "200", "month": 0, "year": 2024 }),
        // 23:30 UTC on Dec 31 is already January in Tokyo.
        json!({ "label": "Late dinner", "amount": 50, "occurredAt": "2024-12-31T23:30:00Z" }),
        json!({ "label": "Lost", "amount": 999 }),
    ];
    for document in &imported {
        store
            .insert(NewExpense::from_document(document, "alice").unwrap())
            .await
            .unwrap();
    }
    let records = store.owner_records("alice").await.unwrap();
    assert_eq!(records.len(), 4);

    let utc = Aggregator::default();
    let series = utc.year_series(&records, salary.map(), 2024);
    assert_eq!(series.len(), 12);
    assert_eq!(series[0].expense, Money::new(200));
    assert_eq!(series[11].expense, Money::new(350));
    assert_eq!(series[11].remainder, Money::new(650));

    let totals = year_totals(&series);
    assert_eq!(totals.total_salary, Money::new(2_000));
    assert_eq!(totals.total_expense, Money::new(550));
    assert_eq!(totals.remainder, Money::new(1_450));
    let breakdown = totals.breakdown();
    assert_eq!(breakdown.remaining, Money::new(1_450));

    let tokyo = Aggregator::new(Tz::Asia__Tokyo);
    let series = tokyo.year_series(&records, salary.map(), 2024);
    assert_eq!(series[11].expense, Money::new(300));
    let next_year = tokyo.monthly_expense_totals(&records, 2025);
    assert_eq!(next_year.get(Month::new(0).unwrap()), Money::new(50));
}

#[tokio::test]
async fn query_orders_newest_first_and_sorting_is_display_only() {
    let (store, _path) = store_with_file_db().await;
    let march = cursor(2, 2024);
    for (label, amount) in [("Rent", 300), ("Food", 20), ("Fuel", 90)] {
        store.insert(draft("alice", label, amount, march)).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }

    let records = store.query(&Scope::new("alice", march)).await.unwrap();
    let labels: Vec<&str> = records.iter().map(|r| r.label.as_str()).collect();
    assert_eq!(labels, vec!["Fuel", "Food", "Rent"]);

    let oldest: Vec<&str> = sorted(&records, SortOrder::Oldest)
        .into_iter()
        .map(|r| r.label.as_str())
        .collect();
    assert_eq!(oldest, vec!["Rent", "Food", "Fuel"]);

    let by_amount: Vec<Money> = sorted(&records, SortOrder::AmountDesc)
        .into_iter()
        .map(|r| r.amount)
        .collect();
    assert_eq!(by_amount, vec![Money::new(300), Money::new(90), Money::new(20)]);

    let before = month_summary(&records, &Default::default(), march.month, 2024);
    let reordered = sorted(&records, SortOrder::AmountAsc);
    let after = month_summary(reordered, &Default::default(), march.month, 2024);
    assert_eq!(before, after);
}

#[tokio::test]
async fn delete_of_unknown_id_fails() {
    let (store, _path) = store_with_file_db().await;
    let err = store.delete(&RecordId::new("nope")).await.unwrap_err();
    assert_eq!(err, EngineError::KeyNotFound("nope".to_string()));
}

#[tokio::test]
async fn store_rejects_negative_amounts() {
    let (store, _path) = store_with_file_db().await;
    let mut bad = draft("alice", "Refund", 10, cursor(0, 2024));
    bad.amount = Money::new(-10);
    assert!(store.insert(bad).await.unwrap_err().is_validation());

    let mut huge = draft("alice", "Yacht", 10, cursor(0, 2024));
    huge.amount = Money::new(Money::MAX.value() + 1);
    assert!(store.insert(huge).await.unwrap_err().is_validation());
}

#[tokio::test]
async fn records_round_trip_through_the_store() {
    let (store, _path) = store_with_file_db().await;
    let at = Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap();
    let expense = NewExpense::new("alice", "Caf\u{e9}", Money::new(4_500), cursor(2, 2024), at)
        .unwrap();
    let id = store.insert(expense).await.unwrap();

    let records = store.query(&Scope::new("alice", cursor(2, 2024))).await.unwrap();
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.id, id);
    assert_eq!(record.label, "Caf\u{e9}");
    assert_eq!(record.amount, Money::new(4_500));
    assert_eq!(record.occurred_at, Some(at));
    assert_eq!(record.month, Some(Month::new(2).unwrap()));
    assert_eq!(record.year, Some(2024));
}
