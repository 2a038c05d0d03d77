//! End-to-end invoice scenarios: allocate, price, finalize, settle.

use chrono::{Days, NaiveDate, Utc};
use dukan_core::allocator::allocate;
use dukan_core::numbering::generate_invoice_number;
use dukan_core::settlement::{apply_payment, full_payment_from_tender, validate_tender};
use dukan_core::{
    CatalogItem, CoreError, DayCycle, DayCycleStatus, ExchangeRate, InvoiceDraft, InvoiceType,
    Money, PaymentEvent, PaymentStatus, StockBatch,
};
use rust_decimal_macros::dec;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()
}

fn open_day() -> DayCycle {
    DayCycle {
        id: "dc-2026-03-01".to_string(),
        branch_id: "branch-001".to_string(),
        date: today(),
        status: DayCycleStatus::Open,
        rate: ExchangeRate::new(dec!(1000)).unwrap(),
    }
}

fn batch(id: &str, item_id: &str, qty: i64, expires_in: u64) -> StockBatch {
    StockBatch {
        id: id.to_string(),
        item_id: item_id.to_string(),
        qty_remaining: qty,
        expiry_date: Some(today() + Days::new(expires_in)),
        unit_cost_usd: Money::from_minor(50),
    }
}

#[test]
fn near_expiry_batch_selected_first() {
    let batches = vec![batch("B1", "ITM-1", 5, 10), batch("B2", "ITM-1", 5, 40)];

    let allocation = allocate("ITM-1", &batches, 3, 0, today()).unwrap();

    assert_eq!(allocation.batch_id, "B1");
    assert_eq!(allocation.warning.unwrap().days_until_expiry, 10);
}

#[test]
fn request_beyond_total_stock_fails() {
    let batches = vec![batch("B1", "ITM-1", 3, 100), batch("B2", "ITM-1", 1, 200)];

    let err = allocate("ITM-1", &batches, 5, 0, today()).unwrap_err();

    assert!(matches!(
        err,
        CoreError::InsufficientStock {
            available: 4,
            requested: 5,
            ..
        }
    ));
}

#[test]
fn mixed_tender_sufficiency() {
    let due = Money::from_minor(6_000_000);

    let ok = validate_tender(due, Money::from_minor(4_000_000), Money::from_minor(2_000_000))
        .unwrap();
    assert!(ok.sufficient);
    assert!(ok.change.is_zero());

    let short = validate_tender(due, Money::from_minor(3_000_000), Money::from_minor(2_000_000));
    assert!(matches!(short, Err(CoreError::InsufficientTender { .. })));
}

#[test]
fn checkout_then_two_partial_payments() {
    let day = open_day();
    let ctx = day.exchange_context().unwrap();
    let batches = vec![batch("B1", "ITM-1", 50, 90)];
    // 10.00 USD × 10 at 1000 = 100000.00 SDG
    let item = CatalogItem::new("ITM-1", "Cooking oil 5L", Money::from_minor(1_000));

    let mut draft = InvoiceDraft::new(InvoiceType::Wholesale);
    let added = draft.add_item(&ctx, &item, &batches, 10, today()).unwrap();
    assert!(added.allocation.warning.is_none());

    let number = generate_invoice_number(InvoiceType::Wholesale, Some("KRT"), Utc::now()).unwrap();
    let invoice = draft.finalize(Some(&day), number, Utc::now()).unwrap();
    assert_eq!(invoice.totals().total.sdg, Money::from_minor(10_000_000));
    assert_eq!(invoice.payment_status(), PaymentStatus::Outstanding);

    let after_first = apply_payment(
        &invoice,
        &PaymentEvent::cash(invoice.id(), Money::from_minor(4_000_000), Utc::now()),
    )
    .unwrap();
    assert_eq!(after_first.payment_status(), PaymentStatus::PartiallyPaid);
    assert_eq!(after_first.amount_due().sdg, Money::from_minor(6_000_000));

    let after_second = apply_payment(
        &after_first,
        &PaymentEvent::card(invoice.id(), Money::from_minor(6_000_000), Utc::now()),
    )
    .unwrap();
    assert_eq!(after_second.payment_status(), PaymentStatus::Paid);
    assert!(after_second.amount_due().is_zero());
    assert_eq!(after_second.payments().len(), 2);
}

#[test]
fn full_tender_settles_with_change() {
    let day = open_day();
    let ctx = day.exchange_context().unwrap();
    let mut draft = InvoiceDraft::new(InvoiceType::Sale);
    draft
        .add_line(
            &ctx,
            &CatalogItem::new("ITM-2", "Tea 250g", Money::from_minor(450)),
            None,
            1,
        )
        .unwrap();
    let invoice = draft.finalize(Some(&day), "INV-T", Utc::now()).unwrap();

    // 4.50 USD = 4500.00 SDG; customer hands over 5000.00 cash
    let full = full_payment_from_tender(&invoice, Money::from_minor(500_000), Money::zero(), Utc::now())
        .unwrap();
    assert_eq!(full.change, Money::from_minor(50_000));

    let paid = apply_payment(&invoice, &full.event).unwrap();
    assert!(paid.is_paid());
}

#[test]
fn closed_day_blocks_finalization() {
    let mut day = open_day();
    let ctx = day.exchange_context().unwrap();
    let mut draft = InvoiceDraft::new(InvoiceType::Sale);
    draft
        .add_line(&ctx, &CatalogItem::new("ITM-3", "Salt", Money::from_minor(100)), None, 1)
        .unwrap();

    day.status = DayCycleStatus::Closed;
    assert!(matches!(
        draft.finalize(Some(&day), "INV-X", Utc::now()),
        Err(CoreError::DayClosed { .. })
    ));
    // the draft survives a failed finalization
    assert_eq!(draft.lines().len(), 1);
}
