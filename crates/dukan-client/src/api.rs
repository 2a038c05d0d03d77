//! # POS API
//!
//! Typed endpoints of the POS backend.
//!
//! ## Endpoints
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  GET  day-cycles/current?branchId=…     → Option<DayCycle>              │
//! │  GET  items/{id}/batches?shelfId=…      → Vec<StockBatch>               │
//! │  POST invoices                          → InvoiceReceipt                │
//! │  POST invoices/{id}/payments            → InvoiceReceipt                │
//! │  POST day-cycles/{id}/totals            → ()   (secondary aggregate)    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All bodies are camelCase JSON. Money travels as integer minor units and
//! exchange rates as decimal strings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use dukan_core::validation::validate_item_id;
use dukan_core::{
    CoreError, DayCycle, Discount, ExchangeRate, Invoice, InvoiceType, Money, PaymentEvent,
    PaymentMethod, PaymentStatus, StockBatch,
};

use crate::client::RequestClient;
use crate::error::ClientResult;
use crate::transport::ApiRequest;

// =============================================================================
// Request / Response Bodies
// =============================================================================

/// Where stock is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StockLocation {
    Warehouse(String),
    Shelf(String),
}

impl StockLocation {
    fn query_pair(&self) -> (&'static str, &str) {
        match self {
            StockLocation::Warehouse(id) => ("warehouseId", id.as_str()),
            StockLocation::Shelf(id) => ("shelfId", id.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvoiceLine {
    pub item_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_id: Option<String>,
    pub qty: i64,
    pub unit_price_usd: Money,
}

/// Body of `POST invoices`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvoiceRequest {
    pub invoice_number: String,
    pub invoice_type: InvoiceType,
    pub shelf_id: String,
    pub branch_id: String,
    pub day_cycle_id: String,
    pub exchange_rate: ExchangeRate,
    pub lines: Vec<CreateInvoiceLine>,
    pub discount: Discount,
    pub tax_rate_bps: u32,
    pub payment_status: PaymentStatus,
    pub total_usd: Money,
    pub total_sdg: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl CreateInvoiceRequest {
    pub fn from_invoice(
        invoice: &Invoice,
        shelf_id: impl Into<String>,
        day_cycle_id: impl Into<String>,
    ) -> Self {
        CreateInvoiceRequest {
            invoice_number: invoice.number().to_string(),
            invoice_type: invoice.invoice_type(),
            shelf_id: shelf_id.into(),
            branch_id: invoice.branch_id().to_string(),
            day_cycle_id: day_cycle_id.into(),
            exchange_rate: invoice.exchange_rate(),
            lines: invoice
                .lines()
                .iter()
                .map(|line| CreateInvoiceLine {
                    item_id: line.item_id.clone(),
                    batch_id: line.batch_id.clone(),
                    qty: line.quantity,
                    unit_price_usd: line.unit_price.usd,
                })
                .collect(),
            discount: *invoice.discount(),
            tax_rate_bps: invoice.tax_rate().bps(),
            payment_status: invoice.payment_status(),
            total_usd: invoice.totals().total.usd,
            total_sdg: invoice.totals().total.sdg,
            notes: invoice.notes().map(str::to_string),
        }
    }
}

/// Body of `POST invoices/{id}/payments`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordPaymentRequest {
    pub amount_sdg: Money,
    pub method: PaymentMethod,
    pub cash_amount_sdg: Money,
    pub card_amount_sdg: Money,
    pub recorded_at: DateTime<Utc>,
}

impl TryFrom<&PaymentEvent> for RecordPaymentRequest {
    type Error = CoreError;

    fn try_from(event: &PaymentEvent) -> Result<Self, Self::Error> {
        Ok(RecordPaymentRequest {
            amount_sdg: event.amount_sdg()?,
            method: event.method,
            cash_amount_sdg: event.cash_amount_sdg,
            card_amount_sdg: event.card_amount_sdg,
            recorded_at: event.recorded_at,
        })
    }
}

/// The server's view of an invoice after a write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceReceipt {
    /// Server-side invoice id; payments are posted against it.
    pub id: String,
    #[serde(default)]
    pub invoice_number: String,
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub total_sdg: Money,
    #[serde(default)]
    pub amount_paid_sdg: Money,
    #[serde(default)]
    pub amount_due_sdg: Money,
}

/// Increment applied to a day cycle's running totals after a sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyTotalsDelta {
    pub invoice_count: u32,
    pub sales_usd: Money,
    pub sales_sdg: Money,
    pub cash_sdg: Money,
    pub card_sdg: Money,
}

impl DailyTotalsDelta {
    /// One invoice's contribution: its total, plus what was collected so far.
    pub fn for_invoice(invoice: &Invoice) -> Self {
        let (cash_sdg, card_sdg) = invoice
            .payments()
            .iter()
            .fold((Money::zero(), Money::zero()), |(cash, card), p| {
                (cash + p.cash_amount_sdg, card + p.card_amount_sdg)
            });
        DailyTotalsDelta {
            invoice_count: 1,
            sales_usd: invoice.totals().total.usd,
            sales_sdg: invoice.totals().total.sdg,
            cash_sdg,
            card_sdg,
        }
    }

    /// Contribution of a payment recorded after the invoice was submitted.
    pub fn for_payment(event: &PaymentEvent) -> Self {
        DailyTotalsDelta {
            cash_sdg: event.cash_amount_sdg,
            card_sdg: event.card_amount_sdg,
            ..Self::default()
        }
    }
}

// =============================================================================
// API
// =============================================================================

/// Typed wrapper over [`RequestClient`].
#[derive(Debug, Clone)]
pub struct PosApi {
    client: RequestClient,
}

impl PosApi {
    pub fn new(client: RequestClient) -> Self {
        PosApi { client }
    }

    pub fn client(&self) -> &RequestClient {
        &self.client
    }

    /// The branch's current day cycle, or `None` if none has been opened.
    pub async fn current_day_cycle(&self, branch_id: &str) -> ClientResult<Option<DayCycle>> {
        let request = ApiRequest::get("day-cycles/current").with_query("branchId", branch_id);
        let day: Option<DayCycle> = self.client.call(&request).await?;
        debug!(branch_id, open = day.as_ref().is_some_and(DayCycle::is_open), "Fetched day cycle");
        Ok(day)
    }

    /// Current batches of one item at a warehouse or shelf.
    pub async fn get_batches(
        &self,
        item_id: &str,
        location: &StockLocation,
    ) -> ClientResult<Vec<StockBatch>> {
        validate_item_id(item_id).map_err(CoreError::from)?;
        let (key, value) = location.query_pair();
        let request =
            ApiRequest::get(format!("items/{item_id}/batches")).with_query(key, value);
        self.client.call(&request).await
    }

    pub async fn create_invoice(&self, body: &CreateInvoiceRequest) -> ClientResult<InvoiceReceipt> {
        let request = ApiRequest::post("invoices", body)?;
        let receipt: InvoiceReceipt = self.client.call(&request).await?;
        info!(
            invoice_number = %body.invoice_number,
            server_id = %receipt.id,
            status = ?receipt.payment_status,
            "Invoice submitted"
        );
        Ok(receipt)
    }

    pub async fn record_payment(
        &self,
        invoice_id: &str,
        body: &RecordPaymentRequest,
    ) -> ClientResult<InvoiceReceipt> {
        let request = ApiRequest::post(format!("invoices/{invoice_id}/payments"), body)?;
        let receipt: InvoiceReceipt = self.client.call(&request).await?;
        info!(
            server_id = %invoice_id,
            amount_sdg = %body.amount_sdg,
            status = ?receipt.payment_status,
            "Payment recorded"
        );
        Ok(receipt)
    }

    pub async fn update_daily_totals(
        &self,
        day_cycle_id: &str,
        delta: &DailyTotalsDelta,
    ) -> ClientResult<()> {
        let request = ApiRequest::post(format!("day-cycles/{day_cycle_id}/totals"), delta)?;
        self.client.call::<serde_json::Value>(&request).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use dukan_core::{CatalogItem, DayCycleStatus, InvoiceDraft};
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn invoice() -> Invoice {
        let day = DayCycle {
            id: "dc-1".to_string(),
            branch_id: "branch-001".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            status: DayCycleStatus::Open,
            rate: ExchangeRate::new(dec!(600)).unwrap(),
        };
        let ctx = day.exchange_context().unwrap();
        let mut draft = InvoiceDraft::new(InvoiceType::Sale);
        draft
            .add_line(&ctx, &CatalogItem::new("ITM-1", "Sugar 1kg", Money::from_minor(150)), Some("B1".into()), 2)
            .unwrap();
        draft.set_notes("table 4").unwrap();
        draft.finalize(Some(&day), "INV-260301-000001-ABCD", Utc::now()).unwrap()
    }

    #[test]
    fn test_create_invoice_body_shape() {
        let inv = invoice();
        let body = serde_json::to_value(CreateInvoiceRequest::from_invoice(&inv, "S1", "dc-1")).unwrap();

        assert_eq!(body["shelfId"], "S1");
        assert_eq!(body["dayCycleId"], "dc-1");
        assert_eq!(body["invoiceType"], "SALE");
        assert_eq!(body["paymentStatus"], "OUTSTANDING");
        assert_eq!(body["totalUsd"], 300);
        assert_eq!(body["totalSdg"], 180_000);
        assert_eq!(body["notes"], "table 4");
        assert_eq!(
            body["lines"],
            json!([{"itemId": "ITM-1", "batchId": "B1", "qty": 2, "unitPriceUsd": 150}])
        );
    }

    #[test]
    fn test_payment_body_shape() {
        let inv = invoice();
        let event = PaymentEvent::mixed(inv.id(), Money::from_minor(100_000), Money::from_minor(80_000), Utc::now());
        let body = serde_json::to_value(RecordPaymentRequest::try_from(&event).unwrap()).unwrap();

        assert_eq!(body["amountSdg"], 180_000);
        assert_eq!(body["method"], "MIXED");
        assert_eq!(body["cashAmountSdg"], 100_000);
    }

    #[test]
    fn test_receipt_accepts_legacy_status() {
        let receipt: InvoiceReceipt = serde_json::from_value(json!({
            "id": "srv-1",
            "invoiceNumber": "INV-1",
            "paymentStatus": "CONFIRMED",
            "totalSdg": 180000
        }))
        .unwrap();
        assert_eq!(receipt.payment_status, PaymentStatus::Outstanding);
        assert!(receipt.amount_paid_sdg.is_zero());
    }

    #[test]
    fn test_daily_totals_delta() {
        let inv = invoice();
        let delta = DailyTotalsDelta::for_invoice(&inv);
        assert_eq!(delta.invoice_count, 1);
        assert_eq!(delta.sales_sdg, Money::from_minor(180_000));
        assert!(delta.cash_sdg.is_zero());

        let event = PaymentEvent::card(inv.id(), Money::from_minor(5_000), Utc::now());
        let delta = DailyTotalsDelta::for_payment(&event);
        assert_eq!(delta.invoice_count, 0);
        assert_eq!(delta.card_sdg, Money::from_minor(5_000));
    }

    #[test]
    fn test_stock_location_query() {
        assert_eq!(StockLocation::Shelf("S1".into()).query_pair(), ("shelfId", "S1"));
        assert_eq!(
            StockLocation::Warehouse("W9".into()).query_pair(),
            ("warehouseId", "W9")
        );
    }
}
