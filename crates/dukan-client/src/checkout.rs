//! # Checkout
//!
//! Drives a draft from the invoice screen to the server.
//!
//! ## Submission Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  LOCAL (no network)                                                     │
//! │    1. day cycle open?             ── no ──► DayClosed                   │
//! │    2. finalize draft              ── empty ─► EmptyInvoice              │
//! │    3. tender / payment checks     ── short ─► InsufficientTender        │
//! │                                   ── over ──► Overpayment               │
//! │                                                                         │
//! │  PRIMARY (failure aborts, nothing is rolled back)                       │
//! │    4. POST invoices               ── 409 ───► StockConflict             │
//! │                                                                         │
//! │  SECONDARY (failure is logged and reported, invoice stays saved)        │
//! │    5. POST invoices/{id}/payments                                       │
//! │    6. POST day-cycles/{id}/totals                                       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;
use tracing::{error, info, warn};

use dukan_core::invoice::AddedLine;
use dukan_core::settlement::full_payment_from_tender;
use dukan_core::validation::validate_quantity;
use dukan_core::{
    apply_payment, generate_invoice_number, CatalogItem, CoreError, DayCycle, Invoice,
    InvoiceDraft, Money, PaymentEvent,
};

use crate::api::{
    CreateInvoiceRequest, DailyTotalsDelta, InvoiceReceipt, PosApi, RecordPaymentRequest,
    StockLocation,
};
use crate::auth::TokenStore;
use crate::client::RequestClient;
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

// =============================================================================
// Plans & Reports
// =============================================================================

/// What the cashier chose to do about payment at submission time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementPlan {
    /// Settle now. The tender must cover the total; change comes from cash.
    PayInFull { cash_sdg: Money, card_sdg: Money },
    /// Take part of the total now.
    PayPartially { cash_sdg: Money, card_sdg: Money },
    /// Nothing now; the invoice is marked `Deferred`.
    Defer,
}

/// A follow-up call that runs after the invoice is saved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecondaryEffect {
    Payment,
    DailyTotals,
}

/// A follow-up call that failed. The invoice itself is kept.
#[derive(Debug)]
pub struct SecondaryFailure {
    pub effect: SecondaryEffect,
    pub error: ClientError,
}

/// Outcome of [`Checkout::submit`].
#[derive(Debug)]
pub struct SubmissionReport {
    /// Local invoice, with payment state as the server last reported it.
    pub invoice: Invoice,
    /// Server record of the invoice (or of its payment, if one was sent).
    pub receipt: InvoiceReceipt,
    /// Cash to hand back. Zero unless the payment was recorded.
    pub change_sdg: Money,
    pub secondary_failures: Vec<SecondaryFailure>,
}

impl SubmissionReport {
    pub fn is_clean(&self) -> bool {
        self.secondary_failures.is_empty()
    }

    pub fn payment_failed(&self) -> bool {
        self.secondary_failures
            .iter()
            .any(|f| f.effect == SecondaryEffect::Payment)
    }
}

/// Outcome of [`Checkout::settle`].
#[derive(Debug)]
pub struct SettlementOutcome {
    pub invoice: Invoice,
    pub receipt: InvoiceReceipt,
    pub change_sdg: Money,
    pub secondary_failures: Vec<SecondaryFailure>,
}

/// A payment checked locally and ready to send.
struct PreparedPayment {
    event: PaymentEvent,
    request: RecordPaymentRequest,
    change: Money,
    settled: Invoice,
}

/// Builds the payment event for a tender, picking the method from the
/// columns in use.
fn tender_event(invoice_id: &str, cash_sdg: Money, card_sdg: Money, at: DateTime<Utc>) -> PaymentEvent {
    match (cash_sdg.is_zero(), card_sdg.is_zero()) {
        (false, true) => PaymentEvent::cash(invoice_id, cash_sdg, at),
        (true, false) => PaymentEvent::card(invoice_id, card_sdg, at),
        _ => PaymentEvent::mixed(invoice_id, cash_sdg, card_sdg, at),
    }
}

/// Checks a tender against `invoice` and applies it locally.
///
/// A tender covering the amount due becomes a full payment with change;
/// anything less is a partial payment.
fn prepare_payment(
    invoice: &Invoice,
    cash_sdg: Money,
    card_sdg: Money,
    at: DateTime<Utc>,
) -> ClientResult<PreparedPayment> {
    let tendered = cash_sdg.checked_add(card_sdg)?;
    let (event, change) = if tendered >= invoice.amount_due().sdg {
        let full = full_payment_from_tender(invoice, cash_sdg, card_sdg, at)?;
        (full.event, full.change)
    } else {
        (tender_event(invoice.id(), cash_sdg, card_sdg, at), Money::zero())
    };
    settle_locally(invoice, event, change)
}

/// Applies `event` to a copy of `invoice` and builds the request body.
fn settle_locally(
    invoice: &Invoice,
    event: PaymentEvent,
    change: Money,
) -> ClientResult<PreparedPayment> {
    let settled = apply_payment(invoice, &event)?;
    let request = RecordPaymentRequest::try_from(&event)?;
    Ok(PreparedPayment {
        event,
        request,
        change,
        settled,
    })
}

// =============================================================================
// Checkout
// =============================================================================

#[derive(Debug, Clone)]
pub struct Checkout {
    api: PosApi,
    branch_id: String,
    branch_prefix: Option<String>,
}

impl Checkout {
    pub fn new(api: PosApi, branch_id: impl Into<String>, branch_prefix: Option<String>) -> Self {
        Checkout {
            api,
            branch_id: branch_id.into(),
            branch_prefix,
        }
    }

    pub fn from_config(config: &ClientConfig, tokens: Arc<dyn TokenStore>) -> ClientResult<Self> {
        let client = RequestClient::from_config(config, tokens)?;
        Ok(Self::new(
            PosApi::new(client),
            config.branch_id(),
            config.branch_prefix().map(str::to_string),
        ))
    }

    pub fn api(&self) -> &PosApi {
        &self.api
    }

    pub fn branch_id(&self) -> &str {
        &self.branch_id
    }

    /// Fetches the branch's day cycle and requires it to be open.
    pub async fn open_day(&self) -> ClientResult<DayCycle> {
        match self.api.current_day_cycle(&self.branch_id).await? {
            Some(day) if day.is_open() => Ok(day),
            _ => {
                warn!(branch_id = %self.branch_id, "No open day cycle");
                Err(CoreError::DayClosed {
                    branch_id: self.branch_id.clone(),
                }
                .into())
            }
        }
    }

    /// Fetches live batches for `item` and adds it to `draft`.
    pub async fn add_item(
        &self,
        draft: &mut InvoiceDraft,
        day: &DayCycle,
        item: &CatalogItem,
        location: &StockLocation,
        quantity: i64,
        today: NaiveDate,
    ) -> ClientResult<AddedLine> {
        validate_quantity(quantity).map_err(CoreError::from)?;
        let ctx = day.exchange_context()?;

        let batches = self.api.get_batches(&item.id, location).await?;
        let added = draft.add_item(&ctx, item, &batches, quantity, today)?;

        if let Some(warning) = &added.allocation.warning {
            warn!(
                item_id = %item.id,
                batch_id = %warning.batch_id,
                days_until_expiry = warning.days_until_expiry,
                "{}",
                warning.message()
            );
        }
        Ok(added)
    }

    /// Finalizes `draft` and submits it with the chosen payment plan.
    ///
    /// Every local check runs before the first request. The draft is only
    /// borrowed, so on any error the caller still has it intact.
    pub async fn submit(
        &self,
        draft: &InvoiceDraft,
        day_cycle: Option<&DayCycle>,
        shelf_id: &str,
        plan: SettlementPlan,
    ) -> ClientResult<SubmissionReport> {
        let day = day_cycle.ok_or_else(|| CoreError::DayClosed {
            branch_id: self.branch_id.clone(),
        })?;
        let now = Utc::now();
        let number =
            generate_invoice_number(draft.invoice_type(), self.branch_prefix.as_deref(), now)?;
        let invoice = draft.finalize(Some(day), number, now)?;

        let (invoice, payment) = match plan {
            _ if invoice.is_paid() => (invoice, None),
            SettlementPlan::Defer => (invoice.defer()?, None),
            SettlementPlan::PayInFull { cash_sdg, card_sdg } => {
                let full = full_payment_from_tender(&invoice, cash_sdg, card_sdg, now)?;
                let prepared = settle_locally(&invoice, full.event, full.change)?;
                (invoice, Some(prepared))
            }
            SettlementPlan::PayPartially { cash_sdg, card_sdg } => {
                let event = tender_event(invoice.id(), cash_sdg, card_sdg, now);
                let prepared = settle_locally(&invoice, event, Money::zero())?;
                (invoice, Some(prepared))
            }
        };

        let body = CreateInvoiceRequest::from_invoice(&invoice, shelf_id, &day.id);
        let mut receipt = match self.api.create_invoice(&body).await {
            Ok(receipt) => receipt,
            Err(err) => {
                if matches!(err, ClientError::StockConflict(_)) {
                    warn!(
                        invoice_number = %invoice.number(),
                        error = %err,
                        "Server rejected stock, draft needs a refresh"
                    );
                }
                return Err(err);
            }
        };

        if !receipt.total_sdg.is_zero() && receipt.total_sdg != invoice.totals().total.sdg {
            warn!(
                invoice_number = %invoice.number(),
                local_total = %invoice.totals().total.sdg,
                server_total = %receipt.total_sdg,
                "Server total differs from local total"
            );
        }

        let mut secondary_failures = Vec::new();
        let mut invoice = invoice;
        let mut change_sdg = Money::zero();

        if let Some(prepared) = payment {
            let server_id = receipt.id.clone();
            match self
                .api
                .record_payment(&server_id, &prepared.request)
                .await
            {
                Ok(paid) => {
                    invoice = adopt_server_status(prepared.settled, &paid)?;
                    change_sdg = prepared.change;
                    receipt = paid;
                }
                Err(err) => {
                    error!(
                        invoice_number = %invoice.number(),
                        server_id = %server_id,
                        error = %err,
                        "Payment not recorded, invoice kept unpaid"
                    );
                    secondary_failures.push(SecondaryFailure {
                        effect: SecondaryEffect::Payment,
                        error: err,
                    });
                }
            }
        }

        let delta = DailyTotalsDelta::for_invoice(&invoice);
        if let Err(err) = self.api.update_daily_totals(&day.id, &delta).await {
            error!(
                invoice_number = %invoice.number(),
                day_cycle_id = %day.id,
                error = %err,
                "Daily totals update failed, invoice kept"
            );
            secondary_failures.push(SecondaryFailure {
                effect: SecondaryEffect::DailyTotals,
                error: err,
            });
        }

        info!(
            invoice_number = %invoice.number(),
            status = ?invoice.payment_status(),
            secondary_failures = secondary_failures.len(),
            "Checkout complete"
        );

        Ok(SubmissionReport {
            invoice,
            receipt,
            change_sdg,
            secondary_failures,
        })
    }

    /// Takes a later payment against an invoice already on the server.
    ///
    /// The tender is checked and applied locally first; only then is the
    /// payment sent. A tender that covers the amount due settles in full and
    /// yields change.
    pub async fn settle(
        &self,
        invoice: &Invoice,
        server_invoice_id: &str,
        day_cycle_id: &str,
        cash_sdg: Money,
        card_sdg: Money,
    ) -> ClientResult<SettlementOutcome> {
        let prepared = prepare_payment(invoice, cash_sdg, card_sdg, Utc::now())?;

        let receipt = self
            .api
            .record_payment(server_invoice_id, &prepared.request)
            .await?;
        let settled = adopt_server_status(prepared.settled, &receipt)?;

        let mut secondary_failures = Vec::new();
        let delta = DailyTotalsDelta::for_payment(&prepared.event);
        if let Err(err) = self.api.update_daily_totals(day_cycle_id, &delta).await {
            error!(
                invoice_number = %invoice.number(),
                day_cycle_id,
                error = %err,
                "Daily totals update failed, payment kept"
            );
            secondary_failures.push(SecondaryFailure {
                effect: SecondaryEffect::DailyTotals,
                error: err,
            });
        }

        Ok(SettlementOutcome {
            invoice: settled,
            receipt,
            change_sdg: prepared.change,
            secondary_failures,
        })
    }
}

/// Keeps the locally applied state unless the server reports otherwise.
fn adopt_server_status(settled: Invoice, receipt: &InvoiceReceipt) -> ClientResult<Invoice> {
    if receipt.payment_status == settled.payment_status() {
        return Ok(settled);
    }
    warn!(
        invoice_number = %settled.number(),
        local = ?settled.payment_status(),
        server = ?receipt.payment_status,
        "Server payment status differs, adopting server state"
    );
    Ok(settled.reconcile_with_server(receipt.payment_status, receipt.amount_paid_sdg)?)
}
