use crate::audit::{compute_sha256_hex, AuditEvent, AuditLog};
use access_point::{ApprovalApi, InvoiceApi};
use anyhow::{Context, Result};
use chrono::Utc;
use futures::FutureExt;
use payinv_core::{ApiResponse, Invoice, InvoiceStatus, Notification, NotificationData};
use queue::{Event, QueuePublisher, DEFAULT_QUEUE_NAME};
use std::any::Any;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

/// Publish failed after the invoice was persisted.
pub const NOTIFICATION_QUEUE_KEY: &str = "NotificationQueue";
pub const NOTIFICATION_QUEUE_MESSAGE: &str = "Failed to add to queue";
/// Unexpected error or panic inside a transition.
pub const EXCEPTION_KEY: &str = "Exception";
/// Transition refused before any remote call.
pub const PRECONDITION_KEY: &str = "Precondition";

#[derive(Debug, Clone)]
pub struct WorkflowSettings {
    pub queue_name: String,
    /// Root of the UI links embedded in approval notifications.
    pub base_uri: String,
    /// Recorded as `updatedBy` and as the approver on decisions.
    pub acting_user: String,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            queue_name: DEFAULT_QUEUE_NAME.to_string(),
            base_uri: "http://localhost".to_string(),
            acting_user: "user".to_string(),
        }
    }
}

/// Drives invoices through `approval`, `approved` and `rejected`.
///
/// Every transition is persist-then-notify: the invoice API must accept the
/// new state before a notification is queued, and a failed publish is
/// reported without undoing the persisted change.
pub struct ApprovalService {
    invoices: Arc<dyn InvoiceApi>,
    approvals: Arc<dyn ApprovalApi>,
    publisher: Arc<dyn QueuePublisher>,
    settings: WorkflowSettings,
    audit: Option<AuditLog>,
}

impl ApprovalService {
    pub fn new(
        invoices: Arc<dyn InvoiceApi>,
        approvals: Arc<dyn ApprovalApi>,
        publisher: Arc<dyn QueuePublisher>,
        settings: WorkflowSettings,
    ) -> Self {
        Self {
            invoices,
            approvals,
            publisher,
            settings,
            audit: None,
        }
    }

    pub fn with_audit_log(mut self, audit: AuditLog) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn settings(&self) -> &WorkflowSettings {
        &self.settings
    }

    pub async fn submit_for_approval(&self, invoice: &mut Invoice) -> ApiResponse<Invoice> {
        if !invoice.can_submit_for_approval() {
            tracing::warn!(invoice_id = %invoice.id, "Refusing to submit invoice with zero total value");
            return ApiResponse::failure(
                PRECONDITION_KEY,
                "Invoice total value must be greater than zero to submit for approval",
            );
        }

        let data = NotificationData::OutstandingApproval {
            name: invoice.approver.clone().unwrap_or_default(),
            link: self.details_link(invoice),
            value: invoice.total_value().normalize().to_string(),
            invoice_id: invoice.id.to_string(),
            scheme_type: invoice.scheme_type.clone(),
        };
        self.update_and_notify(invoice, data).await
    }

    /// No guard against approving an already approved invoice.
    pub async fn approve(&self, invoice: &mut Invoice) -> ApiResponse<Invoice> {
        let data = NotificationData::Approved {
            approver: self.settings.acting_user.clone(),
        };
        self.update_and_notify(invoice, data).await
    }

    pub async fn reject(&self, invoice: &mut Invoice, justification: &str) -> ApiResponse<Invoice> {
        let data = NotificationData::Rejected {
            justification: justification.to_string(),
            approver: self.settings.acting_user.clone(),
        };
        self.update_and_notify(invoice, data).await
    }

    pub async fn get_invoice(&self, id: &str, scheme: &str) -> ApiResponse<Invoice> {
        self.invoices.find_invoice(id, scheme).await
    }

    /// The invoice only while it is awaiting a decision.
    pub async fn get_approval_view(&self, id: &str, scheme: &str) -> Option<Invoice> {
        let response = self.invoices.find_approval(id, scheme).await;
        if !response.is_success() {
            tracing::warn!(invoice_id = %id, scheme = %scheme, errors = ?response.errors, "Approval not found");
            return None;
        }

        match response.into_data() {
            Some(invoice) if invoice.status == InvoiceStatus::Approval => Some(invoice),
            Some(invoice) => {
                tracing::warn!(invoice_id = %id, status = %invoice.status, "Invoice is not awaiting approval");
                None
            }
            None => {
                tracing::warn!(invoice_id = %id, scheme = %scheme, "Approval lookup returned no invoice");
                None
            }
        }
    }

    pub async fn get_outstanding_approvals(&self) -> ApiResponse<Vec<Invoice>> {
        self.invoices.list_approvals().await
    }

    pub async fn validate_approver(&self, approver_id: &str) -> ApiResponse<bool> {
        self.approvals.validate_approver(approver_id).await
    }

    pub async fn list_approvers(
        &self,
        scheme: &str,
        value: &str,
    ) -> ApiResponse<BTreeMap<String, String>> {
        self.approvals.list_approvers(scheme, value).await
    }

    /// Move `invoice` to the status matching `data`, persist it, then queue
    /// the notification.
    ///
    /// Errors and panics from collaborators come back as an `Exception`
    /// entry; nothing escapes as `Err` or unwinds past this call.
    pub async fn update_and_notify(
        &self,
        invoice: &mut Invoice,
        data: NotificationData,
    ) -> ApiResponse<Invoice> {
        let invoice_id = invoice.id.to_string();
        let scheme = invoice.scheme_type.clone();
        let status_str = InvoiceStatus::from(data.kind()).as_str().to_string();

        let outcome = AssertUnwindSafe(self.persist_then_notify(invoice, data))
            .catch_unwind()
            .await;

        let message = match outcome {
            Ok(Ok(response)) => return response,
            Ok(Err(e)) => format!("{e:#}"),
            Err(panic) => panic_message(panic.as_ref()),
        };

        tracing::error!(invoice_id = %invoice_id, status = %status_str, error = %message, "Invoice transition failed");
        self.record(
            AuditEvent::new("transition_exception", &invoice_id, &scheme, &status_str)
                .with_error(message.clone()),
        );
        ApiResponse::failure(EXCEPTION_KEY, message)
    }

    async fn persist_then_notify(
        &self,
        invoice: &mut Invoice,
        data: NotificationData,
    ) -> Result<ApiResponse<Invoice>> {
        let invoice_id = invoice.id.to_string();
        let status = InvoiceStatus::from(data.kind());
        let notification = Notification::builder()
            .with_id(invoice_id.clone())
            .with_scheme(invoice.scheme_type.clone())
            .with_action(data.kind())
            .with_data(data)
            .build()
            .context("Failed to build notification")?;

        invoice.status = status;
        invoice.updated_by = Some(self.settings.acting_user.clone());
        invoice.updated = Some(Utc::now());
        let status_str = invoice.status.as_str().to_string();

        let mut response = self.invoices.update_invoice(invoice).await;
        if !response.is_success() {
            tracing::error!(invoice_id = %invoice_id, status = %status_str, errors = ?response.errors, "Invoice update rejected; notification skipped");
            self.record(
                AuditEvent::new("invoice_update_failed", &invoice_id, &invoice.scheme_type, &status_str)
                    .with_actor(&self.settings.acting_user)
                    .with_error(format!("{:?}", response.errors)),
            );
            return Ok(response);
        }

        tracing::info!(invoice_id = %invoice_id, status = %status_str, "Invoice updated");
        self.record(
            AuditEvent::new("invoice_updated", &invoice_id, &invoice.scheme_type, &status_str)
                .with_actor(&self.settings.acting_user),
        );

        let payload = notification
            .to_message()
            .context("Failed to serialize notification")?;
        let message = Event::payments(status_str.clone(), payload)
            .encode()
            .context("Failed to encode queue event")?;

        if self
            .publisher
            .publish(&self.settings.queue_name, &message)
            .await
        {
            tracing::info!(invoice_id = %invoice_id, queue = %self.settings.queue_name, "Notification queued");
            self.record(
                AuditEvent::new("notification_queued", &invoice_id, &invoice.scheme_type, &status_str)
                    .with_hash(compute_sha256_hex(&message)),
            );
        } else {
            tracing::error!(invoice_id = %invoice_id, queue = %self.settings.queue_name, "Invoice persisted but notification was not queued");
            self.record(
                AuditEvent::new("notification_failed", &invoice_id, &invoice.scheme_type, &status_str)
                    .with_error(NOTIFICATION_QUEUE_MESSAGE.to_string()),
            );
            response.add_error(NOTIFICATION_QUEUE_KEY, NOTIFICATION_QUEUE_MESSAGE);
        }

        Ok(response)
    }

    fn details_link(&self, invoice: &Invoice) -> String {
        format!(
            "{}/invoice/details/{}/{}/true",
            self.settings.base_uri.trim_end_matches('/'),
            invoice.scheme_type,
            invoice.id
        )
    }

    fn record(&self, event: AuditEvent) {
        if let Some(log) = &self.audit {
            if let Err(e) = log.write(&event) {
                tracing::warn!(invoice_id = %event.invoice_id, error = %e, "Failed to write audit event");
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic during invoice transition".to_string()
    }
}
