use super::{ApprovalApi, InvoiceApi, RemoteCall, RemoteError};
use async_trait::async_trait;
use payinv_core::{ApiResponse, Invoice, InvoiceStatus};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory invoice backend for local runs and tests.
#[derive(Default)]
pub struct MockInvoiceApi {
    invoices: RwLock<HashMap<String, Invoice>>,
    update_rejection: RwLock<Option<RemoteError>>,
    update_calls: AtomicUsize,
}

impl MockInvoiceApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn seed(&self, invoice: Invoice) {
        self.invoices
            .write()
            .await
            .insert(invoice.id.to_string(), invoice);
    }

    pub async fn stored(&self, id: &str) -> Option<Invoice> {
        self.invoices.read().await.get(id).cloned()
    }

    /// Make every following `update_invoice` fail with `err`.
    pub async fn fail_updates_with(&self, err: RemoteError) {
        *self.update_rejection.write().await = Some(err);
    }

    pub fn update_calls(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }

    async fn lookup(&self, call: RemoteCall, id: &str, scheme: &str) -> ApiResponse<Invoice> {
        match self.invoices.read().await.get(id) {
            Some(inv) if inv.scheme_type == scheme => ApiResponse::ok(inv.clone()),
            _ => RemoteError::Rejected {
                status: 404,
                body: "Invoice not found".to_string(),
            }
            .into_response(call),
        }
    }
}

#[async_trait]
impl InvoiceApi for MockInvoiceApi {
    async fn find_invoice(&self, id: &str, scheme: &str) -> ApiResponse<Invoice> {
        self.lookup(RemoteCall::FindInvoice, id, scheme).await
    }

    async fn find_approval(&self, id: &str, scheme: &str) -> ApiResponse<Invoice> {
        self.lookup(RemoteCall::FindApproval, id, scheme).await
    }

    async fn create_invoice(&self, invoice: &Invoice) -> ApiResponse<Invoice> {
        self.seed(invoice.clone()).await;
        ApiResponse::ok(invoice.clone())
    }

    async fn update_invoice(&self, invoice: &Invoice) -> ApiResponse<Invoice> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(err) = self.update_rejection.read().await.clone() {
            return err.into_response(RemoteCall::UpdateInvoice);
        }

        self.seed(invoice.clone()).await;
        ApiResponse::ok(invoice.clone())
    }

    async fn delete_payment_request(&self, payment_request_id: &str) -> ApiResponse<()> {
        let mut invoices = self.invoices.write().await;
        for invoice in invoices.values_mut() {
            invoice
                .payment_requests
                .retain(|pr| pr.payment_request_id != payment_request_id);
        }
        ApiResponse::ok(())
    }

    async fn list_approvals(&self) -> ApiResponse<Vec<Invoice>> {
        let invoices = self.invoices.read().await;
        ApiResponse::ok(
            invoices
                .values()
                .filter(|i| i.status == InvoiceStatus::Approval)
                .cloned()
                .collect(),
        )
    }
}

/// Fixed approver directory.
#[derive(Clone)]
pub struct MockApprovalApi {
    approvers: BTreeMap<String, String>,
}

impl MockApprovalApi {
    pub fn new() -> Arc<Self> {
        Self::with_approvers([("approver@example.com", "Example Approver")])
    }

    pub fn with_approvers<'a>(approvers: impl IntoIterator<Item = (&'a str, &'a str)>) -> Arc<Self> {
        Arc::new(Self {
            approvers: approvers
                .into_iter()
                .map(|(id, name)| (id.to_string(), name.to_string()))
                .collect(),
        })
    }
}

#[async_trait]
impl ApprovalApi for MockApprovalApi {
    async fn list_approvers(
        &self,
        _scheme: &str,
        _value: &str,
    ) -> ApiResponse<BTreeMap<String, String>> {
        ApiResponse::ok(self.approvers.clone())
    }

    async fn validate_approver(&self, approver_id: &str) -> ApiResponse<bool> {
        ApiResponse::ok(self.approvers.contains_key(approver_id))
    }
}
