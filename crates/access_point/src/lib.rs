use async_trait::async_trait;
use payinv_core::{ApiResponse, Invoice};
use std::collections::BTreeMap;
use std::fmt;

pub mod approval_api;
pub mod auth;
mod http;
pub mod invoice_api;
pub mod mock;

pub use approval_api::HttpApprovalApi;
pub use auth::ServiceAuth;
pub use invoice_api::HttpInvoiceApi;

/// Error key for failures where no HTTP response was received at all.
pub const TRANSPORT_ERROR_KEY: &str = "Transport";

/// Remote operations, used as the error category key of a failed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteCall {
    FindInvoice,
    FindApproval,
    CreateInvoice,
    UpdateInvoice,
    DeletePaymentRequest,
    ListApprovals,
    ListApprovers,
    ValidateApprover,
}

impl RemoteCall {
    pub fn key(&self) -> &'static str {
        match self {
            RemoteCall::FindInvoice => "FindInvoice",
            RemoteCall::FindApproval => "FindApproval",
            RemoteCall::CreateInvoice => "CreateInvoice",
            RemoteCall::UpdateInvoice => "UpdateInvoice",
            RemoteCall::DeletePaymentRequest => "DeletePaymentRequest",
            RemoteCall::ListApprovals => "ListApprovals",
            RemoteCall::ListApprovers => "ListApprovers",
            RemoteCall::ValidateApprover => "ValidateApprover",
        }
    }
}

impl fmt::Display for RemoteCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum RemoteError {
    /// Host unreachable, connection reset, timeout: no HTTP status.
    #[error("transport error: {0}")]
    Transport(String),
    #[error("remote rejected request with {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("failed to decode response: {0}")]
    Decode(String),
    #[error("service authentication failed: {0}")]
    Auth(String),
    /// Refused locally; nothing was sent.
    #[error("invalid request: {0}")]
    InvalidInput(String),
}

impl RemoteError {
    /// Fold the error into a failed envelope.
    ///
    /// Transport failures go under [`TRANSPORT_ERROR_KEY`]; everything else
    /// goes under the call's own key, rejected bodies verbatim.
    pub fn into_response<T>(self, call: RemoteCall) -> ApiResponse<T> {
        match self {
            RemoteError::Transport(msg) => {
                ApiResponse::failure(TRANSPORT_ERROR_KEY, format!("{call}: {msg}"))
            }
            RemoteError::Rejected { status, body } => {
                let message = if body.trim().is_empty() {
                    format!("HTTP {status}")
                } else {
                    body
                };
                ApiResponse::failure(call.key(), message)
            }
            RemoteError::Decode(msg) | RemoteError::Auth(msg) | RemoteError::InvalidInput(msg) => {
                ApiResponse::failure(call.key(), msg)
            }
        }
    }
}

/// Backend invoice service.
#[async_trait]
pub trait InvoiceApi: Send + Sync {
    async fn find_invoice(&self, id: &str, scheme: &str) -> ApiResponse<Invoice>;
    /// Same document as `find_invoice`, served from the approvals route.
    async fn find_approval(&self, id: &str, scheme: &str) -> ApiResponse<Invoice>;
    async fn create_invoice(&self, invoice: &Invoice) -> ApiResponse<Invoice>;
    /// Full-document overwrite.
    async fn update_invoice(&self, invoice: &Invoice) -> ApiResponse<Invoice>;
    async fn delete_payment_request(&self, payment_request_id: &str) -> ApiResponse<()>;
    async fn list_approvals(&self) -> ApiResponse<Vec<Invoice>>;
}

/// Backend approval service.
#[async_trait]
pub trait ApprovalApi: Send + Sync {
    /// Approvers allowed to sign off `value` for `scheme`, keyed by approver id.
    async fn list_approvers(&self, scheme: &str, value: &str)
        -> ApiResponse<BTreeMap<String, String>>;
    async fn validate_approver(&self, approver_id: &str) -> ApiResponse<bool>;
}
