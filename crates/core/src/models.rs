use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Workflow status of an invoice.
///
/// Only the states driven by the approval workflow are modelled; anything
/// else the backend reports is kept verbatim in `Other` so a full-document
/// overwrite does not clobber it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "String")]
pub enum InvoiceStatus {
    #[default]
    Draft,
    Approval,
    Approved,
    Rejected,
    Other(String),
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Approval => "approval",
            InvoiceStatus::Approved => "approved",
            InvoiceStatus::Rejected => "rejected",
            InvoiceStatus::Other(s) => s.as_str(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, InvoiceStatus::Approved | InvoiceStatus::Rejected)
    }
}

impl From<String> for InvoiceStatus {
    fn from(s: String) -> Self {
        match s.trim().to_lowercase().as_str() {
            "" | "draft" => InvoiceStatus::Draft,
            "approval" => InvoiceStatus::Approval,
            "approved" => InvoiceStatus::Approved,
            "rejected" => InvoiceStatus::Rejected,
            _ => InvoiceStatus::Other(s),
        }
    }
}

impl From<Option<String>> for InvoiceStatus {
    fn from(s: Option<String>) -> Self {
        s.map(InvoiceStatus::from).unwrap_or_default()
    }
}

impl From<InvoiceStatus> for String {
    fn from(status: InvoiceStatus) -> Self {
        match status {
            InvoiceStatus::Other(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceLine {
    pub value: Decimal,
    #[serde(default)]
    pub delivery_body: String,
    #[serde(default)]
    pub scheme_code: String,
    #[serde(default)]
    pub description: String,
}

/// A header-level group of invoice lines.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PaymentRequest {
    pub payment_request_id: String,
    pub frn: String,
    pub source_system: String,
    pub marketing_year: String,
    pub payment_request_number: i32,
    pub agreement_number: String,
    pub currency: String,
    pub description: String,
    pub due_date: String,
    pub value: Decimal,
    pub invoice_lines: Vec<InvoiceLine>,

    // AR only
    pub original_invoice_number: Option<String>,
    pub original_settlement_date: Option<String>,
    pub recovery_date: Option<String>,
    pub invoice_correction_reference: Option<String>,
}

impl PaymentRequest {
    pub fn lines_total(&self) -> Decimal {
        self.invoice_lines.iter().map(|l| l.value).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: Uuid,
    pub scheme_type: String,
    #[serde(default)]
    pub organisation: String,
    #[serde(default)]
    pub payment_type: String,
    #[serde(default)]
    pub account_type: String,
    #[serde(default)]
    pub status: InvoiceStatus,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub approver: Option<String>,
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub updated: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_by: Option<String>,
    #[serde(default)]
    pub payment_requests: Vec<PaymentRequest>,
}

impl Invoice {
    pub fn new(
        scheme_type: impl Into<String>,
        organisation: impl Into<String>,
        payment_type: impl Into<String>,
        account_type: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            scheme_type: scheme_type.into(),
            organisation: organisation.into(),
            payment_type: payment_type.into(),
            account_type: account_type.into(),
            status: InvoiceStatus::Draft,
            reference: None,
            approver: None,
            created: Some(Utc::now()),
            created_by: None,
            updated: None,
            updated_by: None,
            payment_requests: Vec::new(),
        }
    }

    /// Total payable value: every invoice line across every payment request.
    pub fn total_value(&self) -> Decimal {
        self.payment_requests.iter().map(PaymentRequest::lines_total).sum()
    }

    pub fn can_submit_for_approval(&self) -> bool {
        self.total_value() > Decimal::ZERO
    }
}
