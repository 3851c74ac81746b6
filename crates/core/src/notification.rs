use crate::models::InvoiceStatus;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationType {
    Approved,
    Rejected,
    /// Submitted for approval.
    Approval,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::Approved => "approved",
            NotificationType::Rejected => "rejected",
            NotificationType::Approval => "approval",
        }
    }
}

/// The status an invoice takes when this notification is sent.
impl From<NotificationType> for InvoiceStatus {
    fn from(kind: NotificationType) -> Self {
        match kind {
            NotificationType::Approved => InvoiceStatus::Approved,
            NotificationType::Rejected => InvoiceStatus::Rejected,
            NotificationType::Approval => InvoiceStatus::Approval,
        }
    }
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Action-specific payload, one variant per notification type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum NotificationData {
    Approved {
        approver: String,
    },
    Rejected {
        justification: String,
        approver: String,
    },
    OutstandingApproval {
        name: String,
        link: String,
        value: String,
        #[serde(rename = "invoiceId")]
        invoice_id: String,
        #[serde(rename = "schemeType")]
        scheme_type: String,
    },
}

impl NotificationData {
    pub fn kind(&self) -> NotificationType {
        match self {
            NotificationData::Approved { .. } => NotificationType::Approved,
            NotificationData::Rejected { .. } => NotificationType::Rejected,
            NotificationData::OutstandingApproval { .. } => NotificationType::Approval,
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum NotificationError {
    #[error("notification is missing required field `{0}`")]
    Missing(&'static str),
    #[error("notification action `{action}` does not match `{data}` payload")]
    ActionMismatch {
        action: NotificationType,
        data: NotificationType,
    },
}

/// Immutable approval-workflow event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    id: String,
    scheme: String,
    action: NotificationType,
    data: NotificationData,
}

impl Notification {
    pub fn builder() -> NotificationBuilder {
        NotificationBuilder::default()
    }

    /// Build directly from a payload; the action is implied by the variant.
    pub fn new(id: impl Into<String>, scheme: impl Into<String>, data: NotificationData) -> Self {
        Self {
            id: id.into(),
            scheme: scheme.into(),
            action: data.kind(),
            data,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn action(&self) -> NotificationType {
        self.action
    }

    pub fn data(&self) -> &NotificationData {
        &self.data
    }

    /// Flat message form handed to the queue.
    pub fn to_message(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[derive(Debug, Default)]
pub struct NotificationBuilder {
    id: Option<String>,
    scheme: Option<String>,
    action: Option<NotificationType>,
    data: Option<NotificationData>,
}

impl NotificationBuilder {
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = Some(scheme.into());
        self
    }

    pub fn with_action(mut self, action: NotificationType) -> Self {
        self.action = Some(action);
        self
    }

    pub fn with_data(mut self, data: NotificationData) -> Self {
        self.data = Some(data);
        self
    }

    pub fn build(self) -> Result<Notification, NotificationError> {
        let id = self
            .id
            .filter(|s| !s.is_empty())
            .ok_or(NotificationError::Missing("id"))?;
        let scheme = self
            .scheme
            .filter(|s| !s.is_empty())
            .ok_or(NotificationError::Missing("scheme"))?;
        let action = self.action.ok_or(NotificationError::Missing("action"))?;
        let data = self.data.ok_or(NotificationError::Missing("data"))?;

        if data.kind() != action {
            return Err(NotificationError::ActionMismatch {
                action,
                data: data.kind(),
            });
        }

        Ok(Notification {
            id,
            scheme,
            action,
            data,
        })
    }
}
