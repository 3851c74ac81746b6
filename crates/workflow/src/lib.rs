//! Invoice approval workflow: persists each lifecycle transition through the
//! invoice API, then announces it on the notification queue.

pub mod approvals;
pub mod audit;
pub mod bootstrap;
pub mod session;
pub mod telemetry;

pub use approvals::{ApprovalService, WorkflowSettings};
pub use audit::AuditLog;
pub use session::InvoiceSession;
