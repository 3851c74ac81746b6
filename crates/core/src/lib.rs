pub mod models;
pub mod notification;
pub mod response;
pub mod validation;

pub use models::{Invoice, InvoiceLine, InvoiceStatus, PaymentRequest};
pub use notification::{Notification, NotificationBuilder, NotificationData, NotificationError, NotificationType};
pub use response::{ApiResponse, ErrorMap};
