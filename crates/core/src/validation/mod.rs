mod rules;

use crate::models::Invoice;
use crate::response::ErrorMap;

pub use rules::{Condition, Rule, HEADER_RULES, PAYMENT_REQUEST_RULES};

/// Run the header and payment-request rule tables against `invoice`.
///
/// Payment-request errors are keyed `paymentRequests[{i}].{field}` so a form
/// can pick out its own entries with [`ErrorMap::scoped`].
pub fn validate(invoice: &Invoice) -> Result<(), ErrorMap> {
    let mut errs = ErrorMap::new();

    rules::evaluate(HEADER_RULES, invoice, invoice, "", &mut errs);
    for (i, pr) in invoice.payment_requests.iter().enumerate() {
        let prefix = format!("paymentRequests[{i}].");
        rules::evaluate(PAYMENT_REQUEST_RULES, invoice, pr, &prefix, &mut errs);
    }

    if errs.is_empty() {
        Ok(())
    } else {
        Err(errs)
    }
}
