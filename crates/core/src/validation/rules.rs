use crate::models::{Invoice, PaymentRequest};
use crate::response::ErrorMap;

/// When a rule applies, judged against the owning invoice.
#[derive(Debug, Clone, Copy)]
pub enum Condition {
    Always,
    AccountTypeIs(&'static str),
}

impl Condition {
    fn holds(&self, invoice: &Invoice) -> bool {
        match self {
            Condition::Always => true,
            Condition::AccountTypeIs(t) => invoice.account_type.eq_ignore_ascii_case(t),
        }
    }
}

/// A required-field rule: `field` must be non-blank when `condition` holds.
pub struct Rule<T: 'static> {
    pub field: &'static str,
    pub display_name: &'static str,
    pub condition: Condition,
    pub value: fn(&T) -> Option<&str>,
}

impl<T> Rule<T> {
    fn message(&self) -> String {
        match self.condition {
            Condition::Always => format!("The {} field is required.", self.display_name),
            Condition::AccountTypeIs(t) => format!(
                "The {} field is required when AccountType is {}.",
                self.display_name, t
            ),
        }
    }
}

pub static HEADER_RULES: &[Rule<Invoice>] = &[
    Rule {
        field: "schemeType",
        display_name: "Scheme Type",
        condition: Condition::Always,
        value: |i| Some(i.scheme_type.as_str()),
    },
    Rule {
        field: "organisation",
        display_name: "Organisation",
        condition: Condition::Always,
        value: |i| Some(i.organisation.as_str()),
    },
    Rule {
        field: "paymentType",
        display_name: "Payment Type",
        condition: Condition::Always,
        value: |i| Some(i.payment_type.as_str()),
    },
    Rule {
        field: "accountType",
        display_name: "Account Type",
        condition: Condition::Always,
        value: |i| Some(i.account_type.as_str()),
    },
];

pub static PAYMENT_REQUEST_RULES: &[Rule<PaymentRequest>] = &[
    Rule {
        field: "originalInvoiceNumber",
        display_name: "Original AP Invoice Number",
        condition: Condition::AccountTypeIs("AR"),
        value: |pr| pr.original_invoice_number.as_deref(),
    },
    Rule {
        field: "originalSettlementDate",
        display_name: "Original AP Invoice Settlement Date",
        condition: Condition::AccountTypeIs("AR"),
        value: |pr| pr.original_settlement_date.as_deref(),
    },
    Rule {
        field: "recoveryDate",
        display_name: "Earliest date possible recovery first identified",
        condition: Condition::AccountTypeIs("AR"),
        value: |pr| pr.recovery_date.as_deref(),
    },
    Rule {
        field: "invoiceCorrectionReference",
        display_name: "Correction Reference - Previous AR Invoice ID",
        condition: Condition::AccountTypeIs("AR"),
        value: |pr| pr.invoice_correction_reference.as_deref(),
    },
];

pub(crate) fn evaluate<T>(
    rules: &[Rule<T>],
    invoice: &Invoice,
    target: &T,
    prefix: &str,
    errs: &mut ErrorMap,
) {
    for rule in rules {
        if !rule.condition.holds(invoice) {
            continue;
        }
        let blank = (rule.value)(target).map_or(true, |v| v.trim().is_empty());
        if blank {
            errs.push(format!("{prefix}{}", rule.field), rule.message());
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::models::{Invoice, PaymentRequest};
    use crate::validation::validate;

    fn ar_invoice() -> Invoice {
        let mut invoice = Invoice::new("EU", "RPA", "invoice", "AR");
        invoice.payment_requests.push(PaymentRequest {
            original_invoice_number: Some("INV-1".into()),
            original_settlement_date: Some("2023-01-01".into()),
            recovery_date: Some("2023-02-01".into()),
            invoice_correction_reference: Some("AR-0".into()),
            ..Default::default()
        });
        invoice
    }

    #[test]
    fn complete_ar_invoice_is_valid() {
        assert!(validate(&ar_invoice()).is_ok());
    }

    #[test]
    fn ar_fields_are_required_only_for_ar_accounts() {
        let mut invoice = ar_invoice();
        invoice.payment_requests[0].recovery_date = None;
        invoice.payment_requests[0].original_invoice_number = Some("  ".into());

        let errs = validate(&invoice).unwrap_err();
        let scoped = errs.scoped("paymentRequests[0].");
        assert_eq!(
            scoped.get("recoveryDate").unwrap()[0],
            "The Earliest date possible recovery first identified field is required when AccountType is AR."
        );
        assert!(scoped.contains_key("originalInvoiceNumber"));

        invoice.account_type = "AP".into();
        assert!(validate(&invoice).is_ok());
    }

    #[test]
    fn header_fields_are_always_required() {
        let invoice = Invoice::new("", "RPA", "", "AP");
        let errs = validate(&invoice).unwrap_err();
        assert_eq!(errs.keys().collect::<Vec<_>>(), vec!["schemeType", "paymentType"]);
    }
}
