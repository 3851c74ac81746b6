#![allow(dead_code)]

use payinv_core::{Invoice, InvoiceLine, PaymentRequest};
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Once;

static INIT: Once = Once::new();

pub fn init_test_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("debug")
            .with_test_writer()
            .try_init();
    });
}

pub fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

/// EU invoice whose lines sum to `values`.
pub fn invoice_with_lines(values: &[&str]) -> Invoice {
    let mut invoice = Invoice::new("EU", "Rural Payments", "DOM", "AP");
    invoice.approver = Some("approver@example.com".to_string());
    invoice.payment_requests.push(PaymentRequest {
        payment_request_id: "PR-1".to_string(),
        frn: "1234567890".to_string(),
        currency: "GBP".to_string(),
        invoice_lines: values
            .iter()
            .map(|v| InvoiceLine {
                value: dec(v),
                delivery_body: "RP00".to_string(),
                scheme_code: "80001".to_string(),
                description: "G00 - Gross value of claim".to_string(),
            })
            .collect(),
        ..Default::default()
    });
    invoice
}
