use payinv_core::Invoice;

/// The invoice a user is currently editing.
///
/// Owned by the caller and passed to whatever needs it; the approval service
/// never reads it.
#[derive(Debug, Clone, Default)]
pub struct InvoiceSession {
    current: Option<Invoice>,
}

impl InvoiceSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(&self) -> Option<&Invoice> {
        self.current.as_ref()
    }

    pub fn value_mut(&mut self) -> Option<&mut Invoice> {
        self.current.as_mut()
    }

    /// Replace the held invoice, returning the previous one.
    pub fn set(&mut self, invoice: Invoice) -> Option<Invoice> {
        self.current.replace(invoice)
    }

    pub fn take(&mut self) -> Option<Invoice> {
        self.current.take()
    }

    pub fn clear(&mut self) {
        self.current = None;
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn holds_one_invoice_at_a_time() {
        let mut session = InvoiceSession::new();
        assert!(session.is_empty());

        let first = Invoice::new("EU", "org", "DOM", "AP");
        let second = Invoice::new("EU", "org", "DOM", "AR");
        assert!(session.set(first.clone()).is_none());
        assert_eq!(session.set(second.clone()), Some(first));
        assert_eq!(session.value().map(|i| i.id), Some(second.id));

        if let Some(invoice) = session.value_mut() {
            invoice.reference = Some("REF-1".to_string());
        }
        let taken = session.take().unwrap();
        assert_eq!(taken.reference.as_deref(), Some("REF-1"));
        assert!(session.is_empty());

        session.set(taken);
        session.clear();
        assert!(session.value().is_none());
    }
}
