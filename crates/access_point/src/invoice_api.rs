use crate::auth::ServiceAuth;
use crate::http::{route, ServiceClient};
use crate::{InvoiceApi, RemoteCall, RemoteError};
use anyhow::Result;
use async_trait::async_trait;
use payinv_core::{ApiResponse, Invoice};
use reqwest::Method;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

/// HTTP client for the backend invoice service.
///
/// Routes (path parameters are percent-encoded):
/// - `GET /invoice/{scheme}/{id}`
/// - `GET /invoice/approval/{scheme}/{id}`
/// - `GET /invoice/approvals`
/// - `POST /invoice`
/// - `PUT /invoice/{id}`
/// - `DELETE /invoice/header/{paymentRequestId}`
#[derive(Clone)]
pub struct HttpInvoiceApi {
    client: ServiceClient,
}

impl HttpInvoiceApi {
    pub fn new(base_url: String, auth: ServiceAuth, timeout: Duration) -> Result<Arc<Self>> {
        let client = ServiceClient::new(base_url, auth, timeout)?;
        tracing::info!(base_url = %client.base_url(), "Invoice API client ready");
        Ok(Arc::new(Self { client }))
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        call: RemoteCall,
        route: Result<String, RemoteError>,
    ) -> ApiResponse<T> {
        let route = match route {
            Ok(route) => route,
            Err(e) => return e.into_response(call),
        };
        let req = self.client.request(Method::GET, &route);
        match self.client.execute(call, req).await {
            Ok(data) => ApiResponse::success(data),
            Err(e) => e.into_response(call),
        }
    }

    /// Write `invoice`; an empty 2xx body echoes the submitted document.
    async fn write(
        &self,
        call: RemoteCall,
        method: Method,
        route: &str,
        invoice: &Invoice,
    ) -> ApiResponse<Invoice> {
        let req = self.client.request(method, route).json(invoice);
        match self.client.execute::<Invoice>(call, req).await {
            Ok(Some(saved)) => ApiResponse::ok(saved),
            Ok(None) => ApiResponse::ok(invoice.clone()),
            Err(e) => e.into_response(call),
        }
    }
}

#[async_trait]
impl InvoiceApi for HttpInvoiceApi {
    async fn find_invoice(&self, id: &str, scheme: &str) -> ApiResponse<Invoice> {
        self.fetch(RemoteCall::FindInvoice, route("/invoice", &[scheme, id]))
            .await
    }

    async fn find_approval(&self, id: &str, scheme: &str) -> ApiResponse<Invoice> {
        self.fetch(
            RemoteCall::FindApproval,
            route("/invoice/approval", &[scheme, id]),
        )
        .await
    }

    async fn create_invoice(&self, invoice: &Invoice) -> ApiResponse<Invoice> {
        self.write(RemoteCall::CreateInvoice, Method::POST, "/invoice", invoice)
            .await
    }

    async fn update_invoice(&self, invoice: &Invoice) -> ApiResponse<Invoice> {
        let id = invoice.id.to_string();
        let route = match route("/invoice", &[id.as_str()]) {
            Ok(route) => route,
            Err(e) => return e.into_response(RemoteCall::UpdateInvoice),
        };
        self.write(RemoteCall::UpdateInvoice, Method::PUT, &route, invoice)
            .await
    }

    async fn delete_payment_request(&self, payment_request_id: &str) -> ApiResponse<()> {
        let call = RemoteCall::DeletePaymentRequest;
        let route = match route("/invoice/header", &[payment_request_id]) {
            Ok(route) => route,
            Err(e) => return e.into_response(call),
        };
        let req = self.client.request(Method::DELETE, &route);
        match self.client.send(call, req).await {
            Ok(_) => ApiResponse::ok(()),
            Err(e) => e.into_response(call),
        }
    }

    async fn list_approvals(&self) -> ApiResponse<Vec<Invoice>> {
        let response: ApiResponse<Vec<Invoice>> = self
            .fetch(RemoteCall::ListApprovals, Ok("/invoice/approvals".to_string()))
            .await;
        if response.is_success() && response.data.is_none() {
            return ApiResponse::ok(Vec::new());
        }
        response
    }
}
