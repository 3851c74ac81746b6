use crate::auth::ServiceAuth;
use crate::http::{route, ServiceClient};
use crate::{ApprovalApi, RemoteCall};
use anyhow::Result;
use async_trait::async_trait;
use payinv_core::ApiResponse;
use reqwest::Method;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct BoolRef {
    value: bool,
}

/// HTTP client for the backend approval service.
#[derive(Clone)]
pub struct HttpApprovalApi {
    client: ServiceClient,
}

impl HttpApprovalApi {
    pub fn new(base_url: String, auth: ServiceAuth, timeout: Duration) -> Result<Arc<Self>> {
        let client = ServiceClient::new(base_url, auth, timeout)?;
        tracing::info!(base_url = %client.base_url(), "Approval API client ready");
        Ok(Arc::new(Self { client }))
    }
}

#[async_trait]
impl ApprovalApi for HttpApprovalApi {
    async fn list_approvers(
        &self,
        scheme: &str,
        value: &str,
    ) -> ApiResponse<BTreeMap<String, String>> {
        let call = RemoteCall::ListApprovers;
        let route = match route("/approvals/approvers", &[scheme, value]) {
            Ok(route) => route,
            Err(e) => return e.into_response(call),
        };
        let req = self.client.request(Method::GET, &route);
        match self.client.execute(call, req).await {
            Ok(approvers) => ApiResponse::ok(approvers.unwrap_or_default()),
            Err(e) => e.into_response(call),
        }
    }

    async fn validate_approver(&self, approver_id: &str) -> ApiResponse<bool> {
        let call = RemoteCall::ValidateApprover;
        let route = match route("/approvals/validate", &[approver_id]) {
            Ok(route) => route,
            Err(e) => return e.into_response(call),
        };
        let req = self.client.request(Method::GET, &route);
        match self.client.execute::<BoolRef>(call, req).await {
            Ok(Some(b)) => ApiResponse::ok(b.value),
            Ok(None) => ApiResponse::failure(call.key(), "Empty validation response"),
            Err(e) => e.into_response(call),
        }
    }
}
