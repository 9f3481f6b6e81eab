//! HTTP/JSON sink posting position fixes to a report endpoint.

use async_trait::async_trait;
use position_types::{PositionFix, ReportFixesRequest, ReportFixesResponse, RpcResponse};

use super::SampleSink;

pub struct HttpSink {
    base_url: String,
    device_id: String,
    client: reqwest::Client,
}

impl HttpSink {
    pub fn new(base_url: &str, device_id: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            device_id: device_id.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Default sink pointing to localhost:9110
    pub fn default_local(device_id: &str) -> Self {
        Self::new("http://127.0.0.1:9110", device_id)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn report_fixes(&self, fixes: &[PositionFix]) -> Result<ReportFixesResponse, String> {
        let req = ReportFixesRequest {
            device_id: self.device_id.clone(),
            fixes: fixes.to_vec(),
        };
        let resp: RpcResponse<ReportFixesResponse> = self.post("/rpc/fixes/report", &req).await?;
        if !resp.success {
            return Err(resp.error.unwrap_or_else(|| "Unknown error".to_string()));
        }
        resp.data
            .ok_or_else(|| resp.error.unwrap_or_else(|| "Empty response".to_string()))
    }

    async fn post<B: serde::Serialize, T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, String> {
        let url = format!("{}{}", self.base_url, path);
        self.client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| format!("Report endpoint unavailable: {}", e))?
            .error_for_status()
            .map_err(|e| format!("Report endpoint rejected batch: {}", e))?
            .json::<T>()
            .await
            .map_err(|e| format!("Invalid response from report endpoint: {}", e))
    }
}

/// Batch entries at the accepted indices, in batch order. Duplicate and
/// out-of-range indices are ignored.
pub(crate) fn select_accepted(batch: Vec<PositionFix>, accepted: &[usize]) -> Vec<PositionFix> {
    batch
        .into_iter()
        .enumerate()
        .filter(|(idx, _)| accepted.contains(idx))
        .map(|(_, fix)| fix)
        .collect()
}

#[async_trait]
impl SampleSink<PositionFix> for HttpSink {
    async fn report(&self, batch: Vec<PositionFix>) -> Vec<PositionFix> {
        match self.report_fixes(&batch).await {
            Ok(resp) => {
                let ignored = resp.accepted.iter().filter(|&&i| i >= batch.len()).count();
                if ignored > 0 {
                    log::warn!("[SINK] Ignoring {} out-of-range accepted indices", ignored);
                }
                select_accepted(batch, &resp.accepted)
            }
            Err(e) => {
                log::warn!("[SINK] Report of {} fixes failed: {}", batch.len(), e);
                Vec::new()
            }
        }
    }
}
