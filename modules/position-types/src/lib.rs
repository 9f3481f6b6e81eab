//! Shared types for the tracer agent and the report endpoint it delivers to.

use serde::{Deserialize, Serialize};

// =====================================================
// Domain Types
// =====================================================

/// One position observation as produced by a sampling provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionFix {
    pub latitude: f64,
    pub longitude: f64,
    /// Horizontal accuracy radius in meters, when the provider reports one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accuracy_m: Option<f32>,
    /// Provider that acquired the fix (gps, network, ...)
    pub provider: String,
    /// RFC 3339 capture time
    pub captured_at: String,
}

// =====================================================
// RPC Request Types
// =====================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct ReportFixesRequest {
    pub device_id: String,
    pub fixes: Vec<PositionFix>,
}

// =====================================================
// RPC Response Types
// =====================================================

/// Indices into `ReportFixesRequest::fixes` that the endpoint stored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportFixesResponse {
    pub accepted: Vec<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RpcResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> RpcResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}
