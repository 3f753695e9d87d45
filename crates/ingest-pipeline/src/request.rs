//! Wire-level request and response types for the ingestion service.

use ingest_frame::{DataColumn, FrameTimestamps};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Service-assigned identifier for a registered data provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderUid {
    pub id: i32,
    pub name: String,
}

impl ProviderUid {
    pub fn new(id: i32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

impl fmt::Display for ProviderUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.name, self.id)
    }
}

/// Locally generated identifier correlating one request with its
/// acknowledgement. Unique within one process lifetime only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IngestRequestUid(pub String);

impl fmt::Display for IngestRequestUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Registration details handed to the service to obtain a provider UID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderRegistration {
    pub name: String,
    pub attributes: BTreeMap<String, String>,
}

impl ProviderRegistration {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

/// Acknowledgement record the service returns for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionResult {
    pub request_uid: IngestRequestUid,
    pub provider_id: i32,
    pub accepted: bool,
    pub message: Option<String>,
}

impl IngestionResult {
    /// An acceptance acknowledgement.
    pub fn accepted(request_uid: IngestRequestUid, provider_id: i32) -> Self {
        Self {
            request_uid,
            provider_id,
            accepted: true,
            message: None,
        }
    }

    /// A rejection with the service's reason.
    pub fn rejected(
        request_uid: IngestRequestUid,
        provider_id: i32,
        message: impl Into<String>,
    ) -> Self {
        Self {
            request_uid,
            provider_id,
            accepted: false,
            message: Some(message.into()),
        }
    }
}

/// Event metadata derived from a frame's snapshot fields. Fields are
/// omitted when the frame carries no snapshot id or no snapshot domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMetadata {
    pub description: Option<String>,
    pub start_nanos: Option<i64>,
    pub stop_nanos: Option<i64>,
}

/// Frame contents as carried on the wire. Stands in for the protobuf data
/// frame, whose encoding is outside this crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FramePayload {
    pub timestamps: FrameTimestamps,
    pub columns: Vec<DataColumn>,
}

impl FramePayload {
    pub fn row_count(&self) -> usize {
        self.timestamps.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }
}

/// One ingestion request: a single frame plus routing metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestDataRequest {
    pub provider_id: i32,
    pub client_request_id: String,
    /// Wall clock at conversion time (Unix nanoseconds).
    pub request_time_nanos: i64,
    pub attributes: BTreeMap<String, String>,
    pub event_metadata: Option<EventMetadata>,
    pub frame: FramePayload,
}
