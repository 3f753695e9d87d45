//! The downstream ingestion service interface and provided adapters.
//!
//! The real service sits behind an RPC stub that is outside this crate;
//! here it is a trait so clients and tests can plug in any transport.

use crate::error::IngestError;
use crate::request::{
    IngestDataRequest, IngestRequestUid, IngestionResult, ProviderRegistration, ProviderUid,
};
use std::future::Future;
use std::sync::atomic::{AtomicI32, Ordering};

/// The Ingestion Service as seen by this client.
///
/// Uses native async fn in traits. For dynamic dispatch, use
/// [`IngestionServiceBoxed`].
pub trait IngestionService: Send + Sync {
    /// Registers a data provider, yielding its service-assigned UID.
    fn register_provider(
        &self,
        registration: ProviderRegistration,
    ) -> impl Future<Output = Result<ProviderUid, IngestError>> + Send;

    /// Sends one request over the unary RPC and returns the acknowledgement.
    fn ingest_data(
        &self,
        request: IngestDataRequest,
    ) -> impl Future<Output = Result<IngestionResult, IngestError>> + Send;

    /// Service name for diagnostics.
    fn name(&self) -> &str;
}

/// Object-safe version of [`IngestionService`] for dynamic dispatch.
pub trait IngestionServiceBoxed: Send + Sync {
    fn register_provider_boxed(
        &self,
        registration: ProviderRegistration,
    ) -> std::pin::Pin<Box<dyn Future<Output = Result<ProviderUid, IngestError>> + Send + '_>>;

    fn ingest_data_boxed(
        &self,
        request: IngestDataRequest,
    ) -> std::pin::Pin<Box<dyn Future<Output = Result<IngestionResult, IngestError>> + Send + '_>>;

    fn name(&self) -> &str;
}

/// Blanket implementation: any IngestionService can be used boxed.
impl<T: IngestionService> IngestionServiceBoxed for T {
    fn register_provider_boxed(
        &self,
        registration: ProviderRegistration,
    ) -> std::pin::Pin<Box<dyn Future<Output = Result<ProviderUid, IngestError>> + Send + '_>>
    {
        Box::pin(self.register_provider(registration))
    }

    fn ingest_data_boxed(
        &self,
        request: IngestDataRequest,
    ) -> std::pin::Pin<Box<dyn Future<Output = Result<IngestionResult, IngestError>> + Send + '_>>
    {
        Box::pin(self.ingest_data(request))
    }

    fn name(&self) -> &str {
        IngestionService::name(self)
    }
}

/// Accepts every request and discards it (benchmarking and demos).
pub struct NullService {
    next_provider: AtomicI32,
}

impl NullService {
    pub fn new() -> Self {
        Self {
            next_provider: AtomicI32::new(1),
        }
    }
}

impl Default for NullService {
    fn default() -> Self {
        Self::new()
    }
}

impl IngestionService for NullService {
    async fn register_provider(
        &self,
        registration: ProviderRegistration,
    ) -> Result<ProviderUid, IngestError> {
        let id = self.next_provider.fetch_add(1, Ordering::Relaxed);
        Ok(ProviderUid::new(id, registration.name))
    }

    async fn ingest_data(
        &self,
        request: IngestDataRequest,
    ) -> Result<IngestionResult, IngestError> {
        Ok(IngestionResult::accepted(
            IngestRequestUid(request.client_request_id),
            request.provider_id,
        ))
    }

    fn name(&self) -> &str {
        "null"
    }
}

/// Appends accepted requests as JSON lines (local development).
pub struct JsonFileService {
    file_path: String,
    next_provider: AtomicI32,
}

impl JsonFileService {
    pub fn new(file_path: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            next_provider: AtomicI32::new(1),
        }
    }
}

impl IngestionService for JsonFileService {
    async fn register_provider(
        &self,
        registration: ProviderRegistration,
    ) -> Result<ProviderUid, IngestError> {
        let id = self.next_provider.fetch_add(1, Ordering::Relaxed);
        Ok(ProviderUid::new(id, registration.name))
    }

    async fn ingest_data(
        &self,
        request: IngestDataRequest,
    ) -> Result<IngestionResult, IngestError> {
        use tokio::io::AsyncWriteExt;

        let request_uid = IngestRequestUid(request.client_request_id.clone());
        let provider_id = request.provider_id;
        let mut line = serde_json::to_string(&request)
            .map_err(|e| IngestError::Transport(e.to_string()))?;
        line.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.file_path)
            .await
            .map_err(|e| IngestError::Transport(e.to_string()))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| IngestError::Transport(e.to_string()))?;

        Ok(IngestionResult::accepted(request_uid, provider_id))
    }

    fn name(&self) -> &str {
        "json_file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::RequestIdAllocator;
    use crate::request::FramePayload;
    use ingest_frame::{DataColumn, FrameTimestamps};
    use std::collections::BTreeMap;

    fn request_for(provider_id: i32) -> IngestDataRequest {
        IngestDataRequest {
            provider_id,
            client_request_id: RequestIdAllocator::next().0,
            request_time_nanos: 1,
            attributes: BTreeMap::new(),
            event_metadata: None,
            frame: FramePayload {
                timestamps: FrameTimestamps::List(vec![1]),
                columns: vec![DataColumn::doubles("pv", vec![0.5])],
            },
        }
    }

    #[tokio::test]
    async fn null_service_accepts_everything() {
        let service = NullService::new();
        let uid = service
            .register_provider(ProviderRegistration::new("p"))
            .await
            .unwrap();
        let result = service.ingest_data(request_for(uid.id)).await.unwrap();
        assert!(result.accepted);
        assert_eq!(result.provider_id, uid.id);
    }

    #[tokio::test]
    async fn boxed_dispatch_matches_direct() {
        let service: Box<dyn IngestionServiceBoxed> = Box::new(NullService::new());
        let uid = service
            .register_provider_boxed(ProviderRegistration::new("p"))
            .await
            .unwrap();
        let result = service.ingest_data_boxed(request_for(uid.id)).await.unwrap();
        assert!(result.accepted);
        assert_eq!(service.name(), "null");
    }
}
