//! Blocking per-frame ingestion façade.
//!
//! The unary client performs the same decomposition as the pipeline, but
//! synchronously: bin, convert, then one RPC per message, collecting
//! acknowledgements in order. It decomposes by column only — a frame whose
//! single column overflows the budget is surfaced to the caller rather than
//! retried by row, since the caller of a serial API wants the predictable
//! error.

use crate::convert::{create_request, RequestIdAllocator};
use crate::error::IngestError;
use crate::request::{IngestionResult, ProviderRegistration, ProviderUid};
use crate::service::IngestionService;
use ingest_frame::{FrameBinner, IngestionFrame};

/// Default decomposition budget: the transport's maximum serialized message
/// size.
pub const DEFAULT_MAX_BIN_SIZE: u64 = 1 << 22;

/// Serial ingestion client: one frame in, an ordered list of
/// acknowledgements out.
pub struct UnaryIngestClient<S> {
    service: S,
    provider: Option<ProviderUid>,
    binner: Option<FrameBinner>,
}

impl<S: IngestionService> UnaryIngestClient<S> {
    /// Creates a client with frame decomposition enabled at the transport
    /// limit.
    pub fn new(service: S) -> Self {
        Self {
            service,
            provider: None,
            binner: Some(FrameBinner::new(DEFAULT_MAX_BIN_SIZE)),
        }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    /// The provider registered with this client, if any.
    pub fn provider(&self) -> Option<&ProviderUid> {
        self.provider.as_ref()
    }

    /// Registers the data provider used by subsequent `ingest` calls.
    pub async fn register_provider(
        &mut self,
        registration: ProviderRegistration,
    ) -> Result<ProviderUid, IngestError> {
        let uid = self.service.register_provider(registration).await?;
        self.provider = Some(uid.clone());
        Ok(uid)
    }

    /// Enables column-wise decomposition of oversized frames.
    ///
    /// Safe at any time; applies to subsequent `ingest` calls.
    pub fn enable_frame_decomposition(&mut self, max_bin_size: u64) {
        self.binner = Some(FrameBinner::new(max_bin_size));
    }

    /// Disables decomposition; the caller becomes responsible for sizing.
    pub fn disable_frame_decomposition(&mut self) {
        self.binner = None;
    }

    /// Ingests one frame, decomposing it when enabled and oversized, and
    /// returns the service acknowledgements in transmission order.
    ///
    /// The frame is consumed. A rejection from the service aborts the
    /// remaining transmissions and surfaces as [`IngestError::Rejected`].
    pub async fn ingest(
        &self,
        frame: IngestionFrame,
    ) -> Result<Vec<IngestionResult>, IngestError> {
        let provider = self
            .provider
            .as_ref()
            .ok_or(IngestError::UnregisteredProvider)?;

        let mut frame = frame;
        let frames = match &self.binner {
            Some(binner) => binner.bin_horizontally(&mut frame)?,
            None => vec![frame],
        };

        let mut results = Vec::with_capacity(frames.len());
        for frame in frames {
            let request = create_request(frame, provider, RequestIdAllocator::next())?;
            let result = self.service.ingest_data(request).await?;
            if !result.accepted {
                return Err(IngestError::Rejected {
                    request_uid: result.request_uid.0,
                    message: result.message.unwrap_or_default(),
                });
            }
            results.push(result);
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{IngestDataRequest, IngestRequestUid};
    use ingest_frame::{DataColumn, FrameError, FrameTimestamps, SamplingClock};
    use std::sync::Mutex;

    /// Records every request; rejects when `reject_after` is reached.
    struct RecordingService {
        requests: Mutex<Vec<IngestDataRequest>>,
        reject_after: Option<usize>,
    }

    impl RecordingService {
        fn new() -> Self {
            Self {
                requests: Mutex::new(Vec::new()),
                reject_after: None,
            }
        }

        fn rejecting_after(n: usize) -> Self {
            Self {
                requests: Mutex::new(Vec::new()),
                reject_after: Some(n),
            }
        }

        fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    impl IngestionService for RecordingService {
        async fn register_provider(
            &self,
            registration: ProviderRegistration,
        ) -> Result<ProviderUid, IngestError> {
            Ok(ProviderUid::new(1, registration.name))
        }

        async fn ingest_data(
            &self,
            request: IngestDataRequest,
        ) -> Result<IngestionResult, IngestError> {
            let uid = IngestRequestUid(request.client_request_id.clone());
            let provider_id = request.provider_id;
            let mut requests = self.requests.lock().unwrap();
            requests.push(request);
            if self.reject_after.is_some_and(|n| requests.len() > n) {
                return Ok(IngestionResult::rejected(uid, provider_id, "quota"));
            }
            Ok(IngestionResult::accepted(uid, provider_id))
        }

        fn name(&self) -> &str {
            "recording"
        }
    }

    fn wide_frame(cols: usize, rows: usize) -> IngestionFrame {
        let columns = (0..cols)
            .map(|i| DataColumn::doubles(format!("col-{i}"), vec![0.0; rows]))
            .collect();
        IngestionFrame::new(
            FrameTimestamps::Clock(SamplingClock::new(0, 1, rows)),
            columns,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn ingest_requires_registration() {
        let client = UnaryIngestClient::new(RecordingService::new());
        let err = client.ingest(wide_frame(1, 4)).await.unwrap_err();
        assert!(matches!(err, IngestError::UnregisteredProvider));
    }

    #[tokio::test]
    async fn small_frame_is_one_rpc() {
        let mut client = UnaryIngestClient::new(RecordingService::new());
        client
            .register_provider(ProviderRegistration::new("p"))
            .await
            .unwrap();

        let results = client.ingest(wide_frame(2, 8)).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(client.service().request_count(), 1);
    }

    #[tokio::test]
    async fn oversized_frame_splits_into_ordered_rpcs() {
        let mut client = UnaryIngestClient::new(RecordingService::new());
        client
            .register_provider(ProviderRegistration::new("p"))
            .await
            .unwrap();
        // 8 columns x 160 rows of doubles = 10,240 bytes under a 4,096 budget.
        client.enable_frame_decomposition(4_096);

        let results = client.ingest(wide_frame(8, 160)).await.unwrap();
        assert_eq!(results.len(), 3);

        let requests = client.service().requests.lock().unwrap();
        assert_eq!(requests[0].frame.columns[0].name, "col-0");
        assert_eq!(requests[1].frame.columns[0].name, "col-3");
        assert_eq!(requests[2].frame.columns[0].name, "col-6");
    }

    #[tokio::test]
    async fn column_too_wide_surfaces_frame_error() {
        let mut client = UnaryIngestClient::new(RecordingService::new());
        client
            .register_provider(ProviderRegistration::new("p"))
            .await
            .unwrap();
        client.enable_frame_decomposition(4_096);

        // One 5,120-byte column cannot split by column; no fallback here.
        let err = client.ingest(wide_frame(1, 640)).await.unwrap_err();
        assert!(matches!(
            err,
            IngestError::Frame(FrameError::ColumnExceedsBin { .. })
        ));
        assert_eq!(client.service().request_count(), 0);
    }

    #[tokio::test]
    async fn disabled_decomposition_passes_frames_through() {
        let mut client = UnaryIngestClient::new(RecordingService::new());
        client
            .register_provider(ProviderRegistration::new("p"))
            .await
            .unwrap();
        client.disable_frame_decomposition();

        let results = client.ingest(wide_frame(8, 160)).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(client.service().requests.lock().unwrap()[0].frame.column_count(), 8);
    }

    #[tokio::test]
    async fn rejection_aborts_remaining_transmissions() {
        let mut client = UnaryIngestClient::new(RecordingService::rejecting_after(1));
        client
            .register_provider(ProviderRegistration::new("p"))
            .await
            .unwrap();
        client.enable_frame_decomposition(4_096);

        let err = client.ingest(wide_frame(8, 160)).await.unwrap_err();
        assert!(matches!(err, IngestError::Rejected { .. }));
        // First accepted, second rejected, third never sent.
        assert_eq!(client.service().request_count(), 2);
    }
}
