//! Frame-to-request conversion and request-ID allocation.

use crate::request::{
    EventMetadata, FramePayload, IngestDataRequest, IngestRequestUid, ProviderUid,
};
use ingest_frame::{FrameError, IngestionFrame};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Constant folded into every allocated request id so ids from different
/// allocator generations remain distinguishable in logs.
const REQUEST_ID_SEED: u64 = 0x1d9f_70b3;

static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(0);

/// Allocates process-unique request identifiers.
///
/// A single process-wide monotonic counter; thread-safe. Identifiers are
/// unique within one process lifetime only — callers needing cross-process
/// uniqueness must wrap them with a UUID or a service-assigned id.
pub struct RequestIdAllocator;

impl RequestIdAllocator {
    /// Returns a fresh, never-before-issued request id.
    pub fn next() -> IngestRequestUid {
        let count = NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed);
        IngestRequestUid(format!("{REQUEST_ID_SEED:08x}-{count}"))
    }
}

/// Wall clock as Unix nanoseconds.
pub(crate) fn epoch_nanos_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos() as i64
}

/// Produces one request message for one frame. No splitting happens here —
/// oversized frames must go through the binner first.
///
/// The frame is consumed: its timestamps and columns move into the request
/// payload, its attribute map becomes the request attributes, and its
/// snapshot fields (when present) become the event metadata.
pub fn create_request(
    frame: IngestionFrame,
    provider: &ProviderUid,
    request_id: IngestRequestUid,
) -> Result<IngestDataRequest, FrameError> {
    if !frame.has_data() {
        return Err(FrameError::Empty);
    }

    let contents = frame.into_contents();
    let event_metadata = if contents.snapshot_id.is_some() || contents.snapshot_domain.is_some() {
        Some(EventMetadata {
            description: contents.snapshot_id,
            start_nanos: contents.snapshot_domain.map(|d| d.begin_nanos),
            stop_nanos: contents.snapshot_domain.map(|d| d.end_nanos),
        })
    } else {
        None
    };

    Ok(IngestDataRequest {
        provider_id: provider.id,
        client_request_id: request_id.0,
        request_time_nanos: epoch_nanos_now(),
        attributes: contents.attributes,
        event_metadata,
        frame: FramePayload {
            timestamps: contents.timestamps,
            columns: contents.columns,
        },
    })
}

/// Converter bound to a default provider, used by the pipeline's conversion
/// workers.
#[derive(Debug, Clone)]
pub struct RequestConverter {
    provider: ProviderUid,
}

impl RequestConverter {
    pub fn new(provider: ProviderUid) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &ProviderUid {
        &self.provider
    }

    /// Converts with an explicit provider and request id.
    pub fn create_request(
        &self,
        frame: IngestionFrame,
        provider: &ProviderUid,
        request_id: IngestRequestUid,
    ) -> Result<IngestDataRequest, FrameError> {
        create_request(frame, provider, request_id)
    }

    /// Converts for the given provider, allocating a fresh request id.
    pub fn create_for(
        &self,
        frame: IngestionFrame,
        provider: &ProviderUid,
    ) -> Result<IngestDataRequest, FrameError> {
        create_request(frame, provider, RequestIdAllocator::next())
    }

    /// Converts for the default provider with a fresh request id.
    pub fn create(&self, frame: IngestionFrame) -> Result<IngestDataRequest, FrameError> {
        create_request(frame, &self.provider, RequestIdAllocator::next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ingest_frame::{DataColumn, FrameTimestamps, SamplingClock, TimeDomain};
    use std::collections::HashSet;

    fn small_frame() -> IngestionFrame {
        IngestionFrame::new(
            FrameTimestamps::Clock(SamplingClock::new(100, 10, 2)),
            vec![DataColumn::doubles("pv", vec![1.5, 2.5])],
        )
        .unwrap()
    }

    fn provider() -> ProviderUid {
        ProviderUid::new(7, "test-provider")
    }

    #[test]
    fn request_carries_frame_data() {
        let mut frame = small_frame();
        frame.insert_attribute("site", "lab");
        let request =
            create_request(frame, &provider(), IngestRequestUid("r-1".into())).unwrap();

        assert_eq!(request.provider_id, 7);
        assert_eq!(request.client_request_id, "r-1");
        assert!(request.request_time_nanos > 0);
        assert_eq!(request.attributes.get("site").map(String::as_str), Some("lab"));
        assert_eq!(request.frame.row_count(), 2);
        assert_eq!(request.frame.column_count(), 1);
    }

    #[test]
    fn event_metadata_omitted_without_snapshot() {
        let request =
            create_request(small_frame(), &provider(), RequestIdAllocator::next()).unwrap();
        assert!(request.event_metadata.is_none());
    }

    #[test]
    fn event_metadata_from_snapshot_fields() {
        let mut frame = small_frame();
        frame.set_snapshot("snap-42", TimeDomain::new(100, 110));
        let request =
            create_request(frame, &provider(), RequestIdAllocator::next()).unwrap();

        let metadata = request.event_metadata.unwrap();
        assert_eq!(metadata.description.as_deref(), Some("snap-42"));
        assert_eq!(metadata.start_nanos, Some(100));
        assert_eq!(metadata.stop_nanos, Some(110));
    }

    #[test]
    fn event_metadata_partial_snapshot_id_only() {
        let mut frame = small_frame();
        frame.set_snapshot_id("snap-43");
        let request =
            create_request(frame, &provider(), RequestIdAllocator::next()).unwrap();

        let metadata = request.event_metadata.unwrap();
        assert_eq!(metadata.description.as_deref(), Some("snap-43"));
        assert_eq!(metadata.start_nanos, None);
        assert_eq!(metadata.stop_nanos, None);
    }

    #[test]
    fn empty_frame_rejected() {
        let frame = IngestionFrame::default();
        let err =
            create_request(frame, &provider(), RequestIdAllocator::next()).unwrap_err();
        assert_eq!(err, FrameError::Empty);
    }

    #[test]
    fn request_ids_are_distinct_across_threads() {
        let mut handles = Vec::new();
        for _ in 0..8 {
            handles.push(std::thread::spawn(|| {
                (0..500)
                    .map(|_| RequestIdAllocator::next().0)
                    .collect::<Vec<_>>()
            }));
        }
        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id), "duplicate request id issued");
            }
        }
        assert_eq!(seen.len(), 4_000);
    }
}
