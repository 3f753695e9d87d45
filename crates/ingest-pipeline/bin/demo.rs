//! Multi-Producer Ingestion Demo
//!
//! Drives the frame processor end to end: several producer tasks generate
//! frames of varied shapes and rates, the pipeline decomposes and converts
//! them, and a consumer task streams the resulting requests to a
//! [`NullService`].
//!
//! Run with: `cargo run --bin demo`

use ingest_frame::{DataColumn, FrameTimestamps, IngestionFrame, SamplingClock};
use ingest_pipeline::{
    IngestError, IngestionFrameProcessor, IngestionService, NullService, ProcessorConfig,
    ProviderRegistration,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;

/// Shape and pace of one producer task.
struct ProducerProfile {
    id: usize,
    frames: usize,
    columns: usize,
    rows: usize,
    pause: Duration,
}

#[derive(Debug)]
struct ProducerStats {
    id: usize,
    frames_sent: usize,
    duration: Duration,
}

fn generate_frame(rng: &mut impl Rng, profile: &ProducerProfile, seq: usize) -> IngestionFrame {
    let columns = (0..profile.columns)
        .map(|c| {
            let values = (0..profile.rows).map(|_| rng.gen_range(-10.0..10.0)).collect();
            DataColumn::doubles(format!("pv-{}-{c}", profile.id), values)
        })
        .collect();
    let mut frame = IngestionFrame::new(
        FrameTimestamps::Clock(SamplingClock::new(seq as i64 * 1_000_000, 1_000, profile.rows)),
        columns,
    )
    .expect("generated frame is well-formed");
    frame.set_label(format!("demo-{}-{seq}", profile.id));
    frame
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    println!("=== Multi-Producer Ingestion Demo ===\n");

    let service = Arc::new(NullService::new());
    let provider = service
        .register_provider(ProviderRegistration::new("demo-provider"))
        .await?;
    println!("Registered provider: {provider}");

    // A deliberately small bin budget so some frames decompose.
    let config = ProcessorConfig::default()
        .with_thread_count(2)
        .with_max_bin_size(16 * 1024)
        .with_queue_capacity(256);
    println!("Pipeline configuration:");
    println!("  Workers per stage: {}", config.concurrency.thread_count);
    println!("  Max bin size: {} bytes", config.decomposition.max_bin_size);
    println!("  Queue capacity: {}\n", config.back_pressure.queue_capacity);

    let processor = Arc::new(IngestionFrameProcessor::new(provider, config));
    processor.activate();

    // --- Consumer: stream requests to the service until the supply ends ---
    let consumer = {
        let processor = Arc::clone(&processor);
        let service = Arc::clone(&service);
        tokio::spawn(async move {
            let mut streamed = 0u64;
            loop {
                match processor.take().await {
                    Ok(request) => {
                        service.ingest_data(request).await.expect("null service accepts");
                        streamed += 1;
                    }
                    Err(IngestError::Inactive) => break,
                    Err(err) => {
                        eprintln!("consumer error: {err}");
                        break;
                    }
                }
            }
            streamed
        })
    };

    // --- Producers with varied frame shapes and rates ---
    let profiles = vec![
        ProducerProfile { id: 0, frames: 40, columns: 4, rows: 64, pause: Duration::from_millis(5) },
        ProducerProfile { id: 1, frames: 30, columns: 16, rows: 256, pause: Duration::from_millis(10) },
        ProducerProfile { id: 2, frames: 20, columns: 8, rows: 1_024, pause: Duration::from_millis(15) },
    ];
    println!("Starting {} producer tasks:", profiles.len());
    for profile in &profiles {
        println!(
            "  Producer {}: {} frames of {} x {} doubles",
            profile.id, profile.frames, profile.columns, profile.rows
        );
    }
    println!();

    let mut producers: JoinSet<ProducerStats> = JoinSet::new();
    for profile in profiles {
        let processor = Arc::clone(&processor);
        producers.spawn(async move {
            // The rng lives across await points and must be Send.
            let mut rng = StdRng::seed_from_u64(profile.id as u64);
            let started = Instant::now();
            for seq in 0..profile.frames {
                let frame = generate_frame(&mut rng, &profile, seq);
                processor.add_frame(frame).await.expect("pipeline accepts while active");
                tokio::time::sleep(profile.pause).await;
            }
            ProducerStats {
                id: profile.id,
                frames_sent: profile.frames,
                duration: started.elapsed(),
            }
        });
    }

    while let Some(stats) = producers.join_next().await {
        let stats = stats?;
        println!(
            "Producer {} finished: {} frames in {:?}",
            stats.id, stats.frames_sent, stats.duration
        );
    }

    // Drain the pipeline, then let the consumer observe the end of supply.
    let clean = processor.shutdown().await?;
    let streamed = consumer.await?;

    let metrics = processor.metrics();
    println!("\n=== Pipeline summary ===");
    println!("  Clean shutdown: {clean}");
    println!("  Frames submitted: {}", metrics.frames_submitted());
    println!("  Sub-frames produced: {}", metrics.frames_decomposed());
    println!("  Requests converted: {}", metrics.requests_converted());
    println!("  Requests streamed: {streamed}");
    println!("  Back-pressure waits: {}", metrics.backpressure_waits());

    Ok(())
}
