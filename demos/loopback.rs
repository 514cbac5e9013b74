//! Loopback streaming example
//!
//! Run with: cargo run --example loopback
//!
//! Drives the engine with a synthetic encoder over an in-process link:
//! SPS/PPS first, then a keyframe every 30 frames with delta frames in
//! between, at roughly 30 fps for a few seconds. Events and final
//! statistics go to stdout; set RUST_LOG=camlink=debug for engine logs.

use std::time::Duration;

use bytes::Bytes;

use camlink::engine::{EngineConfig, FrameKind, StreamEngine};
use camlink::link::MemoryLink;

const FRAME_INTERVAL_MICROS: i64 = 33_333;

#[tokio::main]
async fn main() -> camlink::error::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let (mut engine, mut events) = StreamEngine::new(EngineConfig::default());

    let event_task = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            println!("event: {:?}", event);
        }
    });

    // Simulate a transport that takes a few milliseconds per message
    let link = MemoryLink::new().with_send_delay(Duration::from_millis(2));
    let log = link.log();

    engine.start(link)?;
    engine.send_sps_pps(&[0x67, 0x42, 0x00, 0x1f], &[0x68, 0xce, 0x38, 0x80])?;

    for i in 0..150i64 {
        let (kind, size) = if i % 30 == 0 {
            (FrameKind::Key, 24 * 1024)
        } else {
            (FrameKind::Delta, 4 * 1024)
        };
        engine.send_frame(Bytes::from(vec![0u8; size]), kind, i * FRAME_INTERVAL_MICROS)?;
        tokio::time::sleep(Duration::from_micros(FRAME_INTERVAL_MICROS as u64)).await;
    }

    engine.stop().await;
    event_task.abort();

    let stats = engine.stats();
    println!("sent:      {} frames ({} key)", stats.frames_sent, stats.keyframes_sent);
    println!("dropped:   {}", stats.frames_dropped);
    println!("bytes:     {}", stats.bytes_sent);
    println!("avg rate:  {} kbps", stats.average_bitrate_kbps());
    println!("messages on the wire: {}", log.len());

    Ok(())
}
