use sitewarden_core::capability::StaticSignals;
use sitewarden_core::{
    BoundingBox, HazardPipeline, RawDetection, StubKernel, WorkType,
};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logging / tracing
    let filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "info,sitewarden_core=debug,site_agent=info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    info!(
        target: "site_agent",
        "Starting Site Agent demo: Frame -> Backend selection -> Detection -> Hazard report"
    );

    // A canned frame: one worker with no PPE detections near an open edge.
    // A real deployment wires a camera feed and an on-device kernel here.
    let kernel = Arc::new(StubKernel::with_detections(vec![
        RawDetection::new(BoundingBox::new(0.45, 0.55, 0.18, 0.42), 0.91, 0, "person"),
        RawDetection::new(BoundingBox::new(0.78, 0.30, 0.25, 0.20), 0.88, 5, "unguarded-edge"),
        RawDetection::new(BoundingBox::new(0.20, 0.80, 0.15, 0.10), 0.62, 8, "debris"),
    ]));

    let pipeline = HazardPipeline::new(kernel, Arc::new(StaticSignals::high_end()))?;
    pipeline.start().await;

    let caps = pipeline.capabilities();
    info!(target: "site_agent", tier = ?caps.tier, has_npu = caps.has_npu, "device probed");

    for descriptor in pipeline.descriptors().await {
        info!(
            target: "site_agent",
            analyzer = %descriptor.name,
            priority = descriptor.priority,
            available = descriptor.available,
            "chain member"
        );
    }

    // Simulate a short monitoring session
    for frame in 0..5u32 {
        let report = pipeline
            .analyze(vec![0u8; 640 * 480], WorkType::GeneralConstruction)
            .await;

        info!(
            target: "site_agent",
            frame,
            served_by = %report.served_by,
            degraded = report.degraded,
            hazards = report.assessment.hazards.len(),
            severity = ?report.assessment.overall_severity,
            elapsed_ms = report.elapsed_ms,
            "frame analyzed"
        );

        if frame == 0 {
            println!("{}", serde_json::to_string_pretty(&report.assessment)?);
        }
    }

    let score = pipeline.performance().await;
    info!(
        target: "site_agent",
        overall = score.overall,
        time = score.time_score,
        memory = score.memory_score,
        accuracy = score.accuracy_score,
        "session performance"
    );

    Ok(())
}
