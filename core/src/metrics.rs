// Inference performance monitoring
//
// Maintains a bounded ring buffer of per-inference metrics and derives a
// composite score over the most recent window. This layer only aggregates and
// signals; re-optimization is executed by the pipeline, not here.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::advisor::ModelVariant;
use crate::capability::DeviceTier;

/// One record per completed inference
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceMetric {
    pub timestamp_ms: i64,
    pub processing_time_ms: u64,
    pub memory_used_bytes: u64,
    pub detection_count: usize,
    pub mean_confidence: f32,
    pub tier: DeviceTier,
    pub variant: ModelVariant,
}

impl InferenceMetric {
    pub fn now(
        processing_time_ms: u64,
        memory_used_bytes: u64,
        detection_count: usize,
        mean_confidence: f32,
        tier: DeviceTier,
        variant: ModelVariant,
    ) -> Self {
        Self {
            timestamp_ms: chrono::Utc::now().timestamp_millis(),
            processing_time_ms,
            memory_used_bytes,
            detection_count,
            mean_confidence,
            tier,
            variant,
        }
    }
}

/// Composite score over the recent metric window, each component in [0, 1].
/// Derived on demand, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerformanceScore {
    pub time_score: f32,
    pub memory_score: f32,
    pub accuracy_score: f32,
    pub overall: f32,
}

impl PerformanceScore {
    /// Neutral score used when no metrics have been recorded yet, so a cold
    /// start never reads as a degradation.
    pub fn neutral() -> Self {
        Self {
            time_score: 1.0,
            memory_score: 1.0,
            accuracy_score: 1.0,
            overall: 1.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Ring buffer capacity; oldest entries are evicted past this
    pub capacity: usize,
    /// How many recent metrics feed the score
    pub score_window: usize,
    /// Processing-time target per frame
    pub target_time_ms: u64,
    /// Memory budget the model runtime is expected to stay under
    pub max_memory_bytes: u64,
    /// avg_memory / available_memory ratio that counts as pressure
    pub pressure_threshold: f32,
    /// Overall score below which re-optimization is requested
    pub reoptimize_floor: f32,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            capacity: 1000,
            score_window: 10,
            target_time_ms: 200,
            max_memory_bytes: 512 * 1024 * 1024,
            pressure_threshold: 0.8,
            reoptimize_floor: 0.7,
        }
    }
}

impl MonitorConfig {
    pub fn with_target_time_ms(mut self, ms: u64) -> Self {
        self.target_time_ms = ms;
        self
    }

    pub fn with_max_memory_bytes(mut self, bytes: u64) -> Self {
        self.max_memory_bytes = bytes;
        self
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }
}

/// Bounded metric collector shared across the inference path.
///
/// Clones share the same buffer. Appends and window reads go through one
/// RwLock so concurrent batch inference cannot corrupt recency ordering.
#[derive(Clone)]
pub struct PerformanceMonitor {
    config: MonitorConfig,
    metrics: Arc<RwLock<VecDeque<InferenceMetric>>>,
}

impl PerformanceMonitor {
    pub fn new() -> Self {
        Self::with_config(MonitorConfig::default())
    }

    pub fn with_config(config: MonitorConfig) -> Self {
        let capacity = config.capacity;
        Self {
            config,
            metrics: Arc::new(RwLock::new(VecDeque::with_capacity(capacity))),
        }
    }

    /// Append a metric, evicting the oldest entry past capacity
    pub async fn record(&self, metric: InferenceMetric) {
        let mut metrics = self.metrics.write().await;
        if metrics.len() >= self.config.capacity {
            metrics.pop_front();
        }
        metrics.push_back(metric);
    }

    /// Most recent metrics, newest first, up to `limit`
    pub async fn recent(&self, limit: usize) -> Vec<InferenceMetric> {
        let metrics = self.metrics.read().await;
        metrics.iter().rev().take(limit).cloned().collect()
    }

    pub async fn count(&self) -> usize {
        self.metrics.read().await.len()
    }

    pub async fn clear(&self) {
        self.metrics.write().await.clear();
    }

    /// Composite score over the most recent window. Each component is the
    /// unweighted mean input to `overall`.
    pub async fn score(&self) -> PerformanceScore {
        let metrics = self.metrics.read().await;
        let window: Vec<&InferenceMetric> =
            metrics.iter().rev().take(self.config.score_window).collect();
        if window.is_empty() {
            return PerformanceScore::neutral();
        }

        let n = window.len() as f64;
        let avg_time =
            window.iter().map(|m| m.processing_time_ms as f64).sum::<f64>() / n;
        let avg_memory =
            window.iter().map(|m| m.memory_used_bytes as f64).sum::<f64>() / n;
        let avg_confidence =
            window.iter().map(|m| m.mean_confidence as f64).sum::<f64>() / n;

        let time_score =
            (1.0 - avg_time / self.config.target_time_ms as f64).max(0.0) as f32;
        let memory_score =
            (1.0 - avg_memory / self.config.max_memory_bytes as f64).max(0.0) as f32;
        let accuracy_score = avg_confidence as f32;

        PerformanceScore {
            time_score,
            memory_score,
            accuracy_score,
            overall: (time_score + memory_score + accuracy_score) / 3.0,
        }
    }

    /// True when the recent window shows the pipeline should be re-tuned:
    /// average time over target, memory pressure against what the device has
    /// available, or a weak composite score.
    pub async fn should_reoptimize(&self, available_memory: u64) -> bool {
        let metrics = self.metrics.read().await;
        let window: Vec<&InferenceMetric> =
            metrics.iter().rev().take(self.config.score_window).collect();
        if window.is_empty() {
            return false;
        }

        let n = window.len() as f64;
        let avg_time =
            window.iter().map(|m| m.processing_time_ms as f64).sum::<f64>() / n;
        let avg_memory =
            window.iter().map(|m| m.memory_used_bytes as f64).sum::<f64>() / n;
        drop(metrics);

        if avg_time > self.config.target_time_ms as f64 {
            return true;
        }
        if available_memory > 0
            && avg_memory / available_memory as f64 > self.config.pressure_threshold as f64
        {
            return true;
        }
        self.score().await.overall < self.config.reoptimize_floor
    }
}

impl Default for PerformanceMonitor {
    fn default() -> Self {
        Self::new()
    }
}
