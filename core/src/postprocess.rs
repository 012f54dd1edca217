// Detection post-processing: confidence filtering and non-maximum suppression
//
// Input boxes come straight from the inference kernel and are untrusted:
// confidences and centers are clamped into range and degenerate boxes are
// dropped before any geometry runs. The whole pass is deterministic for a
// fixed input, including the confidence-tie ordering.

use serde::{Deserialize, Serialize};

/// Axis-aligned box in normalized image space, center-based
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Corner coordinates as (left, top, right, bottom)
    pub fn corners(&self) -> (f32, f32, f32, f32) {
        (
            self.x - self.width / 2.0,
            self.y - self.height / 2.0,
            self.x + self.width / 2.0,
            self.y + self.height / 2.0,
        )
    }

    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    /// Intersection over union. 0.0 when the boxes are disjoint or either
    /// area is zero.
    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let (l1, t1, r1, b1) = self.corners();
        let (l2, t2, r2, b2) = other.corners();

        let inter_w = (r1.min(r2) - l1.max(l2)).max(0.0);
        let inter_h = (b1.min(b2) - t1.max(t2)).max(0.0);
        let intersection = inter_w * inter_h;

        let union = self.area() + other.area() - intersection;
        if union <= 0.0 {
            return 0.0;
        }
        intersection / union
    }

    /// Euclidean distance between box centers in normalized space
    pub fn center_distance(&self, other: &BoundingBox) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Raw detector output: one candidate box with class and confidence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDetection {
    pub bbox: BoundingBox,
    pub confidence: f32,
    pub class_id: u32,
    pub class_name: String,
}

impl RawDetection {
    pub fn new(
        bbox: BoundingBox,
        confidence: f32,
        class_id: u32,
        class_name: impl Into<String>,
    ) -> Self {
        Self {
            bbox,
            confidence,
            class_id,
            class_name: class_name.into(),
        }
    }
}

/// Confidence filter + greedy per-class NMS over raw detections
pub struct DetectionPostProcessor;

impl DetectionPostProcessor {
    pub fn new() -> Self {
        Self
    }

    /// Drop detections below `confidence_threshold`, then suppress
    /// same-class boxes overlapping a kept box above `iou_threshold`.
    /// Output is in confidence-descending order, ties broken by original
    /// input order. O(n²) over the surviving set.
    pub fn process(
        &self,
        detections: Vec<RawDetection>,
        confidence_threshold: f32,
        iou_threshold: f32,
    ) -> Vec<RawDetection> {
        if detections.is_empty() {
            return Vec::new();
        }

        let candidates: Vec<RawDetection> = detections
            .into_iter()
            .filter_map(sanitize)
            .filter(|d| d.confidence >= confidence_threshold)
            .collect();

        non_max_suppression(candidates, iou_threshold)
    }
}

impl Default for DetectionPostProcessor {
    fn default() -> Self {
        Self::new()
    }
}

// Reject or repair malformed kernel output instead of halting the pipeline:
// non-finite or degenerate boxes are dropped, out-of-range fields clamped.
fn sanitize(mut d: RawDetection) -> Option<RawDetection> {
    let b = d.bbox;
    if !b.x.is_finite()
        || !b.y.is_finite()
        || !b.width.is_finite()
        || !b.height.is_finite()
        || !d.confidence.is_finite()
    {
        return None;
    }
    if b.width <= 0.0 || b.height <= 0.0 {
        return None;
    }
    d.confidence = d.confidence.clamp(0.0, 1.0);
    d.bbox.x = b.x.clamp(0.0, 1.0);
    d.bbox.y = b.y.clamp(0.0, 1.0);
    d.bbox.width = b.width.min(1.0);
    d.bbox.height = b.height.min(1.0);
    Some(d)
}

fn non_max_suppression(candidates: Vec<RawDetection>, iou_threshold: f32) -> Vec<RawDetection> {
    // Stable index sort: confidence descending, original input order on ties
    let mut order: Vec<usize> = (0..candidates.len()).collect();
    order.sort_by(|&a, &b| {
        candidates[b]
            .confidence
            .partial_cmp(&candidates[a].confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.cmp(&b))
    });

    let mut suppressed = vec![false; candidates.len()];
    let mut kept: Vec<RawDetection> = Vec::new();

    for (rank, &i) in order.iter().enumerate() {
        if suppressed[i] {
            continue;
        }
        for &j in &order[rank + 1..] {
            if suppressed[j] || candidates[j].class_id != candidates[i].class_id {
                continue;
            }
            if candidates[i].bbox.iou(&candidates[j].bbox) > iou_threshold {
                suppressed[j] = true;
            }
        }
        kept.push(candidates[i].clone());
    }

    kept
}
