use crate::models::BoundingBox;

/// Overlap thresholds used by the panel merge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MergeThresholds {
    /// IoU at or below which two panels are disjoint.
    pub disjoint: f64,
    /// IoU at or above which two panels share the same box.
    pub identical: f64,
    /// Action IoU above which two actions are the same element.
    pub duplicate_action: f64,
    /// Fraction of a box's area that must fall inside the other for containment.
    pub containment: f64,
}

impl Default for MergeThresholds {
    fn default() -> Self {
        Self {
            disjoint: 0.0,
            identical: 1.0,
            duplicate_action: 0.9,
            containment: 0.95,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Containment {
    AInB,
    BInA,
    Neither,
}

impl Containment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AInB => "A_in_B",
            Self::BInA => "B_in_A",
            Self::Neither => "neither",
        }
    }
}

pub fn intersection_area(a: &BoundingBox, b: &BoundingBox) -> f64 {
    let w = a.right().min(b.right()) - a.x.max(b.x);
    let h = a.bottom().min(b.bottom()) - a.y.max(b.y);
    if w <= 0.0 || h <= 0.0 {
        0.0
    } else {
        w * h
    }
}

/// Intersection over union; zero when either box is empty.
pub fn iou(a: &BoundingBox, b: &BoundingBox) -> f64 {
    let inter = intersection_area(a, b);
    if inter <= 0.0 {
        return 0.0;
    }
    let union = a.area() + b.area() - inter;
    if union <= 0.0 {
        0.0
    } else {
        (inter / union).min(1.0)
    }
}

pub fn is_box_inside(a: &BoundingBox, b: &BoundingBox, threshold: f64) -> Containment {
    let inter = intersection_area(a, b);
    if inter <= 0.0 {
        return Containment::Neither;
    }
    if a.area() > 0.0 && inter / a.area() >= threshold {
        Containment::AInB
    } else if b.area() > 0.0 && inter / b.area() >= threshold {
        Containment::BInA
    } else {
        Containment::Neither
    }
}

/// Bounding hull of a set of boxes.
pub fn hull<'a>(boxes: impl IntoIterator<Item = &'a BoundingBox>) -> Option<BoundingBox> {
    boxes
        .into_iter()
        .fold(None, |acc: Option<BoundingBox>, b| match acc {
            Some(acc) => Some(acc.hull(b)),
            None => Some(*b),
        })
}
