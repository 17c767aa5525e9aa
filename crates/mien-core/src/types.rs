use serde::{Deserialize, Serialize};

/// Location of a detected face or object, as ratios of the image size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    /// Convert ratio coordinates to pixels for an image of the given size.
    pub fn to_pixels(&self, image_width: u32, image_height: u32) -> (u32, u32, u32, u32) {
        let px = |ratio: f32, side: u32| (ratio.clamp(0.0, 1.0) * side as f32).round() as u32;
        (
            px(self.left, image_width),
            px(self.top, image_height),
            px(self.width, image_width),
            px(self.height, image_height),
        )
    }
}

/// One emotion estimate for a face (e.g. "HAPPY", 97.3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Emotion {
    pub name: String,
    pub confidence: f32,
}

/// Estimated age range in years.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgeRange {
    pub low: Option<u32>,
    pub high: Option<u32>,
}

/// A facial attribute with its predicted value (e.g. "Smile" = "true").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceAttribute {
    pub name: String,
    pub value: String,
    pub confidence: f32,
}

/// Everything returned for one detected face.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceDetail {
    /// Confidence that the box contains a face [0, 100].
    pub confidence: f32,
    pub bounding_box: Option<BoundingBox>,
    pub age_range: Option<AgeRange>,
    pub emotions: Vec<Emotion>,
    pub attributes: Vec<FaceAttribute>,
}

impl FaceDetail {
    /// Emotions sorted by confidence, highest first.
    pub fn emotions_by_confidence(&self) -> Vec<&Emotion> {
        let mut sorted: Vec<&Emotion> = self.emotions.iter().collect();
        sorted.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        sorted
    }

    pub fn dominant_emotion(&self) -> Option<&Emotion> {
        self.emotions_by_confidence().into_iter().next()
    }
}

/// An object, scene or concept label for the whole image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
    pub confidence: f32,
    /// Ancestor labels in the taxonomy (e.g. "Person" for "Hair").
    #[serde(default)]
    pub parents: Vec<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    /// Boxes for labels that correspond to localized objects.
    #[serde(default)]
    pub instances: Vec<BoundingBox>,
}

/// Limits passed to label detection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LabelOptions {
    pub max_labels: u32,
    /// Labels below this confidence [0, 100] are not returned.
    pub min_confidence: f32,
}

impl Default for LabelOptions {
    fn default() -> Self {
        Self {
            max_labels: 10,
            min_confidence: 55.0,
        }
    }
}
