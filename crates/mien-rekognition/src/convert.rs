//! SDK → core type conversions.
//!
//! Missing numeric fields become 0.0 and missing names become "UNKNOWN";
//! nothing is filtered or re-scored.

use aws_sdk_rekognition::types as sdk;
use mien_core::{AgeRange, BoundingBox, Emotion, FaceAttribute, FaceDetail, Label};

const UNKNOWN: &str = "UNKNOWN";

pub fn bounding_box_from_sdk(b: &sdk::BoundingBox) -> BoundingBox {
    BoundingBox {
        left: b.left().unwrap_or_default(),
        top: b.top().unwrap_or_default(),
        width: b.width().unwrap_or_default(),
        height: b.height().unwrap_or_default(),
    }
}

fn age_range_from_sdk(a: &sdk::AgeRange) -> AgeRange {
    AgeRange {
        low: a.low().and_then(|v| u32::try_from(v).ok()),
        high: a.high().and_then(|v| u32::try_from(v).ok()),
    }
}

fn flag(name: &str, value: bool, confidence: Option<f32>) -> FaceAttribute {
    FaceAttribute {
        name: name.to_string(),
        value: value.to_string(),
        confidence: confidence.unwrap_or_default(),
    }
}

/// Flatten the optional per-attribute structs of a face into a list.
fn attributes_from_sdk(face: &sdk::FaceDetail) -> Vec<FaceAttribute> {
    let mut attrs = Vec::new();

    if let Some(g) = face.gender() {
        attrs.push(FaceAttribute {
            name: "Gender".to_string(),
            value: g.value().map_or(UNKNOWN, |v| v.as_str()).to_string(),
            confidence: g.confidence().unwrap_or_default(),
        });
    }
    if let Some(a) = face.smile() {
        attrs.push(flag("Smile", a.value(), a.confidence()));
    }
    if let Some(a) = face.eyeglasses() {
        attrs.push(flag("Eyeglasses", a.value(), a.confidence()));
    }
    if let Some(a) = face.sunglasses() {
        attrs.push(flag("Sunglasses", a.value(), a.confidence()));
    }
    if let Some(a) = face.beard() {
        attrs.push(flag("Beard", a.value(), a.confidence()));
    }
    if let Some(a) = face.mustache() {
        attrs.push(flag("Mustache", a.value(), a.confidence()));
    }
    if let Some(a) = face.eyes_open() {
        attrs.push(flag("EyesOpen", a.value(), a.confidence()));
    }
    if let Some(a) = face.mouth_open() {
        attrs.push(flag("MouthOpen", a.value(), a.confidence()));
    }

    attrs
}

pub fn face_from_sdk(face: &sdk::FaceDetail) -> FaceDetail {
    FaceDetail {
        confidence: face.confidence().unwrap_or_default(),
        bounding_box: face.bounding_box().map(bounding_box_from_sdk),
        age_range: face.age_range().map(age_range_from_sdk),
        emotions: face
            .emotions()
            .iter()
            .map(|e| Emotion {
                name: e.r#type().map_or(UNKNOWN, |t| t.as_str()).to_string(),
                confidence: e.confidence().unwrap_or_default(),
            })
            .collect(),
        attributes: attributes_from_sdk(face),
    }
}

pub fn label_from_sdk(label: &sdk::Label) -> Label {
    Label {
        name: label.name().unwrap_or(UNKNOWN).to_string(),
        confidence: label.confidence().unwrap_or_default(),
        parents: label
            .parents()
            .iter()
            .filter_map(|p| p.name().map(str::to_string))
            .collect(),
        categories: label
            .categories()
            .iter()
            .filter_map(|c| c.name().map(str::to_string))
            .collect(),
        instances: label
            .instances()
            .iter()
            .filter_map(|i| i.bounding_box().map(bounding_box_from_sdk))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sdk_box() -> sdk::BoundingBox {
        sdk::BoundingBox::builder()
            .left(0.1)
            .top(0.2)
            .width(0.3)
            .height(0.4)
            .build()
    }

    #[test]
    fn test_face_conversion() {
        let face = sdk::FaceDetail::builder()
            .confidence(99.8)
            .bounding_box(sdk_box())
            .age_range(sdk::AgeRange::builder().low(22).high(30).build())
            .gender(
                sdk::Gender::builder()
                    .value(sdk::GenderType::Female)
                    .confidence(96.0)
                    .build(),
            )
            .smile(sdk::Smile::builder().value(true).confidence(91.5).build())
            .emotions(
                sdk::Emotion::builder()
                    .r#type(sdk::EmotionName::Happy)
                    .confidence(93.0)
                    .build(),
            )
            .emotions(
                sdk::Emotion::builder()
                    .r#type(sdk::EmotionName::Calm)
                    .confidence(4.0)
                    .build(),
            )
            .build();

        let converted = face_from_sdk(&face);
        assert!((converted.confidence - 99.8).abs() < 1e-4);
        assert_eq!(
            converted.bounding_box,
            Some(BoundingBox {
                left: 0.1,
                top: 0.2,
                width: 0.3,
                height: 0.4
            })
        );
        assert_eq!(
            converted.age_range,
            Some(AgeRange {
                low: Some(22),
                high: Some(30)
            })
        );
        assert_eq!(converted.emotions.len(), 2);
        assert_eq!(converted.emotions[0].name, "HAPPY");
        assert_eq!(converted.attributes[0].name, "Gender");
        assert_eq!(converted.attributes[0].value, "Female");
        assert_eq!(converted.attributes[1].name, "Smile");
        assert_eq!(converted.attributes[1].value, "true");
    }

    #[test]
    fn test_face_conversion_sparse() {
        let converted = face_from_sdk(&sdk::FaceDetail::builder().build());
        assert_eq!(converted.confidence, 0.0);
        assert!(converted.bounding_box.is_none());
        assert!(converted.age_range.is_none());
        assert!(converted.emotions.is_empty());
        assert!(converted.attributes.is_empty());
    }

    #[test]
    fn test_emotion_without_type_is_unknown() {
        let face = sdk::FaceDetail::builder()
            .emotions(sdk::Emotion::builder().confidence(50.0).build())
            .build();
        assert_eq!(face_from_sdk(&face).emotions[0].name, "UNKNOWN");
    }

    #[test]
    fn test_negative_age_dropped() {
        let age = sdk::AgeRange::builder().low(-1).high(8).build();
        assert_eq!(
            age_range_from_sdk(&age),
            AgeRange {
                low: None,
                high: Some(8)
            }
        );
    }

    #[test]
    fn test_label_conversion() {
        let label = sdk::Label::builder()
            .name("Hair")
            .confidence(99.2)
            .parents(sdk::Parent::builder().name("Person").build())
            .categories(sdk::LabelCategory::builder().name("Person Description").build())
            .instances(sdk::Instance::builder().bounding_box(sdk_box()).confidence(80.0).build())
            .instances(sdk::Instance::builder().confidence(10.0).build())
            .build();

        let converted = label_from_sdk(&label);
        assert_eq!(converted.name, "Hair");
        assert_eq!(converted.parents, ["Person"]);
        assert_eq!(converted.categories, ["Person Description"]);
        // The instance without a box is skipped.
        assert_eq!(converted.instances.len(), 1);
    }
}
