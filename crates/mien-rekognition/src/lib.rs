//! mien-rekognition — AWS Rekognition backend for the [`mien_core::Analyzer`] seam.
//!
//! Rekognition is treated as an opaque service: images go out as inline
//! bytes, results come back and are copied verbatim into the core types.

pub mod analyzer;
pub mod convert;
pub mod error;

pub use analyzer::RekognitionAnalyzer;
