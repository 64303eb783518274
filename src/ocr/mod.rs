//! OCR collaborator seam.
//!
//! The orientation vote needs exactly one capability from an OCR backend:
//! recognize words with confidences on a raster. The trait keeps that
//! surface minimal so the crate never links an OCR stack; callers wire in
//! whatever engine they run (or none, which degrades scanned-page
//! orientation to "no correction").

use std::collections::VecDeque;
use std::sync::Mutex;

use log::debug;

use crate::error::{Error, Result};
use crate::geometry::Rotation;
use crate::handle::PageRaster;

/// A word recognized by the OCR engine.
#[derive(Debug, Clone, PartialEq)]
pub struct OcrWord {
    /// Recognized text
    pub text: String,
    /// Engine confidence in 0.0 to 1.0
    pub confidence: f32,
}

impl OcrWord {
    /// Create a new word.
    pub fn new(text: impl Into<String>, confidence: f32) -> Self {
        Self {
            text: text.into(),
            confidence,
        }
    }
}

/// An engine's opinion of how a raster should be turned to read upright.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientationEstimate {
    /// Additional clockwise quarter turn that makes the raster upright
    pub rotation: Rotation,
    /// Estimate confidence in 0.0 to 1.0
    pub confidence: f32,
}

/// Word recognition over a rendered page.
///
/// Implementations must be shareable across workers; batch processing
/// passes one engine reference to every document job.
pub trait OcrEngine: Send + Sync {
    /// Recognize words on the raster.
    ///
    /// An error here is treated by the orientation vote as a zero score
    /// for that candidate, never as a document failure.
    fn recognize(&self, raster: &PageRaster) -> Result<Vec<OcrWord>>;

    /// Estimate the turn that makes the raster read upright.
    ///
    /// The provided implementation recognizes the raster at all four
    /// quarter turns and takes the best [`vote_score`]. Engines with
    /// native orientation detection should override it.
    fn detect_orientation(&self, raster: &PageRaster) -> Result<OrientationEstimate> {
        let scores = rotation_scores(self, raster);
        let mut best = Rotation::R0;
        let mut best_score = f32::MIN;
        for (rotation, score) in Rotation::ALL.iter().zip(scores.iter()) {
            if *score > best_score {
                best = *rotation;
                best_score = *score;
            }
        }
        Ok(OrientationEstimate {
            rotation: best,
            confidence: best_score.clamp(0.0, 1.0),
        })
    }
}

/// Vote score for one recognition result.
///
/// `avg_word_confidence × (1 + word_count / 100)`: average confidence,
/// with a bonus for recognizing more words. An empty result scores zero.
pub fn vote_score(words: &[OcrWord]) -> f32 {
    if words.is_empty() {
        return 0.0;
    }
    let avg = words.iter().map(|w| w.confidence).sum::<f32>() / words.len() as f32;
    avg * (1.0 + words.len() as f32 / 100.0)
}

/// Score the raster at every quarter turn, in [`Rotation::ALL`] order.
///
/// A recognition failure scores that candidate zero rather than failing
/// the vote.
pub fn rotation_scores<E: OcrEngine + ?Sized>(engine: &E, raster: &PageRaster) -> [f32; 4] {
    let mut scores = [0.0; 4];
    for (slot, rotation) in scores.iter_mut().zip(Rotation::ALL.iter()) {
        *slot = match engine.recognize(&raster.rotated(*rotation)) {
            Ok(words) => vote_score(&words),
            Err(err) => {
                debug!("ocr failed at {}°: {err}", rotation.degrees());
                0.0
            }
        };
    }
    scores
}

/// Scripted [`OcrEngine`] for tests.
///
/// Responses are consumed in call order. The orientation vote queries
/// candidates in the fixed order 0°, 90°, 180°, 270°, so a script of four
/// entries pins one full vote. An exhausted script recognizes nothing.
#[derive(Debug, Default)]
pub struct ScriptedOcr {
    script: Mutex<VecDeque<std::result::Result<Vec<OcrWord>, String>>>,
}

impl ScriptedOcr {
    /// Create an engine with an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a successful recognition to the script.
    pub fn then_words(self, words: Vec<OcrWord>) -> Self {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(Ok(words));
        }
        self
    }

    /// Append `count` identical words at `confidence` to the script.
    pub fn then_uniform(self, count: usize, confidence: f32) -> Self {
        let words = (0..count)
            .map(|i| OcrWord::new(format!("word{i}"), confidence))
            .collect();
        self.then_words(words)
    }

    /// Append a recognition failure to the script.
    pub fn then_failure(self, message: impl Into<String>) -> Self {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(Err(message.into()));
        }
        self
    }

    /// Entries not yet consumed.
    pub fn remaining(&self) -> usize {
        self.script.lock().map(|s| s.len()).unwrap_or(0)
    }
}

impl OcrEngine for ScriptedOcr {
    fn recognize(&self, _raster: &PageRaster) -> Result<Vec<OcrWord>> {
        let mut script = self
            .script
            .lock()
            .map_err(|_| Error::Handle("ocr script mutex poisoned".to_string()))?;
        match script.pop_front() {
            Some(Ok(words)) => Ok(words),
            Some(Err(message)) => Err(Error::Handle(message)),
            None => Ok(Vec::new()),
        }
    }
}
