//! Linemap sidecar consumption.
//!
//! An upstream converter that generated the PDF itself knows every line's
//! exact position, and ships them in a `<stem>.linemap.json` file beside
//! the document. When the sidecar is present the layout engine consumes
//! the positions directly instead of re-deriving them from span geometry.
//! The file is deleted only after the numbered output is saved, so a
//! crashed run can retry with the sidecar intact.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::{Warning, WarningKind};

/// Line positions recorded by an upstream converter.
///
/// The file carries converter bookkeeping besides these two fields; it is
/// ignored. Both fields default when absent, matching the loose JSON the
/// converters write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineMap {
    /// Baseline Y positions in reading order, document-wide
    #[serde(default)]
    pub line_positions: Vec<f32>,
    /// Total line count the converter reported
    #[serde(default)]
    pub total_lines: usize,
}

impl LineMap {
    /// Slice the flat position list into per-page runs.
    ///
    /// Every page takes `len / page_count` positions except the last,
    /// which takes the remainder. The slices preserve recorded order;
    /// per-page sorting happens downstream.
    pub fn positions_per_page(&self, page_count: usize) -> Vec<Vec<f32>> {
        if page_count == 0 {
            return Vec::new();
        }
        let per_page = self.line_positions.len() / page_count;

        let mut slices = Vec::with_capacity(page_count);
        let mut index = 0;
        for page in 0..page_count {
            let take = if page == page_count - 1 {
                self.line_positions.len() - index
            } else {
                per_page.min(self.line_positions.len() - index)
            };
            slices.push(self.line_positions[index..index + take].to_vec());
            index += take;
        }
        slices
    }
}

/// Sidecar path for a document: `<stem>.linemap.json` beside it.
pub fn sidecar_path(document: &Path) -> PathBuf {
    document.with_extension("linemap.json")
}

/// Load the sidecar beside `document`, if a usable one exists.
///
/// A file that cannot be read or parsed is reported as a
/// [`WarningKind::SidecarMalformed`] warning and otherwise ignored; the
/// caller falls back to geometry extraction. A parseable sidecar with no
/// positions is treated as absent.
pub fn load(document: &Path, warnings: &mut Vec<Warning>) -> Option<LineMap> {
    let path = sidecar_path(document);
    if !path.exists() {
        return None;
    }

    let raw = match fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(err) => {
            warn!("could not read sidecar {}: {}", path.display(), err);
            warnings.push(Warning::document(
                WarningKind::SidecarMalformed,
                format!("{}: {err}", path.display()),
            ));
            return None;
        }
    };

    let map: LineMap = match serde_json::from_str(&raw) {
        Ok(map) => map,
        Err(err) => {
            warn!("could not parse sidecar {}: {}", path.display(), err);
            warnings.push(Warning::document(
                WarningKind::SidecarMalformed,
                format!("{}: {err}", path.display()),
            ));
            return None;
        }
    };

    if map.line_positions.is_empty() {
        debug!("sidecar {} carries no positions, ignoring", path.display());
        return None;
    }
    if map.total_lines != 0 && map.total_lines != map.line_positions.len() {
        warnings.push(Warning::document(
            WarningKind::SidecarMalformed,
            format!(
                "total_lines {} disagrees with {} recorded positions",
                map.total_lines,
                map.line_positions.len()
            ),
        ));
    }

    debug!(
        "sidecar {}: {} line positions",
        path.display(),
        map.line_positions.len()
    );
    Some(map)
}

/// Delete a consumed sidecar.
///
/// Called only after the numbered output is saved. Deletion failures are
/// logged and swallowed; a stale sidecar is re-consumed harmlessly on the
/// next run.
pub fn cleanup(document: &Path) {
    let path = sidecar_path(document);
    match fs::remove_file(&path) {
        Ok(()) => debug!("deleted consumed sidecar {}", path.display()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => warn!("could not delete sidecar {}: {}", path.display(), err),
    }
}
