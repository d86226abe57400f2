//! Core types for the task board.

use serde::{Deserialize, Serialize};

/// Status assigned to every newly created task.
pub const STATUS_TODO: &str = "todo";

/// A task on the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    /// Title.
    pub judul: String,
    /// Free-form status label ("todo", "progress", "done", ...).
    pub status: String,
    /// Task type.
    pub tipe: String,
    pub path_project: Option<String>,
    pub link_website: Option<String>,
    /// Comma-separated tags.
    pub tags: String,
    /// Notes.
    pub catatan: String,
    /// Public URL path of the cover image, empty when no cover is set.
    pub cover: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Task {
    /// Split the comma-separated tag string into trimmed, non-empty tags.
    pub fn tag_list(&self) -> Vec<&str> {
        self.tags
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect()
    }

    pub fn has_cover(&self) -> bool {
        !self.cover.is_empty()
    }
}

/// Input for creating a task. Status is always forced to [`STATUS_TODO`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTask {
    pub judul: String,
    pub tipe: String,
    pub tags: String,
    pub catatan: String,
    pub path_project: Option<String>,
    pub link_website: Option<String>,
}

/// Field-level patch applied by an update.
///
/// `None` leaves the stored column untouched, `Some` overwrites it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPatch {
    pub judul: Option<String>,
    pub status: Option<String>,
    pub tipe: Option<String>,
    pub path_project: Option<String>,
    pub link_website: Option<String>,
    pub tags: Option<String>,
    pub catatan: Option<String>,
}

impl TaskPatch {
    /// True when no field is set.
    pub fn is_empty(&self) -> bool {
        self.judul.is_none()
            && self.status.is_none()
            && self.tipe.is_none()
            && self.path_project.is_none()
            && self.link_website.is_none()
            && self.tags.is_none()
            && self.catatan.is_none()
    }

    /// Overwrite every field of `task` that is present in the patch.
    pub fn apply_to(&self, task: &mut Task) {
        if let Some(ref v) = self.judul {
            task.judul = v.clone();
        }
        if let Some(ref v) = self.status {
            task.status = v.clone();
        }
        if let Some(ref v) = self.tipe {
            task.tipe = v.clone();
        }
        if let Some(ref v) = self.path_project {
            task.path_project = Some(v.clone());
        }
        if let Some(ref v) = self.link_website {
            task.link_website = Some(v.clone());
        }
        if let Some(ref v) = self.tags {
            task.tags = v.clone();
        }
        if let Some(ref v) = self.catatan {
            task.catatan = v.clone();
        }
    }
}

/// An uploaded cover image, fully buffered.
#[derive(Debug, Clone)]
pub struct CoverUpload {
    /// Original client-side filename; only its extension is used.
    pub filename: String,
    pub data: Vec<u8>,
}

impl CoverUpload {
    pub fn new(filename: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            data,
        }
    }

    /// Lowercased extension including the leading dot, or empty.
    pub fn extension(&self) -> String {
        std::path::Path::new(&self.filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e.to_ascii_lowercase()))
            .unwrap_or_default()
    }
}
