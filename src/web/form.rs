//! Multipart task form parsing.

use axum::extract::Multipart;
use std::collections::HashMap;

use crate::error::{AppError, AppResult};
use crate::types::{CoverUpload, NewTask, TaskPatch};

/// Name of the file field carrying the cover image.
pub const COVER_FIELD: &str = "cover";

/// Fields of a submitted task form.
#[derive(Debug, Default)]
pub struct TaskForm {
    fields: HashMap<String, String>,
    pub cover: Option<CoverUpload>,
}

impl TaskForm {
    /// Read every part of a multipart body. A file part with no name or no
    /// content counts as "no cover".
    pub async fn from_multipart(mut multipart: Multipart) -> AppResult<Self> {
        let mut form = Self::default();
        while let Some(field) = multipart.next_field().await.map_err(bad_request)? {
            let name = field.name().unwrap_or_default().to_string();
            if name == COVER_FIELD {
                let filename = field.file_name().unwrap_or_default().to_string();
                let data = field.bytes().await.map_err(bad_request)?;
                if !filename.is_empty() && !data.is_empty() {
                    form.cover = Some(CoverUpload::new(filename, data.to_vec()));
                }
            } else {
                let value = field.text().await.map_err(bad_request)?;
                form.fields.insert(name, value);
            }
        }
        Ok(form)
    }

    pub fn insert(&mut self, name: &str, value: &str) {
        self.fields.insert(name.to_string(), value.to_string());
    }

    /// Value of `name` as submitted; missing or whitespace-only values are
    /// `None`.
    pub fn value(&self, name: &str) -> Option<String> {
        self.fields
            .get(name)
            .filter(|v| !v.trim().is_empty())
            .cloned()
    }

    /// Build a create input. Missing text fields become empty strings and
    /// missing optional links stay `None`.
    pub fn new_task(&self) -> NewTask {
        NewTask {
            judul: self.value("judul").unwrap_or_default(),
            tipe: self.value("tipe").unwrap_or_default(),
            tags: self.value("tags").unwrap_or_default(),
            catatan: self.value("catatan").unwrap_or_default(),
            path_project: self.value("path_project"),
            link_website: self.value("link_website"),
        }
    }

    /// Build an update patch: only non-empty fields are applied.
    pub fn patch(&self) -> TaskPatch {
        TaskPatch {
            judul: self.value("judul"),
            status: self.value("status"),
            tipe: self.value("tipe"),
            path_project: self.value("path_project"),
            link_website: self.value("link_website"),
            tags: self.value("tags"),
            catatan: self.value("catatan"),
        }
    }
}

fn bad_request(err: impl std::fmt::Display) -> AppError {
    AppError::invalid_value("form", &format!("Invalid form data: {}", err))
}

/// Parse a task id path segment.
pub fn parse_task_id(raw: &str) -> AppResult<i64> {
    raw.parse::<u64>()
        .ok()
        .and_then(|id| i64::try_from(id).ok())
        .ok_or_else(|| AppError::invalid_value("id", &format!("Invalid task id: {}", raw)))
}
