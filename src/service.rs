//! Task service: transactional create/update/delete with cover ingestion.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::db::{self, Database};
use crate::error::{AppError, AppResult};
use crate::imaging::{self, DEFAULT_MAX_WIDTH};
use crate::types::{CoverUpload, NewTask, STATUS_TODO, Task, TaskPatch};

/// Public URL prefix under which covers are served.
pub const COVER_URL_PREFIX: &str = "/static/uploads/tasks/";

/// On-disk location of uploaded covers and how they map to public URLs.
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
    max_width: u32,
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            max_width: DEFAULT_MAX_WIDTH,
        }
    }

    pub fn with_max_width(mut self, max_width: u32) -> Self {
        self.max_width = max_width;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn max_width(&self) -> u32 {
        self.max_width
    }

    /// Create the uploads directory if needed.
    pub fn ensure_dir(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.dir)
    }

    /// Unique cover filename: `task_<id>_<nanos><ext>`.
    pub fn cover_filename(task_id: i64, ext: &str) -> String {
        let nanos = chrono::Utc::now()
            .timestamp_nanos_opt()
            .unwrap_or_else(|| chrono::Utc::now().timestamp_micros() * 1000);
        format!("task_{}_{}{}", task_id, nanos, ext)
    }

    /// Disk path for a stored public cover URL. Only the final path segment is
    /// used, so a URL can never point outside the uploads directory.
    pub fn disk_path(&self, cover_url: &str) -> Option<PathBuf> {
        let name = Path::new(cover_url).file_name()?;
        Some(self.dir.join(name))
    }

    /// Decode, resize and re-encode `cover` in memory. Runs before any
    /// database lock is taken.
    pub fn prepare(&self, cover: &CoverUpload) -> AppResult<PreparedCover> {
        let ext = cover.extension();
        let bytes = imaging::encode_resized(&cover.data, &ext, self.max_width)?;
        Ok(PreparedCover { ext, bytes })
    }

    /// Write a prepared cover for `task_id`. Returns the public URL and the
    /// path written on disk.
    pub fn store(&self, task_id: i64, cover: &PreparedCover) -> AppResult<(String, PathBuf)> {
        self.ensure_dir().map_err(AppError::storage)?;
        let filename = Self::cover_filename(task_id, &cover.ext);
        let path = self.dir.join(&filename);

        if let Err(e) = imaging::write_image(&cover.bytes, &path) {
            // The file may have been created before the write failed
            self.remove_file(&path);
            return Err(e.into());
        }

        debug!(task_id, path = %path.display(), "Stored cover image");
        Ok((format!("{}{}", COVER_URL_PREFIX, filename), path))
    }

    /// Best-effort removal of the file behind a public cover URL.
    pub fn remove_cover(&self, cover_url: &str) {
        if cover_url.is_empty() {
            return;
        }
        match self.disk_path(cover_url) {
            Some(path) => self.remove_file(&path),
            None => warn!(cover = cover_url, "Cover URL has no file name"),
        }
    }

    fn remove_file(&self, path: &Path) {
        match std::fs::remove_file(path) {
            Ok(()) => debug!(path = %path.display(), "Removed cover file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %path.display(), error = %e, "Could not remove cover file"),
        }
    }
}

/// A cover already re-encoded and ready to be written.
#[derive(Debug, Clone)]
pub struct PreparedCover {
    ext: String,
    bytes: Vec<u8>,
}

/// Orchestrates task persistence and cover storage.
#[derive(Clone)]
pub struct TaskService {
    db: Database,
    uploads: UploadStore,
}

impl TaskService {
    pub fn new(db: Database, uploads: UploadStore) -> Self {
        Self { db, uploads }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn uploads(&self) -> &UploadStore {
        &self.uploads
    }

    /// Create a task with status "todo", optionally with a cover image.
    ///
    /// The cover is encoded before the transaction starts. Row insert and
    /// cover update share one transaction; any failure rolls the row back and
    /// removes a cover file written by this call.
    pub fn create_task(&self, input: NewTask, cover: Option<CoverUpload>) -> AppResult<Task> {
        validate_new_task(&input)?;
        let cover = cover.map(|c| self.uploads.prepare(&c)).transpose()?;

        let mut written: Option<PathBuf> = None;
        let result = self.db.with_conn_mut(|conn| -> AppResult<Task> {
            let tx = conn.transaction()?;
            let mut task = db::insert_task(&tx, &input, STATUS_TODO)?;

            if let Some(ref cover) = cover {
                let (url, path) = self.uploads.store(task.id, cover)?;
                written = Some(path);
                db::set_cover(&tx, task.id, &url)?;
                task.cover = url;
            }

            tx.commit()?;
            Ok(task)
        });

        match result {
            Ok(task) => {
                info!(task_id = task.id, judul = %task.judul, cover = task.has_cover(), "Created task");
                Ok(task)
            }
            Err(e) => {
                if let Some(path) = written {
                    self.uploads.remove_file(&path);
                }
                Err(e)
            }
        }
    }

    /// Apply `patch` to task `id` and optionally replace its cover.
    ///
    /// The previous cover file is removed only after the new row state has
    /// been committed.
    pub fn update_task(
        &self,
        id: i64,
        patch: TaskPatch,
        cover: Option<CoverUpload>,
    ) -> AppResult<Task> {
        if let Some(ref judul) = patch.judul {
            if judul.trim().is_empty() {
                return Err(AppError::invalid_value("judul", "judul cannot be blank"));
            }
        }
        let cover = cover.map(|c| self.uploads.prepare(&c)).transpose()?;

        let mut written: Option<PathBuf> = None;
        let result = self.db.with_conn_mut(|conn| -> AppResult<(Task, String)> {
            let tx = conn.transaction()?;
            let existing = db::find_task_in(&tx, id)?;
            let old_cover = existing.cover.clone();
            let mut task = db::apply_patch(&tx, &existing, &patch)?;

            if let Some(ref cover) = cover {
                let (url, path) = self.uploads.store(task.id, cover)?;
                written = Some(path);
                db::set_cover(&tx, task.id, &url)?;
                task.cover = url;
            }

            tx.commit()?;
            Ok((task, old_cover))
        });

        match result {
            Ok((task, old_cover)) => {
                if cover.is_some() && old_cover != task.cover {
                    self.uploads.remove_cover(&old_cover);
                }
                info!(task_id = task.id, status = %task.status, "Updated task");
                Ok(task)
            }
            Err(e) => {
                if let Some(path) = written {
                    self.uploads.remove_file(&path);
                }
                Err(e)
            }
        }
    }

    /// Delete task `id` and, best-effort, its cover file.
    pub fn delete_task(&self, id: i64) -> AppResult<()> {
        let task = self.db.find_task(id)?;

        self.uploads.remove_cover(&task.cover);

        if !self.db.delete_task(id)? {
            return Err(AppError::task_not_found(id));
        }
        info!(task_id = id, "Deleted task");
        Ok(())
    }

    pub fn get_task_by_id(&self, id: i64) -> AppResult<Task> {
        Ok(self.db.find_task(id)?)
    }

    pub fn get_all_tasks(&self) -> AppResult<Vec<Task>> {
        Ok(self.db.list_tasks()?)
    }
}

fn validate_new_task(input: &NewTask) -> AppResult<()> {
    if input.judul.trim().is_empty() {
        return Err(AppError::missing_field("judul"));
    }
    if input.tipe.trim().is_empty() {
        return Err(AppError::missing_field("tipe"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cover_filename_embeds_id_and_extension() {
        let name = UploadStore::cover_filename(42, ".png");
        assert!(name.starts_with("task_42_"));
        assert!(name.ends_with(".png"));
        let nanos = &name["task_42_".len()..name.len() - ".png".len()];
        assert!(nanos.parse::<i64>().is_ok());
    }

    #[test]
    fn disk_path_uses_only_the_file_name() {
        let store = UploadStore::new("/srv/uploads");
        assert_eq!(
            store.disk_path("/static/uploads/tasks/task_1_9.jpg"),
            Some(PathBuf::from("/srv/uploads/task_1_9.jpg"))
        );
        assert_eq!(
            store.disk_path("../../etc/passwd"),
            Some(PathBuf::from("/srv/uploads/passwd"))
        );
        assert_eq!(store.disk_path(""), None);
    }

    #[test]
    fn prepare_encodes_without_writing() {
        let temp = tempfile::TempDir::new().unwrap();
        let store = UploadStore::new(temp.path().join("tasks")).with_max_width(50);
        let mut png = std::io::Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(image::RgbImage::new(200, 100))
            .write_to(&mut png, image::ImageFormat::Png)
            .unwrap();

        let prepared = store
            .prepare(&CoverUpload::new("c.PNG", png.into_inner()))
            .unwrap();

        assert_eq!(prepared.ext, ".png");
        let img = image::load_from_memory(&prepared.bytes).unwrap();
        assert_eq!((img.width(), img.height()), (50, 25));
        assert!(!store.dir().exists());

        let (url, path) = store.store(3, &prepared).unwrap();
        assert!(url.starts_with("/static/uploads/tasks/task_3_"));
        assert_eq!(std::fs::read(path).unwrap(), prepared.bytes);
    }

    #[test]
    fn prepare_rejects_unsupported_extension() {
        let store = UploadStore::new("/nonexistent/uploads");
        let err = store
            .prepare(&CoverUpload::new("anim.gif", b"GIF89a".to_vec()))
            .unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::UnsupportedImage);
    }

    #[test]
    fn new_task_requires_title_and_type() {
        let missing_title = NewTask {
            tipe: "bug".into(),
            ..Default::default()
        };
        let err = validate_new_task(&missing_title).unwrap_err();
        assert_eq!(err.field.as_deref(), Some("judul"));

        let missing_type = NewTask {
            judul: "Fix".into(),
            tipe: "   ".into(),
            ..Default::default()
        };
        let err = validate_new_task(&missing_type).unwrap_err();
        assert_eq!(err.field.as_deref(), Some("tipe"));
    }
}
