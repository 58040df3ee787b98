//! Editing session for one image and its rectangles.
//!
//! The session moves `Empty -> Loaded -> Saving -> Loaded`. Local checks
//! (image size, empty set, overlaps) run before the repository is touched, so
//! a rejected save never reaches the store.

mod canvas;
mod surface;

use std::io::Cursor;

use base64::{Engine, engine::general_purpose::STANDARD};
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::{
    config::EditorConfig,
    core::db::{AnnotationRepository, StoreError},
    geometry::{self, GeometryError, ImageSize, Shape},
    models::{Annotation, AnnotationUpdate, BoundingBox, NewAnnotation},
};

pub use canvas::ShapeCanvas;
pub use surface::{DrawingSurface, ShapeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorState {
    Empty,
    Loaded,
    Saving,
}

/// Where the working set came from, which decides create vs. update on save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    New,
    Existing { id: i64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Created { id: i64 },
    Updated { id: i64 },
}

impl SaveOutcome {
    pub fn id(&self) -> i64 {
        match self {
            SaveOutcome::Created { id } | SaveOutcome::Updated { id } => *id,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            SaveOutcome::Created { .. } => "Annotation saved successfully!",
            SaveOutcome::Updated { .. } => "Annotation updated successfully!",
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EditorError {
    #[error("No image loaded.")]
    NoImage,
    #[error("A save is already in progress.")]
    Busy,
    #[error("Image size exceeds the limit of {limit_mb} MB.")]
    ImageTooLarge { size: u64, limit_mb: u64 },
    #[error("The selected file is not a readable image.")]
    InvalidImage,
    #[error("No rectangles to save. Please add at least one rectangle.")]
    NothingToSave,
    #[error("Rectangles cannot overlap. Please adjust the annotations.")]
    Overlap,
    #[error("Rectangle {index} cannot be saved: {source}")]
    InvalidShape {
        index: usize,
        source: GeometryError,
    },
    #[error("This annotation has not been saved yet.")]
    NotPersisted,
    #[error("Annotation not found")]
    NotFound,
    /// Store-side validation failure, shown verbatim.
    #[error("{0}")]
    Rejected(String),
    #[error("Failed to save annotation. Please try again.")]
    SaveFailed,
    #[error("Failed to update annotation. Please try again.")]
    UpdateFailed,
    #[error("Failed to delete annotation. Please try again.")]
    DeleteFailed,
    #[error("Failed to load annotation. Please try again.")]
    LoadFailed,
}

#[derive(Debug, Clone)]
struct LoadedImage {
    bytes: Vec<u8>,
    /// `None` when a stored record holds bytes that are not a readable image.
    size: Option<ImageSize>,
}

/// Marks the editor `Saving` for as long as a store call is pending.
///
/// Dropping the guard puts the editor back to `Loaded`, including when the
/// caller drops the pending future.
struct SavingGuard<'a> {
    state: &'a mut EditorState,
}

impl<'a> SavingGuard<'a> {
    fn enter(state: &'a mut EditorState) -> Self {
        *state = EditorState::Saving;
        Self { state }
    }
}

impl Drop for SavingGuard<'_> {
    fn drop(&mut self) {
        *self.state = EditorState::Loaded;
    }
}

pub struct Editor<S: DrawingSurface> {
    config: EditorConfig,
    surface: S,
    state: EditorState,
    image: Option<LoadedImage>,
    origin: Origin,
    meta_info: Option<String>,
    last_error: Option<EditorError>,
    last_outcome: Option<SaveOutcome>,
}

impl<S: DrawingSurface> std::fmt::Debug for Editor<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Editor")
            .field("state", &self.state)
            .field("origin", &self.origin)
            .field("image_size", &self.image_size())
            .field("shapes", &self.surface.shapes().len())
            .field("last_error", &self.last_error)
            .finish()
    }
}

fn read_dimensions(bytes: &[u8]) -> Option<ImageSize> {
    let reader = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .ok()?;
    let (width, height) = reader.into_dimensions().ok()?;
    Some(ImageSize { width, height })
}

impl<S: DrawingSurface> Editor<S> {
    pub fn new(config: EditorConfig, surface: S) -> Self {
        Self {
            config,
            surface,
            state: EditorState::Empty,
            image: None,
            origin: Origin::New,
            meta_info: None,
            last_error: None,
            last_outcome: None,
        }
    }

    pub fn state(&self) -> EditorState {
        self.state
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    pub fn annotation_id(&self) -> Option<i64> {
        match self.origin {
            Origin::Existing { id } => Some(id),
            Origin::New => None,
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    /// Natural pixel size of the loaded image, when it could be read.
    pub fn image_size(&self) -> Option<ImageSize> {
        self.image.as_ref().and_then(|i| i.size)
    }

    pub fn image_bytes(&self) -> Option<&[u8]> {
        self.image.as_ref().map(|i| i.bytes.as_slice())
    }

    /// Size to display the image at inside a viewport of the given size.
    pub fn display_size(&self, viewport_width: f64, viewport_height: f64) -> Option<(f64, f64)> {
        let fraction = self.config.viewport_fraction;
        self.image_size().map(|size| {
            geometry::fit_to_viewport(size, viewport_width * fraction, viewport_height * fraction)
        })
    }

    pub fn meta_info(&self) -> Option<&str> {
        self.meta_info.as_deref()
    }

    pub fn set_meta_info(&mut self, meta_info: Option<String>) {
        self.meta_info = meta_info;
    }

    pub fn last_error(&self) -> Option<&EditorError> {
        self.last_error.as_ref()
    }

    pub fn last_outcome(&self) -> Option<SaveOutcome> {
        self.last_outcome
    }

    pub fn dismiss_error(&mut self) {
        self.last_error = None;
    }

    fn reject<T>(&mut self, error: EditorError) -> Result<T, EditorError> {
        warn!(%error, state = ?self.state, "editor action rejected");
        self.last_error = Some(error.clone());
        Err(error)
    }

    fn require_loaded(&mut self) -> Result<(), EditorError> {
        match self.state {
            EditorState::Loaded => Ok(()),
            EditorState::Empty => self.reject(EditorError::NoImage),
            EditorState::Saving => self.reject(EditorError::Busy),
        }
    }

    fn require_idle(&mut self) -> Result<(), EditorError> {
        if self.state == EditorState::Saving {
            return self.reject(EditorError::Busy);
        }
        Ok(())
    }

    fn start_session(&mut self, image: LoadedImage, origin: Origin, meta_info: Option<String>) {
        debug!(?origin, size = ?image.size, "session started");
        self.surface.clear();
        self.image = Some(image);
        self.origin = origin;
        self.meta_info = meta_info;
        self.state = EditorState::Loaded;
        self.last_error = None;
        self.last_outcome = None;
    }

    /// Start a new annotation from raw image file bytes.
    pub fn load_image(&mut self, bytes: Vec<u8>) -> Result<ImageSize, EditorError> {
        self.require_idle()?;
        let size = bytes.len() as u64;
        if size > self.config.max_image_bytes() {
            return self.reject(EditorError::ImageTooLarge {
                size,
                limit_mb: self.config.max_image_mb,
            });
        }
        let Some(dimensions) = read_dimensions(&bytes) else {
            return self.reject(EditorError::InvalidImage);
        };
        self.start_session(
            LoadedImage {
                bytes,
                size: Some(dimensions),
            },
            Origin::New,
            None,
        );
        Ok(dimensions)
    }

    /// Start editing an annotation that already exists in the store.
    ///
    /// The store accepts any base64 payload, so a record whose bytes are not a
    /// readable image still opens, with unknown dimensions, and can be edited
    /// or deleted.
    pub fn open_annotation(
        &mut self,
        annotation: Annotation,
    ) -> Result<Option<ImageSize>, EditorError> {
        self.require_idle()?;
        let Ok(bytes) = STANDARD.decode(&annotation.image_data) else {
            return self.reject(EditorError::InvalidImage);
        };
        let dimensions = read_dimensions(&bytes);
        if dimensions.is_none() {
            warn!(id = annotation.id, "stored image is not readable");
        }
        self.start_session(
            LoadedImage {
                bytes,
                size: dimensions,
            },
            Origin::Existing { id: annotation.id },
            annotation.meta_info,
        );
        for bbox in &annotation.bounding_boxes {
            self.surface.add_shape(Shape::from(bbox));
        }
        Ok(dimensions)
    }

    pub async fn fetch_annotation<R: AnnotationRepository>(
        &mut self,
        repo: &R,
        id: i64,
    ) -> Result<Option<ImageSize>, EditorError> {
        self.require_idle()?;
        match repo.get_annotation(id).await {
            Ok(annotation) => self.open_annotation(annotation),
            Err(StoreError::NotFound) => self.reject(EditorError::NotFound),
            Err(e) => {
                error!(id, error = %e, "failed to fetch annotation");
                self.reject(EditorError::LoadFailed)
            }
        }
    }

    /// Append the configured default rectangle.
    pub fn add_rectangle(&mut self) -> Result<ShapeId, EditorError> {
        let shape = Shape::from(self.config.default_rect);
        self.add_shape(shape)
    }

    pub fn add_shape(&mut self, shape: Shape) -> Result<ShapeId, EditorError> {
        self.require_loaded()?;
        Ok(self.surface.add_shape(shape))
    }

    /// Remove the selected rectangle, if any.
    pub fn remove_selected(&mut self) -> bool {
        if self.state != EditorState::Loaded {
            return false;
        }
        match self.surface.selected() {
            Some(id) => self.surface.remove_shape(id),
            None => false,
        }
    }

    /// Remove every rectangle, returning how many were removed.
    pub fn remove_all(&mut self) -> usize {
        if self.state != EditorState::Loaded {
            return 0;
        }
        let ids: Vec<ShapeId> = self.surface.shapes().into_iter().map(|(id, _)| id).collect();
        ids.into_iter()
            .filter(|id| self.surface.remove_shape(*id))
            .count()
    }

    /// Normalized boxes for the current working set, in drawing order.
    pub fn bounding_boxes(&self) -> Result<Vec<BoundingBox>, EditorError> {
        self.surface
            .shapes()
            .iter()
            .enumerate()
            .map(|(index, (_, shape))| {
                geometry::normalize_shape(shape)
                    .map_err(|source| EditorError::InvalidShape { index, source })
            })
            .collect()
    }

    /// Validate the working set and write it to the store.
    ///
    /// A new annotation is created; after that the session tracks the created
    /// record, so saving again updates it.
    pub async fn save<R: AnnotationRepository>(
        &mut self,
        repo: &R,
    ) -> Result<SaveOutcome, EditorError> {
        self.require_loaded()?;
        if self.surface.shapes().is_empty() {
            return self.reject(EditorError::NothingToSave);
        }
        let boxes = match self.bounding_boxes() {
            Ok(boxes) => boxes,
            Err(e) => return self.reject(e),
        };
        if let Some((first, second)) = geometry::find_overlap(&boxes) {
            debug!(first, second, "overlapping rectangles");
            return self.reject(EditorError::Overlap);
        }
        let Some(image) = &self.image else {
            return self.reject(EditorError::NoImage);
        };

        let guard = SavingGuard::enter(&mut self.state);
        let result = match self.origin {
            Origin::New => {
                let request = NewAnnotation {
                    image_data: STANDARD.encode(&image.bytes),
                    bounding_boxes: boxes,
                    meta_info: self.meta_info.clone(),
                };
                repo.create_annotation(&request)
                    .await
                    .map(|created| SaveOutcome::Created { id: created.id })
            }
            Origin::Existing { id } => {
                let request = AnnotationUpdate {
                    bounding_boxes: Some(boxes),
                    meta_info: self.meta_info.clone(),
                };
                repo.update_annotation(id, &request)
                    .await
                    .map(|updated| SaveOutcome::Updated { id: updated.id })
            }
        };
        drop(guard);

        match result {
            Ok(outcome) => {
                debug!(?outcome, "annotation saved");
                self.origin = Origin::Existing { id: outcome.id() };
                self.last_error = None;
                self.last_outcome = Some(outcome);
                Ok(outcome)
            }
            Err(StoreError::BadRequest(detail)) => {
                self.last_outcome = None;
                self.reject(EditorError::Rejected(detail))
            }
            Err(e) => {
                error!(error = %e, "failed to save annotation");
                self.last_outcome = None;
                let error = match self.origin {
                    Origin::New => EditorError::SaveFailed,
                    Origin::Existing { .. } => EditorError::UpdateFailed,
                };
                self.reject(error)
            }
        }
    }

    /// Delete the persisted annotation. On success the session ends.
    pub async fn delete_annotation<R: AnnotationRepository>(
        &mut self,
        repo: &R,
    ) -> Result<(), EditorError> {
        self.require_loaded()?;
        let Origin::Existing { id } = self.origin else {
            return self.reject(EditorError::NotPersisted);
        };

        let guard = SavingGuard::enter(&mut self.state);
        let result = repo.delete_annotation(id).await;
        drop(guard);

        match result {
            Ok(_) => {
                debug!(id, "session ended by delete");
                self.surface.clear();
                self.image = None;
                self.origin = Origin::New;
                self.meta_info = None;
                self.state = EditorState::Empty;
                self.last_error = None;
                self.last_outcome = None;
                Ok(())
            }
            Err(e) => {
                error!(id, error = %e, "failed to delete annotation");
                self.reject(EditorError::DeleteFailed)
            }
        }
    }
}
