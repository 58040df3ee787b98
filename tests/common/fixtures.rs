use std::{cell::Cell, io::Cursor};

use annotation_editor::core::db::{AnnotationDb, AnnotationRepository, StoreError};
use annotation_editor::{
    Annotation, AnnotationUpdate, BoundingBox, DeleteAck, Editor, EditorConfig, NewAnnotation,
    ShapeCanvas, StoreConfig,
};
use base64::{Engine, engine::general_purpose::STANDARD};
use image::{ImageBuffer, ImageFormat, Rgb};

/// Encodes a solid red PNG of the given size.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = ImageBuffer::from_fn(width, height, |_, _| Rgb([255u8, 0u8, 0u8]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png)
        .expect("Failed to encode test image");
    out.into_inner()
}

pub fn png_base64(width: u32, height: u32) -> String {
    STANDARD.encode(png_bytes(width, height))
}

/// Creates an AnnotationDb in a temporary directory.
/// Returns both the store and the temp directory (which must be kept alive).
pub async fn create_test_store() -> (AnnotationDb, tempfile::TempDir) {
    create_test_store_with(StoreConfig::default()).await
}

pub async fn create_test_store_with(config: StoreConfig) -> (AnnotationDb, tempfile::TempDir) {
    let dir = tempfile::TempDir::new().expect("Failed to create temp directory");
    let path = dir.path().join("test.db");
    let store = AnnotationDb::open(&path, &config)
        .await
        .expect("Failed to create test store");
    (store, dir)
}

pub fn new_editor() -> Editor<ShapeCanvas> {
    Editor::new(EditorConfig::default(), ShapeCanvas::new())
}

/// Editor with a 200x200 image already loaded.
pub fn loaded_editor() -> Editor<ShapeCanvas> {
    let mut editor = new_editor();
    editor
        .load_image(png_bytes(200, 200))
        .expect("Failed to load test image");
    editor
}

pub fn make_new_annotation(boxes: Vec<BoundingBox>) -> NewAnnotation {
    NewAnnotation {
        image_data: png_base64(64, 48),
        bounding_boxes: boxes,
        meta_info: Some("test meta info".to_string()),
    }
}

/// Wraps a repository and counts every call made through it.
pub struct CountingRepo<R> {
    pub inner: R,
    calls: Cell<usize>,
}

impl<R> CountingRepo<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            calls: Cell::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }

    fn hit(&self) {
        self.calls.set(self.calls.get() + 1);
    }
}

impl<R: AnnotationRepository> AnnotationRepository for CountingRepo<R> {
    async fn create_annotation(&self, annotation: &NewAnnotation) -> Result<Annotation, StoreError> {
        self.hit();
        self.inner.create_annotation(annotation).await
    }

    async fn get_annotations(&self) -> Result<Vec<Annotation>, StoreError> {
        self.hit();
        self.inner.get_annotations().await
    }

    async fn get_annotation(&self, id: i64) -> Result<Annotation, StoreError> {
        self.hit();
        self.inner.get_annotation(id).await
    }

    async fn update_annotation(
        &self,
        id: i64,
        update: &AnnotationUpdate,
    ) -> Result<Annotation, StoreError> {
        self.hit();
        self.inner.update_annotation(id, update).await
    }

    async fn delete_annotation(&self, id: i64) -> Result<DeleteAck, StoreError> {
        self.hit();
        self.inner.delete_annotation(id).await
    }
}

/// A store whose transport is down.
pub struct UnreachableRepo;

fn unreachable_error() -> StoreError {
    StoreError::Other(anyhow::anyhow!("connection refused"))
}

impl AnnotationRepository for UnreachableRepo {
    async fn create_annotation(&self, _: &NewAnnotation) -> Result<Annotation, StoreError> {
        Err(unreachable_error())
    }

    async fn get_annotations(&self) -> Result<Vec<Annotation>, StoreError> {
        Err(unreachable_error())
    }

    async fn get_annotation(&self, _: i64) -> Result<Annotation, StoreError> {
        Err(unreachable_error())
    }

    async fn update_annotation(
        &self,
        _: i64,
        _: &AnnotationUpdate,
    ) -> Result<Annotation, StoreError> {
        Err(unreachable_error())
    }

    async fn delete_annotation(&self, _: i64) -> Result<DeleteAck, StoreError> {
        Err(unreachable_error())
    }
}

/// A store that never answers.
pub struct StalledRepo;

impl AnnotationRepository for StalledRepo {
    async fn create_annotation(&self, _: &NewAnnotation) -> Result<Annotation, StoreError> {
        std::future::pending().await
    }

    async fn get_annotations(&self) -> Result<Vec<Annotation>, StoreError> {
        std::future::pending().await
    }

    async fn get_annotation(&self, _: i64) -> Result<Annotation, StoreError> {
        std::future::pending().await
    }

    async fn update_annotation(
        &self,
        _: i64,
        _: &AnnotationUpdate,
    ) -> Result<Annotation, StoreError> {
        std::future::pending().await
    }

    async fn delete_annotation(&self, _: i64) -> Result<DeleteAck, StoreError> {
        std::future::pending().await
    }
}
