use thiserror::Error;

use crate::models::{Annotation, AnnotationUpdate, DeleteAck, NewAnnotation};

pub const NOT_FOUND_DETAIL: &str = "annotation not found";
pub const DELETED_DETAIL: &str = "annotation deleted";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{}", NOT_FOUND_DETAIL)]
    NotFound,
    /// Request rejected by store-side validation; the detail is user facing.
    #[error("{0}")]
    BadRequest(String),
    #[error("stored bounding boxes are not valid JSON: {0}")]
    Corrupt(#[from] serde_json::Error),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// CRUD contract the editor consumes, mirroring `/api/annotations/`.
pub trait AnnotationRepository {
    fn create_annotation(
        &self,
        annotation: &NewAnnotation,
    ) -> impl Future<Output = Result<Annotation, StoreError>>;
    fn get_annotations(&self) -> impl Future<Output = Result<Vec<Annotation>, StoreError>>;
    fn get_annotation(&self, id: i64) -> impl Future<Output = Result<Annotation, StoreError>>;
    fn update_annotation(
        &self,
        id: i64,
        update: &AnnotationUpdate,
    ) -> impl Future<Output = Result<Annotation, StoreError>>;
    fn delete_annotation(&self, id: i64) -> impl Future<Output = Result<DeleteAck, StoreError>>;
}
