pub mod config;
pub mod core;
pub mod editor;
pub mod geometry;
pub mod models;

pub use config::{AppConfig, EditorConfig, StoreConfig};
pub use editor::{
    DrawingSurface, Editor, EditorError, EditorState, Origin, SaveOutcome, ShapeCanvas, ShapeId,
};
pub use geometry::{ImageSize, Shape, has_overlap};
pub use models::{Annotation, AnnotationUpdate, BoundingBox, DeleteAck, NewAnnotation};
