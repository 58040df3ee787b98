mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from annotation_editor for tests
pub use annotation_editor::core::db::{AnnotationDb, AnnotationRepository, StoreError};
pub use annotation_editor::{
    Annotation, AnnotationUpdate, BoundingBox, DrawingSurface, Editor, EditorConfig, EditorError,
    EditorState, NewAnnotation, Origin, SaveOutcome, Shape, ShapeCanvas, StoreConfig,
};
