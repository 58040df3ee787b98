mod annotation;
mod state;

use std::{path::Path, sync::Arc};

use base64::{Engine, engine::general_purpose::STANDARD};
use state::StoreState;
use tracing::{debug, warn};

use crate::{
    config::StoreConfig,
    geometry,
    models::{Annotation, AnnotationUpdate, BoundingBox, DeleteAck, NewAnnotation},
};

pub use annotation::{AnnotationRepository, DELETED_DETAIL, NOT_FOUND_DETAIL, StoreError};

pub const OVERLAP_DETAIL: &str = "Rectangles cannot overlap. Please adjust the annotations.";
pub const INVALID_IMAGE_DETAIL: &str = "Invalid image data";

#[derive(sqlx::FromRow)]
struct AnnotationRow {
    id: i64,
    image_data: Vec<u8>,
    bounding_boxes: String,
    meta_info: Option<String>,
}

impl TryFrom<AnnotationRow> for Annotation {
    type Error = StoreError;

    fn try_from(row: AnnotationRow) -> Result<Self, Self::Error> {
        Ok(Annotation {
            id: row.id,
            image_data: STANDARD.encode(&row.image_data),
            bounding_boxes: serde_json::from_str(&row.bounding_boxes)?,
            meta_info: row.meta_info,
        })
    }
}

/// SQLite-backed annotation store.
///
/// Cloning is cheap; clones share one connection pool.
#[derive(Debug, Clone)]
pub struct AnnotationDb {
    state: Arc<StoreState>,
    max_image_mb: u64,
}

impl AnnotationDb {
    pub async fn open<P: AsRef<Path>>(db_file: P, config: &StoreConfig) -> anyhow::Result<Self> {
        Ok(Self {
            state: Arc::new(StoreState::open(db_file, config.max_connections).await?),
            max_image_mb: config.max_image_mb,
        })
    }

    pub async fn in_memory(config: &StoreConfig) -> anyhow::Result<Self> {
        Ok(Self {
            state: Arc::new(StoreState::in_memory().await?),
            max_image_mb: config.max_image_mb,
        })
    }

    /// Explicitly flush and close the database.
    /// Call before dropping when the file is reopened in the same process.
    pub async fn close(&self) -> anyhow::Result<()> {
        self.state.close().await
    }

    fn decode_image(&self, image_data: &str) -> Result<Vec<u8>, StoreError> {
        let bytes = STANDARD
            .decode(image_data)
            .map_err(|_| StoreError::BadRequest(INVALID_IMAGE_DETAIL.to_string()))?;
        let limit = self.max_image_mb.saturating_mul(1024 * 1024);
        if bytes.len() as u64 > limit {
            warn!(size = bytes.len(), limit, "rejecting oversized image");
            return Err(StoreError::BadRequest(format!(
                "Image size exceeds the limit of {} MB",
                self.max_image_mb
            )));
        }
        Ok(bytes)
    }
}

fn check_boxes(boxes: &[BoundingBox]) -> Result<(), StoreError> {
    if let Some((i, j)) = geometry::find_overlap(boxes) {
        warn!(first = i, second = j, "rejecting overlapping bounding boxes");
        return Err(StoreError::BadRequest(OVERLAP_DETAIL.to_string()));
    }
    Ok(())
}

impl AnnotationRepository for AnnotationDb {
    async fn create_annotation(&self, annotation: &NewAnnotation) -> Result<Annotation, StoreError> {
        let image_data = self.decode_image(&annotation.image_data)?;
        check_boxes(&annotation.bounding_boxes)?;
        let bounding_boxes = serde_json::to_string(&annotation.bounding_boxes)?;

        let mut conn = self.state.conn().await?;
        let row = sqlx::query_as::<_, AnnotationRow>(
            r#"INSERT INTO annotations (image_data, bounding_boxes, meta_info)
            VALUES (?, ?, ?)
            RETURNING id, image_data, bounding_boxes, meta_info"#,
        )
        .bind(image_data)
        .bind(bounding_boxes)
        .bind(&annotation.meta_info)
        .fetch_one(&mut *conn)
        .await?;
        debug!(id = row.id, "annotation created");
        row.try_into()
    }

    async fn get_annotations(&self) -> Result<Vec<Annotation>, StoreError> {
        let mut conn = self.state.conn().await?;
        sqlx::query_as::<_, AnnotationRow>(
            r#"SELECT id, image_data, bounding_boxes, meta_info FROM annotations ORDER BY id ASC"#,
        )
        .fetch_all(&mut *conn)
        .await?
        .into_iter()
        .map(Annotation::try_from)
        .collect()
    }

    async fn get_annotation(&self, id: i64) -> Result<Annotation, StoreError> {
        let mut conn = self.state.conn().await?;
        sqlx::query_as::<_, AnnotationRow>(
            r#"SELECT id, image_data, bounding_boxes, meta_info FROM annotations WHERE id = ?"#,
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(StoreError::NotFound)?
        .try_into()
    }

    async fn update_annotation(
        &self,
        id: i64,
        update: &AnnotationUpdate,
    ) -> Result<Annotation, StoreError> {
        let bounding_boxes = match &update.bounding_boxes {
            Some(boxes) => {
                check_boxes(boxes)?;
                Some(serde_json::to_string(boxes)?)
            }
            None => None,
        };

        let mut tx = self.state.begin().await?;
        let row = sqlx::query_as::<_, AnnotationRow>(
            r#"UPDATE annotations SET
                bounding_boxes = COALESCE(?, bounding_boxes),
                meta_info = COALESCE(?, meta_info)
            WHERE id = ?
            RETURNING id, image_data, bounding_boxes, meta_info"#,
        )
        .bind(bounding_boxes)
        .bind(&update.meta_info)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(StoreError::NotFound)?;
        tx.commit().await?;
        debug!(id, "annotation updated");
        row.try_into()
    }

    async fn delete_annotation(&self, id: i64) -> Result<DeleteAck, StoreError> {
        let mut conn = self.state.conn().await?;
        let result = sqlx::query(r#"DELETE FROM annotations WHERE id = ?"#)
            .bind(id)
            .execute(&mut *conn)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        debug!(id, "annotation deleted");
        Ok(DeleteAck {
            detail: DELETED_DETAIL.to_string(),
        })
    }
}
