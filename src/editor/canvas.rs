use crate::{
    editor::surface::{DrawingSurface, ShapeId},
    geometry::Shape,
};

/// In-memory drawing surface with selection and move/resize/rotate.
///
/// Used headless by the command line and in tests.
#[derive(Debug, Clone, Default)]
pub struct ShapeCanvas {
    shapes: Vec<(ShapeId, Shape)>,
    selected: Option<ShapeId>,
    next_id: u64,
}

impl ShapeCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    pub fn get(&self, id: ShapeId) -> Option<&Shape> {
        self.shapes.iter().find(|(sid, _)| *sid == id).map(|(_, s)| s)
    }

    /// Id of the shape at `index` in drawing order.
    pub fn id_at(&self, index: usize) -> Option<ShapeId> {
        self.shapes.get(index).map(|(id, _)| *id)
    }

    pub fn select(&mut self, id: ShapeId) -> bool {
        if self.get(id).is_some() {
            self.selected = Some(id);
            true
        } else {
            false
        }
    }

    pub fn deselect(&mut self) {
        self.selected = None;
    }

    /// Selects the top-most shape whose scaled, unrotated extent contains
    /// the point, or clears the selection when there is none.
    pub fn select_at(&mut self, x: f64, y: f64) -> Option<ShapeId> {
        self.selected = self
            .shapes
            .iter()
            .rev()
            .find(|(_, s)| {
                let (w, h) = (s.width * s.scale_x.abs(), s.height * s.scale_y.abs());
                x >= s.left && x <= s.left + w && y >= s.top && y <= s.top + h
            })
            .map(|(id, _)| *id);
        self.selected
    }

    pub fn transform(&mut self, id: ShapeId, f: impl FnOnce(&mut Shape)) -> bool {
        match self.shapes.iter_mut().find(|(sid, _)| *sid == id) {
            Some((_, shape)) => {
                f(shape);
                true
            }
            None => false,
        }
    }

    pub fn move_by(&mut self, id: ShapeId, dx: f64, dy: f64) -> bool {
        self.transform(id, |s| {
            s.left += dx;
            s.top += dy;
        })
    }

    /// Resizes the way an interactive handle does: only the scale changes.
    pub fn scale_to(&mut self, id: ShapeId, scale_x: f64, scale_y: f64) -> bool {
        self.transform(id, |s| {
            s.scale_x = scale_x;
            s.scale_y = scale_y;
        })
    }

    pub fn rotate_to(&mut self, id: ShapeId, angle: f64) -> bool {
        self.transform(id, |s| s.angle = angle)
    }
}

impl DrawingSurface for ShapeCanvas {
    fn add_shape(&mut self, shape: Shape) -> ShapeId {
        let id = ShapeId(self.next_id);
        self.next_id += 1;
        self.shapes.push((id, shape));
        id
    }

    fn remove_shape(&mut self, id: ShapeId) -> bool {
        let before = self.shapes.len();
        self.shapes.retain(|(sid, _)| *sid != id);
        if self.selected == Some(id) {
            self.selected = None;
        }
        self.shapes.len() != before
    }

    fn shapes(&self) -> Vec<(ShapeId, Shape)> {
        self.shapes.clone()
    }

    fn selected(&self) -> Option<ShapeId> {
        self.selected
    }

    fn clear(&mut self) {
        self.shapes.clear();
        self.selected = None;
    }
}
