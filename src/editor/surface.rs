use crate::geometry::Shape;

/// Handle to a shape on a drawing surface. Never reused within one surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShapeId(pub(crate) u64);

/// The rectangle-drawing capability the editor needs.
///
/// Implementations own hit-testing, handles and rendering; the editor only
/// adds, removes and reads shapes.
pub trait DrawingSurface {
    fn add_shape(&mut self, shape: Shape) -> ShapeId;
    /// Returns false if `id` is not on the surface.
    fn remove_shape(&mut self, id: ShapeId) -> bool;
    /// All shapes, bottom-most first.
    fn shapes(&self) -> Vec<(ShapeId, Shape)>;
    fn selected(&self) -> Option<ShapeId>;
    fn clear(&mut self);
}
