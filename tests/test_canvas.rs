use annotation_editor::{DrawingSurface, Shape, ShapeCanvas};

#[test]
fn test_ids_are_not_reused() {
    let mut canvas = ShapeCanvas::new();
    let a = canvas.add_shape(Shape::new(0.0, 0.0, 10.0, 10.0));
    assert!(canvas.remove_shape(a));
    assert!(!canvas.remove_shape(a));
    let b = canvas.add_shape(Shape::new(0.0, 0.0, 10.0, 10.0));
    assert_ne!(a, b);
}

#[test]
fn test_select_at_picks_topmost() {
    let mut canvas = ShapeCanvas::new();
    let bottom = canvas.add_shape(Shape::new(0.0, 0.0, 100.0, 100.0));
    let top = canvas.add_shape(Shape::new(50.0, 50.0, 10.0, 10.0));

    assert_eq!(canvas.select_at(55.0, 55.0), Some(top));
    assert_eq!(canvas.select_at(10.0, 10.0), Some(bottom));
    assert_eq!(canvas.select_at(500.0, 500.0), None);
    assert_eq!(canvas.selected(), None);
}

#[test]
fn test_select_at_uses_scaled_extent() {
    let mut canvas = ShapeCanvas::new();
    let id = canvas.add_shape(Shape::new(0.0, 0.0, 10.0, 10.0));
    assert_eq!(canvas.select_at(15.0, 5.0), None);
    canvas.scale_to(id, 2.0, 1.0);
    assert_eq!(canvas.select_at(15.0, 5.0), Some(id));
}

#[test]
fn test_removing_selected_clears_selection() {
    let mut canvas = ShapeCanvas::new();
    let id = canvas.add_shape(Shape::new(0.0, 0.0, 10.0, 10.0));
    assert!(canvas.select(id));
    assert!(canvas.remove_shape(id));
    assert_eq!(canvas.selected(), None);
    assert!(!canvas.select(id));
}

#[test]
fn test_transforms() {
    let mut canvas = ShapeCanvas::new();
    let id = canvas.add_shape(Shape::new(10.0, 20.0, 30.0, 40.0));
    assert!(canvas.move_by(id, 5.0, -5.0));
    assert!(canvas.rotate_to(id, 90.0));
    let shape = canvas.get(id).copied().unwrap();
    assert_eq!((shape.left, shape.top, shape.angle), (15.0, 15.0, 90.0));

    canvas.clear();
    assert!(canvas.is_empty());
    assert!(!canvas.move_by(id, 1.0, 1.0));
}
