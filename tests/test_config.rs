use annotation_editor::AppConfig;

#[test]
fn test_defaults_without_file() -> anyhow::Result<()> {
    let config = AppConfig::load(None)?;
    assert_eq!(config.editor.max_image_mb, 5);
    assert_eq!(config.editor.max_image_bytes(), 5 * 1024 * 1024);
    assert_eq!(config.editor.default_rect.left, 100.0);
    assert_eq!(config.editor.default_rect.width, 100.0);
    assert_eq!(config.store.max_image_mb, 1);
    assert_eq!(config.store.max_connections, 5);
    Ok(())
}

#[test]
fn test_partial_json_keeps_other_defaults() -> anyhow::Result<()> {
    let config = AppConfig::from_json(
        r#"{"editor": {"max_image_mb": 2, "default_rect": {"width": 40}}}"#,
    )?;
    assert_eq!(config.editor.max_image_mb, 2);
    assert_eq!(config.editor.default_rect.width, 40.0);
    assert_eq!(config.editor.default_rect.height, 100.0);
    assert_eq!(config.editor.viewport_fraction, 0.8);
    assert_eq!(config.store.max_image_mb, 1);
    Ok(())
}

#[test]
fn test_load_from_file() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let path = dir.path().join("config.json");
    std::fs::write(&path, r#"{"store": {"max_image_mb": 10}}"#)?;

    let config = AppConfig::load(Some(&path))?;
    assert_eq!(config.store.max_image_mb, 10);
    assert_eq!(config.editor.max_image_mb, 5);

    std::fs::write(&path, "{ not json")?;
    assert!(AppConfig::load(Some(&path)).is_err());
    assert!(AppConfig::load(Some(&dir.path().join("missing.json"))).is_err());
    Ok(())
}
