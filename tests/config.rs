//! Integration tests for export requests and settings.

use std::time::Duration;

use design_render::{
    AiConfig, AspectRatio, DimensionMode, ExportRequest, FileKind, Orientation, PageSize,
    RenderConfig, TargetDimensions, API_KEY_ENV, AVAILABLE_MODELS,
};

#[test]
fn test_request_default_values() {
    let request = ExportRequest::default();

    assert_eq!(request.file_kind, FileKind::Pdf);
    assert_eq!(request.name, "design");
    assert_eq!(request.dimensions(), TargetDimensions::new(794, 1123));
    assert_eq!(request.render, RenderConfig::default());
}

#[test]
fn test_render_config_defaults() {
    let config = RenderConfig::default();

    assert_eq!(config.density, 2.0);
    assert_eq!(config.background, [255, 255, 255, 255]);
    assert_eq!(config.settle_delay, Duration::from_millis(300));
    assert_eq!(config.jpeg_quality, 90);
    assert!(config.validate().is_ok());
}

#[test]
fn test_request_builder_chaining() {
    let request = ExportRequest::new()
        .file_kind(FileKind::Jpeg)
        .page(PageSize::a4(), Orientation::Landscape)
        .name("Gala Night")
        .render(RenderConfig::new().density(1.0).jpeg_quality(75));

    assert_eq!(request.file_kind, FileKind::Jpeg);
    assert_eq!(request.name, "Gala Night");
    assert_eq!(request.dimensions(), TargetDimensions::new(1123, 794));
    assert_eq!(request.render.density, 1.0);
    assert_eq!(request.render.jpeg_quality, 75);
}

#[test]
fn test_later_mode_wins() {
    let request = ExportRequest::new()
        .page(PageSize::letter(), Orientation::Portrait)
        .ratio(AspectRatio::named("story").unwrap());

    assert!(matches!(request.mode, DimensionMode::Ratio(_)));
    assert_eq!(request.dimensions(), TargetDimensions::new(1080, 1920));
}

#[test]
fn test_custom_pixels_defaults_bad_input() {
    let request = ExportRequest::new().custom_pixels("abc", "600");
    assert_eq!(request.dimensions(), TargetDimensions::new(800, 600));

    let request = ExportRequest::new().custom_pixels("0", "-5");
    assert_eq!(request.dimensions(), TargetDimensions::new(800, 800));
}

#[test]
fn test_custom_ratio_guards() {
    let request = ExportRequest::new().ratio(AspectRatio::custom("3", "2"));
    assert_eq!(request.dimensions(), TargetDimensions::new(1080, 720));

    let request = ExportRequest::new().ratio(AspectRatio::custom("x", "0"));
    assert_eq!(request.dimensions(), TargetDimensions::new(1080, 1080));
}

#[test]
fn test_quick_export_is_a4_portrait() {
    let request = ExportRequest::quick(FileKind::Png);
    assert_eq!(request.file_kind, FileKind::Png);
    assert_eq!(request.dimensions(), TargetDimensions::new(794, 1123));
}

#[test]
fn test_certificate_template_defaults_to_letter_landscape() {
    let request = ExportRequest::for_template("Award Certificate");
    assert_eq!(request.dimensions(), TargetDimensions::new(1056, 816));
    assert_eq!(request.name, "Award Certificate");

    let request = ExportRequest::for_template("Birthday Invite");
    assert_eq!(request.dimensions(), TargetDimensions::new(794, 1123));
}

#[test]
fn test_file_kind_parsing() {
    assert_eq!("PNG".parse::<FileKind>().unwrap(), FileKind::Png);
    assert_eq!("jpg".parse::<FileKind>().unwrap(), FileKind::Jpeg);
    assert_eq!("word".parse::<FileKind>().unwrap(), FileKind::Doc);
    assert!("gif".parse::<FileKind>().is_err());

    assert_eq!(FileKind::Jpeg.extension(), "jpg");
    assert_eq!(FileKind::Doc.extension(), "doc");
    assert!(FileKind::Pdf.is_raster());
    assert!(!FileKind::Doc.is_raster());
}

#[test]
fn test_density_bounds() {
    assert!(RenderConfig::new().density(RenderConfig::MIN_DENSITY).validate().is_ok());
    assert!(RenderConfig::new().density(RenderConfig::MAX_DENSITY).validate().is_ok());
    assert!(RenderConfig::new().density(0.0).validate().is_err());
    assert!(RenderConfig::new().density(f32::NAN).validate().is_err());
    assert!(RenderConfig::new().density(100.0).validate().is_err());
}

#[test]
fn test_ai_config_defaults() {
    let config = AiConfig::default();
    assert!(!config.has_credential());
    assert_eq!(config.model, "gemini-1.5-flash");
    assert!(AVAILABLE_MODELS.iter().any(|(id, _)| *id == config.model));

    assert!(!AiConfig::new("   ").has_credential());
    assert!(AiConfig::new("abc").has_credential());
}

// The only test in this binary that touches the environment.
#[test]
fn test_ai_config_load_save_and_env_override() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("ai_config.json");

    std::env::remove_var(API_KEY_ENV);
    let missing = AiConfig::load(&path).unwrap();
    assert_eq!(missing, AiConfig::default());

    AiConfig::new("file-key")
        .model("gemini-2.0-flash")
        .save(&path)
        .unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("\"apiKey\""));

    let loaded = AiConfig::load(&path).unwrap();
    assert_eq!(loaded.api_key, "file-key");
    assert_eq!(loaded.model, "gemini-2.0-flash");

    std::env::set_var(API_KEY_ENV, "env-key");
    let overridden = AiConfig::load(&path).unwrap();
    std::env::remove_var(API_KEY_ENV);
    assert_eq!(overridden.api_key, "env-key");
    assert_eq!(overridden.model, "gemini-2.0-flash");
}

#[test]
fn test_ai_config_partial_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ai_config.json");
    std::fs::write(&path, r#"{"model": "gemini-2.0-flash"}"#).unwrap();

    let config: AiConfig = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(config.model, "gemini-2.0-flash");
    assert_eq!(config.endpoint, AiConfig::default().endpoint);
}
