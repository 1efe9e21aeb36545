//! Texture, sample and config files on disk

use soy_engine::config::EngineConfig;
use soy_engine::rasterizer::{Color, Framebuffer, RenderMode, Texture};
use soy_engine::{AssetError, ConfigError};

#[test]
fn png_texture_loads_with_alpha() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bricks.png");
    let img = image::RgbaImage::from_fn(4, 2, |x, y| {
        let alpha = if x == 0 { 0 } else { 255 };
        image::Rgba([x as u8 * 60, y as u8 * 100, 7, alpha])
    });
    img.save(&path).unwrap();

    let tex = Texture::from_file(&path).unwrap();
    assert_eq!(tex.name, "bricks");
    assert_eq!((tex.width, tex.height), (4, 2));
    assert_eq!(tex.get_pixel(3, 1), Color::new(180, 100, 7));
    assert_eq!(tex.get_pixel(0, 1).a, 0);

    // transparent texels leave the framebuffer alone
    let mut fb = Framebuffer::new(8, 8);
    fb.clear(Color::BLUE);
    fb.blit(&tex, 2, 2);
    assert_eq!(fb.get_pixel(2, 2), Some(Color::BLUE));
    assert_eq!(fb.get_pixel(5, 3), Some(Color::new(180, 100, 7)));
}

#[test]
fn missing_texture_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = Texture::from_file(dir.path().join("gone.png")).unwrap_err();
    assert!(matches!(err, AssetError::Io { .. }));
}

#[test]
fn garbage_bytes_fail_to_decode() {
    let err = Texture::from_bytes(b"definitely not an image", "junk".to_string()).unwrap_err();
    assert!(matches!(err, AssetError::Image(_)));
}

#[test]
fn odd_length_pcm_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.raw");
    std::fs::write(&path, [1u8, 2, 3]).unwrap();
    let err = soy_engine::audio::Sound::load_raw(&path).unwrap_err();
    assert!(matches!(err, AssetError::OddPcmLength(3)));
}

#[test]
fn config_survives_a_save_load_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("soy.ron");

    let mut config = EngineConfig::default();
    config.render.mode = RenderMode::Solid;
    config.render.perspective_correct = false;
    config.camera.fov_degrees = 70.0;
    config.scratch.arena_tris = 4096;
    config.audio.channels = 1;
    config.save(&path).unwrap();

    let loaded = EngineConfig::load(&path).unwrap();
    assert_eq!(loaded, config);

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("Solid"));
}

#[test]
fn unreadable_config_reports_parse_position() {
    let err = EngineConfig::from_ron_str("(camera: (fov_degrees: \"wide\"))").unwrap_err();
    match err {
        ConfigError::Parse(e) => assert!(e.position.line >= 1),
        other => panic!("expected a parse error, got {:?}", other),
    }
}
