//! Soy viewer: spins a textured cube through the software pipeline
//!
//! Usage: `soy-viewer [config.ron] [texture.png]`
//!
//! Keys: 1/2/3 render mode, P perspective correction, I integer raster path,
//! Space play the blip, F fade it out.

use std::path::Path;

use macroquad::prelude::*;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use soy_engine::audio::{AudioEngine, Sound, SAMPLE_RATE};
use soy_engine::config::EngineConfig;
use soy_engine::rasterizer::{self as raster, Camera, Framebuffer, Mesh, RenderMode, Renderer, Transform};
use soy_engine::VERSION;

const DEFAULT_CONFIG: &str = "soy.ron";
const BLIP_CHANNEL: usize = 0;

fn window_conf() -> Conf {
    Conf {
        window_title: format!("Soy Viewer v{}", VERSION),
        window_width: raster::WIDTH as i32 * 3,
        window_height: raster::HEIGHT as i32 * 3,
        window_resizable: true,
        high_dpi: true,
        ..Default::default()
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn load_config(arg: Option<&str>) -> EngineConfig {
    let path = arg.unwrap_or(DEFAULT_CONFIG);
    if arg.is_none() && !Path::new(path).exists() {
        return EngineConfig::default();
    }
    match EngineConfig::load(path) {
        Ok(config) => config,
        Err(e) => {
            warn!("Failed to load config {}: {}, using defaults", path, e);
            EngineConfig::default()
        }
    }
}

fn load_texture(arg: Option<&str>) -> raster::Texture {
    let fallback = || raster::Texture::checkerboard(64, 64, raster::Color::new(230, 200, 120), raster::Color::new(90, 60, 40));
    match arg {
        Some(path) => raster::Texture::from_file(path).unwrap_or_else(|e| {
            warn!("Failed to load texture {}: {}", path, e);
            fallback()
        }),
        None => fallback(),
    }
}

/// Short decaying sine at 440 Hz
fn make_blip() -> Sound {
    let len = SAMPLE_RATE as usize / 5;
    let samples = (0..len)
        .map(|i| {
            let t = i as f32 / SAMPLE_RATE as f32;
            let env = 1.0 - i as f32 / len as f32;
            ((t * 440.0 * std::f32::consts::TAU).sin() * 12000.0 * env) as i16
        })
        .collect();
    Sound::from_samples("blip", samples)
}

fn handle_input(renderer: &mut Renderer, audio: &AudioEngine) {
    for (key, mode) in [KeyCode::Key1, KeyCode::Key2, KeyCode::Key3].into_iter().zip(RenderMode::ALL) {
        if is_key_pressed(key) {
            renderer.set_mode(mode);
            info!("Render mode: {}", mode.label());
        }
    }
    if is_key_pressed(KeyCode::P) {
        renderer.settings.perspective_correct = !renderer.settings.perspective_correct;
    }
    if is_key_pressed(KeyCode::I) {
        renderer.settings.sub_pixel = !renderer.settings.sub_pixel;
    }
    if is_key_pressed(KeyCode::Space) {
        audio.command("play blip", |m| m.play(BLIP_CHANNEL));
    }
    if is_key_pressed(KeyCode::F) {
        audio.command("fade blip", |m| m.fade(BLIP_CHANNEL, 20.0));
    }
}

/// Scale the framebuffer to the window, keeping its aspect ratio
fn present(fb: &Framebuffer) {
    let texture = Texture2D::from_rgba8(fb.width as u16, fb.height as u16, &fb.pixels);
    texture.set_filter(FilterMode::Nearest);

    let scale = (screen_width() / fb.width as f32).min(screen_height() / fb.height as f32);
    let draw_w = fb.width as f32 * scale;
    let draw_h = fb.height as f32 * scale;
    draw_texture_ex(
        &texture,
        (screen_width() - draw_w) * 0.5,
        (screen_height() - draw_h) * 0.5,
        WHITE,
        DrawTextureParams {
            dest_size: Some(Vec2::new(draw_w, draw_h)),
            ..Default::default()
        },
    );
}

fn draw_hud(renderer: &Renderer, audio: &AudioEngine, last_error: Option<&str>) {
    let s = &renderer.settings;
    let stats = renderer.stats();
    let lines = [
        format!(
            "{} | perspective {} | {}",
            s.mode.label(),
            if s.perspective_correct { "on" } else { "off" },
            if s.sub_pixel { "sub-pixel" } else { "integer" },
        ),
        format!(
            "tris {} culled {} near-clipped {} drawn {}",
            stats.triangles_in, stats.culled, stats.near_clipped_away, stats.rasterized
        ),
        format!(
            "audio {} | active channels {}",
            if audio.is_running() { "on" } else { "off" },
            audio.with_mixer(|m| m.active_count()).unwrap_or(0),
        ),
    ];
    for (i, line) in lines.iter().enumerate() {
        draw_text(line, 10.0, 22.0 + i as f32 * 20.0, 20.0, WHITE);
    }
    if let Some(err) = last_error {
        draw_text(err, 10.0, screen_height() - 12.0, 20.0, RED);
    }
}

#[macroquad::main(window_conf)]
async fn main() {
    init_tracing();

    let args: Vec<String> = std::env::args().collect();
    let config = load_config(args.get(1).map(String::as_str));
    let texture = load_texture(args.get(2).map(String::as_str));

    let mut fb = Framebuffer::new(config.camera.width, config.camera.height);
    let mut renderer = Renderer::new(Camera::from_config(&config.camera), config.render.clone(), &config.scratch);
    let cube = Mesh::cube();

    let audio = AudioEngine::new(&config.audio);
    audio.command("load blip", |m| m.set_sound(BLIP_CHANNEL, make_blip()));

    let sky_top = raster::Color::new(20, 24, 40);
    let sky_bottom = raster::Color::new(60, 50, 70);
    let mut angle = 0.0f32;

    info!("Soy viewer v{} ({}x{})", VERSION, fb.width, fb.height);

    loop {
        handle_input(&mut renderer, &audio);
        angle += get_frame_time();

        renderer.begin_frame(&mut fb);
        let (w, h) = (fb.width as i32, fb.height as i32);
        fb.fill_gradient_v(0, 0, w, h, sky_top, sky_bottom);

        let transform = Transform::at(0.0, 0.0, 5.0).with_rotation(angle * 0.7, angle, angle * 0.3);
        let last_error = renderer
            .draw_mesh(&mut fb, &cube, &transform, Some(&texture))
            .err()
            .map(|e| e.to_string());

        fb.draw_rect_thick(0, 0, w - 1, h - 1, 2, renderer.settings.line_color);

        clear_background(BLACK);
        present(&fb);
        draw_hud(&renderer, &audio, last_error.as_deref());

        next_frame().await;
    }
}
