use std::path::Path;

use anyhow::Context as _;
use spanvas_protocol::PixelGrid;

/// Decode an image file into a pixel grid.
pub fn load(path: &Path) -> anyhow::Result<PixelGrid> {
    let bytes = std::fs::read(path).with_context(|| format!("read image '{}'", path.display()))?;
    let rgba = image::load_from_memory(&bytes)
        .with_context(|| format!("decode image '{}'", path.display()))?
        .to_rgba8();
    let (width, height) = rgba.dimensions();
    PixelGrid::from_rgba8(width, height, &rgba.into_raw())
        .with_context(|| format!("image '{}' has a truncated pixel buffer", path.display()))
}

/// Write a pixel grid as a PNG, creating the output directory if needed.
pub fn save(path: &Path, pixels: &PixelGrid) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    image::save_buffer_with_format(
        path,
        &pixels.to_rgba8(),
        pixels.width(),
        pixels.height(),
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write image '{}'", path.display()))
}
