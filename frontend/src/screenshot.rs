use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// Encode an RGB24 frame as PNG.
pub fn write_png(path: &Path, width: u32, height: u32, rgb: &[u8]) -> std::io::Result<()> {
    let file = File::create(path)?;
    let mut encoder = png::Encoder::new(BufWriter::new(file), width, height);
    encoder.set_color(png::ColorType::Rgb);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header().map_err(std::io::Error::other)?;
    writer.write_image_data(rgb).map_err(std::io::Error::other)?;
    Ok(())
}

/// First `irobot-NNNN.png` in `dir` that does not exist yet.
pub fn next_path(dir: &Path) -> PathBuf {
    (0..)
        .map(|n: u32| dir.join(format!("irobot-{n:04}.png")))
        .find(|p| !p.exists())
        .unwrap_or_else(|| dir.join("irobot.png"))
}
