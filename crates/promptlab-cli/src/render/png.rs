use anyhow::{Context, Result};
use promptlab_core::records::write_atomic;
use std::path::Path;

/// Rasterize an SVG document into a PNG file at its natural size
pub fn svg_to_png(svg: &str, path: &Path) -> Result<()> {
    let mut options = usvg::Options::default();
    options.fontdb_mut().load_system_fonts();

    let tree = usvg::Tree::from_data(svg.as_bytes(), &options).context("failed to parse SVG")?;
    let size = tree.size().to_int_size();
    let mut pixmap = resvg::tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| anyhow::anyhow!("Failed to create pixmap"))?;

    resvg::render(
        &tree,
        resvg::tiny_skia::Transform::default(),
        &mut pixmap.as_mut(),
    );

    let png = pixmap.encode_png().context("failed to encode PNG")?;
    write_atomic(path, &png)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_svg_to_png_writes_png_signature() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("chart.png");
        let svg = super::super::svg::bar_chart("t", "", &[("a".to_string(), 1)]);
        svg_to_png(&svg, &path).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
    }
}
