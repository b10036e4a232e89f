/// Built-in overlay renderer: a translucent info panel flattened over the
/// bottom edge of the photo.
///
/// The darkened band is the placeholder region the platform renderer draws
/// the address, coordinate and timestamp lines into; this implementation
/// bakes no glyphs itself. Platforms with a native view-capture facility
/// supply their own [`OverlayRenderer`] with full text rasterization; this
/// one keeps the pipeline usable without it. The panel height scales with
/// the image and the output is re-encoded as JPEG.
use std::io::Cursor;

use async_trait::async_trait;
use image::{GenericImageView, Rgba, RgbaImage};
use log::debug;

use super::{CompositionError, OverlayRenderer, WatermarkData};

/// Fraction of the image height the panel occupies.
const PANEL_HEIGHT_RATIO: f32 = 0.14;
/// Panel shade alpha, 0..=255.
const PANEL_ALPHA: u32 = 160;
/// JPEG quality for the re-encoded output.
const OUTPUT_QUALITY: u8 = 85;

#[derive(Debug, Clone, Copy, Default)]
pub struct PanelRenderer;

impl PanelRenderer {
    pub fn new() -> Self {
        PanelRenderer
    }
}

#[async_trait]
impl OverlayRenderer for PanelRenderer {
    async fn render(
        &self,
        base: &[u8],
        data: &WatermarkData,
    ) -> Result<Vec<u8>, CompositionError> {
        let decoded = image::load_from_memory(base).map_err(CompositionError::Decode)?;
        let (width, height) = decoded.dimensions();
        debug!(
            "flattening panel region for \"{}\" / {} / {}",
            data.address, data.coordinates, data.date_time
        );

        let mut canvas: RgbaImage = decoded.to_rgba8();
        let panel_height = ((height as f32 * PANEL_HEIGHT_RATIO) as u32).max(1);
        let panel_top = height.saturating_sub(panel_height);

        // Blend a dark band over the bottom of the image.
        for y in panel_top..height {
            for x in 0..width {
                let Rgba([r, g, b, a]) = *canvas.get_pixel(x, y);
                let shade = |c: u8| -> u8 {
                    ((c as u32 * (255 - PANEL_ALPHA)) / 255) as u8
                };
                canvas.put_pixel(x, y, Rgba([shade(r), shade(g), shade(b), a]));
            }
        }

        let mut out = Cursor::new(Vec::new());
        let encoder =
            image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, OUTPUT_QUALITY);
        image::DynamicImage::ImageRgba8(canvas)
            .to_rgb8()
            .write_with_encoder(encoder)
            .map_err(CompositionError::Encode)?;

        Ok(out.into_inner())
    }
}
