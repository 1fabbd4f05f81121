//! PNG export with embedded metadata (tEXt chunks).

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use tracing::debug;

use fractal_explorer_core::{Complex, CoordinateMapper};
use fractal_explorer_render::{Image, RenderRequest, Rgb};

use crate::error::AppError;

const SOFTWARE: &str = "Fractal Explorer";

/// Metadata to embed in an exported PNG as tEXt chunks.
#[derive(Debug, Clone)]
pub struct ExportMetadata {
    pub algorithm: String,
    pub julia_seed: Option<String>,
    pub max_iterations: u32,
    pub escape_radius: f64,
    pub viewport: String,
    pub scheme: String,
    pub width: u32,
    pub height: u32,
}

impl ExportMetadata {
    pub fn from_request(request: &RenderRequest) -> Self {
        let kind = request.algorithm.kind();
        let algorithm = match kind.seed() {
            Some(_) => format!("Julia ({})", kind.formula().name()),
            None => kind.name().to_string(),
        };
        let vp = &request.viewport;
        Self {
            algorithm,
            julia_seed: kind.seed().map(|s| s.to_string()),
            max_iterations: request.algorithm.max_iterations(),
            escape_radius: request.algorithm.escape_radius(),
            viewport: format!(
                "{},{},{},{}",
                vp.real_min, vp.real_max, vp.imaginary_min, vp.imaginary_max
            ),
            scheme: request.scheme.name().to_string(),
            width: request.width,
            height: request.height,
        }
    }

    fn description(&self) -> String {
        let mut desc = format!(
            "{} - Viewport: {}, Iterations: {}",
            self.algorithm, self.viewport, self.max_iterations
        );
        if let Some(seed) = &self.julia_seed {
            desc.push_str(&format!(", Seed: {seed}"));
        }
        desc
    }

    fn pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![
            ("FractalExplorer.Algorithm".into(), self.algorithm.clone()),
            ("FractalExplorer.MaxIterations".into(), self.max_iterations.to_string()),
            ("FractalExplorer.EscapeRadius".into(), self.escape_radius.to_string()),
            ("FractalExplorer.Viewport".into(), self.viewport.clone()),
            ("FractalExplorer.Scheme".into(), self.scheme.clone()),
            (
                "FractalExplorer.Resolution".into(),
                format!("{}x{}", self.width, self.height),
            ),
        ];
        if let Some(seed) = &self.julia_seed {
            pairs.push(("FractalExplorer.JuliaSeed".into(), seed.clone()));
        }
        pairs
    }
}

/// Write an image as a PNG file with embedded fractal metadata.
pub fn export_png(image: &Image, path: &Path, metadata: &ExportMetadata) -> Result<(), AppError> {
    let file = File::create(path).map_err(|e| AppError::io(path, e))?;
    let mut encoder = png::Encoder::new(BufWriter::new(file), image.width, image.height);
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    encoder.set_compression(png::Compression::Default);

    encoder.add_text_chunk("Software".to_string(), SOFTWARE.to_string())?;
    encoder.add_text_chunk("Description".to_string(), metadata.description())?;
    for (key, value) in metadata.pairs() {
        encoder.add_text_chunk(key, value)?;
    }

    let mut writer = encoder.write_header()?;
    writer.write_image_data(&image.pixels)?;
    writer.finish()?;

    debug!(
        "Exported PNG {}x{} to {}",
        image.width,
        image.height,
        path.display()
    );
    Ok(())
}

/// Draw the real and imaginary axes over `image` where they are in view.
pub fn draw_axes(image: &mut Image, mapper: &CoordinateMapper, colour: Rgb) {
    let (x, y) = mapper.complex_to_pixel(Complex::ZERO);
    let (x, y) = (x.round(), y.round());
    if (0.0..image.height as f64).contains(&y) {
        for px in 0..image.width {
            image.set_pixel(px, y as u32, colour);
        }
    }
    if (0.0..image.width as f64).contains(&x) {
        for py in 0..image.height {
            image.set_pixel(x as u32, py, colour);
        }
    }
}
