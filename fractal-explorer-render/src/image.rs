use crate::colour::Rgb;
use crate::tile::Tile;

/// An RGBA pixel buffer holding a finished render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub width: u32,
    pub height: u32,
    /// RGBA pixel data, 4 bytes per pixel, row-major order.
    pub pixels: Vec<u8>,
}

impl Image {
    /// Create a new image filled with opaque black.
    pub fn new(width: u32, height: u32) -> Self {
        let mut pixels = vec![0u8; width as usize * height as usize * 4];
        for chunk in pixels.chunks_exact_mut(4) {
            chunk[3] = 255;
        }
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Copy a tile's RGBA data into the correct position in the image.
    pub fn blit_tile(&mut self, tile: &Tile, tile_pixels: &[u8]) {
        debug_assert_eq!(tile_pixels.len(), tile.pixel_count() * 4);
        let stride = self.width as usize * 4;
        let row_len = tile.width as usize * 4;
        for (row, src) in tile_pixels.chunks_exact(row_len.max(1)).enumerate() {
            let dst_start = (tile.y as usize + row) * stride + tile.x as usize * 4;
            self.pixels[dst_start..dst_start + row_len].copy_from_slice(src);
        }
    }

    /// Colour at `(x, y)`, or `None` outside the image.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgb> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        Some(Rgb::new(self.pixels[i], self.pixels[i + 1], self.pixels[i + 2]))
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, colour: Rgb) {
        if x >= self.width || y >= self.height {
            return;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        self.pixels[i..i + 4].copy_from_slice(&colour.to_rgba());
    }
}
