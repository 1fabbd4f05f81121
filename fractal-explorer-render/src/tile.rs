use serde::{Deserialize, Serialize};

/// Default tile size in pixels. 64×64 tiles give a few hundred work units
/// for a typical window, enough to keep every worker busy.
pub const TILE_SIZE: u32 = 64;

/// Default leaf area for quadrant splitting.
pub const MAX_TILE_AREA: u64 = 2000;

/// A rectangular tile within the output image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    /// Pixel x of the top-left corner.
    pub x: u32,
    /// Pixel y of the top-left corner.
    pub y: u32,
    /// Tile width in pixels (may be smaller at the right edge).
    pub width: u32,
    /// Tile height in pixels (may be smaller at the bottom edge).
    pub height: u32,
}

impl Tile {
    /// Number of pixels in this tile.
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// How the output image is cut into work units for the worker pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Partition {
    /// Fixed-size square tiles in row-major order.
    Grid { tile_size: u32 },
    /// Recursively split into quadrants until every leaf is at most
    /// `max_tile_area` pixels.
    Quadtree { max_tile_area: u64 },
}

impl Partition {
    pub fn tiles(&self, width: u32, height: u32) -> Vec<Tile> {
        match *self {
            Self::Grid { tile_size } => build_tile_grid(width, height, tile_size),
            Self::Quadtree { max_tile_area } => split_quadrants(width, height, max_tile_area),
        }
    }
}

impl Default for Partition {
    fn default() -> Self {
        Self::Grid {
            tile_size: TILE_SIZE,
        }
    }
}

/// Build a grid of tiles for the given image dimensions.
pub fn build_tile_grid(width: u32, height: u32, tile_size: u32) -> Vec<Tile> {
    let tile_size = tile_size.max(1);
    let mut tiles = Vec::new();
    let mut y = 0;
    while y < height {
        let th = tile_size.min(height - y);
        let mut x = 0;
        while x < width {
            let tw = tile_size.min(width - x);
            tiles.push(Tile {
                x,
                y,
                width: tw,
                height: th,
            });
            x += tw;
        }
        y += th;
    }
    tiles
}

/// Split the image into quadrants, recursively, until no leaf exceeds
/// `max_area` pixels. Empty quadrants (from odd splits) are dropped.
pub fn split_quadrants(width: u32, height: u32, max_area: u64) -> Vec<Tile> {
    let mut leaves = Vec::new();
    split_into(
        Tile {
            x: 0,
            y: 0,
            width,
            height,
        },
        max_area.max(1),
        &mut leaves,
    );
    leaves
}

fn split_into(region: Tile, max_area: u64, leaves: &mut Vec<Tile>) {
    if region.width == 0 || region.height == 0 {
        return;
    }
    let area = region.width as u64 * region.height as u64;
    if area <= max_area {
        leaves.push(region);
        return;
    }

    let left_w = region.width / 2;
    let top_h = region.height / 2;
    let quadrants = [
        Tile {
            x: region.x,
            y: region.y,
            width: left_w,
            height: top_h,
        },
        Tile {
            x: region.x + left_w,
            y: region.y,
            width: region.width - left_w,
            height: top_h,
        },
        Tile {
            x: region.x,
            y: region.y + top_h,
            width: left_w,
            height: region.height - top_h,
        },
        Tile {
            x: region.x + left_w,
            y: region.y + top_h,
            width: region.width - left_w,
            height: region.height - top_h,
        },
    ];
    for quadrant in quadrants {
        split_into(quadrant, max_area, leaves);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Panics unless `tiles` cover a `width × height` image exactly once.
    fn assert_exact_cover(tiles: &[Tile], width: u32, height: u32) {
        let mut covered = vec![false; width as usize * height as usize];
        for tile in tiles {
            for py in tile.y..tile.y + tile.height {
                for px in tile.x..tile.x + tile.width {
                    let idx = py as usize * width as usize + px as usize;
                    assert!(!covered[idx], "pixel ({px}, {py}) covered twice");
                    covered[idx] = true;
                }
            }
        }
        assert!(covered.iter().all(|&c| c), "all pixels must be covered");
    }

    #[test]
    fn tile_grid_covers_image_once() {
        assert_exact_cover(&build_tile_grid(200, 150, TILE_SIZE), 200, 150);
    }

    #[test]
    fn tile_size_respects_limit() {
        for tile in build_tile_grid(256, 100, 32) {
            assert!(tile.width <= 32);
            assert!(tile.height <= 32);
        }
    }

    #[test]
    fn quadtree_covers_image_once() {
        for (w, h) in [(300, 300), (301, 17), (1, 5000), (7, 1)] {
            let leaves = split_quadrants(w, h, MAX_TILE_AREA);
            assert_exact_cover(&leaves, w, h);
        }
    }

    #[test]
    fn quadtree_leaves_respect_area_threshold() {
        let leaves = split_quadrants(640, 480, MAX_TILE_AREA);
        assert!(leaves.len() > 1);
        assert!(leaves.iter().all(|t| t.pixel_count() as u64 <= MAX_TILE_AREA));
        assert!(leaves.iter().all(|t| t.pixel_count() > 0));
    }

    #[test]
    fn small_image_is_a_single_leaf() {
        let leaves = split_quadrants(40, 40, MAX_TILE_AREA);
        assert_eq!(
            leaves,
            vec![Tile {
                x: 0,
                y: 0,
                width: 40,
                height: 40
            }]
        );
    }

    #[test]
    fn zero_sized_image_has_no_tiles() {
        assert!(Partition::default().tiles(0, 10).is_empty());
        assert!(split_quadrants(10, 0, 1).is_empty());
    }
}
