/// Palette-indexed sprite storage
/// Sprites hold 8-bit palette indices (0 = transparent) in either a flat
/// bitmap or a run-length encoded row table. Colours are resolved through a
/// shared ARGB palette at draw time, optionally through a remap table.
pub mod procedural;

pub use procedural::{DemoImages, PaletteIndex};

/// Palette index that never produces a pixel
pub const TRANSPARENT_INDEX: u8 = 0;

/// Longest run a single RLE record can hold
const RLE_MAX_RUN: usize = 0x7F;
/// Set on the count byte of the final run in a row
const RLE_LAST_RUN: u8 = 0x80;

/// Handle to a sprite in a [`SpriteStore`], with an optional colour remap.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ImageId {
    pub index: u32,
    pub remap: Option<u16>,
}

impl ImageId {
    #[inline]
    pub const fn new(index: u32) -> Self {
        Self { index, remap: None }
    }

    #[inline]
    pub const fn with_remap(self, remap: u16) -> Self {
        Self {
            index: self.index,
            remap: Some(remap),
        }
    }
}

/// 256-entry ARGB palette
#[derive(Clone, Debug)]
pub struct Palette {
    pub colors: [u32; 256],
}

impl Palette {
    pub fn new(colors: [u32; 256]) -> Self {
        Self { colors }
    }

    #[inline(always)]
    pub fn argb(&self, index: u8) -> u32 {
        self.colors[index as usize]
    }
}

/// Maps palette indices to other palette indices (recolouring)
pub type RemapTable = [u8; 256];

/// Identity remap, useful as a starting point for building tables
pub fn identity_remap() -> RemapTable {
    let mut table = [0u8; 256];
    for (i, slot) in table.iter_mut().enumerate() {
        *slot = i as u8;
    }
    table
}

/// Run-length encoded sprite rows.
///
/// `row_offsets[y]` points at the first record of row `y` in `data`. Each
/// record is `[count | last_flag, start_x, count indices...]`. Empty rows
/// hold a single zero-length record with the last flag set.
#[derive(Clone, Debug)]
pub struct RleImage {
    row_offsets: Vec<u32>,
    data: Vec<u8>,
}

impl RleImage {
    pub fn encode(width: usize, height: usize, pixels: &[u8]) -> Self {
        let mut row_offsets = Vec::with_capacity(height);
        let mut data = Vec::new();

        for y in 0..height {
            row_offsets.push(data.len() as u32);
            let row = &pixels[y * width..(y + 1) * width];

            let mut runs: Vec<(usize, usize)> = Vec::new();
            let mut x = 0;
            while x < width {
                if row[x] == TRANSPARENT_INDEX {
                    x += 1;
                    continue;
                }
                let start = x;
                while x < width && row[x] != TRANSPARENT_INDEX && x - start < RLE_MAX_RUN {
                    x += 1;
                }
                runs.push((start, x - start));
            }

            if runs.is_empty() {
                data.extend_from_slice(&[RLE_LAST_RUN, 0]);
                continue;
            }

            let last = runs.len() - 1;
            for (i, &(start, count)) in runs.iter().enumerate() {
                let flag = if i == last { RLE_LAST_RUN } else { 0 };
                data.push(count as u8 | flag);
                data.push(start as u8);
                data.extend_from_slice(&row[start..start + count]);
            }
        }

        Self { row_offsets, data }
    }

    /// Palette index at (x, y), transparent when no run covers it
    pub fn index_at(&self, x: i32, y: i32) -> u8 {
        let Some(&offset) = self.row_offsets.get(y as usize) else {
            return TRANSPARENT_INDEX;
        };
        if y < 0 || x < 0 {
            return TRANSPARENT_INDEX;
        }

        let mut cursor = offset as usize;
        loop {
            let (Some(&head), Some(&start)) = (self.data.get(cursor), self.data.get(cursor + 1))
            else {
                return TRANSPARENT_INDEX;
            };
            let count = (head & !RLE_LAST_RUN) as i32;
            let start = start as i32;
            if x >= start && x < start + count {
                let idx = cursor + 2 + (x - start) as usize;
                return self.data.get(idx).copied().unwrap_or(TRANSPARENT_INDEX);
            }
            if head & RLE_LAST_RUN != 0 {
                return TRANSPARENT_INDEX;
            }
            cursor += 2 + count as usize;
        }
    }
}

#[derive(Clone, Debug)]
pub enum SpritePixels {
    Bitmap(Box<[u8]>),
    Rle(RleImage),
}

/// One sprite: dimensions, anchor offsets and pixel data
#[derive(Clone, Debug)]
pub struct Sprite {
    pub width: i32,
    pub height: i32,
    /// Offset from the projected anchor to the sprite's top-left pixel
    pub x_offset: i32,
    pub y_offset: i32,
    pub pixels: SpritePixels,
}

impl Sprite {
    pub fn bitmap(width: usize, height: usize, x_offset: i32, y_offset: i32, pixels: Vec<u8>) -> Self {
        debug_assert_eq!(pixels.len(), width * height);
        Self {
            width: width as i32,
            height: height as i32,
            x_offset,
            y_offset,
            pixels: SpritePixels::Bitmap(pixels.into_boxed_slice()),
        }
    }

    pub fn rle(width: usize, height: usize, x_offset: i32, y_offset: i32, pixels: &[u8]) -> Self {
        Self {
            width: width as i32,
            height: height as i32,
            x_offset,
            y_offset,
            pixels: SpritePixels::Rle(RleImage::encode(width, height, pixels)),
        }
    }

    /// Raw palette index at sprite-local (x, y); transparent outside the sprite
    #[inline]
    pub fn index_at(&self, x: i32, y: i32) -> u8 {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return TRANSPARENT_INDEX;
        }
        match &self.pixels {
            SpritePixels::Bitmap(data) => data[(y * self.width + x) as usize],
            SpritePixels::Rle(rle) => rle.index_at(x, y),
        }
    }

    /// Whether the sprite covers sprite-local (x, y).
    ///
    /// Bitmaps test the stored index, through the remap table when one is
    /// given. RLE sprites only store opaque runs, so containment is enough.
    pub fn is_pixel_present(&self, x: i32, y: i32, remap: Option<&RemapTable>) -> bool {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return false;
        }
        match &self.pixels {
            SpritePixels::Bitmap(data) => {
                let index = data[(y * self.width + x) as usize];
                match remap {
                    Some(table) => table[index as usize] != TRANSPARENT_INDEX,
                    None => index != TRANSPARENT_INDEX,
                }
            }
            SpritePixels::Rle(rle) => rle.index_at(x, y) != TRANSPARENT_INDEX,
        }
    }
}

/// Well-known overlay images the painter adds on its own
#[derive(Clone, Copy, Debug, Default)]
pub struct OverlayImages {
    pub gridline: Option<ImageId>,
    pub water: Option<ImageId>,
}

/// All sprites, remap tables and the palette used to draw them
pub struct SpriteStore {
    pub palette: Palette,
    pub overlays: OverlayImages,
    sprites: Vec<Sprite>,
    remaps: Vec<RemapTable>,
}

impl SpriteStore {
    pub fn new(palette: Palette) -> Self {
        Self {
            palette,
            overlays: OverlayImages::default(),
            sprites: Vec::new(),
            remaps: Vec::new(),
        }
    }

    pub fn add(&mut self, sprite: Sprite) -> ImageId {
        self.sprites.push(sprite);
        ImageId::new(self.sprites.len() as u32 - 1)
    }

    pub fn add_remap(&mut self, table: RemapTable) -> u16 {
        self.remaps.push(table);
        self.remaps.len() as u16 - 1
    }

    #[inline]
    pub fn get(&self, image: ImageId) -> Option<&Sprite> {
        self.sprites.get(image.index as usize)
    }

    #[inline]
    pub fn remap(&self, image: ImageId) -> Option<&RemapTable> {
        image.remap.and_then(|r| self.remaps.get(r as usize))
    }

    pub fn len(&self) -> usize {
        self.sprites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sprites.is_empty()
    }

    /// Pixel presence for an image at sprite-local coordinates
    #[inline]
    pub fn is_pixel_present(&self, image: ImageId, x: i32, y: i32) -> bool {
        self.get(image)
            .map(|s| s.is_pixel_present(x, y, self.remap(image)))
            .unwrap_or(false)
    }

    /// Final ARGB colour of a sprite-local pixel, `None` when transparent
    #[inline]
    pub fn color_at(&self, sprite: &Sprite, remap: Option<&RemapTable>, x: i32, y: i32) -> Option<u32> {
        let mut index = sprite.index_at(x, y);
        if index == TRANSPARENT_INDEX {
            return None;
        }
        if let Some(table) = remap {
            index = table[index as usize];
            if index == TRANSPARENT_INDEX {
                return None;
            }
        }
        Some(self.palette.argb(index))
    }
}
