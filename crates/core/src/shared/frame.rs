/// Channel order of a 3-channel frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum PixelOrder {
    #[default]
    Rgb,
    Bgr,
}

impl PixelOrder {
    /// Reorders an `[r, g, b]` color into this layout.
    pub fn arrange(self, rgb: [u8; 3]) -> [u8; 3] {
        match self {
            PixelOrder::Rgb => rgb,
            PixelOrder::Bgr => [rgb[2], rgb[1], rgb[0]],
        }
    }
}

/// A single video frame: contiguous pixel bytes in row-major order.
///
/// Decoders produce RGB; the pixel order travels with the frame so that
/// consumers which care (the landmark extractor, the annotator) can
/// interpret the bytes without guessing.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    index: usize,
    order: PixelOrder,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
            index,
            order: PixelOrder::Rgb,
        }
    }

    pub fn with_order(mut self, order: PixelOrder) -> Self {
        self.order = order;
        self
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn order(&self) -> PixelOrder {
        self.order
    }

    /// Reads the pixel at (`x`, `y`) as `[r, g, b]`, whatever the storage order.
    pub fn rgb_at(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height || self.channels < 3 {
            return None;
        }
        let offset = self.offset(x, y);
        let px = [
            self.data[offset],
            self.data[offset + 1],
            self.data[offset + 2],
        ];
        Some(self.order.arrange(px))
    }

    /// Writes an `[r, g, b]` color at (`x`, `y`); out-of-bounds writes are ignored.
    pub fn put_rgb(&mut self, x: u32, y: u32, rgb: [u8; 3]) {
        if x >= self.width || y >= self.height || self.channels < 3 {
            return;
        }
        let offset = self.offset(x, y);
        let px = self.order.arrange(rgb);
        self.data[offset..offset + 3].copy_from_slice(&px);
    }

    /// Mirrors the frame around its vertical axis in place.
    pub fn flip_horizontal(&mut self) {
        let w = self.width as usize;
        let c = self.channels as usize;
        let row_len = w * c;
        for row in self.data.chunks_exact_mut(row_len) {
            for col in 0..w / 2 {
                let left = col * c;
                let right = (w - 1 - col) * c;
                for k in 0..c {
                    row.swap(left + k, right + k);
                }
            }
        }
    }

    /// Returns the pixels as tightly packed RGBA, for display surfaces.
    pub fn to_rgba(&self) -> Vec<u8> {
        let c = self.channels as usize;
        let mut out = Vec::with_capacity(self.width as usize * self.height as usize * 4);
        for px in self.data.chunks_exact(c) {
            let rgb = if c >= 3 {
                self.order.arrange([px[0], px[1], px[2]])
            } else {
                [px[0], px[0], px[0]]
            };
            out.extend_from_slice(&rgb);
            out.push(255);
        }
        out
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * self.channels as usize
    }
}
