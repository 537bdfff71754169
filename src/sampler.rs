use facelab_vision::mesh::Landmark;
use image::RgbImage;

/// Rectangular RGB sample pulled from one frame for one region. Transient:
/// computed, reduced to statistics, and dropped.
#[derive(Debug, Clone)]
pub struct PixelBlock {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBlock {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel_count(&self) -> usize {
        (self.width * self.height) as usize
    }

    /// Per-pixel grayscale brightness, Rec. 601 weights.
    pub fn lumas(&self) -> impl Iterator<Item = f32> + '_ {
        self.data.chunks_exact(3).map(|p| luma(p[0], p[1], p[2]))
    }

    pub fn mean_luma(&self) -> f32 {
        let count = self.pixel_count();
        if count == 0 {
            return 0.0;
        }
        self.lumas().sum::<f32>() / count as f32
    }

    /// Fraction of pixels brighter than `threshold`, in [0,1].
    pub fn bright_fraction(&self, threshold: f32) -> f32 {
        let count = self.pixel_count();
        if count == 0 {
            return 0.0;
        }
        let bright = self.lumas().filter(|&l| l > threshold).count();
        bright as f32 / count as f32
    }
}

pub fn luma(r: u8, g: u8, b: u8) -> f32 {
    0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32
}

/// Extract the pixel rectangle under the bounding box of the selected
/// landmarks, clamped to the frame. Returns `None` when the clamped box has
/// no area (degenerate landmarks, or a box entirely outside the frame).
/// Deterministic, and never mutates the frame.
pub fn sample(img: &RgbImage, landmarks: &[Landmark], indices: &[usize]) -> Option<PixelBlock> {
    let mut min_x = f32::MAX;
    let mut min_y = f32::MAX;
    let mut max_x = f32::MIN;
    let mut max_y = f32::MIN;
    let mut seen = false;
    for &idx in indices {
        if let Some(p) = landmarks.get(idx) {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
            seen = true;
        }
    }
    if !seen {
        return None;
    }

    let (width, height) = img.dimensions();
    let x0 = (min_x.floor() as i64).clamp(0, width as i64) as u32;
    let y0 = (min_y.floor() as i64).clamp(0, height as i64) as u32;
    let x1 = (max_x.ceil() as i64).clamp(0, width as i64) as u32;
    let y1 = (max_y.ceil() as i64).clamp(0, height as i64) as u32;
    if x1 <= x0 || y1 <= y0 {
        return None;
    }

    let (w, h) = (x1 - x0, y1 - y0);
    let mut data = Vec::with_capacity((w * h * 3) as usize);
    for y in y0..y1 {
        for x in x0..x1 {
            data.extend_from_slice(&img.get_pixel(x, y).0);
        }
    }

    Some(PixelBlock {
        width: w,
        height: h,
        data,
    })
}
