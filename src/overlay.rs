use facelab_vision::mesh::Landmark;
use image::{Rgb, RgbImage};
use imageproc::drawing;

use crate::metrics::Scores;
use crate::roi::{self, Region, RoiMap};

/// Minimum score, per metric, before a heatmap blob is drawn at all.
const MIN_OILINESS_HEAT: u8 = 30;
const MIN_TEXTURE_HEAT: u8 = 25;
const MIN_BEARD_HEAT: u8 = 20;

/// Peak blob opacity at score 100.
const MAX_HEAT_OPACITY: f32 = 0.6;

const MESH_DOT_RADIUS: i32 = 2;

const OILINESS_COLOR: Rgb<u8> = Rgb([240, 200, 60]);
const TEXTURE_COLOR: Rgb<u8> = Rgb([220, 70, 60]);
const BEARD_COLOR: Rgb<u8> = Rgb([70, 100, 220]);
const PLAIN_DOT_COLOR: Rgb<u8> = Rgb([90, 200, 120]);

/// Drawing capability the renderer needs from a display target. Keeps the
/// renderer independent of any real canvas, so it can run against a
/// recording fake in tests.
pub trait Surface {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    /// Restore the unannotated base frame. Gradients accumulate otherwise.
    fn reset(&mut self);
    fn draw_point(&mut self, x: f32, y: f32, color: Rgb<u8>);
    /// Radial gradient blob: full `opacity` at the center, fading linearly
    /// to nothing at `radius`.
    fn blend_radial(&mut self, cx: f32, cy: f32, radius: f32, color: Rgb<u8>, opacity: f32);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayMode {
    /// Sparse keypoint dots colored by region membership.
    Mesh,
    /// Per-region gradient blobs, intensity driven by the scores.
    Heatmap,
}

/// Redraw the surface for one analysis pass. Always resets first, so calling
/// this repeatedly with the same inputs produces the same image.
pub fn render(
    surface: &mut dyn Surface,
    mode: OverlayMode,
    landmarks: &[Landmark],
    map: &RoiMap,
    scores: &Scores,
) {
    surface.reset();
    match mode {
        OverlayMode::Mesh => draw_mesh(surface, landmarks, map),
        OverlayMode::Heatmap => draw_heatmap(surface, landmarks, map, scores),
    }
}

fn draw_mesh(surface: &mut dyn Surface, landmarks: &[Landmark], map: &RoiMap) {
    for (idx, lm) in landmarks.iter().enumerate() {
        let color = match map.region_of(idx) {
            Some(region) => region_color(region),
            None => PLAIN_DOT_COLOR,
        };
        surface.draw_point(lm.x, lm.y, color);
    }
}

fn draw_heatmap(surface: &mut dyn Surface, landmarks: &[Landmark], map: &RoiMap, scores: &Scores) {
    let blobs: [(&[Region], u8, u8, Rgb<u8>); 3] = [
        (&[Region::Forehead], scores.oiliness, MIN_OILINESS_HEAT, OILINESS_COLOR),
        (
            &[Region::LeftCheek, Region::RightCheek],
            scores.texture,
            MIN_TEXTURE_HEAT,
            TEXTURE_COLOR,
        ),
        (&[Region::Chin, Region::Jaw], scores.beard, MIN_BEARD_HEAT, BEARD_COLOR),
    ];

    for (regions, score, min_score, color) in blobs {
        if score < min_score {
            continue;
        }
        let opacity = score as f32 / 100.0 * MAX_HEAT_OPACITY;
        for &region in regions {
            if let Some((cx, cy, radius)) = blob_geometry(landmarks, map.indices(region)) {
                surface.blend_radial(cx, cy, radius, color, opacity);
            }
        }
    }
}

fn region_color(region: Region) -> Rgb<u8> {
    match region {
        Region::Forehead => OILINESS_COLOR,
        Region::LeftCheek | Region::RightCheek => TEXTURE_COLOR,
        Region::Chin | Region::Jaw => BEARD_COLOR,
    }
}

/// Centroid plus a radius spanning half the larger bounding-box edge.
fn blob_geometry(landmarks: &[Landmark], indices: &[usize]) -> Option<(f32, f32, f32)> {
    let (cx, cy) = roi::centroid(landmarks, indices)?;
    let mut span = 0.0f32;
    for &idx in indices {
        if let Some(p) = landmarks.get(idx) {
            span = span.max((p.x - cx).abs()).max((p.y - cy).abs());
        }
    }
    Some((cx, cy, span.max(4.0)))
}

/// [`Surface`] over an in-memory frame. Keeps the pristine base around so
/// `reset` can fully restore it.
pub struct ImageSurface {
    base: RgbImage,
    frame: RgbImage,
}

impl ImageSurface {
    pub fn new(base: RgbImage) -> Self {
        let frame = base.clone();
        Self { base, frame }
    }

    pub fn frame(&self) -> &RgbImage {
        &self.frame
    }

    pub fn into_frame(self) -> RgbImage {
        self.frame
    }
}

impl Surface for ImageSurface {
    fn width(&self) -> u32 {
        self.frame.width()
    }

    fn height(&self) -> u32 {
        self.frame.height()
    }

    fn reset(&mut self) {
        self.frame = self.base.clone();
    }

    fn draw_point(&mut self, x: f32, y: f32, color: Rgb<u8>) {
        drawing::draw_filled_circle_mut(
            &mut self.frame,
            (x.round() as i32, y.round() as i32),
            MESH_DOT_RADIUS,
            color,
        );
    }

    fn blend_radial(&mut self, cx: f32, cy: f32, radius: f32, color: Rgb<u8>, opacity: f32) {
        if radius <= 0.0 || opacity <= 0.0 {
            return;
        }
        let (width, height) = self.frame.dimensions();
        let x0 = ((cx - radius).floor() as i64).clamp(0, width as i64) as u32;
        let x1 = ((cx + radius).ceil() as i64).clamp(0, width as i64) as u32;
        let y0 = ((cy - radius).floor() as i64).clamp(0, height as i64) as u32;
        let y1 = ((cy + radius).ceil() as i64).clamp(0, height as i64) as u32;

        for y in y0..y1 {
            for x in x0..x1 {
                let dx = x as f32 + 0.5 - cx;
                let dy = y as f32 + 0.5 - cy;
                let dist = (dx * dx + dy * dy).sqrt();
                if dist >= radius {
                    continue;
                }
                let alpha = opacity * (1.0 - dist / radius);
                let px = *self.frame.get_pixel(x, y);
                self.frame.put_pixel(x, y, blend(px, color, alpha));
            }
        }
    }
}

fn blend(dst: Rgb<u8>, src: Rgb<u8>, alpha: f32) -> Rgb<u8> {
    let mix = |d: u8, s: u8| (d as f32 * (1.0 - alpha) + s as f32 * alpha).round() as u8;
    Rgb([
        mix(dst.0[0], src.0[0]),
        mix(dst.0[1], src.0[1]),
        mix(dst.0[2], src.0[2]),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use facelab_vision::MESH_POINTS;

    /// Records calls instead of drawing.
    #[derive(Default)]
    struct RecordingSurface {
        resets: u32,
        points: Vec<(f32, f32, Rgb<u8>)>,
        blobs: Vec<(f32, f32, f32, Rgb<u8>, f32)>,
    }

    impl Surface for RecordingSurface {
        fn width(&self) -> u32 {
            100
        }
        fn height(&self) -> u32 {
            100
        }
        fn reset(&mut self) {
            self.resets += 1;
            self.points.clear();
            self.blobs.clear();
        }
        fn draw_point(&mut self, x: f32, y: f32, color: Rgb<u8>) {
            self.points.push((x, y, color));
        }
        fn blend_radial(&mut self, cx: f32, cy: f32, radius: f32, color: Rgb<u8>, opacity: f32) {
            self.blobs.push((cx, cy, radius, color, opacity));
        }
    }

    fn grid_landmarks() -> Vec<Landmark> {
        (0..MESH_POINTS)
            .map(|i| Landmark {
                x: (i % 20) as f32 * 4.0 + 10.0,
                y: (i / 20) as f32 * 3.0 + 10.0,
                z: 0.0,
            })
            .collect()
    }

    #[test]
    fn test_mesh_mode_draws_every_landmark() {
        let mut surface = RecordingSurface::default();
        let landmarks = grid_landmarks();
        let map = RoiMap::default();

        render(&mut surface, OverlayMode::Mesh, &landmarks, &map, &Scores::default());
        assert_eq!(surface.resets, 1);
        assert_eq!(surface.points.len(), MESH_POINTS);
        assert!(surface.blobs.is_empty());
    }

    #[test]
    fn test_heatmap_gates_on_minimum_score() {
        let mut surface = RecordingSurface::default();
        let landmarks = grid_landmarks();
        let map = RoiMap::default();

        render(
            &mut surface,
            OverlayMode::Heatmap,
            &landmarks,
            &map,
            &Scores::default(),
        );
        assert!(surface.blobs.is_empty());

        let scores = Scores {
            oiliness: 80,
            ..Scores::default()
        };
        render(&mut surface, OverlayMode::Heatmap, &landmarks, &map, &scores);
        // one forehead blob, nothing for the below-threshold metrics
        assert_eq!(surface.blobs.len(), 1);
        assert_eq!(surface.blobs[0].3, OILINESS_COLOR);
        assert!((surface.blobs[0].4 - 0.8 * MAX_HEAT_OPACITY).abs() < 1e-6);
    }

    #[test]
    fn test_heatmap_cheek_metric_draws_both_cheeks() {
        let mut surface = RecordingSurface::default();
        let landmarks = grid_landmarks();
        let map = RoiMap::default();

        let scores = Scores {
            texture: 60,
            ..Scores::default()
        };
        render(&mut surface, OverlayMode::Heatmap, &landmarks, &map, &scores);
        assert_eq!(surface.blobs.len(), 2);
    }

    #[test]
    fn test_render_resets_before_drawing() {
        let mut surface = RecordingSurface::default();
        let landmarks = grid_landmarks();
        let map = RoiMap::default();

        render(&mut surface, OverlayMode::Mesh, &landmarks, &map, &Scores::default());
        render(&mut surface, OverlayMode::Mesh, &landmarks, &map, &Scores::default());
        // points do not accumulate across invocations
        assert_eq!(surface.resets, 2);
        assert_eq!(surface.points.len(), MESH_POINTS);
    }

    #[test]
    fn test_image_surface_render_is_idempotent() {
        let base = RgbImage::from_pixel(64, 64, Rgb([100, 100, 100]));
        let mut surface = ImageSurface::new(base.clone());
        let landmarks = grid_landmarks();
        let map = RoiMap::default();
        let scores = Scores {
            oiliness: 90,
            texture: 70,
            beard: 50,
            symmetry: 80,
        };

        render(&mut surface, OverlayMode::Heatmap, &landmarks, &map, &scores);
        let first = surface.frame().clone();
        render(&mut surface, OverlayMode::Heatmap, &landmarks, &map, &scores);
        assert_eq!(surface.frame().as_raw(), first.as_raw());
        // and the overlay actually changed pixels
        assert_ne!(surface.frame().as_raw(), base.as_raw());
    }

    #[test]
    fn test_blend_radial_touches_only_the_disc() {
        let base = RgbImage::from_pixel(20, 20, Rgb([0, 0, 0]));
        let mut surface = ImageSurface::new(base);
        surface.blend_radial(10.0, 10.0, 4.0, Rgb([255, 255, 255]), 1.0);

        let frame = surface.frame();
        assert_eq!(*frame.get_pixel(0, 0), Rgb([0, 0, 0]));
        assert_eq!(*frame.get_pixel(19, 19), Rgb([0, 0, 0]));
        assert!(frame.get_pixel(10, 10).0[0] > 200);
    }

    #[test]
    fn test_blob_geometry_minimum_radius() {
        let landmarks = vec![Landmark { x: 5.0, y: 5.0, z: 0.0 }];
        let (cx, cy, radius) = blob_geometry(&landmarks, &[0]).unwrap();
        assert_eq!((cx, cy), (5.0, 5.0));
        assert_eq!(radius, 4.0);
        assert!(blob_geometry(&landmarks, &[9]).is_none());
    }
}
