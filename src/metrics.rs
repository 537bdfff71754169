//! Score derivation. Every metric here is a pure function of its pixel and
//! landmark inputs: fixed synthetic inputs must yield bit-identical scores
//! on every invocation.

use facelab_vision::mesh::Landmark;
use image::RgbImage;

use crate::roi::{Region, RoiMap};
use crate::sampler::{self, PixelBlock};

/// Forehead pixels brighter than this count toward the oiliness score.
pub const OILINESS_LUMA_THRESHOLD: f32 = 190.0;

const TEXTURE_SCALE: f32 = 2.0;
const OILINESS_SCALE: f32 = 250.0;
const BEARD_SCALE: f32 = 2.0;

/// One analysis pass worth of scores, all bounded to 0..=100. Built fresh on
/// every pass and never mutated; there is no history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Scores {
    pub symmetry: u8,
    pub texture: u8,
    pub oiliness: u8,
    pub beard: u8,
}

/// Ratio of the shorter to the longer nose-to-feature distance, averaged
/// over the map's two (left, right) pairs and scaled so that 100 means a
/// perfect mirror. A pair whose two distances are both zero counts as equal.
pub fn symmetry_score(landmarks: &[Landmark], map: &RoiMap) -> u8 {
    let nose = match landmarks.get(map.nose) {
        Some(p) => p,
        None => return 0,
    };

    let mut total = 0.0f32;
    let mut pairs = 0u32;
    for &(left, right) in &map.symmetry_pairs {
        let (Some(lp), Some(rp)) = (landmarks.get(left), landmarks.get(right)) else {
            continue;
        };
        let dl = distance(nose, lp);
        let dr = distance(nose, rp);
        let longer = dl.max(dr);
        let ratio = if longer == 0.0 { 1.0 } else { dl.min(dr) / longer };
        total += ratio;
        pairs += 1;
    }
    if pairs == 0 {
        return 0;
    }
    to_score(total / pairs as f32 * 100.0)
}

/// Population standard deviation of cheek brightness, as a roughness proxy.
pub fn texture_score(luma_stddev: f32) -> u8 {
    to_score(luma_stddev * TEXTURE_SCALE)
}

/// Fraction of bright forehead pixels, scaled up so a modest shiny patch
/// already registers.
pub fn oiliness_score(bright_fraction: f32) -> u8 {
    to_score(bright_fraction * OILINESS_SCALE)
}

/// Positive exactly when the chin/jaw area is darker than the cheeks.
pub fn beard_score(cheek_mean: f32, chin_mean: f32) -> u8 {
    to_score((cheek_mean - chin_mean).max(0.0) * BEARD_SCALE)
}

/// Run the full sampling + scoring pass over one frame. A missing or
/// degenerate region zeroes the affected metric instead of failing.
pub fn analyze(img: &RgbImage, landmarks: &[Landmark], map: &RoiMap) -> Scores {
    let forehead = sampler::sample(img, landmarks, map.indices(Region::Forehead));
    let left_cheek = sampler::sample(img, landmarks, map.indices(Region::LeftCheek));
    let right_cheek = sampler::sample(img, landmarks, map.indices(Region::RightCheek));

    let lower_face: Vec<usize> = map
        .indices(Region::Chin)
        .iter()
        .chain(map.indices(Region::Jaw))
        .copied()
        .collect();
    let chin = sampler::sample(img, landmarks, &lower_face);

    let cheek_lumas: Vec<f32> = left_cheek
        .iter()
        .chain(right_cheek.iter())
        .flat_map(PixelBlock::lumas)
        .collect();

    let texture = texture_score(population_stddev(&cheek_lumas));
    let oiliness = forehead
        .map(|b| oiliness_score(b.bright_fraction(OILINESS_LUMA_THRESHOLD)))
        .unwrap_or(0);
    let beard = match (mean(&cheek_lumas), chin.map(|b| b.mean_luma())) {
        (Some(cheek), Some(chin)) => beard_score(cheek, chin),
        _ => 0,
    };

    Scores {
        symmetry: symmetry_score(landmarks, map),
        texture,
        oiliness,
        beard,
    }
}

fn distance(a: &Landmark, b: &Landmark) -> f32 {
    ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt()
}

fn mean(values: &[f32]) -> Option<f32> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f32>() / values.len() as f32)
}

fn population_stddev(values: &[f32]) -> f32 {
    match mean(values) {
        Some(m) => {
            let var = values.iter().map(|v| (v - m) * (v - m)).sum::<f32>() / values.len() as f32;
            var.sqrt()
        }
        None => 0.0,
    }
}

// Floor rather than round, so only a true 100.0 reads as a perfect score.
fn to_score(value: f32) -> u8 {
    value.clamp(0.0, 100.0).floor() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lm(x: f32, y: f32) -> Landmark {
        Landmark { x, y, z: 0.0 }
    }

    fn map_with_single_pair() -> RoiMap {
        RoiMap {
            nose: 0,
            symmetry_pairs: [(1, 2), (1, 2)],
            ..RoiMap::default()
        }
    }

    #[test]
    fn test_symmetry_equal_distances_is_perfect() {
        let map = map_with_single_pair();
        let landmarks = vec![lm(100.0, 100.0), lm(80.0, 100.0), lm(120.0, 100.0)];
        assert_eq!(symmetry_score(&landmarks, &map), 100);
    }

    #[test]
    fn test_symmetry_unequal_distances_is_below_perfect() {
        let map = map_with_single_pair();
        let landmarks = vec![lm(100.0, 100.0), lm(80.0, 100.0), lm(140.0, 100.0)];
        let score = symmetry_score(&landmarks, &map);
        assert!(score < 100);
        // 20 vs 40 should land at exactly half
        assert_eq!(score, 50);
    }

    #[test]
    fn test_symmetry_coincident_points_count_as_equal() {
        let map = map_with_single_pair();
        let landmarks = vec![lm(10.0, 10.0), lm(10.0, 10.0), lm(10.0, 10.0)];
        assert_eq!(symmetry_score(&landmarks, &map), 100);
    }

    #[test]
    fn test_symmetry_missing_landmarks_is_zero() {
        let map = map_with_single_pair();
        assert_eq!(symmetry_score(&[], &map), 0);
        assert_eq!(symmetry_score(&[lm(1.0, 1.0)], &map), 0);
    }

    #[test]
    fn test_texture_monotone_in_stddev() {
        let mut last = texture_score(0.0);
        assert_eq!(last, 0);
        for stddev in [5.0, 10.0, 30.0, 60.0, 500.0] {
            let score = texture_score(stddev);
            assert!(score >= last);
            assert!(score <= 100);
            last = score;
        }
        assert_eq!(last, 100);
    }

    #[test]
    fn test_oiliness_monotone_in_bright_fraction() {
        let mut last = oiliness_score(0.0);
        assert_eq!(last, 0);
        for fraction in [0.05, 0.1, 0.2, 0.4, 1.0] {
            let score = oiliness_score(fraction);
            assert!(score >= last);
            assert!(score <= 100);
            last = score;
        }
        assert_eq!(last, 100);
    }

    #[test]
    fn test_beard_worked_example() {
        // cheek 90, chin 50 -> (90 - 50) * 2 = 80
        assert_eq!(beard_score(90.0, 50.0), 80);
    }

    #[test]
    fn test_beard_zero_when_chin_not_darker() {
        assert_eq!(beard_score(50.0, 50.0), 0);
        assert_eq!(beard_score(50.0, 90.0), 0);
    }

    #[test]
    fn test_population_stddev() {
        assert_eq!(population_stddev(&[]), 0.0);
        assert_eq!(population_stddev(&[7.0, 7.0, 7.0]), 0.0);
        // {0, 10} -> mean 5, variance 25, stddev 5
        assert!((population_stddev(&[0.0, 10.0]) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_to_score_clamps_and_floors() {
        assert_eq!(to_score(-4.0), 0);
        assert_eq!(to_score(99.9), 99);
        assert_eq!(to_score(100.0), 100);
        assert_eq!(to_score(640.0), 100);
    }
}
