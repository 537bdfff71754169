use std::path::Path;

use anyhow::{Context, Result};
use image::RgbImage;
use ndarray::Array4;
use ort::{session::Session, value::Value};

/// Number of points in the face mesh produced by the landmark model.
pub const MESH_POINTS: usize = 468;

/// Model input edge length in pixels.
const INPUT_SIZE: u32 = 192;

const DEFAULT_MIN_CONFIDENCE: f32 = 0.5;

/// A detected mesh point in source-frame pixel coordinates. The meaning of
/// each index is a convention of the external model, not of this crate.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Wrapper around the face landmark model. Runs the whole frame through the
/// network and reports either the full mesh or, when the model's confidence
/// head falls below threshold, no face at all.
pub struct Landmarker {
    session: Session,
    min_confidence: f32,
}

impl Landmarker {
    pub fn new(model_path: &Path) -> Result<Self> {
        Ok(Self {
            session: crate::model::landmark_session(model_path)?,
            min_confidence: DEFAULT_MIN_CONFIDENCE,
        })
    }

    pub fn with_min_confidence(mut self, min_confidence: f32) -> Self {
        self.min_confidence = min_confidence;
        self
    }

    /// Detect the face mesh in a frame. Returns an empty vec when the model
    /// is not confident a face is present.
    pub fn detect(&mut self, img: &RgbImage) -> Result<Vec<Landmark>> {
        let (width, height) = img.dimensions();
        if width == 0 || height == 0 {
            anyhow::bail!("cannot run landmark model on an empty frame");
        }

        let resized = image::imageops::resize(
            img,
            INPUT_SIZE,
            INPUT_SIZE,
            image::imageops::FilterType::Triangle,
        );

        // NHWC, RGB, 0..1
        let input_array = Array4::from_shape_fn(
            (1, INPUT_SIZE as usize, INPUT_SIZE as usize, 3),
            |(_, y, x, c)| resized.get_pixel(x as u32, y as u32)[c] as f32 / 255.0,
        );
        let input_tensor = Value::from_array(input_array)?;

        let outputs = self.session.run(ort::inputs![input_tensor])?;

        // The model has two heads: the 468x3 mesh and a scalar face score.
        // Pick them apart by element count rather than by output name.
        let mut mesh: Option<Vec<f32>> = None;
        let mut raw_score = f32::MAX;
        for (_name, output) in outputs.iter() {
            let (_shape, data) = output.try_extract_tensor::<f32>()?;
            if data.len() >= MESH_POINTS * 3 {
                mesh = Some(data.to_vec());
            } else if data.len() == 1 {
                raw_score = data[0];
            }
        }
        let mesh = mesh.context("landmark model produced no mesh output")?;

        if !face_present(raw_score, self.min_confidence) {
            log::debug!(
                "no face: sigmoid({raw_score:.3}) below threshold {:.2}",
                self.min_confidence
            );
            return Ok(Vec::new());
        }

        Ok(decode_mesh(
            &mesh,
            width as f32 / INPUT_SIZE as f32,
            height as f32 / INPUT_SIZE as f32,
        ))
    }
}

pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// The face score head emits a raw logit.
pub fn face_present(raw_score: f32, min_confidence: f32) -> bool {
    sigmoid(raw_score) >= min_confidence
}

/// Scale raw mesh coordinates (model-input pixels) back to source-frame
/// pixels. Depth stays in model units scaled with x, matching the model's
/// weak-perspective convention.
pub fn decode_mesh(raw: &[f32], x_scale: f32, y_scale: f32) -> Vec<Landmark> {
    raw.chunks_exact(3)
        .take(MESH_POINTS)
        .map(|p| Landmark {
            x: p[0] * x_scale,
            y: p[1] * y_scale,
            z: p[2] * x_scale,
        })
        .collect()
}
