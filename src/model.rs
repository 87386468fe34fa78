use std::fs::File;
use std::io::Read;
use std::path::Path;

use image::imageops::FilterType;
use image::RgbImage;
use serde::Serialize;
use tensorflow::{Graph, ImportGraphDefOptions, Session, SessionOptions, SessionRunArgs, Tensor};
use thiserror::Error;

use crate::catalog::{ClassOrder, DiagnosisLabel};
use crate::utils::decode_image;

pub const IMAGE_SIZE: u32 = 224;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Prediction {
    pub label: DiagnosisLabel,
    pub confidence: f32,
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("failed to read model artifact: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to decode image: {0}")]
    Image(#[from] image::ImageError),
    #[error("tensorflow error: {0}")]
    Tensorflow(#[from] tensorflow::Status),
    #[error("operation '{0}' not found in graph")]
    MissingOperation(String),
    #[error("model produced {actual} scores, class list has {expected}")]
    OutputSize { expected: usize, actual: usize },
}

/// Scores a stored image. Implementations block until inference finishes.
pub trait Classifier: Send + Sync {
    fn classify(&self, image_path: &Path) -> Result<Prediction, ModelError>;
}

pub struct TensorflowModel {
    session: Session,
    graph: Graph,
    classes: ClassOrder,
    input_op: String,
    output_op: String,
}

impl TensorflowModel {
    pub fn new(
        model_path: &Path,
        classes: ClassOrder,
        input_op: &str,
        output_op: &str,
    ) -> Result<Self, ModelError> {
        let mut graph = Graph::new();
        let mut model_file = File::open(model_path)?;
        let mut model_bytes = Vec::new();
        model_file.read_to_end(&mut model_bytes)?;

        graph.import_graph_def(&model_bytes, &ImportGraphDefOptions::new())?;

        let session = Session::new(&SessionOptions::new(), &graph)?;

        Ok(TensorflowModel {
            session,
            graph,
            classes,
            input_op: input_op.to_string(),
            output_op: output_op.to_string(),
        })
    }

    fn operation(&self, name: &str) -> Result<tensorflow::Operation, ModelError> {
        self.graph
            .operation_by_name(name)
            .map_err(tensorflow::Status::from)?
            .ok_or_else(|| ModelError::MissingOperation(name.to_string()))
    }
}

impl Classifier for TensorflowModel {
    fn classify(&self, image_path: &Path) -> Result<Prediction, ModelError> {
        let pixels = preprocess_image(image_path)?;
        let side = IMAGE_SIZE as u64;
        let mut input_tensor = Tensor::<f32>::new(&[1, side, side, 3]);
        input_tensor.copy_from_slice(&pixels);

        let input_operation = self.operation(&self.input_op)?;
        let output_operation = self.operation(&self.output_op)?;

        let mut args = SessionRunArgs::new();
        args.add_feed(&input_operation, 0, &input_tensor);
        let output_token = args.request_fetch(&output_operation, 0);
        self.session.run(&mut args)?;
        let output_tensor: Tensor<f32> = args.fetch(output_token)?;

        top_prediction(&output_tensor, &self.classes)
    }
}

/// Decodes by content, forces RGB, resizes to 224x224 and scales each channel to [0, 1].
/// Returns the values in NHWC order for a batch of one.
pub fn preprocess_image(image_path: &Path) -> Result<Vec<f32>, ModelError> {
    let img = decode_image(image_path)?;
    let resized: RgbImage = img
        .resize_exact(IMAGE_SIZE, IMAGE_SIZE, FilterType::CatmullRom)
        .to_rgb8();

    let mut flat_img = Vec::with_capacity((IMAGE_SIZE * IMAGE_SIZE * 3) as usize);
    for pixel in resized.pixels() {
        flat_img.push(pixel[0] as f32 / 255.0);
        flat_img.push(pixel[1] as f32 / 255.0);
        flat_img.push(pixel[2] as f32 / 255.0);
    }

    Ok(flat_img)
}

/// Arg-max over the probability vector. No thresholding.
pub fn top_prediction(scores: &[f32], classes: &ClassOrder) -> Result<Prediction, ModelError> {
    if scores.len() != classes.len() {
        return Err(ModelError::OutputSize {
            expected: classes.len(),
            actual: scores.len(),
        });
    }

    let (index, confidence) = scores
        .iter()
        .copied()
        .enumerate()
        .fold((0, f32::NEG_INFINITY), |best, (i, score)| {
            if score > best.1 {
                (i, score)
            } else {
                best
            }
        });

    let label = classes.label_at(index).ok_or(ModelError::OutputSize {
        expected: classes.len(),
        actual: scores.len(),
    })?;

    Ok(Prediction { label, confidence })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_highest_score() {
        let classes = ClassOrder::default();
        let prediction = top_prediction(&[0.05, 0.1, 0.7, 0.1, 0.05], &classes).unwrap();
        assert_eq!(prediction.label, DiagnosisLabel::EarlyBlight);
        assert!((prediction.confidence - 0.7).abs() < f32::EPSILON);
    }

    #[test]
    fn first_index_wins_ties() {
        let classes = ClassOrder::default();
        let prediction = top_prediction(&[0.2; 5], &classes).unwrap();
        assert_eq!(prediction.label, DiagnosisLabel::Healthy);
    }

    #[test]
    fn low_confidence_is_still_returned() {
        let classes = ClassOrder::default();
        let prediction = top_prediction(&[0.19, 0.2, 0.2, 0.2, 0.21], &classes).unwrap();
        assert_eq!(prediction.label, DiagnosisLabel::LeafMold);
    }

    #[test]
    fn index_follows_class_order() {
        let classes =
            ClassOrder::parse("late_blight\nhealthy\nbacterial_spot\nearly_blight\nleaf_mold")
                .unwrap();
        let prediction = top_prediction(&[0.9, 0.1, 0.0, 0.0, 0.0], &classes).unwrap();
        assert_eq!(prediction.label, DiagnosisLabel::LateBlight);
    }

    #[test]
    fn rejects_mismatched_output() {
        let classes = ClassOrder::default();
        let err = top_prediction(&[0.5, 0.5], &classes).unwrap_err();
        assert!(matches!(
            err,
            ModelError::OutputSize {
                expected: 5,
                actual: 2
            }
        ));
    }

    #[test]
    fn preprocess_produces_scaled_batch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("leaf.png");
        image::RgbaImage::from_pixel(40, 30, image::Rgba([255, 0, 51, 255]))
            .save(&path)
            .unwrap();

        let pixels = preprocess_image(&path).unwrap();
        assert_eq!(pixels.len(), (IMAGE_SIZE * IMAGE_SIZE * 3) as usize);
        assert!(pixels.iter().all(|v| (0.0..=1.0).contains(v)));
        assert!((pixels[0] - 1.0).abs() < 1e-3);
        assert!((pixels[2] - 0.2).abs() < 1e-3);
    }
}
