use std::path::Path;

use opencv::{
    core::{Scalar, Size},
    dnn,
    prelude::*,
    types::{VectorOfRect, VectorOff32, VectorOfi32},
};

use super::{BoundingBox, Detection, Detector};
use crate::{
    error::{Error, Result},
    img::frame::Frame,
};

const INPUT_SIZE: i32 = 416;
const NMS_THRESHOLD: f32 = 0.4;

/// Pretrained COCO detector running through OpenCV's DNN module.
pub struct DnnDetector {
    model: dnn::DetectionModel,
    confidence: f32,
}

pub fn make_person_detector(
    weights: &Path,
    config: &Path,
    confidence: f32,
    cuda: bool,
) -> Result<DnnDetector> {
    debug!("loading detection model {}", weights.display());

    let weights = model_path(weights)?;
    let config = model_path(config)?;

    let mut model = dnn::DetectionModel::new(weights, config)?;

    if cuda {
        model.set_preferable_target(dnn::Target::DNN_TARGET_CUDA)?;
        model.set_preferable_backend(dnn::Backend::DNN_BACKEND_CUDA)?;
    } else {
        model.set_preferable_target(dnn::Target::DNN_TARGET_CPU)?;
        model.set_preferable_backend(dnn::Backend::DNN_BACKEND_OPENCV)?;
    }

    // Parameters for Detection
    let scale = 1. / 255.;
    let mean = Scalar::default();
    let input_size = Size::new(INPUT_SIZE, INPUT_SIZE);
    model.set_input_params(scale, input_size, mean, true, false)?;

    Ok(DnnDetector { model, confidence })
}

fn model_path(path: &Path) -> Result<&str> {
    if !path.is_file() {
        return Err(Error::asset(path, "model file not found"));
    }

    path.to_str()
        .ok_or_else(|| Error::asset(path, "path is not valid unicode"))
}

impl Detector<Frame> for DnnDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>> {
        let mut class_ids = VectorOfi32::new();
        let mut confidences = VectorOff32::new();
        let mut boxes = VectorOfRect::new();

        self.model.detect(
            &frame.mat,
            &mut class_ids,
            &mut confidences,
            &mut boxes,
            self.confidence,
            NMS_THRESHOLD,
        )?;

        let detections = class_ids
            .iter()
            .zip(confidences.iter())
            .zip(boxes.iter())
            .map(|((class_id, confidence), rect)| Detection {
                class_id,
                confidence,
                bbox: BoundingBox::new(rect.x, rect.y, rect.width, rect.height),
            })
            .collect::<Vec<_>>();

        trace!("frame {}\tdetections {}", frame.num, detections.len());

        Ok(detections)
    }
}
