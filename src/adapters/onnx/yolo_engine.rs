use anyhow::{anyhow, Result};
use image::{imageops::FilterType, RgbImage};
use ndarray::{s, Array4, ArrayViewD, Axis, IxDyn};
use ort::execution_providers::CUDAExecutionProvider;
use ort::session::Session;
use ort::value::Value;
use std::fs;

use crate::application::ports::DetectorPort;
use crate::domain::detection::RawDetection;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::model::{ModelId, YoloParams};
use crate::domain::stream::Frame;

pub const COCO_CLASSES: [&str; 80] = [
    "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck", "boat",
    "traffic light", "fire hydrant", "stop sign", "parking meter", "bench", "bird", "cat", "dog",
    "horse", "sheep", "cow", "elephant", "bear", "zebra", "giraffe", "backpack", "umbrella",
    "handbag", "tie", "suitcase", "frisbee", "skis", "snowboard", "sports ball", "kite",
    "baseball bat", "baseball glove", "skateboard", "surfboard", "tennis racket", "bottle",
    "wine glass", "cup", "fork", "knife", "spoon", "bowl", "banana", "apple", "sandwich",
    "orange", "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair", "couch",
    "potted plant", "bed", "dining table", "toilet", "tv", "laptop", "mouse", "remote",
    "keyboard", "cell phone", "microwave", "oven", "toaster", "sink", "refrigerator", "book",
    "clock", "vase", "scissors", "teddy bear", "hair drier", "toothbrush",
];

/// YOLOv8-style ONNX detector: one output of shape [1, 4 + classes, candidates].
pub struct OnnxYoloEngine {
    session: Session,
    params: YoloParams,
    labels: Vec<String>,
}

impl OnnxYoloEngine {
    pub fn load(model: &ModelId, params: YoloParams) -> Result<Self> {
        let mut builder = Session::builder()?.with_intra_threads(4)?;

        // CUDA is optional: registered when available, CPU otherwise.
        let cuda = CUDAExecutionProvider::default().build();
        if let Ok(builder_with_cuda) = builder.clone().with_execution_providers([cuda]) {
            builder = builder_with_cuda;
        }

        let model_bytes = fs::read(&model.onnx_path)?;
        let session = builder.commit_from_memory(&model_bytes)?;

        let labels: Vec<String> = COCO_CLASSES.iter().map(|s| s.to_string()).collect();
        tracing::info!("Model loaded: {} ({})", model.name, model.onnx_path);
        tracing::info!("Available classes: {:?}", labels);

        Ok(Self { session, params, labels })
    }

    pub fn infer(&mut self, rgb: &RgbImage) -> Result<Vec<RawDetection>> {
        let params = &self.params;
        let imgsz = params.input_size as usize;
        let resized = image::imageops::resize(rgb, imgsz as u32, imgsz as u32, FilterType::Nearest);

        let mut input = Array4::<f32>::zeros((1, 3, imgsz, imgsz));
        for (x, y, pixel) in resized.enumerate_pixels() {
            input[[0, 0, y as usize, x as usize]] = pixel[0] as f32 / 255.0;
            input[[0, 1, y as usize, x as usize]] = pixel[1] as f32 / 255.0;
            input[[0, 2, y as usize, x as usize]] = pixel[2] as f32 / 255.0;
        }

        let input_shape = vec![1, 3, imgsz as i64, imgsz as i64];
        let input_tensor = Value::from_array((input_shape, input.into_raw_vec_and_offset().0))?;

        let outputs = self.session.run(ort::inputs![input_tensor])?;
        let (shape_out, data_out) = outputs[0].try_extract_tensor::<f32>()?;

        let dims: Vec<usize> = shape_out.iter().map(|&x| x as usize).collect();
        let array_view = ArrayViewD::from_shape(IxDyn(&dims), data_out)?;
        let view = array_view.index_axis(Axis(0), 0);
        if view.ndim() != 2 || view.shape()[0] <= 4 {
            return Err(anyhow!("unexpected model output shape {:?}", dims));
        }

        let num_candidates = view.shape()[1];
        let sx = rgb.width() as f32 / imgsz as f32;
        let sy = rgb.height() as f32 / imgsz as f32;

        let mut detections = Vec::new();

        for i in 0..num_candidates {
            let scores = view.slice(s![4.., i]);
            let Some((class_id, &max_score)) =
                scores.indexed_iter().max_by(|(_, a), (_, b)| a.total_cmp(b))
            else {
                continue;
            };

            if max_score > params.conf_floor {
                let cx = view[[0, i]];
                let cy = view[[1, i]];
                let w = view[[2, i]];
                let h = view[[3, i]];

                detections.push(RawDetection {
                    class_id,
                    confidence: max_score,
                    bbox: [
                        (cx - w / 2.0) * sx,
                        (cy - h / 2.0) * sy,
                        (cx + w / 2.0) * sx,
                        (cy + h / 2.0) * sy,
                    ],
                });
            }
        }

        let kept = nms(detections, params.iou_threshold);
        Ok(kept.into_iter().take(params.max_detections).collect())
    }
}

impl DetectorPort for OnnxYoloEngine {
    fn detect(&mut self, frame: &Frame) -> DomainResult<Vec<RawDetection>> {
        self.infer(&frame.image)
            .map_err(|e| DomainError::OperationFailed(format!("inference: {e}")))
    }

    fn labels(&self) -> &[String] {
        &self.labels
    }
}

/// Greedy per-class suppression, highest confidence first.
fn nms(mut detections: Vec<RawDetection>, iou_threshold: f32) -> Vec<RawDetection> {
    detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut keep: Vec<RawDetection> = Vec::new();
    for det in detections {
        let suppressed = keep
            .iter()
            .any(|k| k.class_id == det.class_id && iou(&k.bbox, &det.bbox) >= iou_threshold);
        if !suppressed {
            keep.push(det);
        }
    }
    keep
}

fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let x1 = a[0].max(b[0]);
    let y1 = a[1].max(b[1]);
    let x2 = a[2].min(b[2]);
    let y2 = a[3].min(b[3]);

    let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    let area_a = (a[2] - a[0]) * (a[3] - a[1]);
    let area_b = (b[2] - b[0]) * (b[3] - b[1]);
    let union = area_a + area_b - inter;
    if union <= 0.0 {
        0.0
    } else {
        inter / union
    }
}
