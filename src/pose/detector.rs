use anyhow::{Context, Result};
use ndarray::Array4;
use opencv::{
    core::{AlgorithmHint, Mat, Size, CV_32FC3},
    imgproc,
    prelude::*,
};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;
use std::path::Path;

use super::landmark::{Landmark, LandmarkIndex};

/// BlazePose用の入力サイズ
pub const POSE_INPUT_SIZE: i32 = 256;

/// 姿勢推定バックエンドの抽象
///
/// `None` は「このフレームに姿勢なし」。バックエンド差し替え時も
/// 抽出・比較ロジックには手を入れない。
pub trait PoseEstimator {
    fn detect(&mut self, frame: &Mat) -> Result<Option<Vec<Landmark>>>;
}

/// BlazePose (ONNX) を使用した姿勢検出器
pub struct OnnxPoseDetector {
    session: Session,
    detection_confidence: f64,
}

impl OnnxPoseDetector {
    /// ONNXモデルを読み込んで初期化
    pub fn new<P: AsRef<Path>>(model_path: P, detection_confidence: f64) -> Result<Self> {
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .commit_from_file(model_path.as_ref())
            .context("Failed to load ONNX model")?;

        Ok(Self {
            session,
            detection_confidence,
        })
    }
}

impl PoseEstimator for OnnxPoseDetector {
    /// デコード済みフレーム (BGR) から姿勢を検出
    ///
    /// 出力: 33ランドマーク、または姿勢なしなら None
    fn detect(&mut self, frame: &Mat) -> Result<Option<Vec<Landmark>>> {
        let input = preprocess_for_blazepose(frame)?;
        let input_tensor = Tensor::from_array(input)?;
        let outputs = self
            .session
            .run(ort::inputs!["input_1" => input_tensor])
            .context("Inference failed")?;

        // ポーズ有無フラグ [1, 1]
        let pose_flag: ndarray::ArrayViewD<f32> = outputs["Identity_1"]
            .try_extract_array()
            .context("Failed to extract pose flag")?;
        if f64::from(pose_flag[[0, 0]]) < self.detection_confidence {
            return Ok(None);
        }

        // ランドマーク [1, 195] = 33 x (x, y, z, visibility, presence)
        // 座標は入力ピクセル単位、visibility/presence はロジット
        let output: ndarray::ArrayViewD<f32> = outputs["Identity"]
            .try_extract_array()
            .context("Failed to extract landmark tensor")?;

        let size = POSE_INPUT_SIZE as f64;
        let mut landmarks = Vec::with_capacity(LandmarkIndex::COUNT);
        for i in 0..LandmarkIndex::COUNT {
            let x = f64::from(output[[0, i * 5]]) / size;
            let y = f64::from(output[[0, i * 5 + 1]]) / size;
            let z = f64::from(output[[0, i * 5 + 2]]) / size;
            let visibility = sigmoid(f64::from(output[[0, i * 5 + 3]]));
            landmarks.push(Landmark::new(x, y, z, visibility));
        }

        Ok(Some(landmarks))
    }
}

fn sigmoid(v: f64) -> f64 {
    1.0 / (1.0 + (-v).exp())
}

/// OpenCV Mat を BlazePose用の入力テンソルに変換
///
/// - BGR -> RGB
/// - 256x256 にリサイズ
/// - [1, 256, 256, 3] の f32 テンソルに変換 (0.0-1.0)
pub fn preprocess_for_blazepose(frame: &Mat) -> Result<Array4<f32>> {
    let mut rgb = Mat::default();
    imgproc::cvt_color(
        frame,
        &mut rgb,
        imgproc::COLOR_BGR2RGB,
        0,
        AlgorithmHint::ALGO_HINT_DEFAULT,
    )?;

    let mut resized = Mat::default();
    imgproc::resize(
        &rgb,
        &mut resized,
        Size::new(POSE_INPUT_SIZE, POSE_INPUT_SIZE),
        0.0,
        0.0,
        imgproc::INTER_LINEAR,
    )?;

    let mut float_mat = Mat::default();
    resized.convert_to(&mut float_mat, CV_32FC3, 1.0 / 255.0, 0.0)?;

    let s = POSE_INPUT_SIZE as usize;
    let mut tensor = Array4::<f32>::zeros((1, s, s, 3));
    for y in 0..POSE_INPUT_SIZE {
        for x in 0..POSE_INPUT_SIZE {
            let pixel = float_mat.at_2d::<opencv::core::Vec3f>(y, x)?;
            tensor[[0, y as usize, x as usize, 0]] = pixel[0];
            tensor[[0, y as usize, x as usize, 1]] = pixel[1];
            tensor[[0, y as usize, x as usize, 2]] = pixel[2];
        }
    }

    Ok(tensor)
}
