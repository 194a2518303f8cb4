use anyhow::Result;
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub detector: DetectorConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub extract: ExtractConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DetectorConfig {
    /// BlazePose ONNXモデルのパス
    #[serde(default = "default_model_path")]
    pub model_path: String,
    /// 姿勢有無の判定閾値 (これ未満は「姿勢なし」フレーム)
    #[serde(default = "default_detection_confidence")]
    pub detection_confidence: f64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    /// キーポイントブロブの保存先
    #[serde(default = "default_keypoints_dir")]
    pub keypoints_dir: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExtractConfig {
    /// バックログ処理のワーカースレッド数
    #[serde(default = "default_workers")]
    pub workers: usize,
}

fn default_model_path() -> String { "models/pose_landmark_full.onnx".to_string() }
fn default_detection_confidence() -> f64 { 0.5 }
fn default_keypoints_dir() -> String { "keypoints".to_string() }
fn default_workers() -> usize { 2 }

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            model_path: default_model_path(),
            detection_confidence: default_detection_confidence(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            keypoints_dir: default_keypoints_dir(),
        }
    }
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// 設定ファイルがなければデフォルトで動く
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        Self::load(path).unwrap_or_default()
    }
}
