use serde::{Deserialize, Serialize};

/// BlazePose の 33 ランドマークインデックス
///
/// トレーナー側・トレーニー側で共有される固定スキーマ。
/// インデックス N は常に同じ関節を指す。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum LandmarkIndex {
    Nose = 0,
    LeftEyeInner = 1,
    LeftEye = 2,
    LeftEyeOuter = 3,
    RightEyeInner = 4,
    RightEye = 5,
    RightEyeOuter = 6,
    LeftEar = 7,
    RightEar = 8,
    MouthLeft = 9,
    MouthRight = 10,
    LeftShoulder = 11,
    RightShoulder = 12,
    LeftElbow = 13,
    RightElbow = 14,
    LeftWrist = 15,
    RightWrist = 16,
    LeftPinky = 17,
    RightPinky = 18,
    LeftIndex = 19,
    RightIndex = 20,
    LeftThumb = 21,
    RightThumb = 22,
    LeftHip = 23,
    RightHip = 24,
    LeftKnee = 25,
    RightKnee = 26,
    LeftAnkle = 27,
    RightAnkle = 28,
    LeftHeel = 29,
    RightHeel = 30,
    LeftFootIndex = 31,
    RightFootIndex = 32,
}

impl LandmarkIndex {
    pub const COUNT: usize = 33;

    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::Nose),
            1 => Some(Self::LeftEyeInner),
            2 => Some(Self::LeftEye),
            3 => Some(Self::LeftEyeOuter),
            4 => Some(Self::RightEyeInner),
            5 => Some(Self::RightEye),
            6 => Some(Self::RightEyeOuter),
            7 => Some(Self::LeftEar),
            8 => Some(Self::RightEar),
            9 => Some(Self::MouthLeft),
            10 => Some(Self::MouthRight),
            11 => Some(Self::LeftShoulder),
            12 => Some(Self::RightShoulder),
            13 => Some(Self::LeftElbow),
            14 => Some(Self::RightElbow),
            15 => Some(Self::LeftWrist),
            16 => Some(Self::RightWrist),
            17 => Some(Self::LeftPinky),
            18 => Some(Self::RightPinky),
            19 => Some(Self::LeftIndex),
            20 => Some(Self::RightIndex),
            21 => Some(Self::LeftThumb),
            22 => Some(Self::RightThumb),
            23 => Some(Self::LeftHip),
            24 => Some(Self::RightHip),
            25 => Some(Self::LeftKnee),
            26 => Some(Self::RightKnee),
            27 => Some(Self::LeftAnkle),
            28 => Some(Self::RightAnkle),
            29 => Some(Self::LeftHeel),
            30 => Some(Self::RightHeel),
            31 => Some(Self::LeftFootIndex),
            32 => Some(Self::RightFootIndex),
            _ => None,
        }
    }
}

/// 単一ランドマーク
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    /// 正規化されたX座標 (0.0〜1.0)
    pub x: f64,
    /// 正規化されたY座標 (0.0〜1.0)
    pub y: f64,
    /// 相対深度 (腰中心を原点とする)
    pub z: f64,
    /// 可視性スコア (0.0〜1.0)
    pub visibility: f64,
}

impl Landmark {
    pub fn new(x: f64, y: f64, z: f64, visibility: f64) -> Self {
        Self { x, y, z, visibility }
    }

    /// 可視性が閾値を超えているか
    pub fn is_visible(&self, threshold: f64) -> bool {
        self.visibility > threshold
    }
}

/// 1フレーム分の検出結果
///
/// `pose_detected` が false のフレームでは `landmarks` は空。
/// デコードしたフレームと1対1対応する (欠番なし)。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseFrame {
    pub frame_index: u64,
    /// フレームレート由来のタイムスタンプ (frame_index / fps)
    pub timestamp_s: f64,
    pub landmarks: Vec<Landmark>,
    pub pose_detected: bool,
}

impl PoseFrame {
    pub fn detected(frame_index: u64, timestamp_s: f64, landmarks: Vec<Landmark>) -> Self {
        Self {
            frame_index,
            timestamp_s,
            landmarks,
            pose_detected: true,
        }
    }

    /// 姿勢未検出フレーム
    pub fn empty(frame_index: u64, timestamp_s: f64) -> Self {
        Self {
            frame_index,
            timestamp_s,
            landmarks: Vec::new(),
            pose_detected: false,
        }
    }
}

/// 1セグメント分のキーポイント時系列
///
/// 抽出時に一度だけ生成され、永続化後は不変として扱う。
/// 再抽出は全体を置き換える (フレーム単位のパッチはしない)。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeypointSequence {
    pub video_id: u64,
    pub segment_id: u64,
    pub frames: Vec<PoseFrame>,
}

/// 動画セグメントの参照情報 (外部コラボレータが供給する)
///
/// `start_time_s < end_time_s` は呼び出し側が保証する。
/// `end_time_s = None` は動画末尾まで。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoSegmentRef {
    pub video_id: u64,
    pub segment_id: u64,
    pub exercise_id: u64,
    pub start_time_s: f64,
    pub end_time_s: Option<f64>,
}

/// トレーニー側のライブサンプル (比較時のみ使用、永続化しない)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveSample {
    pub timestamp_s: f64,
    pub landmarks: Vec<Landmark>,
}
