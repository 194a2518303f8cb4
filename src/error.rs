use std::path::PathBuf;

use thiserror::Error;

/// パイプライン全体のエラー種別
///
/// 抽出・保存・比較の失敗はすべてここに集約される。
/// リトライはしない。再抽出するかどうかは呼び出し側が決める。
#[derive(Debug, Error)]
pub enum Error {
    /// 動画ソースが開けない、またはメタデータが読めない
    #[error("cannot open video source: {}", path.display())]
    VideoOpen { path: PathBuf },

    /// クランプ後のフレーム範囲が空
    #[error("segment is empty after clamping (start_frame={start_frame}, end_frame={end_frame})")]
    EmptySegment { start_frame: u64, end_frame: u64 },

    /// 個別フレームのデコード失敗。セグメント全体の抽出を中断する
    #[error("failed to decode frame {frame_index}")]
    FrameDecode { frame_index: u64 },

    /// キャンセルトークンによる中断
    #[error("extraction cancelled")]
    Cancelled,

    /// 姿勢推定バックエンドの失敗
    #[error("pose detector failed")]
    Detector(#[source] anyhow::Error),

    /// 未知のハンドル、またはブロブが存在しない
    #[error("sequence not found: {0}")]
    NotFound(String),

    /// ブロブは存在するがデシリアライズできない
    #[error("corrupt sequence blob: {}", path.display())]
    CorruptSequence {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// シーケンスのシリアライズ失敗
    #[error("failed to serialize sequence")]
    Serialize(#[source] serde_json::Error),

    /// リファレンスとライブサンプルのランドマーク数不一致
    #[error("landmark count mismatch: reference has {reference}, live sample has {live}")]
    SchemaMismatch { reference: usize, live: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
