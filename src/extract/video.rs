use std::path::Path;

use opencv::{
    core::Mat,
    prelude::*,
    videoio::{self, VideoCapture, VideoCaptureAPIs},
};

use super::{compute_frame_range, CancelToken};
use crate::error::{Error, Result};
use crate::pose::{KeypointSequence, PoseEstimator, PoseFrame, VideoSegmentRef};

/// 動画セグメントからキーポイントシーケンスを抽出する
///
/// デコードと推論はセグメント内で厳密に逐次。検出器はフレーム間の
/// 状態を持たないが、タイムスタンプの帳尻を単純に保つため順に処理する。
pub struct SequenceExtractor<D: PoseEstimator> {
    detector: D,
}

impl<D: PoseEstimator> SequenceExtractor<D> {
    pub fn new(detector: D) -> Self {
        Self { detector }
    }

    /// セグメント範囲をデコードして1フレーム1エントリの時系列を組み立てる
    ///
    /// 全か無か: 途中のデコード失敗・キャンセルでは部分シーケンスを
    /// 返さない。永続化は呼び出し側の明示的なステップ。
    pub fn extract(
        &mut self,
        video_path: &Path,
        segment: &VideoSegmentRef,
        cancel: &CancelToken,
    ) -> Result<KeypointSequence> {
        let video_open = || Error::VideoOpen {
            path: video_path.to_path_buf(),
        };

        let mut capture = VideoCapture::from_file(
            video_path.to_str().ok_or_else(video_open)?,
            VideoCaptureAPIs::CAP_ANY as i32,
        )
        .map_err(|_| video_open())?;

        if !capture.is_opened().map_err(|_| video_open())? {
            return Err(video_open());
        }

        let fps = capture
            .get(videoio::CAP_PROP_FPS)
            .map_err(|_| video_open())?;
        let total_frames = capture
            .get(videoio::CAP_PROP_FRAME_COUNT)
            .map_err(|_| video_open())?;
        if fps <= 0.0 || total_frames < 0.0 {
            return Err(video_open());
        }
        let total_frames = total_frames as u64;

        let (start_frame, end_frame) =
            compute_frame_range(segment.start_time_s, segment.end_time_s, fps, total_frames)?;

        capture
            .set(videoio::CAP_PROP_POS_FRAMES, start_frame as f64)
            .map_err(|_| video_open())?;

        let mut frames = Vec::with_capacity((end_frame - start_frame) as usize);
        let mut frame = Mat::default();

        for frame_index in start_frame..end_frame {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            let ok = capture
                .read(&mut frame)
                .map_err(|_| Error::FrameDecode { frame_index })?;
            if !ok || frame.empty() {
                return Err(Error::FrameDecode { frame_index });
            }

            // タイムスタンプはフレームレート由来 (壁時計は使わない)
            let timestamp_s = frame_index as f64 / fps;
            let pose_frame = match self.detector.detect(&frame).map_err(Error::Detector)? {
                Some(landmarks) => PoseFrame::detected(frame_index, timestamp_s, landmarks),
                None => PoseFrame::empty(frame_index, timestamp_s),
            };
            frames.push(pose_frame);
        }

        Ok(KeypointSequence {
            video_id: segment.video_id,
            segment_id: segment.segment_id,
            frames,
        })
    }
}
