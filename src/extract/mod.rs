#[cfg(feature = "video")]
pub mod pool;
#[cfg(feature = "video")]
mod video;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{Error, Result};

#[cfg(feature = "video")]
pub use video::SequenceExtractor;

/// 抽出の協調キャンセル用フラグ
///
/// 長いセグメントの抽出はフレームごとにこのフラグを確認する。
/// 比較側は短時間で終わるためキャンセル不要。
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// 秒指定をフレーム範囲 `[start_frame, end_frame)` に変換する
///
/// `end_time_s = None` は動画末尾まで。範囲は動画の実フレーム数に
/// クランプし、クランプ後に空なら `EmptySegment`。
pub fn compute_frame_range(
    start_time_s: f64,
    end_time_s: Option<f64>,
    fps: f64,
    total_frames: u64,
) -> Result<(u64, u64)> {
    let start_frame = ((start_time_s * fps).round().max(0.0) as u64).min(total_frames);
    let end_frame = match end_time_s {
        Some(end) => ((end * fps).round().max(0.0) as u64).min(total_frames),
        None => total_frames,
    };

    if start_frame >= end_frame {
        return Err(Error::EmptySegment {
            start_frame,
            end_frame,
        });
    }

    Ok((start_frame, end_frame))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_range_from_seconds() {
        // 30fps: 1.0s..3.0s -> frames 30..90, 60 frames decoded
        let (start, end) = compute_frame_range(1.0, Some(3.0), 30.0, 300).unwrap();
        assert_eq!((start, end), (30, 90));
        assert_eq!(end - start, 60);
    }

    #[test]
    fn test_frame_range_rounds_to_nearest() {
        // 29.97fps: 1.0s -> 29.97 -> 30
        let (start, end) = compute_frame_range(1.0, Some(2.0), 29.97, 300).unwrap();
        assert_eq!(start, 30);
        assert_eq!(end, 60);
    }

    #[test]
    fn test_frame_range_without_end_runs_to_last_frame() {
        let (start, end) = compute_frame_range(2.0, None, 30.0, 100).unwrap();
        assert_eq!((start, end), (60, 100));
    }

    #[test]
    fn test_frame_range_clamps_to_video_bounds() {
        let (start, end) = compute_frame_range(1.0, Some(60.0), 30.0, 100).unwrap();
        assert_eq!((start, end), (30, 100));
    }

    #[test]
    fn test_range_past_video_end_is_empty() {
        match compute_frame_range(10.0, Some(12.0), 30.0, 100) {
            Err(Error::EmptySegment {
                start_frame,
                end_frame,
            }) => {
                assert_eq!(start_frame, 100);
                assert_eq!(end_frame, 100);
            }
            other => panic!("expected EmptySegment, got {:?}", other),
        }
    }

    #[test]
    fn test_zero_length_range_is_empty() {
        assert!(matches!(
            compute_frame_range(1.0, Some(1.0), 30.0, 300),
            Err(Error::EmptySegment { .. })
        ));
    }

    #[test]
    fn test_negative_start_clamps_to_zero() {
        let (start, end) = compute_frame_range(-1.0, Some(1.0), 30.0, 300).unwrap();
        assert_eq!((start, end), (0, 30));
    }

    #[test]
    fn test_cancel_token() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        let shared = token.clone();
        shared.cancel();
        assert!(token.is_cancelled());
    }
}
