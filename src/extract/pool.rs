//! Bounded worker pool for extracting a backlog of segments.
//!
//! Each worker owns its own decoder handle and detector, so there is no
//! shared mutable state across concurrent extractions. Finished sequences
//! are saved through the store; one failed job never aborts the backlog.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{mpsc, Mutex};
use std::thread;

use super::{CancelToken, SequenceExtractor};
use crate::error::{Error, Result};
use crate::pose::{PoseEstimator, VideoSegmentRef};
use crate::store::{SequenceHandle, SequenceStore};

/// 1セグメント分の抽出ジョブ
#[derive(Debug, Clone)]
pub struct ExtractJob {
    pub video_path: PathBuf,
    pub segment: VideoSegmentRef,
}

/// ジョブごとの結果 (成功ならストアのハンドル)
#[derive(Debug)]
pub struct JobOutcome {
    pub video_id: u64,
    pub segment_id: u64,
    pub result: Result<SequenceHandle>,
}

/// バックログを固定数のワーカースレッドで処理する
///
/// `make_detector` はワーカーごとに1回呼ばれる (検出器はスレッド間で
/// 共有しない)。キャンセル後に残っていたジョブは `Cancelled` で返る。
pub fn run_backlog<D, F>(
    jobs: Vec<ExtractJob>,
    workers: usize,
    make_detector: F,
    store: &SequenceStore,
    cancel: &CancelToken,
) -> Vec<JobOutcome>
where
    D: PoseEstimator,
    F: Fn() -> anyhow::Result<D> + Sync,
{
    if jobs.is_empty() {
        return Vec::new();
    }

    let workers = workers.clamp(1, jobs.len());
    let queue = Mutex::new(VecDeque::from(jobs));
    let (tx, rx) = mpsc::channel::<JobOutcome>();

    thread::scope(|scope| {
        for _ in 0..workers {
            let tx = tx.clone();
            let queue = &queue;
            let make_detector = &make_detector;
            scope.spawn(move || {
                let mut extractor = match make_detector() {
                    Ok(detector) => Some(SequenceExtractor::new(detector)),
                    Err(e) => {
                        // 検出器が作れないワーカーは残りのジョブを失敗として流す
                        report_detector_failure(queue, &tx, e);
                        None
                    }
                };
                let Some(extractor) = extractor.as_mut() else {
                    return;
                };

                loop {
                    let job = {
                        let mut q = queue.lock().expect("job queue poisoned");
                        q.pop_front()
                    };
                    let Some(job) = job else { break };

                    let result = if cancel.is_cancelled() {
                        Err(Error::Cancelled)
                    } else {
                        extractor
                            .extract(&job.video_path, &job.segment, cancel)
                            .and_then(|sequence| store.save(&sequence))
                    };

                    let outcome = JobOutcome {
                        video_id: job.segment.video_id,
                        segment_id: job.segment.segment_id,
                        result,
                    };
                    if tx.send(outcome).is_err() {
                        break;
                    }
                }
            });
        }
        drop(tx);
    });

    let mut outcomes: Vec<JobOutcome> = rx.into_iter().collect();

    // 全ワーカーが検出器の初期化に失敗した場合のみキューが残る
    let leftover = queue.into_inner().expect("job queue poisoned");
    for job in leftover {
        outcomes.push(JobOutcome {
            video_id: job.segment.video_id,
            segment_id: job.segment.segment_id,
            result: Err(Error::Detector(anyhow::anyhow!(
                "no worker available for this job"
            ))),
        });
    }

    outcomes
}

fn report_detector_failure(
    queue: &Mutex<VecDeque<ExtractJob>>,
    tx: &mpsc::Sender<JobOutcome>,
    error: anyhow::Error,
) {
    // エラー原因は最初のジョブにだけ添付し、残りは他ワーカーに任せる
    let job = {
        let mut q = queue.lock().expect("job queue poisoned");
        q.pop_front()
    };
    if let Some(job) = job {
        let _ = tx.send(JobOutcome {
            video_id: job.segment.video_id,
            segment_id: job.segment.segment_id,
            result: Err(Error::Detector(error)),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::Landmark;
    use opencv::core::Mat;

    /// 動画が開けない経路では推論は走らない
    struct NeverCalled;

    impl PoseEstimator for NeverCalled {
        fn detect(&mut self, _frame: &Mat) -> anyhow::Result<Option<Vec<Landmark>>> {
            unreachable!("detector must not run when the video cannot be opened")
        }
    }

    fn job(segment_id: u64) -> ExtractJob {
        ExtractJob {
            video_path: PathBuf::from("/nonexistent/video.mp4"),
            segment: VideoSegmentRef {
                video_id: 1,
                segment_id,
                exercise_id: 0,
                start_time_s: 0.0,
                end_time_s: Some(1.0),
            },
        }
    }

    #[test]
    fn test_every_job_reports_an_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let store = SequenceStore::new(dir.path()).unwrap();
        let cancel = CancelToken::new();

        let jobs: Vec<_> = (0..5).map(job).collect();
        let outcomes = run_backlog(jobs, 3, || Ok(NeverCalled), &store, &cancel);

        assert_eq!(outcomes.len(), 5);
        for outcome in &outcomes {
            assert!(matches!(outcome.result, Err(Error::VideoOpen { .. })));
        }
    }

    #[test]
    fn test_detector_init_failure_still_reports_every_job() {
        let dir = tempfile::tempdir().unwrap();
        let store = SequenceStore::new(dir.path()).unwrap();
        let cancel = CancelToken::new();

        let jobs: Vec<_> = (0..4).map(job).collect();
        let outcomes = run_backlog::<NeverCalled, _>(
            jobs,
            2,
            || anyhow::bail!("model file missing"),
            &store,
            &cancel,
        );

        assert_eq!(outcomes.len(), 4);
        for outcome in &outcomes {
            assert!(matches!(outcome.result, Err(Error::Detector(_))));
        }
    }

    #[test]
    fn test_cancelled_backlog_marks_remaining_jobs_cancelled() {
        let dir = tempfile::tempdir().unwrap();
        let store = SequenceStore::new(dir.path()).unwrap();
        let cancel = CancelToken::new();
        cancel.cancel();

        let jobs: Vec<_> = (0..3).map(job).collect();
        let outcomes = run_backlog(jobs, 2, || Ok(NeverCalled), &store, &cancel);

        assert_eq!(outcomes.len(), 3);
        for outcome in &outcomes {
            assert!(matches!(outcome.result, Err(Error::Cancelled)));
        }
    }

    #[test]
    fn test_empty_backlog_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let store = SequenceStore::new(dir.path()).unwrap();
        let cancel = CancelToken::new();

        let outcomes = run_backlog(Vec::new(), 2, || Ok(NeverCalled), &store, &cancel);
        assert!(outcomes.is_empty());
    }
}
