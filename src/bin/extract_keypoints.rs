//! Authoring CLI: decode a trainer video segment, extract the keypoint
//! sequence, and save it to the store.
//!
//! Usage: extract_keypoints <video_path> <video_id> <segment_id> <start_s> [end_s]
//!
//! Reads pose_coach.toml for model path, store directory and detection
//! confidence. Logs to logs/extract_<timestamp>.log and stderr.

use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use anyhow::{bail, Context, Result};

use pose_coach::config::Config;
use pose_coach::extract::{CancelToken, SequenceExtractor};
use pose_coach::pose::{OnnxPoseDetector, VideoSegmentRef};
use pose_coach::store::SequenceStore;

const CONFIG_PATH: &str = "pose_coach.toml";

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

type LogFile = Arc<Mutex<std::io::BufWriter<std::fs::File>>>;

fn open_log_file() -> Result<LogFile> {
    std::fs::create_dir_all("logs")?;
    let ts = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let path = format!("logs/extract_{}.log", ts);
    let file = std::fs::File::create(&path)?;
    eprintln!("Log: {}", path);
    Ok(Arc::new(Mutex::new(std::io::BufWriter::new(file))))
}

macro_rules! log {
    ($logfile:expr, $($arg:tt)*) => {{
        let msg = format!($($arg)*);
        eprintln!("{}", msg);
        if let Ok(mut f) = $logfile.lock() {
            let _ = writeln!(f, "{}", msg);
            let _ = f.flush();
        }
    }};
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 5 {
        eprintln!(
            "Usage: {} <video_path> <video_id> <segment_id> <start_s> [end_s]",
            args[0]
        );
        bail!("missing arguments");
    }

    let video_path = Path::new(&args[1]);
    let video_id: u64 = args[2].parse().context("video_id must be an integer")?;
    let segment_id: u64 = args[3].parse().context("segment_id must be an integer")?;
    let start_time_s: f64 = args[4].parse().context("start_s must be a number")?;
    let end_time_s: Option<f64> = match args.get(5) {
        Some(arg) => Some(arg.parse().context("end_s must be a number")?),
        None => None,
    };

    let logfile = open_log_file()?;
    log!(logfile, "Keypoint Extractor ({})", env!("GIT_VERSION"));

    let config = Config::load_or_default(CONFIG_PATH);
    log!(logfile, "Model: {}", config.detector.model_path);
    log!(logfile, "Store: {}", config.store.keypoints_dir);

    let segment = VideoSegmentRef {
        video_id,
        segment_id,
        exercise_id: 0,
        start_time_s,
        end_time_s,
    };

    let detector = OnnxPoseDetector::new(
        &config.detector.model_path,
        config.detector.detection_confidence,
    )?;
    let mut extractor = SequenceExtractor::new(detector);
    let store = SequenceStore::new(&config.store.keypoints_dir)?;
    let cancel = CancelToken::new();

    log!(
        logfile,
        "Extracting video {} segment {} [{:.3}s .. {}]",
        video_id,
        segment_id,
        start_time_s,
        end_time_s.map_or("end".to_string(), |e| format!("{:.3}s", e)),
    );

    let started = Instant::now();
    let sequence = extractor.extract(video_path, &segment, &cancel)?;
    let detected = sequence.frames.iter().filter(|f| f.pose_detected).count();
    log!(
        logfile,
        "Extracted {} frames ({} with pose) in {:.1}s",
        sequence.frames.len(),
        detected,
        started.elapsed().as_secs_f64(),
    );

    let handle = store.save(&sequence)?;
    log!(logfile, "Saved: {}", handle);

    Ok(())
}
