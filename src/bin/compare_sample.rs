//! Comparison CLI: load a stored reference sequence, score a live sample
//! against it, and print the result as JSON.
//!
//! Usage: compare_sample <video_id> <segment_id> <live_sample.json>
//!
//! The live sample file holds `{ "timestamp_s": ..., "landmarks": [...] }`
//! in the same landmark schema as the stored sequences.

use anyhow::{bail, Context, Result};

use pose_coach::compare;
use pose_coach::config::Config;
use pose_coach::pose::LiveSample;
use pose_coach::store::{SequenceHandle, SequenceStore};

const CONFIG_PATH: &str = "pose_coach.toml";

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() != 4 {
        eprintln!(
            "Usage: {} <video_id> <segment_id> <live_sample.json>",
            args[0]
        );
        bail!("missing arguments");
    }

    let video_id: u64 = args[1].parse().context("video_id must be an integer")?;
    let segment_id: u64 = args[2].parse().context("segment_id must be an integer")?;

    let sample_json =
        std::fs::read_to_string(&args[3]).context("Failed to read live sample file")?;
    let sample: LiveSample =
        serde_json::from_str(&sample_json).context("Failed to parse live sample")?;

    let config = Config::load_or_default(CONFIG_PATH);
    let store = SequenceStore::new(&config.store.keypoints_dir)?;

    let handle = SequenceHandle::for_segment(video_id, segment_id);
    let reference = store.load(&handle)?;

    let result = compare::compare(&reference, &sample)?;
    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(())
}
