#[cfg(feature = "video")]
pub mod detector;
pub mod landmark;

#[cfg(feature = "video")]
pub use detector::{OnnxPoseDetector, PoseEstimator};
pub use landmark::{
    KeypointSequence, Landmark, LandmarkIndex, LiveSample, PoseFrame, VideoSegmentRef,
};
