pub mod weights;

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::pose::{KeypointSequence, Landmark, LiveSample, PoseFrame};
use weights::{joint_weight, BODY_PARTS, DISTANCE_SCALE, FEEDBACK_THRESHOLD, VISIBILITY_THRESHOLD};

/// 比較結果 (リクエストごとに計算。キャッシュしない)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonResult {
    /// 全体類似度 (0.0〜1.0)
    pub similarity_score: f64,
    /// 部位ごとのサブスコア (0.0〜1.0)
    pub body_part_scores: BTreeMap<String, f64>,
    pub feedback: String,
}

impl ComparisonResult {
    /// 姿勢未検出の縮退ケース。エラーではなく有効な結果
    fn no_pose() -> Self {
        Self {
            similarity_score: 0.0,
            body_part_scores: BTreeMap::new(),
            feedback: "No pose detected".to_string(),
        }
    }
}

/// リファレンスシーケンスとライブサンプルを比較する
///
/// 最近傍フレームを選び、重み付き類似度・部位サブスコア・
/// フィードバック文を生成する。純粋・同期・I/Oなし。
pub fn compare(reference: &KeypointSequence, live: &LiveSample) -> Result<ComparisonResult> {
    let frame = match nearest_frame(&reference.frames, live.timestamp_s) {
        Some(frame) => frame,
        None => return Ok(ComparisonResult::no_pose()),
    };

    // 縮退ケースの判定はスキーマ検査より先 (空サンプルは不一致ではない)
    if !frame.pose_detected || live.landmarks.is_empty() {
        return Ok(ComparisonResult::no_pose());
    }

    if frame.landmarks.len() != live.landmarks.len() {
        return Err(Error::SchemaMismatch {
            reference: frame.landmarks.len(),
            live: live.landmarks.len(),
        });
    }

    let similarity_score = overall_score(&frame.landmarks, &live.landmarks);
    let body_part_scores = body_part_scores(&frame.landmarks, &live.landmarks);
    let feedback = generate_feedback(similarity_score, &body_part_scores);

    Ok(ComparisonResult {
        similarity_score,
        body_part_scores,
        feedback,
    })
}

/// タイムスタンプ差が最小のフレームを選ぶ。同差なら先のフレーム
fn nearest_frame(frames: &[PoseFrame], timestamp_s: f64) -> Option<&PoseFrame> {
    let mut best: Option<&PoseFrame> = None;
    let mut min_diff = f64::INFINITY;
    for frame in frames {
        let diff = (frame.timestamp_s - timestamp_s).abs();
        if diff < min_diff {
            min_diff = diff;
            best = Some(frame);
        }
    }
    best
}

/// 両側の可視性が閾値を超えているか
fn qualifies(reference: &Landmark, live: &Landmark) -> bool {
    reference.is_visible(VISIBILITY_THRESHOLD) && live.is_visible(VISIBILITY_THRESHOLD)
}

/// 平面ユークリッド距離から類似度へ (z と可視性は距離に使わない)
fn landmark_similarity(reference: &Landmark, live: &Landmark) -> f64 {
    let dx = reference.x - live.x;
    let dy = reference.y - live.y;
    let distance = (dx * dx + dy * dy).sqrt();
    (1.0 - distance * DISTANCE_SCALE).max(0.0)
}

/// 採点対象インデックスの重み付き平均。対象なしなら 0.0
fn overall_score(reference: &[Landmark], live: &[Landmark]) -> f64 {
    let mut total = 0.0;
    let mut weight_sum = 0.0;

    for (i, (r, l)) in reference.iter().zip(live.iter()).enumerate() {
        if qualifies(r, l) {
            let weight = joint_weight(i);
            total += landmark_similarity(r, l) * weight;
            weight_sum += weight;
        }
    }

    if weight_sum > 0.0 {
        total / weight_sum
    } else {
        0.0
    }
}

/// 部位ごとの単純平均 (グループ内では全インデックス等重み)
///
/// 採点対象が1つもないグループは 0.0 (致命的ではない)。
fn body_part_scores(reference: &[Landmark], live: &[Landmark]) -> BTreeMap<String, f64> {
    let mut scores = BTreeMap::new();

    for (part_name, indices) in BODY_PARTS {
        let mut total = 0.0;
        let mut count = 0usize;

        for &idx in *indices {
            if idx >= reference.len() || idx >= live.len() {
                continue;
            }
            let (r, l) = (&reference[idx], &live[idx]);
            if qualifies(r, l) {
                total += landmark_similarity(r, l);
                count += 1;
            }
        }

        let score = if count > 0 { total / count as f64 } else { 0.0 };
        scores.insert((*part_name).to_string(), score);
    }

    scores
}

/// スコア帯ごとの定型文 + 不足部位ごとの指摘
fn generate_feedback(overall_score: f64, body_part_scores: &BTreeMap<String, f64>) -> String {
    let mut feedback = if overall_score >= 0.9 {
        "Excellent form! Keep it up!".to_string()
    } else if overall_score >= 0.8 {
        "Great job! Your form is very good.".to_string()
    } else if overall_score >= 0.7 {
        "Good form overall.".to_string()
    } else if overall_score >= 0.6 {
        "Your form needs some improvement.".to_string()
    } else {
        "Focus on improving your form.".to_string()
    };

    let mut suggestions = Vec::new();
    for (part, score) in body_part_scores {
        if *score < FEEDBACK_THRESHOLD {
            match part.as_str() {
                "head" => suggestions.push("Keep your head position steady"),
                "arms" => suggestions.push("Pay attention to your arm positioning"),
                "torso" => suggestions.push("Keep your torso aligned"),
                "legs" => suggestions.push("Check your leg alignment"),
                _ => {}
            }
        }
    }

    if !suggestions.is_empty() {
        feedback.push(' ');
        feedback.push_str(&suggestions.join(". "));
        feedback.push('.');
    }

    feedback
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::LandmarkIndex;

    fn lm(x: f64, y: f64) -> Landmark {
        Landmark::new(x, y, 0.0, 1.0)
    }

    /// 全ランドマーク同一座標・可視性1.0の基準ポーズ
    fn uniform_pose(x: f64, y: f64) -> Vec<Landmark> {
        vec![lm(x, y); LandmarkIndex::COUNT]
    }

    fn sequence(frames: Vec<PoseFrame>) -> KeypointSequence {
        KeypointSequence {
            video_id: 1,
            segment_id: 1,
            frames,
        }
    }

    fn detected_frame(timestamp_s: f64, landmarks: Vec<Landmark>) -> PoseFrame {
        PoseFrame::detected((timestamp_s * 30.0).round() as u64, timestamp_s, landmarks)
    }

    fn approx_eq(a: f64, b: f64, eps: f64) -> bool {
        (a - b).abs() < eps
    }

    #[test]
    fn test_nearest_frame_selection() {
        let frames = vec![
            detected_frame(0.0, uniform_pose(0.1, 0.1)),
            detected_frame(0.5, uniform_pose(0.2, 0.2)),
            detected_frame(1.0, uniform_pose(0.3, 0.3)),
        ];
        let frame = nearest_frame(&frames, 0.4).unwrap();
        assert_eq!(frame.timestamp_s, 0.5);
    }

    #[test]
    fn test_nearest_frame_tie_breaks_to_first() {
        let frames = vec![
            detected_frame(0.0, uniform_pose(0.1, 0.1)),
            detected_frame(1.0, uniform_pose(0.2, 0.2)),
        ];
        // 0.5 is equidistant; first occurrence wins
        let frame = nearest_frame(&frames, 0.5).unwrap();
        assert_eq!(frame.timestamp_s, 0.0);
    }

    #[test]
    fn test_identical_poses_score_one() {
        let reference = sequence(vec![detected_frame(0.0, uniform_pose(0.5, 0.5))]);
        let live = LiveSample {
            timestamp_s: 0.0,
            landmarks: uniform_pose(0.5, 0.5),
        };
        let result = compare(&reference, &live).unwrap();
        assert!(approx_eq(result.similarity_score, 1.0, 1e-9));
        for (_, score) in &result.body_part_scores {
            assert!(approx_eq(*score, 1.0, 1e-9));
        }
        assert_eq!(result.feedback, "Excellent form! Keep it up!");
    }

    #[test]
    fn test_empty_live_sample_is_degenerate_not_mismatch() {
        let reference = sequence(vec![detected_frame(0.0, uniform_pose(0.5, 0.5))]);
        let live = LiveSample {
            timestamp_s: 0.0,
            landmarks: Vec::new(),
        };
        let result = compare(&reference, &live).unwrap();
        assert_eq!(result.similarity_score, 0.0);
        assert!(result.body_part_scores.is_empty());
        assert!(!result.feedback.is_empty());
    }

    #[test]
    fn test_undetected_reference_frame_is_degenerate() {
        let reference = sequence(vec![PoseFrame::empty(0, 0.0)]);
        let live = LiveSample {
            timestamp_s: 0.0,
            landmarks: uniform_pose(0.5, 0.5),
        };
        let result = compare(&reference, &live).unwrap();
        assert_eq!(result.similarity_score, 0.0);
        assert!(result.body_part_scores.is_empty());
    }

    #[test]
    fn test_empty_sequence_is_degenerate() {
        let reference = sequence(Vec::new());
        let live = LiveSample {
            timestamp_s: 0.0,
            landmarks: uniform_pose(0.5, 0.5),
        };
        let result = compare(&reference, &live).unwrap();
        assert_eq!(result.similarity_score, 0.0);
    }

    #[test]
    fn test_landmark_count_mismatch_is_schema_error() {
        let reference = sequence(vec![detected_frame(0.0, uniform_pose(0.5, 0.5))]);
        let live = LiveSample {
            timestamp_s: 0.0,
            landmarks: vec![lm(0.5, 0.5); 30],
        };
        match compare(&reference, &live) {
            Err(Error::SchemaMismatch { reference, live }) => {
                assert_eq!(reference, 33);
                assert_eq!(live, 30);
            }
            other => panic!("expected SchemaMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_distance_half_maps_to_zero_similarity() {
        let a = lm(0.2, 0.2);
        let b = lm(0.7, 0.2);
        assert!(approx_eq(landmark_similarity(&a, &b), 0.0, 1e-9));

        let c = lm(0.3, 0.2);
        // distance 0.1 -> similarity 0.8
        assert!(approx_eq(landmark_similarity(&a, &c), 0.8, 1e-9));
    }

    #[test]
    fn test_heavy_joint_shift_scores_lower_than_light_joint_shift() {
        let reference = uniform_pose(0.5, 0.5);

        // same displacement applied to the left shoulder (weight 1.5)...
        let mut shoulder_shift = uniform_pose(0.5, 0.5);
        shoulder_shift[LandmarkIndex::LeftShoulder as usize] = lm(0.7, 0.5);

        // ...and to the nose (weight 1.0)
        let mut nose_shift = uniform_pose(0.5, 0.5);
        nose_shift[LandmarkIndex::Nose as usize] = lm(0.7, 0.5);

        let shoulder_score = overall_score(&reference, &shoulder_shift);
        let nose_score = overall_score(&reference, &nose_shift);
        assert!(shoulder_score < nose_score);
    }

    #[test]
    fn test_all_landmarks_below_visibility_scores_zero() {
        let reference = sequence(vec![detected_frame(
            0.0,
            vec![Landmark::new(0.5, 0.5, 0.0, 0.2); LandmarkIndex::COUNT],
        )]);
        let live = LiveSample {
            timestamp_s: 0.0,
            landmarks: uniform_pose(0.5, 0.5),
        };
        let result = compare(&reference, &live).unwrap();
        assert_eq!(result.similarity_score, 0.0);
    }

    #[test]
    fn test_visibility_exactly_at_threshold_does_not_qualify() {
        let r = Landmark::new(0.5, 0.5, 0.0, 0.5);
        let l = lm(0.5, 0.5);
        assert!(!qualifies(&r, &l));
    }

    #[test]
    fn test_hidden_legs_yield_zero_leg_score_but_positive_others() {
        let mut ref_landmarks = uniform_pose(0.5, 0.5);
        let mut live_landmarks = uniform_pose(0.5, 0.5);
        // legs group is 23..=32; hips (23, 24) are shared with torso,
        // so hide everything from the hips down on the reference side
        for idx in 23..=32 {
            ref_landmarks[idx].visibility = 0.1;
            live_landmarks[idx].visibility = 0.1;
        }

        let reference = sequence(vec![detected_frame(0.0, ref_landmarks)]);
        let live = LiveSample {
            timestamp_s: 0.0,
            landmarks: live_landmarks,
        };
        let result = compare(&reference, &live).unwrap();

        assert_eq!(result.body_part_scores["legs"], 0.0);
        assert!(result.body_part_scores["head"] > 0.0);
        assert!(result.body_part_scores["arms"] > 0.0);
        // torso keeps the shoulders even with the hips hidden
        assert!(result.body_part_scores["torso"] > 0.0);
        assert!(result.feedback.contains("leg alignment"));
    }

    #[test]
    fn test_feedback_bands() {
        let empty = BTreeMap::new();
        assert_eq!(generate_feedback(0.95, &empty), "Excellent form! Keep it up!");
        assert_eq!(
            generate_feedback(0.85, &empty),
            "Great job! Your form is very good."
        );
        assert_eq!(generate_feedback(0.75, &empty), "Good form overall.");
        assert_eq!(
            generate_feedback(0.65, &empty),
            "Your form needs some improvement."
        );
        assert_eq!(
            generate_feedback(0.3, &empty),
            "Focus on improving your form."
        );
    }

    #[test]
    fn test_feedback_names_weak_body_parts() {
        let mut parts = BTreeMap::new();
        parts.insert("arms".to_string(), 0.4);
        parts.insert("head".to_string(), 0.9);
        parts.insert("legs".to_string(), 0.5);
        parts.insert("torso".to_string(), 0.7);

        let feedback = generate_feedback(0.65, &parts);
        assert!(feedback.contains("arm positioning"));
        assert!(feedback.contains("leg alignment"));
        assert!(!feedback.contains("torso aligned"));
        assert!(!feedback.contains("head position"));
    }
}
