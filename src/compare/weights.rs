//! 関節重みと部位グループの静的テーブル
//!
//! 重み付け・グループ分けのポリシーはここに集約する。
//! 散在リテラルにしないこと (単体で監査・テストできるように)。

/// 可視性の下限。両側がこれを超えたランドマークだけ採点対象
pub const VISIBILITY_THRESHOLD: f64 = 0.5;

/// 距離→類似度の感度係数
///
/// 正規化座標で距離 0.5 が類似度 0 に写る。経験的に調整された値で、
/// 既存の比較結果との互換性のため変更しない。
pub const DISTANCE_SCALE: f64 = 2.0;

/// 部位スコアの不足判定。これを下回るグループには個別の指摘を付ける
pub const FEEDBACK_THRESHOLD: f64 = 0.6;

/// 関節ごとの重要度重み
///
/// 主要関節 (肩・腰) 1.5、肘・膝 1.3、手首・足首 1.1、それ以外 1.0。
pub fn joint_weight(index: usize) -> f64 {
    match index {
        11 | 12 => 1.5, // shoulders
        13 | 14 => 1.3, // elbows
        15 | 16 => 1.1, // wrists
        23 | 24 => 1.5, // hips
        25 | 26 => 1.3, // knees
        27 | 28 => 1.1, // ankles
        _ => 1.0,
    }
}

/// 部位グループ (インデックスは一部共有: 肩は arms と torso の両方)
pub const BODY_PARTS: &[(&str, &[usize])] = &[
    ("head", &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10]),
    ("arms", &[11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22]),
    ("torso", &[11, 12, 23, 24]),
    ("legs", &[23, 24, 25, 26, 27, 28, 29, 30, 31, 32]),
];
