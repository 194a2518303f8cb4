//! File-per-segment sequence store.
//!
//! One JSON blob per `(video_id, segment_id)` key. A save replaces the whole
//! blob; concurrent loads never observe a half-written file (tmp + rename).

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::pose::KeypointSequence;

/// 保存済みシーケンスを指す不透明ハンドル
///
/// 呼び出し側はこれをセグメントのメタデータに記録しておき、
/// 比較時に `load` へ渡す。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SequenceHandle(String);

impl SequenceHandle {
    /// キーからハンドルを導出する
    pub fn for_segment(video_id: u64, segment_id: u64) -> Self {
        Self(format!("video_{}_segment_{}.json", video_id, segment_id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SequenceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// キーポイントシーケンスのファイルストア
pub struct SequenceStore {
    dir: PathBuf,
}

impl SequenceStore {
    /// 保存先ディレクトリを用意して初期化
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        fs::create_dir_all(dir.as_ref())?;
        Ok(Self {
            dir: dir.as_ref().to_path_buf(),
        })
    }

    /// シーケンスを保存してハンドルを返す
    ///
    /// 同一キーの既存ブロブは丸ごと置き換える (マージしない)。
    /// 一時ファイルに書いてから rename するので、並行する load が
    /// 書きかけのブロブを読むことはない。
    pub fn save(&self, sequence: &KeypointSequence) -> Result<SequenceHandle> {
        let handle = SequenceHandle::for_segment(sequence.video_id, sequence.segment_id);
        let path = self.dir.join(handle.as_str());
        let tmp_path = self.dir.join(format!("{}.tmp", handle.as_str()));

        let json = serde_json::to_string_pretty(sequence).map_err(Error::Serialize)?;
        fs::write(&tmp_path, json)?;
        fs::rename(&tmp_path, &path)?;

        Ok(handle)
    }

    /// ハンドルからシーケンスを丸ごと読み込む
    pub fn load(&self, handle: &SequenceHandle) -> Result<KeypointSequence> {
        let path = self.dir.join(handle.as_str());
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::NotFound(handle.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        serde_json::from_str(&content).map_err(|source| Error::CorruptSequence { path, source })
    }

    /// ブロブを削除する。存在しないハンドルの削除はエラーにしない
    pub fn delete(&self, handle: &SequenceHandle) -> Result<()> {
        let path = self.dir.join(handle.as_str());
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
