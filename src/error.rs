//! パイプライン共通のエラー定義

use std::path::{Path, PathBuf};

use crate::ml::device::DeviceTier;

/// 学習・推論パイプラインのエラー
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// 入力ディレクトリやモデルファイルが存在しない、または不正
    #[error("{reason}: {}", path.display())]
    Configuration { path: PathBuf, reason: String },

    /// ハイパーパラメータが不正
    #[error("設定値 '{field}' が不正です: {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    /// サンプルが1枚もない（ディレクトリ自体は存在してもよい）
    #[error("学習データが見つかりません: {} (先に generate を実行してください)", root.display())]
    EmptyDataset { root: PathBuf },

    /// 画像としてデコードできない
    #[error("画像の読み込みに失敗しました: {}: {source}", path.display())]
    ImageDecode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// 画像の書き出しに失敗
    #[error("画像の保存に失敗しました: {}: {source}", path.display())]
    ImageEncode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// 要求したアクセラレータが存在しない（フォールバックで回復される）
    #[error("デバイスが利用できません: {tier}")]
    DeviceUnavailable { tier: DeviceTier },

    /// モデル重みの保存・読み込みエラー
    #[error("モデル重みの読み書きエラー: {0}")]
    Record(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl PipelineError {
    pub fn configuration(path: impl AsRef<Path>, reason: impl Into<String>) -> Self {
        Self::Configuration {
            path: path.as_ref().to_path_buf(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
