//! モデルメタデータの定義
//!
//! モデルファイル（重みのみ）の隣に JSON で保存する学習時の情報です。
//! 推論には必須ではありません。

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::ml::ml_model::CLASS_NAMES;
use crate::ml::transform::IMAGE_SIZE;

/// モデルメタデータ
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// クラスラベル（クラスID順）
    pub class_labels: Vec<String>,

    /// モデル入力サイズ（正方形）
    pub image_size: u32,

    /// 学習エポック数
    pub num_epochs: u32,

    /// バッチサイズ
    pub batch_size: u32,

    /// 学習率
    pub learning_rate: f64,

    /// 分割・シャッフルに使用したシード
    pub seed: u64,

    /// 学習用サンプル数
    pub train_samples: u32,

    /// 検証用サンプル数
    pub valid_samples: u32,

    /// 最終エポックの検証精度（%）
    pub final_valid_accuracy: f64,

    /// 学習に使用したデバイス
    pub device: String,

    /// モデルの学習時刻（ISO8601形式）
    pub trained_at: String,
}

impl ModelMetadata {
    /// 新しいメタデータを作成（学習時刻は現在時刻）
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        num_epochs: u32,
        batch_size: u32,
        learning_rate: f64,
        seed: u64,
        train_samples: u32,
        valid_samples: u32,
        final_valid_accuracy: f64,
        device: String,
    ) -> Self {
        let trained_at = chrono::Local::now().to_rfc3339();

        Self {
            class_labels: CLASS_NAMES.iter().map(|name| name.to_string()).collect(),
            image_size: IMAGE_SIZE as u32,
            num_epochs,
            batch_size,
            learning_rate,
            seed,
            train_samples,
            valid_samples,
            final_valid_accuracy,
            device,
            trained_at,
        }
    }

    /// メタデータをJSON文字列に変換
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// JSON文字列からメタデータを生成
    pub fn from_json_string(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// 現在のモデル構成と互換性があるか
    pub fn is_compatible(&self) -> bool {
        self.image_size as usize == IMAGE_SIZE
            && self.class_labels.iter().map(String::as_str).eq(CLASS_NAMES)
    }
}
