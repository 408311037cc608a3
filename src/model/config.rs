//! アプリケーション設定管理モジュール
//!
//! 計算デバイス・学習設定・データの配置先をJSON形式で保存・読み込みします。

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::ml::training::TrainingConfig;

/// 計算デバイスの種類
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub enum DeviceType {
    /// WGPU (GPU) バックエンド。利用できなければ CPU にフォールバック
    #[default]
    Wgpu,
    /// NdArray (CPU) バックエンド
    Cpu,
}

impl std::fmt::Display for DeviceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceType::Wgpu => write!(f, "WGPU (GPU)"),
            DeviceType::Cpu => write!(f, "CPU (NdArray)"),
        }
    }
}

/// トレーニング設定
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingSettings {
    /// エポック数
    pub num_epochs: usize,
    /// バッチサイズ
    pub batch_size: usize,
    /// ワーカー数（0 の場合は読み込みスレッドを使わない）
    pub num_workers: usize,
    /// 学習率
    pub learning_rate: f64,
    /// ランダムシード（未指定なら実行ごとに変わる）
    pub seed: Option<u64>,
    /// トレーニングデータの割合
    pub train_ratio: f64,
}

impl Default for TrainingSettings {
    fn default() -> Self {
        Self {
            num_epochs: 10,
            batch_size: 32,
            num_workers: 0,
            learning_rate: 1e-3,
            seed: None,
            train_ratio: 0.8,
        }
    }
}

impl TrainingSettings {
    /// 学習器に渡す設定へ変換
    pub fn to_training_config(&self) -> TrainingConfig {
        let mut config = TrainingConfig::new()
            .with_num_epochs(self.num_epochs)
            .with_batch_size(self.batch_size)
            .with_num_workers(self.num_workers)
            .with_learning_rate(self.learning_rate)
            .with_train_ratio(self.train_ratio);
        config.seed = self.seed;
        config
    }
}

/// データとモデルの配置先
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathSettings {
    /// 合成データの出力先（学習データ）
    pub raw_data_dir: PathBuf,
    /// 手描きテストデータの配置先
    pub test_dir: PathBuf,
    /// 前処理済みテストデータの出力先
    pub processed_dir: PathBuf,
    /// 推論結果CSVの自動採番先
    pub results_dir: PathBuf,
    /// モデルファイル
    pub model_path: PathBuf,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            raw_data_dir: PathBuf::from("data/raw"),
            test_dir: PathBuf::from("data/test"),
            processed_dir: PathBuf::from("data/processed"),
            results_dir: PathBuf::from("data/test"),
            model_path: PathBuf::from("model.mpk"),
        }
    }
}

/// アプリケーション設定
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// 計算デバイスの種類
    pub device_type: DeviceType,
    /// トレーニング設定
    pub training: TrainingSettings,
    /// 配置先
    pub paths: PathSettings,
}

impl AppConfig {
    /// 設定ファイルのデフォルトパス
    pub fn default_path() -> PathBuf {
        PathBuf::from("shape_classifier.json")
    }

    /// 設定を読み込む
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// 設定を読み込む、存在しないか壊れている場合はデフォルト設定を返す
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            tracing::debug!("設定ファイルが存在しません。デフォルト設定を使用します");
            return Self::default();
        }

        match Self::load(path) {
            Ok(config) => {
                tracing::info!("設定ファイルを読み込みました: {}", path.display());
                config
            }
            Err(e) => {
                tracing::warn!(
                    "設定ファイルの読み込みに失敗しました ({}): {}。デフォルト設定を使用します",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// 設定を保存する
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// 設定情報を表示
    pub fn display(&self) {
        println!("=== アプリケーション設定 ===");
        println!("計算デバイス: {}", self.device_type);
        println!("\n--- トレーニング設定 ---");
        println!("エポック数: {}", self.training.num_epochs);
        println!("バッチサイズ: {}", self.training.batch_size);
        println!("学習率: {}", self.training.learning_rate);
        match self.training.seed {
            Some(seed) => println!("シード: {}", seed),
            None => println!("シード: (実行ごとにランダム)"),
        }
        println!("\n--- 配置先 ---");
        println!("学習データ: {}", self.paths.raw_data_dir.display());
        println!("テストデータ: {}", self.paths.test_dir.display());
        println!("モデル: {}", self.paths.model_path.display());
        println!("========================\n");
    }
}
