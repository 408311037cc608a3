//! モデル学習
//!
//! 状態遷移: 初期化 → {学習エポック → 検証エポック} x N → 保存 → 完了

use std::path::{Path, PathBuf};

use burn::{
    config::Config,
    data::{dataloader::DataLoaderBuilder, dataset::InMemDataset},
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    tensor::{backend::AutodiffBackend, ElementConversion},
};
use tracing::info;

use crate::error::PipelineError;
use crate::ml::data::{load_items, ShapeBatcher};
use crate::ml::dataset::SampleIndex;
use crate::ml::device::DeviceTier;
use crate::ml::ml_model::{argmax_labels, target_labels, ShapeClassifier};
use crate::model::{model_storage, save_metadata, save_model, ModelMetadata};

/// 学習設定
#[derive(Config, Debug)]
pub struct TrainingConfig {
    /// エポック数
    #[config(default = 10)]
    pub num_epochs: usize,
    /// ミニバッチサイズ（学習・検証共通）
    #[config(default = 32)]
    pub batch_size: usize,
    /// Adam の学習率
    #[config(default = 1e-3)]
    pub learning_rate: f64,
    /// 学習用に回すサンプルの割合（残りは検証用）
    #[config(default = 0.8)]
    pub train_ratio: f64,
    /// DataLoader のワーカー数（0 は呼び出しスレッドで読み込む）
    #[config(default = 0)]
    pub num_workers: usize,
    /// 分割・シャッフル用シード（None なら実行ごとにランダム）
    #[config(default = "None")]
    pub seed: Option<u64>,
}

impl TrainingConfig {
    fn validate(&self) -> crate::error::Result<()> {
        if self.num_epochs == 0 {
            return Err(PipelineError::InvalidConfig {
                field: "num_epochs",
                reason: "1以上を指定してください".to_string(),
            });
        }
        if self.batch_size == 0 {
            return Err(PipelineError::InvalidConfig {
                field: "batch_size",
                reason: "1以上を指定してください".to_string(),
            });
        }
        if !(self.train_ratio > 0.0 && self.train_ratio < 1.0) {
            return Err(PipelineError::InvalidConfig {
                field: "train_ratio",
                reason: format!("0 と 1 の間を指定してください ({})", self.train_ratio),
            });
        }
        if !(self.learning_rate > 0.0) {
            return Err(PipelineError::InvalidConfig {
                field: "learning_rate",
                reason: format!("正の値を指定してください ({})", self.learning_rate),
            });
        }
        Ok(())
    }
}

/// 1エポック分の結果
#[derive(Debug, Clone, PartialEq)]
pub struct EpochReport {
    /// 1始まりのエポック番号
    pub epoch: usize,
    pub num_epochs: usize,
    /// running_loss / ミニバッチ数
    pub mean_loss: f64,
    /// 検証精度（%）
    pub valid_accuracy: f64,
    pub valid_correct: usize,
    pub valid_total: usize,
}

impl std::fmt::Display for EpochReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Epoch [{}/{}], Loss: {:.4}, Val Acc: {:.2}%",
            self.epoch, self.num_epochs, self.mean_loss, self.valid_accuracy
        )
    }
}

/// 学習結果
#[derive(Debug, Clone)]
pub struct TrainingSummary {
    pub epochs: Vec<EpochReport>,
    /// 書き出したモデルファイル
    pub artifact_path: PathBuf,
    /// 実際に使用したシード
    pub seed: u64,
    pub train_samples: usize,
    pub valid_samples: usize,
}

impl TrainingSummary {
    /// 最終エポックの検証精度
    pub fn final_valid_accuracy(&self) -> f64 {
        self.epochs.last().map(|e| e.valid_accuracy).unwrap_or(0.0)
    }
}

/// 精度（%）。対象が0件の場合は 0 を返す
pub fn accuracy_percent(correct: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        100.0 * correct as f64 / total as f64
    }
}

/// 平均損失。ミニバッチが0件の場合は 0 を返す
pub fn mean_loss(running_loss: f64, num_batches: usize) -> f64 {
    if num_batches == 0 {
        0.0
    } else {
        running_loss / num_batches as f64
    }
}

/// モデル学習を実行（エポックごとの結果を標準出力へ表示）
pub fn train<B: AutodiffBackend>(
    index: &SampleIndex,
    config: &TrainingConfig,
    device: B::Device,
    tier: DeviceTier,
    artifact_path: &Path,
) -> crate::error::Result<TrainingSummary> {
    train_with_progress::<B, _>(index, config, device, tier, artifact_path, |report| {
        println!("{}", report)
    })
}

/// モデル学習を実行
///
/// 学習データのディレクトリが存在しない場合は `Configuration`、
/// 存在するがサンプルが1枚もない場合は `EmptyDataset` を返す（どちらもエポックを回す前）。
/// `tier` はメタデータに記録するデバイス段。
pub fn train_with_progress<B, F>(
    index: &SampleIndex,
    config: &TrainingConfig,
    device: B::Device,
    tier: DeviceTier,
    artifact_path: &Path,
    mut on_epoch: F,
) -> crate::error::Result<TrainingSummary>
where
    B: AutodiffBackend,
    F: FnMut(&EpochReport),
{
    config.validate()?;
    // 保存先の拡張子は学習前に確認する
    model_storage::artifact_path(artifact_path)?;

    if !index.root().is_dir() {
        return Err(PipelineError::configuration(
            index.root(),
            "学習データのディレクトリが存在しません",
        ));
    }
    if index.is_empty() {
        return Err(PipelineError::EmptyDataset {
            root: index.root().to_path_buf(),
        });
    }

    let seed = config.seed.unwrap_or_else(rand::random);
    let (split_train, split_valid) = index.split(config.train_ratio, seed);

    // 画像は最初に一度だけデコードする（壊れた画像があればここで中断）
    let items_train = load_items(&split_train)?;
    let items_valid = load_items(&split_valid)?;
    let train_samples = items_train.len();
    let valid_samples = items_valid.len();

    info!(
        "学習データ: {} 枚, 検証データ: {} 枚 (seed={})",
        train_samples, valid_samples, seed
    );
    info!(
        "エポック数: {}, バッチサイズ: {}, 学習率: {}",
        config.num_epochs, config.batch_size, config.learning_rate
    );
    info!("使用デバイス: {} ({:?})", tier, device);

    let batcher_train = ShapeBatcher::<B>::new(device.clone());
    let batcher_valid = ShapeBatcher::<B::InnerBackend>::new(device.clone());

    // 学習用は毎エポックシャッフル、検証用は固定順
    let mut builder_train = DataLoaderBuilder::new(batcher_train)
        .batch_size(config.batch_size)
        .shuffle(seed);
    let mut builder_valid = DataLoaderBuilder::new(batcher_valid).batch_size(config.batch_size);
    if config.num_workers > 0 {
        builder_train = builder_train.num_workers(config.num_workers);
        builder_valid = builder_valid.num_workers(config.num_workers);
    }
    let dataloader_train = builder_train.build(InMemDataset::new(items_train));
    let dataloader_valid = builder_valid.build(InMemDataset::new(items_valid));

    let mut model = ShapeClassifier::<B>::new(&device);
    let mut optimizer = AdamConfig::new().init::<B, ShapeClassifier<B>>();
    let mut epochs = Vec::with_capacity(config.num_epochs);

    for epoch in 1..=config.num_epochs {
        // 学習
        let mut running_loss = 0.0;
        let mut num_batches = 0usize;

        for batch in dataloader_train.iter() {
            let output = model.forward_classification(batch.images, batch.targets);
            running_loss += output.loss.clone().into_scalar().elem::<f64>();
            num_batches += 1;

            let grads = GradientsParams::from_grads(output.loss.backward(), &model);
            model = optimizer.step(config.learning_rate, model, grads);
        }

        // 検証（勾配なし）
        let model_valid = model.valid();
        let mut valid_correct = 0usize;
        let mut valid_total = 0usize;

        for batch in dataloader_valid.iter() {
            let predicted = argmax_labels(model_valid.forward(batch.images));
            let expected = target_labels(batch.targets);

            valid_total += expected.len();
            valid_correct += predicted
                .iter()
                .zip(expected.iter())
                .filter(|(p, e)| p == e)
                .count();
        }

        let report = EpochReport {
            epoch,
            num_epochs: config.num_epochs,
            mean_loss: mean_loss(running_loss, num_batches),
            valid_accuracy: accuracy_percent(valid_correct, valid_total),
            valid_correct,
            valid_total,
        };
        on_epoch(&report);
        epochs.push(report);
    }

    // 保存
    let final_valid_accuracy = epochs.last().map(|e| e.valid_accuracy).unwrap_or(0.0);
    let artifact = save_model(model, artifact_path)?;
    let metadata = ModelMetadata::new(
        config.num_epochs as u32,
        config.batch_size as u32,
        config.learning_rate,
        seed,
        train_samples as u32,
        valid_samples as u32,
        final_valid_accuracy,
        tier.to_string(),
    );
    save_metadata(&artifact, &metadata)?;

    info!("学習完了: モデルを {} に保存しました", artifact.display());

    Ok(TrainingSummary {
        epochs,
        artifact_path: artifact,
        seed,
        train_samples,
        valid_samples,
    })
}
