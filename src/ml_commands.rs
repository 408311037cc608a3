//! コマンドの実装（バックエンドの選択と各処理の呼び出し）

use anyhow::{Context, Result};
use burn_autodiff::Autodiff;
use burn_ndarray::NdArray;
#[cfg(feature = "wgpu")]
use burn_wgpu::Wgpu;
use std::path::Path;
use tracing::info;

use crate::ml::dataset::SampleIndex;
use crate::ml::device::ComputeDevice;
use crate::ml::inference::{predict, PredictionSummary};
use crate::ml::training::{train, TrainingSummary};
use crate::model::AppConfig;
use crate::tools::{
    add_test_to_dataset, generate_dataset, organize_test_data, preprocess_directory,
    GenerateSummary, OrganizeSummary, PreprocessSummary,
};

/// 合成データを生成
pub fn generate_command(out_dir: &Path, count: usize, seed: Option<u64>) -> Result<GenerateSummary> {
    generate_dataset(out_dir, count, seed)
        .with_context(|| format!("データ生成に失敗しました: {}", out_dir.display()))
}

/// モデルを学習
///
/// デバイスは起動時に一度だけ選択する。
pub fn train_command(config: &AppConfig, data_dir: &Path, model_path: &Path) -> Result<TrainingSummary> {
    let training_config = config.training.to_training_config();
    let index = SampleIndex::build(data_dir)?;

    let device = ComputeDevice::select(&config.device_type);
    let tier = device.tier();
    info!("計算デバイス: {}", tier);

    let summary = match device {
        #[cfg(feature = "wgpu")]
        ComputeDevice::Wgpu { device, .. } => {
            train::<Autodiff<Wgpu>>(&index, &training_config, device, tier, model_path)
        }
        ComputeDevice::NdArray(device) => {
            train::<Autodiff<NdArray>>(&index, &training_config, device, tier, model_path)
        }
    }
    .context("学習に失敗しました")?;

    println!(
        "\n学習完了: {} (最終検証精度 {:.2}%)",
        summary.artifact_path.display(),
        summary.final_valid_accuracy()
    );

    Ok(summary)
}

/// 評価データを推論
pub fn predict_command(
    config: &AppConfig,
    model_path: &Path,
    data_dir: &Path,
    output_csv: Option<&Path>,
) -> Result<PredictionSummary> {
    let results_dir = &config.paths.results_dir;

    let device = ComputeDevice::select(&config.device_type);
    info!("計算デバイス: {}", device.tier());

    let summary = match device {
        #[cfg(feature = "wgpu")]
        ComputeDevice::Wgpu { device, .. } => {
            predict::<Wgpu>(model_path, data_dir, output_csv, results_dir, device)
        }
        ComputeDevice::NdArray(device) => {
            predict::<NdArray>(model_path, data_dir, output_csv, results_dir, device)
        }
    }
    .context("推論に失敗しました")?;

    Ok(summary)
}

/// 手描きテスト画像を整理
pub fn organize_test_command(source: &Path, dest: &Path) -> Result<OrganizeSummary> {
    organize_test_data(source, dest).context("テストデータの整理に失敗しました")
}

/// 画像を前処理
pub fn preprocess_command(input: &Path, output: &Path) -> Result<PreprocessSummary> {
    preprocess_directory(input, output).context("前処理に失敗しました")
}

/// テスト画像を学習データへ追加
pub fn add_test_command(test_dir: &Path, dataset_dir: &Path) -> Result<PreprocessSummary> {
    add_test_to_dataset(test_dir, dataset_dir).context("学習データへの追加に失敗しました")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use crate::model::DeviceType;

    fn cpu_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.device_type = DeviceType::Cpu;
        config.training.num_epochs = 1;
        config.training.batch_size = 2;
        config.training.seed = Some(3);
        config
    }

    #[test]
    fn test_train_missing_data_dir_names_the_path() {
        let work = tempfile::tempdir().unwrap();
        let missing = work.path().join("no_such_dir");

        let err = train_command(&cpu_config(), &missing, &work.path().join("model.mpk")).unwrap_err();

        match err.downcast_ref::<PipelineError>() {
            Some(PipelineError::Configuration { path, .. }) => assert_eq!(*path, missing),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_train_empty_data_dir_suggests_generate() {
        let work = tempfile::tempdir().unwrap();

        let err = train_command(&cpu_config(), work.path(), &work.path().join("model.mpk")).unwrap_err();

        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::EmptyDataset { .. })
        ));
        assert!(format!("{:#}", err).contains("generate"));
    }
}
