//! モデルの永続化
//!
//! モデルファイルには重みだけを保存します（構成はコード側で固定）。
//! 読み込み時は固定構成のモデルを作ってから重みを割り当てます。
//!
//! ファイル構成:
//! - model.mpk  - モデルの重み（NamedMpk, f32精度）
//! - model.json - メタデータ（任意）

use std::path::{Path, PathBuf};

use burn::{
    module::Module,
    record::{DefaultFileRecorder, FullPrecisionSettings},
    tensor::backend::Backend,
};

use crate::error::{PipelineError, Result};
use crate::ml::ml_model::ShapeClassifier;
use crate::model::model_metadata::ModelMetadata;

/// モデルファイルの拡張子（レコーダーが付与する）
pub const MODEL_EXTENSION: &str = "mpk";

/// DefaultFileRecorderを使用してf32精度で保存（CompactRecorderはf16で保存してしまう）
fn recorder() -> DefaultFileRecorder<FullPrecisionSettings> {
    DefaultFileRecorder::<FullPrecisionSettings>::new()
}

/// レコーダーが実際に読み書きするファイルパス
///
/// 拡張子なしの場合は `.mpk` を付ける。`.mpk` 以外の拡張子は `Configuration` を返す。
pub fn artifact_path(path: &Path) -> Result<PathBuf> {
    match path.extension() {
        None => Ok(path.with_extension(MODEL_EXTENSION)),
        Some(ext) if ext == MODEL_EXTENSION => Ok(path.to_path_buf()),
        Some(ext) => Err(PipelineError::configuration(
            path,
            format!(
                "モデルファイルの拡張子は .{} である必要があります (指定: .{})",
                MODEL_EXTENSION,
                ext.to_string_lossy()
            ),
        )),
    }
}

/// メタデータのファイルパス
pub fn metadata_path(path: &Path) -> PathBuf {
    path.with_extension("json")
}

/// モデルの重みを保存
///
/// # 戻り値
/// - 書き出したファイルのパス
pub fn save_model<B: Backend>(model: ShapeClassifier<B>, path: &Path) -> Result<PathBuf> {
    let file = artifact_path(path)?;
    if let Some(parent) = file.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    model
        .save_file(file.as_path(), &recorder())
        .map_err(|e| PipelineError::Record(format!("{:?}", e)))?;

    Ok(file)
}

/// 固定構成のモデルを作成して重みを読み込む
pub fn load_model<B: Backend>(path: &Path, device: &B::Device) -> Result<ShapeClassifier<B>> {
    let file = artifact_path(path)?;
    if !file.is_file() {
        return Err(PipelineError::configuration(
            &file,
            "モデルファイルが存在しません",
        ));
    }

    ShapeClassifier::new(device)
        .load_file(file, &recorder(), device)
        .map_err(|e| PipelineError::Record(format!("{:?}", e)))
}

/// メタデータを保存
pub fn save_metadata(path: &Path, metadata: &ModelMetadata) -> Result<PathBuf> {
    let json_path = metadata_path(path);
    std::fs::write(&json_path, metadata.to_json_string()?)?;
    Ok(json_path)
}

/// メタデータを読み込む（存在しない場合は None）
pub fn load_metadata(path: &Path) -> Result<Option<ModelMetadata>> {
    let json_path = metadata_path(path);
    if !json_path.is_file() {
        return Ok(None);
    }

    let json = std::fs::read_to_string(&json_path)?;
    Ok(Some(ModelMetadata::from_json_string(&json)?))
}

/// メタデータをコンソールに表示
pub fn print_metadata_info(metadata: &ModelMetadata) {
    println!("\n=== モデルメタデータ ===");
    println!("クラス: {}", metadata.class_labels.join(", "));
    println!("モデル入力サイズ: {}x{}", metadata.image_size, metadata.image_size);
    println!("学習エポック数: {}", metadata.num_epochs);
    println!("バッチサイズ: {}, 学習率: {}", metadata.batch_size, metadata.learning_rate);
    println!(
        "学習/検証データ: {} / {} 枚",
        metadata.train_samples, metadata.valid_samples
    );
    println!("最終検証精度: {:.2}%", metadata.final_valid_accuracy);
    println!("デバイス: {}", metadata.device);
    println!("学習日時: {}", metadata.trained_at);
    println!("========================");
}
