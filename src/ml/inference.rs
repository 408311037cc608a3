//! モデル推論・評価

use std::io::Write;
use std::path::{Path, PathBuf};

use burn::tensor::{backend::Backend, Tensor};
use tracing::info;

use crate::csv_report::{create_numbered_report, write_records, PredictionRecord};
use crate::error::{PipelineError, Result};
use crate::ml::dataset::{Sample, SampleIndex};
use crate::ml::ml_model::ShapeClassifier;
use crate::ml::training::accuracy_percent;
use crate::ml::transform::{load_normalized, IMAGE_SIZE};
use crate::model::model_storage::artifact_path;
use crate::model::{load_metadata, load_model, print_metadata_info};
use crate::types::Label;

/// 誤分類一覧に表示する最大件数
const MAX_LISTED_MISCLASSIFIED: usize = 10;

/// 推論エンジン
pub struct InferenceEngine<B: Backend> {
    model: ShapeClassifier<B>,
    device: B::Device,
}

impl<B: Backend> InferenceEngine<B> {
    /// モデルを読み込んで推論エンジンを初期化
    ///
    /// メタデータが存在する場合は表示し、入力サイズが異なれば拒否する。
    pub fn load(model_path: &Path, device: B::Device) -> Result<Self> {
        if let Some(metadata) = load_metadata(model_path)? {
            print_metadata_info(&metadata);
            if !metadata.is_compatible() {
                return Err(PipelineError::configuration(
                    model_path,
                    format!(
                        "モデルの入力構成が一致しません (image_size={}, 期待値={})",
                        metadata.image_size, IMAGE_SIZE
                    ),
                ));
            }
        }

        let model = load_model::<B>(model_path, &device)?;
        Ok(Self { model, device })
    }

    /// 正規化済み画素を分類
    pub fn classify_pixels(&self, pixels: &[f32]) -> Label {
        let tensor = Tensor::<B, 1>::from_floats(pixels, &self.device)
            .reshape([1, 1, IMAGE_SIZE, IMAGE_SIZE]);

        self.model
            .predict(tensor)
            .into_iter()
            .next()
            .unwrap_or(Label::Circle)
    }

    /// 単一画像を分類
    pub fn classify_image(&self, image_path: &Path) -> Result<Label> {
        let pixels = load_normalized(image_path)?;
        Ok(self.classify_pixels(&pixels))
    }
}

/// 混同行列 `[正解][予測]`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfusionMatrix(pub [[usize; 2]; 2]);

impl ConfusionMatrix {
    pub fn record(&mut self, true_label: Label, predicted_label: Label) {
        self.0[true_label.index()][predicted_label.index()] += 1;
    }

    pub fn get(&self, true_label: Label, predicted_label: Label) -> usize {
        self.0[true_label.index()][predicted_label.index()]
    }

    /// 全セルの合計
    pub fn total(&self) -> usize {
        self.0.iter().flatten().sum()
    }
}

/// 評価結果の集計
#[derive(Debug, Clone, Default)]
pub struct Evaluation {
    pub records: Vec<PredictionRecord>,
    pub confusion: ConfusionMatrix,
    pub correct: usize,
}

impl Evaluation {
    pub fn push(&mut self, filename: String, true_label: Label, predicted_label: Label) {
        let record = PredictionRecord::new(filename, true_label, predicted_label);
        self.confusion.record(true_label, predicted_label);
        if record.correct {
            self.correct += 1;
        }
        self.records.push(record);
    }

    pub fn total(&self) -> usize {
        self.records.len()
    }

    pub fn accuracy(&self) -> f64 {
        accuracy_percent(self.correct, self.total())
    }

    pub fn misclassified(&self) -> impl Iterator<Item = &PredictionRecord> {
        self.records.iter().filter(|record| !record.correct)
    }
}

/// 推論結果
#[derive(Debug, Clone)]
pub struct PredictionSummary {
    pub accuracy: f64,
    pub total: usize,
    pub correct: usize,
    pub confusion: ConfusionMatrix,
    pub records: Vec<PredictionRecord>,
    /// 書き出したCSV
    pub report_path: PathBuf,
}

/// 評価セットを推論する
///
/// `output_csv` が None の場合は `results_dir` に `results_NNN.csv` を新規作成する。
pub fn predict<B: Backend>(
    artifact: &Path,
    data_dir: &Path,
    output_csv: Option<&Path>,
    results_dir: &Path,
    device: B::Device,
) -> Result<PredictionSummary> {
    if !data_dir.is_dir() {
        return Err(PipelineError::configuration(
            data_dir,
            "評価データのディレクトリが存在しません",
        ));
    }
    let model_file = artifact_path(artifact)?;
    if !model_file.is_file() {
        return Err(PipelineError::configuration(
            &model_file,
            "モデルファイルが存在しません",
        ));
    }

    let engine = InferenceEngine::<B>::load(artifact, device)?;
    let index = SampleIndex::build(data_dir)?;
    info!("評価データ: {} 枚 ({})", index.len(), data_dir.display());

    let evaluation = evaluate(&engine, index.samples())?;

    let report_path = match output_csv {
        Some(path) => {
            write_records(path, &evaluation.records)?;
            path.to_path_buf()
        }
        None => create_numbered_report(results_dir, &evaluation.records)?,
    };

    print_report(&evaluation);
    println!("\n結果を保存しました: {}", report_path.display());

    Ok(PredictionSummary {
        accuracy: evaluation.accuracy(),
        total: evaluation.total(),
        correct: evaluation.correct,
        confusion: evaluation.confusion,
        records: evaluation.records,
        report_path,
    })
}

/// サンプルを順に分類して集計（デコードできない画像があれば中断）
fn evaluate<B: Backend>(engine: &InferenceEngine<B>, samples: &[Sample]) -> Result<Evaluation> {
    let mut evaluation = Evaluation::default();

    for sample in samples {
        let predicted = engine.classify_image(&sample.path)?;
        evaluation.push(sample.file_name(), sample.label, predicted);
    }

    Ok(evaluation)
}

/// 評価結果をコンソールに表示
pub fn print_report(evaluation: &Evaluation) {
    let stdout = std::io::stdout();
    if let Err(e) = write_report(&mut stdout.lock(), evaluation) {
        tracing::warn!("推論結果の表示に失敗しました: {}", e);
    }
}

/// 評価結果を書き出す
///
/// 誤分類は先頭10件まで表示し、残りは件数のみ表示する。
pub fn write_report<W: Write>(out: &mut W, evaluation: &Evaluation) -> std::io::Result<()> {
    let total = evaluation.total();
    let m = &evaluation.confusion;

    writeln!(out, "\n=== 推論結果 ===")?;
    writeln!(out, "総数: {}", total)?;
    writeln!(out, "正解: {}", evaluation.correct)?;
    writeln!(out, "不正解: {}", total - evaluation.correct)?;
    writeln!(out, "正解率: {:.2}%", evaluation.accuracy())?;

    writeln!(out, "\n混同行列 (行 = 正解, 列 = 予測)")?;
    writeln!(out, "{:>10} {:>8} {:>8}", "", "circle", "square")?;
    for true_label in Label::ALL {
        writeln!(
            out,
            "{:>10} {:>8} {:>8}",
            true_label.dir_name(),
            m.get(true_label, Label::Circle),
            m.get(true_label, Label::Square)
        )?;
    }

    let misclassified: Vec<_> = evaluation.misclassified().collect();
    if !misclassified.is_empty() {
        writeln!(out, "\n誤分類:")?;
        for record in misclassified.iter().take(MAX_LISTED_MISCLASSIFIED) {
            writeln!(
                out,
                "  {} (正解: {}, 予測: {})",
                record.filename, record.true_label, record.predicted_label
            )?;
        }
        if misclassified.len() > MAX_LISTED_MISCLASSIFIED {
            writeln!(
                out,
                "  … 他 {} 件",
                misclassified.len() - MAX_LISTED_MISCLASSIFIED
            )?;
        }
    }

    Ok(())
}
