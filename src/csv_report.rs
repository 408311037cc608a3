//! 推論結果CSVの読み書き
//!
//! ヘッダー: `filename,true_label,predicted_label,correct`

use csv::{ReaderBuilder, WriterBuilder};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::error::{PipelineError, Result};
use crate::types::Label;

const HEADER: [&str; 4] = ["filename", "true_label", "predicted_label", "correct"];
const REPORT_PREFIX: &str = "results_";

/// 1サンプル分の推論結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub filename: String,
    pub true_label: Label,
    pub predicted_label: Label,
    pub correct: bool,
}

impl PredictionRecord {
    pub fn new(filename: String, true_label: Label, predicted_label: Label) -> Self {
        Self {
            filename,
            true_label,
            predicted_label,
            correct: true_label == predicted_label,
        }
    }
}

/// 自動採番ファイル名 (`results_NNN.csv`)
pub fn report_file_name(number: u32) -> String {
    format!("{}{:03}.csv", REPORT_PREFIX, number)
}

/// `results_NNN.csv` から番号を取り出す（数字以外が混じる名前は対象外）
fn parse_sequence_number(file_name: &str) -> Option<u32> {
    let digits = file_name.strip_prefix(REPORT_PREFIX)?.strip_suffix(".csv")?;
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

fn exhausted(dir: &Path) -> PipelineError {
    PipelineError::configuration(dir, "レポートの連番が上限に達しました")
}

/// 次に使う番号（既存の最大値 + 1、無ければ 1）
pub fn next_sequence_number(dir: &Path) -> Result<u32> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(1),
        Err(e) => return Err(e.into()),
    };

    let mut max: u32 = 0;
    for entry in entries {
        let entry = entry?;
        if let Some(number) = entry.file_name().to_str().and_then(parse_sequence_number) {
            max = max.max(number);
        }
    }

    max.checked_add(1).ok_or_else(|| exhausted(dir))
}

/// 結果をライターへ書き出す（0件でもヘッダーは出力する）
fn write_to<W: Write>(writer: W, records: &[PredictionRecord]) -> Result<()> {
    let mut wtr = WriterBuilder::new().has_headers(false).from_writer(writer);
    wtr.write_record(HEADER)?;
    for record in records {
        wtr.serialize(record)?;
    }
    wtr.flush()?;
    Ok(())
}

/// 指定パスへ書き出す（既存ファイルは上書き）
pub fn write_records(path: &Path, records: &[PredictionRecord]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    write_to(File::create(path)?, records)
}

/// 結果ディレクトリに新しい番号のレポートを作成する
///
/// 既存のレポートは上書きしない。作成時に衝突した場合は番号を進めて再試行する。
pub fn create_numbered_report(dir: &Path, records: &[PredictionRecord]) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;

    let mut number = next_sequence_number(dir)?;
    loop {
        let path = dir.join(report_file_name(number));
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => {
                write_to(file, records)?;
                return Ok(path);
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                tracing::debug!("{} は既に存在します。番号を進めます", path.display());
                number = number.checked_add(1).ok_or_else(|| exhausted(dir))?;
            }
            Err(e) => return Err(e.into()),
        }
    }
}

/// レポートを読み込む
pub fn read_records(path: &Path) -> Result<Vec<PredictionRecord>> {
    let mut reader = ReaderBuilder::new().has_headers(true).from_path(path)?;

    let mut records = Vec::new();
    for result in reader.deserialize() {
        records.push(result?);
    }

    Ok(records)
}
