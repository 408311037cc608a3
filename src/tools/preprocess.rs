//! 画像の前処理（正規形への変換と書き出し）

use std::path::Path;

use tracing::{info, warn};

use crate::error::{PipelineError, Result};
use crate::ml::dataset::list_png_files;
use crate::ml::transform::preprocess_file;
use crate::types::Label;

/// 学習データへ追加する画像の接尾辞
pub const ADDED_SAMPLE_SUFFIX: &str = "_m";

/// 前処理結果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PreprocessSummary {
    pub processed: usize,
    /// 読み込めずにスキップした枚数
    pub skipped: usize,
}

/// クラスディレクトリごとに変換する共通処理
///
/// `rename` は元のファイル名から出力ファイル名を作る。
fn convert_class_dirs<F>(input: &Path, output: &Path, rename: F) -> Result<PreprocessSummary>
where
    F: Fn(&Path) -> Option<String>,
{
    if !input.is_dir() {
        return Err(PipelineError::configuration(
            input,
            "入力ディレクトリが存在しません",
        ));
    }

    let mut summary = PreprocessSummary::default();

    for label in Label::ALL {
        let class_in = input.join(label.dir_name());
        let class_out = output.join(label.dir_name());
        std::fs::create_dir_all(&class_out)?;

        if !class_in.is_dir() {
            warn!("{} が存在しません。スキップします", class_in.display());
            continue;
        }

        for path in list_png_files(&class_in)? {
            let Some(new_name) = rename(&path) else {
                continue;
            };

            match preprocess_file(&path, &class_out.join(new_name)) {
                Ok(()) => summary.processed += 1,
                Err(PipelineError::ImageDecode { path, source }) => {
                    warn!("読み込めない画像をスキップ: {}: {}", path.display(), source);
                    summary.skipped += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    Ok(summary)
}

/// `input/{circle,square}` を正規形に変換して `output/{circle,square}` へ同名で保存
pub fn preprocess_directory(input: &Path, output: &Path) -> Result<PreprocessSummary> {
    println!(
        "前処理中: {} -> {}",
        input.display(),
        output.display()
    );

    let summary = convert_class_dirs(input, output, |path| {
        path.file_name().map(|name| name.to_string_lossy().to_string())
    })?;

    println!("✓ {} 枚を処理しました", summary.processed);
    if summary.skipped > 0 {
        println!("✗ {} 枚をスキップしました", summary.skipped);
    }
    info!("保存先: {}", output.display());

    Ok(summary)
}

/// 接尾辞 `_m` を付けた出力ファイル名
pub fn added_sample_name(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_string_lossy();
    Some(format!("{}{}.png", stem, ADDED_SAMPLE_SUFFIX))
}

/// テスト画像を正規形に変換して学習データセットへ追加
///
/// `test/{circle,square}/x.png` → `dataset/{circle,square}/x_m.png`
pub fn add_test_to_dataset(test_dir: &Path, dataset_dir: &Path) -> Result<PreprocessSummary> {
    println!(
        "テスト画像を学習データへ追加中: {} -> {}",
        test_dir.display(),
        dataset_dir.display()
    );

    let summary = convert_class_dirs(test_dir, dataset_dir, added_sample_name)?;

    println!("✓ {} 枚を追加しました", summary.processed);
    if summary.skipped > 0 {
        println!("✗ {} 枚をスキップしました", summary.skipped);
    }
    println!("再学習するには train を実行してください");

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::dataset::SampleIndex;
    use image::{Rgb, RgbImage};

    fn write_rgb(path: &Path, size: u32) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        RgbImage::from_pixel(size, size, Rgb([200, 10, 10])).save(path).unwrap();
    }

    #[test]
    fn test_preprocess_directory() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        write_rgb(&input.path().join("circle").join("a.png"), 128);
        write_rgb(&input.path().join("square").join("b.png"), 32);
        std::fs::write(input.path().join("square").join("broken.png"), b"nope").unwrap();

        let summary = preprocess_directory(input.path(), output.path()).unwrap();
        assert_eq!(summary, PreprocessSummary { processed: 2, skipped: 1 });

        let img = image::open(output.path().join("circle").join("a.png")).unwrap();
        assert_eq!((img.width(), img.height()), (64, 64));
        assert_eq!(img.color(), image::ColorType::L8);
        assert!(output.path().join("square").join("b.png").is_file());
        assert!(!output.path().join("square").join("broken.png").exists());
    }

    #[test]
    fn test_missing_input() {
        let output = tempfile::tempdir().unwrap();
        let result = preprocess_directory(&output.path().join("none"), output.path());
        assert!(matches!(result, Err(PipelineError::Configuration { .. })));
    }

    #[test]
    fn test_add_test_keeps_class_dirs() {
        let test_dir = tempfile::tempdir().unwrap();
        let dataset = tempfile::tempdir().unwrap();
        write_rgb(&test_dir.path().join("circle").join("circle_001.png"), 80);
        write_rgb(&test_dir.path().join("square").join("square_000_p.png"), 64);

        let summary = add_test_to_dataset(test_dir.path(), dataset.path()).unwrap();
        assert_eq!(summary.processed, 2);
        assert!(dataset.path().join("circle").join("circle_001_m.png").is_file());
        assert!(dataset.path().join("square").join("square_000_p_m.png").is_file());

        let index = SampleIndex::build(dataset.path()).unwrap();
        assert_eq!(index.len(), 2);
    }
}
