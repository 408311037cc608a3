//! 手描きテスト画像の整理
//!
//! 外部の命名規則に従って `circ*` / `quad*` のファイルを
//! `dest/circle`, `dest/square` に連番でコピーします。
//! ファイル名（小文字化）に `_p` を含むものは新しい名前にも `_p` を付けます。

use std::path::Path;

use tracing::{debug, info};

use crate::error::{PipelineError, Result};
use crate::ml::dataset::list_png_files;
use crate::types::Label;

/// 整理結果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrganizeSummary {
    pub circles: usize,
    pub squares: usize,
}

impl OrganizeSummary {
    pub fn total(&self) -> usize {
        self.circles + self.squares
    }
}

/// ファイル名の接頭辞からクラスを判定（対象外なら None）
pub fn classify_file_name(file_name: &str) -> Option<Label> {
    if file_name.starts_with("circ") {
        Some(Label::Circle)
    } else if file_name.starts_with("quad") {
        Some(Label::Square)
    } else {
        None
    }
}

/// `_p` マーカーの有無
pub fn has_p_marker(file_name: &str) -> bool {
    file_name.to_lowercase().contains("_p")
}

/// 整理後のファイル名
pub fn organized_file_name(label: Label, number: usize, p_marker: bool) -> String {
    if p_marker {
        format!("{}_{:03}_p.png", label.dir_name(), number)
    } else {
        format!("{}_{:03}.png", label.dir_name(), number)
    }
}

/// `source` 内のPNGを `dest/{circle,square}` へコピー
///
/// 処理順はファイル名のソート順。該当しないファイルは無視する。
pub fn organize_test_data(source: &Path, dest: &Path) -> Result<OrganizeSummary> {
    if !source.is_dir() {
        return Err(PipelineError::configuration(
            source,
            "コピー元ディレクトリが存在しません",
        ));
    }

    for label in Label::ALL {
        std::fs::create_dir_all(dest.join(label.dir_name()))?;
    }

    println!(
        "テストデータを整理中: {} -> {}",
        source.display(),
        dest.display()
    );

    let mut summary = OrganizeSummary::default();

    for path in list_png_files(source)? {
        let file_name = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name.to_string(),
            None => continue,
        };

        let Some(label) = classify_file_name(&file_name) else {
            debug!("対象外のファイルをスキップ: {}", file_name);
            continue;
        };

        let counter = match label {
            Label::Circle => &mut summary.circles,
            Label::Square => &mut summary.squares,
        };
        let new_name = organized_file_name(label, *counter, has_p_marker(&file_name));
        std::fs::copy(&path, dest.join(label.dir_name()).join(&new_name))?;
        *counter += 1;
    }

    println!("✓ 円: {} 枚", summary.circles);
    println!("✓ 正方形: {} 枚", summary.squares);
    info!("合計 {} 枚を整理しました", summary.total());

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_file_name() {
        assert_eq!(classify_file_name("circ_01.png"), Some(Label::Circle));
        assert_eq!(classify_file_name("circle.png"), Some(Label::Circle));
        assert_eq!(classify_file_name("quad7.png"), Some(Label::Square));
        assert_eq!(classify_file_name("Circ.png"), None);
        assert_eq!(classify_file_name("triangle.png"), None);
    }

    #[test]
    fn test_p_marker() {
        assert!(has_p_marker("circ_p1.png"));
        assert!(has_p_marker("quad_P.png"));
        assert!(!has_p_marker("quad1.png"));
        assert_eq!(organized_file_name(Label::Circle, 3, true), "circle_003_p.png");
        assert_eq!(organized_file_name(Label::Square, 12, false), "square_012.png");
    }

    #[test]
    fn test_organize_copies_with_counters() {
        let source = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        for name in ["circ_b.png", "circ_a_p.png", "quad1.png", "notes.png", "circ.txt"] {
            std::fs::write(source.path().join(name), name).unwrap();
        }

        let summary = organize_test_data(source.path(), dest.path()).unwrap();
        assert_eq!(summary, OrganizeSummary { circles: 2, squares: 1 });

        // ソート順: circ_a_p.png, circ_b.png
        let first = dest.path().join("circle").join("circle_000_p.png");
        let second = dest.path().join("circle").join("circle_001.png");
        assert_eq!(std::fs::read_to_string(first).unwrap(), "circ_a_p.png");
        assert_eq!(std::fs::read_to_string(second).unwrap(), "circ_b.png");
        assert!(dest.path().join("square").join("square_000.png").is_file());
    }

    #[test]
    fn test_missing_source() {
        let dest = tempfile::tempdir().unwrap();
        let result = organize_test_data(&dest.path().join("nope"), dest.path());
        assert!(matches!(result, Err(PipelineError::Configuration { .. })));
    }
}
