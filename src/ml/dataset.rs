//! サンプルインデックス
//!
//! `root/circle` と `root/square` を走査して (画像パス, ラベル) の列を作ります。
//! クラス内の順序はファイル名のソート順で、circle → square の順に連結します。

use std::path::{Path, PathBuf};
use std::sync::Arc;

use burn::data::dataset::Dataset;
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

use crate::error::Result;
use crate::types::Label;

/// 1枚の学習・評価サンプル（画像パスのみ保持）
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sample {
    pub path: PathBuf,
    pub label: Label,
}

impl Sample {
    /// レポート用のファイル名
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

/// ディレクトリ内のPNGファイルをファイル名順に列挙
///
/// 拡張子の大文字・小文字は区別しない。
pub fn list_png_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }

        let is_png = path
            .extension()
            .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case("png"))
            .unwrap_or(false);
        if is_png {
            files.push(path);
        }
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// サンプルインデックス
#[derive(Clone, Debug)]
pub struct SampleIndex {
    root: PathBuf,
    samples: Vec<Sample>,
}

impl SampleIndex {
    /// ディレクトリからインデックスを構築
    ///
    /// `root` やクラスディレクトリが存在しない場合は0件として扱う（エラーにしない）。
    pub fn build(root: &Path) -> Result<Self> {
        let mut samples = Vec::new();

        for label in Label::ALL {
            let class_dir = root.join(label.dir_name());
            if !class_dir.is_dir() {
                continue; // クラスディレクトリが存在しない場合はスキップ
            }

            for path in list_png_files(&class_dir)? {
                samples.push(Sample { path, label });
            }
        }

        Ok(Self {
            root: root.to_path_buf(),
            samples,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// 指定クラスのサンプル数
    pub fn count(&self, label: Label) -> usize {
        self.samples.iter().filter(|s| s.label == label).count()
    }

    /// 学習用と検証用に分割
    ///
    /// インデックスをシャッフルしてから先頭 `floor(len * train_ratio)` 件を学習用にする。
    /// circle が先に並んでいるため、シャッフルせずに分割するとクラスが偏る。
    pub fn split(&self, train_ratio: f64, seed: u64) -> (SampleSplit, SampleSplit) {
        let mut indices: Vec<usize> = (0..self.samples.len()).collect();
        let mut rng = StdRng::seed_from_u64(seed);
        indices.shuffle(&mut rng);

        let shuffled: Arc<Vec<Sample>> =
            Arc::new(indices.iter().map(|&i| self.samples[i].clone()).collect());

        let total_len = shuffled.len();
        let train_len = ((total_len as f64 * train_ratio) as usize).min(total_len);

        let train = SampleSplit {
            samples: shuffled.clone(),
            start_idx: 0,
            end_idx: train_len,
        };
        let valid = SampleSplit {
            samples: shuffled,
            start_idx: train_len,
            end_idx: total_len,
        };

        (train, valid)
    }
}

impl Dataset<Sample> for SampleIndex {
    fn get(&self, index: usize) -> Option<Sample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

/// 分割後のサンプル列（シャッフル済みの列に対するインデックス範囲）
#[derive(Clone, Debug)]
pub struct SampleSplit {
    samples: Arc<Vec<Sample>>,
    start_idx: usize,
    end_idx: usize,
}

impl Dataset<Sample> for SampleSplit {
    fn get(&self, index: usize) -> Option<Sample> {
        let actual_index = self.start_idx + index;
        if actual_index >= self.end_idx {
            return None;
        }
        self.samples.get(actual_index).cloned()
    }

    fn len(&self) -> usize {
        self.end_idx - self.start_idx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::fs;

    fn touch(dir: &Path, name: &str) {
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join(name), b"").unwrap();
    }

    #[test]
    fn test_build_orders_circles_before_squares() {
        let root = tempfile::tempdir().unwrap();
        for name in ["c3.png", "c1.png", "c5.png", "c2.png", "c4.png"] {
            touch(&root.path().join("circle"), name);
        }
        for name in ["s2.png", "s1.png", "s3.PNG"] {
            touch(&root.path().join("square"), name);
        }
        touch(&root.path().join("square"), "notes.txt");

        let index = SampleIndex::build(root.path()).unwrap();

        assert_eq!(index.len(), 8);
        assert!(index.samples()[..5].iter().all(|s| s.label == Label::Circle));
        assert!(index.samples()[5..].iter().all(|s| s.label == Label::Square));

        let names: Vec<String> = index.samples().iter().map(Sample::file_name).collect();
        assert_eq!(
            names,
            ["c1.png", "c2.png", "c3.png", "c4.png", "c5.png", "s1.png", "s2.png", "s3.PNG"]
        );
    }

    #[test]
    fn test_missing_directories_yield_empty_index() {
        let root = tempfile::tempdir().unwrap();
        let index = SampleIndex::build(root.path()).unwrap();
        assert!(index.is_empty());

        let index = SampleIndex::build(&root.path().join("does_not_exist")).unwrap();
        assert!(index.is_empty());
    }

    #[test]
    fn test_missing_class_is_tolerated() {
        let root = tempfile::tempdir().unwrap();
        touch(&root.path().join("square"), "s1.png");

        let index = SampleIndex::build(root.path()).unwrap();
        assert_eq!(index.count(Label::Circle), 0);
        assert_eq!(index.count(Label::Square), 1);
    }

    #[test]
    fn test_split_is_80_20_and_disjoint() {
        let root = tempfile::tempdir().unwrap();
        for i in 0..10 {
            touch(&root.path().join("circle"), &format!("c{i}.png"));
            touch(&root.path().join("square"), &format!("s{i}.png"));
        }
        let index = SampleIndex::build(root.path()).unwrap();

        let (train, valid) = index.split(0.8, 42);
        assert_eq!(train.len(), 16);
        assert_eq!(valid.len(), 4);
        assert!(train.get(16).is_none());

        let train_paths: HashSet<PathBuf> = train.iter().map(|s| s.path).collect();
        let valid_paths: HashSet<PathBuf> = valid.iter().map(|s| s.path).collect();
        assert!(train_paths.is_disjoint(&valid_paths));
        assert_eq!(train_paths.len() + valid_paths.len(), 20);
    }

    #[test]
    fn test_split_depends_on_seed() {
        let root = tempfile::tempdir().unwrap();
        for i in 0..20 {
            touch(&root.path().join("circle"), &format!("c{i:02}.png"));
        }
        let index = SampleIndex::build(root.path()).unwrap();

        let order = |seed| -> Vec<Sample> { index.split(0.8, seed).0.iter().collect() };
        assert_eq!(order(1), order(1));
        assert_ne!(order(1), order(2));
        // 先頭16件をそのまま使う分割ではない
        assert_ne!(order(1), index.samples()[..16].to_vec());
    }
}
