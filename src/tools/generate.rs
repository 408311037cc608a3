//! 合成データ生成
//!
//! 黒背景に白い塗りつぶし図形を描いた 64x64 グレースケール画像を作ります。

use std::path::Path;

use image::{GrayImage, Luma};
use rand::{rngs::StdRng, Rng, SeedableRng};
use tracing::info;

use crate::error::{PipelineError, Result};
use crate::ml::transform::IMAGE_SIZE;
use crate::types::Label;

const BACKGROUND: Luma<u8> = Luma([0]);
const FOREGROUND: Luma<u8> = Luma([255]);

/// 正方形の一辺の範囲
pub const SQUARE_SIDE_RANGE: (u32, u32) = (10, 40);
/// 円の半径の範囲
pub const CIRCLE_RADIUS_RANGE: (u32, u32) = (5, 20);

/// クラスごとの既定枚数
pub const DEFAULT_COUNT: usize = 1000;

/// 生成結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerateSummary {
    pub squares: usize,
    pub circles: usize,
}

/// ランダムな位置・大きさの正方形を描画
///
/// 正方形は画像内に完全に収まる。
pub fn render_square<R: Rng>(rng: &mut R) -> GrayImage {
    let size = IMAGE_SIZE as u32;
    let side = rng.gen_range(SQUARE_SIDE_RANGE.0..=SQUARE_SIDE_RANGE.1);
    let x0 = rng.gen_range(0..=size - side);
    let y0 = rng.gen_range(0..=size - side);

    let mut img = GrayImage::from_pixel(size, size, BACKGROUND);
    for y in y0..y0 + side {
        for x in x0..x0 + side {
            img.put_pixel(x, y, FOREGROUND);
        }
    }
    img
}

/// ランダムな位置・大きさの円を描画
///
/// 中心は [r, 64 - r] の範囲から選ぶ。
pub fn render_circle<R: Rng>(rng: &mut R) -> GrayImage {
    let size = IMAGE_SIZE as u32;
    let radius = rng.gen_range(CIRCLE_RADIUS_RANGE.0..=CIRCLE_RADIUS_RANGE.1);
    let cx = rng.gen_range(radius..=size - radius) as f32;
    let cy = rng.gen_range(radius..=size - radius) as f32;
    let r = radius as f32;

    GrayImage::from_fn(size, size, |x, y| {
        // 画素中心で判定
        let dx = x as f32 + 0.5 - cx;
        let dy = y as f32 + 0.5 - cy;
        if dx * dx + dy * dy <= r * r {
            FOREGROUND
        } else {
            BACKGROUND
        }
    })
}

fn save_png(img: &GrayImage, path: &Path) -> Result<()> {
    img.save(path).map_err(|source| PipelineError::ImageEncode {
        path: path.to_path_buf(),
        source,
    })
}

/// `out_dir/square/square_{i}.png` と `out_dir/circle/circle_{i}.png` を生成
///
/// `seed` を指定すると同じ画像列を再現できる。
pub fn generate_dataset(out_dir: &Path, count: usize, seed: Option<u64>) -> Result<GenerateSummary> {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let square_dir = out_dir.join(Label::Square.dir_name());
    let circle_dir = out_dir.join(Label::Circle.dir_name());
    std::fs::create_dir_all(&square_dir)?;
    std::fs::create_dir_all(&circle_dir)?;

    println!("正方形を生成中...");
    for i in 0..count {
        save_png(&render_square(&mut rng), &square_dir.join(format!("square_{i}.png")))?;
    }

    println!("円を生成中...");
    for i in 0..count {
        save_png(&render_circle(&mut rng), &circle_dir.join(format!("circle_{i}.png")))?;
    }

    info!("データ生成完了: {} に保存しました", out_dir.display());

    Ok(GenerateSummary {
        squares: count,
        circles: count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::dataset::SampleIndex;

    fn lit_pixels(img: &GrayImage) -> Vec<(u32, u32)> {
        img.enumerate_pixels()
            .filter(|(_, _, p)| p[0] == 255)
            .map(|(x, y, _)| (x, y))
            .collect()
    }

    #[test]
    fn test_square_fits_inside_image() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..50 {
            let img = render_square(&mut rng);
            assert_eq!(img.dimensions(), (64, 64));

            let lit = lit_pixels(&img);
            let min_x = lit.iter().map(|p| p.0).min().unwrap();
            let max_x = lit.iter().map(|p| p.0).max().unwrap();
            let min_y = lit.iter().map(|p| p.1).min().unwrap();
            let max_y = lit.iter().map(|p| p.1).max().unwrap();
            let side = max_x - min_x + 1;

            assert!((10..=40).contains(&side));
            assert_eq!(max_y - min_y + 1, side);
            assert_eq!(lit.len() as u32, side * side);
        }
    }

    #[test]
    fn test_circle_is_drawn() {
        let mut rng = StdRng::seed_from_u64(2);
        for _ in 0..50 {
            let img = render_circle(&mut rng);
            let lit = lit_pixels(&img).len();
            // 半径5〜20の円の面積の範囲に収まる
            assert!(lit > 60 && lit < 1400, "lit = {lit}");
            assert!(img.pixels().all(|p| p[0] == 0 || p[0] == 255));
        }
    }

    #[test]
    fn test_generate_is_reproducible_and_indexable() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();

        let summary = generate_dataset(a.path(), 3, Some(9)).unwrap();
        generate_dataset(b.path(), 3, Some(9)).unwrap();
        assert_eq!(summary, GenerateSummary { squares: 3, circles: 3 });

        for name in ["square/square_0.png", "square/square_2.png", "circle/circle_1.png"] {
            let left = std::fs::read(a.path().join(name)).unwrap();
            let right = std::fs::read(b.path().join(name)).unwrap();
            assert_eq!(left, right, "{name}");
        }

        let index = SampleIndex::build(a.path()).unwrap();
        assert_eq!(index.count(Label::Circle), 3);
        assert_eq!(index.count(Label::Square), 3);
    }
}
