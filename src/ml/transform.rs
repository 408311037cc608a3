//! 前処理変換
//!
//! 任意の画像を 64x64 のグレースケールに変換します。
//! 学習データの準備・テストデータの準備・推論の3か所で同じ変換を使います。

use std::path::Path;

use image::{imageops::FilterType, DynamicImage, GrayImage};

use crate::error::{PipelineError, Result};

/// 画像サイズ（正方形）
pub const IMAGE_SIZE: usize = 64;

/// 1枚あたりの画素数
pub const NUM_PIXELS: usize = IMAGE_SIZE * IMAGE_SIZE;

/// 画像を開く（デコード失敗はそのまま呼び出し元へ返す）
pub fn open_image(path: &Path) -> Result<DynamicImage> {
    image::open(path).map_err(|source| PipelineError::ImageDecode {
        path: path.to_path_buf(),
        source,
    })
}

/// 64x64 へリサイズしてから輝度1チャネルへ変換
///
/// アスペクト比は保持しない。すでに 64x64 の画像はリサンプリングしない。
pub fn to_canonical(image: &DynamicImage) -> GrayImage {
    let size = IMAGE_SIZE as u32;
    if image.width() == size && image.height() == size {
        image.to_luma8()
    } else {
        image
            .resize_exact(size, size, FilterType::Triangle)
            .to_luma8()
    }
}

/// 画像ファイルを読み込んで正規形に変換
pub fn load_canonical(path: &Path) -> Result<GrayImage> {
    let image = open_image(path)?;
    Ok(to_canonical(&image))
}

/// 画素値 0..=255 を -1.0..=1.0 へ写像
///
/// `(v / 255) / 0.5 - 1`
pub fn normalize_pixel(value: u8) -> f32 {
    (value as f32 / 255.0) / 0.5 - 1.0
}

/// 正規形画像をモデル入力用に正規化
///
/// # 戻り値
/// - 行優先 (H, W) で平坦化した 1x64x64 の値
pub fn normalize(image: &GrayImage) -> Vec<f32> {
    image.pixels().map(|pixel| normalize_pixel(pixel[0])).collect()
}

/// 画像を読み込んで正規化（推論・学習用、ファイルは書き出さない）
pub fn load_normalized(path: &Path) -> Result<Vec<f32>> {
    let canonical = load_canonical(path)?;
    Ok(normalize(&canonical))
}

/// 画像を正規形に変換してファイルへ書き出す
pub fn preprocess_file(source: &Path, destination: &Path) -> Result<()> {
    let canonical = load_canonical(source)?;
    canonical
        .save(destination)
        .map_err(|source| PipelineError::ImageEncode {
            path: destination.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Luma, Rgb, Rgba};

    #[test]
    fn test_canonical_size_for_any_input() {
        let rgba = DynamicImage::ImageRgba8(ImageBuffer::from_pixel(120, 30, Rgba([10, 200, 30, 255])));
        let rgb = DynamicImage::ImageRgb8(ImageBuffer::from_pixel(1, 1, Rgb([255, 255, 255])));
        let gray = DynamicImage::ImageLuma8(ImageBuffer::from_pixel(300, 500, Luma([7])));

        for image in [rgba, rgb, gray] {
            let canonical = to_canonical(&image);
            assert_eq!(canonical.dimensions(), (64, 64));
            assert_eq!(normalize(&canonical).len(), NUM_PIXELS);
        }
    }

    #[test]
    fn test_canonical_size_is_not_resampled() {
        let mut image = GrayImage::new(64, 64);
        image.put_pixel(3, 5, Luma([255]));

        let canonical = to_canonical(&DynamicImage::ImageLuma8(image.clone()));
        assert_eq!(canonical, image);
    }

    #[test]
    fn test_normalize_pixel_range() {
        assert_eq!(normalize_pixel(0), -1.0);
        assert_eq!(normalize_pixel(255), 1.0);

        for value in 0..=255u8 {
            let expected = (value as f32 / 255.0) / 0.5 - 1.0;
            let actual = normalize_pixel(value);
            assert_eq!(actual, expected);
            assert!((-1.0..=1.0).contains(&actual));
        }
    }

    #[test]
    fn test_normalize_is_row_major() {
        let mut image = GrayImage::new(64, 64);
        image.put_pixel(1, 0, Luma([255]));
        image.put_pixel(0, 1, Luma([0]));

        let data = normalize(&image);
        assert_eq!(data[1], 1.0);
        assert_eq!(data[64], -1.0);
    }

    #[test]
    fn test_decode_error_is_propagated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"not an image").unwrap();

        match load_normalized(&path) {
            Err(PipelineError::ImageDecode { path: failed, .. }) => assert_eq!(failed, path),
            other => panic!("ImageDecode を期待しましたが {:?} でした", other.map(|v| v.len())),
        }
    }

    #[test]
    fn test_preprocess_file_writes_grayscale() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("drawing.png");
        let destination = dir.path().join("out.png");
        ImageBuffer::from_pixel(200, 100, Rgb([255u8, 0, 0]))
            .save(&source)
            .unwrap();

        preprocess_file(&source, &destination).unwrap();

        let written = image::open(&destination).unwrap();
        assert_eq!((written.width(), written.height()), (64, 64));
        assert!(matches!(written, DynamicImage::ImageLuma8(_)));
    }
}
