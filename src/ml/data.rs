//! バッチ化
//!
//! 学習前に各サンプルを一度だけデコード・正規化してメモリに載せ、
//! DataLoader にはデコード済みのアイテムを流します。

use burn::{
    data::{dataloader::batcher::Batcher, dataset::Dataset},
    tensor::{backend::Backend, Int, Tensor},
};

use crate::error::Result;
use crate::ml::dataset::Sample;
use crate::ml::transform::{load_normalized, IMAGE_SIZE, NUM_PIXELS};
use crate::types::Label;

/// デコード済みのサンプル
#[derive(Clone, Debug)]
pub struct ShapeItem {
    /// 正規化済み画素 (1x64x64, 行優先)
    pub pixels: Vec<f32>,
    pub label: Label,
}

impl ShapeItem {
    /// サンプル画像を読み込んで正規化
    pub fn load(sample: &Sample) -> Result<Self> {
        Ok(Self {
            pixels: load_normalized(&sample.path)?,
            label: sample.label,
        })
    }
}

/// データセットの全サンプルを読み込む
///
/// デコードできない画像が1枚でもあればエラーを返す（件数を黙って減らさない）。
pub fn load_items<D: Dataset<Sample>>(dataset: &D) -> Result<Vec<ShapeItem>> {
    dataset.iter().map(|sample| ShapeItem::load(&sample)).collect()
}

/// バッチャー
#[derive(Clone)]
pub struct ShapeBatcher<B: Backend> {
    device: B::Device,
}

impl<B: Backend> ShapeBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

/// バッチデータ
#[derive(Clone, Debug)]
pub struct ShapeBatch<B: Backend> {
    /// [batch_size, 1, 64, 64]
    pub images: Tensor<B, 4>,
    /// [batch_size]
    pub targets: Tensor<B, 1, Int>,
}

impl<B: Backend> Batcher<B, ShapeItem, ShapeBatch<B>> for ShapeBatcher<B> {
    fn batch(&self, items: Vec<ShapeItem>, _device: &B::Device) -> ShapeBatch<B> {
        let batch_size = items.len();
        let mut all_pixels = Vec::with_capacity(batch_size * NUM_PIXELS);
        let mut targets_vec = Vec::with_capacity(batch_size);

        for item in items {
            all_pixels.extend_from_slice(&item.pixels);
            targets_vec.push(item.label.index() as i64);
        }

        // 1回の転送でバッチ全体をデバイスへ
        let images = Tensor::<B, 1>::from_floats(all_pixels.as_slice(), &self.device)
            .reshape([batch_size, 1, IMAGE_SIZE, IMAGE_SIZE]);
        let targets = Tensor::<B, 1, Int>::from_ints(targets_vec.as_slice(), &self.device);

        ShapeBatch { images, targets }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::{NdArray, NdArrayDevice};

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_batch_shapes_and_targets() {
        let device = NdArrayDevice::Cpu;
        let batcher = ShapeBatcher::<TestBackend>::new(device);
        let items = vec![
            ShapeItem {
                pixels: vec![-1.0; NUM_PIXELS],
                label: Label::Circle,
            },
            ShapeItem {
                pixels: vec![1.0; NUM_PIXELS],
                label: Label::Square,
            },
        ];

        let batch = batcher.batch(items, &device);

        assert_eq!(batch.images.dims(), [2, 1, 64, 64]);
        let targets: Vec<i64> = batch.targets.into_data().iter::<i64>().collect();
        assert_eq!(targets, vec![0, 1]);
    }
}
