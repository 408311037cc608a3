//! 形状分類用CNNモデル
//!
//! 64x64 グレースケール画像を circle / square の2クラスに分類します。

use burn::{
    module::Module,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        loss::CrossEntropyLossConfig,
        pool::{MaxPool2d, MaxPool2dConfig},
        Linear, LinearConfig, PaddingConfig2d, Relu,
    },
    tensor::{backend::Backend, Int, Tensor},
    train::ClassificationOutput,
};

use crate::types::Label;

/// クラス数
pub const NUM_CLASSES: usize = 2;

/// クラス名の定義（クラスID順）
pub const CLASS_NAMES: [&str; NUM_CLASSES] = ["circle", "square"];

/// Flatten後の特徴次元 (32ch x 16 x 16)
pub const FEATURE_DIM: usize = 32 * 16 * 16;

/// 形状分類用CNNモデル
///
/// # アーキテクチャ
/// - Conv 3x3 (padding 1) 1 -> 16 + ReLU + MaxPool 2x2 (64 -> 32)
/// - Conv 3x3 (padding 1) 16 -> 32 + ReLU + MaxPool 2x2 (32 -> 16)
/// - Flatten (8192)
/// - FC: 8192 -> 2
///
/// 構成は固定で、設定項目はない。
#[derive(Module, Debug)]
pub struct ShapeClassifier<B: Backend> {
    conv1: Conv2d<B>, // 1 -> 16
    conv2: Conv2d<B>, // 16 -> 32
    pool: MaxPool2d,  // 2x2, stride 2
    fc: Linear<B>,    // 8192 -> 2
    activation: Relu,
}

impl<B: Backend> ShapeClassifier<B> {
    /// 重みをランダム初期化したモデルを作成
    pub fn new(device: &B::Device) -> Self {
        Self {
            conv1: Conv2dConfig::new([1, 16], [3, 3])
                .with_padding(PaddingConfig2d::Explicit(1, 1))
                .init(device),
            conv2: Conv2dConfig::new([16, 32], [3, 3])
                .with_padding(PaddingConfig2d::Explicit(1, 1))
                .init(device),
            pool: MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init(),
            fc: LinearConfig::new(FEATURE_DIM, NUM_CLASSES).init(device),
            activation: Relu::new(),
        }
    }

    /// 順伝播
    ///
    /// # 引数
    /// - `images`: バッチ画像 [batch_size, 1, 64, 64]
    ///
    /// # 戻り値
    /// - クラスごとのロジット [batch_size, 2]
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let [batch_size, _, _, _] = images.dims();

        let x = self.conv1.forward(images);
        let x = self.activation.forward(x);
        let x = self.pool.forward(x);

        let x = self.conv2.forward(x);
        let x = self.activation.forward(x);
        let x = self.pool.forward(x);

        let x = x.reshape([batch_size, FEATURE_DIM]);

        self.fc.forward(x)
    }

    /// 予測ラベル（ロジットの argmax）
    pub fn predict(&self, images: Tensor<B, 4>) -> Vec<Label> {
        let output = self.forward(images);
        argmax_labels(output)
    }

    /// 順伝播と損失計算（学習用）
    pub fn forward_classification(
        &self,
        images: Tensor<B, 4>,
        targets: Tensor<B, 1, Int>,
    ) -> ClassificationOutput<B> {
        let output = self.forward(images);
        let loss = CrossEntropyLossConfig::new()
            .init(&output.device())
            .forward(output.clone(), targets.clone());

        ClassificationOutput::new(loss, output, targets)
    }
}

/// ロジット [batch_size, 2] を行ごとの予測ラベルへ変換
pub fn argmax_labels<B: Backend>(logits: Tensor<B, 2>) -> Vec<Label> {
    logits
        .argmax(1)
        .into_data()
        .iter::<i64>()
        .map(|class_id| Label::from_index(class_id as usize).unwrap_or(Label::Circle))
        .collect()
}

/// クラスIDのテンソルをラベル列へ変換
pub fn target_labels<B: Backend>(targets: Tensor<B, 1, Int>) -> Vec<Label> {
    targets
        .into_data()
        .iter::<i64>()
        .map(|class_id| Label::from_index(class_id as usize).unwrap_or(Label::Circle))
        .collect()
}
