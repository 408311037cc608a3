use serde::{Deserialize, Serialize};

/// 分類ラベル
///
/// クラスIDはディレクトリ名と1対1で対応する（0 = circle, 1 = square）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Circle,
    Square,
}

impl Label {
    /// インデックス構築・評価時の列挙順（circle → square）
    pub const ALL: [Label; 2] = [Label::Circle, Label::Square];

    /// クラスID
    pub fn index(self) -> usize {
        match self {
            Label::Circle => 0,
            Label::Square => 1,
        }
    }

    /// クラスIDからラベルを取得
    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Label::Circle),
            1 => Some(Label::Square),
            _ => None,
        }
    }

    /// クラスディレクトリ名（CSVのラベル表記と同じ）
    pub fn dir_name(self) -> &'static str {
        match self {
            Label::Circle => "circle",
            Label::Square => "square",
        }
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.dir_name())
    }
}
