use std::fmt;

use serde::{Deserialize, Serialize};

/// 二值化策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinarizePolicy {
    /// 全局 Otsu 阈值
    Otsu,
    /// 固定阈值
    Binary,
    /// 固定阈值与 Otsu 阈值同时满足
    BinaryOtsu,
    /// 局部高斯加权均值阈值
    Adaptive,
}

/// 指纹来源，声明顺序即平局时的优先级
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    Original,
    Otsu,
    BinaryOtsu,
    Binary,
    Adaptive,
}

impl Variant {
    pub const ALL: [Variant; 5] = [
        Variant::Original,
        Variant::Otsu,
        Variant::BinaryOtsu,
        Variant::Binary,
        Variant::Adaptive,
    ];

    /// 原图没有二值化策略
    pub fn policy(self) -> Option<BinarizePolicy> {
        match self {
            Variant::Original => None,
            Variant::Otsu => Some(BinarizePolicy::Otsu),
            Variant::BinaryOtsu => Some(BinarizePolicy::BinaryOtsu),
            Variant::Binary => Some(BinarizePolicy::Binary),
            Variant::Adaptive => Some(BinarizePolicy::Adaptive),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Variant::Original => "original",
            Variant::Otsu => "otsu",
            Variant::BinaryOtsu => "binary_otsu",
            Variant::Binary => "binary",
            Variant::Adaptive => "adaptive",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
