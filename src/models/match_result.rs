/*
    输出结构
*/

use serde::Serialize;

use super::catalog::CatalogEntry;
use super::fingerprint::{Distance, Fingerprint};
use super::variant::Variant;

/// 单个变体的最近匹配
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchResult {
    pub variant: Variant,
    pub fingerprint: Fingerprint,
    pub entry: CatalogEntry,
    pub distance: Distance,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariantFailure {
    pub variant: Variant,
    pub reason: String,
}

/// 完整识别结果：最优匹配 + 每个变体的匹配 + 失败的变体
#[derive(Debug, Clone, Serialize)]
pub struct Identification {
    pub best: MatchResult,
    pub variants: Vec<MatchResult>,
    pub failures: Vec<VariantFailure>,
}
