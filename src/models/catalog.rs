//! 卡片指纹库
//!
//! 指纹库由外部构建，这里只定义最近邻查询的接口和一个内存实现。

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{Context, Result};
use image::DynamicImage;
use serde::{Deserialize, Serialize};

use super::fingerprint::{Distance, DistanceMetric, Fingerprint};
use crate::config::FingerprintArgs;
use crate::recognition::fingerprint::fingerprint_with;

/// 库中的一张卡片
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: String,
    pub fingerprint: Fingerprint,
}

impl CatalogEntry {
    pub fn new<S: Into<String>>(id: S, fingerprint: Fingerprint) -> Self {
        Self {
            id: id.into(),
            fingerprint,
        }
    }

    /// 用标准卡图生成库条目
    pub fn from_card_image<S: Into<String>>(
        id: S,
        image: &DynamicImage,
        args: &FingerprintArgs,
    ) -> Result<Self> {
        let fingerprint = fingerprint_with(image, args)?;
        Ok(Self::new(id, fingerprint))
    }
}

/// 最近邻查询结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nearest {
    pub entry: CatalogEntry,
    pub distance: Distance,
}

/// 最近邻查询能力。
/// 距离相同时必须确定性地返回同一条目。
pub trait CatalogLookup: Sync {
    fn nearest(&self, fingerprint: &Fingerprint, metric: DistanceMetric) -> Result<Option<Nearest>>;
}

/// 只追加的内存指纹库，线性扫描，距离相同取先插入的
#[derive(Debug, Default, Clone)]
pub struct InMemoryCatalog {
    entries: Vec<CatalogEntry>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, entry: CatalogEntry) {
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    /// JSON 数组，元素为 {"id": ..., "fingerprint": "<hex>"}
    pub fn from_json_str(json: &str) -> Result<Self> {
        let entries: Vec<CatalogEntry> =
            serde_json::from_str(json).context("Failed to parse catalog json")?;
        Ok(Self { entries })
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Failed to open catalog file {}", path.display()))?;
        let entries: Vec<CatalogEntry> = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse catalog file {}", path.display()))?;
        Ok(Self { entries })
    }
}

impl FromIterator<CatalogEntry> for InMemoryCatalog {
    fn from_iter<I: IntoIterator<Item = CatalogEntry>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl CatalogLookup for InMemoryCatalog {
    fn nearest(&self, fingerprint: &Fingerprint, metric: DistanceMetric) -> Result<Option<Nearest>> {
        let mut best: Option<(&CatalogEntry, Distance)> = None;
        for entry in self.entries.iter() {
            let distance = fingerprint.distance(&entry.fingerprint, metric);
            // 严格小于才替换，保证平局时取先插入的
            if best.map_or(true, |(_, d)| distance < d) {
                best = Some((entry, distance));
            }
        }
        Ok(best.map(|(entry, distance)| Nearest {
            entry: entry.clone(),
            distance,
        }))
    }
}
