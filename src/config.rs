use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::models::fingerprint::DistanceMetric;

/// 默认配置文件路径
pub const CONFIG_PATH: &str = "config.yaml";

/// 图片归一化参数
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct NormalizeArgs {
    /// 工作分辨率宽度，高度按比例计算
    pub target_width: u32,
    /// CLAHE 裁剪系数
    pub clahe_clip_limit: f32,
    /// CLAHE 分块数量(每个方向)
    pub clahe_tiles: u32,
}

impl Default for NormalizeArgs {
    fn default() -> Self {
        Self {
            target_width: 800,
            clahe_clip_limit: 2.0,
            clahe_tiles: 8,
        }
    }
}

/// 二值化参数
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct BinarizeArgs {
    /// 二值化前是否做 3x3 高斯平滑
    pub gaussian_blur: bool,
    /// binary 和 binary_otsu 共用的固定阈值
    pub fixed_threshold: u8,
    /// 自适应阈值窗口边长，偶数会加1
    pub adaptive_block_size: u32,
    /// 自适应阈值的偏移量
    pub adaptive_offset: i16,
}

impl Default for BinarizeArgs {
    fn default() -> Self {
        Self {
            gaussian_blur: true,
            fixed_threshold: 70,
            adaptive_block_size: 11,
            adaptive_offset: 10,
        }
    }
}

/// 卡片分割参数
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct SegmentArgs {
    /// 多边形拟合容差占轮廓周长的比例
    pub approx_epsilon_ratio: f64,
    /// 摆正后卡片宽度
    pub card_width: u32,
    /// 摆正后卡片高度
    pub card_height: u32,
}

impl Default for SegmentArgs {
    fn default() -> Self {
        Self {
            approx_epsilon_ratio: 0.01,
            card_width: 476,
            card_height: 664,
        }
    }
}

/// 感知哈希参数
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct FingerprintArgs {
    /// 哈希边长，16 对应 256 bit
    pub hash_size: u32,
    /// DCT 输入图是 hash_size 的倍数
    pub highfreq_factor: u32,
}

impl Default for FingerprintArgs {
    fn default() -> Self {
        Self {
            hash_size: 16,
            highfreq_factor: 4,
        }
    }
}

/// 匹配参数
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct MatchingArgs {
    pub metric: DistanceMetric,
    /// 五个变体是否并行计算
    pub parallel: bool,
}

impl Default for MatchingArgs {
    fn default() -> Self {
        Self {
            metric: DistanceMetric::Arithmetic,
            parallel: true,
        }
    }
}

/// 配置参数
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub normalize: NormalizeArgs,
    pub binarize: BinarizeArgs,
    pub segment: SegmentArgs,
    pub fingerprint: FingerprintArgs,
    pub matching: MatchingArgs,
}

impl Config {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config = serde_yaml::from_str(yaml).context("Failed to parse config")?;
        Ok(config)
    }

    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Failed to open config file {}", path.display()))?;
        let reader = BufReader::new(file);
        let config = serde_yaml::from_reader(reader).context("Failed to parse config")?;
        Ok(config)
    }
}

// 全局配置单例，没有配置文件时使用默认值
pub static CONFIG: Lazy<Config> = Lazy::new(|| {
    if !Path::new(CONFIG_PATH).exists() {
        return Config::default();
    }
    match Config::from_yaml_file(CONFIG_PATH) {
        Ok(config) => config,
        Err(e) => {
            log::warn!("{e:#}, falling back to default config");
            Config::default()
        }
    }
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_constants() {
        let config = Config::default();
        assert_eq!(config.normalize.target_width, 800);
        assert_eq!(config.binarize.fixed_threshold, 70);
        assert_eq!(config.binarize.adaptive_block_size, 11);
        assert_eq!(config.binarize.adaptive_offset, 10);
        assert_eq!((config.segment.card_width, config.segment.card_height), (476, 664));
        assert_eq!(config.fingerprint.hash_size, 16);
        assert_eq!(config.matching.metric, DistanceMetric::Arithmetic);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = "binarize:\n  fixed_threshold: 90\nmatching:\n  metric: hamming\n";
        let config = Config::from_yaml_str(yaml).unwrap();
        assert_eq!(config.binarize.fixed_threshold, 90);
        assert_eq!(config.binarize.adaptive_offset, 10);
        assert_eq!(config.matching.metric, DistanceMetric::Hamming);
        assert!(config.matching.parallel);
        assert_eq!(config.normalize, NormalizeArgs::default());
    }

    #[test]
    fn test_bad_yaml() {
        assert!(Config::from_yaml_str("normalize: [1, 2").is_err());
    }
}
