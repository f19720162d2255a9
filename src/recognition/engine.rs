use image::{DynamicImage, RgbImage};
use log::{debug, info, warn};
use rayon::prelude::*;

use crate::config::{Config, CONFIG};
use crate::error::{DetectionError, DetectionResult};
use crate::models::catalog::CatalogLookup;
use crate::models::engine_rec::NormalizedImage;
use crate::models::fingerprint::Fingerprint;
use crate::models::match_result::{Identification, MatchResult, VariantFailure};
use crate::models::variant::Variant;
use crate::my_utils::image::normalize;
use crate::my_utils::io::decode_image;
use crate::recognition::binarize::binarize;
use crate::recognition::fingerprint::fingerprint_with;
use crate::recognition::matcher::{match_variants, pick_best};
use crate::recognition::segment::{segment, CardBoundaryStrategy, SecondLargestContour};

/// 每个变体的指纹结果，按 Variant::ALL 的顺序排列
pub type VariantFingerprints = Vec<(Variant, DetectionResult<Fingerprint>)>;

pub struct Engine {
    config: Config,
    strategy: Box<dyn CardBoundaryStrategy>,
}

impl Default for Engine {
    fn default() -> Self {
        Engine::new(CONFIG.clone())
    }
}

impl Engine {
    pub fn new(config: Config) -> Self {
        Engine {
            config,
            strategy: Box::new(SecondLargestContour),
        }
    }

    /// 替换卡片边界的定位方法
    pub fn with_strategy(config: Config, strategy: Box<dyn CardBoundaryStrategy>) -> Self {
        Engine { config, strategy }
    }

    /// 原图 + 四种二值化各算一个指纹。
    /// 整图级别的错误(空图、归一化失败)直接返回，单个变体的错误留在结果里。
    pub fn fingerprint_variants(&self, raw: &DynamicImage) -> DetectionResult<VariantFingerprints> {
        if raw.width() == 0 || raw.height() == 0 {
            return Err(DetectionError::InvalidImage(format!(
                "empty image {}x{}",
                raw.width(),
                raw.height()
            )));
        }
        let normalized = normalize(raw, &self.config.normalize)?;
        let source = raw.to_rgb8();

        let compute = |variant: Variant| (variant, self.fingerprint_variant(variant, raw, &source, &normalized));
        // rayon 的 collect 保持输入顺序，结果和串行一致
        let results: VariantFingerprints = if self.config.matching.parallel {
            Variant::ALL.par_iter().map(|v| compute(*v)).collect()
        } else {
            Variant::ALL.iter().map(|v| compute(*v)).collect()
        };
        Ok(results)
    }

    fn fingerprint_variant(
        &self,
        variant: Variant,
        raw: &DynamicImage,
        source: &RgbImage,
        normalized: &NormalizedImage,
    ) -> DetectionResult<Fingerprint> {
        let fp_args = &self.config.fingerprint;
        let to_failure = |e: anyhow::Error| DetectionError::FingerprintFailure {
            variant,
            reason: format!("{e:#}"),
        };
        match variant.policy() {
            None => fingerprint_with(raw, fp_args).map_err(to_failure),
            Some(policy) => {
                let binarized = binarize(normalized, policy, &self.config.binarize);
                if let Some(t) = binarized.threshold {
                    debug!("variant {variant}: threshold {t}");
                }
                let card = segment(
                    &binarized,
                    source,
                    normalized.scale,
                    self.strategy.as_ref(),
                    &self.config.segment,
                )?;
                fingerprint_with(&DynamicImage::ImageRgb8(card), fp_args).map_err(to_failure)
            }
        }
    }

    /// 识别，返回最优匹配以及每个变体的匹配和失败原因
    pub fn identify_detailed(&self, raw: &DynamicImage, catalog: &dyn CatalogLookup) -> DetectionResult<Identification> {
        let results = self.fingerprint_variants(raw)?;

        let mut fingerprints = Vec::new();
        let mut failures = Vec::new();
        for (variant, result) in results {
            match result {
                Ok(fp) => fingerprints.push((variant, fp)),
                Err(e) => {
                    warn!("variant {variant} dropped: {e}");
                    failures.push(VariantFailure { variant, reason: e.to_string() });
                }
            }
        }
        if fingerprints.is_empty() {
            warn!("all {} variants failed", failures.len());
            return Err(DetectionError::NoMatch);
        }

        let (variants, lookup_failures) = match_variants(&fingerprints, catalog, self.config.matching.metric);
        failures.extend(lookup_failures);
        failures.sort_by_key(|f| f.variant);

        let best = pick_best(&variants).cloned().ok_or(DetectionError::NoMatch)?;
        info!(
            "matched {} via {} at distance {} ({} variants, {} failed)",
            best.entry.id,
            best.variant,
            best.distance,
            variants.len(),
            failures.len()
        );
        Ok(Identification { best, variants, failures })
    }

    pub fn identify(&self, raw: &DynamicImage, catalog: &dyn CatalogLookup) -> DetectionResult<MatchResult> {
        self.identify_detailed(raw, catalog).map(|id| id.best)
    }

    /// 解码后识别，解码失败单独报 Decode
    pub fn identify_bytes(&self, bytes: &[u8], catalog: &dyn CatalogLookup) -> DetectionResult<MatchResult> {
        let raw = decode_image(bytes)?;
        self.identify(&raw, catalog)
    }
}

/// 使用全局配置识别
pub fn identify(raw: &DynamicImage, catalog: &dyn CatalogLookup) -> DetectionResult<MatchResult> {
    Engine::default().identify(raw, catalog)
}
