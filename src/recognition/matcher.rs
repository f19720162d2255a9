use log::{debug, warn};

use crate::error::{DetectionError, DetectionResult};
use crate::models::catalog::CatalogLookup;
use crate::models::fingerprint::{DistanceMetric, Fingerprint};
use crate::models::match_result::{MatchResult, VariantFailure};
use crate::models::variant::Variant;

/// 每个变体分别查库。
/// 单个变体查询出错或没有结果只记为失败，不影响其他变体。
pub fn match_variants(
    fingerprints: &[(Variant, Fingerprint)],
    catalog: &dyn CatalogLookup,
    metric: DistanceMetric,
) -> (Vec<MatchResult>, Vec<VariantFailure>) {
    let mut ordered: Vec<(Variant, Fingerprint)> = fingerprints.to_vec();
    // 按变体优先级排序，保证平局规则和输入顺序无关
    ordered.sort_by_key(|(variant, _)| *variant);

    let mut matches = Vec::new();
    let mut failures = Vec::new();
    for (variant, fingerprint) in ordered {
        match catalog.nearest(&fingerprint, metric) {
            Ok(Some(nearest)) => {
                let distance = fingerprint.distance(&nearest.entry.fingerprint, metric);
                debug!("variant {variant}: nearest {} at distance {distance}", nearest.entry.id);
                matches.push(MatchResult {
                    variant,
                    fingerprint,
                    entry: nearest.entry,
                    distance,
                });
            }
            Ok(None) => {
                failures.push(VariantFailure {
                    variant,
                    reason: "catalog returned no candidate".to_string(),
                });
            }
            Err(e) => {
                warn!("catalog lookup for variant {variant} failed: {e:#}");
                failures.push(VariantFailure {
                    variant,
                    reason: format!("catalog lookup failed: {e:#}"),
                });
            }
        }
    }
    (matches, failures)
}

/// 距离最小的匹配，距离相同取优先级高的变体
pub fn pick_best(matches: &[MatchResult]) -> Option<&MatchResult> {
    let mut best: Option<&MatchResult> = None;
    for m in matches.iter() {
        let better = match best {
            None => true,
            Some(b) => m.distance < b.distance || (m.distance == b.distance && m.variant < b.variant),
        };
        if better {
            best = Some(m);
        }
    }
    best
}

/// 五个指纹分别查最近邻，取全局最小距离
pub fn select_best(
    fingerprints: &[(Variant, Fingerprint)],
    catalog: &dyn CatalogLookup,
    metric: DistanceMetric,
) -> DetectionResult<MatchResult> {
    if fingerprints.is_empty() {
        return Err(DetectionError::NoMatch);
    }
    let (matches, _failures) = match_variants(fingerprints, catalog, metric);
    pick_best(&matches).cloned().ok_or(DetectionError::NoMatch)
}
