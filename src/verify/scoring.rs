// src/verify/scoring.rs
//! Confidence and status from per-secondary hit counts. Pure functions.
//!
//! confidence = min(0.7·base + 0.3·weighted + diversity, 1.0)
//!   base      = min(total / saturation_hits, 1.0)
//!   weighted  = Σ hitsᵢ·wᵢ / max(total·(Σw)/N, 1)   (N = configured secondaries)
//!   diversity = diversity_bonus when ≥ 2 secondaries contributed a hit

use std::collections::BTreeMap;

use super::VerificationStatus;
use crate::config::VerificationConfig;

pub fn total_hits(counts: &BTreeMap<String, u32>) -> u32 {
    counts.values().sum()
}

/// `counts` holds one entry per configured secondary, zero included.
pub fn confidence(counts: &BTreeMap<String, u32>, cfg: &VerificationConfig) -> f32 {
    let total = total_hits(counts);
    if total == 0 {
        return 0.0;
    }
    let total_f = total as f32;
    let base = (total_f / cfg.saturation_hits.max(1) as f32).min(1.0);

    let contributing = counts.values().filter(|&&h| h > 0).count();
    let diversity = if contributing >= 2 {
        cfg.diversity_bonus
    } else {
        0.0
    };

    let n = counts.len().max(1) as f32;
    let weight_sum: f32 = counts.keys().map(|k| cfg.weight_for(k)).sum();
    let numerator: f32 = counts
        .iter()
        .map(|(k, &h)| h as f32 * cfg.weight_for(k))
        .sum();
    let weighted = numerator / (total_f * weight_sum / n).max(1.0);

    (0.7 * base + 0.3 * weighted + diversity).clamp(0.0, 1.0)
}

/// Strict criteria: total minimum, every per-secondary minimum, confidence
/// floor. Anything short of that with at least one hit is partial (when the
/// partial tier is on).
pub fn status_for(
    counts: &BTreeMap<String, u32>,
    confidence: f32,
    cfg: &VerificationConfig,
) -> VerificationStatus {
    let total = total_hits(counts);
    if total == 0 {
        return VerificationStatus::Unverified;
    }
    let per_source_ok = cfg
        .min_hits_per_source
        .iter()
        .all(|(name, &min)| counts.get(name).copied().unwrap_or(0) >= min);
    if total >= cfg.min_total_hits && per_source_ok && confidence >= cfg.min_confidence {
        VerificationStatus::Verified
    } else if cfg.partial_tier {
        VerificationStatus::PartiallyVerified
    } else {
        VerificationStatus::Unverified
    }
}
