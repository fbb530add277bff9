//! Algorithmic fidelity scoring (spec §4.9): deterministic, dependency-free
//! scoring derived from a [`SandboxEval`] and the supervisor's
//! `critical_dimensions`. No LLM call, no randomness — the same inputs
//! always produce the same score, which is what lets the blended score's
//! algorithmic half be tested without mocking a judge model.

use crate::model::{CriticalDimensions, RiskLevel, SandboxEval};

/// One critical-dimension's name mapped onto a bounding-box axis, or
/// `None` if the name's suffix doesn't match any known convention.
fn map_dimension_to_axis(name: &str, bbox: (f64, f64, f64)) -> Option<f64> {
    let (size_x, size_y, size_z) = bbox;
    let name = name.strip_suffix("_mm").unwrap_or(name);
    if name.ends_with("_length") || name.ends_with("_x") {
        Some(size_x)
    } else if name.ends_with("_width") || name.ends_with("_y") {
        Some(size_y)
    } else if name.ends_with("_height") || name.ends_with("_z") {
        Some(size_z)
    } else if name.ends_with("_diameter") {
        Some(size_x.max(size_y))
    } else {
        None
    }
}

/// Per-dimension match score plus an overall mean. Returns `(overall, true)`
/// when at least one dimension mapped; `(50.0, false)` when none did (the
/// spec's default-with-a-note case — the `bool` tells the caller whether to
/// log that note).
pub fn dimension_match_score(critical_dimensions: &CriticalDimensions, bbox: (f64, f64, f64)) -> (f64, bool) {
    let mut scores = Vec::new();
    for (name, expected) in critical_dimensions {
        if let Some(actual) = map_dimension_to_axis(name, bbox) {
            if *expected != 0.0 {
                let score = (1.0 - (actual - expected).abs() / expected).max(0.0) * 100.0;
                scores.push(score);
            }
        }
    }
    if scores.is_empty() {
        (50.0, false)
    } else {
        (scores.iter().sum::<f64>() / scores.len() as f64, true)
    }
}

/// Volume-vs-bounding-box sanity score.
pub fn volume_sanity_score(volume_cm3: f64, bbox: (f64, f64, f64), watertight: bool) -> f64 {
    if watertight && volume_cm3 <= 0.0 {
        return 0.0;
    }
    let bbox_volume = bbox.0 * bbox.1 * bbox.2;
    if bbox_volume <= 0.0 {
        return 0.0;
    }
    let ratio = volume_cm3 / bbox_volume;
    if (0.10..=1.0).contains(&ratio) {
        100.0
    } else if ratio < 0.10 {
        (ratio / 0.10) * 100.0
    } else {
        (100.0 - (ratio - 1.0) * 100.0).max(0.0)
    }
}

/// Design-for-manufacture deduction score.
pub fn dfm_score(watertight: bool, build_volume_violation: bool, issue_count: usize, fea_risk: Option<RiskLevel>) -> f64 {
    let mut score: f64 = 100.0;
    if !watertight {
        score -= 40.0;
    }
    if build_volume_violation {
        score -= 30.0;
    }
    score -= 10.0 * issue_count as f64;
    if matches!(fea_risk, Some(RiskLevel::High)) {
        score -= 15.0;
    }
    score.clamp(0.0, 100.0)
}

/// The full algorithmic score: `0.40*dim + 0.20*volume + 0.40*dfm`.
pub fn algorithmic_score(eval: &SandboxEval, critical_dimensions: &CriticalDimensions) -> f64 {
    let (dim, _mapped_any) = dimension_match_score(critical_dimensions, eval.bounding_box_cm);
    let volume = volume_sanity_score(eval.volume_cm3, eval.bounding_box_cm, eval.is_watertight);
    let dfm = dfm_score(eval.is_watertight, eval.build_volume_violation, eval.dfm_issues.len(), eval.risk_level);
    0.40 * dim + 0.20 * volume + 0.40 * dfm
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn dimension_match_scores_exact_match_as_100() {
        let mut dims = HashMap::new();
        dims.insert("side_length_mm".to_string(), 50.0);
        let (score, mapped) = dimension_match_score(&dims, (50.0, 50.0, 50.0));
        assert!(mapped);
        assert!((score - 100.0).abs() < 1e-9);
    }

    #[test]
    fn dimension_match_defaults_when_nothing_maps() {
        let mut dims = HashMap::new();
        dims.insert("mystery_field".to_string(), 10.0);
        let (score, mapped) = dimension_match_score(&dims, (50.0, 50.0, 50.0));
        assert!(!mapped);
        assert_eq!(score, 50.0);
    }

    #[test]
    fn diameter_maps_to_max_of_x_and_y() {
        let mut dims = HashMap::new();
        dims.insert("hole_diameter".to_string(), 20.0);
        let (score, mapped) = dimension_match_score(&dims, (20.0, 15.0, 5.0));
        assert!(mapped);
        assert!((score - 100.0).abs() < 1e-9);
    }

    #[test]
    fn volume_sanity_flat_100_in_ideal_range() {
        assert_eq!(volume_sanity_score(50.0, (10.0, 10.0, 1.0), true), 100.0);
    }

    #[test]
    fn volume_sanity_penalizes_too_sparse() {
        let score = volume_sanity_score(5.0, (10.0, 10.0, 1.0), true);
        assert!((score - 50.0).abs() < 1e-9);
    }

    #[test]
    fn volume_sanity_zero_for_watertight_but_no_volume() {
        assert_eq!(volume_sanity_score(0.0, (10.0, 10.0, 1.0), true), 0.0);
    }

    #[test]
    fn dfm_score_applies_all_deductions() {
        let score = dfm_score(false, true, 2, Some(RiskLevel::High));
        // 100 - 40 - 30 - 20 - 15 = -5, clamped to 0
        assert_eq!(score, 0.0);
    }

    #[test]
    fn dfm_score_perfect_when_clean() {
        assert_eq!(dfm_score(true, false, 0, Some(RiskLevel::Low)), 100.0);
    }

    #[test]
    fn algorithmic_score_blends_the_three_components() {
        let mut dims = HashMap::new();
        dims.insert("side_length_mm".to_string(), 50.0);
        let eval = SandboxEval {
            execution_success: true,
            is_watertight: true,
            volume_cm3: 50.0,
            bounding_box_cm: (50.0, 50.0, 50.0),
            ..Default::default()
        };
        let score = algorithmic_score(&eval, &dims);
        // dim=100, volume: ratio=50/125000≈0.0004 -> low, dfm=100
        assert!(score > 40.0 && score < 100.0);
    }
}
