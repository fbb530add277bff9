//! [`Analyzer`]: inspects a sandbox-built artifact for manufacturability —
//! watertightness, bounding box, DFM (design-for-manufacture) issues, and
//! FEA (finite element analysis) risk. The algorithmic half of fidelity
//! scoring consumes an [`AnalyzerReport`] directly; the real mesh/FEA
//! tooling lives outside this crate.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerReport {
    pub watertight: bool,
    pub volume_cm3: f64,
    /// (x, y, z) extents of the bounding box, in centimeters.
    pub bounding_box_cm: (f64, f64, f64),
    pub dfm_issues: Vec<String>,
    pub fea_risk: RiskLevel,
    pub build_volume_violation: bool,
}

#[async_trait]
pub trait Analyzer: Send + Sync {
    async fn analyze(&self, artifact_path: &str) -> Result<AnalyzerReport>;
}

/// Returns a canned, clean report regardless of `artifact_path`.
pub struct MockAnalyzer {
    report: AnalyzerReport,
}

impl MockAnalyzer {
    pub fn clean(bounding_box_cm: (f64, f64, f64)) -> Self {
        let volume_cm3 = bounding_box_cm.0 * bounding_box_cm.1 * bounding_box_cm.2 * 0.5;
        Self {
            report: AnalyzerReport {
                watertight: true,
                volume_cm3,
                bounding_box_cm,
                dfm_issues: vec![],
                fea_risk: RiskLevel::Low,
                build_volume_violation: false,
            },
        }
    }

    pub fn with_report(report: AnalyzerReport) -> Self {
        Self { report }
    }
}

#[async_trait]
impl Analyzer for MockAnalyzer {
    async fn analyze(&self, _artifact_path: &str) -> Result<AnalyzerReport> {
        Ok(self.report.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn clean_report_has_no_issues() {
        let analyzer = MockAnalyzer::clean((10.0, 5.0, 2.0));
        let report = analyzer.analyze("out/part.stl").await.unwrap();
        assert!(report.watertight);
        assert!(report.dfm_issues.is_empty());
        assert_eq!(report.fea_risk, RiskLevel::Low);
    }
}
