//! Domain models for compatibility analysis

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user's PC hardware profile.
///
/// Owned by the user-profile service; the analyzer only ever reads it.
/// Once captured into a cache entry it acts as an immutable snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardwareProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub gpu: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ram: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub os: Option<String>,
}

impl HardwareProfile {
    /// Whether the profile carries enough detail to justify an AI call.
    /// At least one of cpu/gpu must be set.
    pub fn is_analyzable(&self) -> bool {
        self.cpu.is_some() || self.gpu.is_some()
    }

    /// Field-wise snapshot equality on cpu/gpu/ram.
    ///
    /// The os field is informational and does not participate in staleness:
    /// a verdict is about silicon, not the OS string the user typed.
    pub fn matches_snapshot(&self, snapshot: &HardwareProfile) -> bool {
        self.cpu == snapshot.cpu && self.gpu == snapshot.gpu && self.ram == snapshot.ram
    }
}

/// Performance tier predicted by the AI verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PerformanceTier {
    Low,
    Medium,
    High,
    Ultra,
}

/// Component limiting performance, if any
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bottleneck {
    Cpu,
    Gpu,
    Ram,
    None,
}

/// Structured compatibility outcome.
///
/// All four fields are mandatory at deserialization: a response missing any
/// of them fails to parse and is rejected at the AI boundary rather than
/// stored half-filled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    pub can_run: bool,
    pub performance_tier: PerformanceTier,
    pub bottleneck: Bottleneck,
    pub recommendation: String,
}

/// A game's canonical requirements record, resolved through the catalog
/// metadata service and the storefront API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameRequirements {
    /// Opaque catalog game identifier
    pub game_id: String,

    /// Canonical game name from the catalog
    pub name: String,

    /// External storefront identifier the requirements were fetched from
    pub store_app_id: String,

    /// Minimum requirements text (implementation-defined markup)
    pub minimum: String,

    /// Recommended requirements text, when published
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommended: Option<String>,
}

/// Result of an `evaluate` call
#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    pub verdict: Verdict,

    /// True when the verdict was served from cache without upstream calls
    pub cached: bool,
}

/// Result of the read-only `status` call.
///
/// Lets the caller decide whether to offer a "re-analyze" affordance
/// without spending an AI call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisStatus {
    pub has_cache: bool,

    /// True when a cached entry exists but its snapshot no longer matches
    /// the user's current hardware profile
    pub specs_changed: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub verdict: Option<Verdict>,
}

/// A stored analysis result together with the profile snapshot that
/// produced it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisCacheEntry {
    pub user_id: String,
    pub game_id: String,
    pub game_name: String,
    pub snapshot: HardwareProfile,
    pub verdict: Verdict,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(cpu: &str, gpu: &str, ram: &str) -> HardwareProfile {
        HardwareProfile {
            cpu: Some(cpu.to_string()),
            gpu: Some(gpu.to_string()),
            ram: Some(ram.to_string()),
            os: None,
        }
    }

    #[test]
    fn test_snapshot_match_ignores_os() {
        let mut a = profile("Ryzen 5 5600X", "RTX 3060", "16GB");
        let b = a.clone();
        a.os = Some("Windows 11".to_string());
        assert!(a.matches_snapshot(&b));
    }

    #[test]
    fn test_snapshot_mismatch_on_any_component() {
        let base = profile("Ryzen 5 5600X", "RTX 3060", "16GB");

        let mut cpu_changed = base.clone();
        cpu_changed.cpu = Some("i5-12400F".to_string());
        assert!(!cpu_changed.matches_snapshot(&base));

        let mut gpu_changed = base.clone();
        gpu_changed.gpu = Some("GTX 1050".to_string());
        assert!(!gpu_changed.matches_snapshot(&base));

        let mut ram_changed = base.clone();
        ram_changed.ram = Some("8GB".to_string());
        assert!(!ram_changed.matches_snapshot(&base));
    }

    #[test]
    fn test_analyzable_requires_cpu_or_gpu() {
        assert!(!HardwareProfile::default().is_analyzable());

        let ram_only = HardwareProfile {
            ram: Some("16GB".to_string()),
            ..Default::default()
        };
        assert!(!ram_only.is_analyzable());

        let cpu_only = HardwareProfile {
            cpu: Some("Ryzen 5 2600".to_string()),
            ..Default::default()
        };
        assert!(cpu_only.is_analyzable());
    }

    #[test]
    fn test_verdict_parses_camel_case() {
        let json = r#"{
            "canRun": true,
            "performanceTier": "high",
            "bottleneck": "none",
            "recommendation": "Runs well at 1440p."
        }"#;
        let v: Verdict = serde_json::from_str(json).unwrap();
        assert!(v.can_run);
        assert_eq!(v.performance_tier, PerformanceTier::High);
        assert_eq!(v.bottleneck, Bottleneck::None);
    }

    #[test]
    fn test_verdict_rejects_missing_fields() {
        // bottleneck absent - must not parse into a partial verdict
        let json = r#"{
            "canRun": true,
            "performanceTier": "high",
            "recommendation": "ok"
        }"#;
        assert!(serde_json::from_str::<Verdict>(json).is_err());
    }

    #[test]
    fn test_verdict_rejects_unknown_tier() {
        let json = r#"{
            "canRun": false,
            "performanceTier": "potato",
            "bottleneck": "gpu",
            "recommendation": "upgrade"
        }"#;
        assert!(serde_json::from_str::<Verdict>(json).is_err());
    }
}
