//! Domain-specialized strategies.
//!
//! Each differs from the enhanced default only in prompt preamble,
//! thresholds, and fusion keyword lists; the orchestration state
//! machine never changes per domain.

use crate::{prompts, Phase, Strategy, StrategyConfig, StrategyMetadata};

fn domain_prompt(preamble: &str, phase: Phase) -> String {
    format!("{preamble}\n\n{}", prompts::default_prompt(phase))
}

// ---------------------------------------------------------------------------
// Software development
// ---------------------------------------------------------------------------

/// Specialization for engineering documentation and code questions.
pub struct SoftwareDevStrategy {
    metadata: StrategyMetadata,
    config: StrategyConfig,
}

impl SoftwareDevStrategy {
    pub fn new() -> Self {
        Self {
            metadata: StrategyMetadata {
                id: "software_dev".to_string(),
                version: "1".to_string(),
                domains: vec!["software_dev".to_string(), "engineering".to_string()],
                tags: [
                    "code", "api", "function", "bug", "deploy", "repository", "library",
                    "endpoint", "stack", "compile",
                ]
                .iter()
                .map(|s| s.to_string())
                .collect(),
                is_default: false,
                is_legacy: false,
            },
            config: StrategyConfig {
                fusion_keywords: [
                    "function", "class", "api", "endpoint", "config", "example",
                ]
                .iter()
                .map(|s| s.to_string())
                .collect(),
                fusion_keyword_boost: 1.1,
                ..StrategyConfig::default()
            },
        }
    }
}

impl Default for SoftwareDevStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for SoftwareDevStrategy {
    fn metadata(&self) -> &StrategyMetadata {
        &self.metadata
    }

    fn config(&self) -> &StrategyConfig {
        &self.config
    }

    fn prompt_for(&self, phase: Phase) -> String {
        domain_prompt(
            "You specialize in software engineering documentation. Prefer precise, \
             version-aware answers and include code identifiers verbatim.",
            phase,
        )
    }
}

// ---------------------------------------------------------------------------
// Legal
// ---------------------------------------------------------------------------

/// Specialization for contracts and legal documents. Boosts chunks
/// carrying clause/definition language and raises the length-penalty
/// floor so terse boilerplate fragments rank lower.
pub struct LegalStrategy {
    metadata: StrategyMetadata,
    config: StrategyConfig,
}

impl LegalStrategy {
    pub fn new() -> Self {
        Self {
            metadata: StrategyMetadata {
                id: "legal".to_string(),
                version: "1".to_string(),
                domains: vec!["legal".to_string()],
                tags: [
                    "contract", "clause", "liability", "agreement", "pursuant",
                    "indemnification", "termination", "warranty",
                ]
                .iter()
                .map(|s| s.to_string())
                .collect(),
                is_default: false,
                is_legacy: false,
            },
            config: StrategyConfig {
                confidence_threshold: 0.85,
                min_content_length: 100,
                fusion_keywords: [
                    "clause", "definition", "shall", "liability", "pursuant", "hereby",
                ]
                .iter()
                .map(|s| s.to_string())
                .collect(),
                fusion_keyword_boost: 1.15,
                ..StrategyConfig::default()
            },
        }
    }
}

impl Default for LegalStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for LegalStrategy {
    fn metadata(&self) -> &StrategyMetadata {
        &self.metadata
    }

    fn config(&self) -> &StrategyConfig {
        &self.config
    }

    fn prompt_for(&self, phase: Phase) -> String {
        domain_prompt(
            "You specialize in legal documents. Quote clause numbers and defined terms \
             exactly, and never paraphrase obligations.",
            phase,
        )
    }
}

// ---------------------------------------------------------------------------
// HR
// ---------------------------------------------------------------------------

/// Specialization for HR policies and procedures.
pub struct HrStrategy {
    metadata: StrategyMetadata,
    config: StrategyConfig,
}

impl HrStrategy {
    pub fn new() -> Self {
        Self {
            metadata: StrategyMetadata {
                id: "hr".to_string(),
                version: "1".to_string(),
                domains: vec!["hr".to_string(), "people_ops".to_string()],
                tags: [
                    "policy", "leave", "benefits", "onboarding", "payroll", "vacation",
                    "pto", "handbook",
                ]
                .iter()
                .map(|s| s.to_string())
                .collect(),
                is_default: false,
                is_legacy: false,
            },
            config: StrategyConfig {
                fusion_keywords: [
                    "policy", "procedure", "eligibility", "approval", "handbook",
                ]
                .iter()
                .map(|s| s.to_string())
                .collect(),
                fusion_keyword_boost: 1.1,
                ..StrategyConfig::default()
            },
        }
    }
}

impl Default for HrStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for HrStrategy {
    fn metadata(&self) -> &StrategyMetadata {
        &self.metadata
    }

    fn config(&self) -> &StrategyConfig {
        &self.config
    }

    fn prompt_for(&self, phase: Phase) -> String {
        domain_prompt(
            "You specialize in HR policies and procedures. State eligibility conditions \
             and approval steps explicitly, and name the governing policy.",
            phase,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_strategies_not_default_not_legacy() {
        for (id, meta) in [
            ("software_dev", SoftwareDevStrategy::new().metadata().clone()),
            ("legal", LegalStrategy::new().metadata().clone()),
            ("hr", HrStrategy::new().metadata().clone()),
        ] {
            assert_eq!(meta.id, id);
            assert!(!meta.is_default);
            assert!(!meta.is_legacy);
            assert!(!meta.domains.is_empty());
            assert!(!meta.tags.is_empty());
        }
    }

    #[test]
    fn test_legal_raises_length_floor() {
        let legal = LegalStrategy::new();
        let enhanced_floor = StrategyConfig::default().min_content_length;
        assert!(legal.config().min_content_length > enhanced_floor);
    }

    #[test]
    fn test_legal_fusion_keywords() {
        let legal = LegalStrategy::new();
        let fusion = legal.fusion_config();
        assert!(fusion.keywords.contains(&"clause".to_string()));
        assert!(fusion.keyword_boost > 1.0);
    }

    #[test]
    fn test_domain_prompts_keep_standard_shape() {
        // The preamble is prepended; the JSON contract stays intact.
        let prompt = HrStrategy::new().prompt_for(Phase::Analyze);
        assert!(prompt.contains("HR policies"));
        assert!(prompt.contains("intent_summary"));
        assert!(prompt.contains("{query}"));
    }

    #[test]
    fn test_software_dev_keyword_boost() {
        let fusion = SoftwareDevStrategy::new().fusion_config();
        assert!(fusion.keywords.contains(&"api".to_string()));
        assert_eq!(fusion.keyword_boost, 1.1);
    }
}
