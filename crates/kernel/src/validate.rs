//! Structural validation. Each check reports every violated rule at once.

use regex::Regex;
use std::sync::LazyLock;

use crate::registry::{KindSpec, MaterialSpec, StrikeOutcome, StrikeRule};

/// Two or more lowercase alphanumeric segments joined by `.`, `_` or `-`.
static MATERIAL_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]+(?:[._-][a-z0-9]+)+$").expect("material id pattern is valid")
});

pub(crate) fn validate_material(spec: &MaterialSpec) -> Result<(), Vec<String>> {
    let mut issues = Vec::new();
    if spec.id.is_empty() {
        issues.push("id/empty");
    } else if !MATERIAL_ID.is_match(&spec.id) {
        issues.push("id/invalid-format");
    }
    if spec.display_name.trim().is_empty() {
        issues.push("display-name/empty");
    }
    // Written to also reject NaN.
    if !(spec.hardness > 0.0) {
        issues.push("hardness/non-positive");
    }
    if let Some(drop) = &spec.drop {
        if drop.amount == 0 {
            issues.push("drop/amount");
        }
        if drop.id.is_empty() {
            issues.push("drop/id");
        }
    }
    finish(issues)
}

pub(crate) fn validate_kind(spec: &KindSpec) -> Result<(), Vec<String>> {
    let mut issues = Vec::new();
    if spec.id.is_empty() {
        issues.push("id/empty");
    }
    match &spec.server {
        None => issues.push("server/missing"),
        Some(server) if server.components.is_empty() => issues.push("server/components"),
        Some(_) => {}
    }
    finish(issues)
}

pub(crate) fn validate_strike_rule(rule: &StrikeRule) -> Result<(), Vec<String>> {
    let mut issues = Vec::new();
    if rule.tool.is_empty() {
        issues.push("tool/empty");
    }
    if rule.material.is_empty() {
        issues.push("material/empty");
    }
    if let StrikeOutcome::Removed { drops } = &rule.outcome {
        if drops.is_empty() {
            issues.push("drops/empty");
        }
        if drops.iter().any(|d| d.qty == 0 || d.id.is_empty()) {
            issues.push("drops/invalid");
        }
    }
    finish(issues)
}

fn finish(issues: Vec<&'static str>) -> Result<(), Vec<String>> {
    if issues.is_empty() {
        Ok(())
    } else {
        Err(issues.into_iter().map(String::from).collect())
    }
}
