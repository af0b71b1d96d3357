/// Registration failures. Returned as values, never panicked.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KernelError {
    #[error("material already registered: {id}")]
    MaterialAlreadyRegistered { id: String },
    #[error("invalid material {id}: {}", reasons.join(", "))]
    MaterialInvalid { id: String, reasons: Vec<String> },
    #[error("kind already registered: {id}")]
    KindAlreadyRegistered { id: String },
    #[error("invalid kind {id}: {}", reasons.join(", "))]
    KindInvalid { id: String, reasons: Vec<String> },
    #[error("invalid strike rule: {}", reasons.join(", "))]
    StrikeRuleInvalid { reasons: Vec<String> },
    #[error("strike rule already registered for {tool} x {material}")]
    StrikeRuleAlreadyRegistered { tool: String, material: String },
}

impl KernelError {
    /// Stable reason code, e.g. `material/already-registered`.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MaterialAlreadyRegistered { .. } => "material/already-registered",
            Self::MaterialInvalid { .. } => "material/invalid",
            Self::KindAlreadyRegistered { .. } => "kind/already-registered",
            Self::KindInvalid { .. } => "kind/invalid",
            Self::StrikeRuleInvalid { .. } => "strike-rule/invalid",
            Self::StrikeRuleAlreadyRegistered { .. } => "strike-rule/already-registered",
        }
    }

    /// Violated rule names for the `invalid` variants; empty otherwise.
    pub fn reasons(&self) -> &[String] {
        match self {
            Self::MaterialInvalid { reasons, .. }
            | Self::KindInvalid { reasons, .. }
            | Self::StrikeRuleInvalid { reasons } => reasons,
            _ => &[],
        }
    }
}
