// ABOUTME: Non-fatal deploy problems collected alongside the result.
// ABOUTME: Route failures, undeletable artifacts and ledger resets end up in the report.

use serde::Serialize;
use std::fmt;

/// Warnings gathered while a deploy runs. Each one is also logged.
#[derive(Debug, Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    pub fn warn(&mut self, warning: Warning) {
        tracing::warn!(kind = ?warning.kind, "{}", warning.message);
        self.warnings.push(warning);
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn into_warnings(self) -> Vec<Warning> {
        self.warnings
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    pub fn new(kind: WarningKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn route_registration(message: impl Into<String>) -> Self {
        Self::new(WarningKind::RouteRegistration, message)
    }

    pub fn artifact_removal(message: impl Into<String>) -> Self {
        Self::new(WarningKind::ArtifactRemoval, message)
    }

    pub fn ledger_reset(message: impl Into<String>) -> Self {
        Self::new(WarningKind::LedgerReset, message)
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum WarningKind {
    /// The proxy route could not be checked or added.
    RouteRegistration,
    /// A superseded artifact directory could not be deleted.
    ArtifactRemoval,
    /// An unparseable ledger was replaced by an empty one.
    LedgerReset,
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WarningKind::RouteRegistration => "route registration",
            WarningKind::ArtifactRemoval => "artifact removal",
            WarningKind::LedgerReset => "ledger reset",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_in_order() {
        let mut diag = Diagnostics::default();
        assert!(!diag.has_warnings());

        diag.warn(Warning::route_registration("proxy unreachable"));
        diag.warn(Warning::artifact_removal("permission denied"));

        let kinds: Vec<_> = diag.warnings().iter().map(|w| w.kind).collect();
        assert_eq!(
            kinds,
            vec![WarningKind::RouteRegistration, WarningKind::ArtifactRemoval]
        );
        assert_eq!(diag.into_warnings().len(), 2);
    }

    #[test]
    fn display_names_the_kind() {
        assert_eq!(
            Warning::ledger_reset("bitswan.yaml unparseable").to_string(),
            "ledger reset: bitswan.yaml unparseable"
        );
    }

    #[test]
    fn kind_serializes_kebab_case() {
        let json = serde_json::to_string(&Warning::ledger_reset("reset")).unwrap();
        assert_eq!(json, r#"{"kind":"ledger-reset","message":"reset"}"#);
    }
}
