//! Error types for board generation

use thiserror::Error;

use crate::validate::ValidationIssue;

/// Errors that can occur during board generation
#[derive(Debug, Clone, Error)]
pub enum MapGenError {
    /// Configuration validation failed
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Triangulation was asked to run on fewer than three points
    #[error("insufficient points for triangulation: need at least 3, got {found}")]
    InsufficientPoints {
        /// Number of points that were supplied
        found: usize,
    },

    /// A regularization round produced an empty triangulation
    #[error("triangulation collapsed during regularization round {iteration}")]
    TriangulationCollapsed {
        /// Zero-based regularization round that collapsed
        iteration: usize,
    },

    /// The assembled graph violates one or more structural invariants
    #[error("validation failed with {} issue(s): {}", .0.len(), summarize(.0))]
    ValidationFailed(Vec<ValidationIssue>),

    /// Both the requested generator and the hex fallback failed
    #[error("generation exhausted: primary generator failed ({primary}); fallback failed ({fallback})")]
    GenerationExhausted {
        /// Error from the requested generator
        primary: Box<MapGenError>,
        /// Error from the hex-grid fallback
        fallback: Box<MapGenError>,
    },
}

impl MapGenError {
    /// Whether the irregular generator may recover from this error by
    /// falling back to the hex-grid generator
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            MapGenError::ValidationFailed(_)
                | MapGenError::InsufficientPoints { .. }
                | MapGenError::TriangulationCollapsed { .. }
        )
    }

    /// Validation issues carried by this error, if any
    pub fn validation_issues(&self) -> &[ValidationIssue] {
        match self {
            MapGenError::ValidationFailed(issues) => issues,
            _ => &[],
        }
    }
}

fn summarize(issues: &[ValidationIssue]) -> String {
    const SHOWN: usize = 3;
    let mut parts: Vec<String> = issues.iter().take(SHOWN).map(|i| i.to_string()).collect();
    if issues.len() > SHOWN {
        parts.push(format!("and {} more", issues.len() - SHOWN));
    }
    parts.join("; ")
}

/// Result type alias for board generation
pub type Result<T> = std::result::Result<T, MapGenError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_errors() {
        assert!(MapGenError::InsufficientPoints { found: 2 }.is_recoverable());
        assert!(MapGenError::TriangulationCollapsed { iteration: 3 }.is_recoverable());
        assert!(MapGenError::ValidationFailed(vec![]).is_recoverable());
        assert!(!MapGenError::InvalidConfig("bad".into()).is_recoverable());
    }

    #[test]
    fn test_validation_message_lists_issues() {
        let err = MapGenError::ValidationFailed(vec![
            ValidationIssue::DuplicateTileId(1),
            ValidationIssue::DuplicateNodeId(2),
            ValidationIssue::DuplicateEdgeId(3),
            ValidationIssue::Disconnected { reached: 1, total: 4 },
        ]);
        let message = err.to_string();
        assert!(message.contains("4 issue(s)"));
        assert!(message.contains("and 1 more"));
        assert_eq!(err.validation_issues().len(), 4);
    }

    #[test]
    fn test_exhausted_wraps_both_errors() {
        let err = MapGenError::GenerationExhausted {
            primary: Box::new(MapGenError::InsufficientPoints { found: 1 }),
            fallback: Box::new(MapGenError::ValidationFailed(vec![])),
        };
        let message = err.to_string();
        assert!(message.contains("need at least 3"));
        assert!(message.contains("validation failed"));
        assert!(!err.is_recoverable());
    }
}
