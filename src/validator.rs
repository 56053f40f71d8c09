use serde::Serialize;

/// A structural problem found while validating a route tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    pub location: String,
    pub kind: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(location: impl Into<String>, kind: impl Into<String>, message: impl Into<String>) -> Self {
        ValidationIssue {
            location: location.into(),
            kind: kind.into(),
            message: message.into(),
        }
    }
}

/// Log every issue at error level
pub fn log_issues(controller: &str, issues: &[ValidationIssue]) {
    tracing::error!(
        controller = controller,
        issue_count = issues.len(),
        "Route tree validation failed"
    );
    for issue in issues {
        tracing::error!(
            kind = %issue.kind,
            location = %issue.location,
            "{}",
            issue.message
        );
    }
}
