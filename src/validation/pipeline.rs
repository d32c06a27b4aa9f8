use crate::error::AppError;
use serde::Serialize;
use serde_json::Value;

/// One violated rule.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Violation {
    /// Machine-readable rule identifier, e.g. `custom_bounds.order`.
    pub rule: &'static str,
    pub message: String,
    /// The offending part of the input, when there is one to point at.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl Violation {
    pub fn new(rule: &'static str, message: impl Into<String>) -> Self {
        Self {
            rule,
            message: message.into(),
            value: None,
        }
    }

    pub fn with_value(rule: &'static str, message: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            rule,
            message: message.into(),
            value: Some(value.into()),
        }
    }
}

/// Outcome of running a pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Accepted,
    /// Never empty.
    Rejected(Vec<Violation>),
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Accepted)
    }

    pub fn violations(&self) -> &[Violation] {
        match self {
            Verdict::Accepted => &[],
            Verdict::Rejected(violations) => violations,
        }
    }

    pub fn into_result(self) -> Result<(), AppError> {
        match self {
            Verdict::Accepted => Ok(()),
            Verdict::Rejected(violations) => Err(AppError::Validation(violations)),
        }
    }
}

/// Collects violations for the rule currently being evaluated.
pub struct Report<'r> {
    rule: &'static str,
    out: &'r mut Vec<Violation>,
}

impl Report<'_> {
    pub fn violation(&mut self, message: impl Into<String>) {
        self.out.push(Violation::new(self.rule, message));
    }

    pub fn violation_with(&mut self, message: impl Into<String>, value: impl Into<Value>) {
        self.out.push(Violation::with_value(self.rule, message, value));
    }
}

type Rule<'a, I> = Box<dyn Fn(&I, &mut Report<'_>) + Send + Sync + 'a>;

/// An ordered set of independent rules over one input type.
///
/// Rules may borrow read-only lookups (compound database, store) for the
/// lifetime `'a`. Evaluation has no side effects and never stops early; a rule
/// that depends on a structural precondition checks it itself and stays silent
/// for entries that are already malformed.
pub struct Pipeline<'a, I: ?Sized> {
    name: &'static str,
    rules: Vec<(&'static str, Rule<'a, I>)>,
}

impl<'a, I: ?Sized> Pipeline<'a, I> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            rules: Vec::new(),
        }
    }

    pub fn rule<F>(mut self, id: &'static str, check: F) -> Self
    where
        F: Fn(&I, &mut Report<'_>) + Send + Sync + 'a,
    {
        self.rules.push((id, Box::new(check)));
        self
    }

    pub fn rule_ids(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.rules.iter().map(|(id, _)| *id)
    }

    pub fn evaluate(&self, input: &I) -> Verdict {
        let mut violations = Vec::new();

        for (id, check) in &self.rules {
            let mut report = Report {
                rule: *id,
                out: &mut violations,
            };
            check(input, &mut report);
        }

        if violations.is_empty() {
            Verdict::Accepted
        } else {
            tracing::debug!(
                pipeline = self.name,
                violations = violations.len(),
                "Input rejected"
            );
            Verdict::Rejected(violations)
        }
    }
}
