//! Reject-reason construction.

use std::fmt;

use hdq_model::ReasonLabels;

/// Separator placed between reason tokens.
pub const REASON_SEPARATOR: &str = "; ";

/// Ordered reason tokens for one rejected row.
///
/// Tokens always appear in the same order: missing fields, invalid height,
/// invalid weight. When none applies the fallback token is used, so a built
/// reason is never empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RejectReason {
    tokens: Vec<String>,
}

impl RejectReason {
    pub fn build(
        missing_fields: &[&str],
        height_invalid: bool,
        weight_invalid: bool,
        labels: &ReasonLabels,
    ) -> Self {
        let mut tokens = Vec::new();
        if !missing_fields.is_empty() {
            tokens.push(format!(
                "{}{}",
                labels.missing_fields,
                missing_fields.join(", ")
            ));
        }
        if height_invalid {
            tokens.push(labels.invalid_height.clone());
        }
        if weight_invalid {
            tokens.push(labels.invalid_weight.clone());
        }
        if tokens.is_empty() {
            tokens.push(labels.fallback.clone());
        }
        Self { tokens }
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn render(&self) -> String {
        self.tokens.join(REASON_SEPARATOR)
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_follow_fixed_order() {
        let labels = ReasonLabels::default();
        let reason = RejectReason::build(&["gender", "race_list"], true, true, &labels);
        assert_eq!(
            reason.render(),
            "Missing fields: gender, race_list; Invalid height value; Invalid weight value"
        );
        assert_eq!(reason.tokens().len(), 3);
    }

    #[test]
    fn fallback_when_nothing_applies() {
        let labels = ReasonLabels::default();
        let reason = RejectReason::build(&[], false, false, &labels);
        assert_eq!(reason.to_string(), "Failed validation");
    }

    #[test]
    fn weight_only() {
        let labels = ReasonLabels::default();
        let reason = RejectReason::build(&[], false, true, &labels);
        assert_eq!(reason.render(), "Invalid weight value");
    }
}
