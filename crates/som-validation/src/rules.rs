//! Value rule checks

use som_ifc::Value;
use som_schema::{FormatPattern, RangeBound, SchemaAttribute, ValueRule};

use crate::issue::IssueKind;

/// Outcome of checking one value against one rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleResult {
    Valid,
    Invalid { kind: IssueKind, message: String },
}

impl RuleResult {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, RuleResult::Valid)
    }

    fn invalid(kind: IssueKind, message: String) -> Self {
        RuleResult::Invalid { kind, message }
    }
}

/// Check a value against an attribute's rule.
#[must_use]
pub fn validate(value: &Value, attribute: &SchemaAttribute) -> RuleResult {
    match &attribute.rule {
        ValueRule::Enumeration(allowed) => validate_enumeration(value, allowed),
        ValueRule::Range(bounds) => validate_range(value, bounds),
        ValueRule::Format(patterns) => validate_format(value, patterns),
    }
}

/// An empty list allows every value.
#[must_use]
pub fn validate_enumeration(value: &Value, allowed: &[Value]) -> RuleResult {
    if allowed.is_empty() || allowed.iter().any(|candidate| value.matches(candidate)) {
        return RuleResult::Valid;
    }
    let listed: Vec<String> = allowed.iter().map(ToString::to_string).collect();
    RuleResult::invalid(
        IssueKind::ValueNotInList,
        format!("Value '{value}' is not in [{}]", listed.join(", ")),
    )
}

/// The value must lie in at least one range.
#[must_use]
pub fn validate_range(value: &Value, bounds: &[RangeBound]) -> RuleResult {
    let Some(number) = value.as_f64() else {
        return RuleResult::invalid(
            IssueKind::ValueOutOfRange,
            format!("Value '{value}' is not numeric"),
        );
    };
    if bounds.iter().any(|range| range.contains(number)) {
        return RuleResult::Valid;
    }
    let listed: Vec<String> = bounds
        .iter()
        .map(|range| format!("[{}, {}]", range.min, range.max))
        .collect();
    RuleResult::invalid(
        IssueKind::ValueOutOfRange,
        format!("Value {number} is outside {}", listed.join(", ")),
    )
}

/// At least one pattern must match somewhere in the value.
#[must_use]
pub fn validate_format(value: &Value, patterns: &[FormatPattern]) -> RuleResult {
    let text = value.to_string();
    if patterns.iter().any(|pattern| pattern.is_match(&text)) {
        return RuleResult::Valid;
    }
    let listed: Vec<&str> = patterns.iter().map(FormatPattern::as_str).collect();
    RuleResult::invalid(
        IssueKind::ValueFormatMismatch,
        format!("Value '{text}' matches none of [{}]", listed.join(", ")),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn format(patterns: &[&str]) -> Vec<FormatPattern> {
        patterns
            .iter()
            .map(|p| FormatPattern::new(*p).unwrap())
            .collect()
    }

    #[test]
    fn test_empty_enumeration_allows_anything() {
        for value in [Value::from("x"), Value::Integer(3), Value::Null, Value::Boolean(false)] {
            assert!(validate_enumeration(&value, &[]).is_valid());
        }
    }

    #[test]
    fn test_enumeration_membership() {
        let allowed = vec![Value::from("Concrete"), Value::from("Brick")];
        assert!(validate_enumeration(&Value::from("Brick"), &allowed).is_valid());
        match validate_enumeration(&Value::from("Wood"), &allowed) {
            RuleResult::Invalid { kind, message } => {
                assert_eq!(kind, IssueKind::ValueNotInList);
                assert!(message.contains("Wood"));
            }
            RuleResult::Valid => panic!("Wood is not allowed"),
        }
    }

    #[test]
    fn test_enumeration_numbers() {
        let allowed = vec![Value::Integer(30), Value::Integer(60)];
        assert!(validate_enumeration(&Value::Real(60.0), &allowed).is_valid());
        assert!(!validate_enumeration(&Value::Real(45.0), &allowed).is_valid());
    }

    #[test]
    fn test_range_bound_order_is_irrelevant() {
        let sorted = [RangeBound::new(0.0, 10.0)];
        let swapped = [RangeBound::new(10.0, 0.0)];
        for v in [-1.0, 0.0, 5.0, 10.0, 10.5] {
            assert_eq!(
                validate_range(&Value::Real(v), &sorted),
                validate_range(&Value::Real(v), &swapped)
            );
        }
    }

    #[test]
    fn test_range_multiple_pairs() {
        let bounds = [RangeBound::new(0.0, 1.0), RangeBound::new(5.0, 6.0)];
        assert!(validate_range(&Value::Real(0.5), &bounds).is_valid());
        assert!(validate_range(&Value::Integer(6), &bounds).is_valid());
        assert!(validate_range(&Value::from("5,5"), &bounds).is_valid());
        assert!(!validate_range(&Value::Integer(3), &bounds).is_valid());
    }

    #[test]
    fn test_range_non_numeric_and_empty() {
        let bounds = [RangeBound::new(0.0, 1.0)];
        assert!(!validate_range(&Value::from("abc"), &bounds).is_valid());
        assert!(!validate_range(&Value::Null, &bounds).is_valid());
        assert!(!validate_range(&Value::Real(0.5), &[]).is_valid());
    }

    #[test]
    fn test_format_substring_match_suffices() {
        let patterns = format(&[r"\d{3}"]);
        assert!(validate_format(&Value::from("123"), &patterns).is_valid());
        assert!(validate_format(&Value::from("ab123cd"), &patterns).is_valid());
        assert!(!validate_format(&Value::from("12"), &patterns).is_valid());
    }

    #[test]
    fn test_format_any_pattern_suffices() {
        let patterns = format(&["^A", "^B"]);
        assert!(validate_format(&Value::from("B7"), &patterns).is_valid());
        match validate_format(&Value::from("C7"), &patterns) {
            RuleResult::Invalid { kind, .. } => assert_eq!(kind, IssueKind::ValueFormatMismatch),
            RuleResult::Valid => panic!("C7 matches no pattern"),
        }
        assert!(!validate_format(&Value::from("A"), &[]).is_valid());
    }

    #[test]
    fn test_validate_dispatches_on_rule() {
        let attribute = SchemaAttribute::new("Width", ValueRule::Range(vec![RangeBound::new(0.0, 10.0)]));
        assert!(validate(&Value::Integer(5), &attribute).is_valid());
        assert_eq!(
            validate(&Value::Integer(15), &attribute),
            RuleResult::Invalid {
                kind: IssueKind::ValueOutOfRange,
                message: "Value 15 is outside [0, 10]".to_string(),
            }
        );
    }
}
