//! Targeting-rule evaluation: dot-path attribute resolution plus typed,
//! non-throwing comparison operators.

use crate::snapshot::{Operator, TargetingCondition, TargetingRule};
use serde_json::Value;

/// Evaluate a user context against a set of rules.
///
/// - An empty rule list matches everyone.
/// - A non-empty list matches if *any* rule matches (OR across rules).
/// - A rule matches if *all* of its conditions match (AND within a rule);
///   an empty conditions list counts as a match.
pub fn evaluate(rules: &[TargetingRule], context: &Value) -> bool {
    if rules.is_empty() {
        return true;
    }
    rules
        .iter()
        .any(|rule| rule.conditions.iter().all(|c| evaluate_condition(c, context)))
}

fn evaluate_condition(condition: &TargetingCondition, context: &Value) -> bool {
    match resolve_attribute(&condition.attribute, context) {
        None => false,
        Some(v) => apply_operator(condition.operator, v, &condition.value),
    }
}

/// Resolve `attribute` against `context`.
///
/// First tries the full string as a single top-level key (an escape hatch
/// for attributes whose real names contain dots — this takes precedence
/// even when a dotted path would also resolve). Falls back to walking the
/// dotted path; any missing or non-object intermediate segment resolves to
/// "undefined" (represented here as `None`).
fn resolve_attribute<'a>(attribute: &str, context: &'a Value) -> Option<&'a Value> {
    if let Value::Object(map) = context {
        if let Some(v) = map.get(attribute) {
            return Some(v);
        }
    }

    if !attribute.contains('.') {
        return None;
    }

    let mut current = context;
    for segment in attribute.split('.') {
        match current {
            Value::Object(map) => current = map.get(segment)?,
            _ => return None,
        }
    }
    Some(current)
}

fn apply_operator(operator: Operator, v: &Value, c: &Value) -> bool {
    match operator {
        Operator::Eq => v == c,
        Operator::Neq => v != c,
        Operator::In => match c {
            Value::Array(items) => items.iter().any(|item| item == v),
            _ => false,
        },
        Operator::NotIn => match c {
            Value::Array(items) => !items.iter().any(|item| item == v),
            _ => false,
        },
        Operator::Contains => match (v, c) {
            (Value::String(vs), Value::String(cs)) => vs.contains(cs.as_str()),
            _ => false,
        },
        Operator::Gt => match (v.as_f64(), c.as_f64()) {
            (Some(a), Some(b)) if v.is_number() && c.is_number() => a > b,
            _ => false,
        },
        Operator::Lt => match (v.as_f64(), c.as_f64()) {
            (Some(a), Some(b)) if v.is_number() && c.is_number() => a < b,
            _ => false,
        },
        Operator::Unknown => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rule(attribute: &str, operator: Operator, value: Value) -> TargetingRule {
        TargetingRule {
            conditions: vec![TargetingCondition {
                attribute: attribute.to_string(),
                operator,
                value,
            }],
        }
    }

    #[test]
    fn empty_rules_match_everyone() {
        assert!(evaluate(&[], &json!({})));
    }

    #[test]
    fn rule_with_empty_conditions_matches() {
        let rules = vec![TargetingRule { conditions: vec![] }];
        assert!(evaluate(&rules, &json!({"any": "thing"})));
    }

    #[test]
    fn or_across_rules() {
        let rules = vec![
            rule("country", Operator::Eq, json!("US")),
            rule("country", Operator::Eq, json!("CA")),
        ];
        assert!(evaluate(&rules, &json!({"country": "CA"})));
        assert!(!evaluate(&rules, &json!({"country": "FR"})));
    }

    #[test]
    fn and_within_rule() {
        let rules = vec![TargetingRule {
            conditions: vec![
                TargetingCondition {
                    attribute: "country".into(),
                    operator: Operator::Eq,
                    value: json!("US"),
                },
                TargetingCondition {
                    attribute: "plan".into(),
                    operator: Operator::Eq,
                    value: json!("pro"),
                },
            ],
        }];
        assert!(evaluate(&rules, &json!({"country": "US", "plan": "pro"})));
        assert!(!evaluate(&rules, &json!({"country": "US", "plan": "free"})));
    }

    #[test]
    fn exact_key_precedence_over_dotted_path() {
        let ctx = json!({"a.b": "X", "a": {"b": "Y"}});
        let rules = vec![rule("a.b", Operator::Eq, json!("X"))];
        assert!(evaluate(&rules, &ctx));
    }

    #[test]
    fn dot_walk_resolves_nested_attribute() {
        let ctx = json!({"a": {"b": "Y"}});
        let rules = vec![rule("a.b", Operator::Eq, json!("Y"))];
        assert!(evaluate(&rules, &ctx));
    }

    #[test]
    fn dot_walk_failure_resolves_undefined_and_fails_every_operator() {
        let ctx = json!({"a": "not-an-object"});
        for (op, value) in [
            (Operator::Eq, json!("Y")),
            (Operator::Neq, json!("Y")),
            (Operator::Gt, json!(1)),
        ] {
            let rules = vec![rule("a.b", op, value)];
            assert!(!evaluate(&rules, &ctx));
        }
    }

    #[test]
    fn in_and_not_in_require_sequence_value() {
        let ctx = json!({"plan": "pro"});
        assert!(evaluate(
            &[rule("plan", Operator::In, json!(["pro", "enterprise"]))],
            &ctx
        ));
        assert!(!evaluate(&[rule("plan", Operator::In, json!("pro"))], &ctx));
        assert!(!evaluate(
            &[rule("plan", Operator::NotIn, json!("pro"))],
            &ctx
        ));
        assert!(evaluate(
            &[rule("plan", Operator::NotIn, json!(["free"]))],
            &ctx
        ));
    }

    #[test]
    fn contains_requires_both_sides_strings() {
        let ctx = json!({"email": "user@example.com"});
        assert!(evaluate(
            &[rule("email", Operator::Contains, json!("@example"))],
            &ctx
        ));
        assert!(!evaluate(
            &[rule("email", Operator::Contains, json!(42))],
            &ctx
        ));
    }

    #[test]
    fn gt_lt_require_numbers_and_reject_numeric_strings() {
        let ctx = json!({"age": "79"});
        assert!(!evaluate(&[rule("age", Operator::Gt, json!(1))], &ctx));

        let ctx_num = json!({"age": 79});
        assert!(evaluate(&[rule("age", Operator::Gt, json!(1))], &ctx_num));
        assert!(!evaluate(&[rule("age", Operator::Gt, json!(80))], &ctx_num));
        assert!(evaluate(&[rule("age", Operator::Lt, json!(80))], &ctx_num));
    }

    #[test]
    fn strict_eq_type_sensitive() {
        let ctx = json!({"age": 21});
        assert!(!evaluate(&[rule("age", Operator::Eq, json!("21"))], &ctx));
        assert!(evaluate(&[rule("age", Operator::Eq, json!(21))], &ctx));
    }

    #[test]
    fn unknown_operator_never_matches() {
        let cond = TargetingCondition {
            attribute: "plan".into(),
            operator: Operator::Unknown,
            value: json!("pro"),
        };
        let rules = vec![TargetingRule {
            conditions: vec![cond],
        }];
        assert!(!evaluate(&rules, &json!({"plan": "pro"})));
    }
}
