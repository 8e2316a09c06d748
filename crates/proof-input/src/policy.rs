//! Policy rule injection into public signals

use tracing::debug;

use crate::error::{ProofInputError, Result};
use crate::field;
use crate::input::SignalValue;
use crate::signal::SignalDecl;
use crate::types::{Policy, PolicyRule};

/// Rules bound to `name`, ordered by index with table order breaking ties
pub fn rules_for<'a>(rules: &'a [PolicyRule], name: &str) -> Vec<&'a PolicyRule> {
    let mut matching: Vec<&PolicyRule> = rules.iter().filter(|r| r.key == name).collect();
    // stable sort keeps table order for equal indices
    matching.sort_by_key(|r| r.index);
    matching
}

/// Resolve a public signal from the policy's rule table
///
/// Returns `Ok(None)` when no rule names the signal: the slot stays
/// unconstrained instead of being bound to zero.
///
/// # Errors
///
/// [`ProofInputError::PolicyRuleArity`] when the rules bind some but not all
/// slots of an array signal. Building the array would need zeros in the
/// unbound slots, and a zero is a real constraint the policy never stated.
/// [`ProofInputError::InvalidFieldElement`] when a rule value is not below
/// the field modulus.
pub fn inject(policy: &Policy, decl: &SignalDecl) -> Result<Option<SignalValue>> {
    let matching = rules_for(&policy.rules, &decl.name);
    if matching.is_empty() {
        return Ok(None);
    }
    if matching.len() != decl.arity {
        return Err(ProofInputError::PolicyRuleArity {
            signal: decl.name.clone(),
            expected: decl.arity,
            found: matching.len(),
        });
    }

    let values = matching
        .iter()
        .map(|rule| field::bytes_to_field(&rule.value))
        .collect::<Result<Vec<_>>>()?;

    debug!(signal = %decl.name, rules = matching.len(), "Injected policy constants");
    SignalValue::shaped(decl, values).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigUint;

    fn policy(rules: Vec<PolicyRule>) -> Policy {
        Policy {
            service: "bank".into(),
            circuit: "age_check".into(),
            rules,
        }
    }

    fn decl(s: &str) -> SignalDecl {
        SignalDecl::parse(s).unwrap()
    }

    #[test]
    fn test_scalar_rule() {
        let p = policy(vec![PolicyRule::from_u64(0, "minAge", 18)]);
        assert_eq!(
            inject(&p, &decl("minAge")).unwrap(),
            Some(SignalValue::Scalar(BigUint::from(18u8)))
        );
    }

    #[test]
    fn test_unmatched_signal_is_unresolved_not_zero() {
        let p = policy(vec![PolicyRule::from_u64(0, "minAge", 18)]);
        assert_eq!(inject(&p, &decl("maxAge")).unwrap(), None);

        let zero = policy(vec![PolicyRule::from_u64(0, "maxAge", 0)]);
        assert_eq!(
            inject(&zero, &decl("maxAge")).unwrap(),
            Some(SignalValue::Scalar(BigUint::default()))
        );
    }

    #[test]
    fn test_array_rules_ordered_by_index() {
        let p = policy(vec![
            PolicyRule::from_u64(2, "allowedCountries", 840),
            PolicyRule::from_u64(0, "allowedCountries", 276),
            PolicyRule::from_u64(1, "minAge", 21),
            PolicyRule::from_u64(1, "allowedCountries", 250),
        ]);
        let value = inject(&p, &decl("allowedCountries[3]")).unwrap().unwrap();
        assert_eq!(value.elements(), &[276u32, 250, 840].map(BigUint::from));
    }

    #[test]
    fn test_equal_indices_keep_table_order() {
        let rules = vec![
            PolicyRule::from_u64(0, "pair", 7),
            PolicyRule::from_u64(0, "pair", 3),
        ];
        let ordered: Vec<&[u8]> = rules_for(&rules, "pair").iter().map(|r| r.value.as_slice()).collect();
        assert_eq!(ordered, [&[7u8][..], &[3u8][..]]);
    }

    #[test]
    fn test_partial_array_binding_is_rejected() {
        let p = policy(vec![PolicyRule::from_u64(0, "allowedCountries", 840)]);
        assert!(matches!(
            inject(&p, &decl("allowedCountries[3]")),
            Err(ProofInputError::PolicyRuleArity { expected: 3, found: 1, .. })
        ));
    }

    #[test]
    fn test_out_of_field_value() {
        let mut rule = PolicyRule::from_u64(0, "minAge", 0);
        rule.value = vec![0xff; 32];
        assert!(matches!(
            inject(&policy(vec![rule]), &decl("minAge")),
            Err(ProofInputError::InvalidFieldElement { .. })
        ));
    }
}
