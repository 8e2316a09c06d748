//! Trustee selection from a proved request's public inputs

use std::collections::HashSet;

use ark_bn254::Fr;
use num_bigint::BigUint;
use tracing::debug;

use crate::error::Result;
use crate::field;
use crate::types::Trustee;

/// Trustees whose key halves both appear in `public_inputs`
///
/// Each half is matched independently against any position; this is a
/// correlation step, not a cryptographic check that the shares were encrypted
/// to that trustee.
pub fn select_trustees<'a>(trustees: &'a [Trustee], public_inputs: &[BigUint]) -> Vec<&'a Trustee> {
    let present: HashSet<&BigUint> = public_inputs.iter().collect();
    let selected: Vec<&Trustee> = trustees
        .iter()
        .filter(|t| present.contains(&t.public_key.0) && present.contains(&t.public_key.1))
        .collect();

    debug!(
        registered = trustees.len(),
        selected = selected.len(),
        "Trustees correlated with public inputs"
    );
    selected
}

/// [`select_trustees`] over arkworks field elements
pub fn select_trustees_fr<'a>(trustees: &'a [Trustee], public_inputs: &[Fr]) -> Vec<&'a Trustee> {
    let inputs: Vec<BigUint> = public_inputs.iter().map(field::from_fr).collect();
    select_trustees(trustees, &inputs)
}

/// [`select_trustees`] over decimal-string public signals (snarkjs `public.json`)
pub fn select_trustees_decimal<'a>(
    trustees: &'a [Trustee],
    public_signals: &[String],
) -> Result<Vec<&'a Trustee>> {
    let inputs = public_signals
        .iter()
        .map(|s| field::decimal_to_field(s))
        .collect::<Result<Vec<_>>>()?;
    Ok(select_trustees(trustees, &inputs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TrusteeKey;

    fn trustees() -> Vec<Trustee> {
        vec![
            Trustee {
                id: "alpha".into(),
                public_key: TrusteeKey::new(100u32, 101u32),
            },
            Trustee {
                id: "beta".into(),
                public_key: TrusteeKey::new(200u32, 201u32),
            },
            Trustee {
                id: "gamma".into(),
                public_key: TrusteeKey::new(300u32, 301u32),
            },
        ]
    }

    fn ids<'a>(selected: &[&'a Trustee]) -> Vec<&'a str> {
        selected.iter().map(|t| t.id.as_str()).collect()
    }

    #[test]
    fn test_both_halves_required() {
        let registered = trustees();
        // beta only has its x half present
        let inputs = [7u32, 101, 200, 5, 100, 301, 300].map(BigUint::from);
        assert_eq!(ids(&select_trustees(&registered, &inputs)), ["alpha", "gamma"]);
    }

    #[test]
    fn test_halves_match_at_any_position() {
        let registered = trustees();
        let inputs = [201u32, 1, 2, 3, 200].map(BigUint::from);
        assert_eq!(ids(&select_trustees(&registered, &inputs)), ["beta"]);
    }

    #[test]
    fn test_no_inputs_selects_nobody() {
        assert!(select_trustees(&trustees(), &[]).is_empty());
    }

    #[test]
    fn test_field_and_decimal_inputs() {
        let registered = trustees();
        let frs = [Fr::from(300u64), Fr::from(301u64)];
        assert_eq!(ids(&select_trustees_fr(&registered, &frs)), ["gamma"]);

        let decimals: Vec<String> = ["100", "101", "201"].iter().map(|s| s.to_string()).collect();
        assert_eq!(
            ids(&select_trustees_decimal(&registered, &decimals).unwrap()),
            ["alpha"]
        );
        assert!(select_trustees_decimal(&registered, &["x1".to_string()]).is_err());
    }
}
