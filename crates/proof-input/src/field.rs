//! Big-endian codec between byte strings and BN254 scalar field integers

use ark_bn254::Fr;
use ark_ff::{BigInteger, PrimeField};
use num_bigint::BigUint;
use num_traits::Num;
use sha2::{Digest, Sha256};

use crate::error::{ProofInputError, Result};

/// Order of the BN254 scalar field, the circuit's native field
pub fn modulus() -> BigUint {
    Fr::MODULUS.into()
}

/// Decode big-endian bytes into a field integer
///
/// Values at or above the modulus are rejected rather than reduced so a
/// policy constant can never alias a different one.
pub fn bytes_to_field(bytes: &[u8]) -> Result<BigUint> {
    let value = BigUint::from_bytes_be(bytes);
    ensure_in_field(&value)?;
    Ok(value)
}

/// Encode a field integer as minimal big-endian bytes
pub fn field_to_bytes(value: &BigUint) -> Vec<u8> {
    value.to_bytes_be()
}

/// Parse a decimal string into a field integer
pub fn decimal_to_field(s: &str) -> Result<BigUint> {
    let value = BigUint::from_str_radix(s, 10)
        .map_err(|e| ProofInputError::invalid_field(format!("invalid number {s:?}: {e}")))?;
    ensure_in_field(&value)?;
    Ok(value)
}

/// Render a field integer in decimal, the form circom and snarkjs expect
pub fn field_to_decimal(value: &BigUint) -> String {
    value.to_str_radix(10)
}

/// Check that `value` is a canonical field element
pub fn ensure_in_field(value: &BigUint) -> Result<()> {
    if *value >= modulus() {
        return Err(ProofInputError::invalid_field(format!(
            "{value} exceeds the BN254 scalar field"
        )));
    }
    Ok(())
}

/// Convert a canonical integer into an arkworks field element
pub fn to_fr(value: &BigUint) -> Result<Fr> {
    ensure_in_field(value)?;
    Ok(Fr::from_be_bytes_mod_order(&value.to_bytes_be()))
}

/// Convert an arkworks field element into an integer
pub fn from_fr(f: &Fr) -> BigUint {
    f.into_bigint().into()
}

/// 32-byte big-endian encoding of a field element
pub fn fr_to_be_bytes(f: &Fr) -> Vec<u8> {
    f.into_bigint().to_bytes_be()
}

/// Hash arbitrary bytes into the field (SHA-256, reduced mod r)
pub fn hash_bytes(bytes: &[u8]) -> Fr {
    Fr::from_be_bytes_mod_order(&Sha256::digest(bytes))
}

/// Two-to-one compression used for claims tree nodes and leaves
pub fn hash_pair(left: &Fr, right: &Fr) -> Fr {
    let mut hasher = Sha256::new();
    hasher.update(fr_to_be_bytes(left));
    hasher.update(fr_to_be_bytes(right));
    Fr::from_be_bytes_mod_order(&hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_bytes_roundtrip() {
        let value = bytes_to_field(&[18]).unwrap();
        assert_eq!(value, BigUint::from(18u32));
        assert_eq!(field_to_bytes(&value), vec![18]);

        let wide = bytes_to_field(&[0x01, 0x00, 0x00]).unwrap();
        assert_eq!(wide, BigUint::from(65536u32));
        assert_eq!(field_to_bytes(&wide), vec![0x01, 0x00, 0x00]);
    }

    #[test]
    fn test_rejects_values_outside_field() {
        let too_big = field_to_bytes(&modulus());
        assert!(matches!(
            bytes_to_field(&too_big),
            Err(ProofInputError::InvalidFieldElement { .. })
        ));
        assert!(bytes_to_field(&[0xff; 32]).is_err());
    }

    #[test]
    fn test_decimal_conversion() {
        let value = decimal_to_field("19890101").unwrap();
        assert_eq!(value, BigUint::from(19_890_101u64));
        assert_eq!(field_to_decimal(&value), "19890101");
        assert!(decimal_to_field("12a").is_err());
    }

    #[test]
    fn test_fr_conversion() {
        let value = BigUint::from(123_456_789u64);
        let f = to_fr(&value).unwrap();
        assert_eq!(f, Fr::from(123_456_789u64));
        assert_eq!(from_fr(&f), value);
        assert_eq!(fr_to_be_bytes(&f).len(), 32);
    }

    #[test]
    fn test_hash_pair_is_ordered() {
        let a = Fr::from(1u64);
        let b = Fr::from(2u64);
        assert_eq!(hash_pair(&a, &b), hash_pair(&a, &b));
        assert_ne!(hash_pair(&a, &b), hash_pair(&b, &a));
    }
}
