//! Issuer signature scheme: decoding the credential proof payload

use ark_bn254::Fr;
use ark_ff::PrimeField;
use num_bigint::BigUint;

use crate::error::{ProofInputError, Result};
use crate::field;
use crate::types::CredentialProof;

/// Proof type accepted by [`BabyJubJubScheme`]
pub const BJJ_SIGNATURE_2021: &str = "BJJSignature2021";

/// Values an issuer signature commits to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofPayload {
    /// Claims tree commitment root
    pub root: BigUint,
    /// Issuer public key (x, y)
    pub issuer_pk: [BigUint; 2],
    /// Signature (R8x, R8y, S)
    pub signature: [BigUint; 3],
}

/// Parser for exactly one credential proof scheme
pub trait SignatureScheme: Send + Sync {
    /// Proof `type` this scheme accepts
    fn proof_type(&self) -> &str;

    /// Decode a proof value into its payload
    fn parse_proof(&self, proof_value: &str) -> Result<ProofPayload>;

    /// Convert holder key material into circuit scalar form
    fn private_key_scalar(&self, key: &[u8]) -> Result<BigUint>;

    /// Check the proof type, then parse
    fn payload(&self, proof: &CredentialProof) -> Result<ProofPayload> {
        if proof.proof_type != self.proof_type() {
            return Err(ProofInputError::InvalidCredentialProofType {
                expected: self.proof_type().to_string(),
                found: proof.proof_type.clone(),
            });
        }
        self.parse_proof(&proof.proof_value)
    }
}

/// Baby Jubjub issuer signatures
///
/// `proofValue` is the hex encoding of six 32-byte big-endian field
/// elements: `root, pkX, pkY, R8x, R8y, S`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BabyJubJubScheme;

impl BabyJubJubScheme {
    const ELEMENT_LEN: usize = 32;
    const ELEMENTS: usize = 6;

    /// Encode a payload in this scheme's wire form
    pub fn encode(payload: &ProofPayload) -> Result<String> {
        let mut bytes = Vec::with_capacity(Self::ELEMENT_LEN * Self::ELEMENTS);
        let elements = std::iter::once(&payload.root)
            .chain(payload.issuer_pk.iter())
            .chain(payload.signature.iter());
        for element in elements {
            bytes.extend(field::fr_to_be_bytes(&field::to_fr(element)?));
        }
        Ok(hex::encode(bytes))
    }
}

impl SignatureScheme for BabyJubJubScheme {
    fn proof_type(&self) -> &str {
        BJJ_SIGNATURE_2021
    }

    fn parse_proof(&self, proof_value: &str) -> Result<ProofPayload> {
        let bytes = hex::decode(proof_value.trim_start_matches("0x"))
            .map_err(|e| ProofInputError::invalid_proof(e.to_string()))?;
        if bytes.len() != Self::ELEMENT_LEN * Self::ELEMENTS {
            return Err(ProofInputError::invalid_proof(format!(
                "expected {} bytes, got {}",
                Self::ELEMENT_LEN * Self::ELEMENTS,
                bytes.len()
            )));
        }

        let mut elements = bytes
            .chunks(Self::ELEMENT_LEN)
            .map(field::bytes_to_field)
            .collect::<Result<Vec<_>>>()?
            .into_iter();
        let mut next = || {
            elements
                .next()
                .ok_or_else(|| ProofInputError::invalid_proof("truncated payload"))
        };

        Ok(ProofPayload {
            root: next()?,
            issuer_pk: [next()?, next()?],
            signature: [next()?, next()?, next()?],
        })
    }

    fn private_key_scalar(&self, key: &[u8]) -> Result<BigUint> {
        if key.is_empty() {
            return Err(ProofInputError::invalid_field("empty private key"));
        }
        Ok(field::from_fr(&Fr::from_be_bytes_mod_order(key)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> ProofPayload {
        ProofPayload {
            root: BigUint::from(1001u32),
            issuer_pk: [BigUint::from(11u32), BigUint::from(12u32)],
            signature: [
                BigUint::from(21u32),
                BigUint::from(22u32),
                BigUint::from(23u32),
            ],
        }
    }

    #[test]
    fn test_parse_encoded_payload() {
        let encoded = BabyJubJubScheme::encode(&payload()).unwrap();
        assert_eq!(encoded.len(), 6 * 64);
        assert_eq!(BabyJubJubScheme.parse_proof(&encoded).unwrap(), payload());
    }

    #[test]
    fn test_wrong_proof_type() {
        let proof = CredentialProof {
            proof_type: "Ed25519Signature2020".into(),
            proof_value: BabyJubJubScheme::encode(&payload()).unwrap(),
        };
        assert!(matches!(
            BabyJubJubScheme.payload(&proof),
            Err(ProofInputError::InvalidCredentialProofType { .. })
        ));
    }

    #[test]
    fn test_truncated_payload() {
        assert!(matches!(
            BabyJubJubScheme.parse_proof("00ff"),
            Err(ProofInputError::InvalidProofFormat { .. })
        ));
        assert!(BabyJubJubScheme.parse_proof("zz").is_err());
    }

    #[test]
    fn test_private_key_scalar_is_reduced() {
        let scalar = BabyJubJubScheme.private_key_scalar(&[0xff; 32]).unwrap();
        assert!(scalar < field::modulus());
        assert!(BabyJubJubScheme.private_key_scalar(&[]).is_err());
    }
}
