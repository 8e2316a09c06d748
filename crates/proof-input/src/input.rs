//! Compiled prover input

use num_bigint::BigUint;
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use serde_json::Value;

use crate::error::{ProofInputError, Result};
use crate::field::field_to_decimal;
use crate::signal::SignalDecl;
use crate::types::{CLAIMS_KEY_SIGNAL, CLAIMS_PROOF_SIGNAL};

/// A resolved signal value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalValue {
    Scalar(BigUint),
    Array(Vec<BigUint>),
}

impl SignalValue {
    /// Shape resolved values according to a declaration's arity
    pub fn shaped(decl: &SignalDecl, mut values: Vec<BigUint>) -> Result<Self> {
        if values.len() != decl.arity {
            return Err(ProofInputError::ArityMismatch {
                signal: decl.name.clone(),
                expected: decl.arity,
                found: values.len(),
            });
        }
        if decl.is_scalar() {
            // len == 1 checked above
            Ok(Self::Scalar(values.remove(0)))
        } else {
            Ok(Self::Array(values))
        }
    }

    /// Field elements in order
    pub fn elements(&self) -> &[BigUint] {
        match self {
            Self::Scalar(v) => std::slice::from_ref(v),
            Self::Array(vs) => vs,
        }
    }

    /// The scalar, if this is one
    pub fn as_scalar(&self) -> Option<&BigUint> {
        match self {
            Self::Scalar(v) => Some(v),
            Self::Array(_) => None,
        }
    }
}

impl Serialize for SignalValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Scalar(v) => serializer.serialize_str(&field_to_decimal(v)),
            Self::Array(vs) => {
                let mut seq = serializer.serialize_seq(Some(vs.len()))?;
                for v in vs {
                    seq.serialize_element(&field_to_decimal(v))?;
                }
                seq.end()
            }
        }
    }
}

/// Flat input mapping for one prover run
///
/// Produced once by [`ProofInputBuilder::build`](crate::ProofInputBuilder::build)
/// and immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofInput {
    pub(crate) signals: Vec<(String, SignalValue)>,
    pub(crate) claims_key: Option<BigUint>,
    pub(crate) claims_proof: Vec<Vec<BigUint>>,
}

impl ProofInput {
    /// Resolved value for a signal, `None` when left unresolved
    pub fn get(&self, name: &str) -> Option<&SignalValue> {
        self.signals
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Whether a signal was resolved
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Resolved signals in resolution order
    pub fn signals(&self) -> impl Iterator<Item = (&str, &SignalValue)> {
        self.signals.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Tree keys of the claim-backed private signals packed into one integer
    ///
    /// The keys are concatenated in declaration order and the whole buffer
    /// is byte-reversed before it is read. `None` when no claim was resolved.
    pub fn claims_key(&self) -> Option<&BigUint> {
        self.claims_key.as_ref()
    }

    /// Inclusion proofs of the claim-backed private signals, in declaration order
    pub fn claims_proof(&self) -> &[Vec<BigUint>] {
        &self.claims_proof
    }

    /// Input in the shape circom witness builders take
    pub fn to_circuit_input(&self) -> Vec<(String, Vec<BigUint>)> {
        let mut input: Vec<(String, Vec<BigUint>)> = self
            .signals
            .iter()
            .map(|(name, value)| (name.clone(), value.elements().to_vec()))
            .collect();
        if let Some(key) = &self.claims_key {
            input.push((CLAIMS_KEY_SIGNAL.into(), vec![key.clone()]));
            input.push((
                CLAIMS_PROOF_SIGNAL.into(),
                self.claims_proof.iter().flatten().cloned().collect(),
            ));
        }
        input
    }

    /// snarkjs `input.json` form with decimal strings
    pub fn to_json(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

impl Serialize for ProofInput {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let len = self.signals.len() + if self.claims_key.is_some() { 2 } else { 0 };
        let mut map = serializer.serialize_map(Some(len))?;
        for (name, value) in &self.signals {
            map.serialize_entry(name, value)?;
        }
        if let Some(key) = &self.claims_key {
            let proofs: Vec<Vec<String>> = self
                .claims_proof
                .iter()
                .map(|siblings| siblings.iter().map(field_to_decimal).collect())
                .collect();
            map.serialize_entry(CLAIMS_KEY_SIGNAL, &field_to_decimal(key))?;
            map.serialize_entry(CLAIMS_PROOF_SIGNAL, &proofs)?;
        }
        map.end()
    }
}
