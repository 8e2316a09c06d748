//! Circuit, policy, credential and trustee records consumed by the compiler

use std::fs;
use std::path::{Path, PathBuf};

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, instrument};

use crate::error::{ProofInputError, Result};
use crate::known::KnownSignal;
use crate::signal::SignalDecl;

/// Name of the public signal whose arity fixes the claims tree depth
pub const CLAIMS_PROOF_SIGNAL: &str = "claimsProof";
/// Name of the positional claims key output
pub const CLAIMS_KEY_SIGNAL: &str = "claimsKey";

/// Paths to the externally compiled proving artifacts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CircuitArtifacts {
    /// Witness generator (`<name>_js/<name>.wasm`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wasm_path: Option<PathBuf>,
    /// Constraint system (`<name>.r1cs`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r1cs_path: Option<PathBuf>,
    /// Proving key (`proving_key.zkey`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zkey_path: Option<PathBuf>,
    /// Verification key (`verification_key.json`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vkey_path: Option<PathBuf>,
}

impl CircuitArtifacts {
    fn resolve_against(&mut self, base: &Path) {
        for path in [
            &mut self.wasm_path,
            &mut self.r1cs_path,
            &mut self.zkey_path,
            &mut self.vkey_path,
        ]
        .into_iter()
        .flatten()
        {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }
}

/// Circuit descriptor: ordered signal declarations plus artifact references
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Circuit {
    /// Circuit identifier, matched against [`Policy::circuit`]
    pub name: String,
    /// Private inputs in declaration order
    #[serde(default)]
    pub private_signals: Vec<SignalDecl>,
    /// Public inputs in declaration order
    #[serde(default)]
    pub public_signals: Vec<SignalDecl>,
    #[serde(default)]
    pub artifacts: CircuitArtifacts,
}

impl Circuit {
    /// Create a circuit from declaration strings
    pub fn new(
        name: impl Into<String>,
        private_signals: &[&str],
        public_signals: &[&str],
    ) -> Result<Self> {
        let parse_all = |decls: &[&str]| {
            decls
                .iter()
                .map(|d| SignalDecl::parse(d))
                .collect::<Result<Vec<_>>>()
        };

        let circuit = Self {
            name: name.into(),
            private_signals: parse_all(private_signals)?,
            public_signals: parse_all(public_signals)?,
            artifacts: CircuitArtifacts::default(),
        };
        circuit.validate()?;
        Ok(circuit)
    }

    /// Check that every claim-backed private signal is a scalar
    ///
    /// A claim lookup yields one field element, so only reserved private
    /// signals may declare an arity above 1.
    pub fn validate(&self) -> Result<()> {
        let array_claim = self
            .private_signals
            .iter()
            .find(|s| !s.is_scalar() && KnownSignal::from_name(&s.name).is_none());
        match array_claim {
            Some(decl) => Err(ProofInputError::InvalidSignalDeclaration {
                declaration: decl.to_string(),
                reason: "claim-backed private signals must be scalar".into(),
            }),
            None => Ok(()),
        }
    }

    /// Load a circuit descriptor from a JSON file
    ///
    /// Relative artifact paths are resolved against the descriptor's directory.
    #[instrument]
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ProofInputError::CircuitNotFound {
                path: path.display().to_string(),
            });
        }

        debug!("Loading circuit descriptor from: {}", path.display());

        let json = fs::read_to_string(path)?;
        let mut circuit: Self = serde_json::from_str(&json)?;
        circuit.validate()?;
        if let Some(base) = path.parent() {
            circuit.artifacts.resolve_against(base);
        }
        Ok(circuit)
    }

    /// Claims tree depth declared through `claimsProof[N]`
    pub fn declared_tree_depth(&self) -> Option<usize> {
        self.public_signals
            .iter()
            .find(|s| s.name == CLAIMS_PROOF_SIGNAL)
            .map(|s| s.arity)
    }
}

/// A constant bound to a public signal slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRule {
    /// Ordering of rules that share a key
    pub index: u32,
    /// Display grouping label
    #[serde(default)]
    pub group: String,
    /// Public signal name, dotted for display grouping
    pub key: String,
    /// Big-endian field element
    #[serde(with = "hex_bytes")]
    pub value: Vec<u8>,
}

impl PolicyRule {
    /// Rule with a small integer value
    pub fn from_u64(index: u32, key: impl Into<String>, value: u64) -> Self {
        Self {
            index,
            group: String::new(),
            key: key.into(),
            value: BigUint::from(value).to_bytes_be(),
        }
    }
}

/// Verification criteria a service binds to one circuit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    /// Owning service provider
    pub service: String,
    /// Circuit name this policy constrains
    pub circuit: String,
    #[serde(default)]
    pub rules: Vec<PolicyRule>,
}

/// Issuer proof attached to a credential
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialProof {
    /// Signature scheme identifier
    #[serde(rename = "type")]
    pub proof_type: String,
    /// Scheme-specific encoded payload
    pub proof_value: String,
}

/// Holder-owned verifiable credential
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub issuer: String,
    /// Claim data, possibly nested
    pub credential_subject: Map<String, Value>,
    pub proof: CredentialProof,
}

/// Two-part (x, y) public key of a trustee
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrusteeKey(pub BigUint, pub BigUint);

impl TrusteeKey {
    pub fn new(x: impl Into<BigUint>, y: impl Into<BigUint>) -> Self {
        Self(x.into(), y.into())
    }
}

/// A service's registered trustee
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trustee {
    /// Registry identifier
    pub id: String,
    pub public_key: TrusteeKey,
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s.trim_start_matches("0x")).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_declared_tree_depth() {
        let circuit = Circuit::new("kyc", &["name"], &["claimsProof[8]", "minAge"]).unwrap();
        assert_eq!(circuit.declared_tree_depth(), Some(8));

        let circuit = Circuit::new("age", &["birthDate"], &["minAge"]).unwrap();
        assert_eq!(circuit.declared_tree_depth(), None);
    }

    #[test]
    fn test_circuit_rejects_bad_declaration() {
        assert!(matches!(
            Circuit::new("age", &["birthDate[["], &[]),
            Err(ProofInputError::InvalidSignalDeclaration { .. })
        ));
    }

    #[test]
    fn test_claim_backed_private_arrays_rejected() {
        assert!(matches!(
            Circuit::new("kyc", &["tags[3]"], &[]),
            Err(ProofInputError::InvalidSignalDeclaration { ref declaration, .. }) if declaration == "tags[3]"
        ));
        assert!(Circuit::new("kyc", &["trusteePublicKeys[4]", "name"], &[]).is_ok());
    }

    #[test]
    fn test_load_validates_private_signals() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kyc.json");
        fs::write(&path, r#"{"name":"kyc","privateSignals":["tags[3]"]}"#).unwrap();
        assert!(matches!(
            Circuit::load(&path),
            Err(ProofInputError::InvalidSignalDeclaration { .. })
        ));
    }

    #[test]
    fn test_load_descriptor_resolves_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("age_check.json");
        let mut file = fs::File::create(&path).unwrap();
        write!(
            file,
            r#"{{
                "name": "age_check",
                "privateSignals": ["birthDate"],
                "publicSignals": ["currentDate", "minAge", "issuerPk[2]"],
                "artifacts": {{ "wasmPath": "age_check_js/age_check.wasm" }}
            }}"#
        )
        .unwrap();

        let circuit = Circuit::load(&path).unwrap();
        assert_eq!(circuit.name, "age_check");
        assert_eq!(circuit.public_signals[2].arity, 2);
        assert_eq!(
            circuit.artifacts.wasm_path,
            Some(dir.path().join("age_check_js/age_check.wasm"))
        );
    }

    #[test]
    fn test_load_missing_descriptor() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Circuit::load(&dir.path().join("missing.json")),
            Err(ProofInputError::CircuitNotFound { .. })
        ));
    }

    #[test]
    fn test_rule_value_is_hex() {
        let rule = PolicyRule::from_u64(0, "minAge", 18);
        let json = serde_json::to_value(&rule).unwrap();
        assert_eq!(json["value"], "12");

        let parsed: PolicyRule =
            serde_json::from_str(r#"{"index":1,"key":"maxAge","value":"0x41"}"#).unwrap();
        assert_eq!(parsed.value, vec![0x41]);
        assert_eq!(parsed.group, "");
    }
}
