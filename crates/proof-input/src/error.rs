//! Error types for proof-input compilation

use thiserror::Error;

/// Result type alias for compiler operations
pub type Result<T> = std::result::Result<T, ProofInputError>;

/// Errors that can occur while compiling a credential into circuit inputs
#[derive(Error, Debug)]
pub enum ProofInputError {
    /// A private signal has no backing claim in the credential
    #[error("Credential has no claim for private signal {signal} (path {path})")]
    MissingCredentialClaim { signal: String, path: String },

    /// Material required by a reserved signal was not supplied
    #[error("Missing {material} for signal {signal}")]
    MissingKnownSignalMaterial { signal: String, material: String },

    /// Credential proof is not produced by the expected signature scheme
    #[error("Invalid credential proof type: {found} (expected {expected})")]
    InvalidCredentialProofType { expected: String, found: String },

    /// Claims tree depth is neither configured nor declared by the circuit
    #[error("Claims tree depth undetermined for circuit {circuit}: set it explicitly or declare claimsProof[N]")]
    TreeDepthUndetermined { circuit: String },

    /// Malformed signal declaration
    #[error("Invalid signal declaration {declaration:?}: {reason}")]
    InvalidSignalDeclaration { declaration: String, reason: String },

    /// Resolved value length does not match the declared arity
    #[error("Signal {signal} declares arity {expected} but resolved {found} values")]
    ArityMismatch {
        signal: String,
        expected: usize,
        found: usize,
    },

    /// Policy binds some but not all slots of an array signal
    #[error("Policy binds {found} rules to signal {signal} of arity {expected}")]
    PolicyRuleArity {
        signal: String,
        expected: usize,
        found: usize,
    },

    /// Policy was declared for a different circuit
    #[error("Policy targets circuit {policy_circuit}, not {circuit}")]
    PolicyCircuitMismatch {
        circuit: String,
        policy_circuit: String,
    },

    /// Value does not fit in the BN254 scalar field
    #[error("Invalid field element: {reason}")]
    InvalidFieldElement { reason: String },

    /// Credential proof payload could not be decoded
    #[error("Invalid proof format: {reason}")]
    InvalidProofFormat { reason: String },

    /// Claims accumulator failure
    #[error("Claims tree error: {reason}")]
    ClaimsTree { reason: String },

    /// Circuit descriptor not found
    #[error("Circuit descriptor not found: {path}")]
    CircuitNotFound { path: String },

    /// An injected loader failed
    #[error("{loader} loader failed: {source}")]
    Loader {
        loader: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProofInputError {
    pub(crate) fn invalid_field(reason: impl Into<String>) -> Self {
        Self::InvalidFieldElement {
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_proof(reason: impl Into<String>) -> Self {
        Self::InvalidProofFormat {
            reason: reason.into(),
        }
    }
}
