//! Proof input builder: configure once, build once

use std::sync::Arc;
use std::time::Instant;

use num_bigint::BigUint;
use tracing::{debug, info, instrument, warn};

use crate::claims::{self, ClaimsAccumulator, ClaimsLookup, SparseMerkleAccumulator};
use crate::error::{ProofInputError, Result};
use crate::field;
use crate::input::{ProofInput, SignalValue};
use crate::known::{KnownMaterials, KnownSignal, KnownSignalResolver, TimestampSource, TrusteeKeySource};
use crate::policy;
use crate::scheme::{BabyJubJubScheme, SignatureScheme};
use crate::types::{
    Circuit, Credential, Policy, TrusteeKey, CLAIMS_KEY_SIGNAL, CLAIMS_PROOF_SIGNAL,
};

/// Compiles one credential against one circuit (and optionally a policy)
///
/// Setters consume and return the builder; [`build`](Self::build) consumes
/// it, so a configured builder yields exactly one [`ProofInput`].
///
/// ```rust,ignore
/// let input = ProofInputBuilder::new(credential, circuit)
///     .policy(policy)
///     .timestamp_source(SystemDateSource)
///     .tree_depth(16)
///     .build()
///     .await?;
/// ```
pub struct ProofInputBuilder {
    credential: Credential,
    circuit: Circuit,
    policy: Option<Policy>,
    materials: KnownMaterials,
    tree_depth: Option<usize>,
    accumulator: Arc<dyn ClaimsAccumulator>,
    scheme: Arc<dyn SignatureScheme>,
}

impl ProofInputBuilder {
    /// Start configuring a build for `credential` against `circuit`
    pub fn new(credential: Credential, circuit: Circuit) -> Self {
        Self {
            credential,
            circuit,
            policy: None,
            materials: KnownMaterials::default(),
            tree_depth: None,
            accumulator: Arc::new(SparseMerkleAccumulator),
            scheme: Arc::new(BabyJubJubScheme),
        }
    }

    /// Policy whose rules feed public signals
    #[must_use]
    pub fn policy(mut self, policy: Policy) -> Self {
        self.policy = Some(policy);
        self
    }

    #[must_use]
    pub fn timestamp(mut self, timestamp: u64) -> Self {
        self.materials.timestamp = Some(timestamp);
        self
    }

    /// Loader consulted only when no timestamp was supplied
    #[must_use]
    pub fn timestamp_source(mut self, source: impl TimestampSource + 'static) -> Self {
        self.materials.timestamp_source = Some(Arc::new(source));
        self
    }

    #[must_use]
    pub fn holder_private_key(mut self, key: impl Into<Vec<u8>>) -> Self {
        self.materials.holder_private_key = Some(key.into());
        self
    }

    #[must_use]
    pub fn trustee_public_keys(mut self, keys: Vec<TrusteeKey>) -> Self {
        self.materials.trustee_keys = Some(keys);
        self
    }

    /// Loader consulted only when no trustee keys were supplied
    #[must_use]
    pub fn trustee_key_source(mut self, source: impl TrusteeKeySource + 'static) -> Self {
        self.materials.trustee_key_source = Some(Arc::new(source));
        self
    }

    /// Override the claims tree depth declared by the circuit
    #[must_use]
    pub fn tree_depth(mut self, depth: usize) -> Self {
        self.tree_depth = Some(depth);
        self
    }

    #[must_use]
    pub fn claims_accumulator(mut self, accumulator: impl ClaimsAccumulator + 'static) -> Self {
        self.accumulator = Arc::new(accumulator);
        self
    }

    #[must_use]
    pub fn signature_scheme(mut self, scheme: impl SignatureScheme + 'static) -> Self {
        self.scheme = Arc::new(scheme);
        self
    }

    /// Compile the configured inputs into a [`ProofInput`]
    ///
    /// Any failure aborts the whole build; no partial mapping is returned.
    #[instrument(skip(self), fields(circuit = %self.circuit.name, credential = %self.credential.id))]
    pub async fn build(self) -> Result<ProofInput> {
        let start = Instant::now();
        let Self {
            credential,
            circuit,
            policy,
            materials,
            tree_depth,
            accumulator,
            scheme,
        } = self;

        circuit.validate()?;
        if let Some(policy) = &policy {
            if policy.circuit != circuit.name {
                return Err(ProofInputError::PolicyCircuitMismatch {
                    circuit: circuit.name.clone(),
                    policy_circuit: policy.circuit.clone(),
                });
            }
        }

        let has_claim_signals = circuit
            .private_signals
            .iter()
            .any(|s| KnownSignal::from_name(&s.name).is_none());
        let tree = match claims::resolve_depth(tree_depth, &circuit, has_claim_signals)? {
            Some(depth) => {
                let flattened = claims::flatten_claims(&credential.credential_subject)?;
                let tree = accumulator.build(&flattened, depth)?;
                if let Ok(payload) = scheme.payload(&credential.proof) {
                    if payload.root != tree.root() {
                        warn!("Claims tree root differs from the issuer-signed credential root");
                    }
                }
                Some(tree)
            }
            None => None,
        };

        let mut resolver = KnownSignalResolver::new(materials, scheme.as_ref(), &credential.proof);
        let mut signals: Vec<(String, SignalValue)> = Vec::new();
        let mut key_bytes: Vec<u8> = Vec::new();
        let mut claims_proof: Vec<Vec<BigUint>> = Vec::new();

        for decl in &circuit.private_signals {
            if let Some(value) = resolver.resolve(decl).await? {
                signals.push((decl.name.clone(), value));
                continue;
            }
            if KnownSignal::from_name(&decl.name).is_some() {
                return Err(ProofInputError::MissingKnownSignalMaterial {
                    signal: decl.name.clone(),
                    material: "timestamp".into(),
                });
            }

            let tree: &dyn ClaimsLookup = tree.as_deref().ok_or_else(|| {
                ProofInputError::TreeDepthUndetermined {
                    circuit: circuit.name.clone(),
                }
            })?;
            let path = claims::normalize_path(&decl.name);
            let entry = tree.get(&path);
            if !entry.found {
                return Err(ProofInputError::MissingCredentialClaim {
                    signal: decl.name.clone(),
                    path,
                });
            }

            signals.push((decl.name.clone(), SignalValue::shaped(decl, vec![entry.value])?));
            key_bytes.extend_from_slice(&entry.key);
            claims_proof.push(entry.siblings);
            debug!(signal = %decl.name, "Resolved private signal from claims tree");
        }

        let mut unresolved = 0usize;
        for decl in &circuit.public_signals {
            // filled positionally from the private pass
            if decl.name == CLAIMS_KEY_SIGNAL || decl.name == CLAIMS_PROOF_SIGNAL {
                continue;
            }
            if let Some(value) = resolver.resolve(decl).await? {
                signals.push((decl.name.clone(), value));
                continue;
            }
            if KnownSignal::from_name(&decl.name).is_none() {
                if let Some(policy) = &policy {
                    if let Some(value) = policy::inject(policy, decl)? {
                        signals.push((decl.name.clone(), value));
                        continue;
                    }
                }
            }
            debug!(signal = %decl.name, "Public signal left unresolved");
            unresolved += 1;
        }

        // Tree keys are little-endian: the accumulated key bytes are reversed
        // as one buffer and read as a single integer.
        let claims_key = if claims_proof.is_empty() {
            None
        } else {
            key_bytes.reverse();
            let key = BigUint::from_bytes_be(&key_bytes);
            field::ensure_in_field(&key)?;
            Some(key)
        };

        info!(
            "Proof input built - signals: {}, claims: {}, unresolved: {}, elapsed: {:?}",
            signals.len(),
            claims_proof.len(),
            unresolved,
            start.elapsed()
        );

        Ok(ProofInput {
            signals,
            claims_key,
            claims_proof,
        })
    }
}
