//! Protocol-reserved signals and their lazy material loaders

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Datelike, Utc};
use num_bigint::BigUint;
use tracing::debug;

use crate::error::{ProofInputError, Result};
use crate::input::SignalValue;
use crate::scheme::{ProofPayload, SignatureScheme};
use crate::signal::SignalDecl;
use crate::types::{CredentialProof, TrusteeKey};

/// Reserved signal kinds, resolved before claims or policy rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KnownSignal {
    /// `holderPrivateKey`
    HolderPrivateKey,
    /// `trusteePublicKeys[2k]`: flattened (x, y) pairs
    TrusteePublicKeys,
    /// `currentDate`
    Timestamp,
    /// `credentialRoot`
    CredentialRoot,
    /// `issuerPk[2]`
    IssuerPublicKey,
    /// `issuerSignature[3]`
    IssuerSignature,
}

impl KnownSignal {
    pub const ALL: [Self; 6] = [
        Self::HolderPrivateKey,
        Self::TrusteePublicKeys,
        Self::Timestamp,
        Self::CredentialRoot,
        Self::IssuerPublicKey,
        Self::IssuerSignature,
    ];

    /// Circuit signal name
    pub fn name(self) -> &'static str {
        match self {
            Self::HolderPrivateKey => "holderPrivateKey",
            Self::TrusteePublicKeys => "trusteePublicKeys",
            Self::Timestamp => "currentDate",
            Self::CredentialRoot => "credentialRoot",
            Self::IssuerPublicKey => "issuerPk",
            Self::IssuerSignature => "issuerSignature",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }
}

/// Lazy source of the current timestamp
#[async_trait]
pub trait TimestampSource: Send + Sync {
    async fn timestamp(&self) -> anyhow::Result<u64>;
}

/// Lazy source of the service's trustee public keys
#[async_trait]
pub trait TrusteeKeySource: Send + Sync {
    async fn trustee_keys(&self) -> anyhow::Result<Vec<TrusteeKey>>;
}

#[async_trait]
impl<F> TimestampSource for F
where
    F: Fn() -> anyhow::Result<u64> + Send + Sync,
{
    async fn timestamp(&self) -> anyhow::Result<u64> {
        self()
    }
}

#[async_trait]
impl<F> TrusteeKeySource for F
where
    F: Fn() -> anyhow::Result<Vec<TrusteeKey>> + Send + Sync,
{
    async fn trustee_keys(&self) -> anyhow::Result<Vec<TrusteeKey>> {
        self()
    }
}

/// Today's UTC date as the integer `YYYYMMDD`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemDateSource;

impl SystemDateSource {
    pub fn today() -> anyhow::Result<u64> {
        let today = Utc::now().date_naive();
        let year = u64::try_from(today.year())?;
        Ok(year * 10_000 + u64::from(today.month()) * 100 + u64::from(today.day()))
    }
}

#[async_trait]
impl TimestampSource for SystemDateSource {
    async fn timestamp(&self) -> anyhow::Result<u64> {
        Self::today()
    }
}

/// Materials backing the reserved signals
#[derive(Clone, Default)]
pub struct KnownMaterials {
    pub timestamp: Option<u64>,
    pub timestamp_source: Option<Arc<dyn TimestampSource>>,
    pub holder_private_key: Option<Vec<u8>>,
    pub trustee_keys: Option<Vec<TrusteeKey>>,
    pub trustee_key_source: Option<Arc<dyn TrusteeKeySource>>,
}

impl std::fmt::Debug for KnownMaterials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KnownMaterials")
            .field("timestamp", &self.timestamp)
            .field("timestamp_source", &self.timestamp_source.is_some())
            .field("holder_private_key", &self.holder_private_key.as_ref().map(|_| "<redacted>"))
            .field("trustee_keys", &self.trustee_keys.as_ref().map(Vec::len))
            .field("trustee_key_source", &self.trustee_key_source.is_some())
            .finish()
    }
}

/// Per-build resolver; each loader and the proof payload are consulted at most once
pub(crate) struct KnownSignalResolver<'a> {
    materials: KnownMaterials,
    scheme: &'a dyn SignatureScheme,
    proof: &'a CredentialProof,
    payload: Option<ProofPayload>,
    timestamp_loaded: bool,
}

impl<'a> KnownSignalResolver<'a> {
    pub(crate) fn new(
        materials: KnownMaterials,
        scheme: &'a dyn SignatureScheme,
        proof: &'a CredentialProof,
    ) -> Self {
        Self {
            materials,
            scheme,
            proof,
            payload: None,
            timestamp_loaded: false,
        }
    }

    /// Resolve `decl` if it names a reserved signal
    ///
    /// `Ok(None)` means either the name is not reserved or, for the
    /// timestamp only, no material was available.
    pub(crate) async fn resolve(&mut self, decl: &SignalDecl) -> Result<Option<SignalValue>> {
        let Some(kind) = KnownSignal::from_name(&decl.name) else {
            return Ok(None);
        };

        let values = match kind {
            KnownSignal::HolderPrivateKey => {
                let key = self.materials.holder_private_key.as_deref().ok_or_else(|| {
                    missing(decl, "holder private key")
                })?;
                vec![self.scheme.private_key_scalar(key)?]
            }
            KnownSignal::TrusteePublicKeys => self.trustee_values(decl).await?,
            KnownSignal::Timestamp => match self.timestamp().await? {
                Some(ts) => vec![BigUint::from(ts)],
                None => {
                    debug!(signal = %decl.name, "No timestamp available, leaving unresolved");
                    return Ok(None);
                }
            },
            KnownSignal::CredentialRoot => vec![self.payload()?.root.clone()],
            KnownSignal::IssuerPublicKey => self.payload()?.issuer_pk.to_vec(),
            KnownSignal::IssuerSignature => self.payload()?.signature.to_vec(),
        };

        debug!(signal = %decl.name, ?kind, "Resolved reserved signal");
        SignalValue::shaped(decl, values).map(Some)
    }

    async fn timestamp(&mut self) -> Result<Option<u64>> {
        if self.materials.timestamp.is_none() && !self.timestamp_loaded {
            self.timestamp_loaded = true;
            if let Some(source) = &self.materials.timestamp_source {
                let ts = source.timestamp().await.map_err(|source| ProofInputError::Loader {
                    loader: "timestamp",
                    source: source.into(),
                })?;
                self.materials.timestamp = Some(ts);
            }
        }
        Ok(self.materials.timestamp)
    }

    async fn trustee_values(&mut self, decl: &SignalDecl) -> Result<Vec<BigUint>> {
        if decl.arity % 2 != 0 {
            return Err(ProofInputError::InvalidSignalDeclaration {
                declaration: decl.to_string(),
                reason: "trustee keys are (x, y) pairs; arity must be even".into(),
            });
        }

        if self.materials.trustee_keys.is_none() {
            if let Some(source) = self.materials.trustee_key_source.take() {
                let keys = source
                    .trustee_keys()
                    .await
                    .map_err(|source| ProofInputError::Loader {
                        loader: "trustee key",
                        source: source.into(),
                    })?;
                self.materials.trustee_keys = Some(keys);
            }
        }

        let keys = self
            .materials
            .trustee_keys
            .as_ref()
            .ok_or_else(|| missing(decl, "trustee public keys"))?;
        let required = decl.arity / 2;
        if keys.len() < required {
            return Err(missing(
                decl,
                &format!("trustee public keys ({} of {required})", keys.len()),
            ));
        }

        Ok(keys[..required]
            .iter()
            .flat_map(|TrusteeKey(x, y)| [x.clone(), y.clone()])
            .collect())
    }

    fn payload(&mut self) -> Result<&ProofPayload> {
        if self.payload.is_none() {
            self.payload = Some(self.scheme.payload(self.proof)?);
        }
        self.payload
            .as_ref()
            .ok_or_else(|| ProofInputError::invalid_proof("payload unavailable"))
    }
}

fn missing(decl: &SignalDecl, material: &str) -> ProofInputError {
    ProofInputError::MissingKnownSignalMaterial {
        signal: decl.name.clone(),
        material: material.to_string(),
    }
}
