//! # zkcred proof-input compiler
//!
//! Turns a holder's verifiable credential and a service's policy constants
//! into the positional witness input a circom prover consumes, disclosing
//! only the claims the circuit asks for.
//!
//! ## Resolution order
//!
//! - **Private signals**: reserved signals first, then a claims tree lookup
//!   that also records the claim's tree key and inclusion proof. A missing
//!   claim fails the build.
//! - **Public signals**: reserved signals first, then the policy rule table.
//!   Signals no rule mentions stay absent from the output; they are never
//!   zero-filled.
//!
//! ## Example
//!
//! ```rust,ignore
//! use zkcred_proof_input::{Circuit, ProofInputBuilder, SystemDateSource};
//!
//! let circuit = Circuit::load("./circuits/age_check/circuit.json".as_ref())?;
//!
//! let input = ProofInputBuilder::new(credential, circuit)
//!     .policy(policy)
//!     .timestamp_source(SystemDateSource)
//!     .tree_depth(16)
//!     .build()
//!     .await?;
//!
//! let json = input.to_json()?; // snarkjs input.json
//! ```

#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod builder;
pub mod claims;
pub mod display;
pub mod error;
pub mod field;
pub mod input;
pub mod known;
pub mod policy;
pub mod scheme;
pub mod signal;
pub mod trustee;
pub mod types;

// Re-exports
pub use builder::ProofInputBuilder;
pub use claims::{ClaimEntry, ClaimsAccumulator, ClaimsLookup, SparseMerkleAccumulator};
pub use display::{format_rules, RuleLabel};
pub use error::{ProofInputError, Result};
pub use input::{ProofInput, SignalValue};
pub use known::{KnownSignal, SystemDateSource, TimestampSource, TrusteeKeySource};
pub use scheme::{BabyJubJubScheme, ProofPayload, SignatureScheme};
pub use signal::SignalDecl;
pub use trustee::select_trustees;
pub use types::{Circuit, Credential, CredentialProof, Policy, PolicyRule, Trustee, TrusteeKey};
