//! Claims tree: a fixed-depth accumulator over a credential's claims
//!
//! The compiler only needs per-path lookups with inclusion proofs; the tree
//! primitive itself sits behind [`ClaimsAccumulator`] so the platform's own
//! implementation can be plugged in. [`SparseMerkleAccumulator`] is the
//! bundled default.

use std::collections::{BTreeMap, HashMap};

use ark_bn254::Fr;
use ark_ff::Zero;
use num_bigint::BigUint;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{ProofInputError, Result};
use crate::field;
use crate::types::Circuit;

/// Deepest tree the default accumulator supports (leaf index is a `u64`)
pub const MAX_TREE_DEPTH: usize = 64;

/// Lookup result for one claim path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimEntry {
    /// Encoded claim value (zero when not found)
    pub value: BigUint,
    /// Whether the path is present in the tree
    pub found: bool,
    /// Tree key in the accumulator's byte order (little-endian)
    pub key: Vec<u8>,
    /// Inclusion proof, leaf level first
    pub siblings: Vec<BigUint>,
}

/// Built tree handle
pub trait ClaimsLookup: Send + Sync {
    /// Commitment root
    fn root(&self) -> BigUint;

    /// Look up a normalized claim path
    fn get(&self, path: &str) -> ClaimEntry;
}

/// Tree primitive: builds a lookup handle over flattened claims
pub trait ClaimsAccumulator: Send + Sync {
    fn build(&self, claims: &[(String, BigUint)], depth: usize) -> Result<Box<dyn ClaimsLookup>>;
}

/// Map a signal name onto a claim path (`address_city` -> `address.city`)
pub fn normalize_path(signal_name: &str) -> String {
    signal_name.replace('_', ".")
}

/// Encode a single claim value as a field integer
///
/// Unsigned integers and decimal-digit strings below the modulus keep their
/// value; every other scalar is hashed into the field. Returns `None` for
/// `null`, which is not committed.
pub fn encode_claim_value(value: &Value) -> Result<Option<BigUint>> {
    match value {
        Value::Null => Ok(None),
        Value::Bool(b) => Ok(Some(BigUint::from(u8::from(*b)))),
        // negative and fractional numbers are committed by their JSON text
        Value::Number(n) => Ok(Some(match n.as_u64() {
            Some(v) => BigUint::from(v),
            None => hash_text(&n.to_string()),
        })),
        Value::String(s) => {
            if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
                if let Ok(v) = field::decimal_to_field(s) {
                    return Ok(Some(v));
                }
            }
            Ok(Some(hash_text(s)))
        }
        Value::Array(_) | Value::Object(_) => Err(ProofInputError::invalid_field(
            "composite claim values must be flattened",
        )),
    }
}

fn hash_text(text: &str) -> BigUint {
    field::from_fr(&field::hash_bytes(text.as_bytes()))
}

/// Flatten `credentialSubject` into dotted paths, sorted by path
pub fn flatten_claims(subject: &Map<String, Value>) -> Result<Vec<(String, BigUint)>> {
    let mut out = BTreeMap::new();
    for (key, value) in subject {
        flatten_into(key.clone(), value, &mut out)?;
    }
    Ok(out.into_iter().collect())
}

fn flatten_into(path: String, value: &Value, out: &mut BTreeMap<String, BigUint>) -> Result<()> {
    match value {
        Value::Object(map) => {
            for (key, nested) in map {
                flatten_into(format!("{path}.{key}"), nested, out)?;
            }
        }
        Value::Array(items) => {
            for (i, nested) in items.iter().enumerate() {
                flatten_into(format!("{path}.{i}"), nested, out)?;
            }
        }
        leaf => {
            if let Some(encoded) = encode_claim_value(leaf)? {
                out.insert(path, encoded);
            }
        }
    }
    Ok(())
}

/// Pick the tree depth: explicit override, else the circuit's `claimsProof[N]`
///
/// `Ok(None)` means no tree is needed because nothing is claim-backed.
pub fn resolve_depth(
    explicit: Option<usize>,
    circuit: &Circuit,
    has_claim_signals: bool,
) -> Result<Option<usize>> {
    if !has_claim_signals {
        return Ok(None);
    }
    explicit
        .or_else(|| circuit.declared_tree_depth())
        .map(Some)
        .ok_or_else(|| ProofInputError::TreeDepthUndetermined {
            circuit: circuit.name.clone(),
        })
}

/// Fixed-depth Merkle tree over the BN254 scalar field
///
/// Claims are sorted by path and leaf `i` holds the `i`-th claim, so any
/// credential with at most `2^depth` claims fits. `leaf = H(H(path), value)`,
/// `node = H(left, right)` and empty subtrees are 0. The tree key of a claim
/// is its leaf index, little-endian, `ceil(depth / 8)` bytes wide.
#[derive(Debug, Clone, Copy, Default)]
pub struct SparseMerkleAccumulator;

/// Width in bytes of a leaf index at `depth`
pub fn key_width(depth: usize) -> usize {
    depth.div_ceil(8)
}

fn leaf_hash(path: &str, value: &BigUint) -> Result<Fr> {
    let value = field::to_fr(value)?;
    Ok(field::hash_pair(&field::hash_bytes(path.as_bytes()), &value))
}

impl ClaimsAccumulator for SparseMerkleAccumulator {
    fn build(&self, claims: &[(String, BigUint)], depth: usize) -> Result<Box<dyn ClaimsLookup>> {
        if depth == 0 || depth > MAX_TREE_DEPTH {
            return Err(ProofInputError::ClaimsTree {
                reason: format!("depth {depth} outside 1..={MAX_TREE_DEPTH}"),
            });
        }
        let capacity = 1u128 << depth;
        if claims.len() as u128 > capacity {
            return Err(ProofInputError::ClaimsTree {
                reason: format!(
                    "{} claims exceed the {capacity} leaves of a depth {depth} tree",
                    claims.len()
                ),
            });
        }

        let mut sorted: Vec<&(String, BigUint)> = claims.iter().collect();
        sorted.sort_by(|a, b| a.0.cmp(&b.0));
        if let Some(pair) = sorted.windows(2).find(|w| w[0].0 == w[1].0) {
            return Err(ProofInputError::ClaimsTree {
                reason: format!("duplicate claim path {}", pair[0].0),
            });
        }

        #[cfg(feature = "parallel")]
        let hashes: Vec<Fr> = {
            use rayon::prelude::*;
            sorted
                .par_iter()
                .map(|(path, value)| leaf_hash(path, value))
                .collect::<Result<_>>()?
        };
        #[cfg(not(feature = "parallel"))]
        let hashes: Vec<Fr> = sorted
            .iter()
            .map(|(path, value)| leaf_hash(path, value))
            .collect::<Result<_>>()?;

        let mut level: HashMap<u64, Fr> = HashMap::with_capacity(hashes.len());
        let mut entries = HashMap::with_capacity(hashes.len());
        for (slot, ((path, value), hash)) in (0u64..).zip(sorted.into_iter().zip(hashes)) {
            level.insert(slot, hash);
            entries.insert(path.clone(), (slot, value.clone()));
        }

        let mut levels = Vec::with_capacity(depth);
        for _ in 0..depth {
            let mut parents: HashMap<u64, Fr> = HashMap::with_capacity(level.len() / 2 + 1);
            for &slot in level.keys() {
                let parent = slot >> 1;
                if parents.contains_key(&parent) {
                    continue;
                }
                let left = level.get(&(parent << 1)).copied().unwrap_or_else(Fr::zero);
                let right = level
                    .get(&((parent << 1) | 1))
                    .copied()
                    .unwrap_or_else(Fr::zero);
                parents.insert(parent, field::hash_pair(&left, &right));
            }
            levels.push(level);
            level = parents;
        }
        let root = level.get(&0).copied().unwrap_or_else(Fr::zero);

        debug!(claims = entries.len(), depth, "Claims tree built");

        Ok(Box::new(SparseMerkleTree {
            depth,
            levels,
            entries,
            root,
        }))
    }
}

struct SparseMerkleTree {
    depth: usize,
    levels: Vec<HashMap<u64, Fr>>,
    entries: HashMap<String, (u64, BigUint)>,
    root: Fr,
}

impl SparseMerkleTree {
    fn siblings(&self, slot: u64) -> Vec<BigUint> {
        self.levels
            .iter()
            .enumerate()
            .map(|(height, nodes)| {
                let sibling = (slot >> height) ^ 1;
                nodes
                    .get(&sibling)
                    .map_or_else(BigUint::default, field::from_fr)
            })
            .collect()
    }
}

impl ClaimsLookup for SparseMerkleTree {
    fn root(&self) -> BigUint {
        field::from_fr(&self.root)
    }

    /// Absent paths have no leaf, so their key and siblings are empty
    fn get(&self, path: &str) -> ClaimEntry {
        match self.entries.get(path) {
            Some((slot, value)) => ClaimEntry {
                value: value.clone(),
                found: true,
                key: slot.to_le_bytes()[..key_width(self.depth)].to_vec(),
                siblings: self.siblings(*slot),
            },
            None => ClaimEntry {
                value: BigUint::default(),
                found: false,
                key: Vec::new(),
                siblings: Vec::new(),
            },
        }
    }
}
