//! Benchmarks for claims tree construction and full input builds

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use num_bigint::BigUint;
use serde_json::{json, Map, Value};
use std::time::Duration;
use zkcred_proof_input::{
    claims::flatten_claims, BabyJubJubScheme, Circuit, ClaimsAccumulator, Credential,
    CredentialProof, Policy, PolicyRule, ProofInputBuilder, ProofPayload, SparseMerkleAccumulator,
};

fn subject(claims: usize) -> Map<String, Value> {
    let mut subject = Map::new();
    for i in 0..claims {
        subject.insert(format!("claim{i}"), json!(i * 7));
    }
    subject.insert("birthDate".into(), json!("19890101"));
    subject
}

fn credential(claims: usize) -> Credential {
    let payload = ProofPayload {
        root: BigUint::from(1u8),
        issuer_pk: [BigUint::from(2u8), BigUint::from(3u8)],
        signature: [BigUint::from(4u8), BigUint::from(5u8), BigUint::from(6u8)],
    };
    Credential {
        id: "bench".into(),
        issuer: "did:example:issuer".into(),
        credential_subject: subject(claims),
        proof: CredentialProof {
            proof_type: "BJJSignature2021".into(),
            proof_value: BabyJubJubScheme::encode(&payload).unwrap(),
        },
    }
}

/// Benchmark tree construction as the claim count grows
fn bench_claims_tree(c: &mut Criterion) {
    let mut group = c.benchmark_group("claims_tree");
    group.measurement_time(Duration::from_secs(10));

    for claims in [8usize, 64, 256] {
        let flattened = flatten_claims(&subject(claims)).unwrap();
        group.bench_with_input(BenchmarkId::new("claims", claims), &flattened, |b, flattened| {
            b.iter(|| {
                let tree = SparseMerkleAccumulator.build(black_box(flattened), 32).unwrap();
                black_box(tree.root())
            });
        });
    }

    group.finish();
}

/// Benchmark a full age-check build
fn bench_full_build(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let circuit = Circuit::new(
        "age_check",
        &["birthDate"],
        &["currentDate", "minAge", "maxAge", "credentialRoot", "issuerPk[2]", "issuerSignature[3]"],
    )
    .unwrap();
    let policy = Policy {
        service: "bench".into(),
        circuit: "age_check".into(),
        rules: vec![PolicyRule::from_u64(0, "minAge", 18)],
    };
    let credential = credential(64);

    c.bench_function("age_check_build", |b| {
        b.iter(|| {
            let builder = ProofInputBuilder::new(credential.clone(), circuit.clone())
                .policy(policy.clone())
                .timestamp(20_240_101)
                .tree_depth(32);
            black_box(runtime.block_on(builder.build()).unwrap())
        });
    });
}

criterion_group!(benches, bench_claims_tree, bench_full_build);

criterion_main!(benches);
