use cosmian_traceable_abe::{access_structure::AccessStructureKind, TraceableAbe};
use criterion::{criterion_group, criterion_main, BatchSize, Criterion};

const KINDS: [AccessStructureKind; 2] = [AccessStructureKind::Matrix, AccessStructureKind::Tree];

/// Generate encryption policies of growing size along with the attributes of
/// a user able to decrypt all of them.
///
/// Policies with more than one gate are generated only if
/// `--features full_bench` is passed.
fn get_policies() -> (Vec<&'static str>, Vec<&'static str>) {
    #[allow(unused_mut)]
    let mut policies = vec!["Department::FIN and Level::Protected"];

    #[cfg(feature = "full_bench")]
    {
        policies.push(
            "(Department::FIN and Level::Protected) or (Department::HR and Level::Confidential)",
        );
        policies.push("2 of (Department::FIN, Department::HR, Department::MKG)");
        policies.push(
            "(Department::FIN and Level::Protected) or 2 of (Department::HR, Department::MKG, \
             (Department::R&D and Level::Confidential))",
        );
    }

    let attributes = vec!["Department::FIN", "Department::MKG", "Level::Protected"];
    (attributes, policies)
}

fn bench_setup(c: &mut Criterion) {
    let abe = TraceableAbe::default();
    let mut group = c.benchmark_group("Setup");
    for user_count in [10, 100, 1000] {
        group.bench_function(&format!("{user_count} users"), |b| {
            b.iter(|| abe.setup(user_count).expect("cannot generate master keys"));
        });
    }
}

fn bench_keygen(c: &mut Criterion) {
    let abe = TraceableAbe::default();
    let (attributes, _) = get_policies();
    let (_, msk) = abe.setup(100).expect("cannot generate master keys");

    c.bench_function("Keygen", |b| {
        b.iter_batched(
            || msk.clone(),
            |mut msk| {
                abe.generate_user_key(&mut msk, &attributes)
                    .expect("cannot generate user key")
            },
            BatchSize::SmallInput,
        );
    });
}

fn bench_encryption(c: &mut Criterion) {
    let abe = TraceableAbe::default();
    let (_, policies) = get_policies();
    let (mpk, _) = abe.setup(100).expect("cannot generate master keys");

    let mut group = c.benchmark_group("Encryption");
    for kind in KINDS {
        for (n_policy, policy) in policies.iter().enumerate() {
            group.bench_function(&format!("{kind:?}, policy {}", n_policy + 1), |b| {
                b.iter(|| {
                    abe.encrypt(&mpk, policy, kind, &[], 0)
                        .unwrap_or_else(|_| panic!("cannot encrypt for policy {}", n_policy + 1))
                });
            });
        }
    }
}

fn bench_decryption(c: &mut Criterion) {
    let abe = TraceableAbe::default();
    let (attributes, policies) = get_policies();
    let (mpk, mut msk) = abe.setup(100).expect("cannot generate master keys");
    let usk = abe
        .generate_user_key(&mut msk, &attributes)
        .expect("cannot generate user key");

    let mut group = c.benchmark_group("Decryption");
    for kind in KINDS {
        for (n_policy, policy) in policies.iter().enumerate() {
            let (ciphertext, _) = abe
                .encrypt(&mpk, policy, kind, &[], 0)
                .unwrap_or_else(|_| panic!("cannot encrypt for policy {}", n_policy + 1));
            group.bench_function(&format!("{kind:?}, policy {}", n_policy + 1), |b| {
                b.iter(|| {
                    abe.decrypt(&usk, &ciphertext)
                        .unwrap_or_else(|_| panic!("cannot decrypt policy {}", n_policy + 1))
                });
            });
        }
    }
}

#[cfg(feature = "full_bench")]
fn bench_serialization(c: &mut Criterion) {
    use cosmian_crypto_core::bytes_ser_de::Serializable;

    let abe = TraceableAbe::default();
    let (attributes, policies) = get_policies();
    let (mpk, mut msk) = abe.setup(100).expect("cannot generate master keys");
    let usk = abe
        .generate_user_key(&mut msk, &attributes)
        .expect("cannot generate user key");

    println!("bench ciphertext size: ");
    for kind in KINDS {
        for (n_policy, policy) in policies.iter().enumerate() {
            let (ciphertext, _) = abe
                .encrypt(&mpk, policy, kind, &[], 0)
                .expect("cannot encrypt");
            println!(
                "{kind:?}, policy {}: {} bytes",
                n_policy + 1,
                ciphertext.serialize().unwrap().len(),
            );
        }
    }

    let mut group = c.benchmark_group("Key serialization");
    group.bench_function("MSK", |b| {
        b.iter(|| msk.serialize().expect("cannot serialize msk"));
    });
    group.bench_function("MPK", |b| {
        b.iter(|| mpk.serialize().expect("cannot serialize mpk"));
    });
    group.bench_function("USK", |b| {
        b.iter(|| usk.serialize().expect("cannot serialize usk"));
    });
}

criterion_group!(
    name = benches;
    config = Criterion::default().sample_size(10);
    targets =
        bench_setup,
        bench_keygen,
        bench_encryption,
        bench_decryption
);

#[cfg(feature = "full_bench")]
criterion_group!(
name = benches_serialization;
config = Criterion::default().sample_size(100);
targets = bench_serialization,
);

#[cfg(feature = "full_bench")]
criterion_main!(benches, benches_serialization);

#[cfg(not(feature = "full_bench"))]
criterion_main!(benches);
