use criterion::{black_box, criterion_group, criterion_main, Criterion};

use mboxscope::identity::{canonicalize, IdentityRegistry};

fn bench_canonicalize(c: &mut Criterion) {
    let providers = vec!["gmail.com".to_string()];
    let inputs = [
        "A.Lice@GMAIL.COM/TalkGadget9A8B",
        "bob@example.com",
        "not-an-address",
        "Carol.Von.Something@Gmail.Com",
    ];

    c.bench_function("canonicalize_mixed", |b| {
        b.iter(|| {
            for input in &inputs {
                black_box(canonicalize(black_box(input), &providers));
            }
        })
    });
}

fn bench_registry_resolve(c: &mut Criterion) {
    let providers = vec!["gmail.com".to_string()];

    c.bench_function("registry_resolve_10k", |b| {
        b.iter(|| {
            let mut registry = IdentityRegistry::new(true, providers.clone());
            for i in 0..10_000u32 {
                // ~1k distinct identities, each resolved ~10 times
                let address = format!("user{}@host{}.example.com", i % 1000, i % 7);
                black_box(registry.resolve(&address, "Some Name"));
            }
            registry.identity_count()
        })
    });
}

criterion_group!(benches, bench_canonicalize, bench_registry_resolve);
criterion_main!(benches);
