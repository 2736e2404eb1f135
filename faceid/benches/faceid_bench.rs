use bytes::Bytes;
use criterion::{Criterion, black_box, criterion_group, criterion_main};
use facegroup_faceid::{ClusterEngine, EmbeddingStore, FaceEmbedding, is_new_face};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Gaussian-ish unit vector: sum of uniforms per coordinate, normalized.
fn unit_vec(rng: &mut StdRng, dim: usize) -> Vec<f32> {
    let mut v: Vec<f32> = (0..dim)
        .map(|_| (0..4).map(|_| rng.gen_range(-1.0f32..1.0)).sum::<f32>())
        .collect();
    normalize(&mut v);
    v
}

fn normalize(v: &mut [f32]) {
    let norm: f64 = v.iter().map(|&x| (x as f64) * (x as f64)).sum::<f64>().sqrt();
    if norm > 0.0 {
        let s = (1.0 / norm) as f32;
        v.iter_mut().for_each(|x| *x *= s);
    }
}

/// `people` identities with `per_person` noisy shots each.
fn make_people(rng: &mut StdRng, dim: usize, people: usize, per_person: usize, noise: f32) -> Vec<Vec<f32>> {
    let mut out = Vec::with_capacity(people * per_person);
    for _ in 0..people {
        let center = unit_vec(rng, dim);
        for _ in 0..per_person {
            let jitter = unit_vec(rng, dim);
            let mut v: Vec<f32> = center.iter().zip(&jitter).map(|(c, j)| c + j * noise).collect();
            normalize(&mut v);
            out.push(v);
        }
    }
    out
}

fn bench_gate(c: &mut Criterion) {
    let dim = 512;
    let mut rng = StdRng::seed_from_u64(11);
    let existing: Vec<Vec<f32>> = (0..50).map(|_| unit_vec(&mut rng, dim)).collect();
    let candidate = unit_vec(&mut rng, dim);

    c.bench_function("faceid_gate_512d_50faces", |b| {
        b.iter(|| black_box(is_new_face(black_box(&candidate), &existing, 0.6)));
    });
}

fn bench_cluster(c: &mut Criterion) {
    let dim = 512;
    let store = EmbeddingStore::new(dim);
    let mut rng = StdRng::seed_from_u64(23);
    for (i, v) in make_people(&mut rng, dim, 10, 6, 0.1).into_iter().enumerate() {
        store.admit(FaceEmbedding::from(v), Bytes::from(vec![i as u8; 16])).unwrap();
    }
    let snapshot = store.snapshot();
    let engine = ClusterEngine::new(5, 100).with_seed(1);

    c.bench_function("faceid_cluster_512d_60faces_k5", |b| {
        b.iter(|| black_box(engine.cluster(black_box(&snapshot))));
    });
}

criterion_group!(benches, bench_gate, bench_cluster);
criterion_main!(benches);
