//! Brute-force recall check: k-NN search should agree with exhaustive
//! distance ranking on a small, well-separated dataset.

use annidx::hnsw::{HnswConfig, HnswIndex};
use annidx::metric::{L2Squared, Metric};
use annidx::storage::VectorStorage;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

fn brute_force_knn(vectors: &[Vec<f32>], query: &[f32], k: usize) -> Vec<usize> {
    let mut ranked: Vec<(usize, f32)> = vectors
        .iter()
        .enumerate()
        .map(|(i, v)| (i, L2Squared::distance(query, v)))
        .collect();
    ranked.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap());
    ranked.into_iter().take(k).map(|(i, _)| i).collect()
}

#[test]
fn knn_search_matches_brute_force_on_small_dataset() {
    let dims = 32;
    let n = 300;
    let k = 10;

    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let vectors: Vec<Vec<f32>> = (0..n)
        .map(|_| (0..dims).map(|_| rng.gen_range(-1.0..1.0)).collect())
        .collect();

    let config = HnswConfig::new(dims as u32).with_metric(annidx::metric::MetricKind::L2Squared);
    let mut storage = VectorStorage::new(&config);
    let mut index = HnswIndex::new(config, &storage).unwrap();

    let mut vector_ids = Vec::new();
    for v in &vectors {
        vector_ids.push(index.insert(v, &mut storage).unwrap());
    }

    let query = &vectors[0];
    let results = index.search(query, k, &storage).unwrap();
    let found: Vec<usize> = results
        .iter()
        .map(|r| vector_ids.iter().position(|id| *id == r.vector_id).unwrap())
        .collect();

    let expected = brute_force_knn(&vectors, query, k);
    let overlap = found.iter().filter(|i| expected.contains(i)).count();

    assert!(
        overlap as f32 / k as f32 >= 0.8,
        "recall too low: found {found:?}, expected {expected:?}"
    );
    assert_eq!(found[0], expected[0], "exact match should always be nearest");
}

#[test]
fn deleting_a_node_removes_it_from_future_results() {
    let dims = 4;
    let config = HnswConfig::new(dims);
    let mut storage = VectorStorage::new(&config);
    let mut index = HnswIndex::new(config, &storage).unwrap();

    let target = vec![1.0, 1.0, 1.0, 1.0];
    let id = index.insert(&target, &mut storage).unwrap();
    for i in 0..20 {
        index
            .insert(&vec![i as f32 * 10.0; 4], &mut storage)
            .unwrap();
    }

    assert!(index.delete(id, &mut storage));
    let results = index.search(&target, 5, &storage).unwrap();
    assert!(results.iter().all(|r| r.vector_id != id));
}
