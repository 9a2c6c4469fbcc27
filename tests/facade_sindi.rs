//! End-to-end coverage of the label-keyed [`Index`] contract over SINDI.

use annidx::facade::{BuildParams, Index, SearchParams, SindiFacade};
use annidx::sparse::SparseVector;

fn doc(pairs: &[(u32, f32)]) -> SparseVector {
    SparseVector::from_pairs(pairs, 1000).unwrap()
}

#[test]
fn build_then_search_finds_the_closest_overlap() {
    let params = BuildParams::sparse(1000);
    let mut index = SindiFacade::new(&params).unwrap();

    let records = vec![
        (1, doc(&[(1, 1.0), (2, 1.0)])),
        (2, doc(&[(3, 1.0), (4, 1.0)])),
        (3, doc(&[(1, 1.0), (2, 1.0), (3, 1.0)])),
    ];
    let failed = index.build(records).unwrap();
    assert!(failed.is_empty());
    assert_eq!(index.num_elements(), 3);

    let query = doc(&[(1, 1.0), (2, 1.0)]);
    let hits = index
        .knn_search(&query, 2, &SearchParams::default(), None, None)
        .unwrap();
    assert!(!hits.is_empty());
    assert!(hits.iter().any(|h| h.label == 1));
}

#[test]
fn remove_excludes_label_from_future_searches() {
    let params = BuildParams::sparse(1000);
    let mut index = SindiFacade::new(&params).unwrap();
    index
        .build(vec![
            (1, doc(&[(1, 1.0)])),
            (2, doc(&[(1, 1.0), (2, 1.0)])),
        ])
        .unwrap();

    assert!(index.remove(1).unwrap());
    assert_eq!(index.num_elements(), 1);

    let hits = index
        .knn_search(&doc(&[(1, 1.0)]), 5, &SearchParams::default(), None, None)
        .unwrap();
    assert!(hits.iter().all(|h| h.label != 1));
}

#[test]
fn serialize_then_deserialize_preserves_search_results() {
    let params = BuildParams::sparse(1000);
    let mut index = SindiFacade::new(&params).unwrap();
    index
        .build(vec![
            (1, doc(&[(1, 1.0), (2, 1.0)])),
            (2, doc(&[(3, 1.0)])),
        ])
        .unwrap();

    let query = doc(&[(1, 1.0)]);
    let before = index.knn_search(&query, 2, &SearchParams::default(), None, None).unwrap();

    let blob = index.serialize().unwrap();
    let mut restored = SindiFacade::new(&params).unwrap();
    restored.deserialize(&blob).unwrap();
    let after = restored
        .knn_search(&query, 2, &SearchParams::default(), None, None)
        .unwrap();

    assert_eq!(before, after);
}

#[test]
fn stats_reports_index_name_and_live_count() {
    let params = BuildParams::sparse(1000);
    let mut index = SindiFacade::new(&params).unwrap();
    index.build(vec![(1, doc(&[(1, 1.0)]))]).unwrap();

    let stats = index.stats();
    assert!(stats.contains("\"index_name\":\"sindi\""));
    assert!(stats.contains("\"data_num\":1"));
}
