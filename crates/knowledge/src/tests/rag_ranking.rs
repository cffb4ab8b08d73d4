//! Tests for ranking correctness of the similarity index.

use crate::index::SimilarityIndex;
use std::sync::Arc;

/// Helper to create a normalized embedding.
fn normalize(v: &[f32]) -> Vec<f32> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter().map(|x| x / norm).collect()
    } else {
        v.to_vec()
    }
}

fn scaled(v: &[f32], factor: f32) -> Vec<f32> {
    v.iter().map(|x| x * factor).collect()
}

/// Four records in a 4-d space, inserted in a fixed order.
fn populated_index() -> SimilarityIndex {
    let index = SimilarityIndex::new(4).unwrap();
    index
        .insert(normalize(&[1.0, 0.5, 0.2, 0.1]), "Rust is a systems programming language")
        .unwrap();
    index
        .insert(normalize(&[-0.3, -0.8, 0.4, -0.2]), "Cooking recipes for pasta")
        .unwrap();
    index
        .insert(normalize(&[0.7, 0.6, 0.1, 0.0]), "Cargo builds Rust crates")
        .unwrap();
    index
        .insert(normalize(&[0.0, 0.1, 0.9, 0.4]), "Gardening in spring")
        .unwrap();
    index
}

#[test]
fn test_relevant_query_ranks_first() {
    let index = populated_index();
    let query = normalize(&[0.9, 0.4, 0.3, 0.1]);

    let results = index.query_scored(&query, 4).unwrap();

    assert_eq!(results[0].text, "Rust is a systems programming language");
    assert!(results[0].score > 0.9, "Score was {}", results[0].score);
    assert!(
        results.windows(2).all(|w| w[0].score >= w[1].score),
        "Scores should be ordered descending"
    );
    assert_eq!(
        results.last().map(|r| r.text.as_str()),
        Some("Cooking recipes for pasta")
    );
}

#[test]
fn test_self_similarity_is_maximal() {
    let vectors = [
        vec![1.0, 0.0, 0.0, 0.0],
        vec![0.3, -0.2, 0.9, 0.1],
        vec![5.0, 5.0, 5.0, 5.0],
        vec![-0.1, 0.2, 0.0, 0.0],
    ];

    for (i, v) in vectors.iter().enumerate() {
        let index = populated_index();
        let text = format!("self match {}", i);
        index.insert(v.clone(), text.clone()).unwrap();

        let scored = index.query_scored(v, 1).unwrap();
        assert_eq!(scored[0].text, text);
        assert!((scored[0].score - 1.0).abs() < 1e-3);
    }
}

#[test]
fn test_empty_index_returns_no_results() {
    let index = SimilarityIndex::new(4).unwrap();
    for k in [1, 3, 100] {
        let results = index.query_top_k(&[0.1, 0.2, 0.3, 0.4], k).unwrap();
        assert!(results.is_empty(), "Empty index should return no results");
    }
}

#[test]
fn test_top_k_limit_respected() {
    let index = populated_index();
    let query = normalize(&[0.5, 0.5, 0.5, 0.5]);

    assert_eq!(index.query_top_k(&query, 3).unwrap().len(), 3);
    assert_eq!(index.query_top_k(&query, 1).unwrap().len(), 1);
    assert_eq!(
        index.query_top_k(&query, 50).unwrap().len(),
        4,
        "Should return min(k, size) results"
    );
}

#[test]
fn test_rescaling_does_not_change_ranking() {
    let index = populated_index();
    let query = [0.2, 0.9, -0.1, 0.3];

    let base = index.query_top_k(&query, 4).unwrap();
    let doubled = index.query_top_k(&scaled(&query, 2.0), 4).unwrap();
    let shrunk = index.query_top_k(&scaled(&query, 0.25), 4).unwrap();

    assert_eq!(base, doubled);
    assert_eq!(base, shrunk);

    // Rescaling a stored vector also leaves the ranking alone
    let rescaled = SimilarityIndex::new(4).unwrap();
    rescaled
        .insert(scaled(&normalize(&[1.0, 0.5, 0.2, 0.1]), 3.0), "Rust is a systems programming language")
        .unwrap();
    rescaled
        .insert(normalize(&[-0.3, -0.8, 0.4, -0.2]), "Cooking recipes for pasta")
        .unwrap();
    rescaled
        .insert(scaled(&normalize(&[0.7, 0.6, 0.1, 0.0]), 0.5), "Cargo builds Rust crates")
        .unwrap();
    rescaled
        .insert(normalize(&[0.0, 0.1, 0.9, 0.4]), "Gardening in spring")
        .unwrap();
    assert_eq!(rescaled.query_top_k(&query, 4).unwrap(), base);
}

#[test]
fn test_ties_keep_insertion_order() {
    let index = SimilarityIndex::new(2).unwrap();
    index.insert(vec![1.0, 0.0], "first").unwrap();
    index.insert(vec![0.0, 1.0], "other").unwrap();
    index.insert(vec![1.0, 0.0], "second").unwrap();
    index.insert(vec![1.0, 0.0], "third").unwrap();

    let results = index.query_top_k(&[1.0, 0.0], 3).unwrap();
    assert_eq!(results, vec!["first", "second", "third"]);

    // Deterministic across repeated queries
    for _ in 0..5 {
        assert_eq!(index.query_top_k(&[1.0, 0.0], 3).unwrap(), results);
    }
}

#[test]
fn test_negative_similarity_ranks_last() {
    let index = SimilarityIndex::new(2).unwrap();
    index.insert(vec![-1.0, 0.0], "opposite").unwrap();
    index.insert(vec![0.0, 1.0], "orthogonal").unwrap();
    index.insert(vec![1.0, 0.0], "aligned").unwrap();

    let results = index.query_scored(&[1.0, 0.0], 3).unwrap();
    let texts: Vec<&str> = results.iter().map(|r| r.text.as_str()).collect();
    assert_eq!(texts, vec!["aligned", "orthogonal", "opposite"]);
    assert!(results[2].score < 0.0);
}

#[test]
fn test_zero_query_scores_zero() {
    let index = populated_index();
    let results = index.query_scored(&[0.0, 0.0, 0.0, 0.0], 4).unwrap();

    assert_eq!(results.len(), 4);
    assert!(results.iter().all(|r| r.score == 0.0));
    // All tied, so insertion order
    assert_eq!(results[0].text, "Rust is a systems programming language");
    assert_eq!(results[3].text, "Gardening in spring");
}

#[test]
fn test_clear_then_query_is_empty() {
    let index = populated_index();
    index.clear();
    index.clear();

    assert_eq!(index.size(), 0);
    assert_eq!(index.dim(), 4);
    assert!(index.query_top_k(&[1.0, 0.0, 0.0, 0.0], 2).unwrap().is_empty());

    // Still accepts records of the original dimension only
    assert!(index.insert(vec![1.0, 0.0, 0.0], "short").is_err());
    index.insert(vec![1.0, 0.0, 0.0, 0.0], "after clear").unwrap();
    assert_eq!(
        index.query_top_k(&[1.0, 0.0, 0.0, 0.0], 2).unwrap(),
        vec!["after clear"]
    );
}

#[test]
fn test_concurrent_inserts_and_queries() {
    let index = Arc::new(SimilarityIndex::new(3).unwrap());

    let writers: Vec<_> = (0..4)
        .map(|w| {
            let index = Arc::clone(&index);
            std::thread::spawn(move || {
                for i in 0..50 {
                    index
                        .insert(vec![1.0, w as f32, i as f32], format!("w{}-{}", w, i))
                        .unwrap();
                }
            })
        })
        .collect();

    let reader = {
        let index = Arc::clone(&index);
        std::thread::spawn(move || {
            for _ in 0..50 {
                let size_before = index.size();
                let results = index.query_top_k(&[1.0, 1.0, 1.0], 500).unwrap();
                assert!(results.len() >= size_before);
                assert!(results.len() <= 200);
            }
        })
    };

    for writer in writers {
        writer.join().unwrap();
    }
    reader.join().unwrap();

    assert_eq!(index.size(), 200);
}
