//! Exercises the worker pool end-to-end against a tokenizer definition
//! loaded from disk, the way a real `tokenize` CLI invocation would.

mod common;

use llmloom::tokenizer::pool::WorkerPool;

fn write_synthetic_tokenizer(name: &str) {
    let def = serde_json::json!({
        "normalizer": {"type": "Lowercase"},
        "pre_tokenizer": {"type": "Whitespace"},
        "model": {
            "vocab": {"a": 0, "b": 1, "ab": 2, "<unk>": 3},
            "merges": [["a", "b"]],
            "unk_token": "<unk>",
            "byte_fallback": false
        },
        "added_tokens": [],
        "post_processor": null
    });
    let def_path = llmloom::paths::tokenizer_definition_path(name).unwrap();
    std::fs::write(&def_path, serde_json::to_vec(&def).unwrap()).unwrap();
}

// Both cases share one isolated state dir and one test function: the
// pool's tokenizer cache is keyed by name, and `isolate_state_dir` mutates
// a process-wide env var, so a second concurrent test function here would
// race the first over which temp dir is "current".
#[tokio::test]
async fn counts_batches_and_reports_missing_tokenizers() {
    let _state_dir = common::isolate_state_dir();
    write_synthetic_tokenizer("pool-test-fixture");

    let pool = WorkerPool::with_capacity(4);
    let inputs = vec!["ab".to_string(), "a b".to_string(), "ab ab".to_string(), "zzz".to_string()];
    let counts = pool.count_batch("pool-test-fixture", inputs, false).await.unwrap();
    assert_eq!(counts, vec![1, 2, 2, 1]);

    let err = pool.count_batch("never-written", vec!["hi".to_string()], false).await.unwrap_err();
    assert_eq!(err.kind(), llmloom::ErrorKind::TokenizerNotFound);
}
