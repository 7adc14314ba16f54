//! Benchmark tests for critical operations
//!
//! Run with: cargo test bench --release -- --ignored --nocapture

use std::time::Instant;
use tempfile::NamedTempFile;

use qrlink::model::{NewLink, NewUser};
use qrlink::store::{RecordStore, RedbStore};

/// Benchmark helper to measure execution time
fn benchmark<F>(name: &str, iterations: usize, mut f: F)
where
    F: FnMut(usize),
{
    let start = Instant::now();

    for i in 0..iterations {
        f(i);
    }

    let duration = start.elapsed();
    let avg_ms = duration.as_millis() as f64 / iterations as f64;
    let ops_per_sec = (iterations as f64 / duration.as_secs_f64()) as u64;

    println!("  {} ({} iterations)", name, iterations);
    println!("    Total time: {:?}", duration);
    println!("    Avg time: {:.3}ms", avg_ms);
    println!("    Throughput: {} ops/sec\n", ops_per_sec);
}

fn setup_store() -> (RedbStore, NamedTempFile, String) {
    let temp_db = NamedTempFile::new().unwrap();
    let store = RedbStore::open(temp_db.path().to_str().unwrap())
        .unwrap()
        .with_bcrypt_cost(4);
    let user = store
        .create_user(NewUser {
            email: "bench@x.com".to_string(),
            password: "pw".to_string(),
            name: "Bench".to_string(),
        })
        .unwrap();
    (store, temp_db, user.id)
}

fn new_link(code: String) -> NewLink {
    NewLink {
        long_url: "https://example.com/bench".to_string(),
        short_url: format!("http://localhost:8080/{}", code),
        short_code: code,
        custom_alias: None,
    }
}

#[test]
#[ignore]
fn bench_create_links() {
    println!("\n=== Benchmark: Create links ===\n");

    let (store, _temp_db, user_id) = setup_store();

    benchmark("Create link", 1000, |i| {
        store.create_link(&user_id, new_link(format!("b{}", i))).unwrap();
    });
}

#[test]
#[ignore]
fn bench_record_clicks_and_analytics() {
    println!("\n=== Benchmark: Clicks and analytics ===\n");

    let (store, _temp_db, user_id) = setup_store();
    let link_ids: Vec<String> = (0..50)
        .map(|i| store.create_link(&user_id, new_link(format!("c{}", i))).unwrap().id)
        .collect();

    benchmark("Record click", 2000, |i| {
        store.record_link_click(&link_ids[i % link_ids.len()]).unwrap();
    });

    benchmark("Analytics (30 days)", 200, |_| {
        store.get_user_analytics(&user_id, 30, 10).unwrap();
    });
}
