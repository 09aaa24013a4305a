//! Concurrent writers and readers on a single store.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use procgauge_core::store::model::MemorySnapshot;
use procgauge_core::store::{MetricKind, MetricValue};
use procgauge_core::{GaugeRegistry, MetricsStore};

#[test]
fn readers_never_see_torn_values() {
    let store = Arc::new(MetricsStore::new(GaugeRegistry::new().unwrap()));
    let done = Arc::new(AtomicBool::new(false));

    let writer = {
        let store = store.clone();
        let done = done.clone();
        thread::spawn(move || {
            for i in 0..2_000u64 {
                let total_kb = 1_024_000 + i * 1024;
                let available_kb = (i * 7919) % total_kb;
                let mem = MemorySnapshot::from_kb(total_kb, available_kb).unwrap();
                store.update(MetricValue::Memory(mem));
                store.update(MetricValue::CpuUsage((i % 101) as f64));
            }
            done.store(true, Ordering::SeqCst);
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let store = store.clone();
            let done = done.clone();
            thread::spawn(move || {
                let mut seen = 0;
                while !done.load(Ordering::SeqCst) {
                    if let Some(MetricValue::Memory(m)) = store.read(MetricKind::Memory) {
                        assert_eq!(m.used_mb, m.total_mb - m.available_mb);
                        assert!((0.0..=100.0).contains(&m.usage_pct));
                        seen += 1;
                    }
                    let snap = store.snapshot();
                    if let Some(pct) = snap.cpu_usage_pct {
                        assert!((0.0..=100.0).contains(&pct));
                    }
                    assert!(store.render_text().is_ok());
                }
                seen
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }

    let snap = store.snapshot();
    assert!(snap.memory.is_some());
    assert_eq!(snap.cpu_usage_pct, Some((1_999 % 101) as f64));
}
