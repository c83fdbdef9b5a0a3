use std::collections::HashMap;
use std::sync::Arc;

use artpick::catalog::memory::FixtureCatalog;
use artpick::catalog::{CatalogClient, CatalogError};
use artpick::model::Page;
use async_trait::async_trait;
use tokio::sync::{Semaphore, watch};

/// Captures tracing output for tests.
#[allow(dead_code)]
pub struct TestTracing {
    buffer: std::sync::Arc<std::sync::Mutex<Vec<u8>>>,
}

#[allow(dead_code)]
impl TestTracing {
    pub fn new() -> Self {
        Self {
            buffer: std::sync::Arc::new(std::sync::Mutex::new(Vec::new())),
        }
    }

    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let writer = self.buffer.clone();
        let make_writer = move || TestWriter(writer.clone());
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .without_time()
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(make_writer)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn output(&self) -> String {
        let buf = self.buffer.lock().unwrap();
        String::from_utf8_lossy(&buf).to_string()
    }

    /// Assert that the captured log output contains the provided substring.
    pub fn assert_contains(&self, needle: &str) {
        let out = self.output();
        assert!(
            out.contains(needle),
            "expected logs to contain `{needle}`, got:\n{out}"
        );
    }
}

struct TestWriter(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

impl std::io::Write for TestWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut guard = self.0.lock().unwrap();
        guard.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Fixture catalog whose chosen pages block until the test releases them.
///
/// Lets a test hold a fetch in flight, issue more requests, and decide the
/// order in which responses arrive.
#[allow(dead_code)]
pub struct GatedCatalog {
    inner: FixtureCatalog,
    gates: parking_lot::Mutex<HashMap<usize, Arc<Semaphore>>>,
    arrivals: watch::Sender<usize>,
}

#[allow(dead_code)]
impl GatedCatalog {
    pub fn new(inner: FixtureCatalog) -> Self {
        Self {
            inner,
            gates: parking_lot::Mutex::new(HashMap::new()),
            arrivals: watch::channel(0).0,
        }
    }

    pub fn synthetic(count: usize) -> Self {
        Self::new(FixtureCatalog::synthetic(count))
    }

    pub fn fixture(&self) -> &FixtureCatalog {
        &self.inner
    }

    /// Hold every fetch of `page_index` until `release` is called for it.
    pub fn gate(&self, page_index: usize) {
        self.gates
            .lock()
            .insert(page_index, Arc::new(Semaphore::new(0)));
    }

    /// Let one held fetch of `page_index` through.
    pub fn release(&self, page_index: usize) {
        if let Some(gate) = self.gates.lock().get(&page_index) {
            gate.add_permits(1);
        }
    }

    /// Wait until `count` fetches have started (gated or not).
    pub async fn wait_for_arrivals(&self, count: usize) {
        let mut rx = self.arrivals.subscribe();
        rx.wait_for(|arrived| *arrived >= count)
            .await
            .expect("arrival channel open");
    }
}

#[async_trait]
impl CatalogClient for GatedCatalog {
    fn id(&self) -> &str {
        "gated"
    }

    async fn fetch_page(&self, page_index: usize, page_size: usize) -> Result<Page, CatalogError> {
        self.arrivals.send_modify(|n| *n += 1);
        let gate = self.gates.lock().get(&page_index).cloned();
        if let Some(gate) = gate {
            gate.acquire()
                .await
                .map_err(|e| CatalogError::Network(e.to_string()))?
                .forget();
        }
        self.inner.fetch_page(page_index, page_size).await
    }
}
