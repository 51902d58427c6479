use bytes::Bytes;
use moka::sync::Cache;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::models::TotalRowHints;
use crate::services::dashboard::CategoryReport;
use crate::services::workbook::SheetMapping;

/// Extracted category reports memoized by workbook identity.
///
/// Only the extraction is cached; snapshots depend on the selected date
/// and are rebuilt per request.
#[derive(Clone)]
pub struct ReportCache {
    inner: Cache<u64, Arc<Vec<CategoryReport>>>,
}

impl ReportCache {
    pub fn new(capacity: u64) -> Self {
        Self {
            inner: Cache::new(capacity),
        }
    }

    pub fn key(data: &Bytes, mapping: &SheetMapping, hints: &TotalRowHints) -> u64 {
        let mut hasher = DefaultHasher::new();
        data.hash(&mut hasher);
        mapping.hash(&mut hasher);
        hints.hash(&mut hasher);
        hasher.finish()
    }

    pub fn get(&self, key: u64) -> Option<Arc<Vec<CategoryReport>>> {
        let hit = self.inner.get(&key);
        if hit.is_some() {
            tracing::debug!("Report cache hit for {:016x}", key);
        }
        hit
    }

    pub fn insert(&self, key: u64, reports: Vec<CategoryReport>) -> Arc<Vec<CategoryReport>> {
        let reports = Arc::new(reports);
        self.inner.insert(key, Arc::clone(&reports));
        reports
    }
}
