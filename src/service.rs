//! Shared, cached view over the yearly placement collection.
//!
//! Every consumer (stat cards, charts, exports, reports) reads through one
//! `StatsService`, so the collection is fetched once and reduced on demand.
//! Writes go through the store first and are merged into the cache only after
//! they succeed.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{error, info, warn};

use crate::aggregate;
use crate::error::{PortalError, StoreError};
use crate::import::ParsedImport;
use crate::models::{
    ChartSeries, Dashboard, Scope, StatSummary, YearlyPlacementRecord, YEARLY_STATS_COLLECTION,
};
use crate::records;
use crate::store::DocumentStore;

#[derive(Debug, Default)]
struct CacheState {
    /// Bumped on every write or invalidation. A load that started under an older
    /// generation must not populate the cache.
    generation: u64,
    records: Option<Arc<Vec<YearlyPlacementRecord>>>,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ImportSummary {
    pub written: Vec<String>,
    pub skipped: usize,
    pub over_counted: Vec<String>,
}

pub struct StatsService {
    store: Arc<dyn DocumentStore>,
    cache: RwLock<CacheState>,
}

impl StatsService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            cache: RwLock::new(CacheState::default()),
        }
    }

    /// All yearly records, newest year first.
    pub async fn records(&self) -> Result<Arc<Vec<YearlyPlacementRecord>>, StoreError> {
        let generation = {
            let state = self.cache.read().await;
            if let Some(records) = &state.records {
                return Ok(Arc::clone(records));
            }
            state.generation
        };

        let documents = self.store.list(YEARLY_STATS_COLLECTION).await?;
        let mut loaded: Vec<YearlyPlacementRecord> =
            documents.iter().map(records::from_document).collect();
        records::sort_newest_first(&mut loaded);
        let loaded = Arc::new(loaded);

        let mut state = self.cache.write().await;
        if state.generation == generation {
            state.records = Some(Arc::clone(&loaded));
        } else {
            info!("discarding stale yearly stats load");
        }

        Ok(loaded)
    }

    /// Fetch failures degrade to an empty record set.
    pub async fn records_or_empty(&self) -> Arc<Vec<YearlyPlacementRecord>> {
        match self.records().await {
            Ok(records) => records,
            Err(e) => {
                error!(error = %e, "failed to load yearly placement stats");
                Arc::new(Vec::new())
            }
        }
    }

    pub async fn invalidate(&self) {
        let mut state = self.cache.write().await;
        state.generation += 1;
        state.records = None;
    }

    pub async fn refresh(&self) -> Result<Arc<Vec<YearlyPlacementRecord>>, StoreError> {
        self.invalidate().await;
        self.records().await
    }

    /// Overwrites the record for its year. On failure the cache is untouched.
    pub async fn upsert(&self, record: YearlyPlacementRecord) -> Result<(), StoreError> {
        if record.is_over_counted() {
            warn!(
                year = %record.year,
                eligible = record.eligible,
                placed = record.placed,
                higher_studies = record.higher_studies,
                "placed plus higher studies exceeds eligible"
            );
        }

        self.write_record(&record).await?;
        self.apply_written(std::slice::from_ref(&record)).await;
        info!(year = %record.year, "yearly placement stats saved");
        Ok(())
    }

    /// Writes every parsed row. Rows written before a failure stay written and
    /// are reflected in the cache.
    pub async fn import(&self, parsed: ParsedImport) -> Result<ImportSummary, PortalError> {
        let mut summary = ImportSummary {
            skipped: parsed.skipped,
            ..Default::default()
        };
        let mut written = Vec::with_capacity(parsed.records.len());

        for record in parsed.records {
            if let Err(e) = self.write_record(&record).await {
                self.apply_written(&written).await;
                return Err(e.into());
            }

            if record.is_over_counted() {
                warn!(year = %record.year, "imported year is over-counted");
                summary.over_counted.push(record.year.clone());
            }
            summary.written.push(record.year.clone());
            written.push(record);
        }

        self.apply_written(&written).await;
        info!(
            written = summary.written.len(),
            skipped = summary.skipped,
            "bulk import finished"
        );
        Ok(summary)
    }

    async fn write_record(&self, record: &YearlyPlacementRecord) -> Result<(), StoreError> {
        let document = records::to_document(record)?;
        self.store
            .set(YEARLY_STATS_COLLECTION, &record.year, document)
            .await
    }

    async fn apply_written(&self, written: &[YearlyPlacementRecord]) {
        if written.is_empty() {
            return;
        }

        let mut state = self.cache.write().await;
        state.generation += 1;
        if let Some(current) = state.records.take() {
            state.records = Some(Arc::new(records::merge_records(&current, written)));
        }
    }

    pub async fn summary(&self, scope: &Scope) -> Result<StatSummary, StoreError> {
        let records = self.records().await?;
        Ok(aggregate::summarize(&aggregate::filter_by_scope(
            &records, scope,
        )))
    }

    pub async fn chart(&self, scope: &Scope) -> Result<ChartSeries, StoreError> {
        let records = self.records().await?;
        Ok(aggregate::chart_for(
            scope,
            &aggregate::filter_by_scope(&records, scope),
        ))
    }

    /// Stat cards plus chart for a scope. Never fails: a load error or a year
    /// without a record renders as zeros with a notice.
    pub async fn dashboard(&self, scope: &Scope) -> Dashboard {
        let (records, load_failed) = match self.records().await {
            Ok(records) => (records, false),
            Err(e) => {
                error!(error = %e, "failed to load yearly placement stats");
                (Arc::new(Vec::new()), true)
            }
        };

        let filtered = aggregate::filter_by_scope(&records, scope);
        let notice = if load_failed {
            Some("Placement statistics are unavailable right now".to_string())
        } else if filtered.is_empty() {
            match scope {
                Scope::AllYears => Some("No placement data recorded yet".to_string()),
                Scope::Year(year) => Some(format!("No data for {year}")),
            }
        } else {
            None
        };

        Dashboard {
            scope: scope.to_string(),
            summary: aggregate::summarize(&filtered),
            chart: aggregate::chart_for(scope, &filtered),
            notice,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::{json, Value};
    use tokio::sync::Notify;

    use super::*;
    use crate::store::{Document, MemoryStore};

    /// Wraps the memory store to count list calls and inject failures.
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryStore,
        lists: AtomicUsize,
        fail_reads: AtomicBool,
        fail_writes: AtomicBool,
        refused_id: Mutex<Option<String>>,
    }

    #[async_trait]
    impl DocumentStore for FlakyStore {
        async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
            self.inner.get(collection, id).await
        }

        async fn set(&self, collection: &str, id: &str, data: Value) -> Result<(), StoreError> {
            let refused = self.refused_id.lock().unwrap().as_deref() == Some(id);
            if refused || self.fail_writes.load(Ordering::SeqCst) {
                return Err(StoreError::Backend("write refused".to_string()));
            }
            self.inner.set(collection, id, data).await
        }

        async fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
            self.lists.fetch_add(1, Ordering::SeqCst);
            if self.fail_reads.load(Ordering::SeqCst) {
                return Err(StoreError::Backend("unreachable".to_string()));
            }
            self.inner.list(collection).await
        }

        async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
            self.inner.delete(collection, id).await
        }
    }

    async fn seeded() -> (Arc<FlakyStore>, StatsService) {
        let store = Arc::new(FlakyStore::default());
        store
            .inner
            .set(
                YEARLY_STATS_COLLECTION,
                "2022-23",
                json!({"year": "2022-23", "eligible": 100, "placed": 80, "higherStudies": 10}),
            )
            .await
            .unwrap();
        store
            .inner
            .set(
                YEARLY_STATS_COLLECTION,
                "2023-24",
                json!({"year": "2023-24", "eligible": 50, "placed": 45, "higherStudies": 5}),
            )
            .await
            .unwrap();

        let service = StatsService::new(store.clone());
        (store, service)
    }

    #[tokio::test]
    async fn summary_over_all_years() {
        let (_, service) = seeded().await;
        let summary = service.summary(&Scope::AllYears).await.unwrap();

        assert_eq!(
            summary,
            StatSummary {
                placed: 125,
                total: 150,
                percentage: 83,
                higher_studies: 15,
                avg_yearly_rate: 85,
            }
        );
    }

    #[tokio::test]
    async fn records_are_fetched_once_and_shared() {
        let (store, service) = seeded().await;

        service.summary(&Scope::AllYears).await.unwrap();
        service
            .chart(&Scope::Year("2023-24".to_string()))
            .await
            .unwrap();
        service.dashboard(&Scope::AllYears).await;

        assert_eq!(store.lists.load(Ordering::SeqCst), 1);
        let records = service.records().await.unwrap();
        assert_eq!(records[0].year, "2023-24");
    }

    #[tokio::test]
    async fn upsert_merges_into_cache_without_refetch() {
        let (store, service) = seeded().await;
        service.records().await.unwrap();

        service
            .upsert(YearlyPlacementRecord::new("2023-24", 60, 50, 5))
            .await
            .unwrap();
        service
            .upsert(YearlyPlacementRecord::new("2024-25", 40, 20, 4))
            .await
            .unwrap();

        let records = service.records().await.unwrap();
        let years: Vec<&str> = records.iter().map(|r| r.year.as_str()).collect();
        assert_eq!(years, vec!["2024-25", "2023-24", "2022-23"]);
        assert_eq!(records[1].eligible, 60);
        assert_eq!(store.lists.load(Ordering::SeqCst), 1);

        let stored = store
            .inner
            .get(YEARLY_STATS_COLLECTION, "2024-25")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored["unplaced"], 16);
    }

    #[tokio::test]
    async fn failed_write_keeps_prior_state() {
        let (store, service) = seeded().await;
        let before = service.records().await.unwrap();

        store.fail_writes.store(true, Ordering::SeqCst);
        let result = service
            .upsert(YearlyPlacementRecord::new("2023-24", 1, 1, 0))
            .await;

        assert!(result.is_err());
        assert_eq!(service.records().await.unwrap(), before);
    }

    #[tokio::test]
    async fn fetch_failure_renders_empty_dashboard() {
        let (store, service) = seeded().await;
        store.fail_reads.store(true, Ordering::SeqCst);

        let dashboard = service.dashboard(&Scope::AllYears).await;
        assert_eq!(dashboard.summary, StatSummary::default());
        assert!(dashboard.notice.is_some());
        assert!(service.records_or_empty().await.is_empty());

        store.fail_reads.store(false, Ordering::SeqCst);
        assert_eq!(service.records().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn missing_year_reports_no_data() {
        let (_, service) = seeded().await;
        let dashboard = service
            .dashboard(&Scope::Year("1999-00".to_string()))
            .await;

        assert_eq!(dashboard.notice.as_deref(), Some("No data for 1999-00"));
        assert_eq!(dashboard.chart, ChartSeries::Pie(Vec::new()));
    }

    #[tokio::test]
    async fn import_reports_over_counted_years() {
        let (_, service) = seeded().await;
        let parsed = ParsedImport {
            records: vec![
                YearlyPlacementRecord::new("2021-22", 0, 30, 5),
                YearlyPlacementRecord::new("2020-21", 70, 50, 5),
            ],
            skipped: 2,
        };

        let summary = service.import(parsed).await.unwrap();
        assert_eq!(summary.written, vec!["2021-22", "2020-21"]);
        assert_eq!(summary.over_counted, vec!["2021-22"]);
        assert_eq!(summary.skipped, 2);

        let records = service.records().await.unwrap();
        assert_eq!(records.len(), 4);
        assert_eq!(
            records.iter().find(|r| r.year == "2021-22").unwrap().unplaced,
            0
        );
    }

    #[tokio::test]
    async fn refresh_picks_up_external_writes() {
        let (store, service) = seeded().await;
        service.records().await.unwrap();

        store
            .inner
            .set(
                YEARLY_STATS_COLLECTION,
                "2019-20",
                json!({"year": "2019-20", "eligible": 10, "placed": 5, "higherStudies": 0}),
            )
            .await
            .unwrap();

        assert_eq!(service.records().await.unwrap().len(), 2);
        assert_eq!(service.refresh().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn partial_import_keeps_rows_written_before_the_failure() {
        let (store, service) = seeded().await;
        service.records().await.unwrap();
        *store.refused_id.lock().unwrap() = Some("2025-26".to_string());

        let parsed = ParsedImport {
            records: vec![
                YearlyPlacementRecord::new("2024-25", 40, 30, 2),
                YearlyPlacementRecord::new("2025-26", 20, 10, 1),
                YearlyPlacementRecord::new("2026-27", 10, 5, 1),
            ],
            skipped: 0,
        };
        assert!(service.import(parsed).await.is_err());

        let records = service.records().await.unwrap();
        let years: Vec<&str> = records.iter().map(|r| r.year.as_str()).collect();
        assert_eq!(years, vec!["2024-25", "2023-24", "2022-23"]);
        assert_eq!(store.lists.load(Ordering::SeqCst), 1);
    }

    /// Holds the first `list` after it has read the collection, until released.
    #[derive(Default)]
    struct GatedStore {
        inner: MemoryStore,
        lists: AtomicUsize,
        holding: Notify,
        release: Notify,
    }

    #[async_trait]
    impl DocumentStore for GatedStore {
        async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
            self.inner.get(collection, id).await
        }

        async fn set(&self, collection: &str, id: &str, data: Value) -> Result<(), StoreError> {
            self.inner.set(collection, id, data).await
        }

        async fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
            let documents = self.inner.list(collection).await?;
            if self.lists.fetch_add(1, Ordering::SeqCst) == 0 {
                self.holding.notify_one();
                self.release.notified().await;
            }
            Ok(documents)
        }

        async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
            self.inner.delete(collection, id).await
        }
    }

    #[tokio::test]
    async fn load_started_before_a_write_is_not_cached() {
        let store = Arc::new(GatedStore::default());
        store
            .inner
            .set(
                YEARLY_STATS_COLLECTION,
                "2022-23",
                json!({"year": "2022-23", "eligible": 100, "placed": 80, "higherStudies": 10}),
            )
            .await
            .unwrap();
        let service = Arc::new(StatsService::new(store.clone()));

        let slow_load = tokio::spawn({
            let service = Arc::clone(&service);
            async move { service.records().await }
        });
        store.holding.notified().await;

        service
            .upsert(YearlyPlacementRecord::new("2023-24", 50, 45, 5))
            .await
            .unwrap();
        store.release.notify_one();

        let stale = slow_load.await.unwrap().unwrap();
        assert_eq!(stale.len(), 1);

        let records = service.records().await.unwrap();
        let years: Vec<&str> = records.iter().map(|r| r.year.as_str()).collect();
        assert_eq!(years, vec!["2023-24", "2022-23"]);
        assert_eq!(store.lists.load(Ordering::SeqCst), 2);
    }
}
