use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use tracing::debug;

use crate::entity::{Model, Module, Table};
use crate::error::{Error, Result};
use crate::CACHE_TTL;

/// The three flat entity collections fetched in a single round-trip.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntitySnapshot {
    pub modules: Vec<Module>,
    pub models: Vec<Model>,
    pub tables: Vec<Table>,
}

/// A backend data source for the three entity collections.
///
/// Implementations return full collections; the cache never paginates.
/// Failures are plain `anyhow` errors so sources can wrap whatever
/// transport they sit on.
pub trait EntitySource {
    fn fetch_modules(&self) -> impl Future<Output = anyhow::Result<Vec<Module>>>;
    fn fetch_models(&self) -> impl Future<Output = anyhow::Result<Vec<Model>>>;
    fn fetch_tables(&self) -> impl Future<Output = anyhow::Result<Vec<Table>>>;
}

/// An in-memory source serving fixed collections. Used in tests and by
/// embedders that already hold the records.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    pub modules: Vec<Module>,
    pub models: Vec<Model>,
    pub tables: Vec<Table>,
}

impl EntitySource for StaticSource {
    async fn fetch_modules(&self) -> anyhow::Result<Vec<Module>> {
        Ok(self.modules.clone())
    }

    async fn fetch_models(&self) -> anyhow::Result<Vec<Model>> {
        Ok(self.models.clone())
    }

    async fn fetch_tables(&self) -> anyhow::Result<Vec<Table>> {
        Ok(self.tables.clone())
    }
}

struct CachedEntry {
    snapshot: Arc<EntitySnapshot>,
    fetched_at: Instant,
}

/// Memoizing front for an [`EntitySource`].
///
/// A successful fetch is reused for [`CACHE_TTL`] unless `force_refresh`
/// or [`invalidate`](Self::invalidate) intervenes. Failures are never
/// cached: every call after an error hits the source again. The three
/// fetches run concurrently and join all-or-nothing, so a snapshot never
/// mixes fresh and stale collections.
pub struct RelationshipCache<S> {
    source: S,
    entry: Option<CachedEntry>,
}

impl<S: EntitySource> RelationshipCache<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            entry: None,
        }
    }

    /// Return the cached snapshot, fetching from the source if the cache
    /// is empty, expired, or `force_refresh` is set.
    pub async fn fetch(&mut self, force_refresh: bool) -> Result<Arc<EntitySnapshot>> {
        if !force_refresh {
            if let Some(entry) = &self.entry {
                if entry.fetched_at.elapsed() < CACHE_TTL {
                    debug!("serving entity snapshot from cache");
                    return Ok(Arc::clone(&entry.snapshot));
                }
                debug!("cached entity snapshot expired");
            }
        }

        let (modules, models, tables) = tokio::try_join!(
            labelled(self.source.fetch_modules(), "module"),
            labelled(self.source.fetch_models(), "model"),
            labelled(self.source.fetch_tables(), "table"),
        )?;

        debug!(
            modules = modules.len(),
            models = models.len(),
            tables = tables.len(),
            "fetched entity snapshot"
        );

        let snapshot = Arc::new(EntitySnapshot {
            modules,
            models,
            tables,
        });
        self.entry = Some(CachedEntry {
            snapshot: Arc::clone(&snapshot),
            fetched_at: Instant::now(),
        });
        Ok(snapshot)
    }

    /// Drop the cached snapshot; the next `fetch` hits the source.
    pub fn invalidate(&mut self) {
        self.entry = None;
    }

    /// The current snapshot, if one is cached (expired or not).
    pub fn cached(&self) -> Option<Arc<EntitySnapshot>> {
        self.entry.as_ref().map(|e| Arc::clone(&e.snapshot))
    }
}

async fn labelled<T>(
    fut: impl Future<Output = anyhow::Result<T>>,
    collection: &'static str,
) -> Result<T> {
    fut.await.map_err(|source| Error::Fetch { collection, source })
}
