//! Batched loading of observations into the relational store.

pub mod postgres;

use tracing::{debug, info};

use crate::{error::Result, observation::Observation};

pub use postgres::PgStore;

/// Rows per insert statement.
pub const BATCH_SIZE: usize = 100;

/// Something a loader can open one session per archive against.
pub trait Store {
    type Session: Session;

    async fn open(&self) -> Result<Self::Session>;
}

/// A single connection and transaction. Dropping it without committing abandons the work.
pub trait Session {
    async fn insert_batch(&mut self, batch: &[Observation]) -> Result<()>;

    /// Runs the server-side deduplication over the raw table.
    async fn post_load(&mut self) -> Result<()>;

    async fn commit(self) -> Result<()>;
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoadSummary {
    pub rows: usize,
    pub batches: usize,
}

/// Splits observations into insert batches, keeping their order.
pub fn batches(observations: &[Observation]) -> impl Iterator<Item = &[Observation]> {
    observations.chunks(BATCH_SIZE)
}

pub struct BatchLoader<S> {
    store: S,
}

impl<S: Store> BatchLoader<S> {
    pub fn new(store: S) -> Self {
        BatchLoader { store }
    }

    /// Inserts one archive's observations and runs the post-load procedure, all in one session.
    ///
    /// Nothing is opened for an empty archive.
    pub async fn load(&self, observations: &[Observation]) -> Result<LoadSummary> {
        if observations.is_empty() {
            info!("No data to insert.");
            return Ok(LoadSummary::default());
        }

        info!("Inserting data...");
        let mut session = self.store.open().await?;
        let mut summary = LoadSummary::default();

        for batch in batches(observations) {
            session.insert_batch(batch).await?;
            summary.batches += 1;
            summary.rows += batch.len();
            debug!("Inserted batch {} ({} rows)", summary.batches, batch.len());
        }

        session.post_load().await?;
        session.commit().await?;
        info!("Inserted {} rows in {} batches", summary.rows, summary.batches);

        Ok(summary)
    }
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::Error,
        test_support::{observations, MemoryStore},
    };

    #[test]
    fn should_partition_into_full_batches_and_remainder() {
        let obs = observations(250);
        let sizes: Vec<_> = batches(&obs).map(|b| b.len()).collect();

        assert_eq!(sizes, vec![100, 100, 50]);
        assert_eq!(batches(&obs).nth(2).unwrap()[0], obs[200]);
    }

    #[test]
    fn should_partition_exact_multiple() {
        let obs = observations(200);

        assert_eq!(batches(&obs).count(), 2);
        assert_eq!(batches(&observations(1)).count(), 1);
        assert_eq!(batches(&[]).count(), 0);
    }

    #[tokio::test]
    async fn should_load_batches_then_post_load_once() {
        let store = MemoryStore::default();
        let loader = BatchLoader::new(store.clone());
        let obs = observations(201);

        let summary = loader.load(&obs).await.unwrap();

        assert_eq!(summary, LoadSummary { rows: 201, batches: 3 });
        let log = store.log();
        assert_eq!(log.opened, 1);
        assert_eq!(log.post_loads, 1);
        assert_eq!(log.committed, 1);
        assert_eq!(log.batches.iter().map(Vec::len).collect::<Vec<_>>(), vec![100, 100, 1]);
        assert_eq!(log.batches.concat(), obs);
    }

    #[tokio::test]
    async fn should_not_connect_without_data() {
        let store = MemoryStore::default();
        let loader = BatchLoader::new(store.clone());

        let summary = loader.load(&[]).await.unwrap();

        assert_eq!(summary, LoadSummary::default());
        let log = store.log();
        assert_eq!(log.opened, 0);
        assert_eq!(log.post_loads, 0);
    }

    #[tokio::test]
    async fn should_abandon_session_when_insert_fails() {
        let store = MemoryStore::failing_insert_at(1);
        let loader = BatchLoader::new(store.clone());

        let result = loader.load(&observations(300)).await;

        assert!(matches!(result, Err(Error::Load(_))));
        let log = store.log();
        assert_eq!(log.batches.len(), 1);
        assert_eq!(log.post_loads, 0);
        assert_eq!(log.committed, 0);
    }

    #[tokio::test]
    async fn should_not_commit_when_post_load_fails() {
        let store = MemoryStore::failing_post_load();
        let loader = BatchLoader::new(store.clone());

        let result = loader.load(&observations(10)).await;

        assert!(matches!(result, Err(Error::Load(_))));
        assert_eq!(store.log().committed, 0);
    }
}
