use sqlx::{postgres::PgPoolOptions, PgPool, Postgres, QueryBuilder, Transaction};

use crate::{
    config::DatabaseConfig,
    db::{Session, Store},
    error::Result,
    observation::Observation,
};

const COLUMNS: &str = "(StationID, Date, Element, Value, MFlag, QFlag, SFlag, OBSTime)";

/// Postgres target. Each session gets its own single-connection pool, closed on commit,
/// so two archives never share a connection or transaction.
pub struct PgStore {
    config: DatabaseConfig,
}

impl PgStore {
    pub fn new(config: DatabaseConfig) -> Self {
        PgStore { config }
    }
}

pub struct PgSession {
    pool: PgPool,
    transaction: Transaction<'static, Postgres>,
    raw_table: String,
    post_load_procedure: String,
}

impl Store for PgStore {
    type Session = PgSession;

    async fn open(&self) -> Result<PgSession> {
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .connect(&self.config.url)
            .await?;
        let transaction = pool.begin().await?;

        Ok(PgSession {
            pool,
            transaction,
            raw_table: self.config.raw_table.clone(),
            post_load_procedure: self.config.post_load_procedure.clone(),
        })
    }
}

impl Session for PgSession {
    async fn insert_batch(&mut self, batch: &[Observation]) -> Result<()> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "INSERT INTO {} {} ",
            self.raw_table, COLUMNS
        ));

        qb.push_values(batch, |mut row, obs| {
            row.push_bind(&obs.station_id)
                .push_bind(&obs.date)
                .push_bind(obs.element.code())
                .push_bind(&obs.value)
                .push_bind(&obs.m_flag)
                .push_bind(&obs.q_flag)
                .push_bind(&obs.s_flag)
                .push_bind(&obs.obs_time);
        });

        qb.build().execute(&mut *self.transaction).await?;

        Ok(())
    }

    async fn post_load(&mut self) -> Result<()> {
        let query = format!("SELECT {}()", self.post_load_procedure);
        sqlx::query(&query).execute(&mut *self.transaction).await?;

        Ok(())
    }

    async fn commit(self) -> Result<()> {
        self.transaction.commit().await?;
        self.pool.close().await;

        Ok(())
    }
}

// -- Tests -------------------------------------------------------------------
