//! The idempotent bootstrap engine.
//!
//! Statements run strictly in source order on a single connection, each
//! awaited to completion before the next begins; DDL here is
//! order-dependent (a table must exist before a foreign key can reference
//! it). Errors are classified by structured MySQL error number: duplicates
//! of already-applied work are recovered and logged, anything else aborts
//! with the statement's script position.

use crate::config::DatabaseConfig;
use crate::error::{self, BootstrapError, Result};
use crate::script::{self, SqlScript};
use crate::seed::{SeedPlan, SeedReport};
use serde::Serialize;
use sqlx::MySqlPool;
use sqlx::mysql::{MySqlDatabaseError, MySqlPoolOptions};
use tracing::{debug, info};

/// Table probed to decide whether the schema is already initialized.
pub const MARKER_TABLE: &str = "users";

/// Lifecycle of a single bootstrap run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    /// Connection established, nothing applied yet
    Connected,
    /// Schema and index statements applied
    SchemaApplied,
    /// Seed rows applied
    SeedsApplied,
    /// Connection released
    Closed,
    /// A non-recoverable error aborted the run
    Failed,
}

/// Statement counts from a script pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScriptReport {
    /// Statements that executed successfully
    pub executed: usize,
    /// Statements skipped because their object or row already existed
    pub skipped: usize,
}

/// Result of a full bootstrap run.
#[derive(Debug, Clone, Serialize)]
pub struct BootstrapOutcome {
    /// Statements that executed successfully
    pub executed: usize,
    /// Statements skipped as already applied
    pub skipped: usize,
    /// Users inserted this run
    pub users_seeded: u64,
    /// Stores inserted this run
    pub stores_seeded: u64,
    /// True when the marker probe short-circuited the run
    pub already_initialized: bool,
    /// Final lifecycle state
    pub state: RunState,
}

/// Schema bootstrapper bound to one database connection.
///
/// The connection is acquired once at construction and must be released with
/// [`Bootstrapper::close`] on every exit path; `close` never fails.
pub struct Bootstrapper {
    pool: MySqlPool,
    config: DatabaseConfig,
    state: RunState,
}

impl std::fmt::Debug for Bootstrapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bootstrapper")
            .field("config", &self.config)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl Bootstrapper {
    /// Opens a single-connection pool against the configured database.
    ///
    /// The connect is eager so authentication and reachability problems
    /// surface here rather than at the first statement. Timeouts are the
    /// driver's defaults; a refused connection gets a specific hint.
    ///
    /// # Errors
    /// Returns a connection error (credentials redacted) on any failure.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        config.validate()?;

        let pool = MySqlPoolOptions::new()
            .max_connections(1)
            .connect(config.connection_url())
            .await
            .map_err(|e| connection_error(config, e))?;

        debug!(target = %config.redacted(), "connected");

        Ok(Self {
            pool,
            config: config.clone(),
            state: RunState::Connected,
        })
    }

    /// Creates the target database if it does not exist yet.
    ///
    /// Runs over a short-lived server-level connection (no database path),
    /// since the regular connection requires the database to exist. The
    /// database identifier comes from validated configuration, never from
    /// user input at this layer.
    ///
    /// # Errors
    /// Returns a connection error if the server is unreachable, or a
    /// statement error if `CREATE DATABASE` fails.
    pub async fn ensure_database(config: &DatabaseConfig) -> Result<()> {
        config.validate()?;

        let pool = MySqlPoolOptions::new()
            .max_connections(1)
            .connect(&config.server_url())
            .await
            .map_err(|e| connection_error(config, e))?;

        let statement = format!("CREATE DATABASE IF NOT EXISTS `{}`", config.database());
        let result = sqlx::query(&statement).execute(&pool).await;
        pool.close().await;

        match result {
            Ok(_) => {
                info!(database = config.database(), "database ensured");
                Ok(())
            }
            Err(e) if is_idempotent_conflict(&e) => {
                info!(database = config.database(), "database already exists");
                Ok(())
            }
            Err(e) => Err(BootstrapError::statement_failed(1, statement, e)),
        }
    }

    /// Cheap connectivity check.
    ///
    /// # Errors
    /// Returns a connection error if `SELECT 1` cannot be executed.
    pub async fn ping(&self) -> Result<()> {
        let result: i32 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| connection_error(&self.config, e))?;

        if result != 1 {
            return Err(BootstrapError::configuration(
                "connectivity check returned an unexpected result",
            ));
        }
        Ok(())
    }

    /// Probes for the marker table.
    ///
    /// A fast-path only: skipping initialization when the marker exists must
    /// produce the same end state as running the full idempotent script.
    ///
    /// # Errors
    /// Returns a connection error if the probe query fails.
    pub async fn is_initialized(&self) -> Result<bool> {
        let probe = format!("SHOW TABLES LIKE '{MARKER_TABLE}'");
        let row = sqlx::query(&probe)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| connection_error(&self.config, e))?;
        Ok(row.is_some())
    }

    /// Executes the script's statements strictly in source order.
    ///
    /// Statements whose MySQL error number denotes already-applied work are
    /// skipped and logged at INFO; any other failure aborts with the
    /// statement's position and the driver error.
    ///
    /// # Errors
    /// Returns a statement error on the first non-recoverable failure.
    pub async fn apply_script(&mut self, sql_script: &SqlScript) -> Result<ScriptReport> {
        let mut report = ScriptReport::default();

        for statement in sql_script.statements() {
            debug!(position = statement.position, "executing statement");
            match sqlx::query(&statement.sql).execute(&self.pool).await {
                Ok(_) => report.executed += 1,
                Err(e) if is_idempotent_conflict(&e) => {
                    info!(
                        position = statement.position,
                        statement = %script::summarize(&statement.sql),
                        "already applied, skipping"
                    );
                    report.skipped += 1;
                }
                Err(e) => {
                    self.state = RunState::Failed;
                    return Err(BootstrapError::statement_failed(
                        statement.position,
                        script::summarize(&statement.sql),
                        e,
                    ));
                }
            }
        }

        self.state = RunState::SchemaApplied;
        Ok(report)
    }

    /// Inserts the seed plan's rows.
    ///
    /// # Errors
    /// Returns a seed error on any non-recoverable insertion failure.
    pub async fn apply_seeds(&mut self, plan: &SeedPlan) -> Result<SeedReport> {
        match plan.apply(&self.pool).await {
            Ok(report) => {
                self.state = RunState::SeedsApplied;
                Ok(report)
            }
            Err(e) => {
                self.state = RunState::Failed;
                Err(e)
            }
        }
    }

    /// Runs the full bootstrap: probe, schema, seeds.
    ///
    /// With `force` the marker probe is skipped and the full idempotent
    /// script runs unconditionally.
    ///
    /// # Errors
    /// Propagates the first non-recoverable error; the run state is left at
    /// `Failed` and the caller is still expected to [`Bootstrapper::close`].
    pub async fn run(
        &mut self,
        sql_script: &SqlScript,
        seeds: &SeedPlan,
        force: bool,
    ) -> Result<BootstrapOutcome> {
        match self.run_inner(sql_script, seeds, force).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                self.state = RunState::Failed;
                Err(e)
            }
        }
    }

    async fn run_inner(
        &mut self,
        sql_script: &SqlScript,
        seeds: &SeedPlan,
        force: bool,
    ) -> Result<BootstrapOutcome> {
        if !force && self.is_initialized().await? {
            info!("schema already initialized, skipping");
            return Ok(BootstrapOutcome {
                executed: 0,
                skipped: 0,
                users_seeded: 0,
                stores_seeded: 0,
                already_initialized: true,
                state: self.state,
            });
        }

        info!(statements = sql_script.len(), "applying schema script");
        let script_report = self.apply_script(sql_script).await?;
        info!(
            executed = script_report.executed,
            skipped = script_report.skipped,
            "schema script applied"
        );

        let seed_report = self.apply_seeds(seeds).await?;
        info!(
            users = seed_report.users_seeded,
            stores = seed_report.stores_seeded,
            "seed rows applied"
        );

        Ok(BootstrapOutcome {
            executed: script_report.executed,
            skipped: script_report.skipped,
            users_seeded: seed_report.users_seeded,
            stores_seeded: seed_report.stores_seeded,
            already_initialized: false,
            state: self.state,
        })
    }

    /// Releases the connection. Runs on every exit path and never fails.
    pub async fn close(&mut self) {
        self.pool.close().await;
        if self.state != RunState::Failed {
            self.state = RunState::Closed;
        }
        debug!("connection closed");
    }

    /// Current lifecycle state of this run.
    pub fn state(&self) -> RunState {
        self.state
    }
}

/// MySQL error numbers that mean "this work was already applied".
///
/// 1007 `ER_DB_CREATE_EXISTS`, 1050 `ER_TABLE_EXISTS_ERROR`,
/// 1060 `ER_DUP_FIELDNAME`, 1061 `ER_DUP_KEYNAME`, 1062 `ER_DUP_ENTRY`,
/// 1826 `ER_FK_DUP_NAME`.
const fn is_duplicate_object_number(number: u32) -> bool {
    matches!(number, 1007 | 1050 | 1060 | 1061 | 1062 | 1826)
}

/// Classifies a driver error as an idempotency-class conflict.
///
/// Matches on the structured MySQL error number rather than message text.
fn is_idempotent_conflict(error: &sqlx::Error) -> bool {
    error
        .as_database_error()
        .and_then(|db| db.try_downcast_ref::<MySqlDatabaseError>())
        .is_some_and(|mysql| is_duplicate_object_number(mysql.number().into()))
}

fn connection_error(config: &DatabaseConfig, error: sqlx::Error) -> BootstrapError {
    let context = if error::is_connection_refused(&error) {
        format!(
            "connection refused by {} (is the MySQL server running?)",
            config.redacted()
        )
    } else {
        format!("connecting to {}", config.redacted())
    };
    BootstrapError::connection_failed(context, error)
}
