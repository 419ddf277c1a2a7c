//! SQLite table store with Diesel ORM
//!
//! Holds what the pipeline produces: map coordinates, spectra and a log of
//! pipeline runs. The server only reads from it; `soundmap build` replaces
//! the points and spectra wholesale.

use crate::config::PipelineSettings;
use crate::model::{SamplePoint, Spectrum, SpectrumTable};
use crate::pipeline::PipelineOutput;
use crate::schema::*;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use diesel::sqlite::SqliteConnection;
use std::path::Path;

// ============================================================================
// Diesel Models
// ============================================================================

#[derive(Insertable)]
#[diesel(table_name = sample_points)]
struct NewPoint<'a> {
    name: &'a str,
    grp: &'a str,
    x: f64,
    y: f64,
    cluster_id: Option<i64>,
}

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = sample_points)]
struct PointRow {
    #[allow(dead_code)]
    id: i32,
    name: String,
    grp: String,
    x: f64,
    y: f64,
    cluster_id: Option<i64>,
}

#[derive(Insertable)]
#[diesel(table_name = spectra)]
struct NewSpectrum<'a> {
    name: &'a str,
    frequencies_json: &'a str,
    powers_json: &'a str,
}

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = spectra)]
struct SpectrumRow {
    name: String,
    frequencies_json: String,
    powers_json: String,
}

#[derive(Insertable)]
#[diesel(table_name = pipeline_runs)]
struct NewPipelineRun<'a> {
    generated_at: &'a str,
    source_dir: &'a str,
    sample_count: i32,
    feature_count: i32,
    cluster_count: i32,
    perplexity: f64,
    iterations: i32,
    seed: i64,
}

/// One `soundmap build` invocation
#[derive(Queryable, Selectable, Debug, Clone, serde::Serialize)]
#[diesel(table_name = pipeline_runs)]
pub struct PipelineRun {
    pub id: i32,
    pub generated_at: String,
    pub source_dir: String,
    pub sample_count: i32,
    pub feature_count: i32,
    pub cluster_count: i32,
    pub perplexity: f64,
    pub iterations: i32,
    pub seed: i64,
}

// ============================================================================
// Database Connection
// ============================================================================

type DbPool = Pool<ConnectionManager<SqliteConnection>>;
type DbConn = PooledConnection<ConnectionManager<SqliteConnection>>;

/// Database connection wrapper with connection pool
pub struct Database {
    pool: DbPool,
}

/// Error type for database operations
#[derive(Debug)]
pub enum DbError {
    Connection(String),
    Query(diesel::result::Error),
    /// A stored JSON column no longer parses
    Corrupt(String),
}

impl std::fmt::Display for DbError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DbError::Connection(msg) => write!(f, "Connection error: {}", msg),
            DbError::Query(e) => write!(f, "Query error: {}", e),
            DbError::Corrupt(msg) => write!(f, "Corrupt record: {}", msg),
        }
    }
}

impl std::error::Error for DbError {}

impl From<diesel::result::Error> for DbError {
    fn from(e: diesel::result::Error) -> Self {
        DbError::Query(e)
    }
}

pub type Result<T> = std::result::Result<T, DbError>;

fn to_i32(n: usize) -> i32 {
    i32::try_from(n).unwrap_or(i32::MAX)
}

impl Database {
    /// Open database at specified path, creating tables as needed
    pub fn open_at<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();
        let manager = ConnectionManager::<SqliteConnection>::new(&path_str);
        let pool = Pool::builder()
            .max_size(5)
            .build(manager)
            .map_err(|e| DbError::Connection(e.to_string()))?;

        let db = Self { pool };
        db.init_schema()?;
        Ok(db)
    }

    fn get_conn(&self) -> Result<DbConn> {
        self.pool.get().map_err(|e| DbError::Connection(e.to_string()))
    }

    fn init_schema(&self) -> Result<()> {
        let mut conn = self.get_conn()?;

        diesel::sql_query(r#"
            CREATE TABLE IF NOT EXISTS sample_points (
                id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
                name TEXT NOT NULL UNIQUE,
                grp TEXT NOT NULL,
                x REAL NOT NULL,
                y REAL NOT NULL,
                cluster_id INTEGER
            )
        "#).execute(&mut conn)?;

        diesel::sql_query(r#"
            CREATE TABLE IF NOT EXISTS spectra (
                name TEXT PRIMARY KEY NOT NULL,
                frequencies_json TEXT NOT NULL,
                powers_json TEXT NOT NULL
            )
        "#).execute(&mut conn)?;

        diesel::sql_query(r#"
            CREATE TABLE IF NOT EXISTS pipeline_runs (
                id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
                generated_at TEXT NOT NULL,
                source_dir TEXT NOT NULL,
                sample_count INTEGER NOT NULL,
                feature_count INTEGER NOT NULL,
                cluster_count INTEGER NOT NULL,
                perplexity REAL NOT NULL,
                iterations INTEGER NOT NULL,
                seed INTEGER NOT NULL
            )
        "#).execute(&mut conn)?;

        diesel::sql_query("CREATE INDEX IF NOT EXISTS idx_points_grp ON sample_points(grp)").execute(&mut conn)?;
        diesel::sql_query("CREATE INDEX IF NOT EXISTS idx_runs_generated_at ON pipeline_runs(generated_at)").execute(&mut conn)?;
        Ok(())
    }

    // ========================================================================
    // Map Data
    // ========================================================================

    /// Replace all points and spectra in one transaction
    pub fn replace_library(&self, points: &[SamplePoint], spectra: &SpectrumTable) -> Result<()> {
        let mut conn = self.get_conn()?;

        // encode before opening the transaction so it stays short
        let mut encoded: Vec<(&str, String, String)> = Vec::with_capacity(spectra.len());
        for (name, spectrum) in spectra {
            let freqs = serde_json::to_string(&spectrum.frequencies).map_err(|e| DbError::Corrupt(e.to_string()))?;
            let powers = serde_json::to_string(&spectrum.powers).map_err(|e| DbError::Corrupt(e.to_string()))?;
            encoded.push((name.as_str(), freqs, powers));
        }
        encoded.sort_by(|a, b| a.0.cmp(b.0));

        conn.transaction::<_, DbError, _>(|conn| {
            diesel::delete(sample_points::table).execute(conn)?;
            diesel::delete(spectra::table).execute(conn)?;

            for p in points {
                diesel::insert_into(sample_points::table)
                    .values(&NewPoint {
                        name: &p.name,
                        grp: &p.group,
                        x: p.x,
                        y: p.y,
                        cluster_id: p.cluster_id,
                    })
                    .execute(conn)?;
            }

            for (name, freqs, powers) in &encoded {
                diesel::insert_into(spectra::table)
                    .values(&NewSpectrum { name, frequencies_json: freqs, powers_json: powers })
                    .execute(conn)?;
            }
            Ok(())
        })?;

        log::info!("Stored {} points and {} spectra", points.len(), spectra.len());
        Ok(())
    }

    /// All points in insertion order
    pub fn load_points(&self) -> Result<Vec<SamplePoint>> {
        let mut conn = self.get_conn()?;
        let rows = sample_points::table
            .order(sample_points::id.asc())
            .select(PointRow::as_select())
            .load::<PointRow>(&mut conn)?;

        Ok(rows
            .into_iter()
            .map(|r| SamplePoint {
                name: r.name,
                group: r.grp,
                x: r.x,
                y: r.y,
                cluster_id: r.cluster_id,
            })
            .collect())
    }

    pub fn load_spectra(&self) -> Result<SpectrumTable> {
        let mut conn = self.get_conn()?;
        let rows = spectra::table
            .select(SpectrumRow::as_select())
            .load::<SpectrumRow>(&mut conn)?;

        let mut table = SpectrumTable::with_capacity(rows.len());
        for row in rows {
            let decode = |json: &str| -> Result<Vec<f64>> {
                serde_json::from_str(json).map_err(|e| DbError::Corrupt(format!("spectrum '{}': {}", row.name, e)))
            };
            let spectrum = Spectrum {
                frequencies: decode(&row.frequencies_json)?,
                powers: decode(&row.powers_json)?,
            };
            table.insert(row.name, spectrum);
        }
        Ok(table)
    }

    pub fn point_count(&self) -> Result<i64> {
        let mut conn = self.get_conn()?;
        let count = sample_points::table.count().get_result(&mut conn)?;
        Ok(count)
    }

    // ========================================================================
    // Pipeline Runs
    // ========================================================================

    /// Append a run record; returns its id
    pub fn record_run(&self, source_dir: &Path, output: &PipelineOutput, settings: &PipelineSettings) -> Result<i32> {
        let mut conn = self.get_conn()?;
        let now = chrono::Local::now().to_rfc3339();
        let source = source_dir.to_string_lossy();

        diesel::insert_into(pipeline_runs::table)
            .values(&NewPipelineRun {
                generated_at: &now,
                source_dir: &source,
                sample_count: to_i32(output.sample_count),
                feature_count: to_i32(output.feature_names.len()),
                cluster_count: to_i32(output.cluster_count),
                perplexity: settings.perplexity,
                iterations: to_i32(settings.iterations),
                seed: settings.seed as i64,
            })
            .execute(&mut conn)?;

        let id: i32 = diesel::select(diesel::dsl::sql::<diesel::sql_types::Integer>("last_insert_rowid()"))
            .first(&mut conn)?;

        Ok(id)
    }

    /// Most recent runs first
    pub fn recent_runs(&self, limit: i64) -> Result<Vec<PipelineRun>> {
        let mut conn = self.get_conn()?;
        let runs = pipeline_runs::table
            .order(pipeline_runs::id.desc())
            .limit(limit)
            .select(PipelineRun::as_select())
            .load::<PipelineRun>(&mut conn)?;
        Ok(runs)
    }
}
