//! Database access layer with SQLx and SQLite

use crate::error::{AppError, Result};
use crate::geometry::Point;
use crate::models::{Fault, FaultInfo, Plane, Rupture, RuptureFilter};
use crate::query::{sql::push_condition, Expr};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{QueryBuilder, Row, Sqlite};
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

/// Schema of the rupture database
pub const SCHEMA: &str = include_str!("../schema.sql");

/// Database connection pool and operations
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connect using an SQLite connection string (`sqlite://path?mode=ro`)
    pub async fn new(connection_string: &str, max_connections: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(connection_string)
            .map_err(|e| AppError::DatabaseError(format!("Invalid connection string: {}", e)))?;
        Self::connect_with(options, max_connections).await
    }

    /// Open a database file read-only
    pub async fn open(path: impl AsRef<Path>, max_connections: u32) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .read_only(true);
        Self::connect_with(options, max_connections).await
    }

    /// Private in-memory database, held on a single connection
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to connect: {}", e)))?;
        Ok(Self { pool })
    }

    async fn connect_with(options: SqliteConnectOptions, max_connections: u32) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .acquire_timeout(Duration::from_secs(5))
            .idle_timeout(Duration::from_secs(600))
            .connect_with(options)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to connect: {}", e)))?;

        info!("Database connection pool established");
        Ok(Self { pool })
    }

    /// Get the underlying connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create the rupture tables if they do not exist
    pub async fn apply_schema(&self) -> Result<()> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }

    /// Check the connection is usable
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }

    /// Names of all parent faults, sorted
    pub async fn get_fault_names(&self) -> Result<Vec<String>> {
        let names = sqlx::query_scalar("SELECT name FROM parent_fault ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(names)
    }

    /// Ruptures matching a fault expression and numeric filters, keyed by id
    pub async fn query(&self, expr: &Expr, filter: &RuptureFilter) -> Result<BTreeMap<i64, Rupture>> {
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT r.rupture_id FROM rupture r WHERE ");
        push_condition(&mut builder, expr);

        if let Some(lower) = filter.magnitude_bounds.lower {
            builder.push(" AND r.magnitude >= ").push_bind(lower);
        }
        if let Some(upper) = filter.magnitude_bounds.upper {
            builder.push(" AND r.magnitude <= ").push_bind(upper);
        }
        if let Some(lower) = filter.rate_bounds.lower {
            builder.push(" AND r.rate >= ").push_bind(lower);
        }
        if let Some(upper) = filter.rate_bounds.upper {
            builder.push(" AND r.rate <= ").push_bind(upper);
        }
        if let Some(max_faults) = filter.fault_count_limit {
            builder
                .push(
                    " AND (SELECT COUNT(DISTINCT f.parent_id) FROM rupture_faults rf \
                     JOIN fault f ON f.fault_id = rf.fault_id \
                     WHERE rf.rupture_id = r.rupture_id) <= ",
                )
                .push_bind(i64::from(max_faults));
        }
        builder
            .push(" ORDER BY r.rupture_id LIMIT ")
            .push_bind(i64::from(filter.limit));

        let ids: Vec<i64> = builder.build_query_scalar().fetch_all(&self.pool).await?;
        debug!(query = %expr, matched = ids.len(), "Rupture query executed");

        self.load_ruptures(&ids).await
    }

    /// Fetch a single rupture with its fault geometry
    pub async fn get_rupture(&self, rupture_id: i64) -> Result<Rupture> {
        self.load_ruptures(&[rupture_id])
            .await?
            .remove(&rupture_id)
            .ok_or_else(|| AppError::NotFound(format!("Rupture {}", rupture_id)))
    }

    /// Fetch several ruptures; every id must exist
    pub async fn get_ruptures(&self, rupture_ids: &[i64]) -> Result<BTreeMap<i64, Rupture>> {
        let ruptures = self.load_ruptures(rupture_ids).await?;
        if let Some(missing) = rupture_ids.iter().find(|id| !ruptures.contains_key(*id)) {
            return Err(AppError::NotFound(format!("Rupture {}", missing)));
        }
        Ok(ruptures)
    }

    /// Parent fault metadata for the faults of a rupture, keyed by name
    pub async fn get_rupture_fault_info(&self, rupture_id: i64) -> Result<BTreeMap<String, FaultInfo>> {
        let rows = sqlx::query(
            r#"
            SELECT DISTINCT p.parent_id, p.name, p.rake
            FROM rupture_faults rf
            JOIN fault f ON f.fault_id = rf.fault_id
            JOIN parent_fault p ON p.parent_id = f.parent_id
            WHERE rf.rupture_id = ?
            "#,
        )
        .bind(rupture_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| -> Result<(String, FaultInfo)> {
                let info = FaultInfo {
                    parent_id: row.try_get("parent_id")?,
                    name: row.try_get("name")?,
                    rake: row.try_get("rake")?,
                };
                Ok((info.name.clone(), info))
            })
            .collect()
    }

    /// Annual rate of each parent fault rupturing at its estimated magnitude.
    ///
    /// For every section of the rupture, the magnitude-frequency bin nearest the
    /// parent's magnitude is selected; section rates are summed per parent.
    /// Parents without a magnitude estimate or distribution are left out.
    pub async fn most_likely_fault(
        &self,
        rupture_id: i64,
        magnitudes: &BTreeMap<String, f64>,
    ) -> Result<BTreeMap<String, f64>> {
        let rows = sqlx::query(
            r#"
            SELECT p.name, f.fault_id, m.magnitude, m.rate
            FROM rupture_faults rf
            JOIN fault f ON f.fault_id = rf.fault_id
            JOIN parent_fault p ON p.parent_id = f.parent_id
            JOIN magnitude_frequency_distribution m ON m.fault_id = f.fault_id
            WHERE rf.rupture_id = ?
            ORDER BY f.fault_id, m.magnitude
            "#,
        )
        .bind(rupture_id)
        .fetch_all(&self.pool)
        .await?;

        // fault_id -> (parent name, distance to target magnitude, rate)
        let mut nearest: BTreeMap<i64, (String, f64, f64)> = BTreeMap::new();
        for row in rows {
            let name: String = row.try_get("name")?;
            let Some(target) = magnitudes.get(&name) else {
                continue;
            };
            let fault_id: i64 = row.try_get("fault_id")?;
            let magnitude: f64 = row.try_get("magnitude")?;
            let rate: f64 = row.try_get("rate")?;
            let distance = (magnitude - target).abs();

            match nearest.get_mut(&fault_id) {
                Some(best) if distance < best.1 => *best = (name, distance, rate),
                Some(_) => {}
                None => {
                    nearest.insert(fault_id, (name, distance, rate));
                }
            }
        }

        let mut rates = BTreeMap::new();
        for (name, _, rate) in nearest.into_values() {
            *rates.entry(name).or_insert(0.0) += rate;
        }
        Ok(rates)
    }

    async fn load_ruptures(&self, rupture_ids: &[i64]) -> Result<BTreeMap<i64, Rupture>> {
        if rupture_ids.is_empty() {
            return Ok(BTreeMap::new());
        }

        let mut builder = QueryBuilder::<Sqlite>::new(
            "SELECT rupture_id, magnitude, area, length, rate FROM rupture WHERE rupture_id IN (",
        );
        push_id_list(&mut builder, rupture_ids);
        let rows = builder.build().fetch_all(&self.pool).await?;

        let mut ruptures = BTreeMap::new();
        for row in rows {
            let rupture = Rupture {
                rupture_id: row.try_get("rupture_id")?,
                magnitude: row.try_get("magnitude")?,
                area: row.try_get("area")?,
                length: row.try_get("length")?,
                rate: row.try_get("rate")?,
                faults: BTreeMap::new(),
            };
            ruptures.insert(rupture.rupture_id, rupture);
        }

        let mut builder = QueryBuilder::<Sqlite>::new(
            r#"
            SELECT rf.rupture_id, p.name AS parent_name, p.rake AS parent_rake,
                fp.plane_id,
                fp.top_left_lat, fp.top_left_lon, fp.top_right_lat, fp.top_right_lon,
                fp.bottom_right_lat, fp.bottom_right_lon, fp.bottom_left_lat, fp.bottom_left_lon,
                fp.top_depth, fp.bottom_depth
            FROM rupture_faults rf
            JOIN fault f ON f.fault_id = rf.fault_id
            JOIN parent_fault p ON p.parent_id = f.parent_id
            LEFT JOIN fault_plane fp ON fp.fault_id = f.fault_id
            WHERE rf.rupture_id IN ("#,
        );
        push_id_list(&mut builder, rupture_ids);
        builder.push(" ORDER BY rf.rupture_id, f.fault_id, fp.plane_id");
        let rows = builder.build().fetch_all(&self.pool).await?;

        for row in rows {
            let rupture_id: i64 = row.try_get("rupture_id")?;
            let Some(rupture) = ruptures.get_mut(&rupture_id) else {
                continue;
            };
            let name: String = row.try_get("parent_name")?;
            let fault = rupture.faults.entry(name.clone()).or_insert_with(|| Fault {
                name,
                rake: 0.0,
                planes: Vec::new(),
            });
            fault.rake = row.try_get("parent_rake")?;

            let plane_id: Option<i64> = row.try_get("plane_id")?;
            if plane_id.is_some() {
                fault.planes.push(plane_from_row(&row)?);
            }
        }

        Ok(ruptures)
    }
}

fn push_id_list(builder: &mut QueryBuilder<'_, Sqlite>, ids: &[i64]) {
    let mut separated = builder.separated(", ");
    for id in ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");
}

fn plane_from_row(row: &SqliteRow) -> std::result::Result<Plane, sqlx::Error> {
    let point = |lat: &str, lon: &str| -> std::result::Result<Point, sqlx::Error> {
        Ok(Point {
            lat: row.try_get(lat)?,
            lon: row.try_get(lon)?,
        })
    };

    Ok(Plane {
        top_left: point("top_left_lat", "top_left_lon")?,
        top_right: point("top_right_lat", "top_right_lon")?,
        bottom_right: point("bottom_right_lat", "bottom_right_lon")?,
        bottom_left: point("bottom_left_lat", "bottom_left_lon")?,
        top_depth: row.try_get("top_depth")?,
        bottom_depth: row.try_get("bottom_depth")?,
    })
}
