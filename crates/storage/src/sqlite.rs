use std::os::raw::c_int;

use chrono::NaiveDate;
use rusqlite::{Connection, ErrorCode, OptionalExtension, TransactionBehavior, ffi};
use tracing::debug;

use featureboard_core::{
    Client, ClientId, FeatureRequest, FeatureRequestId, ProductArea, ProductAreaId, Rank,
};

use crate::config::StorageConfig;
use crate::error::StorageError;
use crate::traits::{
    PriorityFilter, PriorityTransform, RankedMember, Storage, StoreTransaction,
};
use crate::violation::{ConstraintViolation, UniqueConstraint};

const FEATURE_COLUMNS: &str =
    "featurerequest_id, title, description, priority, target_date, client_id, productarea_id";

const FLUSH_SAVEPOINT: &str = "flush_staged";

type FeatureRow = (i64, String, String, i64, Option<NaiveDate>, i64, i64);

pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    pub fn open(path: &str) -> Result<Self, StorageError> {
        Self::open_with_config(&StorageConfig::at_path(path))
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::open_with_config(&StorageConfig::in_memory())
    }

    pub fn open_with_config(config: &StorageConfig) -> Result<Self, StorageError> {
        let conn = match &config.path {
            Some(path) => Connection::open(path)?,
            None => Connection::open_in_memory()?,
        };
        conn.busy_timeout(config.busy_timeout())?;
        crate::schema::init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn drop_schema(&self) -> Result<(), StorageError> {
        crate::schema::drop_schema(&self.conn)
    }

    pub fn init_schema(&self) -> Result<(), StorageError> {
        crate::schema::init_schema(&self.conn)
    }
}

fn feature_row(row: &rusqlite::Row) -> rusqlite::Result<FeatureRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
    ))
}

fn into_feature_request(raw: FeatureRow) -> Result<FeatureRequest, StorageError> {
    let (id, title, description, priority, target_date, client_id, product_area_id) = raw;
    Ok(FeatureRequest {
        id: Some(FeatureRequestId::from_raw(id)),
        title,
        description,
        priority: Rank::new(priority)?,
        target_date,
        client_id: ClientId::from_raw(client_id),
        product_area_id: ProductAreaId::from_raw(product_area_id),
    })
}

fn query_feature_requests<P: rusqlite::Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> Result<Vec<FeatureRequest>, StorageError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, feature_row)?;

    let mut result = Vec::new();
    for row in rows {
        result.push(into_feature_request(row?)?);
    }
    Ok(result)
}

fn get_feature_request(
    conn: &Connection,
    id: FeatureRequestId,
) -> Result<Option<FeatureRequest>, StorageError> {
    let raw = conn
        .query_row(
            &format!("SELECT {FEATURE_COLUMNS} FROM featurerequest WHERE featurerequest_id = ?1"),
            rusqlite::params![id.get()],
            feature_row,
        )
        .optional()?;
    raw.map(into_feature_request).transpose()
}

fn constraint_code(err: &rusqlite::Error) -> Option<c_int> {
    match err {
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation => {
            Some(e.extended_code)
        }
        _ => None,
    }
}

fn is_unique_code(code: c_int) -> bool {
    code == ffi::SQLITE_CONSTRAINT_UNIQUE || code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY
}

fn non_unique_violation(code: c_int) -> ConstraintViolation {
    match code {
        ffi::SQLITE_CONSTRAINT_FOREIGNKEY => ConstraintViolation::ForeignKey,
        ffi::SQLITE_CONSTRAINT_CHECK => ConstraintViolation::Check,
        ffi::SQLITE_CONSTRAINT_NOTNULL => ConstraintViolation::NotNull,
        other => ConstraintViolation::Other(other),
    }
}

fn exists<P: rusqlite::Params>(conn: &Connection, sql: &str, params: P) -> Result<bool, StorageError> {
    Ok(conn.query_row(sql, params, |row| row.get(0))?)
}

/// Attribute a constraint failure of `request` to the declared rules it
/// breaks, by probing each unique key of the row against the table.
fn describe_violation(
    conn: &Connection,
    code: c_int,
    request: &FeatureRequest,
) -> Result<ConstraintViolation, StorageError> {
    if !is_unique_code(code) {
        return Ok(non_unique_violation(code));
    }
    let own_id = request.id.map(|id| id.get());
    let mut hit = Vec::new();
    if exists(
        conn,
        "SELECT EXISTS(SELECT 1 FROM featurerequest WHERE client_id = ?1 AND priority = ?2 AND featurerequest_id IS NOT ?3)",
        rusqlite::params![request.client_id.get(), request.priority.get(), own_id],
    )? {
        hit.push(UniqueConstraint::ClientPriority);
    }
    if exists(
        conn,
        "SELECT EXISTS(SELECT 1 FROM featurerequest WHERE title = ?1 AND featurerequest_id IS NOT ?2)",
        rusqlite::params![request.title, own_id],
    )? {
        hit.push(UniqueConstraint::Title);
    }
    Ok(ConstraintViolation::Unique(hit))
}

fn write_feature_request(
    conn: &Connection,
    request: &FeatureRequest,
) -> Result<FeatureRequest, StorageError> {
    let written = match request.id {
        None => conn
            .execute(
                "INSERT INTO featurerequest (title, description, priority, target_date, client_id, productarea_id) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    request.title,
                    request.description,
                    request.priority.get(),
                    request.target_date,
                    request.client_id.get(),
                    request.product_area_id.get(),
                ],
            )
            .map(|_| Some(conn.last_insert_rowid())),
        Some(id) => conn
            .execute(
                "UPDATE featurerequest SET title = ?1, description = ?2, priority = ?3, target_date = ?4, client_id = ?5, productarea_id = ?6 WHERE featurerequest_id = ?7",
                rusqlite::params![
                    request.title,
                    request.description,
                    request.priority.get(),
                    request.target_date,
                    request.client_id.get(),
                    request.product_area_id.get(),
                    id.get(),
                ],
            )
            .map(|changed| (changed > 0).then_some(id.get())),
    };

    match written {
        Ok(Some(rowid)) => Ok(FeatureRequest {
            id: Some(FeatureRequestId::from_raw(rowid)),
            ..request.clone()
        }),
        Ok(None) => Err(StorageError::NotFound(format!(
            "feature request {}",
            request.id.map(|id| id.to_string()).unwrap_or_default()
        ))),
        Err(e) => match constraint_code(&e) {
            Some(code) => Err(StorageError::ConstraintViolation(describe_violation(
                conn, code, request,
            )?)),
            None => Err(StorageError::Sqlite(e)),
        },
    }
}

/// Insert a row into a reference table whose only unique column is `name`.
fn insert_named(
    conn: &Connection,
    sql: &str,
    name: &str,
    unique: UniqueConstraint,
) -> Result<i64, StorageError> {
    match conn.execute(sql, rusqlite::params![name]) {
        Ok(_) => Ok(conn.last_insert_rowid()),
        Err(e) => match constraint_code(&e) {
            Some(code) if is_unique_code(code) => Err(StorageError::ConstraintViolation(
                ConstraintViolation::Unique(vec![unique]),
            )),
            Some(code) => Err(StorageError::ConstraintViolation(non_unique_violation(code))),
            None => Err(StorageError::Sqlite(e)),
        },
    }
}

fn query_named(conn: &Connection, sql: &str) -> Result<Vec<(i64, String)>, StorageError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Write transaction over a SQLite connection.
///
/// Begun with `BEGIN IMMEDIATE`, so the database write lock is held from the
/// first statement until commit or rollback and no other writer can
/// interleave with a shift.
pub struct SqliteTransaction<'a> {
    tx: rusqlite::Transaction<'a>,
    staged: Vec<FeatureRequest>,
}

impl StoreTransaction for SqliteTransaction<'_> {
    fn get_feature_request(
        &self,
        id: FeatureRequestId,
    ) -> Result<Option<FeatureRequest>, StorageError> {
        get_feature_request(&self.tx, id)
    }

    fn group_members(&self, client_id: ClientId) -> Result<Vec<RankedMember>, StorageError> {
        let mut stmt = self.tx.prepare(
            "SELECT featurerequest_id, priority FROM featurerequest WHERE client_id = ?1 ORDER BY priority",
        )?;
        let rows = stmt
            .query_map(rusqlite::params![client_id.get()], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut result = Vec::with_capacity(rows.len());
        for (id, priority) in rows {
            result.push(RankedMember {
                id: FeatureRequestId::from_raw(id),
                priority: Rank::new(priority)?,
            });
        }
        Ok(result)
    }

    fn stage(&mut self, request: FeatureRequest) {
        self.staged.push(request);
    }

    fn flush(&mut self) -> Result<Vec<FeatureRequest>, StorageError> {
        let staged = std::mem::take(&mut self.staged);
        self.tx.execute_batch(&format!("SAVEPOINT {FLUSH_SAVEPOINT}"))?;

        let mut written = Vec::with_capacity(staged.len());
        for request in &staged {
            match write_feature_request(&self.tx, request) {
                Ok(saved) => written.push(saved),
                Err(e) => {
                    debug!(error = %e, title = %request.title, "flush rejected, rolling back to savepoint");
                    self.tx.execute_batch(&format!(
                        "ROLLBACK TO {FLUSH_SAVEPOINT}; RELEASE {FLUSH_SAVEPOINT}"
                    ))?;
                    return Err(e);
                }
            }
        }

        self.tx.execute_batch(&format!("RELEASE {FLUSH_SAVEPOINT}"))?;
        Ok(written)
    }

    fn bulk_update_priority(
        &mut self,
        client_id: ClientId,
        filter: PriorityFilter,
        transform: PriorityTransform,
    ) -> Result<usize, StorageError> {
        let set = match transform {
            PriorityTransform::NegateSuccessor => "-(priority + 1)",
            PriorityTransform::Absolute => "abs(priority)",
            PriorityTransform::Increment => "priority + 1",
        };
        let changed = match filter {
            PriorityFilter::AtLeast(rank) => self.tx.execute(
                &format!(
                    "UPDATE featurerequest SET priority = {set} WHERE client_id = ?1 AND priority >= ?2"
                ),
                rusqlite::params![client_id.get(), rank.get()],
            )?,
            PriorityFilter::Negative => self.tx.execute(
                &format!(
                    "UPDATE featurerequest SET priority = {set} WHERE client_id = ?1 AND priority < 0"
                ),
                rusqlite::params![client_id.get()],
            )?,
        };
        Ok(changed)
    }

    fn commit(self) -> Result<(), StorageError> {
        self.tx.commit()?;
        Ok(())
    }

    fn rollback(self) -> Result<(), StorageError> {
        self.tx.rollback()?;
        Ok(())
    }
}

impl Storage for SqliteStorage {
    type Transaction<'a> = SqliteTransaction<'a>;

    fn begin(&mut self) -> Result<SqliteTransaction<'_>, StorageError> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        Ok(SqliteTransaction {
            tx,
            staged: Vec::new(),
        })
    }

    fn get_feature_request(
        &self,
        id: FeatureRequestId,
    ) -> Result<Option<FeatureRequest>, StorageError> {
        get_feature_request(&self.conn, id)
    }

    fn list_feature_requests(&self) -> Result<Vec<FeatureRequest>, StorageError> {
        query_feature_requests(
            &self.conn,
            &format!("SELECT {FEATURE_COLUMNS} FROM featurerequest ORDER BY client_id, priority"),
            [],
        )
    }

    fn list_client_feature_requests(
        &self,
        client_id: ClientId,
    ) -> Result<Vec<FeatureRequest>, StorageError> {
        query_feature_requests(
            &self.conn,
            &format!(
                "SELECT {FEATURE_COLUMNS} FROM featurerequest WHERE client_id = ?1 ORDER BY priority"
            ),
            rusqlite::params![client_id.get()],
        )
    }

    fn insert_client(&mut self, name: &str) -> Result<Client, StorageError> {
        let id = insert_named(
            &self.conn,
            "INSERT INTO client (name) VALUES (?1)",
            name,
            UniqueConstraint::ClientName,
        )?;
        Ok(Client {
            id: ClientId::from_raw(id),
            name: name.to_string(),
        })
    }

    fn get_client(&self, id: ClientId) -> Result<Option<Client>, StorageError> {
        let name: Option<String> = self
            .conn
            .query_row(
                "SELECT name FROM client WHERE client_id = ?1",
                rusqlite::params![id.get()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(name.map(|name| Client { id, name }))
    }

    fn list_clients(&self) -> Result<Vec<Client>, StorageError> {
        let rows = query_named(&self.conn, "SELECT client_id, name FROM client ORDER BY client_id")?;
        Ok(rows
            .into_iter()
            .map(|(id, name)| Client {
                id: ClientId::from_raw(id),
                name,
            })
            .collect())
    }

    fn insert_product_area(&mut self, name: &str) -> Result<ProductArea, StorageError> {
        let id = insert_named(
            &self.conn,
            "INSERT INTO productarea (name) VALUES (?1)",
            name,
            UniqueConstraint::ProductAreaName,
        )?;
        Ok(ProductArea {
            id: ProductAreaId::from_raw(id),
            name: name.to_string(),
        })
    }

    fn get_product_area(&self, id: ProductAreaId) -> Result<Option<ProductArea>, StorageError> {
        let name: Option<String> = self
            .conn
            .query_row(
                "SELECT name FROM productarea WHERE productarea_id = ?1",
                rusqlite::params![id.get()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(name.map(|name| ProductArea { id, name }))
    }

    fn list_product_areas(&self) -> Result<Vec<ProductArea>, StorageError> {
        let rows = query_named(
            &self.conn,
            "SELECT productarea_id, name FROM productarea ORDER BY productarea_id",
        )?;
        Ok(rows
            .into_iter()
            .map(|(id, name)| ProductArea {
                id: ProductAreaId::from_raw(id),
                name,
            })
            .collect())
    }
}
