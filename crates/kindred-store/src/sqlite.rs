//! SQLite-backed implementation of KinshipStore

use crate::StoreError;
use kindred_domain::traits::{KinshipStore, RequestQuery};
use kindred_domain::{
    Change, ChangeSet, ClusterId, CommitConflict, CommitOutcome, ConnectionRequest,
    DirectRelations, EntityRef, FamilyCluster, Person, PersonId, RelationType, RequestId,
    RequestStatus, Sex,
};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::BTreeSet;
use std::path::Path;

const PERSON_COLUMNS: &str =
    "id, handle, first_name, last_name, photo, sex, cluster_id, created_at, version";
const CLUSTER_COLUMNS: &str = "id, name, created_by, created_at, version";
const REQUEST_COLUMNS: &str = "id, requester_id, target_id, relation_type, status, parent_id, \
                               rejected_by, created_at, updated_at, version";

/// SQLite-based implementation of KinshipStore
///
/// Persons, their edges, clusters with their member lists, and requests with
/// their approval sets live in separate tables. A change set is applied inside
/// a single SQLite transaction and rolled back on the first conflict.
///
/// # Thread Safety
///
/// SQLite connections are not thread-safe. Each thread should have its own
/// SqliteStore instance; concurrent writers are serialized by SQLite and
/// detected by the version checks.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Create a new SqliteStore with the given database path
    ///
    /// Use `:memory:` for an in-memory database (useful for testing).
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use kindred_store::SqliteStore;
    ///
    /// let store = SqliteStore::new("kindred.db").unwrap();
    /// ```
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let mut store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Initialize the database schema
    fn initialize_schema(&mut self) -> Result<(), StoreError> {
        let schema = include_str!("schema.sql");
        self.conn.execute_batch(schema)?;
        Ok(())
    }
}

fn conversion_error(idx: usize, ty: Type, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, ty, Box::new(StoreError::InvalidData(message)))
}

fn person_id_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<PersonId> {
    let bytes: Vec<u8> = row.get(idx)?;
    PersonId::from_bytes(&bytes).map_err(|e| conversion_error(idx, Type::Blob, e))
}

fn optional_person_id_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<PersonId>> {
    let bytes: Option<Vec<u8>> = row.get(idx)?;
    bytes
        .map(|b| PersonId::from_bytes(&b).map_err(|e| conversion_error(idx, Type::Blob, e)))
        .transpose()
}

fn cluster_id_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<ClusterId> {
    let bytes: Vec<u8> = row.get(idx)?;
    ClusterId::from_bytes(&bytes).map_err(|e| conversion_error(idx, Type::Blob, e))
}

fn request_id_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<RequestId> {
    let bytes: Vec<u8> = row.get(idx)?;
    RequestId::from_bytes(&bytes).map_err(|e| conversion_error(idx, Type::Blob, e))
}

fn relation_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<RelationType> {
    let text: String = row.get(idx)?;
    RelationType::parse(&text).map_err(|e| conversion_error(idx, Type::Text, e.to_string()))
}

fn person_from_row(row: &Row<'_>) -> rusqlite::Result<Person> {
    let sex_text: String = row.get(5)?;
    let sex = Sex::parse(&sex_text).map_err(|e| conversion_error(5, Type::Text, e.to_string()))?;

    Ok(Person {
        id: person_id_at(row, 0)?,
        handle: row.get(1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        photo: row.get(4)?,
        sex,
        cluster: cluster_id_at(row, 6)?,
        relations: DirectRelations::default(),
        created_at: row.get::<_, i64>(7)? as u64,
        version: row.get::<_, i64>(8)? as u64,
    })
}

fn cluster_from_row(row: &Row<'_>) -> rusqlite::Result<FamilyCluster> {
    Ok(FamilyCluster {
        id: cluster_id_at(row, 0)?,
        name: row.get(1)?,
        members: BTreeSet::new(),
        created_by: person_id_at(row, 2)?,
        created_at: row.get::<_, i64>(3)? as u64,
        version: row.get::<_, i64>(4)? as u64,
    })
}

fn request_from_row(row: &Row<'_>) -> rusqlite::Result<ConnectionRequest> {
    let status_text: String = row.get(4)?;
    let status = RequestStatus::parse(&status_text).ok_or_else(|| {
        conversion_error(4, Type::Text, format!("Unknown request status: {}", status_text))
    })?;
    let parent: Option<Vec<u8>> = row.get(5)?;
    let parent = parent
        .map(|b| RequestId::from_bytes(&b).map_err(|e| conversion_error(5, Type::Blob, e)))
        .transpose()?;

    Ok(ConnectionRequest {
        id: request_id_at(row, 0)?,
        requester: person_id_at(row, 1)?,
        target: person_id_at(row, 2)?,
        relation_type: relation_at(row, 3)?,
        status,
        pending_approvals: BTreeSet::new(),
        approved_by: BTreeSet::new(),
        parent,
        rejected_by: optional_person_id_at(row, 6)?,
        created_at: row.get::<_, i64>(7)? as u64,
        updated_at: row.get::<_, i64>(8)? as u64,
        version: row.get::<_, i64>(9)? as u64,
    })
}

fn load_edges(conn: &Connection, person: &mut Person) -> Result<(), StoreError> {
    let id = person.id.to_bytes().to_vec();
    let mut stmt = conn.prepare(
        "SELECT relation_type, target_id FROM person_edges WHERE person_id = ?1 ORDER BY position",
    )?;
    let edges = stmt
        .query_map(params![&id], |row| Ok((relation_at(row, 0)?, person_id_at(row, 1)?)))?
        .collect::<Result<Vec<_>, _>>()?;

    for (relation, target) in edges {
        person.relations.set(relation, target);
    }
    Ok(())
}

fn load_members(conn: &Connection, cluster: &mut FamilyCluster) -> Result<(), StoreError> {
    let id = cluster.id.to_bytes().to_vec();
    let mut stmt = conn.prepare("SELECT person_id FROM cluster_members WHERE cluster_id = ?1")?;
    cluster.members = stmt
        .query_map(params![&id], |row| person_id_at(row, 0))?
        .collect::<Result<BTreeSet<_>, _>>()?;
    Ok(())
}

fn load_approvals(conn: &Connection, request: &mut ConnectionRequest) -> Result<(), StoreError> {
    let id = request.id.to_bytes().to_vec();
    let mut stmt =
        conn.prepare("SELECT person_id, state FROM request_approvals WHERE request_id = ?1")?;
    let rows = stmt
        .query_map(params![&id], |row| Ok((person_id_at(row, 0)?, row.get::<_, String>(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;

    for (person, state) in rows {
        match state.as_str() {
            "pending" => request.pending_approvals.insert(person),
            "approved" => request.approved_by.insert(person),
            other => {
                return Err(StoreError::InvalidData(format!("Unknown approval state: {}", other)))
            }
        };
    }
    Ok(())
}

fn fetch_person(
    conn: &Connection,
    column: &str,
    key: &dyn rusqlite::ToSql,
) -> Result<Option<Person>, StoreError> {
    let sql = format!("SELECT {} FROM persons WHERE {} = ?1", PERSON_COLUMNS, column);
    let person = conn.query_row(&sql, [key], person_from_row).optional()?;
    match person {
        Some(mut person) => {
            load_edges(conn, &mut person)?;
            Ok(Some(person))
        }
        None => Ok(None),
    }
}

/// Stored version of a record, or None when the row is absent
fn stored_version(conn: &Connection, table: &str, id: &[u8]) -> Result<Option<u64>, StoreError> {
    let sql = format!("SELECT version FROM {} WHERE id = ?1", table);
    let version = conn
        .query_row(&sql, params![id], |row| row.get::<_, i64>(0))
        .optional()?;
    Ok(version.map(|v| v as u64))
}

fn check_version(
    conn: &Connection,
    table: &str,
    id: &[u8],
    expected: u64,
    entity: EntityRef,
) -> Result<Option<CommitConflict>, StoreError> {
    match stored_version(conn, table, id)? {
        None => Ok(Some(CommitConflict::Missing(entity))),
        Some(found) if found != expected => Ok(Some(CommitConflict::Stale {
            entity,
            expected,
            found,
        })),
        Some(_) => Ok(None),
    }
}

fn handle_owner(conn: &Connection, handle: &str) -> Result<Option<Vec<u8>>, StoreError> {
    Ok(conn
        .query_row("SELECT id FROM persons WHERE handle = ?1", params![handle], |row| row.get(0))
        .optional()?)
}

fn write_edges(conn: &Connection, person: &Person) -> Result<(), StoreError> {
    let id = person.id.to_bytes().to_vec();
    conn.execute("DELETE FROM person_edges WHERE person_id = ?1", params![&id])?;
    for (position, (relation, target)) in person.relations.iter().enumerate() {
        let target = target.to_bytes().to_vec();
        conn.execute(
            "INSERT INTO person_edges (person_id, relation_type, target_id, position)
             VALUES (?1, ?2, ?3, ?4)",
            params![&id, relation.as_str(), &target, position as i64],
        )?;
    }
    Ok(())
}

fn write_members(conn: &Connection, cluster: &FamilyCluster) -> Result<(), StoreError> {
    let id = cluster.id.to_bytes().to_vec();
    conn.execute("DELETE FROM cluster_members WHERE cluster_id = ?1", params![&id])?;
    for member in &cluster.members {
        let member = member.to_bytes().to_vec();
        // A member row moves between clusters by replacement.
        conn.execute(
            "INSERT OR REPLACE INTO cluster_members (cluster_id, person_id) VALUES (?1, ?2)",
            params![&id, &member],
        )?;
    }
    Ok(())
}

fn write_approvals(conn: &Connection, request: &ConnectionRequest) -> Result<(), StoreError> {
    let id = request.id.to_bytes().to_vec();
    conn.execute("DELETE FROM request_approvals WHERE request_id = ?1", params![&id])?;
    let states = request
        .pending_approvals
        .iter()
        .map(|p| (p, "pending"))
        .chain(request.approved_by.iter().map(|p| (p, "approved")));
    for (person, state) in states {
        let person = person.to_bytes().to_vec();
        conn.execute(
            "INSERT INTO request_approvals (request_id, person_id, state) VALUES (?1, ?2, ?3)",
            params![&id, &person, state],
        )?;
    }
    Ok(())
}

fn apply_change(conn: &Connection, change: Change) -> Result<Option<CommitConflict>, StoreError> {
    match change {
        Change::InsertPerson(person) => {
            let id = person.id.to_bytes().to_vec();
            if stored_version(conn, "persons", &id)?.is_some() {
                return Ok(Some(CommitConflict::Duplicate(EntityRef::Person(person.id))));
            }
            if handle_owner(conn, &person.handle)?.is_some() {
                return Ok(Some(CommitConflict::Duplicate(EntityRef::Handle(person.handle))));
            }
            let cluster = person.cluster.to_bytes().to_vec();
            conn.execute(
                "INSERT INTO persons (id, handle, first_name, last_name, photo, sex, cluster_id, created_at, version)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0)",
                params![
                    &id,
                    &person.handle,
                    &person.first_name,
                    &person.last_name,
                    &person.photo,
                    person.sex.as_str(),
                    &cluster,
                    person.created_at as i64,
                ],
            )?;
            write_edges(conn, &person)?;
        }
        Change::UpdatePerson(person) => {
            let id = person.id.to_bytes().to_vec();
            if let Some(conflict) =
                check_version(conn, "persons", &id, person.version, EntityRef::Person(person.id))?
            {
                return Ok(Some(conflict));
            }
            if let Some(owner) = handle_owner(conn, &person.handle)? {
                if owner != id {
                    return Ok(Some(CommitConflict::Duplicate(EntityRef::Handle(person.handle))));
                }
            }
            let cluster = person.cluster.to_bytes().to_vec();
            conn.execute(
                "UPDATE persons SET handle = ?2, first_name = ?3, last_name = ?4, photo = ?5,
                 sex = ?6, cluster_id = ?7, version = version + 1
                 WHERE id = ?1",
                params![
                    &id,
                    &person.handle,
                    &person.first_name,
                    &person.last_name,
                    &person.photo,
                    person.sex.as_str(),
                    &cluster,
                ],
            )?;
            write_edges(conn, &person)?;
        }
        Change::DeletePerson(person_id, version) => {
            let id = person_id.to_bytes().to_vec();
            if let Some(conflict) =
                check_version(conn, "persons", &id, version, EntityRef::Person(person_id))?
            {
                return Ok(Some(conflict));
            }
            conn.execute("DELETE FROM persons WHERE id = ?1", params![&id])?;
        }
        Change::InsertCluster(cluster) => {
            let id = cluster.id.to_bytes().to_vec();
            if stored_version(conn, "clusters", &id)?.is_some() {
                return Ok(Some(CommitConflict::Duplicate(EntityRef::Cluster(cluster.id))));
            }
            let created_by = cluster.created_by.to_bytes().to_vec();
            conn.execute(
                "INSERT INTO clusters (id, name, created_by, created_at, version)
                 VALUES (?1, ?2, ?3, ?4, 0)",
                params![&id, &cluster.name, &created_by, cluster.created_at as i64],
            )?;
            write_members(conn, &cluster)?;
        }
        Change::UpdateCluster(cluster) => {
            let id = cluster.id.to_bytes().to_vec();
            if let Some(conflict) = check_version(
                conn,
                "clusters",
                &id,
                cluster.version,
                EntityRef::Cluster(cluster.id),
            )? {
                return Ok(Some(conflict));
            }
            conn.execute(
                "UPDATE clusters SET name = ?2, version = version + 1 WHERE id = ?1",
                params![&id, &cluster.name],
            )?;
            write_members(conn, &cluster)?;
        }
        Change::DeleteCluster(cluster_id, version) => {
            let id = cluster_id.to_bytes().to_vec();
            if let Some(conflict) =
                check_version(conn, "clusters", &id, version, EntityRef::Cluster(cluster_id))?
            {
                return Ok(Some(conflict));
            }
            conn.execute("DELETE FROM clusters WHERE id = ?1", params![&id])?;
        }
        Change::InsertRequest(request) => {
            let id = request.id.to_bytes().to_vec();
            if stored_version(conn, "requests", &id)?.is_some() {
                return Ok(Some(CommitConflict::Duplicate(EntityRef::Request(request.id))));
            }
            let requester = request.requester.to_bytes().to_vec();
            let target = request.target.to_bytes().to_vec();
            let parent = request.parent.map(|p| p.to_bytes().to_vec());
            let rejected_by = request.rejected_by.map(|p| p.to_bytes().to_vec());
            conn.execute(
                "INSERT INTO requests (id, requester_id, target_id, relation_type, status, parent_id,
                 rejected_by, created_at, updated_at, version)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 0)",
                params![
                    &id,
                    &requester,
                    &target,
                    request.relation_type.as_str(),
                    request.status.as_str(),
                    &parent,
                    &rejected_by,
                    request.created_at as i64,
                    request.updated_at as i64,
                ],
            )?;
            write_approvals(conn, &request)?;
        }
        Change::UpdateRequest(request) => {
            let id = request.id.to_bytes().to_vec();
            if let Some(conflict) = check_version(
                conn,
                "requests",
                &id,
                request.version,
                EntityRef::Request(request.id),
            )? {
                return Ok(Some(conflict));
            }
            let rejected_by = request.rejected_by.map(|p| p.to_bytes().to_vec());
            conn.execute(
                "UPDATE requests SET status = ?2, rejected_by = ?3, updated_at = ?4,
                 version = version + 1 WHERE id = ?1",
                params![&id, request.status.as_str(), &rejected_by, request.updated_at as i64],
            )?;
            write_approvals(conn, &request)?;
        }
        Change::DeleteRequest(request_id, version) => {
            let id = request_id.to_bytes().to_vec();
            if let Some(conflict) =
                check_version(conn, "requests", &id, version, EntityRef::Request(request_id))?
            {
                return Ok(Some(conflict));
            }
            conn.execute("DELETE FROM requests WHERE id = ?1", params![&id])?;
        }
    }
    Ok(None)
}

impl KinshipStore for SqliteStore {
    type Error = StoreError;

    fn get_person(&self, id: PersonId) -> Result<Option<Person>, Self::Error> {
        let id = id.to_bytes().to_vec();
        fetch_person(&self.conn, "id", &id)
    }

    fn find_person_by_handle(&self, handle: &str) -> Result<Option<Person>, Self::Error> {
        fetch_person(&self.conn, "handle", &handle)
    }

    fn list_persons(&self) -> Result<Vec<Person>, Self::Error> {
        let sql = format!("SELECT {} FROM persons ORDER BY id", PERSON_COLUMNS);
        let mut stmt = self.conn.prepare(&sql)?;
        let mut persons = stmt
            .query_map([], person_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        for person in &mut persons {
            load_edges(&self.conn, person)?;
        }
        Ok(persons)
    }

    fn get_cluster(&self, id: ClusterId) -> Result<Option<FamilyCluster>, Self::Error> {
        let id = id.to_bytes().to_vec();
        let sql = format!("SELECT {} FROM clusters WHERE id = ?1", CLUSTER_COLUMNS);
        let cluster = self.conn.query_row(&sql, params![&id], cluster_from_row).optional()?;
        match cluster {
            Some(mut cluster) => {
                load_members(&self.conn, &mut cluster)?;
                Ok(Some(cluster))
            }
            None => Ok(None),
        }
    }

    fn list_clusters(&self) -> Result<Vec<FamilyCluster>, Self::Error> {
        let sql = format!("SELECT {} FROM clusters ORDER BY id", CLUSTER_COLUMNS);
        let mut stmt = self.conn.prepare(&sql)?;
        let mut clusters = stmt
            .query_map([], cluster_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        for cluster in &mut clusters {
            load_members(&self.conn, cluster)?;
        }
        Ok(clusters)
    }

    fn get_request(&self, id: RequestId) -> Result<Option<ConnectionRequest>, Self::Error> {
        let id = id.to_bytes().to_vec();
        let sql = format!("SELECT {} FROM requests WHERE id = ?1", REQUEST_COLUMNS);
        let request = self.conn.query_row(&sql, params![&id], request_from_row).optional()?;
        match request {
            Some(mut request) => {
                load_approvals(&self.conn, &mut request)?;
                Ok(Some(request))
            }
            None => Ok(None),
        }
    }

    fn query_requests(&self, query: &RequestQuery) -> Result<Vec<ConnectionRequest>, Self::Error> {
        let mut sql = format!("SELECT {} FROM requests WHERE 1=1", REQUEST_COLUMNS);
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(requester) = query.requester {
            sql.push_str(" AND requester_id = ?");
            params.push(Box::new(requester.to_bytes().to_vec()));
        }

        if let Some(target) = query.target {
            sql.push_str(" AND target_id = ?");
            params.push(Box::new(target.to_bytes().to_vec()));
        }

        if let Some(parent) = query.parent {
            sql.push_str(" AND parent_id = ?");
            params.push(Box::new(parent.to_bytes().to_vec()));
        }

        if query.primary_only {
            sql.push_str(" AND parent_id IS NULL");
        }

        if let Some(status) = query.status {
            sql.push_str(" AND status = ?");
            params.push(Box::new(status.as_str()));
        }

        if let Some(relation) = query.relation_type {
            sql.push_str(" AND relation_type = ?");
            params.push(Box::new(relation.as_str()));
        }

        // Approver-set criteria are resolved after the approvals are loaded.
        if let Some(person) = query.awaiting.or(query.involving) {
            sql.push_str(" AND (requester_id = ? OR target_id = ? OR EXISTS (SELECT 1 FROM request_approvals a WHERE a.request_id = requests.id AND a.person_id = ?))");
            let bytes = person.to_bytes().to_vec();
            params.push(Box::new(bytes.clone()));
            params.push(Box::new(bytes.clone()));
            params.push(Box::new(bytes));
        }

        sql.push_str(" ORDER BY created_at, id");

        let mut stmt = self.conn.prepare(&sql)?;
        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let rows = stmt
            .query_map(&param_refs[..], request_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        let mut requests = Vec::with_capacity(rows.len());
        for mut request in rows {
            load_approvals(&self.conn, &mut request)?;
            if query.matches(&request) {
                requests.push(request);
            }
        }
        Ok(requests)
    }

    fn commit(&mut self, changes: ChangeSet) -> Result<CommitOutcome, Self::Error> {
        let tx = self.conn.transaction()?;
        for change in changes.into_changes() {
            if let Some(conflict) = apply_change(&tx, change)? {
                tx.rollback()?;
                return Ok(CommitOutcome::Conflict(conflict));
            }
        }
        tx.commit()?;
        Ok(CommitOutcome::Committed)
    }
}
