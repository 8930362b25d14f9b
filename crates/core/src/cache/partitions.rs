//! SQLite implementation of the partition store.
//!
//! Entries are keyed by the SHA-256 digest of their [`RequestKey`]; the
//! readable key is stored alongside so partitions can be listed.

use async_trait::async_trait;
use bytes::Bytes;
use tokio_rusqlite::rusqlite::{self, OptionalExtension};
use tokio_rusqlite::params;
use url::Url;

use super::connection::CacheDb;
use super::key::RequestKey;
use super::store::{CacheStore, PartitionHandle};
use crate::Error;
use crate::http::{Response, ResponseKind};

const ENTRY_COLUMNS: &str = "e.kind, e.status, e.status_text, e.url, e.headers_json, e.body";

/// Raw entry row as read from SQLite, decoded outside the connection thread.
struct EntryRow {
    kind: String,
    status: i64,
    status_text: String,
    url: Option<String>,
    headers_json: String,
    body: Vec<u8>,
}

impl EntryRow {
    fn read(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            kind: row.get(0)?,
            status: row.get(1)?,
            status_text: row.get(2)?,
            url: row.get(3)?,
            headers_json: row.get(4)?,
            body: row.get(5)?,
        })
    }

    fn into_response(self) -> Result<Response, Error> {
        let kind = if self.kind == "error" { ResponseKind::Error } else { ResponseKind::Basic };
        let headers: Vec<(String, String)> = serde_json::from_str(&self.headers_json)?;
        Ok(Response {
            kind,
            status: u16::try_from(self.status).unwrap_or_default(),
            status_text: self.status_text,
            url: self.url.as_deref().and_then(|u| Url::parse(u).ok()),
            headers,
            body: Bytes::from(self.body),
        })
    }
}

fn kind_label(kind: ResponseKind) -> &'static str {
    match kind {
        ResponseKind::Basic => "basic",
        ResponseKind::Error => "error",
    }
}

fn partition_id(conn: &rusqlite::Connection, name: &str) -> rusqlite::Result<Option<i64>> {
    conn.query_row("SELECT id FROM partitions WHERE name = ?1", params![name], |row| row.get(0))
        .optional()
}

impl CacheDb {
    async fn find_partition(&self, name: &str) -> Result<i64, Error> {
        let lookup = name.to_string();
        let id = self
            .conn
            .call(move |conn| -> Result<Option<i64>, Error> { Ok(partition_id(conn, &lookup)?) })
            .await
            .map_err(Error::from)?;
        id.ok_or_else(|| Error::UnknownPartition(name.to_string()))
    }
}

#[async_trait]
impl CacheStore for CacheDb {
    async fn open(&self, name: &str) -> Result<PartitionHandle, Error> {
        let owned = name.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO partitions (name, created_at) VALUES (?1, ?2) ON CONFLICT(name) DO NOTHING",
                    params![owned, now],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)?;
        Ok(PartitionHandle::new(name))
    }

    async fn match_entry(&self, handle: &PartitionHandle, key: &RequestKey) -> Result<Option<Response>, Error> {
        let name = handle.name().to_string();
        let hash = key.digest();
        let row = self
            .conn
            .call(move |conn| -> Result<Option<EntryRow>, Error> {
                let sql = format!(
                    "SELECT {ENTRY_COLUMNS} FROM entries e
                     JOIN partitions p ON p.id = e.partition_id
                     WHERE p.name = ?1 AND e.key_hash = ?2"
                );
                Ok(conn.query_row(&sql, params![name, hash], EntryRow::read).optional()?)
            })
            .await
            .map_err(Error::from)?;
        row.map(EntryRow::into_response).transpose()
    }

    async fn match_any(&self, key: &RequestKey) -> Result<Option<Response>, Error> {
        let hash = key.digest();
        let row = self
            .conn
            .call(move |conn| -> Result<Option<EntryRow>, Error> {
                let sql = format!(
                    "SELECT {ENTRY_COLUMNS} FROM entries e
                     JOIN partitions p ON p.id = e.partition_id
                     WHERE e.key_hash = ?1
                     ORDER BY p.id ASC LIMIT 1"
                );
                Ok(conn.query_row(&sql, params![hash], EntryRow::read).optional()?)
            })
            .await
            .map_err(Error::from)?;
        row.map(EntryRow::into_response).transpose()
    }

    async fn put(&self, handle: &PartitionHandle, key: RequestKey, response: &Response) -> Result<(), Error> {
        let id = self.find_partition(handle.name()).await?;
        let headers_json = serde_json::to_string(&response.headers)?;
        let kind = kind_label(response.kind);
        let status = i64::from(response.status);
        let status_text = response.status_text.clone();
        let url = response.url.as_ref().map(Url::to_string);
        let body = response.body.to_vec();
        let stored_at = chrono::Utc::now().to_rfc3339();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO entries (
                        partition_id, key_hash, request_key, kind, status, status_text,
                        url, headers_json, body, stored_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                    ON CONFLICT(partition_id, key_hash) DO UPDATE SET
                        request_key = excluded.request_key,
                        kind = excluded.kind,
                        status = excluded.status,
                        status_text = excluded.status_text,
                        url = excluded.url,
                        headers_json = excluded.headers_json,
                        body = excluded.body,
                        stored_at = excluded.stored_at",
                    params![
                        id,
                        key.digest(),
                        key.as_str(),
                        kind,
                        status,
                        status_text,
                        url,
                        headers_json,
                        body,
                        stored_at,
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn keys(&self, handle: &PartitionHandle) -> Result<Vec<RequestKey>, Error> {
        let id = self.find_partition(handle.name()).await?;
        self.conn
            .call(move |conn| -> Result<Vec<RequestKey>, Error> {
                let mut stmt = conn.prepare("SELECT request_key FROM entries WHERE partition_id = ?1 ORDER BY rowid")?;
                let keys = stmt
                    .query_map(params![id], |row| row.get::<_, String>(0))?
                    .map(|k| k.map(RequestKey::from_stored))
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(keys)
            })
            .await
            .map_err(Error::from)
    }

    async fn list_partitions(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM partitions ORDER BY id")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<rusqlite::Result<Vec<String>>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    async fn delete(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute("DELETE FROM partitions WHERE name = ?1", params![name])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    async fn rename(&self, from: &str, to: &str) -> Result<(), Error> {
        let from = from.to_string();
        let to = to.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                let Some(id) = partition_id(&tx, &from)? else {
                    return Err(Error::UnknownPartition(from));
                };
                if from != to {
                    tx.execute("DELETE FROM partitions WHERE name = ?1", params![to])?;
                    tx.execute("UPDATE partitions SET name = ?1 WHERE id = ?2", params![to, id])?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(path: &str) -> RequestKey {
        RequestKey::get(&Url::parse(&format!("https://example.com{path}")).unwrap())
    }

    fn html(body: &str) -> Response {
        Response::new(200, body.to_string())
            .with_header("Content-Type", "text/html")
            .with_url(Url::parse("https://example.com/index.html").unwrap())
    }

    #[tokio::test]
    async fn test_put_and_match() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let static_cache = db.open("mm-static-v2").await.unwrap();
        let response = html("<html>shell</html>");

        db.put(&static_cache, key("/index.html"), &response).await.unwrap();

        let cached = db.match_entry(&static_cache, &key("/index.html")).await.unwrap().unwrap();
        assert_eq!(cached, response);
    }

    #[tokio::test]
    async fn test_match_missing() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let handle = db.open("mm-runtime-v1").await.unwrap();
        assert!(db.match_entry(&handle, &key("/api")).await.unwrap().is_none());
        assert!(db.match_any(&key("/api")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_overwrites_same_key() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let handle = db.open("mm-runtime-v1").await.unwrap();

        db.put(&handle, key("/api"), &Response::new(200, "old")).await.unwrap();
        db.put(&handle, key("/api"), &Response::new(200, "new")).await.unwrap();

        let cached = db.match_entry(&handle, &key("/api")).await.unwrap().unwrap();
        assert_eq!(cached.body, Bytes::from("new"));
        assert_eq!(db.keys(&handle).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_partitions_are_isolated() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let a = db.open("a").await.unwrap();
        let b = db.open("b").await.unwrap();

        db.put(&a, key("/x"), &Response::new(200, "a")).await.unwrap();

        assert!(db.match_entry(&b, &key("/x")).await.unwrap().is_none());
        assert!(db.match_any(&key("/x")).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_match_any_prefers_oldest_partition() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let first = db.open("first").await.unwrap();
        let second = db.open("second").await.unwrap();

        db.put(&second, key("/x"), &Response::new(200, "second")).await.unwrap();
        db.put(&first, key("/x"), &Response::new(200, "first")).await.unwrap();

        let hit = db.match_any(&key("/x")).await.unwrap().unwrap();
        assert_eq!(hit.body, Bytes::from("first"));
    }

    #[tokio::test]
    async fn test_open_is_idempotent() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let handle = db.open("mm-static-v2").await.unwrap();
        db.put(&handle, key("/"), &Response::new(200, "root")).await.unwrap();

        let again = db.open("mm-static-v2").await.unwrap();
        assert_eq!(db.list_partitions().await.unwrap(), vec!["mm-static-v2".to_string()]);
        assert!(db.match_entry(&again, &key("/")).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_cascades_entries() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let handle = db.open("mm-static-v1").await.unwrap();
        db.put(&handle, key("/"), &Response::new(200, "root")).await.unwrap();

        assert!(db.delete("mm-static-v1").await.unwrap());
        assert!(!db.delete("mm-static-v1").await.unwrap());
        assert!(db.match_any(&key("/")).await.unwrap().is_none());

        let orphans: i64 = db
            .conn
            .call(|conn| conn.query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0)))
            .await
            .unwrap();
        assert_eq!(orphans, 0);
    }

    #[tokio::test]
    async fn test_put_into_deleted_partition_fails() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let handle = db.open("gone").await.unwrap();
        db.delete("gone").await.unwrap();

        let result = db.put(&handle, key("/"), &Response::new(200, "x")).await;
        assert!(matches!(result, Err(Error::UnknownPartition(_))));
    }

    #[tokio::test]
    async fn test_rename_replaces_target() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let live = db.open("mm-static-v2").await.unwrap();
        db.put(&live, key("/old"), &Response::new(200, "old")).await.unwrap();

        let staging = db.open("mm-static-v2.staging").await.unwrap();
        db.put(&staging, key("/new"), &Response::new(200, "new")).await.unwrap();

        db.rename("mm-static-v2.staging", "mm-static-v2").await.unwrap();

        assert_eq!(db.list_partitions().await.unwrap(), vec!["mm-static-v2".to_string()]);
        let live = db.open("mm-static-v2").await.unwrap();
        let keys = db.keys(&live).await.unwrap();
        assert_eq!(keys, vec![key("/new")]);
    }

    #[tokio::test]
    async fn test_rename_unknown_source() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let result = db.rename("missing", "target").await;
        assert!(matches!(result, Err(Error::UnknownPartition(name)) if name == "missing"));
    }

    #[tokio::test]
    async fn test_error_response_roundtrip_kind() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let handle = db.open("p").await.unwrap();
        db.put(&handle, key("/e"), &Response::error()).await.unwrap();

        let cached = db.match_entry(&handle, &key("/e")).await.unwrap().unwrap();
        assert!(cached.is_error());
        assert_eq!(cached.status, 0);
    }
}
