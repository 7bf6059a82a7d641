//! Cache and entry operations for the SQLite backend.

use super::connection::SqliteStorage;
use super::hash::compute_entry_key;
use super::{CacheStorage, CacheUsage};
use crate::{Error, Response};
use async_trait::async_trait;
use bytes::Bytes;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// A response flattened into column values, ready for an upsert.
struct EntryRow {
    key_hash: String,
    url: String,
    response_url: String,
    status: u16,
    status_text: String,
    headers_json: String,
    body: Vec<u8>,
    stored_at: String,
}

impl EntryRow {
    fn encode(name: &str, url: &str, response: &Response) -> Result<Self, Error> {
        Ok(Self {
            key_hash: compute_entry_key(name, url),
            url: url.to_string(),
            response_url: response.url.clone(),
            status: response.status,
            status_text: response.status_text.clone(),
            headers_json: serde_json::to_string(&response.headers)?,
            body: response.body.to_vec(),
            stored_at: chrono::Utc::now().to_rfc3339(),
        })
    }
}

fn ensure_cache(conn: &rusqlite::Connection, name: &str) -> Result<(), Error> {
    conn.execute(
        "INSERT OR IGNORE INTO caches (name, created_at) VALUES (?1, ?2)",
        params![name, chrono::Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

fn upsert_entry(conn: &rusqlite::Connection, name: &str, row: &EntryRow) -> Result<(), Error> {
    conn.execute(
        "INSERT INTO entries (
            key_hash, cache_name, url, response_url, status, status_text,
            headers_json, body, body_len, stored_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        ON CONFLICT(key_hash) DO UPDATE SET
            response_url = excluded.response_url,
            status = excluded.status,
            status_text = excluded.status_text,
            headers_json = excluded.headers_json,
            body = excluded.body,
            body_len = excluded.body_len,
            stored_at = excluded.stored_at",
        params![
            &row.key_hash,
            name,
            &row.url,
            &row.response_url,
            row.status,
            &row.status_text,
            &row.headers_json,
            &row.body,
            row.body.len() as i64,
            &row.stored_at,
        ],
    )?;
    Ok(())
}

#[async_trait]
impl CacheStorage for SqliteStorage {
    async fn open(&self, name: &str) -> Result<(), Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> { ensure_cache(conn, &name) })
            .await
            .map_err(Error::from)
    }

    async fn has(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM caches WHERE name = ?1)",
                    params![name],
                    |row| row.get(0),
                )?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    async fn names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM caches ORDER BY name")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    async fn delete(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM caches WHERE name = ?1", params![name])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    async fn match_url(&self, name: &str, url: &str) -> Result<Option<Response>, Error> {
        let key_hash = compute_entry_key(name, url);
        self.conn
            .call(move |conn| -> Result<Option<Response>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT response_url, status, status_text, headers_json, body
                    FROM entries WHERE key_hash = ?1",
                )?;

                let result = stmt.query_row(params![key_hash], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, u16>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, Vec<u8>>(4)?,
                    ))
                });

                match result {
                    Ok((url, status, status_text, headers_json, body)) => Ok(Some(Response {
                        url,
                        status,
                        status_text,
                        headers: serde_json::from_str(&headers_json)?,
                        body: Bytes::from(body),
                    })),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    async fn put(&self, name: &str, url: &str, response: &Response) -> Result<(), Error> {
        let name = name.to_string();
        let row = EntryRow::encode(&name, url, response)?;
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                ensure_cache(&tx, &name)?;
                upsert_entry(&tx, &name, &row)?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn put_all(&self, name: &str, entries: Vec<(String, Response)>) -> Result<(), Error> {
        let name = name.to_string();
        let rows = entries
            .iter()
            .map(|(url, response)| EntryRow::encode(&name, url, response))
            .collect::<Result<Vec<_>, _>>()?;
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                ensure_cache(&tx, &name)?;
                for row in &rows {
                    upsert_entry(&tx, &name, row)?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn delete_entry(&self, name: &str, url: &str) -> Result<bool, Error> {
        let key_hash = compute_entry_key(name, url);
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM entries WHERE key_hash = ?1", params![key_hash])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    async fn keys(&self, name: &str) -> Result<Vec<String>, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT url FROM entries WHERE cache_name = ?1 ORDER BY url")?;
                let keys = stmt
                    .query_map(params![name], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(keys)
            })
            .await
            .map_err(Error::from)
    }

    async fn usage(&self, name: &str) -> Result<CacheUsage, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<CacheUsage, Error> {
                let (entries, bytes): (i64, i64) = conn.query_row(
                    "SELECT COUNT(*), COALESCE(SUM(body_len), 0) FROM entries WHERE cache_name = ?1",
                    params![name],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )?;
                Ok(CacheUsage { entries: entries as u64, bytes: bytes as u64 })
            })
            .await
            .map_err(Error::from)
    }
}
