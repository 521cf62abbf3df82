//! SQLite implementation of [`CacheStorage`].
//!
//! Headers are persisted as a JSON list of `[name, value bytes]` pairs so
//! repeated header names and non-UTF-8 values survive a round trip.

use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

use super::CacheStorage;
use super::connection::CacheDb;
use crate::{Error, Response};

/// Raw row as read from `cache_entries`.
struct EntryRow {
    status: i64,
    status_text: String,
    headers_json: String,
    body: Vec<u8>,
}

fn encode_headers(headers: &HeaderMap) -> Result<String, Error> {
    let pairs: Vec<(&str, &[u8])> = headers.iter().map(|(name, value)| (name.as_str(), value.as_bytes())).collect();
    serde_json::to_string(&pairs).map_err(|e| Error::CorruptEntry(format!("headers: {e}")))
}

fn decode_headers(json: &str) -> Result<HeaderMap, Error> {
    let pairs: Vec<(String, Vec<u8>)> =
        serde_json::from_str(json).map_err(|e| Error::CorruptEntry(format!("headers: {e}")))?;
    let mut headers = HeaderMap::with_capacity(pairs.len());
    for (name, value) in pairs {
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| Error::CorruptEntry(e.to_string()))?;
        let value = HeaderValue::from_bytes(&value).map_err(|e| Error::CorruptEntry(e.to_string()))?;
        headers.append(name, value);
    }
    Ok(headers)
}

impl EntryRow {
    fn into_response(self) -> Result<Response, Error> {
        let status = u16::try_from(self.status).map_err(|_| Error::CorruptEntry(format!("status {}", self.status)))?;
        let headers = decode_headers(&self.headers_json)?;
        Ok(Response::new(status, self.status_text, headers, Bytes::from(self.body)))
    }
}

#[async_trait]
impl CacheStorage for CacheDb {
    async fn open(&self, name: &str) -> Result<(), Error> {
        let name = name.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO cache_stores (name, created_at) VALUES (?1, ?2)",
                    params![name, now],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM cache_stores ORDER BY name")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, rusqlite::Error>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    async fn delete(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM cache_stores WHERE name = ?1", params![name])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    async fn match_url(&self, name: &str, key: &str) -> Result<Option<Response>, Error> {
        let name = name.to_string();
        let key = key.to_string();
        let row = self
            .conn
            .call(move |conn| -> Result<Option<EntryRow>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT status, status_text, headers_json, body
                     FROM cache_entries WHERE store = ?1 AND url = ?2",
                )?;

                let result = stmt.query_row(params![name, key], |row| {
                    Ok(EntryRow {
                        status: row.get(0)?,
                        status_text: row.get(1)?,
                        headers_json: row.get(2)?,
                        body: row.get(3)?,
                    })
                });

                match result {
                    Ok(row) => Ok(Some(row)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        row.map(EntryRow::into_response).transpose()
    }

    async fn put(&self, name: &str, key: &str, response: &Response) -> Result<(), Error> {
        let name = name.to_string();
        let key = key.to_string();
        let status = i64::from(response.status);
        let status_text = response.status_text.clone();
        let headers_json = encode_headers(&response.headers)?;
        let body = response.body.to_vec();
        let now = chrono::Utc::now().to_rfc3339();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT OR IGNORE INTO cache_stores (name, created_at) VALUES (?1, ?2)",
                    params![&name, &now],
                )?;
                tx.execute(
                    "INSERT INTO cache_entries (store, url, status, status_text, headers_json, body, stored_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                     ON CONFLICT(store, url) DO UPDATE SET
                        status = excluded.status,
                        status_text = excluded.status_text,
                        headers_json = excluded.headers_json,
                        body = excluded.body,
                        stored_at = excluded.stored_at",
                    params![&name, &key, status, &status_text, &headers_json, &body, &now],
                )?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn keys(&self, name: &str) -> Result<Vec<String>, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT url FROM cache_entries WHERE store = ?1 ORDER BY url")?;
                let keys = stmt
                    .query_map(params![name], |row| row.get(0))?
                    .collect::<Result<Vec<String>, rusqlite::Error>>()?;
                Ok(keys)
            })
            .await
            .map_err(Error::from)
    }
}
