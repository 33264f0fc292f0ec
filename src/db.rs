use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{de::DeserializeOwned, Serialize};

use crate::config;
use crate::models::CartItem;

pub const CART_KEY: &str = "vnvnc_cart";

pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> rusqlite::Result<Self> {
        config::ensure_parent(path);
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    pub fn open_in_memory() -> rusqlite::Result<Self> {
        let store = Self {
            conn: Connection::open_in_memory()?,
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> rusqlite::Result<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS storage(
                key TEXT PRIMARY KEY,
                payload TEXT NOT NULL,
                updated_at_utc TEXT NOT NULL
            );",
        )?;
        Ok(())
    }

    pub fn put_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> rusqlite::Result<()> {
        let payload = serde_json::to_string(value)
            .map_err(|err| rusqlite::Error::ToSqlConversionFailure(Box::new(err)))?;
        let now: DateTime<Utc> = Utc::now();
        self.conn.execute(
            "INSERT INTO storage (key, payload, updated_at_utc)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET
               payload = excluded.payload,
               updated_at_utc = excluded.updated_at_utc",
            params![key, payload, now],
        )?;
        Ok(())
    }

    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> rusqlite::Result<Option<T>> {
        let payload: Option<String> = self
            .conn
            .query_row(
                "SELECT payload FROM storage WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        let Some(payload) = payload else {
            return Ok(None);
        };
        let value = serde_json::from_str(&payload).map_err(|err| {
            rusqlite::Error::FromSqlConversionFailure(
                payload.len(),
                rusqlite::types::Type::Text,
                Box::new(err),
            )
        })?;
        Ok(Some(value))
    }

    pub fn updated_at(&self, key: &str) -> rusqlite::Result<Option<DateTime<Utc>>> {
        self.conn
            .query_row(
                "SELECT updated_at_utc FROM storage WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
    }

    pub fn delete(&self, key: &str) -> rusqlite::Result<()> {
        self.conn
            .execute("DELETE FROM storage WHERE key = ?1", params![key])?;
        Ok(())
    }

    pub fn save_cart(&self, items: &[CartItem]) -> rusqlite::Result<()> {
        self.put_json(CART_KEY, items)
    }

    pub fn load_cart(&self) -> rusqlite::Result<Vec<CartItem>> {
        Ok(self.get_json(CART_KEY)?.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog;

    fn sample_items() -> Vec<CartItem> {
        let hoodie = catalog::find_product("hoodie-red-2025").expect("hoodie");
        let variant = hoodie.variant("hr-m").expect("variant").clone();
        vec![CartItem {
            product: hoodie,
            variant,
            quantity: 2,
        }]
    }

    #[test]
    fn cart_round_trips_through_storage() {
        let store = Store::open_in_memory().expect("store");
        assert!(store.load_cart().expect("empty cart").is_empty());

        let items = sample_items();
        store.save_cart(&items).expect("save");
        assert_eq!(store.load_cart().expect("load"), items);
        assert!(store.updated_at(CART_KEY).expect("timestamp").is_some());

        store.save_cart(&[]).expect("overwrite");
        assert!(store.load_cart().expect("load").is_empty());
    }

    #[test]
    fn cart_keeps_legacy_field_names() {
        let store = Store::open_in_memory().expect("store");
        store.save_cart(&sample_items()).expect("save");
        let raw: serde_json::Value = store.get_json(CART_KEY).expect("raw").expect("present");
        let line = &raw[0];
        assert!(line.get("product").is_some());
        assert_eq!(line["variant"]["inStock"], serde_json::json!(true));
        assert_eq!(line["quantity"], serde_json::json!(2));
    }

    #[test]
    fn corrupt_payload_surfaces_as_error() {
        let store = Store::open_in_memory().expect("store");
        store.put_json(CART_KEY, &"not a cart").expect("put");
        assert!(store.load_cart().is_err());
        store.delete(CART_KEY).expect("delete");
        assert!(store.load_cart().expect("load").is_empty());
    }

    #[test]
    fn opens_on_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("data").join("vnvnc.sqlite");
        {
            let store = Store::open(&path).expect("open");
            store.save_cart(&sample_items()).expect("save");
        }
        let reopened = Store::open(&path).expect("reopen");
        assert_eq!(reopened.load_cart().expect("load").len(), 1);
    }
}
