//! In-process document store: named collections of JSON documents.
//!
//! This is the only coordination point between pipeline invocations (there
//! is no shared in-memory state besides it). It exposes the five operations
//! the pipeline needs (read-by-id, filtered/ordered/limited query, create,
//! field-level update, merge-upsert) plus per-collection creation
//! notifications, which is what the trigger dispatcher subscribes to.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{mpsc, RwLock};
use tracing::debug;
use uuid::Uuid;

use crate::error::PipelineError;

/// A document creation event delivered to watchers.
#[derive(Clone, Debug)]
pub struct CreatedDoc {
  pub id: String,
  pub doc: Value,
}

type Collections = HashMap<&'static str, BTreeMap<String, Value>>;
type Watchers = HashMap<&'static str, Vec<mpsc::UnboundedSender<CreatedDoc>>>;

#[derive(Clone, Default)]
pub struct DocStore {
  collections: Arc<RwLock<Collections>>,
  watchers: Arc<RwLock<Watchers>>,
}

impl DocStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Read a document by id.
  pub async fn get(&self, collection: &'static str, id: &str) -> Option<Value> {
    let cols = self.collections.read().await;
    cols.get(collection).and_then(|c| c.get(id)).cloned()
  }

  /// Create a document under a fresh uuid, notify watchers, return the id.
  pub async fn create(&self, collection: &'static str, doc: Value) -> String {
    let id = Uuid::new_v4().to_string();
    self.create_with_id(collection, &id, doc).await;
    id
  }

  /// Create (or replace) a document under a caller-chosen id and notify
  /// watchers. The notification carries the stored document.
  pub async fn create_with_id(&self, collection: &'static str, id: &str, doc: Value) {
    {
      let mut cols = self.collections.write().await;
      cols.entry(collection).or_default().insert(id.to_string(), doc.clone());
    }
    debug!(target: "ecoquest_backend", collection, %id, "Document created");
    self.notify(collection, id, doc).await;
  }

  /// Field-level update: deep-merges `fields` into an existing document.
  /// Fails with `NotFound` when the document does not exist.
  pub async fn update(
    &self,
    collection: &'static str,
    id: &str,
    fields: Value,
  ) -> Result<(), PipelineError> {
    let mut cols = self.collections.write().await;
    let doc = cols
      .get_mut(collection)
      .and_then(|c| c.get_mut(id))
      .ok_or_else(|| PipelineError::NotFound { collection, id: id.to_string() })?;
    merge_into(doc, fields);
    Ok(())
  }

  /// Merge-upsert: like `update`, but inserts the document when absent.
  /// Idempotent per (collection, id, fields).
  pub async fn upsert_merge(&self, collection: &'static str, id: &str, fields: Value) {
    let mut cols = self.collections.write().await;
    let col = cols.entry(collection).or_default();
    match col.get_mut(id) {
      Some(doc) => merge_into(doc, fields),
      None => {
        col.insert(id.to_string(), fields);
      }
    }
  }

  /// Query with a single equality filter, order-by-field, and limit.
  /// ISO date strings order correctly under plain string comparison.
  pub async fn query(
    &self,
    collection: &'static str,
    filter: Option<(&str, &Value)>,
    order_by: &str,
    descending: bool,
    limit: usize,
  ) -> Vec<(String, Value)> {
    let cols = self.collections.read().await;
    let Some(col) = cols.get(collection) else { return Vec::new() };

    let mut hits: Vec<(String, Value)> = col
      .iter()
      .filter(|(_, doc)| match filter {
        Some((field, expected)) => doc.get(field) == Some(expected),
        None => true,
      })
      .map(|(id, doc)| (id.clone(), doc.clone()))
      .collect();

    hits.sort_by(|(_, a), (_, b)| {
      let ord = cmp_field(a.get(order_by), b.get(order_by));
      if descending { ord.reverse() } else { ord }
    });
    hits.truncate(limit);
    hits
  }

  /// All documents of a collection, unordered beyond id order.
  pub async fn list(&self, collection: &'static str) -> Vec<(String, Value)> {
    let cols = self.collections.read().await;
    cols
      .get(collection)
      .map(|c| c.iter().map(|(id, doc)| (id.clone(), doc.clone())).collect())
      .unwrap_or_default()
  }

  /// Subscribe to creation events for one collection.
  pub async fn watch_creates(&self, collection: &'static str) -> mpsc::UnboundedReceiver<CreatedDoc> {
    let (tx, rx) = mpsc::unbounded_channel();
    self.watchers.write().await.entry(collection).or_default().push(tx);
    rx
  }

  async fn notify(&self, collection: &'static str, id: &str, doc: Value) {
    let mut watchers = self.watchers.write().await;
    if let Some(list) = watchers.get_mut(collection) {
      list.retain(|tx| tx.send(CreatedDoc { id: id.to_string(), doc: doc.clone() }).is_ok());
    }
  }
}

/// Deep merge: JSON objects merge recursively, everything else replaces.
fn merge_into(target: &mut Value, patch: Value) {
  match (target, patch) {
    (Value::Object(t), Value::Object(p)) => {
      for (k, v) in p {
        match t.get_mut(&k) {
          Some(slot) => merge_into(slot, v),
          None => {
            t.insert(k, v);
          }
        }
      }
    }
    (t, p) => *t = p,
  }
}

fn cmp_field(a: Option<&Value>, b: Option<&Value>) -> std::cmp::Ordering {
  use std::cmp::Ordering;
  match (a, b) {
    (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
    (Some(Value::Number(x)), Some(Value::Number(y))) => x
      .as_f64()
      .partial_cmp(&y.as_f64())
      .unwrap_or(Ordering::Equal),
    (Some(_), None) => Ordering::Greater,
    (None, Some(_)) => Ordering::Less,
    _ => Ordering::Equal,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[tokio::test]
  async fn query_filters_orders_and_limits() {
    let store = DocStore::new();
    for (sdg, date) in [("a", "2024-01-03"), ("a", "2024-01-01"), ("b", "2024-01-02"), ("a", "2024-01-02")] {
      store.create("challenges", json!({"sdg": sdg, "startDate": date})).await;
    }

    let filter_value = json!("a");
    let hits = store
      .query("challenges", Some(("sdg", &filter_value)), "startDate", true, 2)
      .await;
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].1["startDate"], "2024-01-03");
    assert_eq!(hits[1].1["startDate"], "2024-01-02");
  }

  #[tokio::test]
  async fn update_fails_on_missing_document() {
    let store = DocStore::new();
    let err = store.update("challenge_entries", "nope", json!({"x": 1})).await.unwrap_err();
    assert!(matches!(err, PipelineError::NotFound { .. }));
  }

  #[tokio::test]
  async fn merge_upsert_is_deep_and_idempotent() {
    let store = DocStore::new();
    store
      .upsert_merge("summaries", "2024-06-01", json!({"date": "2024-06-01", "title": {"en": "Hello"}}))
      .await;
    store
      .upsert_merge("summaries", "2024-06-01", json!({"title": {"fr": "Bonjour"}}))
      .await;
    // Same patch again: no change.
    store
      .upsert_merge("summaries", "2024-06-01", json!({"title": {"fr": "Bonjour"}}))
      .await;

    let doc = store.get("summaries", "2024-06-01").await.unwrap();
    assert_eq!(doc["title"]["en"], "Hello");
    assert_eq!(doc["title"]["fr"], "Bonjour");
    assert_eq!(doc["date"], "2024-06-01");
  }

  #[tokio::test]
  async fn watchers_receive_creations() {
    let store = DocStore::new();
    let mut rx = store.watch_creates("challenge_entries").await;
    let id = store.create("challenge_entries", json!({"challenge_id": "c1"})).await;

    let event = rx.recv().await.unwrap();
    assert_eq!(event.id, id);
    assert_eq!(event.doc["challenge_id"], "c1");
  }
}
