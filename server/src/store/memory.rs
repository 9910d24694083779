use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use shared::{Document, DocumentSummary};
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::{DocumentStore, StoreError, StoreResult, UserStore};
use crate::account::Account;

#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    docs: RwLock<HashMap<String, Document>>,
    snapshot: Option<PathBuf>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load documents from `path` if it exists and write every change back to
    /// it.
    pub async fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let docs: Vec<Document> = load_snapshot(&path).await?;
        info!("Loaded {} documents from {:?}", docs.len(), path);
        Ok(Self {
            docs: RwLock::new(
                docs.into_iter()
                    .map(|doc| (doc.identifier.clone(), doc))
                    .collect(),
            ),
            snapshot: Some(path),
        })
    }

    async fn persist(&self, docs: &HashMap<String, Document>) -> StoreResult<()> {
        match &self.snapshot {
            Some(path) => {
                let mut items: Vec<&Document> = docs.values().collect();
                items.sort_by(|a, b| a.identifier.cmp(&b.identifier));
                write_snapshot(path, &items).await
            }
            None => Ok(()),
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn list(&self) -> StoreResult<Vec<DocumentSummary>> {
        let docs = self.docs.read().await;
        let mut summaries: Vec<DocumentSummary> = docs.values().map(Document::summary).collect();
        summaries.sort_by(|a, b| {
            b.last_updated
                .cmp(&a.last_updated)
                .then_with(|| a.identifier.cmp(&b.identifier))
        });
        Ok(summaries)
    }

    async fn get(&self, identifier: &str) -> StoreResult<Option<Document>> {
        Ok(self.docs.read().await.get(identifier).cloned())
    }

    async fn insert(&self, doc: Document) -> StoreResult<Document> {
        let mut docs = self.docs.write().await;
        if docs.contains_key(&doc.identifier) {
            return Err(StoreError::Conflict {
                field: "identifier",
                value: doc.identifier,
            });
        }
        docs.insert(doc.identifier.clone(), doc.clone());
        if let Err(err) = self.persist(&docs).await {
            docs.remove(&doc.identifier);
            return Err(err);
        }
        Ok(doc)
    }

    async fn replace(&self, doc: Document) -> StoreResult<Option<Document>> {
        let mut docs = self.docs.write().await;
        let previous = match docs.get_mut(&doc.identifier) {
            Some(slot) => std::mem::replace(slot, doc.clone()),
            None => return Ok(None),
        };
        if let Err(err) = self.persist(&docs).await {
            docs.insert(previous.identifier.clone(), previous);
            return Err(err);
        }
        Ok(Some(doc))
    }

    async fn delete(&self, identifier: &str) -> StoreResult<Option<Document>> {
        let mut docs = self.docs.write().await;
        let Some(removed) = docs.remove(identifier) else {
            return Ok(None);
        };
        if let Err(err) = self.persist(&docs).await {
            docs.insert(removed.identifier.clone(), removed);
            return Err(err);
        }
        Ok(Some(removed))
    }
}

#[derive(Debug, Default)]
pub struct MemoryUserStore {
    accounts: RwLock<HashMap<String, Account>>,
    snapshot: Option<PathBuf>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let accounts: Vec<Account> = load_snapshot(&path).await?;
        info!("Loaded {} user accounts from {:?}", accounts.len(), path);
        Ok(Self {
            accounts: RwLock::new(
                accounts
                    .into_iter()
                    .map(|account| (account.id.clone(), account))
                    .collect(),
            ),
            snapshot: Some(path),
        })
    }

    async fn persist(&self, accounts: &HashMap<String, Account>) -> StoreResult<()> {
        match &self.snapshot {
            Some(path) => {
                let mut items: Vec<&Account> = accounts.values().collect();
                items.sort_by(|a, b| a.id.cmp(&b.id));
                write_snapshot(path, &items).await
            }
            None => Ok(()),
        }
    }
}

fn email_taken(accounts: &HashMap<String, Account>, email: &str, except_id: Option<&str>) -> bool {
    accounts
        .values()
        .any(|a| a.email == email && Some(a.id.as_str()) != except_id)
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn list(&self) -> StoreResult<Vec<Account>> {
        let accounts = self.accounts.read().await;
        let mut all: Vec<Account> = accounts.values().cloned().collect();
        all.sort_by(|a, b| a.username.cmp(&b.username).then_with(|| a.id.cmp(&b.id)));
        Ok(all)
    }

    async fn get(&self, id: &str) -> StoreResult<Option<Account>> {
        Ok(self.accounts.read().await.get(id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<Account>> {
        let accounts = self.accounts.read().await;
        Ok(accounts.values().find(|a| a.email == email).cloned())
    }

    async fn insert(&self, account: Account) -> StoreResult<Account> {
        let mut accounts = self.accounts.write().await;
        if email_taken(&accounts, &account.email, None) {
            return Err(StoreError::Conflict {
                field: "email",
                value: account.email,
            });
        }
        accounts.insert(account.id.clone(), account.clone());
        if let Err(err) = self.persist(&accounts).await {
            accounts.remove(&account.id);
            return Err(err);
        }
        Ok(account)
    }

    async fn update(&self, account: Account) -> StoreResult<Option<Account>> {
        let mut accounts = self.accounts.write().await;
        if !accounts.contains_key(&account.id) {
            return Ok(None);
        }
        if email_taken(&accounts, &account.email, Some(&account.id)) {
            return Err(StoreError::Conflict {
                field: "email",
                value: account.email,
            });
        }
        let previous = accounts.insert(account.id.clone(), account.clone());
        if let Err(err) = self.persist(&accounts).await {
            if let Some(previous) = previous {
                accounts.insert(previous.id.clone(), previous);
            }
            return Err(err);
        }
        Ok(Some(account))
    }

    async fn delete(&self, id: &str) -> StoreResult<Option<Account>> {
        let mut accounts = self.accounts.write().await;
        let Some(removed) = accounts.remove(id) else {
            return Ok(None);
        };
        if let Err(err) = self.persist(&accounts).await {
            accounts.insert(removed.id.clone(), removed);
            return Err(err);
        }
        Ok(Some(removed))
    }
}

async fn load_snapshot<T: DeserializeOwned>(path: &Path) -> StoreResult<Vec<T>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(source) => Err(StoreError::Io {
            path: path.display().to_string(),
            source,
        }),
    }
}

/// Writes to a sibling temp file first so a crash never leaves a truncated
/// snapshot behind.
async fn write_snapshot<T: Serialize>(path: &Path, items: &[T]) -> StoreResult<()> {
    let io_err = |source| StoreError::Io {
        path: path.display().to_string(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
    }
    let bytes = serde_json::to_vec_pretty(items)?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, &bytes).await.map_err(io_err)?;
    tokio::fs::rename(&tmp, path).await.map_err(io_err)?;
    debug!("Wrote snapshot {:?} ({} bytes)", path, bytes.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate, Utc};
    use shared::{DocumentDraft, Role, Section};

    fn doc(identifier: &str, minutes_ago: i64) -> Document {
        DocumentDraft {
            title: format!("Doc {identifier}"),
            identifier: identifier.to_string(),
            sections: vec![Section::new("Intro")],
        }
        .into_document(Some("u1".into()), Utc::now() - Duration::minutes(minutes_ago))
    }

    fn account(id: &str, email: &str) -> Account {
        Account {
            id: id.into(),
            username: id.into(),
            email: email.into(),
            phone: "123".into(),
            birthdate: NaiveDate::from_ymd_opt(1985, 1, 1).unwrap(),
            job_title: "Tech".into(),
            role: Role::Viewer,
            password_hash: "x$y".into(),
            recovery_code: None,
            recovery_code_expiry: None,
        }
    }

    #[tokio::test]
    async fn identifiers_are_unique() {
        let store = MemoryDocumentStore::new();
        store.insert(doc("RACK001", 0)).await.unwrap();
        let err = store.insert(doc("RACK001", 0)).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict { field: "identifier", .. }));
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        let store = MemoryDocumentStore::new();
        store.insert(doc("OLD", 60)).await.unwrap();
        store.insert(doc("NEW", 1)).await.unwrap();
        store.insert(doc("MID", 30)).await.unwrap();
        let ids: Vec<String> = store
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.identifier)
            .collect();
        assert_eq!(ids, vec!["NEW", "MID", "OLD"]);
    }

    #[tokio::test]
    async fn replace_and_delete_missing() {
        let store = MemoryDocumentStore::new();
        assert!(store.replace(doc("NOPE", 0)).await.unwrap().is_none());
        assert!(store.delete("NOPE").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn email_uniqueness_on_insert_and_update() {
        let store = MemoryUserStore::new();
        store.insert(account("u1", "a@x.com")).await.unwrap();
        store.insert(account("u2", "b@x.com")).await.unwrap();
        assert!(matches!(
            store.insert(account("u3", "a@x.com")).await,
            Err(StoreError::Conflict { field: "email", .. })
        ));

        let mut u2 = store.get("u2").await.unwrap().unwrap();
        u2.email = "a@x.com".into();
        assert!(store.update(u2.clone()).await.is_err());

        u2.email = "b@x.com".into();
        u2.username = "renamed".into();
        assert!(store.update(u2).await.unwrap().is_some());
        assert_eq!(
            store.find_by_email("b@x.com").await.unwrap().unwrap().username,
            "renamed"
        );
    }

    #[tokio::test]
    async fn snapshots_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let docs_path = dir.path().join("data").join("documents.json");
        let users_path = dir.path().join("data").join("users.json");

        {
            let docs = MemoryDocumentStore::open(&docs_path).await.unwrap();
            docs.insert(doc("RACK001", 0)).await.unwrap();
            docs.insert(doc("RACK002", 0)).await.unwrap();
            docs.delete("RACK002").await.unwrap();

            let users = MemoryUserStore::open(&users_path).await.unwrap();
            users.insert(account("u1", "a@x.com")).await.unwrap();
        }

        let docs = MemoryDocumentStore::open(&docs_path).await.unwrap();
        let reloaded = docs.get("RACK001").await.unwrap().unwrap();
        assert_eq!(reloaded.sections[0].title, "Intro");
        assert!(docs.get("RACK002").await.unwrap().is_none());

        let users = MemoryUserStore::open(&users_path).await.unwrap();
        assert_eq!(users.get("u1").await.unwrap().unwrap().email, "a@x.com");
    }

    #[tokio::test]
    async fn failed_snapshot_write_leaves_store_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("documents.json");
        let docs = MemoryDocumentStore::open(&path).await.unwrap();
        docs.insert(doc("RACK001", 0)).await.unwrap();

        // a directory in the temp file's place makes every write fail
        tokio::fs::create_dir(path.with_extension("json.tmp")).await.unwrap();

        assert!(matches!(
            docs.insert(doc("RACK002", 0)).await,
            Err(StoreError::Io { .. })
        ));
        assert!(docs.get("RACK002").await.unwrap().is_none());

        let mut renamed = doc("RACK001", 0);
        renamed.title = "Renamed".into();
        assert!(docs.replace(renamed).await.is_err());
        assert_eq!(docs.get("RACK001").await.unwrap().unwrap().title, "Doc RACK001");

        assert!(docs.delete("RACK001").await.is_err());
        assert!(docs.get("RACK001").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn failed_user_write_leaves_accounts_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.json");
        let users = MemoryUserStore::open(&path).await.unwrap();
        users.insert(account("u1", "a@x.com")).await.unwrap();
        tokio::fs::create_dir(path.with_extension("json.tmp")).await.unwrap();

        assert!(users.insert(account("u2", "b@x.com")).await.is_err());
        assert!(users.find_by_email("b@x.com").await.unwrap().is_none());

        let mut u1 = users.get("u1").await.unwrap().unwrap();
        u1.username = "renamed".into();
        assert!(users.update(u1).await.is_err());
        assert_eq!(users.get("u1").await.unwrap().unwrap().username, "u1");

        assert!(users.delete("u1").await.is_err());
        assert!(users.get("u1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn corrupt_snapshot_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("documents.json");
        tokio::fs::write(&path, b"not json").await.unwrap();
        assert!(matches!(
            MemoryDocumentStore::open(&path).await,
            Err(StoreError::Json(_))
        ));
    }
}
