use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use crate::error::StorageError;
use crate::models::{Client, ClientId, Entry, Project, ProjectId, User, UserId};

const DATA_FILE_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Database {
    pub version: u32,
    #[serde(default)]
    next_id: NextIds,
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub clients: Vec<Client>,
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub entries: Vec<Entry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct NextIds {
    user: u64,
    client: u64,
    project: u64,
    entry: u64,
}

fn bump(counter: &mut u64) -> u64 {
    *counter += 1;
    *counter
}

impl Default for Database {
    fn default() -> Self {
        Self {
            version: DATA_FILE_VERSION,
            next_id: NextIds::default(),
            users: Vec::new(),
            clients: Vec::new(),
            projects: Vec::new(),
            entries: Vec::new(),
        }
    }
}

impl Database {
    pub fn insert_user(&mut self, username: &str, password_hash: String) -> User {
        let user = User {
            id: bump(&mut self.next_id.user),
            username: username.to_string(),
            password_hash,
        };
        self.users.push(user.clone());
        user
    }

    pub fn insert_client(&mut self, name: String, owner: UserId) -> Client {
        let client = Client {
            id: bump(&mut self.next_id.client),
            name,
            owner: Some(owner),
        };
        self.clients.push(client.clone());
        client
    }

    pub fn insert_project(
        &mut self,
        name: String,
        client: Option<ClientId>,
        owner: UserId,
    ) -> Project {
        let project = Project {
            id: bump(&mut self.next_id.project),
            name,
            client,
            owner: Some(owner),
        };
        self.projects.push(project.clone());
        project
    }

    pub fn insert_entry(
        &mut self,
        start: DateTime<Utc>,
        stop: Option<DateTime<Utc>>,
        project: ProjectId,
        description: String,
        owner: UserId,
    ) -> Entry {
        let entry = Entry {
            id: bump(&mut self.next_id.entry),
            start,
            stop,
            project,
            description,
            owner: Some(owner),
        };
        self.entries.push(entry.clone());
        entry
    }

    pub fn client(&self, id: ClientId) -> Option<&Client> {
        self.clients.iter().find(|client| client.id == id)
    }

    pub fn client_mut(&mut self, id: ClientId) -> Option<&mut Client> {
        self.clients.iter_mut().find(|client| client.id == id)
    }

    pub fn project(&self, id: ProjectId) -> Option<&Project> {
        self.projects.iter().find(|project| project.id == id)
    }

    pub fn project_mut(&mut self, id: ProjectId) -> Option<&mut Project> {
        self.projects.iter_mut().find(|project| project.id == id)
    }

    pub fn user_by_name(&self, username: &str) -> Option<&User> {
        self.users.iter().find(|user| user.username == username)
    }

    pub fn user(&self, id: UserId) -> Option<&User> {
        self.users.iter().find(|user| user.id == id)
    }
}

/// Shared store. Every write is applied to a copy, flushed to disk, then swapped in,
/// so a failed flush leaves both memory and disk untouched.
#[derive(Debug)]
pub struct Store {
    path: Option<PathBuf>,
    db: RwLock<Database>,
}

impl Store {
    #[cfg(test)]
    pub fn in_memory() -> Self {
        Self {
            path: None,
            db: RwLock::new(Database::default()),
        }
    }

    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let db = if path.exists() {
            read_database(&path)?
        } else {
            Database::default()
        };
        Ok(Self {
            path: Some(path),
            db: RwLock::new(db),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn read<R>(&self, f: impl FnOnce(&Database) -> R) -> R {
        let guard = self.db.read().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }

    pub fn write<R>(&self, f: impl FnOnce(&mut Database) -> R) -> Result<R, StorageError> {
        let mut guard = self.db.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = guard.clone();
        let result = f(&mut next);
        if let Some(path) = &self.path {
            write_database(path, &next)?;
        }
        *guard = next;
        Ok(result)
    }
}

fn read_database(path: &Path) -> Result<Database, StorageError> {
    let contents = fs::read_to_string(path)?;
    let db: Database = serde_json::from_str(&contents)?;
    if db.version != DATA_FILE_VERSION {
        return Err(StorageError::UnsupportedVersion(db.version));
    }
    Ok(db)
}

fn write_database(path: &Path, db: &Database) -> Result<(), StorageError> {
    let json = serde_json::to_string_pretty(db)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

pub fn default_data_path() -> Option<PathBuf> {
    let mut path = dirs::home_dir()?;
    path.push(".timetracker-data.json");
    Some(path)
}
