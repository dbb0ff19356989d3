use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::auth::{IdentityProvider, LocalUsers, Sessions};
use crate::config::{IdentityProviderKind, Settings};
use crate::error::AppError;
use crate::forms::{ClientData, EntryData, ProjectData};
use crate::grouping::{ProjectTotals, project_totals};
use crate::models::{Client, ClientId, Entry, Project, ProjectId, UserId};
use crate::ownership::{authorize, owned_by};
use crate::storage::Store;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub sessions: Arc<Sessions>,
    pub identity: Arc<dyn IdentityProvider>,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(store: Arc<Store>, settings: Settings) -> Self {
        let identity: Arc<dyn IdentityProvider> = match settings.identity {
            IdentityProviderKind::Local => Arc::new(LocalUsers::new(store.clone())),
        };
        let sessions = Arc::new(Sessions::new(settings.session_ttl()));
        Self {
            store,
            sessions,
            identity,
            settings: Arc::new(settings),
        }
    }

    /// Runs `f` on the blocking pool. Writes flush the data file to disk, so
    /// handlers route them through here instead of stalling an async worker.
    pub async fn blocking<R, F>(&self, f: F) -> Result<R, AppError>
    where
        F: FnOnce(&AppState) -> Result<R, AppError> + Send + 'static,
        R: Send + 'static,
    {
        let state = self.clone();
        let span = tracing::Span::current();
        tokio::task::spawn_blocking(move || span.in_scope(|| f(&state))).await?
    }
}

#[derive(Debug, Clone)]
pub struct EntryRow {
    pub entry: Entry,
    pub project_name: String,
    pub duration: i64,
}

impl AppState {
    pub fn clients_for(&self, user: UserId) -> Vec<Client> {
        self.store
            .read(|db| owned_by(&db.clients, user).into_iter().cloned().collect())
    }

    pub fn client_for(&self, user: UserId, id: ClientId) -> Result<Client, AppError> {
        self.store
            .read(|db| authorize(user, db.client(id)).cloned())
    }

    pub fn create_client(&self, user: UserId, data: ClientData) -> Result<Client, AppError> {
        let client = self.store.write(|db| db.insert_client(data.name, user))?;
        tracing::info!(user_id = user, client_id = client.id, "created client");
        Ok(client)
    }

    pub fn update_client(
        &self,
        user: UserId,
        id: ClientId,
        data: ClientData,
    ) -> Result<Client, AppError> {
        let updated = self.store.write(|db| {
            authorize(user, db.client(id))?;
            let client = db.client_mut(id).ok_or(AppError::NotFound)?;
            client.name = data.name;
            Ok::<_, AppError>(client.clone())
        })??;
        tracing::info!(user_id = user, client_id = id, "updated client");
        Ok(updated)
    }

    pub fn projects_for(&self, user: UserId) -> Vec<Project> {
        self.store
            .read(|db| owned_by(&db.projects, user).into_iter().cloned().collect())
    }

    /// The user's projects with the global and per-user minutes for each.
    pub fn project_listing(&self, user: UserId, now: DateTime<Utc>) -> Vec<ProjectTotals> {
        self.store.read(|db| {
            let listing = owned_by(&db.projects, user);
            project_totals(&listing, &db.clients, &db.projects, &db.entries, user, now)
        })
    }

    pub fn project_for(&self, user: UserId, id: ProjectId) -> Result<Project, AppError> {
        self.store
            .read(|db| authorize(user, db.project(id)).cloned())
    }

    pub fn create_project(&self, user: UserId, data: ProjectData) -> Result<Project, AppError> {
        let project = self
            .store
            .write(|db| db.insert_project(data.name, data.client, user))?;
        tracing::info!(user_id = user, project_id = project.id, "created project");
        Ok(project)
    }

    pub fn update_project(
        &self,
        user: UserId,
        id: ProjectId,
        data: ProjectData,
    ) -> Result<Project, AppError> {
        let updated = self.store.write(|db| {
            authorize(user, db.project(id))?;
            let project = db.project_mut(id).ok_or(AppError::NotFound)?;
            project.name = data.name;
            project.client = data.client;
            Ok::<_, AppError>(project.clone())
        })??;
        tracing::info!(user_id = user, project_id = id, "updated project");
        Ok(updated)
    }

    /// Project choices for the entry form, labelled `<client> name`.
    pub fn project_choices(&self, user: UserId) -> Vec<(Project, String)> {
        self.store.read(|db| {
            owned_by(&db.projects, user)
                .into_iter()
                .map(|project| {
                    let client = project.client.and_then(|id| db.client(id));
                    (project.clone(), project.label(client))
                })
                .collect()
        })
    }

    pub fn entry_listing(&self, user: UserId, now: DateTime<Utc>) -> Vec<EntryRow> {
        self.store.read(|db| {
            owned_by(&db.entries, user)
                .into_iter()
                .map(|entry| EntryRow {
                    entry: entry.clone(),
                    project_name: db
                        .project(entry.project)
                        .map(|project| project.name.clone())
                        .unwrap_or_default(),
                    duration: entry.duration_at(now),
                })
                .collect()
        })
    }

    pub fn create_entry(&self, user: UserId, data: EntryData) -> Result<Entry, AppError> {
        let entry = self.store.write(|db| {
            db.insert_entry(data.start, data.stop, data.project, data.description, user)
        })?;
        tracing::info!(
            user_id = user,
            entry_id = entry.id,
            project_id = entry.project,
            "created entry"
        );
        Ok(entry)
    }
}
