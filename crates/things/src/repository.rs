//! Persistence contracts for the registry.
//!
//! Implementations own transactional guarantees: batch saves and connects
//! are all-or-nothing.

use std::sync::Arc;

use async_trait::async_trait;

use conduit_core::Result;

use crate::model::{Page, PageMetadata, Project, Thing};

#[async_trait]
pub trait ThingRepository: Send + Sync {
    /// Persist a batch. `Conflict` on a duplicate ID or key; nothing is saved
    /// on failure.
    async fn save(&self, things: Vec<Thing>) -> Result<Vec<Thing>>;

    /// Replace name and metadata. `NotFound` if `(owner, id)` is absent.
    async fn update(&self, thing: Thing) -> Result<()>;

    /// Rotate the key. `Conflict` if another thing holds it.
    async fn update_key(&self, owner: &str, id: &str, key: &str) -> Result<()>;

    async fn retrieve_by_id(&self, owner: &str, id: &str) -> Result<Thing>;

    /// Thing ID holding `key`, across all owners.
    async fn retrieve_by_key(&self, key: &str) -> Result<String>;

    /// Things of `owner` ordered by ID, filtered and windowed by `page`.
    async fn retrieve_all(&self, owner: &str, page: PageMetadata) -> Result<Page<Thing>>;

    /// Things of `owner` connected to `project`. `NotFound` if the project is
    /// not `owner`'s.
    async fn retrieve_by_project(
        &self,
        owner: &str,
        project: &str,
        page: PageMetadata,
    ) -> Result<Page<Thing>>;

    /// Remove the thing and every edge touching it. Removing an absent thing
    /// is not an error.
    async fn remove(&self, owner: &str, id: &str) -> Result<()>;
}

#[async_trait]
pub trait ProjectRepository: Send + Sync {
    async fn save(&self, projects: Vec<Project>) -> Result<Vec<Project>>;

    async fn update(&self, project: Project) -> Result<()>;

    async fn retrieve_by_id(&self, owner: &str, id: &str) -> Result<Project>;

    async fn retrieve_all(&self, owner: &str, page: PageMetadata) -> Result<Page<Project>>;

    async fn retrieve_by_thing(
        &self,
        owner: &str,
        thing: &str,
        page: PageMetadata,
    ) -> Result<Page<Project>>;

    async fn remove(&self, owner: &str, id: &str) -> Result<()>;

    /// Connect every project to every thing. `NotFound` if any endpoint is
    /// not `owner`'s, `Conflict` if any edge exists; nothing is written on
    /// failure.
    async fn connect(&self, owner: &str, project_ids: &[String], thing_ids: &[String]) -> Result<()>;

    /// `NotFound` if the edge does not exist.
    async fn disconnect(&self, owner: &str, project_id: &str, thing_id: &str) -> Result<()>;

    /// ID of the thing holding `key`, if it is connected to `project_id`.
    async fn has_thing(&self, project_id: &str, key: &str) -> Result<String>;

    async fn has_thing_by_id(&self, project_id: &str, thing_id: &str) -> Result<()>;
}

#[async_trait]
impl<R> ThingRepository for Arc<R>
where
    R: ThingRepository + ?Sized,
{
    async fn save(&self, things: Vec<Thing>) -> Result<Vec<Thing>> {
        (**self).save(things).await
    }

    async fn update(&self, thing: Thing) -> Result<()> {
        (**self).update(thing).await
    }

    async fn update_key(&self, owner: &str, id: &str, key: &str) -> Result<()> {
        (**self).update_key(owner, id, key).await
    }

    async fn retrieve_by_id(&self, owner: &str, id: &str) -> Result<Thing> {
        (**self).retrieve_by_id(owner, id).await
    }

    async fn retrieve_by_key(&self, key: &str) -> Result<String> {
        (**self).retrieve_by_key(key).await
    }

    async fn retrieve_all(&self, owner: &str, page: PageMetadata) -> Result<Page<Thing>> {
        (**self).retrieve_all(owner, page).await
    }

    async fn retrieve_by_project(
        &self,
        owner: &str,
        project: &str,
        page: PageMetadata,
    ) -> Result<Page<Thing>> {
        (**self).retrieve_by_project(owner, project, page).await
    }

    async fn remove(&self, owner: &str, id: &str) -> Result<()> {
        (**self).remove(owner, id).await
    }
}

#[async_trait]
impl<R> ProjectRepository for Arc<R>
where
    R: ProjectRepository + ?Sized,
{
    async fn save(&self, projects: Vec<Project>) -> Result<Vec<Project>> {
        (**self).save(projects).await
    }

    async fn update(&self, project: Project) -> Result<()> {
        (**self).update(project).await
    }

    async fn retrieve_by_id(&self, owner: &str, id: &str) -> Result<Project> {
        (**self).retrieve_by_id(owner, id).await
    }

    async fn retrieve_all(&self, owner: &str, page: PageMetadata) -> Result<Page<Project>> {
        (**self).retrieve_all(owner, page).await
    }

    async fn retrieve_by_thing(
        &self,
        owner: &str,
        thing: &str,
        page: PageMetadata,
    ) -> Result<Page<Project>> {
        (**self).retrieve_by_thing(owner, thing, page).await
    }

    async fn remove(&self, owner: &str, id: &str) -> Result<()> {
        (**self).remove(owner, id).await
    }

    async fn connect(&self, owner: &str, project_ids: &[String], thing_ids: &[String]) -> Result<()> {
        (**self).connect(owner, project_ids, thing_ids).await
    }

    async fn disconnect(&self, owner: &str, project_id: &str, thing_id: &str) -> Result<()> {
        (**self).disconnect(owner, project_id, thing_id).await
    }

    async fn has_thing(&self, project_id: &str, key: &str) -> Result<String> {
        (**self).has_thing(project_id, key).await
    }

    async fn has_thing_by_id(&self, project_id: &str, thing_id: &str) -> Result<()> {
        (**self).has_thing_by_id(project_id, thing_id).await
    }
}
