//! Registry service.
//!
//! User-facing operations take the caller's token and resolve the owner via
//! the identity service before touching storage. Access checks take no token:
//! they are predicates over the current edge set.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, warn};

use conduit_authn::AuthnClient;
use conduit_core::{Error, IdProvider, Result};

use crate::model::{Page, PageMetadata, Project, Thing};
use crate::repository::{ProjectRepository, ThingRepository};

/// Longest accepted thing or project name, in bytes.
pub const MAX_NAME_SIZE: usize = 1024;

/// Largest accepted listing page.
pub const MAX_LIMIT: u64 = 100;

pub struct ThingsService {
    authn: Arc<dyn AuthnClient>,
    things: Arc<dyn ThingRepository>,
    projects: Arc<dyn ProjectRepository>,
    idp: Arc<dyn IdProvider>,
}

impl ThingsService {
    pub fn new(
        authn: Arc<dyn AuthnClient>,
        things: Arc<dyn ThingRepository>,
        projects: Arc<dyn ProjectRepository>,
        idp: Arc<dyn IdProvider>,
    ) -> Self {
        Self {
            authn,
            things,
            projects,
            idp,
        }
    }

    /// Resolve the caller. Denials collapse to `Unauthorized`; transport
    /// failures stay `Rpc`.
    async fn owner(&self, token: &str) -> Result<String> {
        if token.is_empty() {
            return Err(Error::Unauthorized);
        }
        self.authn.identify(token).await.map_err(|e| {
            if e.is_denial() { Error::Unauthorized } else { e }
        })
    }

    pub async fn create_things(&self, token: &str, things: Vec<Thing>) -> Result<Vec<Thing>> {
        logged("create_things", async {
            if things.is_empty() {
                return Err(Error::malformed("empty batch"));
            }
            things.iter().try_for_each(|t| validate_name(&t.name))?;

            let owner = self.owner(token).await?;

            let mut things = things;
            for t in &mut things {
                t.id = self.idp.id()?;
                t.owner = owner.clone();
                if t.key.is_empty() {
                    t.key = self.idp.key()?;
                }
            }

            self.things.save(things).await
        })
        .await
    }

    /// Replace name and metadata of one of the caller's things.
    pub async fn update_thing(&self, token: &str, thing: Thing) -> Result<()> {
        logged("update_thing", async {
            validate_id(&thing.id)?;
            validate_name(&thing.name)?;

            let owner = self.owner(token).await?;
            self.things.update(Thing { owner, ..thing }).await
        })
        .await
    }

    /// Rotate a thing's bearer key.
    pub async fn update_key(&self, token: &str, id: &str, key: &str) -> Result<()> {
        logged("update_key", async {
            validate_id(id)?;
            if key.is_empty() {
                return Err(Error::malformed("empty key"));
            }

            let owner = self.owner(token).await?;
            self.things.update_key(&owner, id, key).await
        })
        .await
    }

    pub async fn view_thing(&self, token: &str, id: &str) -> Result<Thing> {
        logged("view_thing", async {
            validate_id(id)?;
            let owner = self.owner(token).await?;
            self.things.retrieve_by_id(&owner, id).await
        })
        .await
    }

    pub async fn list_things(&self, token: &str, page: PageMetadata) -> Result<Page<Thing>> {
        logged("list_things", async {
            validate_page(&page)?;
            let owner = self.owner(token).await?;
            self.things.retrieve_all(&owner, page).await
        })
        .await
    }

    pub async fn list_things_by_project(
        &self,
        token: &str,
        project: &str,
        page: PageMetadata,
    ) -> Result<Page<Thing>> {
        logged("list_things_by_project", async {
            validate_id(project)?;
            validate_page(&page)?;
            let owner = self.owner(token).await?;
            self.things.retrieve_by_project(&owner, project, page).await
        })
        .await
    }

    /// Remove a thing and every edge touching it.
    pub async fn remove_thing(&self, token: &str, id: &str) -> Result<()> {
        logged("remove_thing", async {
            validate_id(id)?;
            let owner = self.owner(token).await?;
            self.things.remove(&owner, id).await
        })
        .await
    }

    pub async fn create_projects(&self, token: &str, projects: Vec<Project>) -> Result<Vec<Project>> {
        logged("create_projects", async {
            if projects.is_empty() {
                return Err(Error::malformed("empty batch"));
            }
            projects.iter().try_for_each(|p| validate_name(&p.name))?;

            let owner = self.owner(token).await?;

            let mut projects = projects;
            for p in &mut projects {
                p.id = self.idp.id()?;
                p.owner = owner.clone();
            }

            self.projects.save(projects).await
        })
        .await
    }

    pub async fn update_project(&self, token: &str, project: Project) -> Result<()> {
        logged("update_project", async {
            validate_id(&project.id)?;
            validate_name(&project.name)?;

            let owner = self.owner(token).await?;
            self.projects.update(Project { owner, ..project }).await
        })
        .await
    }

    pub async fn view_project(&self, token: &str, id: &str) -> Result<Project> {
        logged("view_project", async {
            validate_id(id)?;
            let owner = self.owner(token).await?;
            self.projects.retrieve_by_id(&owner, id).await
        })
        .await
    }

    pub async fn list_projects(&self, token: &str, page: PageMetadata) -> Result<Page<Project>> {
        logged("list_projects", async {
            validate_page(&page)?;
            let owner = self.owner(token).await?;
            self.projects.retrieve_all(&owner, page).await
        })
        .await
    }

    pub async fn list_projects_by_thing(
        &self,
        token: &str,
        thing: &str,
        page: PageMetadata,
    ) -> Result<Page<Project>> {
        logged("list_projects_by_thing", async {
            validate_id(thing)?;
            validate_page(&page)?;
            let owner = self.owner(token).await?;
            self.projects.retrieve_by_thing(&owner, thing, page).await
        })
        .await
    }

    pub async fn remove_project(&self, token: &str, id: &str) -> Result<()> {
        logged("remove_project", async {
            validate_id(id)?;
            let owner = self.owner(token).await?;
            self.projects.remove(&owner, id).await
        })
        .await
    }

    /// Connect every listed project to every listed thing.
    pub async fn connect(&self, token: &str, project_ids: &[String], thing_ids: &[String]) -> Result<()> {
        logged("connect", async {
            if project_ids.is_empty() || thing_ids.is_empty() {
                return Err(Error::malformed("connect needs at least one project and one thing"));
            }
            project_ids.iter().chain(thing_ids).try_for_each(|id| validate_id(id))?;

            let owner = self.owner(token).await?;
            self.projects.connect(&owner, project_ids, thing_ids).await
        })
        .await
    }

    pub async fn disconnect(&self, token: &str, project_id: &str, thing_id: &str) -> Result<()> {
        logged("disconnect", async {
            validate_id(project_id)?;
            validate_id(thing_id)?;
            let owner = self.owner(token).await?;
            self.projects.disconnect(&owner, project_id, thing_id).await
        })
        .await
    }

    /// ID of the thing holding `key`, if it is connected to `project_id`.
    ///
    /// Runs once per message: no identity call, no side effects.
    pub async fn can_access_by_key(&self, project_id: &str, key: &str) -> Result<String> {
        self.projects
            .has_thing(project_id, key)
            .await
            .map_err(deny_missing)
    }

    /// Succeeds if `thing_id` is connected to `project_id`.
    pub async fn can_access_by_id(&self, project_id: &str, thing_id: &str) -> Result<()> {
        self.projects
            .has_thing_by_id(project_id, thing_id)
            .await
            .map_err(deny_missing)
    }

    /// Thing ID for a thing key, without any edge check.
    pub async fn identify(&self, key: &str) -> Result<String> {
        self.things.retrieve_by_key(key).await.map_err(deny_missing)
    }
}

/// A missing record on an access path is a denial. Storage failures pass
/// through so they are not mistaken for one.
fn deny_missing(e: Error) -> Error {
    match e {
        Error::NotFound => Error::Unauthorized,
        other => other,
    }
}

async fn logged<T, F>(op: &'static str, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let started = Instant::now();
    let res = fut.await;
    let elapsed_us = started.elapsed().as_micros() as u64;
    match &res {
        Ok(_) => debug!(op, elapsed_us, "registry operation completed"),
        Err(e) if e.is_malformed() || e.is_denial() => {
            debug!(op, elapsed_us, error = %e, "registry operation rejected")
        }
        Err(e) => warn!(op, elapsed_us, error = %e, "registry operation failed"),
    }
    res
}

fn validate_name(name: &str) -> Result<()> {
    if name.len() > MAX_NAME_SIZE {
        return Err(Error::malformed(format!(
            "name longer than {MAX_NAME_SIZE} bytes"
        )));
    }
    Ok(())
}

fn validate_id(id: &str) -> Result<()> {
    if id.is_empty() {
        return Err(Error::malformed("empty id"));
    }
    Ok(())
}

fn validate_page(page: &PageMetadata) -> Result<()> {
    if page.limit == 0 || page.limit > MAX_LIMIT {
        return Err(Error::malformed(format!("limit must be within 1..={MAX_LIMIT}")));
    }
    page.name.as_deref().map_or(Ok(()), validate_name)
}
