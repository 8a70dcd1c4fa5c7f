//! In-memory registry store for tests/dev.
//!
//! One lock guards things, projects and edges together, so every batch and
//! cascade is applied atomically.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use conduit_core::{Error, Metadata, Result, metadata};

use crate::model::{Connection, Page, PageMetadata, Project, Thing};
use crate::repository::{ProjectRepository, ThingRepository};

type Owned = (String, String);

#[derive(Debug, Default)]
struct State {
    /// Keyed by `(owner, id)` so an owner's records are contiguous and sorted by ID.
    things: BTreeMap<Owned, Thing>,
    /// Thing key -> `(owner, id)`.
    keys: HashMap<String, Owned>,
    projects: BTreeMap<Owned, Project>,
    edges: BTreeSet<Connection>,
}

impl State {
    /// Edges between `project_id` and `thing_id`, whatever their owners.
    fn edges_between<'a>(
        &'a self,
        project_id: &'a str,
        thing_id: &'a str,
    ) -> impl Iterator<Item = &'a Connection> + 'a {
        let start = Connection {
            project_id: project_id.to_string(),
            thing_id: thing_id.to_string(),
            project_owner: String::new(),
            thing_owner: String::new(),
        };
        self.edges
            .range(start..)
            .take_while(move |c| c.project_id == project_id && c.thing_id == thing_id)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    state: RwLock<State>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|_| Error::storage("registry lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|_| Error::storage("registry lock poisoned"))
    }
}

fn owned(owner: &str, id: &str) -> Owned {
    (owner.to_string(), id.to_string())
}

fn name_matches(name: &str, filter: Option<&str>) -> bool {
    match filter {
        Some(f) if !f.is_empty() => name.to_lowercase().contains(&f.to_lowercase()),
        _ => true,
    }
}

fn metadata_matches(have: &Metadata, filter: Option<&Metadata>) -> bool {
    filter.is_none_or(|want| metadata::contains(have, want))
}

/// Apply the window to an ID-ordered iterator and record the total.
fn paginate<'a, T, I>(items: I, mut meta: PageMetadata) -> Page<T>
where
    T: Clone + 'a,
    I: Iterator<Item = &'a T>,
{
    let all: Vec<&T> = items.collect();
    meta.total = all.len() as u64;
    let items = all
        .into_iter()
        .skip(meta.offset as usize)
        .take(meta.limit as usize)
        .cloned()
        .collect();
    Page { meta, items }
}

#[async_trait]
impl ThingRepository for InMemoryRegistry {
    async fn save(&self, things: Vec<Thing>) -> Result<Vec<Thing>> {
        let mut st = self.write()?;

        let mut ids = HashSet::new();
        let mut keys = HashSet::new();
        for t in &things {
            let id = owned(&t.owner, &t.id);
            if st.things.contains_key(&id) || st.keys.contains_key(&t.key) {
                return Err(Error::Conflict);
            }
            if !ids.insert(id) || !keys.insert(t.key.as_str()) {
                return Err(Error::Conflict);
            }
        }

        for t in &things {
            st.keys.insert(t.key.clone(), owned(&t.owner, &t.id));
            st.things.insert(owned(&t.owner, &t.id), t.clone());
        }

        Ok(things)
    }

    async fn update(&self, thing: Thing) -> Result<()> {
        let mut st = self.write()?;
        let stored = st
            .things
            .get_mut(&owned(&thing.owner, &thing.id))
            .ok_or(Error::NotFound)?;
        stored.name = thing.name;
        stored.metadata = thing.metadata;
        Ok(())
    }

    async fn update_key(&self, owner: &str, id: &str, key: &str) -> Result<()> {
        let mut st = self.write()?;
        let id = owned(owner, id);

        let old = st.things.get(&id).map(|t| t.key.clone()).ok_or(Error::NotFound)?;
        if old == key {
            return Ok(());
        }
        if st.keys.contains_key(key) {
            return Err(Error::Conflict);
        }

        st.keys.remove(&old);
        st.keys.insert(key.to_string(), id.clone());
        if let Some(t) = st.things.get_mut(&id) {
            t.key = key.to_string();
        }
        Ok(())
    }

    async fn retrieve_by_id(&self, owner: &str, id: &str) -> Result<Thing> {
        let st = self.read()?;
        st.things.get(&owned(owner, id)).cloned().ok_or(Error::NotFound)
    }

    async fn retrieve_by_key(&self, key: &str) -> Result<String> {
        let st = self.read()?;
        st.keys
            .get(key)
            .map(|(_, id)| id.clone())
            .ok_or(Error::NotFound)
    }

    async fn retrieve_all(&self, owner: &str, page: PageMetadata) -> Result<Page<Thing>> {
        let st = self.read()?;
        let name = page.name.clone();
        let meta = page.metadata.clone();
        let items = st
            .things
            .range(owned(owner, "")..)
            .take_while(|((o, _), _)| o == owner)
            .map(|(_, t)| t)
            .filter(|t| name_matches(&t.name, name.as_deref()))
            .filter(|t| metadata_matches(&t.metadata, meta.as_ref()));
        Ok(paginate(items, page))
    }

    async fn retrieve_by_project(
        &self,
        owner: &str,
        project: &str,
        page: PageMetadata,
    ) -> Result<Page<Thing>> {
        let st = self.read()?;
        if !st.projects.contains_key(&owned(owner, project)) {
            return Err(Error::NotFound);
        }

        let items = st
            .edges
            .iter()
            .filter(|c| c.project_id == project && c.project_owner == owner && c.thing_owner == owner)
            .filter_map(|c| st.things.get(&owned(&c.thing_owner, &c.thing_id)));
        Ok(paginate(items, page))
    }

    async fn remove(&self, owner: &str, id: &str) -> Result<()> {
        let mut st = self.write()?;
        if let Some(t) = st.things.remove(&owned(owner, id)) {
            st.keys.remove(&t.key);
            st.edges.retain(|c| !(c.thing_id == id && c.thing_owner == owner));
        }
        Ok(())
    }
}

#[async_trait]
impl ProjectRepository for InMemoryRegistry {
    async fn save(&self, projects: Vec<Project>) -> Result<Vec<Project>> {
        let mut st = self.write()?;

        let mut ids = HashSet::new();
        for p in &projects {
            let id = owned(&p.owner, &p.id);
            if st.projects.contains_key(&id) || !ids.insert(id) {
                return Err(Error::Conflict);
            }
        }

        for p in &projects {
            st.projects.insert(owned(&p.owner, &p.id), p.clone());
        }

        Ok(projects)
    }

    async fn update(&self, project: Project) -> Result<()> {
        let mut st = self.write()?;
        let stored = st
            .projects
            .get_mut(&owned(&project.owner, &project.id))
            .ok_or(Error::NotFound)?;
        stored.name = project.name;
        stored.metadata = project.metadata;
        Ok(())
    }

    async fn retrieve_by_id(&self, owner: &str, id: &str) -> Result<Project> {
        let st = self.read()?;
        st.projects.get(&owned(owner, id)).cloned().ok_or(Error::NotFound)
    }

    async fn retrieve_all(&self, owner: &str, page: PageMetadata) -> Result<Page<Project>> {
        let st = self.read()?;
        let name = page.name.clone();
        let meta = page.metadata.clone();
        let items = st
            .projects
            .range(owned(owner, "")..)
            .take_while(|((o, _), _)| o == owner)
            .map(|(_, p)| p)
            .filter(|p| name_matches(&p.name, name.as_deref()))
            .filter(|p| metadata_matches(&p.metadata, meta.as_ref()));
        Ok(paginate(items, page))
    }

    async fn retrieve_by_thing(
        &self,
        owner: &str,
        thing: &str,
        page: PageMetadata,
    ) -> Result<Page<Project>> {
        let st = self.read()?;
        if !st.things.contains_key(&owned(owner, thing)) {
            return Err(Error::NotFound);
        }

        let connected: BTreeMap<&str, &Project> = st
            .edges
            .iter()
            .filter(|c| c.thing_id == thing && c.thing_owner == owner && c.project_owner == owner)
            .filter_map(|c| {
                st.projects
                    .get(&owned(&c.project_owner, &c.project_id))
                    .map(|p| (p.id.as_str(), p))
            })
            .collect();
        Ok(paginate(connected.into_values(), page))
    }

    async fn remove(&self, owner: &str, id: &str) -> Result<()> {
        let mut st = self.write()?;
        if st.projects.remove(&owned(owner, id)).is_some() {
            st.edges.retain(|c| !(c.project_id == id && c.project_owner == owner));
        }
        Ok(())
    }

    async fn connect(&self, owner: &str, project_ids: &[String], thing_ids: &[String]) -> Result<()> {
        let mut st = self.write()?;

        if project_ids.iter().any(|p| !st.projects.contains_key(&owned(owner, p)))
            || thing_ids.iter().any(|t| !st.things.contains_key(&owned(owner, t)))
        {
            return Err(Error::NotFound);
        }

        let mut pending = BTreeSet::new();
        for p in project_ids {
            for t in thing_ids {
                let edge = Connection::owned_by(owner, p, t);
                if st.edges.contains(&edge) || !pending.insert(edge) {
                    return Err(Error::Conflict);
                }
            }
        }

        st.edges.append(&mut pending);
        Ok(())
    }

    async fn disconnect(&self, owner: &str, project_id: &str, thing_id: &str) -> Result<()> {
        let mut st = self.write()?;
        if st.edges.remove(&Connection::owned_by(owner, project_id, thing_id)) {
            Ok(())
        } else {
            Err(Error::NotFound)
        }
    }

    async fn has_thing(&self, project_id: &str, key: &str) -> Result<String> {
        let st = self.read()?;
        let (owner, id) = st.keys.get(key).ok_or(Error::NotFound)?;
        st.edges_between(project_id, id)
            .find(|c| &c.thing_owner == owner)
            .map(|c| c.thing_id.clone())
            .ok_or(Error::NotFound)
    }

    async fn has_thing_by_id(&self, project_id: &str, thing_id: &str) -> Result<()> {
        let st = self.read()?;
        st.edges_between(project_id, thing_id)
            .next()
            .map(|_| ())
            .ok_or(Error::NotFound)
    }
}
