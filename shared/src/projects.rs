//! Named project saves, one list per owner.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::project_file::ProjectFile;
use crate::store::{load_json, projects_key, save_json, KeyValueStore, StoreError};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProjectError {
    #[error("give the project a name")]
    EmptyName,
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Owner {
    Anonymous,
    User(String),
}

impl Owner {
    pub fn from_user(user: Option<String>) -> Self {
        user.map_or(Owner::Anonymous, Owner::User)
    }

    fn key(&self) -> String {
        match self {
            Owner::Anonymous => projects_key(None),
            Owner::User(username) => projects_key(Some(username)),
        }
    }
}

pub fn unreadable_key(key: &str) -> String {
    format!("{key}:unreadable")
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    /// Milliseconds since the Unix epoch.
    pub saved_at: u64,
    pub total_sq_ft: f64,
    pub selection_count: usize,
    pub full_state: ProjectFile,
}

pub struct ProjectStore<'a> {
    store: &'a mut dyn KeyValueStore,
}

impl<'a> ProjectStore<'a> {
    pub fn new(store: &'a mut dyn KeyValueStore) -> Self {
        Self { store }
    }

    fn read(&self, owner: &Owner) -> Vec<Project> {
        load_json(&*self.store, &owner.key()).unwrap_or_else(|| {
            if self.store.get(&owner.key()).is_some() {
                warn!(key = %owner.key(), "project list unreadable, showing none");
            }
            Vec::new()
        })
    }

    /// Reads the list that a write is about to replace. An unreadable value is
    /// copied to `<key>:unreadable` first so it can still be recovered.
    fn read_for_write(&mut self, owner: &Owner) -> Result<Vec<Project>, ProjectError> {
        let key = owner.key();
        let Some(raw) = self.store.get(&key) else {
            return Ok(Vec::new());
        };
        match serde_json::from_str(&raw) {
            Ok(projects) => Ok(projects),
            Err(error) => {
                let backup = unreadable_key(&key);
                warn!(%key, %backup, %error, "project list unreadable, keeping a copy before overwriting");
                self.store.set(&backup, &raw)?;
                Ok(Vec::new())
            }
        }
    }

    /// Newest first.
    pub fn list(&self, owner: &Owner) -> Vec<Project> {
        let mut projects = self.read(owner);
        projects.sort_by(|a, b| b.saved_at.cmp(&a.saved_at));
        projects
    }

    /// Saves `state` under `name`, replacing any project with the same name.
    /// When the store refuses the write nothing changes.
    pub fn save(
        &mut self,
        owner: &Owner,
        name: &str,
        state: ProjectFile,
        now_ms: u64,
    ) -> Result<Project, ProjectError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ProjectError::EmptyName);
        }
        let mut projects = self.read_for_write(owner)?;
        let existing = projects
            .iter()
            .position(|project| project.name.eq_ignore_ascii_case(name));
        let id = existing
            .map(|index| projects[index].id.clone())
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let project = Project {
            id,
            name: name.to_string(),
            saved_at: now_ms,
            total_sq_ft: state.snapshot.total_sq_ft,
            selection_count: state.selections.len(),
            full_state: state,
        };
        match existing {
            Some(index) => projects[index] = project.clone(),
            None => projects.push(project.clone()),
        }
        save_json(&mut *self.store, &owner.key(), &projects)?;
        info!(id = %project.id, name = %project.name, "project saved");
        Ok(project)
    }

    pub fn load(&self, owner: &Owner, id: &str) -> Option<Project> {
        self.read(owner).into_iter().find(|project| project.id == id)
    }

    /// Returns whether a project was removed.
    pub fn delete(&mut self, owner: &Owner, id: &str) -> Result<bool, ProjectError> {
        let mut projects = self.read_for_write(owner)?;
        let before = projects.len();
        projects.retain(|project| project.id != id);
        if projects.len() == before {
            return Ok(false);
        }
        save_json(&mut *self.store, &owner.key(), &projects)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::{Ledger, Mode};

    fn state() -> ProjectFile {
        Ledger::new().export_state(Mode::Rect, None).file
    }

    #[test]
    fn list_is_newest_first() {
        let mut store = MemoryStore::new();
        let mut projects = ProjectStore::new(&mut store);
        let owner = Owner::User("ana".into());
        projects.save(&owner, "First", state(), 10).unwrap();
        projects.save(&owner, "Second", state(), 20).unwrap();
        let names: Vec<_> = projects.list(&owner).into_iter().map(|p| p.name).collect();
        assert_eq!(names, ["Second", "First"]);
        assert!(projects.list(&Owner::Anonymous).is_empty());
    }

    #[test]
    fn saving_same_name_overwrites() {
        let mut store = MemoryStore::new();
        let mut projects = ProjectStore::new(&mut store);
        let owner = Owner::Anonymous;
        let first = projects.save(&owner, "Kitchen", state(), 10).unwrap();
        let second = projects.save(&owner, " kitchen ", state(), 30).unwrap();
        assert_eq!(first.id, second.id);
        let listed = projects.list(&owner);
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].saved_at, 30);
    }

    #[test]
    fn corrupt_list_reads_as_empty() {
        let mut store = MemoryStore::new();
        store.set("bpe:projects:anonymous", "[{").unwrap();
        let projects = ProjectStore::new(&mut store);
        assert!(projects.list(&Owner::Anonymous).is_empty());
    }

    #[test]
    fn saving_over_corrupt_list_keeps_a_copy() {
        let mut store = MemoryStore::new();
        let owner = Owner::User("cy".into());
        store.set("bpe:projects:cy", "[{\"id\":").unwrap();
        {
            let mut projects = ProjectStore::new(&mut store);
            projects.save(&owner, "Porch", state(), 7).unwrap();
            assert_eq!(projects.list(&owner).len(), 1);
        }
        assert_eq!(
            store.get(&unreadable_key("bpe:projects:cy")).as_deref(),
            Some("[{\"id\":")
        );
    }

    #[test]
    fn quota_failure_keeps_previous_list() {
        let mut store = MemoryStore::with_quota(1_000);
        let owner = Owner::Anonymous;
        {
            let mut projects = ProjectStore::new(&mut store);
            projects.save(&owner, "Small", state(), 1).unwrap();
            let error = projects
                .save(&owner, &"n".repeat(2_000), state(), 2)
                .unwrap_err();
            assert_eq!(error, ProjectError::Store(StoreError::QuotaExceeded));
        }
        let projects = ProjectStore::new(&mut store);
        assert_eq!(projects.list(&owner).len(), 1);
    }

    #[test]
    fn delete_and_load() {
        let mut store = MemoryStore::new();
        let mut projects = ProjectStore::new(&mut store);
        let owner = Owner::User("bo".into());
        let saved = projects.save(&owner, "Hall", state(), 5).unwrap();
        assert_eq!(projects.load(&owner, &saved.id), Some(saved.clone()));
        assert_eq!(projects.delete(&owner, &saved.id), Ok(true));
        assert_eq!(projects.delete(&owner, &saved.id), Ok(false));
        assert_eq!(projects.load(&owner, &saved.id), None);
        assert_eq!(projects.save(&owner, "  ", state(), 6), Err(ProjectError::EmptyName));
    }
}
