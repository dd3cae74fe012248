//! Entity browser: read-side view of a project's extracted entities

use crate::model::{Entity, EntityId, EntityType, ProjectId};
use crate::service::{EntityStore, ServiceResult};
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Fetches a project's entities and serves lookups by id
pub struct EntityBrowser {
    store: Arc<dyn EntityStore>,
    project_id: ProjectId,
    cache: DashMap<EntityId, Entity>,
}

impl EntityBrowser {
    pub fn new(store: Arc<dyn EntityStore>, project_id: ProjectId) -> Self {
        Self {
            store,
            project_id,
            cache: DashMap::new(),
        }
    }

    pub fn project_id(&self) -> &ProjectId {
        &self.project_id
    }

    /// Fetch the project's entities, optionally of one type.
    ///
    /// Results are cached for `entity()` lookups.
    pub async fn list(&self, entity_type: Option<EntityType>) -> ServiceResult<Vec<Entity>> {
        let entities = self
            .store
            .list_entities(&self.project_id, entity_type)
            .await?;
        debug!(project = %self.project_id, ?entity_type, count = entities.len(), "entities fetched");
        for entity in &entities {
            self.cache.insert(entity.id.clone(), entity.clone());
        }
        Ok(entities)
    }

    /// Look up one entity, from cache when it was listed before.
    pub async fn entity(&self, id: &EntityId) -> ServiceResult<Entity> {
        if let Some(hit) = self.cache.get(id) {
            return Ok(hit.value().clone());
        }
        let entity = self.store.get_entity(id).await?;
        self.cache.insert(entity.id.clone(), entity.clone());
        Ok(entity)
    }

    /// Forget cached entities, e.g. after a new analysis completed.
    pub fn invalidate(&self) {
        self.cache.clear();
    }

    pub fn cached_count(&self) -> usize {
        self.cache.len()
    }
}

/// Group entities by type, preserving their order within each group
pub fn group_by_type(entities: &[Entity]) -> BTreeMap<EntityType, Vec<&Entity>> {
    let mut groups: BTreeMap<EntityType, Vec<&Entity>> = BTreeMap::new();
    for entity in entities {
        groups.entry(entity.entity_type).or_default().push(entity);
    }
    groups
}
