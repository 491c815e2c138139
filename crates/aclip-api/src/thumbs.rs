//! In-memory thumbnail cache.
//!
//! Thumbnails are small and requested often by the project grid; they are
//! cached per `(project, clip)` and evicted as part of the project delete
//! cascade.

use std::collections::HashMap;
use std::sync::RwLock;

use aclip_models::ProjectId;

#[derive(Debug, Default)]
pub struct ThumbnailCache {
    entries: RwLock<HashMap<(ProjectId, String), Vec<u8>>>,
}

impl ThumbnailCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, project_id: &ProjectId, clip_id: &str) -> Option<Vec<u8>> {
        self.entries
            .read()
            .expect("thumbnail cache poisoned")
            .get(&(project_id.clone(), clip_id.to_string()))
            .cloned()
    }

    pub fn insert(&self, project_id: &ProjectId, clip_id: &str, bytes: Vec<u8>) {
        self.entries
            .write()
            .expect("thumbnail cache poisoned")
            .insert((project_id.clone(), clip_id.to_string()), bytes);
    }

    /// Drop one clip's thumbnail.
    pub fn evict_clip(&self, project_id: &ProjectId, clip_id: &str) {
        self.entries
            .write()
            .expect("thumbnail cache poisoned")
            .remove(&(project_id.clone(), clip_id.to_string()));
    }

    /// Drop every thumbnail of a project.
    pub fn evict_project(&self, project_id: &ProjectId) {
        self.entries
            .write()
            .expect("thumbnail cache poisoned")
            .retain(|(pid, _), _| pid != project_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_get_evict() {
        let cache = ThumbnailCache::new();
        let p1 = ProjectId::from_string("p1");
        let p2 = ProjectId::from_string("p2");

        cache.insert(&p1, "c1", vec![1]);
        cache.insert(&p1, "c2", vec![2]);
        cache.insert(&p2, "c1", vec![3]);

        assert_eq!(cache.get(&p1, "c1"), Some(vec![1]));

        cache.evict_clip(&p1, "c1");
        assert!(cache.get(&p1, "c1").is_none());
        assert!(cache.get(&p1, "c2").is_some());

        cache.evict_project(&p1);
        assert!(cache.get(&p1, "c2").is_none());
        assert_eq!(cache.get(&p2, "c1"), Some(vec![3]));
    }
}
