//! Registry of target surfaces.

use std::sync::Arc;

use dashmap::DashMap;
use retrace_player::SurfaceDirectory;
use retrace_protocols::TargetSurface;

use crate::error::CoreError;

/// Surfaces available for recording and playback, keyed by ID.
#[derive(Default)]
pub struct SurfaceRegistry {
    surfaces: DashMap<String, Arc<dyn TargetSurface>>,
}

impl SurfaceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a surface under its own ID.
    pub fn register(&self, surface: Arc<dyn TargetSurface>) -> Result<(), CoreError> {
        let id = surface.id().to_string();
        if self.surfaces.contains_key(&id) {
            return Err(CoreError::SurfaceExists(id));
        }
        self.surfaces.insert(id, surface);
        Ok(())
    }

    pub fn unregister(&self, id: &str) -> Result<Arc<dyn TargetSurface>, CoreError> {
        self.surfaces
            .remove(id)
            .map(|(_, surface)| surface)
            .ok_or_else(|| CoreError::UnknownSurface(id.to_string()))
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn TargetSurface>> {
        self.surfaces.get(id).map(|s| s.clone())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.surfaces.contains_key(id)
    }

    /// Registered IDs, sorted.
    pub fn list_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.surfaces.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }
}

impl SurfaceDirectory for SurfaceRegistry {
    fn surface(&self, id: &str) -> Option<Arc<dyn TargetSurface>> {
        self.get(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_surface::MemorySurface;

    #[test]
    fn test_register_and_get() {
        let registry = SurfaceRegistry::new();
        assert!(registry.is_empty());

        registry
            .register(Arc::new(MemorySurface::blank("tab-2")))
            .unwrap();
        registry
            .register(Arc::new(MemorySurface::blank("tab-1")))
            .unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.list_ids(), vec!["tab-1", "tab-2"]);
        assert_eq!(registry.get("tab-1").unwrap().id(), "tab-1");
        assert!(registry.surface("tab-3").is_none());
    }

    #[test]
    fn test_duplicate_and_unregister() {
        let registry = SurfaceRegistry::new();
        registry
            .register(Arc::new(MemorySurface::blank("tab-1")))
            .unwrap();
        assert!(matches!(
            registry.register(Arc::new(MemorySurface::blank("tab-1"))),
            Err(CoreError::SurfaceExists(_))
        ));

        registry.unregister("tab-1").unwrap();
        assert!(!registry.contains("tab-1"));
        assert!(matches!(
            registry.unregister("tab-1"),
            Err(CoreError::UnknownSurface(_))
        ));
    }
}
