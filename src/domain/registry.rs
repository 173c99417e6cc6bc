//! Capability registry.
//!
//! Catalogs every unit once at start-up and answers lookups by unit name,
//! capability id, category and priority. Registration rejects conflicts;
//! nothing is ever overwritten. After construction the registry is shared
//! behind an `Arc` and only read.

use crate::domain::capability::{CapabilityMetadata, Category, Priority};
use crate::domain::error::RegistryError;
use crate::domain::unit::Unit;
use crate::domain::units::default_units;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

#[derive(Default)]
pub struct Registry {
    units: Vec<Arc<dyn Unit>>,
    by_name: HashMap<String, usize>,
    by_capability: HashMap<String, usize>,
    metadata: HashMap<String, CapabilityMetadata>,
    /// Capability ids per unit, parallel to `units`.
    capabilities: Vec<Vec<String>>,
    by_category: BTreeMap<Category, Vec<usize>>,
    by_priority: BTreeMap<Priority, Vec<String>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in library in its fixed registration order.
    pub fn with_default_units() -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for unit in default_units() {
            registry.register(unit)?;
        }
        Ok(registry)
    }

    pub fn register(&mut self, unit: Box<dyn Unit>) -> Result<(), RegistryError> {
        let name = unit.name().to_string();
        if self.by_name.contains_key(&name) {
            return Err(RegistryError::DuplicateName { name });
        }
        let caps = unit.capabilities();
        for (i, cap) in caps.iter().enumerate() {
            if let Some(&existing) = self.by_capability.get(&cap.id) {
                return Err(RegistryError::DuplicateCapability {
                    id: cap.id.clone(),
                    existing: self.units[existing].name().to_string(),
                });
            }
            if caps[..i].iter().any(|c| c.id == cap.id) {
                return Err(RegistryError::DuplicateCapability {
                    id: cap.id.clone(),
                    existing: name,
                });
            }
        }

        let index = self.units.len();
        self.by_name.insert(name.clone(), index);
        self.by_category
            .entry(unit.category())
            .or_default()
            .push(index);
        let mut ids = Vec::with_capacity(caps.len());
        for cap in caps {
            self.by_capability.insert(cap.id.clone(), index);
            self.by_priority
                .entry(cap.priority)
                .or_default()
                .push(cap.id.clone());
            ids.push(cap.id.clone());
            self.metadata.insert(cap.id.clone(), cap);
        }
        tracing::debug!(unit = %name, capabilities = ids.len(), "registered unit");
        self.capabilities.push(ids);
        self.units.push(Arc::from(unit));
        Ok(())
    }

    pub fn unit(&self, name: &str) -> Option<&Arc<dyn Unit>> {
        self.by_name.get(name).map(|&i| &self.units[i])
    }

    pub fn unit_for_capability(&self, id: &str) -> Option<&Arc<dyn Unit>> {
        self.by_capability.get(id).map(|&i| &self.units[i])
    }

    pub fn metadata(&self, id: &str) -> Option<&CapabilityMetadata> {
        self.metadata.get(id)
    }

    pub fn by_category(&self, category: Category) -> Vec<&Arc<dyn Unit>> {
        self.by_category
            .get(&category)
            .map(|ix| ix.iter().map(|&i| &self.units[i]).collect())
            .unwrap_or_default()
    }

    /// Capabilities in one priority tier, in registration order.
    pub fn by_priority(&self, priority: Priority) -> Vec<&CapabilityMetadata> {
        self.by_priority
            .get(&priority)
            .map(|ids| ids.iter().filter_map(|id| self.metadata.get(id)).collect())
            .unwrap_or_default()
    }

    /// Every unit in registration order.
    pub fn all(&self) -> &[Arc<dyn Unit>] {
        &self.units
    }

    pub fn capability_ids(&self) -> Vec<&str> {
        self.capabilities
            .iter()
            .flatten()
            .map(String::as_str)
            .collect()
    }

    /// Metadata for each capability of the named unit.
    pub fn capabilities_of(&self, name: &str) -> Vec<&CapabilityMetadata> {
        self.by_name
            .get(name)
            .map(|&i| {
                self.capabilities[i]
                    .iter()
                    .filter_map(|id| self.metadata.get(id))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("units", &self.units.len())
            .field("capabilities", &self.metadata.len())
            .finish()
    }
}
