use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::types::{
    CaseSpec, Category, Component, CoolerSpec, CpuSpec, GpuSpec, MotherboardSpec, PartSpec,
    PsuSpec, RamSpec,
};
use crate::catalog::CatalogClient;
use crate::error::{EngineError, EngineResult};

/// The parts currently selected in one build session.
///
/// Values are immutable: every mutation returns a new `BuildState` that
/// shares unchanged components with the original through `Arc`.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildState {
    parts: BTreeMap<Category, Arc<Component>>,
    ram_quantity: u32,
    storage: Vec<Arc<Component>>,
}

impl Default for BuildState {
    fn default() -> Self {
        Self::new()
    }
}

macro_rules! typed_part {
    ($name:ident, $category:ident, $spec:ty) => {
        pub fn $name(&self) -> Option<(&Component, &$spec)> {
            let component = self.parts.get(&Category::$category)?;
            match &component.spec {
                PartSpec::$category(spec) => Some((component.as_ref(), spec)),
                _ => None,
            }
        }
    };
}

impl BuildState {
    /// An empty build with a RAM quantity of one kit.
    pub fn new() -> Self {
        Self {
            parts: BTreeMap::new(),
            ram_quantity: 1,
            storage: Vec::new(),
        }
    }

    /// Select a single-slot component, replacing whatever held its category.
    /// Storage is multi-valued and goes through `add_storage` instead.
    pub fn select(&self, component: impl Into<Arc<Component>>) -> EngineResult<Self> {
        let component = component.into();
        let category = component.category();
        if category == Category::Storage {
            return Err(EngineError::Configuration(format!(
                "Storage '{}' cannot be selected into a single slot; add it as a drive instead",
                component.id
            )));
        }
        let mut next = self.clone();
        next.parts.insert(category, component);
        Ok(next)
    }

    /// Remove a category from the build. For storage this clears every drive.
    pub fn deselect(&self, category: Category) -> Self {
        let mut next = self.clone();
        if category == Category::Storage {
            next.storage.clear();
        } else {
            next.parts.remove(&category);
        }
        next
    }

    /// Set how many identical RAM kits the build holds.
    pub fn with_ram_quantity(&self, quantity: u32) -> EngineResult<Self> {
        if quantity == 0 {
            return Err(EngineError::Configuration(
                "RAM quantity must be at least 1".to_string(),
            ));
        }
        let mut next = self.clone();
        next.ram_quantity = quantity;
        Ok(next)
    }

    pub fn add_storage(&self, component: impl Into<Arc<Component>>) -> EngineResult<Self> {
        let component = component.into();
        if component.category() != Category::Storage {
            return Err(EngineError::Configuration(format!(
                "Component '{}' is a {}, not a storage drive",
                component.id,
                component.category()
            )));
        }
        let mut next = self.clone();
        next.storage.push(component);
        Ok(next)
    }

    /// Remove the first drive with the given id.
    pub fn remove_storage(&self, id: &str) -> Self {
        let mut next = self.clone();
        if let Some(pos) = next.storage.iter().position(|c| c.id == id) {
            next.storage.remove(pos);
        }
        next
    }

    pub fn part(&self, category: Category) -> Option<&Component> {
        self.parts.get(&category).map(Arc::as_ref)
    }

    pub fn has(&self, category: Category) -> bool {
        match category {
            Category::Storage => !self.storage.is_empty(),
            other => self.parts.contains_key(&other),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty() && self.storage.is_empty()
    }

    /// Categories with at least one selected component.
    pub fn selected_categories(&self) -> Vec<Category> {
        Category::ALL.iter().copied().filter(|c| self.has(*c)).collect()
    }

    pub fn storage(&self) -> &[Arc<Component>] {
        &self.storage
    }

    pub fn ram_quantity(&self) -> u32 {
        self.ram_quantity
    }

    /// Total installed memory modules: modules per kit times kit count.
    pub fn ram_module_count(&self) -> Option<u32> {
        self.ram()
            .map(|(_, spec)| spec.modules.saturating_mul(self.ram_quantity))
    }

    typed_part!(cpu, Cpu, CpuSpec);
    typed_part!(motherboard, Motherboard, MotherboardSpec);
    typed_part!(ram, Ram, RamSpec);
    typed_part!(gpu, Gpu, GpuSpec);
    typed_part!(psu, Psu, PsuSpec);
    typed_part!(case, Case, CaseSpec);
    typed_part!(cooler, Cooler, CoolerSpec);

    /// Id-only wire form of this build.
    pub fn to_snapshot(&self) -> BuildSnapshot {
        BuildSnapshot {
            parts: self
                .parts
                .iter()
                .map(|(category, c)| (category.as_str().to_string(), c.id.clone()))
                .collect(),
            ram_quantity: self.ram_quantity,
            storage: self.storage.iter().map(|c| c.id.clone()).collect(),
        }
    }
}

/// Wire form of a build: category -> component id, RAM kit count, drives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildSnapshot {
    #[serde(default)]
    pub parts: BTreeMap<String, String>,
    #[serde(default = "default_ram_quantity")]
    pub ram_quantity: u32,
    #[serde(default)]
    pub storage: Vec<String>,
}

fn default_ram_quantity() -> u32 {
    1
}

impl Default for BuildSnapshot {
    fn default() -> Self {
        Self {
            parts: BTreeMap::new(),
            ram_quantity: 1,
            storage: Vec::new(),
        }
    }
}

impl BuildSnapshot {
    /// Parse and check the category keys of `parts`.
    ///
    /// Keys parse case-insensitively, so two spellings of one category are
    /// rejected rather than letting one silently win.
    pub fn slots(&self) -> EngineResult<Vec<(Category, &str)>> {
        let mut slots = Vec::with_capacity(self.parts.len());
        let mut seen = HashSet::new();
        for (key, id) in &self.parts {
            let category: Category = key.parse()?;
            if !seen.insert(category) {
                return Err(EngineError::Configuration(format!(
                    "Category '{}' appears more than once in parts (key '{}')",
                    category, key
                )));
            }
            if category == Category::Storage {
                return Err(EngineError::Configuration(
                    "Storage drives belong in 'storage', not 'parts'".to_string(),
                ));
            }
            if id.trim().is_empty() {
                return Err(EngineError::Configuration(format!(
                    "Empty component id for category '{}'",
                    category
                )));
            }
            slots.push((category, id.as_str()));
        }
        Ok(slots)
    }

    /// Every id the snapshot references, deduplicated and sorted.
    pub fn referenced_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .parts
            .values()
            .chain(self.storage.iter())
            .cloned()
            .collect();
        ids.sort();
        ids.dedup();
        ids
    }

    /// Resolve every referenced id through the catalog into a typed build.
    ///
    /// Unknown ids, components filed under the wrong category and a zero RAM
    /// quantity are configuration errors. Catalog failures surface as
    /// `CatalogUnavailable`.
    pub async fn hydrate<C: CatalogClient>(&self, catalog: &C) -> EngineResult<BuildState> {
        let slots = self.slots()?;
        let ids = self.referenced_ids();
        let mut build = BuildState::new().with_ram_quantity(self.ram_quantity)?;
        if ids.is_empty() {
            return Ok(build);
        }

        let fetched: HashMap<String, Arc<Component>> = catalog
            .fetch(&ids)
            .await?
            .into_iter()
            .map(|c| (c.id.clone(), Arc::new(c)))
            .collect();
        debug!("Hydrating build: {} ids requested, {} found", ids.len(), fetched.len());

        let lookup = |category: Category, id: &str| -> EngineResult<Arc<Component>> {
            let component = fetched.get(id).cloned().ok_or_else(|| {
                EngineError::Configuration(format!("Unknown component id '{}' for {}", id, category))
            })?;
            if component.category() != category {
                return Err(EngineError::Configuration(format!(
                    "Component '{}' is a {}, not a {}",
                    id,
                    component.category(),
                    category
                )));
            }
            Ok(component)
        };

        for (category, id) in slots {
            build = build.select(lookup(category, id)?)?;
        }
        for id in &self.storage {
            build = build.add_storage(lookup(Category::Storage, id)?)?;
        }
        Ok(build)
    }
}
