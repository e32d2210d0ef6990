//! Part and query types shared by the catalog clients, the build state and
//! the rule engine.
//!
//! Components arrive from the catalog as an attribute bag keyed by category
//! and are parsed once into a typed [`PartSpec`]. Everything downstream
//! pattern-matches on the variant instead of looking attributes up by name.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{EngineError, EngineResult};

// =============================================================================
// CATEGORIES
// =============================================================================

/// Closed set of component categories a build can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Cpu,
    Motherboard,
    Ram,
    Gpu,
    Psu,
    Case,
    Cooler,
    Storage,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::Cpu,
        Category::Motherboard,
        Category::Ram,
        Category::Gpu,
        Category::Psu,
        Category::Case,
        Category::Cooler,
        Category::Storage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Cpu => "cpu",
            Category::Motherboard => "motherboard",
            Category::Ram => "ram",
            Category::Gpu => "gpu",
            Category::Psu => "psu",
            Category::Case => "case",
            Category::Cooler => "cooler",
            Category::Storage => "storage",
        }
    }

    /// Human-facing name for messages.
    pub fn label(&self) -> &'static str {
        match self {
            Category::Cpu => "CPU",
            Category::Motherboard => "motherboard",
            Category::Ram => "RAM",
            Category::Gpu => "GPU",
            Category::Psu => "power supply",
            Category::Case => "case",
            Category::Cooler => "CPU cooler",
            Category::Storage => "storage drive",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = EngineError;

    /// Case-insensitive; unknown names are a configuration error, not a panic.
    fn from_str(s: &str) -> EngineResult<Self> {
        let needle = s.trim().to_ascii_lowercase();
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == needle)
            .ok_or_else(|| EngineError::Configuration(format!("Unknown component category '{}'", s)))
    }
}

// =============================================================================
// PER-CATEGORY ATTRIBUTES
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CpuSpec {
    pub socket: String,
    pub tdp_w: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotherboardSpec {
    pub socket: String,
    pub ram_type: String,
    pub form_factor: String,
    pub ram_slots: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RamSpec {
    pub ram_type: String,
    /// Modules per kit (a 2x16GB kit has 2).
    #[serde(default = "default_modules")]
    pub modules: u32,
}

fn default_modules() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpuSpec {
    pub length_mm: f64,
    pub tdp_w: f64,
    /// Vendor-recommended PSU wattage, when the catalog knows it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommended_psu_w: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PsuSpec {
    pub wattage_w: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseSpec {
    pub max_gpu_length_mm: f64,
    pub max_cooler_height_mm: f64,
    pub supported_form_factors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoolerSpec {
    pub height_mm: f64,
}

/// Storage drives carry no attributes the fit rules look at.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageSpec {}

/// Category-specific attributes, discriminated by category.
#[derive(Debug, Clone, PartialEq)]
pub enum PartSpec {
    Cpu(CpuSpec),
    Motherboard(MotherboardSpec),
    Ram(RamSpec),
    Gpu(GpuSpec),
    Psu(PsuSpec),
    Case(CaseSpec),
    Cooler(CoolerSpec),
    Storage(StorageSpec),
}

impl PartSpec {
    pub fn category(&self) -> Category {
        match self {
            PartSpec::Cpu(_) => Category::Cpu,
            PartSpec::Motherboard(_) => Category::Motherboard,
            PartSpec::Ram(_) => Category::Ram,
            PartSpec::Gpu(_) => Category::Gpu,
            PartSpec::Psu(_) => Category::Psu,
            PartSpec::Case(_) => Category::Case,
            PartSpec::Cooler(_) => Category::Cooler,
            PartSpec::Storage(_) => Category::Storage,
        }
    }

    /// Parse an attribute bag for the given category.
    pub fn from_attributes(category: Category, attributes: Map<String, Value>) -> Result<Self, serde_json::Error> {
        let bag = Value::Object(attributes);
        Ok(match category {
            Category::Cpu => PartSpec::Cpu(serde_json::from_value(bag)?),
            Category::Motherboard => PartSpec::Motherboard(serde_json::from_value(bag)?),
            Category::Ram => PartSpec::Ram(serde_json::from_value(bag)?),
            Category::Gpu => PartSpec::Gpu(serde_json::from_value(bag)?),
            Category::Psu => PartSpec::Psu(serde_json::from_value(bag)?),
            Category::Case => PartSpec::Case(serde_json::from_value(bag)?),
            Category::Cooler => PartSpec::Cooler(serde_json::from_value(bag)?),
            Category::Storage => PartSpec::Storage(serde_json::from_value(bag)?),
        })
    }

    pub fn to_attributes(&self) -> Map<String, Value> {
        let value = match self {
            PartSpec::Cpu(s) => serde_json::to_value(s),
            PartSpec::Motherboard(s) => serde_json::to_value(s),
            PartSpec::Ram(s) => serde_json::to_value(s),
            PartSpec::Gpu(s) => serde_json::to_value(s),
            PartSpec::Psu(s) => serde_json::to_value(s),
            PartSpec::Case(s) => serde_json::to_value(s),
            PartSpec::Cooler(s) => serde_json::to_value(s),
            PartSpec::Storage(s) => serde_json::to_value(s),
        };
        match value {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}

// =============================================================================
// COMPONENTS
// =============================================================================

/// An immutable catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawComponent", into = "RawComponent")]
pub struct Component {
    pub id: String,
    pub name: String,
    pub price: Option<f64>,
    pub spec: PartSpec,
}

impl Component {
    pub fn category(&self) -> Category {
        self.spec.category()
    }

    /// Name for messages, falling back to the id for unnamed entries.
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.id
        } else {
            &self.name
        }
    }
}

/// Wire form of a component: category tag plus an untyped attribute bag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawComponent {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

impl TryFrom<RawComponent> for Component {
    type Error = EngineError;

    fn try_from(raw: RawComponent) -> EngineResult<Self> {
        if raw.id.trim().is_empty() {
            return Err(EngineError::Configuration(
                "Component is missing an id".to_string(),
            ));
        }
        let category: Category = raw.category.parse()?;
        let spec = PartSpec::from_attributes(category, raw.attributes).map_err(|e| {
            EngineError::Configuration(format!(
                "Component '{}' ({}) has invalid attributes: {}",
                raw.id, category, e
            ))
        })?;
        Ok(Component {
            id: raw.id,
            name: raw.name,
            price: raw.price,
            spec,
        })
    }
}

impl From<Component> for RawComponent {
    fn from(component: Component) -> Self {
        RawComponent {
            category: component.category().as_str().to_string(),
            attributes: component.spec.to_attributes(),
            id: component.id,
            name: component.name,
            price: component.price,
        }
    }
}

// =============================================================================
// CATALOG QUERIES
// =============================================================================

/// Attribute predicate understood by catalog backends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "op", content = "value")]
pub enum Predicate {
    /// Attribute equals the value (strings compare case-insensitively).
    Eq(Value),
    /// Numeric attribute is at least the value.
    Min(f64),
    /// Numeric attribute is at most the value.
    Max(f64),
    /// Attribute equals one of the listed values.
    OneOf(Vec<String>),
    /// List attribute contains the value.
    Contains(String),
}

impl Predicate {
    /// Whether an attribute value satisfies this predicate.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Predicate::Eq(expected) => match (expected, value) {
                (Value::String(a), Value::String(b)) => same_token(a, b),
                (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
                _ => expected == value,
            },
            Predicate::Min(min) => value.as_f64().is_some_and(|v| v >= *min),
            Predicate::Max(max) => value.as_f64().is_some_and(|v| v <= *max),
            Predicate::OneOf(options) => value
                .as_str()
                .is_some_and(|v| options.iter().any(|o| same_token(o, v))),
            Predicate::Contains(needle) => value.as_array().is_some_and(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .any(|item| same_token(item, needle))
            }),
        }
    }

    fn signature(&self) -> String {
        match self {
            Predicate::Eq(v) => format!("eq:{}", normalize_value(v)),
            Predicate::Min(v) => format!("min:{}", v),
            Predicate::Max(v) => format!("max:{}", v),
            Predicate::OneOf(options) => {
                let mut opts: Vec<String> = options.iter().map(|o| normalize_token(o)).collect();
                opts.sort();
                opts.dedup();
                format!("one_of:{}", opts.join("|"))
            }
            Predicate::Contains(v) => format!("contains:{}", normalize_token(v)),
        }
    }
}

/// Search request sent to a catalog backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogQuery {
    pub category: Category,
    /// Attribute name -> predicate. Ordered so signatures are canonical.
    pub constraints: BTreeMap<String, Predicate>,
    pub limit: usize,
}

impl CatalogQuery {
    pub fn new(category: Category, limit: usize) -> Self {
        Self {
            category,
            constraints: BTreeMap::new(),
            limit,
        }
    }

    pub fn with(mut self, attribute: &str, predicate: Predicate) -> Self {
        self.constraints.insert(attribute.to_string(), predicate);
        self
    }

    /// Canonical cache key: category, sorted constraints and limit.
    pub fn signature(&self) -> String {
        let parts: Vec<String> = self
            .constraints
            .iter()
            .map(|(attr, pred)| format!("{}={}", attr, pred.signature()))
            .collect();
        format!("{}?{}#{}", self.category, parts.join("&"), self.limit)
    }

    /// Whether a component satisfies every constraint of this query.
    pub fn accepts(&self, component: &Component) -> bool {
        if component.category() != self.category {
            return false;
        }
        let attributes = component.spec.to_attributes();
        self.constraints.iter().all(|(attr, pred)| {
            attributes
                .get(attr)
                .is_some_and(|value| pred.matches(value))
        })
    }
}

/// One search result with the backend's relevance score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogHit {
    pub component: Component,
    #[serde(default)]
    pub relevance: f64,
}

/// Trimmed, case-folded token used for socket/ram type/form factor matching.
pub fn normalize_token(s: &str) -> String {
    s.trim().to_ascii_lowercase()
}

pub fn same_token(a: &str, b: &str) -> bool {
    normalize_token(a) == normalize_token(b)
}

fn normalize_value(v: &Value) -> String {
    match v {
        Value::String(s) => normalize_token(s),
        other => other.to_string(),
    }
}
