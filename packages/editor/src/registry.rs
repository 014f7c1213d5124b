//! # Component Registry
//!
//! The engine never hardcodes per-component behavior. Whether a node may
//! hold children and what its default props/style look like is resolved
//! through this seam, so the component catalog can live outside the core.

use crate::node::StyleSheet;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Capabilities and defaults for one component type.
#[derive(Debug, Clone, Default)]
pub struct ComponentSpec {
    /// Whether nodes of this type may hold children (invariant: leaf
    /// components always have an empty child list).
    pub can_have_children: bool,

    pub default_props: Map<String, Value>,
    pub default_style: StyleSheet,
}

impl ComponentSpec {
    pub fn container() -> Self {
        Self {
            can_have_children: true,
            ..Self::default()
        }
    }

    pub fn leaf() -> Self {
        Self::default()
    }

    pub fn with_prop(mut self, key: &str, value: Value) -> Self {
        self.default_props.insert(key.to_string(), value);
        self
    }

    pub fn with_style(mut self, breakpoint: &str, property: &str, value: &str) -> Self {
        self.style_entry(breakpoint)
            .insert(property.to_string(), value.to_string());
        self
    }

    fn style_entry(&mut self, breakpoint: &str) -> &mut std::collections::BTreeMap<String, String> {
        self.default_style.entry(breakpoint.to_string()).or_default()
    }
}

/// Lookup interface the engine and drop resolver depend on.
pub trait ComponentRegistry: Send + Sync {
    fn get(&self, component: &str) -> Option<&ComponentSpec>;

    /// Capability check. Unknown components are treated as leaves so a stale
    /// document can never smuggle children under an unregistered type.
    fn can_have_children(&self, component: &str) -> bool {
        self.get(component).map_or(false, |spec| spec.can_have_children)
    }
}

/// HashMap-backed registry for tests, demos and static catalogs.
#[derive(Debug, Default)]
pub struct StaticRegistry {
    specs: HashMap<String, ComponentSpec>,
}

impl StaticRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, component: &str, spec: ComponentSpec) -> Self {
        self.specs.insert(component.to_string(), spec);
        self
    }

    /// The stock component catalog.
    pub fn standard() -> Self {
        Self::new()
            .register("root", ComponentSpec::container())
            .register("section", ComponentSpec::container())
            .register(
                "stack",
                ComponentSpec::container().with_style("base", "display", "flex"),
            )
            .register("card", ComponentSpec::container())
            .register(
                "text",
                ComponentSpec::leaf().with_prop("text", Value::String("Text".into())),
            )
            .register(
                "button",
                ComponentSpec::leaf().with_prop("label", Value::String("Button".into())),
            )
            .register(
                "image",
                ComponentSpec::leaf().with_prop("src", Value::String(String::new())),
            )
            .register("divider", ComponentSpec::leaf())
    }
}

impl ComponentRegistry for StaticRegistry {
    fn get(&self, component: &str) -> Option<&ComponentSpec> {
        self.specs.get(component)
    }
}
