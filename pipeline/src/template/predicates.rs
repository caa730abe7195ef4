//! Named predicates deciding which conditional template regions survive.

use kit_core::{Level, TRAINING_TOPICS, TrainingParameters};
use std::collections::HashMap;
use std::sync::Arc;

pub type Predicate = Arc<dyn Fn(&TrainingParameters) -> bool + Send + Sync>;

const INDUSTRY_KEYWORDS: &[&str] = &["food", "manufacturing", "healthcare", "automotive"];

/// Registry of region names (`if_level_beginner`, ...) to predicates.
#[derive(Clone, Default)]
pub struct PredicateRegistry {
    predicates: HashMap<String, Predicate>
}

impl PredicateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Industry keyword, level and catalogue-topic predicates.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();

        for &keyword in INDUSTRY_KEYWORDS {
            registry.register(format!("if_industry_{keyword}"), move |p| {
                p.industry.to_lowercase().contains(keyword)
            });
        }

        for level in [Level::Beginner, Level::Intermediate, Level::Advanced] {
            registry.register(format!("if_level_{level}"), move |p| p.level == level);
        }

        for topic in TRAINING_TOPICS {
            let value = topic.value;
            registry.register(format!("if_topic_{value}"), move |p| p.topic == value);
        }

        registry
    }

    pub fn register<F>(&mut self, name: impl Into<String>, predicate: F)
    where
        F: Fn(&TrainingParameters) -> bool + Send + Sync + 'static
    {
        self.predicates.insert(name.into(), Arc::new(predicate));
    }

    /// `None` when no predicate is registered under `name`.
    pub fn evaluate(&self, name: &str, parameters: &TrainingParameters) -> Option<bool> {
        self.predicates.get(name).map(|predicate| predicate(parameters))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.predicates.contains_key(name)
    }
}

impl std::fmt::Debug for PredicateRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.predicates.keys().collect();
        names.sort();
        f.debug_struct("PredicateRegistry")
            .field("predicates", &names)
            .finish()
    }
}
