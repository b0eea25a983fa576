use std::sync::Arc;

use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;

use crate::function::Function;

/// Builtins are constructed once; every registry built from them shares the `Arc`s.
static BUILTINS: Lazy<FunctionRegistry> = Lazy::new(|| {
    let mut reg = FunctionRegistry::new();
    crate::builtins::load_builtins(&mut reg);
    reg
});

/// Lookup from uppercase function name to implementation.
///
/// Owned by the engine rather than global, so tests and embedders can
/// register extra functions without affecting other engines.
#[derive(Clone, Default)]
pub struct FunctionRegistry {
    fns: FxHashMap<String, Arc<dyn Function>>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtins() -> Self {
        BUILTINS.clone()
    }

    /// Register `f` under its name and aliases, replacing earlier entries.
    pub fn register(&mut self, f: Arc<dyn Function>) {
        for alias in f.aliases() {
            self.fns.insert(alias.to_ascii_uppercase(), Arc::clone(&f));
        }
        self.fns.insert(f.name().to_ascii_uppercase(), f);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Function>> {
        self.fns.get(&name.to_ascii_uppercase()).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fns.contains_key(&name.to_ascii_uppercase())
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.fns.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.fns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fns.is_empty()
    }
}

impl std::fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("names", &self.names())
            .finish()
    }
}
