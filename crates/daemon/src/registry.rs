// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Executor provider registry.
//!
//! Populated at startup and frozen; the feeder looks providers up by the
//! string kind in each runner's config. A runner whose kind has no
//! registered provider is skipped silently (the backend may simply not be
//! compiled into this build).

use lw_core::ExecutorProvider;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn ExecutorProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider for an executor kind. Last registration wins.
    pub fn register(&mut self, kind: impl Into<String>, provider: Arc<dyn ExecutorProvider>) {
        let kind = kind.into();
        if self.providers.insert(kind.clone(), provider).is_some() {
            tracing::warn!(executor = %kind, "executor provider re-registered");
        }
    }

    pub fn get(&self, kind: &str) -> Option<Arc<dyn ExecutorProvider>> {
        self.providers.get(kind).cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Registered kinds, sorted for stable log output.
    pub fn kinds(&self) -> Vec<String> {
        let mut kinds: Vec<String> = self.providers.keys().cloned().collect();
        kinds.sort();
        kinds
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
