//! Card and field-mapping cache
//!
//! Session-scoped, no TTL and no eviction: cards are invalidated
//! explicitly after a successful deploy, mapping configuration is
//! assumed stable within a session.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::mapping::ResolvedMappings;
use crate::models::card::CardSummary;

/// In-memory cache for card summaries and resolved mapping bundles
#[derive(Debug, Default)]
pub struct StatusCache {
    cards: RwLock<Option<Vec<CardSummary>>>,
    mappings: RwLock<HashMap<String, ResolvedMappings>>,
}

impl StatusCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the cached card list, if one was stored
    pub fn get_cards(&self) -> Option<Vec<CardSummary>> {
        let cards = self.cards.read().unwrap_or_else(|e| e.into_inner());
        cards.clone()
    }

    /// Replace the cached card list
    pub fn put_cards(&self, list: Vec<CardSummary>) {
        let mut cards = self.cards.write().unwrap_or_else(|e| e.into_inner());
        *cards = Some(list);
    }

    /// Drop the cached card list
    pub fn invalidate_cards(&self) {
        let mut cards = self.cards.write().unwrap_or_else(|e| e.into_inner());
        *cards = None;
    }

    /// Get the resolved mapping bundle for a target key (exact match)
    pub fn get_mappings(&self, target_key: &str) -> Option<ResolvedMappings> {
        let mappings = self.mappings.read().unwrap_or_else(|e| e.into_inner());
        mappings.get(target_key).cloned()
    }

    /// Store the resolved mapping bundle for a target key
    pub fn put_mappings(&self, target_key: &str, bundle: ResolvedMappings) {
        let mut mappings = self.mappings.write().unwrap_or_else(|e| e.into_inner());
        mappings.insert(target_key.to_string(), bundle);
    }

    /// Number of cached mapping bundles
    pub fn mappings_len(&self) -> usize {
        let mappings = self.mappings.read().unwrap_or_else(|e| e.into_inner());
        mappings.len()
    }
}
