//! Immutable service registry.
//!
//! Maps each service id to the image reference it tracks. Built once at
//! startup and shared read-only (behind an `Arc`) by every request, so no
//! locking is needed.

use std::collections::{BTreeMap, BTreeSet};

use deckhand_types::config::ServiceTable;
use deckhand_types::service::{ImageReference, ServiceId};

/// Read-only `service_id -> tracked image` table.
#[derive(Debug, Clone, Default)]
pub struct ServiceRegistry {
    entries: BTreeMap<ServiceId, ImageReference>,
}

impl ServiceRegistry {
    /// Build the registry from a configuration table.
    ///
    /// Entries with an empty service id or an empty image are skipped.
    pub fn new(table: &ServiceTable) -> Self {
        let entries = table
            .iter()
            .filter(|(id, image)| !id.is_empty() && !image.is_empty())
            .map(|(id, image)| (ServiceId::new(id.as_str()), ImageReference::new(image.as_str())))
            .collect();
        Self { entries }
    }

    /// Build the registry from a raw key/value source such as the process
    /// environment. Only keys of the form `{prefix}{service_id}` conform.
    pub fn from_prefixed_vars<I, K, V>(vars: I, prefix: &str) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let table: ServiceTable = prefixed_entries(vars, prefix).collect();
        Self::new(&table)
    }

    /// Every service whose tracked image equals `image` exactly.
    ///
    /// An empty set means no service tracks this package; it is not an error.
    pub fn lookup_all(&self, image: &ImageReference) -> BTreeSet<ServiceId> {
        self.entries
            .iter()
            .filter(|(_, tracked)| *tracked == image)
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in ascending service-id order.
    pub fn iter(&self) -> impl Iterator<Item = (&ServiceId, &ImageReference)> {
        self.entries.iter()
    }
}

/// Strip `prefix` from conforming keys, dropping every other entry.
pub fn prefixed_entries<I, K, V>(vars: I, prefix: &str) -> impl Iterator<Item = (String, String)>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Into<String>,
{
    vars.into_iter().filter_map(move |(key, value)| {
        let id = key.as_ref().strip_prefix(prefix)?;
        if id.is_empty() {
            return None;
        }
        Some((id.to_string(), value.into()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(pairs: &[(&str, &str)]) -> ServiceRegistry {
        let table: ServiceTable = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServiceRegistry::new(&table)
    }

    #[test]
    fn test_lookup_all_exact_match_only() {
        let registry = registry(&[("A", "img:1"), ("B", "img:2")]);

        let hits = registry.lookup_all(&ImageReference::from("img:1"));
        assert_eq!(hits, BTreeSet::from([ServiceId::from("A")]));
    }

    #[test]
    fn test_lookup_all_collects_every_match() {
        let registry = registry(&[("api", "img:1"), ("worker", "img:1"), ("web", "img:2")]);

        let hits = registry.lookup_all(&ImageReference::from("img:1"));
        assert_eq!(
            hits,
            BTreeSet::from([ServiceId::from("api"), ServiceId::from("worker")])
        );
    }

    #[test]
    fn test_lookup_all_no_match_is_empty() {
        let registry = registry(&[("A", "img:1")]);
        assert!(registry.lookup_all(&ImageReference::from("img:9")).is_empty());
    }

    #[test]
    fn test_lookup_all_no_normalisation() {
        let registry = registry(&[("A", "ghcr.io/acme/api:1")]);

        assert!(registry.lookup_all(&ImageReference::from("GHCR.io/acme/api:1")).is_empty());
        assert!(registry.lookup_all(&ImageReference::from("ghcr.io/acme/api")).is_empty());
        assert!(registry.lookup_all(&ImageReference::from("ghcr.io/acme/api:1 ")).is_empty());
        assert!(registry.lookup_all(&ImageReference::from("ghcr.io/acme/api:10")).is_empty());
    }

    #[test]
    fn test_from_prefixed_vars_filters_keys() {
        let vars = vec![
            ("SER_api", "img:1"),
            ("SER_", "img:2"),
            ("PATH", "/usr/bin"),
            ("SECRET", "s3cr3t"),
            ("ser_lower", "img:3"),
            ("SER_worker", "img:1"),
        ];
        let registry = ServiceRegistry::from_prefixed_vars(vars, "SER_");

        let entries: Vec<(&str, &str)> = registry
            .iter()
            .map(|(id, image)| (id.as_str(), image.as_str()))
            .collect();
        assert_eq!(entries, vec![("api", "img:1"), ("worker", "img:1")]);
    }

    #[test]
    fn test_empty_values_are_skipped() {
        let registry = registry(&[("A", ""), ("", "img:1"), ("B", "img:2")]);
        assert_eq!(registry.len(), 1);
        assert!(registry.lookup_all(&ImageReference::from("")).is_empty());
    }

    #[test]
    fn test_iter_is_sorted_by_service_id() {
        let registry = registry(&[("zeta", "img:1"), ("alpha", "img:2"), ("mid", "img:3")]);
        let ids: Vec<&str> = registry.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["alpha", "mid", "zeta"]);
    }
}
