// crates/policy-sync-core/src/runtime/catalog.rs
// ============================================================================
// Module: Schema Catalog
// Description: Fetch and flatten policy schemas with a per-operation cache.
// Purpose: Turn raw schema documents into validated descriptors on demand.
// Dependencies: crate::core, crate::interfaces, crate::runtime::retry, tracing
// ============================================================================

//! ## Overview
//! A [`SchemaCatalog`] lives for one engine operation. Each schema name is
//! fetched at most once per catalog; transient failures are retried within the
//! configured budget. A schema that does not exist, or whose document carries
//! no message types, surfaces as [`PolicyError::SchemaNotFound`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use tracing::debug;

use crate::core::SchemaDescriptor;
use crate::interfaces::ApiError;
use crate::interfaces::Clock;
use crate::interfaces::SchemaSource;
use crate::runtime::error::PolicyError;
use crate::runtime::retry::RetryError;
use crate::runtime::retry::RetryPolicy;
use crate::runtime::retry::retry_with_budget;

// ============================================================================
// SECTION: Catalog
// ============================================================================

/// Operation-scoped schema cache backed by a [`SchemaSource`].
pub struct SchemaCatalog<'a, S: ?Sized, C: ?Sized> {
    /// Remote schema source.
    source: &'a S,
    /// Clock driving retries.
    clock: &'a C,
    /// Retry policy for schema fetches.
    retry: RetryPolicy,
    /// Descriptors fetched so far, keyed by requested name.
    cache: BTreeMap<String, SchemaDescriptor>,
}

impl<'a, S, C> SchemaCatalog<'a, S, C>
where
    S: SchemaSource + ?Sized,
    C: Clock + ?Sized,
{
    /// Creates an empty catalog.
    #[must_use]
    pub const fn new(source: &'a S, clock: &'a C, retry: RetryPolicy) -> Self {
        Self {
            source,
            clock,
            retry,
            cache: BTreeMap::new(),
        }
    }

    /// Returns the descriptor for `schema_name`, fetching it on first use.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::SchemaNotFound`] for missing or empty schemas and
    /// [`PolicyError::Timeout`] or [`PolicyError::Api`] for other failures.
    pub fn fetch(&mut self, schema_name: &str) -> Result<&SchemaDescriptor, PolicyError> {
        if !self.cache.contains_key(schema_name) {
            let descriptor = self.fetch_uncached(schema_name)?;
            self.cache.insert(schema_name.to_string(), descriptor);
        }
        self.cache.get(schema_name).ok_or_else(|| not_found(schema_name))
    }

    /// Returns the number of cached descriptors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Returns true when nothing has been fetched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Fetches and flattens one schema without consulting the cache.
    fn fetch_uncached(&self, schema_name: &str) -> Result<SchemaDescriptor, PolicyError> {
        let raw = retry_with_budget(
            self.clock,
            &self.retry,
            "get policy schema",
            ApiError::is_transient,
            |_| self.source.get_schema(schema_name),
        )
        .map_err(|err| match err {
            RetryError::Permanent(ApiError::NotFound(_) | ApiError::Malformed(_)) => {
                not_found(schema_name)
            }
            other => PolicyError::from_retry("get policy schema", other),
        })?;
        let descriptor =
            SchemaDescriptor::from_raw(schema_name, &raw).ok_or_else(|| not_found(schema_name))?;
        debug!(
            schema = schema_name,
            fields = descriptor.fields.len(),
            "fetched policy schema"
        );
        Ok(descriptor)
    }
}

/// Builds the not-found error for a schema name.
fn not_found(schema_name: &str) -> PolicyError {
    PolicyError::SchemaNotFound {
        schema: schema_name.to_string(),
    }
}
