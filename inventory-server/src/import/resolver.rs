//! Batch-scoped entity resolution
//!
//! Maps an organization or person fragment to a row, in this order: the
//! batch cache, then the store by canonical key, then a fresh insert. Every
//! later reference to the same key within the batch gets the same `Arc`, so
//! one key never produces two rows in one batch.

use super::notifier::CommitGate;
use crate::db::{organizations, persons};
use crate::dto::OrganizationInput;
use crate::validation::validate_organization;
use chrono::{DateTime, Utc};
use inventory_common::db::{NewPerson, Organization, Person};
use inventory_common::events::{ChangeAction, EntityKind};
use inventory_common::Result;
use sqlx::SqliteConnection;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Where each resolution was satisfied from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolverStats {
    pub cache_hits: usize,
    pub store_hits: usize,
    pub created: usize,
}

/// Resolver state for exactly one batch; never reuse across imports
#[derive(Debug, Default)]
pub struct EntityResolver {
    organizations: HashMap<String, Arc<Organization>>,
    persons: HashMap<String, Arc<Person>>,
    stats: ResolverStats,
}

impl EntityResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> ResolverStats {
        self.stats
    }

    /// Resolve a manufacturer by its canonical full-name key
    ///
    /// The fragment is only validated when a new row has to be created; an
    /// existing organization is reused as stored.
    pub async fn organization(
        &mut self,
        conn: &mut SqliteConnection,
        key: &str,
        input: &OrganizationInput,
        gate: &mut CommitGate,
        now: DateTime<Utc>,
    ) -> Result<Arc<Organization>> {
        if let Some(org) = self.organizations.get(key) {
            self.stats.cache_hits += 1;
            return Ok(Arc::clone(org));
        }

        let org = match organizations::find_by_full_name_key(conn, key).await? {
            Some(existing) => {
                self.stats.store_hits += 1;
                debug!(organization_id = existing.id, key, "Reusing stored organization");
                existing
            }
            None => {
                let new_org = validate_organization(input, "manufacturer.")?;
                let id = organizations::insert(conn, &new_org, now).await?;
                gate.stage(EntityKind::Organization, ChangeAction::Created, id);
                self.stats.created += 1;
                debug!(organization_id = id, key, "Created organization");
                new_org.into_organization(id, now)
            }
        };

        let org = Arc::new(org);
        self.organizations.insert(key.to_string(), Arc::clone(&org));
        Ok(org)
    }

    /// Resolve an already-validated owner by its canonical name key
    pub async fn person(
        &mut self,
        conn: &mut SqliteConnection,
        key: &str,
        candidate: NewPerson,
        gate: &mut CommitGate,
    ) -> Result<Arc<Person>> {
        if let Some(person) = self.persons.get(key) {
            self.stats.cache_hits += 1;
            return Ok(Arc::clone(person));
        }

        let person = match persons::find_by_name_key(conn, key).await? {
            Some(existing) => {
                self.stats.store_hits += 1;
                debug!(person_id = existing.id, key, "Reusing stored person");
                existing
            }
            None => {
                let id = persons::insert(conn, &candidate).await?;
                gate.stage(EntityKind::Person, ChangeAction::Created, id);
                self.stats.created += 1;
                debug!(person_id = id, key, "Created person");
                candidate.into_person(id)
            }
        };

        let person = Arc::new(person);
        self.persons.insert(key.to_string(), Arc::clone(&person));
        Ok(person)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dto::{AddressInput, LocationInput};
    use inventory_common::db::{init_database, Country};
    use inventory_common::Error;
    use tempfile::TempDir;

    fn org_input(full_name: &str) -> OrganizationInput {
        let address = || AddressInput {
            zip_code: Some("10001".to_string()),
            town: Some(LocationInput {
                x: Some(1),
                y: Some(1),
                name: Some("Metropolis".to_string()),
            }),
        };
        OrganizationInput {
            name: Some("Acme".to_string()),
            full_name: Some(full_name.to_string()),
            annual_turnover: Some(10.0),
            employees_count: Some(2),
            rating: Some(1),
            official_address: Some(address()),
            postal_address: Some(address()),
        }
    }

    #[tokio::test]
    async fn test_same_key_resolves_to_same_instance() {
        let dir = TempDir::new().unwrap();
        let pool = init_database(&dir.path().join("t.db")).await.unwrap();
        let mut tx = pool.begin().await.unwrap();
        let mut gate = CommitGate::new();
        let mut resolver = EntityResolver::new();
        let now = Utc::now();

        let a = resolver
            .organization(&mut *tx, "acme corp", &org_input("Acme Corp"), &mut gate, now)
            .await
            .unwrap();
        let b = resolver
            .organization(&mut *tx, "acme corp", &org_input("ACME  corp"), &mut gate, now)
            .await
            .unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(gate.len(), 1);
        assert_eq!(
            resolver.stats(),
            ResolverStats {
                cache_hits: 1,
                store_hits: 0,
                created: 1
            }
        );
    }

    #[tokio::test]
    async fn test_stored_row_is_reused_without_validation() {
        let dir = TempDir::new().unwrap();
        let pool = init_database(&dir.path().join("t.db")).await.unwrap();
        let now = Utc::now();

        {
            let mut tx = pool.begin().await.unwrap();
            let mut gate = CommitGate::new();
            EntityResolver::new()
                .organization(&mut *tx, "acme corp", &org_input("Acme Corp"), &mut gate, now)
                .await
                .unwrap();
            tx.commit().await.unwrap();
        }

        // an invalid fragment still resolves because the key already exists
        let mut broken = org_input("Acme Corp");
        broken.rating = Some(-1);

        let mut tx = pool.begin().await.unwrap();
        let mut gate = CommitGate::new();
        let mut resolver = EntityResolver::new();
        resolver
            .organization(&mut *tx, "acme corp", &broken, &mut gate, now)
            .await
            .unwrap();
        assert!(gate.is_empty());
        assert_eq!(resolver.stats().store_hits, 1);
    }

    #[tokio::test]
    async fn test_new_invalid_organization_is_rejected() {
        let dir = TempDir::new().unwrap();
        let pool = init_database(&dir.path().join("t.db")).await.unwrap();
        let mut tx = pool.begin().await.unwrap();
        let mut gate = CommitGate::new();

        let mut input = org_input("Nova Ltd");
        input.employees_count = Some(0);
        let err = EntityResolver::new()
            .organization(&mut *tx, "nova ltd", &input, &mut gate, Utc::now())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "manufacturer.employeesCount > 0 required");
        assert!(matches!(err, Error::InvalidInput { .. }));
    }

    #[tokio::test]
    async fn test_person_cache_is_separate_from_organizations() {
        let dir = TempDir::new().unwrap();
        let pool = init_database(&dir.path().join("t.db")).await.unwrap();
        let mut tx = pool.begin().await.unwrap();
        let mut gate = CommitGate::new();
        let mut resolver = EntityResolver::new();
        let now = Utc::now();

        resolver
            .organization(&mut *tx, "same", &org_input("Same"), &mut gate, now)
            .await
            .unwrap();

        let candidate = NewPerson {
            name: "Same".to_string(),
            eye_color: None,
            hair_color: None,
            nationality: Country::Germany,
            height: 1.8,
            location: None,
        };
        let p1 = resolver
            .person(&mut *tx, "same", candidate.clone(), &mut gate)
            .await
            .unwrap();
        let p2 = resolver.person(&mut *tx, "same", candidate, &mut gate).await.unwrap();

        assert!(Arc::ptr_eq(&p1, &p2));
        assert_eq!(gate.len(), 2);
    }
}
