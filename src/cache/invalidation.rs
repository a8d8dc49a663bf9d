//! Which cached collections a successful mutation makes stale.

use super::{Collection, QueryCache};

/// Entity families that can be mutated through the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Entity {
    Brand,
    Color,
    Material,
    Spool,
    InventoryUnit,
    Insight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum MutationKind {
    Create,
    Update,
    Delete,
}

/// A successful write, described in terms of what it touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mutation {
    pub entity: Entity,
    pub kind: MutationKind,
}

impl Mutation {
    pub fn new(entity: Entity, kind: MutationKind) -> Self {
        Self { entity, kind }
    }

    pub fn create(entity: Entity) -> Self {
        Self::new(entity, MutationKind::Create)
    }

    pub fn update(entity: Entity) -> Self {
        Self::new(entity, MutationKind::Update)
    }

    pub fn delete(entity: Entity) -> Self {
        Self::new(entity, MutationKind::Delete)
    }
}

/// The set of collections to mark stale after a mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidationPlan {
    collections: Vec<Collection>,
}

impl InvalidationPlan {
    pub fn for_mutation(mutation: Mutation) -> Self {
        use Collection::*;
        use Entity::*;
        use MutationKind::*;

        let collections = match (mutation.entity, mutation.kind) {
            (Brand, Update) => vec![Brands, Spools, Inventory],
            (Color, Update) => vec![Colors, Spools, Inventory],
            (Material, Update) => vec![Materials, Spools, Inventory],
            (Brand, _) => vec![Brands],
            (Color, _) => vec![Colors],
            (Material, _) => vec![Materials],
            // Spools reference lookup rows by name; the backend creates missing ones.
            (Spool, Create) => vec![Spools, Brands, Colors, Materials],
            (Spool, Update) => vec![
                Spools,
                Inventory,
                InventoryInUse,
                Brands,
                Colors,
                Materials,
            ],
            (Spool, Delete) => vec![Spools, Inventory, InventoryInUse],
            (InventoryUnit, _) => vec![Inventory, InventoryInUse, Dashboard],
            (Insight, _) => vec![Dashboard],
        };
        Self { collections }
    }

    /// Everything the create/add workflow touches once an archetype exists.
    pub fn for_intake() -> Self {
        Self {
            collections: vec![
                Collection::Spools,
                Collection::Brands,
                Collection::Colors,
                Collection::Materials,
                Collection::Inventory,
                Collection::InventoryInUse,
                Collection::Dashboard,
            ],
        }
    }

    pub fn collections(&self) -> &[Collection] {
        &self.collections
    }

    pub fn contains(&self, collection: Collection) -> bool {
        self.collections.contains(&collection)
    }

    pub fn apply(&self, cache: &QueryCache) {
        for collection in &self.collections {
            cache.invalidate(*collection);
        }
    }
}
