//! Process-wide model cache.
//!
//! The [`Registry`] builds a [`Model`] the first time a type is used and
//! hands out the cached `Arc` afterwards. It is safe to share between tasks;
//! racing first uses of one type all observe the same model.
//!
//! # Example
//!
//! ```
//! use webframe_orm::{entity, with_table_name, Registry};
//!
//! entity! {
//!     pub struct UserProfile {
//!         pub id: i64,
//!     }
//! }
//!
//! let registry = Registry::new();
//! let model = registry.get::<UserProfile>().unwrap();
//! assert_eq!(model.table_name(), "user_profile");
//!
//! let model = registry
//!     .register::<UserProfile>(vec![with_table_name("profiles")])
//!     .unwrap();
//! assert_eq!(model.table_name(), "profiles");
//! ```

use std::any::TypeId;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use crate::entity::Entity;
use crate::error::OrmResult;
use crate::model::{Model, ModelOption};

/// Thread-safe cache of models keyed by entity type.
#[derive(Debug, Default)]
pub struct Registry {
    models: DashMap<TypeId, Arc<Model>>,
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the model for `T`, building and caching it on first use.
    ///
    /// # Errors
    ///
    /// Returns the parse error if `T`'s descriptors are invalid; nothing is
    /// cached in that case.
    pub fn get<T: Entity>(&self) -> OrmResult<Arc<Model>> {
        let type_id = TypeId::of::<T>();
        if let Some(model) = self.models.get(&type_id) {
            return Ok(Arc::clone(model.value()));
        }

        let entry = self.models.entry(type_id).or_try_insert_with(|| {
            debug!(entity = T::type_name(), "registering model on first use");
            Model::parse::<T>().map(Arc::new)
        })?;
        Ok(Arc::clone(entry.value()))
    }

    /// Builds the model for `T`, applies `options` in order and caches the
    /// result, replacing any earlier model for the type.
    ///
    /// # Errors
    ///
    /// Returns the parse error or the first failing option's error; the
    /// cache is left untouched in that case.
    pub fn register<T: Entity>(&self, options: Vec<ModelOption>) -> OrmResult<Arc<Model>> {
        let mut model = Model::parse::<T>()?;
        for option in options {
            option.apply(&mut model)?;
        }

        debug!(
            entity = T::type_name(),
            table = model.table_name(),
            "registered model"
        );
        let model = Arc::new(model);
        self.models.insert(TypeId::of::<T>(), Arc::clone(&model));
        Ok(model)
    }

    /// Number of cached models.
    #[must_use]
    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// Returns `true` if no model has been cached yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}
