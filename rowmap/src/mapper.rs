use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::config::MapperSettings;
use crate::index::{self, NameTransform, TypeIndex};
use crate::record::{self, Record, RecordShape};

pub const DEFAULT_ANNOTATION_KEY: &str = "db";

static GLOBAL: OnceLock<Mapper> = OnceLock::new();

/// Resolves record types to their [`TypeIndex`], caching one index per type.
///
/// Cache entries are built on first use and never replaced. Lookups take a shared read
/// lock; a miss builds the index without holding any lock and the first writer wins.
#[derive(Debug)]
pub struct Mapper {
    annotation_key: String,
    transform: NameTransform,
    cache: RwLock<HashMap<TypeId, Arc<TypeIndex>>>,
}

impl Default for Mapper {
    fn default() -> Self {
        Self::new()
    }
}

impl Mapper {
    pub fn new() -> Self {
        Self::with_key(DEFAULT_ANNOTATION_KEY)
    }

    /// Mapper that reads annotations stored under `key` instead of `db`.
    pub fn with_key(key: impl Into<String>) -> Self {
        Self {
            annotation_key: key.into(),
            transform: NameTransform::default(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_transform(mut self, transform: NameTransform) -> Self {
        self.transform = transform;
        self
    }

    pub fn from_settings(settings: &MapperSettings) -> Self {
        Self::with_key(settings.annotation_key.clone()).with_transform(settings.name_transform.into())
    }

    /// Process-wide mapper with default settings.
    pub fn global() -> &'static Mapper {
        GLOBAL.get_or_init(Mapper::new)
    }

    pub fn annotation_key(&self) -> &str {
        &self.annotation_key
    }

    pub fn name_transform(&self) -> &NameTransform {
        &self.transform
    }

    pub fn lookup<T: Record>(&self) -> Arc<TypeIndex> {
        self.lookup_with(T::static_type_id(), T::record_shape)
    }

    /// Index for the concrete type behind a trait object.
    pub fn lookup_dyn(&self, record: &dyn Record) -> Arc<TypeIndex> {
        self.lookup_with(record.record_type_id(), || record.shape())
    }

    pub fn lookup_shape(&self, shape: &RecordShape) -> Arc<TypeIndex> {
        self.lookup_with(shape.type_id, || shape.clone())
    }

    /// Builds the index of every record registered through `#[derive(Record)]`.
    /// Returns the number of types now cached.
    pub fn warm_up(&self) -> usize {
        for registration in record::registered_records() {
            let shape = (registration.shape)();
            self.lookup_shape(&shape);
        }
        self.cached_types()
    }

    pub fn cached_types(&self) -> usize {
        self.read_cache().len()
    }

    fn lookup_with(&self, type_id: TypeId, shape: impl FnOnce() -> RecordShape) -> Arc<TypeIndex> {
        if let Some(hit) = self.read_cache().get(&type_id) {
            return Arc::clone(hit);
        }

        let shape = shape();
        let built = Arc::new(index::build(&shape, &self.annotation_key, &self.transform));

        let mut cache = self.write_cache();
        let entry = cache.entry(type_id).or_insert_with(|| {
            log::debug!(
                "indexed {} ({} columns, key `{}`)",
                shape.type_name,
                built.len(),
                self.annotation_key
            );
            built
        });
        Arc::clone(entry)
    }

    // The cache only ever holds fully built entries, so a poisoned lock is still consistent.
    fn read_cache(&self) -> RwLockReadGuard<'_, HashMap<TypeId, Arc<TypeIndex>>> {
        self.cache.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_cache(&self) -> RwLockWriteGuard<'_, HashMap<TypeId, Arc<TypeIndex>>> {
        self.cache.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Record;
    use std::thread;

    #[derive(Record)]
    struct Account {
        #[rowmap(db = "id")]
        id: i64,
        #[rowmap(db = "email", json = "emailAddress")]
        email: String,
    }

    #[test]
    fn lookup_is_cached_per_type() {
        let mapper = Mapper::new();
        let first = mapper.lookup::<Account>();
        let second = mapper.lookup::<Account>();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(mapper.cached_types(), 1);
    }

    #[test]
    fn lookup_dyn_shares_the_static_entry() {
        let mapper = Mapper::new();
        let account = Account {
            id: 1,
            email: "a@example.com".into(),
        };
        let by_type = mapper.lookup::<Account>();
        let by_value = mapper.lookup_dyn(&account);
        assert!(Arc::ptr_eq(&by_type, &by_value));
    }

    #[test]
    fn boxed_records_resolve_to_the_inner_type() {
        let mapper = Mapper::new();
        let inner = mapper.lookup::<Account>();
        let boxed = mapper.lookup::<Box<Account>>();
        assert!(Arc::ptr_eq(&inner, &boxed));
    }

    #[test]
    fn annotation_key_selects_names() {
        let mapper = Mapper::with_key("json");
        let index = mapper.lookup::<Account>();
        assert!(index.get_by_path("emailAddress").is_some());
        assert!(index.get_by_path("email").is_none());
        // `id` has no json annotation and falls back to its declared name.
        assert!(index.get_by_path("id").is_some_and(|f| !f.tagged));
    }

    #[test]
    fn concurrent_lookups_agree() {
        let mapper = Arc::new(Mapper::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let mapper = Arc::clone(&mapper);
                thread::spawn(move || mapper.lookup::<Account>())
            })
            .collect();
        let indexes: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for index in &indexes[1..] {
            assert!(Arc::ptr_eq(&indexes[0], index));
        }
    }

    #[test]
    fn warm_up_indexes_registered_records() {
        let mapper = Mapper::new();
        assert!(mapper.warm_up() >= 1);
        assert!(mapper.cached_types() >= 1);
        let before = mapper.cached_types();
        let _ = mapper.lookup::<Account>();
        assert_eq!(mapper.cached_types(), before);
    }
}
