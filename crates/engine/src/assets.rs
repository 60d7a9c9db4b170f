use std::collections::HashMap;

use tracing::info;

/// Name-keyed cache for loaded assets. The loader runs once per name; its
/// result, successful or not, is what every later lookup gets.
#[derive(Debug, Default)]
pub struct SpriteCache<T> {
    entries: HashMap<String, T>,
}

impl<T> SpriteCache<T> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn get_or_load(&mut self, name: &str, load: impl FnOnce(&str) -> T) -> &T {
        self.entries
            .entry(name.to_string())
            .or_insert_with_key(|key| load(key))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        let dropped = self.entries.len();
        self.entries.clear();
        info!(dropped, "sprite_cache_cleared");
    }
}
