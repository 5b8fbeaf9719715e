use crate::models::Blog;
use indexmap::IndexMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("blog {0} already exists")]
    Duplicate(String),
}

/// In-memory, name-unique collection of blogs.
///
/// Iteration order is load/add order. Removal keeps the order of the
/// remaining blogs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlogRegistry {
    blogs: IndexMap<String, Blog>,
}

impl BlogRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.blogs.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Blog> {
        self.blogs.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Blog> {
        self.blogs.get_mut(name)
    }

    /// Insert a blog at the end.
    ///
    /// Callers are expected to have checked uniqueness already; a collision is
    /// still rejected and leaves the registry unchanged.
    pub fn add(&mut self, blog: Blog) -> Result<(), RegistryError> {
        if self.blogs.contains_key(&blog.name) {
            return Err(RegistryError::Duplicate(blog.name));
        }
        self.blogs.insert(blog.name.clone(), blog);
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> Option<Blog> {
        self.blogs.shift_remove(name)
    }

    /// Stable snapshot for iteration outside the owner thread
    pub fn all(&self) -> Vec<Blog> {
        self.blogs.values().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Blog> {
        self.blogs.values()
    }

    pub fn names(&self) -> Vec<String> {
        self.blogs.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.blogs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blogs.is_empty()
    }

    pub fn clear(&mut self) {
        self.blogs.clear();
    }
}
