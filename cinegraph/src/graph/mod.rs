//! The entity graph.
//!
//! During a load the graph lives as an [`EntityGraph`]: sharded concurrent
//! maps from external key to entity, mutated by every merge worker at once.
//! When the last phase is joined it is frozen into a read-only
//! [`MovieGraph`] of plain vectors indexed by surrogate id.

pub mod frozen;
pub mod index;
mod merge;

pub use frozen::{Asymmetry, GraphStats, MovieGraph, MovieNode, PersonNode, TagNode};
pub use index::GraphIndexes;

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::models::{Movie, MovieId, Person, PersonId, Tag, TagId};

// =============================================================================
// Merge Outcome
// =============================================================================

/// What a single merge did to the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeOutcome {
    /// A new entity or translation entry was created.
    Inserted,
    /// An existing entity was overwritten (rating, person details).
    Updated,
    /// A new relationship edge was attached.
    Linked,
    /// The entity or edge already existed; nothing changed.
    Duplicate,
    /// An endpoint of a relationship is not in the graph.
    JoinMiss,
}

// =============================================================================
// Entity Graph
// =============================================================================

/// Concurrent graph under construction.
///
/// Entities are created only in phase 1, so phase-2 merges see the entity
/// maps as read-only and only contend on per-entity collection locks.
#[derive(Debug, Default)]
pub struct EntityGraph {
    movies: DashMap<String, Arc<Movie>>,
    people: DashMap<String, Arc<Person>>,
    tags: DashMap<u32, Arc<Tag>>,
    movielens_links: DashMap<u32, String>,
    next_movie: AtomicU32,
    next_person: AtomicU32,
    next_tag: AtomicU32,
}

impl EntityGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn movie(&self, key: &str) -> Option<Arc<Movie>> {
        self.movies.get(key).map(|entry| Arc::clone(entry.value()))
    }

    pub fn person(&self, key: &str) -> Option<Arc<Person>> {
        self.people.get(key).map(|entry| Arc::clone(entry.value()))
    }

    pub fn tag(&self, code: u32) -> Option<Arc<Tag>> {
        self.tags.get(&code).map(|entry| Arc::clone(entry.value()))
    }

    /// IMDb key registered for a MovieLens movie id.
    pub fn translate(&self, movielens_id: u32) -> Option<String> {
        self.movielens_links.get(&movielens_id).map(|entry| entry.value().clone())
    }

    pub fn movie_count(&self) -> usize {
        self.movies.len()
    }

    pub fn person_count(&self) -> usize {
        self.people.len()
    }

    pub fn tag_count(&self) -> usize {
        self.tags.len()
    }

    pub fn link_count(&self) -> usize {
        self.movielens_links.len()
    }

    fn allocate_movie(&self) -> MovieId {
        MovieId(self.next_movie.fetch_add(1, Ordering::Relaxed))
    }

    fn allocate_person(&self) -> PersonId {
        PersonId(self.next_person.fetch_add(1, Ordering::Relaxed))
    }

    fn allocate_tag(&self) -> TagId {
        TagId(self.next_tag.fetch_add(1, Ordering::Relaxed))
    }

    /// Consume the graph into its read-only form.
    pub fn freeze(self) -> MovieGraph {
        let mut movies: Vec<MovieNode> = self
            .movies
            .into_iter()
            .map(|(_, movie)| MovieNode::from_live(&movie))
            .collect();
        movies.sort_unstable_by_key(|m| m.id);

        let mut people: Vec<PersonNode> = self
            .people
            .into_iter()
            .map(|(_, person)| PersonNode::from_live(&person))
            .collect();
        people.sort_unstable_by_key(|p| p.id);

        let mut tags: Vec<TagNode> = self
            .tags
            .into_iter()
            .map(|(_, tag)| TagNode::from_live(&tag))
            .collect();
        tags.sort_unstable_by_key(|t| t.id);

        MovieGraph::new(movies, people, tags, self.movielens_links.into_iter().collect())
    }
}
