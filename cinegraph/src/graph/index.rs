//! Lookup indexes derived from a frozen graph.
//!
//! ```text
//! MovieGraph (by id)                 GraphIndexes (by name)
//! ┌──────────────────────────┐      ┌──────────────────────────────┐
//! │ #0 "Hamlet"   tags [3]   │      │ title "Hamlet" → [#0, #7]    │
//! │ #7 "Hamlet"   tags [3,5] │  →   │ tag "drama"    → [#0, #7]    │
//! │ #9 "Ran"      tags [5]   │      │ tag "war"      → [#7, #9]    │
//! └──────────────────────────┘      └──────────────────────────────┘
//! ```
//!
//! Titles and names are not unique, so every key maps to a sorted list of
//! ids, lowest id (earliest observed) first.

use std::collections::HashMap;

use crate::models::{MovieId, PersonId};

use super::{MovieGraph, MovieNode, PersonNode};

/// Name-keyed indexes over a [`MovieGraph`].
#[derive(Debug, Clone, Default)]
pub struct GraphIndexes {
    movies_by_title: HashMap<String, Vec<MovieId>>,
    people_by_name: HashMap<String, Vec<PersonId>>,
    movies_by_tag: HashMap<String, Vec<MovieId>>,
}

impl GraphIndexes {
    /// Group the graph's nodes by title, person name and tag name.
    ///
    /// Only people with at least one movie are indexed. Tags that share a
    /// name across tag codes are merged under that name.
    pub fn build(graph: &MovieGraph) -> Self {
        let mut movies_by_title: HashMap<String, Vec<MovieId>> = HashMap::new();
        for movie in graph.movies() {
            movies_by_title
                .entry(movie.title.clone())
                .or_default()
                .push(movie.id);
        }

        let mut people_by_name: HashMap<String, Vec<PersonId>> = HashMap::new();
        for person in graph.people().iter().filter(|p| p.has_movies()) {
            people_by_name
                .entry(person.full_name())
                .or_default()
                .push(person.id);
        }

        let mut movies_by_tag: HashMap<String, Vec<MovieId>> = HashMap::new();
        for tag in graph.tags().iter().filter(|t| !t.movies.is_empty()) {
            movies_by_tag
                .entry(tag.name.clone())
                .or_default()
                .extend(&tag.movies);
        }

        // nodes come out of the graph in id order; merged tags do not
        for ids in movies_by_tag.values_mut() {
            ids.sort_unstable();
            ids.dedup();
        }

        Self {
            movies_by_title,
            people_by_name,
            movies_by_tag,
        }
    }

    pub fn movie_ids_by_title(&self, title: &str) -> &[MovieId] {
        self.movies_by_title.get(title).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn person_ids_by_name(&self, name: &str) -> &[PersonId] {
        self.people_by_name.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn movie_ids_by_tag(&self, tag: &str) -> &[MovieId] {
        self.movies_by_tag.get(tag).map(Vec::as_slice).unwrap_or_default()
    }

    /// The earliest movie with exactly this title.
    pub fn movie_by_title<'g>(&self, graph: &'g MovieGraph, title: &str) -> Option<&'g MovieNode> {
        self.movie_ids_by_title(title)
            .first()
            .and_then(|&id| graph.movie(id))
    }

    /// The earliest person with exactly this full name.
    pub fn person_by_name<'g>(&self, graph: &'g MovieGraph, name: &str) -> Option<&'g PersonNode> {
        self.person_ids_by_name(name)
            .first()
            .and_then(|&id| graph.person(id))
    }

    pub fn movies_by_tag<'g>(&self, graph: &'g MovieGraph, tag: &str) -> Vec<&'g MovieNode> {
        graph.movies_of(self.movie_ids_by_tag(tag))
    }

    pub fn title_count(&self) -> usize {
        self.movies_by_title.len()
    }

    pub fn indexed_people(&self) -> usize {
        self.people_by_name.values().map(Vec::len).sum()
    }

    pub fn tag_names(&self) -> usize {
        self.movies_by_tag.len()
    }
}
