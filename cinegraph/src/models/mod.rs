//! Domain models for the cinegraph loader.
//!
//! This module contains the live entities that the pipeline mutates while a
//! load is running:
//!
//! - [`Movie`] - a title with rating, director, cast and tags
//! - [`Person`] - an actor or director with two filmographies
//! - [`Tag`] - a MovieLens tag attached to movies by relevance
//! - [`MovieId`], [`PersonId`], [`TagId`] - dense surrogate identifiers
//! - [`Role`] - the role categories that produce graph edges
//!
//! Relationship collections hold surrogate ids, never the other entity, and
//! each collection has its own lock. The merge stage always takes the
//! movie-side lock before the person-side or tag-side lock.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

// =============================================================================
// Surrogate Identifiers
// =============================================================================

macro_rules! surrogate_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl $name {
            /// Position of the entity in the frozen graph's vectors.
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

surrogate_id!(
    /// Surrogate id of a [`Movie`], assigned once at first observation.
    MovieId
);
surrogate_id!(
    /// Surrogate id of a [`Person`].
    PersonId
);
surrogate_id!(
    /// Surrogate id of a [`Tag`].
    TagId
);

// =============================================================================
// Role
// =============================================================================

/// Role category of a person in a movie.
///
/// Only these three IMDb categories produce edges; everything else is
/// dropped by the role filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Director,
    Actor,
    Actress,
}

impl Role {
    /// Parse an IMDb category, ignoring ASCII case.
    pub fn from_category(category: &str) -> Option<Self> {
        if category.eq_ignore_ascii_case("director") {
            Some(Self::Director)
        } else if category.eq_ignore_ascii_case("actor") {
            Some(Self::Actor)
        } else if category.eq_ignore_ascii_case("actress") {
            Some(Self::Actress)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Director => "director",
            Self::Actor => "actor",
            Self::Actress => "actress",
        }
    }

    pub fn is_director(&self) -> bool {
        matches!(self, Self::Director)
    }
}

// =============================================================================
// Movie
// =============================================================================

/// Rating value meaning "no rating observed".
pub const UNRATED: f32 = -1.0;

/// A movie node under construction.
///
/// `id`, `key` and `title` never change after creation. The rating is an
/// atomic so an overwrite is never observed half-written.
#[derive(Debug)]
pub struct Movie {
    id: MovieId,
    key: String,
    title: String,
    rating: AtomicU32,
    pub(crate) director: Mutex<Option<PersonId>>,
    pub(crate) cast: Mutex<HashSet<PersonId>>,
    /// Keyed by tag name: codes that share a name attach once.
    pub(crate) tags: Mutex<HashMap<String, TagId>>,
}

impl Movie {
    pub fn new(id: MovieId, key: String, title: String) -> Self {
        Self {
            id,
            key,
            title,
            rating: AtomicU32::new(UNRATED.to_bits()),
            director: Mutex::new(None),
            cast: Mutex::new(HashSet::new()),
            tags: Mutex::new(HashMap::new()),
        }
    }

    pub fn id(&self) -> MovieId {
        self.id
    }

    /// External IMDb key, e.g. `tt0000001`.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Current rating, `None` while unrated.
    pub fn rating(&self) -> Option<f32> {
        let value = f32::from_bits(self.rating.load(Ordering::Acquire));
        (value >= 0.0).then_some(value)
    }

    /// Overwrite the rating. Last write wins.
    pub fn set_rating(&self, rating: f32) {
        self.rating.store(rating.to_bits(), Ordering::Release);
    }

    pub fn director(&self) -> Option<PersonId> {
        *self.director.lock()
    }

    /// Snapshot of the cast, sorted by id.
    pub fn cast(&self) -> Vec<PersonId> {
        sorted(&self.cast.lock())
    }

    /// Snapshot of the tag set, sorted by id.
    pub fn tags(&self) -> Vec<TagId> {
        let mut ids: Vec<TagId> = self.tags.lock().values().copied().collect();
        ids.sort_unstable();
        ids
    }
}

// =============================================================================
// Person
// =============================================================================

/// Descriptive fields of a person, replaced as a whole on refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonDetails {
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_year: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub death_year: Option<u16>,
}

impl PersonDetails {
    /// Split a raw IMDb name at its first space: `"Fred Astaire Jr."` gives
    /// first name `Fred` and last name `Astaire Jr.`.
    pub fn from_full_name(full_name: &str, birth_year: Option<u16>, death_year: Option<u16>) -> Self {
        let (first, last) = match full_name.split_once(' ') {
            Some((first, rest)) if !first.is_empty() => (first, rest),
            _ => (full_name, ""),
        };
        Self {
            first_name: first.to_string(),
            last_name: last.to_string(),
            birth_year,
            death_year,
        }
    }

    pub fn full_name(&self) -> String {
        if self.last_name.is_empty() {
            self.first_name.clone()
        } else {
            format!("{} {}", self.first_name, self.last_name)
        }
    }
}

/// A person node under construction. One per external key.
#[derive(Debug)]
pub struct Person {
    id: PersonId,
    key: String,
    pub(crate) details: RwLock<PersonDetails>,
    pub(crate) acted: Mutex<HashSet<MovieId>>,
    pub(crate) directed: Mutex<HashSet<MovieId>>,
}

impl Person {
    pub fn new(id: PersonId, key: String, details: PersonDetails) -> Self {
        Self {
            id,
            key,
            details: RwLock::new(details),
            acted: Mutex::new(HashSet::new()),
            directed: Mutex::new(HashSet::new()),
        }
    }

    pub fn id(&self) -> PersonId {
        self.id
    }

    /// External IMDb key, e.g. `nm0000001`.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn details(&self) -> PersonDetails {
        self.details.read().clone()
    }

    pub fn full_name(&self) -> String {
        self.details.read().full_name()
    }

    pub fn acted(&self) -> Vec<MovieId> {
        sorted(&self.acted.lock())
    }

    pub fn directed(&self) -> Vec<MovieId> {
        sorted(&self.directed.lock())
    }
}

// =============================================================================
// Tag
// =============================================================================

/// A MovieLens tag, identified by its tag-code.
#[derive(Debug)]
pub struct Tag {
    id: TagId,
    code: u32,
    name: String,
    pub(crate) movies: Mutex<HashSet<MovieId>>,
}

impl Tag {
    pub fn new(id: TagId, code: u32, name: String) -> Self {
        Self {
            id,
            code,
            name,
            movies: Mutex::new(HashSet::new()),
        }
    }

    pub fn id(&self) -> TagId {
        self.id
    }

    pub fn code(&self) -> u32 {
        self.code
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn movies(&self) -> Vec<MovieId> {
        sorted(&self.movies.lock())
    }
}

fn sorted<T: Copy + Ord>(set: &HashSet<T>) -> Vec<T> {
    let mut items: Vec<T> = set.iter().copied().collect();
    items.sort_unstable();
    items
}

// =============================================================================
// Tests
// =============================================================================
