//! Read-only graph produced at the end of a load.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::models::{Movie, MovieId, Person, PersonId, Tag, TagId};

// =============================================================================
// Nodes
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MovieNode {
    pub id: MovieId,
    pub key: String,
    pub title: String,
    pub rating: Option<f32>,
    pub director: Option<PersonId>,
    /// Sorted by id.
    pub cast: Vec<PersonId>,
    /// Sorted by id.
    pub tags: Vec<TagId>,
}

impl MovieNode {
    pub(crate) fn from_live(movie: &Movie) -> Self {
        Self {
            id: movie.id(),
            key: movie.key().to_string(),
            title: movie.title().to_string(),
            rating: movie.rating(),
            director: movie.director(),
            cast: movie.cast(),
            tags: movie.tags(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersonNode {
    pub id: PersonId,
    pub key: String,
    pub first_name: String,
    pub last_name: String,
    pub birth_year: Option<u16>,
    pub death_year: Option<u16>,
    pub acted: Vec<MovieId>,
    pub directed: Vec<MovieId>,
}

impl PersonNode {
    pub(crate) fn from_live(person: &Person) -> Self {
        let details = person.details();
        Self {
            id: person.id(),
            key: person.key().to_string(),
            first_name: details.first_name,
            last_name: details.last_name,
            birth_year: details.birth_year,
            death_year: details.death_year,
            acted: person.acted(),
            directed: person.directed(),
        }
    }

    pub fn full_name(&self) -> String {
        if self.last_name.is_empty() {
            self.first_name.clone()
        } else {
            format!("{} {}", self.first_name, self.last_name)
        }
    }

    /// Every movie the person acted in or directed, sorted, without repeats.
    pub fn movies(&self) -> Vec<MovieId> {
        let mut all: Vec<MovieId> = self.acted.iter().chain(&self.directed).copied().collect();
        all.sort_unstable();
        all.dedup();
        all
    }

    pub fn has_movies(&self) -> bool {
        !self.acted.is_empty() || !self.directed.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagNode {
    pub id: TagId,
    pub code: u32,
    pub name: String,
    pub movies: Vec<MovieId>,
}

impl TagNode {
    pub(crate) fn from_live(tag: &Tag) -> Self {
        Self {
            id: tag.id(),
            code: tag.code(),
            name: tag.name().to_string(),
            movies: tag.movies(),
        }
    }
}

// =============================================================================
// Statistics
// =============================================================================

/// Summary counts of a frozen graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphStats {
    pub movies: usize,
    pub rated_movies: usize,
    pub movies_with_director: usize,
    pub movies_with_cast: usize,
    pub movies_with_tags: usize,
    pub people: usize,
    pub people_with_movies: usize,
    pub tags: usize,
    /// Distinct tag names attached to at least one movie.
    pub tags_in_use: usize,
    /// Mean over rated movies only.
    pub average_rating: Option<f64>,
}

// =============================================================================
// Symmetry
// =============================================================================

/// A relationship recorded on one side only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Asymmetry {
    Direction { movie: MovieId, person: PersonId },
    Cast { movie: MovieId, person: PersonId },
    Tagging { movie: MovieId, tag: TagId },
}

// =============================================================================
// Movie Graph
// =============================================================================

/// Immutable movie/person/tag graph. Node `i` of each vector has id `i`.
#[derive(Debug, Clone, Default)]
pub struct MovieGraph {
    movies: Vec<MovieNode>,
    people: Vec<PersonNode>,
    tags: Vec<TagNode>,
    movielens_links: HashMap<u32, String>,
    movie_keys: HashMap<String, MovieId>,
    person_keys: HashMap<String, PersonId>,
    tag_codes: HashMap<u32, TagId>,
}

impl MovieGraph {
    pub(crate) fn new(
        movies: Vec<MovieNode>,
        people: Vec<PersonNode>,
        tags: Vec<TagNode>,
        movielens_links: HashMap<u32, String>,
    ) -> Self {
        let movie_keys = movies.iter().map(|m| (m.key.clone(), m.id)).collect();
        let person_keys = people.iter().map(|p| (p.key.clone(), p.id)).collect();
        let tag_codes = tags.iter().map(|t| (t.code, t.id)).collect();
        Self {
            movies,
            people,
            tags,
            movielens_links,
            movie_keys,
            person_keys,
            tag_codes,
        }
    }

    pub fn movies(&self) -> &[MovieNode] {
        &self.movies
    }

    pub fn people(&self) -> &[PersonNode] {
        &self.people
    }

    pub fn tags(&self) -> &[TagNode] {
        &self.tags
    }

    pub fn movie(&self, id: MovieId) -> Option<&MovieNode> {
        self.movies.get(id.index())
    }

    pub fn person(&self, id: PersonId) -> Option<&PersonNode> {
        self.people.get(id.index())
    }

    pub fn tag(&self, id: TagId) -> Option<&TagNode> {
        self.tags.get(id.index())
    }

    pub fn movie_by_key(&self, key: &str) -> Option<&MovieNode> {
        self.movie_keys.get(key).and_then(|&id| self.movie(id))
    }

    pub fn person_by_key(&self, key: &str) -> Option<&PersonNode> {
        self.person_keys.get(key).and_then(|&id| self.person(id))
    }

    pub fn tag_by_code(&self, code: u32) -> Option<&TagNode> {
        self.tag_codes.get(&code).and_then(|&id| self.tag(id))
    }

    /// IMDb key of a MovieLens movie id.
    pub fn translate(&self, movielens_id: u32) -> Option<&str> {
        self.movielens_links.get(&movielens_id).map(String::as_str)
    }

    pub fn link_count(&self) -> usize {
        self.movielens_links.len()
    }

    pub fn director_of(&self, movie: &MovieNode) -> Option<&PersonNode> {
        movie.director.and_then(|id| self.person(id))
    }

    pub fn cast_of(&self, movie: &MovieNode) -> Vec<&PersonNode> {
        movie.cast.iter().filter_map(|&id| self.person(id)).collect()
    }

    pub fn tags_of(&self, movie: &MovieNode) -> Vec<&TagNode> {
        movie.tags.iter().filter_map(|&id| self.tag(id)).collect()
    }

    pub fn movies_of(&self, ids: &[MovieId]) -> Vec<&MovieNode> {
        ids.iter().filter_map(|&id| self.movie(id)).collect()
    }

    pub fn stats(&self) -> GraphStats {
        let ratings: Vec<f64> = self
            .movies
            .iter()
            .filter_map(|m| m.rating.map(f64::from))
            .collect();
        let average_rating =
            (!ratings.is_empty()).then(|| ratings.iter().sum::<f64>() / ratings.len() as f64);

        let tags_in_use: HashSet<&str> = self
            .tags
            .iter()
            .filter(|t| !t.movies.is_empty())
            .map(|t| t.name.as_str())
            .collect();

        GraphStats {
            movies: self.movies.len(),
            rated_movies: ratings.len(),
            movies_with_director: self.movies.iter().filter(|m| m.director.is_some()).count(),
            movies_with_cast: self.movies.iter().filter(|m| !m.cast.is_empty()).count(),
            movies_with_tags: self.movies.iter().filter(|m| !m.tags.is_empty()).count(),
            people: self.people.len(),
            people_with_movies: self.people.iter().filter(|p| p.has_movies()).count(),
            tags: self.tags.len(),
            tags_in_use: tags_in_use.len(),
            average_rating,
        }
    }

    /// Every edge recorded on only one of its two endpoints. Empty for a
    /// graph built by the merge operations.
    pub fn check_symmetry(&self) -> Vec<Asymmetry> {
        let mut found = Vec::new();

        for movie in &self.movies {
            if let Some(person) = movie.director {
                let mirrored = self
                    .person(person)
                    .is_some_and(|p| p.directed.binary_search(&movie.id).is_ok());
                if !mirrored {
                    found.push(Asymmetry::Direction { movie: movie.id, person });
                }
            }
            for &person in &movie.cast {
                let mirrored = self
                    .person(person)
                    .is_some_and(|p| p.acted.binary_search(&movie.id).is_ok());
                if !mirrored {
                    found.push(Asymmetry::Cast { movie: movie.id, person });
                }
            }
            for &tag in &movie.tags {
                let mirrored = self
                    .tag(tag)
                    .is_some_and(|t| t.movies.binary_search(&movie.id).is_ok());
                if !mirrored {
                    found.push(Asymmetry::Tagging { movie: movie.id, tag });
                }
            }
        }

        for person in &self.people {
            for &movie in &person.directed {
                if self.movie(movie).and_then(|m| m.director) != Some(person.id) {
                    found.push(Asymmetry::Direction { movie, person: person.id });
                }
            }
            for &movie in &person.acted {
                let mirrored = self
                    .movie(movie)
                    .is_some_and(|m| m.cast.binary_search(&person.id).is_ok());
                if !mirrored {
                    found.push(Asymmetry::Cast { movie, person: person.id });
                }
            }
        }

        for tag in &self.tags {
            for &movie in &tag.movies {
                let mirrored = self
                    .movie(movie)
                    .is_some_and(|m| m.tags.binary_search(&tag.id).is_ok());
                if !mirrored {
                    found.push(Asymmetry::Tagging { movie, tag: tag.id });
                }
            }
        }

        found.sort_unstable();
        found.dedup();
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn movie(id: u32, rating: Option<f32>, director: Option<u32>, cast: &[u32]) -> MovieNode {
        MovieNode {
            id: MovieId(id),
            key: format!("tt{:07}", id + 1),
            title: format!("Movie {id}"),
            rating,
            director: director.map(PersonId),
            cast: cast.iter().copied().map(PersonId).collect(),
            tags: Vec::new(),
        }
    }

    fn person(id: u32, acted: &[u32], directed: &[u32]) -> PersonNode {
        PersonNode {
            id: PersonId(id),
            key: format!("nm{:07}", id + 1),
            first_name: format!("Person{id}"),
            last_name: String::new(),
            birth_year: None,
            death_year: None,
            acted: acted.iter().copied().map(MovieId).collect(),
            directed: directed.iter().copied().map(MovieId).collect(),
        }
    }

    #[test]
    fn test_stats() {
        let graph = MovieGraph::new(
            vec![
                movie(0, Some(8.0), Some(0), &[1]),
                movie(1, Some(6.0), None, &[]),
                movie(2, None, None, &[1]),
            ],
            vec![person(0, &[], &[0]), person(1, &[0, 2], &[]), person(2, &[], &[])],
            vec![],
            HashMap::new(),
        );

        let stats = graph.stats();
        assert_eq!(stats.movies, 3);
        assert_eq!(stats.rated_movies, 2);
        assert_eq!(stats.average_rating, Some(7.0));
        assert_eq!(stats.movies_with_director, 1);
        assert_eq!(stats.movies_with_cast, 2);
        assert_eq!(stats.people, 3);
        assert_eq!(stats.people_with_movies, 2);
        assert!(graph.check_symmetry().is_empty());
    }

    #[test]
    fn test_check_symmetry_reports_both_directions() {
        let graph = MovieGraph::new(
            vec![movie(0, None, Some(0), &[1])],
            vec![person(0, &[], &[]), person(1, &[], &[]), person(2, &[0], &[])],
            vec![],
            HashMap::new(),
        );

        let found = graph.check_symmetry();
        assert_eq!(
            found,
            vec![
                Asymmetry::Direction { movie: MovieId(0), person: PersonId(0) },
                Asymmetry::Cast { movie: MovieId(0), person: PersonId(1) },
                Asymmetry::Cast { movie: MovieId(0), person: PersonId(2) },
            ]
        );
    }

    #[test]
    fn test_lookup_by_key() {
        let graph = MovieGraph::new(
            vec![movie(0, None, None, &[])],
            vec![person(0, &[], &[])],
            vec![],
            HashMap::from([(1, "tt0000001".to_string())]),
        );
        assert_eq!(graph.movie_by_key("tt0000001").map(|m| m.id), Some(MovieId(0)));
        assert_eq!(graph.person_by_key("nm0000001").map(|p| p.full_name()), Some("Person0".into()));
        assert_eq!(graph.translate(1), Some("tt0000001"));
        assert!(graph.movie_by_key("tt0000002").is_none());
    }

    #[test]
    fn test_person_movies_union() {
        let p = person(0, &[3, 1], &[1, 2]);
        assert_eq!(p.movies(), vec![MovieId(1), MovieId(2), MovieId(3)]);
    }
}
