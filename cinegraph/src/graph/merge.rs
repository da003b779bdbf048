//! Merge operations: one typed record in, one [`MergeOutcome`] out.
//!
//! Three contracts:
//!
//! - insert-if-absent for movies, tags and id links (first writer wins)
//! - upsert for ratings and person details (last writer wins)
//! - attach-edge for roles and tags (both endpoints must exist)
//!
//! Edges are written on both sides while holding the movie-side lock, then
//! the person-side or tag-side lock. No code path takes them the other way
//! round.

use std::collections::hash_map::Entry as HashEntry;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;

use crate::models::{Movie, Person, PersonDetails, Tag};
use crate::parser::{
    LinkRecord, MovieRecord, PersonRecord, RatingRecord, RoleRecord, TagCodeRecord,
    TagScoreRecord,
};

use super::{EntityGraph, MergeOutcome};

impl EntityGraph {
    // =========================================================================
    // Insert-if-absent
    // =========================================================================

    pub fn insert_movie(&self, record: MovieRecord) -> MergeOutcome {
        match self.movies.entry(record.key) {
            Entry::Occupied(_) => MergeOutcome::Duplicate,
            Entry::Vacant(slot) => {
                let id = self.allocate_movie();
                let key = slot.key().clone();
                slot.insert(Arc::new(Movie::new(id, key, record.title)));
                MergeOutcome::Inserted
            }
        }
    }

    pub fn insert_tag(&self, record: TagCodeRecord) -> MergeOutcome {
        match self.tags.entry(record.code) {
            Entry::Occupied(_) => MergeOutcome::Duplicate,
            Entry::Vacant(slot) => {
                let id = self.allocate_tag();
                slot.insert(Arc::new(Tag::new(id, record.code, record.name)));
                MergeOutcome::Inserted
            }
        }
    }

    pub fn insert_link(&self, record: LinkRecord) -> MergeOutcome {
        match self.movielens_links.entry(record.movielens_id) {
            Entry::Occupied(_) => MergeOutcome::Duplicate,
            Entry::Vacant(slot) => {
                slot.insert(record.imdb_key);
                MergeOutcome::Inserted
            }
        }
    }

    // =========================================================================
    // Upsert
    // =========================================================================

    /// Insert a person, or refresh name and years of an existing one.
    pub fn upsert_person(&self, record: PersonRecord) -> MergeOutcome {
        let details =
            PersonDetails::from_full_name(&record.full_name, record.birth_year, record.death_year);
        match self.people.entry(record.key) {
            Entry::Occupied(existing) => {
                *existing.get().details.write() = details;
                MergeOutcome::Updated
            }
            Entry::Vacant(slot) => {
                let id = self.allocate_person();
                let key = slot.key().clone();
                slot.insert(Arc::new(Person::new(id, key, details)));
                MergeOutcome::Inserted
            }
        }
    }

    pub fn set_rating(&self, record: RatingRecord) -> MergeOutcome {
        match self.movie(&record.movie_key) {
            Some(movie) => {
                movie.set_rating(record.rating);
                MergeOutcome::Updated
            }
            None => MergeOutcome::JoinMiss,
        }
    }

    // =========================================================================
    // Attach-edge
    // =========================================================================

    /// Attach a director or cast edge between a movie and a person.
    ///
    /// A movie keeps its first director; a later, different director counts
    /// as a duplicate so both sides of the edge stay in agreement.
    pub fn attach_role(&self, record: RoleRecord) -> MergeOutcome {
        let (Some(movie), Some(person)) =
            (self.movie(&record.movie_key), self.person(&record.person_key))
        else {
            return MergeOutcome::JoinMiss;
        };

        if record.role.is_director() {
            let mut director = movie.director.lock();
            if director.is_some() {
                return MergeOutcome::Duplicate;
            }
            *director = Some(person.id());
            person.directed.lock().insert(movie.id());
        } else {
            let mut cast = movie.cast.lock();
            if !cast.insert(person.id()) {
                return MergeOutcome::Duplicate;
            }
            person.acted.lock().insert(movie.id());
        }
        MergeOutcome::Linked
    }

    /// Attach a tag to the movie its MovieLens id translates to.
    ///
    /// A movie carries each tag name once; a second code with an already
    /// attached name counts as a duplicate.
    pub fn attach_tag(&self, record: TagScoreRecord) -> MergeOutcome {
        let Some(key) = self.translate(record.movielens_id) else {
            return MergeOutcome::JoinMiss;
        };
        let (Some(movie), Some(tag)) = (self.movie(&key), self.tag(record.code)) else {
            return MergeOutcome::JoinMiss;
        };

        let mut tags = movie.tags.lock();
        match tags.entry(tag.name().to_string()) {
            HashEntry::Occupied(_) => MergeOutcome::Duplicate,
            HashEntry::Vacant(slot) => {
                slot.insert(tag.id());
                tag.movies.lock().insert(movie.id());
                MergeOutcome::Linked
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MovieId, PersonId, Role};
    use std::thread;

    fn movie(key: &str, title: &str) -> MovieRecord {
        MovieRecord {
            key: key.into(),
            title: title.into(),
        }
    }

    fn person(key: &str, name: &str) -> PersonRecord {
        PersonRecord {
            key: key.into(),
            full_name: name.into(),
            birth_year: None,
            death_year: None,
        }
    }

    fn role(movie_key: &str, person_key: &str, role: Role) -> RoleRecord {
        RoleRecord {
            movie_key: movie_key.into(),
            person_key: person_key.into(),
            role,
        }
    }

    #[test]
    fn test_insert_movie_is_idempotent() {
        let graph = EntityGraph::new();
        assert_eq!(graph.insert_movie(movie("tt0000001", "Carmencita")), MergeOutcome::Inserted);
        let id = graph.movie("tt0000001").unwrap().id();

        assert_eq!(graph.insert_movie(movie("tt0000001", "Other")), MergeOutcome::Duplicate);
        let again = graph.movie("tt0000001").unwrap();
        assert_eq!(again.id(), id);
        assert_eq!(again.title(), "Carmencita");
        assert_eq!(graph.movie_count(), 1);
    }

    #[test]
    fn test_concurrent_inserts_allocate_dense_ids() {
        let graph = EntityGraph::new();
        thread::scope(|s| {
            for worker in 0..4 {
                let graph = &graph;
                s.spawn(move || {
                    for i in 0..250 {
                        // every key is inserted by all four workers
                        let key = format!("tt{:07}", i);
                        graph.insert_movie(movie(&key, &format!("Movie {i} by {worker}")));
                    }
                });
            }
        });

        assert_eq!(graph.movie_count(), 250);
        let frozen = graph.freeze();
        for (index, node) in frozen.movies().iter().enumerate() {
            assert_eq!(node.id, MovieId(index as u32));
        }
    }

    #[test]
    fn test_upsert_person_refreshes_details() {
        let graph = EntityGraph::new();
        assert_eq!(graph.upsert_person(person("nm0000001", "Fred Astair")), MergeOutcome::Inserted);
        let id = graph.person("nm0000001").unwrap().id();

        let mut fixed = person("nm0000001", "Fred Astaire");
        fixed.birth_year = Some(1899);
        assert_eq!(graph.upsert_person(fixed), MergeOutcome::Updated);

        let stored = graph.person("nm0000001").unwrap();
        assert_eq!(stored.id(), id);
        assert_eq!(stored.full_name(), "Fred Astaire");
        assert_eq!(stored.details().birth_year, Some(1899));
    }

    #[test]
    fn test_rating_join_miss() {
        let graph = EntityGraph::new();
        let outcome = graph.set_rating(RatingRecord {
            movie_key: "tt9999999".into(),
            rating: 7.0,
        });
        assert_eq!(outcome, MergeOutcome::JoinMiss);
        assert_eq!(graph.movie_count(), 0);
    }

    #[test]
    fn test_attach_role_both_sides() {
        let graph = EntityGraph::new();
        graph.insert_movie(movie("tt0000001", "Carmencita"));
        graph.upsert_person(person("nm0000001", "William K.L. Dickson"));
        graph.upsert_person(person("nm0000002", "Carmencita"));

        assert_eq!(
            graph.attach_role(role("tt0000001", "nm0000001", Role::Director)),
            MergeOutcome::Linked
        );
        assert_eq!(
            graph.attach_role(role("tt0000001", "nm0000002", Role::Actress)),
            MergeOutcome::Linked
        );
        assert_eq!(
            graph.attach_role(role("tt0000001", "nm0000002", Role::Actress)),
            MergeOutcome::Duplicate
        );
        // second director is refused
        assert_eq!(
            graph.attach_role(role("tt0000001", "nm0000002", Role::Director)),
            MergeOutcome::Duplicate
        );

        let film = graph.movie("tt0000001").unwrap();
        let director = graph.person("nm0000001").unwrap();
        let actress = graph.person("nm0000002").unwrap();
        assert_eq!(film.director(), Some(director.id()));
        assert_eq!(film.cast(), vec![actress.id()]);
        assert_eq!(director.directed(), vec![film.id()]);
        assert_eq!(actress.acted(), vec![film.id()]);
        assert!(actress.directed().is_empty());
    }

    #[test]
    fn test_attach_role_join_miss_leaves_graph_untouched() {
        let graph = EntityGraph::new();
        graph.insert_movie(movie("tt0000001", "Carmencita"));

        let outcome = graph.attach_role(role("tt0000001", "nm0000404", Role::Actor));
        assert_eq!(outcome, MergeOutcome::JoinMiss);
        assert!(graph.movie("tt0000001").unwrap().cast().is_empty());
        assert_eq!(graph.person_count(), 0);
    }

    #[test]
    fn test_attach_tag_through_link() {
        let graph = EntityGraph::new();
        graph.insert_movie(movie("tt0114709", "Toy Story"));
        graph.insert_tag(TagCodeRecord {
            code: 7,
            name: "pixar animation".into(),
        });
        graph.insert_link(LinkRecord {
            movielens_id: 1,
            imdb_key: "tt0114709".into(),
        });

        let score = |movielens_id| TagScoreRecord { movielens_id, code: 7 };
        assert_eq!(graph.attach_tag(score(1)), MergeOutcome::Linked);
        assert_eq!(graph.attach_tag(score(1)), MergeOutcome::Duplicate);
        assert_eq!(graph.attach_tag(score(2)), MergeOutcome::JoinMiss);

        let toy_story = graph.movie("tt0114709").unwrap();
        let tag = graph.tag(7).unwrap();
        assert_eq!(toy_story.tags(), vec![tag.id()]);
        assert_eq!(tag.movies(), vec![toy_story.id()]);
    }

    #[test]
    fn test_tag_codes_sharing_a_name_attach_once() {
        let graph = EntityGraph::new();
        graph.insert_movie(movie("tt0033467", "Citizen Kane"));
        graph.insert_link(LinkRecord {
            movielens_id: 923,
            imdb_key: "tt0033467".into(),
        });
        for code in [1, 2] {
            graph.insert_tag(TagCodeRecord {
                code,
                name: "noir".into(),
            });
        }

        let score = |code| TagScoreRecord { movielens_id: 923, code };
        assert_eq!(graph.attach_tag(score(1)), MergeOutcome::Linked);
        assert_eq!(graph.attach_tag(score(2)), MergeOutcome::Duplicate);

        let kane = graph.movie("tt0033467").unwrap();
        assert_eq!(kane.tags(), vec![graph.tag(1).unwrap().id()]);
        assert!(graph.tag(2).unwrap().movies().is_empty());

        let frozen = graph.freeze();
        let kane = frozen.movie_by_key("tt0033467").unwrap();
        let names: Vec<&str> = frozen.tags_of(kane).iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["noir"]);
        assert!(frozen.check_symmetry().is_empty());
    }

    #[test]
    fn test_concurrent_person_upserts_converge() {
        let graph = EntityGraph::new();
        graph.insert_movie(movie("tt0000001", "Carmencita"));

        thread::scope(|s| {
            for worker in 0..4 {
                let graph = &graph;
                s.spawn(move || {
                    for i in 0..50 {
                        // workers walk the keys in different orders
                        let p = if worker % 2 == 0 { i } else { 49 - i };
                        graph.upsert_person(person(&format!("nm{:07}", p), &format!("Worker {worker}")));
                    }
                });
            }
        });

        assert_eq!(graph.person_count(), 50);
        let mut ids: Vec<u32> = (0..50)
            .map(|p| graph.person(&format!("nm{:07}", p)).unwrap().id().0)
            .collect();
        ids.sort_unstable();
        assert_eq!(ids, (0..50).collect::<Vec<u32>>());

        let before: Vec<Arc<Person>> = (0..50)
            .map(|p| graph.person(&format!("nm{:07}", p)).unwrap())
            .collect();
        thread::scope(|s| {
            for _ in 0..4 {
                let graph = &graph;
                s.spawn(move || {
                    for p in 0..50 {
                        graph.attach_role(role("tt0000001", &format!("nm{:07}", p), Role::Actor));
                    }
                });
            }
        });

        let film = graph.movie("tt0000001").unwrap();
        assert_eq!(film.cast().len(), 50);
        for (p, earlier) in before.iter().enumerate() {
            let current = graph.person(&format!("nm{:07}", p)).unwrap();
            assert!(Arc::ptr_eq(earlier, &current));
            assert_eq!(current.acted(), vec![film.id()]);
        }
        assert_eq!(graph.person_count(), 50);
    }

    #[test]
    fn test_concurrent_cast_attach_is_symmetric() {
        let graph = EntityGraph::new();
        for m in 0..20 {
            graph.insert_movie(movie(&format!("tt{:07}", m), "M"));
        }
        for p in 0..20 {
            graph.upsert_person(person(&format!("nm{:07}", p), "P"));
        }

        thread::scope(|s| {
            for worker in 0..4 {
                let graph = &graph;
                s.spawn(move || {
                    for m in 0..20 {
                        for p in 0..20 {
                            let kind = if (m + p + worker) % 7 == 0 { Role::Director } else { Role::Actor };
                            graph.attach_role(role(&format!("tt{:07}", m), &format!("nm{:07}", p), kind));
                        }
                    }
                });
            }
        });

        let frozen = graph.freeze();
        assert!(frozen.check_symmetry().is_empty());
        assert!(frozen.movies().iter().all(|m| m.cast.len() <= 20));
        assert!(frozen.people().iter().any(|p| p.acted.len() == 20));
        assert!(frozen.person(PersonId(19)).is_some());
        assert!(frozen.person(PersonId(20)).is_none());
    }
}
