//! The seven input datasets and how each one is wired into a pipeline.
//!
//! A [`Dataset`] knows its default file name, delimiter, channel capacity and
//! load [`Phase`]. [`load_dataset`] binds the dataset's filter, parser and
//! merge operation to a [`Pipeline`] run.

pub mod filters;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::LoaderConfig;
use crate::error::LoadResult;
use crate::graph::EntityGraph;
use crate::observe::LoadObserver;
use crate::parser::{self, fields};
use crate::pipeline::Pipeline;
use crate::report::DatasetReport;

// =============================================================================
// Dataset
// =============================================================================

/// One of the flat-file exports the loader consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dataset {
    Movies,
    People,
    TagCodes,
    IdLinks,
    Ratings,
    RoleLinks,
    TagScores,
}

impl Dataset {
    pub const ALL: [Dataset; 7] = [
        Dataset::Movies,
        Dataset::People,
        Dataset::TagCodes,
        Dataset::IdLinks,
        Dataset::Ratings,
        Dataset::RoleLinks,
        Dataset::TagScores,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Movies => "movies",
            Self::People => "people",
            Self::TagCodes => "tag codes",
            Self::IdLinks => "id links",
            Self::Ratings => "ratings",
            Self::RoleLinks => "role links",
            Self::TagScores => "tag scores",
        }
    }

    /// File name inside the data directory when the config does not
    /// override it.
    pub fn default_file_name(&self) -> &'static str {
        match self {
            Self::Movies => "MovieCodes_IMDB.tsv",
            Self::People => "ActorsDirectorsNames_IMDB.txt",
            Self::TagCodes => "TagCodes_MovieLens.csv",
            Self::IdLinks => "links_IMDB_MovieLens.csv",
            Self::Ratings => "Ratings_IMDB.tsv",
            Self::RoleLinks => "ActorsDirectorsCodes_IMDB.tsv",
            Self::TagScores => "TagScores_MovieLens.csv",
        }
    }

    pub fn delimiter(&self) -> u8 {
        match self {
            Self::Movies | Self::People | Self::Ratings | Self::RoleLinks => fields::TAB,
            Self::TagCodes | Self::IdLinks | Self::TagScores => fields::COMMA,
        }
    }

    /// Bounded channel capacity used when the config sets none.
    pub fn default_capacity(&self) -> usize {
        match self {
            Self::TagCodes | Self::IdLinks => 1_000,
            _ => 10_000,
        }
    }

    pub fn phase(&self) -> Phase {
        match self {
            Self::Movies | Self::People | Self::TagCodes | Self::IdLinks => Phase::Entities,
            Self::Ratings | Self::RoleLinks | Self::TagScores => Phase::Relations,
        }
    }

    /// Whether a structural filter runs before parsing.
    pub fn is_filtered(&self) -> bool {
        matches!(self, Self::Movies | Self::RoleLinks | Self::TagScores)
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Phase
// =============================================================================

/// Load phases. Every pipeline of a phase has finished before the next
/// phase starts, so relation datasets always see complete entity maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Movies, people, tag codes and the MovieLens id table.
    Entities,
    /// Ratings, role links and tag scores.
    Relations,
}

impl Phase {
    pub const ALL: [Phase; 2] = [Phase::Entities, Phase::Relations];

    pub fn number(&self) -> u8 {
        match self {
            Self::Entities => 1,
            Self::Relations => 2,
        }
    }

    pub fn datasets(&self) -> Vec<Dataset> {
        Dataset::ALL
            .into_iter()
            .filter(|d| d.phase() == *self)
            .collect()
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Entities => write!(f, "phase 1 (entities)"),
            Self::Relations => write!(f, "phase 2 (relations)"),
        }
    }
}

// =============================================================================
// Bindings
// =============================================================================

/// Run the full pipeline of one dataset against `graph`.
pub fn load_dataset(
    dataset: Dataset,
    graph: &EntityGraph,
    config: &LoaderConfig,
    observer: &dyn LoadObserver,
) -> LoadResult<DatasetReport> {
    let path = config.path_for(dataset);
    let rules = &config.rules;
    let pipeline = Pipeline::new(dataset, &path, config.pipeline_options(dataset));

    match dataset {
        Dataset::Movies => pipeline
            .with_filter(|line| filters::movie_line(line, rules))
            .run(observer, parser::parse_movie, |r| graph.insert_movie(r)),
        Dataset::People => pipeline.run(observer, parser::parse_person, |r| graph.upsert_person(r)),
        Dataset::TagCodes => pipeline.run(observer, parser::parse_tag_code, |r| graph.insert_tag(r)),
        Dataset::IdLinks => pipeline.run(observer, parser::parse_link, |r| graph.insert_link(r)),
        Dataset::Ratings => pipeline.run(observer, parser::parse_rating, |r| graph.set_rating(r)),
        Dataset::RoleLinks => pipeline
            .with_filter(|line| filters::role_line(line, rules))
            .run(observer, parser::parse_role, |r| graph.attach_role(r)),
        Dataset::TagScores => pipeline
            .with_filter(|line| filters::tag_score_line(line, rules))
            .run(observer, parser::parse_tag_score, |r| graph.attach_tag(r)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_membership() {
        assert_eq!(
            Phase::Entities.datasets(),
            vec![Dataset::Movies, Dataset::People, Dataset::TagCodes, Dataset::IdLinks]
        );
        assert_eq!(
            Phase::Relations.datasets(),
            vec![Dataset::Ratings, Dataset::RoleLinks, Dataset::TagScores]
        );
    }

    #[test]
    fn test_dataset_display_and_serde() {
        assert_eq!(Dataset::RoleLinks.to_string(), "role links");
        assert_eq!(serde_json::to_string(&Dataset::IdLinks).unwrap(), "\"id_links\"");
        assert_eq!(Phase::Relations.to_string(), "phase 2 (relations)");
    }

    #[test]
    fn test_delimiters_follow_file_type() {
        for dataset in Dataset::ALL {
            let expected = if dataset.default_file_name().ends_with(".csv") {
                fields::COMMA
            } else {
                fields::TAB
            };
            assert_eq!(dataset.delimiter(), expected, "{dataset}");
        }
    }
}
