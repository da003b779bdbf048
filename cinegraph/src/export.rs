//! Snapshot export.
//!
//! Writes a frozen graph as five CSV tables keyed by surrogate id, the
//! layout a relational bulk import expects:
//!
//! | file               | columns                                        |
//! |--------------------|------------------------------------------------|
//! | `movies.csv`       | id, key, title, rating, director_id            |
//! | `people.csv`       | id, key, first_name, last_name, birth, death   |
//! | `tags.csv`         | id, code, name                                 |
//! | `movie_actors.csv` | movie_id, person_id                            |
//! | `movie_tags.csv`   | movie_id, tag_id                               |

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use crate::error::ExportResult;
use crate::graph::MovieGraph;
use crate::models::{MovieId, PersonId, TagId};
use crate::report::LoadReport;

pub const MOVIES_FILE: &str = "movies.csv";
pub const PEOPLE_FILE: &str = "people.csv";
pub const TAGS_FILE: &str = "tags.csv";
pub const MOVIE_ACTORS_FILE: &str = "movie_actors.csv";
pub const MOVIE_TAGS_FILE: &str = "movie_tags.csv";

// =============================================================================
// Rows
// =============================================================================

#[derive(Serialize)]
struct MovieRow<'a> {
    id: MovieId,
    key: &'a str,
    title: &'a str,
    rating: Option<f32>,
    director_id: Option<PersonId>,
}

#[derive(Serialize)]
struct PersonRow<'a> {
    id: PersonId,
    key: &'a str,
    first_name: &'a str,
    last_name: &'a str,
    birth_year: Option<u16>,
    death_year: Option<u16>,
}

#[derive(Serialize)]
struct TagRow<'a> {
    id: TagId,
    code: u32,
    name: &'a str,
}

#[derive(Serialize)]
struct MovieActorRow {
    movie_id: MovieId,
    person_id: PersonId,
}

#[derive(Serialize)]
struct MovieTagRow {
    movie_id: MovieId,
    tag_id: TagId,
}

/// Row counts of a written snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SnapshotSummary {
    pub dir: PathBuf,
    pub movies: usize,
    pub people: usize,
    pub tags: usize,
    pub movie_actors: usize,
    pub movie_tags: usize,
}

// =============================================================================
// Writers
// =============================================================================

/// Write the five snapshot tables into `dir`, creating it if needed.
pub fn write_csv_snapshot(graph: &MovieGraph, dir: &Path) -> ExportResult<SnapshotSummary> {
    fs::create_dir_all(dir)?;
    let mut summary = SnapshotSummary {
        dir: dir.to_path_buf(),
        ..SnapshotSummary::default()
    };

    summary.movies = write_rows(
        &dir.join(MOVIES_FILE),
        graph.movies().iter().map(|m| MovieRow {
            id: m.id,
            key: &m.key,
            title: &m.title,
            rating: m.rating,
            director_id: m.director,
        }),
    )?;

    summary.people = write_rows(
        &dir.join(PEOPLE_FILE),
        graph.people().iter().map(|p| PersonRow {
            id: p.id,
            key: &p.key,
            first_name: &p.first_name,
            last_name: &p.last_name,
            birth_year: p.birth_year,
            death_year: p.death_year,
        }),
    )?;

    summary.tags = write_rows(
        &dir.join(TAGS_FILE),
        graph.tags().iter().map(|t| TagRow {
            id: t.id,
            code: t.code,
            name: &t.name,
        }),
    )?;

    summary.movie_actors = write_rows(
        &dir.join(MOVIE_ACTORS_FILE),
        graph.movies().iter().flat_map(|m| {
            m.cast.iter().map(move |&person_id| MovieActorRow {
                movie_id: m.id,
                person_id,
            })
        }),
    )?;

    summary.movie_tags = write_rows(
        &dir.join(MOVIE_TAGS_FILE),
        graph.movies().iter().flat_map(|m| {
            m.tags.iter().map(move |&tag_id| MovieTagRow {
                movie_id: m.id,
                tag_id,
            })
        }),
    )?;

    info!(
        dir = %dir.display(),
        movies = summary.movies,
        people = summary.people,
        tags = summary.tags,
        "snapshot written"
    );
    Ok(summary)
}

/// Write a load report as pretty-printed JSON.
pub fn write_report_json(report: &LoadReport, path: &Path) -> ExportResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, report.to_json()?)?;
    Ok(())
}

fn write_rows<R: Serialize>(path: &Path, rows: impl Iterator<Item = R>) -> ExportResult<usize> {
    let mut writer = csv::Writer::from_path(path)?;
    let mut count = 0;
    for row in rows {
        writer.serialize(row)?;
        count += 1;
    }
    writer.flush()?;
    Ok(count)
}
