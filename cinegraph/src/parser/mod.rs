//! Typed record parsers, one per dataset.
//!
//! Each parser turns an accepted [`Line`] into a small value struct that
//! travels through the parse/merge boundary. Parsers only check shape: keys
//! carry their IMDb prefix, numbers parse, years are `\N` or integers. Any
//! failure yields a [`RecordError`]; the coordinator counts it and moves on.

pub mod fields;

use std::str::FromStr;

use serde::Serialize;

use crate::error::{RecordError, RecordResult};
use crate::models::Role;
use crate::pipeline::Line;

use fields::{quoted_fields, split_once_field, unquote, COMMA, TAB};

/// IMDb placeholder for "no value".
pub const NO_VALUE: &str = "\\N";

/// Digits an IMDb title key is padded to.
const IMDB_TITLE_DIGITS: usize = 7;

// =============================================================================
// Records
// =============================================================================

/// `MovieCodes_IMDB.tsv`: title key and title.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MovieRecord {
    pub key: String,
    pub title: String,
}

/// `ActorsDirectorsNames_IMDB.txt`: person key, name and life span.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersonRecord {
    pub key: String,
    pub full_name: String,
    pub birth_year: Option<u16>,
    pub death_year: Option<u16>,
}

/// `ActorsDirectorsCodes_IMDB.tsv`: one person in one movie.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoleRecord {
    pub movie_key: String,
    pub person_key: String,
    pub role: Role,
}

/// `Ratings_IMDB.tsv`: average rating of a title.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingRecord {
    pub movie_key: String,
    pub rating: f32,
}

/// `links_IMDB_MovieLens.csv`: MovieLens id to canonical IMDb key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkRecord {
    pub movielens_id: u32,
    pub imdb_key: String,
}

/// `TagCodes_MovieLens.csv`: tag code and display name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagCodeRecord {
    pub code: u32,
    pub name: String,
}

/// `TagScores_MovieLens.csv`: a relevant tag on a MovieLens movie.
///
/// Relevance was already checked by the filter, so it is not carried.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagScoreRecord {
    pub movielens_id: u32,
    pub code: u32,
}

// =============================================================================
// Parsers
// =============================================================================

pub fn parse_movie(line: &Line) -> RecordResult<MovieRecord> {
    let [key, title] = fields::fields(&line.text, TAB, [0, 2]);
    let key = imdb_key(line.number, "titleId", key, "tt")?;
    let title = non_empty(line.number, "title", title)?;

    Ok(MovieRecord {
        key: key.to_string(),
        title: title.to_string(),
    })
}

pub fn parse_person(line: &Line) -> RecordResult<PersonRecord> {
    let [key, name, birth, death] = fields::fields(&line.text, TAB, [0, 1, 2, 3]);
    let key = imdb_key(line.number, "nconst", key, "nm")?;
    let name = non_empty(line.number, "primaryName", name)?;

    Ok(PersonRecord {
        key: key.to_string(),
        full_name: name.to_string(),
        birth_year: year(line.number, "birthYear", birth)?,
        death_year: year(line.number, "deathYear", death)?,
    })
}

pub fn parse_role(line: &Line) -> RecordResult<RoleRecord> {
    let [movie, person, category] = fields::fields(&line.text, TAB, [0, 2, 3]);
    let movie = imdb_key(line.number, "tconst", movie, "tt")?;
    let person = imdb_key(line.number, "nconst", person, "nm")?;
    let category = category.ok_or_else(|| RecordError::missing(line.number, "category"))?;
    let role = Role::from_category(category).ok_or_else(|| {
        RecordError::new(line.number, "unsupported role category")
            .with_field("category")
            .with_value(category)
    })?;

    Ok(RoleRecord {
        movie_key: movie.to_string(),
        person_key: person.to_string(),
        role,
    })
}

pub fn parse_rating(line: &Line) -> RecordResult<RatingRecord> {
    let [key, rating] = fields::fields(&line.text, TAB, [0, 1]);
    let key = imdb_key(line.number, "tconst", key, "tt")?;
    let rating: f32 = number(line.number, "averageRating", rating)?;
    if !(0.0..=10.0).contains(&rating) {
        return Err(RecordError::new(line.number, "rating outside 0-10")
            .with_field("averageRating")
            .with_value(&rating.to_string()));
    }

    Ok(RatingRecord {
        movie_key: key.to_string(),
        rating,
    })
}

pub fn parse_link(line: &Line) -> RecordResult<LinkRecord> {
    let [movielens_id, imdb_id] = quoted_fields(&line.text, [0, 1]);
    let movielens_id = number(line.number, "movieId", movielens_id.as_deref())?;
    let raw = imdb_id.ok_or_else(|| RecordError::missing(line.number, "imdbId"))?;
    let imdb_key = canonical_title_key(&raw).ok_or_else(|| {
        RecordError::new(line.number, "not a numeric IMDb id")
            .with_field("imdbId")
            .with_value(&raw)
    })?;

    Ok(LinkRecord {
        movielens_id,
        imdb_key,
    })
}

pub fn parse_tag_code(line: &Line) -> RecordResult<TagCodeRecord> {
    let (code, rest) = split_once_field(&line.text, COMMA)
        .ok_or_else(|| RecordError::missing(line.number, "tag"))?;
    let code = number(line.number, "tagId", Some(code))?;
    let name = unquote(rest);
    if name.trim().is_empty() {
        return Err(RecordError::missing(line.number, "tag"));
    }

    Ok(TagCodeRecord {
        code,
        name: name.into_owned(),
    })
}

pub fn parse_tag_score(line: &Line) -> RecordResult<TagScoreRecord> {
    let [movielens_id, code] = quoted_fields(&line.text, [0, 1]);

    Ok(TagScoreRecord {
        movielens_id: number(line.number, "movieId", movielens_id.as_deref())?,
        code: number(line.number, "tagId", code.as_deref())?,
    })
}

// =============================================================================
// Shape Checks
// =============================================================================

/// Normalize a MovieLens `imdbId` column (`"114709"`, `"0114709"` or
/// `"tt0114709"`) to the canonical `tt` key padded to seven digits.
pub fn canonical_title_key(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let digits = raw.strip_prefix("tt").unwrap_or(raw);
    if !is_digits(digits) {
        return None;
    }
    Some(format!("tt{:0>width$}", digits, width = IMDB_TITLE_DIGITS))
}

fn imdb_key<'a>(
    line: usize,
    field: &'static str,
    value: Option<&'a str>,
    prefix: &str,
) -> RecordResult<&'a str> {
    let value = value.ok_or_else(|| RecordError::missing(line, field))?;
    match value.strip_prefix(prefix) {
        Some(digits) if is_digits(digits) => Ok(value),
        _ => Err(RecordError::new(line, format!("expected '{prefix}' followed by digits"))
            .with_field(field)
            .with_value(value)),
    }
}

fn non_empty<'a>(line: usize, field: &'static str, value: Option<&'a str>) -> RecordResult<&'a str> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(RecordError::missing(line, field)),
    }
}

fn number<T: FromStr>(line: usize, field: &'static str, value: Option<&str>) -> RecordResult<T> {
    let value = value.ok_or_else(|| RecordError::missing(line, field))?;
    value.trim().parse().map_err(|_| {
        RecordError::new(line, "not a number")
            .with_field(field)
            .with_value(value)
    })
}

fn year(line: usize, field: &'static str, value: Option<&str>) -> RecordResult<Option<u16>> {
    match value {
        None => Err(RecordError::missing(line, field)),
        Some(v) if v == NO_VALUE || v.is_empty() => Ok(None),
        Some(v) => number(line, field, Some(v)).map(Some),
    }
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

// =============================================================================
// Tests
// =============================================================================
