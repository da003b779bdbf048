//! Plain-text views of a loaded graph, used by the CLI.
//!
//! Every view returns a `String` so the shell and the one-shot commands
//! print the same thing and tests can assert on it.

use std::cmp::Ordering;
use std::fmt::Write;

use crate::graph::{GraphIndexes, GraphStats, MovieGraph, MovieNode};

/// Cast members and tags shown in the movie view.
pub const MOVIE_LIST_LIMIT: usize = 15;

/// Movies shown in the person and tag views.
pub const FILMOGRAPHY_LIMIT: usize = 20;

pub fn format_rating(rating: Option<f32>) -> String {
    match rating {
        Some(r) => format!("{r:.1}/10"),
        None => "N/A".to_string(),
    }
}

/// Movie details: rating, director, first cast members and tags by name.
pub fn movie_view(graph: &MovieGraph, indexes: &GraphIndexes, title: &str) -> Option<String> {
    let movie = indexes.movie_by_title(graph, title)?;
    let mut out = String::new();

    let _ = writeln!(out, "{} ({})", movie.title, movie.key);
    let _ = writeln!(out, "  Rating:   {}", format_rating(movie.rating));
    let director = graph
        .director_of(movie)
        .map(|p| p.full_name())
        .unwrap_or_else(|| "N/A".to_string());
    let _ = writeln!(out, "  Director: {director}");

    let mut cast: Vec<String> = graph.cast_of(movie).iter().map(|p| p.full_name()).collect();
    cast.sort();
    write_list(&mut out, "Actors", &cast);

    let mut tags: Vec<String> = graph.tags_of(movie).iter().map(|t| t.name.clone()).collect();
    tags.sort();
    tags.dedup();
    write_list(&mut out, "Tags", &tags);

    let others = indexes.movie_ids_by_title(title).len() - 1;
    if others > 0 {
        let _ = writeln!(out, "  ({others} more movie(s) share this title)");
    }
    Some(out)
}

/// A person's movies, best rated first, each labelled with the role.
pub fn person_view(graph: &MovieGraph, indexes: &GraphIndexes, name: &str) -> Option<String> {
    let person = indexes.person_by_name(graph, name)?;
    let mut out = String::new();

    let _ = write!(out, "{} ({})", person.full_name(), person.key);
    match (person.birth_year, person.death_year) {
        (Some(born), Some(died)) => {
            let _ = write!(out, " {born}-{died}");
        }
        (Some(born), None) => {
            let _ = write!(out, " b. {born}");
        }
        _ => {}
    }
    out.push('\n');

    let mut movies = graph.movies_of(&person.movies());
    sort_by_rating(&mut movies);
    let _ = writeln!(out, "  Movies ({}):", movies.len());
    for movie in movies.iter().take(FILMOGRAPHY_LIMIT) {
        let directed = person.directed.binary_search(&movie.id).is_ok();
        let acted = person.acted.binary_search(&movie.id).is_ok();
        let role = match (directed, acted) {
            (true, true) => "Director, Actor",
            (true, false) => "Director",
            _ => "Actor",
        };
        let _ = writeln!(
            out,
            "    {:<15} {} [{}]",
            role,
            movie.title,
            format_rating(movie.rating)
        );
    }
    Some(out)
}

/// Movies carrying a tag, best rated first.
pub fn tag_view(graph: &MovieGraph, indexes: &GraphIndexes, tag: &str) -> Option<String> {
    let mut movies = indexes.movies_by_tag(graph, tag);
    if movies.is_empty() {
        return None;
    }
    sort_by_rating(&mut movies);

    let mut out = String::new();
    let _ = writeln!(out, "Tag '{}' ({} movies):", tag, movies.len());
    for movie in movies.iter().take(FILMOGRAPHY_LIMIT) {
        let _ = writeln!(out, "    {} [{}]", movie.title, format_rating(movie.rating));
    }
    Some(out)
}

pub fn stats_view(stats: &GraphStats) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Movies:               {}", stats.movies);
    let _ = writeln!(out, "  with rating:        {}", stats.rated_movies);
    let _ = writeln!(out, "  with director:      {}", stats.movies_with_director);
    let _ = writeln!(out, "  with actors:        {}", stats.movies_with_cast);
    let _ = writeln!(out, "  with tags:          {}", stats.movies_with_tags);
    let _ = writeln!(out, "People:               {}", stats.people);
    let _ = writeln!(out, "  with movies:        {}", stats.people_with_movies);
    let _ = writeln!(out, "Tags:                 {}", stats.tags);
    let _ = writeln!(out, "  in use:             {}", stats.tags_in_use);
    let average = stats
        .average_rating
        .map(|r| format!("{r:.2}"))
        .unwrap_or_else(|| "N/A".to_string());
    let _ = writeln!(out, "Average rating:       {average}");
    out
}

fn write_list(out: &mut String, label: &str, items: &[String]) {
    if items.is_empty() {
        let _ = writeln!(out, "  {label}: none");
        return;
    }
    let shown: Vec<&str> = items.iter().take(MOVIE_LIST_LIMIT).map(String::as_str).collect();
    let _ = write!(out, "  {label} ({}): {}", items.len(), shown.join(", "));
    if items.len() > MOVIE_LIST_LIMIT {
        out.push_str(", ...");
    }
    out.push('\n');
}

/// Highest rating first, unrated last, ties by id.
fn sort_by_rating(movies: &mut [&MovieNode]) {
    movies.sort_by(|a, b| match (a.rating, b.rating) {
        (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal).then(a.id.cmp(&b.id)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.id.cmp(&b.id),
    });
}
