// Mood tags derived from genre, rating and runtime

use std::collections::BTreeSet;

use crate::models::CatalogEntry;

/// Genre -> tags. Genres outside the table contribute nothing.
static GENRE_MOODS: [(&str, [&str; 3]); 15] = [
    ("Horror", ["scary", "intense", "dark"]),
    ("Comedy", ["funny", "lighthearted", "uplifting"]),
    ("Drama", ["emotional", "thought-provoking", "serious"]),
    ("Action", ["exciting", "intense", "adrenaline"]),
    ("Romance", ["romantic", "heartwarming", "emotional"]),
    ("Thriller", ["suspenseful", "intense", "edge-of-seat"]),
    ("Sci-Fi", ["futuristic", "mind-bending", "imaginative"]),
    ("Fantasy", ["magical", "escapist", "imaginative"]),
    ("Documentary", ["educational", "informative", "real"]),
    ("Animation", ["family-friendly", "colorful", "imaginative"]),
    ("Crime", ["gritty", "dark", "intense"]),
    ("Mystery", ["puzzling", "suspenseful", "intriguing"]),
    ("War", ["intense", "dramatic", "historical"]),
    ("Western", ["classic", "adventurous", "rugged"]),
    ("Musical", ["uplifting", "entertaining", "melodic"]),
];

const EPIC_RUNTIME_MINUTES: i32 = 180;
const QUICK_WATCH_MINUTES: i32 = 90;

fn genre_moods(genre: &str) -> &'static [&'static str] {
    GENRE_MOODS
        .iter()
        .find(|(name, _)| *name == genre)
        .map(|(_, tags)| tags.as_slice())
        .unwrap_or(&[])
}

fn rating_mood(imdb_rating: Option<&str>) -> Option<&'static str> {
    let rating: f64 = imdb_rating?.trim().parse().ok()?;
    if rating >= 8.0 {
        Some("highly-rated")
    } else if rating >= 7.0 {
        Some("well-received")
    } else if rating < 5.0 {
        Some("controversial")
    } else {
        None
    }
}

fn runtime_mood(runtime: Option<i32>) -> Option<&'static str> {
    match runtime? {
        r if r > EPIC_RUNTIME_MINUTES => Some("epic"),
        r if r > 0 && r < QUICK_WATCH_MINUTES => Some("quick-watch"),
        _ => None,
    }
}

/// Deduplicated mood tags for a metadata record
pub fn derive_mood_tags(entry: &CatalogEntry) -> BTreeSet<String> {
    entry
        .genres
        .iter()
        .flat_map(|g| genre_moods(g).iter().copied())
        .chain(rating_mood(entry.imdb_rating.as_deref()))
        .chain(runtime_mood(entry.runtime))
        .map(str::to_string)
        .collect()
}
