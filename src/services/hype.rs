// Hype score: external ratings blended with the user's own rating

use crate::models::CatalogItem;

/// Weight of the user rating relative to each external rating
const USER_RATING_WEIGHT: usize = 2;

/// Mean of the parseable ratings, rounded to one decimal (ties to even), 0.0 when
/// there are none.
///
/// `imdb` is on a 0-10 scale, `rt` is a percentage such as `"83%"`.
pub fn hype_score(imdb: Option<&str>, rt: Option<&str>, user_rating: Option<i32>) -> f64 {
    let mut scores = Vec::with_capacity(2 + USER_RATING_WEIGHT);

    if let Some(score) = imdb.and_then(|r| r.trim().parse::<f64>().ok()) {
        scores.push(score);
    }

    if let Some(score) = rt.and_then(|r| r.trim().trim_end_matches('%').trim().parse::<f64>().ok()) {
        scores.push(score / 10.0);
    }

    if let Some(rating) = user_rating {
        scores.extend(std::iter::repeat(f64::from(rating)).take(USER_RATING_WEIGHT));
    }

    if scores.is_empty() {
        return 0.0;
    }

    let mean = scores.iter().sum::<f64>() / scores.len() as f64;
    (mean * 10.0).round_ties_even() / 10.0
}

pub fn item_hype_score(item: &CatalogItem) -> f64 {
    hype_score(
        item.metadata.imdb_rating.as_deref(),
        item.metadata.rt_rating.as_deref(),
        item.user_rating,
    )
}
