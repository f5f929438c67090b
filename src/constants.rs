/// Fixed YouTube category id -> display name table.
///
/// Ids absent from this table render as [`UNCLASSIFIED_CATEGORY`] and are the
/// rows matched by the special "unknown" category selector.
pub const CATEGORY_MAPPING: &[(&str, &str)] = &[
    ("1", "Film & Animation"),
    ("2", "Autos & Vehicles"),
    ("10", "Music"),
    ("15", "Pets & Animals"),
    ("17", "Sports"),
    ("18", "Short Movies"),
    ("19", "Travel & Events"),
    ("20", "Gaming"),
    ("21", "Videoblogging"),
    ("22", "People & Blogs"),
    ("23", "Comedy"),
    ("24", "Entertainment"),
    ("25", "News & Politics"),
    ("26", "Howto & Style"),
    ("27", "Education"),
    ("28", "Science & Technology"),
    ("29", "Nonprofits & Activism"),
    ("30", "Movies"),
    ("31", "Anime/Animation"),
    ("32", "Action/Adventure"),
    ("33", "Classics"),
    ("34", "Comedy"),
    ("35", "Documentary"),
    ("36", "Drama"),
    ("37", "Family"),
    ("38", "Foreign"),
    ("39", "Horror"),
    ("40", "Sci-Fi/Fantasy"),
    ("41", "Thriller"),
    ("42", "Shorts"),
    ("43", "Shows"),
    ("44", "Trailers"),
];

pub const UNCLASSIFIED_CATEGORY: &str = "Unclassified";

pub fn category_display_name(category_id: &str) -> &'static str {
    let id = category_id.trim();
    CATEGORY_MAPPING
        .iter()
        .find(|(key, _)| *key == id)
        .map(|(_, name)| *name)
        .unwrap_or(UNCLASSIFIED_CATEGORY)
}

/// True when the id has no entry in the category table.
pub fn is_unclassified(category_id: &str) -> bool {
    let id = category_id.trim();
    !CATEGORY_MAPPING.iter().any(|(key, _)| *key == id)
}

/// Coarse duration bucket labels shown in filter dropdowns and exports.
pub const DURATION_LABELS: &[(&str, &str)] = &[
    ("short", "Short (<=2 min)"),
    ("normal", "Normal (2-10 min)"),
    ("medium", "Medium (10-20 min)"),
    ("long", "Long (20-35 min)"),
    ("movie", "Movie (>=35 min)"),
    ("unknown", "Unknown"),
];

pub fn duration_label(category: &str) -> &'static str {
    DURATION_LABELS
        .iter()
        .find(|(key, _)| *key == category)
        .map(|(_, label)| *label)
        .unwrap_or("Unknown")
}
