use serde::{Deserialize, Serialize};

/// Catalog media kind. The two kinds share one id space per kind only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Movie,
    #[serde(alias = "tv")]
    Series,
}

impl MediaKind {
    pub const ALL: [MediaKind; 2] = [MediaKind::Movie, MediaKind::Series];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Movie => "movie",
            Self::Series => "series",
        }
    }

    /// Path segment the upstream catalog uses for this kind.
    pub fn upstream_segment(self) -> &'static str {
        match self {
            Self::Movie => "movie",
            Self::Series => "tv",
        }
    }

    /// Short label shown next to an item.
    pub fn label(self) -> &'static str {
        match self {
            Self::Movie => "Movie",
            Self::Series => "TV",
        }
    }

    /// Parse either the canonical name or the upstream discriminator.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "movie" | "movies" => Some(Self::Movie),
            "series" | "tv" => Some(Self::Series),
            _ => None,
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical catalog item produced by normalization.
///
/// `year` is either four characters or empty, `poster_url` may be empty, and
/// `genres` holds resolved display names in the upstream id order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaItem {
    pub id: u64,
    pub kind: MediaKind,
    pub title: String,
    pub year: String,
    pub poster_url: String,
    pub rating: Option<String>,
    pub genres: Vec<String>,
}

impl MediaItem {
    /// Year as a number for sorting. The whole trimmed string must parse as
    /// an integer; anything else (including an empty year) counts as 0.
    pub fn year_value(&self) -> i32 {
        self.year.trim().parse().unwrap_or(0)
    }

    /// Rating as a number for sorting; a missing rating counts as 0.
    pub fn rating_value(&self) -> f64 {
        self.rating
            .as_deref()
            .and_then(|r| r.trim().parse().ok())
            .unwrap_or(0.0)
    }

    pub fn type_label(&self) -> &'static str {
        self.kind.label()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_parses_upstream_and_canonical_names() {
        assert_eq!(MediaKind::parse("tv"), Some(MediaKind::Series));
        assert_eq!(MediaKind::parse(" Series "), Some(MediaKind::Series));
        assert_eq!(MediaKind::parse("movie"), Some(MediaKind::Movie));
        assert_eq!(MediaKind::parse("person"), None);
    }

    #[test]
    fn kind_serde_accepts_tv_alias() {
        let kind: MediaKind = serde_json::from_str("\"tv\"").unwrap();
        assert_eq!(kind, MediaKind::Series);
        assert_eq!(serde_json::to_string(&kind).unwrap(), "\"series\"");
    }

    #[test]
    fn missing_numbers_sort_as_zero() {
        let item = MediaItem {
            id: 1,
            kind: MediaKind::Movie,
            title: "Untitled".into(),
            year: String::new(),
            poster_url: String::new(),
            rating: None,
            genres: vec![],
        };
        assert_eq!(item.year_value(), 0);
        assert_eq!(item.rating_value(), 0.0);
        assert_eq!(item.type_label(), "Movie");
    }

    #[test]
    fn partial_year_sorts_as_zero() {
        let mut item = MediaItem {
            id: 1,
            kind: MediaKind::Movie,
            title: "Untitled".into(),
            year: "20a1".into(),
            poster_url: String::new(),
            rating: None,
            genres: vec![],
        };
        assert_eq!(item.year_value(), 0);
        item.year = " 2001 ".into();
        assert_eq!(item.year_value(), 2001);
    }
}
