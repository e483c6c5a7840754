//! Astronomy show model
//!
//! An astronomy show is the catalogue entry that show sessions are scheduled
//! for. It carries a set of themes; the set is stored in the
//! `astronomy_show_themes` link table and always loaded in theme id order.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::ShowTheme;

/// Most distinct ids accepted in one id list filter
pub const MAX_FILTER_IDS: usize = 100;

/// Astronomy show entity with its themes
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AstronomyShow {
    pub id: i64,
    pub title: String,
    /// Free text, empty when not supplied
    pub description: String,
    /// Associated themes, ordered by theme id
    pub show_themes: Vec<ShowTheme>,
}

impl AstronomyShow {
    /// Create a new show without themes; the ID is assigned by the database.
    pub fn new(title: String, description: String) -> Self {
        Self {
            id: 0,
            title,
            description,
            show_themes: Vec::new(),
        }
    }

    /// Theme names in display order
    pub fn theme_names(&self) -> Vec<String> {
        self.show_themes.iter().map(|t| t.name.clone()).collect()
    }

    /// Whether the show carries the theme with the given ID
    pub fn has_theme(&self, theme_id: i64) -> bool {
        self.show_themes.iter().any(|t| t.id == theme_id)
    }
}

/// Input for creating an astronomy show
#[derive(Debug, Clone, Default)]
pub struct CreateAstronomyShowInput {
    pub title: String,
    pub description: String,
    /// IDs of existing themes; duplicates collapse to one link
    pub show_themes: Vec<i64>,
}

/// Filters accepted by the show listing.
///
/// Both filters are optional and combine with AND.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AstronomyShowFilter {
    /// Case-insensitive substring of the title
    pub title: Option<String>,
    /// Keep shows having any of these themes, plus shows with no theme at all
    pub theme_ids: Option<Vec<i64>>,
}

impl AstronomyShowFilter {
    /// Build a filter from raw query values.
    ///
    /// Blank values mean "no filter". A theme list token that is not an
    /// integer is rejected with a message naming the token.
    pub fn from_query(title: Option<&str>, genres: Option<&str>) -> Result<Self, String> {
        let title = title
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string);

        let theme_ids = match genres.map(str::trim).filter(|g| !g.is_empty()) {
            Some(raw) => Some(parse_id_list(raw)?),
            None => None,
        };

        Ok(Self { title, theme_ids })
    }

    /// Evaluate the filter against a loaded show.
    ///
    /// Mirrors the SQL built by the repository and is used to check it.
    pub fn matches(&self, show: &AstronomyShow) -> bool {
        if let Some(title) = &self.title {
            if !show.title.to_lowercase().contains(&title.to_lowercase()) {
                return false;
            }
        }

        if let Some(ids) = &self.theme_ids {
            if !show.show_themes.is_empty() && !ids.iter().any(|id| show.has_theme(*id)) {
                return false;
            }
        }

        true
    }
}

/// Parse a comma-separated list of integer IDs ("1,2, 3").
///
/// Duplicates collapse and the result is in ascending order. More than
/// `MAX_FILTER_IDS` distinct ids are rejected.
pub fn parse_id_list(raw: &str) -> Result<Vec<i64>, String> {
    let ids = raw
        .split(',')
        .map(str::trim)
        .map(|token| {
            token
                .parse::<i64>()
                .map_err(|_| format!("Invalid id in list: '{}'", token))
        })
        .collect::<Result<BTreeSet<i64>, String>>()?;

    if ids.len() > MAX_FILTER_IDS {
        return Err(format!("At most {} distinct ids can be listed", MAX_FILTER_IDS));
    }

    Ok(ids.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn theme(id: i64, name: &str) -> ShowTheme {
        ShowTheme {
            id,
            name: name.to_string(),
        }
    }

    fn show(title: &str, themes: Vec<ShowTheme>) -> AstronomyShow {
        AstronomyShow {
            id: 1,
            title: title.to_string(),
            description: String::new(),
            show_themes: themes,
        }
    }

    #[test]
    fn test_parse_id_list() {
        assert_eq!(parse_id_list("1,2,3").unwrap(), vec![1, 2, 3]);
        assert_eq!(parse_id_list(" 4 , 5 ").unwrap(), vec![4, 5]);
        assert!(parse_id_list("1,abc").is_err());
        assert!(parse_id_list("1,,2").is_err());
    }

    #[test]
    fn test_parse_id_list_collapses_duplicates() {
        assert_eq!(parse_id_list("3,1,3,1,1").unwrap(), vec![1, 3]);

        let repeated = vec!["7"; 10_000].join(",");
        assert_eq!(parse_id_list(&repeated).unwrap(), vec![7]);
    }

    #[test]
    fn test_parse_id_list_limit() {
        let at_limit = (1..=MAX_FILTER_IDS as i64).map(|i| i.to_string()).collect::<Vec<_>>().join(",");
        assert_eq!(parse_id_list(&at_limit).unwrap().len(), MAX_FILTER_IDS);

        let over_limit = format!("{},{}", at_limit, MAX_FILTER_IDS + 1);
        let err = parse_id_list(&over_limit).unwrap_err();
        assert!(err.contains("100"));
    }

    #[test]
    fn test_from_query_blank_values_are_ignored() {
        let filter = AstronomyShowFilter::from_query(Some("  "), Some("")).unwrap();
        assert_eq!(filter, AstronomyShowFilter::default());
    }

    #[test]
    fn test_from_query_rejects_bad_genre() {
        let err = AstronomyShowFilter::from_query(None, Some("1,x")).unwrap_err();
        assert!(err.contains("'x'"));
    }

    #[test]
    fn test_title_match_is_case_insensitive() {
        let filter = AstronomyShowFilter::from_query(Some("TEST show 1"), None).unwrap();
        assert!(filter.matches(&show("test show 1", vec![])));
        assert!(!filter.matches(&show("test show 2", vec![])));
    }

    #[test]
    fn test_theme_match_keeps_unthemed_shows() {
        let filter = AstronomyShowFilter::from_query(None, Some("1,2")).unwrap();

        assert!(filter.matches(&show("a", vec![theme(1, "Stars")])));
        assert!(filter.matches(&show("b", vec![theme(2, "Planets"), theme(3, "Moons")])));
        assert!(filter.matches(&show("c", vec![])));
        assert!(!filter.matches(&show("d", vec![theme(3, "Moons")])));
    }

    #[test]
    fn test_theme_names() {
        let s = show("a", vec![theme(1, "Stars"), theme(2, "Planets")]);
        assert_eq!(s.theme_names(), vec!["Stars", "Planets"]);
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_id_list_parses_joined_ids(ids in prop::collection::vec(any::<i64>(), 1..20)) {
            let raw = ids.iter().map(|i| i.to_string()).collect::<Vec<_>>().join(",");
            let expected: Vec<i64> = ids.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();
            prop_assert_eq!(parse_id_list(&raw).unwrap(), expected);
        }

        #[test]
        fn prop_non_numeric_token_is_rejected(
            ids in prop::collection::vec(0i64..1000, 0..5),
            bad in "[a-z]{1,6}",
        ) {
            let mut tokens: Vec<String> = ids.iter().map(|i| i.to_string()).collect();
            tokens.push(bad);
            prop_assert!(parse_id_list(&tokens.join(",")).is_err());
        }

        #[test]
        fn prop_title_filter_matches_any_case(title in "[a-zA-Z ]{1,30}") {
            prop_assume!(!title.trim().is_empty());
            let filter = AstronomyShowFilter::from_query(Some(&title.to_uppercase()), None).unwrap();
            let candidate = AstronomyShow::new(format!("x{}y", title.to_lowercase()), String::new());
            prop_assert!(filter.matches(&candidate));
        }
    }
}
