//! Tag list handling. Tags compare case-sensitively and keep the order in
//! which they first appear.

use std::collections::HashSet;

/// Splits a comma-separated tag string, trimming each tag and dropping empties.
pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

/// Concatenates the sources in order and drops repeats.
pub fn dedup_concat<'a, I>(sources: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a [String]>,
{
    let mut seen = HashSet::new();
    let mut merged = Vec::new();
    for tag in sources.into_iter().flatten() {
        if seen.insert(tag.as_str()) {
            merged.push(tag.clone());
        }
    }
    merged
}

/// Effective tags for one search: globals (when enabled), then group tags,
/// then the user's own.
pub fn compose_tags(
    global: &[String],
    use_global: bool,
    custom: &[String],
    user_raw: &str,
) -> Vec<String> {
    let user = parse_tags(user_raw);
    let global: &[String] = if use_global { global } else { &[] };
    dedup_concat([global, custom, user.as_slice()])
}

pub fn add_tags(current: &[String], added: &[String]) -> Vec<String> {
    dedup_concat([current, added])
}

pub fn remove_tags(current: &[String], removed: &[String]) -> Vec<String> {
    let removed: HashSet<&str> = removed.iter().map(String::as_str).collect();
    current
        .iter()
        .filter(|tag| !removed.contains(tag.as_str()))
        .cloned()
        .collect()
}

/// Comma-joined list for chat output, or "none".
pub fn display(tags: &[String]) -> String {
    if tags.is_empty() {
        "none".to_string()
    } else {
        tags.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owned(tags: &[&str]) -> Vec<String> {
        tags.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn parse_trims_and_drops_empty() {
        assert_eq!(parse_tags(" safe , ,cute,, pinkie pie "), owned(&["safe", "cute", "pinkie pie"]));
        assert!(parse_tags("").is_empty());
        assert!(parse_tags(" , ").is_empty());
    }

    #[test]
    fn compose_orders_globals_customs_then_user() {
        let effective = compose_tags(&owned(&["safe"]), true, &owned(&["art"]), "safe, art, cute");
        assert_eq!(effective, owned(&["safe", "art", "cute"]));

        let again = compose_tags(&owned(&["safe"]), true, &owned(&["art"]), "safe, art, cute");
        assert_eq!(effective, again);
    }

    #[test]
    fn compose_skips_globals_when_disabled() {
        let effective = compose_tags(&owned(&["safe"]), false, &owned(&["art"]), "cute");
        assert_eq!(effective, owned(&["art", "cute"]));
    }

    #[test]
    fn dedup_is_case_sensitive() {
        let effective = compose_tags(&[], false, &owned(&["Safe"]), "safe");
        assert_eq!(effective, owned(&["Safe", "safe"]));
    }

    #[test]
    fn add_then_remove_restores_list() {
        let before = owned(&["art", "cute"]);
        for tag in ["solo", "pinkie pie", "score.gte:100"] {
            let added = add_tags(&before, &owned(&[tag]));
            assert!(added.contains(&tag.to_string()));
            assert_eq!(remove_tags(&added, &owned(&[tag])), before);
        }
    }

    #[test]
    fn add_ignores_existing_and_remove_needs_exact_match() {
        let current = owned(&["art"]);
        assert_eq!(add_tags(&current, &owned(&["art", "cute", "cute"])), owned(&["art", "cute"]));
        assert_eq!(remove_tags(&current, &owned(&["Art", "ar"])), current);
    }

    #[test]
    fn display_empty_as_none() {
        assert_eq!(display(&[]), "none");
        assert_eq!(display(&owned(&["a", "b"])), "a, b");
    }
}
