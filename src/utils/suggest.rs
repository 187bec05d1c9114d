//! "Did you mean" lookups for tool names, fields and enum values.

fn normalize(value: &str) -> Vec<char> {
    value
        .trim()
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

fn edit_distance(a: &[char], b: &[char]) -> usize {
    if a.is_empty() {
        return b.len();
    }
    let mut row: Vec<usize> = (0..=b.len()).collect();
    for (i, ca) in a.iter().enumerate() {
        let mut diagonal = row[0];
        row[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let above = row[j + 1];
            let substitution = diagonal + usize::from(ca != cb);
            row[j + 1] = substitution.min(above + 1).min(row[j] + 1);
            diagonal = above;
        }
    }
    row[b.len()]
}

fn contains(haystack: &[char], needle: &[char]) -> bool {
    needle.len() <= haystack.len() && haystack.windows(needle.len()).any(|w| w == needle)
}

/// Up to `limit` candidates close to `input`, closest (then shortest) first.
pub fn suggest(input: &str, candidates: &[String], limit: usize) -> Vec<String> {
    let wanted = normalize(input);
    if wanted.is_empty() || candidates.is_empty() {
        return Vec::new();
    }
    let allowed = match wanted.len() {
        0..=4 => 1,
        5..=8 => 2,
        n => (n * 35 / 100).max(3),
    };

    let mut scored: Vec<(usize, &String)> = candidates
        .iter()
        .filter_map(|candidate| {
            let other = normalize(candidate);
            if other.is_empty() {
                return None;
            }
            let score = if other == wanted {
                0
            } else if contains(&other, &wanted) || contains(&wanted, &other) {
                1
            } else {
                edit_distance(&wanted, &other)
            };
            (score <= allowed).then_some((score, candidate))
        })
        .collect();
    scored.sort_by(|a, b| {
        a.0.cmp(&b.0)
            .then_with(|| a.1.len().cmp(&b.1.len()))
            .then_with(|| a.1.cmp(b.1))
    });
    scored.dedup_by(|a, b| a.1 == b.1);
    scored
        .into_iter()
        .take(limit.max(1))
        .map(|(_, candidate)| candidate.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn close_tool_names_are_suggested() {
        let known = names(&["ss_list_environments", "ss_rollback_env", "fg_invoke"]);
        assert_eq!(suggest("ss_list_enviroments", &known, 3), vec!["ss_list_environments"]);
        assert_eq!(suggest("invoke", &known, 3), vec!["fg_invoke"]);
        assert!(suggest("zzz", &known, 3).is_empty());
    }

    #[test]
    fn edit_distance_counts_chars_not_bytes() {
        assert_eq!(edit_distance(&normalize("kitten"), &normalize("sitting")), 3);
        assert_eq!(edit_distance(&[], &normalize("abc")), 3);
    }
}
