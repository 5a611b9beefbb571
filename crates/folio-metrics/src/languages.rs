//! Language distribution across a user's own repositories.

use serde::Serialize;

use folio_core::Repository;

/// Number of repositories whose primary language is `name`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LanguageShare {
    /// Language name as reported by the host.
    pub name: String,
    /// Repository count.
    pub value: usize,
}

impl LanguageShare {
    /// Share of `total` in percent; 0 when `total` is 0.
    #[must_use]
    pub fn percent_of(&self, total: usize) -> f64 {
        if total == 0 {
            return 0.0;
        }
        self.value as f64 / total as f64 * 100.0
    }
}

/// Counts primary languages, most used first.
///
/// Forks and repositories without a detected language are ignored. Ties keep
/// the order in which languages were first seen.
#[must_use]
pub fn language_shares(repos: &[Repository]) -> Vec<LanguageShare> {
    let mut shares: Vec<LanguageShare> = Vec::new();

    for language in repos
        .iter()
        .filter(|r| !r.fork)
        .filter_map(|r| r.language.as_deref())
        .filter(|l| !l.is_empty())
    {
        match shares.iter_mut().find(|s| s.name == language) {
            Some(share) => share.value += 1,
            None => shares.push(LanguageShare {
                name: language.to_string(),
                value: 1,
            }),
        }
    }

    // Stable sort keeps first-seen order among equal counts.
    shares.sort_by(|a, b| b.value.cmp(&a.value));
    shares
}

/// Total number of repositories counted in `shares`.
#[must_use]
pub fn counted_repos(shares: &[LanguageShare]) -> usize {
    shares.iter().map(|s| s.value).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_exclude_forks_and_unknown() {
        let repos = vec![
            Repository::new("site", Some("JavaScript")),
            Repository::new("valuation", Some("Python")),
            Repository::new("bot", Some("Python")),
            Repository::new("notes", None),
            Repository::new("react", Some("JavaScript")).forked(),
            Repository::new("scraper", Some("Python")),
            Repository::new("crate", Some("Rust")),
        ];

        let shares = language_shares(&repos);
        assert_eq!(
            shares,
            vec![
                LanguageShare { name: "Python".into(), value: 3 },
                LanguageShare { name: "JavaScript".into(), value: 1 },
                LanguageShare { name: "Rust".into(), value: 1 },
            ]
        );
        assert_eq!(counted_repos(&shares), 5);
        assert_eq!(shares[0].percent_of(5), 60.0);
    }

    #[test]
    fn test_no_repos() {
        let shares = language_shares(&[]);
        assert!(shares.is_empty());
        assert_eq!(counted_repos(&shares), 0);
        let share = LanguageShare { name: "Go".into(), value: 0 };
        assert_eq!(share.percent_of(0), 0.0);
    }
}
