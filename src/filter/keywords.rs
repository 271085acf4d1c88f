/// A parsed keyword rule.
///
/// `"promo+ssd,nvme"` reads as `(promo AND ssd) OR nvme`. Terms match as
/// case-insensitive substrings. Empty terms and empty groups are dropped, so a
/// blank rule has no groups and matches nothing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KeywordRule {
    groups: Vec<Vec<String>>,
}

impl KeywordRule {
    /// A rule made only of separators, such as `","` or `" + "`, never matches.
    #[must_use]
    pub fn parse(rule: &str) -> Self {
        let groups = rule
            .split(',')
            .map(|group| {
                group
                    .split('+')
                    .map(|term| term.trim().to_lowercase())
                    .filter(|term| !term.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|terms| !terms.is_empty())
            .collect();
        Self { groups }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    #[must_use]
    pub fn matches(&self, text: &str) -> bool {
        let text = text.to_lowercase();
        self.groups
            .iter()
            .any(|terms| terms.iter().all(|term| text.contains(term.as_str())))
    }
}
