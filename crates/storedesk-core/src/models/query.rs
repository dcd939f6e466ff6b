use std::collections::BTreeMap;

/// Parameters for list endpoints.
///
/// `keyword` drives the search box; `filters` carries any other passthrough
/// parameter. Both end up as URL query pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub keyword: Option<String>,
    pub filters: BTreeMap<String, String>,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Search by keyword. Blank keywords clear the search.
    pub fn keyword(keyword: &str) -> Self {
        Self::new().with_keyword(keyword)
    }

    pub fn with_keyword(mut self, keyword: &str) -> Self {
        let trimmed = keyword.trim();
        self.keyword = if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        };
        self
    }

    pub fn with_filter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.insert(key.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.keyword.is_none() && self.filters.is_empty()
    }

    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::with_capacity(self.filters.len() + 1);
        if let Some(ref keyword) = self.keyword {
            pairs.push(("keyword".to_string(), keyword.clone()));
        }
        pairs.extend(
            self.filters
                .iter()
                .filter(|(k, _)| k.as_str() != "keyword")
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_keyword_clears_search() {
        assert!(ListQuery::keyword("   ").is_empty());
        assert_eq!(ListQuery::keyword(" son ").keyword.as_deref(), Some("son"));
    }

    #[test]
    fn test_pairs_keyword_first_and_not_duplicated() {
        let q = ListQuery::keyword("kem")
            .with_filter("status", "in-stock")
            .with_filter("keyword", "ignored");
        assert_eq!(
            q.to_pairs(),
            vec![
                ("keyword".to_string(), "kem".to_string()),
                ("status".to_string(), "in-stock".to_string()),
            ]
        );
    }
}
