//! Fully-qualified object names and wildcard queries
//!
//! Objects are addressed either by a bare name (`h1`) or by a
//! `source/name` pair (`dataset/h1`) when several data sources are loaded.

/// Compose a `source/name` pair. An empty source yields the bare name.
pub fn fully_qualified_name(source: &str, name: &str) -> String {
    if source.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", source, name)
    }
}

/// The part after the first `/`, or the whole string when there is none
pub fn name_only(fqn: &str) -> &str {
    match fqn.split_once('/') {
        Some((_, name)) => name,
        None => fqn,
    }
}

/// The part before the first `/`, or the empty string when there is none
pub fn data_only(fqn: &str) -> &str {
    match fqn.split_once('/') {
        Some((data, _)) => data,
        None => "",
    }
}

/// Make a name safe to use inside generated object names and file names
pub fn underscape(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '.' | ':' | ' ' => '_',
            other => other,
        })
        .collect()
}

/// A parsed wildcard query such as `TH1:dataset/h*`
///
/// Only a single wildcard is supported and everything after it is ignored:
/// the query matches every name that starts with the text before the `*`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobQuery {
    /// Optional class-name prefix (`TH1` matches `TH1D`, `TH1F`, ...)
    pub type_prefix: Option<String>,
    /// Text before the wildcard
    pub prefix: String,
}

impl GlobQuery {
    /// Parse a query. Returns `None` when the query carries no wildcard.
    pub fn parse(query: &str) -> Option<Self> {
        let (type_prefix, rest) = match query.split_once(':') {
            Some((ty, rest)) => (Some(ty.to_string()), rest),
            None => (None, query),
        };
        let star = rest.find('*')?;
        Some(Self {
            type_prefix: type_prefix.filter(|t| !t.is_empty()),
            prefix: rest[..star].to_string(),
        })
    }

    /// Check a candidate name and its runtime class name against the query
    pub fn matches(&self, name: &str, class_name: &str) -> bool {
        if !name.starts_with(&self.prefix) {
            return false;
        }
        match &self.type_prefix {
            Some(ty) => class_name.starts_with(ty.as_str()),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fqn_round_trip() {
        let fqn = fully_qualified_name("dataset", "h1");
        assert_eq!(fqn, "dataset/h1");
        assert_eq!(name_only(&fqn), "h1");
        assert_eq!(data_only(&fqn), "dataset");
    }

    #[test]
    fn test_fqn_empty_source() {
        assert_eq!(fully_qualified_name("", "h1"), "h1");
        assert_eq!(data_only("h1"), "");
        assert_eq!(name_only("h1"), "h1");
    }

    #[test]
    fn test_split_on_first_slash_only() {
        assert_eq!(data_only("a/dir/h"), "a");
        assert_eq!(name_only("a/dir/h"), "dir/h");
    }

    #[test]
    fn test_underscape() {
        assert_eq!(underscape("data/h1.pt"), "data_h1_pt");
    }

    #[test]
    fn test_glob_query_prefix() {
        let q = GlobQuery::parse("A/h*").unwrap();
        assert_eq!(q.prefix, "A/h");
        assert!(q.type_prefix.is_none());
        assert!(q.matches("A/h1", "TH1D"));
        assert!(!q.matches("B/h1", "TH1D"));
    }

    #[test]
    fn test_glob_query_type_prefix() {
        let q = GlobQuery::parse("TH2:h*").unwrap();
        assert!(q.matches("h3", "TH2F"));
        assert!(!q.matches("h1", "TH1F"));
    }

    #[test]
    fn test_glob_without_wildcard_is_none() {
        assert!(GlobQuery::parse("A/h1").is_none());
    }
}
