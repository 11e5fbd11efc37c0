use regex::Regex;

use crate::types::Type;

/// Per-record predicate consulted by the parser.
///
/// A record is decoded only if its database, key and logical type all match;
/// otherwise the parser diverts to the skip path and no callbacks fire for
/// that record.
pub trait Filter {
    fn matches_db(&self, _db: u32) -> bool {
        true
    }
    fn matches_type(&self, _typ: Type) -> bool {
        true
    }
    fn matches_key(&self, _key: &[u8]) -> bool {
        true
    }
}

/// Accepts every record.
#[derive(Copy, Clone, Default)]
pub struct AllFilter;
impl Filter for AllFilter {}

/// Filter over databases, logical types and a key regular expression.
///
/// Empty axes match everything on that axis.
#[derive(Default)]
pub struct StrictFilter {
    databases: Vec<u32>,
    types: Vec<Type>,
    keys: Option<Regex>,
}

impl StrictFilter {
    pub fn new() -> StrictFilter {
        StrictFilter {
            databases: vec![],
            types: vec![],
            keys: None,
        }
    }

    pub fn add_database(&mut self, db: u32) {
        self.databases.push(db);
    }

    pub fn add_type(&mut self, typ: Type) {
        self.types.push(typ);
    }

    pub fn add_keys(&mut self, re: Regex) {
        self.keys = Some(re);
    }
}

impl Filter for StrictFilter {
    fn matches_db(&self, db: u32) -> bool {
        self.databases.is_empty() || self.databases.iter().any(|&x| x == db)
    }

    fn matches_type(&self, typ: Type) -> bool {
        self.types.is_empty() || self.types.iter().any(|&x| x == typ)
    }

    fn matches_key(&self, key: &[u8]) -> bool {
        match &self.keys {
            None => true,
            Some(re) => re.is_match(&String::from_utf8_lossy(key)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_filter_matches_everything() {
        let filter = StrictFilter::new();
        assert!(filter.matches_db(0));
        assert!(filter.matches_db(42));
        assert!(filter.matches_type(Type::Hash));
        assert!(filter.matches_key(b"anything"));
    }

    #[test]
    fn database_axis() {
        let mut filter = StrictFilter::new();
        filter.add_database(1);
        filter.add_database(3);
        assert!(filter.matches_db(1));
        assert!(filter.matches_db(3));
        assert!(!filter.matches_db(0));
    }

    #[test]
    fn type_axis() {
        let mut filter = StrictFilter::new();
        filter.add_type(Type::SortedSet);
        assert!(filter.matches_type(Type::SortedSet));
        assert!(!filter.matches_type(Type::String));
    }

    #[test]
    fn key_axis() {
        let mut filter = StrictFilter::new();
        filter.add_keys(Regex::new("^user:").unwrap());
        assert!(filter.matches_key(b"user:1000"));
        assert!(!filter.matches_key(b"session:1000"));
    }
}
