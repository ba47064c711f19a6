//! Raw user entries as returned by a directory search.

use std::collections::BTreeMap;

/// One directory user entry. Attribute names are stored lowercased, since
/// LDAP attribute descriptions are case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryUser {
    pub dn: String,
    attributes: BTreeMap<String, Vec<String>>,
}

impl DirectoryUser {
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Build an entry from an attribute map such as `ldap3::SearchEntry::attrs`.
    pub fn from_attributes<I, K>(dn: impl Into<String>, attributes: I) -> Self
    where
        I: IntoIterator<Item = (K, Vec<String>)>,
        K: AsRef<str>,
    {
        let mut user = Self::new(dn);
        for (name, values) in attributes {
            user.attributes
                .entry(name.as_ref().to_ascii_lowercase())
                .or_default()
                .extend(values);
        }
        user
    }

    /// Builder-style single-value attribute, handy for fixtures.
    pub fn with(mut self, name: &str, value: impl Into<String>) -> Self {
        self.attributes
            .entry(name.to_ascii_lowercase())
            .or_default()
            .push(value.into());
        self
    }

    /// All values of an attribute, empty if the entry does not carry it.
    pub fn values(&self, name: &str) -> &[String] {
        self.attributes
            .get(&name.to_ascii_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Normalize a DN for comparison. DNs are matched ASCII case-insensitively,
/// the same way SQLite's `NOCASE` collation compares them.
pub fn dn_key(dn: &str) -> String {
    dn.to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_lookup_ignores_case() {
        let user = DirectoryUser::new("cn=alice,dc=example,dc=com")
            .with("mail", "alice@example.com")
            .with("memberOf", "cn=staff");
        assert_eq!(user.values("MAIL"), &["alice@example.com".to_string()]);
        assert_eq!(user.values("memberof"), &["cn=staff".to_string()]);
        assert!(user.values("sn").is_empty());
    }

    #[test]
    fn from_attributes_merges_differently_cased_names() {
        let user = DirectoryUser::from_attributes(
            "cn=bob",
            vec![
                ("cn".to_string(), vec!["Bob".to_string()]),
                ("CN".to_string(), vec!["Robert".to_string()]),
            ],
        );
        assert_eq!(
            user.values("Cn"),
            &["Bob".to_string(), "Robert".to_string()]
        );
    }

    #[test]
    fn dn_key_normalizes() {
        assert_eq!(dn_key("CN=Alice,DC=Example"), "cn=alice,dc=example");
    }
}
