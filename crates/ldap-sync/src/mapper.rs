//! Merge directory entries onto local users.

use dirsync_core::models::directory::DirectoryUser;
use dirsync_core::models::mapping::{FieldMapping, ValueTransform};
use dirsync_core::models::user::{LocalUser, MergedUser};

/// Applies a configuration's attribute mapping. Pure: the same inputs always
/// produce the same [`MergedUser`].
#[derive(Debug, Clone, Copy)]
pub struct AttributeMapper<'a> {
    mapping: &'a [FieldMapping],
}

impl<'a> AttributeMapper<'a> {
    pub fn new(mapping: &'a [FieldMapping]) -> Self {
        Self { mapping }
    }

    /// Overlay the mapped directory attributes on `existing`.
    ///
    /// Every mapped field is written, with `""` for attributes the entry does
    /// not carry. Unmapped fields keep their local value. When several entries
    /// target the same field the last one wins.
    pub fn merge(&self, directory_user: &DirectoryUser, existing: Option<&LocalUser>) -> MergedUser {
        let mut merged = match existing {
            Some(local) => MergedUser {
                uid: Some(local.uid),
                dn: directory_user.dn.clone(),
                disabled: local.disabled,
                deleted: local.deleted,
                fields: local.fields.clone(),
            },
            None => MergedUser {
                dn: directory_user.dn.clone(),
                ..Default::default()
            },
        };

        for entry in self.mapping {
            let value = apply_transform(directory_user.values(&entry.attribute), entry);
            merged.fields.insert(entry.field.clone(), value);
        }
        merged
    }
}

/// Collapse an attribute's values into one field value.
pub fn apply_transform(values: &[String], entry: &FieldMapping) -> String {
    let first = values.first().map(String::as_str).unwrap_or("");
    match entry.transform {
        ValueTransform::First => first.to_string(),
        ValueTransform::Join => values.join(entry.separator()),
        ValueTransform::Lowercase => first.to_lowercase(),
        ValueTransform::Uppercase => first.to_uppercase(),
        ValueTransform::Trim => first.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn mapping() -> Vec<FieldMapping> {
        vec![
            FieldMapping::new("username", "sAMAccountName"),
            FieldMapping::new("email", "mail").with_transform(ValueTransform::Lowercase),
            FieldMapping::new("telephone", "telephoneNumber"),
        ]
    }

    fn alice() -> DirectoryUser {
        DirectoryUser::new("CN=Alice,OU=Staff,DC=example,DC=com")
            .with("sAMAccountName", "alice")
            .with("mail", "Alice@Example.com")
    }

    #[test]
    fn new_user_gets_every_mapped_field() {
        let mapping = mapping();
        let merged = AttributeMapper::new(&mapping).merge(&alice(), None);
        assert_eq!(merged.uid, None);
        assert_eq!(merged.dn, "CN=Alice,OU=Staff,DC=example,DC=com");
        assert_eq!(merged.field("username"), "alice");
        assert_eq!(merged.field("email"), "alice@example.com");
        // Absent attribute still produces the field, empty.
        assert_eq!(merged.fields.get("telephone").map(String::as_str), Some(""));
        assert_eq!(merged.fields.len(), 3);
        assert!(!merged.disabled && !merged.deleted);
    }

    #[test]
    fn existing_user_keeps_unmapped_fields_and_flags() {
        let local = LocalUser {
            uid: 7,
            dn: Some("cn=alice,ou=staff,dc=example,dc=com".into()),
            configuration_uid: Some(1),
            disabled: true,
            deleted: false,
            fields: BTreeMap::from([
                ("username".to_string(), "old-alice".to_string()),
                ("lang".to_string(), "de".to_string()),
                ("telephone".to_string(), "+49 1".to_string()),
            ]),
        };
        let mapping = mapping();
        let merged = AttributeMapper::new(&mapping).merge(&alice(), Some(&local));
        assert_eq!(merged.uid, Some(7));
        assert!(merged.disabled);
        assert_eq!(merged.field("username"), "alice");
        assert_eq!(merged.field("lang"), "de");
        // Mapped but missing in the directory: overwritten with empty.
        assert_eq!(merged.field("telephone"), "");
        // DN follows the directory spelling.
        assert_eq!(merged.dn, "CN=Alice,OU=Staff,DC=example,DC=com");
    }

    #[test]
    fn later_entries_win() {
        let mapping = vec![
            FieldMapping::new("name", "cn"),
            FieldMapping::new("name", "displayName"),
        ];
        let user = DirectoryUser::new("cn=bob")
            .with("cn", "bob")
            .with("displayName", "Bob Builder");
        let merged = AttributeMapper::new(&mapping).merge(&user, None);
        assert_eq!(merged.field("name"), "Bob Builder");
    }

    #[test]
    fn merge_is_deterministic() {
        let mapping = mapping();
        let mapper = AttributeMapper::new(&mapping);
        assert_eq!(mapper.merge(&alice(), None), mapper.merge(&alice(), None));
    }

    #[test]
    fn transforms() {
        let values = vec!["  Staff ".to_string(), "Admins".to_string()];
        let join = FieldMapping {
            separator: Some("|".into()),
            ..FieldMapping::new("groups", "memberOf").with_transform(ValueTransform::Join)
        };
        assert_eq!(apply_transform(&values, &join), "  Staff |Admins");
        let trim = FieldMapping::new("g", "memberOf").with_transform(ValueTransform::Trim);
        assert_eq!(apply_transform(&values, &trim), "Staff");
        let upper = FieldMapping::new("g", "memberOf").with_transform(ValueTransform::Uppercase);
        assert_eq!(apply_transform(&values, &upper), "  STAFF ");
        let first = FieldMapping::new("g", "memberOf");
        assert_eq!(apply_transform(&[], &first), "");
        let join_default = FieldMapping::new("g", "memberOf").with_transform(ValueTransform::Join);
        assert_eq!(apply_transform(&values, &join_default), "  Staff , Admins");
    }
}
