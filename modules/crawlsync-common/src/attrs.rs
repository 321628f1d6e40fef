use std::collections::BTreeMap;

use crate::error::SyncError;
use crate::types::Record;

/// How a configured extra attribute is carried from source to master.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyPolicy {
    /// Copy the source value, substituting an empty string when the
    /// attribute is absent from a source record.
    CopyOrEmpty,
    /// Copy the source value; the attribute must exist in the source
    /// partition's shape or the pass fails before any write.
    Required,
}

/// Configured set of extra attribute names copied from source records
/// into master during an update pass.
///
/// Parsed from a comma-separated list; a trailing `!` marks an attribute
/// required. `"author,price!"` copies `author` (empty string if absent)
/// and insists the source shape carries `price`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeMap {
    entries: BTreeMap<String, CopyPolicy>,
}

impl AttributeMap {
    pub fn parse(raw: &str) -> Result<Self, SyncError> {
        let mut entries = BTreeMap::new();
        for part in raw.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            let (name, policy) = match part.strip_suffix('!') {
                Some(name) => (name.trim(), CopyPolicy::Required),
                None => (part, CopyPolicy::CopyOrEmpty),
            };
            if name.is_empty() {
                return Err(SyncError::Validation(
                    "empty attribute name in copy-attribute list".to_string(),
                ));
            }
            if entries.insert(name.to_string(), policy).is_some() {
                return Err(SyncError::Validation(format!(
                    "duplicate attribute name: {name}"
                )));
            }
        }
        Ok(Self { entries })
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Check required attributes against an observed source record.
    /// Run once when a pass starts, before any write.
    pub fn validate_against(&self, record: &Record) -> Result<(), SyncError> {
        let missing: Vec<&str> = self
            .entries
            .iter()
            .filter(|(name, policy)| {
                **policy == CopyPolicy::Required && !record.extras.contains_key(*name)
            })
            .map(|(name, _)| name.as_str())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(SyncError::Validation(format!(
                "required attributes missing from source shape: {}",
                missing.join(", ")
            )))
        }
    }

    /// Values to carry into master for one source record.
    pub fn copy_from(&self, extras: &BTreeMap<String, String>) -> BTreeMap<String, String> {
        self.entries
            .keys()
            .map(|name| {
                let value = extras.get(name).cloned().unwrap_or_default();
                (name.clone(), value)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_policies_and_rejects_duplicates() {
        let attrs = AttributeMap::parse("author, price!").unwrap();
        assert_eq!(attrs.names().collect::<Vec<_>>(), vec!["author", "price"]);

        assert!(AttributeMap::parse("author,author").is_err());
        assert!(AttributeMap::parse("a,,b").is_ok());
        assert!(AttributeMap::parse("a, !").is_err());
        assert!(AttributeMap::parse("").unwrap().is_empty());
    }

    #[test]
    fn copy_substitutes_empty_string_for_absent_attributes() {
        let attrs = AttributeMap::parse("author,price").unwrap();
        let record = Record::new("a1", "http://u/a1").with_extra("author", "arb");

        let copied = attrs.copy_from(&record.extras);
        assert_eq!(copied.get("author").map(String::as_str), Some("arb"));
        assert_eq!(copied.get("price").map(String::as_str), Some(""));
    }

    #[test]
    fn required_attribute_must_exist_in_source_shape() {
        let attrs = AttributeMap::parse("price!").unwrap();
        let without = Record::new("a1", "http://u/a1");
        assert!(matches!(
            attrs.validate_against(&without),
            Err(SyncError::Validation(_))
        ));

        let with = without.with_extra("price", "12.50");
        assert!(attrs.validate_against(&with).is_ok());
    }
}
