//! Logical type → native type tables with size ceilings.
//!
//! Each [`DbType`] maps to a family of templates: an optional default entry
//! used when no size is given, and sized entries ordered by ceiling. A lookup
//! picks the smallest ceiling that admits the requested size; a size beyond
//! the last ceiling is an error, never a silent truncation.
//!
//! Templates may contain `$size`, `$precision` and `$scale` placeholders.

use std::collections::HashMap;

use crate::model::DbType;

#[derive(Debug, Clone, Default)]
struct TypeFamily {
    default: Option<String>,
    /// (ceiling, template), sorted by ceiling.
    sized: Vec<(u64, String)>,
}

/// Per-dialect type table.
#[derive(Debug, Clone, Default)]
pub struct TypeMap {
    families: HashMap<DbType, TypeFamily>,
}

impl TypeMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the entry used when no size/precision is specified.
    pub fn set(&mut self, db_type: DbType, template: &str) -> &mut Self {
        self.families.entry(db_type).or_default().default = Some(template.to_string());
        self
    }

    /// Register a sized entry admitting sizes up to `ceiling`.
    pub fn set_sized(&mut self, db_type: DbType, template: &str, ceiling: u64) -> &mut Self {
        let family = self.families.entry(db_type).or_default();
        family.sized.push((ceiling, template.to_string()));
        family.sized.sort_by_key(|(c, _)| *c);
        self
    }

    /// Largest admissible size for a type, if it has sized entries.
    pub fn ceiling(&self, db_type: DbType) -> Option<u64> {
        self.families
            .get(&db_type)
            .and_then(|f| f.sized.last().map(|(c, _)| *c))
    }

    /// Resolve the native type. `Err` carries a human-readable reason.
    ///
    /// For `Decimal`, the precision is the lookup key.
    pub fn get(
        &self,
        db_type: DbType,
        size: Option<u32>,
        precision: Option<u8>,
        scale: Option<u8>,
    ) -> std::result::Result<String, String> {
        let family = self
            .families
            .get(&db_type)
            .ok_or_else(|| format!("type {} is not supported", db_type))?;

        let key = match db_type {
            DbType::Decimal => precision.map(u64::from).or(size.map(u64::from)),
            _ => size.map(u64::from),
        };

        let key = match key {
            Some(key) if !family.sized.is_empty() => key,
            _ => {
                return family
                    .default
                    .clone()
                    .ok_or_else(|| format!("type {} requires a size", db_type));
            }
        };

        let template = family
            .sized
            .iter()
            .find(|(ceiling, _)| key <= *ceiling)
            .map(|(_, template)| template)
            .ok_or_else(|| {
                let max = family.sized.last().map(|(c, _)| *c).unwrap_or_default();
                match db_type {
                    DbType::Decimal => format!(
                        "decimal precision {} exceeds the maximum of {}",
                        key, max
                    ),
                    _ => format!("{} size {} exceeds the maximum of {}", db_type, key, max),
                }
            })?;

        let precision = precision.map(u64::from).unwrap_or(key);
        Ok(template
            .replace("$size", &key.to_string())
            .replace("$precision", &precision.to_string())
            .replace("$scale", &scale.unwrap_or(0).to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TypeMap {
        let mut map = TypeMap::new();
        map.set(DbType::String, "NVARCHAR(255)")
            .set_sized(DbType::String, "NVARCHAR($size)", 4000)
            .set_sized(DbType::String, "NVARCHAR(MAX)", 1_073_741_823)
            .set(DbType::Decimal, "DECIMAL(19,5)")
            .set_sized(DbType::Decimal, "DECIMAL($precision,$scale)", 38)
            .set(DbType::Int32, "INT")
            .set_sized(DbType::Binary, "VARBINARY($size)", 8000);
        map
    }

    #[test]
    fn test_default_entry_without_size() {
        assert_eq!(sample().get(DbType::String, None, None, None).unwrap(), "NVARCHAR(255)");
    }

    #[test]
    fn test_smallest_ceiling_wins() {
        let map = sample();
        assert_eq!(map.get(DbType::String, Some(100), None, None).unwrap(), "NVARCHAR(100)");
        assert_eq!(map.get(DbType::String, Some(4000), None, None).unwrap(), "NVARCHAR(4000)");
        assert_eq!(map.get(DbType::String, Some(4001), None, None).unwrap(), "NVARCHAR(MAX)");
    }

    #[test]
    fn test_beyond_last_ceiling_fails() {
        let err = sample()
            .get(DbType::String, Some(1_073_741_824), None, None)
            .unwrap_err();
        assert!(err.contains("exceeds the maximum"));
    }

    #[test]
    fn test_decimal_precision_is_the_key() {
        let map = sample();
        assert_eq!(map.get(DbType::Decimal, None, Some(10), Some(2)).unwrap(), "DECIMAL(10,2)");
        assert_eq!(map.get(DbType::Decimal, None, Some(38), None).unwrap(), "DECIMAL(38,0)");
        let err = map.get(DbType::Decimal, None, Some(39), Some(2)).unwrap_err();
        assert!(err.contains("precision 39"));
    }

    #[test]
    fn test_unsized_family_ignores_size() {
        assert_eq!(sample().get(DbType::Int32, Some(4), None, None).unwrap(), "INT");
    }

    #[test]
    fn test_missing_default_requires_size() {
        let err = sample().get(DbType::Binary, None, None, None).unwrap_err();
        assert!(err.contains("requires a size"));
        assert!(sample().get(DbType::Xml, None, None, None).is_err());
    }
}
