//! Per-revision resource ids.
//!
//! The same block or item has a different numeric id on almost every major
//! release. Each resource carries an [`IdTable`]: inclusive revision ranges
//! mapped to ids, validated once at construction so that every supported
//! revision resolves to exactly one id. A gap or overlap is a configuration
//! error raised while the gate starts, never on a live connection.

use once_cell::sync::OnceCell;

use crate::error::{ProtocolError, Result};
use crate::protocol::version::ProtocolVersion;

/// Build an [`IdTable`] from `from..=to => id` rows.
#[macro_export]
macro_rules! id_table {
    ($name:expr; $($from:ident ..= $to:ident => $id:expr),+ $(,)?) => {
        $crate::protocol::resource::IdTable::new(
            $name,
            &[$(
                (
                    $crate::protocol::version::ProtocolVersion::$from,
                    $crate::protocol::version::ProtocolVersion::$to,
                    $id,
                )
            ),+],
        )
    };
}

/// Total mapping from revision to id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdTable {
    name: &'static str,
    // Indexed by ProtocolVersion::ordinal
    ids: Vec<i32>,
}

impl IdTable {
    /// Validate `ranges` and build the table.
    ///
    /// # Errors
    /// `ConfigError` if a range is inverted, ranges are out of order, overlap,
    /// leave a gap, or stop short of the newest revision.
    pub fn new(name: &'static str, ranges: &[(ProtocolVersion, ProtocolVersion, i32)]) -> Result<Self> {
        let mut ids = Vec::with_capacity(ProtocolVersion::ALL.len());
        let mut expected = Some(ProtocolVersion::MINIMUM);

        for &(from, to, id) in ranges {
            if from > to {
                return Err(table_error(name, format!("inverted range {}..={}", from.name(), to.name())));
            }
            match expected {
                None => {
                    return Err(table_error(name, format!("range starting at {} is past the newest revision", from.name())));
                }
                Some(next) if from > next => {
                    return Err(table_error(name, format!("no id for {}", next.name())));
                }
                Some(next) if from < next => {
                    return Err(table_error(name, format!("{} is covered twice", from.name())));
                }
                Some(_) => {}
            }
            for _ in from.ordinal()..=to.ordinal() {
                ids.push(id);
            }
            expected = to.next();
        }

        if let Some(missing) = expected {
            return Err(table_error(name, format!("no id for {}", missing.name())));
        }
        Ok(Self { name, ids })
    }

    /// A table with the same id on every revision
    pub fn constant(name: &'static str, id: i32) -> Self {
        Self {
            name,
            ids: vec![id; ProtocolVersion::ALL.len()],
        }
    }

    #[inline]
    pub fn resolve(&self, version: ProtocolVersion) -> i32 {
        self.ids[version.ordinal()]
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

fn table_error(name: &str, detail: String) -> ProtocolError {
    ProtocolError::ConfigError(format!("id table '{name}': {detail}"))
}

/// Logical resources the challenge flow needs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKey {
    Stone,
    EnchantmentTable,
    Trapdoor,
    Barrier,
    FilledMap,
}

impl ResourceKey {
    pub const ALL: &'static [ResourceKey] = &[
        ResourceKey::Stone,
        ResourceKey::EnchantmentTable,
        ResourceKey::Trapdoor,
        ResourceKey::Barrier,
        ResourceKey::FilledMap,
    ];

    pub fn is_block(self) -> bool {
        !matches!(self, ResourceKey::FilledMap)
    }
}

/// A resource with its id table and collision height
#[derive(Debug, Clone)]
pub struct Resource {
    pub key: ResourceKey,
    pub ids: IdTable,
    /// Collision box height in blocks (zero for items)
    pub height: f64,
}

/// Every resource the gate resolves, built and validated once at startup
#[derive(Debug, Clone)]
pub struct ResourceCatalog {
    // Indexed by ResourceKey discriminant
    resources: Vec<Resource>,
}

impl ResourceCatalog {
    /// Build the standard catalog.
    ///
    /// Sources: block state and item registries published for each release.
    /// Ids for 1.8 through 1.12.2 use the legacy numeric id space shared by those releases.
    pub fn standard() -> Result<Self> {
        let resources = vec![
            Resource {
                key: ResourceKey::Stone,
                ids: IdTable::constant("stone", 1),
                height: 1.0,
            },
            Resource {
                key: ResourceKey::EnchantmentTable,
                ids: id_table!("enchantment_table";
                    V1_7_2..=V1_12_2 => 116,
                    V1_13..=V1_13_1 => 4612,
                    V1_13_2..=V1_14_3 => 4613,
                    V1_14_4..=V1_15_2 => 5116,
                    V1_16..=V1_16_1 => 5132,
                    V1_16_2..=V1_16_4 => 5136,
                    V1_17..=V1_18_2 => 5333,
                    V1_19..=V1_19_1 => 5719,
                    V1_19_3..=V1_19_3 => 7159,
                    V1_19_4..=V1_19_4 => 7385,
                    V1_20..=V1_21 => 7389,
                )?,
                height: 0.75,
            },
            Resource {
                key: ResourceKey::Trapdoor,
                ids: id_table!("trapdoor";
                    // 1.7 has no iron trapdoor, the wooden one stands in
                    V1_7_2..=V1_7_6 => 96,
                    V1_8..=V1_12_2 => 167,
                    V1_13..=V1_13_1 => 6509,
                    V1_13_2..=V1_14_3 => 6510,
                    V1_14_4..=V1_15_2 => 7016,
                    V1_16..=V1_16_1 => 7552,
                    V1_16_2..=V1_16_4 => 7556,
                    V1_17..=V1_18_2 => 7802,
                    V1_19..=V1_19_1 => 8293,
                    V1_19_3..=V1_19_3 => 9937,
                    V1_19_4..=V1_19_4 => 10269,
                    V1_20..=V1_20 => 10273,
                    V1_20_2..=V1_21 => 10414,
                )?,
                height: 0.1875,
            },
            Resource {
                key: ResourceKey::Barrier,
                ids: id_table!("barrier";
                    // 1.7 has no barrier block, glass stands in
                    V1_7_2..=V1_7_6 => 20,
                    V1_8..=V1_12_2 => 166,
                    V1_13..=V1_13_1 => 6493,
                    V1_13_2..=V1_13_2 => 6494,
                    V1_14..=V1_15_2 => 7000,
                    V1_16..=V1_16_1 => 7536,
                    V1_16_2..=V1_16_4 => 7540,
                    V1_17..=V1_18_2 => 7754,
                    V1_19..=V1_19_1 => 8245,
                    V1_19_3..=V1_19_3 => 9889,
                    V1_19_4..=V1_19_4 => 10221,
                    V1_20..=V1_20 => 10225,
                    V1_20_2..=V1_21 => 10366,
                )?,
                height: 1.0,
            },
            Resource {
                key: ResourceKey::FilledMap,
                ids: id_table!("filled_map";
                    V1_7_2..=V1_12_2 => 358,
                    V1_13..=V1_13 => 608,
                    V1_13_1..=V1_13_2 => 613,
                    V1_14..=V1_15_2 => 671,
                    V1_16..=V1_16_4 => 733,
                    V1_17..=V1_18_2 => 847,
                    V1_19..=V1_19_1 => 886,
                    V1_19_3..=V1_19_3 => 914,
                    V1_19_4..=V1_19_4 => 937,
                    V1_20..=V1_20_2 => 941,
                    V1_20_3..=V1_20_3 => 979,
                    V1_20_5..=V1_21 => 982,
                )?,
                height: 0.0,
            },
        ];
        Ok(Self { resources })
    }

    pub fn get(&self, key: ResourceKey) -> &Resource {
        &self.resources[key as usize]
    }

    /// Numeric id of `key` on `version`
    #[inline]
    pub fn resolve(&self, key: ResourceKey, version: ProtocolVersion) -> i32 {
        self.get(key).ids.resolve(version)
    }

    /// Collision height of `key`
    pub fn height(&self, key: ResourceKey) -> f64 {
        self.get(key).height
    }
}

static CATALOG: OnceCell<ResourceCatalog> = OnceCell::new();

/// Process-wide catalog, built and validated on first use
pub fn resource_catalog() -> Result<&'static ResourceCatalog> {
    CATALOG.get_or_try_init(ResourceCatalog::standard)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use ProtocolVersion::*;

    #[test]
    fn test_catalog_order_matches_keys() {
        let catalog = ResourceCatalog::standard().unwrap();
        for &key in ResourceKey::ALL {
            assert_eq!(catalog.get(key).key, key);
        }
    }

    #[test]
    fn test_default_branch_covers_legacy_ids() {
        let catalog = ResourceCatalog::standard().unwrap();
        assert_eq!(catalog.resolve(ResourceKey::EnchantmentTable, V1_7_2), 116);
        assert_eq!(catalog.resolve(ResourceKey::EnchantmentTable, V1_12_2), 116);
        assert_eq!(catalog.resolve(ResourceKey::Trapdoor, V1_7_6), 96);
        assert_eq!(catalog.resolve(ResourceKey::Trapdoor, V1_8), 167);
        assert_eq!(catalog.resolve(ResourceKey::Barrier, V1_20), 10225);
        assert_eq!(catalog.resolve(ResourceKey::Barrier, V1_20_2), 10366);
    }

    #[test]
    fn test_gap_rejected() {
        let err = IdTable::new("gap", &[(V1_7_2, V1_8, 1), (V1_9_1, V1_21, 2)]).unwrap_err();
        assert!(err.to_string().contains("no id for 1.9"));
    }

    #[test]
    fn test_overlap_rejected() {
        let err = IdTable::new("overlap", &[(V1_7_2, V1_9, 1), (V1_9, V1_21, 2)]).unwrap_err();
        assert!(err.to_string().contains("covered twice"));
    }

    #[test]
    fn test_short_table_rejected() {
        let err = IdTable::new("short", &[(V1_7_2, V1_20_5, 1)]).unwrap_err();
        assert!(err.to_string().contains("no id for 1.21"));
    }

    #[test]
    fn test_inverted_rejected() {
        assert!(IdTable::new("inverted", &[(V1_9, V1_8, 1)]).is_err());
    }

    #[test]
    fn test_past_latest_rejected() {
        assert!(IdTable::new("past", &[(V1_7_2, V1_21, 1), (V1_21, V1_21, 2)]).is_err());
    }
}
