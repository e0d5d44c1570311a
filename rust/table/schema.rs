//! Column Schema - Flattening nested contract records into columns
//!
//! A column is the path of nested field names leading to a leaf value of
//! one sample contract. Paths are emitted depth-first in field order.

use crate::table::format::format_lookup;
use crate::value::ContractValue;
use itertools::Itertools;

/// Nested field names locating one leaf value
pub type FieldPath = Vec<String>;

/// Ordered column paths for one rendering
pub type ColumnSchema = Vec<FieldPath>;

/// Separator used when joining a field path into a column name
pub const COLUMN_SEPARATOR: &str = "_";

/// Result of walking a record along a field path
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Lookup<'a> {
    /// The path resolved to a value.
    Found(&'a ContractValue),
    /// The last field is not present in its (existing) parent record.
    Absent,
    /// An intermediate node is missing or is not a record.
    Missing,
}

/// Every leaf path of `sample`. A non-record root yields the single empty path.
pub fn derive_schema(sample: &ContractValue) -> ColumnSchema {
    let mut paths = Vec::new();
    collect_paths(sample, &mut Vec::new(), &mut paths);
    paths
}

fn collect_paths(value: &ContractValue, prefix: &mut FieldPath, paths: &mut ColumnSchema) {
    match value {
        ContractValue::Record(fields) => {
            for (key, field) in fields {
                prefix.push(key.clone());
                collect_paths(field, prefix, paths);
                prefix.pop();
            }
        }
        _ => paths.push(prefix.clone()),
    }
}

pub fn column_name(path: &[String]) -> String {
    path.iter().join(COLUMN_SEPARATOR)
}

pub fn lookup<'a>(record: &'a ContractValue, path: &[String]) -> Lookup<'a> {
    let Some((head, rest)) = path.split_first() else {
        return Lookup::Found(record);
    };
    match record {
        ContractValue::Record(fields) => match fields.get(head) {
            Some(field) => lookup(field, rest),
            None if rest.is_empty() => Lookup::Absent,
            None => Lookup::Missing,
        },
        _ => Lookup::Missing,
    }
}

/// Leaf paths of `sample` whose values render as scalars.
pub fn find_scalar_columns(sample: &ContractValue) -> ColumnSchema {
    derive_schema(sample)
        .into_iter()
        .filter(|path| format_lookup(lookup(sample, path)).is_some())
        .collect()
}
