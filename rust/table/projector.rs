//! Contract Table Projector
//!
//! Keeps the set of active contracts for one template and flattens it into
//! rows on demand. The column set of a rendering comes from a single sample
//! contract (the first active one), not from the union of all contracts:
//! contracts shaped differently from the sample only contribute the
//! sample's columns.

use crate::table::format::format_lookup;
use crate::table::schema::{column_name, find_scalar_columns, lookup};
use crate::value::{ContractData, ContractId, ContractValue};
use indexmap::IndexMap;
use tracing::{debug, info};

/// Active contracts keyed by contract id, in creation order
pub type ActiveSet = IndexMap<ContractId, ContractValue>;

/// Column name -> cell text (`None` when the value is not a scalar)
pub type TableRow = IndexMap<String, Option<String>>;

#[derive(Debug, Default, Clone)]
pub struct ContractTableProjector {
    active: ActiveSet,
}

impl ContractTableProjector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or overwrites the contract. An overwritten contract keeps its
    /// position in the set.
    pub fn record_created(&mut self, id: ContractId, data: ContractData) {
        debug!("Created CID: {}", id);
        self.active.insert(id, ContractValue::Record(data));
    }

    /// Returns whether the contract was active.
    pub fn record_archived(&mut self, id: &ContractId) -> bool {
        debug!("Archived CID: {}", id);
        self.active.shift_remove(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn contains(&self, id: &ContractId) -> bool {
        self.active.contains_key(id)
    }

    pub fn render_rows(&self) -> Vec<TableRow> {
        info!("Generating table from {} active contracts", self.active.len());

        let Some((sample_id, sample)) = self.active.first() else {
            return Vec::new();
        };
        debug!("sample contract: {}", sample_id);

        let columns = find_scalar_columns(sample);
        let names: Vec<String> = columns.iter().map(|path| column_name(path)).collect();
        debug!("columns: {:?}", names);

        self.active
            .values()
            .map(|record| {
                names
                    .iter()
                    .zip(&columns)
                    .map(|(name, path)| (name.clone(), format_lookup(lookup(record, path))))
                    .collect()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    fn data(value: serde_json::Value) -> ContractData {
        match ContractValue::from_json(value) {
            ContractValue::Record(fields) => fields,
            other => panic!("expected record, got {:?}", other),
        }
    }

    #[test]
    fn test_created_then_archived() {
        let mut projector = ContractTableProjector::new();
        projector.record_created("#1:0".into(), data(json!({"a": 1})));
        projector.record_created("#2:0".into(), data(json!({"a": 2})));
        assert_eq!(projector.len(), 2);

        assert!(projector.record_archived(&"#1:0".into()));
        assert!(!projector.record_archived(&"#1:0".into()));
        assert!(!projector.record_archived(&"#9:9".into()));

        assert!(!projector.contains(&"#1:0".into()));
        assert!(projector.contains(&"#2:0".into()));
    }

    #[test]
    fn test_duplicate_create_overwrites_in_place() {
        let mut projector = ContractTableProjector::new();
        projector.record_created("#1:0".into(), data(json!({"a": 1})));
        projector.record_created("#2:0".into(), data(json!({"a": 2})));
        projector.record_created("#1:0".into(), data(json!({"a": 3})));

        let rows = projector.render_rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["a"], Some("3".to_string()));
        assert_eq!(rows[1]["a"], Some("2".to_string()));
    }

    #[test]
    fn test_empty_projector_renders_no_rows() {
        assert!(ContractTableProjector::new().render_rows().is_empty());
    }

    #[test]
    fn test_rows_follow_sample_columns() {
        let mut projector = ContractTableProjector::new();
        projector.record_created(
            "#1:0".into(),
            data(json!({"name": "first", "info": {"size": 10, "color": "red"}})),
        );
        projector.record_created("#2:0".into(), data(json!({"name": "second", "extra": 5})));
        projector.record_created("#3:0".into(), data(json!({"name": "third", "info": {"size": 7}})));

        let rows = projector.render_rows();
        assert_eq!(rows.len(), 3);
        for row in &rows {
            let keys: Vec<&str> = row.keys().map(String::as_str).collect();
            assert_eq!(keys, vec!["name", "info_size", "info_color"]);
        }

        // "info" missing entirely: intermediate node gone, zero sentinel
        assert_eq!(rows[1]["info_size"], Some("0".to_string()));
        assert_eq!(rows[1]["info_color"], Some("0".to_string()));
        // "info" present but "color" missing: no value
        assert_eq!(rows[2]["info_size"], Some("7".to_string()));
        assert_eq!(rows[2]["info_color"], None);
    }

    #[test]
    fn test_non_scalar_value_in_later_row() {
        let mut projector = ContractTableProjector::new();
        projector.record_created("#1:0".into(), data(json!({"v": 1})));
        projector.record_created("#2:0".into(), data(json!({"v": [1, 2]})));

        let rows = projector.render_rows();
        assert_eq!(rows[0]["v"], Some("1".to_string()));
        assert_eq!(rows[1]["v"], None);
    }

    #[test]
    fn test_sample_changes_after_archive() {
        let mut projector = ContractTableProjector::new();
        projector.record_created("#1:0".into(), data(json!({"a": 1})));
        projector.record_created("#2:0".into(), data(json!({"b": 2})));

        assert_eq!(projector.render_rows()[0].keys().collect::<Vec<_>>(), vec!["a"]);

        projector.record_archived(&"#1:0".into());
        let rows = projector.render_rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["b"], Some("2".to_string()));
    }

    /// Small deterministic generator so the replay below is reproducible.
    struct Lcg(u64);

    impl Lcg {
        fn next(&mut self, bound: u64) -> u64 {
            self.0 = self
                .0
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            (self.0 >> 33) % bound
        }
    }

    #[test]
    fn test_replay_matches_created_minus_archived() {
        let mut rng = Lcg(0x5eed);
        let mut projector = ContractTableProjector::new();
        let mut model: HashMap<String, i64> = HashMap::new();
        let mut order: Vec<String> = Vec::new();
        // ids 20..25 are only ever archived
        let pool: Vec<String> = (0..25).map(|n| format!("#{}:0", n)).collect();

        for step in 0..2000i64 {
            if rng.next(3) < 2 {
                let id = &pool[rng.next(20) as usize];
                projector.record_created(id.as_str().into(), data(json!({"v": step})));
                if model.insert(id.clone(), step).is_none() {
                    order.push(id.clone());
                }
            } else {
                let id = &pool[rng.next(25) as usize];
                let was_active = projector.record_archived(&id.as_str().into());
                assert_eq!(was_active, model.remove(id).is_some(), "step {}", step);
                order.retain(|active| active != id);
            }

            assert_eq!(projector.len(), model.len(), "step {}", step);
            for id in &pool {
                assert_eq!(projector.contains(&id.as_str().into()), model.contains_key(id));
            }

            let rendered: Vec<Option<String>> = projector
                .render_rows()
                .into_iter()
                .map(|row| row["v"].clone())
                .collect();
            let expected: Vec<Option<String>> = order
                .iter()
                .map(|id| Some(model[id].to_string()))
                .collect();
            assert_eq!(rendered, expected, "step {}", step);
        }
    }
}
