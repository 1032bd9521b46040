use std::collections::BTreeMap;
use tabled::{settings::Style, Table, Tabled};

#[derive(Tabled)]
pub struct TableRow {
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

#[derive(Tabled)]
struct CountRow {
    #[tabled(rename = "Entity type")]
    entity: String,
    #[tabled(rename = "Nodes")]
    count: usize,
}

#[derive(Default)]
pub struct TableBuilder {
    rows: Vec<TableRow>,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_row(&mut self, label: &str, value: impl ToString) {
        self.rows.push(TableRow {
            metric: label.to_string(),
            value: value.to_string(),
        });
    }

    pub fn build(&self) -> String {
        if self.rows.is_empty() {
            return String::new();
        }
        Table::new(&self.rows).with(Style::rounded()).to_string()
    }
}

/// Node counts per entity type, sorted by type name
pub fn counts_table(per_type: &BTreeMap<&'static str, usize>) -> String {
    if per_type.is_empty() {
        return String::new();
    }
    let rows: Vec<CountRow> = per_type
        .iter()
        .map(|(entity, &count)| CountRow {
            entity: entity.to_string(),
            count,
        })
        .collect();
    Table::new(rows).with(Style::rounded()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tables_render_rows() {
        let mut builder = TableBuilder::new();
        assert!(builder.build().is_empty());
        builder.add_row("Nodes", 12);
        assert!(builder.build().contains("Nodes"));

        let mut per_type = BTreeMap::new();
        per_type.insert("Sense", 4);
        per_type.insert("Lexicon", 1);
        let table = counts_table(&per_type);
        assert!(table.find("Lexicon").unwrap() < table.find("Sense").unwrap());
    }
}
