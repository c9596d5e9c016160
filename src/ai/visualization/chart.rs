use crate::ai::types::ChartShape;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// Fallback slice colours, picked by row index
pub const PIE_PALETTE: [&str; 6] = ["#8884d8", "#82ca9d", "#ffc658", "#ff7300", "#00C49F", "#FFBB28"];

pub const RED: &str = "#DC2626";
pub const ORANGE: &str = "#F97316";
pub const AMBER: &str = "#F59E0B";
pub const GREEN: &str = "#10B981";
pub const BLUE: &str = "#3B82F6";

pub fn palette_color(index: usize) -> &'static str {
    PIE_PALETTE[index % PIE_PALETTE.len()]
}

/// A single cell: either a display label or a plottable number
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Number(f64),
    Label(String),
}

impl CellValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            CellValue::Label(_) => None,
        }
    }

    pub fn as_label(&self) -> Option<&str> {
        match self {
            CellValue::Label(s) => Some(s),
            CellValue::Number(_) => None,
        }
    }

    /// Plain text form used for CSV cells
    pub fn to_cell_string(&self) -> String {
        match self {
            CellValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            CellValue::Number(n) => n.to_string(),
            CellValue::Label(s) => s.clone(),
        }
    }
}

/// One record of a chart dataset. Field order is kept so the first field can
/// serve as the category axis when a spec names none.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChartRow {
    fields: Vec<(String, CellValue)>,
}

impl ChartRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn label(mut self, key: &str, value: impl Into<String>) -> Self {
        self.set(key, CellValue::Label(value.into()));
        self
    }

    pub fn number(mut self, key: &str, value: f64) -> Self {
        self.set(key, CellValue::Number(value));
        self
    }

    /// Pie slice record: `{name, value, color}`
    pub fn slice(name: impl Into<String>, value: f64, color: impl Into<String>) -> Self {
        Self::new()
            .label("name", name)
            .number("value", value)
            .label("color", color)
    }

    pub fn set(&mut self, key: &str, value: CellValue) {
        match self.fields.iter_mut().find(|(k, _)| k == key) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((key.to_string(), value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&CellValue> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn numeric_keys(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|(_, v)| v.as_number().is_some())
            .map(|(k, _)| k.as_str())
            .collect()
    }

    pub fn fields(&self) -> &[(String, CellValue)] {
        &self.fields
    }

    pub fn color(&self) -> Option<&str> {
        self.get("color").and_then(CellValue::as_label)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Serialize for ChartRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (key, value) in &self.fields {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Chart dataset plus the metadata the renderer needs
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSpec {
    #[serde(rename = "type")]
    pub shape: ChartShape,
    pub data: Vec<ChartRow>,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x_axis: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y_axis: Option<String>,
}

impl ChartSpec {
    pub fn new(shape: ChartShape, title: impl Into<String>, data: Vec<ChartRow>) -> Self {
        Self {
            shape,
            data,
            title: title.into(),
            x_axis: None,
            y_axis: None,
        }
    }

    pub fn with_axes(mut self, x_axis: &str, y_axis: &str) -> Self {
        self.x_axis = Some(x_axis.to_string());
        self.y_axis = Some(y_axis.to_string());
        self
    }

    /// True when every row has the same keys and the same numeric keys
    pub fn has_uniform_rows(&self) -> bool {
        let Some(first) = self.data.first() else {
            return true;
        };
        let keys: Vec<&str> = first.keys().collect();
        let numeric = first.numeric_keys();
        self.data
            .iter()
            .all(|row| row.keys().collect::<Vec<_>>() == keys && row.numeric_keys() == numeric)
    }

    /// Sum of pie slice values; zero for other shapes
    pub fn value_total(&self) -> f64 {
        self.data
            .iter()
            .filter_map(|row| row.get("value").and_then(CellValue::as_number))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_serializes_in_insertion_order() {
        let row = ChartRow::new()
            .label("unidad", "UCI")
            .number("ocupadas", 18.0)
            .number("ocupacion", 75.0);
        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"{"unidad":"UCI","ocupadas":18.0,"ocupacion":75.0}"#);
    }

    #[test]
    fn test_set_replaces_existing_key() {
        let mut row = ChartRow::new().number("a", 1.0);
        row.set("a", CellValue::Number(2.0));
        assert_eq!(row.len(), 1);
        assert_eq!(row.get("a"), Some(&CellValue::Number(2.0)));
    }

    #[test]
    fn test_spec_serialization_shape() {
        let spec = ChartSpec::new(ChartShape::Pie, "Test", vec![ChartRow::slice("A", 60.0, RED)]);
        let value = serde_json::to_value(&spec).unwrap();
        assert_eq!(value["type"], "pie");
        assert_eq!(value["data"][0]["color"], RED);
        assert!(value.get("xAxis").is_none());

        let spec = ChartSpec::new(ChartShape::Bar, "Test", vec![]).with_axes("unidad", "cantidad");
        let value = serde_json::to_value(&spec).unwrap();
        assert_eq!(value["xAxis"], "unidad");
        assert_eq!(value["yAxis"], "cantidad");
    }

    #[test]
    fn test_uniform_rows() {
        let uniform = ChartSpec::new(
            ChartShape::Bar,
            "ok",
            vec![
                ChartRow::new().label("x", "a").number("y", 1.0),
                ChartRow::new().label("x", "b").number("y", 2.0),
            ],
        );
        assert!(uniform.has_uniform_rows());

        let ragged = ChartSpec::new(
            ChartShape::Bar,
            "ragged",
            vec![
                ChartRow::new().label("x", "a").number("y", 1.0),
                ChartRow::new().label("x", "b").label("y", "n/a"),
            ],
        );
        assert!(!ragged.has_uniform_rows());
    }

    #[test]
    fn test_cell_string() {
        assert_eq!(CellValue::Number(18.0).to_cell_string(), "18");
        assert_eq!(CellValue::Number(8.5).to_cell_string(), "8.5");
        assert_eq!(CellValue::Label("UCI".into()).to_cell_string(), "UCI");
    }
}
