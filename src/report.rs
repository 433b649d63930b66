use crate::TreeFloat;
use crate::analysis::{
    AbundanceRow, ConsistencyRow, LttRow, ShapeRow, SisterMatrix,
};
use crate::phylo::{DistanceMatrix, LayoutRow, PathLength, WalkStep};
use std::fmt::Display;
use std::sync::Arc;

/// A single report cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(usize),
    Float(TreeFloat),
    Text(Arc<str>),
    List(Vec<usize>),
    Missing,
}

impl Value {
    fn render(&self, precision: Option<usize>) -> String {
        match (self, precision) {
            (Value::Int(v), _) => v.to_string(),
            (Value::Float(v), Some(p)) => format!("{v:.p$}"),
            (Value::Float(v), None) => v.to_string(),
            (Value::Text(v), _) => v.to_string(),
            (Value::List(v), _) => {
                v.iter().map(usize::to_string).collect::<Vec<_>>().join(",")
            }
            (Value::Missing, _) => "-".to_string(),
        }
    }
}

impl From<usize> for Value {
    fn from(value: usize) -> Self { Value::Int(value) }
}

impl From<TreeFloat> for Value {
    fn from(value: TreeFloat) -> Self { Value::Float(value) }
}

impl From<Arc<str>> for Value {
    fn from(value: Arc<str>) -> Self { Value::Text(value) }
}

impl From<Option<Arc<str>>> for Value {
    fn from(value: Option<Arc<str>>) -> Self {
        value.map(Value::Text).unwrap_or(Value::Missing)
    }
}

impl From<Option<TreeFloat>> for Value {
    fn from(value: Option<TreeFloat>) -> Self {
        value.map(Value::Float).unwrap_or(Value::Missing)
    }
}

/// Non-tree result of an operation.
///
/// Rendered as delimited text, one line per record. Matrix rows start with
/// the row label; lower-triangular matrices have `i` values on row `i`.
/// `unitless` marks values computed with some branch lengths taken as 0.
#[derive(Debug, Clone, PartialEq)]
pub enum Report {
    Scalar { value: Value, unitless: bool },
    Labels(Vec<Arc<str>>),
    Table { columns: Vec<&'static str>, rows: Vec<Vec<Value>>, unitless: bool },
    Matrix { labels: Vec<Arc<str>>, rows: Vec<Vec<Value>>, unitless: bool },
}

impl Report {
    pub fn scalar(value: impl Into<Value>) -> Self {
        Report::Scalar { value: value.into(), unitless: false }
    }

    pub fn render(&self, delimiter: &str, precision: Option<usize>) -> String {
        let mut lines: Vec<String> = Vec::new();
        match self {
            Report::Scalar { value, .. } => lines.push(value.render(precision)),
            Report::Labels(labels) => {
                lines.extend(labels.iter().map(|l| l.to_string()))
            }
            Report::Table { rows, .. } => {
                for row in rows {
                    let cells: Vec<String> =
                        row.iter().map(|v| v.render(precision)).collect();
                    lines.push(cells.join(delimiter));
                }
            }
            Report::Matrix { labels, rows, .. } => {
                for (label, row) in labels.iter().zip(rows) {
                    let mut cells: Vec<String> = vec![label.to_string()];
                    cells.extend(row.iter().map(|v| v.render(precision)));
                    lines.push(cells.join(delimiter));
                }
            }
        }
        let mut text = lines.join("\n");
        if !text.is_empty() {
            text.push('\n');
        }
        text
    }

    /// Whether some values were computed with lengths taken as zero.
    pub fn is_unitless(&self) -> bool {
        match self {
            Report::Scalar { unitless, .. }
            | Report::Table { unitless, .. }
            | Report::Matrix { unitless, .. } => *unitless,
            Report::Labels(_) => false,
        }
    }
}

impl Display for Report {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.render("\t", None))
    }
}

// =============================================================================
// Conversions
// =============================================================================

impl From<PathLength> for Report {
    fn from(path: PathLength) -> Self {
        Report::Scalar { value: path.value.into(), unitless: !path.is_exact() }
    }
}

impl From<&DistanceMatrix> for Report {
    fn from(matrix: &DistanceMatrix) -> Self {
        Report::Matrix {
            labels: matrix.labels().to_vec(),
            rows: matrix
                .rows()
                .map(|(_, row)| row.iter().map(|&d| d.into()).collect())
                .collect(),
            unitless: matrix.missing_lengths(),
        }
    }
}

impl From<Vec<WalkStep>> for Report {
    fn from(steps: Vec<WalkStep>) -> Self {
        let unitless = steps
            .iter()
            .any(|step| !step.distance.is_exact() || !step.traveled.is_exact());
        Report::Table {
            columns: vec!["label", "distance", "traveled"],
            rows: steps
                .into_iter()
                .map(|step| {
                    vec![
                        step.label.into(),
                        step.distance.value.into(),
                        step.traveled.value.into(),
                    ]
                })
                .collect(),
            unitless,
        }
    }
}

impl From<Vec<AbundanceRow>> for Report {
    fn from(rows: Vec<AbundanceRow>) -> Self {
        Report::Table {
            columns: vec!["leaves", "edges", "length", "fraction"],
            rows: rows
                .into_iter()
                .map(|r| {
                    vec![
                        r.leaves_subtended.into(),
                        r.edge_count.into(),
                        r.total_length.into(),
                        r.fraction.into(),
                    ]
                })
                .collect(),
            unitless: false,
        }
    }
}

impl From<Vec<ConsistencyRow>> for Report {
    fn from(rows: Vec<ConsistencyRow>) -> Self {
        Report::Table {
            columns: vec!["site", "states", "min_steps", "steps", "ci"],
            rows: rows
                .into_iter()
                .map(|r| {
                    vec![
                        r.site.into(),
                        r.states.into(),
                        r.min_steps.into(),
                        r.steps.into(),
                        r.ci.into(),
                    ]
                })
                .collect(),
            unitless: false,
        }
    }
}

impl From<Vec<LttRow>> for Report {
    fn from(rows: Vec<LttRow>) -> Self {
        Report::Table {
            columns: vec!["bin", "count", "floor", "ceiling"],
            rows: rows
                .into_iter()
                .map(|r| {
                    vec![r.bin.into(), r.count.into(), r.floor.into(), r.ceiling.into()]
                })
                .collect(),
            unitless: false,
        }
    }
}

impl From<Vec<ShapeRow>> for Report {
    fn from(rows: Vec<ShapeRow>) -> Self {
        Report::Table {
            columns: vec!["index", "label", "children", "leaves_per_child"],
            rows: rows
                .into_iter()
                .map(|r| {
                    vec![
                        r.index.into(),
                        r.label.into(),
                        r.child_count.into(),
                        Value::List(r.leaves_per_child),
                    ]
                })
                .collect(),
            unitless: false,
        }
    }
}

impl From<SisterMatrix> for Report {
    fn from(matrix: SisterMatrix) -> Self {
        Report::Matrix {
            labels: matrix.labels,
            rows: matrix
                .values
                .into_iter()
                .map(|row| {
                    row.into_iter()
                        .map(|v| v.map_or(Value::Missing, |v| Value::Int(v as usize)))
                        .collect()
                })
                .collect(),
            unitless: false,
        }
    }
}

/// Layout rows as a table an external renderer can draw from.
impl From<Vec<LayoutRow>> for Report {
    fn from(rows: Vec<LayoutRow>) -> Self {
        let unitless = rows
            .iter()
            .any(|r| r.parent_node_id.is_some() && r.branch_length.is_none());
        Report::Table {
            columns: vec!["label", "x0", "x1", "y", "y_parent", "tip"],
            rows: rows
                .into_iter()
                .map(|r| {
                    vec![
                        r.label.into(),
                        r.x0.into(),
                        r.x1.into(),
                        r.y.into(),
                        r.y_parent.into(),
                        usize::from(r.is_tip).into(),
                    ]
                })
                .collect(),
            unitless,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_table_and_matrix() {
        let table = Report::Table {
            columns: vec!["a", "b"],
            rows: vec![
                vec![Value::Int(1), Value::Float(0.5)],
                vec![Value::Text("x".into()), Value::Missing],
            ],
            unitless: false,
        };
        assert_eq!(table.render("\t", None), "1\t0.5\nx\t-\n");
        assert_eq!(table.render(",", Some(2)), "1,0.50\nx,-\n");

        let matrix = Report::Matrix {
            labels: vec!["A".into(), "B".into()],
            rows: vec![vec![], vec![Value::Float(3.0)]],
            unitless: true,
        };
        assert_eq!(matrix.render("\t", None), "A\nB\t3\n");
        assert!(matrix.is_unitless());
        assert!(!table.is_unitless());
    }

    #[test]
    fn test_unitless_scalar() {
        let report: Report =
            PathLength { value: 2.0, missing_lengths: true }.into();
        assert!(report.is_unitless());
        assert_eq!(report.to_string(), "2\n");
        assert_eq!(Report::Labels(vec![]).render("\t", None), "");
    }
}
