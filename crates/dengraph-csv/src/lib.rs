//! CSV adjacency-matrix wire format: a header row of node identifiers, then one row per node
//! giving its outgoing weight to every column node, `0` meaning "no edge".
//!
//! ```text
//! 1,2,3,4,5,6,7,8
//! 0,1,1,1,1,2,0,1
//! 1,0,0,0,0,0,0,0
//! ...
//! ```

use dengraph_core::AdjacencyGraph;
use indexmap::IndexMap;

#[derive(Debug, thiserror::Error)]
pub enum CsvAdapterError {
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("empty input: expected a header row of node identifiers")]
    MissingHeader,

    #[error("row {row} has {found} fields, expected {expected} (one per header node)")]
    RaggedRow {
        row: usize,
        found: usize,
        expected: usize,
    },

    #[error("found {found} data rows, expected exactly {expected} (one per header node)")]
    RowCountMismatch { found: usize, expected: usize },

    #[error("row {row}, column {column:?}: {field:?} is not a valid weight")]
    InvalidWeight {
        row: usize,
        column: String,
        field: String,
        #[source]
        source: std::num::ParseFloatError,
    },
}

/// Parse an adjacency-matrix CSV into an [`AdjacencyGraph`].
///
/// `symmetric` controls whether the resulting graph mirrors writes — it does not, by itself,
/// require the input matrix to already be symmetric; an asymmetric input read with
/// `symmetric = true` has its transpose loaded as well, matching the reference reader's
/// `symmetric=true` behaviour.
pub fn read_adjacency<R: std::io::Read>(
    reader: R,
    symmetric: bool,
) -> Result<AdjacencyGraph<String>, CsvAdapterError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);
    let mut records = csv_reader.records();

    let header = records.next().ok_or(CsvAdapterError::MissingHeader)??;
    let nodes: Vec<String> = header.iter().map(str::to_owned).collect();

    let mut source: IndexMap<String, IndexMap<String, f64>> = IndexMap::new();
    for node in &nodes {
        source.entry(node.clone()).or_default();
    }

    let mut row_index = 0usize;
    for record in records {
        let record = record?;
        if row_index >= nodes.len() {
            row_index += 1;
            continue;
        }
        if record.len() != nodes.len() {
            return Err(CsvAdapterError::RaggedRow {
                row: row_index,
                found: record.len(),
                expected: nodes.len(),
            });
        }
        let from = nodes[row_index].clone();
        for (column, field) in record.iter().enumerate() {
            let weight: f64 = field.trim().parse().map_err(|source| CsvAdapterError::InvalidWeight {
                row: row_index,
                column: nodes[column].clone(),
                field: field.to_string(),
                source,
            })?;
            if weight != 0.0 {
                source.get_mut(&from).expect("node inserted above").insert(nodes[column].clone(), weight);
            }
        }
        row_index += 1;
    }

    if row_index != nodes.len() {
        return Err(CsvAdapterError::RowCountMismatch {
            found: row_index,
            expected: nodes.len(),
        });
    }

    Ok(AdjacencyGraph::from_map(source, f64::INFINITY, symmetric))
}

#[cfg(test)]
mod tests {
    use super::*;
    use dengraph_core::Graph;

    const FIXTURE: &str = "\
1,2,3,4,5,6,7,8
0,1,1,1,1,2,0,1
1,0,0,0,0,0,0,0
1,0,0,0,0,0,0,0
1,0,0,0,0,0,0,0
1,0,0,0,0,0,0,0
2,0,0,0,0,0,1,0
0,0,0,0,0,1,0,0
1,0,0,0,0,0,0,0
";

    #[test]
    fn reads_declared_edges() {
        let graph = read_adjacency(FIXTURE.as_bytes(), true).unwrap();
        assert_eq!(graph.edge(&"6".to_string(), &"7".to_string()).unwrap(), 1.0);
        assert_eq!(graph.edge(&"7".to_string(), &"6".to_string()).unwrap(), 1.0);
        assert_eq!(graph.edge(&"1".to_string(), &"6".to_string()).unwrap(), 2.0);
    }

    #[test]
    fn zero_means_no_edge() {
        let graph = read_adjacency(FIXTURE.as_bytes(), false).unwrap();
        assert!(!graph.contains_edge(&"2".to_string(), &"3".to_string()));
    }

    #[test]
    fn rejects_missing_header() {
        assert!(matches!(
            read_adjacency("".as_bytes(), false),
            Err(CsvAdapterError::MissingHeader)
        ));
    }

    #[test]
    fn rejects_ragged_row() {
        let bad = "a,b,c\n1,0,0\n0,1\n0,0,1\n";
        assert!(matches!(
            read_adjacency(bad.as_bytes(), false),
            Err(CsvAdapterError::RaggedRow { row: 1, .. })
        ));
    }

    #[test]
    fn rejects_wrong_row_count() {
        let too_few = "a,b,c\n0,1,0\n1,0,0\n";
        assert!(matches!(
            read_adjacency(too_few.as_bytes(), false),
            Err(CsvAdapterError::RowCountMismatch { found: 2, expected: 3 })
        ));
    }

    #[test]
    fn rejects_non_numeric_weight() {
        let bad = "a,b\nx,0\n0,0\n";
        assert!(matches!(
            read_adjacency(bad.as_bytes(), false),
            Err(CsvAdapterError::InvalidWeight { .. })
        ));
    }
}
