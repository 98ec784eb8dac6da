//! Rebuild statistics input from persisted search records.

use subtopic_stats::SearchOutcome;

use crate::error::SearchError;
use crate::graph::TopicGraph;
use crate::types::KeywordSearchRecord;

/// Rebuild the [`SearchOutcome`] of a stored search.
///
/// Candidate lists are recomputed from the memoized graph: the step taken
/// at `path[i]` offered the children of `path[i]` not already in
/// `path[..=i]`. The last topic contributes a step only when the search
/// failed there after expanding it.
pub fn outcome_from_record(
    graph: &TopicGraph,
    record: &KeywordSearchRecord,
) -> Result<SearchOutcome, SearchError> {
    let path = graph.resolve_path(&record.path)?;
    let mut steps = Vec::new();

    for (i, &topic_id) in record.path.iter().enumerate() {
        let is_last = i + 1 == record.path.len();
        if is_last && (!record.failed || !graph.is_expanded(topic_id)?) {
            break;
        }

        let visited = &record.path[..=i];
        let candidates: Vec<_> = graph
            .children_of(topic_id)?
            .into_iter()
            .filter(|id| !visited.contains(id))
            .collect();
        steps.push(graph.resolve_path(&candidates)?);
    }

    Ok(SearchOutcome {
        keyword: record.keyword.clone(),
        found: record.found,
        failed: record.failed,
        path,
        steps,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use subtopic_storage::Storage;
    use tempfile::TempDir;

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn create_test_graph() -> (TopicGraph, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let storage = Arc::new(Storage::open(temp_dir.path()).unwrap());
        (TopicGraph::open(storage).unwrap(), temp_dir)
    }

    #[test]
    fn test_found_record() {
        let (graph, _dir) = create_test_graph();
        let physics = graph.get_or_create("physics").unwrap();
        let children = graph
            .add_children(physics, &names(&["optics", "mechanics"]))
            .unwrap();
        let optics = children[0];
        graph.add_children(optics, &names(&["lasers", "physics"])).unwrap();
        let lasers = graph.find("lasers").unwrap().unwrap();

        let mut record = KeywordSearchRecord::new("Lasers".to_string(), physics);
        record.path = vec![physics, optics, lasers];
        record.found = true;

        let outcome = outcome_from_record(&graph, &record).unwrap();
        assert_eq!(outcome.path, vec!["physics", "optics", "lasers"]);
        assert_eq!(
            outcome.steps,
            vec![names(&["optics", "mechanics"]), names(&["lasers"])]
        );
        assert_eq!(outcome.path_length(), 2);
    }

    #[test]
    fn test_failed_after_expansion_has_empty_step() {
        let (graph, _dir) = create_test_graph();
        let physics = graph.get_or_create("physics").unwrap();
        graph.add_children(physics, &[]).unwrap();

        let mut record = KeywordSearchRecord::new("zzz".to_string(), physics);
        record.failed = true;

        let outcome = outcome_from_record(&graph, &record).unwrap();
        assert_eq!(outcome.steps, vec![Vec::<String>::new()]);
    }

    #[test]
    fn test_failed_expansion_has_no_step() {
        let (graph, _dir) = create_test_graph();
        let physics = graph.get_or_create("physics").unwrap();

        let mut record = KeywordSearchRecord::new("zzz".to_string(), physics);
        record.failed = true;

        let outcome = outcome_from_record(&graph, &record).unwrap();
        assert!(outcome.steps.is_empty());
        assert!(outcome.failed);
    }
}
