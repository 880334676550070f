//! evaluation order
//!
//! Kahn's algorithm over the [DependencyGraph]. Keys without pending dependencies are taken in catalog order, so a
//! document without references is evaluated top to bottom.
use crate::error::CycleError;
use crate::graph::DependencyGraph;
use std::collections::{HashMap, VecDeque};

/// Order `keys` so that every key comes after the keys it depends on
///
/// Dependencies on keys that are not part of `keys` are ignored.
#[tracing::instrument(level = "trace", skip_all)]
pub fn topological_order(keys: &[String], graph: &DependencyGraph) -> Result<Vec<String>, CycleError> {
    let mut pending: HashMap<&str, usize> = keys.iter().map(|key| (key.as_str(), 0)).collect();
    let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();

    for key in keys {
        for dependency in graph.dependencies(key) {
            if !pending.contains_key(dependency) {
                continue;
            }
            dependents.entry(dependency).or_default().push(key);
            if let Some(count) = pending.get_mut(key.as_str()) {
                *count += 1;
            }
        }
    }

    let mut ready: VecDeque<&str> = keys
        .iter()
        .map(String::as_str)
        .filter(|key| pending.get(key) == Some(&0))
        .collect();

    let mut order = Vec::with_capacity(keys.len());
    while let Some(key) = ready.pop_front() {
        order.push(key.to_owned());

        for dependent in dependents.get(key).into_iter().flatten() {
            let Some(count) = pending.get_mut(dependent) else {
                continue;
            };
            *count -= 1;
            if *count == 0 {
                ready.push_back(*dependent);
            }
        }
    }

    if order.len() < keys.len() {
        let residual: Vec<&str> = keys
            .iter()
            .map(String::as_str)
            .filter(|key| pending.get(key).is_some_and(|count| *count > 0))
            .collect();
        return Err(find_cycle(&residual, graph));
    }

    tracing::trace!(?order, "evaluation order");
    Ok(order)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    InStack,
    Done,
}

/// Closed path through the keys that could not be ordered
fn find_cycle(residual: &[&str], graph: &DependencyGraph) -> CycleError {
    let mut marks: HashMap<&str, Mark> = HashMap::new();
    let mut parents: HashMap<&str, &str> = HashMap::new();

    for &start in residual {
        if marks.contains_key(start) {
            continue;
        }

        // iterative dfs, each frame remembers the index of the next dependency to visit
        let mut stack: Vec<(&str, usize)> = vec![(start, 0)];
        marks.insert(start, Mark::InStack);

        while let Some(frame) = stack.last_mut() {
            let (node, next) = *frame;
            frame.1 += 1;
            let dependency = graph
                .dependencies(node)
                .filter(|dependency| residual.contains(dependency))
                .nth(next);

            let Some(dependency) = dependency else {
                marks.insert(node, Mark::Done);
                stack.pop();
                continue;
            };

            match marks.get(dependency) {
                Some(Mark::InStack) => return CycleError::new(close(node, dependency, &parents)),
                Some(Mark::Done) => {}
                None => {
                    parents.insert(dependency, node);
                    marks.insert(dependency, Mark::InStack);
                    stack.push((dependency, 0));
                }
            }
        }
    }

    // every residual key waits on another residual key, so the search above always finds a cycle
    let mut cycle: Vec<String> = residual.iter().map(|key| key.to_string()).collect();
    if let Some(first) = cycle.first().cloned() {
        cycle.push(first);
    }
    CycleError::new(cycle)
}

/// `target -> ... -> node -> target`, following dependency direction
fn close(node: &str, target: &str, parents: &HashMap<&str, &str>) -> Vec<String> {
    let mut path = vec![node.to_owned()];
    let mut current = node;
    while current != target {
        match parents.get(current) {
            Some(&parent) => {
                current = parent;
                path.push(current.to_owned());
            }
            None => break,
        }
    }
    path.reverse();
    path.push(target.to_owned());
    path
}
