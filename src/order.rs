//! Dependency ordering.

use crate::task::Task;
use std::cmp::Reverse;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// Compute a dependency-respecting order over `tasks`.
///
/// Depth-first post-order with three-colour marking. Roots and the
/// dependencies of each node are visited by descending priority, then by
/// insertion position, so independent tasks come out highest priority first
/// and the result is stable across runs. Dependencies on ids missing from
/// `index` are ignored.
///
/// Returns indices into `tasks`, or the ids along the first cycle found
/// (closing id repeated at the end).
pub(crate) fn topological_order(
    tasks: &[Task],
    index: &HashMap<String, usize>,
) -> Result<Vec<usize>, Vec<String>> {
    let rank = |i: usize| (Reverse(tasks[i].priority()), i);
    let dependencies_of = |i: usize| {
        let mut deps: Vec<usize> = tasks[i]
            .dependencies()
            .iter()
            .filter_map(|dep| index.get(dep).copied())
            .collect();
        deps.sort_by_key(|&d| rank(d));
        deps
    };

    let mut roots: Vec<usize> = (0..tasks.len()).collect();
    roots.sort_by_key(|&i| rank(i));

    let mut marks = vec![Mark::Unvisited; tasks.len()];
    let mut order = Vec::with_capacity(tasks.len());
    // (node, its ordered dependencies, next dependency to visit)
    let mut stack: Vec<(usize, Vec<usize>, usize)> = Vec::new();

    for root in roots {
        if marks[root] != Mark::Unvisited {
            continue;
        }
        marks[root] = Mark::InProgress;
        stack.push((root, dependencies_of(root), 0));

        while let Some((node, deps, cursor)) = stack.last_mut() {
            let Some(&dep) = deps.get(*cursor) else {
                let node = *node;
                marks[node] = Mark::Done;
                order.push(node);
                stack.pop();
                continue;
            };
            *cursor += 1;

            match marks[dep] {
                Mark::Unvisited => {
                    marks[dep] = Mark::InProgress;
                    stack.push((dep, dependencies_of(dep), 0));
                }
                Mark::InProgress => {
                    let start = stack
                        .iter()
                        .position(|(n, _, _)| *n == dep)
                        .unwrap_or(0);
                    let mut cycle: Vec<String> = stack[start..]
                        .iter()
                        .map(|(n, _, _)| tasks[*n].id().to_string())
                        .collect();
                    cycle.push(tasks[dep].id().to_string());
                    return Err(cycle);
                }
                Mark::Done => {}
            }
        }
    }

    Ok(order)
}
