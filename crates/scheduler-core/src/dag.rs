//! Cycle detection over a task dependency graph.

use std::collections::HashMap;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

/// Decide whether a dependency graph (`task -> [deps]`) contains a cycle.
///
/// Uses an explicit stack rather than native recursion so pathological
/// input depth cannot overflow the call stack. Iteration order over the
/// graph's keys is sorted purely to make test failures reproducible; it
/// has no bearing on the boolean result.
pub fn has_cycle(graph: &HashMap<String, Vec<String>>) -> bool {
    let mut colors: HashMap<String, Color> = HashMap::new();

    let mut starts: Vec<&String> = graph.keys().collect();
    starts.sort();

    for start in starts {
        if colors.get(start).copied().unwrap_or(Color::White) != Color::White {
            continue;
        }
        if dfs_from(graph, &mut colors, start) {
            return true;
        }
    }
    false
}

fn dfs_from(graph: &HashMap<String, Vec<String>>, colors: &mut HashMap<String, Color>, start: &str) -> bool {
    let empty: Vec<String> = Vec::new();
    let mut stack: Vec<(String, usize)> = vec![(start.to_string(), 0)];
    colors.insert(start.to_string(), Color::Gray);

    while let Some((node, idx)) = stack.last().cloned() {
        let children = graph.get(&node).unwrap_or(&empty);
        if idx < children.len() {
            let child = children[idx].clone();
            stack.last_mut().unwrap().1 += 1;
            match colors.get(&child).copied().unwrap_or(Color::White) {
                Color::White => {
                    colors.insert(child.clone(), Color::Gray);
                    stack.push((child, 0));
                }
                Color::Gray => return true,
                Color::Black => {}
            }
        } else {
            colors.insert(node, Color::Black);
            stack.pop();
        }
    }
    false
}
