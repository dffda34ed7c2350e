use indexmap::IndexSet;
use std::collections::HashSet;

/// Users of `target` that also appear in `others`, in `target` order and
/// without duplicates. Intersecting with an empty `others` yields nothing.
pub fn intersect(target: &[String], others: &[String]) -> Vec<String> {
    let others: HashSet<&str> = others.iter().map(String::as_str).collect();

    let included: IndexSet<&str> = target
        .iter()
        .map(String::as_str)
        .filter(|user| others.contains(user))
        .collect();

    included.into_iter().map(String::from).collect()
}
