//! Bottom-up version propagation over an arbitrary dependency graph.
//!
//! Used twice: once over module nodes and once over chunks. Strongly
//! connected components come out of `tarjan_scc` in reverse topological
//! order, so every dependency outside a component is final before the
//! component itself is hashed.

use std::fmt::Display;
use std::hash::Hash;

use kiln_graph::HashAlgorithm;
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use rustc_hash::{FxHashMap as HashMap, FxHashSet as HashSet};

use crate::config::CyclePolicy;

/// Effective versions for `keys`, in the same order.
///
/// `raw` gives the raw digest of a key and `deps` its dependencies; unknown
/// dependencies are ignored. With [`CyclePolicy::Reject`] the members of the
/// first cycle found are returned as the error, in `keys` order.
pub(crate) fn propagate<K, R, D>(
    keys: &[K],
    raw: R,
    deps: D,
    algorithm: HashAlgorithm,
    cycles: CyclePolicy,
) -> Result<Vec<String>, Vec<K>>
where
    K: Clone + Eq + Hash + Ord + Display,
    R: Fn(&K) -> String,
    D: Fn(&K) -> Vec<K>,
{
    let position: HashMap<&K, usize> = keys.iter().enumerate().map(|(i, k)| (k, i)).collect();
    let raws: Vec<String> = keys.iter().map(&raw).collect();

    // Dependencies as positions, sorted by key so digests never see
    // discovery order.
    let deps_of: Vec<Vec<usize>> = keys
        .iter()
        .map(|key| {
            let mut found: Vec<&K> = Vec::new();
            let listed = deps(key);
            for dep in &listed {
                if let Some((known, _)) = position.get_key_value(dep) {
                    found.push(*known);
                }
            }
            found.sort();
            found.dedup();
            found.into_iter().map(|dep| position[dep]).collect()
        })
        .collect();

    let mut graph = DiGraph::<usize, ()>::with_capacity(keys.len(), 0);
    for index in 0..keys.len() {
        graph.add_node(index);
    }
    for (from, targets) in deps_of.iter().enumerate() {
        for &to in targets {
            graph.add_edge(NodeIndex::new(from), NodeIndex::new(to), ());
        }
    }

    let mut effective: Vec<Option<String>> = vec![None; keys.len()];
    let final_of = |effective: &[Option<String>], index: usize| -> String {
        effective[index].clone().unwrap_or_default()
    };

    for scc in tarjan_scc(&graph) {
        let mut members: Vec<usize> = scc.iter().map(|node| graph[*node]).collect();
        members.sort_unstable();

        let cyclic = members.len() > 1 || deps_of[members[0]].contains(&members[0]);
        if !cyclic {
            let member = members[0];
            let mut hasher = algorithm.hasher();
            hasher.update(raws[member].as_bytes());
            for &dep in &deps_of[member] {
                hasher.update(final_of(&effective, dep).as_bytes());
            }
            effective[member] = Some(hasher.finalize_hex());
            continue;
        }

        if cycles == CyclePolicy::Reject {
            return Err(members.iter().map(|&m| keys[m].clone()).collect());
        }

        let inside: HashSet<usize> = members.iter().copied().collect();
        let mut by_key = members.clone();
        by_key.sort_by(|a, b| keys[*a].cmp(&keys[*b]));

        let mut seed = algorithm.hasher();
        for &member in &by_key {
            seed.update(keys[member].to_string().as_bytes())
                .update(b"\0")
                .update(raws[member].as_bytes())
                .update(b"\n");
        }
        let mut leaving: Vec<usize> = by_key
            .iter()
            .flat_map(|&member| deps_of[member].iter().copied())
            .filter(|dep| !inside.contains(dep))
            .collect();
        leaving.sort_by(|a, b| keys[*a].cmp(&keys[*b]));
        leaving.dedup();
        for dep in leaving {
            seed.update(final_of(&effective, dep).as_bytes());
        }
        let seed = seed.finalize_hex();

        let mut computed = Vec::with_capacity(members.len());
        for &member in &members {
            let mut hasher = algorithm.hasher();
            hasher.update(raws[member].as_bytes());
            for &dep in &deps_of[member] {
                let contribution = if inside.contains(&dep) {
                    let mut inner = algorithm.hasher();
                    inner.update(raws[dep].as_bytes()).update(seed.as_bytes());
                    inner.finalize_hex()
                } else {
                    final_of(&effective, dep)
                };
                hasher.update(contribution.as_bytes());
            }
            computed.push((member, hasher.finalize_hex()));
        }
        for (member, version) in computed {
            effective[member] = Some(version);
        }
    }

    Ok(effective.into_iter().map(Option::unwrap_or_default).collect())
}
