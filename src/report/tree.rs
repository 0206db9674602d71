use crate::profile::{Profile, ValueType};
use std::collections::HashMap;

/// One call path position, merged across samples
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Function name, or the hex address when never symbolized
    pub name: String,
    /// First address attributed to this node
    pub address: u64,
    pub file: String,
    pub line: u32,
    pub flat: i64,
    pub cum: i64,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
}

/// Call tree aggregated from a (filtered) profile, rooted at outermost callers
#[derive(Debug, Clone, PartialEq)]
pub struct ReportTree {
    pub nodes: Vec<Node>,
    pub roots: Vec<usize>,
    pub value_type: ValueType,
    /// Sum over the samples in the tree
    pub total: i64,
    /// Sum over the profile before filtering
    pub profile_total: i64,
    pub cumulative: bool,
}

impl ReportTree {
    pub(super) fn build(
        profile: &Profile,
        index: usize,
        profile_total: i64,
        cumulative: bool,
    ) -> Self {
        let mut tree = ReportTree {
            nodes: Vec::new(),
            roots: Vec::new(),
            value_type: profile
                .sample_types
                .get(index)
                .cloned()
                .unwrap_or_else(|| ValueType::new("samples", "count")),
            total: 0,
            profile_total,
            cumulative,
        };
        let mut lookup: HashMap<(Option<usize>, String), usize> = HashMap::new();

        for sample in &profile.samples {
            let value = sample.values.get(index).copied().unwrap_or(0);
            tree.total += value;

            let mut parent: Option<usize> = None;
            for &addr in sample.stack.iter().rev() {
                let frames = profile.frames(addr);
                let path: Vec<(String, &str, u32)> = if frames.is_empty() {
                    vec![(format!("{:#x}", addr), "", 0)]
                } else {
                    // Outermost inlined caller first
                    frames
                        .iter()
                        .rev()
                        .map(|f| (f.function.clone(), f.file.as_str(), f.line))
                        .collect()
                };

                for (name, file, line) in path {
                    let idx = *lookup.entry((parent, name.clone())).or_insert_with(|| {
                        tree.nodes.push(Node {
                            name,
                            address: addr,
                            file: file.to_string(),
                            line,
                            flat: 0,
                            cum: 0,
                            parent,
                            children: Vec::new(),
                        });
                        let idx = tree.nodes.len() - 1;
                        match parent {
                            Some(p) => tree.nodes[p].children.push(idx),
                            None => tree.roots.push(idx),
                        }
                        idx
                    });
                    tree.nodes[idx].cum += value;
                    parent = Some(idx);
                }
            }

            if let Some(leaf) = parent {
                tree.nodes[leaf].flat += value;
            }
        }

        tree
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Value the active sort mode ranks by
    pub fn value(&self, idx: usize) -> i64 {
        let node = &self.nodes[idx];
        if self.cumulative { node.cum } else { node.flat }
    }

    /// Node indices by active value descending, then name, then first appearance
    pub fn sorted(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.nodes.len()).collect();
        order.sort_by(|&a, &b| {
            self.value(b)
                .cmp(&self.value(a))
                .then_with(|| self.nodes[a].name.cmp(&self.nodes[b].name))
                .then(a.cmp(&b))
        });
        order
    }

    /// Whether `idx` or any of its descendants satisfies `pred`
    pub fn subtree_any(&self, idx: usize, pred: &dyn Fn(&Node) -> bool) -> bool {
        pred(&self.nodes[idx])
            || self.nodes[idx]
                .children
                .iter()
                .any(|&c| self.subtree_any(c, pred))
    }

    /// Ancestors of `idx`, nearest first
    pub fn ancestors(&self, idx: usize) -> impl Iterator<Item = usize> + '_ {
        std::iter::successors(self.nodes[idx].parent, |&p| self.nodes[p].parent)
    }

    /// Display label per node.
    ///
    /// A name carried by a single node is its own label. Nodes sharing a name
    /// are labelled with the shortest tail of their call path (`caller > name`)
    /// that no other node of that name ends with.
    pub fn labels(&self) -> Vec<String> {
        let mut by_name: HashMap<&str, Vec<usize>> = HashMap::new();
        for (idx, node) in self.nodes.iter().enumerate() {
            by_name.entry(node.name.as_str()).or_default().push(idx);
        }

        let mut labels: Vec<String> = self.nodes.iter().map(|n| n.name.clone()).collect();
        for group in by_name.values().filter(|g| g.len() > 1) {
            let paths: Vec<Vec<&str>> = group.iter().map(|&i| self.path(i)).collect();
            for (pos, &idx) in group.iter().enumerate() {
                let own = &paths[pos];
                let depth = (2..=own.len())
                    .find(|&k| {
                        paths
                            .iter()
                            .enumerate()
                            .all(|(other, path)| other == pos || tail(path, k) != tail(own, k))
                    })
                    .unwrap_or(own.len());
                labels[idx] = tail(own, depth).join(" > ");
            }
        }
        labels
    }

    /// Names from the root down to `idx`
    pub fn path(&self, idx: usize) -> Vec<&str> {
        let mut path: Vec<&str> = self
            .ancestors(idx)
            .map(|a| self.nodes[a].name.as_str())
            .collect();
        path.reverse();
        path.push(&self.nodes[idx].name);
        path
    }
}

fn tail<'a>(path: &'a [&'a str], k: usize) -> &'a [&'a str] {
    &path[path.len().saturating_sub(k)..]
}
