use std::collections::BTreeMap;

/// What a symbol index entry points back to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Variable,
    Constant,
    Function,
}

/// Index over every name discovered in the target's debug information
/// (variables, constants, functions).
///
/// Built once at attach, read-only afterwards. Fuzzy results come back in
/// ascending insertion order.
#[derive(Debug, Default)]
pub struct SymbolIndex {
    entries: Vec<(String, SymbolKind)>,
    root: Node,
}

#[derive(Debug, Default)]
struct Node {
    children: BTreeMap<u8, Node>,
    entry: Option<usize>,
}

impl SymbolIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a name to the index. Re-inserting a name replaces its kind.
    pub fn insert(&mut self, name: &str, kind: SymbolKind) {
        let mut node = &mut self.root;
        for b in name.bytes() {
            node = node.children.entry(b).or_default();
        }

        match node.entry {
            Some(i) => self.entries[i].1 = kind,
            None => {
                self.entries.push((name.to_owned(), kind));
                node.entry = Some(self.entries.len() - 1);
            }
        }
    }

    /// Exact lookup.
    pub fn find(&self, name: &str) -> Option<SymbolKind> {
        let mut node = &self.root;
        for b in name.bytes() {
            node = node.children.get(&b)?;
        }
        node.entry.map(|i| self.entries[i].1)
    }

    /// Names starting with `prefix`, in insertion order.
    pub fn prefix_search(&self, prefix: &str) -> Vec<String> {
        let mut node = &self.root;
        for b in prefix.bytes() {
            match node.children.get(&b) {
                Some(n) => node = n,
                None => return Vec::new(),
            }
        }

        let mut indices = Vec::new();
        collect_entries(node, &mut indices);
        indices.sort_unstable();
        indices
            .into_iter()
            .map(|i| self.entries[i].0.clone())
            .collect()
    }

    /// Names containing `expr` as a subsequence (which covers every prefix
    /// match), in insertion order.
    pub fn fuzzy_search(&self, expr: &str) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(name, _)| is_subsequence(expr, name))
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn collect_entries(node: &Node, out: &mut Vec<usize>) {
    if let Some(i) = node.entry {
        out.push(i);
    }
    for child in node.children.values() {
        collect_entries(child, out);
    }
}

fn is_subsequence(needle: &str, haystack: &str) -> bool {
    let mut bytes = haystack.bytes();
    needle.bytes().all(|n| bytes.any(|h| h == n))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SymbolIndex {
        let mut idx = SymbolIndex::new();
        idx.insert("pkg.Alpha", SymbolKind::Variable);
        idx.insert("pkg.Alphabet", SymbolKind::Variable);
        idx.insert("other.Beta", SymbolKind::Constant);
        idx.insert("main.main", SymbolKind::Function);
        idx
    }

    #[test]
    fn exact_find() {
        let idx = sample();
        assert_eq!(idx.find("pkg.Alpha"), Some(SymbolKind::Variable));
        assert_eq!(idx.find("other.Beta"), Some(SymbolKind::Constant));
        assert_eq!(idx.find("pkg.Alph"), None);
        assert_eq!(idx.find("missing"), None);
    }

    #[test]
    fn fuzzy_matches_in_insertion_order() {
        let idx = sample();
        assert_eq!(idx.fuzzy_search("Alph"), vec!["pkg.Alpha", "pkg.Alphabet"]);
    }

    #[test]
    fn fuzzy_matches_subsequences() {
        let idx = sample();
        // 'p', 'A', 'a' appear in order in both pkg.* names.
        assert_eq!(idx.fuzzy_search("pAa"), vec!["pkg.Alpha", "pkg.Alphabet"]);
        assert!(idx.fuzzy_search("zzz").is_empty());
    }

    #[test]
    fn prefix_search_honors_insertion_order() {
        let idx = sample();
        assert_eq!(idx.prefix_search("pkg."), vec!["pkg.Alpha", "pkg.Alphabet"]);
        assert!(idx.prefix_search("pkg.Alphabets").is_empty());
    }

    #[test]
    fn names_are_indexed_once() {
        let mut idx = sample();
        idx.insert("pkg.Alpha", SymbolKind::Constant);

        assert_eq!(idx.len(), 4);
        assert_eq!(idx.find("pkg.Alpha"), Some(SymbolKind::Constant));
        assert_eq!(
            idx.fuzzy_search("Alpha")
                .iter()
                .filter(|n| n.as_str() == "pkg.Alpha")
                .count(),
            1
        );
    }
}
