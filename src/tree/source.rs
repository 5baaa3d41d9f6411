//! The conventional node-with-children tree the builder consumes.

/// Mutable input tree node.
///
/// This is the builder's only view of the caller's data: children iterable in
/// a deterministic order, a symbol per edge, a terminal flag, and an optional
/// integer payload.  Children are kept sorted by symbol so inserts stay
/// logarithmic; the builder re-orders them by mapped value code when it lays
/// the units out.
#[derive(Debug, Clone, Default)]
pub struct SourceNode {
    pub(crate) symbol: i32,
    pub(crate) word_end: bool,
    pub(crate) data: Option<u32>,
    pub(crate) children: Vec<SourceNode>,
}

impl SourceNode {
    /// The root node; its symbol slot is the reserved code 0.
    pub fn root() -> Self {
        SourceNode::default()
    }

    fn new(symbol: i32) -> Self {
        SourceNode {
            symbol,
            ..SourceNode::default()
        }
    }

    pub fn symbol(&self) -> i32 {
        self.symbol
    }

    pub fn is_word_end(&self) -> bool {
        self.word_end
    }

    pub fn data(&self) -> Option<u32> {
        self.data
    }

    pub fn children(&self) -> &[SourceNode] {
        &self.children
    }

    /// Insert one key given as a symbol path; a later duplicate overwrites
    /// the payload.
    pub fn add_path(&mut self, path: &[i32], data: Option<u32>) {
        let mut node = self;
        for &symbol in path {
            let index = match node
                .children
                .binary_search_by_key(&symbol, |child| child.symbol)
            {
                Ok(found) => found,
                Err(insert_at) => {
                    node.children.insert(insert_at, SourceNode::new(symbol));
                    insert_at
                }
            };
            node = &mut node.children[index];
        }
        node.word_end = true;
        if data.is_some() {
            node.data = data;
        }
    }

    /// Total node count, this node included.
    pub fn node_count(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(SourceNode::node_count)
            .sum::<usize>()
    }
}

/// How a token list becomes a source tree.
#[derive(Debug, Clone, Default)]
pub struct IngestOptions {
    /// Insert each token back-to-front (suffix dictionary).
    pub reverse: bool,
    /// Attach the 0-based token index as the payload.
    pub with_data: bool,
    /// Split each token on whitespace and insert the pieces separately.
    pub split_word: bool,
}

/// Build a source tree from a token list.
///
/// Symbols are the tokens' Unicode scalar values.  Empty tokens are skipped;
/// with `split_word`, every whitespace-separated piece of a token is inserted
/// under the token's index.
pub fn source_from_tokens<'a, I>(tokens: I, options: &IngestOptions) -> SourceNode
where
    I: IntoIterator<Item = &'a str>,
{
    let mut root = SourceNode::root();
    for (index, token) in tokens.into_iter().enumerate() {
        let data = if options.with_data {
            Some(index as u32)
        } else {
            None
        };
        if options.split_word {
            for piece in token.split_whitespace() {
                insert_token(&mut root, piece, data, options.reverse);
            }
        } else {
            insert_token(&mut root, token.trim(), data, options.reverse);
        }
    }
    root
}

fn insert_token(root: &mut SourceNode, token: &str, data: Option<u32>, reverse: bool) {
    if token.is_empty() {
        return;
    }
    let mut path: Vec<i32> = token.chars().map(|ch| ch as i32).collect();
    if reverse {
        path.reverse();
    }
    root.add_path(&path, data);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_prefixes_share_nodes() {
        let root = source_from_tokens(["abc", "abd"], &IngestOptions::default());
        // root -> a -> b -> {c, d}
        assert_eq!(root.node_count(), 5);
        assert_eq!(root.children().len(), 1);
        let b = &root.children()[0].children()[0];
        assert_eq!(b.children().len(), 2);
        assert!(b.children().iter().all(SourceNode::is_word_end));
    }

    #[test]
    fn with_data_attaches_token_indexes() {
        let options = IngestOptions {
            with_data: true,
            ..IngestOptions::default()
        };
        let root = source_from_tokens(["xy", "xz"], &options);
        let x = &root.children()[0];
        assert_eq!(x.children()[0].data(), Some(0));
        assert_eq!(x.children()[1].data(), Some(1));
    }

    #[test]
    fn reverse_inserts_back_to_front() {
        let options = IngestOptions {
            reverse: true,
            ..IngestOptions::default()
        };
        let root = source_from_tokens(["abc"], &options);
        assert_eq!(root.children()[0].symbol(), 'c' as i32);
    }

    #[test]
    fn split_word_inserts_pieces() {
        let options = IngestOptions {
            split_word: true,
            ..IngestOptions::default()
        };
        let root = source_from_tokens(["foo bar"], &options);
        assert_eq!(root.children().len(), 2);
    }

    #[test]
    fn children_are_sorted_by_symbol() {
        let root = source_from_tokens(["c", "a", "b"], &IngestOptions::default());
        let symbols: Vec<i32> = root.children().iter().map(SourceNode::symbol).collect();
        assert_eq!(symbols, vec!['a' as i32, 'b' as i32, 'c' as i32]);
    }
}
