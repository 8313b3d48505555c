use super::compression::CompressedPath;
use super::swap_path::SwapPath;
use ahash::HashSet;

/// A set of swap paths that makes sure that there are no duplicates.
///
/// Paths are keyed by their compressed form and kept in insertion order, so repeated
/// traversals of the same graph produce the same sequence.
#[derive(Default)]
pub struct SwapPathSet {
    seen: HashSet<CompressedPath>,
    paths: Vec<SwapPath>,
}

impl SwapPathSet {
    /// Create a new empty swap path set
    pub fn new() -> SwapPathSet {
        SwapPathSet::default()
    }

    /// Insert a swap path, returns false if it was already present
    pub fn insert(&mut self, path: SwapPath) -> bool {
        if !self.seen.insert(path.compressed()) {
            return false;
        }
        self.paths.push(path);
        true
    }

    /// Extend from a vector of swap paths
    pub fn extend(&mut self, path_vec: Vec<SwapPath>) {
        for path in path_vec {
            self.insert(path);
        }
    }

    /// Convert the set to a vector
    pub fn vec(self) -> Vec<SwapPath> {
        self.paths
    }

    pub fn compressed(&self) -> Vec<CompressedPath> {
        self.paths.iter().map(SwapPath::compressed).collect()
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::graph::PathLeg;
    use crate::utils::constants::ChainId;
    use crate::utils::{DexConfig, Token};
    use std::sync::Arc;

    #[test]
    fn test_swap_path_set() {
        let dex = Arc::new(DexConfig::base_aerodrome_v2());
        let token1 = Arc::new(Token::random(ChainId::BASE));
        let token2 = Arc::new(Token::random(ChainId::BASE));
        let token3 = Arc::new(Token::random(ChainId::BASE));

        let swap_path_1 = SwapPath::new_first(PathLeg::new(dex.clone(), token1.clone(), token2.clone(), false));
        let swap_path_2 = SwapPath::new_first(PathLeg::new(dex.clone(), token2.clone(), token3.clone(), false));
        let swap_path_3 = SwapPath::new_first(PathLeg::new(dex.clone(), token2.clone(), token3.clone(), true));

        let mut swap_path_set = SwapPathSet::new();
        swap_path_set.extend(vec![swap_path_1.clone(), swap_path_2.clone(), swap_path_3.clone()]);
        // second time should not add anything
        swap_path_set.extend(vec![swap_path_1.clone(), swap_path_2.clone(), swap_path_3.clone()]);

        assert_eq!(swap_path_set.len(), 3);

        let swap_paths = swap_path_set.vec();
        assert_eq!(swap_paths, vec![swap_path_1, swap_path_2, swap_path_3]);
    }
}
