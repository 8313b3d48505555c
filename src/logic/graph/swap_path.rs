use super::compression::{CompressedPath, compress_path};
use crate::utils::{DexConfig, Token};
use eyre::{Result, eyre};
use std::fmt::Display;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// One swap between adjacent tokens on a DEX.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PathLeg {
    pub dex: Arc<DexConfig>,
    pub from: Arc<Token>,
    pub to: Arc<Token>,
    /// Route through the DEX's stable pool for this pair
    pub stable: bool,
}

impl PathLeg {
    pub fn new(dex: Arc<DexConfig>, from: Arc<Token>, to: Arc<Token>, stable: bool) -> Self {
        Self { dex, from, to, stable }
    }
}

impl Display for PathLeg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}->{}", self.dex.name, self.from.checksummed(), self.to.checksummed())?;
        if self.stable {
            write!(f, "(stable)")?;
        }
        Ok(())
    }
}

/// Non-empty ordered legs where each leg starts at the previous leg's output token.
#[derive(Clone, Debug, Default, Eq)]
pub struct SwapPath {
    legs: Vec<PathLeg>,
}

impl Display for SwapPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SwapPath(legs={:?})", self.legs.iter().map(|leg| leg.to_string()).collect::<Vec<String>>())
    }
}

impl SwapPath {
    /// Create a swap path from legs, rejecting empty or disconnected sequences
    pub fn new(legs: Vec<PathLeg>) -> Result<Self> {
        let mut legs = legs.into_iter();
        let first = legs.next().ok_or_else(|| eyre!("Swap path is empty"))?;
        let mut path = SwapPath::new_first(first);
        for leg in legs {
            path.push_leg(leg)?;
        }
        Ok(path)
    }

    /// Create a new swap path with only one leg
    pub fn new_first(leg: PathLeg) -> Self {
        SwapPath { legs: vec![leg] }
    }

    /// Push a leg that must start where the path currently ends
    pub fn push_leg(&mut self, leg: PathLeg) -> Result<&mut Self> {
        let last = self.legs.last().ok_or_else(|| eyre!("Swap path is empty"))?;
        if last.to != leg.from {
            return Err(eyre!("Leg {} does not continue from {}", leg, last.to));
        }
        self.legs.push(leg);
        Ok(self)
    }

    pub fn legs(&self) -> &[PathLeg] {
        &self.legs
    }

    pub fn is_empty(&self) -> bool {
        self.legs.is_empty()
    }

    /// The hop count of the swap path
    pub fn len(&self) -> usize {
        self.legs.len()
    }

    pub fn token_in(&self) -> Option<&Arc<Token>> {
        self.legs.first().map(|leg| &leg.from)
    }

    pub fn token_out(&self) -> Option<&Arc<Token>> {
        self.legs.last().map(|leg| &leg.to)
    }

    /// Token sequence `token_in, ..., token_out`
    pub fn tokens(&self) -> Vec<Arc<Token>> {
        let mut tokens: Vec<Arc<Token>> = self.legs.iter().map(|leg| leg.from.clone()).collect();
        if let Some(last) = self.legs.last() {
            tokens.push(last.to.clone());
        }
        tokens
    }

    pub(crate) fn set_stable(&mut self, index: usize, stable: bool) {
        if let Some(leg) = self.legs.get_mut(index) {
            leg.stable = stable;
        }
    }

    pub fn compressed(&self) -> CompressedPath {
        compress_path(self)
    }
}

impl Hash for SwapPath {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.legs.hash(state);
    }
}

impl PartialEq for SwapPath {
    fn eq(&self, other: &Self) -> bool {
        self.legs == other.legs
    }
}
