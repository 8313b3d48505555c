use crate::logic::types::PoolRecord;
use async_trait::async_trait;
use eyre::Result;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};

/// One page of pools created at or after the requested block.
#[derive(Clone, Debug, Default)]
pub struct PoolBatch {
    pub pools: Vec<PoolRecord>,
    /// Chain head as seen by the source
    pub latest_block_number: u64,
    /// The source holds more pools past this page
    pub has_more: bool,
}

/// Where pool-creation events come from (an indexer, a subgraph, a log scanner).
#[async_trait]
pub trait PoolSource: Send + Sync {
    async fn fetch(&self, start_block: u64) -> Result<PoolBatch>;
}

#[async_trait]
impl<F, Fut> PoolSource for F
where
    F: Fn(u64) -> Fut + Send + Sync,
    Fut: Future<Output = Result<PoolBatch>> + Send,
{
    async fn fetch(&self, start_block: u64) -> Result<PoolBatch> {
        (self)(start_block).await
    }
}

/// In-memory source serving a fixed pool list in pages.
///
/// A page never ends in the middle of a block: pools sharing the last block number are pushed
/// to the next page, unless that block alone exceeds the page size.
pub struct StaticPoolSource {
    pools: Vec<PoolRecord>,
    page_size: usize,
    latest_block_number: u64,
    fetches: AtomicUsize,
}

impl StaticPoolSource {
    pub fn new(mut pools: Vec<PoolRecord>, page_size: usize) -> Self {
        pools.sort_by_key(|pool| pool.block_number);
        let latest_block_number = pools.last().map(|pool| pool.block_number).unwrap_or_default();
        Self { pools, page_size: page_size.max(1), latest_block_number, fetches: AtomicUsize::new(0) }
    }

    pub fn with_latest_block_number(mut self, latest_block_number: u64) -> Self {
        self.latest_block_number = self.latest_block_number.max(latest_block_number);
        self
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::Relaxed)
    }

    fn page(&self, start_block: u64) -> (Vec<PoolRecord>, bool) {
        let first = self.pools.partition_point(|pool| pool.block_number < start_block);
        let remaining = &self.pools[first..];
        if remaining.len() <= self.page_size {
            return (remaining.to_vec(), false);
        }

        let mut end = self.page_size;
        let boundary_block = remaining[end - 1].block_number;
        if remaining[end].block_number == boundary_block {
            let group_start = remaining[..end].partition_point(|pool| pool.block_number < boundary_block);
            end = if group_start > 0 { group_start } else { remaining.partition_point(|pool| pool.block_number <= boundary_block) };
        }
        (remaining[..end].to_vec(), end < remaining.len())
    }
}

#[async_trait]
impl PoolSource for StaticPoolSource {
    async fn fetch(&self, start_block: u64) -> Result<PoolBatch> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        let (pools, has_more) = self.page(start_block);
        Ok(PoolBatch { pools, latest_block_number: self.latest_block_number, has_more })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::Token;
    use crate::utils::constants::ChainId;
    use alloy_primitives::Address;

    fn pool(block_number: u64) -> PoolRecord {
        PoolRecord {
            token0: Token::repeat_byte(1, ChainId::BASE),
            token1: Token::repeat_byte(2, ChainId::BASE),
            stable: false,
            block_number,
            pair_address: Address::random(),
        }
    }

    fn blocks(batch: &PoolBatch) -> Vec<u64> {
        batch.pools.iter().map(|pool| pool.block_number).collect()
    }

    #[tokio::test]
    async fn test_pages_keep_blocks_together() -> Result<()> {
        let source = StaticPoolSource::new(vec![pool(1), pool(2), pool(2), pool(3), pool(4)], 2);

        let batch = source.fetch(0).await?;
        assert_eq!(blocks(&batch), vec![1]);
        assert!(batch.has_more);

        let batch = source.fetch(2).await?;
        assert_eq!(blocks(&batch), vec![2, 2]);
        assert!(batch.has_more);

        let batch = source.fetch(3).await?;
        assert_eq!(blocks(&batch), vec![3, 4]);
        assert!(!batch.has_more);
        assert_eq!(batch.latest_block_number, 4);
        assert_eq!(source.fetch_count(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_oversized_block_is_served_whole() -> Result<()> {
        let source = StaticPoolSource::new(vec![pool(7), pool(7), pool(7), pool(8)], 2);

        let batch = source.fetch(0).await?;
        assert_eq!(blocks(&batch), vec![7, 7, 7]);
        assert!(batch.has_more);
        Ok(())
    }

    #[tokio::test]
    async fn test_closure_source() -> Result<()> {
        let source = |start_block: u64| async move { Ok::<_, eyre::Report>(PoolBatch { pools: vec![pool(start_block)], latest_block_number: start_block, has_more: false }) };

        let batch = PoolSource::fetch(&source, 42).await?;
        assert_eq!(blocks(&batch), vec![42]);
        Ok(())
    }
}
