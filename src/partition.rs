//! Splits the flat pixel index space into one contiguous block per worker.
//!
//! Ranks `0..n-1` get the normal block size `ceil(total / n)` and the last
//! rank takes whatever remains. When that layout cannot cover the image
//! (the remainder would go negative, e.g. 5 pixels over 4 workers) the
//! planner switches to a balanced split where sizes differ by at most one.

use std::ops::Range;

use crate::error::{Error, Result};

/// Contiguous range of flattened pixel indices owned by one worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Block {
    pub rank: usize,
    pub start: usize,
    pub len: usize,
}

impl Block {
    pub fn end(&self) -> usize {
        self.start + self.len
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end()
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Plan one block per worker over `[0, total_pixels)`.
///
/// Block `i` belongs to rank `i`. Identical inputs always produce identical
/// blocks.
pub fn plan(total_pixels: usize, workers: usize) -> Result<Vec<Block>> {
    if workers == 0 || workers > total_pixels {
        return Err(Error::InvalidPartition(format!(
            "cannot split {total_pixels} pixels across {workers} workers"
        )));
    }

    let normal = total_pixels.div_ceil(workers);
    let lengths: Vec<usize> = match total_pixels.checked_sub(normal * (workers - 1)) {
        Some(last) => {
            let mut lengths = vec![normal; workers - 1];
            lengths.push(last);
            lengths
        }
        None => {
            let base = total_pixels / workers;
            let extra = total_pixels % workers;
            (0..workers)
                .map(|rank| if rank < extra { base + 1 } else { base })
                .collect()
        }
    };

    let mut start = 0;
    let blocks = lengths
        .into_iter()
        .enumerate()
        .map(|(rank, len)| {
            let block = Block { rank, start, len };
            start += len;
            block
        })
        .collect();

    Ok(blocks)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_covers(blocks: &[Block], total: usize) {
        let mut next = 0;
        for (i, block) in blocks.iter().enumerate() {
            assert_eq!(block.rank, i);
            assert_eq!(block.start, next, "gap or overlap before block {i}");
            next = block.end();
        }
        assert_eq!(next, total);
        assert_eq!(blocks.iter().map(|b| b.len).sum::<usize>(), total);
    }

    #[test]
    fn test_even_split() {
        let blocks = plan(16, 4).unwrap();
        assert!(blocks.iter().all(|b| b.len == 4));
        assert_covers(&blocks, 16);
    }

    #[test]
    fn test_last_block_takes_remainder() {
        let blocks = plan(10, 4).unwrap();
        let lengths: Vec<usize> = blocks.iter().map(|b| b.len).collect();
        assert_eq!(lengths, vec![3, 3, 3, 1]);
    }

    #[test]
    fn test_last_block_may_be_empty() {
        let blocks = plan(10, 6).unwrap();
        let lengths: Vec<usize> = blocks.iter().map(|b| b.len).collect();
        assert_eq!(lengths, vec![2, 2, 2, 2, 2, 0]);
        assert!(blocks[5].is_empty());
        assert_covers(&blocks, 10);
    }

    #[test]
    fn test_balanced_fallback_when_remainder_negative() {
        let blocks = plan(5, 4).unwrap();
        let lengths: Vec<usize> = blocks.iter().map(|b| b.len).collect();
        assert_eq!(lengths, vec![2, 1, 1, 1]);
        assert_covers(&blocks, 5);
    }

    #[test]
    fn test_coverage_for_every_worker_count() {
        for total in 1..=60 {
            for workers in 1..=total {
                let blocks = plan(total, workers).unwrap();
                assert_eq!(blocks.len(), workers);
                assert_covers(&blocks, total);

                // All but the last block are within one of each other, and the
                // last never exceeds the others.
                let head = &blocks[..workers - 1];
                if let (Some(max), Some(min)) = (
                    head.iter().map(|b| b.len).max(),
                    head.iter().map(|b| b.len).min(),
                ) {
                    assert!(max - min <= 1, "total={total} workers={workers}");
                    assert!(blocks[workers - 1].len <= max);
                }
            }
        }
    }

    #[test]
    fn test_deterministic() {
        assert_eq!(plan(1234, 7).unwrap(), plan(1234, 7).unwrap());
    }

    #[test]
    fn test_rejects_too_many_workers() {
        assert!(matches!(plan(4, 5), Err(Error::InvalidPartition(_))));
        assert!(matches!(plan(4, 0), Err(Error::InvalidPartition(_))));
    }
}
