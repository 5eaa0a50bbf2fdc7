//! File partitioner: splits a decoded line-oriented file into fixed-size
//! contiguous chunks for parallel processing.
//!
//! Chunks borrow from the caller's line vector so worker threads can parse
//! them without copying. The partition is lossless: concatenating the chunks
//! in order reproduces the input exactly, and the final chunk holds the
//! remainder. An empty remainder is skipped rather than submitted as a no-op
//! task.

/// Default lines per chunk for the electoral-location roster. A throughput
/// tuning parameter, overridable via configuration.
pub const LOCATION_CHUNK_LINES: usize = 1072;

/// Default lines per chunk for the citizen roster. Person lines are more
/// expensive to parse, so chunks are larger and the worker pool wider.
pub const PERSON_CHUNK_LINES: usize = 8324;

/// Split `lines` into ordered contiguous chunks of at most `chunk_size`
/// lines.
///
/// # Panics
///
/// Panics if `chunk_size` is zero.
pub fn partition(lines: &[String], chunk_size: usize) -> Vec<&[String]> {
    assert!(chunk_size > 0, "chunk_size must be positive");
    lines.chunks(chunk_size).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("line-{}", i)).collect()
    }

    #[test]
    fn partition_is_lossless_and_ordered() {
        let input = lines(25);
        let chunks = partition(&input, 4);
        let rejoined: Vec<String> = chunks.iter().flat_map(|c| c.iter().cloned()).collect();
        assert_eq!(rejoined, input);
    }

    #[test]
    fn chunk_count_is_ceil_of_division() {
        for (n, k, expected) in [(25, 4, 7), (24, 4, 6), (1, 10, 1), (10, 10, 1), (11, 10, 2)] {
            let input = lines(n);
            assert_eq!(partition(&input, k).len(), expected, "n={} k={}", n, k);
        }
    }

    #[test]
    fn remainder_chunk_holds_the_tail() {
        let input = lines(10);
        let chunks = partition(&input, 4);
        assert_eq!(chunks[0].len(), 4);
        assert_eq!(chunks[1].len(), 4);
        assert_eq!(chunks[2].len(), 2);
    }

    #[test]
    fn exact_multiple_yields_no_empty_chunk() {
        let input = lines(12);
        let chunks = partition(&input, 4);
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| !c.is_empty()));
    }

    #[test]
    fn empty_input_yields_no_chunks() {
        let input: Vec<String> = Vec::new();
        assert!(partition(&input, 4).is_empty());
    }

    #[test]
    #[should_panic]
    fn zero_chunk_size_panics() {
        let input = lines(3);
        let _ = partition(&input, 0);
    }
}
