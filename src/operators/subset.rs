use itertools::{Combinations, Itertools};

/// Yields every k-subset of the source slice, in lexicographic index
/// order. `C(n, k)` subsets come out in total.
pub struct SubsetIterator<T: Clone> {
    k: usize,
    emitted_empty: bool,
    inner: Combinations<std::vec::IntoIter<T>>,
}

impl<T: Clone> SubsetIterator<T> {
    pub fn new(items: &[T], k: usize) -> Self {
        assert!(
            k <= items.len(),
            "invalid subset size: {} > {}",
            k,
            items.len()
        );

        Self {
            k,
            emitted_empty: false,
            inner: items.to_vec().into_iter().combinations(k),
        }
    }
}

impl<T: Clone> Iterator for SubsetIterator<T> {
    type Item = Vec<T>;

    fn next(&mut self) -> Option<Self::Item> {
        // the one 0-subset is the empty set
        if self.k == 0 {
            if self.emitted_empty {
                return None;
            }
            self.emitted_empty = true;
            return Some(Vec::new());
        }

        self.inner.next()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn binomial(n: usize, k: usize) -> usize {
        (0..k).fold(1, |acc, i| acc * (n - i) / (i + 1))
    }

    #[test]
    fn test_subset_cardinalities() {
        let items: Vec<i32> = (0..6).collect();

        for &k in &[0usize, 1, 4, 6] {
            let subsets: HashSet<Vec<i32>> = SubsetIterator::new(&items, k).collect();
            assert_eq!(subsets.len(), binomial(6, k));
            assert!(subsets.iter().all(|s| s.len() == k));
        }

        assert_eq!(binomial(6, 0), 1);
        assert_eq!(binomial(6, 1), 6);
        assert_eq!(binomial(6, 4), 15);
        assert_eq!(binomial(6, 6), 1);
    }

    #[test]
    #[should_panic]
    fn test_oversized_subset_panics() {
        SubsetIterator::new(&[1, 2, 3], 4);
    }
}
