//! Lazy index-set generators.
//!
//! Both generators yield index vectors into a pool of `n` elements and keep
//! O(n) state. Sizes grow as C(n, k) and n!/(n-k)! respectively; use
//! [`binomial`] and [`permutation_count`] to reject a request before
//! enumerating it.

/// Number of size-`k` subsets of `n` elements, `None` on overflow.
#[must_use]
pub fn binomial(n: usize, k: usize) -> Option<u64> {
    if k > n {
        return Some(0);
    }
    let k = k.min(n - k) as u64;
    let n = n as u64;
    let mut acc = 1u64;
    for i in 0..k {
        // acc * (n - i) is always divisible by (i + 1) at this point.
        acc = acc.checked_mul(n - i)? / (i + 1);
    }
    Some(acc)
}

/// Number of ordered size-`k` selections of `n` elements, `None` on overflow.
#[must_use]
pub fn permutation_count(n: usize, k: usize) -> Option<u64> {
    if k > n {
        return Some(0);
    }
    (n - k + 1..=n).try_fold(1u64, |acc, x| acc.checked_mul(x as u64))
}

/// Size-`k` combinations of `0..n` in lexicographic order.
#[derive(Debug, Clone)]
pub struct Combinations {
    n: usize,
    indices: Vec<usize>,
    started: bool,
    done: bool,
}

impl Combinations {
    /// Creates the generator. `k > n` yields nothing; `k == 0` yields one empty set.
    #[must_use]
    pub fn new(n: usize, k: usize) -> Self {
        Self {
            n,
            indices: (0..k).collect(),
            started: false,
            done: k > n,
        }
    }
}

impl Iterator for Combinations {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if !self.started {
            self.started = true;
            return Some(self.indices.clone());
        }

        let k = self.indices.len();
        let Some(i) = (0..k).rev().find(|&i| self.indices[i] != i + self.n - k) else {
            self.done = true;
            return None;
        };
        self.indices[i] += 1;
        for j in i + 1..k {
            self.indices[j] = self.indices[j - 1] + 1;
        }
        Some(self.indices.clone())
    }
}

/// Size-`k` permutations of `0..n` in lexicographic order.
#[derive(Debug, Clone)]
pub struct Permutations {
    k: usize,
    indices: Vec<usize>,
    cycles: Vec<usize>,
    started: bool,
    done: bool,
}

impl Permutations {
    /// Creates the generator. `k > n` yields nothing; `k == 0` yields one empty selection.
    #[must_use]
    pub fn new(n: usize, k: usize) -> Self {
        Self {
            k,
            indices: (0..n).collect(),
            cycles: (0..k.min(n)).map(|i| n - i).collect(),
            started: false,
            done: k > n,
        }
    }
}

impl Iterator for Permutations {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if !self.started {
            self.started = true;
            return Some(self.indices[..self.k].to_vec());
        }

        let n = self.indices.len();
        for i in (0..self.k).rev() {
            self.cycles[i] -= 1;
            if self.cycles[i] == 0 {
                self.indices[i..].rotate_left(1);
                self.cycles[i] = n - i;
            } else {
                let j = self.cycles[i];
                self.indices.swap(i, n - j);
                return Some(self.indices[..self.k].to_vec());
            }
        }
        self.done = true;
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn binomial_values() {
        assert_eq!(binomial(4, 0), Some(1));
        assert_eq!(binomial(4, 2), Some(6));
        assert_eq!(binomial(8, 3), Some(56));
        assert_eq!(binomial(3, 4), Some(0));
        assert_eq!(binomial(60, 30), Some(118_264_581_564_861_424));
        assert_eq!(binomial(200, 100), None);
    }

    #[test]
    fn permutation_count_values() {
        assert_eq!(permutation_count(3, 0), Some(1));
        assert_eq!(permutation_count(3, 2), Some(6));
        assert_eq!(permutation_count(5, 5), Some(120));
        assert_eq!(permutation_count(2, 3), Some(0));
        assert_eq!(permutation_count(40, 40), None);
    }

    #[test]
    fn combinations_are_lexicographic() {
        let all: Vec<_> = Combinations::new(4, 2).collect();
        assert_eq!(
            all,
            vec![
                vec![0, 1],
                vec![0, 2],
                vec![0, 3],
                vec![1, 2],
                vec![1, 3],
                vec![2, 3]
            ]
        );
    }

    #[test]
    fn combinations_edge_sizes() {
        assert_eq!(Combinations::new(3, 0).collect::<Vec<_>>(), vec![Vec::<usize>::new()]);
        assert_eq!(Combinations::new(0, 0).count(), 1);
        assert_eq!(Combinations::new(2, 3).count(), 0);
        assert_eq!(Combinations::new(3, 3).collect::<Vec<_>>(), vec![vec![0, 1, 2]]);
    }

    #[test]
    fn combination_counts_match_binomial() {
        for n in 0..8 {
            for k in 0..=n + 1 {
                let count = Combinations::new(n, k).count() as u64;
                assert_eq!(Some(count), binomial(n, k), "C({n},{k})");
            }
        }
    }

    #[test]
    fn permutations_of_three_choose_two() {
        let all: Vec<_> = Permutations::new(3, 2).collect();
        assert_eq!(
            all,
            vec![
                vec![0, 1],
                vec![0, 2],
                vec![1, 0],
                vec![1, 2],
                vec![2, 0],
                vec![2, 1]
            ]
        );
    }

    #[test]
    fn permutations_are_distinct_and_counted() {
        for n in 0..6 {
            for k in 0..=n + 1 {
                let all: Vec<_> = Permutations::new(n, k).collect();
                let distinct: HashSet<_> = all.iter().cloned().collect();
                assert_eq!(distinct.len(), all.len());
                assert_eq!(Some(all.len() as u64), permutation_count(n, k), "P({n},{k})");
                assert!(all.iter().all(|p| p.len() == k));
            }
        }
    }
}
