// crates/pw_core/src/bound.rs
//
// Information-theoretic lower bound for pairwise (strength-2) suites.
//
// Every unordered parameter pair (i, j) needs all c_i * c_j value
// combinations, and a single test case covers exactly one combination per
// pair, so no suite can be smaller than the largest pair product. The bound
// is a function of the cardinality multiset only and therefore invariant
// under any parameter reordering.

/// `max_{i<j}(c_i * c_j)` over parameter cardinalities, or `None` when no
/// pair exists. Callers gate on interaction strength: the bound is defined
/// for strength 2 only.
pub fn pairwise_lower_bound(cards: &[usize]) -> Option<u64> {
    if cards.len() < 2 {
        return None;
    }
    let mut best: u64 = 0;
    for i in 0..cards.len() {
        for j in (i + 1)..cards.len() {
            let product = (cards[i] as u64).saturating_mul(cards[j] as u64);
            if product > best {
                best = product;
            }
        }
    }
    Some(best)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bound_is_largest_pair_product() {
        assert_eq!(pairwise_lower_bound(&[4, 4, 3, 3, 3]), Some(16));
        assert_eq!(pairwise_lower_bound(&[2, 2]), Some(4));
        assert_eq!(pairwise_lower_bound(&[7, 2, 5]), Some(35));
    }

    #[test]
    fn bound_undefined_without_a_pair() {
        assert_eq!(pairwise_lower_bound(&[]), None);
        assert_eq!(pairwise_lower_bound(&[9]), None);
    }

    #[test]
    fn bound_is_permutation_invariant() {
        let base = [4usize, 4, 3, 3, 3];
        // A few fixed permutations; the bound depends on the multiset only.
        let perms: [[usize; 5]; 4] = [
            [0, 1, 2, 3, 4],
            [4, 3, 2, 1, 0],
            [2, 0, 4, 1, 3],
            [1, 4, 0, 3, 2],
        ];
        let expect = pairwise_lower_bound(&base);
        for perm in perms {
            let shuffled: Vec<usize> = perm.iter().map(|&i| base[i]).collect();
            assert_eq!(pairwise_lower_bound(&shuffled), expect);
        }
    }

    #[test]
    fn singleton_parameters_contribute_their_product() {
        // [1,1] has exactly one pair with product 1.
        assert_eq!(pairwise_lower_bound(&[1, 1]), Some(1));
    }
}
