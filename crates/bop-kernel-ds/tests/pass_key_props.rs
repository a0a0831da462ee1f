//! Property tests for order-independent keys.

use bop_kernel_ds::PassKey;
use proptest::prelude::*;

proptest! {
    #[test]
    fn pair_equality_ignores_order(a in 0usize..10_000, b in 0usize..10_000) {
        let k1 = PassKey::from_pair(a, b);
        let k2 = PassKey::from_pair(b, a);
        prop_assert_eq!(&k1, &k2);
        prop_assert_eq!(k1.hash_code(1023), k2.hash_code(1023));
    }

    #[test]
    fn permutation_keeps_key(ids in prop::collection::vec(0usize..1000, 1..6), rot in 0usize..6) {
        let mut shuffled = ids.clone();
        let n = shuffled.len();
        shuffled.rotate_left(rot % n);
        shuffled.reverse();
        prop_assert_eq!(PassKey::from_ids(&ids), PassKey::from_ids(&shuffled));
    }

    #[test]
    fn hash_code_within_bound(ids in prop::collection::vec(0usize..1_000_000, 0..5), upper in 0usize..5000) {
        prop_assert!(PassKey::from_ids(&ids).hash_code(upper) <= upper);
    }
}
