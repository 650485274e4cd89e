// ============================================================
// Layer 4 — Stratified Splitter
// ============================================================
// Partitions labelled items into (train, held-out) so that both
// sides keep the class proportions of the input.
//
// Allocation for a held-out fraction f over n items:
//   n_test   = ceil(f * n)
//   share_k  = n_test * count_k / n        (per class k)
//   alloc_k  = floor(share_k), then the remaining slots go to the
//              classes with the largest fractional part
//              (ties → lower class id first)
//
// Each class is shuffled independently before its first
// `alloc_k` members are moved to the held-out side, so every
// class ends within ±1 item of its exact proportional share.
//
// Randomness is entirely driven by the caller's RNG: the same
// seed yields the same partition.

use anyhow::{bail, Result};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::BTreeMap;

/// Split `items` into `(train, held_out)` preserving the class balance
/// given by `label_of`.
///
/// Fails when the fraction is outside (0, 1), when any class has fewer
/// than two members, or when either side would end up with fewer items
/// than there are classes.
pub fn stratified_split<T, F, R>(
    items: Vec<T>,
    label_of: F,
    held_out_fraction: f64,
    rng: &mut R,
) -> Result<(Vec<T>, Vec<T>)>
where
    F: Fn(&T) -> u8,
    R: Rng + ?Sized,
{
    if !(held_out_fraction > 0.0 && held_out_fraction < 1.0) {
        bail!("held-out fraction must be in (0, 1), got {held_out_fraction}");
    }

    let total = items.len();

    // Group item indices by class, classes in ascending label order
    let mut by_class: BTreeMap<u8, Vec<usize>> = BTreeMap::new();
    for (i, item) in items.iter().enumerate() {
        by_class.entry(label_of(item)).or_default().push(i);
    }
    let n_classes = by_class.len();

    if let Some((label, members)) = by_class.iter().find(|(_, m)| m.len() < 2) {
        bail!(
            "class {} has only {} member(s); stratification needs at least 2 per class",
            label,
            members.len()
        );
    }

    let n_test = (held_out_fraction * total as f64).ceil() as usize;
    let n_train = total - n_test;
    if n_test < n_classes || n_train < n_classes {
        bail!(
            "split of {} items at fraction {} gives {} train / {} held-out; \
             each side needs at least {} (one per class)",
            total,
            held_out_fraction,
            n_train,
            n_test,
            n_classes
        );
    }

    let counts: Vec<usize> = by_class.values().map(Vec::len).collect();
    let alloc = allocate(&counts, n_test, total);

    let mut test_mask = vec![false; total];
    for (members, &take) in by_class.values_mut().zip(&alloc) {
        members.shuffle(rng);
        for &i in members.iter().take(take) {
            test_mask[i] = true;
        }
    }

    let mut train = Vec::with_capacity(n_train);
    let mut held_out = Vec::with_capacity(n_test);
    for (item, is_test) in items.into_iter().zip(test_mask) {
        if is_test { held_out.push(item) } else { train.push(item) }
    }

    // Output order is shuffled so classes are interleaved downstream
    train.shuffle(rng);
    held_out.shuffle(rng);

    tracing::debug!(
        "Stratified split: {} train / {} held-out (fraction {:.3})",
        train.len(),
        held_out.len(),
        held_out_fraction
    );
    Ok((train, held_out))
}

/// Distribute `n_draw` slots across classes proportionally to `counts`.
fn allocate(counts: &[usize], n_draw: usize, total: usize) -> Vec<usize> {
    let shares: Vec<f64> = counts
        .iter()
        .map(|&c| n_draw as f64 * c as f64 / total as f64)
        .collect();
    let mut alloc: Vec<usize> = shares
        .iter()
        .zip(counts)
        .map(|(s, &c)| (s.floor() as usize).min(c))
        .collect();

    let mut remaining = n_draw - alloc.iter().sum::<usize>();
    let mut order: Vec<usize> = (0..counts.len()).collect();
    order.sort_by(|&a, &b| {
        let fa = shares[a] - shares[a].floor();
        let fb = shares[b] - shares[b].floor();
        fb.total_cmp(&fa).then(a.cmp(&b))
    });

    // Largest remainders first; loop again if a class is already full
    while remaining > 0 {
        let before = remaining;
        for &k in &order {
            if remaining == 0 {
                break;
            }
            if alloc[k] < counts[k] {
                alloc[k] += 1;
                remaining -= 1;
            }
        }
        if remaining == before {
            break;
        }
    }
    alloc
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn labelled(pos: usize, neg: usize) -> Vec<(usize, u8)> {
        (0..pos).map(|i| (i, 1)).chain((0..neg).map(|i| (pos + i, 0))).collect()
    }

    fn positives(items: &[(usize, u8)]) -> usize {
        items.iter().filter(|(_, l)| *l == 1).count()
    }

    #[test]
    fn test_sizes_follow_ceil_rule() {
        let mut rng = StdRng::seed_from_u64(7);
        let (train, test) = stratified_split(labelled(50, 50), |x| x.1, 0.2, &mut rng).unwrap();
        assert_eq!(test.len(), 20);
        assert_eq!(train.len(), 80);
    }

    #[test]
    fn test_partitions_are_disjoint_and_complete() {
        let mut rng = StdRng::seed_from_u64(1);
        let (train, test) = stratified_split(labelled(37, 21), |x| x.1, 0.3, &mut rng).unwrap();
        let mut ids: Vec<usize> = train.iter().chain(&test).map(|x| x.0).collect();
        ids.sort_unstable();
        assert_eq!(ids, (0..58).collect::<Vec<_>>());
    }

    #[test]
    fn test_class_proportions_within_one_example() {
        for (pos, neg) in [(5, 5), (13, 7), (100, 3), (40, 60), (9, 2)] {
            for fraction in [0.1, 0.2, 0.25, 0.5, 0.75] {
                let items = labelled(pos, neg);
                let n = items.len() as f64;
                let mut rng = StdRng::seed_from_u64(99);
                let Ok((train, test)) = stratified_split(items, |x| x.1, fraction, &mut rng) else {
                    continue;
                };
                let expected_test = test.len() as f64 * pos as f64 / n;
                let expected_train = train.len() as f64 * pos as f64 / n;
                assert!((positives(&test) as f64 - expected_test).abs() <= 1.0);
                assert!((positives(&train) as f64 - expected_train).abs() <= 1.0);
            }
        }
    }

    #[test]
    fn test_same_seed_same_partition() {
        let a = stratified_split(labelled(20, 20), |x| x.1, 0.2, &mut StdRng::seed_from_u64(3)).unwrap();
        let b = stratified_split(labelled(20, 20), |x| x.1, 0.2, &mut StdRng::seed_from_u64(3)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_fails_when_class_too_small() {
        let mut rng = StdRng::seed_from_u64(0);
        let err = stratified_split(labelled(10, 1), |x| x.1, 0.2, &mut rng).unwrap_err();
        assert!(err.to_string().contains("class 0"));
    }

    #[test]
    fn test_fails_when_held_out_smaller_than_class_count() {
        // 8 items at 0.1 → 1 held-out row for 2 classes
        let mut rng = StdRng::seed_from_u64(0);
        assert!(stratified_split(labelled(4, 4), |x| x.1, 0.1, &mut rng).is_err());
    }

    #[test]
    fn test_rejects_out_of_range_fraction() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(stratified_split(labelled(5, 5), |x| x.1, 0.0, &mut rng).is_err());
        assert!(stratified_split(labelled(5, 5), |x| x.1, 1.0, &mut rng).is_err());
    }

    #[test]
    fn test_allocate_distributes_remainder() {
        // 3 slots over a 50/50 split of 10 → 1.5 / 1.5 → 2 / 1
        assert_eq!(allocate(&[5, 5], 3, 10), vec![2, 1]);
        assert_eq!(allocate(&[7, 3], 5, 10).iter().sum::<usize>(), 5);
    }
}
