use rand::seq::SliceRandom;
use rand::Rng;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RedistributeError {
    #[error("Need at least 2 players to hand out prompts, have {0}!")]
    TooFewPlayers(usize),
    #[error("Not everyone has submitted a prompt yet!")]
    MissingPrompt,
}

/// Random permutation of `0..n` with no fixed points.
///
/// `out[i]` is the index whose item position `i` receives. Rejection
/// sampling: shuffle until no index maps to itself, which takes about e
/// tries on average.
pub fn derangement<R: Rng + ?Sized>(n: usize, rng: &mut R) -> Result<Vec<usize>, RedistributeError> {
    if n < 2 {
        return Err(RedistributeError::TooFewPlayers(n));
    }
    let mut pool: Vec<usize> = (0..n).collect();
    loop {
        pool.shuffle(rng);
        if pool.iter().enumerate().all(|(i, &owner)| i != owner) {
            return Ok(pool);
        }
    }
}

/// Hands every slot someone else's item.
pub fn redistribute<T: Clone, R: Rng + ?Sized>(
    items: &[T],
    rng: &mut R,
) -> Result<Vec<T>, RedistributeError> {
    let perm = derangement(items.len(), rng)?;
    Ok(perm.into_iter().map(|owner| items[owner].clone()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn refuses_fewer_than_two() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(derangement(0, &mut rng), Err(RedistributeError::TooFewPlayers(0)));
        assert_eq!(derangement(1, &mut rng), Err(RedistributeError::TooFewPlayers(1)));
    }

    #[test]
    fn no_fixed_points_for_any_roster_size() {
        for seed in 0..50u64 {
            let mut rng = StdRng::seed_from_u64(seed);
            for n in 2..=12 {
                let perm = derangement(n, &mut rng).unwrap();
                assert_eq!(perm.len(), n);
                for (i, &owner) in perm.iter().enumerate() {
                    assert_ne!(i, owner, "seed={seed} n={n} perm={perm:?}");
                }
                let mut sorted = perm.clone();
                sorted.sort_unstable();
                assert_eq!(sorted, (0..n).collect::<Vec<_>>());
            }
        }
    }

    #[test]
    fn two_players_always_swap() {
        let mut rng = StdRng::seed_from_u64(7);
        let out = redistribute(&["cat", "dog"], &mut rng).unwrap();
        assert_eq!(out, vec!["dog", "cat"]);
    }

    #[test]
    fn redistribute_keeps_every_item_once() {
        let mut rng = StdRng::seed_from_u64(42);
        let prompts = ["a", "b", "c", "d", "e"];
        let out = redistribute(&prompts, &mut rng).unwrap();
        for (i, p) in out.iter().enumerate() {
            assert_ne!(*p, prompts[i]);
        }
        let mut sorted = out.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, prompts.to_vec());
    }
}
