//! Token proximity: the minimum total gap between chosen occurrences of
//! successive query tokens.
//!
//! For positions `p_0..p_{k-1}` (one per token, `p_i` drawn from the token's
//! occurrence list) the cost is
//!
//! ```text
//! sum over i of |p_{i+1} - p_i - len(token_i)|
//! ```
//!
//! i.e. zero when every token starts exactly where the previous one ends.

/// Finds a minimum-cost position selection by dynamic programming over the
/// occurrence lists, and returns `(proximity, chosen positions)`.
///
/// For each position of token `i-1`, only the two occurrences of token `i`
/// surrounding the ideal start (`previous + len`) can be optimal, since the
/// gap cost grows monotonically on either side of it; the DP relaxes exactly
/// those two transitions and records predecessors for path recovery.
///
/// Returns `(-1, [])` when any occurrence list is empty.
pub fn compute_token_proximity(
    locations: &[&[usize]],
    token_lengths: &[usize],
) -> (i32, Vec<usize>) {
    let num_tokens = locations.len();
    if num_tokens == 0 || locations.iter().any(|list| list.is_empty()) {
        return (-1, Vec::new());
    }

    const UNREACHED: i64 = i64::MAX;
    let mut best: Vec<Vec<i64>> = Vec::with_capacity(num_tokens);
    let mut predecessors: Vec<Vec<usize>> = Vec::with_capacity(num_tokens);
    best.push(vec![0; locations[0].len()]);
    predecessors.push(Vec::new());

    for i in 1..num_tokens {
        let list = locations[i];
        let mut row = vec![UNREACHED; list.len()];
        let mut pred = vec![0; list.len()];

        for (prev_index, &prev_position) in locations[i - 1].iter().enumerate() {
            let cost_so_far = best[i - 1][prev_index];
            if cost_so_far == UNREACHED {
                continue;
            }
            let target = (prev_position + token_lengths[i - 1]) as i64;
            let split = list.partition_point(|&position| (position as i64) < target);
            for candidate in [split.checked_sub(1), (split < list.len()).then_some(split)]
                .into_iter()
                .flatten()
            {
                let cost = cost_so_far + ((list[candidate] as i64) - target).abs();
                if cost < row[candidate] {
                    row[candidate] = cost;
                    pred[candidate] = prev_index;
                }
            }
        }
        best.push(row);
        predecessors.push(pred);
    }

    // First minimal entry of the last row, then walk the predecessors back.
    let last = &best[num_tokens - 1];
    let mut final_index = 0;
    for (index, &cost) in last.iter().enumerate() {
        if cost < last[final_index] {
            final_index = index;
        }
    }
    let proximity = last[final_index];

    let mut chosen = vec![0; num_tokens];
    let mut index = final_index;
    for i in (0..num_tokens).rev() {
        chosen[i] = locations[i][index];
        if i > 0 {
            index = predecessors[i][index];
        }
    }

    (proximity as i32, chosen)
}
