use rand::Rng;

use crate::directive::Directive;

/// Draws uniformly over the weight sum; the first item whose cumulative
/// weight exceeds the draw wins.
pub fn select_weighted<'a, T, R>(items: &'a [T], weight: impl Fn(&T) -> u32, rng: &mut R) -> Option<&'a T>
where
    R: Rng,
{
    let total: u64 = items.iter().map(|item| u64::from(weight(item))).sum();
    if total == 0 {
        return items.first();
    }
    let draw = rng.gen_range(0..total);
    let mut cumulative = 0u64;
    for item in items {
        cumulative += u64::from(weight(item));
        if draw < cumulative {
            return Some(item);
        }
    }
    items.first()
}

/// Replaces every `[random]` directive with a single weighted pick, appended
/// after the remaining directives.
pub fn collapse_random_group<R>(directives: Vec<Directive>, rng: &mut R) -> Vec<Directive>
where
    R: Rng,
{
    let (random, mut fixed): (Vec<Directive>, Vec<Directive>) =
        directives.into_iter().partition(|d| d.is_random);
    if let Some(selected) = select_weighted(&random, |d| d.random_weight, rng) {
        tracing::debug!(selected = %selected.raw_text, candidates = random.len(), "random directive selected");
        fixed.push(selected.clone());
    }
    fixed
}
