/// average_score
///
/// Arithmetic mean of a title's review scores at full precision, or `None` when the
/// title has no reviews yet. Never cached: callers compute it from the current review set.
pub fn average_score<I>(scores: I) -> Option<f64>
where
    I: IntoIterator<Item = i32>,
{
    let (sum, count) = scores
        .into_iter()
        .fold((0i64, 0u32), |(sum, count), score| (sum + i64::from(score), count + 1));
    if count == 0 {
        None
    } else {
        Some(sum as f64 / f64::from(count))
    }
}
