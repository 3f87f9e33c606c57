//! "Try each candidate in order, keep the first that works"
//!
//! The URL fallback ladder and the re-encode grid are both walks over an
//! ordered candidate list where the first acceptable result wins, so they
//! share this helper and only differ in what an attempt does.

use tracing::debug;

/// The result of trying one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attempt<T> {
    /// The candidate produced a usable value, stop searching.
    Accepted(T),
    /// The candidate didn't work out, with the reason why.
    Rejected(String),
}

/// Returns the first accepted value, trying `candidates` strictly in order.
///
/// Candidates after the accepted one are never attempted. Returns `None`
/// when the list is exhausted.
pub fn first_accepted<C, T, F>(candidates: impl IntoIterator<Item = C>, mut attempt: F) -> Option<T>
where
    F: FnMut(C) -> Attempt<T>,
{
    for (index, candidate) in candidates.into_iter().enumerate() {
        match attempt(candidate) {
            Attempt::Accepted(value) => return Some(value),
            Attempt::Rejected(reason) => debug!("Candidate #{} rejected: {}", index, reason),
        }
    }
    None
}

/// Async flavour of [`first_accepted`]; each attempt is awaited before the next starts.
pub async fn first_accepted_async<C, T, F>(
    candidates: impl IntoIterator<Item = C>,
    mut attempt: F,
) -> Option<T>
where
    F: AsyncFnMut(C) -> Attempt<T>,
{
    for (index, candidate) in candidates.into_iter().enumerate() {
        match attempt(candidate).await {
            Attempt::Accepted(value) => return Some(value),
            Attempt::Rejected(reason) => debug!("Candidate #{} rejected: {}", index, reason),
        }
    }
    None
}
