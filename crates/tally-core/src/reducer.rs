//! Reducer seam
//!
//! The reconciler never interprets moves itself. It folds them over a state
//! with a caller-supplied reducer, which must be pure and total: unknown
//! moves are a no-op, never a failure.

/// Pure move reducer: `(state, move) -> next state`
pub trait Reducer<S, M> {
    fn apply(&self, state: &S, mv: &M) -> S;

    /// Fold a sequence of moves over `base`, in order
    fn fold<'a, I>(&self, base: &S, moves: I) -> S
    where
        S: Clone,
        M: 'a,
        I: IntoIterator<Item = &'a M>,
    {
        moves
            .into_iter()
            .fold(base.clone(), |state, mv| self.apply(&state, mv))
    }
}

impl<S, M, F> Reducer<S, M> for F
where
    F: Fn(&S, &M) -> S,
{
    #[inline]
    fn apply(&self, state: &S, mv: &M) -> S {
        self(state, mv)
    }
}
