//! Pending move queue - predictions awaiting an authoritative decision

use std::collections::VecDeque;

use tally_core::MoveId;

/// A locally applied move and the id it was issued under
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingMove<M> {
    pub id: MoveId,
    pub mv: M,
}

/// Ordered queue of pending moves
///
/// Insertion order is application order. Ids are strictly increasing and
/// survive `clear`, so an id handed out before a clear never matches a
/// move queued after it.
#[derive(Clone, Debug)]
pub struct PendingQueue<M> {
    moves: VecDeque<PendingMove<M>>,
    next_id: MoveId,
}

impl<M> PendingQueue<M> {
    pub fn new() -> Self {
        PendingQueue {
            moves: VecDeque::new(),
            next_id: MoveId::FIRST,
        }
    }

    /// Queue a move, returning its freshly issued id
    pub fn push(&mut self, mv: M) -> MoveId {
        let id = self.next_id;
        self.next_id = id.next();
        self.moves.push_back(PendingMove { id, mv });
        id
    }

    /// Remove the move issued under `id`
    pub fn remove_id(&mut self, id: MoveId) -> Option<PendingMove<M>> {
        // Ids are pushed in increasing order
        let idx = self
            .moves
            .binary_search_by(|pending| pending.id.cmp(&id))
            .ok()?;
        self.moves.remove(idx)
    }

    /// Remove the oldest move equal to `mv`
    pub fn remove_first_eq(&mut self, mv: &M) -> Option<PendingMove<M>>
    where
        M: PartialEq,
    {
        let idx = self.moves.iter().position(|pending| pending.mv == *mv)?;
        self.moves.remove(idx)
    }

    /// Drop every pending move, returning how many were dropped
    pub fn clear(&mut self) -> usize {
        let dropped = self.moves.len();
        self.moves.clear();
        dropped
    }

    pub fn contains(&self, id: MoveId) -> bool {
        self.moves
            .binary_search_by(|pending| pending.id.cmp(&id))
            .is_ok()
    }

    pub fn len(&self) -> usize {
        self.moves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    /// Oldest pending move
    pub fn front(&self) -> Option<&PendingMove<M>> {
        self.moves.front()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingMove<M>> {
        self.moves.iter()
    }

    /// Pending move payloads in application order
    pub fn moves(&self) -> impl Iterator<Item = &M> {
        self.moves.iter().map(|pending| &pending.mv)
    }
}

impl<M> Default for PendingQueue<M> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_assigns_increasing_ids() {
        let mut queue = PendingQueue::new();
        let a = queue.push('a');
        let b = queue.push('b');

        assert_eq!(a, MoveId::FIRST);
        assert!(b > a);
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.moves().copied().collect::<Vec<_>>(), vec!['a', 'b']);
    }

    #[test]
    fn test_remove_first_eq_takes_oldest_duplicate() {
        let mut queue = PendingQueue::new();
        let first = queue.push('x');
        queue.push('y');
        let second = queue.push('x');

        let removed = queue.remove_first_eq(&'x').unwrap();
        assert_eq!(removed.id, first);
        assert!(queue.contains(second));
        assert_eq!(queue.moves().copied().collect::<Vec<_>>(), vec!['y', 'x']);
        assert!(queue.remove_first_eq(&'z').is_none());
    }

    #[test]
    fn test_remove_id_out_of_order() {
        let mut queue = PendingQueue::new();
        let a = queue.push(1);
        let b = queue.push(2);
        let c = queue.push(3);

        assert_eq!(queue.remove_id(b).map(|p| p.mv), Some(2));
        assert!(queue.remove_id(b).is_none());
        assert_eq!(queue.front().map(|p| p.id), Some(a));
        assert!(queue.contains(c));
    }

    #[test]
    fn test_ids_survive_clear() {
        let mut queue = PendingQueue::new();
        let old = queue.push(1);
        queue.push(2);

        assert_eq!(queue.clear(), 2);
        assert!(queue.is_empty());

        let fresh = queue.push(3);
        assert!(fresh > old);
        assert!(queue.remove_id(old).is_none());
    }
}
