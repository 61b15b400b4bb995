use tracing::debug;

/// Largest number of slots a table may hold.
///
/// Chain links are stored as `u32` slot indices.
pub const MAX_CAPACITY: usize = 1 << 31;

/// Payload attached to a slot, generic over the string reference type.
///
/// During the build phase `S` is an interner [`Symbol`](crate::interner::Symbol);
/// after freeze it is a [`PoolStr`](crate::pool::PoolStr) pointing into the
/// compacted pool.
#[derive(Debug)]
pub(crate) enum Stored<S> {
    Nil,
    Number(f64),
    Boolean(bool),
    String(S),
    Code(S),
    Table(Box<[S]>),
}

impl<S> Stored<S> {
    /// Rewrites every string reference held by this payload.
    ///
    /// Table records are rebuilt into a fresh array sized to their element
    /// count.
    pub(crate) fn map<T>(self, mut f: impl FnMut(S) -> T) -> Stored<T> {
        match self {
            Stored::Nil => Stored::Nil,
            Stored::Number(n) => Stored::Number(n),
            Stored::Boolean(b) => Stored::Boolean(b),
            Stored::String(s) => Stored::String(f(s)),
            Stored::Code(s) => Stored::Code(f(s)),
            Stored::Table(items) => Stored::Table(items.into_vec().into_iter().map(f).collect()),
        }
    }

    /// String references held by this payload, in element order.
    pub(crate) fn refs(&self) -> &[S] {
        match self {
            Stored::String(s) | Stored::Code(s) => std::slice::from_ref(s),
            Stored::Table(items) => items,
            _ => &[],
        }
    }
}

#[derive(Debug)]
pub(crate) struct Node<S> {
    pub hash: u32,
    pub key: S,
    pub value: Stored<S>,
    pub next: Option<u32>,
}

impl<S> Node<S> {
    pub(crate) fn new(hash: u32, key: S, value: Stored<S>) -> Self {
        Self {
            hash,
            key,
            value,
            next: None,
        }
    }
}

/// Open-addressing hash table with relocation-based collision resolution.
///
/// Every node is reachable from its main position (`hash & (capacity - 1)`),
/// either directly or through the `next` chain rooted there. When a new key's
/// main position is held by a node that was chained in from elsewhere, that
/// node is moved to a free slot and the new key takes its home; otherwise the
/// new key goes to a free slot and is spliced in right after the head of the
/// chain.
///
/// Free slots are found with a cursor that only moves downwards. Once it
/// reaches zero the table doubles and every node is reinserted.
#[derive(Debug)]
pub(crate) struct HashTable<S> {
    slots: Vec<Option<Node<S>>>,
    free: usize,
    len: usize,
}

fn empty_slots<S>(capacity: usize) -> Vec<Option<Node<S>>> {
    std::iter::repeat_with(|| None).take(capacity).collect()
}

impl<S> HashTable<S> {
    /// Creates a table with `capacity` rounded up to a power of two (min. 1).
    ///
    /// # Panics
    ///
    /// Panics if `capacity` exceeds [`MAX_CAPACITY`].
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        assert!(
            capacity <= MAX_CAPACITY,
            "capacity {capacity} exceeds the {MAX_CAPACITY} slot limit"
        );
        let capacity = capacity.max(1).next_power_of_two();
        Self {
            slots: empty_slots(capacity),
            free: capacity,
            len: 0,
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Bytes taken by the slot array itself.
    pub(crate) fn slot_bytes(&self) -> usize {
        self.slots.len() * std::mem::size_of::<Option<Node<S>>>()
    }

    #[inline]
    fn main_position(&self, hash: u32) -> usize {
        hash as usize & (self.slots.len() - 1)
    }

    fn find_free(&mut self) -> Option<usize> {
        while self.free > 0 {
            self.free -= 1;
            if self.slots[self.free].is_none() {
                return Some(self.free);
            }
        }
        None
    }

    fn next_of(&self, index: usize) -> Option<usize> {
        self.slots[index]
            .as_ref()
            .and_then(|node| node.next)
            .map(|next| next as usize)
    }

    /// Finds the slot whose `next` points at `target`, walking from `head`.
    fn predecessor(&self, head: usize, target: usize) -> usize {
        let mut index = head;
        loop {
            match self.next_of(index) {
                Some(next) if next == target => return index,
                Some(next) => index = next,
                None => panic!("slot {target} is not on the chain rooted at {head}"),
            }
        }
    }

    /// Places `node` into the table, growing when no free slot is left.
    ///
    /// The node's payload is moved as is; callers intern strings beforehand.
    /// No duplicate check is made here.
    pub(crate) fn insert(&mut self, mut node: Node<S>) {
        node.next = None;
        loop {
            let main = self.main_position(node.hash);
            let occupant_hash = match &self.slots[main] {
                None => {
                    self.slots[main] = Some(node);
                    self.len += 1;
                    return;
                }
                Some(occupant) => occupant.hash,
            };

            let Some(free) = self.find_free() else {
                self.grow();
                continue;
            };

            let occupant_main = self.main_position(occupant_hash);
            if occupant_main != main {
                // The occupant was chained in from another bucket: move it out
                // and point its predecessor at the new location.
                let prev = self.predecessor(occupant_main, main);
                self.slots[free] = self.slots[main].take();
                if let Some(prev_node) = self.slots[prev].as_mut() {
                    prev_node.next = Some(free as u32);
                }
                self.slots[main] = Some(node);
            } else {
                if let Some(head) = self.slots[main].as_mut() {
                    node.next = head.next;
                    head.next = Some(free as u32);
                }
                self.slots[free] = Some(node);
            }
            self.len += 1;
            return;
        }
    }

    fn grow(&mut self) {
        assert!(
            self.slots.len() < MAX_CAPACITY,
            "hash table is full at {MAX_CAPACITY} slots"
        );
        let capacity = self.slots.len() * 2;
        debug!(
            "Growing hash table from {} to {} slots ({} entries)",
            self.slots.len(),
            capacity,
            self.len
        );
        let old = std::mem::replace(&mut self.slots, empty_slots(capacity));
        self.free = capacity;
        self.len = 0;
        for node in old.into_iter().flatten() {
            self.insert(node);
        }
    }

    /// Returns the slot index of the first node on `hash`'s chain accepted by
    /// `matches`.
    pub(crate) fn find(&self, hash: u32, mut matches: impl FnMut(&S) -> bool) -> Option<usize> {
        let mut index = self.main_position(hash);
        loop {
            let node = self.slots[index].as_ref()?;
            if node.hash == hash && matches(&node.key) {
                return Some(index);
            }
            index = node.next? as usize;
        }
    }

    pub(crate) fn node(&self, index: usize) -> Option<&Node<S>> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    pub(crate) fn node_mut(&mut self, index: usize) -> Option<&mut Node<S>> {
        self.slots.get_mut(index).and_then(Option::as_mut)
    }

    pub(crate) fn slots(&self) -> &[Option<Node<S>>] {
        &self.slots
    }

    /// Iterates over occupied slots in index order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = &Node<S>> + '_ {
        self.slots.iter().flatten()
    }

    /// Length of the longest collision chain, counted in nodes.
    pub(crate) fn max_chain_length(&self) -> usize {
        let mut longest = 0;
        for (index, slot) in self.slots.iter().enumerate() {
            let Some(node) = slot else { continue };
            if self.main_position(node.hash) != index {
                continue;
            }
            let mut length = 1;
            let mut cursor = node.next;
            while let Some(next) = cursor {
                length += 1;
                cursor = self.slots[next as usize].as_ref().and_then(|n| n.next);
            }
            longest = longest.max(length);
        }
        longest
    }

    /// Rewrites every string reference, keeping the slot layout intact so
    /// chains stay valid.
    pub(crate) fn map<T>(self, mut f: impl FnMut(S) -> T) -> HashTable<T> {
        let slots = self
            .slots
            .into_iter()
            .map(|slot| {
                slot.map(|node| Node {
                    hash: node.hash,
                    key: f(node.key),
                    value: node.value.map(&mut f),
                    next: node.next,
                })
            })
            .collect();
        HashTable {
            slots,
            free: self.free,
            len: self.len,
        }
    }
}
