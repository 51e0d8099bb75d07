//! Fixed-capacity generational pool shared by enemies and bullets.

use bastion_core::{PoolExhausted, SlotHandle};

#[derive(Clone, Debug)]
struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Fixed-capacity storage with an alive set and a LIFO free list.
///
/// Every spawn into a slot increments that slot's generation; releasing a
/// slot leaves the generation untouched. Handles created by [`Pool::spawn`]
/// therefore stop resolving once the slot is released or reused.
#[derive(Clone, Debug)]
pub struct Pool<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
}

impl<T> Pool<T> {
    /// Creates a pool holding at most `capacity` live entities.
    #[must_use]
    pub fn with_capacity(capacity: u32) -> Self {
        let slots = (0..capacity)
            .map(|_| Slot {
                generation: 0,
                value: None,
            })
            .collect();
        Self {
            slots,
            free: (0..capacity).rev().collect(),
        }
    }

    /// Maximum number of live entities.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of live entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Reports whether no entity is alive.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.free.len() == self.slots.len()
    }

    /// Reports whether every slot is occupied.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.free.is_empty()
    }

    /// Moves a free slot into the alive set, bumping its generation.
    pub fn spawn(&mut self, value: T) -> Result<SlotHandle, PoolExhausted> {
        let slot = self.free.pop().ok_or(PoolExhausted)?;
        let Some(entry) = usize::try_from(slot)
            .ok()
            .and_then(|index| self.slots.get_mut(index))
        else {
            debug_assert!(false, "free list references a missing slot");
            return Err(PoolExhausted);
        };
        debug_assert!(entry.value.is_none(), "free list references a live slot");
        entry.generation = entry.generation.wrapping_add(1);
        entry.value = Some(value);
        Ok(SlotHandle::new(slot, entry.generation))
    }

    /// Returns the slot to the free list, yielding the released value.
    ///
    /// Stale handles are ignored.
    pub fn release(&mut self, handle: SlotHandle) -> Option<T> {
        let entry = self.slot_mut(handle)?;
        let value = entry.value.take()?;
        self.free.push(handle.slot());
        Some(value)
    }

    /// Live value referenced by the handle, if its generation still matches.
    #[must_use]
    pub fn get(&self, handle: SlotHandle) -> Option<&T> {
        let index = usize::try_from(handle.slot()).ok()?;
        let entry = self.slots.get(index)?;
        if entry.generation != handle.generation() {
            return None;
        }
        entry.value.as_ref()
    }

    /// Mutable access to the live value referenced by the handle.
    pub fn get_mut(&mut self, handle: SlotHandle) -> Option<&mut T> {
        self.slot_mut(handle)?.value.as_mut()
    }

    /// Current generation of the slot, whether alive or free.
    #[must_use]
    pub fn generation(&self, slot: u32) -> Option<u32> {
        let index = usize::try_from(slot).ok()?;
        self.slots.get(index).map(|entry| entry.generation)
    }

    /// Iterates the alive set in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (SlotHandle, &T)> {
        self.slots.iter().zip(0_u32..).filter_map(|(entry, slot)| {
            entry
                .value
                .as_ref()
                .map(|value| (SlotHandle::new(slot, entry.generation), value))
        })
    }

    /// Iterates the alive set mutably in slot order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (SlotHandle, &mut T)> {
        self.slots.iter_mut().zip(0_u32..).filter_map(|(entry, slot)| {
            let generation = entry.generation;
            entry
                .value
                .as_mut()
                .map(|value| (SlotHandle::new(slot, generation), value))
        })
    }

    /// Visits every live entity in slot order, releasing those for which
    /// `keep` returns `false`. Entities may therefore recycle themselves
    /// mid-scan without disturbing the iteration.
    pub fn retain_mut<F>(&mut self, mut keep: F)
    where
        F: FnMut(SlotHandle, &mut T) -> bool,
    {
        for (entry, slot) in self.slots.iter_mut().zip(0_u32..) {
            let Some(value) = entry.value.as_mut() else {
                continue;
            };
            if !keep(SlotHandle::new(slot, entry.generation), value) {
                entry.value = None;
                self.free.push(slot);
            }
        }
    }

    /// Releases every live entity. Generations are preserved and the free
    /// list is rebuilt so that slot zero is handed out first.
    pub fn clear(&mut self) {
        for entry in &mut self.slots {
            entry.value = None;
        }
        self.free.clear();
        self.free.extend((0..self.slot_count()).rev());
    }

    fn slot_count(&self) -> u32 {
        u32::try_from(self.slots.len()).unwrap_or(u32::MAX)
    }

    fn slot_mut(&mut self, handle: SlotHandle) -> Option<&mut Slot<T>> {
        let index = usize::try_from(handle.slot()).ok()?;
        let entry = self.slots.get_mut(index)?;
        (entry.generation == handle.generation()).then_some(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sixth_spawn_into_full_pool_is_rejected_without_corruption() {
        let mut pool = Pool::with_capacity(5);
        let handles: Vec<_> = (0..5)
            .map(|value| pool.spawn(value).expect("free slot"))
            .collect();

        assert_eq!(pool.spawn(99), Err(PoolExhausted));
        assert_eq!(pool.len(), 5);
        for (value, handle) in handles.iter().enumerate() {
            assert_eq!(pool.get(*handle), Some(&value), "live entity unchanged");
            assert_eq!(handle.generation(), 1);
        }
    }

    #[test]
    fn released_slot_is_reused_with_next_generation() {
        let mut pool = Pool::with_capacity(5);
        let handles: Vec<_> = (0..5)
            .map(|value| pool.spawn(value).expect("free slot"))
            .collect();
        let victim = handles[2];

        assert_eq!(pool.release(victim), Some(2));
        assert_eq!(pool.generation(victim.slot()), Some(1), "release keeps generation");

        let reused = pool.spawn(7).expect("freed slot");
        assert_eq!(reused.slot(), victim.slot());
        assert_eq!(reused.generation(), victim.generation() + 1);
        assert_eq!(pool.get(victim), None, "old handle is stale");
        assert_eq!(pool.get(reused), Some(&7));
    }

    #[test]
    fn first_spawn_uses_slot_zero() {
        let mut pool = Pool::with_capacity(3);
        let handle = pool.spawn('a').expect("free slot");
        assert_eq!(handle, SlotHandle::new(0, 1));
    }

    #[test]
    fn retain_mut_releases_rejected_entities() {
        let mut pool = Pool::with_capacity(4);
        for value in 0..4 {
            let _ = pool.spawn(value).expect("free slot");
        }

        pool.retain_mut(|_, value| *value % 2 == 0);

        let alive: Vec<_> = pool.iter().map(|(_, value)| *value).collect();
        assert_eq!(alive, vec![0, 2]);
        assert_eq!(pool.len(), 2);
        assert!(!pool.is_full());
    }

    #[test]
    fn release_ignores_stale_handles() {
        let mut pool = Pool::with_capacity(1);
        let first = pool.spawn(1).expect("free slot");
        let _ = pool.release(first);
        let second = pool.spawn(2).expect("free slot");

        assert_eq!(pool.release(first), None);
        assert_eq!(pool.get(second), Some(&2));
    }

    #[test]
    fn clear_preserves_generations() {
        let mut pool = Pool::with_capacity(2);
        let _ = pool.spawn(1).expect("free slot");
        let _ = pool.spawn(2).expect("free slot");
        pool.clear();

        assert!(pool.is_empty());
        let handle = pool.spawn(3).expect("free slot");
        assert_eq!(handle, SlotHandle::new(0, 2));
    }
}
