//! Lives and currency of a running level.

use bastion_core::{Event, Treasury};

/// Player resources tracked while a level runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Session {
    lives: u32,
    bucks: u32,
    destroyed: u32,
    leaked: u32,
}

impl Session {
    /// Creates a session with the provided starting lives and currency.
    #[must_use]
    pub const fn new(lives: u32, bucks: u32) -> Self {
        Self {
            lives,
            bucks,
            destroyed: 0,
            leaked: 0,
        }
    }

    /// Lives left before the level is lost.
    #[must_use]
    pub const fn lives(&self) -> u32 {
        self.lives
    }

    /// Currency available for construction.
    #[must_use]
    pub const fn bucks(&self) -> u32 {
        self.bucks
    }

    /// Enemies destroyed by towers.
    #[must_use]
    pub const fn destroyed(&self) -> u32 {
        self.destroyed
    }

    /// Enemies that reached the home cell.
    #[must_use]
    pub const fn leaked(&self) -> u32 {
        self.leaked
    }

    /// Reports whether every life has been lost.
    #[must_use]
    pub const fn is_defeated(&self) -> bool {
        self.lives == 0
    }

    /// Charges a life per enemy reaching home and pays every bounty.
    pub(crate) fn record(&mut self, events: &[Event]) {
        for event in events {
            match event {
                Event::EnemyReachedHome { .. } => {
                    self.lives = self.lives.saturating_sub(1);
                    self.leaked += 1;
                }
                Event::EnemyDestroyed { bounty, .. } => {
                    self.bucks = self.bucks.saturating_add(*bounty);
                    self.destroyed += 1;
                }
                _ => {}
            }
        }
    }
}

impl Treasury for Session {
    fn try_spend(&mut self, amount: u32) -> bool {
        match self.bucks.checked_sub(amount) {
            Some(left) => {
                self.bucks = left;
                true
            }
            None => false,
        }
    }

    fn deposit(&mut self, amount: u32) {
        self.bucks = self.bucks.saturating_add(amount);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bastion_core::SlotHandle;

    #[test]
    fn events_adjust_lives_and_bucks() {
        let mut session = Session::new(2, 10);
        let enemy = SlotHandle::new(0, 1);
        session.record(&[
            Event::EnemyReachedHome { enemy },
            Event::EnemyDestroyed { enemy, bounty: 7 },
            Event::EnemyStranded { enemy },
        ]);
        assert_eq!(session.lives(), 1);
        assert_eq!(session.bucks(), 17);
        assert_eq!((session.destroyed(), session.leaked()), (1, 1));

        session.record(&[Event::EnemyReachedHome { enemy }, Event::EnemyReachedHome { enemy }]);
        assert_eq!(session.lives(), 0, "lives never underflow");
        assert!(session.is_defeated());
    }

    #[test]
    fn spending_is_all_or_nothing() {
        let mut session = Session::new(1, 10);
        assert!(!session.try_spend(11));
        assert_eq!(session.bucks(), 10);
        assert!(session.try_spend(10));
        assert_eq!(session.bucks(), 0);
        session.deposit(4);
        assert_eq!(session.bucks(), 4);
    }
}
