//! Membership bookkeeping between pooled entities.
//!
//! Materials track the meshes shaded by them and meshes track the instances
//! placing them. Instead of intrusive linked lists, each relation is a plain
//! member list per owner plus the member's own position in that list, so
//! removal is an O(1) swap-remove with a single slot fix-up.

use slotmap::{Key, SecondaryMap};

#[derive(Debug)]
pub(crate) struct MembershipLedger<Owner: Key, Member: Key> {
    lists: SecondaryMap<Owner, Vec<Member>>,
    slots: SecondaryMap<Member, usize>,
}

impl<Owner: Key, Member: Key> MembershipLedger<Owner, Member> {
    pub fn new() -> Self {
        Self {
            lists: SecondaryMap::new(),
            slots: SecondaryMap::new(),
        }
    }

    /// Appends `member` to `owner`'s list and records its slot.
    pub fn register(&mut self, owner: Owner, member: Member) {
        let list = self.lists.entry(owner).expect("owner key is live").or_default();
        self.slots.insert(member, list.len());
        list.push(member);
    }

    /// Removes `member` from `owner`'s list. Returns whether the member was
    /// present; a second call for the same member is a no-op. The member that
    /// gets swapped into the freed slot has its recorded position updated.
    pub fn unregister(&mut self, owner: Owner, member: Member) -> bool {
        let Some(slot) = self.slots.remove(member) else {
            return false;
        };
        let Some(list) = self.lists.get_mut(owner) else {
            return false;
        };
        list.swap_remove(slot);
        if let Some(&moved) = list.get(slot) {
            self.slots.insert(moved, slot);
        }
        true
    }

    pub fn members(&self, owner: Owner) -> &[Member] {
        self.lists.get(owner).map_or(&[], Vec::as_slice)
    }

    /// Removes and returns the whole member list of `owner`.
    pub fn take_members(&mut self, owner: Owner) -> Vec<Member> {
        let members = self.lists.remove(owner).unwrap_or_default();
        for member in &members {
            self.slots.remove(*member);
        }
        members
    }
}

impl<Owner: Key, Member: Key> Default for MembershipLedger<Owner, Member> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::{SlotMap, new_key_type};

    new_key_type! {
        struct OwnerKey;
        struct MemberKey;
    }

    fn keys() -> (OwnerKey, Vec<MemberKey>) {
        let mut owners: SlotMap<OwnerKey, ()> = SlotMap::with_key();
        let mut members: SlotMap<MemberKey, ()> = SlotMap::with_key();
        let owner = owners.insert(());
        let member_keys = (0..4).map(|_| members.insert(())).collect();
        (owner, member_keys)
    }

    #[test]
    fn unregister_removes_exactly_once() {
        let (owner, members) = keys();
        let mut ledger = MembershipLedger::new();
        for &m in &members[..3] {
            ledger.register(owner, m);
        }
        assert_eq!(ledger.members(owner).len(), 3);

        assert!(ledger.unregister(owner, members[1]));
        assert_eq!(ledger.members(owner).len(), 2);
        assert!(!ledger.members(owner).contains(&members[1]));

        // Removing the same member again must not shrink the list further.
        assert!(!ledger.unregister(owner, members[1]));
        assert_eq!(ledger.members(owner).len(), 2);
    }

    #[test]
    fn swap_remove_keeps_displaced_slots_valid() {
        let (owner, members) = keys();
        let mut ledger = MembershipLedger::new();
        for &m in &members {
            ledger.register(owner, m);
        }

        // Removing the head swaps the tail member into slot 0. Its recorded
        // slot must follow, or the next removal would evict the wrong member.
        assert!(ledger.unregister(owner, members[0]));
        assert!(ledger.unregister(owner, members[3]));
        assert_eq!(ledger.members(owner), &[members[2], members[1]]);

        assert!(ledger.unregister(owner, members[1]));
        assert!(ledger.unregister(owner, members[2]));
        assert!(ledger.members(owner).is_empty());
    }

    #[test]
    fn unregistered_member_is_ignored() {
        let (owner, members) = keys();
        let mut ledger = MembershipLedger::new();
        ledger.register(owner, members[0]);
        assert!(!ledger.unregister(owner, members[1]));
        assert_eq!(ledger.members(owner), &[members[0]]);
    }

    #[test]
    fn take_members_clears_the_relation() {
        let (owner, members) = keys();
        let mut ledger = MembershipLedger::new();
        for &m in &members {
            ledger.register(owner, m);
        }
        let taken = ledger.take_members(owner);
        assert_eq!(taken.len(), members.len());
        assert!(ledger.members(owner).is_empty());
        assert!(!ledger.unregister(owner, members[0]));
    }
}
