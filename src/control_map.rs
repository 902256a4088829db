//! Bidirectional index between inset types and the targets controlling them.
//!
//! The forward side answers "who controls type T" (separately for real and
//! fake control); the reverse side answers "which types does target X
//! control", in the order X acquired them, which is the order its controls
//! are dispatched in. Every mutation updates both sides in the same call.

use crate::types::{ControlTarget, InsetType};
use serde::Serialize;
use std::collections::BTreeMap;

/// Whether an entry carries the real leash or only the illusion of control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlRole {
    Real,
    Fake,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ControlEntry {
    pub inset_type: InsetType,
    pub role: ControlRole,
    pub target: ControlTarget,
}

#[derive(Debug, Clone, Default)]
pub struct ControlTargetMap {
    real: BTreeMap<InsetType, ControlTarget>,
    fake: BTreeMap<InsetType, ControlTarget>,
    by_target: BTreeMap<ControlTarget, Vec<(InsetType, ControlRole)>>,
}

impl ControlTargetMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn target_of(&self, inset_type: InsetType, role: ControlRole) -> Option<ControlTarget> {
        self.forward(role).get(&inset_type).copied()
    }

    /// Types `target` controls, in acquisition order. `None` when it controls nothing.
    pub fn entries_for(&self, target: ControlTarget) -> Option<&[(InsetType, ControlRole)]> {
        self.by_target.get(&target).map(Vec::as_slice)
    }

    pub fn controls_anything(&self, target: ControlTarget) -> bool {
        self.by_target.contains_key(&target)
    }

    /// Makes `target` the holder of `(inset_type, role)`. A previous holder is
    /// unlinked in the same step and returned.
    pub fn insert(
        &mut self,
        inset_type: InsetType,
        role: ControlRole,
        target: ControlTarget,
    ) -> Option<ControlTarget> {
        let previous = self.remove(inset_type, role);
        self.forward_mut(role).insert(inset_type, target);
        self.by_target
            .entry(target)
            .or_default()
            .push((inset_type, role));
        previous
    }

    /// Unlinks whoever holds `(inset_type, role)`.
    pub fn remove(&mut self, inset_type: InsetType, role: ControlRole) -> Option<ControlTarget> {
        let target = self.forward_mut(role).remove(&inset_type)?;
        self.unlink_reverse(target, inset_type, role);
        Some(target)
    }

    /// Unlinks `(inset_type, role)` only if `target` is its holder.
    pub fn remove_entry(&mut self, target: ControlTarget, inset_type: InsetType, role: ControlRole) -> bool {
        if self.target_of(inset_type, role) != Some(target) {
            return false;
        }
        self.remove(inset_type, role).is_some()
    }

    pub fn entries(&self) -> Vec<ControlEntry> {
        let real = self.real.iter().map(|(ty, target)| ControlEntry {
            inset_type: *ty,
            role: ControlRole::Real,
            target: *target,
        });
        let fake = self.fake.iter().map(|(ty, target)| ControlEntry {
            inset_type: *ty,
            role: ControlRole::Fake,
            target: *target,
        });
        real.chain(fake).collect()
    }

    /// Both sides describe the same set of links.
    pub fn is_consistent(&self) -> bool {
        let forward_links = self.real.len() + self.fake.len();
        let reverse_links: usize = self.by_target.values().map(Vec::len).sum();
        if forward_links != reverse_links {
            return false;
        }
        self.by_target.iter().all(|(target, types)| {
            !types.is_empty()
                && types
                    .iter()
                    .all(|(ty, role)| self.target_of(*ty, *role) == Some(*target))
        })
    }

    fn unlink_reverse(&mut self, target: ControlTarget, inset_type: InsetType, role: ControlRole) {
        if let Some(types) = self.by_target.get_mut(&target) {
            types.retain(|entry| *entry != (inset_type, role));
            if types.is_empty() {
                self.by_target.remove(&target);
            }
        }
    }

    fn forward(&self, role: ControlRole) -> &BTreeMap<InsetType, ControlTarget> {
        match role {
            ControlRole::Real => &self.real,
            ControlRole::Fake => &self.fake,
        }
    }

    fn forward_mut(&mut self, role: ControlRole) -> &mut BTreeMap<InsetType, ControlTarget> {
        match role {
            ControlRole::Real => &mut self.real,
            ControlRole::Fake => &mut self.fake,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::WindowId;
    use proptest::prelude::*;

    const APP: ControlTarget = ControlTarget::Window(WindowId(1));
    const OTHER: ControlTarget = ControlTarget::Window(WindowId(2));

    #[test]
    fn test_insert_replaces_previous_holder() {
        let mut map = ControlTargetMap::new();
        assert_eq!(map.insert(InsetType::StatusBar, ControlRole::Real, APP), None);
        assert_eq!(map.insert(InsetType::StatusBar, ControlRole::Real, OTHER), Some(APP));

        assert!(!map.controls_anything(APP));
        assert_eq!(
            map.entries_for(OTHER),
            Some(&[(InsetType::StatusBar, ControlRole::Real)][..])
        );
        assert!(map.is_consistent());
    }

    #[test]
    fn test_acquisition_order_is_kept() {
        let mut map = ControlTargetMap::new();
        map.insert(InsetType::NavigationBar, ControlRole::Real, APP);
        map.insert(InsetType::StatusBar, ControlRole::Real, APP);
        map.insert(InsetType::ClimateBar, ControlRole::Fake, APP);

        let types: Vec<_> = map.entries_for(APP).unwrap().iter().map(|(ty, _)| *ty).collect();
        assert_eq!(
            types,
            vec![InsetType::NavigationBar, InsetType::StatusBar, InsetType::ClimateBar]
        );
    }

    #[test]
    fn test_real_and_fake_coexist_for_same_target() {
        let mut map = ControlTargetMap::new();
        map.insert(InsetType::StatusBar, ControlRole::Real, APP);
        map.insert(InsetType::StatusBar, ControlRole::Fake, APP);
        assert_eq!(map.entries_for(APP).unwrap().len(), 2);

        assert!(map.remove_entry(APP, InsetType::StatusBar, ControlRole::Real));
        assert_eq!(
            map.entries_for(APP),
            Some(&[(InsetType::StatusBar, ControlRole::Fake)][..])
        );
        assert!(map.is_consistent());
    }

    #[test]
    fn test_remove_entry_ignores_non_holder() {
        let mut map = ControlTargetMap::new();
        map.insert(InsetType::Ime, ControlRole::Real, APP);
        assert!(!map.remove_entry(OTHER, InsetType::Ime, ControlRole::Real));
        assert_eq!(map.target_of(InsetType::Ime, ControlRole::Real), Some(APP));
    }

    fn arb_type() -> impl Strategy<Value = InsetType> {
        prop::sample::select(InsetType::ALL.to_vec())
    }

    fn arb_role() -> impl Strategy<Value = ControlRole> {
        prop_oneof![Just(ControlRole::Real), Just(ControlRole::Fake)]
    }

    fn arb_target() -> impl Strategy<Value = ControlTarget> {
        prop_oneof![
            (1u64..5).prop_map(|id| ControlTarget::Window(WindowId(id))),
            Just(ControlTarget::Remote),
            Just(ControlTarget::EmptyIme),
        ]
    }

    proptest! {
        #[test]
        fn prop_sides_always_agree(
            ops in prop::collection::vec((any::<bool>(), arb_type(), arb_role(), arb_target()), 0..64)
        ) {
            let mut map = ControlTargetMap::new();
            for (insert, ty, role, target) in ops {
                if insert {
                    map.insert(ty, role, target);
                } else {
                    map.remove_entry(target, ty, role);
                }
                prop_assert!(map.is_consistent());
            }
        }
    }
}
