//! Referential integrity policy: which record kinds reference which, and
//! what a delete of the target does about each reference. The services walk
//! this table instead of hard-coding the cascade order.

use crate::domain::EntityKind;

/// Behavior of a delete with live references from `referrer` to `target`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnDelete {
    /// Refuse the delete; nothing changes.
    Block,
    /// Delete the referencing records first, then the target.
    Cascade,
}

#[derive(Debug, Clone, Copy)]
pub struct ReferenceRule {
    pub referrer: EntityKind,
    pub target: EntityKind,
    pub on_delete: OnDelete,
}

/// Every cross-entity reference in the data model.
pub const REFERENCE_RULES: &[ReferenceRule] = &[
    ReferenceRule {
        referrer: EntityKind::Student,
        target: EntityKind::Employment,
        on_delete: OnDelete::Block,
    },
    ReferenceRule {
        referrer: EntityKind::Project,
        target: EntityKind::Period,
        on_delete: OnDelete::Block,
    },
    ReferenceRule {
        referrer: EntityKind::Allocation,
        target: EntityKind::Period,
        on_delete: OnDelete::Block,
    },
    ReferenceRule {
        referrer: EntityKind::Allocation,
        target: EntityKind::Project,
        on_delete: OnDelete::Cascade,
    },
    ReferenceRule {
        referrer: EntityKind::Allocation,
        target: EntityKind::Student,
        on_delete: OnDelete::Cascade,
    },
];

/// What deleting one record of `target` entails.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeletePlan {
    /// Kinds whose references block the delete outright.
    pub blockers: Vec<EntityKind>,
    /// Kinds whose referencing records are removed alongside the target.
    pub cascades: Vec<EntityKind>,
}

pub fn delete_plan(target: EntityKind) -> DeletePlan {
    let mut plan = DeletePlan::default();
    for rule in REFERENCE_RULES {
        if rule.target != target {
            continue;
        }
        match rule.on_delete {
            OnDelete::Block => plan.blockers.push(rule.referrer),
            OnDelete::Cascade => plan.cascades.push(rule.referrer),
        }
    }
    plan
}

/// An allocation's period is private to it and removed with it. A project's
/// period is shared state and survives the project (its deletion is a
/// separate, guarded call).
pub const fn owns_private_period(kind: EntityKind) -> bool {
    matches!(kind, EntityKind::Allocation)
}
