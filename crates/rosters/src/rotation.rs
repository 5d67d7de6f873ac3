//! Rotation cursor and round-robin assignment engine.
//!
//! The cursor is a small versioned record, one per ministry: the ordered
//! eligible-member pool snapshot, an index into it, and an append-only
//! history of past assignments. The `version` field is the compare-and-swap
//! token the store checks on `advance`, so two concurrent generation
//! requests cannot both consume the same rotation turn.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use flock_core::{DomainError, DomainResult, MemberId};
use flock_ministries::MinistryId;

/// One past assignment: who served which role at which occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentRecord {
    pub occurs_at: DateTime<Utc>,
    pub member_id: MemberId,
    pub duty_role: String,
}

/// A not-yet-persisted assignment produced by the engine.
///
/// Drafts always enter the roster with status `pending`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftAssignment {
    pub member_id: MemberId,
    pub duty_role: String,
}

/// The outcome of one engine invocation: the draft assignments, the matching
/// history records, and how far the cursor must advance once the rotation
/// turn is claimed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationPlan {
    pub assignments: Vec<DraftAssignment>,
    pub records: Vec<AssignmentRecord>,
    pub consumed: usize,
}

/// Per-ministry rotation state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationCursor {
    pub ministry_id: MinistryId,
    /// Ordered pool snapshot; order defines fairness.
    pub pool: Vec<MemberId>,
    /// Index of the next member to serve. Always consumed modulo the current
    /// pool length, so a shrunken pool re-normalizes on next use instead of
    /// failing.
    pub index: usize,
    /// Append-only log of past assignments.
    pub history: Vec<AssignmentRecord>,
    /// Compare-and-swap token; bumped on every accepted `advance`.
    pub version: u64,
}

impl RotationCursor {
    /// Fresh cursor: index 0, empty history.
    ///
    /// Re-initializing on every pool edit resets fairness; that is the
    /// documented behavior, not an accident.
    pub fn new(ministry_id: MinistryId, pool: Vec<MemberId>) -> Self {
        Self {
            ministry_id,
            pool,
            index: 0,
            history: Vec::new(),
            version: 0,
        }
    }

    /// Current index normalized into the pool.
    pub fn normalized_index(&self) -> usize {
        if self.pool.is_empty() {
            0
        } else {
            self.index % self.pool.len()
        }
    }

    /// Draft one assignment per duty role, in role-list order.
    ///
    /// Role at position `o` gets the pool member at `(index + o) mod N`:
    /// consecutive pool positions starting at the cursor, with no per-role
    /// eligibility filtering — every member is treated as equally qualified
    /// for every role. When more roles than members are requested the cursor
    /// wraps and members repeat within the same roster.
    pub fn plan(&self, duty_roles: &[String], occurs_at: DateTime<Utc>) -> DomainResult<RotationPlan> {
        if self.pool.is_empty() {
            return Err(DomainError::validation(
                "no eligible members in rotation pool",
            ));
        }

        let start = self.normalized_index();
        let mut assignments = Vec::with_capacity(duty_roles.len());
        let mut records = Vec::with_capacity(duty_roles.len());

        for (offset, duty_role) in duty_roles.iter().enumerate() {
            let member_id = self.pool[(start + offset) % self.pool.len()];
            assignments.push(DraftAssignment {
                member_id,
                duty_role: duty_role.clone(),
            });
            records.push(AssignmentRecord {
                occurs_at,
                member_id,
                duty_role: duty_role.clone(),
            });
        }

        Ok(RotationPlan {
            assignments,
            records,
            consumed: duty_roles.len(),
        })
    }

    /// Advance the cursor after a plan's rotation turn has been claimed.
    ///
    /// Advancing a cursor with an empty pool is an invalid state, not a
    /// silent no-op: the caller must refuse to generate in that case.
    pub fn apply_advance(
        &mut self,
        consumed: usize,
        records: Vec<AssignmentRecord>,
    ) -> DomainResult<()> {
        if self.pool.is_empty() {
            return Err(DomainError::invariant(
                "cannot advance rotation cursor with an empty pool",
            ));
        }

        self.index = (self.normalized_index() + consumed) % self.pool.len();
        self.history.extend(records);
        self.version += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flock_core::AggregateId;
    use proptest::prelude::*;

    fn test_ministry_id() -> MinistryId {
        MinistryId::new(AggregateId::new())
    }

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn roles(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn generate(cursor: &mut RotationCursor, duty_roles: &[String]) -> Vec<DraftAssignment> {
        let plan = cursor.plan(duty_roles, test_time()).unwrap();
        cursor
            .apply_advance(plan.consumed, plan.records.clone())
            .unwrap();
        plan.assignments
    }

    #[test]
    fn worship_scenario_rotates_through_pool_in_order() {
        let a = MemberId::new();
        let b = MemberId::new();
        let c = MemberId::new();
        let mut cursor = RotationCursor::new(test_ministry_id(), vec![a, b, c]);
        let vocal = roles(&["Vocal"]);

        let first = generate(&mut cursor, &vocal);
        assert_eq!(first[0].member_id, a);
        assert_eq!(cursor.index, 1);

        let second = generate(&mut cursor, &vocal);
        assert_eq!(second[0].member_id, b);
        assert_eq!(cursor.index, 2);

        let third = generate(&mut cursor, &vocal);
        assert_eq!(third[0].member_id, c);
        assert_eq!(cursor.index, 0);
    }

    #[test]
    fn plan_fills_roles_from_consecutive_positions() {
        let pool: Vec<MemberId> = (0..4).map(|_| MemberId::new()).collect();
        let mut cursor = RotationCursor::new(test_ministry_id(), pool.clone());
        cursor.index = 2;

        let plan = cursor
            .plan(&roles(&["Vocal", "Keys", "Sound"]), test_time())
            .unwrap();

        assert_eq!(plan.assignments[0].member_id, pool[2]);
        assert_eq!(plan.assignments[1].member_id, pool[3]);
        assert_eq!(plan.assignments[2].member_id, pool[0]);
    }

    #[test]
    fn advance_moves_index_by_roles_mod_pool_and_appends_history() {
        let pool: Vec<MemberId> = (0..3).map(|_| MemberId::new()).collect();
        let mut cursor = RotationCursor::new(test_ministry_id(), pool);
        let duty_roles = roles(&["Vocal", "Keys", "Sound", "Slides", "Usher"]);

        generate(&mut cursor, &duty_roles);

        // 5 roles over a pool of 3: index ends at 5 mod 3.
        assert_eq!(cursor.index, 2);
        assert_eq!(cursor.history.len(), 5);
        assert_eq!(cursor.version, 1);
    }

    #[test]
    fn more_roles_than_members_wraps_and_repeats() {
        let a = MemberId::new();
        let b = MemberId::new();
        let mut cursor = RotationCursor::new(test_ministry_id(), vec![a, b]);

        let drafts = generate(&mut cursor, &roles(&["Vocal", "Keys", "Sound"]));

        assert_eq!(drafts[0].member_id, a);
        assert_eq!(drafts[1].member_id, b);
        assert_eq!(drafts[2].member_id, a);
    }

    #[test]
    fn plan_with_empty_pool_refuses() {
        let cursor = RotationCursor::new(test_ministry_id(), Vec::new());
        let err = cursor.plan(&roles(&["Vocal"]), test_time()).unwrap_err();
        match err {
            DomainError::Validation(msg) if msg.contains("no eligible members") => {}
            _ => panic!("Expected Validation error for empty pool"),
        }
    }

    #[test]
    fn advance_with_empty_pool_is_invalid_state() {
        let mut cursor = RotationCursor::new(test_ministry_id(), Vec::new());
        let err = cursor.apply_advance(1, Vec::new()).unwrap_err();
        match err {
            DomainError::InvariantViolation(_) => {}
            _ => panic!("Expected InvariantViolation for empty-pool advance"),
        }
    }

    #[test]
    fn stale_index_renormalizes_against_shrunken_pool() {
        // A cursor whose index outlived a pool shrink must not panic; the
        // index is taken modulo the current length on next use.
        let pool: Vec<MemberId> = (0..2).map(|_| MemberId::new()).collect();
        let mut cursor = RotationCursor::new(test_ministry_id(), pool.clone());
        cursor.index = 5;

        let plan = cursor.plan(&roles(&["Vocal"]), test_time()).unwrap();
        assert_eq!(plan.assignments[0].member_id, pool[1]);
    }

    proptest! {
        // Fairness: after k single-role generations over a pool of n, every
        // member has floor(k/n) or ceil(k/n) assignments.
        #[test]
        fn round_robin_is_fair(n in 1usize..8, k in 1usize..60) {
            let pool: Vec<MemberId> = (0..n).map(|_| MemberId::new()).collect();
            let mut cursor = RotationCursor::new(test_ministry_id(), pool.clone());
            let vocal = roles(&["Vocal"]);

            for _ in 0..k {
                generate(&mut cursor, &vocal);
            }

            prop_assert_eq!(cursor.history.len(), k);
            for member in &pool {
                let count = cursor
                    .history
                    .iter()
                    .filter(|r| r.member_id == *member)
                    .count();
                prop_assert!(count == k / n || count == k.div_ceil(n));
            }
        }

        // Index invariant: the cursor index stays within the pool after any
        // sequence of advances.
        #[test]
        fn index_stays_in_bounds(n in 1usize..8, batches in proptest::collection::vec(1usize..6, 1..20)) {
            let pool: Vec<MemberId> = (0..n).map(|_| MemberId::new()).collect();
            let mut cursor = RotationCursor::new(test_ministry_id(), pool);

            for r in batches {
                let duty_roles: Vec<String> = (0..r).map(|i| format!("role-{i}")).collect();
                generate(&mut cursor, &duty_roles);
                prop_assert!(cursor.index < n);
            }
        }
    }
}
