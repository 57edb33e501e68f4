//! Per-call delivery planning and policy aggregation

use std::collections::HashMap;

use contracts::{ConsumerRecord, DeliveryOutcome, DeliveryStatus, FanoutPolicy, TransportError};

use crate::registry::{normalize_kind, TransportHandle, TransportRegistry};

/// Records sharing one fan-out group
#[derive(Debug)]
pub(crate) struct GroupPlan {
    pub name: String,
    pub policy: FanoutPolicy,
    /// Indices into the resolved records
    pub members: Vec<usize>,
}

/// One physical send; several records may map onto it
pub(crate) struct DeliveryTarget {
    pub address: String,
    pub transport: Result<TransportHandle, TransportError>,
    /// Indices of the groups waiting on this send
    pub owners: Vec<usize>,
}

/// What one `notify` is going to send, before anything is sent
pub(crate) struct DeliveryPlan {
    pub groups: Vec<GroupPlan>,
    pub targets: Vec<DeliveryTarget>,
    /// Target index per record
    pub target_of: Vec<usize>,
}

impl DeliveryPlan {
    /// Group the records and collapse duplicate destinations.
    ///
    /// The endpoint is fixed for the whole call, so a destination is keyed
    /// by `(transport kind, address)`: records on one host through different
    /// transports stay separate sends. Unknown transport kinds are resolved
    /// here and never spawn.
    pub fn build(records: &[ConsumerRecord], registry: &TransportRegistry) -> Self {
        let mut groups: Vec<GroupPlan> = Vec::new();
        let mut group_index: HashMap<&str, usize> = HashMap::new();
        let mut targets: Vec<DeliveryTarget> = Vec::new();
        let mut target_index: HashMap<(String, &str), usize> = HashMap::new();
        let mut target_of = Vec::with_capacity(records.len());

        for (idx, record) in records.iter().enumerate() {
            let group = *group_index
                .entry(record.fanout_group.as_str())
                .or_insert_with(|| {
                    groups.push(GroupPlan {
                        name: record.fanout_group.clone(),
                        policy: record.policy,
                        members: Vec::new(),
                    });
                    groups.len() - 1
                });
            groups[group].members.push(idx);
            // Members disagreeing on policy: ALL wins
            if record.policy == FanoutPolicy::All {
                groups[group].policy = FanoutPolicy::All;
            }

            let key = (normalize_kind(&record.transport_kind), record.address.as_str());
            let target = *target_index.entry(key).or_insert_with(|| {
                targets.push(DeliveryTarget {
                    address: record.address.clone(),
                    transport: registry.get(&record.transport_kind),
                    owners: Vec::new(),
                });
                targets.len() - 1
            });
            if !targets[target].owners.contains(&group) {
                targets[target].owners.push(group);
            }
            target_of.push(target);
        }

        Self {
            groups,
            targets,
            target_of,
        }
    }

    /// Group allowed to cancel `target`: only when it is the sole owner
    pub fn exclusive_owner(&self, target: usize) -> Option<usize> {
        match self.targets[target].owners.as_slice() {
            [only] => Some(*only),
            _ => None,
        }
    }

    /// Sends that will actually be attempted
    pub fn spawnable(&self) -> usize {
        self.targets.iter().filter(|t| t.transport.is_ok()).count()
    }
}

/// Verdict of one `notify`
#[derive(Debug)]
pub(crate) struct Aggregate {
    pub succeeded: bool,
    pub outcomes: Vec<DeliveryOutcome>,
    /// Failed outcomes of unsatisfied groups, in resolution order
    pub failed: Vec<DeliveryOutcome>,
    /// Names of the groups whose policy was not met
    pub unsatisfied: Vec<String>,
}

/// Fold per-target statuses back onto records and evaluate every group
pub(crate) fn aggregate(
    plan: &DeliveryPlan,
    records: &[ConsumerRecord],
    statuses: &[DeliveryStatus],
) -> Aggregate {
    let outcomes: Vec<DeliveryOutcome> = records
        .iter()
        .zip(&plan.target_of)
        .map(|(record, &target)| DeliveryOutcome {
            record: record.clone(),
            status: statuses[target].clone(),
        })
        .collect();

    let mut unsatisfied = Vec::new();
    let mut failed_members = Vec::new();

    for group in &plan.groups {
        let satisfied = match group.policy {
            FanoutPolicy::Any => group.members.iter().any(|&m| outcomes[m].is_delivered()),
            FanoutPolicy::All => group.members.iter().all(|&m| outcomes[m].is_delivered()),
        };
        if !satisfied {
            unsatisfied.push(group.name.clone());
            failed_members.extend(group.members.iter().copied().filter(|&m| outcomes[m].is_failed()));
        }
    }

    failed_members.sort_unstable();
    let failed = failed_members.into_iter().map(|m| outcomes[m].clone()).collect();

    Aggregate {
        succeeded: unsatisfied.is_empty(),
        outcomes,
        failed,
        unsatisfied,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transports::MemoryTransport;

    fn record(address: &str, kind: &str, group: &str, policy: FanoutPolicy) -> ConsumerRecord {
        ConsumerRecord {
            label: "FOO".into(),
            address: address.to_string(),
            transport_kind: kind.to_string(),
            fanout_group: group.to_string(),
            policy,
        }
    }

    fn registry() -> TransportRegistry {
        let mut registry = TransportRegistry::new();
        registry.register("http", MemoryTransport::new());
        registry.register("queue", MemoryTransport::new());
        registry
    }

    fn failure() -> DeliveryStatus {
        DeliveryStatus::Failed(TransportError::send("http", "h", "boom"))
    }

    #[test]
    fn test_plan_groups_and_dedups() {
        let records = vec![
            record("h1", "http", "g1", FanoutPolicy::Any),
            record("h2", "http", "g1", FanoutPolicy::Any),
            record("h1", "http", "g2", FanoutPolicy::All),
        ];
        let plan = DeliveryPlan::build(&records, &registry());

        assert_eq!(plan.groups.len(), 2);
        assert_eq!(plan.groups[0].members, vec![0, 1]);
        assert_eq!(plan.targets.len(), 2);
        assert_eq!(plan.target_of, vec![0, 1, 0]);
        assert_eq!(plan.exclusive_owner(0), None);
        assert_eq!(plan.exclusive_owner(1), Some(0));
    }

    #[test]
    fn test_same_address_different_kinds_stay_separate() {
        let records = vec![
            record("broker", "http", "g1", FanoutPolicy::All),
            record("broker", "queue", "g2", FanoutPolicy::All),
            record("broker", "HTTP", "g3", FanoutPolicy::All),
        ];
        let plan = DeliveryPlan::build(&records, &registry());

        assert_eq!(plan.targets.len(), 2);
        assert_eq!(plan.target_of, vec![0, 1, 0]);
        assert_eq!(plan.targets[1].transport.as_ref().unwrap().kind(), "queue");
        assert_eq!(plan.exclusive_owner(1), Some(1));
    }

    #[test]
    fn test_unknown_kind_does_not_shadow_known_kind_on_same_host() {
        let records = vec![
            record("host1", "carrier-pigeon", "g1", FanoutPolicy::Any),
            record("host1", "http", "g2", FanoutPolicy::All),
        ];
        let plan = DeliveryPlan::build(&records, &registry());

        assert_eq!(plan.targets.len(), 2);
        assert!(plan.targets[0].transport.is_err());
        assert!(plan.targets[1].transport.is_ok());
        assert_eq!(plan.spawnable(), 1);
    }

    #[test]
    fn test_unknown_kind_resolved_at_plan_time() {
        let records = vec![
            record("coop", "carrier-pigeon", "g1", FanoutPolicy::Any),
            record("h1", "HTTP", "g1", FanoutPolicy::Any),
        ];
        let plan = DeliveryPlan::build(&records, &registry());

        assert!(matches!(
            plan.targets[0].transport,
            Err(TransportError::UnknownTransport { .. })
        ));
        assert_eq!(plan.spawnable(), 1);
    }

    #[test]
    fn test_all_wins_policy_conflict() {
        let records = vec![
            record("h1", "http", "g1", FanoutPolicy::Any),
            record("h2", "http", "g1", FanoutPolicy::All),
        ];
        let plan = DeliveryPlan::build(&records, &registry());
        assert_eq!(plan.groups[0].policy, FanoutPolicy::All);
    }

    #[test]
    fn test_any_tolerates_failures() {
        let records = vec![
            record("h1", "http", "g1", FanoutPolicy::Any),
            record("h2", "http", "g1", FanoutPolicy::Any),
        ];
        let plan = DeliveryPlan::build(&records, &registry());

        let verdict = aggregate(&plan, &records, &[failure(), DeliveryStatus::Delivered]);
        assert!(verdict.succeeded);
        assert!(verdict.failed.is_empty());
        assert_eq!(verdict.outcomes.len(), 2);
    }

    #[test]
    fn test_all_reports_only_its_failures() {
        let records = vec![
            record("h1", "http", "g1", FanoutPolicy::All),
            record("h2", "http", "g1", FanoutPolicy::All),
            record("h3", "http", "g2", FanoutPolicy::Any),
            record("h4", "http", "g2", FanoutPolicy::Any),
        ];
        let plan = DeliveryPlan::build(&records, &registry());
        let statuses = [
            DeliveryStatus::Delivered,
            failure(),
            failure(),
            DeliveryStatus::Delivered,
        ];

        let verdict = aggregate(&plan, &records, &statuses);
        assert!(!verdict.succeeded);
        assert_eq!(verdict.failed.len(), 1);
        assert_eq!(verdict.failed[0].record.address, "h2");
        assert_eq!(verdict.unsatisfied, vec!["g1".to_string()]);
    }

    #[test]
    fn test_any_with_every_member_failing() {
        let records = vec![
            record("h1", "http", "g1", FanoutPolicy::Any),
            record("h2", "http", "g1", FanoutPolicy::Any),
        ];
        let plan = DeliveryPlan::build(&records, &registry());

        let verdict = aggregate(&plan, &records, &[failure(), failure()]);
        assert!(!verdict.succeeded);
        assert_eq!(verdict.unsatisfied, vec!["g1".to_string()]);
        let failed: Vec<_> = verdict.failed.iter().map(|o| o.record.address.as_str()).collect();
        assert_eq!(failed, vec!["h1", "h2"]);
    }

    #[test]
    fn test_singleton_all_matches_any() {
        for policy in [FanoutPolicy::Any, FanoutPolicy::All] {
            let records = vec![record("h1", "http", "g1", policy)];
            let plan = DeliveryPlan::build(&records, &registry());

            assert!(aggregate(&plan, &records, &[DeliveryStatus::Delivered]).succeeded);
            assert!(!aggregate(&plan, &records, &[failure()]).succeeded);
        }
    }

    #[test]
    fn test_shared_target_outcome_copied() {
        let records = vec![
            record("h1", "http", "g1", FanoutPolicy::All),
            record("h1", "http", "g2", FanoutPolicy::All),
        ];
        let plan = DeliveryPlan::build(&records, &registry());

        let verdict = aggregate(&plan, &records, &[DeliveryStatus::Delivered]);
        assert!(verdict.succeeded);
        assert!(verdict.outcomes.iter().all(|o| o.is_delivered()));
    }
}
