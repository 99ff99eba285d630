//! Co-delivery groups, resolved fresh for every build.
//!
//! Tasks name the other tasks they must ride with; a group is the transitive
//! closure of those references. Membership lives in this index rather than in
//! the tasks themselves.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::model::{Task, TaskId};

/// Tasks that go on the same route or not at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliverGroup {
    members: BTreeSet<TaskId>,
    /// Every member is present in the snapshot the index was built from.
    complete: bool,
}

impl DeliverGroup {
    pub fn members(&self) -> &BTreeSet<TaskId> {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.members.contains(&id)
    }
}

#[derive(Debug, Clone, Default)]
pub struct GroupIndex {
    /// Smallest group first; equal sizes by lowest member id.
    groups: Vec<DeliverGroup>,
    by_task: HashMap<TaskId, usize>,
}

impl GroupIndex {
    pub fn build(tasks: &[&Task]) -> Self {
        let mut parent: BTreeMap<TaskId, TaskId> = BTreeMap::new();

        for task in tasks {
            for &other in task.co_delivery() {
                union(&mut parent, task.id, other);
            }
        }

        let mut closures: BTreeMap<TaskId, BTreeSet<TaskId>> = BTreeMap::new();
        let ids: Vec<TaskId> = parent.keys().copied().collect();
        for id in ids {
            let root = find(&mut parent, id);
            closures.entry(root).or_default().insert(id);
        }

        let present: BTreeSet<TaskId> = tasks.iter().map(|task| task.id).collect();
        let mut groups: Vec<DeliverGroup> = closures
            .into_values()
            .map(|members| {
                let complete = members.is_subset(&present);
                DeliverGroup { members, complete }
            })
            .collect();
        groups.sort_by_key(|group| (group.len(), group.members.first().copied()));

        let by_task = groups
            .iter()
            .enumerate()
            .flat_map(|(index, group)| group.members.iter().map(move |&id| (id, index)))
            .collect();

        Self { groups, by_task }
    }

    pub fn groups(&self) -> &[DeliverGroup] {
        &self.groups
    }

    pub fn group_of(&self, id: TaskId) -> Option<&DeliverGroup> {
        self.by_task.get(&id).map(|&index| &self.groups[index])
    }

    pub fn is_grouped(&self, id: TaskId) -> bool {
        self.by_task.contains_key(&id)
    }
}

fn find(parent: &mut BTreeMap<TaskId, TaskId>, id: TaskId) -> TaskId {
    let mut root = *parent.entry(id).or_insert(id);
    while root != parent[&root] {
        root = parent[&root];
    }
    // Path compression.
    let mut current = id;
    while current != root {
        let next = parent[&current];
        parent.insert(current, root);
        current = next;
    }
    root
}

fn union(parent: &mut BTreeMap<TaskId, TaskId>, a: TaskId, b: TaskId) {
    let root_a = find(parent, a);
    let root_b = find(parent, b);
    if root_a != root_b {
        let (low, high) = if root_a < root_b {
            (root_a, root_b)
        } else {
            (root_b, root_a)
        };
        parent.insert(high, low);
    }
}
