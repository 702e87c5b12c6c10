//! Group topology: tree building and layer checks
//!
//! Groups without a parent assignment are roots at layer 0. Even layers are
//! collector groups, odd layers are real groups that must resolve to a schema
//! object and sit below an allowed parent. Both phases use explicit stacks and
//! a visited set, so malformed (cyclic or shared) group assignments cannot
//! cause unbounded recursion.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use som_ifc::{EntityId, IfcModel, ModelObject, ObjectClass};
use tracing::{debug, trace, warn};

use crate::element::Checker;
use crate::identifier::{IdentificationConfig, resolve_identifier};
use crate::issue::{CheckReport, EntityRecord, EntityRole, Issue, IssueKind};

/// One group in a built tree
#[derive(Debug, Clone, PartialEq)]
pub struct GroupNode {
    pub group: EntityId,
    /// Indices of child nodes in the owning tree
    pub children: Vec<usize>,
    /// Member elements
    pub members: Vec<EntityId>,
    /// Member groups already placed elsewhere in the forest
    pub shared: Vec<SharedGroup>,
    /// Identifier rendered as text, if the group has one
    pub identifier: Option<String>,
    pub layer: usize,
}

impl GroupNode {
    #[must_use]
    pub fn is_collector(&self) -> bool {
        self.layer % 2 == 0
    }

    /// Subgroups placed below this node plus shared ones
    #[must_use]
    pub fn subgroup_count(&self) -> usize {
        self.children.len() + self.shared.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subgroup_count() == 0 && self.members.is_empty()
    }
}

/// A member group that was reached before, kept for the parent's checks
#[derive(Debug, Clone, PartialEq)]
pub struct SharedGroup {
    pub group: EntityId,
    pub identifier: Option<String>,
}

/// Groups reachable from one root group, stored as an arena
#[derive(Debug, Clone, PartialEq)]
pub struct GroupTree {
    nodes: Vec<GroupNode>,
}

impl GroupTree {
    #[must_use]
    pub fn root(&self) -> &GroupNode {
        &self.nodes[0]
    }

    #[must_use]
    pub fn node(&self, index: usize) -> &GroupNode {
        &self.nodes[index]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Every subgroup of `node` with its identifier, shared ones included
    pub fn subgroups<'t>(
        &'t self,
        node: &'t GroupNode,
    ) -> impl Iterator<Item = (EntityId, Option<&'t str>)> + 't {
        node.children
            .iter()
            .map(|&child| {
                let child = &self.nodes[child];
                (child.group, child.identifier.as_deref())
            })
            .chain(
                node.shared
                    .iter()
                    .map(|shared| (shared.group, shared.identifier.as_deref())),
            )
    }

    /// Nodes in depth-first pre-order
    pub fn pre_order(&self) -> impl Iterator<Item = &GroupNode> + '_ {
        let mut stack = vec![0usize];
        std::iter::from_fn(move || {
            let index = stack.pop()?;
            let node = &self.nodes[index];
            stack.extend(node.children.iter().rev());
            Some(node)
        })
    }
}

/// A group reached a second time while building trees
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Revisit {
    pub group: EntityId,
    /// Group whose membership led back to `group`
    pub via: EntityId,
    /// `group` is an ancestor of `via`, i.e. the assignments form a cycle
    pub is_cycle: bool,
}

/// All group trees of a model plus the structural anomalies found on the way
#[derive(Debug, Clone, Default)]
pub struct GroupForest {
    pub trees: Vec<GroupTree>,
    /// child group -> parent group, for every group placed in a tree
    pub parents: HashMap<EntityId, EntityId>,
    pub revisits: Vec<Revisit>,
    /// Groups not reachable from any root group
    pub unreachable: Vec<EntityId>,
}

impl GroupForest {
    #[must_use]
    pub fn parent_of(&self, group: EntityId) -> Option<EntityId> {
        self.parents.get(&group).copied()
    }

    #[must_use]
    pub fn group_count(&self) -> usize {
        self.trees.iter().map(GroupTree::len).sum()
    }
}

/// Builds group trees from the model's assignment relationships
#[derive(Debug, Clone, Copy)]
pub struct GroupTopologyBuilder<'a> {
    model: &'a IfcModel,
    identification: &'a IdentificationConfig,
}

impl<'a> GroupTopologyBuilder<'a> {
    #[must_use]
    pub fn new(model: &'a IfcModel, identification: &'a IdentificationConfig) -> Self {
        Self {
            model,
            identification,
        }
    }

    /// Build one tree per root group.
    #[must_use]
    pub fn build_forest(&self) -> GroupForest {
        let mut forest = GroupForest::default();
        let mut visited = HashSet::new();

        for root in self.model.root_groups() {
            let tree = self.build(root, &mut visited, &mut forest);
            forest.trees.push(tree);
        }

        forest.unreachable = self
            .model
            .groups()
            .map(|g| g.id)
            .filter(|id| !visited.contains(id))
            .collect();

        debug!(
            trees = forest.trees.len(),
            groups = forest.group_count(),
            revisits = forest.revisits.len(),
            unreachable = forest.unreachable.len(),
            "Built group forest"
        );
        forest
    }

    /// Build the tree below `root`, registering parents and revisits in
    /// `forest` and every placed group in `visited`.
    pub fn build(
        &self,
        root: EntityId,
        visited: &mut HashSet<EntityId>,
        forest: &mut GroupForest,
    ) -> GroupTree {
        visited.insert(root);
        let mut nodes = vec![self.node(root, 0)];
        let mut stack = vec![0usize];

        while let Some(index) = stack.pop() {
            let group = nodes[index].group;
            let layer = nodes[index].layer;

            for &member in self.model.group_members(group) {
                match self.model.object(member).map(|o| o.class) {
                    Some(ObjectClass::Element) => nodes[index].members.push(member),
                    Some(ObjectClass::Group) => {
                        if !visited.insert(member) {
                            let is_cycle = is_ancestor(&forest.parents, member, group);
                            warn!(group = %member, via = %group, is_cycle, "Group reached twice");
                            forest.revisits.push(Revisit {
                                group: member,
                                via: group,
                                is_cycle,
                            });
                            let identifier = self.identifier(member);
                            nodes[index].shared.push(SharedGroup {
                                group: member,
                                identifier,
                            });
                            continue;
                        }
                        forest.parents.insert(member, group);
                        let child = nodes.len();
                        nodes.push(self.node(member, layer + 1));
                        nodes[index].children.push(child);
                        stack.push(child);
                    }
                    _ => trace!(group = %group, member = %member, "Ignoring non element member"),
                }
            }
        }

        GroupTree { nodes }
    }

    fn node(&self, group: EntityId, layer: usize) -> GroupNode {
        GroupNode {
            group,
            children: Vec::new(),
            members: Vec::new(),
            shared: Vec::new(),
            identifier: self.identifier(group),
            layer,
        }
    }

    fn identifier(&self, group: EntityId) -> Option<String> {
        resolve_identifier(self.model, group, self.identification).map(ToString::to_string)
    }
}

fn is_ancestor(parents: &HashMap<EntityId, EntityId>, candidate: EntityId, of: EntityId) -> bool {
    let mut current = Some(of);
    while let Some(group) = current {
        if group == candidate {
            return true;
        }
        current = parents.get(&group).copied();
    }
    false
}

impl Checker<'_> {
    /// Walk one tree layer by layer and emit topology issues.
    pub fn check_group_tree(
        &self,
        model: &IfcModel,
        forest: &GroupForest,
        tree: &GroupTree,
        report: &mut CheckReport,
    ) {
        for node in tree.pre_order() {
            let Some(object) = model.object(node.group) else {
                continue;
            };
            trace!(guid = %object.guid, layer = node.layer, "Checking group");

            if node.is_collector() {
                self.check_collector(model, tree, node, report);
            } else {
                self.check_real(model, forest, tree, node, report);
            }

            if node.is_empty() {
                report.add_issue(Issue::new(
                    IssueKind::EmptyGroup,
                    &object.guid,
                    EntityRole::Group,
                    "Group has no subgroups and no elements",
                ));
            }
        }
    }

    /// Collector groups expect their subgroups to share the collector's identifier.
    fn check_collector(
        &self,
        model: &IfcModel,
        tree: &GroupTree,
        node: &GroupNode,
        report: &mut CheckReport,
    ) {
        let Some(object) = model.object(node.group) else {
            return;
        };
        report.record_entity(group_record(object, node.identifier.clone()));

        // distinct subgroup identifiers and the subgroups carrying them
        let mut by_identifier: BTreeMap<Option<&str>, Vec<&str>> = BTreeMap::new();
        for (group, identifier) in tree.subgroups(node) {
            let guid = model.object(group).map_or("", |o| o.guid.as_str());
            by_identifier.entry(identifier).or_default().push(guid);
        }

        for (identifier, guids) in by_identifier {
            if identifier == node.identifier.as_deref() {
                continue;
            }
            let shown = identifier.unwrap_or_default();
            report.add_issue(
                Issue::new(
                    IssueKind::DuplicateSubgroupIdentifier,
                    &object.guid,
                    EntityRole::Group,
                    format!(
                        "Subgroup identifier '{shown}' differs from collector identifier '{}' (subgroups: {})",
                        node.identifier.as_deref().unwrap_or_default(),
                        guids.join(", ")
                    ),
                )
                .with_value(shown),
            );
        }
    }

    /// Real groups are checked like elements and against the allowed topology.
    fn check_real(
        &self,
        model: &IfcModel,
        forest: &GroupForest,
        tree: &GroupTree,
        node: &GroupNode,
        report: &mut CheckReport,
    ) {
        let Some(object) = model.object(node.group) else {
            return;
        };
        self.check_element(model, object, EntityRole::Group, report);

        let distinct: BTreeSet<Option<&str>> = tree
            .subgroups(node)
            .map(|(_, identifier)| identifier)
            .collect();
        if distinct.len() != node.subgroup_count() {
            report.add_issue(Issue::new(
                IssueKind::RepetitiveGroup,
                &object.guid,
                EntityRole::Group,
                format!(
                    "{} subgroups share {} distinct identifiers",
                    node.subgroup_count(),
                    distinct.len()
                ),
            ));
        }

        let Some(schema_object) = node.identifier.as_deref().and_then(|i| self.index.get(i)) else {
            return;
        };
        // the enclosing real group sits two layers up, above a collector
        let Some(enclosing) = forest
            .parent_of(node.group)
            .and_then(|parent| forest.parent_of(parent))
        else {
            return;
        };
        let Some(enclosing_object) = resolve_identifier(model, enclosing, self.identification)
            .and_then(|value| self.index.resolve(value))
        else {
            return;
        };

        let allowed = self.schema.allowed_parents(schema_object);
        if allowed
            .iter()
            .any(|parent| parent.ident_value == enclosing_object.ident_value)
        {
            return;
        }

        let enclosing_guid = model.object(enclosing).map_or("", |o| o.guid.as_str());
        let allowed: Vec<&str> = allowed.iter().map(|o| o.ident_value.as_str()).collect();
        report.add_issue(
            Issue::new(
                IssueKind::IllegalParentGroup,
                &object.guid,
                EntityRole::Group,
                format!(
                    "Parent group {enclosing_guid} ({}) is not an allowed parent of '{}'; allowed: [{}]",
                    enclosing_object.ident_value,
                    schema_object.ident_value,
                    allowed.join(", ")
                ),
            )
            .with_value(&enclosing_object.ident_value),
        );
    }

    /// Report revisited and unreachable groups.
    pub fn check_group_cycles(
        &self,
        model: &IfcModel,
        forest: &GroupForest,
        report: &mut CheckReport,
    ) {
        for revisit in &forest.revisits {
            let Some(object) = model.object(revisit.group) else {
                continue;
            };
            let via = model.object(revisit.via).map_or("", |o| o.guid.as_str());
            let detail = if revisit.is_cycle {
                format!("Group assignments form a cycle through {via}")
            } else {
                format!("Group is also assigned to {via}")
            };
            report.add_issue(Issue::new(
                IssueKind::CyclicGroupStructure,
                &object.guid,
                EntityRole::Group,
                detail,
            ));
        }

        for &group in &forest.unreachable {
            let Some(object) = model.object(group) else {
                continue;
            };
            let identifier =
                resolve_identifier(model, group, self.identification).map(ToString::to_string);
            report.record_entity(group_record(object, identifier));
            report.add_issue(Issue::new(
                IssueKind::CyclicGroupStructure,
                &object.guid,
                EntityRole::Group,
                "Group is part of a cycle that no root group leads to",
            ));
        }
    }
}

fn group_record(object: &ModelObject, identifier: Option<String>) -> EntityRecord {
    EntityRecord {
        guid: object.guid.clone(),
        name: object.name.clone(),
        ifc_type: object.ifc_type.clone(),
        identifier: identifier.unwrap_or_default(),
    }
}
