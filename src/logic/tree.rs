//! Flattening externally supplied trees into parent-linked rows, and rebuilding them.
//!
//! Both directions use explicit work lists so that neither the write path nor the read path
//! recurses on input depth.

use std::collections::HashMap;

use crate::model::{GeneratedNode, MindMapNode, MindMapTreeNode, RowId};

/// One row to insert, in an order where every parent precedes its children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedNode {
    /// Index of the parent within the plan, `None` for roots
    pub parent: Option<usize>,
    pub node_id: i64,
    pub title: String,
    pub level: i32,
    pub order_index: i32,
}

/// Walk `roots` depth-first in array order and produce the insertion plan.
///
/// Stores insert the plan front to back, mapping each plan index to the row id it received so
/// that children can reference the generated parent id.
pub fn plan_nodes(roots: &[GeneratedNode]) -> Vec<PlannedNode> {
    let mut plan = Vec::new();
    // (node, parent plan index, level, order index)
    let mut stack: Vec<(&GeneratedNode, Option<usize>, i32, i32)> = roots
        .iter()
        .enumerate()
        .rev()
        .map(|(index, node)| (node, None, 0, index as i32))
        .collect();

    while let Some((node, parent, level, order_index)) = stack.pop() {
        let position = plan.len();
        plan.push(PlannedNode {
            parent,
            node_id: node.id,
            title: node.title.clone(),
            level,
            order_index,
        });

        // Reverse push keeps the first child on top of the stack
        for (index, child) in node.children.iter().enumerate().rev() {
            stack.push((child, Some(position), level + 1, index as i32));
        }
    }

    plan
}

/// Rebuild the nested tree from flat rows.
///
/// Rows are grouped under their parent id and each sibling group is ordered by
/// `order_index`. Nodes are assembled deepest level first so every child is complete before its
/// parent takes ownership of it. Rows whose parent is not part of the set are dropped.
pub fn build_tree(rows: Vec<MindMapNode>) -> Vec<MindMapTreeNode> {
    let known: HashMap<RowId, usize> = rows
        .iter()
        .enumerate()
        .map(|(index, row)| (row.id, index))
        .collect();

    let mut children_of: HashMap<Option<RowId>, Vec<usize>> = HashMap::new();
    for (index, row) in rows.iter().enumerate() {
        match row.parent_id {
            Some(parent_id) if !known.contains_key(&parent_id) => {
                log::warn!(
                    "Dropping node {} of mind map {}: parent {} is missing",
                    row.id,
                    row.mindmap_id,
                    parent_id
                );
            }
            parent_id => children_of.entry(parent_id).or_default().push(index),
        }
    }
    for siblings in children_of.values_mut() {
        siblings.sort_by_key(|&index| (rows[index].order_index, rows[index].id));
    }

    let mut by_depth: Vec<usize> = (0..rows.len()).collect();
    by_depth.sort_by_key(|&index| std::cmp::Reverse(rows[index].level));

    let mut built: Vec<Option<MindMapTreeNode>> = vec![None; rows.len()];
    for index in by_depth {
        let row = &rows[index];
        let children = children_of
            .get(&Some(row.id))
            .map(|siblings| {
                siblings
                    .iter()
                    .filter_map(|&child| built[child].take())
                    .collect()
            })
            .unwrap_or_default();

        built[index] = Some(MindMapTreeNode {
            id: row.id,
            node_id: row.node_id,
            title: row.title.clone(),
            parent_id: row.parent_id,
            level: row.level,
            order_index: row.order_index,
            children,
        });
    }

    children_of
        .get(&None)
        .map(|roots| roots.iter().filter_map(|&root| built[root].take()).collect())
        .unwrap_or_default()
}

/// Total number of nodes in an external tree.
pub fn count_nodes(roots: &[GeneratedNode]) -> usize {
    let mut stack: Vec<&GeneratedNode> = roots.iter().collect();
    let mut count = 0;
    while let Some(node) = stack.pop() {
        count += 1;
        stack.extend(node.children.iter());
    }
    count
}
