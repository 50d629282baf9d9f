// Copyright (C) 2025 Ryan Daum <ryan.daum@gmail.com> This program is free
// software: you can redistribute it and/or modify it under the terms of the GNU
// General Public License as published by the Free Software Foundation, version
// 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! Variable inspection tree.
//!
//! The display tree is thrown away and rebuilt from the debugger's variables
//! on every stop. Which variables the user expanded lives in a separate set
//! keyed by variable identity, so it survives the rebuild.

use std::collections::HashSet;

use slotmap::SlotMap;

use crate::api::Variable;
use crate::VarNodeId;

/// Identity of a variable across stops. Go gives a struct and its first
/// field the same address, so the name is part of the key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VarKey {
    pub addr: u64,
    pub name: String,
}

impl VarKey {
    fn of(var: &Variable) -> Self {
        Self {
            addr: var.addr,
            name: var.name.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DisplayNode {
    /// `None` for section headers
    pub key: Option<VarKey>,
    title: String,
    pub label: String,
    pub depth: usize,
    pub expanded: bool,
    pub children: Vec<VarNodeId>,
}

impl DisplayNode {
    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }
}

fn variable_title(var: &Variable) -> String {
    let mut title = format!("{} <{}>", var.name, var.real_type);
    if !var.value.is_empty() {
        title.push(' ');
        title.push_str(&var.value);
    }
    title
}

fn variable_label(title: &str, has_children: bool, expanded: bool) -> String {
    match (has_children, expanded) {
        (false, _) => title.to_string(),
        (true, true) => format!("{title} -"),
        (true, false) => format!("{title} +"),
    }
}

#[derive(Debug, Default)]
pub struct VariableTree {
    nodes: SlotMap<VarNodeId, DisplayNode>,
    roots: Vec<VarNodeId>,
    expanded: HashSet<VarKey>,
}

impl VariableTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the displayed tree with `sections`, each a header and its
    /// variables. Expansion state carries over by variable identity.
    pub fn rebuild(&mut self, sections: &[(&str, &[Variable])]) {
        self.nodes.clear();
        self.roots.clear();
        for (header, vars) in sections {
            let children = vars.iter().map(|var| self.insert(var, 1)).collect();
            let root = self.nodes.insert(DisplayNode {
                key: None,
                title: header.to_string(),
                label: header.to_string(),
                depth: 0,
                expanded: true,
                children,
            });
            self.roots.push(root);
        }
    }

    fn insert(&mut self, var: &Variable, depth: usize) -> VarNodeId {
        let children: Vec<VarNodeId> = var
            .children
            .iter()
            .map(|child| self.insert(child, depth + 1))
            .collect();
        let key = VarKey::of(var);
        let expanded = self.expanded.contains(&key);
        let title = variable_title(var);
        let label = variable_label(&title, !children.is_empty(), expanded);
        self.nodes.insert(DisplayNode {
            key: Some(key),
            title,
            label,
            depth,
            expanded,
            children,
        })
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.roots.clear();
    }

    pub fn node(&self, id: VarNodeId) -> Option<&DisplayNode> {
        self.nodes.get(id)
    }

    pub fn is_expanded(&self, key: &VarKey) -> bool {
        self.expanded.contains(key)
    }

    /// Flip expansion of one variable. Only that node changes; returns whether
    /// anything did.
    pub fn toggle(&mut self, id: VarNodeId) -> bool {
        let Some(node) = self.nodes.get_mut(id) else {
            return false;
        };
        let Some(key) = &node.key else {
            return false;
        };
        if node.children.is_empty() {
            return false;
        }
        node.expanded = !node.expanded;
        if node.expanded {
            self.expanded.insert(key.clone());
        } else {
            self.expanded.remove(key);
        }
        node.label = variable_label(&node.title, true, node.expanded);
        true
    }

    /// Visible rows in display order.
    pub fn visible(&self) -> Vec<VarNodeId> {
        let mut rows = Vec::new();
        let mut stack: Vec<VarNodeId> = self.roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get(id) else {
                continue;
            };
            rows.push(id);
            if node.expanded {
                stack.extend(node.children.iter().rev().copied());
            }
        }
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(name: &str, addr: u64, children: Vec<Variable>) -> Variable {
        Variable {
            name: name.to_string(),
            addr,
            real_type: "T".to_string(),
            value: if children.is_empty() {
                "1".to_string()
            } else {
                String::new()
            },
            children,
            ..Default::default()
        }
    }

    fn sample() -> Vec<Variable> {
        vec![
            var("cfg", 0x10, vec![var("port", 0x10, vec![]), var("host", 0x18, vec![])]),
            var("list", 0x40, vec![var("[0]", 0x50, vec![])]),
            var("n", 0x80, vec![]),
        ]
    }

    fn labels(tree: &VariableTree) -> Vec<String> {
        tree.visible()
            .into_iter()
            .map(|id| tree.node(id).unwrap().label.clone())
            .collect()
    }

    fn find(tree: &VariableTree, name: &str) -> VarNodeId {
        tree.visible()
            .into_iter()
            .find(|id| {
                tree.node(*id)
                    .and_then(|n| n.key.as_ref())
                    .map(|k| k.name == name)
                    .unwrap_or(false)
            })
            .unwrap()
    }

    #[test]
    fn test_collapsed_by_default() {
        let mut tree = VariableTree::new();
        let locals = sample();
        tree.rebuild(&[("locals", locals.as_slice()), ("args", &[][..])]);
        assert_eq!(
            labels(&tree),
            vec!["locals", "cfg <T> +", "list <T> +", "n <T> 1", "args"]
        );
    }

    #[test]
    fn test_toggle_twice_restores_and_spares_siblings() {
        let mut tree = VariableTree::new();
        let locals = sample();
        tree.rebuild(&[("locals", locals.as_slice())]);
        let before = labels(&tree);

        let cfg = find(&tree, "cfg");
        assert!(tree.toggle(cfg));
        assert_eq!(
            labels(&tree),
            vec!["locals", "cfg <T> -", "port <T> 1", "host <T> 1", "list <T> +", "n <T> 1"]
        );
        let list = find(&tree, "list");
        assert!(!tree.node(list).unwrap().expanded);

        assert!(tree.toggle(cfg));
        assert_eq!(labels(&tree), before);
    }

    #[test]
    fn test_leaf_and_header_do_not_toggle() {
        let mut tree = VariableTree::new();
        let locals = sample();
        tree.rebuild(&[("locals", locals.as_slice())]);
        let n = find(&tree, "n");
        assert!(!tree.toggle(n));
        let header = tree.visible()[0];
        assert!(!tree.toggle(header));
    }

    #[test]
    fn test_expansion_survives_rebuild() {
        let mut tree = VariableTree::new();
        let locals = sample();
        tree.rebuild(&[("locals", locals.as_slice())]);
        let list = find(&tree, "list");
        tree.toggle(list);

        tree.rebuild(&[("locals", locals.as_slice())]);
        assert_eq!(
            labels(&tree),
            vec!["locals", "cfg <T> +", "list <T> -", "[0] <T> 1", "n <T> 1"]
        );
        assert!(tree.is_expanded(&VarKey {
            addr: 0x40,
            name: "list".to_string()
        }));
    }

    #[test]
    fn test_struct_and_first_field_are_distinct() {
        let mut tree = VariableTree::new();
        let nested = vec![var(
            "outer",
            0x10,
            vec![var("inner", 0x10, vec![var("leaf", 0x10, vec![])])],
        )];
        tree.rebuild(&[("locals", nested.as_slice())]);
        let outer = find(&tree, "outer");
        tree.toggle(outer);
        let inner = find(&tree, "inner");
        assert!(!tree.node(inner).unwrap().expanded);
    }
}
