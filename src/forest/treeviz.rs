//! Treeviz rendering of a parse forest
//!
//! One line per node, structure as indentation. Branches show their rule
//! name and span; ambiguous nodes list every alternative as an `option`
//! block; leaves show their text (truncated), skip leaves and the empty
//! leaf get their own markers. The rendering is deterministic, which makes
//! it double as the structural-equality witness in tests.
//!
//! ```text
//! └─ § S [0..3]
//!    ├─ ◦ a 'a'
//!    └─ · WS ' '
//! ```

use crate::forest::{ForestNodeKind, NodeId, ParseForest};
use crate::runtime::EMPTY_RULE;

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() > max_chars {
        let mut truncated = s.chars().take(max_chars).collect::<String>();
        truncated.push_str("...");
        truncated
    } else {
        s.to_string()
    }
}

pub fn to_treeviz_str(forest: &ParseForest) -> String {
    let mut result = String::new();
    append_node(forest, &mut result, forest.root, "", true, &mut Vec::new());
    result
}

fn append_node(
    forest: &ParseForest,
    result: &mut String,
    id: NodeId,
    prefix: &str,
    is_last: bool,
    on_path: &mut Vec<NodeId>,
) {
    let connector = if is_last { "└─" } else { "├─" };
    let node = forest.store.node(id);
    let child_prefix = format!("{}{}", prefix, if is_last { "   " } else { "│  " });

    match &node.kind {
        ForestNodeKind::Leaf { is_skip } => {
            let icon = if node.rule == EMPTY_RULE {
                "ε"
            } else if *is_skip {
                "·"
            } else {
                "◦"
            };
            let text = truncate(&forest.text_of(id).escape_debug().to_string(), 30);
            result.push_str(&format!(
                "{}{} {} {} '{}'\n",
                prefix,
                connector,
                icon,
                forest.rule_name(node.rule),
                text
            ));
        }
        ForestNodeKind::Embedded { forest: inner } => {
            result.push_str(&format!(
                "{}{} ⧉ {} [{}..{}]\n",
                prefix,
                connector,
                forest.rule_name(node.rule),
                node.start,
                node.next_input_position
            ));
            append_node(inner, result, inner.root, &child_prefix, true, &mut Vec::new());
        }
        ForestNodeKind::Branch { alternatives, .. } => {
            result.push_str(&format!(
                "{}{} § {} [{}..{}]{}\n",
                prefix,
                connector,
                forest.rule_name(node.rule),
                node.start,
                node.next_input_position,
                if alternatives.len() > 1 {
                    format!(" ({} alternatives)", alternatives.len())
                } else {
                    String::new()
                }
            ));
            if on_path.contains(&id) {
                result.push_str(&format!("{}└─ ∞\n", child_prefix));
                return;
            }
            on_path.push(id);
            if alternatives.len() == 1 {
                let children = &alternatives[0].children;
                for (i, &child) in children.iter().enumerate() {
                    let last = i == children.len() - 1;
                    append_node(forest, result, child, &child_prefix, last, on_path);
                }
            } else {
                for (option, alternative) in alternatives.iter().enumerate() {
                    let last_option = option == alternatives.len() - 1;
                    let option_connector = if last_option { "└─" } else { "├─" };
                    result.push_str(&format!(
                        "{}{} option {}\n",
                        child_prefix, option_connector, option
                    ));
                    let option_prefix =
                        format!("{}{}", child_prefix, if last_option { "   " } else { "│  " });
                    for (i, &child) in alternative.children.iter().enumerate() {
                        let last = i == alternative.children.len() - 1;
                        append_node(forest, result, child, &option_prefix, last, on_path);
                    }
                }
            }
            on_path.pop();
        }
    }
}
