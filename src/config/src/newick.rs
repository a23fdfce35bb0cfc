//! A thin Newick parser producing `kernel::InputNode` trees. Supports
//! labels, branch lengths (`:0.5`), and arbitrary binary/polytomic nesting;
//! does not attempt NHX comments or quoted labels.

use std::iter::Peekable;
use std::str::Chars;

use anyhow::bail;
use kernel::InputNode;
use located_error::prelude::*;

use crate::error::ConfigError;

pub fn parse_newick(s: &str) -> Result<InputNode> {
    let trimmed = s.trim();
    if !trimmed.ends_with(';') {
        bail!(ConfigError::NewickUnterminated);
    }
    let body = &trimmed[..trimmed.len() - 1];
    let mut chars = body.chars().peekable();
    let node = parse_node(&mut chars, body).with_loc(|| "While parsing newick tree".to_string())?;
    Ok(node)
}

fn parse_node(chars: &mut Peekable<Chars>, full: &str) -> Result<InputNode> {
    let children = if chars.peek() == Some(&'(') {
        chars.next();
        let mut children = vec![parse_node(chars, full)?];
        loop {
            match chars.peek() {
                Some(',') => {
                    chars.next();
                    children.push(parse_node(chars, full)?);
                }
                Some(')') => {
                    chars.next();
                    break;
                }
                _ => bail!(ConfigError::NewickUnbalanced(full.len())),
            }
        }
        Some(children)
    } else {
        None
    };

    let label = parse_token(chars, |c| c != ':' && c != ',' && c != ')' && c != '(');
    let brlen = if chars.peek() == Some(&':') {
        chars.next();
        let num = parse_token(chars, |c| c != ',' && c != ')' && c != '(');
        num.parse::<f64>().with_loc(|| format!("While parsing branch length '{num}'"))?
    } else {
        0.0
    };

    Ok(match children {
        Some(children) => InputNode::internal(brlen, children),
        None => InputNode::leaf(label, brlen),
    })
}

fn parse_token(chars: &mut Peekable<Chars>, keep: impl Fn(char) -> bool) -> String {
    let mut out = String::new();
    while let Some(&c) = chars.peek() {
        if keep(c) {
            out.push(c);
            chars.next();
        } else {
            break;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_three_leaf_topology() {
        let tree = parse_newick("((a:1,b:1):1,c:2);").unwrap();
        let root = tree.into_node();
        assert_eq!(root.node_count(), 5);
        assert_eq!(root.leaf_count(), 3);
    }

    #[test]
    fn parses_bare_labels_without_brlen() {
        let tree = parse_newick("(a,b);").unwrap();
        let root = tree.into_node();
        assert_eq!(root.leaf_count(), 2);
    }

    #[test]
    fn rejects_missing_semicolon() {
        assert!(parse_newick("(a,b)").is_err());
    }
}
