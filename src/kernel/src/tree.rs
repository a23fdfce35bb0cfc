//! Tree structure, preorder walking, and the two simulation entry points:
//! annotating a caller-supplied tree, and jointly simulating tree + range
//! under a birth-death process.

use rand::distributions::Distribution;
use rand::Rng;
use rand_distr::Exp;

use crate::dist::Dist;
use crate::error::Result;
use crate::period::{simulate_transitions, PeriodList};
use crate::split::{split, Split, SplitMode};
use crate::spread::{SampleMode, Transition};

/// A node in the simulated tree. Owns its children uniquely (no shared
/// ownership, no reference counting); leaves carry a string `label` and no
/// `split`, internal nodes the reverse.
#[derive(Debug, Clone)]
pub struct Node {
    pub label: Option<String>,
    pub brlen: f64,
    pub abs_time: f64,
    pub node_id: usize,
    pub final_state: Dist,
    pub split: Option<Split>,
    pub transitions: Vec<Transition>,
    pub children: Vec<Node>,
    /// Whether this lineage survived to the present (only meaningful for
    /// tree-simulation output; always `true` for annotation of a given
    /// tree). Used to distinguish the reconstructed tree from the full one.
    pub extant: bool,
}

impl Node {
    fn leaf(label: impl Into<String>, brlen: f64) -> Self {
        Node {
            label: Some(label.into()),
            brlen,
            abs_time: 0.0,
            node_id: 0,
            final_state: Dist::empty(1),
            split: None,
            transitions: Vec::new(),
            children: Vec::new(),
            extant: true,
        }
    }

    fn internal(brlen: f64, children: Vec<Node>) -> Self {
        Node {
            label: None,
            brlen,
            abs_time: 0.0,
            node_id: 0,
            final_state: Dist::empty(1),
            split: None,
            transitions: Vec::new(),
            children,
            extant: true,
        }
    }

    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    #[must_use]
    pub fn leaf_count(&self) -> usize {
        if self.is_leaf() {
            1
        } else {
            self.children.iter().map(Node::leaf_count).sum()
        }
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(Node::node_count).sum::<usize>()
    }

    #[must_use]
    pub fn brlen_sum(&self) -> f64 {
        self.brlen + self.children.iter().map(Node::brlen_sum).sum::<f64>()
    }

    /// Extinction-pruned leaf count: only lineages with at least one
    /// surviving descendant (or themselves extant) are counted.
    #[must_use]
    pub fn reconstructed_leaf_count(&self) -> usize {
        if self.is_leaf() {
            return usize::from(self.extant);
        }
        self.children.iter().map(Node::reconstructed_leaf_count).sum()
    }

    /// Extinction-pruned branch-length sum.
    #[must_use]
    pub fn reconstructed_brlen_sum(&self) -> f64 {
        if self.is_leaf() {
            return if self.extant { self.brlen } else { 0.0 };
        }
        let children_sum: f64 = self.children.iter().map(Node::reconstructed_brlen_sum).sum();
        let any_surviving = self.children.iter().any(|c| c.reconstructed_leaf_count() > 0);
        if any_surviving {
            self.brlen + children_sum
        } else {
            0.0
        }
    }

    fn assign_id(&mut self, next: usize) -> usize {
        if self.is_leaf() {
            return next;
        }
        self.node_id = next;
        let mut next = next + 1;
        for c in &mut self.children {
            next = c.assign_id(next);
        }
        next
    }

    fn assign_abs_time(&mut self, parent_time: f64) {
        self.abs_time = parent_time + self.brlen;
        for c in &mut self.children {
            c.assign_abs_time(self.abs_time);
        }
    }

    /// Stable string identifier: the label for leaves, the decimal
    /// `node_id` for internal nodes.
    #[must_use]
    pub fn string_id(&self) -> String {
        match &self.label {
            Some(l) if self.is_leaf() => l.clone(),
            _ => self.node_id.to_string(),
        }
    }

    /// Preorder iteration over this node and all descendants.
    pub fn preorder(&self) -> Preorder<'_> {
        Preorder { stack: vec![self] }
    }
}

/// Stack-based preorder iterator yielding borrowed node references.
pub struct Preorder<'a> {
    stack: Vec<&'a Node>,
}

impl<'a> Iterator for Preorder<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<&'a Node> {
        let node = self.stack.pop()?;
        for c in node.children.iter().rev() {
            self.stack.push(c);
        }
        Some(node)
    }
}

/// Owns the root of a simulated/annotated tree.
#[derive(Debug, Clone)]
pub struct Tree {
    pub root: Node,
}

impl Tree {
    #[must_use]
    pub fn leaf_count(&self) -> usize {
        self.root.leaf_count()
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.root.node_count()
    }

    pub fn preorder(&self) -> Preorder<'_> {
        self.root.preorder()
    }

    /// Renders the tree as Newick, with branch lengths, using `label_cb`
    /// to turn a node into its trailing label text (e.g. `"{id}:{brlen}"`).
    /// Rendering is an external collaborator concern; this is the minimal
    /// default implementation.
    pub fn to_newick(&self, label_cb: &mut impl FnMut(&Node) -> String) -> String {
        fn go(node: &Node, label_cb: &mut impl FnMut(&Node) -> String, out: &mut String) {
            if !node.children.is_empty() {
                out.push('(');
                for (i, c) in node.children.iter().enumerate() {
                    go(c, label_cb, out);
                    if i != node.children.len() - 1 {
                        out.push(',');
                    }
                }
                out.push(')');
            }
            out.push_str(&label_cb(node));
        }
        let mut out = String::new();
        go(&self.root, label_cb, &mut out);
        out.push(';');
        out
    }
}

/// Minimal input shape for "annotate a given tree": topology and branch
/// lengths only, as provided by an external Newick loader.
#[derive(Debug, Clone)]
pub struct InputNode {
    pub label: Option<String>,
    pub brlen: f64,
    pub children: Vec<InputNode>,
}

impl InputNode {
    #[must_use]
    pub fn leaf(label: impl Into<String>, brlen: f64) -> Self {
        InputNode { label: Some(label.into()), brlen, children: Vec::new() }
    }

    #[must_use]
    pub fn internal(brlen: f64, children: Vec<InputNode>) -> Self {
        InputNode { label: None, brlen, children }
    }

    /// Converts this caller-supplied topology into the kernel's internal
    /// node representation, discarding any simulation state (there is none
    /// yet to discard). Exposed so collaborators building `InputNode` trees
    /// (e.g. a Newick loader) can sanity-check topology shape before handing
    /// it to [`simulate_transitions_over_tree`].
    #[must_use]
    pub fn into_node(self) -> Node {
        if self.children.is_empty() {
            Node::leaf(self.label.unwrap_or_default(), self.brlen)
        } else {
            Node::internal(self.brlen, self.children.into_iter().map(InputNode::into_node).collect())
        }
    }
}

/// Annotates a caller-supplied topology: propagates `root_dist` down from
/// the root, applying a cladogenesis split at every internal node and
/// `simulate_transitions` along every branch.
pub fn simulate_transitions_over_tree(
    input: InputNode,
    root_dist: Dist,
    periods: &PeriodList,
    rng: &mut impl Rng,
    mode: SampleMode,
    split_mode: SplitMode,
) -> Result<Tree> {
    let mut root = input.into_node();
    root.brlen = 0.0;
    root.final_state = root_dist;
    root.assign_abs_time(0.0);
    root.assign_id(0);

    annotate(&mut root, root_dist, periods, rng, mode, split_mode)?;

    Ok(Tree { root })
}

fn annotate(
    node: &mut Node,
    dist: Dist,
    periods: &PeriodList,
    rng: &mut impl Rng,
    mode: SampleMode,
    split_mode: SplitMode,
) -> Result<()> {
    node.final_state = dist;

    if node.children.is_empty() {
        return Ok(());
    }

    let t0 = node.abs_time;
    let model_period = periods.get(t0).expect("abs_time must fall within the period list");
    let s = split(dist, &model_period.model, rng, split_mode)?;
    node.split = Some(s);

    let daughter_dists = [s.left, s.right];
    for (child, &daughter_dist) in node.children.iter_mut().zip(daughter_dists.iter()) {
        let t1 = child.abs_time;
        let sub_periods = periods.sub_range(t0, t1);
        let transitions = simulate_transitions(daughter_dist, &sub_periods, rng, mode)?;
        let final_state = transitions.last().map_or(daughter_dist, |t| t.final_state);
        child.transitions = transitions;
        annotate(child, final_state, periods, rng, mode, split_mode)?;
    }
    Ok(())
}

/// Joint birth-death-range simulation: starting from `init_dist` at time 0,
/// runs until absolute duration `duration`, speciating and going extinct
/// according to the model's rates.
pub fn simulate_tree(
    init_dist: Dist,
    duration: f64,
    periods: &PeriodList,
    rng: &mut impl Rng,
    split_mode: SplitMode,
) -> Result<Node> {
    simulate_branch(init_dist, 0.0, duration, periods, rng, split_mode)
}

fn simulate_branch(
    mut dist: Dist,
    mut t: f64,
    duration: f64,
    periods: &PeriodList,
    rng: &mut impl Rng,
    split_mode: SplitMode,
) -> Result<Node> {
    let mut transitions = Vec::new();
    let branch_start = t;

    loop {
        let period = periods.get(t).expect("simulation time must fall within the period list");
        let lambda = period.model.total_speciation_weight(dist);
        let range_rate = period.model.total_rate_weight(dist);

        let tau_speciation = if lambda > 0.0 { Exp::new(lambda).unwrap().sample(rng) } else { f64::INFINITY };
        let tau_range = if range_rate > 0.0 { Exp::new(range_rate).unwrap().sample(rng) } else { f64::INFINITY };

        let tau = tau_speciation.min(tau_range);

        if t + tau > duration {
            let brlen = duration - branch_start;
            return Ok(leaf_node(dist, brlen, transitions, true));
        }

        if tau_range < tau_speciation {
            let transition = crate::spread::spread_analytic(dist, &period.model, rng)?;
            transitions.push(Transition { waiting_time: tau, ..transition });
            dist = transition.final_state;
            t += tau;

            if dist.is_empty() {
                let brlen = t - branch_start;
                return Ok(leaf_node(dist, brlen, transitions, false));
            }
            continue;
        }

        // Speciation.
        let brlen = t + tau - branch_start;
        let s = split(dist, &period.model, rng, split_mode)?;
        let left = simulate_branch(s.left, t + tau, duration, periods, rng, split_mode)?;
        let right = simulate_branch(s.right, t + tau, duration, periods, rng, split_mode)?;
        let mut node = Node::internal(brlen, vec![left, right]);
        node.split = Some(s);
        node.final_state = dist;
        node.transitions = transitions;
        return Ok(node);
    }
}

fn leaf_node(final_state: Dist, brlen: f64, transitions: Vec<Transition>, extant: bool) -> Node {
    let mut node = Node::leaf("", brlen);
    node.final_state = final_state;
    node.transitions = transitions;
    node.extant = extant;
    node
}
