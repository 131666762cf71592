//! The GLR driver: an ordered set of stack versions advanced one token at a
//! time, lowest position first.

mod recovery;
#[cfg(test)]
mod tests;

use std::cmp::Ordering;

use text_size::{TextRange, TextSize};
use trellis_lexer::{Lexed, Lexer, Token};
use trellis_table::{Action, Language, RuleId};
use trellis_tree::{Leaf, Length, NodeSpec, StateId, Subtree, Symbol};

use crate::ParseOptions;
use crate::conflict;
use crate::reuse::{ReuseCursor, is_damaged};
use crate::stack::Stack;

/// The token a version is about to consume.
#[derive(Clone)]
enum Lookahead {
    Token(Token),
    /// Old subtrees starting at the version's position, outermost first and
    /// ending with a leaf.
    Reused(Vec<Subtree>),
}

impl Lookahead {
    fn symbol(&self) -> Symbol {
        match self {
            Self::Token(token) => token.symbol,
            Self::Reused(chain) => chain.last().map_or(Symbol::END, Subtree::symbol),
        }
    }

    /// End of the bytes that decided this token, relative to `start`.
    fn lookahead_end(&self, start: TextSize) -> TextSize {
        match self {
            Self::Token(token) => token.range.end() + TextSize::new(token.lookahead_bytes),
            Self::Reused(chain) => chain.last().map_or(start, |leaf| {
                start + leaf.len() + TextSize::new(leaf.lookahead_bytes())
            }),
        }
    }
}

#[derive(Clone)]
struct Version {
    stack: Stack,
    lookahead: Option<Lookahead>,
    /// State whose lex mode scans the next token. Differs from the stack's
    /// state after a reused subtree was pushed.
    lex_state: StateId,
    /// An action chosen when this version was forked, not applied yet.
    pending: Option<Action>,
    /// Action choices at every fork, for a leftmost tie-break.
    path: Vec<u16>,
    /// Position of the lookahead chosen by the last recovery.
    recovered_at: Option<TextSize>,
    /// Set from a recovery until the next shift of a real token.
    recovering: bool,
}

impl Version {
    fn new(state: StateId) -> Self {
        Self {
            stack: Stack::new(state),
            lookahead: None,
            lex_state: state,
            pending: None,
            path: Vec::new(),
            recovered_at: None,
            recovering: false,
        }
    }

    fn position(&self) -> Length {
        self.stack.position()
    }

    fn rank(&self) -> (u32, i32, &[u16]) {
        (self.stack.error_cost(), self.stack.dynamic_precedence(), &self.path)
    }
}

/// A finished tree and the fork path that produced it.
struct Candidate {
    root: Subtree,
    path: Vec<u16>,
}

/// Lower error cost first, then higher dynamic precedence, then the leftmost
/// fork path.
fn compare_rank(a: (u32, i32, &[u16]), b: (u32, i32, &[u16])) -> Ordering {
    a.0.cmp(&b.0).then(b.1.cmp(&a.1)).then_with(|| a.2.cmp(b.2))
}

pub(crate) struct Engine<'a, L> {
    language: &'a Language,
    options: &'a ParseOptions,
    lexer: L,
    reuse: Option<ReuseCursor>,
    versions: Vec<Version>,
    accepted: Vec<Candidate>,
}

impl<'a, L: Lexer> Engine<'a, L> {
    pub(crate) fn new(
        language: &'a Language,
        options: &'a ParseOptions,
        lexer: L,
        reuse: Option<ReuseCursor>,
    ) -> Self {
        Self { language, options, lexer, reuse, versions: Vec::new(), accepted: Vec::new() }
    }

    /// Parses the whole text and returns the root of the best tree.
    pub(crate) fn run(mut self) -> Subtree {
        self.versions.push(Version::new(self.language.start_state()));
        while !self.versions.is_empty() {
            self.step();
        }
        self.finish()
    }

    /// Advances the most lagging version by one token.
    fn step(&mut self) {
        let index = self.next_version();
        self.advance(index);
        self.condense();
    }

    fn finish(self) -> Subtree {
        let best = self
            .accepted
            .into_iter()
            .min_by(|a, b| {
                compare_rank(
                    (a.root.error_cost(), a.root.dynamic_precedence(), &a.path),
                    (b.root.error_cost(), b.root.dynamic_precedence(), &b.path),
                )
            })
            .map(|candidate| candidate.root);
        best.unwrap_or_else(|| {
            tracing::warn!("no version finished; returning an empty error tree");
            recovery::error_node(self.language, Vec::new(), self.language.start_state(), false)
        })
    }

    /// The version with the lowest position; ties go to the earliest.
    fn next_version(&self) -> usize {
        let mut best = 0;
        for (index, version) in self.versions.iter().enumerate().skip(1) {
            if version.position().bytes < self.versions[best].position().bytes {
                best = index;
            }
        }
        best
    }

    fn fragile(&self) -> bool {
        self.versions.len() > 1
    }

    /// Applies actions to one version until it consumes a token, accepts, or
    /// is dropped.
    fn advance(&mut self, index: usize) {
        let language = self.language;
        loop {
            self.ensure_lookahead(index);
            let version = &mut self.versions[index];
            let Some(lookahead) = &version.lookahead else { return };
            let state = version.stack.state();
            let symbol = lookahead.symbol();

            let action = match version.pending.take() {
                Some(action) => action,
                None => {
                    let actions = conflict::resolve(language, language.actions(state, symbol), symbol);
                    match actions.split_first() {
                        None if language.is_extra(symbol) => Action::ShiftExtra,
                        None => {
                            tracing::trace!(?state, ?symbol, "no action");
                            self.fail(index);
                            return;
                        }
                        Some((&first, rest)) => {
                            if !rest.is_empty() {
                                let rest = rest.to_vec();
                                self.fork(index, &rest);
                            }
                            first
                        }
                    }
                }
            };

            match action {
                Action::Shift { state: target } => {
                    self.shift(index, target);
                    return;
                }
                Action::ShiftExtra => {
                    self.shift_extra(index);
                    return;
                }
                Action::Reduce { rule } => {
                    if !self.reduce(index, rule) {
                        self.fail(index);
                        return;
                    }
                }
                Action::Accept => {
                    self.accept(index);
                    return;
                }
            }
        }
    }

    fn ensure_lookahead(&mut self, index: usize) {
        let alone = self.versions.len() == 1;
        let version = &mut self.versions[index];
        if version.lookahead.is_some() {
            return;
        }
        let position = version.position();

        if alone
            && !version.recovering
            && let Some(cursor) = &mut self.reuse
        {
            let chain = cursor.candidates(position.bytes);
            let lex_mode = self.language.lex_mode_id(version.lex_state);
            if chain.last().is_some_and(|leaf| {
                leaf.is_leaf() && !is_damaged(leaf) && leaf.first_leaf().lex_mode == lex_mode
            }) {
                tracing::trace!(position = ?position.bytes, "reusing lookahead");
                version.lookahead = Some(Lookahead::Reused(chain));
                return;
            }
        }

        let token = match self.lexer.next_token(version.lex_state, position) {
            Lexed::Token(token) => token,
            Lexed::EndOfInput => end_token(position, self.language.lex_mode_id(version.lex_state)),
        };
        version.lookahead = Some(Lookahead::Token(token));
    }

    fn fork(&mut self, index: usize, actions: &[Action]) {
        let original = &mut self.versions[index];
        let base = original.path.clone();
        original.path.push(0);
        let template = original.clone();

        for (offset, &action) in actions.iter().enumerate() {
            let mut fork = template.clone();
            fork.path.clone_from(&base);
            fork.path.push(offset as u16 + 1);
            fork.pending = Some(action);
            self.versions.insert(index + 1 + offset, fork);
        }
        tracing::debug!(forks = actions.len(), versions = self.versions.len(), "forked");
    }

    fn leaf(&self, token: &Token, parse_state: StateId, extra: bool) -> Subtree {
        Subtree::leaf(Leaf {
            symbol: token.symbol,
            size: token.size(),
            lookahead_bytes: token.lookahead_bytes,
            parse_state,
            lex_mode: token.lex_mode,
            extra,
            fragile: self.fragile(),
        })
    }

    fn shift(&mut self, index: usize, target: StateId) {
        let alone = self.versions.len() == 1;
        let Some(lookahead) = self.versions[index].lookahead.take() else { return };
        let state = self.versions[index].stack.state();

        let (subtree, next, lex_state) = match lookahead {
            Lookahead::Token(token) => {
                let leaf = self.leaf(&token, state, false);
                (leaf, target, target)
            }
            Lookahead::Reused(chain) => {
                let reused = if alone { self.reusable_node(&chain, state) } else { None };
                match reused {
                    Some((node, goto)) => {
                        let lex_state = self.state_after(&node, goto);
                        tracing::debug!(symbol = ?node.symbol(), len = ?node.len(), "reused subtree");
                        (node, goto, lex_state)
                    }
                    None => {
                        let Some(leaf) = chain.last() else { return };
                        (restamp(leaf, state, false), target, target)
                    }
                }
            }
        };

        let version = &mut self.versions[index];
        version.stack.push(next, subtree);
        version.lex_state = lex_state;
        version.recovering = false;
    }

    /// The largest undamaged old node that was built from the current state.
    fn reusable_node(&self, chain: &[Subtree], state: StateId) -> Option<(Subtree, StateId)> {
        chain.iter().filter(|subtree| !subtree.is_leaf()).find_map(|node| {
            if is_damaged(node) || node.parse_state() != state {
                return None;
            }
            let goto = self.language.goto(state, node.symbol())?;
            Some((node.clone(), goto))
        })
    }

    /// The state a fresh parse would have lexed in after `node`.
    fn state_after(&self, node: &Subtree, fallback: StateId) -> StateId {
        match node.last_leaf() {
            Some(leaf) if leaf.is_extra() => leaf.parse_state(),
            Some(leaf) => self.language.next_state(leaf.parse_state(), leaf.symbol()).unwrap_or(fallback),
            None => fallback,
        }
    }

    fn shift_extra(&mut self, index: usize) {
        let Some(lookahead) = self.versions[index].lookahead.take() else { return };
        let state = self.versions[index].stack.state();
        let leaf = match &lookahead {
            Lookahead::Token(token) => self.leaf(token, state, true),
            Lookahead::Reused(chain) => match chain.last() {
                Some(leaf) => restamp(leaf, state, true),
                None => return,
            },
        };
        self.versions[index].stack.push(state, leaf);
    }

    /// Pops the rule's children and pushes the new node. Returns `false` if
    /// the stack or the table cannot support the reduction.
    fn reduce(&mut self, index: usize, rule_id: RuleId) -> bool {
        let rule = *self.language.rule(rule_id);
        let fragile = self.fragile();
        let version = &mut self.versions[index];

        let mut children = Vec::with_capacity(usize::from(rule.child_count));
        let mut remaining = rule.child_count;
        while remaining > 0 {
            let Some(subtree) = version.stack.pop() else {
                tracing::warn!(rule = ?rule_id, "reduction popped past the bottom of the stack");
                return false;
            };
            if !subtree.is_extra() && !subtree.is_error() {
                remaining -= 1;
            }
            children.push(subtree);
        }
        children.reverse();

        // Extras and errors after the last real child stay on the stack.
        let last_child = children.iter().rposition(|child| !child.is_extra() && !child.is_error());
        let trailing = children.split_off(last_child.map_or(0, |index| index + 1));

        let exposed = version.stack.state();
        let Some(target) = self.language.goto(exposed, rule.lhs) else {
            tracing::warn!(state = ?exposed, symbol = ?rule.lhs, "missing goto");
            return false;
        };

        let node_end = children.iter().fold(version.stack.position().bytes, |end, child| end + child.len());
        let lookahead_end = version
            .lookahead
            .as_ref()
            .map_or(node_end, |lookahead| lookahead.lookahead_end(version.stack.position().bytes));
        let lookahead_bytes = u32::from(lookahead_end.checked_sub(node_end).unwrap_or_default());

        let node = Subtree::node(
            rule.lhs,
            children,
            NodeSpec {
                parse_state: exposed,
                dynamic_precedence: rule.dynamic_precedence,
                error_cost: 0,
                lookahead_bytes,
                fragile,
                empty_first_leaf: None,
            },
            self.language.symbols(),
        );
        tracing::trace!(rule = ?rule_id, symbol = ?rule.lhs, ?target, "reduce");
        version.stack.push(target, node);
        for subtree in trailing {
            version.stack.push(target, subtree);
        }
        true
    }

    fn accept(&mut self, index: usize) {
        let version = self.versions.remove(index);
        let entries = version.stack.subtrees();
        let Some(root_index) = entries.iter().rposition(|entry| !entry.is_extra() && !entry.is_error())
        else {
            let root = recovery::error_node(self.language, entries, self.language.start_state(), false);
            self.accepted.push(Candidate { root, path: version.path });
            return;
        };

        let root = &entries[root_index];
        let root = if entries.len() == 1 {
            root.clone()
        } else {
            let own_precedence = root.dynamic_precedence()
                - root.children().iter().map(Subtree::dynamic_precedence).sum::<i32>();
            let own_cost = root.error_cost() - root.children().iter().map(Subtree::error_cost).sum::<u32>();
            let children = entries[..root_index]
                .iter()
                .chain(root.children())
                .chain(&entries[root_index + 1..])
                .cloned()
                .collect();
            Subtree::node(
                root.symbol(),
                children,
                NodeSpec {
                    parse_state: root.parse_state(),
                    dynamic_precedence: own_precedence,
                    error_cost: own_cost,
                    lookahead_bytes: 0,
                    fragile: root.is_fragile(),
                    empty_first_leaf: None,
                },
                self.language.symbols(),
            )
        };
        tracing::debug!(cost = root.error_cost(), precedence = root.dynamic_precedence(), "accepted");
        self.accepted.push(Candidate { root, path: version.path });
    }

    /// Drops a version that has no action, or recovers if it is the last hope.
    fn fail(&mut self, index: usize) {
        if self.versions.len() > 1 || !self.accepted.is_empty() {
            tracing::debug!(position = ?self.versions[index].position().bytes, "dropping failed version");
            self.versions.remove(index);
            return;
        }
        self.recover(index);
    }

    /// Merges equivalent versions and enforces the version limit.
    fn condense(&mut self) {
        let mut i = 0;
        while i < self.versions.len() {
            let mut j = i + 1;
            while j < self.versions.len() {
                if mergeable(&self.versions[i], &self.versions[j]) {
                    let other = self.versions.remove(j);
                    if compare_rank(other.rank(), self.versions[i].rank()) == Ordering::Less {
                        self.versions[i] = other;
                    }
                    tracing::debug!(versions = self.versions.len(), "merged versions");
                } else {
                    j += 1;
                }
            }
            i += 1;
        }

        let limit = self.options.max_versions.max(1);
        while self.versions.len() > limit {
            let worst = (0..self.versions.len())
                .max_by(|&a, &b| compare_rank(self.versions[a].rank(), self.versions[b].rank()))
                .unwrap_or(0);
            self.versions.remove(worst);
            tracing::debug!(limit, "dropped the worst version");
        }
    }
}

fn mergeable(a: &Version, b: &Version) -> bool {
    a.lookahead.is_none()
        && b.lookahead.is_none()
        && a.pending.is_none()
        && b.pending.is_none()
        && a.lex_state == b.lex_state
        && a.position().bytes == b.position().bytes
        && a.stack.same_states(&b.stack)
}

/// Returns `leaf` recorded as shifted in `state` with the given extra flag.
fn restamp(leaf: &Subtree, state: StateId, extra: bool) -> Subtree {
    if leaf.is_extra() == extra {
        return leaf.with_parse_state(state);
    }
    Subtree::leaf(Leaf {
        symbol: leaf.symbol(),
        size: leaf.size(),
        lookahead_bytes: leaf.lookahead_bytes(),
        parse_state: state,
        lex_mode: leaf.first_leaf().lex_mode,
        extra,
        fragile: leaf.is_fragile(),
    })
}

/// The zero-width end-of-input token.
fn end_token(position: Length, lex_mode: u16) -> Token {
    Token {
        symbol: Symbol::END,
        range: TextRange::empty(position.bytes),
        start_point: position.extent,
        end_point: position.extent,
        lookahead_bytes: 0,
        lex_mode,
    }
}
