//! Static resolution of table conflicts by precedence and associativity.

use std::borrow::Cow;

use trellis_table::{Action, Associativity, Language};
use trellis_tree::Symbol;

/// Filters the actions of a conflicted cell. Whatever survives is explored by
/// forking, in table order.
pub(crate) fn resolve<'a>(language: &Language, actions: &'a [Action], lookahead: Symbol) -> Cow<'a, [Action]> {
    if actions.len() < 2 {
        return Cow::Borrowed(actions);
    }

    let precedence = |action: &Action| match action {
        Action::Reduce { rule } => Some(language.rule(*rule).precedence),
        _ => None,
    };
    let Some(best) = actions.iter().filter_map(precedence).max() else {
        return Cow::Borrowed(actions);
    };
    let reduce = actions.iter().find_map(|action| match action {
        Action::Reduce { rule } if language.rule(*rule).precedence == best => Some(language.rule(*rule)),
        _ => None,
    });
    let has_shift = actions.iter().any(|action| matches!(action, Action::Shift { .. } | Action::ShiftExtra));

    let (mut keep_shift, mut keep_reduce) = (true, true);
    if let (true, Some(rule)) = (has_shift, reduce) {
        let token = language.metadata(lookahead);
        let token_precedence = token.map_or(0, |meta| meta.precedence);
        match rule.precedence.cmp(&token_precedence) {
            std::cmp::Ordering::Greater => keep_shift = false,
            std::cmp::Ordering::Less => keep_reduce = false,
            std::cmp::Ordering::Equal => {
                match rule.associativity.or_else(|| token.and_then(|meta| meta.associativity)) {
                    Some(Associativity::Left) => keep_shift = false,
                    Some(Associativity::Right) => keep_reduce = false,
                    Some(Associativity::NonAssoc) => (keep_shift, keep_reduce) = (false, false),
                    None => {}
                }
            }
        }
    }

    let resolved: Vec<Action> = actions
        .iter()
        .filter(|action| match action {
            Action::Shift { .. } | Action::ShiftExtra => keep_shift,
            Action::Reduce { .. } => keep_reduce && precedence(action) == Some(best),
            Action::Accept => true,
        })
        .copied()
        .collect();
    if resolved.len() < actions.len() {
        tracing::trace!(?lookahead, before = actions.len(), after = resolved.len(), "resolved conflict");
    }
    Cow::Owned(resolved)
}

#[cfg(test)]
mod tests {
    use trellis_table::{Action, Associativity, Language, LanguageBuilder, RuleId};
    use trellis_table::format::RuleDef;
    use trellis_tree::{StateId, Symbol};

    use super::resolve;

    struct Fixture {
        language: Language,
        plus: Symbol,
        times: Symbol,
        add: RuleId,
        mul: RuleId,
        neg: RuleId,
    }

    fn fixture() -> Fixture {
        let mut builder = LanguageBuilder::new("ops");
        let plus = builder.literal("+");
        let times = builder.literal("*");
        let expr = builder.nonterminal("expr");
        builder
            .precedence(plus, 1, Some(Associativity::Left))
            .precedence(times, 2, Some(Associativity::Left));
        let rule = |precedence, associativity| RuleDef {
            lhs: expr.raw(),
            child_count: 3,
            precedence,
            associativity,
            dynamic_precedence: 0,
        };
        let add = builder.rule_with(rule(1, Some(Associativity::Left)));
        let mul = builder.rule_with(rule(2, Some(Associativity::Left)));
        let neg = builder.rule_with(rule(1, Some(Associativity::NonAssoc)));
        builder.state();
        Fixture { language: builder.build().unwrap(), plus, times, add, mul, neg }
    }

    fn shift() -> Action {
        Action::Shift { state: StateId::new(0) }
    }

    #[test]
    fn precedence_decides_shift_reduce_conflicts() {
        let f = fixture();
        let add = Action::Reduce { rule: f.add };
        let mul = Action::Reduce { rule: f.mul };

        assert_eq!(&*resolve(&f.language, &[add, shift()], f.times), &[shift()]);
        assert_eq!(&*resolve(&f.language, &[mul, shift()], f.plus), &[mul]);
        assert_eq!(&*resolve(&f.language, &[add, shift()], f.plus), &[add]);
    }

    #[test]
    fn non_associative_operators_drop_both_actions() {
        let f = fixture();
        let neg = Action::Reduce { rule: f.neg };
        assert!(resolve(&f.language, &[neg, shift()], f.plus).is_empty());
    }

    #[test]
    fn higher_precedence_reductions_win_and_ties_are_kept() {
        let f = fixture();
        let add = Action::Reduce { rule: f.add };
        let mul = Action::Reduce { rule: f.mul };
        let neg = Action::Reduce { rule: f.neg };

        assert_eq!(&*resolve(&f.language, &[add, mul], Symbol::END), &[mul]);
        assert_eq!(&*resolve(&f.language, &[add, neg], Symbol::END), &[add, neg]);
    }
}
