use std::{
    collections::{BTreeSet, HashMap, VecDeque},
    error::Error,
    fmt::Display,
};

use colored::Colorize;
use itertools::Itertools;
use log::{debug, warn};

use crate::{
    lexer::{tokenize, LexError},
    parser::{parse, ParseError},
    token::{Token, TokenKind},
    utils::{render_diagnostic, CompileFlags},
};

pub type StateId = usize;

type Fragment = (StateId, StateId);

#[derive(Hash, Debug, PartialEq, Eq, Clone)]
pub struct Transition {
    pub token: Token,
    pub end: StateId,
}

impl Transition {
    pub fn new(token: Token, end: StateId) -> Self {
        Self { token, end }
    }

    pub fn is_epsilon(&self) -> bool {
        self.token.is_epsilon()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct State {
    id: StateId,
    transitions: Vec<Transition>,
}

impl State {
    fn new(id: StateId) -> Self {
        State {
            id,
            transitions: Vec::new(),
        }
    }

    pub fn id(&self) -> StateId {
        self.id
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuildErrorKind {
    MalformedExpression,
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildError {
    kind: BuildErrorKind,
    message: &'static str,
    position: usize,
}

impl BuildError {
    pub fn new(kind: BuildErrorKind, message: &'static str, position: usize) -> Self {
        BuildError {
            kind,
            message,
            position,
        }
    }

    fn malformed(message: &'static str, position: usize) -> Self {
        BuildError::new(BuildErrorKind::MalformedExpression, message, position)
    }

    pub fn kind(&self) -> BuildErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        self.message
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn render(&self, input: &str) -> String {
        render_diagnostic("construction", self.message, input, self.position)
    }
}

impl Display for BuildError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} at offset {}",
            "construction error:".red().bold(),
            self.message,
            self.position
        )
    }
}

impl Error for BuildError {}

/// Failure of one stage of the `pattern -> tokens -> rpn -> nfa` pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReError {
    LexingFailed(LexError),
    ParsingFailed { pattern: String, error: ParseError },
    BuildingFailed { pattern: String, error: BuildError },
}

impl ReError {
    pub fn message(&self) -> &str {
        match self {
            ReError::LexingFailed(error) => error.message(),
            ReError::ParsingFailed { error, .. } => error.message(),
            ReError::BuildingFailed { error, .. } => error.message(),
        }
    }

    pub fn input(&self) -> &str {
        match self {
            ReError::LexingFailed(error) => error.input(),
            ReError::ParsingFailed { pattern, .. } | ReError::BuildingFailed { pattern, .. } => {
                pattern
            }
        }
    }

    pub fn position(&self) -> usize {
        match self {
            ReError::LexingFailed(error) => error.position(),
            ReError::ParsingFailed { error, .. } => error.position(),
            ReError::BuildingFailed { error, .. } => error.position(),
        }
    }
}

impl Display for ReError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReError::LexingFailed(error) => write!(f, "{}", error),
            ReError::ParsingFailed { pattern, error } => write!(f, "{}", error.render(pattern)),
            ReError::BuildingFailed { pattern, error } => write!(f, "{}", error.render(pattern)),
        }
    }
}

impl Error for ReError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ReError::LexingFailed(error) => Some(error),
            ReError::ParsingFailed { error, .. } => Some(error),
            ReError::BuildingFailed { error, .. } => Some(error),
        }
    }
}

/// A Thompson automaton. Every state lives in one arena indexed by its id and
/// transitions refer to states by id, so the whole graph, closure cycles
/// included, is released together when the automaton is dropped.
#[derive(Debug, Clone)]
pub struct RegexNFA {
    pattern: String,
    flags: CompileFlags,
    start: StateId,
    accept: StateId,
    states: Vec<State>,
}

impl RegexNFA {
    pub fn compile(pattern: &str) -> Result<RegexNFA, ReError> {
        RegexNFA::compile_with_flags(pattern, CompileFlags::NO_FLAG)
    }

    pub fn compile_with_flags(pattern: &str, flags: CompileFlags) -> Result<RegexNFA, ReError> {
        let tokens = tokenize(pattern).map_err(ReError::LexingFailed)?;
        debug!("lexed {:?} into {} tokens", pattern, tokens.len());

        let rpn = parse(&tokens).map_err(|error| ReError::ParsingFailed {
            pattern: String::from(pattern),
            error,
        })?;
        debug!("rpn for {:?}: {}", pattern, rpn.iter().join(" "));

        let mut nfa = build_with_flags(&rpn, flags).map_err(|error| ReError::BuildingFailed {
            pattern: String::from(pattern),
            error,
        })?;
        nfa.pattern = String::from(pattern);
        debug!(
            "built {:?}: {} states, {} transitions",
            pattern,
            nfa.state_count(),
            nfa.transition_count()
        );
        Ok(nfa)
    }

    /// Source pattern, empty when the automaton was built from a bare RPN
    /// stream.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn flags(&self) -> CompileFlags {
        self.flags
    }

    pub fn start(&self) -> StateId {
        self.start
    }

    pub fn accept(&self) -> StateId {
        self.accept
    }

    pub fn state(&self, id: StateId) -> Option<&State> {
        self.states.get(id)
    }

    pub fn states(&self) -> &[State] {
        &self.states
    }

    pub fn transitions(&self, id: StateId) -> &[Transition] {
        match self.states.get(id) {
            Some(state) => state.transitions(),
            None => &[],
        }
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    pub fn transition_count(&self) -> usize {
        self.states.iter().map(|state| state.transitions.len()).sum()
    }

    /// Distinct labels of the consuming transitions.
    pub fn alphabet(&self) -> BTreeSet<String> {
        self.states
            .iter()
            .flat_map(|state| state.transitions.iter())
            .filter(|transition| !transition.is_epsilon())
            .map(|transition| transition.token.to_string())
            .collect()
    }

    /// States reachable from `states` without consuming input, the seeds
    /// included.
    pub fn epsilon_closure<I>(&self, states: I) -> BTreeSet<StateId>
    where
        I: IntoIterator<Item = StateId>,
    {
        let mut closure: BTreeSet<StateId> = BTreeSet::new();
        let mut stack: Vec<StateId> = states.into_iter().collect();
        while let Some(state) = stack.pop() {
            if closure.insert(state) {
                stack.extend(
                    self.transitions(state)
                        .iter()
                        .filter(|transition| transition.is_epsilon())
                        .map(|transition| transition.end),
                );
            }
        }
        closure
    }

    /// Breadth-first order of every state reachable from the start state.
    pub fn reachable_states(&self) -> Vec<StateId> {
        let mut seen: BTreeSet<StateId> = BTreeSet::new();
        let mut order: Vec<StateId> = Vec::new();
        let mut queue: VecDeque<StateId> = VecDeque::new();
        queue.push_back(self.start);
        seen.insert(self.start);
        while let Some(state) = queue.pop_front() {
            order.push(state);
            for transition in self.transitions(state) {
                if seen.insert(transition.end) {
                    queue.push_back(transition.end);
                }
            }
        }
        order
    }

    /// Convert the automata to a GraphViz Dot code for debugging purposes.
    pub fn as_graphviz_code(&self) -> String {
        let mut out = String::new();
        let opts = "[fillcolor=\"#EEEEEE\" fontcolor=\"#888888\"]";
        for id in self.reachable_states() {
            if id == self.start {
                out += &format!("node_{}[label=\"{}\"]{}\n", id, id, "[fillcolor=green]");
            } else if id == self.accept {
                out += &format!("node_{}[label=\"{}\" shape=doublecircle]\n", id, id);
            } else {
                out += &format!("node_{}[label=\"{}\"]{}\n", id, id, opts);
            }
        }
        for id in self.reachable_states() {
            for transition in self.transitions(id) {
                if transition.is_epsilon() {
                    out += &format!("node_{} -> node_{}[style=dashed]\n", id, transition.end);
                } else {
                    out += &format!(
                        "node_{} -> node_{}[label=\"{}\"]\n",
                        id,
                        transition.end,
                        transition.token.to_string().replace('\\', "\\\\")
                    );
                }
            }
        }
        let opts = "node [shape=circle style=filled fillcolor=\"#4385f5\" fontcolor=\"#FFFFFF\" \
        color=white penwidth=5.0 margin=0.1 width=0.5 height=0.5 fixedsize=true]";
        format!(
            "digraph G {{  rankdir=\"LR\" graph [fontname = \"Courier New\"];
                node [fontname = \"verdana\", style = rounded];
                edge [fontname = \"verdana\"];
                {{\n{}\n{}\n}}}}",
            opts, out
        )
    }
}

impl Display for RegexNFA {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "start: {}, accept: {}", self.start, self.accept)?;
        for id in self.reachable_states() {
            writeln!(f, "state {}:", id)?;
            for transition in self.transitions(id) {
                if transition.is_epsilon() {
                    writeln!(f, "  ε -> {}", transition.end)?;
                } else {
                    writeln!(f, "  '{}' -> {}", transition.token, transition.end)?;
                }
            }
        }
        Ok(())
    }
}

/// Construction state of one build. The arena length doubles as the id
/// source, so concurrent builds never share a counter.
struct Builder {
    flags: CompileFlags,
    states: Vec<State>,
    stack: Vec<Fragment>,
}

impl Builder {
    fn new(flags: CompileFlags) -> Builder {
        Builder {
            flags,
            states: Vec::new(),
            stack: Vec::new(),
        }
    }

    fn gen_state(&mut self) -> StateId {
        let id = self.states.len();
        self.states.push(State::new(id));
        id
    }

    fn fragment(&mut self) -> Fragment {
        (self.gen_state(), self.gen_state())
    }

    fn add_transition(&mut self, start: StateId, end: StateId, token: Token) {
        self.states[start].transitions.push(Transition::new(token, end));
    }

    fn epsilon(&mut self, start: StateId, end: StateId) {
        self.add_transition(start, end, Token::epsilon())
    }

    fn symbol_transition(&mut self, token: &Token) -> Fragment {
        let (start, end) = self.fragment();
        self.add_transition(start, end, token.clone());
        (start, end)
    }

    fn empty_string(&mut self) -> Fragment {
        let (start, end) = self.fragment();
        self.epsilon(start, end);
        (start, end)
    }

    fn concatenation(&mut self, lower: Fragment, upper: Fragment) -> Fragment {
        self.epsilon(lower.1, upper.0);
        (lower.0, upper.1)
    }

    fn alternation(&mut self, lower: Fragment, upper: Fragment) -> Fragment {
        let fragment = self.fragment();
        self.epsilon(fragment.0, lower.0);
        self.epsilon(fragment.0, upper.0);
        self.epsilon(lower.1, fragment.1);
        self.epsilon(upper.1, fragment.1);

        fragment
    }

    fn zero_or_more(&mut self, inner: Fragment) -> Fragment {
        let fragment = self.fragment();
        self.epsilon(fragment.0, inner.0);
        self.epsilon(fragment.0, fragment.1);
        // loop back for another pass
        self.epsilon(inner.1, inner.0);
        self.epsilon(inner.1, fragment.1);

        fragment
    }

    fn one_or_more(&mut self, inner: Fragment, position: usize) -> Result<Fragment, BuildError> {
        let copy = self.duplicate(inner, position)?;
        let repeated = self.zero_or_more(copy);
        Ok(self.concatenation(inner, repeated))
    }

    fn zero_or_one(&mut self, inner: Fragment) -> Fragment {
        let empty = self.empty_string();
        self.alternation(inner, empty)
    }

    /// Copies the sub-automaton reachable from `fragment.0` into fresh states.
    fn duplicate(&mut self, fragment: Fragment, position: usize) -> Result<Fragment, BuildError> {
        let mut mapping: HashMap<StateId, StateId> = HashMap::new();
        let mut order: Vec<StateId> = Vec::new();
        let mut queue: VecDeque<StateId> = VecDeque::new();

        let start = self.gen_state();
        mapping.insert(fragment.0, start);
        queue.push_back(fragment.0);
        while let Some(state) = queue.pop_front() {
            order.push(state);
            let ends: Vec<StateId> = self.states[state]
                .transitions
                .iter()
                .map(|transition| transition.end)
                .collect();
            for end in ends {
                if !mapping.contains_key(&end) {
                    let id = self.gen_state();
                    mapping.insert(end, id);
                    queue.push_back(end);
                }
            }
        }

        for old in order {
            let copied: Vec<Transition> = self.states[old]
                .transitions
                .iter()
                .filter_map(|transition| {
                    mapping
                        .get(&transition.end)
                        .map(|end| Transition::new(transition.token.clone(), *end))
                })
                .collect();
            if let Some(new) = mapping.get(&old) {
                self.states[*new].transitions = copied;
            }
        }

        match mapping.get(&fragment.1) {
            Some(accept) => Ok((start, *accept)),
            None => Err(BuildError::new(
                BuildErrorKind::Internal,
                "accept state is unreachable from its start state",
                position,
            )),
        }
    }

    fn pop(&mut self, operator: &Token) -> Result<Fragment, BuildError> {
        self.stack
            .pop()
            .ok_or_else(|| BuildError::malformed("operator is missing an operand", operator.position()))
    }

    fn pop_pair(&mut self, operator: &Token) -> Result<(Fragment, Fragment), BuildError> {
        let upper = self.pop(operator)?;
        let lower = self.pop(operator)?;
        Ok((lower, upper))
    }

    fn step(&mut self, token: &Token) -> Result<(), BuildError> {
        if self.flags.contains(CompileFlags::DEBUG) {
            debug!(
                "consuming {:?} {:?} at offset {}",
                token.kind(),
                token.value(),
                token.position()
            );
        }
        let fragment = match token.kind() {
            TokenKind::Literal | TokenKind::Escape => self.symbol_transition(token),
            TokenKind::Concat => {
                let (lower, upper) = self.pop_pair(token)?;
                self.concatenation(lower, upper)
            }
            TokenKind::Union => {
                let (lower, upper) = self.pop_pair(token)?;
                self.alternation(lower, upper)
            }
            TokenKind::Star => {
                let inner = self.pop(token)?;
                self.zero_or_more(inner)
            }
            TokenKind::Plus => {
                let inner = self.pop(token)?;
                self.one_or_more(inner, token.position())?
            }
            TokenKind::Question => {
                let inner = self.pop(token)?;
                self.zero_or_one(inner)
            }
            TokenKind::End | TokenKind::LParen | TokenKind::RParen | TokenKind::Epsilon => {
                // only a broken rpn stream carries these
                warn!(
                    "skipping unexpected {:?} token at offset {} in rpn stream",
                    token.kind(),
                    token.position()
                );
                return Ok(());
            }
        };
        self.stack.push(fragment);
        Ok(())
    }

    fn finish(self, position: usize) -> Result<RegexNFA, BuildError> {
        match self.stack.as_slice() {
            [(start, accept)] => Ok(RegexNFA {
                pattern: String::new(),
                flags: self.flags,
                start: *start,
                accept: *accept,
                states: self.states,
            }),
            [] => Err(BuildError::malformed("expression is empty", position)),
            _ => Err(BuildError::malformed(
                "operands are missing an operator",
                position,
            )),
        }
    }
}

pub fn build(rpn: &[Token]) -> Result<RegexNFA, BuildError> {
    build_with_flags(rpn, CompileFlags::NO_FLAG)
}

/// Evaluates an RPN token stream with Thompson's construction. Exactly one
/// fragment must remain once the stream is consumed.
pub fn build_with_flags(rpn: &[Token], flags: CompileFlags) -> Result<RegexNFA, BuildError> {
    let mut builder = Builder::new(flags);
    for token in rpn {
        builder.step(token)?;
    }
    let position = rpn.last().map_or(0, |token| token.position());
    builder.finish(position)
}
