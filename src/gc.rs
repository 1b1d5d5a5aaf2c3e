//! Cycle collection for scopes
//!
//! A function declared in a scope captures that scope, so the two own each
//! other through `Rc` and would never be freed. When a scope handle goes out
//! of use the collector scans the graph reachable from it and compares each
//! node's strong count with the references found inside the scan. A node with
//! more owners than that is held from outside (a Rust local, an enclosing
//! scope) and stays live, along with everything it reaches. Every other scope
//! in the scan is cleared, which breaks the cycles and lets `Rc` free them.
//!
//! A scope that is still live when released is remembered as a candidate and
//! scanned again later, once the values holding it may have been dropped.

use std::cell::RefCell;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::rc::{Rc, Weak};

use crate::environment::Environment;
use crate::value::{EnvRef, Function, Object, Value};

/// Pending candidates before the first collection
const INITIAL_THRESHOLD: usize = 64;

/// A reference-counted node of the value graph
enum Node {
    Env(EnvRef),
    Function(Rc<Function>),
    Object(Rc<Object>),
}

impl Node {
    fn from_value(value: &Value) -> Option<Node> {
        match value {
            Value::Function(f) => Some(Node::Function(Rc::clone(f))),
            Value::Object(o) => Some(Node::Object(Rc::clone(o))),
            _ => None,
        }
    }

    fn id(&self) -> usize {
        match self {
            Node::Env(env) => env_id(env),
            Node::Function(f) => Rc::as_ptr(f) as *const () as usize,
            Node::Object(o) => Rc::as_ptr(o) as *const () as usize,
        }
    }

    fn strong_count(&self) -> usize {
        match self {
            Node::Env(env) => Rc::strong_count(env),
            Node::Function(f) => Rc::strong_count(f),
            Node::Object(o) => Rc::strong_count(o),
        }
    }

    /// Outgoing references, or `None` when a scope is borrowed and unreadable
    fn children(&self) -> Option<Vec<Node>> {
        match self {
            Node::Env(env) => {
                let scope = env.try_borrow().ok()?;
                let mut children: Vec<Node> = scope.values().filter_map(Node::from_value).collect();
                children.extend(scope.parent().cloned().map(Node::Env));
                Some(children)
            }
            Node::Function(f) => Some(vec![Node::Env(Rc::clone(&f.closure))]),
            Node::Object(o) => Some(o.values().filter_map(Node::from_value).collect()),
        }
    }
}

fn env_id(env: &EnvRef) -> usize {
    Rc::as_ptr(env) as *const () as usize
}

/// Frees scopes kept alive only by reference cycles
#[derive(Debug)]
pub struct Collector {
    candidates: Vec<Weak<RefCell<Environment>>>,
    next_collect: usize,
}

impl Default for Collector {
    fn default() -> Self {
        Self::new()
    }
}

impl Collector {
    pub fn new() -> Self {
        Self {
            candidates: Vec::new(),
            next_collect: INITIAL_THRESHOLD,
        }
    }

    /// Give up a scope handle. The scope is freed now if nothing but cycles
    /// hold it, or remembered for a later collection otherwise.
    pub fn release(&mut self, scope: EnvRef) {
        // Sole owner: dropping the handle frees the scope.
        if Rc::strong_count(&scope) == 1 {
            return;
        }

        if !free_if_unreachable(&scope) {
            self.candidates.push(Rc::downgrade(&scope));
            if self.candidates.len() >= self.next_collect {
                drop(scope);
                self.collect();
            }
        }
    }

    /// Rescan every remembered scope
    pub fn collect(&mut self) {
        let before = self.candidates.len();
        let mut live = Vec::new();

        for weak in std::mem::take(&mut self.candidates) {
            if let Some(scope) = weak.upgrade() {
                if !free_if_unreachable(&scope) {
                    live.push(weak);
                }
            }
        }

        self.next_collect = (live.len() * 2).max(INITIAL_THRESHOLD);
        tracing::debug!(before, after = live.len(), "collected scopes");
        self.candidates = live;
    }

    /// Scopes remembered for the next collection
    pub fn pending(&self) -> usize {
        self.candidates.len()
    }
}

/// Scan the graph reachable from `scope` and clear every scope in it that is
/// unreachable from outside. `scope` itself is borrowed from a handle the
/// caller owns, which is not counted as an outside owner. Returns whether
/// `scope` was cleared.
fn free_if_unreachable(scope: &EnvRef) -> bool {
    // Enclosing scopes are left out of the scan and act as outside owners.
    let mut enclosing = HashSet::new();
    let mut next = match scope.try_borrow() {
        Ok(current) => current.parent().cloned(),
        Err(_) => return false,
    };
    while let Some(env) = next {
        enclosing.insert(env_id(&env));
        next = env.try_borrow().ok().and_then(|e| e.parent().cloned());
    }

    let scope_id = env_id(scope);
    let mut nodes: HashMap<usize, Node> = HashMap::new();
    let mut edges: HashMap<usize, Vec<usize>> = HashMap::new();
    let mut inner: HashMap<usize, usize> = HashMap::new();
    let mut pinned: HashSet<usize> = HashSet::new();

    nodes.insert(scope_id, Node::Env(Rc::clone(scope)));
    let mut grey_stack = vec![scope_id];

    while let Some(id) = grey_stack.pop() {
        let Some(children) = nodes.get(&id).and_then(Node::children) else {
            pinned.insert(id);
            continue;
        };

        let mut out = Vec::with_capacity(children.len());
        for child in children {
            let child_id = child.id();
            if enclosing.contains(&child_id) {
                continue;
            }
            *inner.entry(child_id).or_default() += 1;
            out.push(child_id);
            if let Entry::Vacant(slot) = nodes.entry(child_id) {
                slot.insert(child);
                grey_stack.push(child_id);
            }
        }
        edges.insert(id, out);
    }

    // Owners known to the scan: the clone in `nodes`, the inner edges, and
    // for `scope` the caller's handle.
    let mut grey_stack: Vec<usize> = nodes
        .iter()
        .filter(|(id, node)| {
            let known = 1 + inner.get(*id).copied().unwrap_or(0) + usize::from(**id == scope_id);
            pinned.contains(*id) || node.strong_count() > known
        })
        .map(|(id, _)| *id)
        .collect();

    let mut marked = HashSet::new();
    while let Some(id) = grey_stack.pop() {
        if marked.insert(id) {
            if let Some(out) = edges.get(&id) {
                grey_stack.extend(out.iter().copied());
            }
        }
    }

    if marked.contains(&scope_id) {
        return false;
    }

    let mut garbage = Vec::new();
    let mut cleared = 0;
    for (id, node) in &nodes {
        if let (false, Node::Env(env)) = (marked.contains(id), node) {
            if let Ok(mut env) = env.try_borrow_mut() {
                garbage.extend(env.clear());
                cleared += 1;
            }
        }
    }
    tracing::trace!(scanned = nodes.len(), cleared, "freed scope cycles");

    drop(garbage);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::Interpreter;
    use crate::parser::parse;

    const COUNTER: &str = r#"
        def make() {
            declare i = 0
            def count() { i = i + 1 }
            count
        }
    "#;

    fn run_in(env: &EnvRef, interpreter: &mut Interpreter, source: &str) -> Value {
        let program = parse(source).unwrap();
        interpreter.evaluate_program(&program, env).unwrap()
    }

    fn closure_of(value: &Value) -> Weak<RefCell<Environment>> {
        match value {
            Value::Function(f) => Rc::downgrade(&f.closure),
            other => panic!("Expected function, got {:?}", other),
        }
    }

    #[test]
    fn test_root_with_function_is_freed() {
        let env = Environment::new().into_ref();
        run_in(&env, &mut Interpreter::new(), "def f() { 1 } f()");

        let weak = Rc::downgrade(&env);
        Collector::new().release(env);
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn test_plain_scope_is_dropped() {
        let env = Environment::new().into_ref();
        let weak = Rc::downgrade(&env);
        let mut collector = Collector::new();
        collector.release(env);
        assert!(weak.upgrade().is_none());
        assert_eq!(collector.pending(), 0);
    }

    #[test]
    fn test_dropped_counters_are_freed() {
        let env = Environment::new().into_ref();
        let mut interpreter = Interpreter::new();
        run_in(&env, &mut interpreter, COUNTER);
        let make = env.borrow().lookup("make").unwrap();

        let mut scopes = Vec::new();
        for _ in 0..10 {
            let counter = interpreter.call(&make, Vec::new(), &env).unwrap();
            scopes.push(closure_of(&counter));
        }
        assert!(scopes.iter().all(|weak| weak.upgrade().is_some()));

        interpreter.collect();
        assert!(scopes.iter().all(|weak| weak.upgrade().is_none()));
    }

    #[test]
    fn test_held_closure_keeps_its_scope() {
        let env = Environment::new().into_ref();
        let mut interpreter = Interpreter::new();
        run_in(&env, &mut interpreter, COUNTER);
        let make = env.borrow().lookup("make").unwrap();

        let counter = interpreter.call(&make, Vec::new(), &env).unwrap();
        interpreter.collect();
        assert_eq!(interpreter.call(&counter, Vec::new(), &env).unwrap(), Value::int(1));
        assert_eq!(interpreter.call(&counter, Vec::new(), &env).unwrap(), Value::int(2));

        // The counter is held here, so its scope and the root survive.
        let scope = closure_of(&counter);
        let mut collector = Collector::new();
        collector.release(Rc::clone(&env));
        assert!(scope.upgrade().is_some());
        assert!(env.borrow().lookup("make").is_ok());
    }

    #[test]
    fn test_scope_reachable_from_root_is_kept_until_root_goes() {
        let env = Environment::new().into_ref();
        let mut interpreter = Interpreter::new();
        run_in(&env, &mut interpreter, COUNTER);
        run_in(&env, &mut interpreter, "declare c = make() c()");

        let scope = closure_of(&env.borrow().lookup("c").unwrap());
        interpreter.collect();
        assert!(scope.upgrade().is_some());

        interpreter.release_root(env);
        assert!(scope.upgrade().is_none());
    }
}
