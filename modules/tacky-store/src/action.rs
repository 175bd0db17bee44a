//! Actions: one requested state change, carrying the function to run.

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// User-supplied state change. Receives the action payload as positional
/// arguments.
pub type Mutation = Rc<dyn Fn(&[Value]) -> anyhow::Result<()>>;

/// Category of an action. Only [`ActionType::Mutation`] and
/// [`ActionType::Update`] execute; every other category is a silent no-op.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    /// Mutates derived or normal state.
    Mutation,
    /// Mutates atom state.
    Update,
    /// Side-effect bookkeeping; never executed by the store.
    Effect,
    Other(String),
}

impl ActionType {
    pub fn is_executable(&self) -> bool {
        matches!(self, ActionType::Mutation | ActionType::Update)
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionType::Mutation => f.write_str("MUTATION"),
            ActionType::Update => f.write_str("UPDATE"),
            ActionType::Effect => f.write_str("EFFECT"),
            ActionType::Other(kind) => f.write_str(kind),
        }
    }
}

/// Transient description of one state change. Created by the caller,
/// consumed by [`Store::dispatch`](crate::Store::dispatch), never stored.
#[derive(Clone)]
pub struct Action {
    pub name: String,
    pub payload: Vec<Value>,
    pub kind: ActionType,
    pub namespace: Option<String>,
    pub original: Mutation,
    /// Atom actions flush synchronously instead of joining the deferred batch.
    pub is_atom: bool,
}

impl Action {
    pub fn new(
        name: impl Into<String>,
        kind: ActionType,
        original: impl Fn(&[Value]) -> anyhow::Result<()> + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            payload: Vec::new(),
            kind,
            namespace: None,
            original: Rc::new(original),
            is_atom: false,
        }
    }

    /// A batched `MUTATION`.
    pub fn mutation(
        name: impl Into<String>,
        original: impl Fn(&[Value]) -> anyhow::Result<()> + 'static,
    ) -> Self {
        Self::new(name, ActionType::Mutation, original)
    }

    /// An `UPDATE` against atom state. Atom by default.
    pub fn update(
        name: impl Into<String>,
        original: impl Fn(&[Value]) -> anyhow::Result<()> + 'static,
    ) -> Self {
        Self::new(name, ActionType::Update, original).atom(true)
    }

    pub fn with_payload(mut self, payload: Vec<Value>) -> Self {
        self.payload = payload;
        self
    }

    pub fn with_arg(mut self, arg: impl Into<Value>) -> Self {
        self.payload.push(arg.into());
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn atom(mut self, is_atom: bool) -> Self {
        self.is_atom = is_atom;
        self
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action")
            .field("name", &self.name)
            .field("payload", &self.payload)
            .field("kind", &self.kind)
            .field("namespace", &self.namespace)
            .field("is_atom", &self.is_atom)
            .finish_non_exhaustive()
    }
}
