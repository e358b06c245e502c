//! Generic challenge/response workflow engine.
//!
//! # Responsibility
//! - Register workflows under a key and dispatch `challenge`/`response`
//!   calls to the handlers of a named state.
//! - Carry each workflow's progress as an opaque, versioned byte envelope.
//!
//! # Invariants
//! - State and workflow lookups are case-insensitive.
//! - Unknown workflows or states never panic: `challenge` degrades to a
//!   diagnostic message and `response` returns a descriptive error.
//! - Each workflow maps every state to its handlers with an exhaustive match,
//!   so the table is complete at compile time.
//! - `enter` is reached through `start`; `exit` and `error` have no response.

use super::WorkflowError;
use crate::model::user::UserId;
use image::RgbaImage;
use log::{info, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Debug;

pub const ENTER_STATE: &str = "enter";
pub const EXIT_STATE: &str = "exit";
pub const ERROR_STATE: &str = "error";

/// Returns whether `state` ends a workflow instance.
pub fn is_terminal(state: &str) -> bool {
    state.eq_ignore_ascii_case(EXIT_STATE) || state.eq_ignore_ascii_case(ERROR_STATE)
}

/// One button-like option presented to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    pub id: String,
    pub label: String,
}

impl Choice {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }
}

/// Prompt produced by a challenge, ready for delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowMessage {
    /// Key of the workflow that produced the message; stamped by the engine.
    pub workflow: String,
    pub text: String,
    pub image: Option<RgbaImage>,
    /// Ordered groups of mutually exclusive choices.
    pub choices: Vec<Vec<Choice>>,
}

impl WorkflowMessage {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            workflow: String::new(),
            text: text.into(),
            image: None,
            choices: Vec::new(),
        }
    }

    pub fn with_image(mut self, image: RgbaImage) -> Self {
        self.image = Some(image);
        self
    }

    /// Appends one choice group.
    pub fn with_choices(mut self, choices: Vec<Choice>) -> Self {
        self.choices.push(choices);
        self
    }

    /// Every choice id across all groups, in display order.
    pub fn choice_ids(&self) -> Vec<&str> {
        self.choices
            .iter()
            .flatten()
            .map(|choice| choice.id.as_str())
            .collect()
    }
}

#[derive(Serialize)]
struct EnvelopeOut<'a, T> {
    version: u32,
    state: &'a T,
}

#[derive(Deserialize)]
struct EnvelopeIn {
    version: u32,
    state: serde_json::Value,
}

/// Serialized per-instance workflow state: `{"version": n, "state": ...}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpaqueState(Vec<u8>);

impl OpaqueState {
    pub fn encode<T: Serialize>(version: u32, state: &T) -> Result<Self, WorkflowError> {
        serde_json::to_vec(&EnvelopeOut { version, state })
            .map(Self)
            .map_err(WorkflowError::Codec)
    }

    /// Decodes the envelope, rejecting any other schema version.
    pub fn decode<T: DeserializeOwned>(&self, version: u32) -> Result<T, WorkflowError> {
        let envelope: EnvelopeIn =
            serde_json::from_slice(&self.0).map_err(WorkflowError::Codec)?;
        if envelope.version != version {
            return Err(WorkflowError::StateVersion {
                found: envelope.version,
                expected: version,
            });
        }
        serde_json::from_value(envelope.state).map_err(WorkflowError::Codec)
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Closed set of states of one workflow.
pub trait StateName: Copy + Eq + Debug + 'static {
    const ALL: &'static [Self];

    fn name(self) -> &'static str;

    fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|state| state.name().eq_ignore_ascii_case(name))
    }
}

pub type ChallengeFn<W> =
    fn(&W, &<W as Workflow>::Opaque) -> Result<WorkflowMessage, WorkflowError>;
pub type ResponseFn<W> =
    fn(&W, <W as Workflow>::Opaque, &str) -> Result<Transition<W>, WorkflowError>;

/// Capabilities of one state.
pub struct Handlers<W: Workflow> {
    pub challenge: Option<ChallengeFn<W>>,
    pub response: Option<ResponseFn<W>>,
}

impl<W: Workflow> Handlers<W> {
    pub fn both(challenge: ChallengeFn<W>, response: ResponseFn<W>) -> Self {
        Self {
            challenge: Some(challenge),
            response: Some(response),
        }
    }

    pub fn challenge_only(challenge: ChallengeFn<W>) -> Self {
        Self {
            challenge: Some(challenge),
            response: None,
        }
    }

    pub fn response_only(response: ResponseFn<W>) -> Self {
        Self {
            challenge: None,
            response: Some(response),
        }
    }
}

/// Result of a response handler: the next state and the updated opaque state.
pub struct Transition<W: Workflow> {
    pub state: W::State,
    pub opaque: W::Opaque,
}

impl<W: Workflow> Transition<W> {
    pub fn to(state: W::State, opaque: W::Opaque) -> Self {
        Self { state, opaque }
    }
}

/// A multi-turn interaction defined as named states.
pub trait Workflow: Sized {
    type State: StateName;
    type Opaque: Serialize + DeserializeOwned;

    /// Registry key.
    const KEY: &'static str;
    /// Version written into every opaque envelope.
    const SCHEMA_VERSION: u32;

    /// Opaque state handed to the synthesized `enter` response.
    fn seed(&self, user: UserId) -> Self::Opaque;

    fn handlers(&self, state: Self::State) -> Handlers<Self>;
}

/// Type-erased view used by the registry.
trait ErasedWorkflow {
    fn key(&self) -> &'static str;
    fn seed_opaque(&self, user: UserId) -> Result<OpaqueState, WorkflowError>;
    fn erased_challenge(
        &self,
        state: &str,
        opaque: &OpaqueState,
    ) -> Result<WorkflowMessage, WorkflowError>;
    fn erased_response(
        &self,
        state: &str,
        opaque: &OpaqueState,
        choice: &str,
    ) -> Result<(String, OpaqueState), WorkflowError>;
}

impl<W: Workflow> ErasedWorkflow for W {
    fn key(&self) -> &'static str {
        W::KEY
    }

    fn seed_opaque(&self, user: UserId) -> Result<OpaqueState, WorkflowError> {
        OpaqueState::encode(W::SCHEMA_VERSION, &<W as Workflow>::seed(self, user))
    }

    fn erased_challenge(
        &self,
        state: &str,
        opaque: &OpaqueState,
    ) -> Result<WorkflowMessage, WorkflowError> {
        let parsed = parse_state::<W>(state)?;
        let challenge =
            self.handlers(parsed)
                .challenge
                .ok_or_else(|| WorkflowError::NoChallenge {
                    workflow: W::KEY.to_string(),
                    state: parsed.name().to_string(),
                })?;
        let decoded: W::Opaque = opaque.decode(W::SCHEMA_VERSION)?;
        challenge(self, &decoded)
    }

    fn erased_response(
        &self,
        state: &str,
        opaque: &OpaqueState,
        choice: &str,
    ) -> Result<(String, OpaqueState), WorkflowError> {
        let parsed = parse_state::<W>(state)?;
        let response = self
            .handlers(parsed)
            .response
            .ok_or_else(|| WorkflowError::NoResponse {
                workflow: W::KEY.to_string(),
                state: parsed.name().to_string(),
            })?;
        let decoded: W::Opaque = opaque.decode(W::SCHEMA_VERSION)?;
        let transition = response(self, decoded, choice)?;
        let encoded = OpaqueState::encode(W::SCHEMA_VERSION, &transition.opaque)?;
        Ok((transition.state.name().to_string(), encoded))
    }
}

fn parse_state<W: Workflow>(state: &str) -> Result<W::State, WorkflowError> {
    W::State::parse(state).ok_or_else(|| WorkflowError::UnknownState {
        workflow: W::KEY.to_string(),
        state: state.to_string(),
    })
}

/// Registry of workflows, constructed once at startup and passed by reference.
#[derive(Default)]
pub struct WorkflowEngine<'a> {
    workflows: BTreeMap<String, Box<dyn ErasedWorkflow + 'a>>,
}

impl<'a> WorkflowEngine<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `workflow` under `W::KEY`.
    pub fn register<W: Workflow + 'a>(&mut self, workflow: W) -> Result<(), WorkflowError> {
        let key = W::KEY.to_ascii_lowercase();
        if self.workflows.contains_key(&key) {
            return Err(WorkflowError::DuplicateWorkflow(key));
        }
        self.workflows.insert(key, Box::new(workflow));
        Ok(())
    }

    /// Registered keys, sorted.
    pub fn keys(&self) -> Vec<&str> {
        self.workflows.keys().map(String::as_str).collect()
    }

    /// Produces the prompt for `state`. Failures become a diagnostic message.
    pub fn challenge(&self, workflow: &str, state: &str, opaque: &OpaqueState) -> WorkflowMessage {
        let result = self
            .lookup(workflow)
            .and_then(|entry| entry.erased_challenge(state, opaque).map(|m| (entry.key(), m)));

        match result {
            Ok((key, mut message)) => {
                message.workflow = key.to_string();
                message
            }
            Err(err) => {
                warn!(
                    "event=workflow_challenge module=workflow status=error workflow={workflow} state={state} error={err}"
                );
                let mut message = WorkflowMessage::new(err.to_string());
                message.workflow = workflow.to_string();
                message
            }
        }
    }

    /// Applies `choice` in `state` and returns the next state and opaque state.
    pub fn response(
        &self,
        workflow: &str,
        state: &str,
        opaque: &OpaqueState,
        choice: &str,
    ) -> Result<(String, OpaqueState), WorkflowError> {
        let entry = self.lookup(workflow)?;
        let (next, opaque) = entry.erased_response(state, opaque, choice)?;
        info!(
            "event=workflow_response module=workflow status=ok workflow={} from={} to={}",
            entry.key(),
            state,
            next
        );
        Ok((next, opaque))
    }

    /// Creates a new instance for `user` by synthesizing the `enter` response.
    pub fn start(
        &self,
        workflow: &str,
        user: UserId,
        choice: &str,
    ) -> Result<(String, OpaqueState), WorkflowError> {
        let seed = self.lookup(workflow)?.seed_opaque(user)?;
        self.response(workflow, ENTER_STATE, &seed, choice)
    }

    fn lookup(&self, workflow: &str) -> Result<&(dyn ErasedWorkflow + 'a), WorkflowError> {
        self.workflows
            .get(&workflow.trim().to_ascii_lowercase())
            .map(Box::as_ref)
            .ok_or_else(|| WorkflowError::UnknownWorkflow(workflow.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::{
        is_terminal, Choice, Handlers, OpaqueState, StateName, Transition, Workflow,
        WorkflowEngine, WorkflowMessage,
    };
    use crate::model::user::UserId;
    use crate::workflow::WorkflowError;
    use serde::{Deserialize, Serialize};
    use uuid::Uuid;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Step {
        Enter,
        Count,
        Exit,
    }

    impl StateName for Step {
        const ALL: &'static [Self] = &[Self::Enter, Self::Count, Self::Exit];

        fn name(self) -> &'static str {
            match self {
                Self::Enter => "enter",
                Self::Count => "count",
                Self::Exit => "exit",
            }
        }
    }

    #[derive(Debug, Serialize, Deserialize)]
    struct Tally {
        user: UserId,
        total: u32,
    }

    struct Counter;

    impl Counter {
        fn enter(&self, mut tally: Tally, choice: &str) -> Result<Transition<Self>, WorkflowError> {
            tally.total = choice.parse().map_err(|_| WorkflowError::InvalidChoice {
                state: "enter".to_string(),
                choice: choice.to_string(),
            })?;
            Ok(Transition::to(Step::Count, tally))
        }

        fn prompt(&self, tally: &Tally) -> Result<WorkflowMessage, WorkflowError> {
            Ok(WorkflowMessage::new(format!("total {}", tally.total))
                .with_choices(vec![Choice::new("add", "Add"), Choice::new("stop", "Stop")]))
        }

        fn count(&self, mut tally: Tally, choice: &str) -> Result<Transition<Self>, WorkflowError> {
            match choice {
                "add" => {
                    tally.total += 1;
                    Ok(Transition::to(Step::Count, tally))
                }
                "stop" => Ok(Transition::to(Step::Exit, tally)),
                other => Err(WorkflowError::InvalidChoice {
                    state: "count".to_string(),
                    choice: other.to_string(),
                }),
            }
        }

        fn done(&self, tally: &Tally) -> Result<WorkflowMessage, WorkflowError> {
            Ok(WorkflowMessage::new(format!("done at {}", tally.total)))
        }
    }

    impl Workflow for Counter {
        type State = Step;
        type Opaque = Tally;
        const KEY: &'static str = "counter";
        const SCHEMA_VERSION: u32 = 3;

        fn seed(&self, user: UserId) -> Tally {
            Tally { user, total: 0 }
        }

        fn handlers(&self, state: Step) -> Handlers<Self> {
            match state {
                Step::Enter => Handlers::response_only(Self::enter),
                Step::Count => Handlers::both(Self::prompt, Self::count),
                Step::Exit => Handlers::challenge_only(Self::done),
            }
        }
    }

    fn engine() -> WorkflowEngine<'static> {
        let mut engine = WorkflowEngine::new();
        engine.register(Counter).expect("first registration");
        engine
    }

    #[test]
    fn start_then_respond_walks_the_table() {
        let engine = engine();
        let (state, opaque) = engine
            .start("counter", Uuid::new_v4(), "5")
            .expect("enter succeeds");
        assert_eq!(state, "count");

        let (state, opaque) = engine
            .response("Counter", "COUNT", &opaque, "add")
            .expect("lookups are case-insensitive");
        let message = engine.challenge("counter", &state, &opaque);
        assert_eq!(message.text, "total 6");
        assert_eq!(message.workflow, "counter");
        assert_eq!(message.choice_ids(), vec!["add", "stop"]);

        let (state, opaque) = engine
            .response("counter", &state, &opaque, "stop")
            .expect("stop succeeds");
        assert!(is_terminal(&state));
        assert_eq!(engine.challenge("counter", &state, &opaque).text, "done at 6");
    }

    #[test]
    fn unknown_lookups_degrade_to_diagnostics() {
        let engine = engine();
        let opaque = OpaqueState::encode(3, &Tally {
            user: Uuid::new_v4(),
            total: 0,
        })
        .expect("encode");

        let missing_workflow = engine.challenge("nope", "count", &opaque);
        assert!(missing_workflow.text.contains("nope"));
        assert!(missing_workflow.choices.is_empty());

        let missing_state = engine.challenge("counter", "sideways", &opaque);
        assert!(missing_state.text.contains("sideways"));

        let no_challenge = engine.challenge("counter", "enter", &opaque);
        assert!(no_challenge.text.contains("enter"));
    }

    #[test]
    fn response_errors_are_descriptive() {
        let engine = engine();
        let opaque = OpaqueState::encode(3, &Tally {
            user: Uuid::new_v4(),
            total: 0,
        })
        .expect("encode");

        assert!(matches!(
            engine.response("counter", "exit", &opaque, "add"),
            Err(WorkflowError::NoResponse { .. })
        ));
        assert!(matches!(
            engine.response("counter", "limbo", &opaque, "add"),
            Err(WorkflowError::UnknownState { .. })
        ));
        assert!(matches!(
            engine.response("counter", "count", &opaque, "jump"),
            Err(WorkflowError::InvalidChoice { .. })
        ));
    }

    #[test]
    fn schema_version_mismatch_is_rejected() {
        let engine = engine();
        let stale = OpaqueState::encode(2, &Tally {
            user: Uuid::new_v4(),
            total: 0,
        })
        .expect("encode");
        let err = engine
            .response("counter", "count", &stale, "add")
            .expect_err("old schema");
        assert!(matches!(
            err,
            WorkflowError::StateVersion {
                found: 2,
                expected: 3
            }
        ));
    }

    #[test]
    fn duplicate_registration_fails() {
        let mut engine = engine();
        assert!(matches!(
            engine.register(Counter),
            Err(WorkflowError::DuplicateWorkflow(key)) if key == "counter"
        ));
    }
}
