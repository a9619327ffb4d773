use statig::blocking::IntoStateMachineExt as _;

use super::events::ConnectivityEvent;
use super::machine::{ActionBuffer, ConnectivityAction, ConnectivityMachine, DispatchContext};
use super::state::ConnectivityState;

#[derive(Clone, Debug)]
pub struct ConnectivityApplyResult {
    pub before: ConnectivityState,
    pub after: ConnectivityState,
    pub retries: u8,
    pub actions: ActionBuffer,
}

impl ConnectivityApplyResult {
    pub fn changed(&self) -> bool {
        self.before != self.after
    }

    pub fn has(&self, action: ConnectivityAction) -> bool {
        self.actions.contains(&action)
    }
}

/// Synchronous core of the connectivity manager: feed events, get back the
/// transition and the side effects to perform.
pub struct ConnectivityEngine {
    machine: statig::blocking::StateMachine<ConnectivityMachine>,
}

impl ConnectivityEngine {
    pub fn new(max_retries: u8) -> Self {
        Self {
            machine: ConnectivityMachine::new(max_retries).state_machine(),
        }
    }

    pub fn state(&self) -> ConnectivityState {
        self.machine.inner().state
    }

    pub fn retries(&self) -> u8 {
        self.machine.inner().retries
    }

    pub fn apply(&mut self, event: ConnectivityEvent) -> ConnectivityApplyResult {
        let before = self.state();
        let mut context = DispatchContext::default();
        self.machine.handle_with_context(&event, &mut context);
        ConnectivityApplyResult {
            before,
            after: self.state(),
            retries: self.retries(),
            actions: context.actions,
        }
    }
}
