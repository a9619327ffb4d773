use heapless::Vec;
use statig::prelude::*;

use super::events::ConnectivityEvent;
use super::state::ConnectivityState;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectivityAction {
    IssueConnect,
    SignalConnected,
    /// Start the access point; the manager does this outside any timed wait.
    FallBack,
    ClearControl,
}

pub type ActionBuffer = Vec<ConnectivityAction, 2>;

#[derive(Debug, Default)]
pub(super) struct DispatchContext {
    pub(super) actions: ActionBuffer,
}

impl DispatchContext {
    fn push(&mut self, action: ConnectivityAction) {
        let _ = self.actions.push(action);
    }
}

#[derive(Clone, Copy, Debug)]
pub(super) struct ConnectivityMachine {
    pub(super) state: ConnectivityState,
    pub(super) retries: u8,
    max_retries: u8,
}

impl ConnectivityMachine {
    pub(super) fn new(max_retries: u8) -> Self {
        Self {
            state: ConnectivityState::Unconfigured,
            retries: 0,
            max_retries,
        }
    }

    fn fall_back(&mut self, context: &mut DispatchContext) -> Outcome<State> {
        context.push(ConnectivityAction::FallBack);
        self.state = ConnectivityState::ApFallback;
        Transition(State::ap_fallback())
    }
}

#[state_machine(initial = "State::unconfigured()")]
impl ConnectivityMachine {
    #[state(superstate = "radio")]
    fn unconfigured(
        &mut self,
        context: &mut DispatchContext,
        event: &ConnectivityEvent,
    ) -> Outcome<State> {
        match event {
            ConnectivityEvent::Boot {
                has_credentials: true,
            } => {
                self.retries = 0;
                context.push(ConnectivityAction::IssueConnect);
                self.state = ConnectivityState::StaConnecting;
                Transition(State::sta_connecting())
            }
            ConnectivityEvent::Boot {
                has_credentials: false,
            } => self.fall_back(context),
            _ => Super,
        }
    }

    #[state(superstate = "radio")]
    fn sta_connecting(
        &mut self,
        context: &mut DispatchContext,
        event: &ConnectivityEvent,
    ) -> Outcome<State> {
        match event {
            ConnectivityEvent::StaDisconnected => {
                if self.retries < self.max_retries {
                    self.retries += 1;
                    context.push(ConnectivityAction::IssueConnect);
                    Handled
                } else {
                    self.fall_back(context)
                }
            }
            ConnectivityEvent::GotIp => {
                self.retries = 0;
                context.push(ConnectivityAction::SignalConnected);
                self.state = ConnectivityState::StaConnected;
                Transition(State::sta_connected())
            }
            ConnectivityEvent::ConnectTimeout => self.fall_back(context),
            _ => Super,
        }
    }

    #[state(superstate = "radio")]
    fn sta_connected(
        &mut self,
        context: &mut DispatchContext,
        event: &ConnectivityEvent,
    ) -> Outcome<State> {
        match event {
            ConnectivityEvent::StaDisconnected => {
                if self.max_retries == 0 {
                    return self.fall_back(context);
                }
                self.retries = 1;
                context.push(ConnectivityAction::IssueConnect);
                self.state = ConnectivityState::StaConnecting;
                Transition(State::sta_connecting())
            }
            ConnectivityEvent::GotIp => {
                self.retries = 0;
                Handled
            }
            _ => Super,
        }
    }

    #[state(superstate = "radio")]
    fn ap_fallback(&mut self, event: &ConnectivityEvent) -> Outcome<State> {
        match event {
            ConnectivityEvent::ProvisioningStarted => {
                self.state = ConnectivityState::Provisioning;
                Transition(State::provisioning())
            }
            _ => Super,
        }
    }

    #[state(superstate = "radio")]
    fn provisioning() -> Outcome<State> {
        Super
    }

    // Station events after fallback end up here and are dropped; only a
    // restart leaves the access point.
    #[superstate]
    fn radio(&mut self, context: &mut DispatchContext, event: &ConnectivityEvent) -> Outcome<State> {
        if matches!(event, ConnectivityEvent::ApClientLeft) {
            context.push(ConnectivityAction::ClearControl);
        }
        Handled
    }
}
