//! Lifecycle orchestration for a single resource instance
//!
//! [`Lifecycle`] is the entry point used by the host: it decides between
//! create, in-place update, replacement, or no-op, and tracks the instance
//! through the [`ResourceStateMachine`] while doing so.

use tracing::{debug, info, instrument, warn};

use crate::controller::context::Context;
use crate::controller::error::{Error, Result};
use crate::controller::reconciler::ManagedResource;
use crate::controller::state_machine::{
    LifecycleEvent, ResourcePhase, ResourceStateMachine, TransitionResult,
};

/// What `apply` did to reach the desired state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Created,
    Updated,
    Replaced,
    /// Already converged; no remote calls were made
    Unchanged,
}

/// Result of an apply: the new state record and how it was reached
#[derive(Debug, Clone)]
pub struct Applied<S> {
    pub outcome: ApplyOutcome,
    pub state: S,
}

/// Drives one resource kind through its lifecycle
pub struct Lifecycle<R: ManagedResource> {
    resource: R,
    ctx: Context,
    machine: ResourceStateMachine,
}

impl<R: ManagedResource> Lifecycle<R> {
    pub fn new(resource: R, ctx: Context) -> Self {
        Self {
            resource,
            ctx,
            machine: ResourceStateMachine::new(),
        }
    }

    pub fn resource(&self) -> &R {
        &self.resource
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    fn advance(&self, phase: &mut ResourcePhase, event: LifecycleEvent) -> Result<()> {
        match self.machine.transition(phase, event) {
            TransitionResult::Success {
                from,
                to,
                description,
                ..
            } => {
                debug!(kind = self.resource.kind(), %from, %to, %event, "{}", description);
                *phase = to;
                Ok(())
            }
            TransitionResult::InvalidTransition { current, event } => {
                Err(Error::InvalidTransition { current, event })
            }
        }
    }

    /// Converge the remote entity on `desired`, starting from `prior` state if any
    #[instrument(skip_all, fields(kind = self.resource.kind()))]
    pub async fn apply(
        &self,
        desired: &R::Desired,
        prior: Option<&R::State>,
    ) -> Result<Applied<R::State>> {
        let Some(prior) = prior else {
            let mut phase = ResourcePhase::Absent;
            let state = self.create(&mut phase, desired).await?;
            return Ok(Applied {
                outcome: ApplyOutcome::Created,
                state,
            });
        };

        let mut phase = ResourcePhase::Present;
        let id = self.resource.id(prior);

        if self.resource.requires_replacement(desired, prior) {
            info!(id = %id, "Change requires replacement");
            self.delete(&mut phase, prior).await?;
            let state = self.create(&mut phase, desired).await?;
            return Ok(Applied {
                outcome: ApplyOutcome::Replaced,
                state,
            });
        }

        if self.resource.is_converged(desired, prior) {
            debug!(id = %id, "Already converged");
            return Ok(Applied {
                outcome: ApplyOutcome::Unchanged,
                state: prior.clone(),
            });
        }

        info!(id = %id, "Updating in place");
        let state = self.resource.update(&self.ctx, desired, prior).await?;
        self.advance(&mut phase, LifecycleEvent::Updated)?;
        Ok(Applied {
            outcome: ApplyOutcome::Updated,
            state,
        })
    }

    /// Re-read a tracked entity. `None` means it is gone and should leave state.
    #[instrument(skip_all, fields(kind = self.resource.kind(), id = %self.resource.id(state)))]
    pub async fn refresh(&self, state: &R::State) -> Result<Option<R::State>> {
        let mut phase = ResourcePhase::Present;
        match self.resource.read(&self.ctx, state).await? {
            Some(state) => {
                self.advance(&mut phase, LifecycleEvent::Refreshed)?;
                Ok(Some(state))
            }
            None => {
                self.advance(&mut phase, LifecycleEvent::Vanished)?;
                warn!("Entity vanished remotely; removing it from state");
                Ok(None)
            }
        }
    }

    /// Delete a tracked entity
    #[instrument(skip_all, fields(kind = self.resource.kind(), id = %self.resource.id(state)))]
    pub async fn destroy(&self, state: &R::State) -> Result<()> {
        let mut phase = ResourcePhase::Present;
        self.delete(&mut phase, state).await
    }

    /// Adopt an existing remote entity by its composite identifier.
    ///
    /// The identifier is validated before any remote call.
    #[instrument(skip(self), fields(kind = self.resource.kind()))]
    pub async fn import(&self, id: &str) -> Result<R::State> {
        let seed = self.resource.import_state(id)?;

        let mut phase = ResourcePhase::Absent;
        match self.resource.read(&self.ctx, &seed).await? {
            Some(state) => {
                self.advance(&mut phase, LifecycleEvent::Imported)?;
                info!("Imported");
                Ok(state)
            }
            None => Err(Error::NotFound(format!(
                "{} {} does not exist",
                self.resource.kind(),
                id
            ))),
        }
    }

    async fn create(&self, phase: &mut ResourcePhase, desired: &R::Desired) -> Result<R::State> {
        self.advance(phase, LifecycleEvent::CreateRequested)?;
        match self.resource.create(&self.ctx, desired).await {
            Ok(state) => {
                self.advance(phase, LifecycleEvent::CreateSucceeded)?;
                info!(id = %self.resource.id(&state), "Created");
                Ok(state)
            }
            Err(e) => {
                self.advance(phase, LifecycleEvent::CreateFailed)?;
                Err(e)
            }
        }
    }

    async fn delete(&self, phase: &mut ResourcePhase, state: &R::State) -> Result<()> {
        self.advance(phase, LifecycleEvent::DeleteRequested)?;
        match self.resource.delete(&self.ctx, state).await {
            Ok(()) => {
                self.advance(phase, LifecycleEvent::DeleteSucceeded)?;
                info!(id = %self.resource.id(state), "Deleted");
                Ok(())
            }
            Err(e) => {
                self.advance(phase, LifecycleEvent::DeleteFailed)?;
                Err(e)
            }
        }
    }
}
