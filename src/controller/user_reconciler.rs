//! Reconciler for database users
//!
//! The password is generated remotely and only returned by the create call.
//! Reads never see it, so it is carried over from the stored state.

use async_trait::async_trait;
use tracing::{info, instrument, warn};

use crate::client::{ConfigUserRequest, ConfigureRequest};
use crate::controller::context::Context;
use crate::controller::error::{Error, Result, ResultExt};
use crate::controller::mutator::submit_and_wait;
use crate::controller::reconciler::{
    ManagedResource, fetch_cluster, first_non_empty, lookup_in_cluster,
};
use crate::model::{UserId, UserSpec, UserState};

#[derive(Debug, Clone, Copy, Default)]
pub struct UserReconciler;

#[async_trait]
impl ManagedResource for UserReconciler {
    type Desired = UserSpec;
    type State = UserState;

    fn kind(&self) -> &'static str {
        "user"
    }

    fn id(&self, state: &UserState) -> String {
        state.id.to_string()
    }

    fn requires_replacement(&self, desired: &UserSpec, state: &UserState) -> bool {
        desired.cluster_id != state.cluster_id() || desired.username != state.username()
    }

    fn is_converged(&self, desired: &UserSpec, state: &UserState) -> bool {
        !self.requires_replacement(desired, state)
    }

    #[instrument(skip(self, ctx, desired), fields(cluster_id = %desired.cluster_id, username = %desired.username))]
    async fn create(&self, ctx: &Context, desired: &UserSpec) -> Result<UserState> {
        let id = UserId::new(desired.cluster_id, desired.username.clone());
        let req = ConfigureRequest {
            users: vec![ConfigUserRequest {
                username: desired.username.clone(),
            }],
            ..Default::default()
        };

        let resp = submit_and_wait(ctx, id.cluster_id.get(), &req)
            .await
            .context(|| format!("creating user {}", id))?;

        let mut password = resp
            .users
            .iter()
            .find(|u| u.username == desired.username)
            .map(|u| u.password.clone())
            .filter(|p| !p.is_empty());

        if password.is_none() {
            password = lookup_in_cluster(ctx, id.cluster_id, |cluster| {
                cluster
                    .find_user(&desired.username)
                    .map(|u| u.password.clone())
            })
            .await;
        }

        let password = first_non_empty([password]);
        if password.is_empty() {
            warn!("No password was returned for the new user");
        }
        info!("User created");

        Ok(UserState { id, password })
    }

    #[instrument(skip(self, ctx, state), fields(id = %state.id))]
    async fn read(&self, ctx: &Context, state: &UserState) -> Result<Option<UserState>> {
        let Some(cluster) = fetch_cluster(ctx, state.cluster_id())
            .await
            .context(|| format!("reading user {}", state.id))?
        else {
            return Ok(None);
        };

        if cluster.find_user(state.username()).is_none() {
            warn!("User no longer exists");
            return Ok(None);
        }
        Ok(Some(state.clone()))
    }

    async fn update(
        &self,
        _ctx: &Context,
        _desired: &UserSpec,
        state: &UserState,
    ) -> Result<UserState> {
        Err(Error::UpdateUnsupported(format!("user {}", state.id)))
    }

    #[instrument(skip(self, ctx, state), fields(id = %state.id))]
    async fn delete(&self, ctx: &Context, state: &UserState) -> Result<()> {
        let req = ConfigureRequest {
            delete_users: vec![state.username().to_string()],
            ..Default::default()
        };

        match submit_and_wait(ctx, state.cluster_id().get(), &req).await {
            Ok(_) => {
                info!("User deleted");
                Ok(())
            }
            Err(e) if e.is_absent() => {
                info!("User already absent");
                Ok(())
            }
            Err(e) => Err(e.within(format!("deleting user {}", state.id))),
        }
    }

    fn import_state(&self, id: &str) -> Result<UserState> {
        Ok(UserState {
            id: id.parse()?,
            password: String::new(),
        })
    }
}
