//! In-memory fake of the Rivestack API and builders for test data
//!
//! [`FakeApi`] keeps clusters in memory and applies configure envelopes the
//! way the remote side does: users, databases, and grants are upserted,
//! allowlists are replaced or merged depending on `replace_ips`. Every call
//! is recorded so tests can assert on exactly what was sent.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! let api = FakeApi::new();
//! api.insert_cluster(ClusterBuilder::new(7).with_nodes(3).build());
//! let ctx = api.context();
//! let state = UserReconciler.create(&ctx, &user_spec(7, "app")).await?;
//! assert_eq!(api.mutating_calls().len(), 1);
//! ```

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use rivestack_provider::client::{
    AddNodeResponse, ApiClient, ApiError, ApiResult, BackupConfig, Cluster, ClusterDatabase,
    ClusterExtension, ClusterGrant, ClusterStatus, ClusterUser, ConfigDatabaseResponse,
    ConfigExtensionResponse, ConfigUserResponse, ConfigureRequest, ConfigureResponse, Extension,
    ExtensionsResponse, Job, JobStatus, ProvisionClusterRequest, ProvisionClusterResponse,
    RemoveNodeRequest, RemoveNodeResponse, ServerType, ServerTypesResponse,
    UpdateBackupConfigRequest,
};
use rivestack_provider::controller::Context;
use rivestack_provider::model::{
    AccessLevel, ClusterId, DatabaseSpec, ExtensionSpec, FirewallSpec, GrantSpec, UserSpec,
    node_name,
};

// =============================================================================
// Recorded calls and scripted faults
// =============================================================================

/// A call received by the fake, with its arguments
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Provision(ProvisionClusterRequest),
    GetCluster(i64),
    ListClusters,
    DeleteCluster(i64),
    AddNode(i64),
    RemoveNode(i64, String),
    Configure(i64, ConfigureRequest),
    ListJobs(i64),
    GetBackupConfig(i64),
    UpdateBackupConfig(i64, UpdateBackupConfigRequest),
    ListServerTypes,
    ListExtensions,
}

impl Call {
    /// Whether this call changes remote state
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Call::Provision(_)
                | Call::DeleteCluster(_)
                | Call::AddNode(_)
                | Call::RemoveNode(..)
                | Call::Configure(..)
                | Call::UpdateBackupConfig(..)
        )
    }
}

/// An error the fake returns instead of performing a call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    Conflict,
    NotFound,
    Gone,
    ServerError,
    BadRequest,
}

impl Fault {
    pub fn to_error(self) -> ApiError {
        match self {
            Fault::Conflict => ApiError::Conflict("cluster has an active job".into()),
            Fault::NotFound => ApiError::NotFound("cluster not found".into()),
            Fault::Gone => ApiError::Gone("cluster has been deleted".into()),
            Fault::ServerError => ApiError::Status {
                status: 500,
                message: "internal error".into(),
            },
            Fault::BadRequest => ApiError::Status {
                status: 400,
                message: "invalid request".into(),
            },
        }
    }
}

/// Build a job as returned by the jobs endpoint
pub fn job(id: i64, status: &str, error_message: &str) -> Job {
    Job {
        id,
        job_type: "configure".to_string(),
        status: JobStatus::from(status.to_string()),
        error_message: error_message.to_string(),
        progress: 0,
        created_at: None,
        updated_at: None,
    }
}

// =============================================================================
// Fake API
// =============================================================================

#[derive(Default)]
struct FakeState {
    clusters: BTreeMap<i64, Cluster>,
    next_id: i64,
    next_job_id: i64,
    calls: Vec<Call>,

    /// Faults returned by successive configure calls
    configure_faults: VecDeque<Fault>,
    /// Responses of successive jobs polls; an empty queue means no active jobs
    job_polls: VecDeque<Vec<Job>>,
    /// Job id returned by configure (0 = applied synchronously)
    configure_job_id: i64,
    /// Leave generated values out of configure responses
    terse_responses: bool,

    /// `get_cluster` polls that report `provisioning` after a provision
    provisioning_polls: u32,
    provisioning_left: BTreeMap<i64, u32>,
    /// Status a provisioned cluster settles in
    provision_outcome: Option<(ClusterStatus, String)>,

    /// `get_cluster` polls that still see a deleted cluster
    deletion_polls: u32,
    deleting_left: BTreeMap<i64, u32>,

    /// 1-based add/remove-node calls that fail
    node_faults: BTreeMap<u32, Fault>,
    node_calls: u32,

    /// Fault returned by every `get_cluster`
    get_fault: Option<Fault>,
}

/// In-memory [`ApiClient`] with scripted behaviour
#[derive(Default)]
pub struct FakeApi {
    state: Mutex<FakeState>,
}

impl FakeApi {
    pub fn new() -> Arc<Self> {
        let api = Self::default();
        api.lock().next_id = 100;
        Arc::new(api)
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    /// Reconciler context backed by this fake
    pub fn context(self: &Arc<Self>) -> Context {
        Context::new(self.clone())
    }

    pub fn insert_cluster(&self, cluster: Cluster) {
        self.lock().clusters.insert(cluster.id, cluster);
    }

    pub fn cluster(&self, id: i64) -> Option<Cluster> {
        self.lock().clusters.get(&id).cloned()
    }

    pub fn update_cluster(&self, id: i64, f: impl FnOnce(&mut Cluster)) {
        if let Some(cluster) = self.lock().clusters.get_mut(&id) {
            f(cluster);
        }
    }

    pub fn remove_cluster(&self, id: i64) {
        self.lock().clusters.remove(&id);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub fn mutating_calls(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_mutation).collect()
    }

    pub fn configure_calls(&self) -> Vec<ConfigureRequest> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Configure(_, req) => Some(req),
                _ => None,
            })
            .collect()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    pub fn fail_configure(&self, times: usize, fault: Fault) {
        self.lock()
            .configure_faults
            .extend(std::iter::repeat_n(fault, times));
    }

    pub fn script_job_polls(&self, polls: Vec<Vec<Job>>) {
        self.lock().job_polls.extend(polls);
    }

    pub fn set_configure_job_id(&self, job_id: i64) {
        self.lock().configure_job_id = job_id;
    }

    pub fn set_terse_responses(&self, terse: bool) {
        self.lock().terse_responses = terse;
    }

    pub fn set_provisioning_polls(&self, polls: u32) {
        self.lock().provisioning_polls = polls;
    }

    pub fn set_provision_outcome(&self, status: ClusterStatus, error_message: &str) {
        self.lock().provision_outcome = Some((status, error_message.to_string()));
    }

    pub fn set_deletion_polls(&self, polls: u32) {
        self.lock().deletion_polls = polls;
    }

    pub fn fail_node_call(&self, nth: u32, fault: Fault) {
        self.lock().node_faults.insert(nth, fault);
    }

    pub fn fail_get_cluster(&self, fault: Option<Fault>) {
        self.lock().get_fault = fault;
    }

    fn next_job(state: &mut FakeState) -> i64 {
        state.next_job_id += 1;
        state.next_job_id
    }
}

fn not_found() -> ApiError {
    Fault::NotFound.to_error()
}

fn apply_configure(
    cluster: &mut Cluster,
    req: &ConfigureRequest,
    terse: bool,
) -> ConfigureResponse {
    let mut resp = ConfigureResponse {
        message: "configuration applied".into(),
        ..Default::default()
    };

    for user in &req.users {
        let password = format!("pw-{}", user.username);
        if cluster.find_user(&user.username).is_none() {
            cluster.users.push(ClusterUser {
                username: user.username.clone(),
                password: password.clone(),
            });
        }
        resp.users.push(ConfigUserResponse {
            username: user.username.clone(),
            password: if terse { String::new() } else { password },
        });
    }
    cluster
        .users
        .retain(|u| !req.delete_users.contains(&u.username));
    resp.deleted_users = req.delete_users.clone();

    for db in &req.databases {
        let owner = if db.owner.is_empty() {
            cluster.db_user.clone()
        } else {
            db.owner.clone()
        };
        match cluster.databases.iter_mut().find(|d| d.db_name == db.name) {
            Some(existing) => existing.owner = owner.clone(),
            None => cluster.databases.push(ClusterDatabase {
                db_name: db.name.clone(),
                owner: owner.clone(),
            }),
        }
        resp.databases.push(ConfigDatabaseResponse {
            name: db.name.clone(),
            owner: if terse { String::new() } else { owner },
        });
    }
    cluster
        .databases
        .retain(|d| !req.delete_databases.contains(&d.db_name));
    resp.deleted_databases = req.delete_databases.clone();

    for ext in &req.extensions {
        let database = if ext.database.is_empty() {
            cluster.db_name.clone()
        } else {
            ext.database.clone()
        };
        if cluster.find_extension(&ext.extension, &database).is_none() {
            cluster.extensions.push(ClusterExtension {
                extension: ext.extension.clone(),
                database: database.clone(),
            });
        }
        resp.extensions.push(ConfigExtensionResponse {
            extension: ext.extension.clone(),
            database: if terse { String::new() } else { database },
        });
    }

    for grant in &req.grants {
        match cluster
            .grants
            .iter_mut()
            .find(|g| g.username == grant.username && g.database == grant.database)
        {
            Some(existing) => existing.access = grant.access.clone(),
            None => {
                let id = cluster.grants.len() as i64 + 1;
                cluster.grants.push(ClusterGrant {
                    id,
                    username: grant.username.clone(),
                    database: grant.database.clone(),
                    access: grant.access.clone(),
                    created_at: None,
                });
            }
        }
        resp.grants.push(grant.clone());
    }

    if !req.source_ips.is_empty() || !req.delete_ips.is_empty() {
        let mut ips: BTreeSet<String> = if req.replace_ips {
            BTreeSet::new()
        } else {
            cluster
                .source_ips
                .split(',')
                .filter(|ip| !ip.is_empty())
                .map(str::to_string)
                .collect()
        };
        ips.extend(req.source_ips.iter().cloned());
        for ip in &req.delete_ips {
            ips.remove(ip);
        }
        cluster.source_ips = ips.into_iter().collect::<Vec<_>>().join(",");
        resp.source_ips = req.source_ips.clone();
        resp.deleted_ips = req.delete_ips.clone();
    }

    resp
}

#[async_trait]
impl ApiClient for FakeApi {
    async fn provision_cluster(
        &self,
        req: &ProvisionClusterRequest,
    ) -> ApiResult<ProvisionClusterResponse> {
        let mut state = self.lock();
        state.calls.push(Call::Provision(req.clone()));

        state.next_id += 1;
        let id = state.next_id;
        let tenant_id = format!("t-{}", id);
        let (status, error_message) = state
            .provision_outcome
            .clone()
            .unwrap_or((ClusterStatus::Active, String::new()));

        let cluster = ClusterBuilder::new(id)
            .with_name(&req.name)
            .with_region(&req.region)
            .with_server_type(&req.server_type)
            .with_nodes(req.node_count)
            .with_db_name(&req.db_name)
            .with_db_type(&req.db_type)
            .with_version(req.postgresql_version)
            .with_tenant(&tenant_id)
            .with_status(status, &error_message)
            .build();
        state.clusters.insert(id, cluster);

        let polls = state.provisioning_polls;
        state.provisioning_left.insert(id, polls);

        Ok(ProvisionClusterResponse {
            id,
            tenant_id,
            name: req.name.clone(),
            region: req.region.clone(),
            status: ClusterStatus::Provisioning,
            ..Default::default()
        })
    }

    async fn get_cluster(&self, cluster_id: i64) -> ApiResult<Cluster> {
        let mut state = self.lock();
        state.calls.push(Call::GetCluster(cluster_id));

        if let Some(fault) = state.get_fault {
            return Err(fault.to_error());
        }

        if let Some(left) = state.deleting_left.get_mut(&cluster_id) {
            if *left == 0 {
                state.deleting_left.remove(&cluster_id);
                state.clusters.remove(&cluster_id);
                return Err(not_found());
            }
            *left -= 1;
        }

        let mut cluster = state
            .clusters
            .get(&cluster_id)
            .cloned()
            .ok_or_else(not_found)?;

        if let Some(left) = state.provisioning_left.get_mut(&cluster_id)
            && *left > 0
        {
            *left -= 1;
            cluster.status = ClusterStatus::Provisioning;
            cluster.error_message.clear();
        }

        Ok(cluster)
    }

    async fn list_clusters(&self) -> ApiResult<Vec<Cluster>> {
        let mut state = self.lock();
        state.calls.push(Call::ListClusters);
        Ok(state.clusters.values().cloned().collect())
    }

    async fn delete_cluster(&self, cluster_id: i64) -> ApiResult<()> {
        let mut state = self.lock();
        state.calls.push(Call::DeleteCluster(cluster_id));

        if !state.clusters.contains_key(&cluster_id) {
            return Err(not_found());
        }
        let polls = state.deletion_polls;
        state.deleting_left.insert(cluster_id, polls);
        Ok(())
    }

    async fn add_node(&self, cluster_id: i64) -> ApiResult<AddNodeResponse> {
        let mut state = self.lock();
        state.calls.push(Call::AddNode(cluster_id));

        state.node_calls += 1;
        let nth = state.node_calls;
        if let Some(fault) = state.node_faults.get(&nth) {
            return Err(fault.to_error());
        }

        let job_id = Self::next_job(&mut state);
        let cluster = state.clusters.get_mut(&cluster_id).ok_or_else(not_found)?;
        cluster.node_count += 1;

        Ok(AddNodeResponse {
            message: "node add started".into(),
            job_id,
            new_node_count: cluster.node_count,
            new_node_name: node_name(&cluster.tenant_id, cluster.node_count),
            ..Default::default()
        })
    }

    async fn remove_node(
        &self,
        cluster_id: i64,
        req: &RemoveNodeRequest,
    ) -> ApiResult<RemoveNodeResponse> {
        let mut state = self.lock();
        state
            .calls
            .push(Call::RemoveNode(cluster_id, req.node_name.clone()));

        state.node_calls += 1;
        let nth = state.node_calls;
        if let Some(fault) = state.node_faults.get(&nth) {
            return Err(fault.to_error());
        }

        let job_id = Self::next_job(&mut state);
        let cluster = state.clusters.get_mut(&cluster_id).ok_or_else(not_found)?;
        cluster.node_count -= 1;

        Ok(RemoveNodeResponse {
            message: "node removal started".into(),
            job_id,
            new_node_count: cluster.node_count,
            removed_node: req.node_name.clone(),
            ..Default::default()
        })
    }

    async fn configure(
        &self,
        cluster_id: i64,
        req: &ConfigureRequest,
    ) -> ApiResult<ConfigureResponse> {
        let mut state = self.lock();
        state.calls.push(Call::Configure(cluster_id, req.clone()));

        if let Some(fault) = state.configure_faults.pop_front() {
            return Err(fault.to_error());
        }

        let terse = state.terse_responses;
        let job_id = state.configure_job_id;
        let cluster = state.clusters.get_mut(&cluster_id).ok_or_else(not_found)?;

        let mut resp = apply_configure(cluster, req, terse);
        resp.job_id = job_id;
        Ok(resp)
    }

    async fn list_active_jobs(&self, cluster_id: i64) -> ApiResult<Vec<Job>> {
        let mut state = self.lock();
        state.calls.push(Call::ListJobs(cluster_id));
        Ok(state.job_polls.pop_front().unwrap_or_default())
    }

    async fn get_backup_config(&self, cluster_id: i64) -> ApiResult<BackupConfig> {
        let mut state = self.lock();
        state.calls.push(Call::GetBackupConfig(cluster_id));

        let cluster = state.clusters.get(&cluster_id).ok_or_else(not_found)?;
        Ok(cluster.backup_config.clone().unwrap_or(BackupConfig {
            cluster_id,
            enabled: true,
            schedule: "0 2 * * *".into(),
            retention_full: 7,
            ..Default::default()
        }))
    }

    async fn update_backup_config(
        &self,
        cluster_id: i64,
        req: &UpdateBackupConfigRequest,
    ) -> ApiResult<BackupConfig> {
        let mut state = self.lock();
        state
            .calls
            .push(Call::UpdateBackupConfig(cluster_id, req.clone()));

        let cluster = state.clusters.get_mut(&cluster_id).ok_or_else(not_found)?;
        let config = cluster.backup_config.get_or_insert_with(|| BackupConfig {
            id: 1,
            cluster_id,
            enabled: true,
            schedule: "0 2 * * *".into(),
            retention_full: 7,
            updated_at: None,
        });
        if let Some(enabled) = req.enabled {
            config.enabled = enabled;
        }
        if let Some(schedule) = &req.schedule {
            config.schedule = schedule.clone();
        }
        if let Some(retention) = req.retention_full {
            config.retention_full = retention;
        }
        Ok(config.clone())
    }

    async fn list_server_types(&self) -> ApiResult<ServerTypesResponse> {
        self.lock().calls.push(Call::ListServerTypes);
        Ok(ServerTypesResponse {
            server_types: vec![
                ServerType {
                    type_: "starter".into(),
                    name: "Starter".into(),
                    cpus: 2,
                    memory_gb: 4,
                    storage_gb: 40,
                    price_per_node: 19.0,
                    ..Default::default()
                },
                ServerType {
                    type_: "growth".into(),
                    name: "Growth".into(),
                    cpus: 4,
                    memory_gb: 16,
                    storage_gb: 160,
                    price_per_node: 59.0,
                    ..Default::default()
                },
            ],
            default: "starter".into(),
        })
    }

    async fn list_extensions(&self) -> ApiResult<ExtensionsResponse> {
        self.lock().calls.push(Call::ListExtensions);
        let extensions = vec![
            Extension {
                name: "pgvector".into(),
                category: "ai".into(),
                ..Default::default()
            },
            Extension {
                name: "postgis".into(),
                category: "geo".into(),
                ..Default::default()
            },
            Extension {
                name: "pg_trgm".into(),
                category: "search".into(),
                default: true,
                ..Default::default()
            },
        ];
        Ok(ExtensionsResponse {
            total_count: extensions.len() as u32,
            extensions,
        })
    }
}

// =============================================================================
// Builders
// =============================================================================

/// Builder for remote cluster aggregates
pub struct ClusterBuilder {
    cluster: Cluster,
}

impl ClusterBuilder {
    /// An active two-node cluster with default settings
    pub fn new(id: i64) -> Self {
        Self {
            cluster: Cluster {
                id,
                tenant_id: format!("t-{}", id),
                name: format!("cluster-{}", id),
                region: "eu-central".into(),
                db_type: "ha".into(),
                server_type: "starter".into(),
                node_count: 2,
                postgresql_version: 17,
                db_name: "appdb".into(),
                db_user: "appdb_owner".into(),
                db_password: "secret".into(),
                host: format!("c{}.db.rivestack.io", id),
                status: ClusterStatus::Active,
                health_status: "healthy".into(),
                ..Default::default()
            },
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.cluster.name = name.to_string();
        self
    }

    pub fn with_region(mut self, region: &str) -> Self {
        self.cluster.region = region.to_string();
        self
    }

    pub fn with_server_type(mut self, server_type: &str) -> Self {
        self.cluster.server_type = server_type.to_string();
        self
    }

    pub fn with_nodes(mut self, count: u32) -> Self {
        self.cluster.node_count = count;
        self
    }

    pub fn with_db_name(mut self, db_name: &str) -> Self {
        self.cluster.db_name = db_name.to_string();
        self
    }

    pub fn with_db_type(mut self, db_type: &str) -> Self {
        self.cluster.db_type = db_type.to_string();
        self
    }

    pub fn with_version(mut self, version: u32) -> Self {
        self.cluster.postgresql_version = version;
        self
    }

    pub fn with_tenant(mut self, tenant_id: &str) -> Self {
        self.cluster.tenant_id = tenant_id.to_string();
        self
    }

    pub fn with_status(mut self, status: ClusterStatus, error_message: &str) -> Self {
        self.cluster.status = status;
        self.cluster.error_message = error_message.to_string();
        self
    }

    pub fn with_source_ips(mut self, ips: &str) -> Self {
        self.cluster.source_ips = ips.to_string();
        self
    }

    pub fn with_user(mut self, username: &str, password: &str) -> Self {
        self.cluster.users.push(ClusterUser {
            username: username.to_string(),
            password: password.to_string(),
        });
        self
    }

    pub fn with_database(mut self, name: &str, owner: &str) -> Self {
        self.cluster.databases.push(ClusterDatabase {
            db_name: name.to_string(),
            owner: owner.to_string(),
        });
        self
    }

    pub fn with_extension(mut self, extension: &str, database: &str) -> Self {
        self.cluster.extensions.push(ClusterExtension {
            extension: extension.to_string(),
            database: database.to_string(),
        });
        self
    }

    pub fn with_grant(mut self, username: &str, database: &str, access: &str) -> Self {
        let id = self.cluster.grants.len() as i64 + 1;
        self.cluster.grants.push(ClusterGrant {
            id,
            username: username.to_string(),
            database: database.to_string(),
            access: access.to_string(),
            created_at: None,
        });
        self
    }

    pub fn build(self) -> Cluster {
        self.cluster
    }
}

// =============================================================================
// Desired-state helpers
// =============================================================================

pub fn user_spec(cluster_id: i64, username: &str) -> UserSpec {
    UserSpec {
        cluster_id: ClusterId(cluster_id),
        username: username.to_string(),
    }
}

pub fn database_spec(cluster_id: i64, name: &str, owner: Option<&str>) -> DatabaseSpec {
    DatabaseSpec {
        cluster_id: ClusterId(cluster_id),
        name: name.to_string(),
        owner: owner.map(str::to_string),
    }
}

pub fn extension_spec(cluster_id: i64, extension: &str, database: Option<&str>) -> ExtensionSpec {
    ExtensionSpec {
        cluster_id: ClusterId(cluster_id),
        extension: extension.to_string(),
        database: database.map(str::to_string),
    }
}

pub fn grant_spec(
    cluster_id: i64,
    username: &str,
    database: &str,
    access: AccessLevel,
) -> GrantSpec {
    GrantSpec {
        cluster_id: ClusterId(cluster_id),
        username: username.to_string(),
        database: database.to_string(),
        access,
    }
}

pub fn firewall_spec(cluster_id: i64, ips: &[&str]) -> FirewallSpec {
    FirewallSpec {
        cluster_id: ClusterId(cluster_id),
        source_ips: ips.iter().map(|ip| ip.to_string()).collect(),
    }
}
