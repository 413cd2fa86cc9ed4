// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reuse-or-create provisioning for one template.
//!
//! Instances matching the template's `vm_name` that no agent owns (or whose
//! agent is stopped) are orphans. Orphans are preferred; a new instance is
//! created only when the folder holds no matching instance at all.

use crate::agent::Agent;
use crate::{CloudRuntime, EngineError};
use std::ops::BitOr;
use std::sync::Arc;
use tender_adapters::{CreateInstanceSpec, InstanceFilter, KeyError, PrivateKey};
use tender_core::{Clock, Instance, InstanceId, InstanceStatus, TemplateConfig};

/// Flag set controlling whether provisioning may create instances
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProvisionOptions(u8);

impl ProvisionOptions {
    pub const NONE: Self = Self(0);
    pub const ALLOW_CREATE: Self = Self(1);
    pub const FORCE_CREATE: Self = Self(1 << 1);

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    fn may_create(self) -> bool {
        self.contains(Self::ALLOW_CREATE) || self.contains(Self::FORCE_CREATE)
    }
}

impl BitOr for ProvisionOptions {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Remote user when the key carries none
const DEFAULT_REMOTE_USER: &str = "root";

/// Cloud-init document granting `key` passwordless sudo on the instance
pub fn user_data(key: &PrivateKey) -> Result<String, KeyError> {
    let user = remote_user(key);
    Ok(format!(
        "#cloud-config\nusers:\n  - name: {user}\n    sudo: ['ALL=(ALL) NOPASSWD:ALL']\n    ssh-authorized-keys:\n      - {} {user}",
        key.authorized_key()?
    ))
}

pub(crate) fn remote_user(key: &PrivateKey) -> &str {
    match key.username().trim() {
        "" => DEFAULT_REMOTE_USER,
        user => user,
    }
}

/// Find or create an instance for `template` and bind it into an agent.
///
/// Returns `Ok(None)` when nothing can be reused and `options` forbid creating.
/// The agent is not attached to the fleet; readiness does that.
pub async fn provision<C: Clock>(
    cloud: &Arc<CloudRuntime<C>>,
    template: &Arc<TemplateConfig>,
    desired: usize,
    options: ProvisionOptions,
) -> Result<Option<Arc<Agent<C>>>, EngineError> {
    let desired = desired.max(1);
    let key = cloud.resolve_key().await?;
    let filter = InstanceFilter::by_name(&template.folder_id, &template.vm_name);

    let instances = cloud.compute().list(&filter).await?;
    let orphans = find_orphans(cloud, instances, desired);
    if orphans.is_empty() && !options.may_create() {
        tracing::info!(
            template = %template.name,
            "no existing instance found and creating is not allowed"
        );
        return Ok(None);
    }

    wake_up(cloud, &orphans).await;
    if let Some(first) = orphans.first() {
        if orphans.len() == desired {
            return Ok(Some(bind(cloud, template, first.clone())));
        }
    }

    let needed = desired - orphans.len();
    let mut created: Option<InstanceId> = None;
    if needed > 0 && cloud.compute().list(&filter).await?.is_empty() {
        let spec = CreateInstanceSpec {
            folder_id: template.folder_id.clone(),
            name: template.vm_name.clone(),
            user_data: user_data(&key)?,
            body: template.spec.clone(),
        };
        let op = cloud.compute().create(&spec).await?;
        if let Some(message) = op.error_message() {
            return Err(EngineError::Client(format!("error for create: {}", message)));
        }
        tracing::info!(template = %template.name, operation = %op.id, "created instance");
        created = op.instance_id;
    }

    let instances = cloud.compute().list(&filter).await?;
    let chosen = pick_after_create(cloud, instances, created.as_ref()).ok_or_else(|| {
        EngineError::Client(format!("no instance named {} is available", template.vm_name))
    })?;
    Ok(Some(bind(cloud, template, chosen)))
}

fn is_orphan<C: Clock>(cloud: &CloudRuntime<C>, instance: &Instance) -> bool {
    if instance.status.is_unusable() || cloud.is_pending(&instance.id) {
        return false;
    }
    !cloud.fleet().contains(&instance.id) || instance.status == InstanceStatus::Stopped
}

/// Orphans in API order, at most `limit`.
fn find_orphans<C: Clock>(
    cloud: &CloudRuntime<C>,
    instances: Vec<Instance>,
    limit: usize,
) -> Vec<Instance> {
    instances.into_iter().filter(|i| is_orphan(cloud, i)).take(limit).collect()
}

/// Start every stopped orphan; failures are logged only.
async fn wake_up<C: Clock>(cloud: &CloudRuntime<C>, orphans: &[Instance]) {
    for instance in orphans.iter().filter(|i| i.status == InstanceStatus::Stopped) {
        match cloud.compute().start(&instance.id).await {
            Ok(op) => match op.error_message() {
                Some(message) => {
                    tracing::warn!(instance_id = %instance.id, error = message, "failed to start instance")
                }
                None => tracing::info!(instance_id = %instance.id, "starting stopped instance"),
            },
            Err(e) => {
                tracing::warn!(instance_id = %instance.id, error = %e, "failed to start instance")
            }
        }
    }
}

/// The created instance when the operation named it, else the first orphan.
fn pick_after_create<C: Clock>(
    cloud: &CloudRuntime<C>,
    instances: Vec<Instance>,
    created: Option<&InstanceId>,
) -> Option<Instance> {
    if let Some(id) = created {
        if let Some(instance) = instances.iter().find(|i| &i.id == id) {
            return Some(instance.clone());
        }
    }
    instances.into_iter().find(|i| is_orphan(cloud, i))
}

fn bind<C: Clock>(
    cloud: &Arc<CloudRuntime<C>>,
    template: &Arc<TemplateConfig>,
    instance: Instance,
) -> Arc<Agent<C>> {
    tracing::info!(
        instance_id = %instance.id,
        template = %template.name,
        status = %instance.status,
        "returning instance"
    );
    cloud.mark_pending(&instance.id);
    cloud.bind_agent(Arc::clone(template), instance)
}

#[cfg(test)]
#[path = "provision_tests.rs"]
mod tests;
