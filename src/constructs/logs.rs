// Copyright (c) 2025 - Cowboy AI, Inc.
//! CloudWatch log groups

use crate::app::{ConstructPath, ResourceRef, Stack};
use crate::domain::invariants::validate_log_retention;
use crate::domain::{RemovalPolicy, ResourceType};
use crate::errors::{SynthError, SynthResult};
use crate::template::{Resource, Value};

/// Log group; `retention_days: None` keeps events forever
#[derive(Debug, Clone)]
pub struct LogGroup {
    group: ResourceRef,
    retention_days: Option<u32>,
}

impl LogGroup {
    pub fn new(
        stack: &mut Stack,
        path: ConstructPath,
        retention_days: Option<u32>,
        removal_policy: RemovalPolicy,
    ) -> SynthResult<Self> {
        let mut resource = Resource::new(ResourceType::LogGroup).removal_policy(removal_policy);
        if let Some(days) = retention_days {
            validate_log_retention(days).map_err(|e| SynthError::validation(&path, e))?;
            resource.set_property("RetentionInDays", days);
        }

        let group = stack.add_resource(&path, resource)?;
        Ok(Self {
            group,
            retention_days,
        })
    }

    pub fn reference(&self) -> &ResourceRef {
        &self.group
    }

    pub fn retention_days(&self) -> Option<u32> {
        self.retention_days
    }

    pub fn log_group_name(&self) -> Value {
        Value::Ref(self.group.clone())
    }

    pub fn log_group_arn(&self) -> Value {
        Value::get_att(&self.group, "Arn")
    }
}
