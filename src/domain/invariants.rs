// Copyright (c) 2025 - Cowboy AI, Inc.
//! Pure Validation Functions - Deployment Invariants
//!
//! Business rules checked while constructs are declared, before anything is
//! synthesized. All functions are pure (no side effects) and return detailed
//! validation results.
//!
//! # Invariant Categories
//!
//! 1. **Sizing**: Fargate CPU/memory combinations, health check windows
//! 2. **Naming**: repository names and physical-name uniqueness
//! 3. **Teardown**: nothing is orphaned when a stack is deleted, logs expire
//! 4. **Access**: least-privilege ingress and private database placement

use std::collections::BTreeSet;
use std::time::Duration;

use super::network::{Exposure, Ipv4Cidr, Port, SubnetType};
use super::resource_type::{RemovalPolicy, ResourceType};

/// Validation result with detailed error information
pub type ValidationResult = Result<(), ValidationError>;

/// Validation error with context
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// CPU and memory do not form a Fargate task size
    #[error("Invalid Fargate task size: {cpu} CPU units with {memory_mib} MiB")]
    InvalidFargateSize { cpu: u32, memory_mib: u32 },

    /// Health check timing outside what ECS accepts
    #[error("Health check {field} out of range: {value} (allowed {min}-{max})")]
    HealthCheckOutOfRange {
        field: &'static str,
        value: u64,
        min: u64,
        max: u64,
    },

    /// ECS health check timings are whole seconds
    #[error("Health check {field} is not a whole number of seconds: {value:?}")]
    FractionalHealthCheckSeconds { field: &'static str, value: Duration },

    /// Health check without a command
    #[error("Health check command is empty")]
    EmptyHealthCheckCommand,

    /// Target group health check path
    #[error("Invalid health check path: {0}")]
    InvalidHealthCheckPath(String),

    /// Target group success codes
    #[error("Invalid HTTP success codes: {0}")]
    InvalidSuccessCodes(String),

    /// ECR naming rules
    #[error("Invalid repository name: {0}")]
    InvalidRepositoryName(String),

    /// Deleting the stack would leave a non-empty repository behind
    #[error("Repository {0} is destroyed with its stack but not emptied on delete")]
    OrphanedRepository(String),

    /// Ingress broader than the group's exposure allows
    #[error("Ingress rule violates least privilege: {0}")]
    OverlyBroadIngress(String),

    /// Databases stay out of public subnets
    #[error("Database cannot be placed in {0} subnets")]
    PublicDatabase(SubnetType),

    /// CloudWatch Logs only accepts fixed retention periods
    #[error("Invalid log retention: {0} days")]
    InvalidLogRetention(u32),

    /// Physical names collide within one account and region
    #[error("Physical name '{name}' is declared by more than one {resource_type}")]
    DuplicatePhysicalName {
        resource_type: ResourceType,
        name: String,
    },
}

/// Validate a Fargate CPU/memory combination
///
/// # Rules
/// - 256 CPU: 512, 1024 or 2048 MiB
/// - 512 CPU: 1-4 GiB in 1 GiB steps
/// - 1024 CPU: 2-8 GiB in 1 GiB steps
/// - 2048 CPU: 4-16 GiB in 1 GiB steps
/// - 4096 CPU: 8-30 GiB in 1 GiB steps
/// - 8192 CPU: 16-60 GiB in 4 GiB steps
/// - 16384 CPU: 32-120 GiB in 8 GiB steps
pub fn validate_fargate_size(cpu: u32, memory_mib: u32) -> ValidationResult {
    let valid = match cpu {
        256 => matches!(memory_mib, 512 | 1024 | 2048),
        512 => in_steps(memory_mib, 1024, 4096, 1024),
        1024 => in_steps(memory_mib, 2048, 8192, 1024),
        2048 => in_steps(memory_mib, 4096, 16384, 1024),
        4096 => in_steps(memory_mib, 8192, 30720, 1024),
        8192 => in_steps(memory_mib, 16384, 61440, 4096),
        16384 => in_steps(memory_mib, 32768, 122880, 8192),
        _ => false,
    };

    if !valid {
        return Err(ValidationError::InvalidFargateSize { cpu, memory_mib });
    }
    Ok(())
}

fn in_steps(value: u32, min: u32, max: u32, step: u32) -> bool {
    (min..=max).contains(&value) && (value - min) % step == 0
}

fn check_range(field: &'static str, value: u64, min: u64, max: u64) -> ValidationResult {
    if value < min || value > max {
        return Err(ValidationError::HealthCheckOutOfRange {
            field,
            value,
            min,
            max,
        });
    }
    Ok(())
}

fn check_seconds(field: &'static str, value: Duration, min: u64, max: u64) -> ValidationResult {
    if value.subsec_nanos() != 0 {
        return Err(ValidationError::FractionalHealthCheckSeconds { field, value });
    }
    check_range(field, value.as_secs(), min, max)
}

/// Validate a container health check
///
/// # Rules
/// - Command must not be empty
/// - Interval 5-300 s, timeout 2-60 s, retries 1-10, start period 0-300 s
/// - Timings are whole seconds
pub fn validate_container_health_check(
    command: &[String],
    interval: Duration,
    timeout: Duration,
    retries: u32,
    start_period: Duration,
) -> ValidationResult {
    if command.is_empty() || command.iter().all(|part| part.trim().is_empty()) {
        return Err(ValidationError::EmptyHealthCheckCommand);
    }

    check_seconds("interval", interval, 5, 300)?;
    check_seconds("timeout", timeout, 2, 60)?;
    check_range("retries", u64::from(retries), 1, 10)?;
    check_seconds("start period", start_period, 0, 300)?;
    Ok(())
}

/// Validate a load balancer target group health check
///
/// # Rules
/// - Path starts with `/`
/// - Success codes are a code, a comma list, or a range, each within 200-499
pub fn validate_target_health_check(path: &str, healthy_http_codes: &str) -> ValidationResult {
    if !path.starts_with('/') || path.chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidHealthCheckPath(path.to_string()));
    }

    let invalid = || ValidationError::InvalidSuccessCodes(healthy_http_codes.to_string());
    let parse_code = |s: &str| -> Result<u16, ValidationError> {
        let code = s.trim().parse::<u16>().map_err(|_| invalid())?;
        if (200..=499).contains(&code) {
            Ok(code)
        } else {
            Err(invalid())
        }
    };

    if healthy_http_codes.is_empty() {
        return Err(invalid());
    }

    for part in healthy_http_codes.split(',') {
        match part.split_once('-') {
            Some((low, high)) => {
                if parse_code(low)? > parse_code(high)? {
                    return Err(invalid());
                }
            }
            None => {
                parse_code(part)?;
            }
        }
    }

    Ok(())
}

/// Validate an ECR repository name
///
/// # Rules
/// - 2-256 characters
/// - Lowercase alphanumeric segments joined by single `.`, `_`, `-` or `/`
/// - Cannot start or end with a separator
pub fn validate_repository_name(name: &str) -> ValidationResult {
    let invalid = || Err(ValidationError::InvalidRepositoryName(name.to_string()));

    if name.len() < 2 || name.len() > 256 {
        return invalid();
    }

    let is_separator = |c: char| matches!(c, '.' | '_' | '-' | '/');
    let mut previous_was_separator = true;

    for ch in name.chars() {
        if is_separator(ch) {
            if previous_was_separator {
                return invalid();
            }
            previous_was_separator = true;
        } else if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            previous_was_separator = false;
        } else {
            return invalid();
        }
    }

    if previous_was_separator {
        return invalid();
    }
    Ok(())
}

/// Validate that deleting a repository cannot orphan images
///
/// # Rules
/// - A repository destroyed with its stack must be emptied on delete,
///   since deletion of a non-empty repository fails and leaves it behind
pub fn validate_repository_teardown(
    name: &str,
    removal_policy: RemovalPolicy,
    empty_on_delete: bool,
) -> ValidationResult {
    if removal_policy == RemovalPolicy::Destroy && !empty_on_delete {
        return Err(ValidationError::OrphanedRepository(name.to_string()));
    }
    Ok(())
}

/// Validate an ingress rule against the group's exposure
///
/// # Rules
/// - No group opens every port
/// - Internal groups never accept `0.0.0.0/0`
/// - Internet-facing groups accept `0.0.0.0/0` on one explicit port only
///
/// `source` is `None` when the peer is another security group.
pub fn validate_ingress_rule(
    exposure: Exposure,
    source: Option<&Ipv4Cidr>,
    port: &Port,
) -> ValidationResult {
    let source_label = source
        .map(ToString::to_string)
        .unwrap_or_else(|| "security group".to_string());

    if port.covers_all_ports() {
        return Err(ValidationError::OverlyBroadIngress(format!(
            "{} opened to {}",
            port.label(),
            source_label
        )));
    }

    if let Some(cidr) = source {
        if cidr.is_any() {
            match exposure {
                Exposure::Internal => {
                    return Err(ValidationError::OverlyBroadIngress(format!(
                        "internal group accepts {} on {}",
                        source_label, port
                    )));
                }
                Exposure::InternetFacing if !port.is_single_port() => {
                    return Err(ValidationError::OverlyBroadIngress(format!(
                        "internet-facing group accepts {} on range {}",
                        source_label, port
                    )));
                }
                Exposure::InternetFacing => {}
            }
        }
    }

    Ok(())
}

/// Validate database subnet placement
///
/// # Rules
/// - Database clusters are never placed in public subnets
pub fn validate_database_placement(subnet_type: SubnetType) -> ValidationResult {
    if subnet_type.is_public() {
        return Err(ValidationError::PublicDatabase(subnet_type));
    }
    Ok(())
}

/// Retention periods CloudWatch Logs accepts, in days
pub const LOG_RETENTION_DAYS: [u32; 22] = [
    1, 3, 5, 7, 14, 30, 60, 90, 120, 150, 180, 365, 400, 545, 731, 1096, 1827, 2192, 2557, 2922,
    3288, 3653,
];

/// Validate a log group retention period
pub fn validate_log_retention(days: u32) -> ValidationResult {
    if !LOG_RETENTION_DAYS.contains(&days) {
        return Err(ValidationError::InvalidLogRetention(days));
    }
    Ok(())
}

/// Validate that physical names are unique per resource type
///
/// Callers pass the names declared within one account/region scope.
pub fn validate_unique_physical_names<'a>(
    names: impl IntoIterator<Item = (ResourceType, &'a str)>,
) -> ValidationResult {
    let mut seen: BTreeSet<(ResourceType, &str)> = BTreeSet::new();
    for (resource_type, name) in names {
        if !seen.insert((resource_type, name)) {
            return Err(ValidationError::DuplicatePhysicalName {
                resource_type,
                name: name.to_string(),
            });
        }
    }
    Ok(())
}
