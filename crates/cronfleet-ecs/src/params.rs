//! Job file launch parameters.
//!
//! `NetworkConfiguration` and `Overrides` are kept as opaque JSON until launch
//! time. Keys are PascalCase as in the job files; the camelCase spelling of the
//! ECS API is accepted as well.

use aws_sdk_ecs::types::{
    AssignPublicIp, AwsVpcConfiguration, ContainerOverride, EnvironmentFile, EnvironmentFileType,
    EphemeralStorage, InferenceAcceleratorOverride, KeyValuePair, NetworkConfiguration,
    ResourceRequirement, ResourceType, TaskOverride,
};
use cronfleet_protocols::PlatformError;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
struct NetworkParams {
    #[serde(default, alias = "awsvpcConfiguration")]
    awsvpc_configuration: Option<AwsVpcParams>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
struct AwsVpcParams {
    #[serde(alias = "subnets")]
    subnets: Vec<String>,
    #[serde(default, alias = "securityGroups")]
    security_groups: Vec<String>,
    #[serde(default, alias = "assignPublicIp")]
    assign_public_ip: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
struct OverrideParams {
    #[serde(default, alias = "containerOverrides")]
    container_overrides: Vec<ContainerParams>,
    #[serde(default, alias = "cpu")]
    cpu: Option<String>,
    #[serde(default, alias = "memory")]
    memory: Option<String>,
    #[serde(default, alias = "taskRoleArn")]
    task_role_arn: Option<String>,
    #[serde(default, alias = "executionRoleArn")]
    execution_role_arn: Option<String>,
    #[serde(default, alias = "ephemeralStorage")]
    ephemeral_storage: Option<StorageParams>,
    #[serde(default, alias = "inferenceAcceleratorOverrides")]
    inference_accelerator_overrides: Vec<AcceleratorParams>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct StorageParams {
    #[serde(rename = "SizeInGiB", alias = "sizeInGiB")]
    size_in_gib: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
struct AcceleratorParams {
    #[serde(default, alias = "deviceName")]
    device_name: Option<String>,
    #[serde(default, alias = "deviceType")]
    device_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
struct ContainerParams {
    #[serde(alias = "name")]
    name: String,
    #[serde(default, alias = "command")]
    command: Option<Vec<String>>,
    #[serde(default, alias = "environment")]
    environment: Vec<EnvParam>,
    #[serde(default, alias = "cpu")]
    cpu: Option<i32>,
    #[serde(default, alias = "memory")]
    memory: Option<i32>,
    #[serde(default, alias = "memoryReservation")]
    memory_reservation: Option<i32>,
    #[serde(default, alias = "environmentFiles")]
    environment_files: Vec<TypedValueParam>,
    #[serde(default, alias = "resourceRequirements")]
    resource_requirements: Vec<TypedValueParam>,
}

/// `{Value, Type}` pair used by environment files and resource requirements.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
struct TypedValueParam {
    #[serde(alias = "value")]
    value: String,
    #[serde(alias = "type")]
    r#type: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
struct EnvParam {
    #[serde(alias = "name")]
    name: String,
    #[serde(alias = "value")]
    value: String,
}

fn decode<T: for<'de> Deserialize<'de>>(field: &str, value: &Value) -> Result<T, PlatformError> {
    serde_json::from_value(value.clone()).map_err(|e| invalid(field, e))
}

/// Convert a job's `NetworkConfiguration`. Null means none.
pub fn network_configuration(value: &Value) -> Result<Option<NetworkConfiguration>, PlatformError> {
    if value.is_null() {
        return Ok(None);
    }
    let params: NetworkParams = decode("NetworkConfiguration", value)?;
    let Some(vpc) = params.awsvpc_configuration else {
        return Ok(None);
    };

    let awsvpc = AwsVpcConfiguration::builder()
        .set_subnets(Some(vpc.subnets))
        .set_security_groups((!vpc.security_groups.is_empty()).then_some(vpc.security_groups))
        .set_assign_public_ip(vpc.assign_public_ip.as_deref().map(AssignPublicIp::from))
        .build()
        .map_err(|e| invalid("NetworkConfiguration", e))?;

    Ok(Some(
        NetworkConfiguration::builder()
            .awsvpc_configuration(awsvpc)
            .build(),
    ))
}

/// Convert a job's `Overrides`. Null means none.
pub fn task_override(value: &Value) -> Result<Option<TaskOverride>, PlatformError> {
    if value.is_null() {
        return Ok(None);
    }
    let params: OverrideParams = decode("Overrides", value)?;

    let containers = params
        .container_overrides
        .into_iter()
        .map(container_override)
        .collect::<Result<Vec<_>, _>>()?;

    let ephemeral_storage = params
        .ephemeral_storage
        .map(|storage| {
            EphemeralStorage::builder()
                .size_in_gib(storage.size_in_gib)
                .build()
        });

    let accelerators: Vec<InferenceAcceleratorOverride> = params
        .inference_accelerator_overrides
        .into_iter()
        .map(|a| {
            InferenceAcceleratorOverride::builder()
                .set_device_name(a.device_name)
                .set_device_type(a.device_type)
                .build()
        })
        .collect();

    Ok(Some(
        TaskOverride::builder()
            .set_container_overrides((!containers.is_empty()).then_some(containers))
            .set_cpu(params.cpu)
            .set_memory(params.memory)
            .set_task_role_arn(params.task_role_arn)
            .set_execution_role_arn(params.execution_role_arn)
            .set_ephemeral_storage(ephemeral_storage)
            .set_inference_accelerator_overrides(
                (!accelerators.is_empty()).then_some(accelerators),
            )
            .build(),
    ))
}

fn container_override(c: ContainerParams) -> Result<ContainerOverride, PlatformError> {
    let environment: Vec<KeyValuePair> = c
        .environment
        .into_iter()
        .map(|e| KeyValuePair::builder().name(e.name).value(e.value).build())
        .collect();

    let environment_files = c
        .environment_files
        .into_iter()
        .map(|f| {
            EnvironmentFile::builder()
                .value(f.value)
                .r#type(EnvironmentFileType::from(f.r#type.as_str()))
                .build()
                .map_err(|e| invalid("Overrides.ContainerOverrides.EnvironmentFiles", e))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let requirements = c
        .resource_requirements
        .into_iter()
        .map(|r| {
            ResourceRequirement::builder()
                .value(r.value)
                .r#type(ResourceType::from(r.r#type.as_str()))
                .build()
                .map_err(|e| invalid("Overrides.ContainerOverrides.ResourceRequirements", e))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ContainerOverride::builder()
        .name(c.name)
        .set_command(c.command)
        .set_environment((!environment.is_empty()).then_some(environment))
        .set_environment_files((!environment_files.is_empty()).then_some(environment_files))
        .set_cpu(c.cpu)
        .set_memory(c.memory)
        .set_memory_reservation(c.memory_reservation)
        .set_resource_requirements((!requirements.is_empty()).then_some(requirements))
        .build())
}

fn invalid(field: &str, err: impl std::fmt::Display) -> PlatformError {
    PlatformError::InvalidParameters(format!("{}: {}", field, err))
}

/// Convert both launch parameter blocks of a job, discarding the result.
///
/// Lets startup and `validate` reject a job file before any launch is tried.
pub fn check_launch_params(network: &Value, overrides: &Value) -> Result<(), PlatformError> {
    network_configuration(network)?;
    task_override(overrides)?;
    Ok(())
}
