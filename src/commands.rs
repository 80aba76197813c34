//! One-shot subcommands.

use std::path::Path;

use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};

use cronfleet_config::{ConfigLoader, ConfigValidator, JobSet};
use cronfleet_ecs::check_launch_params;

use crate::server::load_jobs;

/// Check the configuration and job files, printing every problem found.
pub(crate) fn validate(config_path: &Path, dag_dir: &Path) -> Result<()> {
    let config = ConfigLoader::read(config_path)?;
    let result = ConfigValidator::validate(&config);

    for warning in &result.warnings {
        println!("warning: {}: {}", warning.path, warning.message);
    }
    for error in &result.errors {
        println!("error: {}", error);
    }

    let jobs = load_jobs(dag_dir)?;
    let mut bad_jobs = 0;
    for job in jobs.iter() {
        println!(
            "job {}: \"{}\" on {} ({})",
            job.id,
            job.schedule.expression(),
            job.cluster,
            job.task_definition
        );
        if let Err(e) = check_launch_params(&job.network_configuration, &job.overrides) {
            println!("error: job {}: {}", job.id, e);
            bad_jobs += 1;
        }
    }

    if !result.is_valid() {
        anyhow::bail!(
            "{} has {} error(s)",
            config_path.display(),
            result.errors.len()
        );
    }
    if bad_jobs > 0 {
        anyhow::bail!("{} job(s) have invalid launch parameters", bad_jobs);
    }
    println!("{} job(s) OK", jobs.len());
    Ok(())
}

/// Print the next `count` due instants of every job after `now`.
pub(crate) fn next(dag_dir: &Path, count: usize, now: DateTime<Utc>) -> Result<()> {
    let jobs = load_jobs(dag_dir)?;
    for (id, instants) in upcoming(&jobs, count, now) {
        let rendered: Vec<String> = instants
            .iter()
            .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
            .collect();
        println!("{}: {}", id, rendered.join(", "));
    }
    Ok(())
}

fn upcoming(jobs: &JobSet, count: usize, now: DateTime<Utc>) -> Vec<(String, Vec<DateTime<Utc>>)> {
    jobs.iter()
        .map(|job| {
            let mut instants = Vec::with_capacity(count);
            let mut cursor = now;
            while instants.len() < count {
                let Some(next) = job.schedule.next_after(&cursor) else {
                    break;
                };
                instants.push(next);
                cursor = next;
            }
            (job.id.clone(), instants)
        })
        .collect()
}
