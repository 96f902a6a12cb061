// src/config/validate.rs

use globset::Glob;

use crate::config::model::{ProjectConfig, RawProjectConfig, RunSettings, WatchSettings};
use crate::errors::{Result, WsrunError};
use crate::types::parse_duration;

impl TryFrom<RawProjectConfig> for ProjectConfig {
    type Error = WsrunError;

    fn try_from(raw: RawProjectConfig) -> std::result::Result<Self, Self::Error> {
        validate_workspace(&raw)?;
        validate_filters(&raw)?;
        let run = validate_run(&raw)?;
        let watch = validate_watch(&raw)?;

        Ok(ProjectConfig {
            workspace_members: raw.workspace.members,
            filters: raw.filters,
            run,
            watch,
        })
    }
}

fn validate_workspace(cfg: &RawProjectConfig) -> Result<()> {
    if let Some(members) = &cfg.workspace.members {
        for pattern in members {
            let glob = pattern.strip_prefix('!').unwrap_or(pattern);
            Glob::new(glob).map_err(|e| {
                WsrunError::Config(format!("[workspace].members has invalid glob '{pattern}': {e}"))
            })?;
        }
    }
    Ok(())
}

fn validate_filters(cfg: &RawProjectConfig) -> Result<()> {
    for (name, filter) in cfg.filters.iter() {
        if name.trim().is_empty() {
            return Err(WsrunError::Config("named filters must have a non-empty name".to_string()));
        }
        if name.starts_with('@') {
            return Err(WsrunError::Config(format!(
                "named filter '{name}' must not start with '@' (reserved for explicit references)"
            )));
        }
        if filter.patterns.iter().any(|p| p.trim().is_empty()) {
            return Err(WsrunError::Config(format!(
                "named filter '{name}' contains an empty pattern"
            )));
        }
    }
    Ok(())
}

fn validate_run(cfg: &RawProjectConfig) -> Result<RunSettings> {
    if cfg.run.jobs == Some(0) {
        return Err(WsrunError::Config("[run].jobs must be >= 1 (got 0)".to_string()));
    }

    let timeout = cfg
        .run
        .timeout
        .as_deref()
        .map(parse_duration)
        .transpose()
        .map_err(|e| WsrunError::Config(format!("[run].timeout: {e}")))?;

    Ok(RunSettings {
        jobs: cfg.run.jobs,
        timeout,
    })
}

fn validate_watch(cfg: &RawProjectConfig) -> Result<WatchSettings> {
    let poll_interval = parse_duration(&cfg.watch.poll_interval)
        .map_err(|e| WsrunError::Config(format!("[watch].poll_interval: {e}")))?;
    if poll_interval.is_zero() {
        return Err(WsrunError::Config(
            "[watch].poll_interval must be greater than zero".to_string(),
        ));
    }

    let debounce = parse_duration(&cfg.watch.debounce)
        .map_err(|e| WsrunError::Config(format!("[watch].debounce: {e}")))?;

    for pattern in &cfg.watch.exclude {
        Glob::new(pattern).map_err(|e| {
            WsrunError::Config(format!("[watch].exclude has invalid glob '{pattern}': {e}"))
        })?;
    }

    Ok(WatchSettings {
        poll_interval,
        debounce,
        rerun: cfg.watch.rerun,
        exclude: cfg.watch.exclude.clone(),
        use_hash: cfg.watch.use_hash,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RerunScope;
    use std::time::Duration;

    fn parse(toml_src: &str) -> Result<ProjectConfig> {
        let raw: RawProjectConfig = toml::from_str(toml_src)?;
        ProjectConfig::try_from(raw)
    }

    #[test]
    fn empty_config_uses_defaults() {
        let cfg = parse("").unwrap();
        assert!(cfg.workspace_members.is_none());
        assert!(cfg.filters.is_empty());
        assert_eq!(cfg.watch.poll_interval, Duration::from_millis(500));
        assert_eq!(cfg.watch.debounce, Duration::from_millis(100));
        assert_eq!(cfg.watch.rerun, RerunScope::All);
        assert!(cfg.run.timeout.is_none());
    }

    #[test]
    fn full_config_round_trips_into_settings() {
        let cfg = parse(
            r#"
[workspace]
members = ["packages/*", "!packages/legacy"]

[filters.base]
patterns = ["pkg-*"]

[filters.public]
patterns = ["!pkg-internal"]
extends = "base"
description = "Everything we publish"

[run]
jobs = 4
timeout = "2m"

[watch]
poll_interval = "250ms"
debounce = "50ms"
rerun = "affected"
use_hash = true
"#,
        )
        .unwrap();

        assert_eq!(cfg.workspace_members.as_ref().map(Vec::len), Some(2));
        assert_eq!(cfg.filters["public"].extends.as_deref(), Some("base"));
        assert_eq!(cfg.run.jobs, Some(4));
        assert_eq!(cfg.run.timeout, Some(Duration::from_secs(120)));
        assert_eq!(cfg.watch.rerun, RerunScope::Affected);
        assert!(cfg.watch.use_hash);
    }

    #[test]
    fn zero_jobs_is_rejected() {
        let err = parse("[run]\njobs = 0\n").unwrap_err();
        assert!(matches!(err, WsrunError::Config(msg) if msg.contains("jobs")));
    }

    #[test]
    fn bad_durations_are_config_errors() {
        assert!(matches!(parse("[watch]\npoll_interval = \"0ms\"\n"), Err(WsrunError::Config(_))));
        assert!(matches!(parse("[run]\ntimeout = \"soon\"\n"), Err(WsrunError::Config(_))));
    }

    #[test]
    fn unknown_rerun_scope_fails_to_parse() {
        assert!(matches!(parse("[watch]\nrerun = \"some\"\n"), Err(WsrunError::Toml(_))));
    }
}
