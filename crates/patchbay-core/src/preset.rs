// ── Preset application ──
//
// Resolves a preset's alias pairs to concrete ports, then drives the
// reconciler. Resolution is strict: a name missing from the alias table is
// a failure for that connection, never passed through as a port name.

use serde::Serialize;
use tracing::info;

use crate::error::CoreError;
use crate::events::{ChangeAction, ConnectionChange, EventBus};
use crate::model::{ConnectionKey, Preset, PresetConnection, PresetSummary};
use crate::reconciler::{ItemOutcome, Reconciler};
use crate::tables::{AliasTable, PresetTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplyOptions {
    /// Remove every existing connection before connecting.
    pub clear_first: bool,
    /// Resolve only; touch nothing.
    pub dry_run: bool,
}

impl Default for ApplyOptions {
    fn default() -> Self {
        Self {
            clear_first: true,
            dry_run: false,
        }
    }
}

/// A preset connection with its aliases resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedConnection {
    pub from_alias: String,
    pub to_alias: String,
    pub from: String,
    pub to: String,
}

impl ResolvedConnection {
    fn key(&self) -> ConnectionKey {
        ConnectionKey::new(&*self.from, &*self.to)
    }
}

/// A preset connection with at least one unknown alias.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnresolvedConnection {
    pub from_alias: String,
    pub to_alias: String,
    /// The aliases that were not found.
    pub missing: Vec<String>,
}

impl UnresolvedConnection {
    fn error(&self) -> String {
        self.missing
            .iter()
            .map(|alias| {
                CoreError::AliasNotFound {
                    alias: alias.clone(),
                }
                .to_string()
            })
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub preset: String,
    pub valid: Vec<ResolvedConnection>,
    pub invalid: Vec<UnresolvedConnection>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.invalid.is_empty()
    }
}

/// One preset connection's result, in preset order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PresetItem {
    pub from_alias: String,
    pub to_alias: String,
    pub from: Option<String>,
    pub to: Option<String>,
    pub outcome: ItemOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PresetApplyReport {
    pub preset: String,
    pub description: String,
    pub cleared_first: bool,
    pub dry_run: bool,
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub items: Vec<PresetItem>,
}

/// Applies named presets through the reconciler.
#[derive(Clone)]
pub struct PresetApplier {
    reconciler: Reconciler,
    aliases: AliasTable,
    presets: PresetTable,
    events: EventBus,
}

enum Resolution {
    Resolved(ResolvedConnection),
    Unresolved(UnresolvedConnection),
}

impl PresetApplier {
    pub fn new(
        reconciler: Reconciler,
        aliases: AliasTable,
        presets: PresetTable,
        events: EventBus,
    ) -> Self {
        Self {
            reconciler,
            aliases,
            presets,
            events,
        }
    }

    /// Every preset with its description and size.
    pub fn list(&self) -> Vec<PresetSummary> {
        self.presets.list()
    }

    fn preset(&self, name: &str) -> Result<Preset, CoreError> {
        self.presets.get(name).ok_or_else(|| CoreError::PresetNotFound {
            name: name.to_owned(),
        })
    }

    fn resolve(&self, pair: &PresetConnection) -> Resolution {
        let from = self.aliases.resolve(&pair.from);
        let to = self.aliases.resolve(&pair.to);
        match (from, to) {
            (Some(from), Some(to)) => Resolution::Resolved(ResolvedConnection {
                from_alias: pair.from.clone(),
                to_alias: pair.to.clone(),
                from,
                to,
            }),
            (from, to) => {
                let missing = [(from, &pair.from), (to, &pair.to)]
                    .into_iter()
                    .filter(|(port, _)| port.is_none())
                    .map(|(_, alias)| alias.clone())
                    .collect();
                Resolution::Unresolved(UnresolvedConnection {
                    from_alias: pair.from.clone(),
                    to_alias: pair.to.clone(),
                    missing,
                })
            }
        }
    }

    /// Resolve every alias pair of `name` with no side effects.
    pub fn validate(&self, name: &str) -> Result<ValidationReport, CoreError> {
        let preset = self.preset(name)?;
        let mut report = ValidationReport {
            preset: preset.name.clone(),
            valid: Vec::new(),
            invalid: Vec::new(),
        };
        for pair in &preset.connections {
            match self.resolve(pair) {
                Resolution::Resolved(r) => report.valid.push(r),
                Resolution::Unresolved(u) => report.invalid.push(u),
            }
        }
        Ok(report)
    }

    /// Apply preset `name`.
    ///
    /// Unresolvable pairs are reported as failed items. With `dry_run` the
    /// report has the same shape, resolved pairs marked `validated`, and
    /// nothing is touched.
    pub async fn apply(
        &self,
        name: &str,
        options: ApplyOptions,
    ) -> Result<PresetApplyReport, CoreError> {
        let preset = self.preset(name)?;
        let resolutions: Vec<Resolution> =
            preset.connections.iter().map(|p| self.resolve(p)).collect();

        let pairs: Vec<ConnectionKey> = resolutions
            .iter()
            .filter_map(|r| match r {
                Resolution::Resolved(r) => Some(r.key()),
                Resolution::Unresolved(_) => None,
            })
            .collect();

        let outcomes: Vec<ItemOutcome> = if options.dry_run {
            vec![ItemOutcome::Validated; pairs.len()]
        } else if options.clear_first {
            self.reconciler
                .replace_all(&pairs)
                .await?
                .result
                .items
                .into_iter()
                .map(|item| item.outcome)
                .collect()
        } else {
            self.reconciler
                .bulk_connect(&pairs)
                .await
                .items
                .into_iter()
                .map(|item| item.outcome)
                .collect()
        };
        let mut outcomes = outcomes.into_iter();

        let mut report = PresetApplyReport {
            preset: preset.name.clone(),
            description: preset.description.clone(),
            cleared_first: options.clear_first && !options.dry_run,
            dry_run: options.dry_run,
            total: 0,
            successful: 0,
            failed: 0,
            items: Vec::with_capacity(resolutions.len()),
        };

        for resolution in resolutions {
            let item = match resolution {
                Resolution::Resolved(r) => PresetItem {
                    outcome: outcomes.next().unwrap_or_else(|| ItemOutcome::Failed {
                        error: "no result recorded".into(),
                    }),
                    from_alias: r.from_alias,
                    to_alias: r.to_alias,
                    from: Some(r.from),
                    to: Some(r.to),
                },
                Resolution::Unresolved(u) => PresetItem {
                    outcome: ItemOutcome::Failed { error: u.error() },
                    from_alias: u.from_alias,
                    to_alias: u.to_alias,
                    from: None,
                    to: None,
                },
            };
            report.total += 1;
            if item.outcome.is_success() {
                report.successful += 1;
            } else {
                report.failed += 1;
            }
            report.items.push(item);
        }

        if !options.dry_run {
            info!(
                preset = %report.preset,
                successful = report.successful,
                failed = report.failed,
                cleared_first = report.cleared_first,
                "preset applied"
            );
            self.events.connection_changed(ConnectionChange::detail(
                ChangeAction::PresetApplied,
                report.preset.clone(),
            ));
        }
        Ok(report)
    }
}
