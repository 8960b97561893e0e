//! Clone pipeline - orchestrates one subsystem clone
//!
//! The pipeline drives a clone through its phases against injected
//! collaborators. Each phase is caught on its own: a failure is recorded and
//! the next phase still runs, except for safety failures, which skip
//! everything that remains.

use crate::adapters::traits::{RowAccess, SafetyGuard, SqlExecutor, SqlGenerator, SqlStatement};
use crate::anonymization::{graph, validate, AnonymizationConfig, AnonymizationEngine, MappingStore};
use crate::core::clone::operation::{CloneError, CloneErrorKind, CloneOperation, OperationStatus};
use crate::core::clone::options::CloneOptions;
use crate::core::clone::phase::{ClonePhase, PhaseCounters, PhaseResult};
use crate::core::state::{checkpoint_key, CheckpointManager};
use crate::core::subsystem::SubsystemDescriptor;
use crate::domain::{BackendError, Environment, RelationalDataset, ReplicaError, Result, SafetyError};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;

/// Errors raised by a single phase
#[derive(Debug)]
struct PhaseFailure(Vec<CloneError>);

impl PhaseFailure {
    fn from_error(phase: ClonePhase, error: ReplicaError) -> Self {
        Self(vec![CloneError::from_error(phase, &error)])
    }

    fn is_safety(&self) -> bool {
        self.0.iter().any(|e| e.kind == CloneErrorKind::Safety)
    }
}

type PhaseOutcome = std::result::Result<PhaseCounters, PhaseFailure>;

/// Mutable state carried between phases of one run
struct RunState {
    descriptor: SubsystemDescriptor,
    store: MappingStore,
    /// Data as it should now exist on the target; used to validate dry runs
    planned: Option<RelationalDataset>,
}

/// Clone pipeline
pub struct ClonePipeline {
    guard: Arc<dyn SafetyGuard + Send + Sync>,
    rows: Arc<dyn RowAccess + Send + Sync>,
    executor: Arc<dyn SqlExecutor + Send + Sync>,
    generator: Arc<dyn SqlGenerator + Send + Sync>,
    checkpoints: Option<CheckpointManager>,
    anonymization: AnonymizationConfig,
    shutdown: Option<watch::Receiver<bool>>,
}

impl ClonePipeline {
    /// Create a pipeline over its collaborators
    pub fn new(
        guard: Arc<dyn SafetyGuard + Send + Sync>,
        rows: Arc<dyn RowAccess + Send + Sync>,
        executor: Arc<dyn SqlExecutor + Send + Sync>,
        generator: Arc<dyn SqlGenerator + Send + Sync>,
    ) -> Self {
        Self {
            guard,
            rows,
            executor,
            generator,
            checkpoints: None,
            anonymization: AnonymizationConfig::default(),
            shutdown: None,
        }
    }

    /// Save and load mapping checkpoints through a manager
    pub fn with_checkpoints(mut self, checkpoints: CheckpointManager) -> Self {
        self.checkpoints = Some(checkpoints);
        self
    }

    /// Masking rules used when a clone anonymizes
    pub fn with_anonymization(mut self, config: AnonymizationConfig) -> Self {
        self.anonymization = config;
        self
    }

    /// Observe a shutdown signal between phases
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.shutdown.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Execute a clone
    ///
    /// Runs the phases in order:
    /// 1. Preparing - validate source and target, load mappings to reuse
    /// 2. Schema, Functions, Triggers - execute generated statements on the target
    /// 3. Data - fetch, anonymize, insert in dependency order, checkpoint mappings
    /// 4. Validation - check foreign keys on the cloned data
    ///
    /// # Errors
    ///
    /// Returns an error only if the options themselves are invalid. Every
    /// failure during the run is reported in the returned operation.
    pub async fn run(&self, options: &CloneOptions) -> Result<CloneOperation> {
        options.validate()?;

        let mut op = CloneOperation::new(
            options.subsystem,
            options.source.id.clone(),
            options.target.id.clone(),
        );
        let mut state = RunState {
            descriptor: options.subsystem.descriptor(),
            store: MappingStore::new(),
            planned: None,
        };

        tracing::info!(
            operation_id = %op.id,
            subsystem = %options.subsystem,
            source = %options.source.id,
            target = %options.target.id,
            anonymize = options.anonymize,
            dry_run = options.dry_run,
            "Starting clone"
        );

        let started = Instant::now();
        let outcome = self.prepare(options, &mut state, &mut op).await;
        let mut abort = self.record(&mut op, ClonePhase::Preparing, outcome, started);

        for phase in ClonePhase::WORK {
            if abort {
                op.phases.push(PhaseResult::skipped(phase));
                continue;
            }
            if self.is_cancelled() {
                tracing::warn!(operation_id = %op.id, next_phase = %phase, "Clone cancelled");
                op.cancelled = true;
                op.add_error(CloneError::new(
                    phase,
                    CloneErrorKind::Cancelled,
                    format!("Cancelled before the {phase} phase"),
                ));
                op.phases.push(PhaseResult::skipped(phase));
                abort = true;
                continue;
            }

            op.status = OperationStatus::running(phase);
            let started = Instant::now();
            let outcome = match phase {
                ClonePhase::Schema | ClonePhase::Functions | ClonePhase::Triggers => {
                    self.apply_statements(phase, options).await
                }
                ClonePhase::Data => self.copy_data(options, &mut state, &mut op).await,
                ClonePhase::Validation => self.validate_target(options, &state, &mut op).await,
                ClonePhase::Preparing => continue,
            };
            abort = self.record(&mut op, phase, outcome, started);
        }

        op.finish();
        op.log_summary();
        Ok(op)
    }

    /// Appends a phase result; returns true when the run must stop
    fn record(
        &self,
        op: &mut CloneOperation,
        phase: ClonePhase,
        outcome: PhaseOutcome,
        started: Instant,
    ) -> bool {
        let duration_ms = started.elapsed().as_millis() as u64;
        match outcome {
            Ok(counters) => {
                tracing::info!(
                    operation_id = %op.id,
                    phase = %phase,
                    tables = counters.tables,
                    functions = counters.functions,
                    triggers = counters.triggers,
                    rows = counters.rows,
                    masked = counters.masked,
                    duration_ms,
                    "Phase completed"
                );
                op.phases.push(PhaseResult::completed(phase, counters, duration_ms));
                false
            }
            Err(failure) => {
                let fatal = failure.is_safety();
                for error in &failure.0 {
                    tracing::error!(
                        operation_id = %op.id,
                        phase = %phase,
                        kind = ?error.kind,
                        error = %error.message,
                        "Phase failed"
                    );
                }
                let messages = failure.0.iter().map(|e| e.message.clone()).collect();
                op.phases.push(PhaseResult::failed(phase, messages, duration_ms));
                op.errors.extend(failure.0);
                fatal
            }
        }
    }

    async fn prepare(
        &self,
        options: &CloneOptions,
        state: &mut RunState,
        op: &mut CloneOperation,
    ) -> PhaseOutcome {
        let phase = ClonePhase::Preparing;
        let safety = |e: SafetyError| PhaseFailure::from_error(phase, e.into());

        self.guard
            .validate_clone_source(&options.source)
            .await
            .map_err(safety)?;
        self.guard
            .validate_clone_target(&options.target)
            .await
            .map_err(safety)?;

        let mut errors = Vec::new();

        if options.resume {
            match &self.checkpoints {
                Some(checkpoints) => {
                    let key = checkpoint_key(options.subsystem, &options.source, &options.target);
                    match checkpoints.load_snapshot(&key).await {
                        Ok(Some(snapshot)) => {
                            if let Err(e) = state.store.import(snapshot) {
                                errors.push(CloneError::from_error(phase, &e).with_context(key));
                            }
                        }
                        Ok(None) => {}
                        Err(e) => op.add_warning(format!(
                            "Mapping checkpoint {key} could not be loaded: {e}"
                        )),
                    }
                }
                None => op.add_warning("Resume requested but no checkpoint storage is configured"),
            }
        }

        if let Some(snapshot) = &options.mapping_snapshot {
            if let Err(e) = state.store.import(snapshot.clone()) {
                errors.push(CloneError::from_error(phase, &e).with_context("mapping snapshot"));
            }
        }

        if !errors.is_empty() {
            return Err(PhaseFailure(errors));
        }

        Ok(PhaseCounters {
            tables: state.descriptor.tables.len(),
            ..PhaseCounters::default()
        })
    }

    fn statements_for(&self, phase: ClonePhase, options: &CloneOptions) -> Vec<SqlStatement> {
        match phase {
            ClonePhase::Schema => self.generator.schema_statements(options.subsystem),
            ClonePhase::Functions => self.generator.function_statements(options.subsystem),
            ClonePhase::Triggers => self.generator.trigger_statements(options.subsystem),
            ClonePhase::Preparing | ClonePhase::Data | ClonePhase::Validation => Vec::new(),
        }
    }

    async fn enforce(&self, phase: ClonePhase, options: &CloneOptions) -> std::result::Result<(), PhaseFailure> {
        let Some(operation) = phase.write_operation() else {
            return Ok(());
        };
        self.guard
            .enforce_read_only_access(&options.target, operation)
            .await
            .map_err(|e| PhaseFailure::from_error(phase, e.into()))
    }

    async fn apply_statements(&self, phase: ClonePhase, options: &CloneOptions) -> PhaseOutcome {
        self.enforce(phase, options).await?;

        let statements = self.statements_for(phase, options);
        if !options.dry_run {
            for statement in &statements {
                tracing::debug!(phase = %phase, statement = %statement.name, "Executing statement");
                self.executor
                    .execute(&options.target, statement)
                    .await
                    .map_err(|e| {
                        PhaseFailure(vec![CloneError::from_error(phase, &e.into())
                            .with_context(statement.name.clone())])
                    })?;
            }
        }

        let mut counters = PhaseCounters::default();
        match phase {
            ClonePhase::Schema => counters.tables = statements.len(),
            ClonePhase::Functions => counters.functions = statements.len(),
            ClonePhase::Triggers => counters.triggers = statements.len(),
            ClonePhase::Preparing | ClonePhase::Data | ClonePhase::Validation => {}
        }
        Ok(counters)
    }

    async fn fetch(
        &self,
        phase: ClonePhase,
        options: &CloneOptions,
        environment: &Environment,
        descriptor: &SubsystemDescriptor,
        filter: Option<&str>,
    ) -> std::result::Result<RelationalDataset, PhaseFailure> {
        let mut dataset = RelationalDataset::new();
        for table in &descriptor.tables {
            let rows = self
                .rows
                .fetch_rows(environment, table, filter)
                .await
                .map_err(|e| backend_failure(phase, e, &table.name))?;
            tracing::debug!(
                subsystem = %options.subsystem,
                environment = %environment.id,
                table = %table.name,
                rows = rows.len(),
                "Fetched rows"
            );
            dataset.add_table(table.clone(), rows);
        }
        Ok(dataset)
    }

    async fn copy_data(
        &self,
        options: &CloneOptions,
        state: &mut RunState,
        op: &mut CloneOperation,
    ) -> PhaseOutcome {
        let phase = ClonePhase::Data;
        self.enforce(phase, options).await?;

        let dataset = self
            .fetch(
                phase,
                options,
                &options.source,
                &state.descriptor,
                options.row_filter.as_deref(),
            )
            .await?;

        let mut masked = 0;
        let dataset = if options.anonymize {
            let config = AnonymizationConfig {
                enabled: true,
                dry_run: false,
                ..self.anonymization.clone()
            };
            let engine = AnonymizationEngine::new(config)
                .map_err(|e| PhaseFailure::from_error(phase, e))?;
            let store = std::mem::take(&mut state.store);
            let outcome = engine
                .process(dataset, store)
                .map_err(|e| PhaseFailure::from_error(phase, e))?;
            for warning in &outcome.report.warnings {
                op.add_warning(warning.clone());
            }
            masked = outcome.report.total_masked();
            state.store = outcome.store;
            outcome.dataset
        } else {
            dataset
        };

        // Checkpointed before the first insert; a failed insert must not lose
        // identifiers already written to the target
        if options.anonymize {
            let snapshot = state.store.export();
            if !options.dry_run {
                if let Some(checkpoints) = &self.checkpoints {
                    let key = checkpoint_key(options.subsystem, &options.source, &options.target);
                    if let Err(e) = checkpoints.save_snapshot(&key, &snapshot).await {
                        op.add_warning(format!("Mapping checkpoint {key} was not saved: {e}"));
                    }
                }
            }
            op.mapping_snapshot = Some(snapshot);
        }

        let relationships = state.descriptor.relationships();
        let order = graph::order(&state.descriptor.table_names(), &relationships);

        let mut rows = 0;
        for name in &order.tables {
            let Some(table) = dataset.table(name) else {
                continue;
            };
            rows += table.rows.len();
            if options.dry_run {
                continue;
            }
            let written = self
                .rows
                .insert_rows(&options.target, &table.descriptor, table.rows.clone())
                .await
                .map_err(|e| backend_failure(phase, e, name))?;
            tracing::debug!(table = %name, rows = written, "Inserted rows");
        }

        let tables = dataset.tables.len();
        state.planned = Some(dataset);

        Ok(PhaseCounters {
            tables,
            rows,
            masked,
            ..PhaseCounters::default()
        })
    }

    async fn validate_target(
        &self,
        options: &CloneOptions,
        state: &RunState,
        op: &mut CloneOperation,
    ) -> PhaseOutcome {
        let phase = ClonePhase::Validation;

        let fetched;
        let dataset = if options.dry_run {
            match &state.planned {
                Some(planned) => planned,
                None => {
                    op.add_warning("Dry run produced no data to validate");
                    return Ok(PhaseCounters::default());
                }
            }
        } else {
            fetched = self
                .fetch(phase, options, &options.target, &state.descriptor, None)
                .await?;
            &fetched
        };

        let report = validate(dataset, &state.descriptor.relationships());
        for warning in report.warnings {
            op.add_warning(warning);
        }

        if !report.is_valid {
            let errors = report
                .errors
                .iter()
                .map(|violation| {
                    CloneError::new(phase, CloneErrorKind::Integrity, violation.to_string())
                        .with_context(format!("{}.{}", violation.table, violation.column))
                })
                .collect();
            return Err(PhaseFailure(errors));
        }

        Ok(PhaseCounters {
            tables: dataset.tables.len(),
            rows: dataset.total_rows(),
            ..PhaseCounters::default()
        })
    }
}

fn backend_failure(phase: ClonePhase, error: BackendError, table: &str) -> PhaseFailure {
    PhaseFailure(vec![
        CloneError::from_error(phase, &error.into()).with_context(table.to_string())
    ])
}
