//! Class query engine: runs one collection cycle over the class path.
//!
//! For each class spec, in order: open a session, run `SELECT * FROM
//! <class>`, walk the instances and emit one record per numeric property
//! as soon as the property has been read.
//! Specs are handled strictly one after the other, each with its own
//! session. The first error of any kind ends the cycle; records emitted
//! before it stay emitted.

use std::time::{Duration, Instant};

use tracing::debug;

use crate::collector::class_path::{ClassPath, ClassSpec};
use crate::collector::error::CollectError;
use crate::collector::instances::{InstanceWalk, ManagedObjectInstance, next_object, object_identity};
use crate::collector::properties::PropertyWalk;
use crate::collector::session::SessionManager;
use crate::collector::traits::{Automation, Session};
use crate::config::CollectorConfig;
use crate::metrics::{MetricEmitter, MetricKind, MetricSink};

/// Counters of one successful cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleStats {
    pub classes: usize,
    pub instances: usize,
    /// Properties read, exported or not.
    pub properties: usize,
    /// Properties dropped because of their type.
    pub skipped: usize,
    /// Records pushed to the sink.
    pub samples: usize,
    pub elapsed: Duration,
}

impl std::fmt::Display for CycleStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} classes, {} instances, {} properties ({} not exported), {} samples in {:.1?}",
            self.classes, self.instances, self.properties, self.skipped, self.samples, self.elapsed
        )
    }
}

/// Every property of every instance of one class, for inspection.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDescription {
    pub spec: ClassSpec,
    pub instances: Vec<ManagedObjectInstance>,
}

/// Runs collection cycles against an automation backend.
pub struct ClassQueryEngine<A: Automation> {
    sessions: SessionManager<A>,
    class_path: String,
    kind: MetricKind,
}

impl<A: Automation> ClassQueryEngine<A> {
    pub fn new(automation: A, config: &CollectorConfig) -> Self {
        Self {
            sessions: SessionManager::new(automation, config.locale.clone()),
            class_path: config.class_path.clone(),
            kind: config.kind,
        }
    }

    pub fn automation(&self) -> &A {
        self.sessions.automation()
    }

    pub fn class_path(&self) -> &str {
        &self.class_path
    }

    /// Kind given to every emitted record.
    pub fn kind(&self) -> MetricKind {
        self.kind
    }

    /// Runs one collection cycle, pushing records into `sink`.
    pub fn collect<S: MetricSink>(&self, sink: &mut S) -> Result<CycleStats, CollectError> {
        let start = Instant::now();
        let mut stats = CycleStats::default();
        let mut emitter = MetricEmitter::new(sink, self.kind);

        for spec in ClassPath::new(&self.class_path).specs() {
            let spec = spec?;
            self.collect_class(&spec, &mut emitter, &mut stats)?;
            stats.classes += 1;
        }

        stats.elapsed = start.elapsed();
        Ok(stats)
    }

    fn collect_class<S: MetricSink>(
        &self,
        spec: &ClassSpec,
        emitter: &mut MetricEmitter<S>,
        stats: &mut CycleStats,
    ) -> Result<(), CollectError> {
        debug!("Collecting {}", spec);
        let class = spec.class_name.as_str();
        self.sessions.scoped(&spec.namespace, |session| {
            let mut cursor = execute(session, spec)?;
            while let Some(object) = next_object(&mut cursor, class)? {
                let identity = object_identity(&object, class)?;
                stats.instances += 1;
                for property in PropertyWalk::open(&object, class, &identity)? {
                    let property = property?;
                    stats.properties += 1;
                    match property.sample() {
                        Some(value) => {
                            emitter.emit(class, &property.name, &identity, value)?;
                            stats.samples += 1;
                        }
                        None => stats.skipped += 1,
                    }
                }
            }
            Ok(())
        })
    }

    /// Reads every property of every configured class without emitting
    /// anything. Fails fast like [`collect`](Self::collect).
    pub fn describe(&self) -> Result<Vec<ClassDescription>, CollectError> {
        let mut classes = Vec::new();
        for spec in ClassPath::new(&self.class_path).specs() {
            let spec = spec?;
            let instances = self.sessions.scoped(&spec.namespace, |session| {
                let cursor = execute(session, &spec)?;
                InstanceWalk::new(cursor, &spec.class_name)
                    .keep_all()
                    .collect::<Result<Vec<_>, _>>()
            })?;
            classes.push(ClassDescription { spec, instances });
        }
        Ok(classes)
    }
}

fn execute<'s, S: Session>(session: &'s S, spec: &ClassSpec) -> Result<S::Instances<'s>, CollectError> {
    session
        .exec_query(&spec.query())
        .map_err(|source| CollectError::Query {
            namespace: spec.namespace.clone(),
            class: spec.class_name.clone(),
            source,
        })
}
