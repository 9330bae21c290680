//! Build-time dependency graph validation
//!
//! Nodes are registered keys; edges come from [`Registration::dependencies`].
//! A depth-first walk from every registration, in registration order,
//! collects every missing dependency and every cycle before reporting, so a
//! single error lists everything that needs fixing.

use crate::storage::RegistryView;
use crate::{Key, Problem, Registration, ValidationError};
use ahash::AHashMap;

#[cfg(feature = "logging")]
use tracing::{debug, trace};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    /// On the current traversal path
    Gray,
    /// Fully explored
    Black,
}

struct Walker<'a> {
    view: RegistryView<'a>,
    marks: AHashMap<&'a Key, Mark>,
    path: Vec<&'a Key>,
    problems: Vec<Problem>,
}

impl<'a> Walker<'a> {
    fn visit(&mut self, registration: &'a Registration) {
        let key = registration.key();
        self.marks.insert(key, Mark::Gray);
        self.path.push(key);

        for edge in registration.dependencies() {
            if edge.target.is_container() {
                continue;
            }

            let Some(dependency) = self.view.get(edge.target) else {
                if !edge.optional {
                    #[cfg(feature = "logging")]
                    trace!(
                        target: "keyed_injector",
                        service = %key,
                        missing = %edge.target,
                        param = edge.param,
                        "Missing dependency"
                    );
                    self.problems.push(Problem::MissingDependency {
                        key: edge.target.clone(),
                        required_by: key.clone(),
                        param: edge.param.to_owned(),
                    });
                }
                continue;
            };

            match self.marks.get(dependency.key()).copied() {
                None => self.visit(dependency),
                Some(Mark::Gray) => self.record_cycle(dependency.key()),
                Some(Mark::Black) => {}
            }
        }

        self.path.pop();
        self.marks.insert(key, Mark::Black);
    }

    /// Record the path from where `key` turned gray back to itself
    fn record_cycle(&mut self, key: &'a Key) {
        let Some(start) = self.path.iter().position(|k| *k == key) else {
            return;
        };

        let mut path: Vec<Key> = self.path[start..].iter().map(|k| Key::clone(k)).collect();
        path.push(key.clone());

        #[cfg(feature = "logging")]
        trace!(
            target: "keyed_injector",
            length = path.len() - 1,
            "Cycle detected"
        );

        self.problems.push(Problem::Cycle { path });
    }
}

/// Validate every registration reachable through `view`.
pub(crate) fn validate(view: RegistryView<'_>) -> Result<(), ValidationError> {
    let mut walker = Walker {
        view,
        marks: AHashMap::with_capacity(view.len()),
        path: Vec::new(),
        problems: Vec::new(),
    };

    for registration in view.iter() {
        if !walker.marks.contains_key(registration.key()) {
            walker.visit(registration);
        }
    }

    #[cfg(feature = "logging")]
    debug!(
        target: "keyed_injector",
        services = view.len(),
        problems = walker.problems.len(),
        "Dependency graph validated"
    );

    if walker.problems.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::new(walker.problems))
    }
}
