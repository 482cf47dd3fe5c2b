//! Test utilities
//!
//! Proptest generators for version identifiers and a scriptable builder for
//! exercising the coordinator.

#[cfg(test)]
pub mod generators {
    use proptest::prelude::*;

    /// Generate a release tag such as `v1.4.2`
    pub fn release_tag() -> impl Strategy<Value = String> {
        (0u32..5, 0u32..20, 0u32..20)
            .prop_map(|(major, minor, patch)| format!("v{major}.{minor}.{patch}"))
    }

    /// Generate a suffix used for tagged variants of a release
    pub fn variant_suffix() -> impl Strategy<Value = String> {
        "[a-z]{3,10}"
    }

    /// Generate a branch name that does not look like a release
    pub fn branch_name() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("master".to_string()),
            Just("main".to_string()),
            Just("develop".to_string()),
        ]
    }

    /// Generate a mixed list of tags, tagged variants and branches
    pub fn version_list() -> impl Strategy<Value = Vec<String>> {
        prop::collection::vec(
            prop_oneof![
                release_tag(),
                (release_tag(), variant_suffix()).prop_map(|(tag, s)| format!("{tag}-{s}")),
                branch_name(),
            ],
            0..20,
        )
    }
}

#[cfg(test)]
pub use fake::FakeBuilder;

#[cfg(test)]
mod fake {
    use std::collections::{BTreeSet, HashMap};
    use std::sync::{Arc, Mutex};

    use futures::future::BoxFuture;
    use futures::FutureExt;
    use tokio::sync::Notify;

    use crate::core::coordinator::{BuildOutcome, BuildRequest, VersionBuilder};
    use crate::error::BuildError;

    /// Builder that records what it was asked to build
    ///
    /// Versions can be scripted to fail, panic, or block until released.
    #[derive(Debug, Default)]
    pub struct FakeBuilder {
        built: Mutex<Vec<String>>,
        running: Mutex<Option<String>>,
        failing: BTreeSet<String>,
        panicking: BTreeSet<String>,
        gates: HashMap<String, Arc<Notify>>,
    }

    impl FakeBuilder {
        pub fn new() -> Self {
            Self::default()
        }

        #[must_use]
        pub fn failing(mut self, version: &str) -> Self {
            self.failing.insert(version.to_string());
            self
        }

        #[must_use]
        pub fn panicking(mut self, version: &str) -> Self {
            self.panicking.insert(version.to_string());
            self
        }

        /// Block builds of `version` until [`FakeBuilder::release`] is called
        #[must_use]
        pub fn gated(mut self, version: &str) -> Self {
            self.gates
                .insert(version.to_string(), Arc::new(Notify::new()));
            self
        }

        pub fn release(&self, version: &str) {
            if let Some(gate) = self.gates.get(version) {
                gate.notify_one();
            }
        }

        /// Versions in the order their builds completed
        pub fn built(&self) -> Vec<String> {
            self.built.lock().unwrap().clone()
        }

        pub fn build_count(&self, version: &str) -> usize {
            self.built().iter().filter(|v| *v == version).count()
        }

        pub fn running_version(&self) -> Option<String> {
            self.running.lock().unwrap().clone()
        }
    }

    impl VersionBuilder for FakeBuilder {
        fn build<'a>(&'a self, request: BuildRequest<'a>) -> BoxFuture<'a, BuildOutcome> {
            async move {
                let version = request.version;
                if self.panicking.contains(version) {
                    panic!("boom while building {version}");
                }

                *self.running.lock().unwrap() = Some(version.to_string());
                if let Some(gate) = self.gates.get(version) {
                    gate.notified().await;
                }
                tokio::task::yield_now().await;
                *self.running.lock().unwrap() = None;
                self.built.lock().unwrap().push(version.to_string());

                if self.failing.contains(version) {
                    Err(BuildError::Command {
                        version: version.to_string(),
                        status: "exit status: 1".to_string(),
                        output_tail: "scripted failure".to_string(),
                    })
                } else {
                    Ok(())
                }
            }
            .boxed()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::generators::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn test_release_tag_generator(tag in release_tag()) {
            prop_assert!(tag.starts_with('v'));
            prop_assert_eq!(tag[1..].split('.').count(), 3);
        }

        #[test]
        fn test_version_list_generator(list in version_list()) {
            prop_assert!(list.len() < 20);
            prop_assert!(list.iter().all(|v| !v.is_empty()));
        }
    }
}
