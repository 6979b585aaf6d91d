//! The iterable facade: one call yielding a lazy, forward-only
//! sequence, with the pull/traditional dialect chosen per server.
//!
//! In the default `Auto` mode the first iterable call probes the pull
//! dialect; a `CIM_ERR_NOT_SUPPORTED` answer classifies the server as
//! traditional-only, permanently for this connection. Any other failure
//! propagates. The classification is a write-once atomic shared by all
//! clones of the connection.

use crate::connection::{PULL_SUPPORTED, PULL_UNSUPPORTED};
use crate::ops::{EnumerateOptions, OpenOptions};
use crate::session::{InstanceEnumeration, PathEnumeration, SessionState};
use crate::{Error, PullOperations, Result, WbemConnection};
use std::collections::VecDeque;
use wbem_types::{CimInstance, CimInstanceName, CimStatusCode};

enum Dialect<S, T> {
    Pull {
        session: S,
        buffer: VecDeque<T>,
        max_object_count: u32,
    },
    Traditional(std::vec::IntoIter<T>),
}

/// Whether an `Auto`-mode probe should fall back to the traditional
/// dialect for this error.
fn is_unsupported(error: &Error) -> bool {
    matches!(error, Error::Cim(e) if e.is(CimStatusCode::NotSupported))
}

macro_rules! iterable {
    ($name:ident, $session:ty, $item:ty, $doc:literal) => {
        #[doc = $doc]
        ///
        /// Forward-only and non-restartable. When backed by the pull
        /// dialect, abandon it with [`close`](Self::close); dropping an
        /// unfinished pull iterator leaks the server-side session and
        /// logs a warning.
        pub struct $name {
            inner: Dialect<$session, $item>,
        }

        impl $name {
            /// The next element, or `None` at the end of the sequence.
            /// A pull failure ends the sequence after the error.
            pub async fn next(&mut self) -> Option<Result<$item>> {
                match &mut self.inner {
                    Dialect::Traditional(items) => items.next().map(Ok),
                    Dialect::Pull {
                        session,
                        buffer,
                        max_object_count,
                    } => loop {
                        if let Some(item) = buffer.pop_front() {
                            return Some(Ok(item));
                        }
                        if session.is_complete()
                            || session.state() == SessionState::Failed
                        {
                            return None;
                        }
                        match session.pull(*max_object_count).await {
                            Ok(chunk) => buffer.extend(chunk),
                            Err(e) => return Some(Err(e)),
                        }
                    },
                }
            }

            /// Drains the rest of the sequence into a vector.
            pub async fn collect_remaining(&mut self) -> Result<Vec<$item>> {
                let mut items = Vec::new();
                while let Some(item) = self.next().await {
                    items.push(item?);
                }
                Ok(items)
            }

            /// Abandons the sequence, closing the server-side
            /// enumeration best-effort: a failing close is logged, not
            /// surfaced.
            pub async fn close(&mut self) {
                if let Dialect::Pull { session, buffer, .. } = &mut self.inner {
                    buffer.clear();
                    if session.state() == SessionState::Open {
                        if let Err(e) = session.close().await {
                            log::warn!("best-effort CloseEnumeration failed: {e}");
                        }
                    }
                }
            }

            /// True when the sequence is backed by the pull dialect.
            pub fn uses_pull(&self) -> bool {
                matches!(self.inner, Dialect::Pull { .. })
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                let dialect = match &self.inner {
                    Dialect::Pull { .. } => "pull",
                    Dialect::Traditional(_) => "traditional",
                };
                f.debug_struct(stringify!($name))
                    .field("dialect", &dialect)
                    .finish()
            }
        }

        impl Drop for $name {
            fn drop(&mut self) {
                if let Dialect::Pull { session, .. } = &self.inner {
                    if session.state() == SessionState::Open {
                        log::warn!(concat!(
                            stringify!($name),
                            " dropped before exhaustion; the server-side enumeration \
                             was not closed (call close() before dropping)"
                        ));
                    }
                }
            }
        }
    };
}

iterable!(
    InstanceIter,
    InstanceEnumeration,
    CimInstance,
    "A lazy sequence of instances from an iterable operation."
);
iterable!(
    PathIter,
    PathEnumeration,
    CimInstanceName,
    "A lazy sequence of instance paths from an iterable operation."
);

/// The outcome of one dialect decision.
enum Probe<T> {
    /// The pull session is open; here is its first chunk
    Opened(Vec<T>),
    /// Use the traditional dialect
    Traditional,
}

macro_rules! decide_dialect {
    ($conn:expr, $session:expr, $max:expr) => {{
        let auto = match $conn.config().use_pull_operations {
            PullOperations::Never => None,
            PullOperations::Always => Some(false),
            PullOperations::Auto => Some(true),
        };
        match auto {
            None => Probe::Traditional,
            Some(auto) if auto && $conn.pull_support() == PULL_UNSUPPORTED => Probe::Traditional,
            Some(auto) => match $session.open($max).await {
                Ok(first) => {
                    if auto {
                        $conn.record_pull_support(PULL_SUPPORTED);
                    }
                    Probe::Opened(first)
                }
                Err(e) if auto && is_unsupported(&e) => {
                    log::debug!(
                        "server lacks pull operations, using the traditional dialect"
                    );
                    $conn.record_pull_support(PULL_UNSUPPORTED);
                    Probe::Traditional
                }
                Err(e) => return Err(e),
            },
        }
    }};
}

impl WbemConnection {
    /// The iterable form of instance enumeration: pull dialect when the
    /// server has it, `EnumerateInstances` otherwise.
    pub async fn iter_enumerate_instances(
        &self,
        classname: &str,
        namespace: Option<&str>,
        enumerate: &EnumerateOptions,
        open: &OpenOptions,
        max_object_count: u32,
    ) -> Result<InstanceIter> {
        let mut session = InstanceEnumeration::enumerate(
            self,
            classname,
            namespace,
            enumerate.clone(),
            open.clone(),
        );
        match decide_dialect!(self, session, max_object_count) {
            Probe::Opened(first) => Ok(InstanceIter {
                inner: Dialect::Pull {
                    session,
                    buffer: first.into(),
                    max_object_count,
                },
            }),
            Probe::Traditional => {
                let all = self
                    .enumerate_instances(classname, namespace, enumerate)
                    .await?;
                Ok(InstanceIter {
                    inner: Dialect::Traditional(all.into_iter()),
                })
            }
        }
    }

    /// The iterable form of instance-path enumeration.
    pub async fn iter_enumerate_instance_paths(
        &self,
        classname: &str,
        namespace: Option<&str>,
        open: &OpenOptions,
        max_object_count: u32,
    ) -> Result<PathIter> {
        let mut session = PathEnumeration::enumerate(self, classname, namespace, open.clone());
        match decide_dialect!(self, session, max_object_count) {
            Probe::Opened(first) => Ok(PathIter {
                inner: Dialect::Pull {
                    session,
                    buffer: first.into(),
                    max_object_count,
                },
            }),
            Probe::Traditional => {
                let all = self
                    .enumerate_instance_names(classname, namespace, &open.request)
                    .await?;
                Ok(PathIter {
                    inner: Dialect::Traditional(all.into_iter()),
                })
            }
        }
    }

    /// The iterable form of query execution: `OpenQueryInstances` when
    /// available, `ExecQuery` otherwise.
    pub async fn iter_query_instances(
        &self,
        query_language: &str,
        query: &str,
        namespace: Option<&str>,
        open: &OpenOptions,
        max_object_count: u32,
    ) -> Result<InstanceIter> {
        let mut session =
            InstanceEnumeration::query(self, query_language, query, namespace, open.clone());
        match decide_dialect!(self, session, max_object_count) {
            Probe::Opened(first) => Ok(InstanceIter {
                inner: Dialect::Pull {
                    session,
                    buffer: first.into(),
                    max_object_count,
                },
            }),
            Probe::Traditional => {
                let all = self
                    .exec_query(query_language, query, namespace, &open.request)
                    .await?;
                Ok(InstanceIter {
                    inner: Dialect::Traditional(all.into_iter()),
                })
            }
        }
    }
}

/// Shorthand for the common drain-the-whole-sequence use.
impl InstanceIter {
    /// All remaining instances; equivalent to looping `next`.
    pub async fn try_collect(mut self) -> Result<Vec<CimInstance>> {
        self.collect_remaining().await
    }
}

impl PathIter {
    /// All remaining paths; equivalent to looping `next`.
    pub async fn try_collect(mut self) -> Result<Vec<CimInstanceName>> {
        self.collect_remaining().await
    }
}
