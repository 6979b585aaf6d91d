//! Stateful enumeration sessions over the pull dialect.
//!
//! A session owns the server-side enumeration context and enforces the
//! open/pull/close protocol: open once from `Idle`, pull while the
//! server has more, close only while open. Any transport or server
//! error moves the session to `Failed`, which (like `Closed`) rejects
//! every further call. Sessions are single-consumer; run concurrent
//! enumerations on separate sessions of the same connection.

use crate::ops::{AssociatorOptions, EnumerateOptions, EnumerationContext, OpenOptions};
use crate::{Error, Result, WbemConnection};
use wbem_types::{CimInstance, CimInstanceName};

/// The lifecycle phase of an enumeration session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// Created, nothing sent yet
    Idle,
    /// Opened with more results pending
    Open,
    /// A pull is in flight
    Draining,
    /// Exhausted or explicitly closed
    Closed,
    /// An operation failed; the session is unrecoverable
    Failed,
}

#[derive(Debug)]
struct Core {
    state: SessionState,
    context: Option<EnumerationContext>,
}

impl Core {
    fn new() -> Self {
        Self {
            state: SessionState::Idle,
            context: None,
        }
    }

    fn reject(&self) -> Error {
        Error::Session(match self.state {
            SessionState::Idle => "has not been opened",
            SessionState::Open | SessionState::Draining => "is already open",
            SessionState::Closed => "is closed",
            SessionState::Failed => "has failed",
        })
    }

    fn ensure_idle(&self) -> Result<()> {
        match self.state {
            SessionState::Idle => Ok(()),
            _ => Err(self.reject()),
        }
    }

    fn take_open_context(&mut self) -> Result<EnumerationContext> {
        match self.state {
            SessionState::Open => self
                .context
                .clone()
                .ok_or(Error::Session("lost its context")),
            _ => Err(self.reject()),
        }
    }

    /// Applies a chunk's context/eos outcome after an open or pull.
    fn advance(&mut self, context: Option<EnumerationContext>, eos: bool) {
        if eos {
            self.state = SessionState::Closed;
            self.context = None;
        } else {
            self.state = SessionState::Open;
            self.context = context;
        }
    }

    fn fail(&mut self) {
        self.state = SessionState::Failed;
        self.context = None;
    }
}

/// How an instance enumeration session is opened.
#[derive(Clone, Debug)]
enum InstanceOpen {
    Enumerate {
        classname: String,
        namespace: Option<String>,
        enumerate: EnumerateOptions,
    },
    Associators {
        source: CimInstanceName,
        filters: AssociatorOptions,
    },
    References {
        source: CimInstanceName,
        filters: AssociatorOptions,
    },
    Query {
        language: String,
        query: String,
        namespace: Option<String>,
    },
}

/// An enumeration session yielding instances.
///
/// Query sessions pull with `PullInstances` (no paths); all others pull
/// with `PullInstancesWithPath`.
#[derive(Debug)]
pub struct InstanceEnumeration {
    conn: WbemConnection,
    open: InstanceOpen,
    options: OpenOptions,
    core: Core,
}

impl InstanceEnumeration {
    /// A session over `OpenEnumerateInstances`.
    pub fn enumerate(
        conn: &WbemConnection,
        classname: &str,
        namespace: Option<&str>,
        enumerate: EnumerateOptions,
        options: OpenOptions,
    ) -> Self {
        Self {
            conn: conn.clone(),
            open: InstanceOpen::Enumerate {
                classname: classname.to_string(),
                namespace: namespace.map(str::to_string),
                enumerate,
            },
            options,
            core: Core::new(),
        }
    }

    /// A session over `OpenAssociatorInstances`.
    pub fn associators(
        conn: &WbemConnection,
        source: CimInstanceName,
        filters: AssociatorOptions,
        options: OpenOptions,
    ) -> Self {
        Self {
            conn: conn.clone(),
            open: InstanceOpen::Associators { source, filters },
            options,
            core: Core::new(),
        }
    }

    /// A session over `OpenReferenceInstances`.
    pub fn references(
        conn: &WbemConnection,
        source: CimInstanceName,
        filters: AssociatorOptions,
        options: OpenOptions,
    ) -> Self {
        Self {
            conn: conn.clone(),
            open: InstanceOpen::References { source, filters },
            options,
            core: Core::new(),
        }
    }

    /// A session over `OpenQueryInstances`.
    pub fn query(
        conn: &WbemConnection,
        query_language: &str,
        query: &str,
        namespace: Option<&str>,
        options: OpenOptions,
    ) -> Self {
        Self {
            conn: conn.clone(),
            open: InstanceOpen::Query {
                language: query_language.to_string(),
                query: query.to_string(),
                namespace: namespace.map(str::to_string),
            },
            options,
            core: Core::new(),
        }
    }

    /// The session's lifecycle phase.
    pub fn state(&self) -> SessionState {
        self.core.state
    }

    /// True once the session is exhausted or closed.
    pub fn is_complete(&self) -> bool {
        self.core.state == SessionState::Closed
    }

    fn is_query(&self) -> bool {
        matches!(self.open, InstanceOpen::Query { .. })
    }

    /// Opens the enumeration and returns the first chunk.
    pub async fn open(&mut self, max_object_count: u32) -> Result<Vec<CimInstance>> {
        self.core.ensure_idle()?;
        let result = match &self.open {
            InstanceOpen::Enumerate {
                classname,
                namespace,
                enumerate,
            } => {
                self.conn
                    .open_enumerate_instances(
                        classname,
                        namespace.as_deref(),
                        enumerate,
                        &self.options,
                        max_object_count,
                    )
                    .await
            }
            InstanceOpen::Associators { source, filters } => {
                self.conn
                    .open_associator_instances(source, filters, &self.options, max_object_count)
                    .await
            }
            InstanceOpen::References { source, filters } => {
                self.conn
                    .open_reference_instances(source, filters, &self.options, max_object_count)
                    .await
            }
            InstanceOpen::Query {
                language,
                query,
                namespace,
            } => {
                self.conn
                    .open_query_instances(
                        language,
                        query,
                        namespace.as_deref(),
                        &self.options,
                        max_object_count,
                    )
                    .await
            }
        };
        match result {
            Ok(chunk) => {
                self.core.advance(chunk.context, chunk.eos);
                Ok(chunk.instances)
            }
            Err(e) => {
                self.core.fail();
                Err(e)
            }
        }
    }

    /// Pulls the next chunk; legal only while the session is open.
    pub async fn pull(&mut self, max_object_count: u32) -> Result<Vec<CimInstance>> {
        let context = self.core.take_open_context()?;
        self.core.state = SessionState::Draining;
        let result = if self.is_query() {
            self.conn
                .pull_instances(&context, max_object_count, &self.options.request)
                .await
        } else {
            self.conn
                .pull_instances_with_path(&context, max_object_count, &self.options.request)
                .await
        };
        match result {
            Ok(chunk) => {
                self.core.advance(chunk.context, chunk.eos);
                Ok(chunk.instances)
            }
            Err(e) => {
                self.core.fail();
                Err(e)
            }
        }
    }

    /// Abandons the enumeration; legal only while the session is open.
    pub async fn close(&mut self) -> Result<()> {
        let context = self.core.take_open_context()?;
        match self
            .conn
            .close_enumeration(&context, &self.options.request)
            .await
        {
            Ok(()) => {
                self.core.state = SessionState::Closed;
                self.core.context = None;
                Ok(())
            }
            Err(e) => {
                self.core.fail();
                Err(e)
            }
        }
    }
}

/// How an instance-path enumeration session is opened.
#[derive(Clone, Debug)]
enum PathOpen {
    Enumerate {
        classname: String,
        namespace: Option<String>,
    },
    AssociatorPaths {
        source: CimInstanceName,
        filters: AssociatorOptions,
    },
    ReferencePaths {
        source: CimInstanceName,
        filters: AssociatorOptions,
    },
}

/// An enumeration session yielding instance paths.
#[derive(Debug)]
pub struct PathEnumeration {
    conn: WbemConnection,
    open: PathOpen,
    options: OpenOptions,
    core: Core,
}

impl PathEnumeration {
    /// A session over `OpenEnumerateInstancePaths`.
    pub fn enumerate(
        conn: &WbemConnection,
        classname: &str,
        namespace: Option<&str>,
        options: OpenOptions,
    ) -> Self {
        Self {
            conn: conn.clone(),
            open: PathOpen::Enumerate {
                classname: classname.to_string(),
                namespace: namespace.map(str::to_string),
            },
            options,
            core: Core::new(),
        }
    }

    /// A session over `OpenAssociatorInstancePaths`.
    pub fn associators(
        conn: &WbemConnection,
        source: CimInstanceName,
        filters: AssociatorOptions,
        options: OpenOptions,
    ) -> Self {
        Self {
            conn: conn.clone(),
            open: PathOpen::AssociatorPaths { source, filters },
            options,
            core: Core::new(),
        }
    }

    /// A session over `OpenReferenceInstancePaths`.
    pub fn references(
        conn: &WbemConnection,
        source: CimInstanceName,
        filters: AssociatorOptions,
        options: OpenOptions,
    ) -> Self {
        Self {
            conn: conn.clone(),
            open: PathOpen::ReferencePaths { source, filters },
            options,
            core: Core::new(),
        }
    }

    /// The session's lifecycle phase.
    pub fn state(&self) -> SessionState {
        self.core.state
    }

    /// True once the session is exhausted or closed.
    pub fn is_complete(&self) -> bool {
        self.core.state == SessionState::Closed
    }

    /// Opens the enumeration and returns the first chunk.
    pub async fn open(&mut self, max_object_count: u32) -> Result<Vec<CimInstanceName>> {
        self.core.ensure_idle()?;
        let result = match &self.open {
            PathOpen::Enumerate {
                classname,
                namespace,
            } => {
                self.conn
                    .open_enumerate_instance_paths(
                        classname,
                        namespace.as_deref(),
                        &self.options,
                        max_object_count,
                    )
                    .await
            }
            PathOpen::AssociatorPaths { source, filters } => {
                self.conn
                    .open_associator_instance_paths(
                        source,
                        filters,
                        &self.options,
                        max_object_count,
                    )
                    .await
            }
            PathOpen::ReferencePaths { source, filters } => {
                self.conn
                    .open_reference_instance_paths(
                        source,
                        filters,
                        &self.options,
                        max_object_count,
                    )
                    .await
            }
        };
        match result {
            Ok(chunk) => {
                self.core.advance(chunk.context, chunk.eos);
                Ok(chunk.paths)
            }
            Err(e) => {
                self.core.fail();
                Err(e)
            }
        }
    }

    /// Pulls the next chunk; legal only while the session is open.
    pub async fn pull(&mut self, max_object_count: u32) -> Result<Vec<CimInstanceName>> {
        let context = self.core.take_open_context()?;
        self.core.state = SessionState::Draining;
        match self
            .conn
            .pull_instance_paths(&context, max_object_count, &self.options.request)
            .await
        {
            Ok(chunk) => {
                self.core.advance(chunk.context, chunk.eos);
                Ok(chunk.paths)
            }
            Err(e) => {
                self.core.fail();
                Err(e)
            }
        }
    }

    /// Abandons the enumeration; legal only while the session is open.
    pub async fn close(&mut self) -> Result<()> {
        let context = self.core.take_open_context()?;
        match self
            .conn
            .close_enumeration(&context, &self.options.request)
            .await
        {
            Ok(()) => {
                self.core.state = SessionState::Closed;
                self.core.context = None;
                Ok(())
            }
            Err(e) => {
                self.core.fail();
                Err(e)
            }
        }
    }
}
