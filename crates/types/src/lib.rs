#![forbid(unsafe_code)]
#![deny(nonstandard_style, unused_qualifications)]

/*!
The CIM data model used by the wbem client toolkit.

CIM (Common Information Model) management data is typed: every property,
keybinding, parameter, and qualifier slot carries one of the sixteen CIM
data types alongside its value. This crate provides those types
([`CimType`], [`CimValue`], [`CimDateTime`]), the object entities built
from them ([`CimInstance`], [`CimClass`], [`CimProperty`], and friends),
the ordered case-insensitive collections CIM requires ([`NocaseMap`]),
and the two textual renderings used for diagnostics and interchange
(WBEM URIs and MOF fragments).

All entities are ordinary value containers: construct them, mutate them,
compare them. Nothing here talks to the network; the `wbem-cimxml` and
`wbem-client` crates layer the wire protocol on top of this model.

```
use wbem_types::{CimInstanceName, CimValue};

let mut name = CimInstanceName::new("PyWBEM_Person");
name.keybindings.insert("Name", CimValue::from("Alice"));
assert_eq!(name.to_wbem_uri(), r#"PyWBEM_Person.Name="Alice""#);
```
*/

mod cim_type;
mod class;
mod datetime;
mod error;
mod instance;
mod method;
mod mof;
pub mod nocase;
mod parameter;
mod path;
mod property;
mod qualifier;
mod status;
mod uri;
mod value;

pub use cim_type::CimType;
pub use class::CimClass;
pub use datetime::{CimDateTime, Interval, Timestamp};
pub use error::{ModelError, Result};
pub use instance::CimInstance;
pub use method::CimMethod;
pub use mof::ToMof;
pub use nocase::NocaseMap;
pub use parameter::CimParameter;
pub use path::{CimClassName, CimInstanceName, ObjectName};
pub use property::{CimProperty, EmbeddedObjectKind};
pub use qualifier::{CimQualifier, CimQualifierDeclaration, Scopes};
pub use status::CimStatusCode;
pub use value::{CimArray, CimValue, IntoCimScalar};
