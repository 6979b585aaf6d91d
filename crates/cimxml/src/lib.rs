#![forbid(unsafe_code)]
#![deny(nonstandard_style, unused_qualifications)]

/*!
The CIM-XML codec used by the wbem client toolkit.

CIM operations travel as XML documents over HTTP. This crate maps both
directions: request construction ([`encode_imethodcall`],
[`encode_methodcall`]) and response decoding ([`parse_imethodresponse`],
[`parse_methodresponse`]), plus the listener-boundary export forms and
embedded-object handling.

Decoding is two-stage: the quick-xml event stream is folded into a small
element tree, then typed walkers extract CIM objects. Failures keep the
two layers distinct — [`CodecError::Syntax`] for XML that is not
well-formed, [`CodecError::Schema`] for well-formed XML that violates
the CIM-XML DTD — because callers surface them as different error kinds.

The codec guarantees that decoding an encoded object yields an equal
object under the model's equality rules; the `roundtrip` test suite
holds this over randomly generated instances, paths, classes, and
qualifier declarations.
*/

mod error;
mod read;
mod tree;
mod write;

pub use error::{CodecError, Result};
pub use read::{
    instance_name_from_xml, parse_embedded_object, parse_expmethodcall, parse_imethodresponse,
    parse_methodresponse, qualifier_declaration_from_xml, validate_content_type, CimErrorInfo,
    ExportCall, IMethodResponse, MethodResponse, OutParam, ReturnItem,
};
pub use write::{
    class_to_xml, embedded_object_text, encode_expmethodresponse, encode_imethodcall,
    encode_methodcall, instance_name_to_xml, instance_to_xml, namespace_components,
    normalize_namespace, qualifier_declaration_to_xml, EmbeddedObject, IParamValue,
    MethodParamValue,
};
