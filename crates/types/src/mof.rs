//! MOF (Managed Object Format) rendering, used by CLI tooling and for
//! diagnostics. Rendering is one-way; parsing MOF is a separate
//! subsystem.

use crate::{
    CimClass, CimInstance, CimMethod, CimParameter, CimProperty, CimQualifier,
    CimQualifierDeclaration, CimType, CimValue, NocaseMap,
};

const INDENT: &str = "   ";

/// Renders an entity as a MOF fragment.
pub trait ToMof {
    /// Appends the MOF form to `out` at the given indentation level.
    fn write_mof(&self, out: &mut String, level: usize);

    /// The MOF form as a fresh string.
    fn mof(&self) -> String {
        let mut out = String::new();
        self.write_mof(&mut out, 0);
        out
    }
}

fn indent(out: &mut String, level: usize) {
    for _ in 0..level {
        out.push_str(INDENT);
    }
}

fn quoted(out: &mut String, raw: &str) {
    out.push('"');
    for c in raw.chars() {
        match c {
            '"' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out.push('"');
}

fn value_literal(out: &mut String, value: &CimValue) {
    match value {
        CimValue::Boolean(b) => out.push_str(if *b { "true" } else { "false" }),
        CimValue::String(s) => quoted(out, s),
        CimValue::Char16(c) => {
            out.push('\'');
            out.push(*c);
            out.push('\'');
        }
        CimValue::DateTime(dt) => quoted(out, &dt.to_string()),
        CimValue::Reference(path) => quoted(out, &path.to_wbem_uri()),
        CimValue::Array(array) => {
            out.push_str("{ ");
            for (i, element) in array.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                match element {
                    Some(v) => value_literal(out, v),
                    None => out.push_str("NULL"),
                }
            }
            out.push_str(" }");
        }
        other => out.push_str(&other.text().unwrap_or_default()),
    }
}

impl ToMof for CimValue {
    fn write_mof(&self, out: &mut String, _level: usize) {
        value_literal(out, self);
    }
}

impl ToMof for CimQualifier {
    fn write_mof(&self, out: &mut String, _level: usize) {
        out.push_str(&self.name);
        match &self.value {
            // a bare name reads as boolean true in MOF
            Some(CimValue::Boolean(true)) => {}
            // arrays supply their own braces
            Some(value @ CimValue::Array(_)) => {
                out.push(' ');
                value_literal(out, value);
            }
            Some(value) => {
                out.push_str(" ( ");
                value_literal(out, value);
                out.push_str(" )");
            }
            None => out.push_str(" ( NULL )"),
        }
    }
}

fn qualifier_list(out: &mut String, qualifiers: &NocaseMap<CimQualifier>, level: usize) {
    if qualifiers.is_empty() {
        return;
    }
    indent(out, level);
    out.push('[');
    for (i, qualifier) in qualifiers.values().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        qualifier.write_mof(out, 0);
    }
    out.push_str("]\n");
}

fn type_prefix(out: &mut String, ty: CimType, reference_class: Option<&str>) {
    match (ty, reference_class) {
        (CimType::Reference, Some(class)) => {
            out.push_str(class);
            out.push_str(" REF");
        }
        (CimType::Reference, None) => out.push_str("REF"),
        (ty, _) => out.push_str(ty.as_str()),
    }
}

fn array_suffix(out: &mut String, is_array: bool, array_size: Option<u32>) {
    if is_array {
        match array_size {
            Some(size) => out.push_str(&format!("[{size}]")),
            None => out.push_str("[]"),
        }
    }
}

impl ToMof for CimProperty {
    fn write_mof(&self, out: &mut String, level: usize) {
        qualifier_list(out, &self.qualifiers, level);
        indent(out, level);
        type_prefix(out, self.ty, self.reference_class.as_deref());
        out.push(' ');
        out.push_str(&self.name);
        array_suffix(out, self.is_array, self.array_size);
        if let Some(value) = &self.value {
            out.push_str(" = ");
            value_literal(out, value);
        }
        out.push_str(";\n");
    }
}

impl ToMof for CimParameter {
    fn write_mof(&self, out: &mut String, _level: usize) {
        if !self.qualifiers.is_empty() {
            out.push('[');
            for (i, qualifier) in self.qualifiers.values().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                qualifier.write_mof(out, 0);
            }
            out.push_str("] ");
        }
        type_prefix(out, self.ty, self.reference_class.as_deref());
        out.push(' ');
        out.push_str(&self.name);
        array_suffix(out, self.is_array, self.array_size);
    }
}

impl ToMof for CimMethod {
    fn write_mof(&self, out: &mut String, level: usize) {
        qualifier_list(out, &self.qualifiers, level);
        indent(out, level);
        out.push_str(self.return_type.as_str());
        out.push(' ');
        out.push_str(&self.name);
        out.push('(');
        for (i, parameter) in self.parameters.values().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            parameter.write_mof(out, 0);
        }
        out.push_str(");\n");
    }
}

impl ToMof for CimClass {
    fn write_mof(&self, out: &mut String, level: usize) {
        qualifier_list(out, &self.qualifiers, level);
        indent(out, level);
        out.push_str("class ");
        out.push_str(&self.classname);
        if let Some(superclass) = &self.superclass {
            out.push_str(" : ");
            out.push_str(superclass);
        }
        out.push_str(" {\n\n");
        for property in self.properties.values() {
            property.write_mof(out, level + 1);
            out.push('\n');
        }
        for method in self.methods.values() {
            method.write_mof(out, level + 1);
            out.push('\n');
        }
        indent(out, level);
        out.push_str("};\n");
    }
}

impl ToMof for CimInstance {
    fn write_mof(&self, out: &mut String, level: usize) {
        indent(out, level);
        out.push_str("instance of ");
        out.push_str(&self.classname);
        out.push_str(" {\n");
        for property in self.properties.values() {
            indent(out, level + 1);
            out.push_str(&property.name);
            out.push_str(" = ");
            match &property.value {
                Some(value) => value_literal(out, value),
                None => out.push_str("NULL"),
            }
            out.push_str(";\n");
        }
        indent(out, level);
        out.push_str("};\n");
    }
}

impl ToMof for CimQualifierDeclaration {
    fn write_mof(&self, out: &mut String, level: usize) {
        indent(out, level);
        out.push_str("Qualifier ");
        out.push_str(&self.name);
        out.push_str(" : ");
        out.push_str(self.ty.as_str());
        array_suffix(out, self.is_array, self.array_size);
        if let Some(value) = &self.value {
            out.push_str(" = ");
            value_literal(out, value);
        }
        if !self.scopes.is_empty() {
            out.push_str(",\n");
            indent(out, level + 1);
            out.push_str("Scope(");
            for (i, name) in self.scopes.names().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push_str(name);
            }
            out.push(')');
        }
        let mut flavors = Vec::new();
        match self.overridable {
            Some(true) => flavors.push("EnableOverride"),
            Some(false) => flavors.push("DisableOverride"),
            None => {}
        }
        match self.tosubclass {
            Some(true) => flavors.push("ToSubclass"),
            Some(false) => flavors.push("Restricted"),
            None => {}
        }
        if self.translatable == Some(true) {
            flavors.push("Translatable");
        }
        if !flavors.is_empty() {
            out.push_str(",\n");
            indent(out, level + 1);
            out.push_str("Flavor(");
            out.push_str(&flavors.join(", "));
            out.push(')');
        }
        out.push_str(";\n");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CimType, Scopes};
    use pretty_assertions::assert_eq;

    #[test]
    fn instance_mof() {
        let inst = CimInstance::new("PyWBEM_Person")
            .with_property("Name", "Fritz")
            .with_property("Age", 42u8);
        assert_eq!(
            inst.mof(),
            "instance of PyWBEM_Person {\n   Name = \"Fritz\";\n   Age = 42;\n};\n"
        );
    }

    #[test]
    fn class_mof() {
        let class = CimClass::new("CIM_Foo")
            .with_superclass("CIM_Base")
            .with_property(
                CimProperty::null("Name", CimType::String)
                    .with_qualifier(CimQualifier::new("Key", true)),
            )
            .with_method(
                CimMethod::new("Reset", CimType::Uint32)
                    .with_parameter(CimParameter::new("Force", CimType::Boolean)),
            );
        let mof = class.mof();
        assert!(mof.starts_with("class CIM_Foo : CIM_Base {\n"), "{mof}");
        assert!(mof.contains("   [Key]\n   string Name;\n"), "{mof}");
        assert!(mof.contains("   uint32 Reset(boolean Force);\n"), "{mof}");
        assert!(mof.ends_with("};\n"), "{mof}");
    }

    #[test]
    fn qualifier_declaration_mof() {
        let mut scopes = Scopes::default();
        scopes.property = true;
        scopes.reference = true;
        let decl = CimQualifierDeclaration::new("Key", CimType::Boolean)
            .with_value(false)
            .with_scopes(scopes);
        let decl = CimQualifierDeclaration {
            overridable: Some(false),
            tosubclass: Some(true),
            ..decl
        };
        assert_eq!(
            decl.mof(),
            "Qualifier Key : boolean = false,\n   Scope(property, reference),\n   Flavor(DisableOverride, ToSubclass);\n"
        );
    }

    #[test]
    fn string_escaping() {
        let inst = CimInstance::new("C").with_property("S", "a\"b\\c\nd");
        assert!(inst.mof().contains(r#"S = "a\"b\\c\nd";"#));
    }
}
