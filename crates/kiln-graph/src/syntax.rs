//! Module-level ESM summary.
//!
//! Enough information about a JS module's top-level bindings, imports and
//! exports to decide whether it can be concatenated into another module's
//! artifact, and to perform that concatenation with span edits alone.

use crate::reference::ByteSpan;

/// Name imported through a binding.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ImportedName {
    Default,
    Named(String),
    Namespace,
}

impl ImportedName {
    /// Export name as it appears on the target module.
    pub fn export_name(&self) -> Option<&str> {
        match self {
            Self::Default => Some("default"),
            Self::Named(name) => Some(name),
            Self::Namespace => None,
        }
    }
}

/// One `imported as local` pair. For re-exports `local` is the exported name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportBinding {
    pub imported: ImportedName,
    pub local: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportForm {
    /// `import ... from "x"` or `import "x"`
    Import,
    /// `export { a as b } from "x"` or `export * as ns from "x"`
    ReExport,
    /// `export * from "x"`
    ReExportAll,
}

/// A static import or re-export statement, linked to its reference by index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRecord {
    pub reference: usize,
    pub statement: ByteSpan,
    pub form: ImportForm,
    pub bindings: Vec<ImportBinding>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportForm {
    /// `export const a = 1`, `export function f() {}`. The `export ` keyword
    /// occupies `keyword`.
    Declaration { keyword: ByteSpan, names: Vec<String> },
    /// `export { a as b }` without a source.
    Local { pairs: Vec<(String, String)> },
    /// `export default ...`. `prefix` covers `export default `. When
    /// `needs_binding` is set the value is an expression or anonymous
    /// declaration that has to be bound to `local`; `value_end` is where it ends.
    Default {
        prefix: ByteSpan,
        local: String,
        needs_binding: bool,
        value_end: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRecord {
    pub statement: ByteSpan,
    pub form: ExportForm,
}

/// Reasons a module has to stay the root of its own artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MergeBlocker {
    /// Uses `import.meta` beyond `new URL(lit, import.meta.url)`.
    ImportMeta,
    /// Has `export ... from` or `export * from`.
    ReExport,
    /// Destructuring at the top level hides binding names.
    PatternBinding,
    Hashbang,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EsmSyntax {
    pub imports: Vec<ImportRecord>,
    pub exports: Vec<ExportRecord>,
    /// Top-level names declared by the module itself, including a
    /// synthesized default binding.
    pub declared: Vec<String>,
    /// Names the module reads or writes without declaring them anywhere,
    /// sorted.
    pub globals: Vec<String>,
    /// Top-level bindings assigned after their declaration, sorted.
    pub reassigned: Vec<String>,
    pub blockers: Vec<MergeBlocker>,
}

impl EsmSyntax {
    pub fn is_mergeable(&self) -> bool {
        self.blockers.is_empty()
    }

    pub fn reads_global(&self, name: &str) -> bool {
        self.globals.binary_search_by(|global| global.as_str().cmp(name)).is_ok()
    }

    pub fn is_reassigned(&self, local: &str) -> bool {
        self.reassigned.binary_search_by(|name| name.as_str().cmp(local)).is_ok()
    }

    pub fn import_for(&self, reference: usize) -> Option<&ImportRecord> {
        self.imports.iter().find(|record| record.reference == reference)
    }

    /// Local binding behind an export name, when it has one.
    pub fn local_for_export(&self, exported: &str) -> Option<&str> {
        self.exports.iter().find_map(|record| match &record.form {
            ExportForm::Declaration { names, .. } => names
                .iter()
                .find(|name| name.as_str() == exported)
                .map(String::as_str),
            ExportForm::Local { pairs } => pairs
                .iter()
                .find(|(_, name)| name == exported)
                .map(|(local, _)| local.as_str()),
            ExportForm::Default { local, .. } => (exported == "default").then_some(local.as_str()),
        })
    }

    /// All export names, in declaration order.
    pub fn export_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        for record in &self.exports {
            match &record.form {
                ExportForm::Declaration { names: declared, .. } => {
                    names.extend(declared.iter().map(String::as_str))
                }
                ExportForm::Local { pairs } => {
                    names.extend(pairs.iter().map(|(_, exported)| exported.as_str()))
                }
                ExportForm::Default { .. } => names.push("default"),
            }
        }
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_for_export() {
        let syntax = EsmSyntax {
            exports: vec![
                ExportRecord {
                    statement: ByteSpan::new(0, 20),
                    form: ExportForm::Declaration {
                        keyword: ByteSpan::new(0, 7),
                        names: vec!["a".into()],
                    },
                },
                ExportRecord {
                    statement: ByteSpan::new(21, 40),
                    form: ExportForm::Local {
                        pairs: vec![("inner".into(), "outer".into())],
                    },
                },
            ],
            ..Default::default()
        };

        assert_eq!(syntax.local_for_export("a"), Some("a"));
        assert_eq!(syntax.local_for_export("outer"), Some("inner"));
        assert_eq!(syntax.local_for_export("inner"), None);
        assert_eq!(syntax.export_names(), vec!["a", "outer"]);
    }
}
