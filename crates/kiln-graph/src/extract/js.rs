//! JavaScript reference extraction with oxc.

use std::sync::LazyLock;

use oxc_allocator::Allocator;
use oxc_ast::ast::{
    Argument, BindingPatternKind, Declaration, ExportDefaultDeclarationKind, Expression,
    ImportDeclarationSpecifier, ImportExpression, MetaProperty, ModuleExportName, NewExpression,
    Program, Statement, VariableDeclaration,
};
use oxc_ast_visit::{Visit, walk};
use oxc_parser::{Parser, ParserReturn};
use oxc_semantic::SemanticBuilder;
use oxc_span::{GetSpan, SourceType, Span};
use regex::Regex;
use tracing::debug;

use super::{
    ExtractedReference, SourceUnit, Transform, TransformContext, TransformError, TransformOutput,
};
use crate::reference::{ByteSpan, Reference, ReferenceKind};
use crate::resolve::{Marker, ResolveMode};
use crate::syntax::{
    EsmSyntax, ExportForm, ExportRecord, ImportBinding, ImportForm, ImportRecord, ImportedName,
    MergeBlocker,
};

static IMPORT_TYPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\btype\s*:\s*["'](css|json)["']"#).expect("import attribute pattern is valid")
});

/// Extracts imports, `import()` calls and `new URL(lit, import.meta.url)`
/// assets from ES modules.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsTransform;

impl JsTransform {
    pub fn new() -> Self {
        Self
    }
}

impl Transform for JsTransform {
    fn transform(
        &self,
        unit: &SourceUnit<'_>,
        _ctx: &TransformContext<'_>,
    ) -> Result<TransformOutput, TransformError> {
        let text = unit.text()?;
        let allocator = Allocator::default();
        let ParserReturn {
            program,
            errors,
            panicked,
            ..
        } = Parser::new(&allocator, text, SourceType::mjs()).parse();

        if panicked || !errors.is_empty() {
            let first = errors.first();
            let message = first.map_or_else(
                || "unrecoverable parse error".to_string(),
                |error| error.message.to_string(),
            );
            let offset = first
                .and_then(|error| error.labels.as_ref())
                .and_then(|labels| labels.first())
                .map(|label| label.offset());
            return Err(TransformError::syntax(unit, message, offset));
        }

        let mut collector = Collector::new(text, synthesized_default(unit));
        if program.hashbang.is_some() {
            collector.syntax.blockers.push(MergeBlocker::Hashbang);
        }
        for statement in &program.body {
            collector.top_level(statement);
        }
        collector.visit_program(&program);

        let (references, mut syntax) = collector.finish();
        (syntax.globals, syntax.reassigned) = scope_facts(&program);
        Ok(TransformOutput {
            code: unit.content.to_vec(),
            map: None,
            references,
            syntax: Some(syntax),
        })
    }
}

struct Found {
    extracted: ExtractedReference,
    import: Option<(ByteSpan, ImportForm, Vec<ImportBinding>)>,
}

struct Collector<'s> {
    text: &'s str,
    default_local: String,
    found: Vec<Found>,
    syntax: EsmSyntax,
    import_meta_uses: usize,
}

impl<'s> Collector<'s> {
    fn new(text: &'s str, default_local: String) -> Self {
        Self {
            text,
            default_local,
            found: Vec::new(),
            syntax: EsmSyntax::default(),
            import_meta_uses: 0,
        }
    }

    fn top_level(&mut self, statement: &Statement<'_>) {
        match statement {
            Statement::ImportDeclaration(decl) => {
                let bindings: Vec<ImportBinding> = decl
                    .specifiers
                    .as_ref()
                    .map(|specifiers| specifiers.iter().map(import_binding).collect())
                    .unwrap_or_default();
                let namespace = bindings
                    .iter()
                    .any(|binding| binding.imported == ImportedName::Namespace);
                self.push_static(
                    decl.source.value.as_str(),
                    decl.source.span,
                    decl.span,
                    ImportForm::Import,
                    bindings,
                    namespace,
                );
            }
            Statement::ExportNamedDeclaration(decl) => {
                let statement = byte_span(decl.span);
                if let Some(source) = &decl.source {
                    let bindings = decl
                        .specifiers
                        .iter()
                        .map(|specifier| ImportBinding {
                            imported: imported_name(export_name(&specifier.local)),
                            local: export_name(&specifier.exported),
                        })
                        .collect();
                    self.syntax.blockers.push(MergeBlocker::ReExport);
                    self.push_static(
                        source.value.as_str(),
                        source.span,
                        decl.span,
                        ImportForm::ReExport,
                        bindings,
                        false,
                    );
                } else if let Some(declaration) = &decl.declaration {
                    let names = self.declaration_names(declaration);
                    self.syntax.declared.extend(names.iter().cloned());
                    self.syntax.exports.push(ExportRecord {
                        statement,
                        form: ExportForm::Declaration {
                            keyword: ByteSpan::new(
                                decl.span.start as usize,
                                declaration.span().start as usize,
                            ),
                            names,
                        },
                    });
                } else {
                    let pairs = decl
                        .specifiers
                        .iter()
                        .map(|specifier| {
                            (export_name(&specifier.local), export_name(&specifier.exported))
                        })
                        .collect();
                    self.syntax.exports.push(ExportRecord {
                        statement,
                        form: ExportForm::Local { pairs },
                    });
                }
            }
            Statement::ExportAllDeclaration(decl) => {
                let (form, bindings) = match &decl.exported {
                    Some(exported) => (
                        ImportForm::ReExport,
                        vec![ImportBinding {
                            imported: ImportedName::Namespace,
                            local: export_name(exported),
                        }],
                    ),
                    None => (ImportForm::ReExportAll, Vec::new()),
                };
                self.syntax.blockers.push(MergeBlocker::ReExport);
                self.push_static(
                    decl.source.value.as_str(),
                    decl.source.span,
                    decl.span,
                    form,
                    bindings,
                    true,
                );
            }
            Statement::ExportDefaultDeclaration(decl) => {
                let value = decl.declaration.span();
                let named = match &decl.declaration {
                    ExportDefaultDeclarationKind::FunctionDeclaration(function) => {
                        function.id.as_ref().map(|id| id.name.to_string())
                    }
                    ExportDefaultDeclarationKind::ClassDeclaration(class) => {
                        class.id.as_ref().map(|id| id.name.to_string())
                    }
                    _ => None,
                };
                let needs_binding = named.is_none();
                let local = named.unwrap_or_else(|| self.default_local.clone());
                self.syntax.declared.push(local.clone());
                self.syntax.exports.push(ExportRecord {
                    statement: byte_span(decl.span),
                    form: ExportForm::Default {
                        prefix: ByteSpan::new(decl.span.start as usize, value.start as usize),
                        local,
                        needs_binding,
                        value_end: value.end as usize,
                    },
                });
            }
            Statement::VariableDeclaration(declaration) => {
                let names = self.variable_names(declaration);
                self.syntax.declared.extend(names);
            }
            Statement::FunctionDeclaration(function) => {
                if let Some(id) = &function.id {
                    self.syntax.declared.push(id.name.to_string());
                }
            }
            Statement::ClassDeclaration(class) => {
                if let Some(id) = &class.id {
                    self.syntax.declared.push(id.name.to_string());
                }
            }
            _ => {}
        }
    }

    fn declaration_names(&mut self, declaration: &Declaration<'_>) -> Vec<String> {
        match declaration {
            Declaration::VariableDeclaration(variables) => self.variable_names(variables),
            Declaration::FunctionDeclaration(function) => {
                function.id.iter().map(|id| id.name.to_string()).collect()
            }
            Declaration::ClassDeclaration(class) => {
                class.id.iter().map(|id| id.name.to_string()).collect()
            }
            _ => Vec::new(),
        }
    }

    fn variable_names(&mut self, declaration: &VariableDeclaration<'_>) -> Vec<String> {
        let mut names = Vec::new();
        for declarator in &declaration.declarations {
            match &declarator.id.kind {
                BindingPatternKind::BindingIdentifier(ident) => names.push(ident.name.to_string()),
                _ => self.syntax.blockers.push(MergeBlocker::PatternBinding),
            }
        }
        names
    }

    fn push_static(
        &mut self,
        specifier: &str,
        source: Span,
        statement: Span,
        form: ImportForm,
        bindings: Vec<ImportBinding>,
        unmergeable: bool,
    ) {
        let statement_span = byte_span(statement);
        let mut reference = Reference::new(ReferenceKind::StaticImport, specifier, inner(source))
            .with_statement(statement_span);
        if unmergeable {
            reference = reference.unmergeable();
        }
        let mut extracted = ExtractedReference::new(reference);
        extracted.marker = self.attribute_marker(source.end, statement.end);
        self.found.push(Found {
            extracted,
            import: Some((statement_span, form, bindings)),
        });
    }

    fn push_dynamic(&mut self, specifier: &str, source: Span, call: Span) {
        let reference = Reference::new(ReferenceKind::DynamicImport, specifier, inner(source));
        let mut extracted = ExtractedReference::new(reference);
        extracted.marker = self.attribute_marker(source.end, call.end);
        self.found.push(Found {
            extracted,
            import: None,
        });
    }

    fn attribute_marker(&self, from: u32, to: u32) -> Option<Marker> {
        let tail = self.text.get(from as usize..to as usize)?;
        IMPORT_TYPE
            .captures(tail)
            .and_then(|caps| caps.get(1))
            .and_then(|m| Marker::from_import_type(m.as_str()))
    }

    fn finish(mut self) -> (Vec<ExtractedReference>, EsmSyntax) {
        if self.import_meta_uses > 0 {
            self.syntax.blockers.push(MergeBlocker::ImportMeta);
        }
        self.syntax.blockers.dedup();

        self.found
            .sort_by_key(|found| found.extracted.reference.span().start);

        let mut references = Vec::with_capacity(self.found.len());
        for (index, found) in self.found.into_iter().enumerate() {
            if let Some((statement, form, bindings)) = found.import {
                self.syntax.imports.push(ImportRecord {
                    reference: index,
                    statement,
                    form,
                    bindings,
                });
            }
            references.push(found.extracted);
        }
        (references, self.syntax)
    }
}

impl<'a> Visit<'a> for Collector<'_> {
    fn visit_import_expression(&mut self, it: &ImportExpression<'a>) {
        match &it.source {
            Expression::StringLiteral(literal) => {
                self.push_dynamic(literal.value.as_str(), literal.span, it.span)
            }
            Expression::TemplateLiteral(template) if template.expressions.is_empty() => {
                if let Some(quasi) = template.quasis.first() {
                    self.push_dynamic(quasi.value.raw.as_str(), template.span, it.span);
                }
            }
            _ => debug!(offset = it.span.start, "skipping import() with computed specifier"),
        }
        walk::walk_import_expression(self, it);
    }

    fn visit_new_expression(&mut self, it: &NewExpression<'a>) {
        match asset_url_argument(it) {
            Some((specifier, span)) => {
                let reference = Reference::new(ReferenceKind::Asset, specifier, inner(span))
                    .with_mode(ResolveMode::Url);
                self.found.push(Found {
                    extracted: ExtractedReference::new(reference),
                    import: None,
                });
            }
            None => walk::walk_new_expression(self, it),
        }
    }

    fn visit_meta_property(&mut self, it: &MetaProperty<'a>) {
        if it.meta.name.as_str() == "import" {
            self.import_meta_uses += 1;
        }
    }
}

/// Free names, and top-level bindings with a write reference.
fn scope_facts(program: &Program<'_>) -> (Vec<String>, Vec<String>) {
    let semantic = SemanticBuilder::new().build(program).semantic;
    let scoping = semantic.scoping();

    let mut globals: Vec<String> = scoping
        .root_unresolved_references()
        .keys()
        .map(|name| name.to_string())
        .collect();
    globals.sort();

    let root = scoping.root_scope_id();
    let mut reassigned: Vec<String> = scoping
        .symbol_ids()
        .filter(|&symbol| scoping.symbol_scope_id(symbol) == root)
        .filter(|&symbol| {
            scoping
                .get_resolved_reference_ids(symbol)
                .iter()
                .any(|&reference| scoping.get_reference(reference).is_write())
        })
        .map(|symbol| scoping.symbol_name(symbol).to_string())
        .collect();
    reassigned.sort();
    reassigned.dedup();

    (globals, reassigned)
}

/// Matches `new URL("literal", import.meta.url)`.
fn asset_url_argument(it: &NewExpression<'_>) -> Option<(String, Span)> {
    let Expression::Identifier(callee) = &it.callee else {
        return None;
    };
    if callee.name.as_str() != "URL" || it.arguments.len() != 2 {
        return None;
    }
    let Argument::StringLiteral(literal) = &it.arguments[0] else {
        return None;
    };
    let Argument::StaticMemberExpression(member) = &it.arguments[1] else {
        return None;
    };
    if member.property.name.as_str() != "url" {
        return None;
    }
    let Expression::MetaProperty(meta) = &member.object else {
        return None;
    };
    (meta.meta.name.as_str() == "import" && meta.property.name.as_str() == "meta")
        .then(|| (literal.value.to_string(), literal.span))
}

fn import_binding(specifier: &ImportDeclarationSpecifier<'_>) -> ImportBinding {
    match specifier {
        ImportDeclarationSpecifier::ImportDefaultSpecifier(default) => ImportBinding {
            imported: ImportedName::Default,
            local: default.local.name.to_string(),
        },
        ImportDeclarationSpecifier::ImportNamespaceSpecifier(namespace) => ImportBinding {
            imported: ImportedName::Namespace,
            local: namespace.local.name.to_string(),
        },
        ImportDeclarationSpecifier::ImportSpecifier(named) => ImportBinding {
            imported: imported_name(export_name(&named.imported)),
            local: named.local.name.to_string(),
        },
    }
}

fn imported_name(name: String) -> ImportedName {
    if name == "default" {
        ImportedName::Default
    } else {
        ImportedName::Named(name)
    }
}

fn export_name(name: &ModuleExportName<'_>) -> String {
    match name {
        ModuleExportName::IdentifierName(ident) => ident.name.to_string(),
        ModuleExportName::IdentifierReference(ident) => ident.name.to_string(),
        ModuleExportName::StringLiteral(literal) => literal.value.to_string(),
    }
}

/// Binding name for an anonymous default export, unique per module URL.
fn synthesized_default(unit: &SourceUnit<'_>) -> String {
    let hash = blake3::hash(unit.url.as_str().as_bytes()).to_hex();
    format!("__kiln_default_{}", &hash.as_str()[..8])
}

fn byte_span(span: Span) -> ByteSpan {
    ByteSpan::new(span.start as usize, span.end as usize)
}

/// Span of a string or template literal without its quotes.
fn inner(span: Span) -> ByteSpan {
    ByteSpan::new(span.start as usize + 1, (span.end as usize).saturating_sub(1))
}
